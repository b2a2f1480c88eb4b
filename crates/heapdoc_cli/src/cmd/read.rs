use std::path::PathBuf;

use heapdoc::inspect::{Introspector, ReadOptions, Result, TypeId, ValueInstance};

use crate::cmd::print::{PrintOptions, print_value};
use crate::cmd::util::{addr_hex, emit_json, parse_address};

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	/// Object or value address (decimal or `0x` hex).
	pub address: String,
	/// Declared type; defaults to the runtime type recorded in the heap.
	#[arg(long = "type")]
	pub type_name: Option<String>,
	/// Start from the shallow summary preset.
	#[arg(long)]
	pub summary: bool,
	#[arg(long)]
	pub depth: Option<u32>,
	#[arg(long = "max-array")]
	pub max_array: Option<usize>,
	#[arg(long = "max-string")]
	pub max_string: Option<usize>,
	/// Report references as addresses instead of following them.
	#[arg(long = "no-follow")]
	pub no_follow: bool,
	/// Skip static fields of composite values.
	#[arg(long = "no-statics")]
	pub no_statics: bool,
	#[arg(long)]
	pub json: bool,
}

impl Args {
	fn read_options(&self) -> ReadOptions {
		let mut options = if self.summary { ReadOptions::for_summary() } else { ReadOptions::default() };
		if let Some(depth) = self.depth {
			options.max_depth = depth;
		}
		if let Some(max_array) = self.max_array {
			options.max_array_elems = max_array;
		}
		if let Some(max_string) = self.max_string {
			options.max_string_len = max_string;
		}
		if self.no_follow {
			options.follow_refs = false;
		}
		if self.no_statics {
			options.include_statics = false;
		}
		options
	}
}

/// Decode and print the value at an address.
pub fn run(args: Args) -> Result<()> {
	let address = parse_address(&args.address)?;
	let options = args.read_options();

	let session = Introspector::open(&args.path)?;
	let value = match &args.type_name {
		Some(type_name) => session.read_value_with(address, &TypeId::from(type_name.as_str()), &options)?,
		None => session.read_object_with(address, &options)?,
	};

	if args.json {
		return emit_json(&ReadJson {
			address: addr_hex(address),
			complete: !value.has_failures(),
			value: &value,
		});
	}

	println!("address: {}", addr_hex(address));
	println!("type: {}", value.type_name);
	if value.has_failures() {
		println!("complete: false");
	}
	print_value(&value, PrintOptions::default());

	Ok(())
}

#[derive(serde::Serialize)]
struct ReadJson<'a> {
	address: String,
	complete: bool,
	value: &'a ValueInstance,
}
