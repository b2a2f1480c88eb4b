use std::path::PathBuf;

use heapdoc::inspect::{Introspector, Result, TypeId, ValueInstance};

use crate::cmd::print::{PrintOptions, print_value};
use crate::cmd::util::{addr_hex, emit_json};

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	/// Declaring (or deriving) type.
	#[arg(long = "type")]
	pub type_name: String,
	/// Static field name.
	#[arg(long)]
	pub field: String,
	/// Only report the storage address.
	#[arg(long = "location-only")]
	pub location_only: bool,
	#[arg(long)]
	pub json: bool,
}

/// Locate a static field and decode its value.
pub fn run(args: Args) -> Result<()> {
	let Args {
		path,
		type_name,
		field,
		location_only,
		json,
	} = args;

	let session = Introspector::open(&path)?;
	let id = TypeId::from(type_name.as_str());
	let location = session.static_location(&id, &field)?;
	let value = if location_only { None } else { Some(session.read_static(&id, &field)?) };
	let initialized: Vec<String> = session.statics().initialization_log().iter().map(ToString::to_string).collect();

	if json {
		return emit_json(&StaticJson {
			type_name: id.to_string(),
			field,
			location: addr_hex(location),
			initialized,
			value: value.as_ref(),
		});
	}

	println!("type: {id}");
	println!("field: {field}");
	println!("location: {}", addr_hex(location));
	if let Some(value) = &value {
		println!("initialized: {}", initialized.join(", "));
		print_value(value, PrintOptions::default());
	}

	Ok(())
}

#[derive(serde::Serialize)]
struct StaticJson<'a> {
	#[serde(rename = "type")]
	type_name: String,
	field: String,
	location: String,
	initialized: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	value: Option<&'a ValueInstance>,
}
