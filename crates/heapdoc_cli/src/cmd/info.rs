use std::path::PathBuf;

use heapdoc::inspect::{Dump, Endianness, HeapFilter, Result, TextEncoding};

use crate::cmd::util::emit_json;

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	#[arg(long)]
	pub json: bool,
}

/// Print target configuration and dump statistics.
pub fn run(args: Args) -> Result<()> {
	let Args { path, json } = args;

	let dump = Dump::open(&path)?;
	let target = dump.target;
	let objects = dump.heap.count(&HeapFilter::default())?;

	if json {
		let payload = InfoJson {
			path: path.display().to_string(),
			compression: dump.compression.as_str(),
			pointer_size: target.pointer_size,
			endianness: endianness_label(target.endianness),
			object_header_size: target.object_header_size,
			string_encoding: encoding_label(target.string.encoding),
			types: dump.metadata.len(),
			regions: dump.memory.regions().len(),
			captured_bytes: dump.memory.captured_bytes(),
			heap_objects: objects,
		};
		return emit_json(&payload);
	}

	println!("path: {}", path.display());
	println!("compression: {}", dump.compression.as_str());
	println!("pointer_size: {}", target.pointer_size);
	println!("endianness: {}", endianness_label(target.endianness));
	println!("object_header_size: {}", target.object_header_size);
	println!("string_encoding: {}", encoding_label(target.string.encoding));
	println!("types: {}", dump.metadata.len());
	println!("regions: {}", dump.memory.regions().len());
	println!("captured_bytes: {}", dump.memory.captured_bytes());
	println!("heap_objects: {objects}");

	Ok(())
}

fn endianness_label(endianness: Endianness) -> &'static str {
	match endianness {
		Endianness::Little => "little",
		Endianness::Big => "big",
	}
}

fn encoding_label(encoding: TextEncoding) -> &'static str {
	match encoding {
		TextEncoding::Utf16 => "utf16",
		TextEncoding::Utf8 => "utf8",
	}
}

#[derive(serde::Serialize)]
struct InfoJson {
	path: String,
	compression: &'static str,
	pointer_size: usize,
	endianness: &'static str,
	object_header_size: u32,
	string_encoding: &'static str,
	types: usize,
	regions: usize,
	captured_bytes: usize,
	heap_objects: usize,
}
