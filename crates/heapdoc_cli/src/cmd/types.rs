use std::path::PathBuf;

use heapdoc::inspect::{Introspector, Result};

use crate::cmd::util::emit_json;

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	/// Glob over qualified type names, e.g. `app.*`.
	#[arg(long, default_value = "*")]
	pub mask: String,
	/// Resolve every match and report its kind and size.
	#[arg(long)]
	pub resolve: bool,
	#[arg(long)]
	pub json: bool,
}

/// List provider type names matching a mask.
pub fn run(args: Args) -> Result<()> {
	let Args { path, mask, resolve, json } = args;

	let session = Introspector::open(&path)?;
	let names = session.type_names(&mask)?;

	let mut rows = Vec::with_capacity(names.len());
	for name in names {
		let shape = if resolve {
			let desc = session.resolve_type(&name)?;
			Some((desc.kind.label(), desc.size))
		} else {
			None
		};
		rows.push(TypeRowJson {
			name: name.to_string(),
			kind: shape.map(|(kind, _)| kind),
			size: shape.map(|(_, size)| size),
		});
	}

	if json {
		return emit_json(&TypesJson { mask, types: rows });
	}

	println!("mask: {mask}");
	println!("types: {}", rows.len());
	for row in &rows {
		match (row.kind, row.size) {
			(Some(kind), Some(size)) => println!("  {}\t{kind}\t{size}", row.name),
			_ => println!("  {}", row.name),
		}
	}

	Ok(())
}

#[derive(serde::Serialize)]
struct TypeRowJson {
	name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	kind: Option<&'static str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	size: Option<u32>,
}

#[derive(serde::Serialize)]
struct TypesJson {
	mask: String,
	types: Vec<TypeRowJson>,
}
