use std::collections::BTreeMap;
use std::path::PathBuf;

use heapdoc::inspect::{HeapFilter, Introspector, Result};

use crate::cmd::util::{addr_hex, emit_json};

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	/// Glob over runtime type names.
	#[arg(long, default_value = "*")]
	pub mask: String,
	#[arg(long = "min-size")]
	pub min_size: Option<u64>,
	#[arg(long = "max-size")]
	pub max_size: Option<u64>,
	/// Print per-type counts instead of objects.
	#[arg(long)]
	pub stats: bool,
	#[arg(long)]
	pub limit: Option<usize>,
	#[arg(long)]
	pub json: bool,
}

/// Enumerate heap objects matching a type mask and size range.
pub fn run(args: Args) -> Result<()> {
	let Args {
		path,
		mask,
		min_size,
		max_size,
		stats,
		limit,
		json,
	} = args;

	let session = Introspector::open(&path)?;
	let filter = HeapFilter { mask, min_size, max_size };
	let objects = session.heap().objects(&filter)?;

	if stats {
		let mut by_type: BTreeMap<&str, (usize, u64)> = BTreeMap::new();
		for object in &objects {
			let entry = by_type.entry(object.ty.as_str()).or_default();
			entry.0 += 1;
			entry.1 += object.size;
		}
		let mut rows: Vec<TypeStatJson> = by_type
			.into_iter()
			.map(|(name, (count, bytes))| TypeStatJson {
				type_name: name.to_owned(),
				count,
				bytes,
			})
			.collect();
		rows.sort_by(|left, right| right.bytes.cmp(&left.bytes).then_with(|| left.type_name.cmp(&right.type_name)));

		if json {
			return emit_json(&HeapStatsJson {
				mask: filter.mask,
				objects: objects.len(),
				types: rows,
			});
		}

		println!("mask: {}", filter.mask);
		println!("objects: {}", objects.len());
		println!("count\tbytes\ttype");
		for row in &rows {
			println!("{}\t{}\t{}", row.count, row.bytes, row.type_name);
		}
		return Ok(());
	}

	let total = objects.len();
	let shown: Vec<_> = objects.into_iter().take(limit.unwrap_or(usize::MAX)).collect();

	if json {
		return emit_json(&HeapJson {
			mask: filter.mask,
			total,
			objects: shown
				.iter()
				.map(|object| HeapObjectJson {
					address: addr_hex(object.address),
					type_name: object.ty.to_string(),
					size: object.size,
				})
				.collect(),
		});
	}

	println!("mask: {}", filter.mask);
	println!("objects: {total}");
	println!("address\tsize\ttype");
	for object in &shown {
		println!("{}\t{}\t{}", addr_hex(object.address), object.size, object.ty);
	}
	if shown.len() < total {
		println!("... {} more", total - shown.len());
	}

	Ok(())
}

#[derive(serde::Serialize)]
struct HeapObjectJson {
	address: String,
	#[serde(rename = "type")]
	type_name: String,
	size: u64,
}

#[derive(serde::Serialize)]
struct HeapJson {
	mask: String,
	total: usize,
	objects: Vec<HeapObjectJson>,
}

#[derive(serde::Serialize)]
struct TypeStatJson {
	#[serde(rename = "type")]
	type_name: String,
	count: usize,
	bytes: u64,
}

#[derive(serde::Serialize)]
struct HeapStatsJson {
	mask: String,
	objects: usize,
	types: Vec<TypeStatJson>,
}
