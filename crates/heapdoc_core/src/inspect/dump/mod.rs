//! Offline dump files: metadata, captured memory and heap records in one
//! JSON document, optionally zstd-compressed.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::inspect::compression::decode_bytes;
use crate::inspect::{Compression, HeapIndex, HeapObject, InspectError, MemoryRegion, MemorySnapshot, MetadataTable, RawTypeInfo, Result, TargetConfig};

#[derive(Deserialize)]
struct DumpDocument {
	#[serde(default)]
	target: TargetConfig,
	#[serde(default)]
	types: Vec<RawTypeInfo>,
	#[serde(default)]
	regions: Vec<DumpRegion>,
	#[serde(default)]
	heap: Vec<HeapObject>,
}

#[derive(Deserialize)]
struct DumpRegion {
	base: u64,
	bytes: String,
}

/// Loaded dump with every collaborator the engine needs.
#[derive(Debug, Clone)]
pub struct Dump {
	/// Target ABI facts.
	pub target: TargetConfig,
	/// Type metadata.
	pub metadata: MetadataTable,
	/// Captured memory.
	pub memory: MemorySnapshot,
	/// Heap object records.
	pub heap: HeapIndex,
	/// Compression mode of the source stream.
	pub compression: Compression,
}

impl Dump {
	/// Read and parse a dump file from disk.
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let raw = fs::read(path)?;
		Self::from_bytes(raw)
	}

	/// Parse a dump from raw (possibly compressed) bytes.
	pub fn from_bytes(raw: Vec<u8>) -> Result<Self> {
		let (compression, bytes) = decode_bytes(raw)?;
		let doc: DumpDocument = serde_json::from_slice(&bytes)?;
		doc.target.validate()?;

		let mut regions = Vec::with_capacity(doc.regions.len());
		for region in doc.regions {
			let bytes = hex::decode(region.bytes.trim()).map_err(|err| InspectError::DumpRegionBytes {
				base: region.base,
				reason: err.to_string(),
			})?;
			regions.push(MemoryRegion { base: region.base, bytes });
		}

		let metadata = MetadataTable::from_types(doc.types)?;
		let memory = MemorySnapshot::from_regions(regions);
		let heap = HeapIndex::new(doc.heap);
		debug!(
			compression = compression.as_str(),
			types = metadata.len(),
			regions = memory.regions().len(),
			bytes = memory.captured_bytes(),
			objects = heap.len(),
			"dump loaded"
		);

		Ok(Self {
			target: doc.target,
			metadata,
			memory,
			heap,
			compression,
		})
	}
}
