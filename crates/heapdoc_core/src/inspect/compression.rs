//! Dump container detection.
//!
//! A dump is a JSON document, stored as-is or wrapped in one zstd stream.
//! The wrapper is recognised by its frame magic; anything else must start
//! with a JSON object.

use std::io::Read;

use crate::inspect::{InspectError, Result};

/// Upper bound on the JSON text produced by a compressed dump.
const MAX_JSON_BYTES: u64 = 512 * 1024 * 1024;
/// zstd frame magic at the start of a compressed dump.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// How the dump JSON was stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
	/// Plain JSON text.
	None,
	/// JSON inside a zstd stream.
	Zstd,
}

impl Compression {
	/// Label used in `info` output.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Zstd => "zstd",
		}
	}

	fn detect(raw: &[u8]) -> Option<Self> {
		if starts_json_object(raw) {
			Some(Self::None)
		} else if raw.starts_with(&ZSTD_MAGIC) {
			Some(Self::Zstd)
		} else {
			None
		}
	}
}

/// Unwrap a dump file into its JSON bytes.
pub fn decode_bytes(raw: Vec<u8>) -> Result<(Compression, Vec<u8>)> {
	let mode = Compression::detect(&raw).ok_or_else(|| InspectError::UnknownDumpMagic { magic: leading_magic(&raw) })?;
	let json = match mode {
		Compression::None => raw,
		Compression::Zstd => inflate(&raw)?,
	};

	if !starts_json_object(&json) {
		return Err(InspectError::UnknownDumpMagic { magic: leading_magic(&json) });
	}
	Ok((mode, json))
}

fn inflate(raw: &[u8]) -> Result<Vec<u8>> {
	let decoder = zstd::stream::read::Decoder::new(raw)?;
	let mut json = Vec::new();
	decoder.take(MAX_JSON_BYTES + 1).read_to_end(&mut json)?;
	if json.len() as u64 > MAX_JSON_BYTES {
		return Err(InspectError::DumpTooLarge {
			limit: MAX_JSON_BYTES as usize,
		});
	}
	Ok(json)
}

fn starts_json_object(bytes: &[u8]) -> bool {
	bytes.iter().find(|byte| !byte.is_ascii_whitespace()) == Some(&b'{')
}

fn leading_magic(bytes: &[u8]) -> [u8; 4] {
	let mut magic = [0_u8; 4];
	for (slot, byte) in magic.iter_mut().zip(bytes) {
		*slot = *byte;
	}
	magic
}
