use serde::{Deserialize, Serialize};

use crate::inspect::{InspectError, Result};

/// Byte order of the target process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
	/// Least-significant byte first.
	#[default]
	Little,
	/// Most-significant byte first.
	Big,
}

/// Header shape of heap array objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrayLayout {
	/// Offset of the total element count.
	pub count_offset: u32,
	/// Offset of the per-dimension length table (rank > 1 only).
	pub rank_offset: u32,
	/// Byte width of one length or lower-bound entry.
	pub rank_size: u32,
	/// Offset of the first element for single-dimension arrays.
	pub first_element_offset: u32,
}

impl Default for ArrayLayout {
	fn default() -> Self {
		Self {
			count_offset: 8,
			rank_offset: 16,
			rank_size: 4,
			first_element_offset: 16,
		}
	}
}

impl ArrayLayout {
	/// Offset of the lower-bound table for a rank-N array.
	pub fn lower_bound_offset(&self, rank: u32) -> Option<u32> {
		self.rank_size.checked_mul(rank)?.checked_add(self.rank_offset)
	}

	/// Byte length of the length and lower-bound tables of a rank-N array.
	pub fn bounds_table_len(&self, rank: u32) -> Option<u32> {
		self.rank_size.checked_mul(rank)?.checked_mul(2)
	}

	/// Offset of the first element for an array of the given rank.
	pub fn data_offset(&self, rank: u32) -> Option<u32> {
		if rank <= 1 {
			Some(self.first_element_offset)
		} else {
			self.bounds_table_len(rank)?.checked_add(self.rank_offset)
		}
	}

	fn validate(&self) -> Result<()> {
		if !matches!(self.rank_size, 1 | 2 | 4 | 8) {
			return Err(InspectError::InvalidTargetLayout {
				reason: format!("array bound entries must be 1, 2, 4 or 8 bytes, got {}", self.rank_size),
			});
		}
		Ok(())
	}
}

/// Text encoding of string objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
	/// Two-byte code units.
	#[default]
	Utf16,
	/// One-byte code units.
	Utf8,
}

impl TextEncoding {
	/// Width of one code unit in bytes.
	pub fn unit_size(self) -> usize {
		match self {
			Self::Utf16 => 2,
			Self::Utf8 => 1,
		}
	}
}

/// Header shape of string objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringLayout {
	/// Offset of the `u32` code-unit count.
	pub length_offset: u32,
	/// Offset of the first code unit.
	pub chars_offset: u32,
	/// Code-unit encoding.
	pub encoding: TextEncoding,
}

impl Default for StringLayout {
	fn default() -> Self {
		Self {
			length_offset: 8,
			chars_offset: 12,
			encoding: TextEncoding::Utf16,
		}
	}
}

/// Target ABI facts needed to lay out and decode values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
	/// Pointer width in bytes (4 or 8).
	pub pointer_size: usize,
	/// Target byte order.
	pub endianness: Endianness,
	/// Bytes preceding the first instance field of a reference-type object.
	pub object_header_size: u32,
	/// Heap array header shape.
	pub array: ArrayLayout,
	/// String object shape.
	pub string: StringLayout,
}

impl Default for TargetConfig {
	fn default() -> Self {
		Self::clr_x64()
	}
}

impl TargetConfig {
	/// 64-bit managed runtime layout.
	pub fn clr_x64() -> Self {
		Self {
			pointer_size: 8,
			endianness: Endianness::Little,
			object_header_size: 8,
			array: ArrayLayout::default(),
			string: StringLayout::default(),
		}
	}

	/// 32-bit managed runtime layout.
	pub fn clr_x86() -> Self {
		Self {
			pointer_size: 4,
			endianness: Endianness::Little,
			object_header_size: 4,
			array: ArrayLayout {
				count_offset: 4,
				rank_offset: 8,
				rank_size: 4,
				first_element_offset: 8,
			},
			string: StringLayout {
				length_offset: 4,
				chars_offset: 8,
				encoding: TextEncoding::Utf16,
			},
		}
	}

	/// Reject configurations the reader cannot decode.
	pub fn validate(&self) -> Result<()> {
		if !matches!(self.pointer_size, 4 | 8) {
			return Err(InspectError::UnsupportedPointerSize { size: self.pointer_size });
		}
		if self.object_header_size.checked_next_multiple_of(self.pointer_size as u32).is_none() {
			return Err(InspectError::InvalidTargetLayout {
				reason: format!("object header size {} overflows u32 when pointer-aligned", self.object_header_size),
			});
		}
		self.array.validate()
	}
}

/// Runtime limits and behavior switches for value reads.
#[derive(Debug, Clone)]
pub struct ReadOptions {
	/// Maximum reference/nesting depth expanded below the root.
	pub max_depth: u32,
	/// Maximum number of array elements decoded per array.
	pub max_array_elems: usize,
	/// Maximum number of code units decoded per string.
	pub max_string_len: usize,
	/// Dereference object references instead of reporting raw addresses.
	pub follow_refs: bool,
	/// Include static fields when reading composite values.
	pub include_statics: bool,
}

impl Default for ReadOptions {
	fn default() -> Self {
		Self {
			max_depth: 8,
			max_array_elems: 4096,
			max_string_len: 4096,
			follow_refs: true,
			include_statics: true,
		}
	}
}

impl ReadOptions {
	/// Preset for shallow one-screen summaries.
	pub fn for_summary() -> Self {
		Self {
			max_depth: 2,
			max_array_elems: 64,
			max_string_len: 256,
			follow_refs: true,
			include_statics: false,
		}
	}
}
