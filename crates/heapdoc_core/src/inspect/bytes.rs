use crate::inspect::{Endianness, InspectError, Result};

/// Bounded cursor over bytes copied out of target memory.
///
/// `origin` is the target address of the first byte so failures report
/// absolute addresses.
pub struct Cursor<'a> {
	bytes: &'a [u8],
	pos: usize,
	origin: u64,
	endianness: Endianness,
}

impl<'a> Cursor<'a> {
	/// Create a cursor at position 0.
	pub fn new(bytes: &'a [u8], origin: u64, endianness: Endianness) -> Self {
		Self {
			bytes,
			pos: 0,
			origin,
			endianness,
		}
	}

	/// Return current byte offset.
	pub fn pos(&self) -> usize {
		self.pos
	}

	/// Return remaining unread bytes.
	pub fn remaining(&self) -> usize {
		self.bytes.len().saturating_sub(self.pos)
	}

	/// Read exactly `n` bytes and advance cursor.
	pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
		if n > self.remaining() {
			return Err(InspectError::MemoryAccess {
				address: self.origin.wrapping_add(self.pos as u64),
				len: n,
			});
		}

		let start = self.pos;
		self.pos += n;
		Ok(&self.bytes[start..self.pos])
	}

	fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
		let raw = self.read_exact(N)?;
		let mut buf = [0_u8; N];
		buf.copy_from_slice(raw);
		Ok(buf)
	}

	/// Read a `u8`.
	pub fn read_u8(&mut self) -> Result<u8> {
		Ok(self.read_array::<1>()?[0])
	}

	/// Read a `u16` using the target byte order.
	pub fn read_u16(&mut self) -> Result<u16> {
		let buf = self.read_array::<2>()?;
		Ok(match self.endianness {
			Endianness::Little => u16::from_le_bytes(buf),
			Endianness::Big => u16::from_be_bytes(buf),
		})
	}

	/// Read a `u32` using the target byte order.
	pub fn read_u32(&mut self) -> Result<u32> {
		let buf = self.read_array::<4>()?;
		Ok(match self.endianness {
			Endianness::Little => u32::from_le_bytes(buf),
			Endianness::Big => u32::from_be_bytes(buf),
		})
	}

	/// Read a `u64` using the target byte order.
	pub fn read_u64(&mut self) -> Result<u64> {
		let buf = self.read_array::<8>()?;
		Ok(match self.endianness {
			Endianness::Little => u64::from_le_bytes(buf),
			Endianness::Big => u64::from_be_bytes(buf),
		})
	}

	/// Read an unsigned integer of `width` bytes and widen to `u64`.
	pub fn read_uint(&mut self, width: usize) -> Result<u64> {
		match width {
			1 => Ok(u64::from(self.read_u8()?)),
			2 => Ok(u64::from(self.read_u16()?)),
			4 => Ok(u64::from(self.read_u32()?)),
			8 => self.read_u64(),
			_ => Err(InspectError::UnsupportedPointerSize { size: width }),
		}
	}

	/// Read a pointer-sized unsigned integer and widen to `u64`.
	pub fn read_ptr(&mut self, pointer_size: usize) -> Result<u64> {
		match pointer_size {
			4 | 8 => self.read_uint(pointer_size),
			_ => Err(InspectError::UnsupportedPointerSize { size: pointer_size }),
		}
	}
}

/// Sign-extend the low `width` bytes of `raw`.
pub(crate) fn sign_extend(raw: u64, width: usize) -> i64 {
	match width {
		1 => i64::from(raw as u8 as i8),
		2 => i64::from(raw as u16 as i16),
		4 => i64::from(raw as u32 as i32),
		_ => raw as i64,
	}
}
