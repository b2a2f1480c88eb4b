use super::ValueReader;
use crate::inspect::{Endianness, StringValue, TextEncoding, TextStatus, Value};

/// Code units fetched per memory read.
const CHUNK_UNITS: usize = 256;

impl ValueReader<'_> {
	/// Decode a string object; never fails, the status records what went wrong.
	pub(super) fn read_string(&self, address: u64) -> Value {
		let layout = self.resolver.config().string;
		let Ok(expected) = self.read_u32(address.wrapping_add(u64::from(layout.length_offset))) else {
			return Value::String(StringValue {
				text: String::new(),
				expected_len: 0,
				status: TextStatus::Unreadable,
			});
		};

		let expected_len = expected as usize;
		let take = expected_len.min(self.options.max_string_len);
		let unit = layout.encoding.unit_size();
		let start = address.wrapping_add(u64::from(layout.chars_offset));

		let mut bytes = Vec::with_capacity(take * unit);
		let mut status = if take < expected_len { TextStatus::Truncated } else { TextStatus::Complete };
		let mut done = 0_usize;
		while done < take {
			let count = (take - done).min(CHUNK_UNITS);
			let at = start.wrapping_add((done * unit) as u64);
			match self.memory.read(at, count * unit) {
				Ok(chunk) => bytes.extend_from_slice(&chunk),
				Err(_) => {
					status = TextStatus::Partial;
					break;
				}
			}
			done += count;
		}

		Value::String(StringValue {
			text: decode_text(&bytes, layout.encoding, self.resolver.config().endianness),
			expected_len,
			status,
		})
	}
}

fn decode_text(bytes: &[u8], encoding: TextEncoding, endianness: Endianness) -> String {
	match encoding {
		TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
		TextEncoding::Utf16 => {
			let units: Vec<u16> = bytes
				.chunks_exact(2)
				.map(|pair| match endianness {
					Endianness::Little => u16::from_le_bytes([pair[0], pair[1]]),
					Endianness::Big => u16::from_be_bytes([pair[0], pair[1]]),
				})
				.collect();
			String::from_utf16_lossy(&units)
		}
	}
}
