use tracing::debug;

use super::ValueReader;
use crate::inspect::bytes::{Cursor, sign_extend};
use crate::inspect::{EnumShape, EnumValue, InspectError, Result, TypeDescriptor, Value};

/// Attach the first declared name to a raw enum value.
fn decode_enum(desc: &TypeDescriptor, shape: &EnumShape, raw: i64) -> EnumValue {
	let name = shape.name_of(raw).map(Box::from);
	if name.is_none() {
		let unmapped = InspectError::EnumValueUnmapped {
			type_id: desc.id.to_string(),
			value: raw,
		};
		debug!("{unmapped}");
	}
	EnumValue { raw, name }
}

impl ValueReader<'_> {
	pub(super) fn read_enum(&self, address: u64, desc: &TypeDescriptor, shape: &EnumShape) -> Result<Value> {
		let config = self.resolver.config();
		let width = shape.underlying.size(config.pointer_size) as usize;
		let bytes = self.memory.read(address, width)?;
		let unsigned = Cursor::new(&bytes, address, config.endianness).read_uint(width)?;
		let raw = if shape.underlying.is_signed() {
			sign_extend(unsigned, width)
		} else {
			unsigned as i64
		};
		Ok(Value::Enum(decode_enum(desc, shape, raw)))
	}
}
