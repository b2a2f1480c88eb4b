use serde::Serialize;

use crate::inspect::ArrayDim;

/// Decoded snapshot of the data at one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueInstance {
	/// Target address the value was read from; `None` for synthesized values.
	pub location: Option<u64>,
	/// Qualified name of the decoded type.
	pub type_name: Box<str>,
	/// Decoded payload.
	pub value: Value,
}

/// Decoded payload of a [`ValueInstance`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tag", content = "data", rename_all = "snake_case")]
pub enum Value {
	/// Null reference.
	Null,
	Bool(bool),
	/// One character code unit.
	Char(u32),
	I64(i64),
	U64(u64),
	F32(f32),
	F64(f64),
	Enum(EnumValue),
	String(StringValue),
	Array(ArrayValue),
	/// Named fields in layout order.
	Composite(Vec<FieldValue>),
	/// Reference left unexpanded (depth limit, cycle, or refs not followed).
	Ref(u64),
	/// Memory for this value could not be read.
	Unreadable(ReadFailure),
}

/// Enum value with optional symbolic name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumValue {
	/// Underlying integer.
	pub raw: i64,
	/// First declared name for `raw`, if any.
	pub name: Option<Box<str>>,
}

/// Completeness of a decoded string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextStatus {
	/// Every code unit was read.
	Complete,
	/// Stopped at the configured length cap.
	Truncated,
	/// Stopped at an unreadable chunk.
	Partial,
	/// The string object itself could not be read.
	Unreadable,
}

/// Decoded string text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringValue {
	/// Decoded text (possibly shortened).
	pub text: String,
	/// Code-unit count stored in the object.
	pub expected_len: usize,
	/// Completeness of `text`.
	pub status: TextStatus,
}

/// Decoded array with its shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayValue {
	/// Dimension bounds, outermost first.
	pub dims: Vec<ArrayDim>,
	/// Elements in row-major order (last dimension varies fastest).
	pub elements: Vec<ValueInstance>,
	/// Element count implied by `dims`.
	pub total: usize,
}

impl ArrayValue {
	/// Number of dimensions.
	pub fn rank(&self) -> usize {
		self.dims.len()
	}

	/// Length of the outermost dimension.
	pub fn len(&self) -> usize {
		self.dims.first().map_or(0, |dim| dim.length as usize)
	}

	/// Whether the array has no elements.
	pub fn is_empty(&self) -> bool {
		self.total == 0
	}

	/// Whether elements were dropped by the element cap.
	pub fn is_truncated(&self) -> bool {
		self.elements.len() < self.total
	}

	/// Row-major flat index of zero-based `indices`.
	pub fn flat_index(&self, indices: &[usize]) -> Option<usize> {
		if indices.len() != self.dims.len() {
			return None;
		}

		let mut flat = 0_usize;
		for (index, dim) in indices.iter().zip(&self.dims) {
			let length = dim.length as usize;
			if *index >= length {
				return None;
			}
			flat = flat.checked_mul(length)?.checked_add(*index)?;
		}
		Some(flat)
	}

	/// Element at zero-based `indices`.
	pub fn get(&self, indices: &[usize]) -> Option<&ValueInstance> {
		self.elements.get(self.flat_index(indices)?)
	}
}

/// One decoded field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldValue {
	/// Field name.
	pub name: Box<str>,
	/// Read from static storage.
	pub is_static: bool,
	/// Decoded field value.
	pub value: ValueInstance,
}

/// Why a value could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadFailure {
	/// Address of the failed read.
	pub address: u64,
	/// Requested byte count.
	pub len: usize,
	/// Rendered error.
	pub reason: String,
}

impl ValueInstance {
	/// Named field of a composite value.
	pub fn field(&self, name: &str) -> Option<&ValueInstance> {
		match &self.value {
			Value::Composite(fields) => fields.iter().find(|field| field.name.as_ref() == name).map(|field| &field.value),
			_ => None,
		}
	}

	/// Array payload.
	pub fn as_array(&self) -> Option<&ArrayValue> {
		match &self.value {
			Value::Array(array) => Some(array),
			_ => None,
		}
	}

	/// Integer view of integer, char, bool and enum payloads.
	pub fn as_i64(&self) -> Option<i64> {
		match &self.value {
			Value::I64(v) => Some(*v),
			Value::U64(v) => i64::try_from(*v).ok(),
			Value::Char(v) => Some(i64::from(*v)),
			Value::Bool(v) => Some(i64::from(*v)),
			Value::Enum(v) => Some(v.raw),
			_ => None,
		}
	}

	/// Unsigned view of integer payloads, keeping the bit pattern of signed ones.
	pub fn as_u64(&self) -> Option<u64> {
		match &self.value {
			Value::U64(v) => Some(*v),
			Value::I64(v) => Some(*v as u64),
			Value::Enum(v) => Some(v.raw as u64),
			_ => None,
		}
	}

	/// Floating-point view of float payloads.
	pub fn as_f64(&self) -> Option<f64> {
		match &self.value {
			Value::F32(v) => Some(f64::from(*v)),
			Value::F64(v) => Some(*v),
			_ => None,
		}
	}

	/// Character view of a char payload.
	pub fn as_char(&self) -> Option<char> {
		match &self.value {
			Value::Char(v) => char::from_u32(*v),
			_ => None,
		}
	}

	/// Text of a string payload.
	pub fn as_str(&self) -> Option<&str> {
		match &self.value {
			Value::String(v) => Some(&v.text),
			_ => None,
		}
	}

	/// Enum payload.
	pub fn as_enum(&self) -> Option<&EnumValue> {
		match &self.value {
			Value::Enum(v) => Some(v),
			_ => None,
		}
	}

	/// Whether this value or any descendant failed to read.
	pub fn has_failures(&self) -> bool {
		match &self.value {
			Value::Unreadable(_) => true,
			Value::String(v) => matches!(v.status, TextStatus::Partial | TextStatus::Unreadable),
			Value::Array(v) => v.elements.iter().any(ValueInstance::has_failures),
			Value::Composite(fields) => fields.iter().any(|field| field.value.has_failures()),
			_ => false,
		}
	}
}
