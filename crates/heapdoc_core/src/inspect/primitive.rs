use serde::{Deserialize, Serialize};

/// Fixed-encoding scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
	/// One-byte boolean.
	Bool,
	/// One UTF-16 code unit.
	Char16,
	/// One UTF-8/ASCII code unit.
	Char8,
	/// Signed 8-bit integer.
	I8,
	/// Unsigned 8-bit integer.
	U8,
	/// Signed 16-bit integer.
	I16,
	/// Unsigned 16-bit integer.
	U16,
	/// Signed 32-bit integer.
	I32,
	/// Unsigned 32-bit integer.
	U32,
	/// Signed 64-bit integer.
	I64,
	/// Unsigned 64-bit integer.
	U64,
	/// IEEE-754 single precision.
	F32,
	/// IEEE-754 double precision.
	F64,
	/// Pointer-sized signed integer.
	IntPtr,
	/// Pointer-sized unsigned integer.
	UIntPtr,
}

/// Canonical runtime name and keyword alias for each built-in primitive.
const BUILTIN_NAMES: &[(&str, &str, PrimitiveKind)] = &[
	("System.Boolean", "bool", PrimitiveKind::Bool),
	("System.Char", "char", PrimitiveKind::Char16),
	("System.SByte", "sbyte", PrimitiveKind::I8),
	("System.Byte", "byte", PrimitiveKind::U8),
	("System.Int16", "short", PrimitiveKind::I16),
	("System.UInt16", "ushort", PrimitiveKind::U16),
	("System.Int32", "int", PrimitiveKind::I32),
	("System.UInt32", "uint", PrimitiveKind::U32),
	("System.Int64", "long", PrimitiveKind::I64),
	("System.UInt64", "ulong", PrimitiveKind::U64),
	("System.Single", "float", PrimitiveKind::F32),
	("System.Double", "double", PrimitiveKind::F64),
	("System.IntPtr", "nint", PrimitiveKind::IntPtr),
	("System.UIntPtr", "nuint", PrimitiveKind::UIntPtr),
];

impl PrimitiveKind {
	/// Look up a built-in primitive by runtime name or keyword alias.
	pub fn from_name(name: &str) -> Option<Self> {
		BUILTIN_NAMES
			.iter()
			.find(|(full, alias, _)| *full == name || *alias == name)
			.map(|(_, _, kind)| *kind)
	}

	/// Canonical runtime name.
	pub fn name(self) -> &'static str {
		match self {
			Self::Bool => "System.Boolean",
			Self::Char16 => "System.Char",
			Self::Char8 => "char8",
			Self::I8 => "System.SByte",
			Self::U8 => "System.Byte",
			Self::I16 => "System.Int16",
			Self::U16 => "System.UInt16",
			Self::I32 => "System.Int32",
			Self::U32 => "System.UInt32",
			Self::I64 => "System.Int64",
			Self::U64 => "System.UInt64",
			Self::F32 => "System.Single",
			Self::F64 => "System.Double",
			Self::IntPtr => "System.IntPtr",
			Self::UIntPtr => "System.UIntPtr",
		}
	}

	/// Storage size in bytes.
	pub fn size(self, pointer_size: usize) -> u32 {
		match self {
			Self::Bool | Self::Char8 | Self::I8 | Self::U8 => 1,
			Self::Char16 | Self::I16 | Self::U16 => 2,
			Self::I32 | Self::U32 | Self::F32 => 4,
			Self::I64 | Self::U64 | Self::F64 => 8,
			Self::IntPtr | Self::UIntPtr => pointer_size as u32,
		}
	}

	/// Natural alignment equals size for every scalar.
	pub fn align(self, pointer_size: usize) -> u32 {
		self.size(pointer_size)
	}

	/// Whether the integer encoding is two's complement signed.
	pub fn is_signed(self) -> bool {
		matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::IntPtr)
	}

	/// Whether the kind is usable as an enum underlying type.
	pub fn is_integer(self) -> bool {
		!matches!(self, Self::Bool | Self::F32 | Self::F64 | Self::Char8 | Self::Char16)
	}
}

#[cfg(test)]
mod tests {
	use super::PrimitiveKind;

	#[test]
	fn aliases_and_runtime_names_agree() {
		assert_eq!(PrimitiveKind::from_name("int"), Some(PrimitiveKind::I32));
		assert_eq!(PrimitiveKind::from_name("System.Int32"), Some(PrimitiveKind::I32));
		assert_eq!(PrimitiveKind::from_name("System.String"), None);
		assert_eq!(PrimitiveKind::Char16.name(), "System.Char");
	}

	#[test]
	fn pointer_sized_kinds_follow_target() {
		assert_eq!(PrimitiveKind::IntPtr.size(4), 4);
		assert_eq!(PrimitiveKind::UIntPtr.size(8), 8);
		assert_eq!(PrimitiveKind::I16.align(8), 2);
	}
}
