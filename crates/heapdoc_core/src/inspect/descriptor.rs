use serde::Serialize;

use crate::inspect::{EnumConstant, InspectError, PrimitiveKind, Result, TypeId};

/// One array dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArrayDim {
	/// Number of elements along this dimension.
	pub length: u32,
	/// Index of the first element along this dimension.
	pub lower_bound: i32,
}

impl ArrayDim {
	/// Zero-based dimension of `length` elements.
	pub fn zero_based(length: u32) -> Self {
		Self { length, lower_bound: 0 }
	}
}

/// Array element type, rank and (for inline arrays) bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrayShape {
	/// Element type identity.
	pub element: TypeId,
	/// Number of dimensions, at least 1.
	pub rank: u32,
	/// Fixed bounds of an inline array; heap arrays read bounds from their header.
	pub fixed: Option<Vec<ArrayDim>>,
}

impl ArrayShape {
	/// Whether elements live behind a reference with a runtime header.
	pub fn is_heap(&self) -> bool {
		self.fixed.is_none()
	}
}

/// Integer-backed enumeration shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumShape {
	/// Underlying integer encoding.
	pub underlying: PrimitiveKind,
	/// Constants in declaration order.
	pub constants: Vec<EnumConstant>,
}

impl EnumShape {
	/// First declared name for `value`.
	pub fn name_of(&self, value: i64) -> Option<&str> {
		self.constants.iter().find(|item| item.value == value).map(|item| item.name.as_ref())
	}

	/// Every declared name for `value`, in declaration order.
	pub fn names_of(&self, value: i64) -> Vec<&str> {
		self.constants
			.iter()
			.filter(|item| item.value == value)
			.map(|item| item.name.as_ref())
			.collect()
	}

	/// Value of a named constant.
	pub fn value_of(&self, name: &str) -> Option<i64> {
		self.constants.iter().find(|item| item.name.as_ref() == name).map(|item| item.value)
	}

	/// Strict lookup that reports an unmapped value as an error.
	pub fn require_name(&self, type_id: &TypeId, value: i64) -> Result<&str> {
		self.name_of(value).ok_or_else(|| InspectError::EnumValueUnmapped {
			type_id: type_id.to_string(),
			value,
		})
	}
}

/// Normalized shape class of a resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
	/// Scalar with a fixed encoding.
	Primitive(PrimitiveKind),
	/// Reference type with an object header.
	Class,
	/// Value type stored inline.
	Struct,
	/// Heap or inline array.
	Array(ArrayShape),
	/// Integer-backed enumeration.
	Enum(EnumShape),
	/// Length-prefixed text object.
	String,
}

impl TypeKind {
	/// Short lowercase label.
	pub fn label(&self) -> &'static str {
		match self {
			Self::Primitive(_) => "primitive",
			Self::Class => "class",
			Self::Struct => "struct",
			Self::Array(_) => "array",
			Self::Enum(_) => "enum",
			Self::String => "string",
		}
	}
}

/// One laid-out field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
	/// Field name.
	pub name: Box<str>,
	/// Field type identity.
	pub ty: TypeId,
	/// Byte offset: from the value start for instance fields, from the
	/// static block base for static fields.
	pub offset: u32,
	/// Bytes occupied in the owning layout.
	pub size: u32,
	/// Type-wide storage.
	pub is_static: bool,
	/// Type that declared the field.
	pub declared_by: TypeId,
}

/// Immutable, fully laid-out description of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDescriptor {
	/// Qualified identity.
	pub id: TypeId,
	/// Shape class.
	pub kind: TypeKind,
	/// Instance size in bytes (object size including header for reference types).
	pub size: u32,
	/// Instance alignment.
	pub align: u32,
	/// Bytes a field of this type occupies in its owner.
	pub storage_size: u32,
	/// Alignment of a field of this type in its owner.
	pub storage_align: u32,
	/// Instance fields (inherited then declared), followed by declared static fields.
	pub fields: Vec<FieldDescriptor>,
	/// Single base type.
	pub base: Option<TypeId>,
	/// Enclosing type for nested declarations.
	pub enclosing: Option<TypeId>,
	/// Types declared inside this one.
	pub nested: Vec<TypeId>,
	/// Target address of the static storage block.
	pub static_base: Option<u64>,
	/// Size of the static storage block.
	pub static_size: u32,
	/// Types whose static initialization must complete first.
	pub static_deps: Vec<TypeId>,
}

impl TypeDescriptor {
	/// Whether a field of this type stores a pointer.
	pub fn is_reference(&self) -> bool {
		match &self.kind {
			TypeKind::Class | TypeKind::String => true,
			TypeKind::Array(shape) => shape.is_heap(),
			_ => false,
		}
	}

	/// Whether the type has named fields.
	pub fn is_composite(&self) -> bool {
		matches!(self.kind, TypeKind::Class | TypeKind::Struct)
	}

	/// Struct or inline array; a static field of such a type holds a box pointer.
	pub fn is_boxed_in_statics(&self) -> bool {
		match &self.kind {
			TypeKind::Struct => true,
			TypeKind::Array(shape) => !shape.is_heap(),
			_ => false,
		}
	}

	/// Instance fields in layout order.
	pub fn instance_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
		self.fields.iter().filter(|field| !field.is_static)
	}

	/// Static fields declared by this type.
	pub fn static_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
		self.fields.iter().filter(|field| field.is_static)
	}

	/// Look up a field by name; instance fields shadow statics.
	pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
		self.instance_fields()
			.find(|field| field.name.as_ref() == name)
			.or_else(|| self.static_fields().find(|field| field.name.as_ref() == name))
	}
}
