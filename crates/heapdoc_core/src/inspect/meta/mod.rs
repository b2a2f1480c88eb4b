use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::inspect::{InspectError, PrimitiveKind, Result, TypeId};

/// One symbolic enum constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumConstant {
	/// Constant name.
	pub name: Box<str>,
	/// Underlying value; unsigned values above `i64::MAX` keep their bit pattern.
	pub value: i64,
}

/// Shape class reported by the metadata provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawKind {
	/// Scalar with a fixed encoding.
	Primitive {
		/// Scalar encoding.
		primitive: PrimitiveKind,
	},
	/// Reference type with an object header.
	Class,
	/// Value type stored inline.
	Struct,
	/// Integer-backed enumeration stored inline.
	Enum {
		/// Underlying integer encoding.
		underlying: PrimitiveKind,
		/// Constants in declaration order.
		#[serde(default)]
		constants: Vec<EnumConstant>,
	},
	/// Length-prefixed text object.
	String,
}

/// One field declaration as reported by the metadata provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawField {
	/// Field name.
	pub name: Box<str>,
	/// Field type identity or array expression.
	#[serde(rename = "type")]
	pub ty: TypeId,
	/// Explicit byte offset when the runtime already placed the field.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub offset: Option<u32>,
	/// Type-wide storage instead of per-instance storage.
	#[serde(default, rename = "static")]
	pub is_static: bool,
}

impl RawField {
	/// Instance field declaration with computed placement.
	pub fn instance(name: &str, ty: impl Into<TypeId>) -> Self {
		Self {
			name: name.into(),
			ty: ty.into(),
			offset: None,
			is_static: false,
		}
	}

	/// Static field declaration with computed placement.
	pub fn static_field(name: &str, ty: impl Into<TypeId>) -> Self {
		Self {
			is_static: true,
			..Self::instance(name, ty)
		}
	}

	/// Pin the field to an explicit offset.
	pub fn at(mut self, offset: u32) -> Self {
		self.offset = Some(offset);
		self
	}
}

/// Raw type description returned by the metadata provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTypeInfo {
	/// Qualified identity.
	pub id: TypeId,
	/// Shape class.
	pub kind: RawKind,
	/// Declared instance size, if the provider knows it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub size: Option<u32>,
	/// Declared alignment, if the provider knows it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub align: Option<u32>,
	/// Single base type.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub base: Option<TypeId>,
	/// Enclosing type for nested declarations.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub enclosing: Option<TypeId>,
	/// Field declarations in source order.
	#[serde(default)]
	pub fields: Vec<RawField>,
	/// Target address of the type's static storage block.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub static_base: Option<u64>,
	/// Types whose static initialization must complete first.
	#[serde(default)]
	pub static_deps: Vec<TypeId>,
}

impl RawTypeInfo {
	/// Bare description with no fields or relations.
	pub fn new(id: impl Into<TypeId>, kind: RawKind) -> Self {
		Self {
			id: id.into(),
			kind,
			size: None,
			align: None,
			base: None,
			enclosing: None,
			fields: Vec::new(),
			static_base: None,
			static_deps: Vec::new(),
		}
	}
}

/// Source of raw type descriptions for one target.
pub trait MetadataProvider: Send + Sync {
	/// Look up one type by identity.
	fn lookup(&self, id: &TypeId) -> Option<RawTypeInfo>;

	/// All known type identities in provider order.
	fn type_ids(&self) -> Vec<TypeId>;

	/// Types declared inside `owner`.
	fn nested_types(&self, owner: &TypeId) -> Vec<TypeId> {
		self.type_ids()
			.into_iter()
			.filter(|id| self.lookup(id).is_some_and(|info| info.enclosing.as_ref() == Some(owner)))
			.collect()
	}
}

/// In-memory metadata provider with identity lookup.
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
	types: Vec<RawTypeInfo>,
	by_id: HashMap<TypeId, usize>,
}

impl MetadataTable {
	/// Index type descriptions, rejecting duplicate identities.
	pub fn from_types(types: Vec<RawTypeInfo>) -> Result<Self> {
		let mut by_id = HashMap::with_capacity(types.len());
		for (idx, item) in types.iter().enumerate() {
			if by_id.insert(item.id.clone(), idx).is_some() {
				return Err(InspectError::DuplicateType {
					type_id: item.id.to_string(),
				});
			}
		}
		Ok(Self { types, by_id })
	}

	/// Borrow one type description.
	pub fn get(&self, id: &TypeId) -> Option<&RawTypeInfo> {
		self.by_id.get(id).and_then(|idx| self.types.get(*idx))
	}

	/// All descriptions in declaration order.
	pub fn types(&self) -> &[RawTypeInfo] {
		&self.types
	}

	/// Types whose enclosing type is `owner`.
	pub fn nested_of(&self, owner: &TypeId) -> Vec<TypeId> {
		self.types
			.iter()
			.filter(|item| item.enclosing.as_ref() == Some(owner))
			.map(|item| item.id.clone())
			.collect()
	}

	/// Number of described types.
	pub fn len(&self) -> usize {
		self.types.len()
	}

	/// Whether the table is empty.
	pub fn is_empty(&self) -> bool {
		self.types.is_empty()
	}
}

impl MetadataProvider for MetadataTable {
	fn lookup(&self, id: &TypeId) -> Option<RawTypeInfo> {
		self.get(id).cloned()
	}

	fn type_ids(&self) -> Vec<TypeId> {
		self.types.iter().map(|item| item.id.clone()).collect()
	}

	fn nested_types(&self, owner: &TypeId) -> Vec<TypeId> {
		self.nested_of(owner)
	}
}
