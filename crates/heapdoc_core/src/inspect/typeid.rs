use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::inspect::{InspectError, Result};

/// Fully qualified type identity.
///
/// Nested types are addressed as `Owner.Local`; array types are type
/// expressions over their element identity (`T[]`, `T[,,]`, `T[2,2]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(Arc<str>);

impl TypeId {
	/// Wrap a qualified type name.
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self(name.into())
	}

	/// Identity of a type nested inside `owner`.
	pub fn nested(owner: &TypeId, local: &str) -> Self {
		Self::new(format!("{owner}.{local}"))
	}

	/// Identity of a heap array of `element` with the given rank.
	pub fn array_of(element: &TypeId, rank: u32) -> Self {
		let commas = ",".repeat(rank.saturating_sub(1) as usize);
		Self::new(format!("{element}[{commas}]"))
	}

	/// Identity of a fixed inline array of `element`.
	pub fn fixed_array_of(element: &TypeId, dims: &[u32]) -> Self {
		let dims = dims.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
		Self::new(format!("{element}[{dims}]"))
	}

	/// Borrow the qualified name.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Last dotted component, ignoring dots inside array brackets.
	pub fn local_name(&self) -> &str {
		let name = self.as_str();
		let head_end = name.find('[').unwrap_or(name.len());
		match name[..head_end].rfind('.') {
			Some(dot) => &name[dot + 1..],
			None => name,
		}
	}
}

impl fmt::Display for TypeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for TypeId {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

impl From<String> for TypeId {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

/// Parsed shape of a type identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TypeExpr<'a> {
	/// Plain named type.
	Named(&'a str),
	/// Array over an element expression.
	Array {
		/// Element identity text (may itself be an array).
		element: &'a str,
		/// Number of dimensions.
		rank: u32,
		/// Fixed dimension lengths for inline arrays.
		dims: Option<Vec<u32>>,
	},
}

/// Split a type identity into a named type or its outermost array suffix.
pub(crate) fn parse_type_expr(raw: &str) -> Result<TypeExpr<'_>> {
	let trimmed = raw.trim();
	let invalid = || InspectError::InvalidTypeExpr { expr: raw.to_owned() };

	if !trimmed.ends_with(']') {
		if trimmed.is_empty() || trimmed.contains('[') || trimmed.contains(']') {
			return Err(invalid());
		}
		return Ok(TypeExpr::Named(trimmed));
	}

	let open = trimmed.rfind('[').ok_or_else(invalid)?;
	let element = trimmed[..open].trim_end();
	if element.is_empty() {
		return Err(invalid());
	}

	let inside = &trimmed[open + 1..trimmed.len() - 1];
	if inside.contains('[') || inside.contains(']') {
		return Err(invalid());
	}

	let parts: Vec<&str> = inside.split(',').map(str::trim).collect();
	let rank = parts.len() as u32;

	if parts.iter().all(|part| part.is_empty()) {
		return Ok(TypeExpr::Array { element, rank, dims: None });
	}

	let mut dims = Vec::with_capacity(parts.len());
	for part in parts {
		dims.push(part.parse::<u32>().map_err(|_| invalid())?);
	}

	Ok(TypeExpr::Array {
		element,
		rank,
		dims: Some(dims),
	})
}
