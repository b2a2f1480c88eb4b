use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::inspect::{Result, TypeId, TypeMask};

/// One object recorded in the target heap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapObject {
	/// Object start address.
	pub address: u64,
	/// Runtime type.
	#[serde(rename = "type")]
	pub ty: TypeId,
	/// Object size in bytes.
	pub size: u64,
}

/// Object enumeration filter.
#[derive(Debug, Clone, Default)]
pub struct HeapFilter {
	/// Type-name glob mask; empty matches every type.
	pub mask: String,
	/// Smallest accepted object size.
	pub min_size: Option<u64>,
	/// Largest accepted object size.
	pub max_size: Option<u64>,
}

impl HeapFilter {
	/// Filter on type name only.
	pub fn by_type(mask: &str) -> Self {
		Self {
			mask: mask.to_owned(),
			..Self::default()
		}
	}
}

/// Address-ordered index of heap objects.
#[derive(Debug, Clone, Default)]
pub struct HeapIndex {
	objects: Vec<HeapObject>,
	by_address: HashMap<u64, usize>,
}

impl HeapIndex {
	/// Build the index; later duplicates of an address replace earlier ones.
	pub fn new(objects: Vec<HeapObject>) -> Self {
		let mut by_address: HashMap<u64, HeapObject> = HashMap::with_capacity(objects.len());
		for object in objects {
			by_address.insert(object.address, object);
		}

		let mut objects: Vec<HeapObject> = by_address.into_values().collect();
		objects.sort_by_key(|object| object.address);
		let by_address = objects.iter().enumerate().map(|(idx, object)| (object.address, idx)).collect();
		Self { objects, by_address }
	}

	/// Runtime type of the object starting at `address`.
	pub fn type_at(&self, address: u64) -> Option<&TypeId> {
		self.get(address).map(|object| &object.ty)
	}

	/// Object starting at `address`.
	pub fn get(&self, address: u64) -> Option<&HeapObject> {
		self.by_address.get(&address).map(|idx| &self.objects[*idx])
	}

	/// Objects accepted by `filter`, in address order.
	pub fn objects(&self, filter: &HeapFilter) -> Result<Vec<&HeapObject>> {
		let mask = TypeMask::new(&filter.mask)?;
		Ok(self.objects.iter().filter(|object| accepts(&mask, filter, object)).collect())
	}

	/// Number of objects accepted by `filter`.
	pub fn count(&self, filter: &HeapFilter) -> Result<usize> {
		let mask = TypeMask::new(&filter.mask)?;
		Ok(self.objects.iter().filter(|object| accepts(&mask, filter, object)).count())
	}

	/// All objects in address order.
	pub fn all(&self) -> &[HeapObject] {
		&self.objects
	}

	/// Number of recorded objects.
	pub fn len(&self) -> usize {
		self.objects.len()
	}

	/// Whether the index is empty.
	pub fn is_empty(&self) -> bool {
		self.objects.is_empty()
	}
}

fn accepts(mask: &TypeMask, filter: &HeapFilter, object: &HeapObject) -> bool {
	filter.min_size.is_none_or(|min| object.size >= min) && filter.max_size.is_none_or(|max| object.size <= max) && mask.matches(object.ty.as_str())
}
