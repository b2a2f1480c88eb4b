//! Decoding typed values out of target memory.
//!
//! Reads are tolerant below the root: a memory failure inside one field
//! becomes an [`Value::Unreadable`] entry and its siblings are still read.
//! Structural failures (unknown types, broken layouts, static init cycles)
//! abort the whole read.

use std::sync::Arc;

use tracing::trace;

use crate::inspect::bytes::{Cursor, sign_extend};
use crate::inspect::{
	FieldValue, HeapIndex, InspectError, MemoryBridge, MetadataResolver, PrimitiveKind, ReadFailure, ReadOptions, Result, StaticStorageResolver, TypeDescriptor, TypeKind,
	Value, ValueInstance,
};

mod array;
mod enums;
mod string;

pub use array::element_address;

/// Borrowed view over the collaborators needed to decode one value tree.
pub struct ValueReader<'a> {
	resolver: &'a MetadataResolver,
	statics: &'a StaticStorageResolver,
	memory: &'a dyn MemoryBridge,
	heap: Option<&'a HeapIndex>,
	options: &'a ReadOptions,
}

impl<'a> ValueReader<'a> {
	/// Create a reader without runtime type information.
	pub fn new(resolver: &'a MetadataResolver, statics: &'a StaticStorageResolver, memory: &'a dyn MemoryBridge, options: &'a ReadOptions) -> Self {
		Self {
			resolver,
			statics,
			memory,
			heap: None,
			options,
		}
	}

	/// Use `heap` to find the runtime type of referenced objects.
	pub fn with_heap(mut self, heap: &'a HeapIndex) -> Self {
		self.heap = Some(heap);
		self
	}

	/// Decode the value of type `desc` located at `address`.
	///
	/// For reference types `address` is the object start; for value types it
	/// is the start of the inline value.
	pub fn read(&self, address: u64, desc: &TypeDescriptor) -> Result<ValueInstance> {
		self.probe(address, desc)?;
		let mut path = Vec::new();
		if desc.is_reference() {
			path.push(address);
			return self.read_referent(address, desc, 0, &mut path);
		}
		self.read_slot(address, desc, 0, &mut path)
	}

	/// Decode the static slot of type `desc` at `address`.
	///
	/// Reference slots hold a pointer that is followed; struct and inline
	/// array slots hold a pointer to a boxed copy.
	pub fn read_static(&self, address: u64, desc: &TypeDescriptor) -> Result<ValueInstance> {
		let mut path = Vec::new();
		self.read_static_slot(address, desc, 0, &mut path)
	}

	fn read_static_slot(&self, address: u64, desc: &TypeDescriptor, depth: u32, path: &mut Vec<u64>) -> Result<ValueInstance> {
		if !desc.is_boxed_in_statics() {
			return self.read_slot(address, desc, depth, path);
		}

		let target = self.read_pointer(address)?;
		if target == 0 {
			return Ok(instance(None, desc, Value::Null));
		}
		if depth >= self.options.max_depth || path.contains(&target) {
			return Ok(instance(Some(target), desc, Value::Ref(target)));
		}

		trace!(address = target, type_id = %desc.id, depth, "unboxing static value");
		let data = target.wrapping_add(u64::from(self.resolver.config().object_header_size));
		path.push(target);
		let result = self.read_slot(data, desc, depth + 1, path);
		path.pop();
		result
	}

	fn probe(&self, address: u64, desc: &TypeDescriptor) -> Result<()> {
		let len = if desc.is_reference() {
			self.resolver.config().object_header_size
		} else {
			desc.size
		};
		if len > 0 {
			self.memory.read(address, len as usize)?;
		}
		Ok(())
	}

	fn read_slot(&self, address: u64, desc: &TypeDescriptor, depth: u32, path: &mut Vec<u64>) -> Result<ValueInstance> {
		let value = match &desc.kind {
			TypeKind::Primitive(kind) => self.read_primitive(address, *kind)?,
			TypeKind::Enum(shape) => self.read_enum(address, desc, shape)?,
			TypeKind::Struct => self.read_composite(address, desc, depth, path)?,
			TypeKind::Array(shape) if !shape.is_heap() => self.read_fixed_array(address, shape, depth, path)?,
			TypeKind::Class | TypeKind::String | TypeKind::Array(_) => {
				let target = self.read_pointer(address)?;
				return self.follow(target, desc, depth, path);
			}
		};
		Ok(instance(Some(address), desc, value))
	}

	fn follow(&self, target: u64, declared: &TypeDescriptor, depth: u32, path: &mut Vec<u64>) -> Result<ValueInstance> {
		if target == 0 {
			return Ok(instance(None, declared, Value::Null));
		}
		if declared.kind == TypeKind::String {
			return Ok(instance(Some(target), declared, self.read_string(target)));
		}

		let runtime = self.heap.and_then(|heap| heap.type_at(target));
		if !self.options.follow_refs || depth >= self.options.max_depth || path.contains(&target) {
			let type_name = runtime.map_or_else(|| declared.id.as_str().into(), |id| id.as_str().into());
			return Ok(ValueInstance {
				location: Some(target),
				type_name,
				value: Value::Ref(target),
			});
		}

		let desc = match runtime {
			Some(id) if *id != declared.id => match self.resolver.resolve(id) {
				Ok(desc) if desc.is_reference() => desc,
				Ok(_) | Err(_) => {
					trace!(address = target, runtime = %id, declared = %declared.id, "runtime type unusable, keeping declared type");
					self.resolver.resolve(&declared.id)?
				}
			},
			_ => self.resolver.resolve(&declared.id)?,
		};

		trace!(address = target, type_id = %desc.id, depth, "following reference");
		path.push(target);
		let result = self.read_referent(target, &desc, depth + 1, path);
		path.pop();
		result
	}

	fn read_referent(&self, address: u64, desc: &TypeDescriptor, depth: u32, path: &mut Vec<u64>) -> Result<ValueInstance> {
		let value = match &desc.kind {
			TypeKind::Class => {
				self.memory.read(address, self.resolver.config().object_header_size as usize)?;
				self.read_composite(address, desc, depth, path)?
			}
			TypeKind::String => self.read_string(address),
			TypeKind::Array(shape) if shape.is_heap() => self.read_heap_array(address, shape, depth, path)?,
			_ => return self.read_slot(address, desc, depth, path),
		};
		Ok(instance(Some(address), desc, value))
	}

	fn read_composite(&self, address: u64, desc: &TypeDescriptor, depth: u32, path: &mut Vec<u64>) -> Result<Value> {
		self.statics.ensure_initialized(&desc.id)?;

		let mut fields = Vec::with_capacity(desc.fields.len());
		for field in desc.instance_fields() {
			let field_desc = self.resolver.resolve(&field.ty)?;
			let at = address.wrapping_add(u64::from(field.offset));
			let value = tolerate(at, &field_desc, self.read_slot(at, &field_desc, depth, path))?;
			fields.push(FieldValue {
				name: field.name.clone(),
				is_static: false,
				value,
			});
		}

		if self.options.include_statics {
			for owner in self.type_chain(desc)? {
				for field in owner.static_fields() {
					let field_desc = self.resolver.resolve(&field.ty)?;
					let value = match owner.static_base {
						Some(base) => {
							let at = base.wrapping_add(u64::from(field.offset));
							tolerate(at, &field_desc, self.read_static_slot(at, &field_desc, depth, path))?
						}
						None => unreadable(
							None,
							&field_desc,
							0,
							field.size as usize,
							InspectError::NoStaticStorage { type_id: owner.id.to_string() },
						),
					};
					fields.push(FieldValue {
						name: field.name.clone(),
						is_static: true,
						value,
					});
				}
			}
		}

		Ok(Value::Composite(fields))
	}

	/// `desc` and its bases, base-most first.
	fn type_chain(&self, desc: &TypeDescriptor) -> Result<Vec<Arc<TypeDescriptor>>> {
		let mut chain = vec![self.resolver.resolve(&desc.id)?];
		while let Some(base) = chain.last().and_then(|last| last.base.clone()) {
			chain.push(self.resolver.resolve(&base)?);
		}
		chain.reverse();
		Ok(chain)
	}

	fn read_primitive(&self, address: u64, kind: PrimitiveKind) -> Result<Value> {
		let config = self.resolver.config();
		let width = kind.size(config.pointer_size) as usize;
		let bytes = self.memory.read(address, width)?;
		let mut cursor = Cursor::new(&bytes, address, config.endianness);
		let raw = cursor.read_uint(width)?;

		Ok(match kind {
			PrimitiveKind::Bool => Value::Bool(raw != 0),
			PrimitiveKind::Char8 | PrimitiveKind::Char16 => Value::Char(raw as u32),
			PrimitiveKind::F32 => Value::F32(f32::from_bits(raw as u32)),
			PrimitiveKind::F64 => Value::F64(f64::from_bits(raw)),
			kind if kind.is_signed() => Value::I64(sign_extend(raw, width)),
			_ => Value::U64(raw),
		})
	}

	fn read_pointer(&self, address: u64) -> Result<u64> {
		let config = self.resolver.config();
		let bytes = self.memory.read(address, config.pointer_size)?;
		Cursor::new(&bytes, address, config.endianness).read_ptr(config.pointer_size)
	}

	fn read_u32(&self, address: u64) -> Result<u32> {
		let bytes = self.memory.read(address, 4)?;
		Cursor::new(&bytes, address, self.resolver.config().endianness).read_u32()
	}
}

fn instance(location: Option<u64>, desc: &TypeDescriptor, value: Value) -> ValueInstance {
	ValueInstance {
		location,
		type_name: desc.id.as_str().into(),
		value,
	}
}

fn unreadable(location: Option<u64>, desc: &TypeDescriptor, address: u64, len: usize, err: InspectError) -> ValueInstance {
	instance(
		location,
		desc,
		Value::Unreadable(ReadFailure {
			address,
			len,
			reason: err.to_string(),
		}),
	)
}

/// Turn a memory failure inside a child value into an `Unreadable` entry.
fn tolerate(location: u64, desc: &TypeDescriptor, result: Result<ValueInstance>) -> Result<ValueInstance> {
	match result {
		Ok(value) => Ok(value),
		Err(err @ InspectError::MemoryAccess { address, len }) => {
			trace!(address, len, type_id = %desc.id, "child value unreadable");
			Ok(unreadable(Some(location), desc, address, len, err))
		}
		Err(err) => Err(err),
	}
}

#[cfg(test)]
mod tests;
