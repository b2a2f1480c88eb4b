//! Session facade tying metadata, memory, statics and the heap together.

use std::path::Path;
use std::sync::Arc;

use crate::inspect::{
	Dump, FieldDescriptor, HeapIndex, InspectError, MemoryBridge, MetadataProvider, MetadataResolver, ReadOptions, Result, StaticStorageResolver, TargetConfig,
	TypeDescriptor, TypeId, ValueInstance, ValueReader,
};

/// One introspection session over a single target.
///
/// Descriptors and static blocks are cached for the lifetime of the session;
/// all methods take `&self` and may be called from many threads.
pub struct Introspector {
	resolver: Arc<MetadataResolver>,
	statics: StaticStorageResolver,
	memory: Arc<dyn MemoryBridge>,
	heap: HeapIndex,
	options: ReadOptions,
}

impl Introspector {
	/// Create a session from its collaborators.
	pub fn new(provider: Arc<dyn MetadataProvider>, memory: Arc<dyn MemoryBridge>, config: TargetConfig) -> Result<Self> {
		let resolver = Arc::new(MetadataResolver::new(provider, config)?);
		Ok(Self {
			statics: StaticStorageResolver::new(resolver.clone()),
			resolver,
			memory,
			heap: HeapIndex::default(),
			options: ReadOptions::default(),
		})
	}

	/// Create a session over a loaded dump.
	pub fn from_dump(dump: Dump) -> Result<Self> {
		Ok(Self::new(Arc::new(dump.metadata), Arc::new(dump.memory), dump.target)?.with_heap(dump.heap))
	}

	/// Load a dump file and create a session over it.
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		Self::from_dump(Dump::open(path)?)
	}

	/// Use `heap` for runtime types and object enumeration.
	pub fn with_heap(mut self, heap: HeapIndex) -> Self {
		self.heap = heap;
		self
	}

	/// Replace the default read options.
	pub fn with_options(mut self, options: ReadOptions) -> Self {
		self.options = options;
		self
	}

	/// Default read options of this session.
	pub fn options(&self) -> &ReadOptions {
		&self.options
	}

	/// Type resolver of this session.
	pub fn resolver(&self) -> &MetadataResolver {
		&self.resolver
	}

	/// Static storage resolver of this session.
	pub fn statics(&self) -> &StaticStorageResolver {
		&self.statics
	}

	/// Heap object index.
	pub fn heap(&self) -> &HeapIndex {
		&self.heap
	}

	/// Resolve a type by qualified identity.
	pub fn resolve_type(&self, id: &TypeId) -> Result<Arc<TypeDescriptor>> {
		self.resolver.resolve(id)
	}

	/// Resolve a nested type by owner and local name.
	pub fn resolve_nested(&self, owner: &TypeId, local: &str) -> Result<Arc<TypeDescriptor>> {
		self.resolver.resolve_nested(owner, local)
	}

	/// Provider type names matching a glob mask.
	pub fn type_names(&self, mask: &str) -> Result<Vec<TypeId>> {
		self.resolver.type_names(mask)
	}

	/// Decode the value of type `id` at `address` with the session options.
	pub fn read_value(&self, address: u64, id: &TypeId) -> Result<ValueInstance> {
		self.read_value_with(address, id, &self.options)
	}

	/// Decode the value of type `id` at `address` with explicit options.
	pub fn read_value_with(&self, address: u64, id: &TypeId, options: &ReadOptions) -> Result<ValueInstance> {
		let desc = self.resolver.resolve(id)?;
		self.reader(options).read(address, &desc)
	}

	/// Decode the heap object at `address` using its runtime type.
	pub fn read_object(&self, address: u64) -> Result<ValueInstance> {
		self.read_object_with(address, &self.options)
	}

	/// Decode the heap object at `address` with explicit options.
	pub fn read_object_with(&self, address: u64, options: &ReadOptions) -> Result<ValueInstance> {
		let id = self.heap.type_at(address).cloned().ok_or(InspectError::UnknownObject { address })?;
		self.read_value_with(address, &id, options)
	}

	/// Address of static field `field` of type `id`.
	pub fn static_location(&self, id: &TypeId, field: &str) -> Result<u64> {
		let desc = self.resolver.resolve(id)?;
		self.statics.static_location(&desc, field)
	}

	/// Decode static field `field` of type `id`, initializing static storage first.
	pub fn read_static(&self, id: &TypeId, field: &str) -> Result<ValueInstance> {
		let desc = self.resolver.resolve(id)?;
		self.statics.ensure_initialized(&desc.id)?;
		let (_, found) = self.statics.find_static(&desc, field)?;
		let location = self.statics.static_location(&desc, field)?;
		let field_desc = self.resolver.resolve(&found.ty)?;
		self.reader(&self.options).read_static(location, &field_desc)
	}

	/// Field list of a composite type.
	///
	/// Instance fields come first in layout order; static fields follow,
	/// base-most declaring type first when `include_inherited` is set.
	pub fn enumerate_fields(&self, id: &TypeId, include_inherited: bool, include_static: bool) -> Result<Vec<FieldDescriptor>> {
		let desc = self.resolver.resolve(id)?;
		if !desc.is_composite() {
			return Err(InspectError::NotAComposite { type_id: desc.id.to_string() });
		}

		let mut fields: Vec<FieldDescriptor> = desc
			.instance_fields()
			.filter(|field| include_inherited || field.declared_by == desc.id)
			.cloned()
			.collect();

		if include_static {
			let mut owners = vec![desc.clone()];
			if include_inherited {
				while let Some(base) = owners.last().and_then(|last| last.base.clone()) {
					owners.push(self.resolver.resolve(&base)?);
				}
				owners.reverse();
			}
			for owner in owners {
				fields.extend(owner.static_fields().cloned());
			}
		}

		Ok(fields)
	}

	fn reader<'a>(&'a self, options: &'a ReadOptions) -> ValueReader<'a> {
		ValueReader::new(&self.resolver, &self.statics, self.memory.as_ref(), options).with_heap(&self.heap)
	}
}
