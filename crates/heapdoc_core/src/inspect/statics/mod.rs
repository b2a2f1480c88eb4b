//! Static storage blocks and once-per-type static initialization.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::inspect::{FieldDescriptor, InspectError, MetadataResolver, Result, TypeDescriptor, TypeId};

/// Type-wide storage of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticBlock {
	/// Declaring type.
	pub type_id: TypeId,
	/// Target address of the block, when the type has one.
	pub base: Option<u64>,
	/// Block size in bytes.
	pub size: u32,
	/// Static fields in declaration order.
	pub fields: Vec<FieldDescriptor>,
}

impl StaticBlock {
	fn from_descriptor(desc: &TypeDescriptor) -> Self {
		Self {
			type_id: desc.id.clone(),
			base: desc.static_base,
			size: desc.static_size,
			fields: desc.static_fields().cloned().collect(),
		}
	}
}

enum InitState {
	Resolving(ThreadId),
	Initialized(Arc<StaticBlock>),
}

/// Resolves static field addresses and runs per-type static initialization
/// exactly once, dependencies first.
pub struct StaticStorageResolver {
	resolver: Arc<MetadataResolver>,
	states: Mutex<HashMap<TypeId, InitState>>,
	changed: Condvar,
	log: Mutex<Vec<TypeId>>,
}

impl StaticStorageResolver {
	/// Create a static resolver on top of a type resolver.
	pub fn new(resolver: Arc<MetadataResolver>) -> Self {
		Self {
			resolver,
			states: Mutex::new(HashMap::new()),
			changed: Condvar::new(),
			log: Mutex::new(Vec::new()),
		}
	}

	/// Types in the order their static initialization completed.
	pub fn initialization_log(&self) -> Vec<TypeId> {
		self.log.lock().clone()
	}

	/// Whether `id` finished static initialization.
	pub fn is_initialized(&self, id: &TypeId) -> bool {
		matches!(self.states.lock().get(id), Some(InitState::Initialized(_)))
	}

	/// Initialize the static storage of `id` and everything it depends on.
	pub fn ensure_initialized(&self, id: &TypeId) -> Result<Arc<StaticBlock>> {
		if let Some(InitState::Initialized(block)) = self.states.lock().get(id) {
			return Ok(block.clone());
		}

		self.check_acyclic(id)?;
		let mut chain = Vec::new();
		self.initialize(id, &mut chain)
	}

	/// Address of static field `field`, searching the declaring type and then its bases.
	pub fn static_location(&self, desc: &TypeDescriptor, field: &str) -> Result<u64> {
		let (owner, found) = self.find_static(desc, field)?;
		let base = owner.static_base.ok_or_else(|| InspectError::NoStaticStorage {
			type_id: owner.id.to_string(),
		})?;
		Ok(base.wrapping_add(u64::from(found.offset)))
	}

	/// Static field `field` and the type that declares it.
	pub fn find_static(&self, desc: &TypeDescriptor, field: &str) -> Result<(Arc<TypeDescriptor>, FieldDescriptor)> {
		let mut current = self.resolver.resolve(&desc.id)?;
		loop {
			let hit = current.static_fields().find(|item| item.name.as_ref() == field).cloned();
			if let Some(found) = hit {
				return Ok((current, found));
			}
			match current.base.clone() {
				Some(base) => current = self.resolver.resolve(&base)?,
				None => {
					return Err(InspectError::FieldNotFound {
						type_id: desc.id.to_string(),
						field: field.to_owned(),
					});
				}
			}
		}
	}

	fn initialize(&self, id: &TypeId, chain: &mut Vec<TypeId>) -> Result<Arc<StaticBlock>> {
		let current = thread::current().id();
		{
			let mut states = self.states.lock();
			loop {
				match states.get(id) {
					Some(InitState::Initialized(block)) => return Ok(block.clone()),
					Some(InitState::Resolving(owner)) if *owner == current => {
						let mut cycle: Vec<String> = chain.iter().map(ToString::to_string).collect();
						cycle.push(id.to_string());
						return Err(InspectError::StaticInitCycle { chain: cycle });
					}
					Some(InitState::Resolving(_)) => self.changed.wait(&mut states),
					None => {
						states.insert(id.clone(), InitState::Resolving(current));
						break;
					}
				}
			}
		}

		chain.push(id.clone());
		let outcome = self.run_initializer(id, chain);
		chain.pop();

		let mut states = self.states.lock();
		match outcome {
			Ok(block) => {
				states.insert(id.clone(), InitState::Initialized(block.clone()));
				self.log.lock().push(id.clone());
				self.changed.notify_all();
				debug!(type_id = %id, base = ?block.base, fields = block.fields.len(), "static storage initialized");
				Ok(block)
			}
			Err(err) => {
				states.remove(id);
				self.changed.notify_all();
				Err(err)
			}
		}
	}

	fn run_initializer(&self, id: &TypeId, chain: &mut Vec<TypeId>) -> Result<Arc<StaticBlock>> {
		let desc = self.resolver.resolve(id)?;
		for dep in dependencies(&desc) {
			self.initialize(dep, chain)?;
		}
		Ok(Arc::new(StaticBlock::from_descriptor(&desc)))
	}

	/// Fail fast on dependency cycles using metadata only.
	fn check_acyclic(&self, root: &TypeId) -> Result<()> {
		let mut path = Vec::new();
		let mut done = Vec::new();
		self.visit(root, &mut path, &mut done)
	}

	fn visit(&self, id: &TypeId, path: &mut Vec<TypeId>, done: &mut Vec<TypeId>) -> Result<()> {
		if done.contains(id) {
			return Ok(());
		}
		if let Some(start) = path.iter().position(|item| item == id) {
			let mut chain: Vec<String> = path[start..].iter().map(ToString::to_string).collect();
			chain.push(id.to_string());
			return Err(InspectError::StaticInitCycle { chain });
		}

		let Some(raw) = self.resolver.provider().lookup(id) else {
			done.push(id.clone());
			return Ok(());
		};

		path.push(id.clone());
		for dep in raw.base.iter().chain(&raw.static_deps) {
			self.visit(dep, path, done)?;
		}
		path.pop();
		done.push(id.clone());
		Ok(())
	}
}

fn dependencies(desc: &TypeDescriptor) -> impl Iterator<Item = &TypeId> {
	desc.base.iter().chain(&desc.static_deps)
}
