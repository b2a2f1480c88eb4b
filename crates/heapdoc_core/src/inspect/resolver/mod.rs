//! Type resolution with a single-flight descriptor cache.
//!
//! Every identity is computed at most once per resolver. Concurrent first
//! requests for the same identity block on the in-flight computation and
//! all receive the same `Arc` (or the same error). Failed computations are
//! evicted so a later call can retry.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::inspect::layout::{Storage, align_up, heap_array_header_size, layout_composite, layout_fixed_array};
use crate::inspect::typeid::{TypeExpr, parse_type_expr};
use crate::inspect::{
	ArrayDim, ArrayShape, EnumShape, InspectError, MetadataProvider, PrimitiveKind, RawKind, RawTypeInfo, Result, TargetConfig, TypeDescriptor, TypeId, TypeKind,
	TypeMask,
};

/// Canonical name of the built-in string type.
pub const STRING_TYPE: &str = "System.String";
/// Canonical name of the built-in root object type.
pub const OBJECT_TYPE: &str = "System.Object";

enum SlotState {
	InFlight,
	Ready(Arc<TypeDescriptor>),
	Failed(InspectError),
}

struct Slot {
	owner: ThreadId,
	state: Mutex<SlotState>,
	ready: Condvar,
}

impl Slot {
	fn new() -> Self {
		Self {
			owner: thread::current().id(),
			state: Mutex::new(SlotState::InFlight),
			ready: Condvar::new(),
		}
	}

	fn wait(&self, id: &TypeId) -> Result<Arc<TypeDescriptor>> {
		let mut state = self.state.lock();
		loop {
			match &*state {
				SlotState::Ready(desc) => return Ok(desc.clone()),
				SlotState::Failed(err) => return Err(err.clone()),
				SlotState::InFlight if self.owner == thread::current().id() => {
					return Err(InspectError::LayoutAssumptionViolated {
						type_id: id.to_string(),
						reason: "type depends on its own layout".to_owned(),
					});
				}
				SlotState::InFlight => self.ready.wait(&mut state),
			}
		}
	}

	fn publish(&self, outcome: &Result<Arc<TypeDescriptor>>) {
		let mut state = self.state.lock();
		*state = match outcome {
			Ok(desc) => SlotState::Ready(desc.clone()),
			Err(err) => SlotState::Failed(err.clone()),
		};
		self.ready.notify_all();
	}
}

/// Publishes the leader's outcome, including when `compute` unwinds.
struct LeaderGuard<'a> {
	resolver: &'a MetadataResolver,
	id: &'a TypeId,
	slot: &'a Arc<Slot>,
	armed: bool,
}

impl LeaderGuard<'_> {
	fn finish(mut self, outcome: &Result<Arc<TypeDescriptor>>) {
		self.armed = false;
		if let Err(err) = outcome {
			debug!(type_id = %self.id, error = %err, "type resolution failed");
			self.evict();
		}
		self.slot.publish(outcome);
	}

	fn evict(&self) {
		self.resolver.slots.remove_if(self.id, |_, current| Arc::ptr_eq(current, self.slot));
	}
}

impl Drop for LeaderGuard<'_> {
	fn drop(&mut self) {
		if !self.armed {
			return;
		}
		let err = InspectError::ResolutionAborted { type_id: self.id.to_string() };
		debug!(type_id = %self.id, "type resolution panicked");
		self.evict();
		self.slot.publish(&Err(err));
	}
}

/// Turns provider metadata into cached, laid-out type descriptors.
pub struct MetadataResolver {
	provider: Arc<dyn MetadataProvider>,
	config: TargetConfig,
	slots: DashMap<TypeId, Arc<Slot>>,
	computations: AtomicUsize,
}

impl MetadataResolver {
	/// Create a resolver over `provider` for a target with `config`.
	pub fn new(provider: Arc<dyn MetadataProvider>, config: TargetConfig) -> Result<Self> {
		config.validate()?;
		Ok(Self {
			provider,
			config,
			slots: DashMap::new(),
			computations: AtomicUsize::new(0),
		})
	}

	/// Target configuration used for layout.
	pub fn config(&self) -> &TargetConfig {
		&self.config
	}

	/// Underlying metadata provider.
	pub fn provider(&self) -> &dyn MetadataProvider {
		self.provider.as_ref()
	}

	/// Number of descriptor computations performed so far.
	pub fn computations(&self) -> usize {
		self.computations.load(Ordering::Relaxed)
	}

	/// Already-resolved descriptor, without triggering resolution.
	pub fn cached(&self, id: &TypeId) -> Option<Arc<TypeDescriptor>> {
		let slot = self.slots.get(id)?.clone();
		let state = slot.state.lock();
		match &*state {
			SlotState::Ready(desc) => Some(desc.clone()),
			_ => None,
		}
	}

	/// Resolve `id` to its descriptor.
	pub fn resolve(&self, id: &TypeId) -> Result<Arc<TypeDescriptor>> {
		let (slot, leader) = match self.slots.entry(id.clone()) {
			Entry::Occupied(entry) => (entry.get().clone(), false),
			Entry::Vacant(entry) => {
				let slot = Arc::new(Slot::new());
				entry.insert(slot.clone());
				(slot, true)
			}
		};

		if !leader {
			return slot.wait(id);
		}

		self.computations.fetch_add(1, Ordering::Relaxed);
		let guard = LeaderGuard {
			resolver: self,
			id,
			slot: &slot,
			armed: true,
		};
		let outcome = self.compute(id).map(Arc::new);
		guard.finish(&outcome);
		outcome
	}

	/// Resolve the type named `local` declared inside `owner`.
	pub fn resolve_nested(&self, owner: &TypeId, local: &str) -> Result<Arc<TypeDescriptor>> {
		let owner_desc = self.resolve(owner)?;
		let id = TypeId::nested(&owner_desc.id, local);
		let desc = self.resolve(&id)?;
		if desc.enclosing.as_ref() != Some(&owner_desc.id) {
			return Err(InspectError::TypeNotFound { type_id: id.to_string() });
		}
		Ok(desc)
	}

	/// Provider type names matching a glob mask, in provider order.
	pub fn type_names(&self, mask: &str) -> Result<Vec<TypeId>> {
		let mask = TypeMask::new(mask)?;
		Ok(self.provider.type_ids().into_iter().filter(|id| mask.matches(id.as_str())).collect())
	}

	fn compute(&self, id: &TypeId) -> Result<TypeDescriptor> {
		match parse_type_expr(id.as_str())? {
			TypeExpr::Array { element, rank, dims } => self.synthesize_array(id, &TypeId::new(element), rank, dims),
			TypeExpr::Named(name) => {
				if let Some(raw) = self.provider.lookup(id) {
					self.check_acyclic(&raw)?;
					return self.describe(raw);
				}
				builtin(name, &self.config).ok_or_else(|| InspectError::TypeNotFound { type_id: id.to_string() })
			}
		}
	}

	fn describe(&self, raw: RawTypeInfo) -> Result<TypeDescriptor> {
		let violation = |reason: String| InspectError::LayoutAssumptionViolated {
			type_id: raw.id.to_string(),
			reason,
		};
		let nested = self.provider.nested_types(&raw.id);
		let pointer = Storage::pointer(&self.config);

		let (kind, size, align, storage, layout) = match &raw.kind {
			RawKind::Primitive { primitive } => {
				let slot = primitive_storage(*primitive, &self.config);
				(TypeKind::Primitive(*primitive), slot.size, slot.align, slot, None)
			}
			RawKind::Enum { underlying, constants } => {
				if !underlying.is_integer() {
					return Err(violation(format!("enum underlying type {} is not an integer", underlying.name())));
				}
				let slot = primitive_storage(*underlying, &self.config);
				let shape = EnumShape {
					underlying: *underlying,
					constants: constants.clone(),
				};
				(TypeKind::Enum(shape), slot.size, slot.align, slot, None)
			}
			RawKind::String => (TypeKind::String, self.config.string.chars_offset, pointer.align, pointer, None),
			RawKind::Class | RawKind::Struct => {
				let is_class = matches!(raw.kind, RawKind::Class);
				let base = match &raw.base {
					Some(base_id) => {
						let base = self.resolve(base_id)?;
						let compatible = if is_class { base.kind == TypeKind::Class } else { base.kind == TypeKind::Struct };
						if !compatible {
							return Err(violation(format!("base type {base_id} is a {}", base.kind.label())));
						}
						Some(base)
					}
					None => None,
				};

				let layout = layout_composite(
					&raw,
					base.as_deref(),
					&self.config,
					&mut |ty| self.field_storage(ty),
					&mut |ty| self.static_storage(ty),
				)?;
				let (kind, storage) = if is_class {
					(TypeKind::Class, pointer)
				} else {
					(
						TypeKind::Struct,
						Storage {
							size: layout.size,
							align: layout.align,
						},
					)
				};
				(kind, layout.size, layout.align, storage, Some(layout))
			}
		};

		let (fields, static_size) = layout.map(|layout| (layout.fields, layout.static_size)).unwrap_or_default();
		debug!(type_id = %raw.id, kind = kind.label(), size, fields = fields.len(), "resolved type");

		Ok(TypeDescriptor {
			id: raw.id,
			kind,
			size,
			align,
			storage_size: storage.size,
			storage_align: storage.align,
			fields,
			base: raw.base,
			enclosing: raw.enclosing,
			nested,
			static_base: raw.static_base,
			static_size,
			static_deps: raw.static_deps,
		})
	}

	fn synthesize_array(&self, id: &TypeId, element: &TypeId, rank: u32, dims: Option<Vec<u32>>) -> Result<TypeDescriptor> {
		let element_desc = self.resolve(element)?;
		let element_storage = Storage {
			size: element_desc.storage_size,
			align: element_desc.storage_align,
		};

		let (size, align, storage, fixed) = match dims {
			None => {
				let pointer = Storage::pointer(&self.config);
				let header = heap_array_header_size(&self.config, rank)
					.and_then(|header| align_up(header, pointer.align))
					.ok_or_else(|| InspectError::LayoutAssumptionViolated {
						type_id: id.to_string(),
						reason: format!("array header for rank {rank} overflows u32"),
					})?;
				(header, pointer.align, pointer, None)
			}
			Some(dims) => {
				let footprint = layout_fixed_array(id, element_storage, &dims)?;
				let bounds = dims.iter().copied().map(ArrayDim::zero_based).collect();
				(footprint.size, footprint.align, footprint, Some(bounds))
			}
		};

		debug!(type_id = %id, element = %element_desc.id, rank, size, "synthesized array type");
		Ok(TypeDescriptor {
			id: id.clone(),
			kind: TypeKind::Array(ArrayShape {
				element: element_desc.id.clone(),
				rank,
				fixed,
			}),
			size,
			align,
			storage_size: storage.size,
			storage_align: storage.align,
			fields: Vec::new(),
			base: None,
			enclosing: None,
			nested: Vec::new(),
			static_base: None,
			static_size: 0,
			static_deps: Vec::new(),
		})
	}

	/// Bytes a field of type `ty` occupies, resolving only by-value structs.
	fn field_storage(&self, ty: &TypeId) -> Result<Storage> {
		match parse_type_expr(ty.as_str())? {
			TypeExpr::Array { dims: None, .. } => Ok(Storage::pointer(&self.config)),
			TypeExpr::Array {
				element, dims: Some(dims), ..
			} => {
				let element = self.field_storage(&TypeId::new(element))?;
				layout_fixed_array(ty, element, &dims)
			}
			TypeExpr::Named(name) => {
				let id = TypeId::new(name);
				if let Some(raw) = self.provider.lookup(&id) {
					return match raw.kind {
						RawKind::Class | RawKind::String => Ok(Storage::pointer(&self.config)),
						RawKind::Primitive { primitive } => Ok(primitive_storage(primitive, &self.config)),
						RawKind::Enum { underlying, .. } => Ok(primitive_storage(underlying, &self.config)),
						RawKind::Struct => {
							let desc = self.resolve(&id)?;
							Ok(Storage {
								size: desc.storage_size,
								align: desc.storage_align,
							})
						}
					};
				}

				match builtin(name, &self.config) {
					Some(desc) => Ok(Storage {
						size: desc.storage_size,
						align: desc.storage_align,
					}),
					None => Err(InspectError::TypeNotFound { type_id: id.to_string() }),
				}
			}
		}
	}

	/// Bytes a static slot of type `ty` occupies; never resolves a type.
	fn static_storage(&self, ty: &TypeId) -> Result<Storage> {
		match parse_type_expr(ty.as_str())? {
			TypeExpr::Array { .. } => Ok(Storage::pointer(&self.config)),
			TypeExpr::Named(name) => match self.provider.lookup(&TypeId::new(name)) {
				Some(raw) if matches!(raw.kind, RawKind::Struct) => Ok(Storage::pointer(&self.config)),
				_ => self.field_storage(ty),
			},
		}
	}

	/// Reject base-chain cycles and by-value self-embedding before any
	/// recursive resolution starts.
	fn check_acyclic(&self, root: &RawTypeInfo) -> Result<()> {
		let mut path = Vec::new();
		let mut done = HashSet::new();
		self.check_embedding(root, &mut path, &mut done)
	}

	fn check_inheritance(&self, root: &RawTypeInfo) -> Result<()> {
		let mut chain = vec![root.id.clone()];
		let mut next = root.base.clone();
		while let Some(base) = next {
			let repeated = chain.contains(&base);
			chain.push(base.clone());
			if repeated {
				return Err(InspectError::InheritanceCycle {
					chain: chain.iter().map(ToString::to_string).collect(),
				});
			}
			next = self.provider.lookup(&base).and_then(|raw| raw.base);
		}
		Ok(())
	}

	fn check_embedding(&self, raw: &RawTypeInfo, path: &mut Vec<TypeId>, done: &mut HashSet<TypeId>) -> Result<()> {
		if done.contains(&raw.id) {
			return Ok(());
		}
		if let Some(start) = path.iter().position(|id| *id == raw.id) {
			let mut cycle: Vec<String> = path[start..].iter().map(ToString::to_string).collect();
			cycle.push(raw.id.to_string());
			return Err(InspectError::LayoutAssumptionViolated {
				type_id: raw.id.to_string(),
				reason: format!("type embeds itself by value: {}", cycle.join(" -> ")),
			});
		}

		self.check_inheritance(raw)?;
		path.push(raw.id.clone());

		let mut edges: Vec<TypeId> = raw.base.iter().cloned().collect();
		for field in raw.fields.iter().filter(|field| !field.is_static) {
			if let Some(target) = self.embedded_struct(&field.ty) {
				edges.push(target);
			}
		}
		for edge in edges {
			if let Some(next) = self.provider.lookup(&edge) {
				self.check_embedding(&next, path, done)?;
			}
		}

		path.pop();
		done.insert(raw.id.clone());
		Ok(())
	}

	fn embedded_struct(&self, ty: &TypeId) -> Option<TypeId> {
		match parse_type_expr(ty.as_str()).ok()? {
			TypeExpr::Array { dims: None, .. } => None,
			TypeExpr::Array { element, .. } => self.embedded_struct(&TypeId::new(element)),
			TypeExpr::Named(name) => {
				let id = TypeId::new(name);
				let raw = self.provider.lookup(&id)?;
				matches!(raw.kind, RawKind::Struct).then_some(id)
			}
		}
	}
}

fn primitive_storage(kind: PrimitiveKind, config: &TargetConfig) -> Storage {
	Storage {
		size: kind.size(config.pointer_size),
		align: kind.align(config.pointer_size),
	}
}

/// Descriptor of a type known without a provider entry.
fn builtin(name: &str, config: &TargetConfig) -> Option<TypeDescriptor> {
	let pointer = Storage::pointer(config);
	let (id, kind, size, align, storage) = if let Some(primitive) = PrimitiveKind::from_name(name) {
		let slot = primitive_storage(primitive, config);
		(primitive.name(), TypeKind::Primitive(primitive), slot.size, slot.align, slot)
	} else if name == STRING_TYPE || name == "string" {
		(STRING_TYPE, TypeKind::String, config.string.chars_offset, pointer.align, pointer)
	} else if name == OBJECT_TYPE || name == "object" {
		// `TargetConfig::validate` rejects headers that cannot be aligned.
		let size = align_up(config.object_header_size, pointer.align)?;
		(OBJECT_TYPE, TypeKind::Class, size, pointer.align, pointer)
	} else {
		return None;
	};

	Some(TypeDescriptor {
		id: TypeId::new(id),
		kind,
		size,
		align,
		storage_size: storage.size,
		storage_align: storage.align,
		fields: Vec::new(),
		base: None,
		enclosing: None,
		nested: Vec::new(),
		static_base: None,
		static_size: 0,
		static_deps: Vec::new(),
	})
}

#[cfg(test)]
mod tests;
