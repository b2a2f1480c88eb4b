//! Field placement for composite, array and scalar types.
//!
//! Layout is computed from raw metadata plus storage callbacks that report
//! how many bytes (and which alignment) a field of a given type occupies.
//! Reference-typed fields occupy one pointer, so layout never needs the
//! descriptor of a referenced class. Static fields of struct or inline-array
//! type are boxed: the static block holds one pointer to a boxed copy, so a
//! static slot never depends on the layout of its own declaring type.

use crate::inspect::{FieldDescriptor, InspectError, RawKind, RawTypeInfo, Result, TargetConfig, TypeDescriptor, TypeId};

/// Bytes and alignment a value occupies inside its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Storage {
	/// Occupied bytes.
	pub size: u32,
	/// Required alignment.
	pub align: u32,
}

impl Storage {
	/// Pointer-sized slot.
	pub fn pointer(config: &TargetConfig) -> Self {
		let size = config.pointer_size as u32;
		Self { size, align: size }
	}
}

/// Computed placement of a class or struct.
#[derive(Debug, Clone)]
pub struct CompositeLayout {
	/// Instance fields (inherited then declared), then declared statics.
	pub fields: Vec<FieldDescriptor>,
	/// Instance size.
	pub size: u32,
	/// Instance alignment.
	pub align: u32,
	/// Size of the static storage block.
	pub static_size: u32,
}

/// Round `value` up to a multiple of `align`, or `None` past `u32::MAX`.
pub fn align_up(value: u32, align: u32) -> Option<u32> {
	if align <= 1 {
		return Some(value);
	}
	value.div_ceil(align).checked_mul(align)
}

/// Lay out a class or struct.
///
/// `base` must already be resolved; its instance fields are copied first so
/// base fields always precede the derived type's own fields. `storage` sizes
/// instance fields and `static_storage` sizes slots in the static block.
pub fn layout_composite(
	raw: &RawTypeInfo,
	base: Option<&TypeDescriptor>,
	config: &TargetConfig,
	storage: &mut dyn FnMut(&TypeId) -> Result<Storage>,
	static_storage: &mut dyn FnMut(&TypeId) -> Result<Storage>,
) -> Result<CompositeLayout> {
	let violation = |reason: String| InspectError::LayoutAssumptionViolated {
		type_id: raw.id.to_string(),
		reason,
	};

	if let Some(declared) = raw.align
		&& !declared.is_power_of_two()
	{
		return Err(violation(format!("declared alignment {declared} is not a power of two")));
	}

	let is_class = matches!(raw.kind, RawKind::Class);
	let (mut end, mut align) = match base {
		Some(base) => (base.size, base.align),
		None if is_class => (config.object_header_size, config.pointer_size as u32),
		None => (0, 1),
	};

	let mut fields: Vec<FieldDescriptor> = base.map(|base| base.instance_fields().cloned().collect()).unwrap_or_default();

	for field in raw.fields.iter().filter(|field| !field.is_static) {
		let slot = storage(&field.ty)?;
		let offset = place_field(field.offset, end, slot, raw.align).map_err(|reason| violation(format!("field {}: {reason}", field.name)))?;

		end = offset.checked_add(slot.size).ok_or_else(|| violation(format!("field {} overflows u32 offsets", field.name)))?;
		align = align.max(slot.align);
		fields.push(FieldDescriptor {
			name: field.name.clone(),
			ty: field.ty.clone(),
			offset,
			size: slot.size,
			is_static: false,
			declared_by: raw.id.clone(),
		});
	}

	if let Some(declared) = raw.align {
		align = declared;
	}

	let mut size = align_up(end, align).ok_or_else(|| violation(format!("instance size {end} overflows u32 when aligned to {align}")))?;
	if let Some(declared) = raw.size {
		if declared < end {
			return Err(violation(format!("declared size {declared} is smaller than computed end {end}")));
		}
		size = declared;
	}

	let mut static_end = 0_u32;
	for field in raw.fields.iter().filter(|field| field.is_static) {
		let slot = static_storage(&field.ty)?;
		let offset = place_field(field.offset, static_end, slot, None).map_err(|reason| violation(format!("static field {}: {reason}", field.name)))?;

		let slot_end = offset.checked_add(slot.size).ok_or_else(|| violation(format!("static field {} overflows u32 offsets", field.name)))?;
		static_end = static_end.max(slot_end);
		fields.push(FieldDescriptor {
			name: field.name.clone(),
			ty: field.ty.clone(),
			offset,
			size: slot.size,
			is_static: true,
			declared_by: raw.id.clone(),
		});
	}

	Ok(CompositeLayout {
		fields,
		size,
		align,
		static_size: static_end,
	})
}

fn place_field(explicit: Option<u32>, end: u32, slot: Storage, packed: Option<u32>) -> std::result::Result<u32, String> {
	let Some(offset) = explicit else {
		return align_up(end, slot.align).ok_or_else(|| format!("aligning offset {end} to {} overflows u32", slot.align));
	};

	if offset < end {
		return Err(format!("offset {offset} overlaps previous field ending at {end}"));
	}

	let required = packed.map_or(slot.align, |packed| packed.min(slot.align)).max(1);
	if offset % required != 0 {
		return Err(format!("offset {offset} is not aligned to {required}"));
	}

	Ok(offset)
}

/// Footprint of an inline array: product of dimensions times element size.
pub fn layout_fixed_array(id: &TypeId, element: Storage, dims: &[u32]) -> Result<Storage> {
	let overflow = || InspectError::LayoutAssumptionViolated {
		type_id: id.to_string(),
		reason: "array footprint overflows u32".to_owned(),
	};

	let count = dims.iter().try_fold(1_u32, |acc, dim| acc.checked_mul(*dim)).ok_or_else(overflow)?;
	let size = count.checked_mul(element.size).ok_or_else(overflow)?;
	Ok(Storage { size, align: element.align })
}

/// Fixed header bytes of a heap array of the given rank.
pub fn heap_array_header_size(config: &TargetConfig, rank: u32) -> Option<u32> {
	config.array.data_offset(rank)
}
