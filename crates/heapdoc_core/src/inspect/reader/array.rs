use tracing::debug;

use super::{ValueReader, tolerate};
use crate::inspect::bytes::{Cursor, sign_extend};
use crate::inspect::{ArrayDim, ArrayShape, ArrayValue, InspectError, Result, TypeDescriptor, Value, ValueInstance};

/// Target address of the element at row-major `flat_index`.
pub fn element_address(data_start: u64, flat_index: usize, element_size: u32) -> Option<u64> {
	let offset = (flat_index as u64).checked_mul(u64::from(element_size))?;
	data_start.checked_add(offset)
}

fn bounds_overflow(rank: u32) -> InspectError {
	InspectError::InvalidTargetLayout {
		reason: format!("array header for rank {rank} overflows u32 offsets"),
	}
}

fn element_count(dims: &[ArrayDim]) -> usize {
	dims.iter().fold(1_usize, |acc, dim| acc.saturating_mul(dim.length as usize))
}

impl ValueReader<'_> {
	/// Heap array: bounds come from the object header.
	pub(super) fn read_heap_array(&self, address: u64, shape: &ArrayShape, depth: u32, path: &mut Vec<u64>) -> Result<Value> {
		let layout = self.resolver.config().array;
		let dims = if shape.rank <= 1 {
			let count = self.read_u32(address.wrapping_add(u64::from(layout.count_offset)))?;
			vec![ArrayDim::zero_based(count)]
		} else {
			self.read_bounds(address, shape.rank)?
		};

		let data_offset = layout.data_offset(shape.rank).ok_or_else(|| bounds_overflow(shape.rank))?;
		let data = address.wrapping_add(u64::from(data_offset));
		self.read_elements(data, shape, dims, depth, path)
	}

	/// Inline array: bounds are part of the type.
	pub(super) fn read_fixed_array(&self, address: u64, shape: &ArrayShape, depth: u32, path: &mut Vec<u64>) -> Result<Value> {
		let dims = shape.fixed.clone().unwrap_or_default();
		self.read_elements(address, shape, dims, depth, path)
	}

	fn read_bounds(&self, address: u64, rank: u32) -> Result<Vec<ArrayDim>> {
		let config = self.resolver.config();
		let entry = config.array.rank_size;
		let table_len = config.array.bounds_table_len(rank).ok_or_else(|| bounds_overflow(rank))? as usize;
		let table_start = address.wrapping_add(u64::from(config.array.rank_offset));
		let bytes = self.memory.read(table_start, table_len)?;
		let mut cursor = Cursor::new(&bytes, table_start, config.endianness);

		let mut lengths = Vec::with_capacity(rank as usize);
		for _ in 0..rank {
			lengths.push(cursor.read_uint(entry as usize)? as u32);
		}

		let mut dims = Vec::with_capacity(rank as usize);
		for length in lengths {
			let lower_bound = sign_extend(cursor.read_uint(entry as usize)?, entry as usize) as i32;
			dims.push(ArrayDim { length, lower_bound });
		}
		Ok(dims)
	}

	fn read_elements(&self, data: u64, shape: &ArrayShape, dims: Vec<ArrayDim>, depth: u32, path: &mut Vec<u64>) -> Result<Value> {
		let element = self.resolver.resolve(&shape.element)?;
		let total = element_count(&dims);
		let take = total.min(self.options.max_array_elems);
		if take < total {
			debug!(element = %element.id, total, take, "array truncated");
		}

		let mut elements = Vec::with_capacity(take);
		for idx in 0..take {
			let Some(at) = element_address(data, idx, element.storage_size) else {
				break;
			};
			elements.push(self.read_element(at, &element, depth, path)?);
		}

		Ok(Value::Array(ArrayValue { dims, elements, total }))
	}

	fn read_element(&self, at: u64, element: &TypeDescriptor, depth: u32, path: &mut Vec<u64>) -> Result<ValueInstance> {
		tolerate(at, element, self.read_slot(at, element, depth, path))
	}
}
