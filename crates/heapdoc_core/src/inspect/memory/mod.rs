use tracing::trace;

use crate::inspect::{InspectError, Result};

/// Raw byte access to the target's address space.
///
/// Calls are synchronous and may block; the engine neither retries nor
/// times them out.
pub trait MemoryBridge: Send + Sync {
	/// Fill `buf` with the bytes starting at `address`.
	fn read_into(&self, address: u64, buf: &mut [u8]) -> Result<()>;

	/// Read `len` bytes starting at `address`.
	fn read(&self, address: u64, len: usize) -> Result<Vec<u8>> {
		let mut buf = vec![0_u8; len];
		self.read_into(address, &mut buf)?;
		Ok(buf)
	}
}

/// One captured range of target memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion {
	/// Target address of the first byte.
	pub base: u64,
	/// Captured bytes.
	pub bytes: Vec<u8>,
}

impl MemoryRegion {
	/// Exclusive end address.
	pub fn end(&self) -> u64 {
		self.base.saturating_add(self.bytes.len() as u64)
	}
}

/// Range index over captured memory regions.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshot {
	starts: Vec<u64>,
	regions: Vec<MemoryRegion>,
}

impl MemorySnapshot {
	/// Build a sorted index; empty regions are dropped.
	pub fn from_regions(mut regions: Vec<MemoryRegion>) -> Self {
		regions.retain(|region| !region.bytes.is_empty());
		regions.sort_by_key(|region| region.base);
		let starts = regions.iter().map(|region| region.base).collect();
		Self { starts, regions }
	}

	/// Find the region containing `address`.
	pub fn region_at(&self, address: u64) -> Option<&MemoryRegion> {
		let idx = self.starts.partition_point(|start| *start <= address);
		if idx == 0 {
			return None;
		}

		let region = &self.regions[idx - 1];
		if address >= region.end() {
			return None;
		}
		Some(region)
	}

	/// All regions in address order.
	pub fn regions(&self) -> &[MemoryRegion] {
		&self.regions
	}

	/// Total captured bytes.
	pub fn captured_bytes(&self) -> usize {
		self.regions.iter().map(|region| region.bytes.len()).sum()
	}
}

impl MemoryBridge for MemorySnapshot {
	fn read_into(&self, address: u64, buf: &mut [u8]) -> Result<()> {
		let len = buf.len();
		trace!(address, len, "snapshot read");
		let fail = || InspectError::MemoryAccess { address, len };

		let mut filled = 0_usize;
		while filled < len {
			let at = address.checked_add(filled as u64).ok_or_else(fail)?;
			let region = self.region_at(at).ok_or_else(fail)?;
			let start = (at - region.base) as usize;
			let take = (len - filled).min(region.bytes.len() - start);
			buf[filled..filled + take].copy_from_slice(&region.bytes[start..start + take]);
			filled += take;
		}

		Ok(())
	}
}
