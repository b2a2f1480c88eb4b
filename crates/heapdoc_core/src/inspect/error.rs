use std::sync::Arc;

use thiserror::Error;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, InspectError>;

/// Errors produced while resolving types and reading target memory.
///
/// The enum is `Clone` so a single failed resolution can be handed to every
/// caller that waited on it.
#[derive(Debug, Clone, Error)]
pub enum InspectError {
	/// Filesystem or stream IO failure.
	#[error("io: {0}")]
	Io(Arc<std::io::Error>),
	/// Dump document could not be parsed.
	#[error("dump parse: {0}")]
	DumpParse(Arc<serde_json::Error>),
	/// Dump region carried malformed hex bytes.
	#[error("dump region at 0x{base:016x} has invalid hex bytes: {reason}")]
	DumpRegionBytes {
		/// Region base address.
		base: u64,
		/// Decoder message.
		reason: String,
	},
	/// Dump stream started with neither JSON nor a zstd frame.
	#[error("unsupported dump encoding (magic={magic:?})")]
	UnknownDumpMagic {
		/// First up-to-4 bytes of the stream.
		magic: [u8; 4],
	},
	/// Decompression output exceeded configured safety limit.
	#[error("decompressed dump exceeded limit {limit} bytes")]
	DumpTooLarge {
		/// Maximum allowed output bytes.
		limit: usize,
	},
	/// Neither built-ins nor the metadata provider know the type.
	#[error("type not found: {type_id}")]
	TypeNotFound {
		/// Requested type identity.
		type_id: String,
	},
	/// Metadata table declares the same identity twice.
	#[error("duplicate type entry: {type_id}")]
	DuplicateType {
		/// Repeated type identity.
		type_id: String,
	},
	/// Base-type chain revisits a type.
	#[error("inheritance cycle: {}", chain.join(" -> "))]
	InheritanceCycle {
		/// Types visited in order, ending with the repeated one.
		chain: Vec<String>,
	},
	/// Static initializer dependencies form a cycle.
	#[error("static initializer cycle: {}", chain.join(" -> "))]
	StaticInitCycle {
		/// Types visited in order, ending with the repeated one.
		chain: Vec<String>,
	},
	/// Target memory could not be read.
	#[error("memory access failed at 0x{address:016x} ({len} bytes)")]
	MemoryAccess {
		/// Requested start address.
		address: u64,
		/// Requested byte count.
		len: usize,
	},
	/// Declared size, alignment or offsets disagree with the computed layout.
	#[error("layout assumption violated in {type_id}: {reason}")]
	LayoutAssumptionViolated {
		/// Type whose layout failed validation.
		type_id: String,
		/// Human-readable description of the mismatch.
		reason: String,
	},
	/// Enum value has no symbolic name.
	#[error("enum {type_id} has no constant for value {value}")]
	EnumValueUnmapped {
		/// Enum type identity.
		type_id: String,
		/// Raw underlying value.
		value: i64,
	},
	/// Named field does not exist on the type.
	#[error("field {field} not found on {type_id}")]
	FieldNotFound {
		/// Owning type identity.
		type_id: String,
		/// Requested field name.
		field: String,
	},
	/// Type declares static fields but the metadata gave no storage base.
	#[error("type {type_id} has no static storage base")]
	NoStaticStorage {
		/// Declaring type identity.
		type_id: String,
	},
	/// Operation needs a composite type.
	#[error("type {type_id} is not a class or struct")]
	NotAComposite {
		/// Offending type identity.
		type_id: String,
	},
	/// Heap index has no object starting at the address.
	#[error("no heap object at 0x{address:016x}")]
	UnknownObject {
		/// Requested object address.
		address: u64,
	},
	/// Type expression syntax is invalid.
	#[error("invalid type expression: {expr}")]
	InvalidTypeExpr {
		/// Original expression text.
		expr: String,
	},
	/// Glob mask could not be compiled.
	#[error("invalid mask {mask:?}: {reason}")]
	InvalidMask {
		/// Original mask text.
		mask: String,
		/// Pattern compiler message.
		reason: String,
	},
	/// Target pointer size is not 4 or 8.
	#[error("unsupported pointer size {size}")]
	UnsupportedPointerSize {
		/// Configured pointer size.
		size: usize,
	},
	/// The computation another caller was waiting on panicked.
	#[error("resolution of {type_id} was aborted")]
	ResolutionAborted {
		/// Identity being resolved.
		type_id: String,
	},
	/// Target header layout cannot be decoded.
	#[error("unsupported target layout: {reason}")]
	InvalidTargetLayout {
		/// What is wrong with the configured layout.
		reason: String,
	},
	/// CLI address argument was invalid.
	#[error("invalid address literal: {value}")]
	InvalidAddressLiteral {
		/// User-provided literal.
		value: String,
	},
}

impl From<std::io::Error> for InspectError {
	fn from(err: std::io::Error) -> Self {
		Self::Io(Arc::new(err))
	}
}

impl From<serde_json::Error> for InspectError {
	fn from(err: serde_json::Error) -> Self {
		Self::DumpParse(Arc::new(err))
	}
}

impl InspectError {
	/// Whether the error describes an untrustworthy type model rather than
	/// an unreadable piece of memory.
	pub fn is_structural(&self) -> bool {
		matches!(
			self,
			Self::TypeNotFound { .. }
				| Self::InheritanceCycle { .. }
				| Self::StaticInitCycle { .. }
				| Self::LayoutAssumptionViolated { .. }
				| Self::InvalidTypeExpr { .. }
				| Self::NoStaticStorage { .. }
				| Self::UnsupportedPointerSize { .. }
				| Self::InvalidTargetLayout { .. }
				| Self::ResolutionAborted { .. }
		)
	}
}
