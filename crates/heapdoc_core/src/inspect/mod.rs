mod bytes;
mod compression;
mod config;
mod descriptor;
mod dump;
mod engine;
mod error;
mod heap;
mod layout;
mod mask;
mod memory;
mod meta;
mod primitive;
mod reader;
mod resolver;
mod statics;
mod typeid;
mod value;

/// Bounded byte cursor over copied target memory.
pub use bytes::Cursor;
/// Dump compression detection result.
pub use compression::Compression;
/// Target ABI facts and read limits.
pub use config::{ArrayLayout, Endianness, ReadOptions, StringLayout, TargetConfig, TextEncoding};
/// Resolved type descriptors.
pub use descriptor::{ArrayDim, ArrayShape, EnumShape, FieldDescriptor, TypeDescriptor, TypeKind};
/// Offline dump loading.
pub use dump::Dump;
/// Session facade.
pub use engine::Introspector;
/// Error and result aliases.
pub use error::{InspectError, Result};
/// Heap object index and filters.
pub use heap::{HeapFilter, HeapIndex, HeapObject};
/// Field placement entry points.
pub use layout::{CompositeLayout, Storage, align_up, heap_array_header_size, layout_composite, layout_fixed_array};
/// Type-name glob masks.
pub use mask::TypeMask;
/// Raw memory access and captured snapshots.
pub use memory::{MemoryBridge, MemoryRegion, MemorySnapshot};
/// Raw provider metadata.
pub use meta::{EnumConstant, MetadataProvider, MetadataTable, RawField, RawKind, RawTypeInfo};
/// Built-in scalar kinds.
pub use primitive::PrimitiveKind;
/// Value decoding.
pub use reader::{ValueReader, element_address};
/// Single-flight type resolution.
pub use resolver::{MetadataResolver, OBJECT_TYPE, STRING_TYPE};
/// Static storage and initialization.
pub use statics::{StaticBlock, StaticStorageResolver};
/// Qualified type identity.
pub use typeid::TypeId;
/// Decoded value tree.
pub use value::{ArrayValue, EnumValue, FieldValue, ReadFailure, StringValue, TextStatus, Value, ValueInstance};
