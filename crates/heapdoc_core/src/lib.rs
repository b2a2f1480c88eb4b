//! Public library API for resolving managed type layouts and decoding values
//! out of target process memory.

/// Type resolution, layout, static storage, value reading and dump loading.
pub mod inspect;

pub use inspect::{Dump, InspectError, Introspector, ReadOptions, Result, TargetConfig, TypeId, Value, ValueInstance};
