/// Heap object enumeration command.
pub mod heap;
/// Dump-level information command.
pub mod info;
/// Type layout command.
pub mod layout;
/// Value rendering helpers.
pub mod print;
/// Value read command.
pub mod read;
/// Static field command.
pub mod statics;
/// Type listing command.
pub mod types;
/// Shared argument parsing and JSON helpers.
pub mod util;
