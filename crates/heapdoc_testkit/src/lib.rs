//! Shared test helpers for workspace crates.
//!
//! The `managedapp` fixture models a small managed program captured on a
//! 64-bit runtime: a `TestClass` instance deriving from `TestClassBase`, an
//! `int[]`, a `float[2,2,2]`, strings, a nested class, an enum and two
//! static storage blocks.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};

/// Fixture object addresses.
pub mod addr {
	/// `managedapp.TestClass` instance.
	pub const TEST_CLASS: u64 = 0x1000;
	/// `int[4]` referenced by `TestClass.intArray`.
	pub const INT_ARRAY: u64 = 0x2000;
	/// `float[2,2,2]` referenced by `TestClass.floatArray`.
	pub const FLOAT_ARRAY: u64 = 0x3000;
	/// `"Hello"` referenced by `TestClass.strField`.
	pub const HELLO: u64 = 0x4000;
	/// `managedapp.Class1` referenced by `TestClass.class1Field`.
	pub const CLASS1: u64 = 0x5000;
	/// `managedapp.Class1.Nested` instance.
	pub const NESTED: u64 = 0x6000;
	/// Static block of `managedapp.TestClass`.
	pub const TEST_CLASS_STATICS: u64 = 0x7000;
	/// `"staticField"` referenced by `TestClass.staticStrField`.
	pub const STATIC_STRING: u64 = 0x7100;
	/// Static block of `managedapp.Program`.
	pub const PROGRAM_STATICS: u64 = 0x7800;
}

const METHOD_TABLE: u64 = 0x7ff0_0000_0100;

static NEXT_TEMP: AtomicUsize = AtomicUsize::new(0);

/// Resolve the workspace root path.
pub fn workspace_root() -> PathBuf {
	let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
	manifest_dir
		.join("..")
		.join("..")
		.canonicalize()
		.unwrap_or_else(|_| manifest_dir.join("..").join(".."))
}

/// Resolve the workspace target directory.
pub fn target_dir() -> PathBuf {
	std::env::var_os("CARGO_TARGET_DIR")
		.map(PathBuf::from)
		.unwrap_or_else(|| workspace_root().join("target"))
}

/// Resolve a generated fixture path under `<target>/heapdoc-fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
	target_dir().join("heapdoc-fixtures").join(name)
}

/// Write `bytes` as fixture `name` and return its path.
///
/// The file is written under a temporary name and renamed into place so
/// parallel tests never observe a partial fixture.
pub fn write_fixture(name: &str, bytes: &[u8]) -> PathBuf {
	let path = fixture_path(name);
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).expect("create fixture dir");
	}
	let serial = NEXT_TEMP.fetch_add(1, Ordering::Relaxed);
	let temp = path.with_extension(format!("{}.{serial}.tmp", std::process::id()));
	fs::write(&temp, bytes).expect("write fixture");
	fs::rename(&temp, &path).expect("publish fixture");
	path
}

/// Write the managedapp dump as plain JSON and return its path.
pub fn managedapp_path() -> PathBuf {
	let text = serde_json::to_vec_pretty(&managedapp_dump()).expect("serialize fixture");
	write_fixture("managedapp.json", &text)
}

/// Little-endian byte image of one object or storage block.
#[derive(Debug, Clone)]
pub struct RegionBuilder {
	base: u64,
	bytes: Vec<u8>,
}

impl RegionBuilder {
	/// Zero-filled region of `len` bytes at `base`.
	pub fn new(base: u64, len: usize) -> Self {
		Self { base, bytes: vec![0; len] }
	}

	/// Zero-filled managed object whose first word is a method-table pointer.
	pub fn object(base: u64, len: usize) -> Self {
		Self::new(base, len).u64(0, METHOD_TABLE)
	}

	fn put(mut self, offset: usize, raw: &[u8]) -> Self {
		let end = offset + raw.len();
		if end > self.bytes.len() {
			self.bytes.resize(end, 0);
		}
		self.bytes[offset..end].copy_from_slice(raw);
		self
	}

	/// Write a `u16`.
	pub fn u16(self, offset: usize, value: u16) -> Self {
		self.put(offset, &value.to_le_bytes())
	}

	/// Write a `u32`.
	pub fn u32(self, offset: usize, value: u32) -> Self {
		self.put(offset, &value.to_le_bytes())
	}

	/// Write an `i32`.
	pub fn i32(self, offset: usize, value: i32) -> Self {
		self.put(offset, &value.to_le_bytes())
	}

	/// Write a `u64`.
	pub fn u64(self, offset: usize, value: u64) -> Self {
		self.put(offset, &value.to_le_bytes())
	}

	/// Write an `f32`.
	pub fn f32(self, offset: usize, value: f32) -> Self {
		self.put(offset, &value.to_le_bytes())
	}

	/// Write UTF-16 code units.
	pub fn utf16(self, offset: usize, text: &str) -> Self {
		let raw: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
		self.put(offset, &raw)
	}

	/// Target address of the first byte.
	pub fn base(&self) -> u64 {
		self.base
	}

	/// Keep only the first `len` bytes, simulating a partially captured object.
	pub fn truncate(mut self, len: usize) -> Self {
		self.bytes.truncate(len);
		self
	}

	/// Dump record `{ "base", "bytes" }`.
	pub fn to_json(&self) -> Value {
		json!({ "base": self.base, "bytes": hex::encode(&self.bytes) })
	}
}

/// Managed string object: length at +8, UTF-16 code units at +12.
pub fn string_object(base: u64, text: &str) -> RegionBuilder {
	let units = text.encode_utf16().count();
	let len = (12 + units * 2 + 2).div_ceil(8) * 8;
	RegionBuilder::object(base, len).u32(8, units as u32).utf16(12, text)
}

fn field(name: &str, ty: &str) -> Value {
	json!({ "name": name, "type": ty })
}

fn static_field(name: &str, ty: &str) -> Value {
	json!({ "name": name, "type": ty, "static": true })
}

/// Type records of the managedapp fixture.
pub fn managedapp_types() -> Value {
	let days: Vec<Value> = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]
		.iter()
		.zip(1..)
		.map(|(name, value): (&&str, i64)| json!({ "name": name, "value": value }))
		.collect();

	json!([
		{ "id": "managedapp.Class1", "kind": "class", "fields": [field("Field1", "System.Int32")] },
		{
			"id": "managedapp.Class1.Nested",
			"kind": "class",
			"enclosing": "managedapp.Class1",
			"fields": [field("Field1", "System.Int64")]
		},
		{
			"id": "managedapp.TestClassBase",
			"kind": "class",
			"base": "System.Object",
			"fields": [field("longField", "System.Int64"), field("baseIntField", "System.Int32")]
		},
		{
			"id": "managedapp.TestClass",
			"kind": "class",
			"base": "managedapp.TestClassBase",
			"static_base": addr::TEST_CLASS_STATICS,
			"fields": [
				field("charField", "System.Char"),
				field("shortField", "System.Int16"),
				field("intArray", "System.Int32[]"),
				field("floatArray", "System.Single[,,]"),
				field("strField", "System.String"),
				field("class1Field", "managedapp.Class1"),
				field("daysField", "managedapp.Days"),
				static_field("staticStrField", "System.String")
			]
		},
		{ "id": "managedapp.Days", "kind": { "enum": { "underlying": "i32", "constants": days } } },
		{
			"id": "managedapp.Program",
			"kind": "class",
			"static_base": addr::PROGRAM_STATICS,
			"fields": [static_field("g_int", "System.Int32")]
		}
	])
}

/// Captured memory of the managedapp fixture.
pub fn managedapp_regions() -> Vec<RegionBuilder> {
	let test_class = RegionBuilder::object(addr::TEST_CLASS, 72)
		.u64(8, 0xAABB_CCDD)
		.i32(16, 7)
		.u16(24, u16::from(b'a'))
		.u16(26, 3456)
		.u64(32, addr::INT_ARRAY)
		.u64(40, addr::FLOAT_ARRAY)
		.u64(48, addr::HELLO)
		.u64(56, addr::CLASS1)
		.i32(64, 4);

	let int_array = RegionBuilder::object(addr::INT_ARRAY, 32)
		.u32(8, 4)
		.i32(16, 1)
		.i32(20, 128)
		.i32(24, -555)
		.i32(28, 8888);

	let mut float_array = RegionBuilder::object(addr::FLOAT_ARRAY, 72).u32(8, 8);
	for dim in 0..3 {
		float_array = float_array.u32(16 + dim * 4, 2).i32(28 + dim * 4, 0);
	}
	for (idx, value) in [0.1_f32, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8].into_iter().enumerate() {
		float_array = float_array.f32(40 + idx * 4, value);
	}

	vec![
		test_class,
		int_array,
		float_array,
		string_object(addr::HELLO, "Hello"),
		RegionBuilder::object(addr::CLASS1, 16).i32(8, -555),
		RegionBuilder::object(addr::NESTED, 16).u64(8, 111),
		RegionBuilder::new(addr::TEST_CLASS_STATICS, 8).u64(0, addr::STATIC_STRING),
		string_object(addr::STATIC_STRING, "staticField"),
		RegionBuilder::new(addr::PROGRAM_STATICS, 8).i32(0, 10),
	]
}

/// Heap records of the managedapp fixture.
pub fn managedapp_heap() -> Value {
	json!([
		{ "address": addr::TEST_CLASS, "type": "managedapp.TestClass", "size": 72 },
		{ "address": addr::INT_ARRAY, "type": "System.Int32[]", "size": 32 },
		{ "address": addr::FLOAT_ARRAY, "type": "System.Single[,,]", "size": 72 },
		{ "address": addr::HELLO, "type": "System.String", "size": 24 },
		{ "address": addr::CLASS1, "type": "managedapp.Class1", "size": 16 },
		{ "address": addr::NESTED, "type": "managedapp.Class1.Nested", "size": 16 },
		{ "address": addr::STATIC_STRING, "type": "System.String", "size": 40 }
	])
}

/// Assemble a dump document from parts.
pub fn dump_document(types: Value, regions: &[RegionBuilder], heap: Value) -> Value {
	json!({
		"target": { "pointer_size": 8, "endianness": "little", "object_header_size": 8 },
		"types": types,
		"regions": regions.iter().map(RegionBuilder::to_json).collect::<Vec<_>>(),
		"heap": heap
	})
}

/// Complete managedapp dump document.
pub fn managedapp_dump() -> Value {
	dump_document(managedapp_types(), &managedapp_regions(), managedapp_heap())
}

#[cfg(test)]
mod tests {
	use super::{RegionBuilder, string_object};

	#[test]
	fn string_objects_carry_length_and_utf16_units() {
		let json = string_object(0x10, "Hi").to_json();
		let bytes = json["bytes"].as_str().expect("hex");
		assert_eq!(&bytes[16..24], "02000000");
		assert_eq!(&bytes[24..32], "48006900");
	}

	#[test]
	fn writes_extend_the_region() {
		let region = RegionBuilder::new(0, 2).u32(4, 1);
		assert_eq!(region.to_json()["bytes"], "0000000001000000");
	}
}
