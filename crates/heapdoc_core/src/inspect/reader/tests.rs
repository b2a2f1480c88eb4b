use std::sync::Arc;

use super::{ValueReader, element_address};
use crate::inspect::{
	EnumConstant, Endianness, HeapIndex, HeapObject, InspectError, MemoryRegion, MemorySnapshot, MetadataResolver, MetadataTable, PrimitiveKind, RawField, RawKind,
	RawTypeInfo, ReadOptions, Result, StaticStorageResolver, TargetConfig, TextEncoding, TextStatus, TypeId, Value, ValueInstance,
};

struct Target {
	resolver: Arc<MetadataResolver>,
	statics: StaticStorageResolver,
	memory: MemorySnapshot,
	heap: HeapIndex,
}

impl Target {
	fn new(types: Vec<RawTypeInfo>, regions: Vec<MemoryRegion>, config: TargetConfig) -> Self {
		let table = MetadataTable::from_types(types).expect("unique ids");
		let resolver = Arc::new(MetadataResolver::new(Arc::new(table), config).expect("valid config"));
		Self {
			statics: StaticStorageResolver::new(resolver.clone()),
			resolver,
			memory: MemorySnapshot::from_regions(regions),
			heap: HeapIndex::default(),
		}
	}

	fn read_with(&self, address: u64, ty: &str, options: &ReadOptions) -> Result<ValueInstance> {
		let desc = self.resolver.resolve(&TypeId::new(ty))?;
		ValueReader::new(&self.resolver, &self.statics, &self.memory, options)
			.with_heap(&self.heap)
			.read(address, &desc)
	}

	fn read(&self, address: u64, ty: &str) -> Result<ValueInstance> {
		self.read_with(address, ty, &ReadOptions::default())
	}
}

fn region(base: u64, len: usize, writes: &[(usize, &[u8])]) -> MemoryRegion {
	let mut bytes = vec![0_u8; len];
	for (offset, raw) in writes {
		bytes[*offset..*offset + raw.len()].copy_from_slice(raw);
	}
	MemoryRegion { base, bytes }
}

fn class(id: &str, fields: Vec<RawField>) -> RawTypeInfo {
	let mut raw = RawTypeInfo::new(id, RawKind::Class);
	raw.fields = fields;
	raw
}

fn string_region(base: u64, text: &str) -> MemoryRegion {
	let units: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
	let len = (text.encode_utf16().count() as u32).to_le_bytes();
	region(base, 12 + units.len(), &[(8, &len), (12, &units)])
}

fn node_types() -> Vec<RawTypeInfo> {
	vec![class("app.Node", vec![RawField::instance("value", "int"), RawField::instance("next", "app.Node")])]
}

fn node(base: u64, value: i32, next: u64) -> MemoryRegion {
	region(base, 24, &[(8, &value.to_le_bytes()), (16, &next.to_le_bytes())])
}

#[test]
fn primitives_follow_target_byte_order() {
	let config = TargetConfig {
		endianness: Endianness::Big,
		..TargetConfig::clr_x64()
	};
	let target = Target::new(Vec::new(), vec![region(0x100, 4, &[(0, &[0x0D, 0x80, 0x01, 0xFF])])], config);

	assert_eq!(target.read(0x100, "short").expect("short").as_i64(), Some(3456));
	assert_eq!(target.read(0x102, "bool").expect("bool").value, Value::Bool(true));
	assert_eq!(target.read(0x103, "sbyte").expect("sbyte").as_i64(), Some(-1));
	assert_eq!(target.read(0x103, "byte").expect("byte").value, Value::U64(255));
}

#[test]
fn enum_values_keep_raw_integer_when_unmapped() {
	let small = RawTypeInfo::new(
		"app.Signed",
		RawKind::Enum {
			underlying: PrimitiveKind::I8,
			constants: vec![EnumConstant {
				name: "Minus".into(),
				value: -1,
			}],
		},
	);
	let days = RawTypeInfo::new(
		"app.Days",
		RawKind::Enum {
			underlying: PrimitiveKind::I32,
			constants: vec![EnumConstant { name: "Sun".into(), value: 1 }],
		},
	);
	let memory = region(0x200, 9, &[(0, &42_i32.to_le_bytes()), (4, &1_i32.to_le_bytes()), (8, &[0xFF])]);
	let target = Target::new(vec![small, days], vec![memory], TargetConfig::clr_x64());

	let unmapped = target.read(0x200, "app.Days").expect("unmapped value is still a value");
	let value = unmapped.as_enum().expect("enum");
	assert_eq!(value.raw, 42);
	assert!(value.name.is_none());

	let mapped = target.read(0x204, "app.Days").expect("mapped");
	assert_eq!(mapped.as_enum().and_then(|value| value.name.as_deref()), Some("Sun"));

	let signed = target.read(0x208, "app.Signed").expect("signed");
	assert_eq!(signed.as_enum().map(|value| value.raw), Some(-1));
	assert_eq!(signed.as_enum().and_then(|value| value.name.as_deref()), Some("Minus"));
}

#[test]
fn inline_fixed_arrays_are_row_major() {
	let mut grid = RawTypeInfo::new("app.Grid", RawKind::Struct);
	grid.fields = vec![RawField::instance("cells", "int[2,3]"), RawField::instance("tail", "short")];

	let mut writes: Vec<(usize, Vec<u8>)> = (0..6).map(|idx| (idx * 4, (idx as i32).to_le_bytes().to_vec())).collect();
	writes.push((24, 9_i16.to_le_bytes().to_vec()));
	let borrowed: Vec<(usize, &[u8])> = writes.iter().map(|(offset, raw)| (*offset, raw.as_slice())).collect();
	let target = Target::new(vec![grid], vec![region(0x300, 28, &borrowed)], TargetConfig::clr_x64());

	let value = target.read(0x300, "app.Grid").expect("grid");
	let cells = value.field("cells").and_then(ValueInstance::as_array).expect("cells");
	assert_eq!(cells.rank(), 2);
	assert_eq!(cells.total, 6);
	assert_eq!(cells.get(&[1, 2]).and_then(ValueInstance::as_i64), Some(5));
	assert_eq!(cells.get(&[0, 1]).and_then(|cell| cell.location), Some(0x304));
	assert!(cells.get(&[2, 0]).is_none());
	assert_eq!(value.field("tail").and_then(ValueInstance::as_i64), Some(9));
}

#[test]
fn zero_length_dimension_yields_empty_array() {
	let header = region(
		0x400,
		32,
		&[
			(16, &3_u32.to_le_bytes()),
			(20, &0_u32.to_le_bytes()),
			(24, &1_i32.to_le_bytes()),
			(28, &0_i32.to_le_bytes()),
		],
	);
	let target = Target::new(Vec::new(), vec![header], TargetConfig::clr_x64());

	let value = target.read(0x400, "int[,]").expect("empty array");
	let array = value.as_array().expect("array");
	assert!(array.is_empty());
	assert!(array.elements.is_empty());
	assert!(!array.is_truncated());
	assert_eq!(array.dims[0].length, 3);
	assert_eq!(array.dims[0].lower_bound, 1);
	assert_eq!(array.dims[1].length, 0);
}

#[test]
fn element_address_is_row_major_offset() {
	assert_eq!(element_address(0x3028, 2, 4), Some(0x3030));
	assert_eq!(element_address(u64::MAX, 1, 4), None);
}

#[test]
fn strings_report_truncation_and_partial_reads() {
	let mut partial = string_region(0x600, "abc");
	partial.bytes[8..12].copy_from_slice(&10_u32.to_le_bytes());
	let holder = class("app.Holder", vec![RawField::instance("text", "string")]);
	let target = Target::new(
		vec![holder],
		vec![
			string_region(0x500, "Hello"),
			partial,
			region(0x700, 16, &[(8, &0x9999_u64.to_le_bytes())]),
		],
		TargetConfig::clr_x64(),
	);

	let full = target.read(0x500, "string").expect("string");
	assert_eq!(full.as_str(), Some("Hello"));

	let options = ReadOptions {
		max_string_len: 3,
		..ReadOptions::default()
	};
	let Value::String(short) = target.read_with(0x500, "string", &options).expect("string").value else {
		panic!("expected string");
	};
	assert_eq!(short.text, "Hel");
	assert_eq!(short.expected_len, 5);
	assert_eq!(short.status, TextStatus::Truncated);

	let Value::String(broken) = target.read(0x600, "string").expect("partial string").value else {
		panic!("expected string");
	};
	assert_eq!(broken.status, TextStatus::Partial);
	assert_eq!(broken.expected_len, 10);

	let holder = target.read(0x700, "app.Holder").expect("dangling string never aborts");
	let Some(Value::String(dangling)) = holder.field("text").map(|field| &field.value) else {
		panic!("expected string field");
	};
	assert_eq!(dangling.status, TextStatus::Unreadable);
	assert!(dangling.text.is_empty());
	assert!(holder.has_failures());
}

#[test]
fn utf8_strings_use_single_byte_units() {
	let mut config = TargetConfig::clr_x64();
	config.string.encoding = TextEncoding::Utf8;
	let target = Target::new(
		Vec::new(),
		vec![region(0x100, 15, &[(8, &3_u32.to_le_bytes()), (12, b"abc")])],
		config,
	);
	assert_eq!(target.read(0x100, "string").expect("utf8").as_str(), Some("abc"));
}

#[test]
fn reference_cycles_stop_at_revisited_objects() {
	let target = Target::new(node_types(), vec![node(0x800, 1, 0x900), node(0x900, 2, 0x800)], TargetConfig::clr_x64());

	let first = target.read(0x800, "app.Node").expect("node");
	let second = first.field("next").expect("next");
	assert_eq!(second.field("value").and_then(ValueInstance::as_i64), Some(2));
	assert_eq!(second.field("next").map(|back| &back.value), Some(&Value::Ref(0x800)));
}

#[test]
fn depth_limit_and_follow_switch_leave_raw_references() {
	let target = Target::new(
		node_types(),
		vec![node(0x800, 1, 0x900), node(0x900, 2, 0)],
		TargetConfig::clr_x64(),
	);

	let shallow = ReadOptions {
		max_depth: 0,
		..ReadOptions::default()
	};
	let value = target.read_with(0x800, "app.Node", &shallow).expect("node");
	assert_eq!(value.field("next").map(|next| &next.value), Some(&Value::Ref(0x900)));

	let unfollowed = ReadOptions {
		follow_refs: false,
		..ReadOptions::default()
	};
	let value = target.read_with(0x800, "app.Node", &unfollowed).expect("node");
	assert_eq!(value.field("next").map(|next| &next.value), Some(&Value::Ref(0x900)));

	let full = target.read(0x800, "app.Node").expect("node");
	let tail = full.field("next").and_then(|next| next.field("next")).expect("tail");
	assert_eq!(tail.value, Value::Null);
	assert_eq!(tail.location, None);
}

#[test]
fn unreadable_fields_do_not_abort_siblings() {
	let wide = class("app.Wide", vec![RawField::instance("a", "long"), RawField::instance("b", "long")]);
	let target = Target::new(
		vec![wide],
		vec![region(0xA00, 16, &[(8, &77_i64.to_le_bytes())])],
		TargetConfig::clr_x64(),
	);

	let value = target.read(0xA00, "app.Wide").expect("partially captured object");
	assert_eq!(value.field("a").and_then(ValueInstance::as_i64), Some(77));
	let Some(Value::Unreadable(failure)) = value.field("b").map(|field| &field.value) else {
		panic!("expected unreadable field");
	};
	assert_eq!(failure.address, 0xA10);
	assert_eq!(failure.len, 8);

	let err = target.read(0xF000, "app.Wide").expect_err("root is unmapped");
	assert!(matches!(err, InspectError::MemoryAccess { address: 0xF000, .. }));
}

#[test]
fn heap_runtime_type_replaces_declared_type() {
	let animal = class("app.Animal", vec![RawField::instance("legs", "int")]);
	let mut dog = class("app.Dog", vec![RawField::instance("good", "bool")]);
	dog.base = Some(TypeId::new("app.Animal"));
	let kennel = class("app.Kennel", vec![RawField::instance("pet", "app.Animal")]);

	let mut target = Target::new(
		vec![animal, dog, kennel],
		vec![
			region(0xB00, 16, &[(8, &0xB100_u64.to_le_bytes())]),
			region(0xB100, 24, &[(8, &4_i32.to_le_bytes()), (16, &[1])]),
		],
		TargetConfig::clr_x64(),
	);
	target.heap = HeapIndex::new(vec![HeapObject {
		address: 0xB100,
		ty: TypeId::new("app.Dog"),
		size: 24,
	}]);

	let kennel = target.read(0xB00, "app.Kennel").expect("kennel");
	let pet = kennel.field("pet").expect("pet");
	assert_eq!(pet.type_name.as_ref(), "app.Dog");
	assert_eq!(pet.field("legs").and_then(ValueInstance::as_i64), Some(4));
	assert_eq!(pet.field("good").map(|good| &good.value), Some(&Value::Bool(true)));
}

#[test]
fn struct_statics_are_unboxed_and_stop_at_their_own_box() {
	let mut point = RawTypeInfo::new("app.Point", RawKind::Struct);
	point.fields = vec![
		RawField::instance("x", "int"),
		RawField::instance("y", "int"),
		RawField::static_field("Empty", "app.Point"),
	];
	point.static_base = Some(0x200);
	let target = Target::new(
		vec![point],
		vec![
			region(0x100, 8, &[(0, &1_i32.to_le_bytes()), (4, &2_i32.to_le_bytes())]),
			region(0x200, 8, &[(0, &0x300_u64.to_le_bytes())]),
			region(0x300, 16, &[(8, &7_i32.to_le_bytes())]),
		],
		TargetConfig::clr_x64(),
	);

	let value = target.read(0x100, "app.Point").expect("point");
	assert_eq!(value.field("x").and_then(ValueInstance::as_i64), Some(1));
	let empty = value.field("Empty").expect("static Empty");
	assert_eq!(empty.location, Some(0x308));
	assert_eq!(empty.field("x").and_then(ValueInstance::as_i64), Some(7));
	assert_eq!(empty.field("Empty").map(|again| &again.value), Some(&Value::Ref(0x300)));

	let desc = target.resolver.resolve(&TypeId::new("app.Point")).expect("point");
	let options = ReadOptions::default();
	let stored = ValueReader::new(&target.resolver, &target.statics, &target.memory, &options)
		.read_static(0x200, &desc)
		.expect("static slot");
	assert_eq!(stored.location, Some(0x308));
	assert_eq!(stored.field("y").and_then(ValueInstance::as_i64), Some(0));
}

#[test]
fn empty_struct_static_box_reads_as_null() {
	let mut holder = class("app.Holder", vec![RawField::static_field("origin", "app.Pair")]);
	holder.static_base = Some(0x200);
	let mut pair = RawTypeInfo::new("app.Pair", RawKind::Struct);
	pair.fields = vec![RawField::instance("a", "int"), RawField::instance("b", "int")];
	let target = Target::new(
		vec![holder, pair],
		vec![region(0x100, 8, &[]), region(0x200, 8, &[])],
		TargetConfig::clr_x64(),
	);

	let value = target.read(0x100, "app.Holder").expect("holder");
	let origin = value.field("origin").expect("static origin");
	assert_eq!(origin.value, Value::Null);
	assert_eq!(origin.type_name.as_ref(), "app.Pair");
}
