use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use super::MetadataResolver;
use crate::inspect::{
	EnumConstant, InspectError, MetadataProvider, MetadataTable, PrimitiveKind, RawField, RawKind, RawTypeInfo, TargetConfig, TypeId, TypeKind,
};

fn class(id: &str, base: Option<&str>, fields: Vec<RawField>) -> RawTypeInfo {
	let mut raw = RawTypeInfo::new(id, RawKind::Class);
	raw.base = base.map(TypeId::from);
	raw.fields = fields;
	raw
}

fn structure(id: &str, fields: Vec<RawField>) -> RawTypeInfo {
	let mut raw = RawTypeInfo::new(id, RawKind::Struct);
	raw.fields = fields;
	raw
}

fn resolver(types: Vec<RawTypeInfo>) -> MetadataResolver {
	let table = MetadataTable::from_types(types).expect("unique ids");
	MetadataResolver::new(Arc::new(table), TargetConfig::clr_x64()).expect("valid config")
}

fn app_types() -> Vec<RawTypeInfo> {
	let mut nested = class("app.Class1.Nested", None, vec![RawField::instance("Field1", "long")]);
	nested.enclosing = Some(TypeId::new("app.Class1"));

	let days = RawTypeInfo::new(
		"app.Days",
		RawKind::Enum {
			underlying: PrimitiveKind::I32,
			constants: ["Sun", "Mon", "Tue", "Wed"]
				.iter()
				.zip(1..)
				.map(|(name, value)| EnumConstant {
					name: (*name).into(),
					value,
				})
				.collect(),
		},
	);

	vec![
		class("app.Class1", None, vec![RawField::instance("Field1", "int")]),
		nested,
		class(
			"app.Base",
			None,
			vec![RawField::instance("longField", "long"), RawField::instance("baseIntField", "int")],
		),
		class(
			"app.Derived",
			Some("app.Base"),
			vec![
				RawField::instance("charField", "char"),
				RawField::instance("shortField", "short"),
				RawField::instance("intArray", "int[]"),
				RawField::instance("class1Field", "app.Class1"),
				RawField::instance("daysField", "app.Days"),
				RawField::static_field("staticStrField", "string"),
			],
		),
		days,
	]
}

#[test]
fn builtins_resolve_without_provider_entries() {
	let resolver = resolver(Vec::new());

	let int = resolver.resolve(&TypeId::new("int")).expect("int");
	assert_eq!(int.id.as_str(), "System.Int32");
	assert_eq!(int.kind, TypeKind::Primitive(PrimitiveKind::I32));
	assert_eq!(int.size, 4);

	let string = resolver.resolve(&TypeId::new("System.String")).expect("string");
	assert!(string.is_reference());
	assert_eq!(string.storage_size, 8);

	let object = resolver.resolve(&TypeId::new("object")).expect("object");
	assert_eq!(object.kind, TypeKind::Class);
	assert_eq!(object.size, 8);
}

#[test]
fn provider_entry_overrides_builtin() {
	let mut raw = RawTypeInfo::new("System.Char", RawKind::Primitive { primitive: PrimitiveKind::Char8 });
	raw.size = Some(1);
	let resolver = resolver(vec![raw]);
	let desc = resolver.resolve(&TypeId::new("System.Char")).expect("override");
	assert_eq!(desc.kind, TypeKind::Primitive(PrimitiveKind::Char8));
	assert_eq!(desc.size, 1);
}

#[test]
fn unknown_type_fails_and_is_retried() {
	let resolver = resolver(Vec::new());
	let id = TypeId::new("app.Missing");
	let err = resolver.resolve(&id).expect_err("missing type");
	assert!(matches!(err, InspectError::TypeNotFound { ref type_id } if type_id == "app.Missing"));
	assert!(resolver.cached(&id).is_none());

	resolver.resolve(&id).expect_err("still missing");
	assert_eq!(resolver.computations(), 2);
}

#[test]
fn resolution_is_cached_and_arc_shared() {
	let resolver = resolver(app_types());
	let id = TypeId::new("app.Derived");
	let first = resolver.resolve(&id).expect("first");
	let after_first = resolver.computations();
	let second = resolver.resolve(&id).expect("second");

	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(resolver.computations(), after_first);
	assert!(resolver.cached(&TypeId::new("app.Base")).is_some());
}

#[test]
fn derived_layout_follows_base_layout() {
	let resolver = resolver(app_types());
	let desc = resolver.resolve(&TypeId::new("app.Derived")).expect("derived");

	let offsets: Vec<(&str, u32)> = desc.instance_fields().map(|field| (field.name.as_ref(), field.offset)).collect();
	assert_eq!(
		offsets,
		vec![
			("longField", 8),
			("baseIntField", 16),
			("charField", 24),
			("shortField", 26),
			("intArray", 32),
			("class1Field", 40),
			("daysField", 48),
		]
	);
	assert_eq!(desc.size, 56);
	assert_eq!(desc.static_fields().count(), 1);
	assert_eq!(desc.storage_size, 8);
}

#[test]
fn arrays_are_synthesized_from_element_types() {
	let resolver = resolver(app_types());

	let heap = resolver.resolve(&TypeId::new("float[,,]")).expect("heap array");
	let TypeKind::Array(shape) = &heap.kind else {
		panic!("expected array kind, got {:?}", heap.kind);
	};
	assert_eq!(shape.rank, 3);
	assert!(shape.is_heap());
	assert_eq!(shape.element.as_str(), "System.Single");
	assert_eq!(heap.size, 40);
	assert!(heap.is_reference());

	let fixed = resolver.resolve(&TypeId::new("float[2,2,2]")).expect("fixed array");
	assert_eq!(fixed.size, 32);
	assert!(!fixed.is_reference());

	let jagged = resolver.resolve(&TypeId::new("app.Class1[][]")).expect("jagged");
	let TypeKind::Array(shape) = &jagged.kind else {
		panic!("expected array kind");
	};
	assert_eq!(shape.element.as_str(), "app.Class1[]");

	let err = resolver.resolve(&TypeId::new("app.Missing[]")).expect_err("unknown element");
	assert!(matches!(err, InspectError::TypeNotFound { .. }));
}

#[test]
fn inheritance_cycle_is_reported_with_chain() {
	let resolver = resolver(vec![class("app.A", Some("app.B"), Vec::new()), class("app.B", Some("app.A"), Vec::new())]);
	let err = resolver.resolve(&TypeId::new("app.A")).expect_err("cycle");
	let InspectError::InheritanceCycle { chain } = err else {
		panic!("expected inheritance cycle, got {err:?}");
	};
	assert_eq!(chain, vec!["app.A", "app.B", "app.A"]);
}

#[test]
fn struct_embedding_itself_is_a_layout_violation() {
	let resolver = resolver(vec![
		structure("app.Direct", vec![RawField::instance("me", "app.Direct")]),
		structure("app.Outer", vec![RawField::instance("inner", "app.Inner[2]")]),
		structure("app.Inner", vec![RawField::instance("outer", "app.Outer")]),
		structure("app.Linked", vec![RawField::instance("next", "app.Linked[]")]),
	]);

	for id in ["app.Direct", "app.Outer"] {
		let err = resolver.resolve(&TypeId::new(id)).expect_err("self embedding");
		assert!(matches!(err, InspectError::LayoutAssumptionViolated { .. }), "{id}: {err:?}");
	}

	let linked = resolver.resolve(&TypeId::new("app.Linked")).expect("heap array breaks the cycle");
	assert_eq!(linked.size, 8);
}

#[test]
fn struct_reached_through_its_base_does_not_deadlock() {
	let mut value = structure("app.Value", Vec::new());
	value.base = Some(TypeId::new("app.Holder"));
	let resolver = resolver(vec![value, structure("app.Holder", vec![RawField::instance("v", "app.Value")])]);

	let err = resolver.resolve(&TypeId::new("app.Value")).expect_err("cycle through base");
	assert!(matches!(err, InspectError::LayoutAssumptionViolated { .. }));
}

#[test]
fn struct_static_of_its_own_type_is_a_boxed_slot() {
	let resolver = resolver(vec![structure(
		"app.Point",
		vec![
			RawField::instance("x", "int"),
			RawField::instance("y", "int"),
			RawField::static_field("Empty", "app.Point"),
		],
	)]);

	let desc = resolver.resolve(&TypeId::new("app.Point")).expect("self-typed static");
	assert_eq!(desc.size, 8);
	assert_eq!(desc.instance_fields().count(), 2);
	let empty = desc.static_fields().next().expect("Empty");
	assert_eq!((empty.offset, empty.size), (0, 8));
	assert_eq!(desc.static_size, 8);
}

#[test]
fn struct_statics_referencing_each_other_resolve_on_any_thread() {
	let types = || {
		vec![
			structure("app.A", vec![RawField::instance("v", "long"), RawField::static_field("other", "app.B")]),
			structure("app.B", vec![RawField::instance("v", "int"), RawField::static_field("other", "app.A")]),
		]
	};

	let single = resolver(types());
	assert_eq!(single.resolve(&TypeId::new("app.A")).expect("A").size, 8);
	assert_eq!(single.resolve(&TypeId::new("app.B")).expect("B").size, 4);

	for _ in 0..50 {
		let resolver = resolver(types());
		let barrier = Barrier::new(2);
		thread::scope(|scope| {
			for id in ["app.A", "app.B"] {
				let (resolver, barrier) = (&resolver, &barrier);
				scope.spawn(move || {
					barrier.wait();
					resolver.resolve(&TypeId::new(id)).expect("resolves")
				});
			}
		});
	}
}

#[test]
fn target_layouts_the_reader_cannot_decode_are_rejected() {
	let table = || Arc::new(MetadataTable::from_types(Vec::new()).expect("empty"));

	let mut config = TargetConfig::clr_x64();
	config.array.rank_size = 3;
	let err = MetadataResolver::new(table(), config).err().expect("odd bound width");
	assert!(matches!(err, InspectError::InvalidTargetLayout { .. }));

	let mut config = TargetConfig::clr_x64();
	config.object_header_size = u32::MAX - 1;
	let err = MetadataResolver::new(table(), config).err().expect("unalignable header");
	assert!(matches!(err, InspectError::InvalidTargetLayout { .. }));

	let mut config = TargetConfig::clr_x64();
	config.array.rank_size = 8;
	config.array.rank_offset = u32::MAX - 8;
	let resolver = MetadataResolver::new(table(), config).expect("header offsets are checked per rank");
	let err = resolver.resolve(&TypeId::new("int[,]")).expect_err("rank-2 header overflows");
	assert!(matches!(err, InspectError::LayoutAssumptionViolated { .. }));
}

#[test]
fn nested_types_resolve_through_owner() {
	let resolver = resolver(app_types());
	let owner = TypeId::new("app.Class1");

	let nested = resolver.resolve_nested(&owner, "Nested").expect("nested");
	assert_eq!(nested.id.as_str(), "app.Class1.Nested");
	assert_eq!(nested.enclosing.as_ref(), Some(&owner));

	let direct = resolver.resolve(&TypeId::new("app.Class1.Nested")).expect("direct");
	assert!(Arc::ptr_eq(&nested, &direct));

	let owner_desc = resolver.resolve(&owner).expect("owner");
	assert_eq!(owner_desc.nested, vec![TypeId::new("app.Class1.Nested")]);
	assert_eq!(owner_desc.field("Field1").map(|field| field.size), Some(4));
	assert_eq!(nested.field("Field1").map(|field| field.size), Some(8));

	assert!(resolver.resolve_nested(&TypeId::new("app.Base"), "Nested").is_err());
}

#[test]
fn enum_with_float_underlying_is_rejected() {
	let raw = RawTypeInfo::new(
		"app.Bad",
		RawKind::Enum {
			underlying: PrimitiveKind::F32,
			constants: Vec::new(),
		},
	);
	let resolver = resolver(vec![raw]);
	assert!(matches!(
		resolver.resolve(&TypeId::new("app.Bad")),
		Err(InspectError::LayoutAssumptionViolated { .. })
	));
}

#[test]
fn type_names_filter_by_mask_in_provider_order() {
	let resolver = resolver(app_types());
	let names = resolver.type_names("app.Class1*").expect("mask");
	assert_eq!(names, vec![TypeId::new("app.Class1"), TypeId::new("app.Class1.Nested")]);
	assert_eq!(resolver.type_names("").expect("all").len(), 5);
}

struct SlowProvider {
	inner: MetadataTable,
	lookups: AtomicUsize,
}

impl MetadataProvider for SlowProvider {
	fn lookup(&self, id: &TypeId) -> Option<RawTypeInfo> {
		self.lookups.fetch_add(1, Ordering::Relaxed);
		thread::sleep(Duration::from_millis(2));
		self.inner.lookup(id)
	}

	fn type_ids(&self) -> Vec<TypeId> {
		self.inner.type_ids()
	}
}

#[test]
fn concurrent_first_resolution_computes_once() {
	let baseline = resolver(app_types());
	baseline.resolve(&TypeId::new("app.Derived")).expect("baseline");
	let expected = baseline.computations();

	let provider = Arc::new(SlowProvider {
		inner: MetadataTable::from_types(app_types()).expect("unique ids"),
		lookups: AtomicUsize::new(0),
	});
	let resolver = MetadataResolver::new(provider, TargetConfig::clr_x64()).expect("valid config");
	let threads = 16;
	let barrier = Barrier::new(threads);
	let id = TypeId::new("app.Derived");

	let results: Vec<_> = thread::scope(|scope| {
		let handles: Vec<_> = (0..threads)
			.map(|_| {
				scope.spawn(|| {
					barrier.wait();
					resolver.resolve(&id).expect("resolve")
				})
			})
			.collect();
		handles.into_iter().map(|handle| handle.join().expect("thread")).collect()
	});

	for desc in &results[1..] {
		assert!(Arc::ptr_eq(&results[0], desc));
	}
	assert_eq!(resolver.computations(), expected);
}

#[test]
fn concurrent_failures_are_uniform() {
	let resolver = resolver(vec![class("app.A", Some("app.B"), Vec::new()), class("app.B", Some("app.A"), Vec::new())]);
	let threads = 8;
	let barrier = Barrier::new(threads);
	let id = TypeId::new("app.A");

	thread::scope(|scope| {
		for _ in 0..threads {
			scope.spawn(|| {
				barrier.wait();
				let err = resolver.resolve(&id).expect_err("cycle");
				assert!(matches!(err, InspectError::InheritanceCycle { .. }));
			});
		}
	});
}

struct PanicOnceProvider {
	inner: MetadataTable,
	target: TypeId,
	armed: AtomicBool,
	entered: Barrier,
}

impl MetadataProvider for PanicOnceProvider {
	fn lookup(&self, id: &TypeId) -> Option<RawTypeInfo> {
		if *id == self.target && self.armed.swap(false, Ordering::SeqCst) {
			self.entered.wait();
			thread::sleep(Duration::from_millis(50));
			panic!("provider failed while describing {id}");
		}
		self.inner.lookup(id)
	}

	fn type_ids(&self) -> Vec<TypeId> {
		self.inner.type_ids()
	}
}

#[test]
fn panicking_computation_releases_waiters_and_allows_retry() {
	let id = TypeId::new("app.Class1");
	let provider = Arc::new(PanicOnceProvider {
		inner: MetadataTable::from_types(app_types()).expect("unique ids"),
		target: id.clone(),
		armed: AtomicBool::new(true),
		entered: Barrier::new(2),
	});
	let resolver = MetadataResolver::new(provider.clone(), TargetConfig::clr_x64()).expect("valid config");

	let waited = thread::scope(|scope| {
		let leader = scope.spawn(|| resolver.resolve(&id));
		provider.entered.wait();
		let waiter = scope.spawn(|| resolver.resolve(&id));
		assert!(leader.join().is_err(), "leader computation should panic");
		waiter.join().expect("waiter returns instead of hanging")
	});

	match waited {
		Err(InspectError::ResolutionAborted { type_id }) => assert_eq!(type_id, "app.Class1"),
		Ok(desc) => assert_eq!(desc.id, id),
		Err(other) => panic!("unexpected error {other:?}"),
	}

	let desc = resolver.resolve(&id).expect("retry after the failed computation");
	assert_eq!(desc.size, 16);
}
