use std::path::PathBuf;

use heapdoc::inspect::{Introspector, Result, TypeDescriptor, TypeId, TypeKind};

use crate::cmd::util::{addr_hex, emit_json};

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	/// Qualified type identity, e.g. `app.Outer.Inner` or `System.Int32[]`.
	#[arg(long = "type")]
	pub type_name: String,
	/// Only list fields declared by the type itself.
	#[arg(long)]
	pub own: bool,
	/// Include static fields.
	#[arg(long)]
	pub statics: bool,
	#[arg(long)]
	pub json: bool,
}

/// Print the resolved layout of one type.
pub fn run(args: Args) -> Result<()> {
	let Args {
		path,
		type_name,
		own,
		statics,
		json,
	} = args;

	let session = Introspector::open(&path)?;
	let id = TypeId::from(type_name.as_str());
	let desc = session.resolve_type(&id)?;
	let fields = if desc.is_composite() {
		session.enumerate_fields(&id, !own, statics)?
	} else {
		Vec::new()
	};

	if json {
		let payload = LayoutJson {
			id: desc.id.to_string(),
			kind: desc.kind.label(),
			detail: kind_detail(&desc),
			size: desc.size,
			align: desc.align,
			storage_size: desc.storage_size,
			base: desc.base.as_ref().map(ToString::to_string),
			enclosing: desc.enclosing.as_ref().map(ToString::to_string),
			nested: desc.nested.iter().map(ToString::to_string).collect(),
			static_base: desc.static_base.map(addr_hex),
			static_size: desc.static_size,
			fields: fields
				.iter()
				.map(|field| FieldJson {
					name: field.name.to_string(),
					ty: field.ty.to_string(),
					offset: field.offset,
					size: field.size,
					is_static: field.is_static,
					declared_by: field.declared_by.to_string(),
				})
				.collect(),
		};
		return emit_json(&payload);
	}

	println!("type: {}", desc.id);
	println!("kind: {}", desc.kind.label());
	if let Some(detail) = kind_detail(&desc) {
		println!("detail: {detail}");
	}
	println!("size: {}", desc.size);
	println!("align: {}", desc.align);
	println!("storage_size: {}", desc.storage_size);
	if let Some(base) = &desc.base {
		println!("base: {base}");
	}
	if let Some(enclosing) = &desc.enclosing {
		println!("enclosing: {enclosing}");
	}
	for nested in &desc.nested {
		println!("nested: {nested}");
	}
	if let Some(static_base) = desc.static_base {
		println!("static_base: {}", addr_hex(static_base));
		println!("static_size: {}", desc.static_size);
	}
	if !fields.is_empty() {
		println!("offset\tsize\tfield\ttype\tdeclared_by");
		for field in &fields {
			let offset = if field.is_static { format!("s+{}", field.offset) } else { field.offset.to_string() };
			println!("{offset}\t{}\t{}\t{}\t{}", field.size, field.name, field.ty, field.declared_by);
		}
	}

	Ok(())
}

fn kind_detail(desc: &TypeDescriptor) -> Option<String> {
	match &desc.kind {
		TypeKind::Primitive(kind) => Some(kind.name().to_owned()),
		TypeKind::Enum(shape) => Some(format!("{} constants over {}", shape.constants.len(), shape.underlying.name())),
		TypeKind::Array(shape) => Some(match &shape.fixed {
			Some(dims) => format!(
				"inline {}[{}]",
				shape.element,
				dims.iter().map(|dim| dim.length.to_string()).collect::<Vec<_>>().join(",")
			),
			None => format!("heap rank {} of {}", shape.rank, shape.element),
		}),
		TypeKind::Class | TypeKind::Struct | TypeKind::String => None,
	}
}

#[derive(serde::Serialize)]
struct FieldJson {
	name: String,
	#[serde(rename = "type")]
	ty: String,
	offset: u32,
	size: u32,
	is_static: bool,
	declared_by: String,
}

#[derive(serde::Serialize)]
struct LayoutJson {
	id: String,
	kind: &'static str,
	detail: Option<String>,
	size: u32,
	align: u32,
	storage_size: u32,
	base: Option<String>,
	enclosing: Option<String>,
	nested: Vec<String>,
	static_base: Option<String>,
	static_size: u32,
	fields: Vec<FieldJson>,
}
