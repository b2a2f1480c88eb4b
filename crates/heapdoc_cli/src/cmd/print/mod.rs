use heapdoc::inspect::{ArrayValue, FieldValue, StringValue, TextStatus, Value, ValueInstance};

use crate::cmd::util::addr_hex;

/// Output truncation and formatting limits for decoded values.
#[derive(Debug, Clone, Copy)]
pub struct PrintOptions {
	/// Maximum number of fields printed for a single composite.
	pub max_fields_per_composite: usize,
	/// Maximum number of Unicode scalar values printed for strings.
	pub max_string_len: usize,
	/// Maximum number of elements printed for arrays.
	pub max_array_items: usize,
	/// Maximum recursive print depth for nested arrays/composites.
	pub max_print_depth: u32,
}

impl Default for PrintOptions {
	fn default() -> Self {
		Self {
			max_fields_per_composite: 80,
			max_string_len: 200,
			max_array_items: 16,
			max_print_depth: 6,
		}
	}
}

/// Print one decoded value tree to stdout.
pub fn print_value(value: &ValueInstance, options: PrintOptions) {
	print!("{}", render_value(value, options));
}

/// Render one decoded value tree as indented text.
pub fn render_value(value: &ValueInstance, options: PrintOptions) -> String {
	let mut out = String::new();
	write_value(&mut out, value, 0, 0, options);
	out
}

fn write_value(out: &mut String, value: &ValueInstance, indent: usize, depth: u32, options: PrintOptions) {
	let pad = " ".repeat(indent);
	match &value.value {
		Value::Array(array) => write_array(out, value, array, indent, depth, options),
		Value::Composite(fields) => write_composite(out, value, fields, indent, depth, options),
		other => {
			out.push_str(&pad);
			out.push_str(&scalar(other, &value.type_name, options));
			out.push('\n');
		}
	}
}

fn write_array(out: &mut String, value: &ValueInstance, array: &ArrayValue, indent: usize, depth: u32, options: PrintOptions) {
	let pad = " ".repeat(indent);
	let dims = array
		.dims
		.iter()
		.map(|dim| if dim.lower_bound == 0 { dim.length.to_string() } else { format!("{}..{}", dim.lower_bound, i64::from(dim.lower_bound) + i64::from(dim.length)) })
		.collect::<Vec<_>>()
		.join(",");
	let head = format!("{}[{dims}]", element_name(&value.type_name));

	if depth >= options.max_print_depth {
		out.push_str(&format!("{pad}{head} [... {} items]\n", array.total));
		return;
	}

	out.push_str(&format!("{pad}{head} [\n"));
	for item in array.elements.iter().take(options.max_array_items) {
		write_value(out, item, indent + 2, depth + 1, options);
	}
	let shown = array.elements.len().min(options.max_array_items);
	if array.total > shown {
		out.push_str(&format!("{pad}  ... {} more\n", array.total - shown));
	}
	out.push_str(&format!("{pad}]\n"));
}

fn write_composite(out: &mut String, value: &ValueInstance, fields: &[FieldValue], indent: usize, depth: u32, options: PrintOptions) {
	let pad = " ".repeat(indent);
	let head = match value.location {
		Some(location) => format!("{} @{}", value.type_name, addr_hex(location)),
		None => value.type_name.to_string(),
	};

	if depth >= options.max_print_depth {
		out.push_str(&format!("{pad}{head} {{ ... }}\n"));
		return;
	}

	out.push_str(&format!("{pad}{head} {{\n"));
	for field in fields.iter().take(options.max_fields_per_composite) {
		let label = if field.is_static { format!("static {}", field.name) } else { field.name.to_string() };
		if matches!(field.value.value, Value::Composite(_) | Value::Array(_)) {
			out.push_str(&format!("{pad}  {label} =\n"));
			write_value(out, &field.value, indent + 4, depth + 1, options);
		} else {
			out.push_str(&format!("{pad}  {label} = {}\n", scalar(&field.value.value, &field.value.type_name, options)));
		}
	}
	if fields.len() > options.max_fields_per_composite {
		out.push_str(&format!("{pad}  ... {} more fields\n", fields.len() - options.max_fields_per_composite));
	}
	out.push_str(&format!("{pad}}}\n"));
}

fn scalar(value: &Value, type_name: &str, options: PrintOptions) -> String {
	match value {
		Value::Null => "null".to_owned(),
		Value::Bool(v) => v.to_string(),
		Value::Char(v) => match char::from_u32(*v) {
			Some(ch) if !ch.is_control() => format!("{ch:?}"),
			_ => format!("'\\u{{{v:04x}}}'"),
		},
		Value::I64(v) => v.to_string(),
		Value::U64(v) => v.to_string(),
		Value::F32(v) => v.to_string(),
		Value::F64(v) => v.to_string(),
		Value::Enum(v) => match &v.name {
			Some(name) => format!("{name} ({})", v.raw),
			None => format!("{} (unmapped)", v.raw),
		},
		Value::String(v) => string_label(v, options),
		Value::Ref(address) => format!("-> {type_name}@{}", addr_hex(*address)),
		Value::Unreadable(failure) => format!("<unreadable {} ({} bytes)>", addr_hex(failure.address), failure.len),
		Value::Array(array) => format!("{}[{} items]", element_name(type_name), array.total),
		Value::Composite(_) => format!("{type_name} {{ ... }}"),
	}
}

fn string_label(value: &StringValue, options: PrintOptions) -> String {
	let text = truncate(&value.text, options.max_string_len);
	match value.status {
		TextStatus::Complete => format!("{text:?}"),
		TextStatus::Truncated => format!("{text:?} (truncated, {} units)", value.expected_len),
		TextStatus::Partial => format!("{text:?} (partial, {} units)", value.expected_len),
		TextStatus::Unreadable => "<unreadable string>".to_owned(),
	}
}

fn element_name(type_name: &str) -> &str {
	type_name.rfind('[').map_or(type_name, |idx| &type_name[..idx])
}

fn truncate(input: &str, max_len: usize) -> String {
	if input.chars().count() <= max_len {
		return input.to_owned();
	}
	let out: String = input.chars().take(max_len).collect();
	format!("{out}...")
}
