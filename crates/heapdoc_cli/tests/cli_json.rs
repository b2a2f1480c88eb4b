#![allow(missing_docs)]

use std::process::{Command, Output};

use heapdoc_testkit::managedapp_path;
use serde_json::Value;

#[test]
fn info_json_reports_dump_statistics() {
	let json = run_json(&["info", "{dump}", "--json"]);

	assert_eq!(json["compression"], "none");
	assert_eq!(json["pointer_size"], 8);
	assert_eq!(json["types"], 6);
	assert_eq!(json["heap_objects"], 7);
}

#[test]
fn types_json_lists_nested_types_under_mask() {
	let json = run_json(&["types", "{dump}", "--mask", "managedapp.Class1*", "--resolve", "--json"]);

	let names: Vec<&str> = json["types"].as_array().expect("types").iter().filter_map(|row| row["name"].as_str()).collect();
	assert_eq!(names, vec!["managedapp.Class1", "managedapp.Class1.Nested"]);
	assert_eq!(json["types"][0]["kind"], "class");
}

#[test]
fn layout_json_lists_inherited_then_static_fields() {
	let json = run_json(&["layout", "{dump}", "--type", "managedapp.TestClass", "--statics", "--json"]);

	assert_eq!(json["size"], 72);
	assert_eq!(json["base"], "managedapp.TestClassBase");
	let fields = json["fields"].as_array().expect("fields");
	assert_eq!(fields.len(), 10);
	assert_eq!(fields[0]["name"], "longField");
	assert_eq!(fields[0]["declared_by"], "managedapp.TestClassBase");
	assert_eq!(fields[2]["offset"], 24);
	assert_eq!(fields[9]["name"], "staticStrField");
	assert_eq!(fields[9]["is_static"], true);
}

#[test]
fn read_json_uses_heap_runtime_type() {
	let json = run_json(&["read", "{dump}", "0x1000", "--json"]);

	assert_eq!(json["address"], "0x0000000000001000");
	assert_eq!(json["complete"], true);
	assert_eq!(json["value"]["type_name"], "managedapp.TestClass");

	let fields = json["value"]["value"]["data"].as_array().expect("composite fields");
	let field = |name: &str| fields.iter().find(|item| item["name"] == name).map(|item| item["value"]["value"].clone()).expect("field present");
	assert_eq!(field("charField")["data"], 97);
	assert_eq!(field("shortField")["data"], 3456);
	assert_eq!(field("strField")["data"]["text"], "Hello");
	assert_eq!(field("daysField")["data"]["name"], "Wed");
	assert_eq!(field("staticStrField")["data"]["text"], "staticField");
}

#[test]
fn read_with_no_follow_reports_references() {
	let json = run_json(&["read", "{dump}", "4096", "--type", "managedapp.TestClass", "--no-follow", "--no-statics", "--json"]);

	let fields = json["value"]["value"]["data"].as_array().expect("composite fields");
	let class1 = fields.iter().find(|item| item["name"] == "class1Field").expect("class1Field");
	assert_eq!(class1["value"]["value"], serde_json::json!({ "tag": "ref", "data": 0x5000 }));
	assert!(fields.iter().all(|item| item["is_static"] == false));
}

#[test]
fn static_json_reports_location_and_value() {
	let json = run_json(&["static", "{dump}", "--type", "managedapp.Program", "--field", "g_int", "--json"]);

	assert_eq!(json["location"], "0x0000000000007800");
	assert_eq!(json["value"]["value"]["data"], 10);
	assert!(json["initialized"].as_array().is_some_and(|items| items.iter().any(|item| item == "managedapp.Program")));
}

#[test]
fn heap_json_filters_by_mask_and_size() {
	let json = run_json(&["heap", "{dump}", "--mask", "managedapp*", "--json"]);
	assert_eq!(json["total"], 3);

	let json = run_json(&["heap", "{dump}", "--mask", "System.String", "--min-size", "32", "--json"]);
	assert_eq!(json["total"], 1);
	assert_eq!(json["objects"][0]["address"], "0x0000000000007100");
}

#[test]
fn read_text_output_renders_fields() {
	let output = run(&["read", "{dump}", "0x1000"]);
	assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

	let stdout = String::from_utf8_lossy(&output.stdout);
	assert!(stdout.contains("managedapp.TestClass @0x0000000000001000 {"), "{stdout}");
	assert!(stdout.contains("charField = 'a'"), "{stdout}");
	assert!(stdout.contains("daysField = Wed (4)"), "{stdout}");
	assert!(stdout.contains("static staticStrField = \"staticField\""), "{stdout}");
}

#[test]
fn invalid_address_fails_with_message() {
	let output = run(&["read", "{dump}", "0xnope"]);

	assert!(!output.status.success());
	assert!(String::from_utf8_lossy(&output.stderr).contains("invalid address literal"));
}

#[test]
fn unknown_object_fails_with_message() {
	let output = run(&["read", "{dump}", "0x1234"]);

	assert!(!output.status.success());
	assert!(String::from_utf8_lossy(&output.stderr).contains("no heap object"));
}

fn run(args: &[&str]) -> Output {
	let dump = managedapp_path().display().to_string();
	let args: Vec<&str> = args.iter().map(|arg| if *arg == "{dump}" { dump.as_str() } else { *arg }).collect();
	Command::new(env!("CARGO_BIN_EXE_heapdoc")).args(&args).output().expect("command executes")
}

fn run_json(args: &[&str]) -> Value {
	let output = run(args);
	assert!(
		output.status.success(),
		"heapdoc command failed with status={}: {}",
		output.status,
		String::from_utf8_lossy(&output.stderr)
	);
	serde_json::from_slice(&output.stdout).expect("stdout should be valid json")
}
