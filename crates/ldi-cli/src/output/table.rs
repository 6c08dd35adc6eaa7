use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{flatten, format_scalar};

/// Format output as tables: one for the scalar fields of the result, then
/// one per list of records (discounted flows, bonds, rate path, sweep).
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => {
                print_result_tables(result);
                print_envelope_notes(map);
            }
            _ => print_result_tables(map),
        },
        Value::Array(arr) => print_records("", arr),
        _ => println!("{}", value),
    }
}

fn print_result_tables(result: &Map<String, Value>) {
    let flat = flatten(result);

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut records: Vec<(&str, &Vec<Value>)> = Vec::new();
    for (key, val) in &flat {
        match val {
            Value::Array(arr) if arr.iter().any(Value::is_object) => {
                records.push((key.as_str(), arr));
            }
            _ => builder.push_record([key.as_str(), &format_value(val)]),
        }
    }
    println!("{}", Table::from(builder));

    for (title, arr) in records {
        print_records(title, arr);
    }
}

fn print_records(title: &str, arr: &[Value]) {
    if !title.is_empty() {
        println!("\n{}:", title);
    }
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    let rows: Vec<Vec<(String, Value)>> = arr
        .iter()
        .filter_map(|item| item.as_object().map(flatten))
        .collect();
    let Some(first) = rows.first() else {
        for item in arr {
            println!("{}", format_value(item));
        }
        return;
    };

    let headers: Vec<String> = first.iter().map(|(k, _)| k.clone()).collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for row in &rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| {
                row.iter()
                    .find(|(k, _)| k == h)
                    .map(|(_, v)| format_value(v))
                    .unwrap_or_default()
            })
            .collect();
        builder.push_record(cells);
    }
    println!("{}", Table::from(builder));
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        _ => format_scalar(value),
    }
}
