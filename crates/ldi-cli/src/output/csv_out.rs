use serde_json::Value;
use std::io;

use super::{flatten, format_scalar, result_of};

/// Write output as CSV to stdout.
///
/// A result holding a single list of records (such as a funding sweep)
/// is written one row per record; anything else as `field,value` pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match result_of(value) {
        Value::Object(map) => {
            let flat = flatten(map);
            let record_lists: Vec<&Vec<Value>> = flat
                .iter()
                .filter_map(|(_, v)| match v {
                    Value::Array(arr) if arr.iter().any(Value::is_object) => Some(arr),
                    _ => None,
                })
                .collect();
            if let [only] = record_lists.as_slice() {
                write_records(&mut wtr, only);
            } else {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in &flat {
                    let _ = wtr.write_record([key.as_str(), &format_scalar(val)]);
                }
            }
        }
        Value::Array(arr) => write_records(&mut wtr, arr),
        other => {
            let _ = wtr.write_record([&format_scalar(other)]);
        }
    }

    let _ = wtr.flush();
}

fn write_records<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) {
    let rows: Vec<Vec<(String, Value)>> = arr
        .iter()
        .filter_map(|item| item.as_object().map(flatten))
        .collect();
    let Some(first) = rows.first() else {
        for item in arr {
            let _ = wtr.write_record([&format_scalar(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.iter().map(|(k, _)| k.as_str()).collect();
    let _ = wtr.write_record(&headers);
    for row in &rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| {
                row.iter()
                    .find(|(k, _)| k == h)
                    .map(|(_, v)| format_scalar(v))
                    .unwrap_or_default()
            })
            .collect();
        let _ = wtr.write_record(&cells);
    }
}
