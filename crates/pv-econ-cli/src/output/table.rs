use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_scalar, is_row_array};

/// Format output as tables: scalar result fields as Field/Value, and every
/// array of row objects (annual records, ledger years, loan periods, tornado
/// rows) as its own table.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => print_result(result, map),
            _ => print_fields(map),
        },
        Value::Array(arr) => print_rows(arr),
        _ => println!("{}", value),
    }
}

fn print_result(result: &Map<String, Value>, envelope: &Map<String, Value>) {
    print_fields(result);

    for (key, val) in result {
        match val {
            // Several stakeholders, each with its own year table: one block each
            Value::Array(items) if has_nested_rows(items) => {
                for item in items {
                    if let Value::Object(inner) = item {
                        println!();
                        print_result(inner, &Map::new());
                    }
                }
            }
            Value::Array(rows) if is_row_array(rows) => {
                println!("\n{}:", key);
                print_rows(rows);
            }
            _ => {}
        }
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn has_nested_rows(items: &[Value]) -> bool {
    match items.first() {
        Some(Value::Object(first)) => first.values().any(|v| matches!(v, Value::Array(_))),
        _ => false,
    }
}

/// Scalar and small nested fields; arrays are printed separately.
fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut any = false;
    for (key, val) in map {
        match val {
            Value::Array(_) => {}
            Value::Object(inner) => {
                for (k, v) in inner {
                    builder.push_record([format!("{key}.{k}"), format_scalar(v)]);
                    any = true;
                }
            }
            _ => {
                builder.push_record([key.clone(), format_scalar(val)]);
                any = true;
            }
        }
    }
    if any {
        println!("{}", Table::from(builder));
    }
}

fn print_rows(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_scalar).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_scalar(item));
        }
    }
}
