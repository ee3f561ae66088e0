pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("JSON serialization error: {}", e),
        },
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// A non-empty array whose first element is an object.
pub(crate) fn is_row_array(arr: &[Value]) -> bool {
    matches!(arr.first(), Some(Value::Object(_)))
}

pub(crate) fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_array_detection() {
        assert!(is_row_array(&[json!({ "year": 1 })]));
        assert!(!is_row_array(&[json!(1)]));
        assert!(!is_row_array(&[]));
    }

    #[test]
    fn test_null_renders_as_dash() {
        assert_eq!(format_scalar(&Value::Null), "-");
        assert_eq!(format_scalar(&json!("0.08")), "0.08");
    }
}
