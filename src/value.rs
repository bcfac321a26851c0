//! Conversions of model values for use in the DOM.

use serde_json::Value;


/// The string a value is rendered as: strings as they are, numbers
/// and booleans in their JSON form, sequences comma separated, maps
/// as compact JSON, null as the empty string.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) =>
            items.iter().map(to_display_string).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Same as `to_display_string`, with a missing value rendering as
/// the empty string.
pub fn opt_to_display_string(value: Option<&Value>) -> String {
    value.map(to_display_string).unwrap_or_default()
}

/// `null`, `false`, `0` and `""` are false, everything else true
/// (including empty sequences and maps).
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0),
        Some(Value::String(s)) => ! s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;
    use super::*;

    #[test]
    fn t_display_string() {
        assert_eq!(to_display_string(&json!("Pearl Jam")), "Pearl Jam");
        assert_eq!(to_display_string(&json!(0)), "0");
        assert_eq!(to_display_string(&json!(1992)), "1992");
        assert_eq!(to_display_string(&json!(1.5)), "1.5");
        assert_eq!(to_display_string(&json!(false)), "false");
        assert_eq!(to_display_string(&json!(null)), "");
        assert_eq!(to_display_string(&json!([1, "a", null])), "1,a,");
        assert_eq!(to_display_string(&json!({"a": 1})), "{\"a\":1}");
        assert_eq!(opt_to_display_string(None), "");
    }

    #[test]
    fn t_truthy() {
        assert!(! is_truthy(None));
        assert!(! is_truthy(Some(&json!(0))));
        assert!(! is_truthy(Some(&json!(0.0))));
        assert!(! is_truthy(Some(&json!(""))));
        assert!(! is_truthy(Some(&json!(false))));
        assert!(is_truthy(Some(&json!(true))));
        assert!(is_truthy(Some(&json!("0"))));
        assert!(is_truthy(Some(&json!(-1))));
        assert!(is_truthy(Some(&json!([]))));
        assert!(is_truthy(Some(&json!({}))));
    }
}
