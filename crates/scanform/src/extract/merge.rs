use serde_json::{Map, Value};

use super::ExtractionError;

/// True iff `s` parses as JSON of any shape.
pub fn is_valid_json(s: &str) -> bool {
    serde_json::from_str::<Value>(s).is_ok()
}

/// Overlays `corrected` onto `extracted`. Corrected keys always win;
/// keys only one side has are kept.
pub fn merge_objects(extracted: &Map<String, Value>, corrected: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = extracted.clone();
    for (key, value) in corrected {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

fn parse_object(s: &str) -> Result<Map<String, Value>, ExtractionError> {
    match serde_json::from_str::<Value>(s)? {
        Value::Object(map) => Ok(map),
        _ => Err(ExtractionError::NotAnObject),
    }
}

/// String form of [`merge_objects`]. Both inputs must be JSON objects.
pub fn merge(extracted: &str, corrected: &str) -> Result<String, ExtractionError> {
    let extracted = parse_object(extracted)?;
    let corrected = parse_object(corrected)?;
    Ok(Value::Object(merge_objects(&extracted, &corrected)).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_is_valid_json() {
        assert!(is_valid_json("{}"));
        assert!(is_valid_json("[1, 2]"));
        assert!(is_valid_json("\"text\""));
        assert!(!is_valid_json("{not valid}"));
        assert!(!is_valid_json(""));
    }

    #[test]
    fn test_corrected_keys_win_and_unique_keys_survive() {
        let e = obj(json!({"firstName": "Jon", "email": "j@x.io"}));
        let c = obj(json!({"firstName": "John", "phone": "5551234567"}));
        let merged = merge_objects(&e, &c);

        assert_eq!(merged["firstName"], "John");
        assert_eq!(merged["email"], "j@x.io");
        assert_eq!(merged["phone"], "5551234567");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let e = obj(json!({"a": 1, "b": {"x": true}, "c": null}));
        let c = obj(json!({"b": 2, "d": [1, 2]}));
        let once = merge_objects(&e, &c);
        let twice = merge_objects(&once, &c);
        assert_eq!(once, twice);
        for (k, v) in &c {
            assert_eq!(&once[k], v);
        }
    }

    #[test]
    fn test_merge_strings() {
        let merged = merge(r#"{"a":1,"b":2}"#, r#"{"b":3}"#).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&merged).unwrap(), json!({"a": 1, "b": 3}));
    }

    #[test]
    fn test_merge_rejects_non_objects() {
        assert!(matches!(merge("{}", "[1]"), Err(ExtractionError::NotAnObject)));
        assert!(matches!(merge("{", "{}"), Err(ExtractionError::InvalidJson(_))));
    }
}
