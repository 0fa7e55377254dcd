//! Fail-closed decoders for loosely-shaped model JSON.
//!
//! The model is asked for specific field names but does not always comply.
//! Each helper tries a list of known keys in priority order and falls
//! closed (empty/None) instead of guessing, so the ambiguity lives here
//! and nowhere else.

use serde_json::Value;

/// First present key holding a string list; the value itself may also be
/// a bare array. Non-string elements are dropped.
pub fn string_list(value: &Value, keys: &[&str]) -> Vec<String> {
    let array = keys
        .iter()
        .find_map(|k| value.get(k).and_then(Value::as_array))
        .or_else(|| value.as_array());

    array
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// First present key holding a non-empty string.
pub fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| value.get(k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// First present key holding an unsigned integer (number or numeric
/// string).
pub fn u64_field(value: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| {
        let v = value.get(k)?;
        v.as_u64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    })
}

/// Yes/no answer: accepts booleans and "yes"/"no" strings.
pub fn yes_no(value: &Value, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|k| {
        let v = value.get(k)?;
        if let Some(b) = v.as_bool() {
            return Some(b);
        }
        match v.as_str()?.trim().to_lowercase().as_str() {
            "yes" | "true" => Some(true),
            "no" | "false" => Some(false),
            _ => None,
        }
    })
}

/// A 1-based candidate pick. "none" (or anything non-numeric) is a
/// deliberate no-pick, not an error.
pub fn choice_index(value: &Value, keys: &[&str]) -> Option<usize> {
    keys.iter().find_map(|k| {
        let v = value.get(k)?;
        let n = v
            .as_u64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))?;
        (n >= 1).then(|| (n - 1) as usize)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_list_tries_keys_in_order() {
        let v = json!({"key_phrases": ["a"], "phrases": ["b", "c"]});
        assert_eq!(string_list(&v, &["phrases", "key_phrases"]), vec!["b", "c"]);
        assert_eq!(string_list(&v, &["key_phrases", "phrases"]), vec!["a"]);
    }

    #[test]
    fn test_string_list_accepts_bare_array() {
        let v = json!(["x", "y"]);
        assert_eq!(string_list(&v, &["phrases"]), vec!["x", "y"]);
    }

    #[test]
    fn test_string_list_fails_closed() {
        let v = json!({"phrases": "not an array"});
        assert!(string_list(&v, &["phrases"]).is_empty());
        assert!(string_list(&json!({}), &["phrases"]).is_empty());
    }

    #[test]
    fn test_string_list_drops_non_strings_and_blanks() {
        let v = json!({"phrases": ["ok", 42, "", "  ", "also ok"]});
        assert_eq!(string_list(&v, &["phrases"]), vec!["ok", "also ok"]);
    }

    #[test]
    fn test_string_field() {
        let v = json!({"url": "https://x.com", "link": "https://y.com"});
        assert_eq!(string_field(&v, &["url", "link"]).as_deref(), Some("https://x.com"));
        assert_eq!(string_field(&json!({"url": ""}), &["url"]), None);
    }

    #[test]
    fn test_u64_field_number_or_string() {
        assert_eq!(u64_field(&json!({"author_id": 3}), &["author_id"]), Some(3));
        assert_eq!(u64_field(&json!({"author_id": "3"}), &["author_id"]), Some(3));
        assert_eq!(u64_field(&json!({"author_id": "x"}), &["author_id"]), None);
    }

    #[test]
    fn test_yes_no() {
        assert_eq!(yes_no(&json!({"suitable": "yes"}), &["suitable"]), Some(true));
        assert_eq!(yes_no(&json!({"suitable": "No"}), &["suitable"]), Some(false));
        assert_eq!(yes_no(&json!({"suitable": true}), &["suitable"]), Some(true));
        assert_eq!(yes_no(&json!({"suitable": "maybe"}), &["suitable"]), None);
    }

    #[test]
    fn test_choice_index_is_one_based() {
        assert_eq!(choice_index(&json!({"choice": 1}), &["choice"]), Some(0));
        assert_eq!(choice_index(&json!({"choice": "2"}), &["choice"]), Some(1));
        assert_eq!(choice_index(&json!({"choice": "none"}), &["choice"]), None);
        assert_eq!(choice_index(&json!({"choice": 0}), &["choice"]), None);
    }
}
