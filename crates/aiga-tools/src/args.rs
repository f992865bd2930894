//! Loose argument handling shared by the query capabilities.
//!
//! Arguments arrive as model-written JSON: every search field may hold one
//! string or a list of strings, and limits may be missing or zero.

use serde::{Deserialize, Serialize};

/// Hard cap on rows a single capability returns.
pub const RESULT_LIMIT_CAP: usize = 10;
/// Rows returned when the call does not ask for a specific count.
pub const DEFAULT_RESULT_LIMIT: usize = 10;

/// A field the model may fill with one value or several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl Default for StringOrList {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl StringOrList {
    /// Trimmed non-empty values in input order.
    pub fn values(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            Self::One(value) => vec![value.as_str()],
            Self::Many(values) => values.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }
}

/// Rows to return for a call-supplied limit.
pub fn final_limit(limit: Option<u32>) -> usize {
    match limit {
        Some(n) if n > 0 => (n as usize).min(RESULT_LIMIT_CAP),
        _ => DEFAULT_RESULT_LIMIT,
    }
}

/// Whether any term would split into tokens under boolean matching.
pub fn has_multiword_term(terms: &[String]) -> bool {
    terms.iter().any(|t| t.contains(char::is_whitespace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Input {
        #[serde(default)]
        disease: StringOrList,
    }

    #[test]
    fn scalar_and_list_forms_both_deserialize() {
        let scalar: Input = serde_json::from_value(json!({"disease": "협심증"})).unwrap();
        assert_eq!(scalar.disease.values(), vec!["협심증"]);

        let list: Input =
            serde_json::from_value(json!({"disease": ["협심증", " 녹내장 "]})).unwrap();
        assert_eq!(list.disease.values(), vec!["협심증", "녹내장"]);
    }

    #[test]
    fn missing_field_defaults_to_empty() {
        let input: Input = serde_json::from_value(json!({})).unwrap();
        assert!(input.disease.is_empty());
    }

    #[test]
    fn blank_entries_are_dropped() {
        let field = StringOrList::Many(vec!["".to_string(), "  ".to_string()]);
        assert!(field.is_empty());
    }

    #[test]
    fn limit_is_clamped_and_defaulted() {
        assert_eq!(final_limit(None), DEFAULT_RESULT_LIMIT);
        assert_eq!(final_limit(Some(0)), DEFAULT_RESULT_LIMIT);
        assert_eq!(final_limit(Some(3)), 3);
        assert_eq!(final_limit(Some(50)), RESULT_LIMIT_CAP);
    }

    #[test]
    fn multiword_detection() {
        assert!(has_multiword_term(&["소아 아토피".to_string()]));
        assert!(!has_multiword_term(&["협심증".to_string()]));
    }
}
