//! Structured reply parsing
//!
//! Models asked for JSON frequently wrap it in markdown fences or surrounding
//! prose. The extractor finds the outermost brackets of the first JSON value
//! and typed parsing turns anything that does not fit the expected shape into
//! a `Schema` error, which callers fold like any other service failure.

use fathom_core::{FathomError, FathomResult};
use serde::de::DeserializeOwned;

/// Extract the first JSON object or array embedded in an LLM reply.
pub fn extract_json(reply: &str) -> Option<&str> {
    let first_object = reply.find('{');
    let first_array = reply.find('[');

    let (open, close) = match (first_object, first_array) {
        (Some(o), Some(a)) => {
            if a < o {
                ('[', ']')
            } else {
                ('{', '}')
            }
        }
        (Some(_), None) => ('{', '}'),
        (None, Some(_)) => ('[', ']'),
        (None, None) => return None,
    };

    let start = reply.find(open)?;
    let end = reply.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&reply[start..=end])
}

/// Parse a structured reply into `T`.
///
/// Returns `FathomError::Schema` when no JSON value is present or the value
/// does not match the expected shape.
pub fn parse_structured<T: DeserializeOwned>(reply: &str) -> FathomResult<T> {
    let json = extract_json(reply)
        .ok_or_else(|| FathomError::schema("No JSON value found in reply"))?;

    serde_json::from_str(json)
        .map_err(|e| FathomError::schema(format!("Reply did not match expected shape: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        name: String,
        count: usize,
    }

    #[test]
    fn parses_bare_object() {
        let reply = r#"{"name": "alpha", "count": 2}"#;
        let item: Item = parse_structured(reply).unwrap();
        assert_eq!(item.name, "alpha");
        assert_eq!(item.count, 2);
    }

    #[test]
    fn parses_fenced_array_with_prose() {
        let reply = "Here are the items you asked for:\n```json\n[{\"name\": \"a\", \"count\": 1}, {\"name\": \"b\", \"count\": 2}]\n```\nLet me know if you need more.";
        let items: Vec<Item> = parse_structured(reply).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].name, "b");
    }

    #[test]
    fn array_before_object_selects_array() {
        let reply = r#"[{"name": "a", "count": 1}]"#;
        let items: Vec<Item> = parse_structured(reply).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn missing_json_is_a_schema_error() {
        let reply = "I could not find anything relevant.";
        let result: FathomResult<Item> = parse_structured(reply);
        assert!(matches!(result, Err(FathomError::Schema(_))));
    }

    #[test]
    fn wrong_shape_is_a_schema_error() {
        let reply = r#"{"unexpected": true}"#;
        let result: FathomResult<Item> = parse_structured(reply);
        assert!(matches!(result, Err(FathomError::Schema(_))));
    }
}
