//! Reference resolution against a definitions table

use serde_json::Value;

/// Walk `definitions` through each path segment.
///
/// Object segments are keys; a numeric segment indexes an array. Returns
/// `None` when any segment is missing.
pub fn resolve<'d>(path: &[String], definitions: &'d Value) -> Option<&'d Value> {
    path.iter().try_fold(definitions, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolves_nested_path() {
        let defs = json!({"defs": {"inner": {"c": "$"}}});
        assert_eq!(
            resolve(&path(&["defs", "inner"]), &defs),
            Some(&json!({"c": "$"}))
        );
    }

    #[test]
    fn test_missing_segment() {
        let defs = json!({"defs": {"inner": {"c": "$"}}});
        assert_eq!(resolve(&path(&["defs", "outer"]), &defs), None);
        assert_eq!(resolve(&path(&["defs", "inner", "c", "x"]), &defs), None);
    }

    #[test]
    fn test_array_index_segment() {
        let defs = json!({"shapes": ["$", "#"]});
        assert_eq!(resolve(&path(&["shapes", "1"]), &defs), Some(&json!("#")));
        assert_eq!(resolve(&path(&["shapes", "2"]), &defs), None);
    }

    #[test]
    fn test_empty_path_is_root() {
        let defs = json!({"a": "$"});
        assert_eq!(resolve(&[], &defs), Some(&defs));
    }
}
