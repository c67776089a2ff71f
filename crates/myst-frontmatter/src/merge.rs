/*
 * merge.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Project-to-page frontmatter inheritance.
 */

use serde_json::{Map, Value};

/// How a page value combines with the project value for the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeOp {
    /// Page value replaces the project value
    #[default]
    Prefer,
    /// Page list is appended to the project list
    Concat,
}

/// Keys whose list values accumulate from project to page.
const CONCAT_KEYS: &[&str] = &["authors", "affiliations", "keywords", "bibliography"];

pub fn merge_op_for(key: &str) -> MergeOp {
    if CONCAT_KEYS.contains(&key) {
        MergeOp::Concat
    } else {
        MergeOp::Prefer
    }
}

/// Merge page frontmatter over project frontmatter.
///
/// The merge is shallow: each top-level page key either replaces or extends
/// the project key. A page value of `null`, or an empty string, list or
/// mapping, removes the inherited value altogether. Non-object inputs are treated as empty.
pub fn merge_frontmatter(project: &Value, page: &Value) -> Value {
    let empty = Map::new();
    let project = project.as_object().unwrap_or(&empty);
    let page = page.as_object().unwrap_or(&empty);

    let mut out = project.clone();
    for (key, page_value) in page {
        if is_suppression(page_value) {
            out.remove(key);
            continue;
        }
        let merged = match (merge_op_for(key), out.get(key)) {
            (MergeOp::Concat, Some(project_value)) => concat(project_value, page_value),
            _ => page_value.clone(),
        };
        out.insert(key.clone(), merged);
    }
    Value::Object(out)
}

fn is_suppression(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Concatenate two list-ish values, skipping page entries already present.
///
/// A lone scalar counts as a one-element list.
fn concat(base: &Value, extra: &Value) -> Value {
    let mut items = as_items(base);
    for item in as_items(extra) {
        if !items.contains(&item) {
            items.push(item);
        }
    }
    Value::Array(items)
}

fn as_items(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_scalars_override() {
        let project = json!({"title": "Book", "license": "CC-BY-4.0"});
        let page = json!({"title": "Chapter 1"});
        let merged = merge_frontmatter(&project, &page);
        assert_eq!(merged["title"], "Chapter 1");
        assert_eq!(merged["license"], "CC-BY-4.0");
    }

    #[test]
    fn test_authors_concatenate() {
        let project = json!({"authors": ["Ada"], "keywords": "math"});
        let page = json!({"authors": ["Grace", "Ada"], "keywords": ["logic"]});
        let merged = merge_frontmatter(&project, &page);
        assert_eq!(merged["authors"], json!(["Ada", "Grace"]));
        assert_eq!(merged["keywords"], json!(["math", "logic"]));
    }

    #[test]
    fn test_null_or_empty_suppresses_inheritance() {
        let project = json!({"authors": ["Ada"], "affiliations": ["MIT"], "license": "MIT"});
        let page = json!({"authors": null, "affiliations": [], "license": null});
        let merged = merge_frontmatter(&project, &page);
        assert!(merged.get("authors").is_none());
        assert!(merged.get("affiliations").is_none());
        assert!(merged.get("license").is_none());
    }

    #[test]
    fn test_empty_string_and_mapping_suppress_inheritance() {
        let project = json!({"subtitle": "A book", "numbering": {"figure": true}, "title": "Book"});
        let page = json!({"subtitle": "", "numbering": {}});
        let merged = merge_frontmatter(&project, &page);
        assert!(merged.get("subtitle").is_none());
        assert!(merged.get("numbering").is_none());
        assert_eq!(merged["title"], "Book");
    }

    #[test]
    fn test_nested_objects_replace() {
        let project = json!({"numbering": {"figure": {"start": 5}, "heading": true}});
        let page = json!({"numbering": {"figure": {"start": 1}}});
        let merged = merge_frontmatter(&project, &page);
        assert_eq!(merged["numbering"], json!({"figure": {"start": 1}}));
    }

    #[test]
    fn test_page_only_list_is_kept() {
        let merged = merge_frontmatter(&json!({}), &json!({"authors": ["Ada"]}));
        assert_eq!(merged["authors"], json!(["Ada"]));
        let merged = merge_frontmatter(&Value::Null, &json!({"title": "x"}));
        assert_eq!(merged["title"], "x");
    }
}
