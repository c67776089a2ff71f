/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Frontmatter for MyST documents.
 */

//! Frontmatter model and the project/page inheritance rules.
//!
//! Frontmatter is merged as untyped values first ([`merge_frontmatter`]) and
//! only then materialized into a typed [`Frontmatter`]. Merging untyped values
//! keeps the inheritance rules independent of which fields a page happens to
//! set, and lets `null` act as an explicit "don't inherit" marker.

pub mod merge;
pub mod numbering;
pub mod types;

pub use merge::{MergeOp, merge_frontmatter, merge_op_for};
pub use numbering::{Numbering, NumberingPolicy, NumberingScope, fill_template};
pub use types::{Affiliation, Author, ExecutionPolicy, Frontmatter, KernelSpec, License};

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("frontmatter is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("frontmatter must be a mapping, found {0}")]
    NotAMapping(&'static str),

    #[error("invalid frontmatter: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Parse a YAML frontmatter block into an untyped mapping.
///
/// An empty block yields an empty mapping.
pub fn parse_yaml(text: &str) -> Result<Value, FrontmatterError> {
    if text.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    let value: Value = serde_yaml::from_str(text)?;
    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Default::default())),
        Value::Array(_) => Err(FrontmatterError::NotAMapping("a list")),
        Value::String(_) => Err(FrontmatterError::NotAMapping("a string")),
        Value::Number(_) => Err(FrontmatterError::NotAMapping("a number")),
        Value::Bool(_) => Err(FrontmatterError::NotAMapping("a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_mapping() {
        let value = parse_yaml("title: Hello\nauthors:\n  - Ada\n").unwrap();
        assert_eq!(value["title"], "Hello");
        assert_eq!(value["authors"][0], "Ada");
    }

    #[test]
    fn test_parse_yaml_empty() {
        assert_eq!(parse_yaml("  \n").unwrap(), serde_json::json!({}));
        assert_eq!(parse_yaml("~").unwrap(), serde_json::json!({}));
    }

    #[test]
    fn test_parse_yaml_rejects_scalars() {
        assert!(matches!(
            parse_yaml("- a\n- b"),
            Err(FrontmatterError::NotAMapping("a list"))
        ));
        assert!(matches!(
            parse_yaml("title: [unclosed"),
            Err(FrontmatterError::Yaml(_))
        ));
    }
}
