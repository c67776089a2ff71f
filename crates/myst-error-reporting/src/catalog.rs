//! Rule catalog.
//!
//! Every diagnostic the engine emits carries a stable rule id. The catalog
//! maps ids to their subsystem and a description, and is embedded at compile
//! time from `rule_catalog.json`.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata for a rule id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleInfo {
    /// Subsystem name (e.g. "parser", "resolver")
    pub subsystem: String,
    pub title: String,
    pub description: String,
}

/// Global rule catalog, parsed lazily from the embedded JSON.
///
/// # Panics
///
/// Panics if the embedded JSON is invalid, which is caught by the catalog
/// tests.
pub static RULE_CATALOG: Lazy<HashMap<String, RuleInfo>> = Lazy::new(|| {
    let json_data = include_str!("../rule_catalog.json");
    serde_json::from_str(json_data).expect("Invalid rule catalog JSON")
});

pub fn get_rule_info(code: &str) -> Option<&'static RuleInfo> {
    RULE_CATALOG.get(code)
}

/// Rule ids used across the engine.
pub mod rules {
    pub const PARSE_EXTENSION_SYNTAX: &str = "parse-extension-syntax";
    pub const FRONTMATTER_VALID: &str = "frontmatter-valid";
    pub const DIRECTIVE_KNOWN: &str = "directive-known";
    pub const DIRECTIVE_ARG_CORRECT: &str = "directive-arg-correct";
    pub const DIRECTIVE_OPTIONS_CORRECT: &str = "directive-options-correct";
    pub const DIRECTIVE_BODY_CORRECT: &str = "directive-body-correct";
    pub const ROLE_KNOWN: &str = "role-known";
    pub const ROLE_BODY_CORRECT: &str = "role-body-correct";
    pub const EXTENSION_SHADOWED: &str = "extension-shadowed";
    pub const IDENTIFIER_IS_UNIQUE: &str = "identifier-is-unique";
    pub const REFERENCE_TARGET_RESOLVES: &str = "reference-target-resolves";
    pub const FOOTNOTE_TARGET_RESOLVES: &str = "footnote-target-resolves";
    pub const CITATION_RENDERS: &str = "citation-renders";
    pub const INCLUDE_FILE_EXISTS: &str = "include-file-exists";
    pub const INCLUDE_CYCLE: &str = "include-cycle";
    pub const EXECUTION_FAILED: &str = "execution-failed";
    pub const EXECUTION_CACHE: &str = "execution-cache";
    pub const PASS_FAILED: &str = "pass-failed";
    pub const BUILD_CANCELLED: &str = "build-cancelled";
    pub const MIGRATION_PATH_EXISTS: &str = "migration-path-exists";
    pub const EXPORT_TOOL_FAILED: &str = "export-tool-failed";

    /// All rule ids, in catalog order.
    pub const ALL: &[&str] = &[
        PARSE_EXTENSION_SYNTAX,
        FRONTMATTER_VALID,
        DIRECTIVE_KNOWN,
        DIRECTIVE_ARG_CORRECT,
        DIRECTIVE_OPTIONS_CORRECT,
        DIRECTIVE_BODY_CORRECT,
        ROLE_KNOWN,
        ROLE_BODY_CORRECT,
        EXTENSION_SHADOWED,
        IDENTIFIER_IS_UNIQUE,
        REFERENCE_TARGET_RESOLVES,
        FOOTNOTE_TARGET_RESOLVES,
        CITATION_RENDERS,
        INCLUDE_FILE_EXISTS,
        INCLUDE_CYCLE,
        EXECUTION_FAILED,
        EXECUTION_CACHE,
        PASS_FAILED,
        BUILD_CANCELLED,
        MIGRATION_PATH_EXISTS,
        EXPORT_TOOL_FAILED,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        assert!(!RULE_CATALOG.is_empty());
    }

    #[test]
    fn test_every_rule_is_catalogued() {
        for rule in rules::ALL {
            assert!(get_rule_info(rule).is_some(), "missing rule {}", rule);
        }
        assert_eq!(RULE_CATALOG.len(), rules::ALL.len());
    }

    #[test]
    fn test_rule_subsystem() {
        let info = get_rule_info(rules::IDENTIFIER_IS_UNIQUE).unwrap();
        assert_eq!(info.subsystem, "resolver");
    }

    #[test]
    fn test_unknown_rule() {
        assert!(get_rule_info("no-such-rule").is_none());
    }
}
