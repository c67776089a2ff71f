/*
 * types.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Typed frontmatter.
 */

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::FrontmatterError;
use crate::numbering::Numbering;

/// Document metadata after project inheritance.
///
/// Only the fields the engine acts on are typed; everything else is kept in
/// `extra` and passed through to backends untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Frontmatter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "one_or_many")]
    pub authors: Vec<Author>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "one_or_many")]
    pub affiliations: Vec<Affiliation>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "one_or_many")]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "one_or_many")]
    pub bibliography: Vec<String>,
    pub numbering: Numbering,
    pub execution: ExecutionPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernelspec: Option<KernelSpec>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Frontmatter {
    pub fn from_value(value: Value) -> Result<Frontmatter, FrontmatterError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Result<Value, FrontmatterError> {
        Ok(serde_json::to_value(self)?)
    }
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
        Null(()),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![item],
        OneOrMany::Null(()) => Vec::new(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AuthorRepr")]
pub struct Author {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub affiliations: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub corresponding: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AuthorRepr {
    Name(String),
    Full {
        name: String,
        email: Option<String>,
        orcid: Option<String>,
        #[serde(default, deserialize_with = "one_or_many")]
        affiliations: Vec<String>,
        #[serde(default)]
        corresponding: bool,
    },
}

impl From<AuthorRepr> for Author {
    fn from(repr: AuthorRepr) -> Self {
        match repr {
            AuthorRepr::Name(name) => Author {
                name,
                email: None,
                orcid: None,
                affiliations: Vec::new(),
                corresponding: false,
            },
            AuthorRepr::Full {
                name,
                email,
                orcid,
                affiliations,
                corresponding,
            } => Author {
                name,
                email,
                orcid,
                affiliations,
                corresponding,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AffiliationRepr")]
pub struct Affiliation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AffiliationRepr {
    Name(String),
    Full { id: Option<String>, name: String },
}

impl From<AffiliationRepr> for Affiliation {
    fn from(repr: AffiliationRepr) -> Self {
        match repr {
            AffiliationRepr::Name(name) => Affiliation { id: None, name },
            AffiliationRepr::Full { id, name } => Affiliation { id, name },
        }
    }
}

/// License, either an SPDX id or a free-text statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum License {
    Id(String),
    Detailed {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

/// Whether and how a page's code cells run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionPolicy {
    /// Page-level opt-out; the build must also enable execution
    pub enabled: bool,
    /// Use and fill the execution cache
    pub cache: bool,
    /// Per-cell timeout in seconds, overriding the build default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Keep going after a cell raises an error
    pub allow_errors: bool,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        ExecutionPolicy {
            enabled: true,
            cache: true,
            timeout: None,
            allow_errors: true,
        }
    }
}

/// Kernel a page's code cells run in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_frontmatter;
    use serde_json::json;

    #[test]
    fn test_authors_as_strings_or_objects() {
        let fm = Frontmatter::from_value(json!({
            "title": "Paper",
            "authors": ["Ada", {"name": "Grace", "email": "g@x.org", "affiliations": "Navy"}]
        }))
        .unwrap();
        assert_eq!(fm.authors.len(), 2);
        assert_eq!(fm.authors[0].name, "Ada");
        assert_eq!(fm.authors[1].affiliations, vec!["Navy"]);
    }

    #[test]
    fn test_single_author_and_keyword() {
        let fm = Frontmatter::from_value(json!({"authors": "Ada", "keywords": "x"})).unwrap();
        assert_eq!(fm.authors[0].name, "Ada");
        assert_eq!(fm.keywords, vec!["x"]);
    }

    #[test]
    fn test_unknown_keys_kept() {
        let fm = Frontmatter::from_value(json!({"venue": {"title": "JOSS"}})).unwrap();
        assert_eq!(fm.extra["venue"]["title"], "JOSS");
    }

    #[test]
    fn test_license_forms() {
        let fm = Frontmatter::from_value(json!({"license": "CC-BY-4.0"})).unwrap();
        assert_eq!(fm.license, Some(License::Id("CC-BY-4.0".into())));
        let fm = Frontmatter::from_value(json!({"license": {"content": "CC-BY-4.0"}})).unwrap();
        assert!(matches!(fm.license, Some(License::Detailed { .. })));
    }

    #[test]
    fn test_execution_defaults() {
        let fm = Frontmatter::default();
        assert!(fm.execution.enabled);
        assert!(fm.execution.cache);
        let fm = Frontmatter::from_value(json!({"execution": {"cache": false}})).unwrap();
        assert!(fm.execution.enabled);
        assert!(!fm.execution.cache);
    }

    #[test]
    fn test_inherited_frontmatter_materializes() {
        let project = json!({"authors": ["Ada"], "numbering": {"heading": true}});
        let page = json!({"title": "Ch 1", "authors": ["Grace"]});
        let fm = Frontmatter::from_value(merge_frontmatter(&project, &page)).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Ch 1"));
        assert_eq!(
            fm.authors.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
            vec!["Ada", "Grace"]
        );
        assert!(fm.numbering.heading.enabled);
    }
}
