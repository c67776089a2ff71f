/*
 * citations.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * CSL-JSON citation catalog and author-year rendering.
 */

//! Bibliography data for citation rendering.
//!
//! Entries are read from CSL-JSON, the interchange format reference
//! managers export. Only the fields needed for author-year in-text
//! citations and a plain reference list are typed; the rest is kept.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CslName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,
    /// Institutional or single-field names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
}

impl CslName {
    /// The part of the name used in citations.
    pub fn short(&self) -> String {
        self.family
            .clone()
            .or_else(|| self.literal.clone())
            .or_else(|| self.given.clone())
            .unwrap_or_default()
    }

    /// `Family, G.` for reference lists.
    pub fn inverted(&self) -> String {
        match (&self.family, &self.given) {
            (Some(family), Some(given)) => {
                let initials: Vec<String> = given
                    .split_whitespace()
                    .filter_map(|part| part.chars().next())
                    .map(|c| format!("{c}."))
                    .collect();
                format!("{family}, {}", initials.join(" "))
            }
            _ => self.short(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CslDate {
    #[serde(rename = "date-parts", default, skip_serializing_if = "Vec::is_empty")]
    pub date_parts: Vec<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
}

impl CslDate {
    pub fn year(&self) -> Option<String> {
        if let Some(first) = self.date_parts.first().and_then(|p| p.first()) {
            return match first {
                Value::Number(n) => Some(n.to_string()),
                Value::String(s) => Some(s.clone()),
                _ => None,
            };
        }
        self.literal.clone()
    }
}

/// One bibliography entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CslItem {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author: Vec<CslName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued: Option<CslDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_title: Option<String>,
    #[serde(rename = "DOI", default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(rename = "URL", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl CslItem {
    /// `Doe`, `Doe & Roe`, or `Doe et al.`; the title when there are no
    /// authors.
    pub fn author_label(&self) -> String {
        match self.author.as_slice() {
            [] => self.title.clone().unwrap_or_else(|| self.id.clone()),
            [one] => one.short(),
            [a, b] => format!("{} & {}", a.short(), b.short()),
            [first, ..] => format!("{} et al.", first.short()),
        }
    }

    pub fn year(&self) -> String {
        self.issued
            .as_ref()
            .and_then(CslDate::year)
            .unwrap_or_else(|| "n.d.".to_string())
    }

    /// In-text citation: `Doe, 2020` or `Doe (2020)`.
    pub fn cite(&self, narrative: bool) -> String {
        if narrative {
            format!("{} ({})", self.author_label(), self.year())
        } else {
            format!("{}, {}", self.author_label(), self.year())
        }
    }

    /// Reference-list entry: `Doe, J. (2020). Title. Journal. doi`.
    pub fn reference(&self) -> String {
        let authors: Vec<String> = self.author.iter().map(CslName::inverted).collect();
        let mut out = if authors.is_empty() {
            String::new()
        } else {
            format!("{} ", authors.join(", "))
        };
        out.push_str(&format!("({}).", self.year()));
        if let Some(title) = &self.title {
            out.push_str(&format!(" {title}."));
        }
        if let Some(container) = &self.container_title {
            out.push_str(&format!(" {container}."));
        }
        if let Some(doi) = &self.doi {
            out.push_str(&format!(" https://doi.org/{doi}"));
        } else if let Some(url) = &self.url {
            out.push_str(&format!(" {url}"));
        }
        out
    }

    /// Sort key for reference lists.
    pub fn sort_key(&self) -> (String, String, String) {
        (
            self.author_label().to_lowercase(),
            self.year(),
            self.id.clone(),
        )
    }
}

/// Citation keys mapped to entries, in load order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CitationCatalog {
    items: IndexMap<String, CslItem>,
}

impl CitationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a CSL-JSON array.
    pub fn from_csl_json(text: &str) -> Result<Self, serde_json::Error> {
        let items: Vec<CslItem> = serde_json::from_str(text)?;
        let mut catalog = CitationCatalog::new();
        for item in items {
            catalog.insert(item);
        }
        Ok(catalog)
    }

    /// Add an entry. A later entry with the same id replaces the earlier one.
    pub fn insert(&mut self, item: CslItem) {
        self.items.insert(item.id.clone(), item);
    }

    /// Add every entry of `other` not already present.
    pub fn extend_missing(&mut self, other: &CitationCatalog) {
        for (id, item) in &other.items {
            if !self.items.contains_key(id) {
                self.items.insert(id.clone(), item.clone());
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&CslItem> {
        self.items.get(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
