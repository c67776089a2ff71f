/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Build options.
 */

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Options for one build invocation.
///
/// Deserializes from the `build` section of a project configuration; every
/// field has a default, so an empty mapping is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildOptions {
    /// Files processed concurrently in the document phase
    pub workers: usize,
    /// Run executable cells
    pub execute: bool,
    /// Execute even when the cache has a result
    pub force_execute: bool,
    /// Root of the execution cache; no cache when unset
    pub cache_dir: Option<PathBuf>,
    /// Rule ids whose diagnostics are dropped
    pub suppressed_rules: BTreeSet<String>,
    /// Per-cell timeout in seconds, unless the page overrides it
    pub execution_timeout: u64,
    /// Deepest chain of nested includes
    pub include_depth_limit: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            execute: false,
            force_execute: false,
            cache_dir: None,
            suppressed_rules: BTreeSet::new(),
            execution_timeout: 30,
            include_depth_limit: 8,
        }
    }
}

impl BuildOptions {
    /// Parse options from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Worker count, at least one.
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout)
    }

    pub fn suppressed(&self) -> Arc<BTreeSet<String>> {
        Arc::new(self.suppressed_rules.clone())
    }
}
