/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Project configuration file loading.
 */

//! `myst.yml` at the project root.
//!
//! ```yaml
//! project:        # frontmatter every page inherits
//!   title: Book
//!   numbering: true
//! build:          # BuildOptions
//!   workers: 4
//!   cache-dir: _build/cache
//! ```
//!
//! Both sections are optional, as is the file itself.

use std::path::Path;

use anyhow::{Context, Result};
use myst_core::BuildOptions;
use serde_json::Value;

pub const CONFIG_FILE: &str = "myst.yml";

#[derive(Debug, Clone, Default)]
pub struct ProjectConfig {
    /// Project frontmatter, as the value-level merge expects it
    pub frontmatter: Value,
    pub build: BuildOptions,
}

pub fn load(root: &Path) -> Result<ProjectConfig> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no project configuration");
        return Ok(ProjectConfig {
            frontmatter: Value::Object(Default::default()),
            build: BuildOptions::default(),
        });
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse(&text).with_context(|| format!("Invalid configuration in {}", path.display()))
}

pub fn parse(text: &str) -> Result<ProjectConfig> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text)?;
    let frontmatter = match yaml.get("project") {
        Some(project) if !project.is_null() => {
            serde_json::to_value(project).context("`project` must be a mapping with string keys")?
        }
        _ => Value::Object(Default::default()),
    };
    if !frontmatter.is_object() {
        anyhow::bail!("`project` must be a mapping");
    }
    let build = match yaml.get("build") {
        Some(build) if !build.is_null() => {
            serde_yaml::from_value(build.clone()).context("Invalid `build` section")?
        }
        _ => BuildOptions::default(),
    };
    Ok(ProjectConfig { frontmatter, build })
}
