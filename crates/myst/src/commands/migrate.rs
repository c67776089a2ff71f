/*
 * migrate.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Migrate command implementation
 */

use std::path::PathBuf;

use anyhow::{Context, Result};
use myst_ast::{CURRENT_VERSION, VersionedTree};

#[derive(Debug)]
pub struct MigrateArgs {
    pub input: PathBuf,
    pub to: Option<u32>,
    pub output: Option<PathBuf>,
}

pub fn execute(args: MigrateArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let json = migrate_text(&text, args.to.unwrap_or(CURRENT_VERSION))?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

fn migrate_text(text: &str, version: u32) -> Result<String> {
    let tree: VersionedTree = serde_json::from_str(text).context("Not a versioned tree")?;
    let from = tree.version;
    let tree = tree.to_version(version)?;
    tracing::info!(from, to = version, "migrated tree");
    Ok(serde_json::to_string_pretty(&tree)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_upgrades_footnote_numbers() {
        let input = json!({
            "mystVersion": 1,
            "tree": {"type": "root", "children": [
                {"type": "footnoteReference", "identifier": "a", "number": 2}
            ]}
        });
        let out: Value = serde_json::from_str(&migrate_text(&input.to_string(), 4).unwrap()).unwrap();
        assert_eq!(out["mystVersion"], 4);
        assert_eq!(out["tree"]["children"][0]["enumerator"], "2");
    }

    #[test]
    fn test_rejects_unknown_versions() {
        let input = json!({"mystVersion": 4, "tree": {"type": "root"}});
        assert!(migrate_text(&input.to_string(), 7).is_err());
    }
}
