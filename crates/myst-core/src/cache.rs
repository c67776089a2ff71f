/*
 * cache.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Content-addressed execution cache.
 */

//! Durable memo of executable-cell results.
//!
//! A [`CacheKey`] is the SHA-256 of a cell's normalized source, the kernel
//! that runs it, and the execution options that can change its output.
//! Each entry is one file under the cache root, named by the key, holding
//! a [`VersionedTree`] of the cell's `outputs` node. Presence of the file is
//! the existence test. Entries are written atomically and never evicted;
//! [`ExecutionCache::clear`] is the only way to drop them.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use myst_ast::{MigrationError, Node, VersionedTree};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

const KEY_DOMAIN: &str = "myst-cell-v1";
const ENTRY_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cache entry is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cache entry cannot be migrated: {0}")]
    Migration(#[from] MigrationError),
}

/// Execution settings that take part in the key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ExecutionFingerprint {
    pub allow_errors: bool,
    pub timeout_secs: u64,
}

/// Hex-encoded SHA-256 identifying a cell execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_cell(source: &str, kernel: &str, fingerprint: &ExecutionFingerprint) -> CacheKey {
        let mut hasher = Sha256::new();
        hasher.update(KEY_DOMAIN.as_bytes());
        hasher.update([0]);
        hasher.update(kernel.as_bytes());
        hasher.update([0]);
        // field order of the fingerprint struct is fixed, so this is stable
        hasher.update(serde_json::to_string(fingerprint).unwrap_or_default().as_bytes());
        hasher.update([0]);
        hasher.update(normalize_source(source).as_bytes());
        CacheKey(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Line endings to `\n`, trailing whitespace stripped from every line, and
/// trailing blank lines dropped.
pub fn normalize_source(source: &str) -> String {
    let mut lines: Vec<&str> = source
        .split('\n')
        .map(|line| line.trim_end_matches('\r').trim_end())
        .collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// On-disk cache, shared across workers.
///
/// Reads run concurrently; writes are serialized. Two writers racing on
/// the same key store identical content, so the last rename wins.
#[derive(Debug)]
pub struct ExecutionCache {
    root: PathBuf,
    lock: RwLock<()>,
}

impl ExecutionCache {
    /// Open (and create if needed) a cache rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(ExecutionCache {
            root,
            lock: RwLock::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}.{ENTRY_EXTENSION}", key.as_str()))
    }

    pub fn test(&self, key: &CacheKey) -> bool {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        self.entry_path(key).is_file()
    }

    /// The stored outputs, migrated to the current schema version.
    pub fn get(&self, key: &CacheKey) -> Result<Option<Node>, CacheError> {
        let text = {
            let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
            match fs::read_to_string(self.entry_path(key)) {
                Ok(text) => text,
                Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(err) => return Err(err.into()),
            }
        };
        let versioned: VersionedTree = serde_json::from_str(&text)?;
        Ok(Some(versioned.into_node()?))
    }

    pub fn set(&self, key: &CacheKey, outputs: &Node) -> Result<(), CacheError> {
        let versioned = VersionedTree::current(outputs)?;
        let bytes = serde_json::to_vec_pretty(&versioned)?;
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        let mut file = tempfile::NamedTempFile::new_in(&self.root)?;
        file.write_all(&bytes)?;
        file.persist(self.entry_path(key))
            .map_err(|err| CacheError::Io(err.error))?;
        tracing::debug!(key = %key, "stored execution result");
        Ok(())
    }

    /// Remove every entry. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = 0;
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use myst_ast::NodeKind;
    use serde_json::json;

    fn outputs(text: &str) -> Node {
        Node::with_children(
            NodeKind::Outputs,
            vec![Node::new(NodeKind::Output {
                jupyter_data: json!({"output_type": "stream", "name": "stdout", "text": text}),
            })],
        )
    }

    #[test]
    fn test_key_is_stable_and_normalized() {
        let fp = ExecutionFingerprint::default();
        let a = CacheKey::for_cell("print(1)\r\n\n", "python3", &fp);
        let b = CacheKey::for_cell("print(1)   \n", "python3", &fp);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_key_changes_with_inputs() {
        let fp = ExecutionFingerprint::default();
        let base = CacheKey::for_cell("print(1)", "python3", &fp);
        assert_ne!(base, CacheKey::for_cell("print(2)", "python3", &fp));
        assert_ne!(base, CacheKey::for_cell("print(1)", "ir", &fp));
        let strict = ExecutionFingerprint {
            allow_errors: true,
            timeout_secs: 0,
        };
        assert_ne!(base, CacheKey::for_cell("print(1)", "python3", &strict));
    }

    #[test]
    fn test_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ExecutionCache::open(dir.path()).unwrap();
        let key = CacheKey::for_cell("print(1)", "python3", &ExecutionFingerprint::default());
        assert!(!cache.test(&key));
        assert_eq!(cache.get(&key).unwrap(), None);

        cache.set(&key, &outputs("1\n")).unwrap();
        assert!(cache.test(&key));
        assert_eq!(cache.get(&key).unwrap(), Some(outputs("1\n")));
        assert!(dir.path().join(format!("{key}.json")).is_file());
    }

    #[test]
    fn test_changed_source_misses() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ExecutionCache::open(dir.path()).unwrap();
        let fp = ExecutionFingerprint::default();
        cache
            .set(&CacheKey::for_cell("x = 1", "python3", &fp), &outputs(""))
            .unwrap();
        let changed = CacheKey::for_cell("x = 2", "python3", &fp);
        assert!(!cache.test(&changed));
        assert_eq!(cache.get(&changed).unwrap(), None);
    }

    #[test]
    fn test_overwrite_is_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ExecutionCache::open(dir.path()).unwrap();
        let key = CacheKey::for_cell("x", "python3", &ExecutionFingerprint::default());
        cache.set(&key, &outputs("a")).unwrap();
        cache.set(&key, &outputs("b")).unwrap();
        assert_eq!(cache.get(&key).unwrap(), Some(outputs("b")));
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ExecutionCache::open(dir.path()).unwrap();
        let fp = ExecutionFingerprint::default();
        for source in ["a", "b", "c"] {
            cache
                .set(&CacheKey::for_cell(source, "python3", &fp), &outputs(source))
                .unwrap();
        }
        assert_eq!(cache.clear().unwrap(), 3);
        assert!(!cache.test(&CacheKey::for_cell("a", "python3", &fp)));
    }

    #[test]
    fn test_old_version_entries_are_migrated() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ExecutionCache::open(dir.path()).unwrap();
        let key = CacheKey::for_cell("x", "python3", &ExecutionFingerprint::default());
        let current = VersionedTree::current(&outputs("old")).unwrap();
        let old = current.to_version(myst_ast::MIN_VERSION).unwrap();
        fs::write(
            dir.path().join(format!("{key}.json")),
            serde_json::to_string(&old).unwrap(),
        )
        .unwrap();
        assert_eq!(cache.get(&key).unwrap(), Some(outputs("old")));
    }
}
