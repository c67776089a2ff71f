/*
 * json.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Versioned JSON tree backend.
 */

use myst_ast::VersionedTree;
use myst_core::Document;

use crate::{Artifact, Backend, BackendError, BackendOptions};

/// Emits the finalized tree in the `{"mystVersion", "tree"}` envelope.
///
/// With `version` set, the tree is migrated down (or up) before writing so
/// older consumers can read it.
#[derive(Debug, Clone, Default)]
pub struct JsonBackend {
    pub version: Option<u32>,
}

impl JsonBackend {
    pub fn at_version(version: u32) -> Self {
        JsonBackend {
            version: Some(version),
        }
    }
}

impl Backend for JsonBackend {
    fn name(&self) -> &str {
        "myst-json"
    }

    fn serialize(&self, doc: &Document, _options: &BackendOptions) -> Result<Artifact, BackendError> {
        let mut tree = VersionedTree::current(&doc.root)?;
        if let Some(version) = self.version {
            tree = tree.to_version(version).map_err(|err| BackendError::Version {
                version,
                message: err.to_string(),
            })?;
        }
        let mut text = serde_json::to_string_pretty(&tree)?;
        text.push('\n');
        Ok(Artifact::text(text, "application/json", "json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use myst_ast::{CURRENT_VERSION, Node, NodeKind};
    use serde_json::Value;

    fn doc_with_footnote() -> Document {
        let mut doc = Document::new(0, "a.md", "");
        let mut reference = Node::new(NodeKind::FootnoteReference).labelled("n");
        reference.enumerator = Some("1".into());
        doc.root = Node::root(vec![Node::paragraph(vec![Node::text("x"), reference])]);
        doc
    }

    fn parse(artifact: &Artifact) -> Value {
        serde_json::from_slice(&artifact.content).unwrap()
    }

    #[test]
    fn test_current_version_envelope() {
        let doc = doc_with_footnote();
        let artifact = JsonBackend::default()
            .serialize(&doc, &BackendOptions::default())
            .unwrap();
        let value = parse(&artifact);
        assert_eq!(value["mystVersion"], CURRENT_VERSION);
        assert_eq!(value["tree"]["type"], "root");
        let footnote = &value["tree"]["children"][0]["children"][1];
        assert_eq!(footnote["enumerator"], "1");
        assert_eq!(artifact.extension, "json");
    }

    #[test]
    fn test_older_version_is_migrated() {
        let doc = doc_with_footnote();
        let artifact = JsonBackend::at_version(1)
            .serialize(&doc, &BackendOptions::default())
            .unwrap();
        let value = parse(&artifact);
        assert_eq!(value["mystVersion"], 1);
        let footnote = &value["tree"]["children"][0]["children"][1];
        assert_eq!(footnote["number"], 1);
        assert!(footnote.get("enumerator").is_none());
    }

    #[test]
    fn test_unknown_version_is_an_error() {
        let doc = doc_with_footnote();
        let err = JsonBackend::at_version(99)
            .serialize(&doc, &BackendOptions::default())
            .unwrap_err();
        assert!(matches!(err, BackendError::Version { version: 99, .. }));
    }
}
