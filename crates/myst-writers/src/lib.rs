/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Output backends for finalized MyST document trees.
 */

//! Output backends.
//!
//! Every backend implements [`Backend::serialize`] over the same finalized
//! [`Document`]. Backends never fail on a node kind they do not render:
//! unknown kinds, including [`NodeKind::Opaque`], render their children
//! and nothing else. Directive and role wrappers left in the tree because
//! their expansion failed render as nothing.
//!
//! - [`HtmlBackend`] - HTML fragment or page
//! - [`LatexBackend`] - LaTeX source for an external engine
//! - [`TypstBackend`] - Typst source
//! - [`JatsBackend`] - JATS journal XML
//! - [`DocxBackend`] - WordprocessingML as a single Flat OPC XML file
//! - [`JsonBackend`] - The tree itself, in the versioned JSON envelope

pub mod docx;
pub mod html;
pub mod jats;
pub mod json;
pub mod latex;
pub mod typst;
mod xml;

use myst_ast::{Node, NodeKind};
use myst_core::Document;
use thiserror::Error;

pub use docx::DocxBackend;
pub use html::HtmlBackend;
pub use jats::JatsBackend;
pub use json::JsonBackend;
pub use latex::LatexBackend;
pub use typst::TypstBackend;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown backend '{0}'")]
    UnknownBackend(String),

    #[error("cannot produce schema version {version}: {message}")]
    Version { version: u32, message: String },
}

/// Options shared by every backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOptions {
    /// Wrap the body in a complete document (preamble, title block)
    pub standalone: bool,
    /// Append the reference list for the document's citations
    pub bibliography: bool,
}

impl Default for BackendOptions {
    fn default() -> Self {
        BackendOptions {
            standalone: true,
            bibliography: true,
        }
    }
}

/// Serialized output of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub content: Vec<u8>,
    pub media_type: &'static str,
    /// File extension, without the dot
    pub extension: &'static str,
}

impl Artifact {
    pub fn text(content: String, media_type: &'static str, extension: &'static str) -> Self {
        Artifact {
            content: content.into_bytes(),
            media_type,
            extension,
        }
    }

    /// The content as text, if it is UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// A target format.
pub trait Backend: Send + Sync {
    /// Name used to select the backend, e.g. `latex`
    fn name(&self) -> &str;

    fn serialize(&self, doc: &Document, options: &BackendOptions) -> Result<Artifact, BackendError>;
}

/// Every built-in backend.
pub fn backends() -> Vec<Box<dyn Backend>> {
    vec![
        Box::new(HtmlBackend),
        Box::new(LatexBackend),
        Box::new(TypstBackend),
        Box::new(JatsBackend),
        Box::new(DocxBackend),
        Box::new(JsonBackend::default()),
    ]
}

/// The built-in backend called `name`.
pub fn backend(name: &str) -> Option<Box<dyn Backend>> {
    backends().into_iter().find(|b| b.name() == name)
}

/// Serialize `doc` with the backend called `name`.
pub fn render(name: &str, doc: &Document, options: &BackendOptions) -> Result<Artifact, BackendError> {
    let backend = backend(name).ok_or_else(|| BackendError::UnknownBackend(name.to_string()))?;
    tracing::debug!(backend = name, path = %doc.path, "serializing document");
    let artifact = backend.serialize(doc, options)?;
    tracing::trace!(bytes = artifact.content.len(), "serialized");
    Ok(artifact)
}

/// Whether a node renders as nothing in every backend.
pub(crate) fn is_hidden(node: &Node) -> bool {
    matches!(
        node.kind,
        NodeKind::Comment { .. }
            | NodeKind::MystTarget
            | NodeKind::MystDirective { .. }
            | NodeKind::MystRole { .. }
            | NodeKind::Include { .. }
    )
}

/// Split a container's children into body, caption and legend.
pub(crate) fn container_parts(node: &Node) -> (Vec<&Node>, Option<&Node>, Option<&Node>) {
    let mut body = Vec::new();
    let mut caption = None;
    let mut legend = None;
    for child in &node.children {
        match child.kind {
            NodeKind::Caption => caption = Some(child),
            NodeKind::Legend => legend = Some(child),
            _ => body.push(child),
        }
    }
    (body, caption, legend)
}

/// Caption label, e.g. `Figure 2`, for a numbered container.
pub(crate) fn caption_label(node: &Node) -> Option<String> {
    let number = node.enumerator.as_deref()?;
    let name = match node.kind {
        NodeKind::Container { kind, .. } => match kind {
            myst_ast::ContainerKind::Figure => "Figure",
            myst_ast::ContainerKind::Table => "Table",
            myst_ast::ContainerKind::Code => "Program",
            myst_ast::ContainerKind::Quote => return None,
        },
        NodeKind::Table => "Table",
        NodeKind::Code { .. } => "Program",
        _ => return None,
    };
    Some(format!("{name} {number}"))
}

/// Text of a stream or plain-text output, if the output has one.
pub(crate) fn output_text(data: &serde_json::Value) -> Option<String> {
    let text = match data["output_type"].as_str()? {
        "stream" => &data["text"],
        "error" => {
            return Some(format!(
                "{}: {}",
                data["ename"].as_str().unwrap_or_default(),
                data["evalue"].as_str().unwrap_or_default()
            ));
        }
        _ => &data["data"]["text/plain"],
    };
    match text {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(lines) => Some(
            lines
                .iter()
                .filter_map(serde_json::Value::as_str)
                .collect::<String>(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use myst_ast::ContainerKind;
    use serde_json::json;

    #[test]
    fn test_backend_lookup() {
        let names: Vec<String> = backends().iter().map(|b| b.name().to_string()).collect();
        assert_eq!(names, vec!["html", "latex", "typst", "jats", "docx", "myst-json"]);
        assert!(backend("typst").is_some());
        assert!(backend("pdf").is_none());
    }

    #[test]
    fn test_render_unknown_backend() {
        let doc = Document::new(0, "a.md", "");
        let err = render("pdf", &doc, &BackendOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "unknown backend 'pdf'");
    }

    #[test]
    fn test_caption_label() {
        let mut figure = Node::new(NodeKind::Container {
            kind: ContainerKind::Figure,
            class: None,
        });
        assert_eq!(caption_label(&figure), None);
        figure.enumerator = Some("3".into());
        assert_eq!(caption_label(&figure).as_deref(), Some("Figure 3"));
    }

    #[test]
    fn test_output_text() {
        assert_eq!(
            output_text(&json!({"output_type": "stream", "name": "stdout", "text": "hi\n"})),
            Some("hi\n".into())
        );
        assert_eq!(
            output_text(&json!({"output_type": "execute_result", "data": {"text/plain": ["1", "2"]}})),
            Some("12".into())
        );
        assert_eq!(
            output_text(&json!({"output_type": "error", "ename": "E", "evalue": "bad"})),
            Some("E: bad".into())
        );
        assert_eq!(
            output_text(&json!({"output_type": "display_data", "data": {"image/png": "..."}})),
            None
        );
    }
}
