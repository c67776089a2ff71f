/*
 * kind.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Node kind discriminant and kind-specific attributes.
 */

//! The closed set of node kinds.
//!
//! [`NodeKind`] is a sum type: every kind the engine understands is a
//! variant carrying its own attributes, so passes and backends match on it
//! exhaustively. Kinds written by newer tools or third-party extensions are
//! kept in [`NodeKind::Opaque`] and passed through unchanged.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn is_false(b: &bool) -> bool {
    !*b
}

/// Kind discriminant plus kind-specific attributes.
///
/// Serialized as the `type` field of a node object, with the attributes
/// flattened next to it (see [`crate::serde_node`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum NodeKind {
    Root,
    /// Top-level block separated by `+++`
    Block {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<String>,
    },
    Paragraph,
    Heading {
        depth: u8,
    },
    Text {
        value: String,
    },
    Emphasis,
    Strong,
    Underline,
    Delete,
    Subscript,
    Superscript,
    Keyboard,
    Abbreviation {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    InlineCode {
        value: String,
    },
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<String>,
        value: String,
        #[serde(default, skip_serializing_if = "is_false")]
        executable: bool,
        #[serde(default, skip_serializing_if = "is_false")]
        show_line_numbers: bool,
    },
    Link {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        align: Option<String>,
    },
    List {
        #[serde(default, skip_serializing_if = "is_false")]
        ordered: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<u32>,
    },
    ListItem,
    Blockquote,
    ThematicBreak,
    Break,
    Math {
        value: String,
    },
    InlineMath {
        value: String,
    },
    Admonition {
        kind: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        class: Option<String>,
    },
    AdmonitionTitle,
    Container {
        kind: ContainerKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        class: Option<String>,
    },
    Caption,
    Legend,
    Table,
    TableRow,
    TableCell {
        #[serde(default, skip_serializing_if = "is_false")]
        header: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        align: Option<String>,
    },
    Aside {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
    },
    Div {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        class: Option<String>,
    },
    Span {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        class: Option<String>,
    },
    /// A reference to a labelled target, resolved by the project phase
    CrossReference {
        style: ReferenceStyle,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_kind: Option<TargetKind>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "is_false")]
        resolved: bool,
    },
    CiteGroup {
        kind: CiteKind,
    },
    Cite {
        key: String,
        kind: CiteKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suffix: Option<String>,
        #[serde(default, skip_serializing_if = "is_false")]
        error: bool,
    },
    FootnoteReference,
    FootnoteDefinition,
    /// `(label)=` line; attaches its identifier to the next node
    MystTarget,
    /// Directive invocation; children hold the expansion
    MystDirective {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        args: Option<String>,
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        options: IndexMap<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "is_false")]
        error: bool,
    },
    /// Role invocation; children hold the expansion
    MystRole {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "is_false")]
        error: bool,
    },
    Comment {
        value: String,
    },
    /// Raw content for a specific output format
    Raw {
        format: String,
        value: String,
    },
    Include {
        file: String,
        #[serde(default, skip_serializing_if = "is_false")]
        literal: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_line: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_line: Option<usize>,
    },
    /// Container for the results of an executable cell
    Outputs,
    Output {
        #[serde(rename = "jupyter_data")]
        jupyter_data: Value,
    },
    /// A kind this engine does not understand, kept verbatim
    #[serde(skip)]
    Opaque {
        type_name: String,
        data: Map<String, Value>,
    },
}

/// `type` strings of every kind the engine understands.
pub const KNOWN_TYPES: &[&str] = &[
    "root",
    "block",
    "paragraph",
    "heading",
    "text",
    "emphasis",
    "strong",
    "underline",
    "delete",
    "subscript",
    "superscript",
    "keyboard",
    "abbreviation",
    "inlineCode",
    "code",
    "link",
    "image",
    "list",
    "listItem",
    "blockquote",
    "thematicBreak",
    "break",
    "math",
    "inlineMath",
    "admonition",
    "admonitionTitle",
    "container",
    "caption",
    "legend",
    "table",
    "tableRow",
    "tableCell",
    "aside",
    "div",
    "span",
    "crossReference",
    "citeGroup",
    "cite",
    "footnoteReference",
    "footnoteDefinition",
    "mystTarget",
    "mystDirective",
    "mystRole",
    "comment",
    "raw",
    "include",
    "outputs",
    "output",
];

pub fn is_known_type(type_name: &str) -> bool {
    KNOWN_TYPES.contains(&type_name)
}

impl NodeKind {
    /// The `type` string of this kind.
    pub fn type_name(&self) -> &str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Block { .. } => "block",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading { .. } => "heading",
            NodeKind::Text { .. } => "text",
            NodeKind::Emphasis => "emphasis",
            NodeKind::Strong => "strong",
            NodeKind::Underline => "underline",
            NodeKind::Delete => "delete",
            NodeKind::Subscript => "subscript",
            NodeKind::Superscript => "superscript",
            NodeKind::Keyboard => "keyboard",
            NodeKind::Abbreviation { .. } => "abbreviation",
            NodeKind::InlineCode { .. } => "inlineCode",
            NodeKind::Code { .. } => "code",
            NodeKind::Link { .. } => "link",
            NodeKind::Image { .. } => "image",
            NodeKind::List { .. } => "list",
            NodeKind::ListItem => "listItem",
            NodeKind::Blockquote => "blockquote",
            NodeKind::ThematicBreak => "thematicBreak",
            NodeKind::Break => "break",
            NodeKind::Math { .. } => "math",
            NodeKind::InlineMath { .. } => "inlineMath",
            NodeKind::Admonition { .. } => "admonition",
            NodeKind::AdmonitionTitle => "admonitionTitle",
            NodeKind::Container { .. } => "container",
            NodeKind::Caption => "caption",
            NodeKind::Legend => "legend",
            NodeKind::Table => "table",
            NodeKind::TableRow => "tableRow",
            NodeKind::TableCell { .. } => "tableCell",
            NodeKind::Aside { .. } => "aside",
            NodeKind::Div { .. } => "div",
            NodeKind::Span { .. } => "span",
            NodeKind::CrossReference { .. } => "crossReference",
            NodeKind::CiteGroup { .. } => "citeGroup",
            NodeKind::Cite { .. } => "cite",
            NodeKind::FootnoteReference => "footnoteReference",
            NodeKind::FootnoteDefinition => "footnoteDefinition",
            NodeKind::MystTarget => "mystTarget",
            NodeKind::MystDirective { .. } => "mystDirective",
            NodeKind::MystRole { .. } => "mystRole",
            NodeKind::Comment { .. } => "comment",
            NodeKind::Raw { .. } => "raw",
            NodeKind::Include { .. } => "include",
            NodeKind::Outputs => "outputs",
            NodeKind::Output { .. } => "output",
            NodeKind::Opaque { type_name, .. } => type_name,
        }
    }

    /// Whether this kind is phrasing (inline) content.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            NodeKind::Text { .. }
                | NodeKind::Emphasis
                | NodeKind::Strong
                | NodeKind::Underline
                | NodeKind::Delete
                | NodeKind::Subscript
                | NodeKind::Superscript
                | NodeKind::Keyboard
                | NodeKind::Abbreviation { .. }
                | NodeKind::InlineCode { .. }
                | NodeKind::Link { .. }
                | NodeKind::Image { .. }
                | NodeKind::Break
                | NodeKind::InlineMath { .. }
                | NodeKind::Span { .. }
                | NodeKind::CrossReference { .. }
                | NodeKind::CiteGroup { .. }
                | NodeKind::Cite { .. }
                | NodeKind::FootnoteReference
                | NodeKind::MystRole { .. }
        )
    }
}

/// What a container wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Figure,
    Table,
    Code,
    Quote,
}

/// Category of a labelled target, used for numbering and reference text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Heading,
    Figure,
    Table,
    Code,
    Equation,
    /// Labelled but never numbered (paragraphs, admonitions, ...)
    Other,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Heading => "heading",
            TargetKind::Figure => "figure",
            TargetKind::Table => "table",
            TargetKind::Code => "code",
            TargetKind::Equation => "equation",
            TargetKind::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<TargetKind> {
        match s {
            "heading" => Some(TargetKind::Heading),
            "figure" => Some(TargetKind::Figure),
            "table" => Some(TargetKind::Table),
            "code" => Some(TargetKind::Code),
            "equation" => Some(TargetKind::Equation),
            "other" => Some(TargetKind::Other),
            _ => None,
        }
    }

    /// Kinds that receive enumerators.
    pub const NUMBERED: [TargetKind; 5] = [
        TargetKind::Heading,
        TargetKind::Figure,
        TargetKind::Table,
        TargetKind::Code,
        TargetKind::Equation,
    ];
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a cross-reference was written, which decides its generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceStyle {
    /// `{ref}`: kind name plus enumerator, or the title for unnumbered targets
    Ref,
    /// `{numref}`: template with `%s` / `{number}` / `{name}`
    Numref,
    /// `{eq}`: `(enumerator)`
    Eq,
    /// `[text](#label)`: keeps its own text when present
    Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CiteKind {
    /// `(Doe, 2020)`
    Parenthetical,
    /// `Doe (2020)`
    Narrative,
}

/// Typed outputs of an executable cell, as stored in `output` nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum OutputsPayload {
    Stream {
        name: String,
        text: String,
    },
    Error {
        ename: String,
        evalue: String,
        #[serde(default)]
        traceback: Vec<String>,
    },
    DisplayData {
        data: IndexMap<String, Value>,
        #[serde(default, skip_serializing_if = "Value::is_null")]
        metadata: Value,
    },
    ExecuteResult {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        execution_count: Option<u32>,
        data: IndexMap<String, Value>,
        #[serde(default, skip_serializing_if = "Value::is_null")]
        metadata: Value,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_match_serde_tags() {
        let kinds = vec![
            NodeKind::Root,
            NodeKind::Paragraph,
            NodeKind::Heading { depth: 2 },
            NodeKind::InlineCode { value: "x".into() },
            NodeKind::CrossReference {
                style: ReferenceStyle::Ref,
                template: None,
                target_kind: None,
                url: None,
                resolved: false,
            },
            NodeKind::FootnoteDefinition,
            NodeKind::MystDirective {
                name: "note".into(),
                args: None,
                options: IndexMap::new(),
                value: None,
                error: false,
            },
        ];
        for kind in kinds {
            let value = serde_json::to_value(&kind).unwrap();
            assert_eq!(value["type"], kind.type_name());
        }
    }

    #[test]
    fn test_opaque_is_not_known() {
        let kind = NodeKind::Opaque {
            type_name: "widget".into(),
            data: Map::new(),
        };
        assert!(!is_known_type(kind.type_name()));
        assert!(is_known_type("crossReference"));
    }

    #[test]
    fn test_field_names_are_camel_case() {
        let kind = NodeKind::Code {
            lang: Some("python".into()),
            meta: None,
            value: "1".into(),
            executable: true,
            show_line_numbers: true,
        };
        let value = serde_json::to_value(&kind).unwrap();
        assert_eq!(value["showLineNumbers"], true);
        assert!(value.get("meta").is_none());
    }

    #[test]
    fn test_target_kind_parse() {
        for kind in TargetKind::NUMBERED {
            assert_eq!(TargetKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TargetKind::parse("nope"), None);
    }

    #[test]
    fn test_outputs_payload_tagging() {
        let stream = OutputsPayload::Stream {
            name: "stdout".into(),
            text: "hi\n".into(),
        };
        let value = serde_json::to_value(&stream).unwrap();
        assert_eq!(value["output_type"], "stream");
        let back: OutputsPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back, stream);
    }

    #[test]
    fn test_inline_classification() {
        assert!(NodeKind::Text { value: "a".into() }.is_inline());
        assert!(!NodeKind::Paragraph.is_inline());
    }
}
