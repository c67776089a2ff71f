/*
 * roles.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Built-in roles.
 */

use std::sync::Arc;

use myst_ast::{CiteKind, IndexEntry, Node, NodeKind, ReferenceStyle};

use crate::context::ExpandContext;
use crate::data::RoleData;
use crate::registry::{FnRole, Role};
use crate::spec::{BodyKind, RoleSpec};

/// Every built-in role, in registration order.
pub fn builtins() -> Vec<Arc<dyn Role>> {
    let mut out: Vec<Arc<dyn Role>> = Vec::new();
    out.push(reference_role("ref", ReferenceStyle::Ref));
    out.push(reference_role("numref", ReferenceStyle::Numref));
    out.push(reference_role("eq", ReferenceStyle::Eq));
    out.push(cite_role("cite", &["cite:p"], CiteKind::Parenthetical));
    out.push(cite_role("cite:t", &[], CiteKind::Narrative));
    out.push(Arc::new(FnRole::new(RoleSpec::new("math"), |data, _| {
        vec![Node::new(NodeKind::InlineMath {
            value: data.content,
        })]
    })));
    out.push(wrapper_role("sub", &["subscript"], NodeKind::Subscript));
    out.push(wrapper_role("sup", &["superscript"], NodeKind::Superscript));
    out.push(wrapper_role("u", &["underline"], NodeKind::Underline));
    out.push(wrapper_role("del", &["strike"], NodeKind::Delete));
    out.push(Arc::new(FnRole::new(RoleSpec::new("abbr"), expand_abbreviation)));
    out.push(Arc::new(FnRole::new(RoleSpec::new("index"), expand_index)));
    out.push(Arc::new(FnRole::new(RoleSpec::new("kbd"), |data, _| {
        vec![Node::with_children(
            NodeKind::Keyboard,
            vec![Node::text(data.content)],
        )]
    })));
    out.push(Arc::new(FnRole::new(RoleSpec::new("code"), |data, _| {
        vec![Node::new(NodeKind::InlineCode {
            value: data.content,
        })]
    })));
    for format in ["latex", "typst", "html"] {
        out.push(raw_role(format));
    }
    out
}

/// Split `text <target>` into its parts. Plain content is all target.
pub fn split_explicit_target(content: &str) -> (Option<String>, String) {
    let trimmed = content.trim();
    if let Some(stripped) = trimmed.strip_suffix('>') {
        if let Some(open) = stripped.rfind('<') {
            let text = stripped[..open].trim();
            let target = stripped[open + 1..].trim();
            if !target.is_empty() {
                let text = (!text.is_empty()).then(|| text.to_string());
                return (text, target.to_string());
            }
        }
    }
    (None, trimmed.to_string())
}

fn reference_role(name: &str, style: ReferenceStyle) -> Arc<dyn Role> {
    Arc::new(FnRole::new(RoleSpec::new(name), move |data, ctx| {
        expand_reference(data, ctx, style)
    }))
}

/// Explicit text on `numref` is a template when it has a placeholder.
fn expand_reference(data: RoleData, ctx: &mut ExpandContext<'_>, style: ReferenceStyle) -> Vec<Node> {
    let (text, target) = split_explicit_target(&data.content);
    let is_template = |t: &str| t.contains("%s") || t.contains("{number}");
    let (template, children) = match text {
        Some(t) if style == ReferenceStyle::Numref && is_template(&t) => (Some(t), Vec::new()),
        Some(t) => (None, ctx.parse_inlines(&t, data.content_offset)),
        None => (None, Vec::new()),
    };
    let mut node = Node::with_children(
        NodeKind::CrossReference {
            style,
            template,
            target_kind: None,
            url: None,
            resolved: false,
        },
        children,
    )
    .at_opt(data.position);
    node.set_label(&target);
    vec![node]
}

fn cite_role(name: &str, aliases: &[&str], kind: CiteKind) -> Arc<dyn Role> {
    let mut spec = RoleSpec::new(name);
    for alias in aliases {
        spec = spec.alias(*alias);
    }
    Arc::new(FnRole::new(spec, move |data, _| expand_cite(data, kind)))
}

fn expand_cite(data: RoleData, kind: CiteKind) -> Vec<Node> {
    let cites: Vec<Node> = data
        .content
        .split([',', ';'])
        .map(|k| k.trim().trim_start_matches('@'))
        .filter(|k| !k.is_empty())
        .map(|key| {
            let mut cite = Node::new(NodeKind::Cite {
                key: key.to_string(),
                kind,
                prefix: None,
                suffix: None,
                error: false,
            })
            .at_opt(data.position);
            cite.label = Some(key.to_string());
            cite.identifier = Some(key.to_string());
            cite
        })
        .collect();
    vec![Node::with_children(NodeKind::CiteGroup { kind }, cites).at_opt(data.position)]
}

fn wrapper_role(name: &str, aliases: &[&str], kind: NodeKind) -> Arc<dyn Role> {
    let mut spec = RoleSpec::new(name).body(BodyKind::Markdown, true);
    for alias in aliases {
        spec = spec.alias(*alias);
    }
    Arc::new(FnRole::new(spec, move |data, ctx| {
        let children = ctx.parse_inlines(&data.content, data.content_offset);
        vec![Node::with_children(kind.clone(), children)]
    }))
}

fn raw_role(format: &'static str) -> Arc<dyn Role> {
    Arc::new(FnRole::new(
        RoleSpec::new(format!("raw:{format}")),
        move |data, _| {
            vec![Node::new(NodeKind::Raw {
                format: format.to_string(),
                value: data.content,
            })]
        },
    ))
}

/// `TERM (title)`, where the title is optional.
fn expand_abbreviation(data: RoleData, _ctx: &mut ExpandContext<'_>) -> Vec<Node> {
    let content = data.content.trim();
    let (term, title) = match content.strip_suffix(')').and_then(|s| s.rfind('(').map(|i| (s, i))) {
        Some((s, open)) if !s[..open].trim().is_empty() => {
            (s[..open].trim(), Some(s[open + 1..].trim().to_string()))
        }
        _ => (content, None),
    };
    vec![Node::with_children(
        NodeKind::Abbreviation { title },
        vec![Node::text(term)],
    )]
}

/// `term`, `text <term>`, or `single: term; subterm`. The text (or the term)
/// is shown; the entry goes on the span.
fn expand_index(data: RoleData, _ctx: &mut ExpandContext<'_>) -> Vec<Node> {
    let (text, target) = split_explicit_target(&data.content);
    let mut entry_text = target.as_str();
    let mut emphasis = false;
    if let Some(rest) = entry_text.strip_prefix('!') {
        entry_text = rest;
        emphasis = true;
    }
    let entry_text = entry_text
        .strip_prefix("single:")
        .unwrap_or(entry_text)
        .trim();
    let (entry, subentry) = match entry_text.split_once(';') {
        Some((a, b)) => (a.trim().to_string(), Some(b.trim().to_string())),
        None => (entry_text.to_string(), None),
    };
    let shown = text.unwrap_or_else(|| entry.clone());
    let mut span = Node::with_children(NodeKind::Span { class: None }, vec![Node::text(shown)]);
    span.index_entries.push(IndexEntry {
        entry,
        subentry,
        emphasis,
    });
    vec![span]
}
