/*
 * numbering.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Per-kind numbering policy.
 */

//! Numbering policy, read from the `numbering` frontmatter key.
//!
//! ```yaml
//! numbering:
//!   heading: true
//!   figure:
//!     start: 1
//!     scope: section
//!     template: "%s.%s"
//!   equation: false
//! ```
//!
//! `numbering: false` turns everything off; `numbering: true` turns every
//! kind on, headings included. A kind given as a mapping is enabled unless it
//! says `enabled: false`.

use myst_ast::TargetKind;
use serde::{Deserialize, Serialize};

/// Where a kind's counter restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberingScope {
    /// One sequence across the whole project, in file order
    #[default]
    Project,
    /// Restart in every file
    File,
    /// Restart at every top-level heading
    Section,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PolicyRepr")]
pub struct NumberingPolicy {
    pub enabled: bool,
    /// First value of the counter after each restart
    pub start: u32,
    /// Enumerator template, `%s` placeholders filled from the right
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Reference text template, such as `Fig. %s`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub scope: NumberingScope,
    /// Deepest heading level that is numbered (headings only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u8>,
}

impl NumberingPolicy {
    pub fn enabled() -> Self {
        NumberingPolicy {
            enabled: true,
            start: 1,
            template: None,
            reference: None,
            scope: NumberingScope::Project,
            depth: None,
        }
    }

    pub fn disabled() -> Self {
        NumberingPolicy {
            enabled: false,
            ..NumberingPolicy::enabled()
        }
    }

    /// Format an enumerator from its parts, outermost first.
    pub fn format(&self, parts: &[u32]) -> String {
        let parts: Vec<String> = parts.iter().map(u32::to_string).collect();
        match &self.template {
            Some(template) => fill_template(template, &parts),
            None => parts.last().cloned().unwrap_or_default(),
        }
    }
}

impl Default for NumberingPolicy {
    fn default() -> Self {
        NumberingPolicy::enabled()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PolicyRepr {
    Flag(bool),
    Detailed {
        enabled: Option<bool>,
        start: Option<u32>,
        template: Option<String>,
        reference: Option<String>,
        scope: Option<NumberingScope>,
        depth: Option<u8>,
    },
}

impl From<PolicyRepr> for NumberingPolicy {
    fn from(repr: PolicyRepr) -> Self {
        match repr {
            PolicyRepr::Flag(true) => NumberingPolicy::enabled(),
            PolicyRepr::Flag(false) => NumberingPolicy::disabled(),
            PolicyRepr::Detailed {
                enabled,
                start,
                template,
                reference,
                scope,
                depth,
            } => NumberingPolicy {
                enabled: enabled.unwrap_or(true),
                start: start.unwrap_or(1),
                template,
                reference,
                scope: scope.unwrap_or_default(),
                depth,
            },
        }
    }
}

/// Numbering policy for every numbered kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "NumberingRepr")]
pub struct Numbering {
    pub heading: NumberingPolicy,
    pub figure: NumberingPolicy,
    pub table: NumberingPolicy,
    pub code: NumberingPolicy,
    pub equation: NumberingPolicy,
}

impl Default for Numbering {
    /// Headings unnumbered, everything else numbered across the project.
    fn default() -> Self {
        Numbering {
            heading: NumberingPolicy::disabled(),
            figure: NumberingPolicy::enabled(),
            table: NumberingPolicy::enabled(),
            code: NumberingPolicy::enabled(),
            equation: NumberingPolicy::enabled(),
        }
    }
}

static OTHER: NumberingPolicy = NumberingPolicy {
    enabled: false,
    start: 1,
    template: None,
    reference: None,
    scope: NumberingScope::Project,
    depth: None,
};

impl Numbering {
    pub fn all(enabled: bool) -> Self {
        let p = if enabled {
            NumberingPolicy::enabled()
        } else {
            NumberingPolicy::disabled()
        };
        Numbering {
            heading: p.clone(),
            figure: p.clone(),
            table: p.clone(),
            code: p.clone(),
            equation: p,
        }
    }

    pub fn policy(&self, kind: TargetKind) -> &NumberingPolicy {
        match kind {
            TargetKind::Heading => &self.heading,
            TargetKind::Figure => &self.figure,
            TargetKind::Table => &self.table,
            TargetKind::Code => &self.code,
            TargetKind::Equation => &self.equation,
            TargetKind::Other => &OTHER,
        }
    }

    /// Whether a heading at `depth` gets an enumerator.
    pub fn numbers_heading(&self, depth: u8) -> bool {
        self.heading.enabled && depth <= self.heading.depth.unwrap_or(6)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberingRepr {
    All(bool),
    Kinds {
        heading: Option<NumberingPolicy>,
        figure: Option<NumberingPolicy>,
        table: Option<NumberingPolicy>,
        code: Option<NumberingPolicy>,
        equation: Option<NumberingPolicy>,
    },
}

impl From<NumberingRepr> for Numbering {
    fn from(repr: NumberingRepr) -> Self {
        match repr {
            NumberingRepr::All(enabled) => Numbering::all(enabled),
            NumberingRepr::Kinds {
                heading,
                figure,
                table,
                code,
                equation,
            } => {
                let d = Numbering::default();
                Numbering {
                    heading: heading.unwrap_or(d.heading),
                    figure: figure.unwrap_or(d.figure),
                    table: table.unwrap_or(d.table),
                    code: code.unwrap_or(d.code),
                    equation: equation.unwrap_or(d.equation),
                }
            }
        }
    }
}

/// Fill `%s` placeholders in `template`.
///
/// Placeholders take the last parts, in order: with parts `[2, 3]`,
/// `"%s.%s"` gives `"2.3"` and `"(%s)"` gives `"(3)"`. Missing leading
/// parts are filled with `0`.
pub fn fill_template(template: &str, parts: &[String]) -> String {
    let slots = template.matches("%s").count();
    let mut values: Vec<&str> = Vec::with_capacity(slots);
    if parts.len() >= slots {
        values.extend(parts[parts.len() - slots..].iter().map(String::as_str));
    } else {
        values.extend(std::iter::repeat_n("0", slots - parts.len()));
        values.extend(parts.iter().map(String::as_str));
    }
    let mut out = String::with_capacity(template.len() + 8);
    let mut pieces = template.split("%s");
    if let Some(first) = pieces.next() {
        out.push_str(first);
    }
    for (piece, value) in pieces.zip(values) {
        out.push_str(value);
        out.push_str(piece);
    }
    out
}
