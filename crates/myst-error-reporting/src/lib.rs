/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Diagnostic messages for the MyST document engine.
 */

//! Diagnostic messages for the MyST document engine.
//!
//! Every problem the engine reports, from a malformed role to an unresolved
//! cross-reference, is a [`DiagnosticMessage`]. Messages carry:
//!
//! - a [`DiagnosticKind`] (`error`, `warning`, `info`)
//! - a stable rule id in `code` (see [`catalog`]), which lets users suppress
//!   whole categories they already know about
//! - a title, optional problem statement, details and hints
//! - an optional [`myst_source_map::SourceInfo`]
//!
//! Messages are accumulated per file in a [`DiagnosticCollector`] and
//! surfaced at the end of a build; they never abort parsing on their own.
//!
//! ```
//! use myst_error_reporting::{DiagnosticMessageBuilder, rules};
//!
//! let msg = DiagnosticMessageBuilder::warning("Cross reference target was not found")
//!     .with_code(rules::REFERENCE_TARGET_RESOLVES)
//!     .problem("No target is labelled `fig:missing`")
//!     .add_hint("Check the spelling of the label?")
//!     .build();
//! assert!(msg.to_text(None).contains("fig:missing"));
//! ```

pub mod builder;
pub mod catalog;
pub mod collector;
pub mod diagnostic;

pub use builder::DiagnosticMessageBuilder;
pub use catalog::{RULE_CATALOG, RuleInfo, get_rule_info, rules};
pub use collector::DiagnosticCollector;
pub use diagnostic::{DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent};
