/*
 * passes/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Built-in transform passes.
 */

//! Built-in transform passes.
//!
//! Document passes, run per file before the barrier:
//!
//! - [`FrontmatterPass`] - Merges project frontmatter, lifts the title
//! - [`IncludePass`] - Expands `include` nodes
//! - [`CodeCellsPass`] - Fills cell outputs from the cache or the executor
//! - [`TargetsPass`] - Attaches `(label)=` targets, marks enumerable nodes
//! - [`FootnotesPass`] - Numbers footnotes
//! - [`HtmlIdsPass`] - Assigns anchor ids
//! - [`LiftExtensionsPass`] - Unwraps directive and role wrappers
//!
//! Project passes, run once after the barrier:
//!
//! - [`EnumeratePass`] - Assigns enumerators, builds the symbol table
//! - [`ResolveReferencesPass`] - Rewrites cross-references
//! - [`CitationsPass`] - Renders citations
//!
//! [`PassPipeline::standard`](crate::pipeline::PassPipeline::standard) lists
//! them in this order.

mod citations;
mod code_cells;
mod enumerate;
mod footnotes;
mod frontmatter;
mod html_ids;
mod include;
mod lift;
mod resolve;
mod targets;

pub use citations::CitationsPass;
pub use code_cells::CodeCellsPass;
pub use enumerate::EnumeratePass;
pub use footnotes::FootnotesPass;
pub use frontmatter::FrontmatterPass;
pub use html_ids::HtmlIdsPass;
pub use include::IncludePass;
pub use lift::LiftExtensionsPass;
pub use resolve::{ResolveReferencesPass, reference_text};
pub use targets::TargetsPass;
