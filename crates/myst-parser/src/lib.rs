/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * MyST markdown parser.
 */

//! MyST markdown parser.
//!
//! Parsing runs in two phases. Lines are first grouped into block tokens;
//! the tokens are then realized into nodes, which is when inline content is
//! parsed and directives and roles are handed to the
//! [`ExtensionRegistry`](myst_extensions::ExtensionRegistry) for expansion.
//! Expansion may parse its body again through the same [`Parser`], so
//! directives nest to any depth up to [`MAX_NESTING`].
//!
//! Malformed syntax never fails a parse. It degrades to literal text or a
//! plain code block and is reported as a `parse-extension-syntax` warning.
//!
//! ```
//! use myst_extensions::ExtensionRegistry;
//!
//! let registry = ExtensionRegistry::new();
//! let result = myst_parser::parse("# Hello\n\nSee {ref}`intro`.", &registry);
//! assert_eq!(result.root.children.len(), 2);
//! assert!(result.diagnostics.is_empty());
//! ```

mod block;
mod inline;
mod lines;
pub mod parser;

pub use parser::{MAX_NESTING, ParseResult, Parser};

use myst_extensions::ExtensionRegistry;
use myst_source_map::FileId;

/// Parse a single source text as file 0.
pub fn parse(source: &str, registry: &ExtensionRegistry) -> ParseResult {
    parse_document(source, registry, FileId(0))
}

/// Parse a source file; positions in the result refer to `file_id`.
pub fn parse_document(source: &str, registry: &ExtensionRegistry, file_id: FileId) -> ParseResult {
    Parser::new(registry, file_id).parse_document(source)
}
