/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Source positions for MyST documents.
 */

//! Source positions for MyST documents.
//!
//! Every node the parser produces carries a [`SourceInfo`] pointing back at
//! the byte range it came from. Directive bodies are parsed re-entrantly at
//! their absolute offset inside the parent file, so a single
//! `(file, range)` pair is enough to locate any node; there is no need for a
//! transformation chain.
//!
//! - [`SourceInfo`]: a file id plus a [`Range`]
//! - [`SourceContext`]: owns file paths and contents, converts offsets to
//!   rows/columns via a [`LineIndex`]
//!
//! ```rust
//! use myst_source_map::*;
//!
//! let mut ctx = SourceContext::new();
//! let file_id = ctx.add_file("index.md", "# Hello\nWorld");
//! let info = ctx.source_info(file_id, 8, 13);
//! assert_eq!(info.range.start.row, 1);
//! assert_eq!(info.range.start.column, 0);
//! ```

pub mod context;
pub mod line_index;
pub mod source_info;
pub mod types;

pub use context::{SourceContext, SourceFile};
pub use line_index::LineIndex;
pub use source_info::SourceInfo;
pub use types::{FileId, Location, Range};
