/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Node tree and schema versioning for MyST documents.
 *
 * This crate provides the shared document representation that every other
 * part of the engine reads and writes: the parser creates trees, transform
 * passes mutate them in place, and backends walk them read-only.
 */

pub mod identifiers;
pub mod kind;
pub mod migrate;
pub mod node;
pub mod serde_node;
pub mod text;
pub mod visit;

pub use identifiers::{create_html_id, normalize_label};
pub use kind::{
    CiteKind, ContainerKind, KNOWN_TYPES, NodeKind, OutputsPayload, ReferenceStyle, TargetKind,
    is_known_type,
};
pub use migrate::{
    CURRENT_VERSION, MIN_VERSION, MigrationDirection, MigrationError, MigrationPlan,
    MigrationStep, Migrator, VersionedTree, migrate,
};
pub use node::{IndexEntry, Node};
pub use serde_node::NodeJsonError;
pub use text::{children_text, to_text};
