/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Directive and role registry.
 */

//! Extension points of the MyST dialect.
//!
//! A *directive* is a block-level extension (```` ```{figure} ````), a *role*
//! an inline one (`` {ref}`label` ``). Each is described by a spec that
//! declares its argument, options and body, and implements an `expand` step
//! that turns validated input into nodes.
//!
//! The parser never calls `expand` directly. It hands raw invocations to
//! [`ExtensionRegistry::run_directive`] / [`ExtensionRegistry::run_role`],
//! which look the name up, validate against the spec, and either expand or
//! produce an error placeholder. Expansion can re-enter the parser through
//! [`ExpandContext`] to parse a body as block or inline content.

pub mod context;
pub mod data;
pub mod directives;
pub mod registry;
pub mod roles;
pub mod spec;
pub mod validate;

pub use context::{ExpandContext, FragmentParser};
pub use data::{ArgValue, DirectiveData, RawDirective, RawRole, RoleData};
pub use registry::{Directive, ExtensionRegistry, FnDirective, FnRole, Role};
pub use spec::{ArgSpec, BodyKind, BodySpec, DirectiveSpec, OptionSpec, RoleSpec, ValueType};
