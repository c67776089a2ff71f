/*
 * registry.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Registry of directives and roles.
 */

use std::sync::Arc;

use indexmap::IndexMap;
use myst_ast::{Node, NodeKind};
use myst_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, rules};
use serde_json::Value;

use crate::context::{ExpandContext, FragmentParser};
use crate::data::{DirectiveData, RawDirective, RawRole, RoleData};
use crate::spec::{DirectiveSpec, RoleSpec};
use crate::validate::{validate_directive, validate_role};

/// A block-level extension.
///
/// `expand` must not depend on anything but its input and the context: the
/// same data always yields the same nodes.
pub trait Directive: Send + Sync {
    fn spec(&self) -> &DirectiveSpec;

    fn expand(&self, data: DirectiveData, ctx: &mut ExpandContext<'_>) -> Vec<Node>;
}

/// An inline extension.
pub trait Role: Send + Sync {
    fn spec(&self) -> &RoleSpec;

    fn expand(&self, data: RoleData, ctx: &mut ExpandContext<'_>) -> Vec<Node>;
}

impl std::fmt::Debug for dyn Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directive")
            .field("name", &self.spec().name)
            .finish()
    }
}

impl std::fmt::Debug for dyn Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Role").field("name", &self.spec().name).finish()
    }
}

/// Directives and roles known to a build.
///
/// Implementations are appended, never removed. Names and aliases map to the
/// most recent implementation that claimed them; a claim over an existing
/// name is reported as an `extension-shadowed` warning.
///
/// Built once per build and shared read-only across workers.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    directives: Vec<Arc<dyn Directive>>,
    roles: Vec<Arc<dyn Role>>,
    directive_names: IndexMap<String, usize>,
    role_names: IndexMap<String, usize>,
    warnings: Vec<DiagnosticMessage>,
}

impl ExtensionRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with every built-in directive and role.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for directive in crate::directives::builtins() {
            registry.register_directive(directive);
        }
        for role in crate::roles::builtins() {
            registry.register_role(role);
        }
        registry
    }

    pub fn register_directive(&mut self, directive: Arc<dyn Directive>) {
        let index = self.directives.len();
        let names: Vec<String> = directive.spec().names().map(str::to_string).collect();
        for name in names {
            if let Some(previous) = self.directive_names.insert(name.clone(), index) {
                let previous_name = self.directives[previous].spec().name.clone();
                self.shadowed("directive", &name, &previous_name);
            }
        }
        self.directives.push(directive);
    }

    pub fn register_role(&mut self, role: Arc<dyn Role>) {
        let index = self.roles.len();
        let names: Vec<String> = role.spec().names().map(str::to_string).collect();
        for name in names {
            if let Some(previous) = self.role_names.insert(name.clone(), index) {
                let previous_name = self.roles[previous].spec().name.clone();
                self.shadowed("role", &name, &previous_name);
            }
        }
        self.roles.push(role);
    }

    fn shadowed(&mut self, what: &str, name: &str, previous: &str) {
        tracing::warn!(
            kind = what,
            extension = name,
            previous = previous,
            "extension registration shadows an earlier one"
        );
        let warning = DiagnosticMessageBuilder::warning(format!("The {what} `{name}` was redefined"))
            .with_code(rules::EXTENSION_SHADOWED)
            .problem(format!(
                "a later registration replaces the {what} previously registered as `{previous}`"
            ))
            .build();
        self.warnings.push(warning);
    }

    /// Shadowing warnings raised while registering.
    pub fn warnings(&self) -> &[DiagnosticMessage] {
        &self.warnings
    }

    pub fn directive(&self, name: &str) -> Option<&Arc<dyn Directive>> {
        self.directive_names
            .get(name)
            .map(|&index| &self.directives[index])
    }

    pub fn role(&self, name: &str) -> Option<&Arc<dyn Role>> {
        self.role_names.get(name).map(|&index| &self.roles[index])
    }

    pub fn has_directive(&self, name: &str) -> bool {
        self.directive_names.contains_key(name)
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.role_names.contains_key(name)
    }

    /// Every name and alias, in registration order.
    pub fn directive_names(&self) -> impl Iterator<Item = &str> {
        self.directive_names.keys().map(String::as_str)
    }

    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.role_names.keys().map(String::as_str)
    }

    /// Validate and expand a directive invocation.
    ///
    /// Always returns a `mystDirective` node. On success its children are the
    /// expansion; on failure it is marked `error` and carries no expansion,
    /// except that an unknown directive keeps its body as a code block so the
    /// content is not lost.
    pub fn run_directive(&self, raw: RawDirective, parser: &mut dyn FragmentParser) -> Node {
        let options: IndexMap<String, Value> = raw.options.clone();
        let mut node = Node::new(NodeKind::MystDirective {
            name: raw.name.clone(),
            args: raw.arg.clone(),
            options,
            value: raw.body.clone(),
            error: false,
        })
        .at_opt(raw.position);

        let Some(directive) = self.directive(&raw.name).cloned() else {
            parser.report(
                DiagnosticMessageBuilder::warning(format!("Unknown directive `{}`", raw.name))
                    .with_code(rules::DIRECTIVE_KNOWN)
                    .with_optional_location(raw.position)
                    .add_hint("Check the spelling, or register the directive before parsing")
                    .build(),
            );
            set_error(&mut node);
            if let Some(body) = raw.body.as_deref().filter(|b| !b.trim().is_empty()) {
                node.children.push(Node::new(NodeKind::Code {
                    lang: None,
                    meta: None,
                    value: body.trim_end().to_string(),
                    executable: false,
                    show_line_numbers: false,
                }));
            }
            return node;
        };

        let (data, diagnostics) = validate_directive(directive.spec(), &raw);
        for diagnostic in diagnostics {
            parser.report(diagnostic);
        }
        match data {
            Some(data) => {
                let mut ctx = ExpandContext::new(parser);
                node.children = directive.expand(data, &mut ctx);
            }
            None => set_error(&mut node),
        }
        node
    }

    /// Validate and expand a role invocation; see [`Self::run_directive`].
    pub fn run_role(&self, raw: RawRole, parser: &mut dyn FragmentParser) -> Node {
        let mut node = Node::new(NodeKind::MystRole {
            name: raw.name.clone(),
            value: Some(raw.content.clone()),
            error: false,
        })
        .at_opt(raw.position);

        let Some(role) = self.role(&raw.name).cloned() else {
            parser.report(
                DiagnosticMessageBuilder::warning(format!("Unknown role `{}`", raw.name))
                    .with_code(rules::ROLE_KNOWN)
                    .with_optional_location(raw.position)
                    .build(),
            );
            set_error(&mut node);
            node.children.push(Node::new(NodeKind::InlineCode {
                value: raw.content,
            }));
            return node;
        };

        let (data, diagnostics) = validate_role(role.spec(), &raw);
        for diagnostic in diagnostics {
            parser.report(diagnostic);
        }
        match data {
            Some(data) => {
                let mut ctx = ExpandContext::new(parser);
                node.children = role.expand(data, &mut ctx);
            }
            None => set_error(&mut node),
        }
        node
    }
}

fn set_error(node: &mut Node) {
    match &mut node.kind {
        NodeKind::MystDirective { error, .. } | NodeKind::MystRole { error, .. } => *error = true,
        _ => {}
    }
}

/// Shorthand for building simple directives from a spec and a function.
pub struct FnDirective<F> {
    spec: DirectiveSpec,
    expand: F,
}

impl<F> FnDirective<F>
where
    F: Fn(DirectiveData, &mut ExpandContext<'_>) -> Vec<Node> + Send + Sync,
{
    pub fn new(spec: DirectiveSpec, expand: F) -> Self {
        FnDirective { spec, expand }
    }
}

impl<F> Directive for FnDirective<F>
where
    F: Fn(DirectiveData, &mut ExpandContext<'_>) -> Vec<Node> + Send + Sync,
{
    fn spec(&self) -> &DirectiveSpec {
        &self.spec
    }

    fn expand(&self, data: DirectiveData, ctx: &mut ExpandContext<'_>) -> Vec<Node> {
        (self.expand)(data, ctx)
    }
}

/// Shorthand for building simple roles from a spec and a function.
pub struct FnRole<F> {
    spec: RoleSpec,
    expand: F,
}

impl<F> FnRole<F>
where
    F: Fn(RoleData, &mut ExpandContext<'_>) -> Vec<Node> + Send + Sync,
{
    pub fn new(spec: RoleSpec, expand: F) -> Self {
        FnRole { spec, expand }
    }
}

impl<F> Role for FnRole<F>
where
    F: Fn(RoleData, &mut ExpandContext<'_>) -> Vec<Node> + Send + Sync,
{
    fn spec(&self) -> &RoleSpec {
        &self.spec
    }

    fn expand(&self, data: RoleData, ctx: &mut ExpandContext<'_>) -> Vec<Node> {
        (self.expand)(data, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::PlainFragments;
    use crate::spec::{BodyKind, ValueType};

    fn shout(name: &str) -> Arc<dyn Directive> {
        let tag = name.to_uppercase();
        Arc::new(FnDirective::new(
            DirectiveSpec::new(name).alias("yell").body(BodyKind::Raw, false),
            move |_, _| vec![Node::text(tag.clone())],
        ))
    }

    #[test]
    fn test_builtins_registered() {
        let registry = ExtensionRegistry::new();
        for name in ["note", "figure", "code-block", "math", "include", "code-cell"] {
            assert!(registry.has_directive(name), "missing directive {name}");
        }
        for name in ["ref", "numref", "eq", "cite:p", "sub", "abbr", "raw:latex"] {
            assert!(registry.has_role(name), "missing role {name}");
        }
        assert!(registry.warnings().is_empty());
    }

    #[test]
    fn test_alias_resolves_to_same_spec() {
        let registry = ExtensionRegistry::new();
        let a = registry.directive("code").unwrap();
        let b = registry.directive("sourcecode").unwrap();
        assert!(Arc::ptr_eq(a, b));
    }

    #[test]
    fn test_last_registration_wins_with_warning() {
        let mut registry = ExtensionRegistry::empty();
        registry.register_directive(shout("first"));
        registry.register_directive(shout("second"));
        // both claim the alias `yell`
        assert_eq!(registry.warnings().len(), 1);
        assert!(registry.warnings()[0].has_code(rules::EXTENSION_SHADOWED));
        assert_eq!(registry.directive("yell").unwrap().spec().name, "second");
        assert_eq!(registry.directive("first").unwrap().spec().name, "first");
    }

    #[test]
    fn test_run_unknown_directive_keeps_body() {
        let registry = ExtensionRegistry::empty();
        let mut parser = PlainFragments::default();
        let raw = RawDirective {
            name: "mystery".into(),
            body: Some("some text\n".into()),
            ..Default::default()
        };
        let node = registry.run_directive(raw, &mut parser);
        assert!(matches!(node.kind, NodeKind::MystDirective { error: true, .. }));
        assert_eq!(node.children.len(), 1);
        assert!(parser.reported[0].has_code(rules::DIRECTIVE_KNOWN));
    }

    #[test]
    fn test_run_invalid_directive_is_empty_placeholder() {
        let mut registry = ExtensionRegistry::empty();
        registry.register_directive(Arc::new(FnDirective::new(
            DirectiveSpec::new("needs-arg").arg(ValueType::String, true),
            |_, _| vec![Node::text("unreachable")],
        )));
        let mut parser = PlainFragments::default();
        let raw = RawDirective {
            name: "needs-arg".into(),
            ..Default::default()
        };
        let node = registry.run_directive(raw, &mut parser);
        assert!(matches!(node.kind, NodeKind::MystDirective { error: true, .. }));
        assert!(node.children.is_empty());
        assert_eq!(parser.reported.len(), 1);
    }

    #[test]
    fn test_run_role_expands() {
        let registry = ExtensionRegistry::new();
        let mut parser = PlainFragments::default();
        let raw = RawRole {
            name: "kbd".into(),
            content: "Ctrl".into(),
            ..Default::default()
        };
        let node = registry.run_role(raw, &mut parser);
        assert!(matches!(node.kind, NodeKind::MystRole { error: false, .. }));
        assert_eq!(node.children[0].kind, NodeKind::Keyboard);
        assert!(parser.reported.is_empty());
    }

    #[test]
    fn test_run_unknown_role() {
        let registry = ExtensionRegistry::new();
        let mut parser = PlainFragments::default();
        let raw = RawRole {
            name: "nope".into(),
            content: "x".into(),
            ..Default::default()
        };
        let node = registry.run_role(raw, &mut parser);
        assert!(matches!(node.kind, NodeKind::MystRole { error: true, .. }));
        assert!(parser.reported[0].has_code(rules::ROLE_KNOWN));
    }
}
