/*
 * directives/include.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Inclusion of other files.
 */

use myst_ast::{Node, NodeKind};

use crate::context::ExpandContext;
use crate::data::DirectiveData;
use crate::registry::Directive;
use crate::spec::{DirectiveSpec, ValueType};

/// `include`: leaves an `include` node for the include pass to resolve.
///
/// Files are read by the pipeline, not here, so that expansion stays free of
/// I/O.
pub struct IncludeDirective {
    spec: DirectiveSpec,
}

impl IncludeDirective {
    pub fn new() -> Self {
        IncludeDirective {
            spec: DirectiveSpec::new("include")
                .alias("literalinclude")
                .arg(ValueType::String, true)
                .option("literal", ValueType::Boolean)
                .option("lang", ValueType::String)
                .option("start-line", ValueType::Number)
                .option("end-line", ValueType::Number),
        }
    }
}

impl Default for IncludeDirective {
    fn default() -> Self {
        Self::new()
    }
}

fn line_option(data: &DirectiveData, name: &str) -> Option<usize> {
    data.option_number(name)
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as usize)
}

impl Directive for IncludeDirective {
    fn spec(&self) -> &DirectiveSpec {
        &self.spec
    }

    fn expand(&self, data: DirectiveData, _ctx: &mut ExpandContext<'_>) -> Vec<Node> {
        let literal = data.flag("literal") || data.name == "literalinclude";
        let node = Node::new(NodeKind::Include {
            file: data.arg_str().unwrap_or_default().trim().to_string(),
            literal,
            lang: data.option_str("lang").map(str::to_string),
            start_line: line_option(&data, "start-line"),
            end_line: line_option(&data, "end-line"),
        })
        .at_opt(data.position);
        vec![node]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::test_support::{raw, run};

    #[test]
    fn test_include_options() {
        let mut r = raw("include", Some("snippets/a.py"), None);
        r.options.insert("literal".into(), serde_json::Value::Null);
        r.options.insert("start-line".into(), serde_json::json!("2"));
        let (nodes, diagnostics) = run(&IncludeDirective::new(), r);
        assert!(diagnostics.is_empty());
        assert_eq!(
            nodes[0].kind,
            NodeKind::Include {
                file: "snippets/a.py".into(),
                literal: true,
                lang: None,
                start_line: Some(2),
                end_line: None,
            }
        );
    }

    #[test]
    fn test_literalinclude_alias_is_literal() {
        let (nodes, _) = run(
            &IncludeDirective::new(),
            raw("literalinclude", Some("a.txt"), None),
        );
        assert!(matches!(nodes[0].kind, NodeKind::Include { literal: true, .. }));
    }
}
