/*
 * directives/math.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Display math.
 */

use myst_ast::{Node, NodeKind};

use super::apply_label;
use crate::context::ExpandContext;
use crate::data::DirectiveData;
use crate::registry::Directive;
use crate::spec::{BodyKind, DirectiveSpec, ValueType};

pub struct MathDirective {
    spec: DirectiveSpec,
}

impl MathDirective {
    pub fn new() -> Self {
        MathDirective {
            spec: DirectiveSpec::new("math")
                .common_options()
                .option("nonumber", ValueType::Boolean)
                .body(BodyKind::Raw, true),
        }
    }
}

impl Default for MathDirective {
    fn default() -> Self {
        Self::new()
    }
}

impl Directive for MathDirective {
    fn spec(&self) -> &DirectiveSpec {
        &self.spec
    }

    fn expand(&self, data: DirectiveData, _ctx: &mut ExpandContext<'_>) -> Vec<Node> {
        let mut math = Node::new(NodeKind::Math {
            value: data.body_text().trim().to_string(),
        })
        .at_opt(data.position);
        apply_label(&mut math, &data);
        if data.flag("nonumber") {
            math.enumerated = Some(false);
        }
        vec![math]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::test_support::{raw, run};
    use myst_error_reporting::rules;

    #[test]
    fn test_math_with_label() {
        let mut r = raw("math", None, Some("\ne = mc^2\n"));
        r.options.insert("label".into(), serde_json::json!("eq:energy"));
        let (nodes, diagnostics) = run(&MathDirective::new(), r);
        assert!(diagnostics.is_empty());
        assert_eq!(
            nodes[0].kind,
            NodeKind::Math {
                value: "e = mc^2".into()
            }
        );
        assert_eq!(nodes[0].identifier.as_deref(), Some("eq:energy"));
    }

    #[test]
    fn test_math_missing_body_reports_once() {
        let (nodes, diagnostics) = run(&MathDirective::new(), raw("math", None, None));
        assert!(nodes.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].has_code(rules::DIRECTIVE_BODY_CORRECT));
        assert!(diagnostics[0].title.contains("`math`"));
    }
}
