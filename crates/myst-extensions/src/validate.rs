/*
 * validate.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Validation of raw invocations against their specs.
 */

//! Raw invocation → validated data.
//!
//! Problems that make the input unusable (a missing required argument or
//! body, a value of the wrong type) are errors and leave no data. Problems
//! that can be ignored safely (an unknown option, a body given to a directive
//! that takes none) are warnings; the offending input is dropped and
//! validation continues.

use myst_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, rules};
use serde_json::Value;

use crate::data::{ArgValue, DirectiveData, RawDirective, RawRole, RoleData};
use crate::spec::{DirectiveSpec, RoleSpec, ValueType};

/// Coerce a raw value to the declared type.
pub fn coerce(value: &Value, value_type: ValueType) -> Result<ArgValue, String> {
    match value_type {
        ValueType::String | ValueType::Markdown => {
            let s = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(format!("expected {}, found a collection", value_type.as_str()));
                }
            };
            Ok(if value_type == ValueType::Markdown {
                ArgValue::Markdown(s)
            } else {
                ArgValue::String(s)
            })
        }
        ValueType::Boolean => match value {
            Value::Bool(b) => Ok(ArgValue::Boolean(*b)),
            // `:linenos:` with no value is a set flag
            Value::Null => Ok(ArgValue::Boolean(true)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "" | "true" | "yes" | "on" => Ok(ArgValue::Boolean(true)),
                "false" | "no" | "off" => Ok(ArgValue::Boolean(false)),
                other => Err(format!("expected boolean, found `{other}`")),
            },
            _ => Err("expected boolean".to_string()),
        },
        ValueType::Number => match value {
            Value::Number(n) => n
                .as_f64()
                .map(ArgValue::Number)
                .ok_or_else(|| "number out of range".to_string()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(ArgValue::Number)
                .map_err(|_| format!("expected number, found `{}`", s.trim())),
            _ => Err("expected number".to_string()),
        },
    }
}

fn directive_error(raw: &RawDirective, code: &str, problem: String) -> DiagnosticMessage {
    DiagnosticMessageBuilder::error(format!("Invalid `{}` directive", raw.name))
        .with_code(code)
        .with_optional_location(raw.position)
        .problem(problem)
        .build()
}

fn directive_warning(raw: &RawDirective, code: &str, problem: String) -> DiagnosticMessage {
    DiagnosticMessageBuilder::warning(format!("Ignored input to `{}` directive", raw.name))
        .with_code(code)
        .with_optional_location(raw.position)
        .problem(problem)
        .build()
}

/// Validate a directive. Returns `None` when any error was reported.
pub fn validate_directive(
    spec: &DirectiveSpec,
    raw: &RawDirective,
) -> (Option<DirectiveData>, Vec<DiagnosticMessage>) {
    let mut diagnostics = Vec::new();
    let mut failed = false;

    let raw_arg = raw.arg.as_deref().map(str::trim).filter(|a| !a.is_empty());
    let arg = match (&spec.arg, raw_arg) {
        (Some(arg_spec), Some(text)) => {
            match coerce(&Value::String(text.to_string()), arg_spec.value_type) {
                Ok(value) => Some(value),
                Err(problem) => {
                    diagnostics.push(directive_error(
                        raw,
                        rules::DIRECTIVE_ARG_CORRECT,
                        format!("argument: {problem}"),
                    ));
                    failed = true;
                    None
                }
            }
        }
        (Some(arg_spec), None) if arg_spec.required => {
            diagnostics.push(directive_error(
                raw,
                rules::DIRECTIVE_ARG_CORRECT,
                "a required argument is missing".to_string(),
            ));
            failed = true;
            None
        }
        (None, Some(text)) => {
            diagnostics.push(directive_error(
                raw,
                rules::DIRECTIVE_ARG_CORRECT,
                format!("takes no argument, found `{text}`"),
            ));
            failed = true;
            None
        }
        _ => None,
    };

    let mut options = indexmap::IndexMap::new();
    for (key, value) in &raw.options {
        let Some(option_spec) = spec.options.get(key) else {
            diagnostics.push(directive_warning(
                raw,
                rules::DIRECTIVE_OPTIONS_CORRECT,
                format!("unknown option `{key}`"),
            ));
            continue;
        };
        match coerce(value, option_spec.value_type) {
            Ok(v) => {
                options.insert(key.clone(), v);
            }
            Err(problem) => {
                diagnostics.push(directive_error(
                    raw,
                    rules::DIRECTIVE_OPTIONS_CORRECT,
                    format!("option `{key}`: {problem}"),
                ));
                failed = true;
            }
        }
    }
    for (key, option_spec) in &spec.options {
        if option_spec.required && !raw.options.contains_key(key) {
            diagnostics.push(directive_error(
                raw,
                rules::DIRECTIVE_OPTIONS_CORRECT,
                format!("required option `{key}` is missing"),
            ));
            failed = true;
        }
    }

    let has_body = raw.body.as_deref().is_some_and(|b| !b.trim().is_empty());
    let body = match &spec.body {
        Some(body_spec) if body_spec.required && !has_body => {
            diagnostics.push(directive_error(
                raw,
                rules::DIRECTIVE_BODY_CORRECT,
                "a required body is missing".to_string(),
            ));
            failed = true;
            None
        }
        Some(_) => raw.body.clone(),
        None if has_body => {
            diagnostics.push(directive_warning(
                raw,
                rules::DIRECTIVE_BODY_CORRECT,
                "takes no body; the body was ignored".to_string(),
            ));
            None
        }
        None => None,
    };

    if failed {
        return (None, diagnostics);
    }
    let data = DirectiveData {
        name: raw.name.clone(),
        arg,
        options,
        body,
        body_offset: raw.body_offset,
        position: raw.position,
    };
    (Some(data), diagnostics)
}

/// Validate a role. Returns `None` when its content is required but empty.
pub fn validate_role(spec: &RoleSpec, raw: &RawRole) -> (Option<RoleData>, Vec<DiagnosticMessage>) {
    let required = spec.body.as_ref().is_some_and(|b| b.required);
    if required && raw.content.trim().is_empty() {
        let diagnostic = DiagnosticMessageBuilder::error(format!("Invalid `{}` role", raw.name))
            .with_code(rules::ROLE_BODY_CORRECT)
            .with_optional_location(raw.position)
            .problem("the role content is empty")
            .build();
        return (None, vec![diagnostic]);
    }
    (Some(raw.clone()), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::BodyKind;
    use serde_json::json;

    fn spec() -> DirectiveSpec {
        DirectiveSpec::new("figure")
            .arg(ValueType::String, true)
            .common_options()
            .option("width", ValueType::String)
            .option("nonumber", ValueType::Boolean)
            .option("scale", ValueType::Number)
            .body(BodyKind::Markdown, false)
    }

    fn raw(arg: Option<&str>) -> RawDirective {
        RawDirective {
            name: "figure".into(),
            arg: arg.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_coerce() {
        assert_eq!(
            coerce(&json!("yes"), ValueType::Boolean).unwrap(),
            ArgValue::Boolean(true)
        );
        assert_eq!(
            coerce(&json!(" 2.5 "), ValueType::Number).unwrap(),
            ArgValue::Number(2.5)
        );
        assert_eq!(
            coerce(&json!(3), ValueType::String).unwrap(),
            ArgValue::String("3".into())
        );
        assert!(coerce(&json!("maybe"), ValueType::Boolean).is_err());
        assert!(coerce(&json!([1]), ValueType::String).is_err());
    }

    #[test]
    fn test_valid_directive() {
        let mut r = raw(Some("img.png"));
        r.options.insert("label".into(), json!("fig-a"));
        r.options.insert("nonumber".into(), Value::Null);
        r.options.insert("scale".into(), json!("50"));
        let (data, diagnostics) = validate_directive(&spec(), &r);
        assert!(diagnostics.is_empty());
        let data = data.unwrap();
        assert_eq!(data.arg_str(), Some("img.png"));
        assert_eq!(data.label(), Some("fig-a"));
        assert!(data.flag("nonumber"));
        assert_eq!(data.option_number("scale"), Some(50.0));
    }

    #[test]
    fn test_missing_required_arg() {
        let (data, diagnostics) = validate_directive(&spec(), &raw(None));
        assert!(data.is_none());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].has_code(rules::DIRECTIVE_ARG_CORRECT));
        assert!(diagnostics[0].title.contains("figure"));
    }

    #[test]
    fn test_unknown_option_is_warning() {
        let mut r = raw(Some("img.png"));
        r.options.insert("colour".into(), json!("red"));
        let (data, diagnostics) = validate_directive(&spec(), &r);
        assert!(data.is_some());
        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics[0].is_error());
    }

    #[test]
    fn test_bad_option_type_is_error() {
        let mut r = raw(Some("img.png"));
        r.options.insert("scale".into(), json!("big"));
        let (data, diagnostics) = validate_directive(&spec(), &r);
        assert!(data.is_none());
        assert!(diagnostics[0].is_error());
    }

    #[test]
    fn test_missing_required_body() {
        let spec = DirectiveSpec::new("math").body(BodyKind::Raw, true);
        let r = RawDirective {
            name: "math".into(),
            body: Some("  \n".into()),
            ..Default::default()
        };
        let (data, diagnostics) = validate_directive(&spec, &r);
        assert!(data.is_none());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].has_code(rules::DIRECTIVE_BODY_CORRECT));
    }

    #[test]
    fn test_unexpected_body_is_dropped() {
        let spec = DirectiveSpec::new("include").arg(ValueType::String, true);
        let r = RawDirective {
            name: "include".into(),
            arg: Some("a.md".into()),
            body: Some("stray".into()),
            ..Default::default()
        };
        let (data, diagnostics) = validate_directive(&spec, &r);
        assert!(data.unwrap().body.is_none());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_empty_role() {
        let spec = RoleSpec::new("kbd");
        let r = RawRole {
            name: "kbd".into(),
            content: " ".into(),
            ..Default::default()
        };
        let (data, diagnostics) = validate_role(&spec, &r);
        assert!(data.is_none());
        assert!(diagnostics[0].has_code(rules::ROLE_BODY_CORRECT));
    }
}
