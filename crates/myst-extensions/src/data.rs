/*
 * data.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Raw and validated extension invocations.
 */

use indexmap::IndexMap;
use myst_source_map::SourceInfo;
use serde_json::Value;

/// A directive as written, before validation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawDirective {
    pub name: String,
    pub arg: Option<String>,
    /// Options from `:key: value` lines (strings) or a YAML block (any value)
    pub options: IndexMap<String, Value>,
    pub body: Option<String>,
    /// Byte offset of the body in the source file
    pub body_offset: usize,
    pub position: Option<SourceInfo>,
}

/// A role as written, before validation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoleData {
    pub name: String,
    pub content: String,
    /// Byte offset of the content in the source file
    pub content_offset: usize,
    pub position: Option<SourceInfo>,
}

/// Roles carry no options, so raw and validated data share a shape.
pub type RawRole = RoleData;

/// A coerced argument or option value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    String(String),
    Boolean(bool),
    Number(f64),
    Markdown(String),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::String(s) | ArgValue::Markdown(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ArgValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// JSON form, as stored on the `mystDirective` node.
    pub fn to_json(&self) -> Value {
        match self {
            ArgValue::String(s) | ArgValue::Markdown(s) => Value::String(s.clone()),
            ArgValue::Boolean(b) => Value::Bool(*b),
            ArgValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }
}

/// A directive after validation against its spec.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DirectiveData {
    pub name: String,
    pub arg: Option<ArgValue>,
    pub options: IndexMap<String, ArgValue>,
    pub body: Option<String>,
    pub body_offset: usize,
    pub position: Option<SourceInfo>,
}

impl DirectiveData {
    pub fn arg_str(&self) -> Option<&str> {
        self.arg.as_ref().and_then(ArgValue::as_str)
    }

    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.options.get(name).and_then(ArgValue::as_str)
    }

    /// Whether a boolean option is set. Absent means `false`.
    pub fn flag(&self, name: &str) -> bool {
        self.options
            .get(name)
            .and_then(ArgValue::as_bool)
            .unwrap_or(false)
    }

    pub fn option_number(&self, name: &str) -> Option<f64> {
        self.options.get(name).and_then(ArgValue::as_number)
    }

    /// The `label` option, falling back to `name`.
    pub fn label(&self) -> Option<&str> {
        self.option_str("label").or_else(|| self.option_str("name"))
    }

    pub fn class(&self) -> Option<String> {
        self.option_str("class").map(str::to_string)
    }

    /// The body, or an empty string.
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_falls_back_to_name() {
        let mut data = DirectiveData::default();
        data.options
            .insert("name".into(), ArgValue::String("fig-a".into()));
        assert_eq!(data.label(), Some("fig-a"));
        data.options
            .insert("label".into(), ArgValue::String("fig-b".into()));
        assert_eq!(data.label(), Some("fig-b"));
    }

    #[test]
    fn test_flag_defaults_false() {
        let mut data = DirectiveData::default();
        assert!(!data.flag("linenos"));
        data.options.insert("linenos".into(), ArgValue::Boolean(true));
        assert!(data.flag("linenos"));
    }

    #[test]
    fn test_number_to_json() {
        assert_eq!(ArgValue::Number(3.0).to_json(), serde_json::json!(3.0));
        assert_eq!(ArgValue::Number(f64::NAN).to_json(), Value::Null);
    }
}
