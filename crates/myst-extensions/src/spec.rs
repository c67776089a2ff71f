/*
 * spec.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Declarative description of directive and role inputs.
 */

use indexmap::IndexMap;

/// Declared type of an argument or option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Boolean,
    Number,
    /// Text parsed as inline content by the directive
    Markdown,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
            ValueType::Number => "number",
            ValueType::Markdown => "markdown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub value_type: ValueType,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    pub value_type: ValueType,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Kept verbatim (code, math)
    Raw,
    /// Parsed as block content
    Markdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodySpec {
    pub kind: BodyKind,
    pub required: bool,
}

/// What a directive accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveSpec {
    pub name: String,
    pub aliases: Vec<String>,
    pub arg: Option<ArgSpec>,
    pub options: IndexMap<String, OptionSpec>,
    pub body: Option<BodySpec>,
}

impl DirectiveSpec {
    pub fn new(name: impl Into<String>) -> Self {
        DirectiveSpec {
            name: name.into(),
            aliases: Vec::new(),
            arg: None,
            options: IndexMap::new(),
            body: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn arg(mut self, value_type: ValueType, required: bool) -> Self {
        self.arg = Some(ArgSpec {
            value_type,
            required,
        });
        self
    }

    pub fn option(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.options.insert(
            name.into(),
            OptionSpec {
                value_type,
                required: false,
            },
        );
        self
    }

    pub fn required_option(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.options.insert(
            name.into(),
            OptionSpec {
                value_type,
                required: true,
            },
        );
        self
    }

    /// `label` (alias `name`) and `class`, accepted by most directives.
    pub fn common_options(self) -> Self {
        self.option("label", ValueType::String)
            .option("name", ValueType::String)
            .option("class", ValueType::String)
    }

    pub fn body(mut self, kind: BodyKind, required: bool) -> Self {
        self.body = Some(BodySpec { kind, required });
        self
    }

    /// The primary name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// What a role accepts. Role content is its only input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    pub name: String,
    pub aliases: Vec<String>,
    pub body: Option<BodySpec>,
}

impl RoleSpec {
    pub fn new(name: impl Into<String>) -> Self {
        RoleSpec {
            name: name.into(),
            aliases: Vec::new(),
            body: Some(BodySpec {
                kind: BodyKind::Raw,
                required: true,
            }),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn body(mut self, kind: BodyKind, required: bool) -> Self {
        self.body = Some(BodySpec { kind, required });
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let spec = DirectiveSpec::new("figure")
            .alias("fig")
            .arg(ValueType::String, true)
            .common_options()
            .option("width", ValueType::String)
            .body(BodyKind::Markdown, false);
        assert_eq!(spec.names().collect::<Vec<_>>(), vec!["figure", "fig"]);
        assert!(spec.arg.as_ref().unwrap().required);
        assert!(spec.options.contains_key("label"));
        assert_eq!(spec.options.len(), 4);
        assert_eq!(spec.body.unwrap().kind, BodyKind::Markdown);
    }

    #[test]
    fn test_role_spec_defaults_to_required_raw_body() {
        let spec = RoleSpec::new("kbd");
        let body = spec.body.unwrap();
        assert_eq!(body.kind, BodyKind::Raw);
        assert!(body.required);
    }
}
