/*
 * serde_node.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * JSON representation of nodes.
 */

//! Nodes serialize to flat JSON objects:
//!
//! ```json
//! {"type": "heading", "depth": 1, "identifier": "intro", "children": [...]}
//! ```
//!
//! Objects whose `type` is not a known kind (or whose attributes don't fit
//! the known shape) become [`NodeKind::Opaque`] and are written back exactly
//! as read, so trees produced by newer tools survive a round trip.

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::kind::NodeKind;
use crate::node::{IndexEntry, Node};

const CHILDREN: &str = "children";
const IDENTIFIER: &str = "identifier";
const LABEL: &str = "label";
const HTML_ID: &str = "html_id";
const ENUMERATED: &str = "enumerated";
const ENUMERATOR: &str = "enumerator";
const INDEX_ENTRIES: &str = "indexEntries";
const POSITION: &str = "position";

#[derive(Debug, thiserror::Error)]
pub enum NodeJsonError {
    #[error("expected a JSON object for a node, found {0}")]
    NotAnObject(&'static str),
    #[error("node is missing its `type` field")]
    MissingType,
    #[error("invalid `{field}` on {type_name} node: {source}")]
    InvalidField {
        type_name: String,
        field: &'static str,
        source: serde_json::Error,
    },
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Node {
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        let mut map = match &self.kind {
            NodeKind::Opaque { type_name, data } => {
                let mut map = Map::with_capacity(data.len() + 1);
                map.insert("type".to_string(), Value::String(type_name.clone()));
                for (k, v) in data {
                    map.insert(k.clone(), v.clone());
                }
                map
            }
            kind => match serde_json::to_value(kind)? {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        };

        if let Some(identifier) = &self.identifier {
            map.insert(IDENTIFIER.into(), Value::String(identifier.clone()));
        }
        if let Some(label) = &self.label {
            map.insert(LABEL.into(), Value::String(label.clone()));
        }
        if let Some(html_id) = &self.html_id {
            map.insert(HTML_ID.into(), Value::String(html_id.clone()));
        }
        if let Some(enumerated) = self.enumerated {
            map.insert(ENUMERATED.into(), Value::Bool(enumerated));
        }
        if let Some(enumerator) = &self.enumerator {
            map.insert(ENUMERATOR.into(), Value::String(enumerator.clone()));
        }
        if !self.index_entries.is_empty() {
            map.insert(
                INDEX_ENTRIES.into(),
                serde_json::to_value(&self.index_entries)?,
            );
        }
        if let Some(position) = &self.position {
            map.insert(POSITION.into(), serde_json::to_value(position)?);
        }
        if !self.children.is_empty() {
            let children = self
                .children
                .iter()
                .map(Node::to_json)
                .collect::<Result<Vec<_>, _>>()?;
            map.insert(CHILDREN.into(), Value::Array(children));
        }
        Ok(Value::Object(map))
    }

    pub fn from_json(value: Value) -> Result<Node, NodeJsonError> {
        let mut map = match value {
            Value::Object(map) => map,
            other => return Err(NodeJsonError::NotAnObject(json_type_name(&other))),
        };
        let type_name = match map.get("type") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(NodeJsonError::MissingType),
        };

        let field_err = |field: &'static str| {
            let type_name = type_name.clone();
            move |source| NodeJsonError::InvalidField {
                type_name,
                field,
                source,
            }
        };

        let children = match map.remove(CHILDREN) {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(Node::from_json)
                .collect::<Result<Vec<_>, _>>()?,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(NodeJsonError::NotAnObject(json_type_name(&other)));
            }
        };
        let identifier = take_string(&mut map, IDENTIFIER);
        let label = take_string(&mut map, LABEL);
        let html_id = take_string(&mut map, HTML_ID);
        let enumerated = match map.remove(ENUMERATED) {
            Some(Value::Bool(b)) => Some(b),
            _ => None,
        };
        let enumerator = match map.remove(ENUMERATOR) {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let index_entries: Vec<IndexEntry> = match map.remove(INDEX_ENTRIES) {
            Some(v) => serde_json::from_value(v).map_err(field_err(INDEX_ENTRIES))?,
            None => Vec::new(),
        };
        let position = match map.remove(POSITION) {
            Some(Value::Null) | None => None,
            Some(v) => Some(serde_json::from_value(v).map_err(field_err(POSITION))?),
        };

        let kind = match serde_json::from_value::<NodeKind>(Value::Object(map.clone())) {
            Ok(kind) => kind,
            Err(_) => {
                map.remove("type");
                NodeKind::Opaque {
                    type_name,
                    data: map,
                }
            }
        };

        Ok(Node {
            kind,
            children,
            identifier,
            label,
            html_id,
            enumerated,
            enumerator,
            index_entries,
            position,
        })
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Node::from_json(value).map_err(D::Error::custom)
    }
}
