/*
 * migrate.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Schema versions and migrations for persisted trees.
 */

//! Schema versioning for trees that cross a persistence boundary.
//!
//! Every tree written to the execution cache or emitted as JSON is wrapped in
//! a [`VersionedTree`]. Migrations are pairwise steps between adjacent
//! versions, applied to the JSON form so that a tree can be read without
//! knowing its shape in advance.
//!
//! | Step | Upgrade | Downgrade |
//! |------|---------|-----------|
//! | 1 ↔ 2 | footnote `number` becomes `enumerator` | `enumerator` becomes `number` |
//! | 2 ↔ 3 | `numbered` becomes `enumerated` | `enumerated` becomes `numbered` |
//! | 3 ↔ 4 | `output.data[]` becomes an `outputs` node with `output` children | reverse |
//!
//! Steps only touch node kinds they know. Foreign kinds keep their own
//! attributes; their children are still visited.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::kind::is_known_type;
use crate::node::Node;
use crate::serde_node::NodeJsonError;

/// Version written by this build of the engine.
pub const CURRENT_VERSION: u32 = 4;

/// Oldest version a migration exists for.
pub const MIN_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("no migration path from schema version {from} to {to}")]
    NoMigrationPath { from: u32, to: u32 },

    #[error("migration plan mixes upgrade and downgrade steps")]
    MixedDirection,

    #[error("migration plan is not contiguous: step {previous_to} is followed by a step from {next_from}")]
    NonContiguous { previous_to: u32, next_from: u32 },

    #[error("migrated tree is not a valid node tree: {0}")]
    InvalidTree(#[from] NodeJsonError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    Upgrade,
    Downgrade,
}

/// One pairwise migration, `from` to an adjacent `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MigrationStep {
    pub from: u32,
    pub to: u32,
}

impl MigrationStep {
    pub fn up(from: u32) -> Self {
        MigrationStep { from, to: from + 1 }
    }

    pub fn down(from: u32) -> Self {
        MigrationStep {
            from,
            to: from.saturating_sub(1),
        }
    }

    pub fn direction(&self) -> MigrationDirection {
        if self.to > self.from {
            MigrationDirection::Upgrade
        } else {
            MigrationDirection::Downgrade
        }
    }
}

/// An ordered chain of steps, all in one direction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MigrationPlan {
    steps: Vec<MigrationStep>,
}

impl MigrationPlan {
    /// Validate a chain of steps.
    ///
    /// Rejects chains that change direction part-way or skip a version.
    pub fn new(steps: Vec<MigrationStep>) -> Result<Self, MigrationError> {
        let mut direction = None;
        for (i, step) in steps.iter().enumerate() {
            if step.from.abs_diff(step.to) != 1 {
                return Err(MigrationError::NoMigrationPath {
                    from: step.from,
                    to: step.to,
                });
            }
            match direction {
                None => direction = Some(step.direction()),
                Some(d) if d != step.direction() => return Err(MigrationError::MixedDirection),
                Some(_) => {}
            }
            if i > 0 && steps[i - 1].to != step.from {
                return Err(MigrationError::NonContiguous {
                    previous_to: steps[i - 1].to,
                    next_from: step.from,
                });
            }
        }
        Ok(MigrationPlan { steps })
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn is_identity(&self) -> bool {
        self.steps.is_empty()
    }
}

type StepFn = fn(&mut Value);

/// Registry of pairwise migration steps.
#[derive(Clone)]
pub struct Migrator {
    steps: BTreeMap<(u32, u32), StepFn>,
}

impl std::fmt::Debug for Migrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migrator")
            .field("steps", &self.steps.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Migrator {
    fn default() -> Self {
        Self::standard()
    }
}

impl Migrator {
    /// A migrator with no steps.
    pub fn empty() -> Self {
        Migrator {
            steps: BTreeMap::new(),
        }
    }

    /// The migrations between every schema version this engine knows.
    pub fn standard() -> Self {
        let mut m = Migrator::empty();
        m.register(MigrationStep::up(1), upgrade_1_to_2);
        m.register(MigrationStep::down(2), downgrade_2_to_1);
        m.register(MigrationStep::up(2), upgrade_2_to_3);
        m.register(MigrationStep::down(3), downgrade_3_to_2);
        m.register(MigrationStep::up(3), upgrade_3_to_4);
        m.register(MigrationStep::down(4), downgrade_4_to_3);
        m
    }

    pub fn register(&mut self, step: MigrationStep, f: StepFn) {
        self.steps.insert((step.from, step.to), f);
    }

    /// Build the plan from `from` to `to`, failing if any step is missing.
    pub fn plan(&self, from: u32, to: u32) -> Result<MigrationPlan, MigrationError> {
        let mut steps = Vec::new();
        let mut v = from;
        while v != to {
            let step = if v < to {
                MigrationStep::up(v)
            } else {
                MigrationStep::down(v)
            };
            if !self.steps.contains_key(&(step.from, step.to)) {
                return Err(MigrationError::NoMigrationPath { from, to });
            }
            steps.push(step);
            v = step.to;
        }
        MigrationPlan::new(steps)
    }

    /// Apply a plan to a tree in JSON form.
    pub fn apply(&self, plan: &MigrationPlan, mut tree: Value) -> Result<Value, MigrationError> {
        for step in plan.steps() {
            let f = self
                .steps
                .get(&(step.from, step.to))
                .ok_or(MigrationError::NoMigrationPath {
                    from: step.from,
                    to: step.to,
                })?;
            f(&mut tree);
        }
        Ok(tree)
    }

    pub fn migrate(&self, tree: Value, from: u32, to: u32) -> Result<Value, MigrationError> {
        let plan = self.plan(from, to)?;
        self.apply(&plan, tree)
    }
}

/// Migrate a JSON tree between schema versions with the standard steps.
pub fn migrate(tree: Value, from: u32, to: u32) -> Result<Value, MigrationError> {
    Migrator::standard().migrate(tree, from, to)
}

/// A tree tagged with its schema version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedTree {
    #[serde(rename = "mystVersion")]
    pub version: u32,
    pub tree: Value,
}

impl VersionedTree {
    /// Wrap a node tree at the current version.
    pub fn current(node: &Node) -> Result<Self, serde_json::Error> {
        Ok(VersionedTree {
            version: CURRENT_VERSION,
            tree: node.to_json()?,
        })
    }

    /// Migrate to `version`.
    pub fn to_version(self, version: u32) -> Result<VersionedTree, MigrationError> {
        let tree = migrate(self.tree, self.version, version)?;
        Ok(VersionedTree { version, tree })
    }

    /// Migrate to the current version and materialize the node tree.
    pub fn into_node(self) -> Result<Node, MigrationError> {
        let tree = migrate(self.tree, self.version, CURRENT_VERSION)?;
        Ok(Node::from_json(tree)?)
    }
}

/// Apply `f` to every known node object in the tree, children first.
fn for_each_known(value: &mut Value, f: &mut impl FnMut(&str, &mut Map<String, Value>)) {
    let Value::Object(map) = value else {
        return;
    };
    if let Some(Value::Array(children)) = map.get_mut("children") {
        for child in children {
            for_each_known(child, f);
        }
    }
    let type_name = match map.get("type") {
        Some(Value::String(s)) => s.clone(),
        _ => return,
    };
    if is_known_type(&type_name) {
        f(&type_name, map);
    }
}

fn rename_key(map: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(v) = map.remove(from) {
        map.insert(to.to_string(), v);
    }
}

fn is_footnote(type_name: &str) -> bool {
    type_name == "footnoteReference" || type_name == "footnoteDefinition"
}

fn upgrade_1_to_2(tree: &mut Value) {
    for_each_known(tree, &mut |type_name, map| {
        if !is_footnote(type_name) {
            return;
        }
        if let Some(number) = map.remove("number") {
            let enumerator = match number {
                Value::Number(n) => Value::String(n.to_string()),
                other => other,
            };
            map.insert("enumerator".into(), enumerator);
        }
    });
}

fn downgrade_2_to_1(tree: &mut Value) {
    for_each_known(tree, &mut |type_name, map| {
        if !is_footnote(type_name) {
            return;
        }
        if let Some(enumerator) = map.remove("enumerator") {
            let number = match &enumerator {
                Value::String(s) => match s.parse::<u64>() {
                    Ok(n) if n.to_string() == *s => Value::from(n),
                    _ => enumerator,
                },
                _ => enumerator,
            };
            map.insert("number".into(), number);
        }
    });
}

fn upgrade_2_to_3(tree: &mut Value) {
    for_each_known(tree, &mut |_, map| rename_key(map, "numbered", "enumerated"));
}

fn downgrade_3_to_2(tree: &mut Value) {
    for_each_known(tree, &mut |_, map| rename_key(map, "enumerated", "numbered"));
}

fn upgrade_3_to_4(tree: &mut Value) {
    for_each_known(tree, &mut |type_name, map| {
        if type_name != "output" {
            return;
        }
        let Some(Value::Array(data)) = map.remove("data") else {
            return;
        };
        map.insert("type".into(), Value::String("outputs".into()));
        let children: Vec<Value> = data
            .into_iter()
            .map(|item| {
                let mut child = Map::new();
                child.insert("type".into(), Value::String("output".into()));
                child.insert("jupyter_data".into(), item);
                Value::Object(child)
            })
            .collect();
        if !children.is_empty() {
            map.insert("children".into(), Value::Array(children));
        }
    });
}

fn downgrade_4_to_3(tree: &mut Value) {
    for_each_known(tree, &mut |type_name, map| {
        if type_name != "outputs" {
            return;
        }
        let children = match map.remove("children") {
            Some(Value::Array(children)) => children,
            _ => Vec::new(),
        };
        let data: Vec<Value> = children
            .into_iter()
            .filter_map(|child| match child {
                Value::Object(mut c) => c.remove("jupyter_data"),
                _ => None,
            })
            .collect();
        map.insert("type".into(), Value::String("output".into()));
        map.insert("data".into(), Value::Array(data));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_plan() {
        let plan = Migrator::standard().plan(3, 3).unwrap();
        assert!(plan.is_identity());
        let tree = json!({"type": "root"});
        assert_eq!(migrate(tree.clone(), 3, 3).unwrap(), tree);
    }

    #[test]
    fn test_plan_composes_every_step() {
        let plan = Migrator::standard().plan(1, 4).unwrap();
        assert_eq!(
            plan.steps(),
            &[
                MigrationStep::up(1),
                MigrationStep::up(2),
                MigrationStep::up(3)
            ]
        );
        let plan = Migrator::standard().plan(4, 2).unwrap();
        assert_eq!(
            plan.steps(),
            &[MigrationStep::down(4), MigrationStep::down(3)]
        );
    }

    #[test]
    fn test_unknown_version_has_no_path() {
        let err = migrate(json!({"type": "root"}), 4, 7).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::NoMigrationPath { from: 4, to: 7 }
        ));
        let err = migrate(json!({"type": "root"}), 0, 2).unwrap_err();
        assert!(matches!(err, MigrationError::NoMigrationPath { .. }));
    }

    #[test]
    fn test_mixed_direction_rejected() {
        let err =
            MigrationPlan::new(vec![MigrationStep::up(2), MigrationStep::down(3)]).unwrap_err();
        assert!(matches!(err, MigrationError::MixedDirection));
    }

    #[test]
    fn test_non_contiguous_rejected() {
        let err =
            MigrationPlan::new(vec![MigrationStep::up(1), MigrationStep::up(3)]).unwrap_err();
        assert!(matches!(err, MigrationError::NonContiguous { .. }));
    }

    #[test]
    fn test_footnote_number_upgrade() {
        let tree = json!({"type": "root", "children": [
            {"type": "footnoteReference", "identifier": "a", "number": 1},
            {"type": "widget", "number": 5}
        ]});
        let up = migrate(tree, 1, 2).unwrap();
        assert_eq!(up["children"][0]["enumerator"], "1");
        assert!(up["children"][0].get("number").is_none());
        assert_eq!(up["children"][1]["number"], 5);
    }

    #[test]
    fn test_outputs_upgrade_and_downgrade() {
        let v3 = json!({"type": "block", "children": [
            {"type": "code", "value": "1+1", "executable": true},
            {"type": "output", "identifier": "out", "data": [
                {"output_type": "stream", "name": "stdout", "text": "2"}
            ]}
        ]});
        let v4 = migrate(v3.clone(), 3, 4).unwrap();
        let outputs = &v4["children"][1];
        assert_eq!(outputs["type"], "outputs");
        assert_eq!(outputs["identifier"], "out");
        assert_eq!(outputs["children"][0]["type"], "output");
        assert_eq!(outputs["children"][0]["jupyter_data"]["text"], "2");
        assert_eq!(migrate(v4, 4, 3).unwrap(), v3);
    }

    #[test]
    fn test_foreign_kind_attributes_untouched() {
        let tree = json!({"type": "widget", "numbered": true, "children": [
            {"type": "container", "kind": "figure", "numbered": true}
        ]});
        let up = migrate(tree, 2, 3).unwrap();
        assert_eq!(up["numbered"], true);
        assert_eq!(up["children"][0]["enumerated"], true);
    }

    #[test]
    fn test_versioned_tree_into_node() {
        let v1 = VersionedTree {
            version: 1,
            tree: json!({"type": "root", "children": [
                {"type": "footnoteDefinition", "identifier": "x", "number": 2, "numbered": true}
            ]}),
        };
        let node = v1.into_node().unwrap();
        assert_eq!(node.children[0].enumerator.as_deref(), Some("2"));
        assert_eq!(node.children[0].enumerated, Some(true));
    }

    #[test]
    fn test_versioned_tree_envelope_field_name() {
        let vt = VersionedTree::current(&Node::root(vec![])).unwrap();
        let value = serde_json::to_value(&vt).unwrap();
        assert_eq!(value["mystVersion"], CURRENT_VERSION);
        assert_eq!(value["tree"]["type"], "root");
    }
}
