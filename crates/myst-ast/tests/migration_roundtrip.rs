/*
 * migration_roundtrip.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Property tests: migrating down and back up restores the tree.
 */

use myst_ast::{CURRENT_VERSION, MIN_VERSION, Node, NodeKind, migrate};
use proptest::prelude::*;
use serde_json::json;

fn leaf() -> impl Strategy<Value = Node> {
    prop_oneof![
        "[a-z ]{0,8}".prop_map(Node::text),
        "[a-z]{1,6}".prop_map(|v| Node::new(NodeKind::InlineMath { value: v })),
        ("[a-z]{1,4}", "[0-9a-z]{1,3}").prop_map(|(id, en)| {
            let mut n = Node::new(NodeKind::FootnoteReference);
            n.identifier = Some(id);
            n.enumerator = Some(en);
            n
        }),
        prop::collection::vec("[a-z]{1,5}", 0..3).prop_map(|texts| {
            let children = texts
                .into_iter()
                .map(|t| {
                    Node::new(NodeKind::Output {
                        jupyter_data: json!({"output_type": "stream", "name": "stdout", "text": t}),
                    })
                })
                .collect();
            Node::with_children(NodeKind::Outputs, children)
        }),
        "[a-z]{1,6}".prop_map(|t| {
            let mut data = serde_json::Map::new();
            data.insert("numbered".into(), json!(true));
            data.insert("note".into(), json!(t));
            Node::new(NodeKind::Opaque {
                type_name: "widget".into(),
                data,
            })
        }),
    ]
}

fn tree() -> impl Strategy<Value = Node> {
    leaf().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Node::paragraph),
            (prop::collection::vec(inner.clone(), 0..4), any::<bool>()).prop_map(
                |(children, enumerated)| {
                    let mut n = Node::with_children(
                        NodeKind::Container {
                            kind: myst_ast::ContainerKind::Figure,
                            class: None,
                        },
                        children,
                    );
                    n.enumerated = Some(enumerated);
                    n
                }
            ),
            (prop::collection::vec(inner, 0..3), "[a-z]{1,4}").prop_map(|(children, id)| {
                let mut n = Node::with_children(NodeKind::FootnoteDefinition, children);
                n.identifier = Some(id);
                n.enumerator = Some("1".into());
                n.enumerated = Some(true);
                n
            }),
        ]
    })
}

proptest! {
    #[test]
    fn down_then_up_is_identity(node in tree(), target in MIN_VERSION..=CURRENT_VERSION) {
        let original = Node::root(vec![node]).to_json().unwrap();
        let down = migrate(original.clone(), CURRENT_VERSION, target).unwrap();
        let back = migrate(down, target, CURRENT_VERSION).unwrap();
        prop_assert_eq!(back, original);
    }

    #[test]
    fn every_version_pair_round_trips(
        node in tree(),
        v in MIN_VERSION..=CURRENT_VERSION,
        w in MIN_VERSION..=CURRENT_VERSION,
    ) {
        let current = Node::root(vec![node]).to_json().unwrap();
        let at_v = migrate(current, CURRENT_VERSION, v).unwrap();
        let at_w = migrate(at_v.clone(), v, w).unwrap();
        prop_assert_eq!(migrate(at_w, w, v).unwrap(), at_v);
    }

    #[test]
    fn current_trees_survive_node_round_trip(node in tree()) {
        let root = Node::root(vec![node]);
        let back = Node::from_json(root.to_json().unwrap()).unwrap();
        prop_assert_eq!(back, root);
    }
}
