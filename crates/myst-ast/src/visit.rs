/*
 * visit.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Tree traversal helpers.
 */

//! Traversal in document order.
//!
//! All walkers are pre-order and depth-first, so "first seen" always means
//! first in reading order.

use crate::node::Node;

/// Visit every node of the subtree, parents before children.
pub fn walk<'a>(node: &'a Node, f: &mut impl FnMut(&'a Node)) {
    f(node);
    for child in &node.children {
        walk(child, f);
    }
}

/// Visit every node mutably, parents before children.
pub fn walk_mut(node: &mut Node, f: &mut impl FnMut(&mut Node)) {
    f(node);
    for child in &mut node.children {
        walk_mut(child, f);
    }
}

/// Visit every node together with the chain of its ancestors' kinds.
pub fn walk_with_ancestors<'a>(
    node: &'a Node,
    f: &mut impl FnMut(&'a Node, &[&'a Node]),
) {
    let mut stack = Vec::new();
    walk_ancestors_inner(node, &mut stack, f);
}

fn walk_ancestors_inner<'a>(
    node: &'a Node,
    stack: &mut Vec<&'a Node>,
    f: &mut impl FnMut(&'a Node, &[&'a Node]),
) {
    f(node, stack);
    stack.push(node);
    for child in &node.children {
        walk_ancestors_inner(child, stack, f);
    }
    stack.pop();
}

/// Collect references to every node matching `pred`, in document order.
pub fn select<'a>(node: &'a Node, pred: impl Fn(&Node) -> bool) -> Vec<&'a Node> {
    let mut out = Vec::new();
    walk(node, &mut |n| {
        if pred(n) {
            out.push(n);
        }
    });
    out
}

/// Rewrite the tree bottom-up, replacing each non-root node by zero or more
/// nodes.
///
/// Children are processed before their parent is offered to `f`, so `f`
/// sees already-rewritten subtrees. Returning `vec![node]` keeps a node.
pub fn splice(node: &mut Node, f: &mut impl FnMut(Node) -> Vec<Node>) {
    let children = std::mem::take(&mut node.children);
    let mut out = Vec::with_capacity(children.len());
    for mut child in children {
        splice(&mut child, f);
        out.extend(f(child));
    }
    node.children = out;
}

/// Like [`walk_mut`] but stops descending into a node when `f` returns
/// `false` for it.
pub fn walk_mut_until(node: &mut Node, f: &mut impl FnMut(&mut Node) -> bool) {
    if f(node) {
        for child in &mut node.children {
            walk_mut_until(child, f);
        }
    }
}
