//! Structural edits recorded during a walk and applied afterwards.

use std::fmt;

use thiserror::Error;
use tracing::trace;

use super::node::{slot, BlockNode, Node, NodeKind};

/// Child slots from the root to a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    pub fn child(&self, slot: usize) -> NodePath {
        let mut path = self.0.clone();
        path.push(slot);
        NodePath(path)
    }

    pub fn parent(&self) -> Option<NodePath> {
        let (_, parent) = self.0.split_last()?;
        Some(NodePath(parent.to_vec()))
    }

    pub fn is_ancestor_of(&self, other: &NodePath) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("/")?;
        for (i, slot) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{slot}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Replacement {
    /// Drop the node. What is left behind depends on the parent, see [`EditList::apply`].
    Remove,
    With(Node),
    /// Replace the node with one of its own children.
    WithChild(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    pub path: NodePath,
    pub replacement: Replacement,
}

#[derive(Debug, Error, PartialEq)]
pub enum EditError {
    #[error("no node at {path}")]
    InvalidPath { path: NodePath },
    #[error("cannot remove child {slot} of {parent} node at {path}")]
    NotRemovable {
        path: NodePath,
        parent: NodeKind,
        slot: usize,
    },
    #[error("{kind} node at {path} has no child {slot}")]
    MissingChild {
        path: NodePath,
        kind: NodeKind,
        slot: usize,
    },
    #[error("the root node cannot be removed")]
    RemoveRoot,
}

#[derive(Debug, Default, Clone)]
pub struct EditList {
    edits: Vec<Edit>,
}

impl EditList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: NodePath, replacement: Replacement) {
        self.edits.push(Edit { path, replacement });
    }

    pub fn remove(&mut self, path: NodePath) {
        self.push(path, Replacement::Remove);
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edit> {
        self.edits.iter()
    }

    pub fn extend(&mut self, other: EditList) {
        self.edits.extend(other.edits);
    }

    /// Whether applying the list would throw away the node at `path`, either directly or as
    /// part of an enclosing subtree.
    pub fn discards(&self, path: &NodePath) -> bool {
        self.edits.iter().any(|edit| match edit.replacement {
            Replacement::WithChild(kept) => {
                edit.path.is_ancestor_of(path) && path.0[edit.path.0.len()] != kept
            }
            Replacement::Remove | Replacement::With(_) => {
                edit.path == *path || edit.path.is_ancestor_of(path)
            }
        })
    }

    /// Applies every edit to `root`, deepest and right-most first so earlier paths stay valid.
    /// The first edit recorded for a path wins. Edits inside a subtree that another edit throws
    /// away are dropped.
    ///
    /// Removing a statement from a block, or a declarator from a declaration, deletes it from
    /// the list. Removing a loop's init, condition or expression clears that slot, and removing
    /// an `else` clears it. Removing a loop body, an `if` body or a function body leaves an empty
    /// block in its place. Anything else cannot be removed.
    pub fn apply(mut self, root: &mut Node) -> Result<usize, EditError> {
        // Stable sort keeps the first recorded edit first among equal paths.
        self.edits.sort_by(|a, b| b.path.cmp(&a.path));
        self.edits.dedup_by(|later, earlier| later.path == earlier.path);

        let discarded: Vec<(NodePath, Option<usize>)> = self
            .edits
            .iter()
            .map(|e| match e.replacement {
                Replacement::WithChild(kept) => (e.path.clone(), Some(kept)),
                _ => (e.path.clone(), None),
            })
            .collect();
        let is_discarded = |path: &NodePath| {
            discarded.iter().any(|(ancestor, kept)| {
                ancestor.is_ancestor_of(path) && *kept != Some(path.0[ancestor.0.len()])
            })
        };

        let mut applied = 0;
        for edit in self.edits {
            if is_discarded(&edit.path) {
                continue;
            }
            trace!(path = %edit.path, replacement = ?replacement_kind(&edit.replacement), "applying AST edit");
            apply_one(root, &edit.path, edit.replacement)?;
            applied += 1;
        }
        Ok(applied)
    }
}

fn replacement_kind(replacement: &Replacement) -> &'static str {
    match replacement {
        Replacement::Remove => "remove",
        Replacement::With(_) => "with",
        Replacement::WithChild(_) => "with_child",
    }
}

fn node_at<'n>(root: &'n mut Node, path: &[usize]) -> Option<&'n mut Node> {
    let mut node = root;
    for &slot in path {
        node = node.child_mut(slot)?;
    }
    Some(node)
}

fn apply_one(root: &mut Node, path: &NodePath, replacement: Replacement) -> Result<(), EditError> {
    let invalid = || EditError::InvalidPath { path: path.clone() };
    let Some((&last, parent_path)) = path.0.split_last() else {
        return match replacement {
            Replacement::Remove => Err(EditError::RemoveRoot),
            Replacement::With(node) => {
                *root = node;
                Ok(())
            }
            Replacement::WithChild(slot) => {
                let kind = root.kind();
                let taken = std::mem::replace(root, Node::Block(BlockNode::default()));
                *root = taken.into_child(slot).ok_or(EditError::MissingChild {
                    path: path.clone(),
                    kind,
                    slot,
                })?;
                Ok(())
            }
        };
    };
    let parent = node_at(root, parent_path).ok_or_else(invalid)?;

    match replacement {
        Replacement::With(node) => {
            *parent.child_mut(last).ok_or_else(invalid)? = node;
            Ok(())
        }
        Replacement::WithChild(slot) => {
            let target = parent.child_mut(last).ok_or_else(invalid)?;
            let kind = target.kind();
            let taken = std::mem::replace(target, Node::Block(BlockNode::default()));
            *target = taken.into_child(slot).ok_or(EditError::MissingChild {
                path: path.clone(),
                kind,
                slot,
            })?;
            Ok(())
        }
        Replacement::Remove => remove_child(parent, last).map_err(|parent_kind| {
            EditError::NotRemovable {
                path: path.clone(),
                parent: parent_kind,
                slot: last,
            }
        }),
    }
}

fn remove_child(parent: &mut Node, index: usize) -> Result<(), NodeKind> {
    let kind = parent.kind();
    let empty_block = || Box::new(Node::Block(BlockNode::default()));
    match parent {
        Node::Block(b) if index < b.statements.len() => {
            b.statements.remove(index);
        }
        Node::Declaration(d) if index < d.declarators.len() => {
            d.declarators.remove(index);
        }
        Node::Loop(l) => match index {
            slot::LOOP_INIT => l.init = None,
            slot::LOOP_CONDITION => l.condition = None,
            slot::LOOP_EXPRESSION => l.expression = None,
            slot::LOOP_BODY => l.body = empty_block(),
            _ => return Err(kind),
        },
        Node::IfElse(i) => match index {
            slot::IF_TRUE => i.true_block = empty_block(),
            slot::IF_FALSE => i.false_block = None,
            _ => return Err(kind),
        },
        Node::FunctionDefinition(f) if index == 0 => f.body = empty_block(),
        _ => return Err(kind),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::symbol::IdAllocator;
    use crate::types::{BasicType, Precision, Qualifier, Type};
    use pretty_assertions::assert_eq;

    fn float_var(ids: &mut IdAllocator, name: &str) -> std::sync::Arc<crate::symbol::Variable> {
        ids.new_variable(
            name,
            Type::new(BasicType::Float, Precision::High, Qualifier::Temporary, 1),
        )
    }

    #[test]
    fn removals_apply_back_to_front() {
        let mut ids = IdAllocator::default();
        let (a, b, c) = (
            float_var(&mut ids, "a"),
            float_var(&mut ids, "b"),
            float_var(&mut ids, "c"),
        );
        let mut tree = build::block(vec![
            build::assign(build::symbol(&a), build::float(1.0)),
            build::assign(build::symbol(&b), build::float(2.0)),
            build::assign(build::symbol(&c), build::float(3.0)),
        ]);
        let expected = build::block(vec![build::assign(build::symbol(&b), build::float(2.0))]);

        let mut edits = EditList::new();
        edits.remove(NodePath(vec![0]));
        edits.remove(NodePath(vec![2]));
        edits.remove(NodePath(vec![2]));
        assert_eq!(edits.apply(&mut tree), Ok(2));
        assert_eq!(tree, expected);
    }

    #[test]
    fn with_child_splices_comma_operand() {
        let mut ids = IdAllocator::default();
        let (a, b, c) = (
            float_var(&mut ids, "a"),
            float_var(&mut ids, "b"),
            float_var(&mut ids, "c"),
        );
        let keep = build::assign(build::symbol(&b), build::float(2.0));
        let mut tree = build::block(vec![build::comma(
            build::assign(build::symbol(&a), build::float(1.0)),
            build::comma(keep.clone(), build::assign(build::symbol(&c), build::float(3.0))),
        )]);
        let mut edits = EditList::new();
        edits.push(NodePath(vec![0]), Replacement::WithChild(1));
        edits.push(NodePath(vec![0, 1]), Replacement::WithChild(0));
        // Inside the operand being dropped.
        edits.remove(NodePath(vec![0, 0, 1]));

        assert!(edits.discards(&NodePath(vec![0, 0, 0])));
        assert!(edits.discards(&NodePath(vec![0, 1, 1, 0])));
        assert!(!edits.discards(&NodePath(vec![0, 1, 0, 0])));
        assert!(!edits.discards(&NodePath(vec![0])));

        assert_eq!(edits.apply(&mut tree), Ok(2));
        assert_eq!(tree, build::block(vec![keep]));
    }

    #[test]
    fn loop_slots_are_cleared_not_removed() {
        let mut ids = IdAllocator::default();
        let i = float_var(&mut ids, "i");
        let mut tree = build::for_loop(
            Some(build::assign(build::symbol(&i), build::float(0.0))),
            None,
            None,
            build::block(vec![build::break_()]),
        );
        let mut edits = EditList::new();
        edits.remove(NodePath(vec![slot::LOOP_INIT]));
        edits.remove(NodePath(vec![slot::LOOP_BODY]));
        assert_eq!(edits.apply(&mut tree), Ok(2));
        let Node::Loop(l) = &tree else {
            panic!("expected loop");
        };
        assert!(l.init.is_none());
        assert_eq!(*l.body, build::block(vec![]));
    }

    #[test]
    fn binary_operands_cannot_be_removed() {
        let mut ids = IdAllocator::default();
        let a = float_var(&mut ids, "a");
        let mut tree = build::block(vec![build::assign(build::symbol(&a), build::float(1.0))]);
        let mut edits = EditList::new();
        edits.remove(NodePath(vec![0, 1]));
        assert!(matches!(
            edits.apply(&mut tree),
            Err(EditError::NotRemovable {
                parent: NodeKind::Binary,
                ..
            })
        ));
    }
}
