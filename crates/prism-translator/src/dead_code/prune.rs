//! Second walk over a function: records removals for everything that did not turn out active.
//!
//! A node is active when something inside it writes a live variable, calls a function with side
//! effects, returns or discards. `break` and `continue` keep everything up to their loop.

use hashbrown::{HashMap, HashSet};
use tracing::trace;

use crate::ast::*;
use crate::operator::Operator;
use crate::symbol::SymbolId;

use super::liveness::FunctionLiveness;
use super::{written_variable, DeadCodeError};

struct Frame {
    active: bool,
    is_loop: bool,
}

/// `T x = init;` whose variable is dead. Dropped once the walk is over, unless a kept statement
/// still names `x`; then only the initializer goes.
struct DeadDeclarator {
    variable: SymbolId,
    path: NodePath,
    /// The declarator itself, or the whole declaration when it is the only declarator.
    removal: Option<NodePath>,
}

struct Prune<'s> {
    live: &'s HashSet<SymbolId>,
    side_effects: &'s HashMap<SymbolId, bool>,
    frames: Vec<Frame>,
    /// Comma expressions to replace by the operand in the given slot, once both are visited.
    pending: Vec<(NodePath, usize)>,
    references: Vec<(SymbolId, NodePath)>,
    dead_declarators: Vec<DeadDeclarator>,
    edits: EditList,
    error: Option<DeadCodeError>,
}

pub(super) fn collect(
    definition: &Node,
    at: NodePath,
    facts: &FunctionLiveness,
    side_effects: &HashMap<SymbolId, bool>,
) -> Result<EditList, DeadCodeError> {
    let mut prune = Prune {
        live: &facts.live,
        side_effects,
        frames: Vec::new(),
        pending: Vec::new(),
        references: Vec::new(),
        dead_declarators: Vec::new(),
        edits: EditList::new(),
        error: None,
    };
    Walker::at(at).walk(&mut prune, definition);
    match prune.error {
        Some(err) => Err(err),
        None => Ok(prune.finish()),
    }
}

/// Whether a statement in `slot` of `parent` can go away without leaving a hole.
fn is_statement_slot(parent: &Node, slot: usize) -> bool {
    match parent {
        Node::Block(_) => true,
        Node::Loop(_) => slot != slot::LOOP_CONDITION,
        Node::Binary(b) => b.op == Operator::Comma,
        _ => false,
    }
}

impl Prune<'_> {
    fn enter(&mut self, is_loop: bool) {
        self.frames.push(Frame {
            active: false,
            is_loop,
        });
    }

    /// Closes the current frame and removes the node if nothing kept it.
    fn leave(&mut self, walker: &Walker<'_>, is_assign: bool) {
        if let Some(frame) = self.frames.pop() {
            if !frame.active {
                self.try_remove(walker, is_assign);
            }
        }
    }

    fn activate_all(&mut self) {
        for frame in &mut self.frames {
            frame.active = true;
        }
    }

    fn activate_to_loop(&mut self) {
        for frame in self.frames.iter_mut().rev() {
            if frame.is_loop {
                break;
            }
            frame.active = true;
        }
    }

    fn is_live_target(&mut self, lvalue: &Node) -> bool {
        match written_variable(lvalue) {
            Ok(target) => self.live.contains(&target.id),
            Err(err) => {
                self.error.get_or_insert(err);
                false
            }
        }
    }

    fn try_remove(&mut self, walker: &Walker<'_>, is_assign: bool) {
        let path = walker.path();
        let mut ancestors = walker.ancestors().rev();
        let Some((parent, slot)) = ancestors.next() else {
            return;
        };
        match parent {
            Node::Binary(b) if b.op == Operator::Comma => {
                let Some(comma) = path.parent() else {
                    return;
                };
                if slot == 0 {
                    self.pending.push((comma, 1));
                } else if ancestors
                    .next()
                    .is_some_and(|(grandparent, s)| is_statement_slot(grandparent, s))
                {
                    // Both operands dead: the comma itself goes instead.
                    match self.pending.iter().position(|(p, _)| *p == comma) {
                        Some(i) => {
                            self.pending.remove(i);
                        }
                        None => self.pending.push((comma, 0)),
                    }
                }
            }
            Node::Block(_) | Node::Loop(_) if is_statement_slot(parent, slot) => {
                self.edits.remove(path);
            }
            _ if is_assign => self.edits.push(path, Replacement::WithChild(1)),
            _ => {}
        }
    }

    /// Dead `T x = init;`: queues the declarator, or the whole declaration if it is the only one.
    fn remove_declarator(&mut self, walker: &Walker<'_>, declarator: &BinaryNode) {
        let Some(variable) = declarator.left.as_symbol().map(|s| s.variable.id) else {
            self.error.get_or_insert(DeadCodeError::UnexpectedNode {
                kind: declarator.left.kind(),
            });
            return;
        };
        let path = walker.path();
        let mut ancestors = walker.ancestors().rev();
        let Some((Node::Declaration(declaration), _)) = ancestors.next() else {
            return;
        };
        let removal = if declaration.declarators.len() > 1 {
            Some(path.clone())
        } else {
            match (ancestors.next().map(|(n, _)| n), path.parent()) {
                (Some(Node::Block(_) | Node::Loop(_)), Some(parent)) => Some(parent),
                _ => None,
            }
        };
        self.dead_declarators.push(DeadDeclarator {
            variable,
            path,
            removal,
        });
    }

    /// Settles the queued declarators against the references that survive the other edits.
    fn finish(mut self) -> EditList {
        let dead_declarators = std::mem::take(&mut self.dead_declarators);
        for dead in &dead_declarators {
            let still_named = self.references.iter().any(|(id, at)| {
                *id == dead.variable
                    && !self.edits.discards(at)
                    && !dead_declarators
                        .iter()
                        .any(|d| d.path == *at || d.path.is_ancestor_of(at))
            });
            if still_named {
                trace!(path = %dead.path, "dead variable still named, dropping its initializer");
                self.edits.push(dead.path.clone(), Replacement::WithChild(0));
            } else if let Some(removal) = &dead.removal {
                self.edits.remove(removal.clone());
            }
        }
        self.edits
    }
}

impl<'a> Visitor<'a> for Prune<'_> {
    fn visit_symbol(&mut self, walker: &mut Walker<'a>, node: &'a SymbolNode) {
        self.references.push((node.variable.id, walker.path()));
        self.try_remove(walker, false);
    }

    fn visit_constant(&mut self, walker: &mut Walker<'a>, _node: &'a ConstantNode) {
        self.try_remove(walker, false);
    }

    fn visit_binary(&mut self, walker: &mut Walker<'a>, visit: Visit, node: &'a BinaryNode) -> bool {
        match visit {
            Visit::Pre => {
                self.enter(false);
                if node.op.is_assignment() && self.is_live_target(&node.left) {
                    self.activate_all();
                }
            }
            Visit::In => {}
            Visit::Post => {
                if node.op == Operator::Comma {
                    for (comma, keep) in self.pending.drain(..) {
                        self.edits.push(comma, Replacement::WithChild(keep));
                    }
                }
                let in_declaration = matches!(walker.parent(), Some(Node::Declaration(_)));
                match self.frames.pop() {
                    Some(frame) if !frame.active && in_declaration => {
                        self.remove_declarator(walker, node)
                    }
                    Some(frame) if !frame.active => {
                        self.try_remove(walker, node.op == Operator::Assign)
                    }
                    _ => {}
                }
            }
        }
        self.error.is_none()
    }

    fn visit_unary(&mut self, walker: &mut Walker<'a>, visit: Visit, node: &'a UnaryNode) -> bool {
        match visit {
            Visit::Pre => {
                self.enter(false);
                if node.op.is_increment_or_decrement() && self.is_live_target(&node.operand) {
                    self.activate_all();
                }
            }
            Visit::In => {}
            Visit::Post => self.leave(walker, false),
        }
        self.error.is_none()
    }

    fn visit_aggregate(
        &mut self,
        walker: &mut Walker<'a>,
        visit: Visit,
        node: &'a AggregateNode,
    ) -> bool {
        match visit {
            Visit::Pre => {
                self.enter(false);
                if let (true, Some(function)) = (node.is_call(), &node.function) {
                    let keep = self.side_effects.get(&function.id).copied().unwrap_or(false)
                        || node
                            .args
                            .iter()
                            .enumerate()
                            .filter(|(i, _)| function.param_is_out(*i))
                            .any(|(_, arg)| self.is_live_target(arg));
                    if keep {
                        self.activate_all();
                    }
                }
            }
            Visit::In => {}
            Visit::Post => self.leave(walker, false),
        }
        self.error.is_none()
    }

    fn visit_ternary(
        &mut self,
        walker: &mut Walker<'a>,
        visit: Visit,
        _node: &'a TernaryNode,
    ) -> bool {
        match visit {
            Visit::Pre => self.enter(false),
            Visit::In => {}
            Visit::Post => self.leave(walker, false),
        }
        true
    }

    fn visit_swizzle(
        &mut self,
        walker: &mut Walker<'a>,
        visit: Visit,
        _node: &'a SwizzleNode,
    ) -> bool {
        match visit {
            Visit::Pre => self.enter(false),
            Visit::In => {}
            Visit::Post => self.leave(walker, false),
        }
        true
    }

    fn visit_block(&mut self, walker: &mut Walker<'a>, visit: Visit, _node: &'a BlockNode) -> bool {
        match visit {
            Visit::Pre => self.enter(false),
            Visit::In => {}
            Visit::Post => self.leave(walker, false),
        }
        self.error.is_none()
    }

    fn visit_if_else(&mut self, walker: &mut Walker<'a>, visit: Visit, _node: &'a IfElseNode) -> bool {
        match visit {
            Visit::Pre => self.enter(false),
            Visit::In => {}
            Visit::Post => self.leave(walker, false),
        }
        self.error.is_none()
    }

    fn visit_switch(&mut self, walker: &mut Walker<'a>, visit: Visit, _node: &'a SwitchNode) -> bool {
        match visit {
            Visit::Pre => self.enter(false),
            Visit::In => {}
            Visit::Post => self.leave(walker, false),
        }
        self.error.is_none()
    }

    fn visit_loop(&mut self, walker: &mut Walker<'a>, visit: Visit, _node: &'a LoopNode) -> bool {
        match visit {
            Visit::Pre => self.enter(true),
            Visit::In => {}
            Visit::Post => self.leave(walker, false),
        }
        self.error.is_none()
    }

    fn visit_branch(&mut self, _walker: &mut Walker<'a>, visit: Visit, node: &'a BranchNode) -> bool {
        let has_value = node.expression.is_some();
        match visit {
            Visit::Pre => {
                if has_value {
                    self.enter(false);
                }
                match node.op {
                    BranchOp::Return | BranchOp::Kill => self.activate_all(),
                    BranchOp::Break | BranchOp::Continue => self.activate_to_loop(),
                }
            }
            Visit::In => {}
            Visit::Post => {
                if has_value {
                    self.frames.pop();
                }
            }
        }
        true
    }
}
