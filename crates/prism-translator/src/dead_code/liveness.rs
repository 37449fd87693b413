//! Dependency analysis of one function body.
//!
//! Every write records the variables and callees the written value was computed from, plus
//! the reads of every enclosing `if`, `switch` and loop condition. Writes inside a loop body are
//! collected so that a `break` or `continue` can make them depend on the conditions guarding
//! the early exit. The live set is everything reachable from the function's outputs.

use std::mem;

use hashbrown::{HashMap, HashSet};
use tracing::trace;

use crate::ast::*;
use crate::operator::Operator;
use crate::symbol::SymbolId;
use crate::types::Qualifier;

use super::{is_index, output_kind, written_variable, DeadCodeError, Output};

type Reads = HashSet<SymbolId>;

/// Result of analysing one function.
#[derive(Debug, Default)]
pub(super) struct FunctionLiveness {
    pub live: HashSet<SymbolId>,
    /// Writes something other functions or the pipeline can observe, or discards.
    pub has_side_effects: bool,
}

#[derive(Debug)]
struct Condition {
    reads: Reads,
    is_loop: bool,
}

struct Analysis<'s> {
    function: SymbolId,
    side_effects: &'s HashMap<SymbolId, bool>,
    dependencies: HashMap<SymbolId, Reads>,
    outputs: HashSet<SymbolId>,
    implicit_outputs: HashSet<SymbolId>,
    /// Reads of the condition of the loop whose body is about to be entered.
    loop_condition: Reads,
    conditions: Vec<Condition>,
    /// One entry per open `if`/`switch`: whether its condition moved into `conditions` yet.
    selections: Vec<bool>,
    loop_writes: Vec<HashSet<SymbolId>>,
    /// Reads collected for each value currently being computed.
    expressions: Vec<Reads>,
    loop_depth: usize,
    error: Option<DeadCodeError>,
}

pub(super) fn analyse(
    function: SymbolId,
    definition: &Node,
    at: &NodePath,
    side_effects: &HashMap<SymbolId, bool>,
) -> Result<FunctionLiveness, DeadCodeError> {
    let mut analysis = Analysis {
        function,
        side_effects,
        dependencies: HashMap::new(),
        outputs: HashSet::new(),
        implicit_outputs: HashSet::new(),
        loop_condition: Reads::new(),
        conditions: Vec::new(),
        selections: Vec::new(),
        loop_writes: Vec::new(),
        expressions: Vec::new(),
        loop_depth: 0,
        error: None,
    };
    Walker::at(at.clone()).walk(&mut analysis, definition);
    if let Some(err) = analysis.error {
        return Err(err);
    }

    let live = analysis.live_set();
    trace!(
        function = %function,
        outputs = analysis.outputs.len(),
        live = live.len(),
        "function liveness"
    );
    Ok(FunctionLiveness {
        live,
        has_side_effects: !analysis.implicit_outputs.is_empty(),
    })
}

impl Analysis<'_> {
    fn live_set(&self) -> HashSet<SymbolId> {
        let mut live = HashSet::new();
        let mut stack: Vec<SymbolId> = self.outputs.iter().copied().collect();
        while let Some(id) = stack.pop() {
            if !live.insert(id) {
                continue;
            }
            if let Some(deps) = self.dependencies.get(&id) {
                stack.extend(deps.iter().copied().filter(|d| !live.contains(d)));
            }
        }
        live
    }

    fn fail(&mut self, err: DeadCodeError) -> bool {
        if self.error.is_none() {
            self.error = Some(err);
        }
        false
    }

    fn record_write(&mut self, id: SymbolId, reads: &Reads, output: Output) {
        let deps = self.dependencies.entry(id).or_default();
        deps.extend(reads.iter().copied());
        for condition in &self.conditions {
            deps.extend(condition.reads.iter().copied());
        }
        for writes in &mut self.loop_writes {
            writes.insert(id);
        }
        match output {
            Output::Local => {}
            Output::Caller => {
                self.outputs.insert(id);
            }
            Output::Implicit => {
                self.outputs.insert(id);
                self.implicit_outputs.insert(id);
            }
        }
    }

    fn record_read(&mut self, id: SymbolId) {
        for reads in &mut self.expressions {
            reads.insert(id);
        }
    }

    /// Opens or closes the read set of a loop condition when `walker` is at one.
    fn loop_condition_boundary(&mut self, walker: &Walker<'_>, visit: Visit) {
        if self.loop_depth == 0 {
            return;
        }
        let Some((Node::Loop(_), slot::LOOP_CONDITION)) = walker.ancestors().next_back() else {
            return;
        };
        match visit {
            Visit::Pre => self.expressions.push(Reads::new()),
            Visit::Post => self.loop_condition = self.expressions.pop().unwrap_or_default(),
            Visit::In => {}
        }
    }

    fn open_selection(&mut self) {
        self.expressions.push(Reads::new());
        self.selections.push(false);
    }

    fn selection_condition_done(&mut self) {
        let Some(moved) = self.selections.last_mut() else {
            return;
        };
        if !*moved {
            *moved = true;
            let reads = self.expressions.pop().unwrap_or_default();
            self.conditions.push(Condition {
                reads,
                is_loop: false,
            });
        }
    }

    fn close_selection(&mut self) {
        match self.selections.pop() {
            Some(true) => {
                self.conditions.pop();
            }
            Some(false) => {
                self.expressions.pop();
            }
            None => {}
        }
    }
}

/// Whether the value of the symbol being visited is consumed, as opposed to being written or
/// thrown away as the left operand of a comma.
fn is_read(walker: &Walker<'_>) -> bool {
    let mut ancestors = walker.ancestors().rev();

    // Skip selections of the symbol: `v.xy`, `a[i]`, `s.field`.
    let mut consumer = ancestors.next();
    while let Some((node, slot)) = consumer {
        match node {
            Node::Swizzle(_) => {}
            Node::Binary(b) if slot == 0 && is_index(b.op) => {}
            _ => break,
        }
        consumer = ancestors.next();
    }
    match consumer {
        Some((Node::Binary(b), 0)) if matches!(b.op, Operator::Assign | Operator::Initialize) => {
            return false;
        }
        Some((Node::Aggregate(call), slot)) if call.is_call() => {
            let write_only = call
                .function
                .as_ref()
                .and_then(|f| f.params.get(slot))
                .is_some_and(|p| p.ty.qualifier == Qualifier::Out);
            return !write_only;
        }
        _ => {}
    }

    // Follow the value up through pure operators.
    while let Some((node, slot)) = consumer {
        match node {
            Node::Binary(b) if b.op == Operator::Comma => {
                if slot == 0 {
                    return false;
                }
            }
            Node::Binary(b) if !b.op.is_assignment() => {}
            Node::Unary(u) if !u.op.is_increment_or_decrement() => {}
            Node::Aggregate(a) if !a.is_call() => {}
            Node::Swizzle(_) | Node::Ternary(_) => {}
            _ => return true,
        }
        consumer = ancestors.next();
    }
    true
}

fn parent_is_loop_body(walker: &Walker<'_>) -> bool {
    matches!(
        walker.ancestors().next_back(),
        Some((Node::Loop(_), slot::LOOP_BODY))
    )
}

impl<'a> Visitor<'a> for Analysis<'_> {
    fn visit_symbol(&mut self, walker: &mut Walker<'a>, node: &'a SymbolNode) {
        self.loop_condition_boundary(walker, Visit::Pre);
        if !self.expressions.is_empty() && is_read(walker) {
            self.record_read(node.variable.id);
        }
        self.loop_condition_boundary(walker, Visit::Post);
    }

    fn visit_binary(&mut self, walker: &mut Walker<'a>, visit: Visit, node: &'a BinaryNode) -> bool {
        if self.error.is_some() {
            return false;
        }
        match visit {
            Visit::Pre => {
                self.loop_condition_boundary(walker, visit);
                if node.op.is_assignment() {
                    self.expressions.push(Reads::new());
                }
            }
            Visit::In => {}
            Visit::Post => {
                if node.op.is_assignment() {
                    let reads = self.expressions.pop().unwrap_or_default();
                    match written_variable(&node.left) {
                        Ok(target) => {
                            let output = output_kind(target.ty.qualifier);
                            self.record_write(target.id, &reads, output);
                        }
                        Err(err) => return self.fail(err),
                    }
                }
                self.loop_condition_boundary(walker, visit);
            }
        }
        true
    }

    fn visit_unary(&mut self, walker: &mut Walker<'a>, visit: Visit, node: &'a UnaryNode) -> bool {
        if self.error.is_some() {
            return false;
        }
        if visit == Visit::Post && node.op.is_increment_or_decrement() {
            match written_variable(&node.operand) {
                Ok(target) => {
                    let output = output_kind(target.ty.qualifier);
                    self.record_write(target.id, &Reads::new(), output);
                }
                Err(err) => return self.fail(err),
            }
        }
        self.loop_condition_boundary(walker, visit);
        true
    }

    fn visit_ternary(
        &mut self,
        walker: &mut Walker<'a>,
        visit: Visit,
        _node: &'a TernaryNode,
    ) -> bool {
        self.loop_condition_boundary(walker, visit);
        self.error.is_none()
    }

    fn visit_swizzle(
        &mut self,
        walker: &mut Walker<'a>,
        visit: Visit,
        _node: &'a SwizzleNode,
    ) -> bool {
        self.loop_condition_boundary(walker, visit);
        self.error.is_none()
    }

    fn visit_aggregate(
        &mut self,
        walker: &mut Walker<'a>,
        visit: Visit,
        node: &'a AggregateNode,
    ) -> bool {
        if self.error.is_some() {
            return false;
        }
        if !node.is_call() {
            self.loop_condition_boundary(walker, visit);
            return true;
        }
        let Some(function) = &node.function else {
            return self.fail(DeadCodeError::UnexpectedNode {
                kind: NodeKind::Aggregate,
            });
        };
        match visit {
            Visit::Pre => {
                self.loop_condition_boundary(walker, visit);
                self.record_read(function.id);
                self.expressions.push(Reads::new());
            }
            Visit::In => {}
            Visit::Post => {
                let reads = self.expressions.pop().unwrap_or_default();
                let mut writes = Vec::new();
                for (index, arg) in node.args.iter().enumerate() {
                    if !function.param_is_out(index) {
                        continue;
                    }
                    match written_variable(arg) {
                        Ok(target) => writes.push((target.id, output_kind(target.ty.qualifier))),
                        Err(err) => return self.fail(err),
                    }
                }
                if self.side_effects.get(&function.id).copied().unwrap_or(false) {
                    writes.push((self.function, Output::Implicit));
                }
                for (id, output) in writes {
                    self.record_write(id, &reads, output);
                }
                self.loop_condition_boundary(walker, visit);
            }
        }
        true
    }

    fn visit_if_else(&mut self, _walker: &mut Walker<'a>, visit: Visit, _node: &'a IfElseNode) -> bool {
        match visit {
            Visit::Pre => self.open_selection(),
            Visit::In => self.selection_condition_done(),
            Visit::Post => self.close_selection(),
        }
        self.error.is_none()
    }

    fn visit_switch(&mut self, _walker: &mut Walker<'a>, visit: Visit, _node: &'a SwitchNode) -> bool {
        match visit {
            Visit::Pre => self.open_selection(),
            Visit::In => self.selection_condition_done(),
            Visit::Post => self.close_selection(),
        }
        self.error.is_none()
    }

    fn visit_loop(&mut self, _walker: &mut Walker<'a>, visit: Visit, node: &'a LoopNode) -> bool {
        match visit {
            Visit::Pre => {
                if !matches!(*node.body, Node::Block(_)) {
                    return self.fail(DeadCodeError::UnexpectedNode {
                        kind: node.body.kind(),
                    });
                }
                self.loop_depth += 1;
            }
            Visit::In => {}
            Visit::Post => self.loop_depth -= 1,
        }
        self.error.is_none()
    }

    fn visit_block(&mut self, walker: &mut Walker<'a>, visit: Visit, _node: &'a BlockNode) -> bool {
        if !parent_is_loop_body(walker) {
            return self.error.is_none();
        }
        match visit {
            Visit::Pre => {
                self.conditions.push(Condition {
                    reads: mem::take(&mut self.loop_condition),
                    is_loop: true,
                });
                self.loop_writes.push(HashSet::new());
            }
            Visit::In => {}
            Visit::Post => {
                self.loop_writes.pop();
                self.conditions.pop();
            }
        }
        self.error.is_none()
    }

    fn visit_branch(&mut self, walker: &mut Walker<'a>, visit: Visit, node: &'a BranchNode) -> bool {
        if self.error.is_some() {
            return false;
        }
        match (visit, node.op) {
            (Visit::Pre, BranchOp::Return) if node.expression.is_some() => {
                self.expressions.push(Reads::new());
            }
            (Visit::Post, BranchOp::Return) => {
                let reads = if node.expression.is_some() {
                    self.expressions.pop().unwrap_or_default()
                } else {
                    Reads::new()
                };
                self.record_write(self.function, &reads, Output::Caller);
            }
            (Visit::Post, BranchOp::Kill) => {
                self.record_write(self.function, &Reads::new(), Output::Implicit);
            }
            (Visit::Post, BranchOp::Break | BranchOp::Continue) => {
                let escapes = walker
                    .ancestors()
                    .any(|(n, _)| matches!(n, Node::Loop(_) | Node::Switch(_)));
                if !escapes {
                    return self.fail(DeadCodeError::BranchOutsideLoop);
                }
                // Conditions guarding the exit, up to the innermost loop.
                let mut guard = Reads::new();
                for condition in self.conditions.iter_mut().rev() {
                    condition.reads.extend(guard.iter().copied());
                    if condition.is_loop {
                        break;
                    }
                    guard.extend(condition.reads.iter().copied());
                }
                if let Some(writes) = self.loop_writes.last() {
                    for id in writes {
                        self.dependencies
                            .entry(*id)
                            .or_default()
                            .extend(guard.iter().copied());
                    }
                }
            }
            _ => {}
        }
        true
    }
}
