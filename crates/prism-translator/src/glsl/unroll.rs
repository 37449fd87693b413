//! Iteration space of `for` loops that follow the GLSL ES 1.00 Appendix A form
//! `for (int i = a; i <op> b; i += c)`.

use std::sync::Arc;

use crate::ast::{LoopKind, LoopNode, Node};
use crate::constant::ConstantUnion;
use crate::operator::Operator;
use crate::symbol::Variable;
use crate::types::BasicType;

use super::CodegenError;

/// Upper bound on the number of times an unrolled body is repeated.
pub const MAX_UNROLLED_ITERATIONS: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct LoopIndex {
    pub variable: Arc<Variable>,
    pub start: i32,
    pub limit: i32,
    pub step: i32,
    /// Comparison of the index against `limit` in the loop condition.
    pub comparison: Operator,
}

fn unrollable(reason: &str) -> CodegenError {
    CodegenError::UnrollableLoop {
        reason: reason.to_owned(),
    }
}

fn int_constant(node: &Node) -> Option<i32> {
    let constant = node.as_constant()?;
    match constant.values.as_slice() {
        [ConstantUnion::Int(v)] => Some(*v),
        _ => None,
    }
}

impl LoopIndex {
    pub fn analyse(node: &LoopNode) -> Result<Self, CodegenError> {
        if node.kind != LoopKind::For {
            return Err(unrollable("not a for loop"));
        }

        let Some(Node::Declaration(init)) = node.init.as_deref() else {
            return Err(unrollable("init is not a declaration"));
        };
        let [Node::Binary(first)] = init.declarators.as_slice() else {
            return Err(unrollable("init must declare exactly one initialized index"));
        };
        let Some(index) = first.left.as_symbol() else {
            return Err(unrollable("init does not declare a variable"));
        };
        let variable = Arc::clone(&index.variable);
        if first.op != Operator::Initialize
            || variable.ty.basic != BasicType::Int
            || !variable.ty.is_scalar()
        {
            return Err(unrollable("index is not a scalar int"));
        }
        let start = int_constant(&first.right).ok_or_else(|| unrollable("index start is not constant"))?;

        let is_index = |n: &Node| n.as_symbol().is_some_and(|s| s.variable.id == variable.id);

        let Some(Node::Binary(condition)) = node.condition.as_deref() else {
            return Err(unrollable("condition is not a comparison"));
        };
        if !condition.op.is_comparison() || !is_index(&condition.left) {
            return Err(unrollable("condition does not compare the index"));
        }
        let limit =
            int_constant(&condition.right).ok_or_else(|| unrollable("loop limit is not constant"))?;

        let step = match node.expression.as_deref() {
            Some(Node::Unary(u)) if is_index(&u.operand) => match u.op {
                Operator::PostIncrement | Operator::PreIncrement => 1,
                Operator::PostDecrement | Operator::PreDecrement => -1,
                _ => return Err(unrollable("unsupported index update")),
            },
            Some(Node::Binary(b)) if is_index(&b.left) => {
                let amount =
                    int_constant(&b.right).ok_or_else(|| unrollable("index step is not constant"))?;
                match b.op {
                    Operator::AddAssign => amount,
                    Operator::SubAssign => amount.checked_neg().ok_or_else(|| unrollable("index step overflows"))?,
                    _ => return Err(unrollable("unsupported index update")),
                }
            }
            _ => return Err(unrollable("loop expression does not update the index")),
        };

        Ok(Self {
            variable,
            start,
            limit,
            step,
            comparison: condition.op,
        })
    }

    fn holds(&self, value: i32) -> bool {
        match self.comparison {
            Operator::LessThan => value < self.limit,
            Operator::LessThanEqual => value <= self.limit,
            Operator::GreaterThan => value > self.limit,
            Operator::GreaterThanEqual => value >= self.limit,
            Operator::Equal => value == self.limit,
            _ => value != self.limit,
        }
    }

    /// Index value of every iteration, in order.
    pub fn values(&self) -> Result<Vec<i32>, CodegenError> {
        let mut values = Vec::new();
        let mut value = self.start;
        while self.holds(value) {
            if values.len() == MAX_UNROLLED_ITERATIONS {
                return Err(unrollable("too many iterations"));
            }
            values.push(value);
            value = value
                .checked_add(self.step)
                .ok_or_else(|| unrollable("index overflows"))?;
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::symbol::IdAllocator;
    use crate::types::{Precision, Qualifier, Type};

    fn for_loop(condition_op: Operator, limit: i32, step: Node) -> (LoopNode, Arc<Variable>) {
        let mut ids = IdAllocator::default();
        let i = ids.new_variable(
            "i",
            Type::new(BasicType::Int, Precision::High, Qualifier::Temporary, 1),
        );
        let step = match step {
            Node::Constant(_) => build::binary(Operator::AddAssign, build::symbol(&i), step),
            other => other,
        };
        let node = build::for_loop(
            Some(build::declare_init(&i, build::int(0))),
            Some(build::binary(condition_op, build::symbol(&i), build::int(limit))),
            Some(step),
            build::block(vec![]),
        );
        let Node::Loop(node) = node else {
            unreachable!();
        };
        (node, i)
    }

    #[test]
    fn counts_up_with_a_constant_step() {
        let (node, i) = for_loop(Operator::LessThan, 7, build::int(3));
        let index = LoopIndex::analyse(&node).expect("unrollable");
        assert_eq!(index.variable.id, i.id);
        assert_eq!(index.values(), Ok(vec![0, 3, 6]));
    }

    #[test]
    fn increments_and_inclusive_limits() {
        let mut ids = IdAllocator::starting_at(50);
        let other = ids.new_variable(
            "j",
            Type::new(BasicType::Int, Precision::High, Qualifier::Temporary, 1),
        );
        let (node, i) = for_loop(Operator::LessThanEqual, 2, build::int(0));
        let node = LoopNode {
            expression: Some(Box::new(build::unary(Operator::PostIncrement, build::symbol(&i)))),
            ..node
        };
        assert_eq!(LoopIndex::analyse(&node).and_then(|l| l.values()), Ok(vec![0, 1, 2]));

        let wrong_index = LoopNode {
            expression: Some(Box::new(build::unary(Operator::PostIncrement, build::symbol(&other)))),
            ..node
        };
        assert!(matches!(
            LoopIndex::analyse(&wrong_index),
            Err(CodegenError::UnrollableLoop { .. })
        ));
    }

    #[test]
    fn runaway_loops_are_rejected() {
        let (node, _) = for_loop(Operator::NotEqual, 1, build::int(2));
        assert!(matches!(node_values(&node), Err(CodegenError::UnrollableLoop { .. })));
    }

    fn node_values(node: &LoopNode) -> Result<Vec<i32>, CodegenError> {
        LoopIndex::analyse(node)?.values()
    }
}
