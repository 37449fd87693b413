//! Annotation passes run before dead-code removal. They only flip flags on existing nodes; the
//! code generator acts on the flags.

use tracing::debug;

use crate::ast::{LoopNode, Node};
use crate::glsl::clamp_bound;
use crate::glsl::unroll::LoopIndex;
use crate::operator::Operator;
use crate::symbol::SymbolId;

/// Flags every indirect index whose bound is statically known. Returns the number flagged.
pub fn mark_index_clamps(root: &mut Node) -> usize {
    let mut marked = 0;
    root.for_each_mut(&mut |node: &mut Node| {
        if let Node::Binary(binary) = node {
            if binary.op == Operator::IndexIndirect
                && binary.left.ty().and_then(clamp_bound).is_some()
            {
                binary.add_index_clamp = true;
                marked += 1;
            }
        }
    });
    debug!(marked, "indirect indices flagged for clamping");
    marked
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnrollCondition {
    /// Every loop with an integer index.
    IntegerIndex,
    /// Loops whose index selects an element of a sampler array.
    SamplerArrayIndex,
}

fn indexes_sampler_array(node: &Node, index: SymbolId) -> bool {
    if let Node::Binary(binary) = node {
        let is_sampler_array = binary
            .left
            .ty()
            .is_some_and(|t| t.is_array() && t.basic.is_sampler());
        if binary.op == Operator::IndexIndirect
            && is_sampler_array
            && mentions(&binary.right, index)
        {
            return true;
        }
    }
    node.children()
        .into_iter()
        .any(|(_, child)| indexes_sampler_array(child, index))
}

fn mentions(node: &Node, id: SymbolId) -> bool {
    node.as_symbol().is_some_and(|s| s.variable.id == id)
        || node.children().into_iter().any(|(_, child)| mentions(child, id))
}

fn should_unroll(node: &LoopNode, condition: UnrollCondition) -> bool {
    let Ok(index) = LoopIndex::analyse(node) else {
        return false;
    };
    match condition {
        UnrollCondition::IntegerIndex => true,
        UnrollCondition::SamplerArrayIndex => indexes_sampler_array(&node.body, index.variable.id),
    }
}

/// Flags the `for` loops to be unrolled by the code generator. Returns the number flagged.
pub fn mark_unrolled_loops(root: &mut Node, condition: UnrollCondition) -> usize {
    let mut marked = 0;
    root.for_each_mut(&mut |node: &mut Node| {
        if let Node::Loop(loop_) = node {
            if should_unroll(loop_, condition) {
                loop_.unroll = true;
                marked += 1;
            }
        }
    });
    debug!(marked, ?condition, "loops flagged for unrolling");
    marked
}
