//! Read-only AST traversal.
//!
//! Composite nodes are offered to the visitor three times: [`Visit::Pre`] before any child,
//! [`Visit::In`] between two children, and [`Visit::Post`] after the last one. Returning `false`
//! from `Pre` skips the children and the `Post` visit. Returning `false` from `In` skips the
//! remaining children and the `Post` visit. Leaf nodes get a single call.
//!
//! Passes that want to change the tree record [`super::edit::Edit`]s against
//! [`Walker::path`] and apply them after the walk.

use super::edit::NodePath;
use super::node::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Pre,
    In,
    Post,
}

pub trait Visitor<'a> {
    fn visit_symbol(&mut self, _walker: &mut Walker<'a>, _node: &'a SymbolNode) {}

    fn visit_constant(&mut self, _walker: &mut Walker<'a>, _node: &'a ConstantNode) {}

    fn visit_prototype(&mut self, _walker: &mut Walker<'a>, _node: &'a PrototypeNode) {}

    fn visit_invariant_declaration(
        &mut self,
        _walker: &mut Walker<'a>,
        _node: &'a InvariantDeclarationNode,
    ) {
    }

    fn visit_unary(&mut self, _walker: &mut Walker<'a>, _visit: Visit, _node: &'a UnaryNode) -> bool {
        true
    }

    fn visit_binary(&mut self, _walker: &mut Walker<'a>, _visit: Visit, _node: &'a BinaryNode) -> bool {
        true
    }

    fn visit_ternary(
        &mut self,
        _walker: &mut Walker<'a>,
        _visit: Visit,
        _node: &'a TernaryNode,
    ) -> bool {
        true
    }

    fn visit_swizzle(
        &mut self,
        _walker: &mut Walker<'a>,
        _visit: Visit,
        _node: &'a SwizzleNode,
    ) -> bool {
        true
    }

    fn visit_aggregate(
        &mut self,
        _walker: &mut Walker<'a>,
        _visit: Visit,
        _node: &'a AggregateNode,
    ) -> bool {
        true
    }

    fn visit_block(&mut self, _walker: &mut Walker<'a>, _visit: Visit, _node: &'a BlockNode) -> bool {
        true
    }

    fn visit_declaration(
        &mut self,
        _walker: &mut Walker<'a>,
        _visit: Visit,
        _node: &'a DeclarationNode,
    ) -> bool {
        true
    }

    fn visit_function_definition(
        &mut self,
        _walker: &mut Walker<'a>,
        _visit: Visit,
        _node: &'a FunctionDefinitionNode,
    ) -> bool {
        true
    }

    fn visit_if_else(&mut self, _walker: &mut Walker<'a>, _visit: Visit, _node: &'a IfElseNode) -> bool {
        true
    }

    fn visit_switch(&mut self, _walker: &mut Walker<'a>, _visit: Visit, _node: &'a SwitchNode) -> bool {
        true
    }

    fn visit_case(&mut self, _walker: &mut Walker<'a>, _visit: Visit, _node: &'a CaseNode) -> bool {
        true
    }

    fn visit_loop(&mut self, _walker: &mut Walker<'a>, _visit: Visit, _node: &'a LoopNode) -> bool {
        true
    }

    fn visit_branch(&mut self, _walker: &mut Walker<'a>, _visit: Visit, _node: &'a BranchNode) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame<'a> {
    node: &'a Node,
    /// Slot of the child currently being walked.
    slot: usize,
}

/// Traversal state: the chain of ancestors of the node being visited.
#[derive(Debug, Default)]
pub struct Walker<'a> {
    stack: Vec<Frame<'a>>,
    /// Path of the first node walked, relative to the tree root.
    base: Vec<usize>,
}

impl<'a> Walker<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A walker whose [`Walker::path`] results are prefixed with `base`, for walking a subtree.
    pub fn at(base: NodePath) -> Self {
        Self {
            stack: Vec::new(),
            base: base.0,
        }
    }

    /// Parent of the node being visited.
    pub fn parent(&self) -> Option<&'a Node> {
        self.stack.last().map(|f| f.node)
    }

    /// Ancestors from the root down to the parent, with the slot taken at each.
    pub fn ancestors(&self) -> impl DoubleEndedIterator<Item = (&'a Node, usize)> + '_ {
        self.stack.iter().map(|f| (f.node, f.slot))
    }

    /// Number of composite nodes enclosing the node being visited.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Path from the root to the node being visited.
    pub fn path(&self) -> NodePath {
        let mut path = self.base.clone();
        path.extend(self.stack.iter().map(|f| f.slot));
        NodePath(path)
    }

    pub fn walk<V: Visitor<'a> + ?Sized>(&mut self, visitor: &mut V, node: &'a Node) {
        match node {
            Node::Symbol(n) => visitor.visit_symbol(self, n),
            Node::Constant(n) => visitor.visit_constant(self, n),
            Node::Prototype(n) => visitor.visit_prototype(self, n),
            Node::InvariantDeclaration(n) => visitor.visit_invariant_declaration(self, n),
            _ => self.walk_composite(visitor, node),
        }
    }

    /// Walks `child` as if it were reached from `parent` through `slot`. Used by visitors that
    /// return `false` from `Pre` and drive the children themselves.
    pub fn walk_child<V: Visitor<'a> + ?Sized>(
        &mut self,
        visitor: &mut V,
        parent: &'a Node,
        slot: usize,
        child: &'a Node,
    ) {
        self.stack.push(Frame { node: parent, slot });
        self.walk(visitor, child);
        self.stack.pop();
    }

    fn walk_composite<V: Visitor<'a> + ?Sized>(&mut self, visitor: &mut V, node: &'a Node) {
        if !dispatch(visitor, self, Visit::Pre, node) {
            return;
        }
        let children = node.children();
        self.stack.push(Frame { node, slot: 0 });
        let mut completed = true;
        for (i, (slot, child)) in children.into_iter().enumerate() {
            if i > 0 {
                self.stack.pop();
                let keep_going = dispatch(visitor, self, Visit::In, node);
                self.stack.push(Frame { node, slot });
                if !keep_going {
                    completed = false;
                    break;
                }
            }
            if let Some(top) = self.stack.last_mut() {
                top.slot = slot;
            }
            self.walk(visitor, child);
        }
        self.stack.pop();
        if completed {
            dispatch(visitor, self, Visit::Post, node);
        }
    }
}

fn dispatch<'a, V: Visitor<'a> + ?Sized>(
    visitor: &mut V,
    walker: &mut Walker<'a>,
    visit: Visit,
    node: &'a Node,
) -> bool {
    match node {
        Node::Unary(n) => visitor.visit_unary(walker, visit, n),
        Node::Binary(n) => visitor.visit_binary(walker, visit, n),
        Node::Ternary(n) => visitor.visit_ternary(walker, visit, n),
        Node::Swizzle(n) => visitor.visit_swizzle(walker, visit, n),
        Node::Aggregate(n) => visitor.visit_aggregate(walker, visit, n),
        Node::Block(n) => visitor.visit_block(walker, visit, n),
        Node::Declaration(n) => visitor.visit_declaration(walker, visit, n),
        Node::FunctionDefinition(n) => visitor.visit_function_definition(walker, visit, n),
        Node::IfElse(n) => visitor.visit_if_else(walker, visit, n),
        Node::Switch(n) => visitor.visit_switch(walker, visit, n),
        Node::Case(n) => visitor.visit_case(walker, visit, n),
        Node::Loop(n) => visitor.visit_loop(walker, visit, n),
        Node::Branch(n) => visitor.visit_branch(walker, visit, n),
        Node::Symbol(_) | Node::Constant(_) | Node::Prototype(_) | Node::InvariantDeclaration(_) => {
            true
        }
    }
}
