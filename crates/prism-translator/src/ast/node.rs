use std::fmt;
use std::sync::Arc;

use crate::constant::ConstantUnion;
use crate::operator::Operator;
use crate::symbol::{Function, Variable};
use crate::types::Type;

/// Typed shader AST. The translation unit root is a [`Node::Block`] of global statements.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Symbol(SymbolNode),
    Constant(ConstantNode),
    Unary(UnaryNode),
    Binary(BinaryNode),
    Ternary(TernaryNode),
    Swizzle(SwizzleNode),
    Aggregate(AggregateNode),
    Block(BlockNode),
    Declaration(DeclarationNode),
    Prototype(PrototypeNode),
    FunctionDefinition(FunctionDefinitionNode),
    IfElse(IfElseNode),
    Switch(SwitchNode),
    Case(CaseNode),
    Loop(LoopNode),
    Branch(BranchNode),
    InvariantDeclaration(InvariantDeclarationNode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Symbol,
    Constant,
    Unary,
    Binary,
    Ternary,
    Swizzle,
    Aggregate,
    Block,
    Declaration,
    Prototype,
    FunctionDefinition,
    IfElse,
    Switch,
    Case,
    Loop,
    Branch,
    InvariantDeclaration,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolNode {
    pub variable: Arc<Variable>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantNode {
    pub ty: Type,
    pub values: Vec<ConstantUnion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryNode {
    pub op: Operator,
    pub operand: Box<Node>,
    pub ty: Type,
    /// Emit a call to the emulated `webgl_*_emu` helper instead of the native function.
    pub use_emulated_function: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryNode {
    pub op: Operator,
    pub left: Box<Node>,
    pub right: Box<Node>,
    pub ty: Type,
    /// Only meaningful on [`Operator::IndexIndirect`].
    pub add_index_clamp: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TernaryNode {
    pub condition: Box<Node>,
    pub true_expression: Box<Node>,
    pub false_expression: Box<Node>,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwizzleNode {
    pub operand: Box<Node>,
    /// Component offsets in source order, `0..=3`.
    pub offsets: Vec<u8>,
    pub ty: Type,
}

/// Function calls, constructors, and built-in operators taking two or more arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateNode {
    pub op: Operator,
    pub args: Vec<Node>,
    pub ty: Type,
    /// Callee for [`Operator::CallFunctionInAst`] and [`Operator::CallBuiltInFunction`].
    pub function: Option<Arc<Function>>,
    pub use_emulated_function: bool,
}

impl AggregateNode {
    pub fn is_call(&self) -> bool {
        self.op.is_call()
    }

    pub fn is_constructor(&self) -> bool {
        self.op == Operator::Construct
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockNode {
    pub statements: Vec<Node>,
}

/// Each declarator is a [`Node::Symbol`] or an [`Operator::Initialize`] binary node.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationNode {
    pub declarators: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrototypeNode {
    pub function: Arc<Function>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinitionNode {
    pub prototype: PrototypeNode,
    /// Always a [`Node::Block`].
    pub body: Box<Node>,
}

impl FunctionDefinitionNode {
    pub fn function(&self) -> &Arc<Function> {
        &self.prototype.function
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfElseNode {
    pub condition: Box<Node>,
    pub true_block: Box<Node>,
    pub false_block: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchNode {
    pub init: Box<Node>,
    pub body: Box<Node>,
}

/// `case <condition>:`, or `default:` when there is no condition.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseNode {
    pub condition: Option<Box<Node>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    For,
    While,
    DoWhile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopNode {
    pub kind: LoopKind,
    pub init: Option<Box<Node>>,
    pub condition: Option<Box<Node>>,
    pub expression: Option<Box<Node>>,
    pub body: Box<Node>,
    /// Set by the unroll marking pass; the code generator unrolls marked loops.
    pub unroll: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchOp {
    Kill,
    Return,
    Break,
    Continue,
}

impl BranchOp {
    pub fn keyword(self) -> &'static str {
        match self {
            BranchOp::Kill => "discard",
            BranchOp::Return => "return",
            BranchOp::Break => "break",
            BranchOp::Continue => "continue",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BranchNode {
    pub op: BranchOp,
    pub expression: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvariantDeclarationNode {
    pub variable: Arc<Variable>,
}

/// Child slot numbers of the fixed-arity nodes.
pub mod slot {
    pub const LOOP_INIT: usize = 0;
    pub const LOOP_CONDITION: usize = 1;
    pub const LOOP_EXPRESSION: usize = 2;
    pub const LOOP_BODY: usize = 3;

    pub const IF_CONDITION: usize = 0;
    pub const IF_TRUE: usize = 1;
    pub const IF_FALSE: usize = 2;
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Symbol(_) => NodeKind::Symbol,
            Node::Constant(_) => NodeKind::Constant,
            Node::Unary(_) => NodeKind::Unary,
            Node::Binary(_) => NodeKind::Binary,
            Node::Ternary(_) => NodeKind::Ternary,
            Node::Swizzle(_) => NodeKind::Swizzle,
            Node::Aggregate(_) => NodeKind::Aggregate,
            Node::Block(_) => NodeKind::Block,
            Node::Declaration(_) => NodeKind::Declaration,
            Node::Prototype(_) => NodeKind::Prototype,
            Node::FunctionDefinition(_) => NodeKind::FunctionDefinition,
            Node::IfElse(_) => NodeKind::IfElse,
            Node::Switch(_) => NodeKind::Switch,
            Node::Case(_) => NodeKind::Case,
            Node::Loop(_) => NodeKind::Loop,
            Node::Branch(_) => NodeKind::Branch,
            Node::InvariantDeclaration(_) => NodeKind::InvariantDeclaration,
        }
    }

    /// Type of an expression node; `None` for statements.
    pub fn ty(&self) -> Option<&Type> {
        match self {
            Node::Symbol(n) => Some(&n.variable.ty),
            Node::Constant(n) => Some(&n.ty),
            Node::Unary(n) => Some(&n.ty),
            Node::Binary(n) => Some(&n.ty),
            Node::Ternary(n) => Some(&n.ty),
            Node::Swizzle(n) => Some(&n.ty),
            Node::Aggregate(n) => Some(&n.ty),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&SymbolNode> {
        match self {
            Node::Symbol(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<&ConstantNode> {
        match self {
            Node::Constant(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&BinaryNode> {
        match self {
            Node::Binary(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&BlockNode> {
        match self {
            Node::Block(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_block_mut(&mut self) -> Option<&mut BlockNode> {
        match self {
            Node::Block(n) => Some(n),
            _ => None,
        }
    }

    /// Present children with their slot numbers, in evaluation order.
    pub fn children(&self) -> Vec<(usize, &Node)> {
        fn opt(slot: usize, node: &Option<Box<Node>>) -> Option<(usize, &Node)> {
            node.as_deref().map(|n| (slot, n))
        }
        match self {
            Node::Symbol(_)
            | Node::Constant(_)
            | Node::Prototype(_)
            | Node::InvariantDeclaration(_) => Vec::new(),
            Node::Unary(n) => vec![(0, &*n.operand)],
            Node::Binary(n) => vec![(0, &*n.left), (1, &*n.right)],
            Node::Ternary(n) => vec![
                (0, &*n.condition),
                (1, &*n.true_expression),
                (2, &*n.false_expression),
            ],
            Node::Swizzle(n) => vec![(0, &*n.operand)],
            Node::Aggregate(n) => n.args.iter().enumerate().collect(),
            Node::Block(n) => n.statements.iter().enumerate().collect(),
            Node::Declaration(n) => n.declarators.iter().enumerate().collect(),
            Node::FunctionDefinition(n) => vec![(0, &*n.body)],
            Node::IfElse(n) => [
                Some((slot::IF_CONDITION, &*n.condition)),
                Some((slot::IF_TRUE, &*n.true_block)),
                opt(slot::IF_FALSE, &n.false_block),
            ]
            .into_iter()
            .flatten()
            .collect(),
            Node::Switch(n) => vec![(0, &*n.init), (1, &*n.body)],
            Node::Case(n) => opt(0, &n.condition).into_iter().collect(),
            Node::Loop(n) => [
                opt(slot::LOOP_INIT, &n.init),
                opt(slot::LOOP_CONDITION, &n.condition),
                opt(slot::LOOP_EXPRESSION, &n.expression),
                Some((slot::LOOP_BODY, &*n.body)),
            ]
            .into_iter()
            .flatten()
            .collect(),
            Node::Branch(n) => opt(0, &n.expression).into_iter().collect(),
        }
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children()
            .into_iter()
            .find_map(|(s, n)| (s == index).then_some(n))
    }

    pub fn child_mut(&mut self, index: usize) -> Option<&mut Node> {
        fn opt(node: &mut Option<Box<Node>>) -> Option<&mut Node> {
            node.as_deref_mut()
        }
        match self {
            Node::Symbol(_)
            | Node::Constant(_)
            | Node::Prototype(_)
            | Node::InvariantDeclaration(_) => None,
            Node::Unary(n) => (index == 0).then_some(&mut *n.operand),
            Node::Binary(n) => match index {
                0 => Some(&mut *n.left),
                1 => Some(&mut *n.right),
                _ => None,
            },
            Node::Ternary(n) => match index {
                0 => Some(&mut *n.condition),
                1 => Some(&mut *n.true_expression),
                2 => Some(&mut *n.false_expression),
                _ => None,
            },
            Node::Swizzle(n) => (index == 0).then_some(&mut *n.operand),
            Node::Aggregate(n) => n.args.get_mut(index),
            Node::Block(n) => n.statements.get_mut(index),
            Node::Declaration(n) => n.declarators.get_mut(index),
            Node::FunctionDefinition(n) => (index == 0).then_some(&mut *n.body),
            Node::IfElse(n) => match index {
                slot::IF_CONDITION => Some(&mut *n.condition),
                slot::IF_TRUE => Some(&mut *n.true_block),
                slot::IF_FALSE => opt(&mut n.false_block),
                _ => None,
            },
            Node::Switch(n) => match index {
                0 => Some(&mut *n.init),
                1 => Some(&mut *n.body),
                _ => None,
            },
            Node::Case(n) if index == 0 => opt(&mut n.condition),
            Node::Case(_) => None,
            Node::Loop(n) => match index {
                slot::LOOP_INIT => opt(&mut n.init),
                slot::LOOP_CONDITION => opt(&mut n.condition),
                slot::LOOP_EXPRESSION => opt(&mut n.expression),
                slot::LOOP_BODY => Some(&mut *n.body),
                _ => None,
            },
            Node::Branch(n) if index == 0 => opt(&mut n.expression),
            Node::Branch(_) => None,
        }
    }

    /// Consumes the node, returning the child in `slot`.
    pub fn into_child(self, index: usize) -> Option<Node> {
        let boxed = |b: Box<Node>| Some(*b);
        match self {
            Node::Unary(n) if index == 0 => boxed(n.operand),
            Node::Binary(n) => match index {
                0 => boxed(n.left),
                1 => boxed(n.right),
                _ => None,
            },
            Node::Ternary(n) => match index {
                0 => boxed(n.condition),
                1 => boxed(n.true_expression),
                2 => boxed(n.false_expression),
                _ => None,
            },
            Node::Swizzle(n) if index == 0 => boxed(n.operand),
            Node::Aggregate(n) => n.args.into_iter().nth(index),
            Node::Block(n) => n.statements.into_iter().nth(index),
            Node::Declaration(n) => n.declarators.into_iter().nth(index),
            Node::FunctionDefinition(n) if index == 0 => boxed(n.body),
            _ => None,
        }
    }

    /// Pre-order traversal with mutable access, for passes that only flip annotations and never
    /// change the shape of the tree.
    pub fn for_each_mut(&mut self, f: &mut dyn FnMut(&mut Node)) {
        f(self);
        let slots: Vec<usize> = self.children().into_iter().map(|(slot, _)| slot).collect();
        for slot in slots {
            if let Some(child) = self.child_mut(slot) {
                child.for_each_mut(f);
            }
        }
    }

    /// Whether evaluating this expression writes to anything or calls a user function.
    pub fn has_side_effects(&self) -> bool {
        match self {
            Node::Symbol(_) | Node::Constant(_) => false,
            Node::Unary(n) => n.op.is_increment_or_decrement() || n.operand.has_side_effects(),
            Node::Binary(n) => {
                n.op.is_assignment() || n.left.has_side_effects() || n.right.has_side_effects()
            }
            Node::Ternary(n) => {
                n.condition.has_side_effects()
                    || n.true_expression.has_side_effects()
                    || n.false_expression.has_side_effects()
            }
            Node::Swizzle(n) => n.operand.has_side_effects(),
            Node::Aggregate(n) => {
                n.op == Operator::CallFunctionInAst
                    || n.args.iter().any(Node::has_side_effects)
            }
            _ => true,
        }
    }
}

impl From<BlockNode> for Node {
    fn from(block: BlockNode) -> Self {
        Node::Block(block)
    }
}
