//! Constructors for AST nodes that fill in result types.
//!
//! The inference here follows the GLSL typing rules closely enough for a front end that has
//! already type-checked its input: it picks the non-scalar operand's shape, the higher of the
//! operand precisions, and the usual result types for comparisons and indexing.

use std::sync::Arc;

use crate::constant::ConstantUnion;
use crate::operator::Operator;
use crate::symbol::{Function, Variable};
use crate::types::{BasicType, Precision, Qualifier, Type};

use super::node::*;

pub fn symbol(variable: &Arc<Variable>) -> Node {
    Node::Symbol(SymbolNode {
        variable: Arc::clone(variable),
    })
}

pub fn constant(ty: Type, values: Vec<ConstantUnion>) -> Node {
    Node::Constant(ConstantNode {
        ty: ty.with_qualifier(Qualifier::Const),
        values,
    })
}

pub fn float(value: f32) -> Node {
    constant(
        Type::temp(BasicType::Float, Precision::Undefined, 1),
        vec![ConstantUnion::Float(value)],
    )
}

pub fn int(value: i32) -> Node {
    constant(
        Type::temp(BasicType::Int, Precision::Undefined, 1),
        vec![ConstantUnion::Int(value)],
    )
}

pub fn uint(value: u32) -> Node {
    constant(
        Type::temp(BasicType::UInt, Precision::Undefined, 1),
        vec![ConstantUnion::UInt(value)],
    )
}

pub fn boolean(value: bool) -> Node {
    constant(
        Type::temp(BasicType::Bool, Precision::Undefined, 1),
        vec![ConstantUnion::Bool(value)],
    )
}

fn type_of(node: &Node) -> Type {
    node.ty().cloned().unwrap_or_else(Type::void)
}

fn higher_precision(a: &Type, b: &Type) -> Precision {
    a.precision.max(b.precision)
}

fn temp(mut ty: Type) -> Type {
    ty.qualifier = Qualifier::Temporary;
    ty.invariant = false;
    ty
}

fn bool_scalar() -> Type {
    Type::temp(BasicType::Bool, Precision::Undefined, 1)
}

/// Result type of an arithmetic operator on two operands.
fn arithmetic_result(op: Operator, left: &Type, right: &Type) -> Type {
    let precision = higher_precision(left, right);
    let shape = match op {
        Operator::MatrixTimesVector => right,
        Operator::VectorTimesMatrix => left,
        Operator::MatrixTimesMatrix if left.rows() != right.rows() || left.cols() != right.cols() => {
            return temp(Type::matrix(precision, Qualifier::Temporary, right.cols(), left.rows()));
        }
        _ if left.is_scalar() && !right.is_scalar() => right,
        _ => left,
    };
    temp(shape.clone().with_precision(precision))
}

pub fn binary(op: Operator, left: Node, right: Node) -> Node {
    let (lt, rt) = (type_of(&left), type_of(&right));
    let ty = match op {
        _ if op.is_assignment() => temp(lt),
        _ if op.is_comparison() => bool_scalar(),
        Operator::LogicalAnd | Operator::LogicalOr | Operator::LogicalXor => bool_scalar(),
        Operator::IndexDirect | Operator::IndexIndirect => lt.indexed_type(),
        Operator::IndexDirectStruct => {
            let index = right
                .as_constant()
                .and_then(|c| c.values.first().copied())
                .and_then(ConstantUnion::as_i64)
                .and_then(|i| usize::try_from(i).ok());
            lt.struct_type()
                .zip(index)
                .and_then(|(s, i)| s.fields.get(i))
                .map(|f| temp(f.ty.clone()))
                .unwrap_or_else(Type::void)
        }
        Operator::Comma => temp(rt),
        _ => arithmetic_result(op, &lt, &rt),
    };
    Node::Binary(BinaryNode {
        op,
        left: Box::new(left),
        right: Box::new(right),
        ty,
        add_index_clamp: false,
    })
}

pub fn assign(left: Node, right: Node) -> Node {
    binary(Operator::Assign, left, right)
}

pub fn comma(left: Node, right: Node) -> Node {
    binary(Operator::Comma, left, right)
}

pub fn add(left: Node, right: Node) -> Node {
    binary(Operator::Add, left, right)
}

pub fn sub(left: Node, right: Node) -> Node {
    binary(Operator::Sub, left, right)
}

pub fn div(left: Node, right: Node) -> Node {
    binary(Operator::Div, left, right)
}

/// Picks the matrix/vector flavour of multiplication from the operand shapes.
pub fn mul(left: Node, right: Node) -> Node {
    let op = mul_operator(&type_of(&left), &type_of(&right), false);
    binary(op, left, right)
}

/// `left *= right`, with the same operator selection as [`mul`].
pub fn mul_assign(left: Node, right: Node) -> Node {
    let op = mul_operator(&type_of(&left), &type_of(&right), true);
    binary(op, left, right)
}

fn mul_operator(left: &Type, right: &Type, assign: bool) -> Operator {
    let op = match (left.is_matrix(), right.is_matrix()) {
        (true, true) => Operator::MatrixTimesMatrix,
        (true, false) if right.is_vector() => Operator::MatrixTimesVector,
        (true, false) => Operator::MatrixTimesScalar,
        (false, true) if left.is_vector() => Operator::VectorTimesMatrix,
        (false, true) => Operator::MatrixTimesScalar,
        (false, false) if left.is_vector() != right.is_vector() => Operator::VectorTimesScalar,
        (false, false) => Operator::Mul,
    };
    if !assign {
        return op;
    }
    match op {
        Operator::MatrixTimesMatrix => Operator::MatrixTimesMatrixAssign,
        Operator::MatrixTimesScalar => Operator::MatrixTimesScalarAssign,
        Operator::VectorTimesMatrix => Operator::VectorTimesMatrixAssign,
        Operator::VectorTimesScalar => Operator::VectorTimesScalarAssign,
        _ => Operator::MulAssign,
    }
}

/// `base[index]`; constant indices become [`Operator::IndexDirect`].
pub fn index(base: Node, index: Node) -> Node {
    let op = if index.as_constant().is_some() {
        Operator::IndexDirect
    } else {
        Operator::IndexIndirect
    };
    binary(op, base, index)
}

/// Struct field selection by field index.
pub fn field(base: Node, field_index: i32) -> Node {
    binary(Operator::IndexDirectStruct, base, int(field_index))
}

pub fn unary(op: Operator, operand: Node) -> Node {
    let ot = type_of(&operand);
    let ty = match op {
        Operator::LogicalNot | Operator::Any | Operator::All => bool_scalar(),
        Operator::Length => temp(Type::temp(BasicType::Float, ot.precision, 1)),
        _ => temp(ot),
    };
    Node::Unary(UnaryNode {
        op,
        operand: Box::new(operand),
        ty,
        use_emulated_function: false,
    })
}

pub fn ternary(condition: Node, true_expression: Node, false_expression: Node) -> Node {
    let ty = temp(type_of(&true_expression));
    Node::Ternary(TernaryNode {
        condition: Box::new(condition),
        true_expression: Box::new(true_expression),
        false_expression: Box::new(false_expression),
        ty,
    })
}

pub fn swizzle(operand: Node, offsets: &[u8]) -> Node {
    let ot = type_of(&operand);
    let size = u8::try_from(offsets.len()).unwrap_or(4);
    let ty = Type::temp(ot.basic, ot.precision, size);
    Node::Swizzle(SwizzleNode {
        operand: Box::new(operand),
        offsets: offsets.to_vec(),
        ty,
    })
}

/// Call of a user-defined function.
pub fn call(function: &Arc<Function>, args: Vec<Node>) -> Node {
    Node::Aggregate(AggregateNode {
        op: Operator::CallFunctionInAst,
        args,
        ty: temp(function.return_type.clone()),
        function: Some(Arc::clone(function)),
        use_emulated_function: false,
    })
}

/// Call of a built-in function. Functions related to an operator become that operator.
pub fn builtin_call(function: &Arc<Function>, args: Vec<Node>) -> Node {
    let mut ty = temp(function.return_type.clone());
    if ty.basic.supports_precision() && !ty.basic.is_sampler() {
        ty.precision = args
            .iter()
            .filter_map(Node::ty)
            .filter(|t| !t.basic.is_sampler())
            .map(|t| t.precision)
            .max()
            .unwrap_or(Precision::Undefined);
    }
    let mut args = args;
    if let Some(op) = function.op {
        match <[Node; 1]>::try_from(args) {
            Ok([operand]) => {
                return Node::Unary(UnaryNode {
                    op,
                    operand: Box::new(operand),
                    ty,
                    use_emulated_function: false,
                });
            }
            Err(rest) => args = rest,
        }
    }
    Node::Aggregate(AggregateNode {
        op: function.op.unwrap_or(Operator::CallBuiltInFunction),
        args,
        ty,
        function: Some(Arc::clone(function)),
        use_emulated_function: false,
    })
}

pub fn construct(ty: Type, args: Vec<Node>) -> Node {
    Node::Aggregate(AggregateNode {
        op: Operator::Construct,
        args,
        ty: temp(ty),
        function: None,
        use_emulated_function: false,
    })
}

pub fn declaration(declarators: Vec<Node>) -> Node {
    Node::Declaration(DeclarationNode { declarators })
}

/// `T name;`
pub fn declare(variable: &Arc<Variable>) -> Node {
    declaration(vec![symbol(variable)])
}

/// `T name = init;`
pub fn declare_init(variable: &Arc<Variable>, init: Node) -> Node {
    declaration(vec![binary(Operator::Initialize, symbol(variable), init)])
}

pub fn block(statements: Vec<Node>) -> Node {
    Node::Block(BlockNode { statements })
}

pub fn if_else(condition: Node, true_block: Node, false_block: Option<Node>) -> Node {
    Node::IfElse(IfElseNode {
        condition: Box::new(condition),
        true_block: Box::new(true_block),
        false_block: false_block.map(Box::new),
    })
}

pub fn for_loop(
    init: Option<Node>,
    condition: Option<Node>,
    expression: Option<Node>,
    body: Node,
) -> Node {
    Node::Loop(LoopNode {
        kind: LoopKind::For,
        init: init.map(Box::new),
        condition: condition.map(Box::new),
        expression: expression.map(Box::new),
        body: Box::new(body),
        unroll: false,
    })
}

pub fn while_loop(condition: Node, body: Node) -> Node {
    Node::Loop(LoopNode {
        kind: LoopKind::While,
        init: None,
        condition: Some(Box::new(condition)),
        expression: None,
        body: Box::new(body),
        unroll: false,
    })
}

pub fn do_while(body: Node, condition: Node) -> Node {
    Node::Loop(LoopNode {
        kind: LoopKind::DoWhile,
        init: None,
        condition: Some(Box::new(condition)),
        expression: None,
        body: Box::new(body),
        unroll: false,
    })
}

pub fn switch(init: Node, body: Node) -> Node {
    Node::Switch(SwitchNode {
        init: Box::new(init),
        body: Box::new(body),
    })
}

pub fn case(condition: Option<Node>) -> Node {
    Node::Case(CaseNode {
        condition: condition.map(Box::new),
    })
}

fn branch(op: BranchOp, expression: Option<Node>) -> Node {
    Node::Branch(BranchNode {
        op,
        expression: expression.map(Box::new),
    })
}

pub fn return_(expression: Option<Node>) -> Node {
    branch(BranchOp::Return, expression)
}

pub fn discard() -> Node {
    branch(BranchOp::Kill, None)
}

pub fn break_() -> Node {
    branch(BranchOp::Break, None)
}

pub fn continue_() -> Node {
    branch(BranchOp::Continue, None)
}

pub fn prototype(function: &Arc<Function>) -> Node {
    Node::Prototype(PrototypeNode {
        function: Arc::clone(function),
    })
}

pub fn function(function: &Arc<Function>, body: Vec<Node>) -> Node {
    Node::FunctionDefinition(FunctionDefinitionNode {
        prototype: PrototypeNode {
            function: Arc::clone(function),
        },
        body: Box::new(block(body)),
    })
}

pub fn invariant(variable: &Arc<Variable>) -> Node {
    Node::InvariantDeclaration(InvariantDeclarationNode {
        variable: Arc::clone(variable),
    })
}
