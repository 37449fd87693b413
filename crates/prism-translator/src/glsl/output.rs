use std::fmt::Write;

use hashbrown::HashSet;
use tracing::trace;

use crate::ast::*;
use crate::constant::ConstantUnion;
use crate::emulator::emulated_function_name;
use crate::operator::Operator;
use crate::symbol::{Function, Parameter, SymbolId, Variable};
use crate::types::{Precision, Qualifier, StructType, Type};

use super::names::{translate_builtin_variable, translate_texture_function, NameMap};
use super::precision::{rounding_for, CompoundHelper, CompoundOp, Rounding};
use super::unroll::LoopIndex;
use super::{clamp_bound, ClampStrategy, CodegenError, GlslBody, GlslConfig, HelperUsage};

/// Where an expression sits. Only plain reads get the precision rounding wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ctx {
    Read,
    LValue,
    Declaring,
    OutArgument,
}

fn is_single_statement(node: &Node) -> bool {
    !matches!(
        node,
        Node::FunctionDefinition(_)
            | Node::Block(_)
            | Node::Loop(_)
            | Node::IfElse(_)
            | Node::Switch(_)
            | Node::Case(_)
    )
}

/// Infix spelling of a binary operator, spaces included.
fn infix(op: Operator) -> Option<&'static str> {
    use Operator::*;
    Some(match op {
        Add => " + ",
        Sub => " - ",
        Mul | VectorTimesScalar | VectorTimesMatrix | MatrixTimesVector | MatrixTimesScalar
        | MatrixTimesMatrix => " * ",
        Div => " / ",
        IMod => " % ",
        BitShiftLeft => " << ",
        BitShiftRight => " >> ",
        BitwiseAnd => " & ",
        BitwiseXor => " ^ ",
        BitwiseOr => " | ",
        Equal => " == ",
        NotEqual => " != ",
        LessThan => " < ",
        GreaterThan => " > ",
        LessThanEqual => " <= ",
        GreaterThanEqual => " >= ",
        LogicalOr => " || ",
        LogicalXor => " ^^ ",
        LogicalAnd => " && ",
        _ => return None,
    })
}

fn compound_infix(op: Operator) -> Option<&'static str> {
    use Operator::*;
    Some(match op {
        AddAssign => " += ",
        SubAssign => " -= ",
        MulAssign | VectorTimesMatrixAssign | VectorTimesScalarAssign | MatrixTimesScalarAssign
        | MatrixTimesMatrixAssign => " *= ",
        DivAssign => " /= ",
        IModAssign => " %= ",
        BitShiftLeftAssign => " <<= ",
        BitShiftRightAssign => " >>= ",
        BitwiseAndAssign => " &= ",
        BitwiseXorAssign => " ^= ",
        BitwiseOrAssign => " |= ",
        _ => return None,
    })
}

fn swizzle_component(offset: u8) -> Option<char> {
    ['x', 'y', 'z', 'w'].get(usize::from(offset)).copied()
}

fn unexpected(node: &Node) -> CodegenError {
    CodegenError::UnexpectedNode { kind: node.kind() }
}

pub(super) struct Emitter<'c, 'n> {
    config: &'c GlslConfig<'c>,
    names: &'n mut NameMap,
    out: String,
    depth: usize,
    declared_structs: HashSet<u32>,
    /// Index variables of the loops being unrolled, innermost last, with their current value.
    unrolled: Vec<(SymbolId, i32)>,
    helpers: HelperUsage,
}

impl<'c, 'n> Emitter<'c, 'n> {
    pub(super) fn new(config: &'c GlslConfig<'c>, names: &'n mut NameMap) -> Self {
        Self {
            config,
            names,
            out: String::new(),
            depth: 0,
            declared_structs: HashSet::new(),
            unrolled: Vec::new(),
            helpers: HelperUsage::default(),
        }
    }

    pub(super) fn finish(self) -> GlslBody {
        GlslBody {
            text: self.out,
            helpers: self.helpers,
        }
    }

    pub(super) fn translation_unit(&mut self, root: &Node) -> Result<(), CodegenError> {
        match root {
            Node::Block(block) => self.block(block),
            other => Err(unexpected(other)),
        }
    }

    fn rounding(&self, ty: &Type) -> Option<Rounding> {
        if self.config.emulate_precision {
            rounding_for(ty)
        } else {
            None
        }
    }

    fn open_rounding(&mut self, rounding: Option<Rounding>) {
        if let Some(rounding) = rounding {
            self.out.push_str(rounding.function());
            self.out.push('(');
        }
    }

    fn close_rounding(&mut self, rounding: Option<Rounding>) {
        if rounding.is_some() {
            self.out.push(')');
        }
    }

    // Names.

    fn hash(&mut self, name: &str) -> String {
        self.names.hash_name(name, self.config.hash_function)
    }

    fn is_builtin(&self, name: &str) -> bool {
        self.config
            .builtins
            .find_builtin(name, self.config.shader_version)
            .is_some()
    }

    fn variable_name(&mut self, variable: &Variable) -> String {
        if variable.is_builtin() || self.is_builtin(&variable.name) {
            return translate_builtin_variable(&variable.name, self.config.output).to_owned();
        }
        self.hash(&variable.name)
    }

    fn function_name(&mut self, function: &Function) -> String {
        if function.is_builtin() || function.is_main() || self.is_builtin(&function.mangled_name) {
            return translate_texture_function(&function.name, self.config.output).to_owned();
        }
        self.hash(&function.name)
    }

    fn struct_name(&mut self, structure: &StructType) -> String {
        if structure.builtin {
            structure.name.clone()
        } else {
            self.hash(&structure.name)
        }
    }

    fn type_name(&mut self, ty: &Type) -> String {
        match ty.struct_type() {
            Some(structure) => self.struct_name(structure),
            None => ty.type_name(),
        }
    }

    // Types.

    fn qualifier_keyword(&self, qualifier: Qualifier) -> Option<&'static str> {
        use Qualifier::*;
        match qualifier {
            Temporary | Global => None,
            Position | PointSize | InstanceId | VertexId | FragCoord | FrontFacing | PointCoord
            | FragColor | FragData | FragDepth | FragDepthExt | NumWorkGroups | WorkGroupSize
            | WorkGroupId | LocalInvocationId | GlobalInvocationId | LocalInvocationIndex => None,
            Attribute | VaryingIn if self.config.output.uses_in_out() => Some("in"),
            VaryingOut if self.config.output.uses_in_out() => Some("out"),
            other => Some(other.as_str()),
        }
    }

    fn write_precision(&mut self, precision: Precision) -> bool {
        if !self.config.output.writes_precision() || precision == Precision::Undefined {
            return false;
        }
        self.out.push_str(precision.as_str());
        true
    }

    fn array_brackets(&mut self, ty: &Type) {
        if let Some(size) = ty.array_size() {
            let _ = write!(self.out, "[{size}]");
        } else if ty.is_unsized_array() {
            self.out.push_str("[]");
        }
    }

    fn variable_type(&mut self, ty: &Type) -> Result<(), CodegenError> {
        if ty.invariant {
            self.out.push_str("invariant ");
        }
        if let Some(keyword) = self.qualifier_keyword(ty.qualifier) {
            self.out.push_str(keyword);
            self.out.push(' ');
        }
        if let Some(structure) = ty.struct_type() {
            let declared = !structure.is_anonymous() && self.declared_structs.contains(&structure.id);
            if !declared && !structure.builtin {
                self.declare_struct(structure)?;
                if !structure.is_anonymous() {
                    self.declared_structs.insert(structure.id);
                }
                return Ok(());
            }
        }
        if self.write_precision(ty.precision) {
            self.out.push(' ');
        }
        let name = self.type_name(ty);
        self.out.push_str(&name);
        Ok(())
    }

    fn declare_struct(&mut self, structure: &StructType) -> Result<(), CodegenError> {
        trace!(name = %structure.name, id = structure.id, "declaring struct");
        let name = self.struct_name(structure);
        let _ = writeln!(self.out, "struct {name}{{");
        for field in &structure.fields {
            if self.write_precision(field.ty.precision) {
                self.out.push(' ');
            }
            let type_name = self.type_name(&field.ty);
            let field_name = self.hash(&field.name);
            let _ = write!(self.out, "{type_name} {field_name}");
            self.array_brackets(&field.ty);
            self.out.push_str(";\n");
        }
        self.out.push('}');
        Ok(())
    }

    fn parameters(&mut self, params: &[Parameter]) -> Result<(), CodegenError> {
        self.out.push('(');
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.variable_type(&param.ty)?;
            if let Some(name) = &param.name {
                let name = self.hash(name);
                self.out.push(' ');
                self.out.push_str(&name);
            }
            self.array_brackets(&param.ty);
        }
        self.out.push(')');
        Ok(())
    }

    // Statements.

    fn code_block(&mut self, node: &Node) -> Result<(), CodegenError> {
        self.node(node, Ctx::Read)?;
        if is_single_statement(node) {
            self.out.push_str(";\n");
        }
        Ok(())
    }

    fn block(&mut self, block: &BlockNode) -> Result<(), CodegenError> {
        let scoped = self.depth > 0;
        if scoped {
            self.out.push_str("{\n");
        }
        self.depth += 1;
        for statement in &block.statements {
            self.code_block(statement)?;
        }
        self.depth -= 1;
        if scoped {
            self.out.push_str("}\n");
        }
        Ok(())
    }

    fn declaration(&mut self, node: &Node, declaration: &DeclarationNode) -> Result<(), CodegenError> {
        let ty = match declaration.declarators.first() {
            Some(Node::Symbol(s)) => &s.variable.ty,
            Some(Node::Binary(b)) if b.op == Operator::Initialize => match b.left.as_ref() {
                Node::Symbol(s) => &s.variable.ty,
                _ => return Err(unexpected(node)),
            },
            _ => return Err(unexpected(node)),
        };
        self.variable_type(ty)?;
        self.out.push(' ');
        for (i, declarator) in declaration.declarators.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.node(declarator, Ctx::Declaring)?;
        }
        Ok(())
    }

    fn function_definition(&mut self, definition: &FunctionDefinitionNode) -> Result<(), CodegenError> {
        let function = definition.function();
        self.variable_type(&function.return_type)?;
        let name = self.function_name(function);
        self.out.push(' ');
        self.out.push_str(&name);
        self.depth += 1;
        self.parameters(&function.params)?;
        self.code_block(&definition.body)?;
        self.depth -= 1;
        Ok(())
    }

    fn if_else(&mut self, node: &IfElseNode) -> Result<(), CodegenError> {
        self.out.push_str("if (");
        self.node(&node.condition, Ctx::Read)?;
        self.out.push_str(")\n");
        self.depth += 1;
        self.code_block(&node.true_block)?;
        if let Some(false_block) = &node.false_block {
            self.out.push_str("else\n");
            self.code_block(false_block)?;
        }
        self.depth -= 1;
        Ok(())
    }

    fn loop_(&mut self, node: &LoopNode) -> Result<(), CodegenError> {
        self.depth += 1;
        match node.kind {
            LoopKind::For if node.unroll => return self.unrolled_loop(node),
            LoopKind::For => {
                self.out.push_str("for (");
                if let Some(init) = &node.init {
                    self.node(init, Ctx::Read)?;
                }
                self.out.push_str("; ");
                if let Some(condition) = &node.condition {
                    self.node(condition, Ctx::Read)?;
                }
                self.out.push_str("; ");
                if let Some(expression) = &node.expression {
                    self.node(expression, Ctx::Read)?;
                }
                self.out.push_str(")\n");
                self.code_block(&node.body)?;
            }
            LoopKind::While => {
                self.out.push_str("while (");
                self.loop_condition(node)?;
                self.out.push_str(")\n");
                self.code_block(&node.body)?;
            }
            LoopKind::DoWhile => {
                self.out.push_str("do\n");
                self.code_block(&node.body)?;
                self.out.push_str("while (");
                self.loop_condition(node)?;
                self.out.push_str(");\n");
            }
        }
        self.depth -= 1;
        Ok(())
    }

    fn loop_condition(&mut self, node: &LoopNode) -> Result<(), CodegenError> {
        match &node.condition {
            Some(condition) => self.node(condition, Ctx::Read),
            None => Err(CodegenError::UnexpectedNode {
                kind: NodeKind::Loop,
            }),
        }
    }

    /// A one-iteration `for` keeps `break` meaningful; the body is repeated inside it once per
    /// iteration with the index replaced by its value.
    fn unrolled_loop(&mut self, node: &LoopNode) -> Result<(), CodegenError> {
        let index = LoopIndex::analyse(node)?;
        let values = index.values()?;
        trace!(index = %index.variable.name, iterations = values.len(), "unrolling loop");

        let name = self.variable_name(&index.variable);
        let _ = writeln!(self.out, "for (int {name} = 0; {name} < 1; ++{name})");
        self.out.push_str("{\n");
        for value in values {
            self.unrolled.push((index.variable.id, value));
            let result = self.code_block(&node.body);
            self.unrolled.pop();
            result?;
        }
        self.out.push_str("}\n");
        self.depth -= 1;
        Ok(())
    }

    fn branch(&mut self, node: &BranchNode) -> Result<(), CodegenError> {
        self.out.push_str(node.op.keyword());
        if let Some(expression) = &node.expression {
            self.out.push(' ');
            self.node(expression, Ctx::Read)?;
        }
        Ok(())
    }

    // Expressions.

    fn node(&mut self, node: &Node, ctx: Ctx) -> Result<(), CodegenError> {
        match node {
            Node::Symbol(n) => {
                self.symbol(&n.variable, ctx);
                Ok(())
            }
            Node::Constant(n) => self.constant(node, &n.ty, &n.values),
            Node::Unary(n) => self.unary(n),
            Node::Binary(n) => self.binary(node, n, ctx),
            Node::Ternary(n) => {
                self.out.push_str("((");
                self.node(&n.condition, Ctx::Read)?;
                self.out.push_str(") ? (");
                self.node(&n.true_expression, Ctx::Read)?;
                self.out.push_str(") : (");
                self.node(&n.false_expression, Ctx::Read)?;
                self.out.push_str("))");
                Ok(())
            }
            Node::Swizzle(n) => {
                self.node(&n.operand, ctx)?;
                self.out.push('.');
                for &offset in &n.offsets {
                    let component = swizzle_component(offset).ok_or_else(|| unexpected(node))?;
                    self.out.push(component);
                }
                Ok(())
            }
            Node::Aggregate(n) => self.aggregate(n),
            Node::Block(n) => self.block(n),
            Node::Declaration(n) => self.declaration(node, n),
            Node::Prototype(n) => {
                self.variable_type(&n.function.return_type)?;
                let name = self.function_name(&n.function);
                self.out.push(' ');
                self.out.push_str(&name);
                self.parameters(&n.function.params)
            }
            Node::FunctionDefinition(n) => self.function_definition(n),
            Node::IfElse(n) => self.if_else(n),
            Node::Switch(n) => {
                self.out.push_str("switch (");
                self.node(&n.init, Ctx::Read)?;
                self.out.push_str(")\n");
                self.depth += 1;
                self.code_block(&n.body)?;
                self.depth -= 1;
                Ok(())
            }
            Node::Case(n) => {
                match &n.condition {
                    Some(condition) => {
                        self.out.push_str("case (");
                        self.node(condition, Ctx::Read)?;
                        self.out.push_str("):\n");
                    }
                    None => self.out.push_str("default:\n"),
                }
                Ok(())
            }
            Node::Loop(n) => self.loop_(n),
            Node::Branch(n) => self.branch(n),
            Node::InvariantDeclaration(n) => {
                let name = self.variable_name(&n.variable);
                let _ = write!(self.out, "invariant {name}");
                Ok(())
            }
        }
    }

    fn symbol(&mut self, variable: &Variable, ctx: Ctx) {
        if let Some(&(_, value)) = self.unrolled.iter().rev().find(|(id, _)| *id == variable.id) {
            let _ = write!(self.out, "{value}");
            return;
        }
        let rounding = if ctx == Ctx::Read {
            self.rounding(&variable.ty)
        } else {
            None
        };
        self.open_rounding(rounding);
        let name = self.variable_name(variable);
        self.out.push_str(&name);
        if ctx == Ctx::Declaring {
            self.array_brackets(&variable.ty);
        }
        self.close_rounding(rounding);
    }

    fn constant(&mut self, node: &Node, ty: &Type, values: &[ConstantUnion]) -> Result<(), CodegenError> {
        let mut values = values.iter();
        self.constant_value(node, ty, &mut values)
    }

    fn constant_value<'v>(
        &mut self,
        node: &Node,
        ty: &Type,
        values: &mut impl Iterator<Item = &'v ConstantUnion>,
    ) -> Result<(), CodegenError> {
        if ty.is_array() {
            let element = ty.indexed_type();
            let size = ty.array_size().ok_or_else(|| unexpected(node))?;
            let name = self.type_name(&element);
            let _ = write!(self.out, "{name}[{size}](");
            for i in 0..size {
                if i > 0 {
                    self.out.push_str(", ");
                }
                self.constant_value(node, &element, values)?;
            }
            self.out.push(')');
        } else if let Some(structure) = ty.struct_type() {
            let name = self.struct_name(structure);
            self.out.push_str(&name);
            self.out.push('(');
            for (i, field) in structure.fields.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                self.constant_value(node, &field.ty, values)?;
            }
            self.out.push(')');
        } else if ty.object_size() > 1 {
            let _ = write!(self.out, "{}(", ty.type_name());
            for i in 0..ty.object_size() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                let value = values.next().ok_or_else(|| unexpected(node))?;
                let _ = write!(self.out, "{value}");
            }
            self.out.push(')');
        } else {
            let value = values.next().ok_or_else(|| unexpected(node))?;
            let _ = write!(self.out, "{value}");
        }
        Ok(())
    }

    fn unary(&mut self, node: &UnaryNode) -> Result<(), CodegenError> {
        use Operator::*;
        let (pre, post, ctx) = match node.op {
            Negative => ("(-", ")", Ctx::Read),
            Positive => ("(+", ")", Ctx::Read),
            LogicalNot => ("(!", ")", Ctx::Read),
            BitwiseNot => ("(~", ")", Ctx::Read),
            PostIncrement => ("(", "++)", Ctx::LValue),
            PostDecrement => ("(", "--)", Ctx::LValue),
            PreIncrement => ("(++", ")", Ctx::LValue),
            PreDecrement => ("(--", ")", Ctx::LValue),
            op => {
                let name = op
                    .function_name()
                    .ok_or(CodegenError::UnsupportedOperator { op })?;
                let head = if node.use_emulated_function {
                    emulated_function_name(name)
                } else {
                    name.to_owned()
                };
                let rounding = self.rounding(&node.ty);
                return self.call(&head, rounding, &[&*node.operand], None);
            }
        };
        self.out.push_str(pre);
        self.node(&node.operand, ctx)?;
        self.out.push_str(post);
        Ok(())
    }

    fn binary(&mut self, node: &Node, binary: &BinaryNode, ctx: Ctx) -> Result<(), CodegenError> {
        match binary.op {
            Operator::Initialize => {
                self.node(&binary.left, Ctx::Declaring)?;
                self.out.push_str(" = ");
                self.node(&binary.right, Ctx::Read)
            }
            Operator::Assign => {
                // The stored value is already rounded on the right-hand side.
                self.out.push('(');
                self.node(&binary.left, Ctx::LValue)?;
                self.out.push_str(" = ");
                self.node(&binary.right, Ctx::Read)?;
                self.out.push(')');
                Ok(())
            }
            op if op.is_compound_assignment() => self.compound_assignment(binary),
            Operator::IndexDirect => {
                self.node(&binary.left, ctx)?;
                self.out.push('[');
                self.node(&binary.right, Ctx::Read)?;
                self.out.push(']');
                Ok(())
            }
            Operator::IndexIndirect => {
                self.node(&binary.left, ctx)?;
                self.indirect_index(binary)
            }
            Operator::IndexDirectStruct => {
                // The struct itself is never rounded, so a field read is wrapped here.
                let rounding = if ctx == Ctx::Read {
                    self.rounding(&binary.ty)
                } else {
                    None
                };
                self.open_rounding(rounding);
                self.node(&binary.left, ctx)?;
                let field = binary
                    .left
                    .ty()
                    .and_then(Type::struct_type)
                    .zip(
                        binary
                            .right
                            .as_constant()
                            .and_then(|c| c.values.first().copied())
                            .and_then(ConstantUnion::as_i64)
                            .and_then(|i| usize::try_from(i).ok()),
                    )
                    .and_then(|(structure, index)| {
                        structure
                            .fields
                            .get(index)
                            .map(|field| (structure.builtin, field.name.clone()))
                    });
                let Some((builtin, field)) = field else {
                    return Err(unexpected(node));
                };
                let name = if builtin { field } else { self.hash(&field) };
                self.out.push('.');
                self.out.push_str(&name);
                self.close_rounding(rounding);
                Ok(())
            }
            Operator::Comma => {
                self.out.push('(');
                self.node(&binary.left, Ctx::Read)?;
                self.out.push_str(", ");
                self.node(&binary.right, Ctx::Read)?;
                self.out.push(')');
                Ok(())
            }
            op => {
                if let Some(symbol) = infix(op) {
                    let rounding = self.rounding(&binary.ty);
                    self.open_rounding(rounding);
                    self.out.push('(');
                    self.node(&binary.left, Ctx::Read)?;
                    self.out.push_str(symbol);
                    self.node(&binary.right, Ctx::Read)?;
                    self.out.push(')');
                    self.close_rounding(rounding);
                    return Ok(());
                }
                let name = op
                    .function_name()
                    .ok_or(CodegenError::UnsupportedOperator { op })?;
                let rounding = self.rounding(&binary.ty);
                self.call(name, rounding, &[&*binary.left, &*binary.right], None)
            }
        }
    }

    fn compound_assignment(&mut self, binary: &BinaryNode) -> Result<(), CodegenError> {
        let op = binary.op;
        let emulated = self.rounding(&binary.ty).zip(CompoundOp::from_operator(op));
        let (Some((rounding, compound)), Some(lhs), Some(rhs)) =
            (emulated, binary.left.ty(), binary.right.ty())
        else {
            let symbol = compound_infix(op).ok_or(CodegenError::UnsupportedOperator { op })?;
            self.out.push('(');
            self.node(&binary.left, Ctx::LValue)?;
            self.out.push_str(symbol);
            self.node(&binary.right, Ctx::Read)?;
            self.out.push(')');
            return Ok(());
        };

        let helper = CompoundHelper {
            op: compound,
            rounding,
            lhs: self.type_name(lhs),
            rhs: self.type_name(rhs),
        };
        self.helpers.compound.insert(helper);
        self.out
            .push_str(&CompoundHelper::function_name(compound, rounding));
        self.out.push('(');
        self.node(&binary.left, Ctx::LValue)?;
        self.out.push_str(", ");
        self.node(&binary.right, Ctx::Read)?;
        self.out.push(')');
        Ok(())
    }

    fn indirect_index(&mut self, binary: &BinaryNode) -> Result<(), CodegenError> {
        let bound = if binary.add_index_clamp {
            binary.left.ty().and_then(clamp_bound)
        } else {
            None
        };
        match (bound, self.config.clamp_strategy) {
            (None, _) => {
                self.out.push('[');
                self.node(&binary.right, Ctx::Read)?;
                self.out.push(']');
            }
            (Some(max), ClampStrategy::ClampIntrinsic) => {
                self.out.push_str("[int(clamp(float(");
                self.node(&binary.right, Ctx::Read)?;
                let _ = write!(self.out, "), 0.0, float({max})))]");
            }
            (Some(max), ClampStrategy::WebglIntClamp) => {
                self.helpers.int_clamp = true;
                self.out.push_str("[webgl_int_clamp(");
                self.node(&binary.right, Ctx::Read)?;
                let _ = write!(self.out, ", 0, {max})]");
            }
        }
        Ok(())
    }

    fn aggregate(&mut self, node: &AggregateNode) -> Result<(), CodegenError> {
        let args: Vec<&Node> = node.args.iter().collect();
        let callee = || {
            node.function.as_deref().ok_or_else(|| CodegenError::MissingFunction {
                name: node.op.to_string(),
            })
        };
        match node.op {
            Operator::CallFunctionInAst => {
                let function = callee()?;
                let name = self.function_name(function);
                self.call(&name, None, &args, Some(function))
            }
            Operator::CallInternalRawFunction => {
                let function = callee()?;
                self.call(&function.name, None, &args, Some(function))
            }
            Operator::CallBuiltInFunction => {
                let function = callee()?;
                let name = translate_texture_function(&function.name, self.config.output);
                let rounding = self.rounding(&node.ty);
                self.call(name, rounding, &args, Some(function))
            }
            Operator::Construct => {
                let ty = &node.ty;
                let head = if ty.is_array() {
                    let element = ty.indexed_type();
                    let size = ty.array_size().map_or(args.len(), |n| n as usize);
                    format!("{}[{size}]", self.type_name(&element))
                } else {
                    self.type_name(ty)
                };
                let rounding = if ty.is_scalar() {
                    None
                } else {
                    self.rounding(ty)
                };
                self.call(&head, rounding, &args, None)
            }
            op => {
                let name = op
                    .function_name()
                    .ok_or(CodegenError::UnsupportedOperator { op })?;
                let head = if node.use_emulated_function {
                    emulated_function_name(name)
                } else {
                    name.to_owned()
                };
                let rounding = self.rounding(&node.ty);
                self.call(&head, rounding, &args, node.function.as_deref())
            }
        }
    }

    fn call(
        &mut self,
        head: &str,
        rounding: Option<Rounding>,
        args: &[&Node],
        function: Option<&Function>,
    ) -> Result<(), CodegenError> {
        self.open_rounding(rounding);
        self.out.push_str(head);
        self.out.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            let ctx = if function.is_some_and(|f| f.param_is_out(i)) {
                Ctx::OutArgument
            } else {
                Ctx::Read
            };
            self.node(arg, ctx)?;
        }
        self.out.push(')');
        self.close_rounding(rounding);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ast::build;
    use crate::builtins::build_registry;
    use crate::glsl::names::xxh3_name_hash;
    use crate::glsl::{write_body, OutputType};
    use crate::resources::{BuiltInResources, ShaderSpec, ShaderStage};
    use crate::symbol::IdAllocator;
    use crate::symbol_table::BuiltInRegistry;
    use crate::types::{BasicType, Field};

    fn registry() -> Arc<BuiltInRegistry> {
        build_registry(
            ShaderStage::Fragment,
            ShaderSpec::Gles2,
            &BuiltInResources::default(),
        )
    }

    fn config(builtins: &BuiltInRegistry) -> GlslConfig<'_> {
        GlslConfig {
            output: OutputType::Essl,
            shader_version: 100,
            clamp_strategy: ClampStrategy::ClampIntrinsic,
            emulate_precision: false,
            hash_function: None,
            builtins,
        }
    }

    fn emit(root: &Node, config: &GlslConfig<'_>) -> GlslBody {
        let mut names = NameMap::new();
        write_body(root, config, &mut names).expect("codegen")
    }

    fn main_with(ids: &mut IdAllocator, body: Vec<Node>) -> Node {
        let main = ids.new_function("main", Type::void(), vec![]);
        build::function(&main, body)
    }

    fn medium_float(ids: &mut IdAllocator, name: &str, qualifier: Qualifier) -> Arc<Variable> {
        ids.new_variable(name, Type::new(BasicType::Float, Precision::Medium, qualifier, 1))
    }

    #[test]
    fn declarations_and_statements() {
        let registry = registry();
        let mut ids = IdAllocator::starting_at(registry.first_user_id());
        let u = ids.new_variable(
            "u",
            Type::new(BasicType::Float, Precision::High, Qualifier::Uniform, 4),
        );
        let x = medium_float(&mut ids, "x", Qualifier::Temporary);
        let main = main_with(
            &mut ids,
            vec![
                build::declare_init(&x, build::float(1.0)),
                build::assign(build::symbol(&x), build::add(build::symbol(&x), build::float(2.0))),
            ],
        );
        let root = build::block(vec![build::declare(&u), main]);

        let body = emit(&root, &config(&registry));
        assert_eq!(
            body.text,
            "uniform highp vec4 u;\nvoid main(){\nmediump float x = 1.0;\n(x = (x + 2.0));\n}\n"
        );
        assert_eq!(body.helpers, HelperUsage::default());
    }

    #[test]
    fn desktop_output_drops_precision() {
        let registry = registry();
        let mut ids = IdAllocator::starting_at(registry.first_user_id());
        let v = ids.new_variable(
            "v",
            Type::new(BasicType::Float, Precision::Medium, Qualifier::VaryingIn, 2),
        );
        let root = build::block(vec![build::declare(&v)]);

        let mut config = config(&registry);
        config.output = OutputType::Glsl { version: 110 };
        assert_eq!(emit(&root, &config).text, "varying vec2 v;\n");
        config.output = OutputType::Glsl { version: 150 };
        assert_eq!(emit(&root, &config).text, "in vec2 v;\n");
    }

    #[test]
    fn precision_emulation_rounds_each_read_once() {
        let registry = registry();
        let mut ids = IdAllocator::starting_at(registry.first_user_id());
        let x = medium_float(&mut ids, "x", Qualifier::Global);
        let y = medium_float(&mut ids, "y", Qualifier::Uniform);
        let main = main_with(
            &mut ids,
            vec![
                build::assign(build::symbol(&x), build::mul(build::symbol(&y), build::symbol(&y))),
                build::binary(Operator::AddAssign, build::symbol(&x), build::symbol(&y)),
            ],
        );
        let root = build::block(vec![main]);

        let mut config = config(&registry);
        config.emulate_precision = true;
        let body = emit(&root, &config);
        assert_eq!(
            body.text,
            "void main(){\n\
             (x = webgl_frm((webgl_frm(y) * webgl_frm(y))));\n\
             webgl_compound_add_frm(x, webgl_frm(y));\n\
             }\n"
        );
        let helper = CompoundHelper {
            op: CompoundOp::Add,
            rounding: Rounding::Medium,
            lhs: "float".to_owned(),
            rhs: "float".to_owned(),
        };
        assert!(body.helpers.compound.contains(&helper));

        config.emulate_precision = false;
        assert!(!emit(&root, &config).text.contains("webgl_frm"));
    }

    #[test]
    fn hashed_names_are_recorded() {
        let registry = registry();
        let mut ids = IdAllocator::starting_at(registry.first_user_id());
        let helper = ids.new_function("helper", Type::void(), vec![]);
        let main = main_with(&mut ids, vec![build::call(&helper, vec![])]);
        let root = build::block(vec![build::function(&helper, vec![]), main]);

        let mut config = config(&registry);
        config.hash_function = Some(xxh3_name_hash);
        let mut names = NameMap::new();
        let body = write_body(&root, &config, &mut names).expect("codegen");

        let hashed = names.get("helper").expect("helper hashed");
        assert!(hashed.starts_with("webgl_"));
        assert!(body.text.contains(&format!("void {hashed}(){{")));
        assert!(body.text.contains(&format!("{hashed}();")));
        assert!(body.text.contains("void main(){"));
        assert_eq!(names.get("main"), None);
    }

    #[test]
    fn flagged_indices_are_clamped() {
        let registry = registry();
        let mut ids = IdAllocator::starting_at(registry.first_user_id());
        let arr = ids.new_variable(
            "arr",
            Type::new(BasicType::Float, Precision::High, Qualifier::Uniform, 4).with_array_size(3),
        );
        let i = ids.new_variable(
            "i",
            Type::new(BasicType::Int, Precision::High, Qualifier::Uniform, 1),
        );
        let mut index = build::index(build::symbol(&arr), build::symbol(&i));
        if let Node::Binary(b) = &mut index {
            b.add_index_clamp = true;
        }
        let root = build::block(vec![main_with(&mut ids, vec![index])]);

        let mut config = config(&registry);
        let body = emit(&root, &config);
        assert!(body.text.contains("arr[int(clamp(float(i), 0.0, float(2)))];"));
        assert!(!body.helpers.int_clamp);

        config.clamp_strategy = ClampStrategy::WebglIntClamp;
        let body = emit(&root, &config);
        assert!(body.text.contains("arr[webgl_int_clamp(i, 0, 2)];"));
        assert!(body.helpers.int_clamp);
    }

    #[test]
    fn marked_loops_are_unrolled() {
        let registry = registry();
        let mut ids = IdAllocator::starting_at(registry.first_user_id());
        let arr = ids.new_variable(
            "arr",
            Type::new(BasicType::Float, Precision::High, Qualifier::Uniform, 1).with_array_size(2),
        );
        let sum = ids.new_variable(
            "sum",
            Type::new(BasicType::Float, Precision::High, Qualifier::Global, 1),
        );
        let i = ids.new_variable(
            "i",
            Type::new(BasicType::Int, Precision::High, Qualifier::Temporary, 1),
        );
        let mut loop_ = build::for_loop(
            Some(build::declare_init(&i, build::int(0))),
            Some(build::binary(Operator::LessThan, build::symbol(&i), build::int(2))),
            Some(build::unary(Operator::PreIncrement, build::symbol(&i))),
            build::block(vec![build::assign(
                build::symbol(&sum),
                build::add(
                    build::symbol(&sum),
                    build::index(build::symbol(&arr), build::symbol(&i)),
                ),
            )]),
        );
        let root = build::block(vec![main_with(&mut ids, vec![loop_.clone()])]);
        let rolled = emit(&root, &config(&registry)).text;
        assert!(rolled.contains("for (highp int i = 0; (i < 2); (++i))\n"));

        if let Node::Loop(l) = &mut loop_ {
            l.unroll = true;
        }
        let root = build::block(vec![main_with(&mut ids, vec![loop_])]);
        assert_eq!(
            emit(&root, &config(&registry)).text,
            "void main(){\n\
             for (int i = 0; i < 1; ++i)\n\
             {\n\
             {\n(sum = (sum + arr[0]));\n}\n\
             {\n(sum = (sum + arr[1]));\n}\n\
             }\n\
             }\n"
        );
    }

    #[test]
    fn named_structs_are_declared_once() {
        let registry = registry();
        let mut ids = IdAllocator::starting_at(registry.first_user_id());
        let light = ids.new_struct(
            "Light",
            vec![Field {
                name: "power".to_owned(),
                ty: Type::temp(BasicType::Float, Precision::Medium, 1),
            }],
        );
        let a = ids.new_variable("a", Type::structure(Arc::clone(&light), Qualifier::Uniform));
        let b = ids.new_variable("b", Type::structure(light, Qualifier::Uniform));
        let root = build::block(vec![build::declare(&a), build::declare(&b)]);

        assert_eq!(
            emit(&root, &config(&registry)).text,
            "uniform struct Light{\nmediump float power;\n} a;\nuniform Light b;\n"
        );
    }

    #[test]
    fn bad_swizzle_is_an_error() {
        let registry = registry();
        let mut ids = IdAllocator::starting_at(registry.first_user_id());
        let v = ids.new_variable(
            "v",
            Type::new(BasicType::Float, Precision::High, Qualifier::Uniform, 4),
        );
        let root = build::block(vec![main_with(
            &mut ids,
            vec![build::swizzle(build::symbol(&v), &[0, 7])],
        )]);
        let mut names = NameMap::new();
        assert_eq!(
            write_body(&root, &config(&registry), &mut names).map(|b| b.text),
            Err(CodegenError::UnexpectedNode {
                kind: NodeKind::Swizzle
            })
        );
    }
}
