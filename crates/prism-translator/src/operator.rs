use std::fmt;

/// Internal operator codes carried by unary, binary and aggregate nodes.
///
/// Built-in functions that the registrar relates to an operator are represented by that
/// operator directly instead of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    // Calls.
    CallFunctionInAst,
    CallBuiltInFunction,
    CallInternalRawFunction,
    /// Constructor; the node type says what is constructed.
    Construct,

    // Unary.
    Negative,
    Positive,
    LogicalNot,
    VectorLogicalNot,
    BitwiseNot,
    PostIncrement,
    PostDecrement,
    PreIncrement,
    PreDecrement,

    // Binary arithmetic.
    Add,
    Sub,
    Mul,
    Div,
    IMod,
    VectorTimesScalar,
    VectorTimesMatrix,
    MatrixTimesVector,
    MatrixTimesScalar,
    MatrixTimesMatrix,
    BitShiftLeft,
    BitShiftRight,
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,

    // Comparison and logic.
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
    LogicalOr,
    LogicalXor,
    LogicalAnd,

    // Indexing and sequencing.
    IndexDirect,
    IndexIndirect,
    IndexDirectStruct,
    Comma,

    // Assignment.
    Assign,
    Initialize,
    AddAssign,
    SubAssign,
    MulAssign,
    VectorTimesMatrixAssign,
    VectorTimesScalarAssign,
    MatrixTimesScalarAssign,
    MatrixTimesMatrixAssign,
    DivAssign,
    IModAssign,
    BitShiftLeftAssign,
    BitShiftRightAssign,
    BitwiseAndAssign,
    BitwiseXorAssign,
    BitwiseOrAssign,

    // Built-in functions: angle and trigonometry.
    Radians,
    Degrees,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,

    // Exponential.
    Pow,
    Exp,
    Log,
    Exp2,
    Log2,
    Sqrt,
    InverseSqrt,

    // Common.
    Abs,
    Sign,
    Floor,
    Ceil,
    Fract,
    Mod,
    Min,
    Max,
    Clamp,
    Mix,
    Step,
    SmoothStep,

    // Geometric.
    Length,
    Distance,
    Dot,
    Cross,
    Normalize,
    FaceForward,
    Reflect,
    Refract,

    // Matrix and vector relational.
    MatrixCompMult,
    VectorEqual,
    VectorNotEqual,
    VectorLessThan,
    VectorGreaterThan,
    VectorLessThanEqual,
    VectorGreaterThanEqual,
    Any,
    All,

    // Derivatives.
    DFdx,
    DFdy,
    Fwidth,
}

impl Operator {
    /// GLSL function spelling for operators that originate from built-in function calls.
    pub fn function_name(self) -> Option<&'static str> {
        use Operator::*;
        Some(match self {
            Radians => "radians",
            Degrees => "degrees",
            Sin => "sin",
            Cos => "cos",
            Tan => "tan",
            Asin => "asin",
            Acos => "acos",
            Atan => "atan",
            Pow => "pow",
            Exp => "exp",
            Log => "log",
            Exp2 => "exp2",
            Log2 => "log2",
            Sqrt => "sqrt",
            InverseSqrt => "inversesqrt",
            Abs => "abs",
            Sign => "sign",
            Floor => "floor",
            Ceil => "ceil",
            Fract => "fract",
            Mod => "mod",
            Min => "min",
            Max => "max",
            Clamp => "clamp",
            Mix => "mix",
            Step => "step",
            SmoothStep => "smoothstep",
            Length => "length",
            Distance => "distance",
            Dot => "dot",
            Cross => "cross",
            Normalize => "normalize",
            FaceForward => "faceforward",
            Reflect => "reflect",
            Refract => "refract",
            MatrixCompMult => "matrixCompMult",
            VectorEqual => "equal",
            VectorNotEqual => "notEqual",
            VectorLessThan => "lessThan",
            VectorGreaterThan => "greaterThan",
            VectorLessThanEqual => "lessThanEqual",
            VectorGreaterThanEqual => "greaterThanEqual",
            Any => "any",
            All => "all",
            VectorLogicalNot => "not",
            DFdx => "dFdx",
            DFdy => "dFdy",
            Fwidth => "fwidth",
            _ => return None,
        })
    }

    pub fn is_assignment(self) -> bool {
        self == Operator::Assign || self == Operator::Initialize || self.is_compound_assignment()
    }

    pub fn is_compound_assignment(self) -> bool {
        use Operator::*;
        matches!(
            self,
            AddAssign
                | SubAssign
                | MulAssign
                | VectorTimesMatrixAssign
                | VectorTimesScalarAssign
                | MatrixTimesScalarAssign
                | MatrixTimesMatrixAssign
                | DivAssign
                | IModAssign
                | BitShiftLeftAssign
                | BitShiftRightAssign
                | BitwiseAndAssign
                | BitwiseXorAssign
                | BitwiseOrAssign
        )
    }

    pub fn is_increment_or_decrement(self) -> bool {
        matches!(
            self,
            Operator::PostIncrement
                | Operator::PostDecrement
                | Operator::PreIncrement
                | Operator::PreDecrement
        )
    }

    pub fn is_call(self) -> bool {
        matches!(
            self,
            Operator::CallFunctionInAst
                | Operator::CallBuiltInFunction
                | Operator::CallInternalRawFunction
        )
    }

    /// Whether the result is a boolean computed from the operands rather than an arithmetic
    /// value of the operand type.
    pub fn is_comparison(self) -> bool {
        use Operator::*;
        matches!(
            self,
            Equal | NotEqual | LessThan | GreaterThan | LessThanEqual | GreaterThanEqual
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.function_name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{self:?}"),
        }
    }
}
