//! Precision emulation.
//!
//! Every lowp/mediump float value read by the shader is passed through a rounding function that
//! reproduces the precision a mobile GPU would have, so desktop drivers show the same artifacts.
//! Compound assignments cannot be wrapped in place and go through generated helpers instead.

use std::fmt::Write;

use crate::operator::Operator;
use crate::types::{Precision, Type};

/// Which rounding function applies to a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rounding {
    /// IEEE half float: 10 mantissa bits, 5 exponent bits.
    Medium,
    /// 8 fractional bits in [-2, 2].
    Low,
}

impl Rounding {
    pub fn function(self) -> &'static str {
        match self {
            Rounding::Medium => "webgl_frm",
            Rounding::Low => "webgl_frl",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Rounding::Medium => "frm",
            Rounding::Low => "frl",
        }
    }
}

/// Rounding to apply to a value of type `ty`, if any. Non-square matrices and arrays have no
/// helper and stay unrounded.
pub fn rounding_for(ty: &Type) -> Option<Rounding> {
    if !ty.is_float() || ty.is_non_square_matrix() || ty.is_array() || ty.struct_type().is_some() {
        return None;
    }
    match ty.precision {
        Precision::Medium => Some(Rounding::Medium),
        Precision::Low => Some(Rounding::Low),
        Precision::High | Precision::Undefined => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompoundOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl CompoundOp {
    pub fn from_operator(op: Operator) -> Option<Self> {
        Some(match op {
            Operator::AddAssign => CompoundOp::Add,
            Operator::SubAssign => CompoundOp::Sub,
            Operator::DivAssign => CompoundOp::Div,
            Operator::MulAssign
            | Operator::VectorTimesMatrixAssign
            | Operator::VectorTimesScalarAssign
            | Operator::MatrixTimesScalarAssign
            | Operator::MatrixTimesMatrixAssign => CompoundOp::Mul,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            CompoundOp::Add => "add",
            CompoundOp::Sub => "sub",
            CompoundOp::Mul => "mul",
            CompoundOp::Div => "div",
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CompoundOp::Add => "+",
            CompoundOp::Sub => "-",
            CompoundOp::Mul => "*",
            CompoundOp::Div => "/",
        }
    }
}

/// One overload of a `webgl_compound_*` helper, keyed by the operand type spellings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompoundHelper {
    pub op: CompoundOp,
    pub rounding: Rounding,
    pub lhs: String,
    pub rhs: String,
}

impl CompoundHelper {
    pub fn function_name(op: CompoundOp, rounding: Rounding) -> String {
        format!("webgl_compound_{}_{}", op.name(), rounding.suffix())
    }

    pub fn write_definition(&self, out: &mut String) {
        let name = Self::function_name(self.op, self.rounding);
        let _ = writeln!(
            out,
            "{lhs} {name}(inout {lhs} x, in {rhs} y) {{",
            lhs = self.lhs,
            rhs = self.rhs
        );
        let _ = writeln!(
            out,
            "    x = {}(x {} y);",
            self.rounding.function(),
            self.op.symbol()
        );
        out.push_str("    return x;\n}\n");
    }
}

fn write_vector_helpers(out: &mut String, size: u8) {
    let _ = write!(
        out,
        "vec{size} webgl_frm(in vec{size} v) {{\n\
         \x20   v = clamp(v, -65504.0, 65504.0);\n\
         \x20   vec{size} exponent = floor(log2(abs(v) + 1e-30)) - 10.0;\n\
         \x20   bvec{size} isNonZero = greaterThanEqual(exponent, vec{size}(-25.0));\n\
         \x20   v = v * exp2(-exponent);\n\
         \x20   v = sign(v) * floor(abs(v));\n\
         \x20   return v * exp2(exponent) * vec{size}(isNonZero);\n\
         }}\n\
         vec{size} webgl_frl(in vec{size} v) {{\n\
         \x20   v = clamp(v, -2.0, 2.0);\n\
         \x20   v = v * 256.0;\n\
         \x20   v = sign(v) * floor(abs(v));\n\
         \x20   return v * 0.00390625;\n\
         }}\n"
    );
}

fn write_matrix_helpers(out: &mut String, rounding: Rounding) {
    let function = rounding.function();
    for size in 2..=4u8 {
        let _ = writeln!(out, "mat{size} {function}(in mat{size} m) {{");
        let _ = writeln!(out, "    mat{size} rounded;");
        for column in 0..size {
            let _ = writeln!(out, "    rounded[{column}] = {function}(m[{column}]);");
        }
        out.push_str("    return rounded;\n}\n");
    }
}

/// Writes `webgl_frm` and `webgl_frl` for float, vec2-4 and mat2-4.
///
/// Values below 2^-15 in magnitude are subnormal in half precision and flush to zero; the
/// `1e-30` bias only keeps `log2` finite for those.
pub fn write_rounding_helpers(out: &mut String) {
    out.push_str(
        "float webgl_frm(in float x) {\n\
         \x20   x = clamp(x, -65504.0, 65504.0);\n\
         \x20   float exponent = floor(log2(abs(x) + 1e-30)) - 10.0;\n\
         \x20   bool isNonZero = (exponent >= -25.0);\n\
         \x20   x = x * exp2(-exponent);\n\
         \x20   x = sign(x) * floor(abs(x));\n\
         \x20   return x * exp2(exponent) * float(isNonZero);\n\
         }\n\
         float webgl_frl(in float x) {\n\
         \x20   x = clamp(x, -2.0, 2.0);\n\
         \x20   x = x * 256.0;\n\
         \x20   x = sign(x) * floor(abs(x));\n\
         \x20   return x * 0.00390625;\n\
         }\n",
    );
    for size in 2..=4 {
        write_vector_helpers(out, size);
    }
    write_matrix_helpers(out, Rounding::Medium);
    write_matrix_helpers(out, Rounding::Low);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BasicType, Qualifier};

    #[test]
    fn only_low_and_medium_floats_round() {
        let float = |p| Type::temp(BasicType::Float, p, 3);
        assert_eq!(rounding_for(&float(Precision::Medium)), Some(Rounding::Medium));
        assert_eq!(rounding_for(&float(Precision::Low)), Some(Rounding::Low));
        assert_eq!(rounding_for(&float(Precision::High)), None);
        assert_eq!(rounding_for(&Type::temp(BasicType::Int, Precision::Low, 1)), None);
        assert_eq!(
            rounding_for(&Type::matrix(Precision::Medium, Qualifier::Temporary, 2, 3)),
            None
        );
        assert_eq!(
            rounding_for(&float(Precision::Medium).with_array_size(2)),
            None
        );
    }

    #[test]
    fn compound_helper_definition() {
        let helper = CompoundHelper {
            op: CompoundOp::Mul,
            rounding: Rounding::Low,
            lhs: "vec4".to_owned(),
            rhs: "mat4".to_owned(),
        };
        let mut out = String::new();
        helper.write_definition(&mut out);
        pretty_assertions::assert_eq!(
            out,
            "vec4 webgl_compound_mul_frl(inout vec4 x, in mat4 y) {\n    x = webgl_frl(x * y);\n    return x;\n}\n"
        );
    }

    #[test]
    fn rounding_helpers_cover_every_shape() {
        let mut out = String::new();
        write_rounding_helpers(&mut out);
        for signature in [
            "float webgl_frm(in float x)",
            "vec3 webgl_frl(in vec3 v)",
            "mat4 webgl_frm(in mat4 m)",
            "mat2 webgl_frl(in mat2 m)",
        ] {
            assert!(out.contains(signature), "missing {signature}");
        }
        assert!(out.contains("    rounded[3] = webgl_frl(m[3]);\n"));
    }
}
