//! Replacement definitions for built-in functions that some drivers evaluate incorrectly on
//! scalar `float` arguments.

use std::collections::BTreeSet;
use std::fmt::Write;

use tracing::debug;

use crate::ast::Node;
use crate::glsl::OutputType;
use crate::operator::Operator;
use crate::types::Type;

/// Name of the helper that stands in for built-in `name`.
pub fn emulated_function_name(name: &str) -> String {
    format!("webgl_{name}_emu")
}

fn is_float_scalar(ty: Option<&Type>) -> bool {
    ty.is_some_and(|t| t.is_float() && t.is_scalar() && !t.is_array())
}

fn is_emulated(op: Operator) -> bool {
    matches!(
        op,
        Operator::Length
            | Operator::Distance
            | Operator::Dot
            | Operator::Normalize
            | Operator::FaceForward
            | Operator::Cos
    )
}

/// (parameter list, body expression) of the float overload of each emulated function.
fn definition(op: Operator) -> Option<(&'static [&'static str], &'static str)> {
    Some(match op {
        Operator::Length => (&["a"], "abs(a)"),
        Operator::Distance => (&["a", "b"], "abs(a - b)"),
        Operator::Dot => (&["a", "b"], "a * b"),
        Operator::Normalize => (&["a"], "sign(a)"),
        Operator::FaceForward => (&["N", "I", "Nref"], "((I * Nref >= 0.0) ? -N : N)"),
        Operator::Cos => (&["a"], "cos(a)"),
        _ => return None,
    })
}

/// Collects the emulated functions a shader uses and writes their definitions.
#[derive(Debug, Default)]
pub struct BuiltInFunctionEmulator {
    used: BTreeSet<Operator>,
}

impl BuiltInFunctionEmulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    pub fn clear(&mut self) {
        self.used.clear();
    }

    /// Flags every emulated call on scalar floats in `root` and records the function as used.
    pub fn mark(&mut self, root: &mut Node) {
        let used = &mut self.used;
        root.for_each_mut(&mut |node: &mut Node| match node {
            Node::Unary(unary) if is_emulated(unary.op) && is_float_scalar(unary.operand.ty()) => {
                unary.use_emulated_function = true;
                used.insert(unary.op);
            }
            Node::Aggregate(aggregate)
                if is_emulated(aggregate.op)
                    && aggregate.args.first().is_some_and(|a| is_float_scalar(a.ty())) =>
            {
                aggregate.use_emulated_function = true;
                used.insert(aggregate.op);
            }
            _ => {}
        });
        if !self.used.is_empty() {
            debug!(functions = self.used.len(), "built-in functions emulated");
        }
    }

    pub fn write_definitions(&self, out: &mut String, output: OutputType) {
        if self.used.is_empty() {
            return;
        }
        let float = if output.writes_precision() {
            out.push_str(
                "#if defined(GL_FRAGMENT_PRECISION_HIGH)\n\
                 #define webgl_emu_precision highp\n\
                 #else\n\
                 #define webgl_emu_precision mediump\n\
                 #endif\n\n",
            );
            "webgl_emu_precision float"
        } else {
            "float"
        };
        for &op in &self.used {
            let (Some(name), Some((params, body))) = (op.function_name(), definition(op)) else {
                continue;
            };
            let params = params
                .iter()
                .map(|p| format!("{float} {p}"))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(
                out,
                "{float} {}({params}) {{\n    return {body};\n}}",
                emulated_function_name(name)
            );
        }
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::symbol::IdAllocator;
    use crate::types::{BasicType, Precision, Qualifier};

    fn unary(op: Operator, ty: Type) -> Node {
        let mut ids = IdAllocator::default();
        let v = ids.new_variable("v", ty.with_qualifier(Qualifier::Uniform));
        build::unary(op, build::symbol(&v))
    }

    #[test]
    fn only_scalar_float_calls_are_marked() {
        let scalar = Type::temp(BasicType::Float, Precision::High, 1);
        let vector = Type::temp(BasicType::Float, Precision::High, 3);
        let mut root = build::block(vec![
            build::unary(Operator::Length, unary(Operator::Cos, scalar)),
            unary(Operator::Normalize, vector),
        ]);

        let mut emulator = BuiltInFunctionEmulator::new();
        emulator.mark(&mut root);

        let Node::Block(block) = &root else {
            panic!("expected block");
        };
        let flags: Vec<bool> = block
            .statements
            .iter()
            .map(|s| matches!(s, Node::Unary(u) if u.use_emulated_function))
            .collect();
        assert_eq!(flags, vec![true, false]);
        assert_eq!(
            emulator.used.iter().copied().collect::<Vec<_>>(),
            vec![Operator::Cos, Operator::Length]
        );
    }

    #[test]
    fn definitions_are_written_once() {
        let mut emulator = BuiltInFunctionEmulator::new();
        emulator.used.insert(Operator::FaceForward);

        let mut out = String::new();
        emulator.write_definitions(&mut out, OutputType::Glsl { version: 120 });
        pretty_assertions::assert_eq!(
            out,
            "float webgl_faceforward_emu(float N, float I, float Nref) {\n    \
             return ((I * Nref >= 0.0) ? -N : N);\n}\n\n"
        );

        let mut essl = String::new();
        emulator.write_definitions(&mut essl, OutputType::Essl);
        assert!(essl.starts_with("#if defined(GL_FRAGMENT_PRECISION_HIGH)\n"));
        assert!(essl.contains("webgl_emu_precision float webgl_faceforward_emu("));
    }
}
