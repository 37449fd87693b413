//! AST to GLSL / ESSL source text.

pub mod names;
mod output;
pub mod precision;
pub mod unroll;

use std::collections::BTreeSet;

use thiserror::Error;

use crate::ast::{Node, NodeKind};
use crate::operator::Operator;
use crate::symbol_table::BuiltInRegistry;
use crate::types::Type;

pub use names::{HashFunction, NameMap};
pub use precision::{CompoundHelper, Rounding};

/// Target dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputType {
    /// GLSL ES, with precision qualifiers.
    #[default]
    Essl,
    /// Desktop GLSL of the given `#version`.
    Glsl { version: u32 },
}

impl OutputType {
    pub fn writes_precision(self) -> bool {
        self == OutputType::Essl
    }

    /// Whether stage inputs and outputs are spelled `in`/`out` instead of
    /// `attribute`/`varying`.
    pub fn uses_in_out(self) -> bool {
        matches!(self, OutputType::Glsl { version } if version >= 130)
    }
}

/// How flagged indirect indices are kept in bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClampStrategy {
    /// `int(clamp(float(i), 0.0, float(max)))`
    #[default]
    ClampIntrinsic,
    /// A call to the generated `webgl_int_clamp` helper.
    WebglIntClamp,
}

#[derive(Debug, Error, PartialEq)]
pub enum CodegenError {
    #[error("operator {op} has no GLSL spelling")]
    UnsupportedOperator { op: Operator },
    #[error("call to {name} has no callee")]
    MissingFunction { name: String },
    #[error("cannot unroll loop: {reason}")]
    UnrollableLoop { reason: String },
    #[error("unexpected {kind} node")]
    UnexpectedNode { kind: NodeKind },
}

/// Settings for one code generation run.
#[derive(Debug, Clone, Copy)]
pub struct GlslConfig<'r> {
    pub output: OutputType,
    /// `#version` of the input shader; selects the visible built-ins.
    pub shader_version: u32,
    pub clamp_strategy: ClampStrategy,
    pub emulate_precision: bool,
    pub hash_function: Option<HashFunction>,
    pub builtins: &'r BuiltInRegistry,
}

/// Generated helpers the body refers to. They have to be written before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelperUsage {
    pub compound: BTreeSet<CompoundHelper>,
    pub int_clamp: bool,
}

#[derive(Debug, Clone)]
pub struct GlslBody {
    pub text: String,
    pub helpers: HelperUsage,
}

pub const INT_CLAMP_HELPER: &str = "int webgl_int_clamp(int value, int minValue, int maxValue) \
{ return ((value < minValue) ? minValue : ((value > maxValue) ? maxValue : value)); }\n\n";

/// Largest valid index into a value of type `ty`, if it is statically known.
pub fn clamp_bound(ty: &Type) -> Option<u32> {
    if ty.is_array() {
        return ty.array_size().and_then(|n| n.checked_sub(1));
    }
    u32::from(ty.nominal_size()).checked_sub(1)
}

/// Writes the translation unit `root`. Names hashed along the way are recorded in `names`.
pub fn write_body(
    root: &Node,
    config: &GlslConfig<'_>,
    names: &mut NameMap,
) -> Result<GlslBody, CodegenError> {
    let mut emitter = output::Emitter::new(config, names);
    emitter.translation_unit(root)?;
    Ok(emitter.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BasicType, Precision, Qualifier};

    #[test]
    fn clamp_bounds() {
        let vec3 = Type::temp(BasicType::Float, Precision::High, 3);
        assert_eq!(clamp_bound(&vec3), Some(2));
        assert_eq!(clamp_bound(&vec3.clone().with_array_size(5)), Some(4));
        let mut unsized_array = vec3;
        unsized_array.set_unsized_array();
        assert_eq!(clamp_bound(&unsized_array), None);
        assert_eq!(
            clamp_bound(&Type::matrix(Precision::High, Qualifier::Uniform, 4, 2)),
            Some(3)
        );
    }

    #[test]
    fn dialect_switches() {
        assert!(OutputType::Essl.writes_precision());
        assert!(!OutputType::Glsl { version: 110 }.uses_in_out());
        assert!(OutputType::Glsl { version: 150 }.uses_in_out());
    }
}
