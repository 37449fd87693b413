//! Folding of per-declaration qualifier token sequences into a final [`TypeQualifier`].
//!
//! GLSL ES 3.00 section 4.7 fixes the order
//! `invariant interpolation storage precision`, with `layout` anywhere left of storage.
//! Storage-class tokens compose through a fixed join table; anything outside the table is an
//! invalid combination.

use std::fmt;

use thiserror::Error;

use crate::diagnostics::Diagnostics;
use crate::types::{Precision, Qualifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LayoutQualifier {
    pub location: Option<u32>,
    pub binding: Option<u32>,
    pub local_size: [Option<u32>; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MemoryQualifier {
    pub readonly: bool,
    pub writeonly: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryAccess {
    ReadOnly,
    WriteOnly,
}

/// One qualifier token as written in source, in the order the parser saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualifierToken {
    Invariant,
    /// `smooth` or `flat`.
    Interpolation(Qualifier),
    Layout(LayoutQualifier),
    /// Storage class token, including `centroid`, `in`, `out`, `uniform`, `const`, ...
    Storage(Qualifier),
    Memory(MemoryAccess),
    Precision(Precision),
}

/// First repetition or ordering violation in a sequence, with the token that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{token}: {message}")]
pub struct OrderError {
    pub token: QualifierToken,
    pub message: String,
}

impl OrderError {
    fn new(token: QualifierToken, message: impl Into<String>) -> Self {
        Self {
            token,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Invariant,
    Interpolation,
    Layout,
    Storage,
    Memory,
    Precision,
}

impl QualifierToken {
    fn kind(&self) -> TokenKind {
        match self {
            QualifierToken::Invariant => TokenKind::Invariant,
            QualifierToken::Interpolation(_) => TokenKind::Interpolation,
            QualifierToken::Layout(_) => TokenKind::Layout,
            QualifierToken::Storage(_) => TokenKind::Storage,
            QualifierToken::Memory(_) => TokenKind::Memory,
            QualifierToken::Precision(_) => TokenKind::Precision,
        }
    }
}

impl fmt::Display for QualifierToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualifierToken::Invariant => f.write_str("invariant"),
            QualifierToken::Interpolation(q) | QualifierToken::Storage(q) => f.write_str(q.as_str()),
            QualifierToken::Layout(_) => f.write_str("layout"),
            QualifierToken::Memory(MemoryAccess::ReadOnly) => f.write_str("readonly"),
            QualifierToken::Memory(MemoryAccess::WriteOnly) => f.write_str("writeonly"),
            QualifierToken::Precision(p) => f.write_str(p.as_str()),
        }
    }
}

/// Finalized qualifier descriptor for one declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeQualifier {
    pub qualifier: Qualifier,
    pub precision: Precision,
    pub invariant: bool,
    pub layout: LayoutQualifier,
    pub memory: MemoryQualifier,
}

impl TypeQualifier {
    fn new(scope: Qualifier) -> Self {
        Self {
            qualifier: scope,
            precision: Precision::Undefined,
            invariant: false,
            layout: LayoutQualifier::default(),
            memory: MemoryQualifier::default(),
        }
    }
}

/// Qualifier tokens collected for one declaration, starting with its scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifierSequence {
    scope: Qualifier,
    tokens: Vec<QualifierToken>,
}

impl QualifierSequence {
    /// `scope` must be [`Qualifier::Global`] or [`Qualifier::Temporary`].
    pub fn new(scope: Qualifier) -> Self {
        debug_assert!(matches!(scope, Qualifier::Global | Qualifier::Temporary));
        Self {
            scope,
            tokens: Vec::new(),
        }
    }

    pub fn push(&mut self, token: QualifierToken) -> &mut Self {
        self.tokens.push(token);
        self
    }

    pub fn tokens(&self) -> &[QualifierToken] {
        &self.tokens
    }

    /// Checks repetition and ordering, stopping at the first violation.
    pub fn check_order(&self) -> Result<(), OrderError> {
        check_repeats(&self.tokens)?;
        check_ordering(&self.tokens)
    }

    /// Folds the sequence of a variable declaration.
    ///
    /// Failures are reported to `diagnostics`; the prefix folded so far is still returned.
    pub fn variable_qualifier(&self, diagnostics: &mut Diagnostics) -> TypeQualifier {
        let mut out = TypeQualifier::new(self.scope);
        if let Err(err) = self.check_order() {
            diagnostics.error(err.token.to_string(), err.message);
            return out;
        }

        for token in &self.tokens {
            let valid = match *token {
                QualifierToken::Invariant => {
                    out.invariant = true;
                    true
                }
                QualifierToken::Interpolation(q) => join_interpolation(&mut out.qualifier, q),
                QualifierToken::Layout(layout) => {
                    out.layout = layout;
                    true
                }
                QualifierToken::Storage(q) => join_variable_storage(&mut out.qualifier, q),
                QualifierToken::Memory(access) => {
                    join_memory(&mut out.memory, access);
                    true
                }
                QualifierToken::Precision(p) => {
                    debug_assert_ne!(p, Precision::Undefined);
                    out.precision = p;
                    true
                }
            };
            if !valid {
                diagnostics.error(token.to_string(), "invalid qualifier combination");
                break;
            }
        }
        out
    }

    /// Folds the sequence of a function parameter declaration. The scope must be temporary.
    ///
    /// Unqualified parameters become `in`; `const` alone becomes `const in`.
    pub fn parameter_qualifier(&self, diagnostics: &mut Diagnostics) -> TypeQualifier {
        debug_assert_eq!(self.scope, Qualifier::Temporary);
        let mut out = TypeQualifier::new(Qualifier::Temporary);
        if let Err(err) = self.check_order() {
            diagnostics.error(err.token.to_string(), err.message);
            return out;
        }

        for token in &self.tokens {
            let valid = match *token {
                QualifierToken::Invariant
                | QualifierToken::Interpolation(_)
                | QualifierToken::Layout(_) => false,
                QualifierToken::Memory(access) => {
                    join_memory(&mut out.memory, access);
                    true
                }
                QualifierToken::Storage(q) => join_parameter_storage(&mut out.qualifier, q),
                QualifierToken::Precision(p) => {
                    out.precision = p;
                    true
                }
            };
            if !valid {
                diagnostics.error(token.to_string(), "invalid parameter qualifier");
                break;
            }
        }

        match out.qualifier {
            Qualifier::In | Qualifier::ConstReadOnly | Qualifier::Out | Qualifier::InOut => {}
            Qualifier::Const => out.qualifier = Qualifier::ConstReadOnly,
            Qualifier::Temporary => out.qualifier = Qualifier::In,
            other => diagnostics.error(other.as_str(), "Invalid parameter qualifier"),
        }
        out
    }
}

fn check_repeats(tokens: &[QualifierToken]) -> Result<(), OrderError> {
    let mut invariant = false;
    let mut precision = false;
    let mut layout = false;
    let mut interpolation = false;

    for (i, token) in tokens.iter().enumerate() {
        let seen = match token.kind() {
            TokenKind::Invariant => std::mem::replace(&mut invariant, true),
            TokenKind::Precision => std::mem::replace(&mut precision, true),
            TokenKind::Layout => std::mem::replace(&mut layout, true),
            TokenKind::Interpolation => std::mem::replace(&mut interpolation, true),
            TokenKind::Storage | TokenKind::Memory => {
                if tokens[..i].contains(token) {
                    return Err(OrderError::new(*token, format!("{token} specified multiple times")));
                }
                false
            }
        };
        if seen {
            let what = match token.kind() {
                TokenKind::Invariant => "invariant",
                TokenKind::Precision => "precision",
                TokenKind::Layout => "layout",
                _ => "interpolation",
            };
            return Err(OrderError::new(
                *token,
                format!("The {what} qualifier specified multiple times."),
            ));
        }
    }
    Ok(())
}

fn check_ordering(tokens: &[QualifierToken]) -> Result<(), OrderError> {
    let mut interpolation = false;
    let mut storage = false;
    let mut precision = false;
    let mut memory = false;

    for token in tokens {
        let fail = |message: &str| -> Result<(), OrderError> {
            Err(OrderError::new(*token, message))
        };
        match token.kind() {
            TokenKind::Invariant => {
                if interpolation || storage || precision || memory {
                    return fail("The invariant qualifier has to be first in the expression.");
                }
            }
            TokenKind::Interpolation => {
                if storage {
                    return fail("Storage qualifiers have to be after interpolation qualifiers.");
                }
                if memory {
                    return fail("Memory qualifiers have to be after interpolation qualifiers.");
                }
                if precision {
                    return fail("Precision qualifiers have to be after interpolation qualifiers.");
                }
                interpolation = true;
            }
            TokenKind::Layout => {
                if storage {
                    return fail("Storage qualifiers have to be after layout qualifiers.");
                }
                if memory {
                    return fail("Memory qualifiers have to be after layout qualifiers.");
                }
                if precision {
                    return fail("Precision qualifiers have to be after layout qualifiers.");
                }
            }
            TokenKind::Storage => {
                if precision {
                    return fail("Precision qualifiers have to be after storage qualifiers.");
                }
                storage = true;
            }
            TokenKind::Memory => {
                if precision {
                    return fail("Precision qualifiers have to be after memory qualifiers.");
                }
                memory = true;
            }
            TokenKind::Precision => precision = true,
        }
    }
    Ok(())
}

fn join_memory(memory: &mut MemoryQualifier, access: MemoryAccess) {
    match access {
        MemoryAccess::ReadOnly => memory.readonly = true,
        MemoryAccess::WriteOnly => memory.writeonly = true,
    }
}

fn join_interpolation(current: &mut Qualifier, interpolation: Qualifier) -> bool {
    match (*current, interpolation) {
        (Qualifier::Global, Qualifier::Smooth | Qualifier::Flat) => {
            *current = interpolation;
            true
        }
        _ => false,
    }
}

/// Storage join table for variable declarations, keyed by (folded so far, new token).
pub fn join_variable_storage(current: &mut Qualifier, storage: Qualifier) -> bool {
    use Qualifier::*;

    let joined = match (*current, storage) {
        (
            Global,
            Smooth | Flat | Uniform | Attribute | VaryingIn | VaryingOut | Centroid | VertexIn
            | VertexOut | FragmentIn | FragmentOut | ComputeIn | Shared | Const | SmoothIn
            | SmoothOut | FlatIn | FlatOut | CentroidIn | CentroidOut,
        ) => storage,
        (Temporary, Const) => Const,

        (Smooth, Centroid) => Centroid,
        (Smooth, VertexOut) => SmoothOut,
        (Smooth, FragmentIn) => SmoothIn,
        (Smooth, CentroidIn) => CentroidIn,
        (Smooth, CentroidOut) => CentroidOut,

        // `flat centroid` means the same as `flat`.
        (Flat, Centroid) => Flat,
        (Flat, VertexOut) => FlatOut,
        (Flat, FragmentIn) => FlatIn,
        (Flat, CentroidIn) => FlatIn,
        (Flat, CentroidOut) => FlatOut,

        (Centroid, VertexOut) => CentroidOut,
        (Centroid, FragmentIn) => CentroidIn,
        _ => return false,
    };
    *current = joined;
    true
}

/// Storage join table for function parameters.
pub fn join_parameter_storage(current: &mut Qualifier, storage: Qualifier) -> bool {
    use Qualifier::*;

    let joined = match (*current, storage) {
        (Temporary, Const | In | Out | InOut) => storage,
        (Const, In) => ConstReadOnly,
        _ => return false,
    };
    *current = joined;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seq(scope: Qualifier, tokens: &[QualifierToken]) -> QualifierSequence {
        let mut s = QualifierSequence::new(scope);
        for t in tokens {
            s.push(*t);
        }
        s
    }

    #[test]
    fn global_uniform_folds_to_uniform() {
        let mut diags = Diagnostics::new();
        let q = seq(
            Qualifier::Global,
            &[
                QualifierToken::Storage(Qualifier::Uniform),
                QualifierToken::Precision(Precision::High),
            ],
        )
        .variable_qualifier(&mut diags);
        assert!(!diags.has_errors());
        assert_eq!(q.qualifier, Qualifier::Uniform);
        assert_eq!(q.precision, Precision::High);
    }

    #[test]
    fn interpolation_then_vertex_out_joins() {
        let mut diags = Diagnostics::new();
        let q = seq(
            Qualifier::Global,
            &[
                QualifierToken::Invariant,
                QualifierToken::Interpolation(Qualifier::Smooth),
                QualifierToken::Storage(Qualifier::VertexOut),
            ],
        )
        .variable_qualifier(&mut diags);
        assert!(!diags.has_errors());
        assert!(q.invariant);
        assert_eq!(q.qualifier, Qualifier::SmoothOut);
    }

    #[test]
    fn flat_centroid_collapses_to_flat() {
        let mut diags = Diagnostics::new();
        let q = seq(
            Qualifier::Global,
            &[
                QualifierToken::Interpolation(Qualifier::Flat),
                QualifierToken::Storage(Qualifier::Centroid),
            ],
        )
        .variable_qualifier(&mut diags);
        assert_eq!(q.qualifier, Qualifier::Flat);

        let q = seq(
            Qualifier::Global,
            &[
                QualifierToken::Interpolation(Qualifier::Flat),
                QualifierToken::Storage(Qualifier::CentroidIn),
            ],
        )
        .variable_qualifier(&mut diags);
        assert_eq!(q.qualifier, Qualifier::FlatIn);
        assert!(!diags.has_errors());
    }

    #[test]
    fn wrong_order_reports_once_and_returns_scope() {
        let mut diags = Diagnostics::new();
        let q = seq(
            Qualifier::Global,
            &[
                QualifierToken::Precision(Precision::Medium),
                QualifierToken::Storage(Qualifier::Uniform),
            ],
        )
        .variable_qualifier(&mut diags);
        assert_eq!(q.qualifier, Qualifier::Global);
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.entries()[0].token, "uniform");
        assert_eq!(
            diags.entries()[0].message,
            "Precision qualifiers have to be after storage qualifiers."
        );
    }

    #[test]
    fn invariant_must_come_first() {
        let s = seq(
            Qualifier::Global,
            &[
                QualifierToken::Storage(Qualifier::VertexOut),
                QualifierToken::Invariant,
            ],
        );
        let err = s.check_order().unwrap_err();
        assert_eq!(err.token, QualifierToken::Invariant);
        assert_eq!(
            err.message,
            "The invariant qualifier has to be first in the expression."
        );
    }

    #[test]
    fn layout_may_not_follow_storage() {
        let s = seq(
            Qualifier::Global,
            &[
                QualifierToken::Storage(Qualifier::FragmentOut),
                QualifierToken::Layout(LayoutQualifier::default()),
            ],
        );
        let err = s.check_order().unwrap_err();
        assert_eq!(err.token, QualifierToken::Layout(LayoutQualifier::default()));
        assert_eq!(err.message, "Storage qualifiers have to be after layout qualifiers.");
    }

    #[test]
    fn repeated_modifiers_are_rejected() {
        let s = seq(
            Qualifier::Global,
            &[QualifierToken::Invariant, QualifierToken::Invariant],
        );
        assert_eq!(
            s.check_order().map_err(|e| e.message),
            Err("The invariant qualifier specified multiple times.".to_owned())
        );

        let s = seq(
            Qualifier::Global,
            &[
                QualifierToken::Storage(Qualifier::Uniform),
                QualifierToken::Storage(Qualifier::Uniform),
            ],
        );
        assert_eq!(
            s.check_order().map_err(|e| e.to_string()),
            Err("uniform: uniform specified multiple times".to_owned())
        );
    }

    #[test]
    fn illegal_join_stops_folding_and_keeps_prefix() {
        let mut diags = Diagnostics::new();
        let q = seq(
            Qualifier::Global,
            &[
                QualifierToken::Storage(Qualifier::Uniform),
                QualifierToken::Storage(Qualifier::Attribute),
                QualifierToken::Precision(Precision::Low),
            ],
        )
        .variable_qualifier(&mut diags);
        assert_eq!(q.qualifier, Qualifier::Uniform);
        // Folding stopped before the precision token.
        assert_eq!(q.precision, Precision::Undefined);
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.entries()[0].token, "attribute");
        assert_eq!(diags.entries()[0].message, "invalid qualifier combination");
    }

    #[test]
    fn temporary_const_is_const() {
        let mut diags = Diagnostics::new();
        let q = seq(
            Qualifier::Temporary,
            &[QualifierToken::Storage(Qualifier::Const)],
        )
        .variable_qualifier(&mut diags);
        assert_eq!(q.qualifier, Qualifier::Const);
    }

    #[test]
    fn parameter_defaults() {
        let mut diags = Diagnostics::new();
        let plain = seq(Qualifier::Temporary, &[]).parameter_qualifier(&mut diags);
        assert_eq!(plain.qualifier, Qualifier::In);

        let konst = seq(
            Qualifier::Temporary,
            &[QualifierToken::Storage(Qualifier::Const)],
        )
        .parameter_qualifier(&mut diags);
        assert_eq!(konst.qualifier, Qualifier::ConstReadOnly);

        let const_in = seq(
            Qualifier::Temporary,
            &[
                QualifierToken::Storage(Qualifier::Const),
                QualifierToken::Storage(Qualifier::In),
            ],
        )
        .parameter_qualifier(&mut diags);
        assert_eq!(const_in.qualifier, Qualifier::ConstReadOnly);
        assert!(!diags.has_errors());

        let bad = seq(
            Qualifier::Temporary,
            &[
                QualifierToken::Storage(Qualifier::Out),
                QualifierToken::Storage(Qualifier::In),
            ],
        )
        .parameter_qualifier(&mut diags);
        assert_eq!(bad.qualifier, Qualifier::Out);
        assert_eq!(diags.entries()[0].message, "invalid parameter qualifier");
    }

    #[test]
    fn folding_is_deterministic() {
        let s = seq(
            Qualifier::Global,
            &[
                QualifierToken::Interpolation(Qualifier::Smooth),
                QualifierToken::Storage(Qualifier::Centroid),
                QualifierToken::Storage(Qualifier::VertexOut),
            ],
        );
        let mut a = Diagnostics::new();
        let mut b = Diagnostics::new();
        assert_eq!(s.variable_qualifier(&mut a), s.variable_qualifier(&mut b));
        assert_eq!(s.variable_qualifier(&mut a).qualifier, Qualifier::CentroidOut);
        assert!(!a.has_errors());
    }
}
