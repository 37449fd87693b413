use std::fmt;
use std::sync::Arc;

use crate::constant::ConstantUnion;
use crate::operator::Operator;
use crate::types::{Field, StructType, Type};

/// Unique identifier shared by variables, functions and struct types of one compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    BuiltIn,
    UserDefined,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub id: SymbolId,
    pub name: String,
    pub ty: Type,
    pub kind: SymbolKind,
    /// Folded value of a `const` variable.
    pub const_value: Option<Vec<ConstantUnion>>,
    /// Set for struct type names (e.g. `gl_DepthRangeParameters`).
    pub is_user_type: bool,
    pub extension: Option<&'static str>,
}

impl Variable {
    pub fn is_builtin(&self) -> bool {
        self.kind == SymbolKind::BuiltIn
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: Option<String>,
    /// The parameter direction lives in `ty.qualifier` (`In`, `Out`, `InOut`, `ConstReadOnly`).
    pub ty: Type,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: Some(name.into()),
            ty,
        }
    }

    pub fn unnamed(ty: Type) -> Self {
        Self { name: None, ty }
    }

    pub fn is_out(&self) -> bool {
        self.ty.qualifier.is_parameter_out()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub id: SymbolId,
    pub name: String,
    pub mangled_name: String,
    pub return_type: Type,
    pub params: Vec<Parameter>,
    /// Operator that replaces calls to this built-in.
    pub op: Option<Operator>,
    pub extension: Option<&'static str>,
    pub kind: SymbolKind,
}

impl Function {
    pub fn mangle(name: &str, params: &[Parameter]) -> String {
        let mut out = format!("{name}(");
        for param in params {
            out.push_str(&param.ty.mangled_name());
        }
        out
    }

    pub fn is_builtin(&self) -> bool {
        self.kind == SymbolKind::BuiltIn
    }

    pub fn is_main(&self) -> bool {
        self.name == "main"
    }

    /// Whether argument `index` is written by the callee.
    pub fn param_is_out(&self, index: usize) -> bool {
        self.params.get(index).is_some_and(Parameter::is_out)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Variable(Arc<Variable>),
    Function(Arc<Function>),
}

impl Symbol {
    pub fn id(&self) -> SymbolId {
        match self {
            Symbol::Variable(v) => v.id,
            Symbol::Function(f) => f.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Symbol::Variable(v) => &v.name,
            Symbol::Function(f) => &f.name,
        }
    }

    pub fn as_variable(&self) -> Option<&Arc<Variable>> {
        match self {
            Symbol::Variable(v) => Some(v),
            Symbol::Function(_) => None,
        }
    }

    pub fn as_function(&self) -> Option<&Arc<Function>> {
        match self {
            Symbol::Function(f) => Some(f),
            Symbol::Variable(_) => None,
        }
    }

    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Symbol::Variable(v) => v.extension,
            Symbol::Function(f) => f.extension,
        }
    }

    pub(crate) fn set_extension(&mut self, extension: &'static str) {
        match self {
            Symbol::Variable(v) => Arc::make_mut(v).extension = Some(extension),
            Symbol::Function(f) => Arc::make_mut(f).extension = Some(extension),
        }
    }
}

/// Allocates [`SymbolId`]s; the built-in registry hands its counter over to each compile.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn starting_at(next: u32) -> Self {
        Self { next }
    }

    pub fn next_id(&mut self) -> SymbolId {
        let id = SymbolId(self.next);
        self.next += 1;
        id
    }

    pub fn peek(&self) -> u32 {
        self.next
    }

    pub fn new_struct(&mut self, name: impl Into<String>, fields: Vec<Field>) -> Arc<StructType> {
        Arc::new(StructType {
            id: self.next_id().0,
            name: name.into(),
            fields,
            builtin: false,
        })
    }

    pub fn new_variable(&mut self, name: impl Into<String>, ty: Type) -> Arc<Variable> {
        Arc::new(Variable {
            id: self.next_id(),
            name: name.into(),
            ty,
            kind: SymbolKind::UserDefined,
            const_value: None,
            is_user_type: false,
            extension: None,
        })
    }

    pub fn new_function(
        &mut self,
        name: impl Into<String>,
        return_type: Type,
        params: Vec<Parameter>,
    ) -> Arc<Function> {
        let name = name.into();
        Arc::new(Function {
            id: self.next_id(),
            mangled_name: Function::mangle(&name, &params),
            name,
            return_type,
            params,
            op: None,
            extension: None,
            kind: SymbolKind::UserDefined,
        })
    }
}
