//! Symbol lookup for one compile: an immutable built-in registry shared between compiles,
//! with a stack of mutable user scopes layered on top.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use tracing::warn;

use crate::constant::ConstantUnion;
use crate::operator::Operator;
use crate::resources::{ExtensionBehaviorMap, ShaderStage};
use crate::symbol::{Function, IdAllocator, Parameter, Symbol, SymbolId, SymbolKind, Variable};
use crate::types::{BasicType, Field, Precision, Qualifier, StructType, Type};

/// Partition of the built-in symbols by language version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuiltInLevel {
    Common,
    Essl1,
    Essl3,
    Essl3_1,
}

impl BuiltInLevel {
    /// Most specific level first.
    const SEARCH_ORDER: [BuiltInLevel; 4] = [
        BuiltInLevel::Essl3_1,
        BuiltInLevel::Essl3,
        BuiltInLevel::Essl1,
        BuiltInLevel::Common,
    ];

    fn index(self) -> usize {
        match self {
            BuiltInLevel::Common => 0,
            BuiltInLevel::Essl1 => 1,
            BuiltInLevel::Essl3 => 2,
            BuiltInLevel::Essl3_1 => 3,
        }
    }

    /// Whether symbols of this level exist for a shader declaring `#version shader_version`.
    pub fn is_visible(self, shader_version: u32) -> bool {
        match self {
            BuiltInLevel::Common => true,
            BuiltInLevel::Essl1 => shader_version == 100,
            BuiltInLevel::Essl3 => shader_version >= 300,
            BuiltInLevel::Essl3_1 => shader_version >= 310,
        }
    }
}

/// One scope: functions keyed by mangled name, everything else by plain name.
#[derive(Debug, Default, Clone)]
pub struct SymbolLevel {
    symbols: HashMap<String, Symbol>,
    /// Plain function name -> mangled name of its first registered overload.
    first_overload: HashMap<String, String>,
}

impl SymbolLevel {
    /// Returns `false` if the key is already taken in this level.
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        let key = match &symbol {
            Symbol::Variable(v) => v.name.clone(),
            Symbol::Function(f) => {
                self.first_overload
                    .entry(f.name.clone())
                    .or_insert_with(|| f.mangled_name.clone());
                f.mangled_name.clone()
            }
        };
        match self.symbols.entry(key) {
            hashbrown::hash_map::Entry::Occupied(_) => false,
            hashbrown::hash_map::Entry::Vacant(e) => {
                e.insert(symbol);
                true
            }
        }
    }

    /// Looks up a variable name, a mangled function name, or a plain function name.
    pub fn find(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name).or_else(|| {
            self.first_overload
                .get(name)
                .and_then(|mangled| self.symbols.get(mangled))
        })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    fn functions_named_mut<'s>(&'s mut self, name: &'s str) -> impl Iterator<Item = &'s mut Symbol> {
        self.symbols
            .values_mut()
            .filter(move |s| matches!(s, Symbol::Function(f) if f.name == name))
    }
}

/// Mutable registry used while registering built-ins. [`BuiltInTableBuilder::finish`] freezes
/// it.
#[derive(Debug, Default)]
pub struct BuiltInTableBuilder {
    levels: [SymbolLevel; 4],
    ids: IdAllocator,
    extensions: ExtensionBehaviorMap,
}

impl BuiltInTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self, level: BuiltInLevel) -> &SymbolLevel {
        &self.levels[level.index()]
    }

    pub fn insert_builtin(
        &mut self,
        level: BuiltInLevel,
        return_type: &Type,
        name: &str,
        params: &[&Type],
    ) -> bool {
        let params: Vec<Parameter> = params
            .iter()
            .map(|ty| Parameter::unnamed((*ty).clone().with_qualifier(Qualifier::In)))
            .collect();
        let function = Function {
            id: self.ids.next_id(),
            mangled_name: Function::mangle(name, &params),
            name: name.to_owned(),
            return_type: return_type.clone().with_qualifier(Qualifier::Temporary),
            params,
            op: None,
            extension: None,
            kind: SymbolKind::BuiltIn,
        };
        self.levels[level.index()].insert(Symbol::Function(Arc::new(function)))
    }

    pub fn insert_variable(&mut self, level: BuiltInLevel, name: &str, ty: Type) -> Arc<Variable> {
        let variable = Arc::new(self.builtin_variable(name, ty));
        self.insert(level, Symbol::Variable(Arc::clone(&variable)));
        variable
    }

    pub fn insert(&mut self, level: BuiltInLevel, symbol: Symbol) -> bool {
        let inserted = self.levels[level.index()].insert(symbol);
        debug_assert!(inserted, "duplicate built-in symbol");
        inserted
    }

    pub fn insert_const_int(&mut self, level: BuiltInLevel, name: &str, value: i32) {
        let ty = Type::new(BasicType::Int, Precision::Medium, Qualifier::Const, 1);
        self.insert_const(level, name, ty, vec![ConstantUnion::Int(value)]);
    }

    pub fn insert_const(
        &mut self,
        level: BuiltInLevel,
        name: &str,
        ty: Type,
        values: Vec<ConstantUnion>,
    ) {
        debug_assert_eq!(ty.object_size(), values.len());
        let mut variable = self.builtin_variable(name, ty.with_qualifier(Qualifier::Const));
        variable.const_value = Some(values);
        self.insert(level, Symbol::Variable(Arc::new(variable)));
    }

    /// Registers a built-in struct type name.
    pub fn insert_struct(&mut self, level: BuiltInLevel, name: &str, fields: Vec<Field>) -> Arc<StructType> {
        let structure = Arc::new(StructType {
            id: self.ids.next_id().0,
            name: name.to_owned(),
            fields,
            builtin: true,
        });
        let mut variable = self.builtin_variable(name, Type::structure(Arc::clone(&structure), Qualifier::Global));
        variable.is_user_type = true;
        self.insert(level, Symbol::Variable(Arc::new(variable)));
        structure
    }

    /// Attaches `op` to every overload of `name` registered at `level`.
    pub fn relate_to_operator(&mut self, level: BuiltInLevel, name: &str, op: Operator) {
        let mut found = false;
        for symbol in self.levels[level.index()].functions_named_mut(name) {
            if let Symbol::Function(f) = symbol {
                Arc::make_mut(f).op = Some(op);
                found = true;
            }
        }
        debug_assert!(found, "relate_to_operator: {name} not registered at {level:?}");
        if !found {
            warn!(name, ?level, ?op, "relate_to_operator on unregistered built-in");
        }
    }

    /// Tags every symbol called `name` at `level` as requiring `extension`.
    pub fn relate_to_extension(&mut self, level: BuiltInLevel, name: &str, extension: &'static str) {
        let mut found = false;
        for symbol in self.levels[level.index()].symbols.values_mut() {
            if symbol.name() == name {
                symbol.set_extension(extension);
                found = true;
            }
        }
        debug_assert!(found, "relate_to_extension: {name} not registered at {level:?}");
        if !found {
            warn!(name, ?level, extension, "relate_to_extension on unregistered built-in");
        }
    }

    /// Tags every function at `level` taking a `sampler` argument as requiring `extension`.
    pub fn relate_sampler_to_extension(
        &mut self,
        level: BuiltInLevel,
        sampler: BasicType,
        extension: &'static str,
    ) {
        for symbol in self.levels[level.index()].symbols.values_mut() {
            let takes_sampler = symbol
                .as_function()
                .is_some_and(|f| f.params.iter().any(|p| p.ty.basic == sampler));
            if takes_sampler {
                symbol.set_extension(extension);
            }
        }
    }

    pub fn set_extension_behavior(&mut self, extensions: ExtensionBehaviorMap) {
        self.extensions = extensions;
    }

    pub fn finish(self) -> Arc<BuiltInRegistry> {
        Arc::new(BuiltInRegistry {
            levels: self.levels,
            ids: self.ids,
            extensions: self.extensions,
        })
    }

    fn builtin_variable(&mut self, name: &str, ty: Type) -> Variable {
        Variable {
            id: self.ids.next_id(),
            name: name.to_owned(),
            ty,
            kind: SymbolKind::BuiltIn,
            const_value: None,
            is_user_type: false,
            extension: None,
        }
    }
}

/// Immutable built-in symbols for one (stage, spec, resources) combination.
#[derive(Debug)]
pub struct BuiltInRegistry {
    levels: [SymbolLevel; 4],
    ids: IdAllocator,
    extensions: ExtensionBehaviorMap,
}

impl BuiltInRegistry {
    pub fn level(&self, level: BuiltInLevel) -> &SymbolLevel {
        &self.levels[level.index()]
    }

    /// Searches the levels visible at `shader_version`, most specific first.
    pub fn find_builtin(&self, name: &str, shader_version: u32) -> Option<&Symbol> {
        BuiltInLevel::SEARCH_ORDER
            .iter()
            .filter(|level| level.is_visible(shader_version))
            .find_map(|level| self.levels[level.index()].find(name))
    }

    /// Whether `name` names any built-in at any level. Used for name-hashing decisions, where the
    /// shader version no longer matters.
    pub fn is_builtin_name(&self, name: &str) -> bool {
        self.levels.iter().any(|level| level.find(name).is_some())
    }

    pub fn extension_behavior(&self) -> &ExtensionBehaviorMap {
        &self.extensions
    }

    pub(crate) fn first_user_id(&self) -> u32 {
        self.ids.peek()
    }
}

/// Per-compile symbol table.
#[derive(Debug)]
pub struct SymbolTable {
    builtins: Arc<BuiltInRegistry>,
    scopes: Vec<SymbolLevel>,
    precision_stack: Vec<HashMap<BasicType, Precision>>,
    invariant_varyings: HashSet<String>,
    global_invariant: bool,
    ids: IdAllocator,
}

impl SymbolTable {
    /// Creates a table with the global user scope pushed and the stage's default precisions set.
    pub fn new(builtins: Arc<BuiltInRegistry>, stage: ShaderStage) -> Self {
        let ids = IdAllocator::starting_at(builtins.first_user_id());
        let mut table = Self {
            builtins,
            scopes: Vec::new(),
            precision_stack: Vec::new(),
            invariant_varyings: HashSet::new(),
            global_invariant: false,
            ids,
        };
        table.push_scope();

        // GLSL ES 1.00 section 4.5.3.
        if stage == ShaderStage::Fragment {
            table.set_default_precision(BasicType::Int, Precision::Medium);
        } else {
            table.set_default_precision(BasicType::Int, Precision::High);
            table.set_default_precision(BasicType::Float, Precision::High);
        }
        for sampler in [
            BasicType::Sampler2D,
            BasicType::SamplerCube,
            BasicType::SamplerExternalOes,
            BasicType::Sampler2DRect,
        ] {
            table.set_default_precision(sampler, Precision::Low);
        }
        table
    }

    pub fn builtins(&self) -> &Arc<BuiltInRegistry> {
        &self.builtins
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(SymbolLevel::default());
        self.precision_stack.push(HashMap::new());
    }

    /// Pops the innermost user scope. The global user scope is never popped.
    pub fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "pop_scope on the global scope");
        if self.scopes.len() > 1 {
            self.scopes.pop();
            self.precision_stack.pop();
        }
    }

    pub fn at_global_level(&self) -> bool {
        self.scopes.len() == 1
    }

    pub fn ids(&mut self) -> &mut IdAllocator {
        &mut self.ids
    }

    /// Declares a variable in the innermost scope. Returns `None` on redefinition.
    pub fn declare_variable(&mut self, name: &str, ty: Type) -> Option<Arc<Variable>> {
        let variable = self.ids.new_variable(name, ty);
        let scope = self.scopes.last_mut()?;
        scope
            .insert(Symbol::Variable(Arc::clone(&variable)))
            .then_some(variable)
    }

    /// Declares a struct type name in the innermost scope.
    pub fn declare_struct(&mut self, name: &str, fields: Vec<Field>) -> Option<Arc<StructType>> {
        let structure = self.ids.new_struct(name, fields);
        if structure.is_anonymous() {
            return Some(structure);
        }
        let variable = Variable {
            id: self.ids.next_id(),
            name: name.to_owned(),
            ty: Type::structure(Arc::clone(&structure), Qualifier::Global),
            kind: SymbolKind::UserDefined,
            const_value: None,
            is_user_type: true,
            extension: None,
        };
        let scope = self.scopes.last_mut()?;
        scope
            .insert(Symbol::Variable(Arc::new(variable)))
            .then_some(structure)
    }

    /// Declares a user function at global scope. A prototype followed by its definition resolves
    /// to the same function object.
    pub fn declare_function(
        &mut self,
        name: &str,
        return_type: Type,
        params: Vec<Parameter>,
    ) -> Arc<Function> {
        let mangled = Function::mangle(name, &params);
        if let Some(existing) = self.find_user_defined_function(&mangled) {
            return Arc::clone(existing);
        }
        let function = self.ids.new_function(name, return_type, params);
        if let Some(global) = self.scopes.first_mut() {
            global.insert(Symbol::Function(Arc::clone(&function)));
        }
        function
    }

    pub fn find_user_defined_function(&self, mangled_name: &str) -> Option<&Arc<Function>> {
        self.scopes
            .first()
            .and_then(|global| global.symbols.get(mangled_name))
            .and_then(Symbol::as_function)
    }

    /// User scopes innermost-out, then the built-in registry.
    pub fn find(&self, name: &str, shader_version: u32) -> Option<&Symbol> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.find(name))
            .or_else(|| self.builtins.find_builtin(name, shader_version))
    }

    pub fn find_builtin(&self, name: &str, shader_version: u32) -> Option<&Symbol> {
        self.builtins.find_builtin(name, shader_version)
    }

    /// Only float, int and the sampler kinds take a default precision.
    pub fn set_default_precision(&mut self, basic: BasicType, precision: Precision) -> bool {
        if !matches!(basic, BasicType::Float | BasicType::Int) && !basic.is_sampler() {
            return false;
        }
        match self.precision_stack.last_mut() {
            Some(top) => {
                top.insert(basic, precision);
                true
            }
            None => false,
        }
    }

    pub fn default_precision(&self, basic: BasicType) -> Precision {
        // Unsigned ints share the int default.
        let basic = if basic == BasicType::UInt {
            BasicType::Int
        } else {
            basic
        };
        self.precision_stack
            .iter()
            .rev()
            .find_map(|level| level.get(&basic).copied())
            .unwrap_or(Precision::Undefined)
    }

    pub fn add_invariant_varying(&mut self, name: &str) {
        self.invariant_varyings.insert(name.to_owned());
    }

    /// Set by `#pragma STDGL invariant(all)`.
    pub fn set_global_invariant(&mut self) {
        self.global_invariant = true;
    }

    pub fn is_varying_invariant(&self, name: &str) -> bool {
        self.global_invariant || self.invariant_varyings.contains(name)
    }

    pub fn next_symbol_id(&mut self) -> SymbolId {
        self.ids.next_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float(size: u8) -> Type {
        Type::new(BasicType::Float, Precision::Undefined, Qualifier::Global, size)
    }

    fn registry() -> Arc<BuiltInRegistry> {
        let mut builder = BuiltInTableBuilder::new();
        builder.insert_builtin(BuiltInLevel::Common, &float(1), "sin", &[&float(1)]);
        builder.insert_builtin(BuiltInLevel::Common, &float(2), "sin", &[&float(2)]);
        builder.insert_builtin(BuiltInLevel::Essl3, &float(2), "texelThing", &[&float(2)]);
        builder.insert_const_int(BuiltInLevel::Essl1, "gl_MaxVaryingVectors", 8);
        builder.relate_to_operator(BuiltInLevel::Common, "sin", Operator::Sin);
        builder.finish()
    }

    #[test]
    fn overloads_are_distinct_and_related() {
        let reg = registry();
        let a = reg.find_builtin("sin(f;", 100).and_then(Symbol::as_function).cloned();
        let b = reg.find_builtin("sin(vf2;", 300).and_then(Symbol::as_function).cloned();
        let (a, b) = (a.expect("sin(float)"), b.expect("sin(vec2)"));
        assert_ne!(a.id, b.id);
        assert_eq!(a.op, Some(Operator::Sin));
        assert_eq!(b.op, Some(Operator::Sin));
        assert!(reg.find_builtin("sin", 100).is_some());
    }

    #[test]
    fn levels_are_version_gated() {
        let reg = registry();
        assert!(reg.find_builtin("gl_MaxVaryingVectors", 100).is_some());
        assert!(reg.find_builtin("gl_MaxVaryingVectors", 300).is_none());
        assert!(reg.find_builtin("texelThing", 100).is_none());
        assert!(reg.find_builtin("texelThing", 300).is_some());
        assert!(reg.find_builtin("not_a_builtin", 300).is_none());
    }

    #[test]
    fn user_scopes_shadow_builtins_and_pop() {
        let mut table = SymbolTable::new(registry(), ShaderStage::Fragment);
        table.push_scope();
        let local = table
            .declare_variable("sin", float(1).with_qualifier(Qualifier::Temporary))
            .expect("fresh scope");
        assert!(local.id.0 >= table.builtins().first_user_id());
        assert_eq!(
            table.find("sin", 100).and_then(Symbol::as_variable).map(|v| v.id),
            Some(local.id)
        );
        assert!(table.declare_variable("sin", float(1)).is_none());
        table.pop_scope();
        assert!(table.find("sin", 100).and_then(Symbol::as_function).is_some());
    }

    #[test]
    fn default_precisions_follow_stage() {
        let frag = SymbolTable::new(registry(), ShaderStage::Fragment);
        assert_eq!(frag.default_precision(BasicType::Int), Precision::Medium);
        assert_eq!(frag.default_precision(BasicType::Float), Precision::Undefined);
        assert_eq!(frag.default_precision(BasicType::Sampler2D), Precision::Low);

        let mut vert = SymbolTable::new(registry(), ShaderStage::Vertex);
        assert_eq!(vert.default_precision(BasicType::Float), Precision::High);
        vert.push_scope();
        assert!(vert.set_default_precision(BasicType::Float, Precision::Medium));
        assert!(!vert.set_default_precision(BasicType::Bool, Precision::Low));
        assert_eq!(vert.default_precision(BasicType::Float), Precision::Medium);
        vert.pop_scope();
        assert_eq!(vert.default_precision(BasicType::Float), Precision::High);
    }

    #[test]
    fn prototype_and_definition_share_a_function() {
        let mut table = SymbolTable::new(registry(), ShaderStage::Vertex);
        let params = vec![Parameter::new("x", float(1).with_qualifier(Qualifier::In))];
        let proto = table.declare_function("foo", Type::void(), params.clone());
        let def = table.declare_function("foo", Type::void(), params);
        assert_eq!(proto.id, def.id);
        assert!(table.find_user_defined_function("foo(f;").is_some());
    }

    #[test]
    fn invariance_tracking() {
        let mut table = SymbolTable::new(registry(), ShaderStage::Vertex);
        table.add_invariant_varying("v_color");
        assert!(table.is_varying_invariant("v_color"));
        assert!(!table.is_varying_invariant("v_uv"));
        table.set_global_invariant();
        assert!(table.is_varying_invariant("v_uv"));
    }
}
