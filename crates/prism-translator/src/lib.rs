//! GLSL ES shader translator back end.
//!
//! The crate takes a type-checked shader AST (see [`ast`]), optionally runs dead-code
//! elimination and the WebGL safety passes over it, and writes GLSL ES or desktop GLSL source.
//! The symbol table and built-in registrar serve front ends that build the AST.

pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod constant;
pub mod dead_code;
pub mod diagnostics;
pub mod emulator;
pub mod globals;
pub mod glsl;
pub mod operator;
pub mod passes;
pub mod pool;
pub mod qualifier;
pub mod resources;
pub mod symbol;
pub mod symbol_table;
pub mod types;

pub use compiler::{
    CompileOptions, TranslateError, TranslateOptions, TranslateOutput, Translator,
};
pub use dead_code::{remove_dead_code, DeadCodeError, DeadCodeStats};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use globals::GlobalsHandle;
pub use glsl::{ClampStrategy, CodegenError, HashFunction, NameMap, OutputType};
pub use pool::CompilerPool;
pub use resources::{BuiltInResources, ExtensionBehavior, ShaderSpec, ShaderStage};
pub use symbol_table::{BuiltInLevel, BuiltInRegistry, SymbolTable};
