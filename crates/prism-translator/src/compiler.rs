//! Compiler driver: runs the AST passes selected by [`CompileOptions`] and assembles the final
//! shader text around the generated body.

use std::fmt::Write;
use std::sync::Arc;

use bitflags::bitflags;
use thiserror::Error;
use tracing::debug;

use crate::ast::Node;
use crate::builtins::build_registry;
use crate::dead_code::{remove_dead_code, DeadCodeError};
use crate::diagnostics::Diagnostics;
use crate::emulator::BuiltInFunctionEmulator;
use crate::glsl::precision::write_rounding_helpers;
use crate::glsl::{
    write_body, ClampStrategy, CodegenError, GlslConfig, HashFunction, NameMap, OutputType,
    INT_CLAMP_HELPER,
};
use crate::passes::{mark_index_clamps, mark_unrolled_loops, UnrollCondition};
use crate::resources::{
    BuiltInResources, ExtensionBehavior, ExtensionBehaviorMap, ShaderSpec, ShaderStage,
    EXT_SHADER_TEXTURE_LOD,
};
use crate::symbol_table::BuiltInRegistry;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CompileOptions: u32 {
        const REMOVE_DEAD_CODE = 1 << 0;
        /// Round lowp/mediump float reads. Honoured for desktop GLSL output only.
        const EMULATE_PRECISION = 1 << 1;
        const CLAMP_INDIRECT_ARRAY_BOUNDS = 1 << 2;
        const UNROLL_FOR_LOOPS_WITH_INTEGER_INDEX = 1 << 3;
        const UNROLL_FOR_LOOPS_WITH_SAMPLER_ARRAY_INDEX = 1 << 4;
        const EMULATE_BUILT_IN_FUNCTIONS = 1 << 5;
        const HASH_NAMES = 1 << 6;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TranslateOptions {
    pub flags: CompileOptions,
    pub clamp_strategy: ClampStrategy,
    /// Used when [`CompileOptions::HASH_NAMES`] is set. `None` falls back to
    /// [`crate::glsl::names::xxh3_name_hash`].
    pub hash_function: Option<HashFunction>,
    /// `#version` of the input shader. `None` takes the version implied by the spec.
    pub shader_version: Option<u32>,
}

#[derive(Debug, Error, PartialEq)]
pub enum TranslateError {
    #[error(transparent)]
    DeadCode(#[from] DeadCodeError),
    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

#[derive(Debug, Clone)]
pub struct TranslateOutput {
    pub object_code: String,
    /// Diagnostics reported by the front end for this compile, one per line.
    pub info_log: String,
    /// Hashed identifiers; empty unless name hashing is enabled.
    pub name_map: NameMap,
}

/// Default `#version` of shaders written against `spec`.
pub fn default_shader_version(spec: ShaderSpec) -> u32 {
    match spec {
        ShaderSpec::Gles2 | ShaderSpec::WebGl | ShaderSpec::CssShaders => 100,
        ShaderSpec::Gles3 | ShaderSpec::WebGl2 => 300,
        ShaderSpec::Gles3_1 => 310,
    }
}

/// Translates checked shader ASTs for one (stage, spec, output) configuration.
pub struct Translator {
    stage: ShaderStage,
    spec: ShaderSpec,
    output: OutputType,
    resources: BuiltInResources,
    builtins: Arc<BuiltInRegistry>,
    extensions: ExtensionBehaviorMap,
    options: TranslateOptions,
    diagnostics: Diagnostics,
    emulator: BuiltInFunctionEmulator,
}

impl Translator {
    pub fn new(
        stage: ShaderStage,
        spec: ShaderSpec,
        output: OutputType,
        resources: BuiltInResources,
    ) -> Self {
        let builtins = build_registry(stage, spec, &resources);
        Self::with_builtins(stage, spec, output, resources, builtins)
    }

    /// Like [`Translator::new`], reusing a registry built for the same stage, spec and resources.
    pub fn with_builtins(
        stage: ShaderStage,
        spec: ShaderSpec,
        output: OutputType,
        resources: BuiltInResources,
        builtins: Arc<BuiltInRegistry>,
    ) -> Self {
        Self {
            stage,
            spec,
            output,
            resources,
            extensions: builtins.extension_behavior().clone(),
            builtins,
            options: TranslateOptions::default(),
            diagnostics: Diagnostics::new(),
            emulator: BuiltInFunctionEmulator::new(),
        }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn spec(&self) -> ShaderSpec {
        self.spec
    }

    pub fn output(&self) -> OutputType {
        self.output
    }

    pub fn resources(&self) -> &BuiltInResources {
        &self.resources
    }

    pub fn builtins(&self) -> &Arc<BuiltInRegistry> {
        &self.builtins
    }

    pub fn options(&self) -> TranslateOptions {
        self.options
    }

    pub fn set_options(&mut self, options: TranslateOptions) {
        self.options = options;
    }

    /// Diagnostics sink for the front end of the current compile.
    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Behaviour of each supported extension, as set by `#extension` directives.
    pub fn extension_behavior_mut(&mut self) -> &mut ExtensionBehaviorMap {
        &mut self.extensions
    }

    /// Forgets per-compile state so the instance can be handed to another shader.
    pub fn reset(&mut self) {
        self.diagnostics.clear();
        self.emulator.clear();
        self.extensions = self.builtins.extension_behavior().clone();
    }

    fn shader_version(&self) -> u32 {
        self.options
            .shader_version
            .unwrap_or_else(|| default_shader_version(self.spec))
    }

    /// Desktop GLSL only; ESSL output keeps the declared precisions as they are.
    fn emulates_precision(&self) -> bool {
        self.options.flags.contains(CompileOptions::EMULATE_PRECISION)
            && matches!(self.output, OutputType::Glsl { .. })
    }

    /// Runs the enabled passes on `root` and writes the complete shader.
    pub fn translate(&mut self, root: &mut Node) -> Result<TranslateOutput, TranslateError> {
        let flags = self.options.flags;
        self.emulator.clear();

        if flags.contains(CompileOptions::CLAMP_INDIRECT_ARRAY_BOUNDS) {
            mark_index_clamps(root);
        }
        if flags.contains(CompileOptions::UNROLL_FOR_LOOPS_WITH_INTEGER_INDEX) {
            mark_unrolled_loops(root, UnrollCondition::IntegerIndex);
        } else if flags.contains(CompileOptions::UNROLL_FOR_LOOPS_WITH_SAMPLER_ARRAY_INDEX) {
            mark_unrolled_loops(root, UnrollCondition::SamplerArrayIndex);
        }
        if flags.contains(CompileOptions::EMULATE_BUILT_IN_FUNCTIONS) {
            self.emulator.mark(root);
        }
        if flags.contains(CompileOptions::REMOVE_DEAD_CODE) {
            remove_dead_code(root)?;
        }

        let hash_function = flags
            .contains(CompileOptions::HASH_NAMES)
            .then(|| {
                self.options
                    .hash_function
                    .unwrap_or(crate::glsl::names::xxh3_name_hash)
            });
        let config = GlslConfig {
            output: self.output,
            shader_version: self.shader_version(),
            clamp_strategy: self.options.clamp_strategy,
            emulate_precision: self.emulates_precision(),
            hash_function,
            builtins: &self.builtins,
        };
        let mut name_map = NameMap::new();
        let body = write_body(root, &config, &mut name_map)?;

        let mut out = String::new();
        self.write_version(&mut out, config.shader_version);
        self.write_extensions(&mut out);
        if config.emulate_precision {
            write_rounding_helpers(&mut out);
            for helper in &body.helpers.compound {
                helper.write_definition(&mut out);
            }
        }
        self.emulator.write_definitions(&mut out, self.output);
        if body.helpers.int_clamp {
            out.push_str(INT_CLAMP_HELPER);
        }
        out.push_str(&body.text);

        debug!(
            stage = %self.stage,
            ?flags,
            bytes = out.len(),
            hashed = name_map.len(),
            "shader translated"
        );
        Ok(TranslateOutput {
            object_code: out,
            info_log: self.diagnostics.info_log(),
            name_map,
        })
    }

    fn write_version(&self, out: &mut String, shader_version: u32) {
        match self.output {
            OutputType::Glsl { version } if version > 110 => {
                let _ = writeln!(out, "#version {version}");
            }
            OutputType::Essl if shader_version >= 300 => {
                let _ = writeln!(out, "#version {shader_version} es");
            }
            _ => {}
        }
    }

    fn write_extensions(&self, out: &mut String) {
        for (&name, &behavior) in &self.extensions {
            if behavior == ExtensionBehavior::Undefined {
                continue;
            }
            let name = match self.output {
                OutputType::Essl => name,
                // Desktop GL exposes the other extensions' functionality without a directive.
                OutputType::Glsl { .. } if name == EXT_SHADER_TEXTURE_LOD => {
                    "GL_ARB_shader_texture_lod"
                }
                OutputType::Glsl { .. } => continue,
            };
            let _ = writeln!(out, "#extension {name} : {}", behavior.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ast::build;
    use crate::operator::Operator;
    use crate::symbol::IdAllocator;
    use crate::types::{BasicType, Precision, Qualifier, Type};

    fn translator(output: OutputType, resources: BuiltInResources) -> Translator {
        Translator::new(ShaderStage::Fragment, ShaderSpec::Gles2, output, resources)
    }

    #[test]
    fn glsl_output_writes_version_and_mapped_extensions() {
        let resources = BuiltInResources {
            ext_shader_texture_lod: true,
            oes_standard_derivatives: true,
            ..BuiltInResources::default()
        };
        let mut translator = translator(OutputType::Glsl { version: 130 }, resources);
        let extensions = translator.extension_behavior_mut();
        extensions.insert(EXT_SHADER_TEXTURE_LOD, ExtensionBehavior::Enable);
        extensions.insert(
            crate::resources::OES_STANDARD_DERIVATIVES,
            ExtensionBehavior::Enable,
        );

        let mut ids = IdAllocator::starting_at(translator.builtins().first_user_id());
        let main = ids.new_function("main", Type::void(), vec![]);
        let mut root = build::block(vec![build::function(&main, vec![])]);

        let output = translator.translate(&mut root).expect("translate");
        assert_eq!(
            output.object_code,
            "#version 130\n#extension GL_ARB_shader_texture_lod : enable\nvoid main(){\n}\n"
        );
        assert!(output.name_map.is_empty());
    }

    #[test]
    fn helpers_precede_the_body() {
        let mut translator = translator(OutputType::Glsl { version: 110 }, BuiltInResources::default());
        translator.set_options(TranslateOptions {
            flags: CompileOptions::EMULATE_PRECISION
                | CompileOptions::CLAMP_INDIRECT_ARRAY_BOUNDS
                | CompileOptions::EMULATE_BUILT_IN_FUNCTIONS,
            clamp_strategy: ClampStrategy::WebglIntClamp,
            ..TranslateOptions::default()
        });

        let mut ids = IdAllocator::starting_at(translator.builtins().first_user_id());
        let x = ids.new_variable(
            "x",
            Type::new(BasicType::Float, Precision::Medium, Qualifier::Global, 1),
        );
        let arr = ids.new_variable(
            "arr",
            Type::new(BasicType::Float, Precision::Medium, Qualifier::Uniform, 1).with_array_size(4),
        );
        let i = ids.new_variable(
            "i",
            Type::new(BasicType::Int, Precision::High, Qualifier::Uniform, 1),
        );
        let main = ids.new_function("main", Type::void(), vec![]);
        let mut root = build::block(vec![
            build::declare(&x),
            build::function(
                &main,
                vec![
                    build::binary(
                        Operator::AddAssign,
                        build::symbol(&x),
                        build::index(build::symbol(&arr), build::symbol(&i)),
                    ),
                    build::assign(build::symbol(&x), build::unary(Operator::Cos, build::symbol(&x))),
                ],
            ),
        ]);

        let code = translator.translate(&mut root).expect("translate").object_code;
        let position = |needle: &str| code.find(needle).unwrap_or_else(|| panic!("{needle} missing"));
        assert!(position("float webgl_frm(in float x)") < position("float webgl_compound_add_frm("));
        assert!(position("float webgl_compound_add_frm(") < position("float webgl_cos_emu("));
        assert!(position("float webgl_cos_emu(") < position("int webgl_int_clamp("));
        assert!(position("int webgl_int_clamp(") < position("void main(){"));
        assert!(code.contains("webgl_compound_add_frm(x, arr[webgl_int_clamp(i, 0, 3)]);\n"));
        assert!(code.contains("(x = webgl_frm(webgl_cos_emu(webgl_frm(x))));\n"));
    }

    #[test]
    fn essl_output_ignores_precision_emulation() {
        let mut translator = translator(OutputType::Essl, BuiltInResources::default());
        translator.set_options(TranslateOptions {
            flags: CompileOptions::EMULATE_PRECISION,
            ..TranslateOptions::default()
        });
        let mut ids = IdAllocator::starting_at(translator.builtins().first_user_id());
        let x = ids.new_variable(
            "x",
            Type::new(BasicType::Float, Precision::Low, Qualifier::Global, 1),
        );
        let main = ids.new_function("main", Type::void(), vec![]);
        let mut root = build::block(vec![
            build::declare(&x),
            build::function(&main, vec![build::assign(build::symbol(&x), build::symbol(&x))]),
        ]);
        let code = translator.translate(&mut root).expect("translate").object_code;
        assert_eq!(code, "lowp float x;\nvoid main(){\n(x = x);\n}\n");
    }

    #[test]
    fn default_versions_follow_the_spec() {
        assert_eq!(default_shader_version(ShaderSpec::WebGl), 100);
        assert_eq!(default_shader_version(ShaderSpec::WebGl2), 300);
        assert_eq!(default_shader_version(ShaderSpec::Gles3_1), 310);
    }
}
