//! Built-in function, variable and constant registration.
//!
//! [`build_registry`] is the only entry point: it populates a fresh [`BuiltInTableBuilder`] for
//! one `(stage, spec, resources)` combination and freezes it. Every overload is registered
//! individually because overload resolution is by exact signature.

use std::sync::Arc;

use tracing::debug;

use crate::constant::ConstantUnion;
use crate::operator::Operator;
use crate::resources::{
    self, BuiltInResources, ShaderSpec, ShaderStage, ARB_TEXTURE_RECTANGLE,
    EXT_FRAG_DEPTH, EXT_SHADER_TEXTURE_LOD, OES_EGL_IMAGE_EXTERNAL, OES_STANDARD_DERIVATIVES,
};
use crate::symbol_table::{BuiltInLevel, BuiltInRegistry, BuiltInTableBuilder};
use crate::types::{BasicType, Field, Precision, Qualifier, Type};

use BuiltInLevel::{Common, Essl1, Essl3, Essl3_1};

fn float(size: u8) -> Type {
    Type::new(BasicType::Float, Precision::Undefined, Qualifier::Global, size)
}

fn int(size: u8) -> Type {
    Type::new(BasicType::Int, Precision::Undefined, Qualifier::Global, size)
}

fn uint(size: u8) -> Type {
    Type::new(BasicType::UInt, Precision::Undefined, Qualifier::Global, size)
}

fn boolean(size: u8) -> Type {
    Type::new(BasicType::Bool, Precision::Undefined, Qualifier::Global, size)
}

fn sampler(basic: BasicType) -> Type {
    Type::new(basic, Precision::Undefined, Qualifier::Global, 1)
}

fn mat(size: u8) -> Type {
    Type::matrix(Precision::Undefined, Qualifier::Global, size, size)
}

/// Builds the frozen registry for one compile configuration.
pub fn build_registry(
    stage: ShaderStage,
    spec: ShaderSpec,
    resources: &BuiltInResources,
) -> Arc<BuiltInRegistry> {
    let mut builder = BuiltInTableBuilder::new();
    insert_builtin_functions(&mut builder, stage, resources);
    insert_depth_range(&mut builder);
    insert_constants(&mut builder, spec, resources);
    identify_builtins(&mut builder, stage, spec, resources);
    builder.set_extension_behavior(resources::extension_behavior(resources));

    debug!(
        %stage,
        ?spec,
        common = builder.level(Common).len(),
        essl1 = builder.level(Essl1).len(),
        essl3 = builder.level(Essl3).len(),
        essl3_1 = builder.level(Essl3_1).len(),
        "built-in registry populated"
    );
    builder.finish()
}

fn insert_builtin_functions(
    b: &mut BuiltInTableBuilder,
    stage: ShaderStage,
    resources: &BuiltInResources,
) {
    insert_math_functions(b);
    insert_essl1_texture_functions(b, stage, resources);
    insert_essl3_texture_functions(b, stage);

    if stage == ShaderStage::Fragment && resources.oes_standard_derivatives {
        for level in [Essl1, Essl3] {
            for name in ["dFdx", "dFdy", "fwidth"] {
                for n in 1..=4 {
                    b.insert_builtin(level, &float(n), name, &[&float(n)]);
                }
            }
        }
    }
}

fn insert_math_functions(b: &mut BuiltInTableBuilder) {
    // Angle and trigonometry.
    for name in ["radians", "degrees", "sin", "cos", "tan", "asin", "acos"] {
        for n in 1..=4 {
            b.insert_builtin(Common, &float(n), name, &[&float(n)]);
        }
    }
    for n in 1..=4 {
        b.insert_builtin(Common, &float(n), "atan", &[&float(n), &float(n)]);
    }
    for n in 1..=4 {
        b.insert_builtin(Common, &float(n), "atan", &[&float(n)]);
    }

    // Exponential.
    for n in 1..=4 {
        b.insert_builtin(Common, &float(n), "pow", &[&float(n), &float(n)]);
    }
    for name in ["exp", "log", "exp2", "log2", "sqrt", "inversesqrt"] {
        for n in 1..=4 {
            b.insert_builtin(Common, &float(n), name, &[&float(n)]);
        }
    }

    // Common.
    for name in ["abs", "sign", "floor", "ceil", "fract"] {
        for n in 1..=4 {
            b.insert_builtin(Common, &float(n), name, &[&float(n)]);
        }
    }
    for name in ["mod", "min", "max"] {
        b.insert_builtin(Common, &float(1), name, &[&float(1), &float(1)]);
        for n in 2..=4 {
            b.insert_builtin(Common, &float(n), name, &[&float(n), &float(1)]);
        }
        for n in 2..=4 {
            b.insert_builtin(Common, &float(n), name, &[&float(n), &float(n)]);
        }
    }

    b.insert_builtin(Common, &float(1), "clamp", &[&float(1), &float(1), &float(1)]);
    for n in 2..=4 {
        b.insert_builtin(Common, &float(n), "clamp", &[&float(n), &float(1), &float(1)]);
    }
    for n in 2..=4 {
        b.insert_builtin(Common, &float(n), "clamp", &[&float(n), &float(n), &float(n)]);
    }

    b.insert_builtin(Common, &float(1), "mix", &[&float(1), &float(1), &float(1)]);
    for n in 2..=4 {
        b.insert_builtin(Common, &float(n), "mix", &[&float(n), &float(n), &float(1)]);
    }
    for n in 2..=4 {
        b.insert_builtin(Common, &float(n), "mix", &[&float(n), &float(n), &float(n)]);
    }

    b.insert_builtin(Common, &float(1), "step", &[&float(1), &float(1)]);
    for n in 2..=4 {
        b.insert_builtin(Common, &float(n), "step", &[&float(n), &float(n)]);
    }
    for n in 2..=4 {
        b.insert_builtin(Common, &float(n), "step", &[&float(1), &float(n)]);
    }

    b.insert_builtin(Common, &float(1), "smoothstep", &[&float(1), &float(1), &float(1)]);
    for n in 2..=4 {
        b.insert_builtin(Common, &float(n), "smoothstep", &[&float(n), &float(n), &float(n)]);
    }
    for n in 2..=4 {
        b.insert_builtin(Common, &float(n), "smoothstep", &[&float(1), &float(1), &float(n)]);
    }

    // Geometric.
    for n in 1..=4 {
        b.insert_builtin(Common, &float(1), "length", &[&float(n)]);
    }
    for n in 1..=4 {
        b.insert_builtin(Common, &float(1), "distance", &[&float(n), &float(n)]);
    }
    for n in 1..=4 {
        b.insert_builtin(Common, &float(1), "dot", &[&float(n), &float(n)]);
    }
    b.insert_builtin(Common, &float(3), "cross", &[&float(3), &float(3)]);
    for n in 1..=4 {
        b.insert_builtin(Common, &float(n), "normalize", &[&float(n)]);
    }
    for n in 1..=4 {
        b.insert_builtin(Common, &float(n), "faceforward", &[&float(n), &float(n), &float(n)]);
    }
    for n in 1..=4 {
        b.insert_builtin(Common, &float(n), "reflect", &[&float(n), &float(n)]);
    }
    for n in 1..=4 {
        b.insert_builtin(Common, &float(n), "refract", &[&float(n), &float(n), &float(1)]);
    }

    // Matrix.
    for n in 2..=4 {
        b.insert_builtin(Common, &mat(n), "matrixCompMult", &[&mat(n), &mat(n)]);
    }

    // Vector relational.
    for name in ["lessThan", "lessThanEqual", "greaterThan", "greaterThanEqual"] {
        for n in 2..=4 {
            b.insert_builtin(Common, &boolean(n), name, &[&float(n), &float(n)]);
        }
        for n in 2..=4 {
            b.insert_builtin(Common, &boolean(n), name, &[&int(n), &int(n)]);
        }
    }
    for name in ["equal", "notEqual"] {
        for n in 2..=4 {
            b.insert_builtin(Common, &boolean(n), name, &[&float(n), &float(n)]);
        }
        for n in 2..=4 {
            b.insert_builtin(Common, &boolean(n), name, &[&int(n), &int(n)]);
        }
        for n in 2..=4 {
            b.insert_builtin(Common, &boolean(n), name, &[&boolean(n), &boolean(n)]);
        }
    }
    for name in ["any", "all"] {
        for n in 2..=4 {
            b.insert_builtin(Common, &boolean(1), name, &[&boolean(n)]);
        }
    }
    for n in 2..=4 {
        b.insert_builtin(Common, &boolean(n), "not", &[&boolean(n)]);
    }
}

fn insert_essl1_texture_functions(
    b: &mut BuiltInTableBuilder,
    stage: ShaderStage,
    resources: &BuiltInResources,
) {
    let s2d = sampler(BasicType::Sampler2D);
    let scube = sampler(BasicType::SamplerCube);
    let sext = sampler(BasicType::SamplerExternalOes);
    let srect = sampler(BasicType::Sampler2DRect);
    let vec4 = float(4);

    b.insert_builtin(Essl1, &vec4, "texture2D", &[&s2d, &float(2)]);
    b.insert_builtin(Essl1, &vec4, "texture2DProj", &[&s2d, &float(3)]);
    b.insert_builtin(Essl1, &vec4, "texture2DProj", &[&s2d, &float(4)]);
    b.insert_builtin(Essl1, &vec4, "textureCube", &[&scube, &float(3)]);

    if resources.oes_egl_image_external {
        b.insert_builtin(Essl1, &vec4, "texture2D", &[&sext, &float(2)]);
        b.insert_builtin(Essl1, &vec4, "texture2DProj", &[&sext, &float(3)]);
        b.insert_builtin(Essl1, &vec4, "texture2DProj", &[&sext, &float(4)]);
    }

    if resources.arb_texture_rectangle {
        b.insert_builtin(Essl1, &vec4, "texture2DRect", &[&srect, &float(2)]);
        b.insert_builtin(Essl1, &vec4, "texture2DRectProj", &[&srect, &float(3)]);
        b.insert_builtin(Essl1, &vec4, "texture2DRectProj", &[&srect, &float(4)]);
    }

    match stage {
        ShaderStage::Fragment => {
            b.insert_builtin(Essl1, &vec4, "texture2D", &[&s2d, &float(2), &float(1)]);
            b.insert_builtin(Essl1, &vec4, "texture2DProj", &[&s2d, &float(3), &float(1)]);
            b.insert_builtin(Essl1, &vec4, "texture2DProj", &[&s2d, &float(4), &float(1)]);
            b.insert_builtin(Essl1, &vec4, "textureCube", &[&scube, &float(3), &float(1)]);

            if resources.ext_shader_texture_lod {
                let lod_functions: [(&str, Type, Type); 4] = [
                    ("texture2DLodEXT", s2d.clone(), float(2)),
                    ("texture2DProjLodEXT", s2d.clone(), float(3)),
                    ("texture2DProjLodEXT", s2d.clone(), float(4)),
                    ("textureCubeLodEXT", scube.clone(), float(3)),
                ];
                for (name, sampler, coord) in &lod_functions {
                    b.insert_builtin(Essl1, &vec4, name, &[sampler, coord, &float(1)]);
                }
                let grad_functions: [(&str, Type, Type, Type); 4] = [
                    ("texture2DGradEXT", s2d.clone(), float(2), float(2)),
                    ("texture2DProjGradEXT", s2d.clone(), float(3), float(2)),
                    ("texture2DProjGradEXT", s2d.clone(), float(4), float(2)),
                    ("textureCubeGradEXT", scube.clone(), float(3), float(3)),
                ];
                for (name, sampler, coord, grad) in &grad_functions {
                    b.insert_builtin(Essl1, &vec4, name, &[sampler, coord, grad, grad]);
                }
                for name in [
                    "texture2DLodEXT",
                    "texture2DProjLodEXT",
                    "textureCubeLodEXT",
                    "texture2DGradEXT",
                    "texture2DProjGradEXT",
                    "textureCubeGradEXT",
                ] {
                    b.relate_to_extension(Essl1, name, EXT_SHADER_TEXTURE_LOD);
                }
            }
        }
        ShaderStage::Vertex => {
            b.insert_builtin(Essl1, &vec4, "texture2DLod", &[&s2d, &float(2), &float(1)]);
            b.insert_builtin(Essl1, &vec4, "texture2DProjLod", &[&s2d, &float(3), &float(1)]);
            b.insert_builtin(Essl1, &vec4, "texture2DProjLod", &[&s2d, &float(4), &float(1)]);
            b.insert_builtin(Essl1, &vec4, "textureCubeLod", &[&scube, &float(3), &float(1)]);
        }
        ShaderStage::Compute => {}
    }

    if resources.oes_egl_image_external {
        // The plain sampler2D overloads share these names; only the external ones are gated.
        b.relate_sampler_to_extension(Essl1, BasicType::SamplerExternalOes, OES_EGL_IMAGE_EXTERNAL);
    }
    if resources.arb_texture_rectangle {
        b.relate_to_extension(Essl1, "texture2DRect", ARB_TEXTURE_RECTANGLE);
        b.relate_to_extension(Essl1, "texture2DRectProj", ARB_TEXTURE_RECTANGLE);
    }
}

/// Return type and sampler kind for the float, int and uint flavours of one dimensionality.
fn gsamplers(float_kind: BasicType, int_kind: BasicType, uint_kind: BasicType) -> [(Type, Type); 3] {
    [
        (float(4), sampler(float_kind)),
        (int(4), sampler(int_kind)),
        (uint(4), sampler(uint_kind)),
    ]
}

fn insert_essl3_texture_functions(b: &mut BuiltInTableBuilder, stage: ShaderStage) {
    let fragment = stage == ShaderStage::Fragment;
    let g2d = gsamplers(BasicType::Sampler2D, BasicType::ISampler2D, BasicType::USampler2D);
    let g3d = gsamplers(BasicType::Sampler3D, BasicType::ISampler3D, BasicType::USampler3D);
    let gcube = gsamplers(BasicType::SamplerCube, BasicType::ISamplerCube, BasicType::USamplerCube);
    let garray = gsamplers(
        BasicType::Sampler2DArray,
        BasicType::ISampler2DArray,
        BasicType::USampler2DArray,
    );
    let bias = float(1);

    // (samplers, coordinate) for texture() and textureLod().
    let sampled = [(&g2d, float(2)), (&g3d, float(3)), (&gcube, float(3)), (&garray, float(3))];

    for (family, coord) in &sampled {
        for (ret, s) in family.iter() {
            b.insert_builtin(Essl3, ret, "texture", &[s, coord]);
        }
    }
    for (ret, s) in &g2d {
        b.insert_builtin(Essl3, ret, "textureProj", &[s, &float(3)]);
    }
    for (ret, s) in &g2d {
        b.insert_builtin(Essl3, ret, "textureProj", &[s, &float(4)]);
    }
    for (ret, s) in &g3d {
        b.insert_builtin(Essl3, ret, "textureProj", &[s, &float(4)]);
    }
    for (family, coord) in &sampled {
        for (ret, s) in family.iter() {
            b.insert_builtin(Essl3, ret, "textureLod", &[s, coord, &float(1)]);
        }
    }

    if fragment {
        for (family, coord) in &sampled {
            for (ret, s) in family.iter() {
                b.insert_builtin(Essl3, ret, "texture", &[s, coord, &bias]);
            }
        }
        for (ret, s) in &g2d {
            b.insert_builtin(Essl3, ret, "textureProj", &[s, &float(3), &bias]);
            b.insert_builtin(Essl3, ret, "textureProj", &[s, &float(4), &bias]);
        }
        for (ret, s) in &g3d {
            b.insert_builtin(Essl3, ret, "textureProj", &[s, &float(4), &bias]);
        }
    }

    // Shadow samplers.
    let s2d_shadow = sampler(BasicType::Sampler2DShadow);
    let scube_shadow = sampler(BasicType::SamplerCubeShadow);
    let sarray_shadow = sampler(BasicType::Sampler2DArrayShadow);
    b.insert_builtin(Essl3, &float(1), "texture", &[&s2d_shadow, &float(3)]);
    b.insert_builtin(Essl3, &float(1), "texture", &[&scube_shadow, &float(4)]);
    b.insert_builtin(Essl3, &float(1), "texture", &[&sarray_shadow, &float(4)]);
    b.insert_builtin(Essl3, &float(1), "textureProj", &[&s2d_shadow, &float(4)]);
    b.insert_builtin(Essl3, &float(1), "textureLod", &[&s2d_shadow, &float(3), &float(1)]);
    if fragment {
        b.insert_builtin(Essl3, &float(1), "texture", &[&s2d_shadow, &float(3), &bias]);
        b.insert_builtin(Essl3, &float(1), "texture", &[&scube_shadow, &float(4), &bias]);
        b.insert_builtin(Essl3, &float(1), "textureProj", &[&s2d_shadow, &float(4), &bias]);
    }

    // textureSize.
    for (family, size) in [(&g2d, 2), (&g3d, 3), (&gcube, 2), (&garray, 3)] {
        for (_, s) in family.iter() {
            b.insert_builtin(Essl3, &int(size), "textureSize", &[s, &int(1)]);
        }
    }
    b.insert_builtin(Essl3, &int(2), "textureSize", &[&s2d_shadow, &int(1)]);
    b.insert_builtin(Essl3, &int(2), "textureSize", &[&scube_shadow, &int(1)]);
    b.insert_builtin(Essl3, &int(3), "textureSize", &[&sarray_shadow, &int(1)]);

    // textureOffset.
    let offset = [(&g2d, float(2), int(2)), (&g3d, float(3), int(3)), (&garray, float(3), int(2))];
    for (family, coord, off) in &offset {
        for (ret, s) in family.iter() {
            b.insert_builtin(Essl3, ret, "textureOffset", &[s, coord, off]);
            if fragment {
                b.insert_builtin(Essl3, ret, "textureOffset", &[s, coord, off, &bias]);
            }
        }
    }
    b.insert_builtin(Essl3, &float(1), "textureOffset", &[&s2d_shadow, &float(3), &int(2)]);
    if fragment {
        b.insert_builtin(
            Essl3,
            &float(1),
            "textureOffset",
            &[&s2d_shadow, &float(3), &int(2), &bias],
        );
    }
}

fn insert_depth_range(b: &mut BuiltInTableBuilder) {
    let highp = Type::new(BasicType::Float, Precision::High, Qualifier::Global, 1);
    let fields = ["near", "far", "diff"]
        .into_iter()
        .map(|name| Field {
            name: name.to_owned(),
            ty: highp.clone(),
        })
        .collect();
    let structure = b.insert_struct(Common, "gl_DepthRangeParameters", fields);
    b.insert_variable(
        Common,
        "gl_DepthRange",
        Type::structure(structure, Qualifier::Uniform),
    );
}

fn insert_constants(b: &mut BuiltInTableBuilder, spec: ShaderSpec, r: &BuiltInResources) {
    b.insert_const_int(Common, "gl_MaxVertexAttribs", r.max_vertex_attribs);
    b.insert_const_int(Common, "gl_MaxVertexUniformVectors", r.max_vertex_uniform_vectors);
    b.insert_const_int(Common, "gl_MaxVertexTextureImageUnits", r.max_vertex_texture_image_units);
    b.insert_const_int(
        Common,
        "gl_MaxCombinedTextureImageUnits",
        r.max_combined_texture_image_units,
    );
    b.insert_const_int(Common, "gl_MaxTextureImageUnits", r.max_texture_image_units);
    b.insert_const_int(Common, "gl_MaxFragmentUniformVectors", r.max_fragment_uniform_vectors);

    b.insert_const_int(Essl1, "gl_MaxVaryingVectors", r.max_varying_vectors);

    if spec != ShaderSpec::CssShaders {
        b.insert_const_int(Common, "gl_MaxDrawBuffers", r.max_draw_buffers);
    }

    b.insert_const_int(Essl3, "gl_MaxVertexOutputVectors", r.max_vertex_output_vectors);
    b.insert_const_int(Essl3, "gl_MaxFragmentInputVectors", r.max_fragment_input_vectors);
    b.insert_const_int(Essl3, "gl_MinProgramTexelOffset", r.min_program_texel_offset);
    b.insert_const_int(Essl3, "gl_MaxProgramTexelOffset", r.max_program_texel_offset);

    let ivec3 = Type::new(BasicType::Int, Precision::High, Qualifier::Const, 3);
    b.insert_const(
        Essl3_1,
        "gl_MaxComputeWorkGroupCount",
        ivec3.clone(),
        r.max_compute_work_group_count.map(ConstantUnion::Int).to_vec(),
    );
    b.insert_const(
        Essl3_1,
        "gl_MaxComputeWorkGroupSize",
        ivec3,
        r.max_compute_work_group_size.map(ConstantUnion::Int).to_vec(),
    );
}

/// Special variables and operator relations.
fn identify_builtins(
    b: &mut BuiltInTableBuilder,
    stage: ShaderStage,
    spec: ShaderSpec,
    r: &BuiltInResources,
) {
    let var = |basic, precision, qualifier, size| Type::new(basic, precision, qualifier, size);
    use BasicType::{Bool, Float, UInt};
    use Precision::{High, Medium, Undefined};

    match stage {
        ShaderStage::Fragment => {
            b.insert_variable(Common, "gl_FragCoord", var(Float, Medium, Qualifier::FragCoord, 4));
            b.insert_variable(Common, "gl_FrontFacing", var(Bool, Undefined, Qualifier::FrontFacing, 1));
            b.insert_variable(Common, "gl_PointCoord", var(Float, Medium, Qualifier::PointCoord, 2));

            if spec != ShaderSpec::CssShaders {
                b.insert_variable(Essl1, "gl_FragColor", var(Float, Medium, Qualifier::FragColor, 4));
                let frag_data = var(Float, Medium, Qualifier::FragData, 4)
                    .with_array_size(u32::try_from(r.max_draw_buffers).unwrap_or(0));
                b.insert_variable(Essl1, "gl_FragData", frag_data);
                if r.ext_frag_depth {
                    let precision = if r.fragment_precision_high { High } else { Medium };
                    b.insert_variable(
                        Essl1,
                        "gl_FragDepthEXT",
                        var(Float, precision, Qualifier::FragDepthExt, 1),
                    );
                    b.relate_to_extension(Essl1, "gl_FragDepthEXT", EXT_FRAG_DEPTH);
                }
            } else {
                b.insert_variable(Essl1, "css_MixColor", var(Float, Medium, Qualifier::Global, 4));
                b.insert_variable(
                    Essl1,
                    "css_ColorMatrix",
                    Type::matrix(Medium, Qualifier::Global, 4, 4),
                );
            }
        }
        ShaderStage::Vertex => {
            b.insert_variable(Common, "gl_Position", var(Float, High, Qualifier::Position, 4));
            b.insert_variable(Common, "gl_PointSize", var(Float, Medium, Qualifier::PointSize, 1));
        }
        ShaderStage::Compute => {
            for (name, qualifier) in [
                ("gl_NumWorkGroups", Qualifier::NumWorkGroups),
                ("gl_WorkGroupID", Qualifier::WorkGroupId),
                ("gl_LocalInvocationID", Qualifier::LocalInvocationId),
                ("gl_GlobalInvocationID", Qualifier::GlobalInvocationId),
            ] {
                b.insert_variable(Essl3_1, name, var(UInt, High, qualifier, 3));
            }
            b.insert_variable(
                Essl3_1,
                "gl_LocalInvocationIndex",
                var(UInt, High, Qualifier::LocalInvocationIndex, 1),
            );
            let size = r
                .max_compute_work_group_size
                .map(|v| ConstantUnion::UInt(u32::try_from(v).unwrap_or(0)))
                .to_vec();
            b.insert_const(
                Essl3_1,
                "gl_WorkGroupSize",
                var(UInt, High, Qualifier::WorkGroupSize, 3),
                size,
            );
        }
    }

    relate_common_operators(b);

    if stage == ShaderStage::Fragment && r.oes_standard_derivatives {
        for level in [Essl1, Essl3] {
            b.relate_to_operator(level, "dFdx", Operator::DFdx);
            b.relate_to_operator(level, "dFdy", Operator::DFdy);
            b.relate_to_operator(level, "fwidth", Operator::Fwidth);
        }
        for name in ["dFdx", "dFdy", "fwidth"] {
            b.relate_to_extension(Essl1, name, OES_STANDARD_DERIVATIVES);
        }
    }
}

fn relate_common_operators(b: &mut BuiltInTableBuilder) {
    const RELATIONS: &[(&str, Operator)] = &[
        ("matrixCompMult", Operator::MatrixCompMult),
        ("equal", Operator::VectorEqual),
        ("notEqual", Operator::VectorNotEqual),
        ("lessThan", Operator::VectorLessThan),
        ("greaterThan", Operator::VectorGreaterThan),
        ("lessThanEqual", Operator::VectorLessThanEqual),
        ("greaterThanEqual", Operator::VectorGreaterThanEqual),
        ("radians", Operator::Radians),
        ("degrees", Operator::Degrees),
        ("sin", Operator::Sin),
        ("cos", Operator::Cos),
        ("tan", Operator::Tan),
        ("asin", Operator::Asin),
        ("acos", Operator::Acos),
        ("atan", Operator::Atan),
        ("pow", Operator::Pow),
        ("exp2", Operator::Exp2),
        ("log", Operator::Log),
        ("exp", Operator::Exp),
        ("log2", Operator::Log2),
        ("sqrt", Operator::Sqrt),
        ("inversesqrt", Operator::InverseSqrt),
        ("abs", Operator::Abs),
        ("sign", Operator::Sign),
        ("floor", Operator::Floor),
        ("ceil", Operator::Ceil),
        ("fract", Operator::Fract),
        ("mod", Operator::Mod),
        ("min", Operator::Min),
        ("max", Operator::Max),
        ("clamp", Operator::Clamp),
        ("mix", Operator::Mix),
        ("step", Operator::Step),
        ("smoothstep", Operator::SmoothStep),
        ("length", Operator::Length),
        ("distance", Operator::Distance),
        ("dot", Operator::Dot),
        ("cross", Operator::Cross),
        ("normalize", Operator::Normalize),
        ("faceforward", Operator::FaceForward),
        ("reflect", Operator::Reflect),
        ("refract", Operator::Refract),
        ("any", Operator::Any),
        ("all", Operator::All),
        ("not", Operator::VectorLogicalNot),
    ];
    for &(name, op) in RELATIONS {
        b.relate_to_operator(Common, name, op);
    }
}
