//! Translation of abstract pipeline state into `wgpu` pipeline descriptors.
//!
//! WebGPU bakes blend, depth-stencil and primitive state into immutable render pipelines, so the
//! translated pieces are memoized per packed state key in [`PipelineStateCache`].

use hashbrown::HashMap;
use std::hash::Hash;
use tracing::trace;

use crate::state::{
    BlendEquation, BlendFactor, BlendState, ColorF, CompareFunc, CullFace, DepthStencilState,
    FrontFace, PackedBlendState, PackedDepthStencilState, PackedRasterizerState, PipelineState,
    RasterizerState, StencilOp,
};
use crate::CacheStats;

/// WebGPU has no constant-alpha factor; see [`translate_blend_constant`].
pub fn translate_blend_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    match factor {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcColor => wgpu::BlendFactor::Src,
        BlendFactor::OneMinusSrcColor => wgpu::BlendFactor::OneMinusSrc,
        BlendFactor::DstColor => wgpu::BlendFactor::Dst,
        BlendFactor::OneMinusDstColor => wgpu::BlendFactor::OneMinusDst,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
        BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
        BlendFactor::ConstantColor | BlendFactor::ConstantAlpha => wgpu::BlendFactor::Constant,
        BlendFactor::OneMinusConstantColor | BlendFactor::OneMinusConstantAlpha => {
            wgpu::BlendFactor::OneMinusConstant
        }
        BlendFactor::SrcAlphaSaturate => wgpu::BlendFactor::SrcAlphaSaturated,
    }
}

pub fn translate_blend_equation(equation: BlendEquation) -> wgpu::BlendOperation {
    match equation {
        BlendEquation::Add => wgpu::BlendOperation::Add,
        BlendEquation::Subtract => wgpu::BlendOperation::Subtract,
        BlendEquation::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
        BlendEquation::Min => wgpu::BlendOperation::Min,
        BlendEquation::Max => wgpu::BlendOperation::Max,
    }
}

fn translate_blend_component(
    src: BlendFactor,
    dst: BlendFactor,
    equation: BlendEquation,
) -> wgpu::BlendComponent {
    let operation = translate_blend_equation(equation);
    // GL ignores the factors for min/max; WebGPU requires them to be `One`.
    let (src_factor, dst_factor) = match equation {
        BlendEquation::Min | BlendEquation::Max => (wgpu::BlendFactor::One, wgpu::BlendFactor::One),
        _ => (translate_blend_factor(src), translate_blend_factor(dst)),
    };
    wgpu::BlendComponent {
        src_factor,
        dst_factor,
        operation,
    }
}

/// `None` when blending is disabled.
pub fn translate_blend_state(blend: &BlendState) -> Option<wgpu::BlendState> {
    blend.blend.then(|| wgpu::BlendState {
        color: translate_blend_component(
            blend.source_blend_rgb,
            blend.dest_blend_rgb,
            blend.blend_equation_rgb,
        ),
        alpha: translate_blend_component(
            blend.source_blend_alpha,
            blend.dest_blend_alpha,
            blend.blend_equation_alpha,
        ),
    })
}

pub fn translate_color_write_mask(blend: &BlendState) -> wgpu::ColorWrites {
    let mut mask = wgpu::ColorWrites::empty();
    if blend.color_mask_red {
        mask |= wgpu::ColorWrites::RED;
    }
    if blend.color_mask_green {
        mask |= wgpu::ColorWrites::GREEN;
    }
    if blend.color_mask_blue {
        mask |= wgpu::ColorWrites::BLUE;
    }
    if blend.color_mask_alpha {
        mask |= wgpu::ColorWrites::ALPHA;
    }
    mask
}

pub fn translate_color_target(
    blend: &BlendState,
    format: wgpu::TextureFormat,
) -> wgpu::ColorTargetState {
    wgpu::ColorTargetState {
        format,
        blend: translate_blend_state(blend),
        write_mask: translate_color_write_mask(blend),
    }
}

/// Value for `RenderPass::set_blend_constant`. Constant-alpha factors are expressed as
/// `Constant` with the alpha replicated into every channel.
pub fn translate_blend_constant(blend: &BlendState, color: ColorF) -> wgpu::Color {
    let color = if blend.uses_constant_alpha() {
        color.splat_alpha()
    } else {
        color
    };
    wgpu::Color {
        r: f64::from(color.red),
        g: f64::from(color.green),
        b: f64::from(color.blue),
        a: f64::from(color.alpha),
    }
}

pub fn translate_compare_func(func: CompareFunc) -> wgpu::CompareFunction {
    match func {
        CompareFunc::Never => wgpu::CompareFunction::Never,
        CompareFunc::Less => wgpu::CompareFunction::Less,
        CompareFunc::Equal => wgpu::CompareFunction::Equal,
        CompareFunc::LessEqual => wgpu::CompareFunction::LessEqual,
        CompareFunc::Greater => wgpu::CompareFunction::Greater,
        CompareFunc::NotEqual => wgpu::CompareFunction::NotEqual,
        CompareFunc::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
        CompareFunc::Always => wgpu::CompareFunction::Always,
    }
}

pub fn translate_stencil_op(op: StencilOp) -> wgpu::StencilOperation {
    match op {
        StencilOp::Keep => wgpu::StencilOperation::Keep,
        StencilOp::Zero => wgpu::StencilOperation::Zero,
        StencilOp::Replace => wgpu::StencilOperation::Replace,
        StencilOp::Incr => wgpu::StencilOperation::IncrementClamp,
        StencilOp::Decr => wgpu::StencilOperation::DecrementClamp,
        StencilOp::Invert => wgpu::StencilOperation::Invert,
        StencilOp::IncrWrap => wgpu::StencilOperation::IncrementWrap,
        StencilOp::DecrWrap => wgpu::StencilOperation::DecrementWrap,
    }
}

/// Polygon offset as a pipeline depth bias. Units are passed through unscaled: WebGPU, like GL,
/// expresses the constant bias in minimum resolvable depth steps.
pub fn translate_depth_bias(raster: &RasterizerState) -> wgpu::DepthBiasState {
    if !raster.polygon_offset_fill {
        return wgpu::DepthBiasState::default();
    }
    wgpu::DepthBiasState {
        constant: raster.polygon_offset_units as i32,
        slope_scale: raster.polygon_offset_factor,
        clamp: 0.0,
    }
}

/// WebGPU has a single stencil read and write mask, so the front-face masks are used for both
/// faces.
pub fn translate_depth_stencil_state(
    ds: &DepthStencilState,
    raster: &RasterizerState,
    format: wgpu::TextureFormat,
) -> wgpu::DepthStencilState {
    let stencil = if ds.stencil_test {
        wgpu::StencilState {
            front: wgpu::StencilFaceState {
                compare: translate_compare_func(ds.stencil_func),
                fail_op: translate_stencil_op(ds.stencil_fail),
                depth_fail_op: translate_stencil_op(ds.stencil_pass_depth_fail),
                pass_op: translate_stencil_op(ds.stencil_pass_depth_pass),
            },
            back: wgpu::StencilFaceState {
                compare: translate_compare_func(ds.stencil_back_func),
                fail_op: translate_stencil_op(ds.stencil_back_fail),
                depth_fail_op: translate_stencil_op(ds.stencil_back_pass_depth_fail),
                pass_op: translate_stencil_op(ds.stencil_back_pass_depth_pass),
            },
            read_mask: ds.stencil_mask,
            write_mask: ds.stencil_writemask,
        }
    } else {
        wgpu::StencilState::default()
    };

    // With the depth test disabled GL neither tests nor writes depth.
    let (depth_write_enabled, depth_compare) = if ds.depth_test {
        (ds.depth_mask, translate_compare_func(ds.depth_func))
    } else {
        (false, wgpu::CompareFunction::Always)
    };

    wgpu::DepthStencilState {
        format,
        depth_write_enabled,
        depth_compare,
        stencil,
        bias: translate_depth_bias(raster),
    }
}

/// Cull mode is `None` for `FrontAndBack`; callers skip those draws entirely (see
/// [`RasterizerState::culls_everything`]).
pub fn translate_cull_and_front_face(
    raster: &RasterizerState,
) -> (wgpu::FrontFace, Option<wgpu::Face>) {
    let front_face = match raster.front_face {
        FrontFace::Ccw => wgpu::FrontFace::Ccw,
        FrontFace::Cw => wgpu::FrontFace::Cw,
    };
    let cull_mode = if raster.cull_face {
        match raster.cull_mode {
            CullFace::Front => Some(wgpu::Face::Front),
            CullFace::Back => Some(wgpu::Face::Back),
            CullFace::FrontAndBack => None,
        }
    } else {
        None
    };
    (front_face, cull_mode)
}

pub fn translate_primitive_state(
    raster: &RasterizerState,
    topology: wgpu::PrimitiveTopology,
) -> wgpu::PrimitiveState {
    let (front_face, cull_mode) = translate_cull_and_front_face(raster);
    wgpu::PrimitiveState {
        topology,
        front_face,
        cull_mode,
        ..Default::default()
    }
}

pub fn translate_multisample_state(state: &PipelineState, count: u32) -> wgpu::MultisampleState {
    wgpu::MultisampleState {
        count,
        mask: u64::from(state.sample_mask),
        alpha_to_coverage_enabled: count > 1 && state.blend.sample_alpha_to_coverage,
    }
}

type DepthStencilKey = (PackedDepthStencilState, PackedRasterizerState, wgpu::TextureFormat);

/// Memoizes translated pipeline pieces per packed state.
#[derive(Debug, Default)]
pub struct PipelineStateCache {
    color_targets: HashMap<(PackedBlendState, wgpu::TextureFormat), wgpu::ColorTargetState>,
    depth_stencil: HashMap<DepthStencilKey, wgpu::DepthStencilState>,
    primitives: HashMap<(PackedRasterizerState, wgpu::PrimitiveTopology), wgpu::PrimitiveState>,
    hits: u64,
    misses: u64,
}

impl PipelineStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color_target(
        &mut self,
        blend: &BlendState,
        format: wgpu::TextureFormat,
    ) -> wgpu::ColorTargetState {
        get_or_create(
            &mut self.color_targets,
            &mut self.hits,
            &mut self.misses,
            (blend.packed(), format),
            || translate_color_target(blend, format),
        )
    }

    pub fn depth_stencil(
        &mut self,
        ds: &DepthStencilState,
        raster: &RasterizerState,
        format: wgpu::TextureFormat,
    ) -> wgpu::DepthStencilState {
        get_or_create(
            &mut self.depth_stencil,
            &mut self.hits,
            &mut self.misses,
            (ds.packed(), raster.packed(), format),
            || translate_depth_stencil_state(ds, raster, format),
        )
    }

    pub fn primitive(
        &mut self,
        raster: &RasterizerState,
        topology: wgpu::PrimitiveTopology,
    ) -> wgpu::PrimitiveState {
        get_or_create(
            &mut self.primitives,
            &mut self.hits,
            &mut self.misses,
            (raster.packed(), topology),
            || translate_primitive_state(raster, topology),
        )
    }

    pub fn clear(&mut self) {
        self.color_targets.clear();
        self.depth_stencil.clear();
        self.primitives.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.color_targets.len() + self.depth_stencil.len() + self.primitives.len(),
        }
    }
}

fn get_or_create<K: Hash + Eq, V: Clone>(
    map: &mut HashMap<K, V>,
    hits: &mut u64,
    misses: &mut u64,
    key: K,
    create: impl FnOnce() -> V,
) -> V {
    if let Some(value) = map.get(&key) {
        *hits += 1;
        return value.clone();
    }
    *misses += 1;
    trace!(entries = map.len() + 1, "translated pipeline state");
    let value = create();
    map.insert(key, value.clone());
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn min_max_force_unit_factors() {
        let blend = BlendState {
            blend: true,
            source_blend_rgb: BlendFactor::SrcAlpha,
            blend_equation_rgb: BlendEquation::Min,
            ..BlendState::default()
        };
        let translated = translate_blend_state(&blend).unwrap();
        assert_eq!(
            translated.color,
            wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Min,
            }
        );
        assert_eq!(translated.alpha, wgpu::BlendComponent::REPLACE);
        assert_eq!(translate_blend_state(&BlendState::default()), None);
    }

    #[test]
    fn blend_constant_replicates_constant_alpha() {
        let blend = BlendState {
            blend: true,
            source_blend_rgb: BlendFactor::ConstantAlpha,
            ..BlendState::default()
        };
        let color = ColorF::new(0.25, 0.5, 0.75, 0.5);
        assert_eq!(
            translate_blend_constant(&blend, color),
            wgpu::Color {
                r: 0.5,
                g: 0.5,
                b: 0.5,
                a: 0.5
            }
        );
        assert_eq!(
            translate_blend_constant(&BlendState::default(), color).r,
            0.25
        );
    }

    #[test]
    fn disabled_depth_test_neither_tests_nor_writes() {
        let ds = DepthStencilState::default();
        let translated = translate_depth_stencil_state(
            &ds,
            &RasterizerState::default(),
            wgpu::TextureFormat::Depth24PlusStencil8,
        );
        assert!(!translated.depth_write_enabled);
        assert_eq!(translated.depth_compare, wgpu::CompareFunction::Always);
        assert_eq!(translated.stencil, wgpu::StencilState::default());
        assert_eq!(translated.bias, wgpu::DepthBiasState::default());
    }

    #[test]
    fn stencil_and_bias_are_translated() {
        let ds = DepthStencilState {
            depth_test: true,
            depth_func: CompareFunc::GreaterEqual,
            stencil_test: true,
            stencil_func: CompareFunc::Equal,
            stencil_mask: 0x0F,
            stencil_writemask: 0xF0,
            stencil_back_pass_depth_pass: StencilOp::IncrWrap,
            ..DepthStencilState::default()
        };
        let raster = RasterizerState {
            polygon_offset_fill: true,
            polygon_offset_factor: 2.0,
            polygon_offset_units: -3.0,
            ..RasterizerState::default()
        };
        let translated =
            translate_depth_stencil_state(&ds, &raster, wgpu::TextureFormat::Depth24PlusStencil8);
        assert!(translated.depth_write_enabled);
        assert_eq!(translated.depth_compare, wgpu::CompareFunction::GreaterEqual);
        assert_eq!(translated.stencil.front.compare, wgpu::CompareFunction::Equal);
        assert_eq!(
            translated.stencil.back.pass_op,
            wgpu::StencilOperation::IncrementWrap
        );
        assert_eq!(translated.stencil.read_mask, 0x0F);
        assert_eq!(translated.stencil.write_mask, 0xF0);
        assert_eq!(translated.bias.constant, -3);
        assert_eq!(translated.bias.slope_scale, 2.0);
    }

    #[test]
    fn cache_memoizes_per_packed_state() {
        let mut cache = PipelineStateCache::new();
        let format = wgpu::TextureFormat::Rgba8Unorm;
        let blend = BlendState::default();
        let first = cache.color_target(&blend, format);
        let second = cache.color_target(&blend, format);
        assert_eq!(first, second);
        cache.color_target(&blend, wgpu::TextureFormat::Bgra8Unorm);

        let raster = RasterizerState::default();
        cache.primitive(&raster, wgpu::PrimitiveTopology::TriangleList);
        cache.primitive(&raster, wgpu::PrimitiveTopology::TriangleList);

        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 2,
                misses: 3,
                entries: 3
            }
        );
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn multisample_mask_and_coverage() {
        let mut state = PipelineState::default();
        state.sample_mask = 0b1010;
        state.blend.sample_alpha_to_coverage = true;
        let ms = translate_multisample_state(&state, 4);
        assert_eq!(ms.mask, 0b1010);
        assert!(ms.alpha_to_coverage_enabled);
        assert!(!translate_multisample_state(&state, 1).alpha_to_coverage_enabled);
    }
}
