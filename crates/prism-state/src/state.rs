//! Abstract pipeline state shared by every backend.
//!
//! These are "semantic" types (not raw GL enums) so each backend maps them onto its own native
//! constants. Each state block also has a packed `Pod` form; caches compare and key on the packed
//! bytes.

use std::fmt;

use bytemuck::{Pod, Zeroable};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
    SrcAlphaSaturate,
}

impl BlendFactor {
    pub fn is_constant_alpha(self) -> bool {
        matches!(self, BlendFactor::ConstantAlpha | BlendFactor::OneMinusConstantAlpha)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendEquation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    /// Saturating increment.
    Incr,
    /// Saturating decrement.
    Decr,
    Invert,
    IncrWrap,
    DecrWrap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CullFace {
    Front,
    Back,
    FrontAndBack,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrontFace {
    Cw,
    Ccw,
}

macro_rules! impl_display {
    ($ty:ident { $($variant:ident => $name:literal),* $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self {
                    $($ty::$variant => $name,)*
                })
            }
        }
    };
}

impl_display!(CompareFunc {
    Never => "never",
    Less => "less",
    Equal => "equal",
    LessEqual => "less_equal",
    Greater => "greater",
    NotEqual => "not_equal",
    GreaterEqual => "greater_equal",
    Always => "always",
});

impl_display!(CullFace {
    Front => "front",
    Back => "back",
    FrontAndBack => "front_and_back",
});

impl_display!(FrontFace {
    Cw => "cw",
    Ccw => "ccw",
});

/// RGBA colour with float channels.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ColorF {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl ColorF {
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }

    /// All four channels set to `alpha`.
    pub fn splat_alpha(self) -> Self {
        Self::new(self.alpha, self.alpha, self.alpha, self.alpha)
    }

    /// Byte-wise equality, so `-0.0 != 0.0` and identical NaNs compare equal.
    pub fn bitwise_eq(&self, other: &Self) -> bool {
        bytemuck::bytes_of(self) == bytemuck::bytes_of(other)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub blend: bool,
    pub source_blend_rgb: BlendFactor,
    pub dest_blend_rgb: BlendFactor,
    pub source_blend_alpha: BlendFactor,
    pub dest_blend_alpha: BlendFactor,
    pub blend_equation_rgb: BlendEquation,
    pub blend_equation_alpha: BlendEquation,
    pub color_mask_red: bool,
    pub color_mask_green: bool,
    pub color_mask_blue: bool,
    pub color_mask_alpha: bool,
    pub sample_alpha_to_coverage: bool,
    pub dither: bool,
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            blend: false,
            source_blend_rgb: BlendFactor::One,
            dest_blend_rgb: BlendFactor::Zero,
            source_blend_alpha: BlendFactor::One,
            dest_blend_alpha: BlendFactor::Zero,
            blend_equation_rgb: BlendEquation::Add,
            blend_equation_alpha: BlendEquation::Add,
            color_mask_red: true,
            color_mask_green: true,
            color_mask_blue: true,
            color_mask_alpha: true,
            sample_alpha_to_coverage: false,
            dither: true,
        }
    }
}

impl BlendState {
    /// Whether either RGB factor reads the constant alpha. Backends without a separate constant
    /// alpha factor replicate the alpha channel into the blend colour instead.
    pub fn uses_constant_alpha(&self) -> bool {
        self.source_blend_rgb.is_constant_alpha() || self.dest_blend_rgb.is_constant_alpha()
    }

    /// Whether the alpha channel blends differently from the colour channels.
    pub fn has_separate_alpha(&self) -> bool {
        self.source_blend_rgb != self.source_blend_alpha
            || self.dest_blend_rgb != self.dest_blend_alpha
            || self.blend_equation_rgb != self.blend_equation_alpha
    }

    pub fn color_mask(&self) -> [bool; 4] {
        [
            self.color_mask_red,
            self.color_mask_green,
            self.color_mask_blue,
            self.color_mask_alpha,
        ]
    }

    pub fn packed(&self) -> PackedBlendState {
        PackedBlendState {
            factors: [
                self.source_blend_rgb as u8,
                self.dest_blend_rgb as u8,
                self.source_blend_alpha as u8,
                self.dest_blend_alpha as u8,
            ],
            equations: [
                self.blend_equation_rgb as u8,
                self.blend_equation_alpha as u8,
                0,
                0,
            ],
            flags: pack_flags(&[
                self.blend,
                self.color_mask_red,
                self.color_mask_green,
                self.color_mask_blue,
                self.color_mask_alpha,
                self.sample_alpha_to_coverage,
                self.dither,
            ]),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DepthStencilState {
    pub depth_test: bool,
    pub depth_func: CompareFunc,
    pub depth_mask: bool,

    pub stencil_test: bool,
    pub stencil_func: CompareFunc,
    pub stencil_mask: u32,
    pub stencil_fail: StencilOp,
    pub stencil_pass_depth_fail: StencilOp,
    pub stencil_pass_depth_pass: StencilOp,
    pub stencil_writemask: u32,

    pub stencil_back_func: CompareFunc,
    pub stencil_back_mask: u32,
    pub stencil_back_fail: StencilOp,
    pub stencil_back_pass_depth_fail: StencilOp,
    pub stencil_back_pass_depth_pass: StencilOp,
    pub stencil_back_writemask: u32,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_test: false,
            depth_func: CompareFunc::Less,
            depth_mask: true,
            stencil_test: false,
            stencil_func: CompareFunc::Always,
            stencil_mask: u32::MAX,
            stencil_fail: StencilOp::Keep,
            stencil_pass_depth_fail: StencilOp::Keep,
            stencil_pass_depth_pass: StencilOp::Keep,
            stencil_writemask: u32::MAX,
            stencil_back_func: CompareFunc::Always,
            stencil_back_mask: u32::MAX,
            stencil_back_fail: StencilOp::Keep,
            stencil_back_pass_depth_fail: StencilOp::Keep,
            stencil_back_pass_depth_pass: StencilOp::Keep,
            stencil_back_writemask: u32::MAX,
        }
    }
}

impl DepthStencilState {
    pub fn packed(&self) -> PackedDepthStencilState {
        PackedDepthStencilState {
            funcs: [
                self.depth_func as u8,
                self.stencil_func as u8,
                self.stencil_back_func as u8,
                0,
            ],
            front_ops: [
                self.stencil_fail as u8,
                self.stencil_pass_depth_fail as u8,
                self.stencil_pass_depth_pass as u8,
                0,
            ],
            back_ops: [
                self.stencil_back_fail as u8,
                self.stencil_back_pass_depth_fail as u8,
                self.stencil_back_pass_depth_pass as u8,
                0,
            ],
            stencil_mask: self.stencil_mask,
            stencil_writemask: self.stencil_writemask,
            stencil_back_mask: self.stencil_back_mask,
            stencil_back_writemask: self.stencil_back_writemask,
            flags: pack_flags(&[self.depth_test, self.depth_mask, self.stencil_test]),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterizerState {
    pub cull_face: bool,
    pub cull_mode: CullFace,
    pub front_face: FrontFace,
    pub polygon_offset_fill: bool,
    pub polygon_offset_factor: f32,
    pub polygon_offset_units: f32,
    pub point_draw_mode: bool,
    pub multi_sample: bool,
    pub rasterizer_discard: bool,
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self {
            cull_face: false,
            cull_mode: CullFace::Back,
            front_face: FrontFace::Ccw,
            polygon_offset_fill: false,
            polygon_offset_factor: 0.0,
            polygon_offset_units: 0.0,
            point_draw_mode: false,
            multi_sample: false,
            rasterizer_discard: false,
        }
    }
}

impl RasterizerState {
    /// `FRONT_AND_BACK` culling: no native rasterizer expresses it, so draws are skipped.
    pub fn culls_everything(&self) -> bool {
        self.cull_face && self.cull_mode == CullFace::FrontAndBack
    }

    pub fn packed(&self) -> PackedRasterizerState {
        PackedRasterizerState {
            modes: [self.cull_mode as u8, self.front_face as u8, 0, 0],
            polygon_offset_factor: self.polygon_offset_factor.to_bits(),
            polygon_offset_units: self.polygon_offset_units.to_bits(),
            flags: pack_flags(&[
                self.cull_face,
                self.polygon_offset_fill,
                self.point_draw_mode,
                self.multi_sample,
                self.rasterizer_discard,
            ]),
        }
    }
}

fn pack_flags(flags: &[bool]) -> u32 {
    flags
        .iter()
        .enumerate()
        .fold(0, |acc, (i, &set)| acc | (u32::from(set) << i))
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct PackedBlendState {
    pub factors: [u8; 4],
    pub equations: [u8; 4],
    pub flags: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct PackedDepthStencilState {
    pub funcs: [u8; 4],
    pub front_ops: [u8; 4],
    pub back_ops: [u8; 4],
    pub stencil_mask: u32,
    pub stencil_writemask: u32,
    pub stencil_back_mask: u32,
    pub stencil_back_writemask: u32,
    pub flags: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct PackedRasterizerState {
    pub modes: [u8; 4],
    pub polygon_offset_factor: u32,
    pub polygon_offset_units: u32,
    pub flags: u32,
}

/// Byte-wise comparison of two packed state blocks.
pub fn bytes_differ<T: Pod>(a: &T, b: &T) -> bool {
    bytemuck::bytes_of(a) != bytemuck::bytes_of(b)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelUnpackState {
    pub alignment: i32,
    pub row_length: i32,
    pub skip_rows: i32,
    pub skip_pixels: i32,
    pub image_height: i32,
    pub skip_images: i32,
}

impl Default for PixelUnpackState {
    fn default() -> Self {
        Self {
            alignment: 4,
            row_length: 0,
            skip_rows: 0,
            skip_pixels: 0,
            image_height: 0,
            skip_images: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelPackState {
    pub alignment: i32,
    pub row_length: i32,
    pub skip_rows: i32,
    pub skip_pixels: i32,
}

impl Default for PixelPackState {
    fn default() -> Self {
        Self {
            alignment: 4,
            row_length: 0,
            skip_rows: 0,
            skip_pixels: 0,
        }
    }
}

/// Bit depths of the bound framebuffer that state translation depends on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FramebufferInfo {
    pub color_attachments: u8,
    /// Red, green, blue and alpha bits of the first colour attachment; zero when there is none.
    pub first_color_bits: [u8; 4],
    pub depth_bits: u8,
    pub stencil_bits: u8,
}

impl FramebufferInfo {
    pub fn rgba8() -> Self {
        Self {
            color_attachments: 1,
            first_color_bits: [8; 4],
            depth_bits: 24,
            stencil_bits: 8,
        }
    }
}

/// Front-end view of the whole pipeline state, as the API layer tracks it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineState {
    pub blend: BlendState,
    pub blend_color: ColorF,
    pub sample_mask: u32,
    pub sample_coverage_enabled: bool,
    pub sample_coverage_value: f32,
    pub sample_coverage_invert: bool,

    pub depth_stencil: DepthStencilState,
    pub stencil_ref: i32,
    pub stencil_back_ref: i32,

    pub rasterizer: RasterizerState,
    pub line_width: f32,
    pub primitive_restart: bool,

    pub scissor_test: bool,
    pub scissor: Rectangle,
    pub viewport: Rectangle,
    pub near: f32,
    pub far: f32,

    pub clear_color: ColorF,
    pub clear_depth: f32,
    pub clear_stencil: i32,

    pub unpack: PixelUnpackState,
    pub pack: PixelPackState,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            blend: BlendState::default(),
            blend_color: ColorF::default(),
            sample_mask: u32::MAX,
            sample_coverage_enabled: false,
            sample_coverage_value: 1.0,
            sample_coverage_invert: false,
            depth_stencil: DepthStencilState::default(),
            stencil_ref: 0,
            stencil_back_ref: 0,
            rasterizer: RasterizerState::default(),
            line_width: 1.0,
            primitive_restart: false,
            scissor_test: false,
            scissor: Rectangle::default(),
            viewport: Rectangle::default(),
            near: 0.0,
            far: 1.0,
            clear_color: ColorF::default(),
            clear_depth: 1.0,
            clear_stencil: 0,
            unpack: PixelUnpackState::default(),
            pack: PixelPackState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_forms_track_every_field() {
        let base = BlendState::default();
        let dither_off = BlendState {
            dither: false,
            ..base
        };
        assert!(bytes_differ(&base.packed(), &dither_off.packed()));
        assert!(!bytes_differ(&base.packed(), &BlendState::default().packed()));

        let ds = DepthStencilState::default();
        let back = DepthStencilState {
            stencil_back_writemask: 0xF0,
            ..ds
        };
        assert!(bytes_differ(&ds.packed(), &back.packed()));
    }

    #[test]
    fn rasterizer_compares_float_bits() {
        let zero = RasterizerState::default();
        let negative_zero = RasterizerState {
            polygon_offset_units: -0.0,
            ..zero
        };
        assert_eq!(zero, negative_zero);
        assert!(bytes_differ(&zero.packed(), &negative_zero.packed()));
    }

    #[test]
    fn constant_alpha_detection_only_looks_at_rgb() {
        let blend = BlendState {
            source_blend_alpha: BlendFactor::ConstantAlpha,
            ..BlendState::default()
        };
        assert!(!blend.uses_constant_alpha());
        let blend = BlendState {
            dest_blend_rgb: BlendFactor::OneMinusConstantAlpha,
            ..blend
        };
        assert!(blend.uses_constant_alpha());
        assert!(blend.has_separate_alpha());
    }
}
