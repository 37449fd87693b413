//! Conversions to the native enum values D3D9 and D3D11 share.
//!
//! `D3DBLEND`/`D3D11_BLEND`, `D3DBLENDOP`/`D3D11_BLEND_OP`, `D3DCMPFUNC`/`D3D11_COMPARISON_FUNC`
//! and `D3DSTENCILOP`/`D3D11_STENCIL_OP` use identical numbering, so both backends use these.

use crate::state::{BlendEquation, BlendFactor, ColorF, CompareFunc, StencilOp};

pub const BLEND_ZERO: u32 = 1;
pub const BLEND_ONE: u32 = 2;
pub const BLEND_SRC_COLOR: u32 = 3;
pub const BLEND_INV_SRC_COLOR: u32 = 4;
pub const BLEND_SRC_ALPHA: u32 = 5;
pub const BLEND_INV_SRC_ALPHA: u32 = 6;
pub const BLEND_DEST_ALPHA: u32 = 7;
pub const BLEND_INV_DEST_ALPHA: u32 = 8;
pub const BLEND_DEST_COLOR: u32 = 9;
pub const BLEND_INV_DEST_COLOR: u32 = 10;
pub const BLEND_SRC_ALPHA_SAT: u32 = 11;
pub const BLEND_BLEND_FACTOR: u32 = 14;
pub const BLEND_INV_BLEND_FACTOR: u32 = 15;

pub const BLEND_OP_ADD: u32 = 1;

pub const COLOR_WRITE_RED: u8 = 1;
pub const COLOR_WRITE_GREEN: u8 = 2;
pub const COLOR_WRITE_BLUE: u8 = 4;
pub const COLOR_WRITE_ALPHA: u8 = 8;

/// Blend factor for a colour (`is_alpha == false`) or alpha channel. Alpha channels cannot
/// reference colour sources, so colour factors fall back to their alpha counterparts there.
pub fn blend_factor(factor: BlendFactor, is_alpha: bool) -> u32 {
    match factor {
        BlendFactor::Zero => BLEND_ZERO,
        BlendFactor::One => BLEND_ONE,
        BlendFactor::SrcColor if is_alpha => BLEND_SRC_ALPHA,
        BlendFactor::SrcColor => BLEND_SRC_COLOR,
        BlendFactor::OneMinusSrcColor if is_alpha => BLEND_INV_SRC_ALPHA,
        BlendFactor::OneMinusSrcColor => BLEND_INV_SRC_COLOR,
        BlendFactor::DstColor if is_alpha => BLEND_DEST_ALPHA,
        BlendFactor::DstColor => BLEND_DEST_COLOR,
        BlendFactor::OneMinusDstColor if is_alpha => BLEND_INV_DEST_ALPHA,
        BlendFactor::OneMinusDstColor => BLEND_INV_DEST_COLOR,
        BlendFactor::SrcAlpha => BLEND_SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => BLEND_INV_SRC_ALPHA,
        BlendFactor::DstAlpha => BLEND_DEST_ALPHA,
        BlendFactor::OneMinusDstAlpha => BLEND_INV_DEST_ALPHA,
        BlendFactor::ConstantColor | BlendFactor::ConstantAlpha => BLEND_BLEND_FACTOR,
        BlendFactor::OneMinusConstantColor | BlendFactor::OneMinusConstantAlpha => {
            BLEND_INV_BLEND_FACTOR
        }
        BlendFactor::SrcAlphaSaturate => BLEND_SRC_ALPHA_SAT,
    }
}

pub fn blend_op(equation: BlendEquation) -> u32 {
    match equation {
        BlendEquation::Add => BLEND_OP_ADD,
        BlendEquation::Subtract => 2,
        BlendEquation::ReverseSubtract => 3,
        BlendEquation::Min => 4,
        BlendEquation::Max => 5,
    }
}

pub fn comparison(func: CompareFunc) -> u32 {
    match func {
        CompareFunc::Never => 1,
        CompareFunc::Less => 2,
        CompareFunc::Equal => 3,
        CompareFunc::LessEqual => 4,
        CompareFunc::Greater => 5,
        CompareFunc::NotEqual => 6,
        CompareFunc::GreaterEqual => 7,
        CompareFunc::Always => 8,
    }
}

pub fn stencil_op(op: StencilOp) -> u32 {
    match op {
        StencilOp::Keep => 1,
        StencilOp::Zero => 2,
        StencilOp::Replace => 3,
        StencilOp::Incr => 4,
        StencilOp::Decr => 5,
        StencilOp::Invert => 6,
        StencilOp::IncrWrap => 7,
        StencilOp::DecrWrap => 8,
    }
}

pub fn color_write_mask([red, green, blue, alpha]: [bool; 4]) -> u8 {
    let mut mask = 0;
    if red {
        mask |= COLOR_WRITE_RED;
    }
    if green {
        mask |= COLOR_WRITE_GREEN;
    }
    if blue {
        mask |= COLOR_WRITE_BLUE;
    }
    if alpha {
        mask |= COLOR_WRITE_ALPHA;
    }
    mask
}

/// Normalized float to an 8-bit unsigned value, clamping to `[0, 1]`.
pub fn unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

/// Packed `D3DCOLOR` (`0xAARRGGBB`).
pub fn d3dcolor(color: ColorF) -> u32 {
    u32::from_be_bytes([
        unorm8(color.alpha),
        unorm8(color.red),
        unorm8(color.green),
        unorm8(color.blue),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_channels_use_alpha_sources() {
        assert_eq!(blend_factor(BlendFactor::SrcColor, false), BLEND_SRC_COLOR);
        assert_eq!(blend_factor(BlendFactor::SrcColor, true), BLEND_SRC_ALPHA);
        assert_eq!(blend_factor(BlendFactor::OneMinusDstColor, true), BLEND_INV_DEST_ALPHA);
        assert_eq!(blend_factor(BlendFactor::ConstantAlpha, false), BLEND_BLEND_FACTOR);
    }

    #[test]
    fn d3dcolor_is_argb() {
        assert_eq!(d3dcolor(ColorF::new(1.0, 0.0, 0.0, 1.0)), 0xFFFF_0000);
        assert_eq!(d3dcolor(ColorF::new(0.0, 0.0, 1.0, 0.5)), 0x8000_00FF);
        assert_eq!(d3dcolor(ColorF::new(2.0, -1.0, 0.0, 0.0)), 0x00FF_0000);
    }
}
