//! D3D9 state management.
//!
//! D3D9 has no state objects: every field maps onto one or more `D3DRENDERSTATETYPE` values, so
//! the manager diffs field groups individually and only issues `SetRenderState` for groups that
//! are both dirty and different from the cached copy.

use std::fmt;

use tracing::{debug, trace, warn};

use crate::d3d;
use crate::dirty::DirtyBits;
use crate::state::{
    BlendState, ColorF, CullFace, DepthStencilState, FramebufferInfo, FrontFace, RasterizerState,
};

pub const VENDOR_ID_AMD: u32 = 0x1002;

const FALSE: u32 = 0;
const TRUE: u32 = 1;

pub const CULL_NONE: u32 = 1;
pub const CULL_CW: u32 = 2;
pub const CULL_CCW: u32 = 3;

/// The `D3DRENDERSTATETYPE` values the state manager writes.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum D3dRenderState {
    ZEnable = 7,
    ZWriteEnable = 14,
    SrcBlend = 19,
    DestBlend = 20,
    CullMode = 22,
    ZFunc = 23,
    DitherEnable = 26,
    AlphaBlendEnable = 27,
    StencilEnable = 52,
    StencilFail = 53,
    StencilZFail = 54,
    StencilPass = 55,
    StencilFunc = 56,
    StencilRef = 57,
    StencilMask = 58,
    StencilWriteMask = 59,
    MultisampleAntialias = 161,
    MultisampleMask = 162,
    ColorWriteEnable = 168,
    BlendOp = 171,
    ScissorTestEnable = 174,
    SlopeScaleDepthBias = 175,
    TwoSidedStencilMode = 185,
    CcwStencilFail = 186,
    CcwStencilZFail = 187,
    CcwStencilPass = 188,
    CcwStencilFunc = 189,
    BlendFactor = 193,
    DepthBias = 195,
    SeparateAlphaBlendEnable = 206,
    SrcBlendAlpha = 207,
    DestBlendAlpha = 208,
    BlendOpAlpha = 209,
}

impl D3dRenderState {
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for D3dRenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}({})", self.code())
    }
}

pub trait D3d9Device {
    fn set_render_state(&mut self, state: D3dRenderState, value: u32);
}

/// Render states for one stencil face. D3D9 only has separate counter-clockwise variants of the
/// function and the three operations; reference and masks are shared by both faces.
struct StencilFaceStates {
    func: D3dRenderState,
    fail: D3dRenderState,
    zfail: D3dRenderState,
    pass: D3dRenderState,
}

const CW_STENCIL: StencilFaceStates = StencilFaceStates {
    func: D3dRenderState::StencilFunc,
    fail: D3dRenderState::StencilFail,
    zfail: D3dRenderState::StencilZFail,
    pass: D3dRenderState::StencilPass,
};

const CCW_STENCIL: StencilFaceStates = StencilFaceStates {
    func: D3dRenderState::CcwStencilFunc,
    fail: D3dRenderState::CcwStencilFail,
    zfail: D3dRenderState::CcwStencilZFail,
    pass: D3dRenderState::CcwStencilPass,
};

/// The window-space flip turns GL counter-clockwise faces into D3D clockwise ones.
fn stencil_face_states(back: bool, front_face_ccw: bool) -> &'static StencilFaceStates {
    if back != front_face_ccw {
        &CW_STENCIL
    } else {
        &CCW_STENCIL
    }
}

pub fn cull_mode(cull_face: bool, mode: CullFace, front_face: FrontFace) -> u32 {
    if !cull_face {
        return CULL_NONE;
    }
    match (mode, front_face) {
        (CullFace::Front, FrontFace::Ccw) => CULL_CW,
        (CullFace::Front, FrontFace::Cw) => CULL_CCW,
        (CullFace::Back, FrontFace::Ccw) => CULL_CCW,
        (CullFace::Back, FrontFace::Cw) => CULL_CW,
        // Skipped at draw time.
        (CullFace::FrontAndBack, _) => CULL_NONE,
    }
}

pub struct StateManager9<D: D3d9Device> {
    device: D,
    vendor_id: u32,

    cur_blend_state: BlendState,
    cur_blend_color: ColorF,
    cur_sample_mask: u32,
    zero_color_mask_workaround: bool,

    cur_depth_stencil_state: DepthStencilState,
    cur_stencil_ref: i32,
    cur_stencil_back_ref: i32,
    cur_front_face_ccw: bool,

    cur_raster_state: RasterizerState,
    cur_scissor_enabled: Option<bool>,

    cur_stencil_size: u32,
    cur_max_stencil: u32,
    cur_depth_size: u32,

    force_set_blend_state: bool,
    force_set_depth_stencil_state: bool,
    force_set_raster_state: bool,
    local_dirty: DirtyBits,
}

impl<D: D3d9Device> StateManager9<D> {
    /// The device's defaults are not GL's, so every group is written on first use.
    pub fn new(device: D, vendor_id: u32) -> Self {
        Self {
            device,
            vendor_id,
            cur_blend_state: BlendState::default(),
            cur_blend_color: ColorF::default(),
            cur_sample_mask: u32::MAX,
            zero_color_mask_workaround: false,
            cur_depth_stencil_state: DepthStencilState::default(),
            cur_stencil_ref: 0,
            cur_stencil_back_ref: 0,
            cur_front_face_ccw: true,
            cur_raster_state: RasterizerState::default(),
            cur_scissor_enabled: None,
            cur_stencil_size: 0,
            cur_max_stencil: 0,
            cur_depth_size: 0,
            force_set_blend_state: true,
            force_set_depth_stencil_state: true,
            force_set_raster_state: true,
            local_dirty: DirtyBits::empty(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn vendor_id(&self) -> u32 {
        self.vendor_id
    }

    pub fn cur_stencil_size(&self) -> u32 {
        self.cur_stencil_size
    }

    pub fn set_cur_stencil_size(&mut self, size: u32) {
        if size != self.cur_stencil_size {
            debug!(size, "stencil size changed");
            self.cur_stencil_size = size;
            self.cur_max_stencil = 1u32.checked_shl(size).map_or(u32::MAX, |max| max - 1);
            self.force_set_depth_stencil_state = true;
        }
    }

    pub fn cur_depth_size(&self) -> u32 {
        self.cur_depth_size
    }

    /// Depth bias is expressed in depth-buffer units, so a new depth size re-applies it.
    pub fn set_cur_depth_size(&mut self, size: u32) {
        if size != self.cur_depth_size {
            debug!(size, "depth size changed");
            self.cur_depth_size = size;
            self.local_dirty |= DirtyBits::POLYGON_OFFSET;
        }
    }

    pub fn force_set_blend_state(&mut self) {
        self.force_set_blend_state = true;
    }

    pub fn force_set_depth_stencil_state(&mut self) {
        self.force_set_depth_stencil_state = true;
    }

    pub fn force_set_rasterizer_state(&mut self) {
        self.force_set_raster_state = true;
    }

    /// Forgets everything written so far, e.g. after a device reset.
    pub fn invalidate(&mut self) {
        self.force_set_blend_state();
        self.force_set_depth_stencil_state();
        self.force_set_rasterizer_state();
        self.cur_scissor_enabled = None;
    }

    fn write(&mut self, state: D3dRenderState, value: u32) {
        trace!(%state, value, "SetRenderState");
        self.device.set_render_state(state, value);
    }

    pub fn set_scissor_enabled(&mut self, enabled: bool) {
        if self.cur_scissor_enabled != Some(enabled) {
            self.write(D3dRenderState::ScissorTestEnable, u32::from(enabled));
            self.cur_scissor_enabled = Some(enabled);
        }
    }

    pub fn set_blend_state(
        &mut self,
        framebuffer: &FramebufferInfo,
        blend_state: &BlendState,
        blend_color: &ColorF,
        sample_mask: u32,
        dirty: DirtyBits,
    ) {
        let force = std::mem::take(&mut self.force_set_blend_state);
        let dirty = if force { DirtyBits::BLEND_STATE } else { dirty };

        if dirty.intersects(
            DirtyBits::BLEND_ENABLED | DirtyBits::BLEND_FUNCS | DirtyBits::BLEND_EQUATIONS,
        ) {
            self.set_blend_enable_funcs_equations(blend_state, force);
        }
        if dirty.contains(DirtyBits::BLEND_COLOR) {
            self.set_blend_color(blend_color, blend_state, force);
        }
        if dirty.contains(DirtyBits::SAMPLE_ALPHA_TO_COVERAGE_ENABLED)
            && blend_state.sample_alpha_to_coverage
        {
            warn!("alpha-to-coverage is not supported on D3D9");
        }
        if dirty.contains(DirtyBits::DITHER_ENABLED) {
            self.set_dither_enabled(blend_state.dither, force);
        }
        if dirty.contains(DirtyBits::COLOR_MASK) {
            self.set_blend_color_mask(framebuffer, blend_state, force);
        }
        if force || sample_mask != self.cur_sample_mask {
            self.write(D3dRenderState::MultisampleAntialias, TRUE);
            self.write(D3dRenderState::MultisampleMask, sample_mask);
            self.cur_sample_mask = sample_mask;
        }
    }

    fn set_blend_enable_funcs_equations(&mut self, blend_state: &BlendState, force: bool) {
        let cur = &self.cur_blend_state;
        let unchanged = blend_state.blend == cur.blend
            && blend_state.source_blend_rgb == cur.source_blend_rgb
            && blend_state.dest_blend_rgb == cur.dest_blend_rgb
            && blend_state.source_blend_alpha == cur.source_blend_alpha
            && blend_state.dest_blend_alpha == cur.dest_blend_alpha
            && blend_state.blend_equation_rgb == cur.blend_equation_rgb
            && blend_state.blend_equation_alpha == cur.blend_equation_alpha;
        if !force && unchanged {
            return;
        }

        if blend_state.blend {
            self.write(D3dRenderState::AlphaBlendEnable, TRUE);
            self.write(
                D3dRenderState::SrcBlend,
                d3d::blend_factor(blend_state.source_blend_rgb, false),
            );
            self.write(
                D3dRenderState::DestBlend,
                d3d::blend_factor(blend_state.dest_blend_rgb, false),
            );
            self.write(D3dRenderState::BlendOp, d3d::blend_op(blend_state.blend_equation_rgb));

            if blend_state.has_separate_alpha() {
                self.write(D3dRenderState::SeparateAlphaBlendEnable, TRUE);
                self.write(
                    D3dRenderState::SrcBlendAlpha,
                    d3d::blend_factor(blend_state.source_blend_alpha, true),
                );
                self.write(
                    D3dRenderState::DestBlendAlpha,
                    d3d::blend_factor(blend_state.dest_blend_alpha, true),
                );
                self.write(
                    D3dRenderState::BlendOpAlpha,
                    d3d::blend_op(blend_state.blend_equation_alpha),
                );
            } else {
                self.write(D3dRenderState::SeparateAlphaBlendEnable, FALSE);
            }
        } else {
            self.write(D3dRenderState::AlphaBlendEnable, FALSE);
        }

        let cur = &mut self.cur_blend_state;
        cur.blend = blend_state.blend;
        cur.source_blend_rgb = blend_state.source_blend_rgb;
        cur.dest_blend_rgb = blend_state.dest_blend_rgb;
        cur.source_blend_alpha = blend_state.source_blend_alpha;
        cur.dest_blend_alpha = blend_state.dest_blend_alpha;
        cur.blend_equation_rgb = blend_state.blend_equation_rgb;
        cur.blend_equation_alpha = blend_state.blend_equation_alpha;
    }

    fn set_blend_color(&mut self, blend_color: &ColorF, blend_state: &BlendState, force: bool) {
        if !blend_state.blend || (!force && blend_color.bitwise_eq(&self.cur_blend_color)) {
            return;
        }
        let factor = if blend_state.uses_constant_alpha() {
            blend_color.splat_alpha()
        } else {
            *blend_color
        };
        self.write(D3dRenderState::BlendFactor, d3d::d3dcolor(factor));
        self.cur_blend_color = *blend_color;
    }

    fn set_dither_enabled(&mut self, dither: bool, force: bool) {
        if force || dither != self.cur_blend_state.dither {
            self.write(D3dRenderState::DitherEnable, u32::from(dither));
            self.cur_blend_state.dither = dither;
        }
    }

    fn set_blend_color_mask(
        &mut self,
        framebuffer: &FramebufferInfo,
        blend_state: &BlendState,
        force: bool,
    ) {
        if !force && blend_state.color_mask() == self.cur_blend_state.color_mask() {
            return;
        }

        let bits = framebuffer.first_color_bits;
        let [red, green, blue, alpha] = blend_state.color_mask();
        let color_mask = d3d::color_write_mask([
            bits[0] > 0 && red,
            bits[1] > 0 && green,
            bits[2] > 0 && blue,
            bits[3] > 0 && alpha,
        ]);

        // Some AMD drivers corrupt later draws after one with a zero write mask. Write green
        // instead and blend so that the destination is kept.
        if color_mask == 0 && self.vendor_id == VENDOR_ID_AMD {
            self.write(D3dRenderState::ColorWriteEnable, u32::from(d3d::COLOR_WRITE_GREEN));
            self.write(D3dRenderState::AlphaBlendEnable, TRUE);
            self.write(D3dRenderState::SrcBlend, d3d::BLEND_ZERO);
            self.write(D3dRenderState::DestBlend, d3d::BLEND_ONE);
            self.write(D3dRenderState::BlendOp, d3d::BLEND_OP_ADD);
            self.zero_color_mask_workaround = true;
        } else {
            self.write(D3dRenderState::ColorWriteEnable, u32::from(color_mask));
            if std::mem::take(&mut self.zero_color_mask_workaround) {
                let restored = self.cur_blend_state;
                self.set_blend_enable_funcs_equations(&restored, true);
            }
        }

        let cur = &mut self.cur_blend_state;
        cur.color_mask_red = blend_state.color_mask_red;
        cur.color_mask_green = blend_state.color_mask_green;
        cur.color_mask_blue = blend_state.color_mask_blue;
        cur.color_mask_alpha = blend_state.color_mask_alpha;
    }

    pub fn set_depth_stencil_state(
        &mut self,
        depth_stencil_state: &DepthStencilState,
        stencil_ref: i32,
        stencil_back_ref: i32,
        front_face_ccw: bool,
        dirty: DirtyBits,
    ) {
        let max = self.cur_max_stencil;
        if stencil_ref != stencil_back_ref
            || (depth_stencil_state.stencil_mask & max) != (depth_stencil_state.stencil_back_mask & max)
            || (depth_stencil_state.stencil_writemask & max)
                != (depth_stencil_state.stencil_back_writemask & max)
        {
            warn!("D3D9 shares stencil reference and masks between faces; using the last face");
        }

        let mut force = std::mem::take(&mut self.force_set_depth_stencil_state);
        let mut dirty = if force {
            DirtyBits::DEPTH_STENCIL_STATE
        } else {
            dirty
        };
        if front_face_ccw != self.cur_front_face_ccw {
            // Faces swap render states; rewrite both.
            force = true;
            dirty |= DirtyBits::STENCIL_FUNCS_FRONT
                | DirtyBits::STENCIL_FUNCS_BACK
                | DirtyBits::STENCIL_OPS_FRONT
                | DirtyBits::STENCIL_OPS_BACK
                | DirtyBits::STENCIL_WRITEMASK_FRONT
                | DirtyBits::STENCIL_WRITEMASK_BACK;
            self.cur_front_face_ccw = front_face_ccw;
        }

        let ds = depth_stencil_state;
        if dirty.contains(DirtyBits::DEPTH_MASK)
            && (force || ds.depth_mask != self.cur_depth_stencil_state.depth_mask)
        {
            self.write(D3dRenderState::ZWriteEnable, u32::from(ds.depth_mask));
            self.cur_depth_stencil_state.depth_mask = ds.depth_mask;
        }

        if dirty.intersects(DirtyBits::DEPTH_TEST_ENABLED | DirtyBits::DEPTH_FUNC)
            && (force
                || ds.depth_test != self.cur_depth_stencil_state.depth_test
                || ds.depth_func != self.cur_depth_stencil_state.depth_func)
        {
            if ds.depth_test {
                self.write(D3dRenderState::ZEnable, TRUE);
                self.write(D3dRenderState::ZFunc, d3d::comparison(ds.depth_func));
            } else {
                self.write(D3dRenderState::ZEnable, FALSE);
            }
            self.cur_depth_stencil_state.depth_test = ds.depth_test;
            self.cur_depth_stencil_state.depth_func = ds.depth_func;
        }

        if dirty.contains(DirtyBits::STENCIL_TEST_ENABLED)
            && (force || ds.stencil_test != self.cur_depth_stencil_state.stencil_test)
        {
            if ds.stencil_test && self.cur_stencil_size > 0 {
                self.write(D3dRenderState::StencilEnable, TRUE);
                self.write(D3dRenderState::TwoSidedStencilMode, TRUE);
            } else {
                self.write(D3dRenderState::StencilEnable, FALSE);
            }
            self.cur_depth_stencil_state.stencil_test = ds.stencil_test;
        }

        if dirty.contains(DirtyBits::STENCIL_FUNCS_FRONT) {
            self.set_stencil_funcs_front(ds, stencil_ref, force);
        }
        if dirty.contains(DirtyBits::STENCIL_FUNCS_BACK) {
            self.set_stencil_funcs_back(ds, stencil_back_ref, force);
        }
        if dirty.contains(DirtyBits::STENCIL_WRITEMASK_FRONT)
            && (force || ds.stencil_writemask != self.cur_depth_stencil_state.stencil_writemask)
        {
            self.write(D3dRenderState::StencilWriteMask, ds.stencil_writemask);
            self.cur_depth_stencil_state.stencil_writemask = ds.stencil_writemask;
        }
        if dirty.contains(DirtyBits::STENCIL_WRITEMASK_BACK)
            && (force
                || ds.stencil_back_writemask != self.cur_depth_stencil_state.stencil_back_writemask)
        {
            self.write(D3dRenderState::StencilWriteMask, ds.stencil_back_writemask);
            self.cur_depth_stencil_state.stencil_back_writemask = ds.stencil_back_writemask;
        }
        if dirty.contains(DirtyBits::STENCIL_OPS_FRONT) {
            self.set_stencil_ops_front(ds, force);
        }
        if dirty.contains(DirtyBits::STENCIL_OPS_BACK) {
            self.set_stencil_ops_back(ds, force);
        }
    }

    fn clamp_stencil_ref(&self, stencil_ref: i32) -> u32 {
        u32::try_from(stencil_ref)
            .unwrap_or(0)
            .min(self.cur_max_stencil)
    }

    fn set_stencil_funcs_front(&mut self, ds: &DepthStencilState, stencil_ref: i32, force: bool) {
        let cur = &self.cur_depth_stencil_state;
        if !force
            && ds.stencil_func == cur.stencil_func
            && ds.stencil_mask == cur.stencil_mask
            && stencil_ref == self.cur_stencil_ref
        {
            return;
        }
        let states = stencil_face_states(false, self.cur_front_face_ccw);
        self.write(states.func, d3d::comparison(ds.stencil_func));
        self.write(D3dRenderState::StencilRef, self.clamp_stencil_ref(stencil_ref));
        self.write(D3dRenderState::StencilMask, ds.stencil_mask);

        self.cur_depth_stencil_state.stencil_func = ds.stencil_func;
        self.cur_depth_stencil_state.stencil_mask = ds.stencil_mask;
        self.cur_stencil_ref = stencil_ref;
    }

    fn set_stencil_funcs_back(&mut self, ds: &DepthStencilState, stencil_back_ref: i32, force: bool) {
        let cur = &self.cur_depth_stencil_state;
        if !force
            && ds.stencil_back_func == cur.stencil_back_func
            && ds.stencil_back_mask == cur.stencil_back_mask
            && stencil_back_ref == self.cur_stencil_back_ref
        {
            return;
        }
        let states = stencil_face_states(true, self.cur_front_face_ccw);
        self.write(states.func, d3d::comparison(ds.stencil_back_func));
        self.write(D3dRenderState::StencilRef, self.clamp_stencil_ref(stencil_back_ref));
        self.write(D3dRenderState::StencilMask, ds.stencil_back_mask);

        self.cur_depth_stencil_state.stencil_back_func = ds.stencil_back_func;
        self.cur_depth_stencil_state.stencil_back_mask = ds.stencil_back_mask;
        self.cur_stencil_back_ref = stencil_back_ref;
    }

    fn set_stencil_ops_front(&mut self, ds: &DepthStencilState, force: bool) {
        let cur = &self.cur_depth_stencil_state;
        if !force
            && ds.stencil_fail == cur.stencil_fail
            && ds.stencil_pass_depth_fail == cur.stencil_pass_depth_fail
            && ds.stencil_pass_depth_pass == cur.stencil_pass_depth_pass
        {
            return;
        }
        let states = stencil_face_states(false, self.cur_front_face_ccw);
        self.write(states.fail, d3d::stencil_op(ds.stencil_fail));
        self.write(states.zfail, d3d::stencil_op(ds.stencil_pass_depth_fail));
        self.write(states.pass, d3d::stencil_op(ds.stencil_pass_depth_pass));

        let cur = &mut self.cur_depth_stencil_state;
        cur.stencil_fail = ds.stencil_fail;
        cur.stencil_pass_depth_fail = ds.stencil_pass_depth_fail;
        cur.stencil_pass_depth_pass = ds.stencil_pass_depth_pass;
    }

    fn set_stencil_ops_back(&mut self, ds: &DepthStencilState, force: bool) {
        let cur = &self.cur_depth_stencil_state;
        if !force
            && ds.stencil_back_fail == cur.stencil_back_fail
            && ds.stencil_back_pass_depth_fail == cur.stencil_back_pass_depth_fail
            && ds.stencil_back_pass_depth_pass == cur.stencil_back_pass_depth_pass
        {
            return;
        }
        let states = stencil_face_states(true, self.cur_front_face_ccw);
        self.write(states.fail, d3d::stencil_op(ds.stencil_back_fail));
        self.write(states.zfail, d3d::stencil_op(ds.stencil_back_pass_depth_fail));
        self.write(states.pass, d3d::stencil_op(ds.stencil_back_pass_depth_pass));

        let cur = &mut self.cur_depth_stencil_state;
        cur.stencil_back_fail = ds.stencil_back_fail;
        cur.stencil_back_pass_depth_fail = ds.stencil_back_pass_depth_fail;
        cur.stencil_back_pass_depth_pass = ds.stencil_back_pass_depth_pass;
    }

    /// Applies culling and polygon offset for the bits in `dirty` plus any changed internally
    /// (see [`set_cur_depth_size`](Self::set_cur_depth_size)).
    pub fn set_rasterizer_state(&mut self, raster_state: &RasterizerState, dirty: DirtyBits) {
        let forced = std::mem::take(&mut self.force_set_raster_state);
        let local = std::mem::take(&mut self.local_dirty);
        let dirty = if forced {
            DirtyBits::RASTERIZER_STATE
        } else {
            dirty | local
        };

        if dirty.intersects(DirtyBits::CULL_FACE_ENABLED | DirtyBits::CULL_FACE | DirtyBits::FRONT_FACE) {
            self.set_rasterizer_mode(raster_state, forced);
        }
        if dirty.intersects(DirtyBits::POLYGON_OFFSET_FILL_ENABLED | DirtyBits::POLYGON_OFFSET) {
            self.set_rasterizer_polygon_offset(raster_state, forced || !local.is_empty());
        }
    }

    fn set_rasterizer_mode(&mut self, raster: &RasterizerState, force: bool) {
        let cur = &self.cur_raster_state;
        if !force
            && raster.cull_face == cur.cull_face
            && raster.cull_mode == cur.cull_mode
            && raster.front_face == cur.front_face
        {
            return;
        }
        self.write(
            D3dRenderState::CullMode,
            cull_mode(raster.cull_face, raster.cull_mode, raster.front_face),
        );
        let cur = &mut self.cur_raster_state;
        cur.cull_face = raster.cull_face;
        cur.cull_mode = raster.cull_mode;
        cur.front_face = raster.front_face;
    }

    fn set_rasterizer_polygon_offset(&mut self, raster: &RasterizerState, force: bool) {
        let cur = &self.cur_raster_state;
        if !force
            && raster.polygon_offset_fill == cur.polygon_offset_fill
            && raster.polygon_offset_factor.to_bits() == cur.polygon_offset_factor.to_bits()
            && raster.polygon_offset_units.to_bits() == cur.polygon_offset_units.to_bits()
        {
            return;
        }
        if raster.polygon_offset_fill {
            if self.cur_depth_size > 0 {
                let depth_bias =
                    raster.polygon_offset_units * 2f32.powi(-(self.cur_depth_size as i32));
                self.write(
                    D3dRenderState::SlopeScaleDepthBias,
                    raster.polygon_offset_factor.to_bits(),
                );
                self.write(D3dRenderState::DepthBias, depth_bias.to_bits());
            }
        } else {
            self.write(D3dRenderState::SlopeScaleDepthBias, 0);
            self.write(D3dRenderState::DepthBias, 0);
        }
        let cur = &mut self.cur_raster_state;
        cur.polygon_offset_fill = raster.polygon_offset_fill;
        cur.polygon_offset_factor = raster.polygon_offset_factor;
        cur.polygon_offset_units = raster.polygon_offset_units;
    }
}
