//! D3D11 state management: immutable state objects from an LRU cache, applied only when the
//! requested block differs from what is bound.

use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::{debug, trace, warn};

use crate::d3d;
use crate::dirty::DirtyBits;
use crate::state::{
    bytes_differ, BlendState, ColorF, CullFace, DepthStencilState, FramebufferInfo, FrontFace,
    PackedBlendState, PackedDepthStencilState, PackedRasterizerState, RasterizerState,
};
use crate::{CacheStats, StateError};

/// D3D11 caps each device at 4096 live state objects of each kind.
pub const RENDER_STATE_CACHE_CAPACITY: usize = 4096;

/// Largest stencil reference D3D11 accepts (8-bit stencil buffers).
pub const MAX_STENCIL_REF: u32 = 0xFF;

pub const CULL_NONE: u32 = 1;
pub const CULL_FRONT: u32 = 2;
pub const CULL_BACK: u32 = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RenderTargetBlendDesc {
    pub blend_enable: bool,
    pub src_blend: u32,
    pub dest_blend: u32,
    pub blend_op: u32,
    pub src_blend_alpha: u32,
    pub dest_blend_alpha: u32,
    pub blend_op_alpha: u32,
    pub render_target_write_mask: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlendDesc {
    pub alpha_to_coverage_enable: bool,
    /// One entry per bound colour attachment.
    pub render_targets: Vec<RenderTargetBlendDesc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StencilFaceDesc {
    pub stencil_fail_op: u32,
    pub stencil_depth_fail_op: u32,
    pub stencil_pass_op: u32,
    pub stencil_func: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DepthStencilDesc {
    pub depth_enable: bool,
    pub depth_write_all: bool,
    pub depth_func: u32,
    pub stencil_enable: bool,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
    pub front_face: StencilFaceDesc,
    pub back_face: StencilFaceDesc,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RasterizerDesc {
    pub cull_mode: u32,
    pub front_counter_clockwise: bool,
    pub depth_bias: i32,
    pub slope_scaled_depth_bias: f32,
    pub scissor_enable: bool,
    pub multisample_enable: bool,
}

pub fn blend_desc(state: &BlendState, color_attachments: u8) -> BlendDesc {
    let target = RenderTargetBlendDesc {
        blend_enable: state.blend,
        src_blend: d3d::blend_factor(state.source_blend_rgb, false),
        dest_blend: d3d::blend_factor(state.dest_blend_rgb, false),
        blend_op: d3d::blend_op(state.blend_equation_rgb),
        src_blend_alpha: d3d::blend_factor(state.source_blend_alpha, true),
        dest_blend_alpha: d3d::blend_factor(state.dest_blend_alpha, true),
        blend_op_alpha: d3d::blend_op(state.blend_equation_alpha),
        render_target_write_mask: d3d::color_write_mask(state.color_mask()),
    };
    BlendDesc {
        alpha_to_coverage_enable: state.sample_alpha_to_coverage,
        render_targets: vec![target; usize::from(color_attachments.max(1))],
    }
}

pub fn depth_stencil_desc(state: &DepthStencilState) -> DepthStencilDesc {
    DepthStencilDesc {
        depth_enable: state.depth_test,
        depth_write_all: state.depth_mask,
        depth_func: d3d::comparison(state.depth_func),
        stencil_enable: state.stencil_test,
        stencil_read_mask: (state.stencil_mask & MAX_STENCIL_REF) as u8,
        stencil_write_mask: (state.stencil_writemask & MAX_STENCIL_REF) as u8,
        front_face: StencilFaceDesc {
            stencil_fail_op: d3d::stencil_op(state.stencil_fail),
            stencil_depth_fail_op: d3d::stencil_op(state.stencil_pass_depth_fail),
            stencil_pass_op: d3d::stencil_op(state.stencil_pass_depth_pass),
            stencil_func: d3d::comparison(state.stencil_func),
        },
        back_face: StencilFaceDesc {
            stencil_fail_op: d3d::stencil_op(state.stencil_back_fail),
            stencil_depth_fail_op: d3d::stencil_op(state.stencil_back_pass_depth_fail),
            stencil_pass_op: d3d::stencil_op(state.stencil_back_pass_depth_pass),
            stencil_func: d3d::comparison(state.stencil_back_func),
        },
    }
}

pub fn rasterizer_desc(state: &RasterizerState, scissor_enabled: bool) -> RasterizerDesc {
    let cull_mode = match (state.cull_face, state.cull_mode) {
        (false, _) => CULL_NONE,
        (true, CullFace::Front) => CULL_FRONT,
        (true, CullFace::Back) => CULL_BACK,
        // Culling both faces is handled at draw time.
        (true, CullFace::FrontAndBack) => CULL_NONE,
    };
    let (depth_bias, slope_scaled_depth_bias) = if state.polygon_offset_fill {
        (state.polygon_offset_units as i32, state.polygon_offset_factor)
    } else {
        (0, 0.0)
    };
    RasterizerDesc {
        cull_mode,
        front_counter_clockwise: state.front_face == FrontFace::Ccw,
        depth_bias,
        slope_scaled_depth_bias,
        scissor_enable: scissor_enabled,
        multisample_enable: state.multi_sample,
    }
}

/// Device and immediate-context entry points the D3D11 state manager uses.
pub trait D3d11Device {
    type BlendState: Clone;
    type DepthStencilState: Clone;
    type RasterizerState: Clone;

    fn create_blend_state(&mut self, desc: &BlendDesc) -> Result<Self::BlendState, StateError>;
    fn create_depth_stencil_state(
        &mut self,
        desc: &DepthStencilDesc,
    ) -> Result<Self::DepthStencilState, StateError>;
    fn create_rasterizer_state(
        &mut self,
        desc: &RasterizerDesc,
    ) -> Result<Self::RasterizerState, StateError>;

    fn om_set_blend_state(
        &mut self,
        state: &Self::BlendState,
        blend_factor: [f32; 4],
        sample_mask: u32,
    );
    fn om_set_depth_stencil_state(&mut self, state: &Self::DepthStencilState, stencil_ref: u32);
    fn rs_set_state(&mut self, state: &Self::RasterizerState);
}

type BlendKey = (PackedBlendState, u8);
type RasterizerKey = (PackedRasterizerState, bool);

/// Bounded cache of D3D11 state objects keyed by the packed abstract state.
pub struct RenderStateCache<D: D3d11Device> {
    blend: LruCache<BlendKey, D::BlendState>,
    depth_stencil: LruCache<PackedDepthStencilState, D::DepthStencilState>,
    rasterizer: LruCache<RasterizerKey, D::RasterizerState>,
    hits: u64,
    misses: u64,
}

impl<D: D3d11Device> Default for RenderStateCache<D> {
    fn default() -> Self {
        let capacity =
            NonZeroUsize::new(RENDER_STATE_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self::with_capacity(capacity)
    }
}

impl<D: D3d11Device> RenderStateCache<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// `capacity` applies to each kind of state object separately.
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            blend: LruCache::new(capacity),
            depth_stencil: LruCache::new(capacity),
            rasterizer: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn blend_state(
        &mut self,
        device: &mut D,
        framebuffer: &FramebufferInfo,
        state: &BlendState,
    ) -> Result<D::BlendState, StateError> {
        let key = (state.packed(), framebuffer.color_attachments);
        lookup_or_create(&mut self.blend, &mut self.hits, &mut self.misses, key, || {
            device.create_blend_state(&blend_desc(state, framebuffer.color_attachments))
        })
    }

    pub fn depth_stencil_state(
        &mut self,
        device: &mut D,
        state: &DepthStencilState,
    ) -> Result<D::DepthStencilState, StateError> {
        let key = state.packed();
        lookup_or_create(&mut self.depth_stencil, &mut self.hits, &mut self.misses, key, || {
            device.create_depth_stencil_state(&depth_stencil_desc(state))
        })
    }

    pub fn rasterizer_state(
        &mut self,
        device: &mut D,
        state: &RasterizerState,
        scissor_enabled: bool,
    ) -> Result<D::RasterizerState, StateError> {
        let key = (state.packed(), scissor_enabled);
        lookup_or_create(&mut self.rasterizer, &mut self.hits, &mut self.misses, key, || {
            device.create_rasterizer_state(&rasterizer_desc(state, scissor_enabled))
        })
    }

    /// Drops every cached object, e.g. after the device was lost.
    pub fn clear(&mut self) {
        self.blend.clear();
        self.depth_stencil.clear();
        self.rasterizer.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.blend.len() + self.depth_stencil.len() + self.rasterizer.len(),
        }
    }
}

fn lookup_or_create<K: Hash + Eq, V: Clone>(
    cache: &mut LruCache<K, V>,
    hits: &mut u64,
    misses: &mut u64,
    key: K,
    create: impl FnOnce() -> Result<V, StateError>,
) -> Result<V, StateError> {
    if let Some(object) = cache.get(&key) {
        *hits += 1;
        return Ok(object.clone());
    }
    *misses += 1;
    let object = create()?;
    cache.put(key, object.clone());
    Ok(object)
}

/// Caches the blend, depth-stencil and rasterizer state bound on one immediate context.
///
/// A block is re-applied when it is forced, or when it was marked dirty by [`sync_state`] and its
/// bytes (or the accompanying blend colour / stencil refs) differ from the bound copy. The sample
/// mask is compared on every call.
///
/// [`sync_state`]: StateManager11::sync_state
pub struct StateManager11<D: D3d11Device> {
    device: D,
    cache: RenderStateCache<D>,

    cur_blend_state: BlendState,
    cur_blend_color: ColorF,
    cur_sample_mask: u32,
    blend_state_is_dirty: bool,
    force_set_blend_state: bool,

    cur_depth_stencil_state: DepthStencilState,
    cur_stencil_ref: i32,
    cur_stencil_back_ref: i32,
    cur_stencil_size: u32,
    depth_stencil_state_is_dirty: bool,
    force_set_depth_stencil_state: bool,

    cur_raster_state: RasterizerState,
    cur_scissor_enabled: bool,
    raster_state_is_dirty: bool,
    force_set_raster_state: bool,
}

impl<D: D3d11Device> StateManager11<D> {
    pub fn new(device: D) -> Self {
        Self::with_cache(device, RenderStateCache::new())
    }

    /// The context starts out in D3D11 default state, which is not the GL default, so the first
    /// application of every block is forced.
    pub fn with_cache(device: D, cache: RenderStateCache<D>) -> Self {
        Self {
            device,
            cache,
            cur_blend_state: BlendState::default(),
            cur_blend_color: ColorF::default(),
            cur_sample_mask: 0,
            blend_state_is_dirty: false,
            force_set_blend_state: true,
            cur_depth_stencil_state: DepthStencilState::default(),
            cur_stencil_ref: 0,
            cur_stencil_back_ref: 0,
            cur_stencil_size: 0,
            depth_stencil_state_is_dirty: false,
            force_set_depth_stencil_state: true,
            cur_raster_state: RasterizerState::default(),
            cur_scissor_enabled: false,
            raster_state_is_dirty: false,
            force_set_raster_state: true,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Forces every block on its next application, e.g. after another component touched the
    /// context behind our back.
    pub fn invalidate(&mut self) {
        self.force_set_blend_state = true;
        self.force_set_depth_stencil_state = true;
        self.force_set_raster_state = true;
    }

    /// Drops all cached state objects and forces every block.
    pub fn handle_device_lost(&mut self) {
        debug!("dropping cached D3D11 state objects");
        self.cache.clear();
        self.invalidate();
    }

    pub fn force_set_blend_state(&mut self) {
        self.force_set_blend_state = true;
    }

    pub fn update_stencil_size_if_changed(&mut self, depth_stencil_initialized: bool, stencil_size: u32) {
        if !depth_stencil_initialized || stencil_size != self.cur_stencil_size {
            debug!(stencil_size, "stencil size changed");
            self.cur_stencil_size = stencil_size;
            self.force_set_depth_stencil_state = true;
        }
    }

    pub fn set_scissor_enabled(&mut self, enabled: bool) {
        if self.cur_scissor_enabled != enabled {
            self.cur_scissor_enabled = enabled;
            self.force_set_raster_state = true;
        }
    }

    /// Marks the blocks touched by `dirty` for comparison on their next application.
    pub fn sync_state(&mut self, dirty: DirtyBits) {
        if dirty.intersects(DirtyBits::BLEND_STATE) {
            self.blend_state_is_dirty = true;
        }
        if dirty.intersects(DirtyBits::DEPTH_STENCIL_STATE) {
            self.depth_stencil_state_is_dirty = true;
        }
        if dirty.intersects(DirtyBits::RASTERIZER_STATE) {
            self.raster_state_is_dirty = true;
        }
    }

    pub fn set_blend_state(
        &mut self,
        framebuffer: &FramebufferInfo,
        blend_state: &BlendState,
        blend_color: &ColorF,
        sample_mask: u32,
    ) -> Result<(), StateError> {
        let changed = self.blend_state_is_dirty
            && (bytes_differ(&blend_state.packed(), &self.cur_blend_state.packed())
                || !blend_color.bitwise_eq(&self.cur_blend_color));
        if !(self.force_set_blend_state || sample_mask != self.cur_sample_mask || changed) {
            return Ok(());
        }

        let dx_blend_state = self
            .cache
            .blend_state(&mut self.device, framebuffer, blend_state)?;
        // D3D11 has no constant-alpha factor: the alpha is replicated into every channel.
        let blend_factor = if blend_state.uses_constant_alpha() {
            blend_color.splat_alpha()
        } else {
            *blend_color
        };
        trace!(sample_mask, ?blend_factor, "OMSetBlendState");
        self.device
            .om_set_blend_state(&dx_blend_state, blend_factor.to_array(), sample_mask);

        self.cur_blend_state = *blend_state;
        self.cur_blend_color = *blend_color;
        self.cur_sample_mask = sample_mask;
        self.force_set_blend_state = false;
        self.blend_state_is_dirty = false;
        Ok(())
    }

    pub fn set_depth_stencil_state(
        &mut self,
        depth_stencil_state: &DepthStencilState,
        stencil_ref: i32,
        stencil_back_ref: i32,
    ) -> Result<(), StateError> {
        let changed = self.depth_stencil_state_is_dirty
            && (bytes_differ(
                &depth_stencil_state.packed(),
                &self.cur_depth_stencil_state.packed(),
            ) || stencil_ref != self.cur_stencil_ref
                || stencil_back_ref != self.cur_stencil_back_ref);
        if !(self.force_set_depth_stencil_state || changed) {
            return Ok(());
        }

        if stencil_ref != stencil_back_ref {
            warn!(
                stencil_ref,
                stencil_back_ref, "D3D11 shares one stencil reference between faces"
            );
        }

        let dx_state = self
            .cache
            .depth_stencil_state(&mut self.device, depth_stencil_state)?;
        let dx_stencil_ref = u32::try_from(stencil_ref)
            .unwrap_or(0)
            .min(MAX_STENCIL_REF);
        trace!(dx_stencil_ref, "OMSetDepthStencilState");
        self.device.om_set_depth_stencil_state(&dx_state, dx_stencil_ref);

        self.cur_depth_stencil_state = *depth_stencil_state;
        self.cur_stencil_ref = stencil_ref;
        self.cur_stencil_back_ref = stencil_back_ref;
        self.force_set_depth_stencil_state = false;
        self.depth_stencil_state_is_dirty = false;
        Ok(())
    }

    pub fn set_rasterizer_state(&mut self, raster_state: &RasterizerState) -> Result<(), StateError> {
        let changed = self.raster_state_is_dirty
            && bytes_differ(&raster_state.packed(), &self.cur_raster_state.packed());
        if !(self.force_set_raster_state || changed) {
            return Ok(());
        }

        let dx_state =
            self.cache
                .rasterizer_state(&mut self.device, raster_state, self.cur_scissor_enabled)?;
        trace!(scissor = self.cur_scissor_enabled, "RSSetState");
        self.device.rs_set_state(&dx_state);

        self.cur_raster_state = *raster_state;
        self.force_set_raster_state = false;
        self.raster_state_is_dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::BlendFactor;
    use crate::StateObjectKind;
    use pretty_assertions::assert_eq;

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Blend { id: u32, factor: [f32; 4], mask: u32 },
        DepthStencil { id: u32, stencil_ref: u32 },
        Rasterizer { id: u32 },
    }

    #[derive(Default)]
    struct FakeContext {
        next_id: u32,
        created: Vec<StateObjectKind>,
        rasterizer_descs: Vec<RasterizerDesc>,
        calls: Vec<Call>,
        fail_creation: bool,
        lost: bool,
    }

    impl FakeContext {
        fn create(&mut self, kind: StateObjectKind) -> Result<u32, StateError> {
            if self.lost {
                return Err(StateError::DeviceLost);
            }
            if self.fail_creation {
                return Err(StateError::CreateStateObject {
                    kind,
                    message: "E_OUTOFMEMORY".to_owned(),
                });
            }
            self.created.push(kind);
            self.next_id += 1;
            Ok(self.next_id)
        }
    }

    impl D3d11Device for FakeContext {
        type BlendState = u32;
        type DepthStencilState = u32;
        type RasterizerState = u32;

        fn create_blend_state(&mut self, _: &BlendDesc) -> Result<u32, StateError> {
            self.create(StateObjectKind::Blend)
        }

        fn create_depth_stencil_state(&mut self, _: &DepthStencilDesc) -> Result<u32, StateError> {
            self.create(StateObjectKind::DepthStencil)
        }

        fn create_rasterizer_state(&mut self, desc: &RasterizerDesc) -> Result<u32, StateError> {
            self.rasterizer_descs.push(*desc);
            self.create(StateObjectKind::Rasterizer)
        }

        fn om_set_blend_state(&mut self, state: &u32, factor: [f32; 4], mask: u32) {
            self.calls.push(Call::Blend {
                id: *state,
                factor,
                mask,
            });
        }

        fn om_set_depth_stencil_state(&mut self, state: &u32, stencil_ref: u32) {
            self.calls.push(Call::DepthStencil {
                id: *state,
                stencil_ref,
            });
        }

        fn rs_set_state(&mut self, state: &u32) {
            self.calls.push(Call::Rasterizer { id: *state });
        }
    }

    fn manager() -> StateManager11<FakeContext> {
        StateManager11::new(FakeContext::default())
    }

    const FB: FramebufferInfo = FramebufferInfo {
        color_attachments: 1,
        first_color_bits: [8; 4],
        depth_bits: 24,
        stencil_bits: 8,
    };

    #[test]
    fn first_application_is_forced_and_repeats_are_skipped() {
        let mut sm = manager();
        let blend = BlendState::default();
        let color = ColorF::default();
        sm.set_blend_state(&FB, &blend, &color, u32::MAX).unwrap();
        sm.set_blend_state(&FB, &blend, &color, u32::MAX).unwrap();
        assert_eq!(sm.device().calls.len(), 1);

        // Dirty, but byte-identical.
        sm.sync_state(DirtyBits::BLEND_FUNCS);
        sm.set_blend_state(&FB, &blend, &color, u32::MAX).unwrap();
        assert_eq!(sm.device().calls.len(), 1);
    }

    #[test]
    fn changes_apply_only_after_sync() {
        let mut sm = manager();
        let color = ColorF::default();
        sm.set_blend_state(&FB, &BlendState::default(), &color, u32::MAX)
            .unwrap();

        let enabled = BlendState {
            blend: true,
            ..BlendState::default()
        };
        sm.set_blend_state(&FB, &enabled, &color, u32::MAX).unwrap();
        assert_eq!(sm.device().calls.len(), 1);

        sm.sync_state(DirtyBits::BLEND_ENABLED);
        sm.set_blend_state(&FB, &enabled, &color, u32::MAX).unwrap();
        assert_eq!(sm.device().calls.len(), 2);

        // Switching back reuses the first state object.
        sm.sync_state(DirtyBits::BLEND_ENABLED);
        sm.set_blend_state(&FB, &BlendState::default(), &color, u32::MAX)
            .unwrap();
        assert_eq!(
            sm.device().calls.last(),
            Some(&Call::Blend {
                id: 1,
                factor: [0.0; 4],
                mask: u32::MAX
            })
        );
        assert_eq!(
            sm.cache_stats(),
            CacheStats {
                hits: 1,
                misses: 2,
                entries: 2
            }
        );
    }

    #[test]
    fn sample_mask_is_always_compared() {
        let mut sm = manager();
        let blend = BlendState::default();
        let color = ColorF::default();
        sm.set_blend_state(&FB, &blend, &color, u32::MAX).unwrap();
        sm.set_blend_state(&FB, &blend, &color, 0x0F).unwrap();
        assert_eq!(sm.device().calls.len(), 2);
    }

    #[test]
    fn constant_alpha_replicates_alpha_into_the_blend_factor() {
        let mut sm = manager();
        let blend = BlendState {
            blend: true,
            source_blend_rgb: BlendFactor::ConstantAlpha,
            ..BlendState::default()
        };
        let color = ColorF::new(0.1, 0.2, 0.3, 0.4);
        sm.set_blend_state(&FB, &blend, &color, u32::MAX).unwrap();
        assert_eq!(
            sm.device().calls,
            vec![Call::Blend {
                id: 1,
                factor: [0.4; 4],
                mask: u32::MAX
            }]
        );
    }

    #[test]
    fn stencil_ref_is_clamped() {
        let mut sm = manager();
        sm.set_depth_stencil_state(&DepthStencilState::default(), 300, 300)
            .unwrap();
        assert_eq!(
            sm.device().calls,
            vec![Call::DepthStencil {
                id: 1,
                stencil_ref: 0xFF
            }]
        );
    }

    #[test]
    fn stencil_size_change_forces_depth_stencil() {
        let mut sm = manager();
        let ds = DepthStencilState::default();
        sm.set_depth_stencil_state(&ds, 1, 1).unwrap();
        sm.set_depth_stencil_state(&ds, 1, 1).unwrap();
        assert_eq!(sm.device().calls.len(), 1);

        sm.update_stencil_size_if_changed(true, 8);
        sm.set_depth_stencil_state(&ds, 1, 1).unwrap();
        assert_eq!(sm.device().calls.len(), 2);

        sm.update_stencil_size_if_changed(true, 8);
        sm.set_depth_stencil_state(&ds, 1, 1).unwrap();
        assert_eq!(sm.device().calls.len(), 2);
    }

    #[test]
    fn scissor_toggle_rebuilds_the_rasterizer_state() {
        let mut sm = manager();
        let raster = RasterizerState::default();
        sm.set_rasterizer_state(&raster).unwrap();
        sm.set_scissor_enabled(true);
        sm.set_rasterizer_state(&raster).unwrap();
        let descs = &sm.device().rasterizer_descs;
        assert_eq!(descs.len(), 2);
        assert!(!descs[0].scissor_enable);
        assert!(descs[1].scissor_enable);
    }

    #[test]
    fn creation_failure_keeps_the_block_pending() {
        let mut sm = manager();
        sm.device_mut().fail_creation = true;
        let err = sm
            .set_rasterizer_state(&RasterizerState::default())
            .unwrap_err();
        assert!(matches!(
            err,
            StateError::CreateStateObject {
                kind: StateObjectKind::Rasterizer,
                ..
            }
        ));
        assert!(sm.device().calls.is_empty());

        sm.device_mut().fail_creation = false;
        sm.set_rasterizer_state(&RasterizerState::default()).unwrap();
        assert_eq!(sm.device().calls, vec![Call::Rasterizer { id: 1 }]);
    }

    #[test]
    fn device_loss_drops_cached_objects() {
        let mut sm = manager();
        let ds = DepthStencilState::default();
        sm.set_depth_stencil_state(&ds, 0, 0).unwrap();
        assert_eq!(sm.cache_stats().entries, 1);

        sm.device_mut().lost = true;
        sm.handle_device_lost();
        assert_eq!(sm.cache_stats().entries, 0);
        assert!(matches!(
            sm.set_depth_stencil_state(&ds, 0, 0),
            Err(StateError::DeviceLost)
        ));

        sm.device_mut().lost = false;
        sm.set_depth_stencil_state(&ds, 0, 0).unwrap();
        assert_eq!(sm.device().created.len(), 2);
        assert_eq!(sm.device().calls.len(), 2);
    }

    #[test]
    fn cache_is_bounded() {
        let mut cache = RenderStateCache::<FakeContext>::with_capacity(NonZeroUsize::new(2).unwrap());
        let mut device = FakeContext::default();
        for units in [1.0, 2.0, 3.0] {
            let state = RasterizerState {
                polygon_offset_fill: true,
                polygon_offset_units: units,
                ..RasterizerState::default()
            };
            cache.rasterizer_state(&mut device, &state, false).unwrap();
        }
        assert_eq!(cache.stats().entries, 2);
        assert_eq!(cache.stats().misses, 3);
    }
}
