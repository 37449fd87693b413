//! Pipeline-state caching for the native backends.
//!
//! Each state manager keeps a copy of what it last applied to its native device and only issues
//! native calls for state that actually changed. Native devices are reached through small traits
//! ([`d3d9::D3d9Device`], [`d3d11::D3d11Device`], [`gl::GlFunctions`]) so the caching logic can be
//! driven by recording fakes in tests.

pub mod d3d;
pub mod d3d11;
pub mod d3d9;
pub mod dirty;
pub mod gl;
pub mod state;
pub mod webgpu;

pub use d3d11::{RenderStateCache, StateManager11};
pub use d3d9::StateManager9;
pub use dirty::DirtyBits;
pub use gl::StateManagerGl;
pub use state::{
    BlendState, ColorF, DepthStencilState, FramebufferInfo, PipelineState, RasterizerState,
    Rectangle,
};
pub use webgpu::PipelineStateCache;

/// Hit/miss counters of a state-object cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Kind of native state object, for error reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateObjectKind {
    Blend,
    DepthStencil,
    Rasterizer,
}

impl std::fmt::Display for StateObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StateObjectKind::Blend => "blend",
            StateObjectKind::DepthStencil => "depth-stencil",
            StateObjectKind::Rasterizer => "rasterizer",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to create {kind} state object: {message}")]
    CreateStateObject {
        kind: StateObjectKind,
        message: String,
    },
    #[error("{kind} unit {unit} out of range (context has {count})")]
    UnitOutOfRange {
        kind: &'static str,
        unit: usize,
        count: usize,
    },
    #[error("native device lost")]
    DeviceLost,
}
