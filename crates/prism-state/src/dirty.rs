use bitflags::bitflags;

bitflags! {
    /// Front-end state fields changed since the last sync. One bit per setter group.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct DirtyBits: u64 {
        const SCISSOR_TEST_ENABLED = 1 << 0;
        const SCISSOR = 1 << 1;
        const VIEWPORT = 1 << 2;
        const DEPTH_RANGE = 1 << 3;
        const BLEND_ENABLED = 1 << 4;
        const BLEND_COLOR = 1 << 5;
        const BLEND_FUNCS = 1 << 6;
        const BLEND_EQUATIONS = 1 << 7;
        const COLOR_MASK = 1 << 8;
        const SAMPLE_ALPHA_TO_COVERAGE_ENABLED = 1 << 9;
        const SAMPLE_COVERAGE_ENABLED = 1 << 10;
        const SAMPLE_COVERAGE = 1 << 11;
        const SAMPLE_MASK = 1 << 12;
        const DEPTH_TEST_ENABLED = 1 << 13;
        const DEPTH_FUNC = 1 << 14;
        const DEPTH_MASK = 1 << 15;
        const STENCIL_TEST_ENABLED = 1 << 16;
        const STENCIL_FUNCS_FRONT = 1 << 17;
        const STENCIL_FUNCS_BACK = 1 << 18;
        const STENCIL_OPS_FRONT = 1 << 19;
        const STENCIL_OPS_BACK = 1 << 20;
        const STENCIL_WRITEMASK_FRONT = 1 << 21;
        const STENCIL_WRITEMASK_BACK = 1 << 22;
        const CULL_FACE_ENABLED = 1 << 23;
        const CULL_FACE = 1 << 24;
        const FRONT_FACE = 1 << 25;
        const POLYGON_OFFSET_FILL_ENABLED = 1 << 26;
        const POLYGON_OFFSET = 1 << 27;
        const MULTISAMPLE_ENABLED = 1 << 28;
        const RASTERIZER_DISCARD_ENABLED = 1 << 29;
        const LINE_WIDTH = 1 << 30;
        const PRIMITIVE_RESTART_ENABLED = 1 << 31;
        const CLEAR_COLOR = 1 << 32;
        const CLEAR_DEPTH = 1 << 33;
        const CLEAR_STENCIL = 1 << 34;
        const UNPACK_STATE = 1 << 35;
        const PACK_STATE = 1 << 36;
        const DITHER_ENABLED = 1 << 37;

        const BLEND_STATE = Self::BLEND_ENABLED.bits()
            | Self::BLEND_COLOR.bits()
            | Self::BLEND_FUNCS.bits()
            | Self::BLEND_EQUATIONS.bits()
            | Self::COLOR_MASK.bits()
            | Self::SAMPLE_ALPHA_TO_COVERAGE_ENABLED.bits()
            | Self::DITHER_ENABLED.bits();
        const DEPTH_STENCIL_STATE = Self::DEPTH_TEST_ENABLED.bits()
            | Self::DEPTH_FUNC.bits()
            | Self::DEPTH_MASK.bits()
            | Self::STENCIL_TEST_ENABLED.bits()
            | Self::STENCIL_FUNCS_FRONT.bits()
            | Self::STENCIL_FUNCS_BACK.bits()
            | Self::STENCIL_OPS_FRONT.bits()
            | Self::STENCIL_OPS_BACK.bits()
            | Self::STENCIL_WRITEMASK_FRONT.bits()
            | Self::STENCIL_WRITEMASK_BACK.bits();
        const RASTERIZER_STATE = Self::CULL_FACE_ENABLED.bits()
            | Self::CULL_FACE.bits()
            | Self::FRONT_FACE.bits()
            | Self::POLYGON_OFFSET_FILL_ENABLED.bits()
            | Self::POLYGON_OFFSET.bits()
            | Self::RASTERIZER_DISCARD_ENABLED.bits();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_do_not_overlap() {
        assert!(!DirtyBits::BLEND_STATE.intersects(DirtyBits::DEPTH_STENCIL_STATE));
        assert!(!DirtyBits::BLEND_STATE.intersects(DirtyBits::RASTERIZER_STATE));
        assert!(!DirtyBits::DEPTH_STENCIL_STATE.intersects(DirtyBits::RASTERIZER_STATE));
        assert!(!DirtyBits::BLEND_STATE.contains(DirtyBits::SAMPLE_MASK));
    }

    #[test]
    fn iteration_yields_single_bits() {
        let dirty = DirtyBits::VIEWPORT | DirtyBits::CULL_FACE;
        let bits: Vec<_> = dirty.iter().collect();
        assert_eq!(bits, vec![DirtyBits::VIEWPORT, DirtyBits::CULL_FACE]);
    }
}
