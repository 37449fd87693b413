//! Native GL state management.
//!
//! Unlike the D3D backends, GL state is mutated piecemeal by helpers (blits, clears, pixel-local
//! storage) that also go through this manager. Every setter therefore compares against its cached
//! value and records a local dirty bit when it changes something, so the next
//! [`StateManagerGl::sync_state`] restores the front-end's view even for fields the front-end
//! itself did not touch.

use hashbrown::HashMap;
use tracing::{debug, trace};

use crate::dirty::DirtyBits;
use crate::state::{
    BlendEquation, BlendFactor, ColorF, CompareFunc, CullFace, FrontFace, PipelineState,
    PixelPackState, PixelUnpackState, Rectangle, StencilOp,
};
use crate::StateError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    ScissorTest,
    Blend,
    SampleAlphaToCoverage,
    SampleCoverage,
    DepthTest,
    StencilTest,
    CullFace,
    PolygonOffsetFill,
    Multisample,
    RasterizerDiscard,
    PrimitiveRestartFixedIndex,
    Dither,
    ProgramPointSize,
    PointSprite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Array,
    ElementArray,
    CopyRead,
    CopyWrite,
    PixelPack,
    PixelUnpack,
    Uniform,
    TransformFeedback,
    ShaderStorage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    Texture2D,
    CubeMap,
    Texture2DArray,
    Texture3D,
}

impl TextureTarget {
    pub const ALL: [TextureTarget; 4] = [
        TextureTarget::Texture2D,
        TextureTarget::CubeMap,
        TextureTarget::Texture2DArray,
        TextureTarget::Texture3D,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// `Framebuffer` binds both the read and the draw binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FramebufferTarget {
    Framebuffer,
    Read,
    Draw,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StencilFace {
    Front,
    Back,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelStoreParam {
    UnpackAlignment,
    UnpackRowLength,
    UnpackSkipRows,
    UnpackSkipPixels,
    UnpackImageHeight,
    UnpackSkipImages,
    PackAlignment,
    PackRowLength,
    PackSkipRows,
    PackSkipPixels,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// `GL_R32UI`, the initial format of every image unit.
pub const IMAGE_FORMAT_R32UI: u32 = 0x8236;

/// Arguments of one `glBindImageTexture` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageUnitBinding {
    pub texture: u32,
    pub level: i32,
    pub layered: bool,
    pub layer: i32,
    pub access: ImageAccess,
    /// Sized internal format enum.
    pub format: u32,
}

impl Default for ImageUnitBinding {
    fn default() -> Self {
        Self {
            texture: 0,
            level: 0,
            layered: false,
            layer: 0,
            access: ImageAccess::ReadOnly,
            format: IMAGE_FORMAT_R32UI,
        }
    }
}

impl ImageUnitBinding {
    pub fn texture(texture: u32, access: ImageAccess, format: u32) -> Self {
        Self {
            texture,
            access,
            format,
            ..Self::default()
        }
    }
}

/// The GL entry points the manager calls. Object names are raw GL names; `0` is "none".
pub trait GlFunctions {
    fn enable(&mut self, capability: Capability);
    fn disable(&mut self, capability: Capability);

    fn use_program(&mut self, program: u32);
    fn bind_vertex_array(&mut self, vao: u32);
    fn bind_buffer(&mut self, target: BufferTarget, buffer: u32);
    fn active_texture(&mut self, unit: u32);
    fn bind_texture(&mut self, target: TextureTarget, texture: u32);
    fn bind_framebuffer(&mut self, target: FramebufferTarget, framebuffer: u32);
    fn bind_renderbuffer(&mut self, renderbuffer: u32);
    fn bind_image_texture(&mut self, unit: u32, binding: &ImageUnitBinding);

    fn delete_program(&mut self, program: u32);
    fn delete_vertex_array(&mut self, vao: u32);
    fn delete_buffer(&mut self, buffer: u32);
    fn delete_texture(&mut self, texture: u32);
    fn delete_framebuffer(&mut self, framebuffer: u32);
    fn delete_renderbuffer(&mut self, renderbuffer: u32);

    fn scissor(&mut self, rect: Rectangle);
    fn viewport(&mut self, rect: Rectangle);
    fn depth_range(&mut self, near: f32, far: f32);
    fn blend_color(&mut self, color: ColorF);
    fn blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    );
    fn blend_equation_separate(&mut self, rgb: BlendEquation, alpha: BlendEquation);
    fn color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool);
    fn sample_coverage(&mut self, value: f32, invert: bool);
    fn depth_func(&mut self, func: CompareFunc);
    fn depth_mask(&mut self, mask: bool);
    fn stencil_func_separate(&mut self, face: StencilFace, func: CompareFunc, reference: i32, mask: u32);
    fn stencil_mask_separate(&mut self, face: StencilFace, mask: u32);
    fn stencil_op_separate(
        &mut self,
        face: StencilFace,
        fail: StencilOp,
        depth_fail: StencilOp,
        depth_pass: StencilOp,
    );
    fn cull_face(&mut self, mode: CullFace);
    fn front_face(&mut self, mode: FrontFace);
    fn polygon_offset(&mut self, factor: f32, units: f32);
    fn line_width(&mut self, width: f32);
    fn clear_color(&mut self, color: ColorF);
    fn clear_depth(&mut self, depth: f32);
    fn clear_stencil(&mut self, stencil: i32);
    fn pixel_store(&mut self, param: PixelStoreParam, value: i32);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlStandard {
    Desktop { core_profile: bool },
    Es,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlContextInfo {
    pub standard: GlStandard,
    pub max_combined_texture_units: usize,
    pub max_image_units: usize,
}

impl Default for GlContextInfo {
    fn default() -> Self {
        Self {
            standard: GlStandard::Es,
            max_combined_texture_units: 32,
            max_image_units: 8,
        }
    }
}

/// An image-unit binding replaced by [`StateManagerGl::save_and_bind_image_texture`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SavedImageUnit {
    unit: usize,
    binding: ImageUnitBinding,
}

macro_rules! capability_setters {
    ($($name:ident => $cap:ident, $bit:ident, $($field:ident).+;)*) => {
        $(
            pub fn $name(&mut self, enabled: bool) {
                if self.cur.$($field).+ != enabled {
                    self.cur.$($field).+ = enabled;
                    self.set_capability(Capability::$cap, enabled);
                    self.local_dirty |= DirtyBits::$bit;
                }
            }
        )*
    };
}

pub struct StateManagerGl<F: GlFunctions> {
    functions: F,

    program: u32,
    vao: u32,
    buffers: HashMap<BufferTarget, u32>,
    texture_unit: usize,
    /// Indexed by [`TextureTarget`], then by texture unit.
    textures: [Vec<u32>; 4],
    read_framebuffer: u32,
    draw_framebuffer: u32,
    renderbuffer: u32,
    image_units: Vec<ImageUnitBinding>,
    image_unit_journal: Vec<SavedImageUnit>,

    cur: PipelineState,
    cur_dither: bool,
    local_dirty: DirtyBits,
}

impl<F: GlFunctions> StateManagerGl<F> {
    pub fn new(mut functions: F, info: GlContextInfo) -> Self {
        if let GlStandard::Desktop { core_profile } = info.standard {
            functions.enable(Capability::ProgramPointSize);
            // Core profiles always rasterize points as sprites.
            if !core_profile {
                functions.enable(Capability::PointSprite);
            }
        }

        let units = info.max_combined_texture_units;
        let mut cur = PipelineState::default();
        cur.rasterizer.multi_sample = true;
        Self {
            functions,
            program: 0,
            vao: 0,
            buffers: HashMap::new(),
            texture_unit: 0,
            textures: [vec![0; units], vec![0; units], vec![0; units], vec![0; units]],
            read_framebuffer: 0,
            draw_framebuffer: 0,
            renderbuffer: 0,
            image_units: vec![ImageUnitBinding::default(); info.max_image_units],
            image_unit_journal: Vec::new(),
            cur,
            cur_dither: true,
            local_dirty: DirtyBits::empty(),
        }
    }

    pub fn functions(&self) -> &F {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut F {
        &mut self.functions
    }

    /// State changed by this manager that the front-end has not yet re-synced.
    pub fn local_dirty(&self) -> DirtyBits {
        self.local_dirty
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        if enabled {
            self.functions.enable(capability);
        } else {
            self.functions.disable(capability);
        }
    }

    // Object deletion. Bound objects are unbound first so the cache never names a dead object.

    pub fn delete_program(&mut self, program: u32) {
        if program == 0 {
            return;
        }
        if self.program == program {
            self.use_program(0);
        }
        self.functions.delete_program(program);
    }

    pub fn delete_vertex_array(&mut self, vao: u32) {
        if vao == 0 {
            return;
        }
        if self.vao == vao {
            self.bind_vertex_array(0, 0);
        }
        self.functions.delete_vertex_array(vao);
    }

    pub fn delete_texture(&mut self, texture: u32) -> Result<(), StateError> {
        if texture == 0 {
            return Ok(());
        }
        for target in TextureTarget::ALL {
            for unit in 0..self.textures[target.index()].len() {
                if self.textures[target.index()][unit] == texture {
                    self.active_texture(unit)?;
                    self.bind_texture(target, 0);
                }
            }
        }
        for unit in 0..self.image_units.len() {
            if self.image_units[unit].texture == texture {
                self.bind_image_texture(unit, ImageUnitBinding::default())?;
            }
        }
        for saved in &mut self.image_unit_journal {
            if saved.binding.texture == texture {
                saved.binding.texture = 0;
            }
        }
        self.functions.delete_texture(texture);
        Ok(())
    }

    pub fn delete_buffer(&mut self, buffer: u32) {
        if buffer == 0 {
            return;
        }
        let bound: Vec<BufferTarget> = self
            .buffers
            .iter()
            .filter(|&(_, &bound)| bound == buffer)
            .map(|(&target, _)| target)
            .collect();
        for target in bound {
            self.bind_buffer(target, 0);
        }
        self.functions.delete_buffer(buffer);
    }

    pub fn delete_framebuffer(&mut self, framebuffer: u32) {
        if framebuffer == 0 {
            return;
        }
        if self.read_framebuffer == framebuffer {
            self.bind_framebuffer(FramebufferTarget::Read, 0);
        }
        if self.draw_framebuffer == framebuffer {
            self.bind_framebuffer(FramebufferTarget::Draw, 0);
        }
        self.functions.delete_framebuffer(framebuffer);
    }

    pub fn delete_renderbuffer(&mut self, renderbuffer: u32) {
        if renderbuffer == 0 {
            return;
        }
        if self.renderbuffer == renderbuffer {
            self.bind_renderbuffer(0);
        }
        self.functions.delete_renderbuffer(renderbuffer);
    }

    // Bindings.

    pub fn use_program(&mut self, program: u32) {
        if self.program != program {
            self.program = program;
            self.functions.use_program(program);
        }
    }

    /// Binding a vertex array also changes the element-array buffer binding to the one the
    /// vertex array captured.
    pub fn bind_vertex_array(&mut self, vao: u32, element_array_buffer: u32) {
        if self.vao != vao {
            self.vao = vao;
            self.buffers
                .insert(BufferTarget::ElementArray, element_array_buffer);
            self.functions.bind_vertex_array(vao);
        }
    }

    pub fn bind_buffer(&mut self, target: BufferTarget, buffer: u32) {
        let bound = self.buffers.entry(target).or_insert(0);
        if *bound != buffer {
            *bound = buffer;
            self.functions.bind_buffer(target, buffer);
        }
    }

    pub fn active_texture(&mut self, unit: usize) -> Result<(), StateError> {
        let count = self.textures[0].len();
        if unit >= count {
            return Err(StateError::UnitOutOfRange {
                kind: "texture",
                unit,
                count,
            });
        }
        if self.texture_unit != unit {
            self.texture_unit = unit;
            self.functions.active_texture(unit as u32);
        }
        Ok(())
    }

    /// Binds `texture` on the active texture unit.
    pub fn bind_texture(&mut self, target: TextureTarget, texture: u32) {
        let bound = &mut self.textures[target.index()][self.texture_unit];
        if *bound != texture {
            *bound = texture;
            self.functions.bind_texture(target, texture);
        }
    }

    pub fn bind_framebuffer(&mut self, target: FramebufferTarget, framebuffer: u32) {
        let changed = match target {
            FramebufferTarget::Framebuffer => {
                let changed = self.read_framebuffer != framebuffer
                    || self.draw_framebuffer != framebuffer;
                self.read_framebuffer = framebuffer;
                self.draw_framebuffer = framebuffer;
                changed
            }
            FramebufferTarget::Read => {
                std::mem::replace(&mut self.read_framebuffer, framebuffer) != framebuffer
            }
            FramebufferTarget::Draw => {
                std::mem::replace(&mut self.draw_framebuffer, framebuffer) != framebuffer
            }
        };
        if changed {
            self.functions.bind_framebuffer(target, framebuffer);
        }
    }

    pub fn bind_renderbuffer(&mut self, renderbuffer: u32) {
        if self.renderbuffer != renderbuffer {
            self.renderbuffer = renderbuffer;
            self.functions.bind_renderbuffer(renderbuffer);
        }
    }

    // Image units.

    pub fn image_unit(&self, unit: usize) -> Option<&ImageUnitBinding> {
        self.image_units.get(unit)
    }

    pub fn bind_image_texture(
        &mut self,
        unit: usize,
        binding: ImageUnitBinding,
    ) -> Result<(), StateError> {
        let count = self.image_units.len();
        let Some(bound) = self.image_units.get_mut(unit) else {
            return Err(StateError::UnitOutOfRange {
                kind: "image",
                unit,
                count,
            });
        };
        if *bound != binding {
            *bound = binding;
            self.functions.bind_image_texture(unit as u32, &binding);
        }
        Ok(())
    }

    /// Like [`bind_image_texture`](Self::bind_image_texture), but remembers the previous binding
    /// for [`restore_image_units`](Self::restore_image_units).
    pub fn save_and_bind_image_texture(
        &mut self,
        unit: usize,
        binding: ImageUnitBinding,
    ) -> Result<(), StateError> {
        let previous = self
            .image_units
            .get(unit)
            .copied()
            .ok_or(StateError::UnitOutOfRange {
                kind: "image",
                unit,
                count: self.image_units.len(),
            })?;
        self.image_unit_journal.push(SavedImageUnit {
            unit,
            binding: previous,
        });
        self.bind_image_texture(unit, binding)
    }

    /// Undoes every saved binding, newest first. Textures deleted in the meantime come back as
    /// texture 0.
    pub fn restore_image_units(&mut self) -> Result<(), StateError> {
        debug!(saved = self.image_unit_journal.len(), "restoring image units");
        while let Some(saved) = self.image_unit_journal.pop() {
            self.bind_image_texture(saved.unit, saved.binding)?;
        }
        Ok(())
    }

    // Pipeline state.

    capability_setters! {
        set_scissor_test_enabled => ScissorTest, SCISSOR_TEST_ENABLED, scissor_test;
        set_blend_enabled => Blend, BLEND_ENABLED, blend.blend;
        set_sample_alpha_to_coverage_enabled =>
            SampleAlphaToCoverage, SAMPLE_ALPHA_TO_COVERAGE_ENABLED, blend.sample_alpha_to_coverage;
        set_sample_coverage_enabled => SampleCoverage, SAMPLE_COVERAGE_ENABLED, sample_coverage_enabled;
        set_depth_test_enabled => DepthTest, DEPTH_TEST_ENABLED, depth_stencil.depth_test;
        set_stencil_test_enabled => StencilTest, STENCIL_TEST_ENABLED, depth_stencil.stencil_test;
        set_cull_face_enabled => CullFace, CULL_FACE_ENABLED, rasterizer.cull_face;
        set_polygon_offset_fill_enabled =>
            PolygonOffsetFill, POLYGON_OFFSET_FILL_ENABLED, rasterizer.polygon_offset_fill;
        set_multisample_enabled => Multisample, MULTISAMPLE_ENABLED, rasterizer.multi_sample;
        set_rasterizer_discard_enabled =>
            RasterizerDiscard, RASTERIZER_DISCARD_ENABLED, rasterizer.rasterizer_discard;
        set_primitive_restart_enabled =>
            PrimitiveRestartFixedIndex, PRIMITIVE_RESTART_ENABLED, primitive_restart;
        set_dither_enabled => Dither, DITHER_ENABLED, blend.dither;
    }

    pub fn set_scissor(&mut self, scissor: Rectangle) {
        if self.cur.scissor != scissor {
            self.cur.scissor = scissor;
            self.functions.scissor(scissor);
            self.local_dirty |= DirtyBits::SCISSOR;
        }
    }

    pub fn set_viewport(&mut self, viewport: Rectangle) {
        if self.cur.viewport != viewport {
            self.cur.viewport = viewport;
            self.functions.viewport(viewport);
            self.local_dirty |= DirtyBits::VIEWPORT;
        }
    }

    pub fn set_depth_range(&mut self, near: f32, far: f32) {
        if self.cur.near != near || self.cur.far != far {
            self.cur.near = near;
            self.cur.far = far;
            self.functions.depth_range(near, far);
            self.local_dirty |= DirtyBits::DEPTH_RANGE;
        }
    }

    pub fn set_blend_color(&mut self, color: ColorF) {
        if self.cur.blend_color != color {
            self.cur.blend_color = color;
            self.functions.blend_color(color);
            self.local_dirty |= DirtyBits::BLEND_COLOR;
        }
    }

    pub fn set_blend_funcs(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        let blend = &mut self.cur.blend;
        if (blend.source_blend_rgb, blend.dest_blend_rgb, blend.source_blend_alpha, blend.dest_blend_alpha)
            != (src_rgb, dst_rgb, src_alpha, dst_alpha)
        {
            blend.source_blend_rgb = src_rgb;
            blend.dest_blend_rgb = dst_rgb;
            blend.source_blend_alpha = src_alpha;
            blend.dest_blend_alpha = dst_alpha;
            self.functions
                .blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha);
            self.local_dirty |= DirtyBits::BLEND_FUNCS;
        }
    }

    pub fn set_blend_equations(&mut self, rgb: BlendEquation, alpha: BlendEquation) {
        let blend = &mut self.cur.blend;
        if blend.blend_equation_rgb != rgb || blend.blend_equation_alpha != alpha {
            blend.blend_equation_rgb = rgb;
            blend.blend_equation_alpha = alpha;
            self.functions.blend_equation_separate(rgb, alpha);
            self.local_dirty |= DirtyBits::BLEND_EQUATIONS;
        }
    }

    pub fn set_color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool) {
        if self.cur.blend.color_mask() != [red, green, blue, alpha] {
            let blend = &mut self.cur.blend;
            blend.color_mask_red = red;
            blend.color_mask_green = green;
            blend.color_mask_blue = blue;
            blend.color_mask_alpha = alpha;
            self.functions.color_mask(red, green, blue, alpha);
            self.local_dirty |= DirtyBits::COLOR_MASK;
        }
    }

    pub fn set_sample_coverage(&mut self, value: f32, invert: bool) {
        if self.cur.sample_coverage_value != value || self.cur.sample_coverage_invert != invert {
            self.cur.sample_coverage_value = value;
            self.cur.sample_coverage_invert = invert;
            self.functions.sample_coverage(value, invert);
            self.local_dirty |= DirtyBits::SAMPLE_COVERAGE;
        }
    }

    pub fn set_depth_func(&mut self, func: CompareFunc) {
        if self.cur.depth_stencil.depth_func != func {
            self.cur.depth_stencil.depth_func = func;
            self.functions.depth_func(func);
            self.local_dirty |= DirtyBits::DEPTH_FUNC;
        }
    }

    pub fn set_depth_mask(&mut self, mask: bool) {
        if self.cur.depth_stencil.depth_mask != mask {
            self.cur.depth_stencil.depth_mask = mask;
            self.functions.depth_mask(mask);
            self.local_dirty |= DirtyBits::DEPTH_MASK;
        }
    }

    pub fn set_stencil_front_writemask(&mut self, mask: u32) {
        if self.cur.depth_stencil.stencil_writemask != mask {
            self.cur.depth_stencil.stencil_writemask = mask;
            self.functions.stencil_mask_separate(StencilFace::Front, mask);
            self.local_dirty |= DirtyBits::STENCIL_WRITEMASK_FRONT;
        }
    }

    pub fn set_stencil_back_writemask(&mut self, mask: u32) {
        if self.cur.depth_stencil.stencil_back_writemask != mask {
            self.cur.depth_stencil.stencil_back_writemask = mask;
            self.functions.stencil_mask_separate(StencilFace::Back, mask);
            self.local_dirty |= DirtyBits::STENCIL_WRITEMASK_BACK;
        }
    }

    pub fn set_stencil_front_funcs(&mut self, func: CompareFunc, reference: i32, mask: u32) {
        let ds = &mut self.cur.depth_stencil;
        if ds.stencil_func != func || self.cur.stencil_ref != reference || ds.stencil_mask != mask {
            ds.stencil_func = func;
            ds.stencil_mask = mask;
            self.cur.stencil_ref = reference;
            self.functions
                .stencil_func_separate(StencilFace::Front, func, reference, mask);
            self.local_dirty |= DirtyBits::STENCIL_FUNCS_FRONT;
        }
    }

    pub fn set_stencil_back_funcs(&mut self, func: CompareFunc, reference: i32, mask: u32) {
        let ds = &mut self.cur.depth_stencil;
        if ds.stencil_back_func != func
            || self.cur.stencil_back_ref != reference
            || ds.stencil_back_mask != mask
        {
            ds.stencil_back_func = func;
            ds.stencil_back_mask = mask;
            self.cur.stencil_back_ref = reference;
            self.functions
                .stencil_func_separate(StencilFace::Back, func, reference, mask);
            self.local_dirty |= DirtyBits::STENCIL_FUNCS_BACK;
        }
    }

    pub fn set_stencil_front_ops(&mut self, fail: StencilOp, depth_fail: StencilOp, depth_pass: StencilOp) {
        let ds = &mut self.cur.depth_stencil;
        if (ds.stencil_fail, ds.stencil_pass_depth_fail, ds.stencil_pass_depth_pass)
            != (fail, depth_fail, depth_pass)
        {
            ds.stencil_fail = fail;
            ds.stencil_pass_depth_fail = depth_fail;
            ds.stencil_pass_depth_pass = depth_pass;
            self.functions
                .stencil_op_separate(StencilFace::Front, fail, depth_fail, depth_pass);
            self.local_dirty |= DirtyBits::STENCIL_OPS_FRONT;
        }
    }

    pub fn set_stencil_back_ops(&mut self, fail: StencilOp, depth_fail: StencilOp, depth_pass: StencilOp) {
        let ds = &mut self.cur.depth_stencil;
        if (ds.stencil_back_fail, ds.stencil_back_pass_depth_fail, ds.stencil_back_pass_depth_pass)
            != (fail, depth_fail, depth_pass)
        {
            ds.stencil_back_fail = fail;
            ds.stencil_back_pass_depth_fail = depth_fail;
            ds.stencil_back_pass_depth_pass = depth_pass;
            self.functions
                .stencil_op_separate(StencilFace::Back, fail, depth_fail, depth_pass);
            self.local_dirty |= DirtyBits::STENCIL_OPS_BACK;
        }
    }

    pub fn set_cull_face(&mut self, mode: CullFace) {
        if self.cur.rasterizer.cull_mode != mode {
            self.cur.rasterizer.cull_mode = mode;
            self.functions.cull_face(mode);
            self.local_dirty |= DirtyBits::CULL_FACE;
        }
    }

    pub fn set_front_face(&mut self, mode: FrontFace) {
        if self.cur.rasterizer.front_face != mode {
            self.cur.rasterizer.front_face = mode;
            self.functions.front_face(mode);
            self.local_dirty |= DirtyBits::FRONT_FACE;
        }
    }

    pub fn set_polygon_offset(&mut self, factor: f32, units: f32) {
        let raster = &mut self.cur.rasterizer;
        if raster.polygon_offset_factor != factor || raster.polygon_offset_units != units {
            raster.polygon_offset_factor = factor;
            raster.polygon_offset_units = units;
            self.functions.polygon_offset(factor, units);
            self.local_dirty |= DirtyBits::POLYGON_OFFSET;
        }
    }

    pub fn set_line_width(&mut self, width: f32) {
        if self.cur.line_width != width {
            self.cur.line_width = width;
            self.functions.line_width(width);
            self.local_dirty |= DirtyBits::LINE_WIDTH;
        }
    }

    pub fn set_clear_color(&mut self, color: ColorF) {
        if self.cur.clear_color != color {
            self.cur.clear_color = color;
            self.functions.clear_color(color);
            self.local_dirty |= DirtyBits::CLEAR_COLOR;
        }
    }

    pub fn set_clear_depth(&mut self, depth: f32) {
        if self.cur.clear_depth != depth {
            self.cur.clear_depth = depth;
            self.functions.clear_depth(depth);
            self.local_dirty |= DirtyBits::CLEAR_DEPTH;
        }
    }

    pub fn set_clear_stencil(&mut self, stencil: i32) {
        if self.cur.clear_stencil != stencil {
            self.cur.clear_stencil = stencil;
            self.functions.clear_stencil(stencil);
            self.local_dirty |= DirtyBits::CLEAR_STENCIL;
        }
    }

    pub fn set_pixel_unpack_state(&mut self, unpack: &PixelUnpackState) {
        let cur = self.cur.unpack;
        let fields = [
            (PixelStoreParam::UnpackAlignment, cur.alignment, unpack.alignment),
            (PixelStoreParam::UnpackRowLength, cur.row_length, unpack.row_length),
            (PixelStoreParam::UnpackSkipRows, cur.skip_rows, unpack.skip_rows),
            (PixelStoreParam::UnpackSkipPixels, cur.skip_pixels, unpack.skip_pixels),
            (PixelStoreParam::UnpackImageHeight, cur.image_height, unpack.image_height),
            (PixelStoreParam::UnpackSkipImages, cur.skip_images, unpack.skip_images),
        ];
        if self.store_changed_pixel_params(&fields) {
            self.cur.unpack = *unpack;
            self.local_dirty |= DirtyBits::UNPACK_STATE;
        }
    }

    pub fn set_pixel_pack_state(&mut self, pack: &PixelPackState) {
        let cur = self.cur.pack;
        let fields = [
            (PixelStoreParam::PackAlignment, cur.alignment, pack.alignment),
            (PixelStoreParam::PackRowLength, cur.row_length, pack.row_length),
            (PixelStoreParam::PackSkipRows, cur.skip_rows, pack.skip_rows),
            (PixelStoreParam::PackSkipPixels, cur.skip_pixels, pack.skip_pixels),
        ];
        if self.store_changed_pixel_params(&fields) {
            self.cur.pack = *pack;
            self.local_dirty |= DirtyBits::PACK_STATE;
        }
    }

    fn store_changed_pixel_params(&mut self, fields: &[(PixelStoreParam, i32, i32)]) -> bool {
        let mut changed = false;
        for &(param, current, requested) in fields {
            if current != requested {
                self.functions.pixel_store(param, requested);
                changed = true;
            }
        }
        changed
    }

    /// Brings native state in line with `state` for every field in `dirty` or changed locally
    /// since the last sync.
    pub fn sync_state(&mut self, state: &PipelineState, dirty: DirtyBits) {
        let all = dirty | self.local_dirty;
        trace!(?all, "syncing GL state");
        for bit in all.iter() {
            let blend = &state.blend;
            let ds = &state.depth_stencil;
            let raster = &state.rasterizer;
            match bit {
                DirtyBits::SCISSOR_TEST_ENABLED => self.set_scissor_test_enabled(state.scissor_test),
                DirtyBits::SCISSOR => self.set_scissor(state.scissor),
                DirtyBits::VIEWPORT => self.set_viewport(state.viewport),
                DirtyBits::DEPTH_RANGE => self.set_depth_range(state.near, state.far),
                DirtyBits::BLEND_ENABLED => self.set_blend_enabled(blend.blend),
                DirtyBits::BLEND_COLOR => self.set_blend_color(state.blend_color),
                DirtyBits::BLEND_FUNCS => self.set_blend_funcs(
                    blend.source_blend_rgb,
                    blend.dest_blend_rgb,
                    blend.source_blend_alpha,
                    blend.dest_blend_alpha,
                ),
                DirtyBits::BLEND_EQUATIONS => {
                    self.set_blend_equations(blend.blend_equation_rgb, blend.blend_equation_alpha)
                }
                DirtyBits::COLOR_MASK => {
                    let [red, green, blue, alpha] = blend.color_mask();
                    self.set_color_mask(red, green, blue, alpha);
                }
                DirtyBits::SAMPLE_ALPHA_TO_COVERAGE_ENABLED => {
                    self.set_sample_alpha_to_coverage_enabled(blend.sample_alpha_to_coverage)
                }
                DirtyBits::SAMPLE_COVERAGE_ENABLED => {
                    self.set_sample_coverage_enabled(state.sample_coverage_enabled)
                }
                DirtyBits::SAMPLE_COVERAGE => self
                    .set_sample_coverage(state.sample_coverage_value, state.sample_coverage_invert),
                DirtyBits::DEPTH_TEST_ENABLED => self.set_depth_test_enabled(ds.depth_test),
                DirtyBits::DEPTH_FUNC => self.set_depth_func(ds.depth_func),
                DirtyBits::DEPTH_MASK => self.set_depth_mask(ds.depth_mask),
                DirtyBits::STENCIL_TEST_ENABLED => self.set_stencil_test_enabled(ds.stencil_test),
                DirtyBits::STENCIL_FUNCS_FRONT => {
                    self.set_stencil_front_funcs(ds.stencil_func, state.stencil_ref, ds.stencil_mask)
                }
                DirtyBits::STENCIL_FUNCS_BACK => self.set_stencil_back_funcs(
                    ds.stencil_back_func,
                    state.stencil_back_ref,
                    ds.stencil_back_mask,
                ),
                DirtyBits::STENCIL_OPS_FRONT => self.set_stencil_front_ops(
                    ds.stencil_fail,
                    ds.stencil_pass_depth_fail,
                    ds.stencil_pass_depth_pass,
                ),
                DirtyBits::STENCIL_OPS_BACK => self.set_stencil_back_ops(
                    ds.stencil_back_fail,
                    ds.stencil_back_pass_depth_fail,
                    ds.stencil_back_pass_depth_pass,
                ),
                DirtyBits::STENCIL_WRITEMASK_FRONT => {
                    self.set_stencil_front_writemask(ds.stencil_writemask)
                }
                DirtyBits::STENCIL_WRITEMASK_BACK => {
                    self.set_stencil_back_writemask(ds.stencil_back_writemask)
                }
                DirtyBits::CULL_FACE_ENABLED => self.set_cull_face_enabled(raster.cull_face),
                DirtyBits::CULL_FACE => self.set_cull_face(raster.cull_mode),
                DirtyBits::FRONT_FACE => self.set_front_face(raster.front_face),
                DirtyBits::POLYGON_OFFSET_FILL_ENABLED => {
                    self.set_polygon_offset_fill_enabled(raster.polygon_offset_fill)
                }
                DirtyBits::POLYGON_OFFSET => {
                    self.set_polygon_offset(raster.polygon_offset_factor, raster.polygon_offset_units)
                }
                DirtyBits::MULTISAMPLE_ENABLED => self.set_multisample_enabled(raster.multi_sample),
                DirtyBits::RASTERIZER_DISCARD_ENABLED => {
                    self.set_rasterizer_discard_enabled(raster.rasterizer_discard)
                }
                DirtyBits::LINE_WIDTH => self.set_line_width(state.line_width),
                DirtyBits::PRIMITIVE_RESTART_ENABLED => {
                    self.set_primitive_restart_enabled(state.primitive_restart)
                }
                DirtyBits::CLEAR_COLOR => self.set_clear_color(state.clear_color),
                DirtyBits::CLEAR_DEPTH => self.set_clear_depth(state.clear_depth),
                DirtyBits::CLEAR_STENCIL => self.set_clear_stencil(state.clear_stencil),
                DirtyBits::UNPACK_STATE => self.set_pixel_unpack_state(&state.unpack),
                DirtyBits::PACK_STATE => self.set_pixel_pack_state(&state.pack),
                DirtyBits::DITHER_ENABLED => self.set_dither_enabled(blend.dither),
                _ => {}
            }
        }
        self.local_dirty = DirtyBits::empty();
    }
}
