use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 3] = [ShaderStage::Vertex, ShaderStage::Fragment, ShaderStage::Compute];

    pub(crate) fn index(self) -> usize {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::Fragment => 1,
            ShaderStage::Compute => 2,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
        })
    }
}

/// Language specification the shader is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderSpec {
    Gles2,
    WebGl,
    /// CSS custom filter shaders: `gl_FragColor`, `gl_FragData` and `gl_MaxDrawBuffers` are
    /// replaced by `css_MixColor` and `css_ColorMatrix`.
    CssShaders,
    Gles3,
    WebGl2,
    Gles3_1,
}

impl ShaderSpec {
    pub fn is_webgl(self) -> bool {
        matches!(self, ShaderSpec::WebGl | ShaderSpec::WebGl2 | ShaderSpec::CssShaders)
    }
}

/// Implementation limits and enabled extensions, read by field name by the built-in registrar.
///
/// Values are taken verbatim; nothing here is validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuiltInResources {
    pub max_vertex_attribs: i32,
    pub max_vertex_uniform_vectors: i32,
    pub max_varying_vectors: i32,
    pub max_vertex_texture_image_units: i32,
    pub max_combined_texture_image_units: i32,
    pub max_texture_image_units: i32,
    pub max_fragment_uniform_vectors: i32,
    pub max_draw_buffers: i32,

    // ESSL 3.00.
    pub max_vertex_output_vectors: i32,
    pub max_fragment_input_vectors: i32,
    pub min_program_texel_offset: i32,
    pub max_program_texel_offset: i32,

    // ESSL 3.10.
    pub max_compute_work_group_count: [i32; 3],
    pub max_compute_work_group_size: [i32; 3],

    /// `OVR_multiview` view count.
    pub max_views_ovr: i32,

    /// Whether `highp` is available in fragment shaders.
    pub fragment_precision_high: bool,

    pub oes_standard_derivatives: bool,
    pub oes_egl_image_external: bool,
    pub arb_texture_rectangle: bool,
    pub ext_draw_buffers: bool,
    pub ext_frag_depth: bool,
    pub ext_shader_texture_lod: bool,
}

impl Default for BuiltInResources {
    /// Minimum limits of OpenGL ES 2.0 with no extensions.
    fn default() -> Self {
        Self {
            max_vertex_attribs: 8,
            max_vertex_uniform_vectors: 128,
            max_varying_vectors: 8,
            max_vertex_texture_image_units: 0,
            max_combined_texture_image_units: 8,
            max_texture_image_units: 8,
            max_fragment_uniform_vectors: 16,
            max_draw_buffers: 1,
            max_vertex_output_vectors: 16,
            max_fragment_input_vectors: 15,
            min_program_texel_offset: -8,
            max_program_texel_offset: 7,
            max_compute_work_group_count: [65535, 65535, 65535],
            max_compute_work_group_size: [128, 128, 64],
            max_views_ovr: 1,
            fragment_precision_high: false,
            oes_standard_derivatives: false,
            oes_egl_image_external: false,
            arb_texture_rectangle: false,
            ext_draw_buffers: false,
            ext_frag_depth: false,
            ext_shader_texture_lod: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExtensionBehavior {
    /// Supported but not yet enabled by a `#extension` directive.
    #[default]
    Undefined,
    Require,
    Enable,
    Warn,
    Disable,
}

impl ExtensionBehavior {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtensionBehavior::Undefined => "undefined",
            ExtensionBehavior::Require => "require",
            ExtensionBehavior::Enable => "enable",
            ExtensionBehavior::Warn => "warn",
            ExtensionBehavior::Disable => "disable",
        }
    }

    pub fn is_enabled(self) -> bool {
        matches!(
            self,
            ExtensionBehavior::Require | ExtensionBehavior::Enable | ExtensionBehavior::Warn
        )
    }
}

pub type ExtensionBehaviorMap = BTreeMap<&'static str, ExtensionBehavior>;

pub const OES_STANDARD_DERIVATIVES: &str = "GL_OES_standard_derivatives";
pub const OES_EGL_IMAGE_EXTERNAL: &str = "GL_OES_EGL_image_external";
pub const ARB_TEXTURE_RECTANGLE: &str = "GL_ARB_texture_rectangle";
pub const EXT_DRAW_BUFFERS: &str = "GL_EXT_draw_buffers";
pub const EXT_FRAG_DEPTH: &str = "GL_EXT_frag_depth";
pub const EXT_SHADER_TEXTURE_LOD: &str = "GL_EXT_shader_texture_lod";

/// Every extension the resources advertise, all initially [`ExtensionBehavior::Undefined`].
pub fn extension_behavior(resources: &BuiltInResources) -> ExtensionBehaviorMap {
    let mut map = ExtensionBehaviorMap::new();
    for (enabled, name) in [
        (resources.oes_standard_derivatives, OES_STANDARD_DERIVATIVES),
        (resources.oes_egl_image_external, OES_EGL_IMAGE_EXTERNAL),
        (resources.arb_texture_rectangle, ARB_TEXTURE_RECTANGLE),
        (resources.ext_draw_buffers, EXT_DRAW_BUFFERS),
        (resources.ext_frag_depth, EXT_FRAG_DEPTH),
        (resources.ext_shader_texture_lod, EXT_SHADER_TEXTURE_LOD),
    ] {
        if enabled {
            map.insert(name, ExtensionBehavior::Undefined);
        }
    }
    map
}
