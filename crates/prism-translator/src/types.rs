use std::fmt;
use std::sync::Arc;

/// Scalar/sampler kind of a shader value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BasicType {
    Void,
    Float,
    Int,
    UInt,
    Bool,
    Sampler2D,
    Sampler3D,
    SamplerCube,
    Sampler2DArray,
    SamplerExternalOes,
    Sampler2DRect,
    ISampler2D,
    ISampler3D,
    ISamplerCube,
    ISampler2DArray,
    USampler2D,
    USampler3D,
    USamplerCube,
    USampler2DArray,
    Sampler2DShadow,
    SamplerCubeShadow,
    Sampler2DArrayShadow,
    Struct,
}

impl BasicType {
    pub fn as_str(self) -> &'static str {
        match self {
            BasicType::Void => "void",
            BasicType::Float => "float",
            BasicType::Int => "int",
            BasicType::UInt => "uint",
            BasicType::Bool => "bool",
            BasicType::Sampler2D => "sampler2D",
            BasicType::Sampler3D => "sampler3D",
            BasicType::SamplerCube => "samplerCube",
            BasicType::Sampler2DArray => "sampler2DArray",
            BasicType::SamplerExternalOes => "samplerExternalOES",
            BasicType::Sampler2DRect => "sampler2DRect",
            BasicType::ISampler2D => "isampler2D",
            BasicType::ISampler3D => "isampler3D",
            BasicType::ISamplerCube => "isamplerCube",
            BasicType::ISampler2DArray => "isampler2DArray",
            BasicType::USampler2D => "usampler2D",
            BasicType::USampler3D => "usampler3D",
            BasicType::USamplerCube => "usamplerCube",
            BasicType::USampler2DArray => "usampler2DArray",
            BasicType::Sampler2DShadow => "sampler2DShadow",
            BasicType::SamplerCubeShadow => "samplerCubeShadow",
            BasicType::Sampler2DArrayShadow => "sampler2DArrayShadow",
            BasicType::Struct => "structure",
        }
    }

    /// Code used when building mangled function signatures.
    fn mangled_code(self) -> &'static str {
        match self {
            BasicType::Void => "v",
            BasicType::Float => "f",
            BasicType::Int => "i",
            BasicType::UInt => "u",
            BasicType::Bool => "b",
            BasicType::Sampler2D => "s2",
            BasicType::Sampler3D => "s3",
            BasicType::SamplerCube => "sC",
            BasicType::Sampler2DArray => "s2a",
            BasicType::SamplerExternalOes => "sext",
            BasicType::Sampler2DRect => "s2r",
            BasicType::ISampler2D => "is2",
            BasicType::ISampler3D => "is3",
            BasicType::ISamplerCube => "isC",
            BasicType::ISampler2DArray => "is2a",
            BasicType::USampler2D => "us2",
            BasicType::USampler3D => "us3",
            BasicType::USamplerCube => "usC",
            BasicType::USampler2DArray => "us2a",
            BasicType::Sampler2DShadow => "s2s",
            BasicType::SamplerCubeShadow => "sCs",
            BasicType::Sampler2DArrayShadow => "s2as",
            BasicType::Struct => "st",
        }
    }

    pub fn is_sampler(self) -> bool {
        !matches!(
            self,
            BasicType::Void
                | BasicType::Float
                | BasicType::Int
                | BasicType::UInt
                | BasicType::Bool
                | BasicType::Struct
        )
    }

    /// Whether precision qualifiers apply to values of this kind.
    pub fn supports_precision(self) -> bool {
        matches!(self, BasicType::Float | BasicType::Int | BasicType::UInt) || self.is_sampler()
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Precision {
    #[default]
    Undefined,
    Low,
    Medium,
    High,
}

impl Precision {
    pub fn as_str(self) -> &'static str {
        match self {
            Precision::Undefined => "",
            Precision::Low => "lowp",
            Precision::Medium => "mediump",
            Precision::High => "highp",
        }
    }
}

/// Storage class of a shader value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Qualifier {
    #[default]
    Temporary,
    Global,
    Const,
    Attribute,
    VaryingIn,
    VaryingOut,
    Uniform,
    VertexIn,
    VertexOut,
    FragmentIn,
    FragmentOut,

    // Function parameters.
    In,
    Out,
    InOut,
    ConstReadOnly,

    // Interpolation.
    Smooth,
    Flat,
    Centroid,
    SmoothIn,
    SmoothOut,
    FlatIn,
    FlatOut,
    CentroidIn,
    CentroidOut,

    ComputeIn,
    Shared,

    // Built-in special variables.
    Position,
    PointSize,
    InstanceId,
    VertexId,
    FragCoord,
    FrontFacing,
    PointCoord,
    FragColor,
    FragData,
    FragDepth,
    FragDepthExt,
    NumWorkGroups,
    WorkGroupSize,
    WorkGroupId,
    LocalInvocationId,
    GlobalInvocationId,
    LocalInvocationIndex,
}

impl Qualifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Qualifier::Temporary => "Temporary",
            Qualifier::Global => "Global",
            Qualifier::Const => "const",
            Qualifier::Attribute => "attribute",
            Qualifier::VaryingIn | Qualifier::VaryingOut => "varying",
            Qualifier::Uniform => "uniform",
            Qualifier::VertexIn | Qualifier::FragmentIn | Qualifier::In | Qualifier::ComputeIn => {
                "in"
            }
            Qualifier::VertexOut | Qualifier::FragmentOut | Qualifier::Out => "out",
            Qualifier::InOut => "inout",
            Qualifier::ConstReadOnly => "const",
            Qualifier::Smooth => "smooth",
            Qualifier::Flat => "flat",
            Qualifier::Centroid => "centroid",
            Qualifier::SmoothIn => "smooth in",
            Qualifier::SmoothOut => "smooth out",
            Qualifier::FlatIn => "flat in",
            Qualifier::FlatOut => "flat out",
            Qualifier::CentroidIn => "centroid in",
            Qualifier::CentroidOut => "centroid out",
            Qualifier::Shared => "shared",
            Qualifier::Position => "Position",
            Qualifier::PointSize => "PointSize",
            Qualifier::InstanceId => "InstanceID",
            Qualifier::VertexId => "VertexID",
            Qualifier::FragCoord => "FragCoord",
            Qualifier::FrontFacing => "FrontFacing",
            Qualifier::PointCoord => "PointCoord",
            Qualifier::FragColor => "FragColor",
            Qualifier::FragData => "FragData",
            Qualifier::FragDepth | Qualifier::FragDepthExt => "FragDepth",
            Qualifier::NumWorkGroups => "NumWorkGroups",
            Qualifier::WorkGroupSize => "WorkGroupSize",
            Qualifier::WorkGroupId => "WorkGroupID",
            Qualifier::LocalInvocationId => "LocalInvocationID",
            Qualifier::GlobalInvocationId => "GlobalInvocationID",
            Qualifier::LocalInvocationIndex => "LocalInvocationIndex",
        }
    }

    /// User-declared stage outputs.
    pub fn is_shader_output(self) -> bool {
        matches!(
            self,
            Qualifier::VaryingOut
                | Qualifier::VertexOut
                | Qualifier::FragmentOut
                | Qualifier::SmoothOut
                | Qualifier::FlatOut
                | Qualifier::CentroidOut
        )
    }

    /// Built-in special variables that the stage writes.
    pub fn is_builtin_output(self) -> bool {
        matches!(
            self,
            Qualifier::Position
                | Qualifier::PointSize
                | Qualifier::FragColor
                | Qualifier::FragData
                | Qualifier::FragDepth
                | Qualifier::FragDepthExt
        )
    }

    pub fn is_varying(self) -> bool {
        matches!(
            self,
            Qualifier::VaryingIn
                | Qualifier::VaryingOut
                | Qualifier::VertexOut
                | Qualifier::FragmentIn
                | Qualifier::SmoothIn
                | Qualifier::SmoothOut
                | Qualifier::FlatIn
                | Qualifier::FlatOut
                | Qualifier::CentroidIn
                | Qualifier::CentroidOut
        )
    }

    pub fn is_parameter_out(self) -> bool {
        matches!(self, Qualifier::Out | Qualifier::InOut)
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Array annotation of a [`Type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArraySize {
    Sized(u32),
    /// Size not known yet (e.g. `float a[] = float[](...)` before folding).
    Unsized,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

/// A user or built-in structure. Identity is carried by `id`; two declarations with the same
/// name in different scopes are distinct types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructType {
    pub id: u32,
    /// Empty for anonymous structs.
    pub name: String,
    pub fields: Vec<Field>,
    pub builtin: bool,
}

impl StructType {
    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }

    fn mangled_name(&self) -> String {
        let mut out = format!("struct-{}-", self.name);
        for field in &self.fields {
            out.push_str(&field.ty.mangled_name());
        }
        out
    }
}

/// Shader value type: basic kind x precision x qualifier x shape, plus the array annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Type {
    pub basic: BasicType,
    pub precision: Precision,
    pub qualifier: Qualifier,
    pub invariant: bool,
    /// Vector size, or column count for matrices.
    primary: u8,
    /// Row count for matrices, 1 otherwise.
    secondary: u8,
    array: Option<ArraySize>,
    structure: Option<Arc<StructType>>,
}

impl Type {
    pub fn new(basic: BasicType, precision: Precision, qualifier: Qualifier, size: u8) -> Self {
        debug_assert!((1..=4).contains(&size), "vector size {size}");
        Self {
            basic,
            precision,
            qualifier,
            invariant: false,
            primary: size,
            secondary: 1,
            array: None,
            structure: None,
        }
    }

    pub fn matrix(precision: Precision, qualifier: Qualifier, cols: u8, rows: u8) -> Self {
        debug_assert!((2..=4).contains(&cols) && (2..=4).contains(&rows));
        Self {
            basic: BasicType::Float,
            precision,
            qualifier,
            invariant: false,
            primary: cols,
            secondary: rows,
            array: None,
            structure: None,
        }
    }

    pub fn structure(structure: Arc<StructType>, qualifier: Qualifier) -> Self {
        Self {
            basic: BasicType::Struct,
            precision: Precision::Undefined,
            qualifier,
            invariant: false,
            primary: 1,
            secondary: 1,
            array: None,
            structure: Some(structure),
        }
    }

    pub fn void() -> Self {
        Self::new(BasicType::Void, Precision::Undefined, Qualifier::Temporary, 1)
    }

    /// Temporary value of the given kind and vector size.
    pub fn temp(basic: BasicType, precision: Precision, size: u8) -> Self {
        Self::new(basic, precision, Qualifier::Temporary, size)
    }

    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifier = qualifier;
        self
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_array_size(mut self, size: u32) -> Self {
        self.set_array_size(size);
        self
    }

    pub fn nominal_size(&self) -> u8 {
        self.primary
    }

    pub fn cols(&self) -> u8 {
        self.primary
    }

    pub fn rows(&self) -> u8 {
        self.secondary
    }

    pub fn is_matrix(&self) -> bool {
        self.secondary > 1
    }

    pub fn is_non_square_matrix(&self) -> bool {
        self.is_matrix() && self.primary != self.secondary
    }

    pub fn is_vector(&self) -> bool {
        self.primary > 1 && !self.is_matrix()
    }

    pub fn is_scalar(&self) -> bool {
        self.primary == 1 && self.secondary == 1 && self.structure.is_none() && !self.is_array()
    }

    pub fn is_scalar_int(&self) -> bool {
        self.is_scalar() && matches!(self.basic, BasicType::Int | BasicType::UInt)
    }

    pub fn is_array(&self) -> bool {
        self.array.is_some()
    }

    pub fn is_unsized_array(&self) -> bool {
        self.array == Some(ArraySize::Unsized)
    }

    /// Static element count, or `None` for non-arrays and unsized arrays.
    pub fn array_size(&self) -> Option<u32> {
        match self.array {
            Some(ArraySize::Sized(n)) => Some(n),
            _ => None,
        }
    }

    pub fn set_array_size(&mut self, size: u32) {
        self.array = Some(ArraySize::Sized(size));
    }

    pub fn set_unsized_array(&mut self) {
        self.array = Some(ArraySize::Unsized);
    }

    pub fn clear_array_size(&mut self) {
        self.array = None;
    }

    pub fn struct_type(&self) -> Option<&Arc<StructType>> {
        self.structure.as_ref()
    }

    /// Type of one element of an array, a column of a matrix, or a component of a vector.
    pub fn indexed_type(&self) -> Type {
        let mut ty = self.clone();
        ty.qualifier = Qualifier::Temporary;
        if ty.is_array() {
            ty.array = None;
        } else if ty.is_matrix() {
            ty.primary = ty.secondary;
            ty.secondary = 1;
        } else {
            ty.primary = 1;
        }
        ty
    }

    /// Number of scalar components a constant of this type carries.
    pub fn object_size(&self) -> usize {
        let element = match &self.structure {
            Some(s) => s.fields.iter().map(|f| f.ty.object_size()).sum(),
            None => usize::from(self.primary) * usize::from(self.secondary),
        };
        element * self.array_size().unwrap_or(1) as usize
    }

    /// Whether this is a float-family value (scalar, vector or matrix).
    pub fn is_float(&self) -> bool {
        self.basic == BasicType::Float
    }

    pub fn mangled_name(&self) -> String {
        let mut out = String::new();
        if self.is_matrix() {
            out.push('m');
        } else if self.is_vector() {
            out.push('v');
        }
        match &self.structure {
            Some(s) => out.push_str(&s.mangled_name()),
            None => out.push_str(self.basic.mangled_code()),
        }
        if self.is_matrix() {
            out.push(char::from(b'0' + self.primary));
            if self.primary != self.secondary {
                out.push('x');
                out.push(char::from(b'0' + self.secondary));
            }
        } else if self.is_vector() {
            out.push(char::from(b'0' + self.primary));
        }
        if let Some(size) = self.array {
            match size {
                ArraySize::Sized(n) => out.push_str(&format!("[{n}]")),
                ArraySize::Unsized => out.push_str("[]"),
            }
        }
        out.push(';');
        out
    }

    /// GLSL spelling of the element type, ignoring qualifiers and precision.
    pub fn type_name(&self) -> String {
        if let Some(s) = &self.structure {
            return s.name.clone();
        }
        if self.is_matrix() {
            return if self.is_non_square_matrix() {
                format!("mat{}x{}", self.primary, self.secondary)
            } else {
                format!("mat{}", self.primary)
            };
        }
        if self.is_vector() {
            let prefix = match self.basic {
                BasicType::Int => "i",
                BasicType::UInt => "u",
                BasicType::Bool => "b",
                _ => "",
            };
            return format!("{prefix}vec{}", self.primary);
        }
        self.basic.as_str().to_owned()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.precision != Precision::Undefined {
            write!(f, "{} ", self.precision.as_str())?;
        }
        f.write_str(&self.type_name())?;
        if let Some(size) = self.array {
            match size {
                ArraySize::Sized(n) => write!(f, "[{n}]")?,
                ArraySize::Unsized => f.write_str("[]")?,
            }
        }
        Ok(())
    }
}
