//! Reflection records produced by a compile
//!
//! These are what a host reads back after [`crate::Parser::run`] succeeds:
//! struct layouts, function signatures, uniforms, textures, samplers and the
//! technique/pass render state.

use crate::ir::Id;
use crate::lexer::Location;
use crate::types::TypeInfo;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Annotation and property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variant {
    /// `true` / `false`
    Bool(bool),
    /// Signed integer
    Int(i32),
    /// Unsigned integer
    Uint(u32),
    /// Floating point
    Float(f32),
    /// String literal
    String(String),
}

impl Variant {
    /// Value as a float, if numeric
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Variant::Bool(b) => Some(*b as u32 as f32),
            Variant::Int(i) => Some(*i as f32),
            Variant::Uint(u) => Some(*u as f32),
            Variant::Float(f) => Some(*f),
            Variant::String(_) => None,
        }
    }

    /// Value as a signed integer, if numeric
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Variant::Bool(b) => Some(*b as i32),
            Variant::Int(i) => Some(*i),
            Variant::Uint(u) => Some(*u as i32),
            Variant::Float(f) => Some(*f as i32),
            Variant::String(_) => None,
        }
    }

    /// Value as a string, if it is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Bool(b) => write!(f, "{}", b),
            Variant::Int(i) => write!(f, "{}", i),
            Variant::Uint(u) => write!(f, "{}u", u),
            Variant::Float(x) => write!(f, "{:?}", x),
            Variant::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// Named annotation values in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotations(Vec<(String, Variant)>);

impl Annotations {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, overwriting an earlier value in place
    pub fn insert(&mut self, name: impl Into<String>, value: Variant) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    /// Look up a value by name
    pub fn get(&self, name: &str) -> Option<&Variant> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variant)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One member of a struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructField {
    /// Member name
    pub name: String,
    /// Member type
    pub ty: TypeInfo,
    /// Optional semantic (`: TEXCOORD0`)
    pub semantic: Option<String>,
}

/// A declared struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructInfo {
    /// Declared name
    pub name: String,
    /// Namespace-qualified name
    pub unique_name: String,
    /// `TypeStruct` node
    pub definition: Id,
    /// Members in declaration order
    pub fields: Vec<StructField>,
}

impl StructInfo {
    /// Member index and record by name
    pub fn field(&self, name: &str) -> Option<(usize, &StructField)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }
}

/// A declared function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInfo {
    /// Return type
    pub return_type: TypeInfo,
    /// Declared name
    pub name: String,
    /// Mangled name, distinct for every overload
    pub unique_name: String,
    /// Parameter types with their qualifiers
    pub parameter_list: Vec<TypeInfo>,
    /// Parameter names
    pub parameter_names: Vec<String>,
    /// Parameter semantics
    pub parameter_semantics: Vec<Option<String>>,
    /// Semantic of the return value
    pub return_semantic: Option<String>,
    /// `Function` node
    pub definition: Id,
    /// Whether a body was parsed
    pub defined: bool,
    /// Location of the declaration
    pub location: Location,
}

/// Texture storage format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum TextureFormat {
    R8,
    R16F,
    R32F,
    RG8,
    RG16,
    RG16F,
    RG32F,
    #[default]
    RGBA8,
    RGBA16,
    RGBA16F,
    RGBA32F,
    RGB10A2,
}

impl TextureFormat {
    /// Parse a `Format = ...` value
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "R8" => Self::R8,
            "R16F" => Self::R16F,
            "R32F" => Self::R32F,
            "RG8" => Self::RG8,
            "RG16" => Self::RG16,
            "RG16F" => Self::RG16F,
            "RG32F" => Self::RG32F,
            "RGBA8" => Self::RGBA8,
            "RGBA16" => Self::RGBA16,
            "RGBA16F" => Self::RGBA16F,
            "RGBA32F" => Self::RGBA32F,
            "RGB10A2" => Self::RGB10A2,
            _ => return None,
        })
    }
}

/// Texture filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterMode {
    /// Nearest texel
    Point,
    /// Linear interpolation
    #[default]
    Linear,
    /// Anisotropic
    Anisotropic,
}

impl FilterMode {
    /// Parse a filter value
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "POINT" => Some(Self::Point),
            "LINEAR" => Some(Self::Linear),
            "ANISOTROPIC" => Some(Self::Anisotropic),
            _ => None,
        }
    }
}

/// Texture addressing outside [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AddressMode {
    /// Repeat the texture
    Wrap,
    /// Mirror at every boundary
    Mirror,
    /// Clamp to the edge texel
    #[default]
    Clamp,
    /// Border color
    Border,
}

impl AddressMode {
    /// Parse an address value
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "WRAP" | "REPEAT" => Some(Self::Wrap),
            "MIRROR" => Some(Self::Mirror),
            "CLAMP" => Some(Self::Clamp),
            "BORDER" => Some(Self::Border),
            _ => None,
        }
    }
}

/// A global variable, uniform, texture or sampler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableInfo {
    /// Declared name
    pub name: String,
    /// Namespace-qualified name
    pub unique_name: String,
    /// `Variable` node
    pub definition: Id,
    /// Declared type
    pub ty: TypeInfo,
    /// `< ... >` annotations
    pub annotations: Annotations,
    /// Texture bound to a sampler
    pub texture: Id,
    /// Texture width
    pub width: u32,
    /// Texture height
    pub height: u32,
    /// Texture depth
    pub depth: u32,
    /// Mip level count
    pub levels: u32,
    /// Storage format
    pub format: TextureFormat,
    /// sRGB read conversion
    pub srgb_texture: bool,
    /// Minification filter
    pub min_filter: FilterMode,
    /// Magnification filter
    pub mag_filter: FilterMode,
    /// Mip filter
    pub mip_filter: FilterMode,
    /// U addressing
    pub address_u: AddressMode,
    /// V addressing
    pub address_v: AddressMode,
    /// W addressing
    pub address_w: AddressMode,
    /// Lowest mip level sampled
    pub min_lod: f32,
    /// Highest mip level sampled
    pub max_lod: f32,
    /// Mip level bias
    pub lod_bias: f32,
    /// Location of the declaration
    pub location: Location,
}

impl VariableInfo {
    /// Record with default texture and sampler state
    pub fn new(name: String, unique_name: String, ty: TypeInfo, location: Location) -> Self {
        Self {
            name,
            unique_name,
            definition: Id::NONE,
            ty,
            annotations: Annotations::new(),
            texture: Id::NONE,
            width: 1,
            height: 1,
            depth: 1,
            levels: 1,
            format: TextureFormat::default(),
            srgb_texture: false,
            min_filter: FilterMode::default(),
            mag_filter: FilterMode::default(),
            mip_filter: FilterMode::default(),
            address_u: AddressMode::default(),
            address_v: AddressMode::default(),
            address_w: AddressMode::default(),
            min_lod: 0.0,
            max_lod: f32::MAX,
            lod_bias: 0.0,
            location,
        }
    }
}

macro_rules! state_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:expr => $text:literal,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[repr(u32)]
        pub enum $name {
            $(
                #[allow(missing_docs)]
                $variant = $value,
            )*
        }

        impl $name {
            /// Parse the symbolic constant used in pass blocks
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($text => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Inverse of [`Self::value`]
            pub fn from_value(value: u32) -> Option<Self> {
                match value {
                    $(v if v == $value => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Numeric value
            pub fn value(self) -> u32 {
                self as u32
            }
        }
    };
}

state_enum! {
    /// Blend operand
    BlendFactor {
        Zero = 0 => "ZERO",
        One = 1 => "ONE",
        SrcColor = 2 => "SRCCOLOR",
        InvSrcColor = 3 => "INVSRCCOLOR",
        SrcAlpha = 4 => "SRCALPHA",
        InvSrcAlpha = 5 => "INVSRCALPHA",
        DestAlpha = 6 => "DESTALPHA",
        InvDestAlpha = 7 => "INVDESTALPHA",
        DestColor = 8 => "DESTCOLOR",
        InvDestColor = 9 => "INVDESTCOLOR",
    }
}

state_enum! {
    /// Blend operation
    BlendOp {
        Add = 1 => "ADD",
        Subtract = 2 => "SUBTRACT",
        RevSubtract = 3 => "REVSUBTRACT",
        Min = 4 => "MIN",
        Max = 5 => "MAX",
    }
}

state_enum! {
    /// Stencil operation
    StencilOp {
        Zero = 0 => "ZERO",
        Keep = 1 => "KEEP",
        Replace = 3 => "REPLACE",
        IncrSat = 4 => "INCRSAT",
        DecrSat = 5 => "DECRSAT",
        Invert = 6 => "INVERT",
        Incr = 7 => "INCR",
        Decr = 8 => "DECR",
    }
}

state_enum! {
    /// Stencil comparison function
    ComparisonFunc {
        Never = 1 => "NEVER",
        Less = 2 => "LESS",
        Equal = 3 => "EQUAL",
        LessEqual = 4 => "LESSEQUAL",
        Greater = 5 => "GREATER",
        NotEqual = 6 => "NOTEQUAL",
        GreaterEqual = 7 => "GREATEREQUAL",
        Always = 8 => "ALWAYS",
    }
}

/// Render state of one pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassProperties {
    /// Location of the `pass` keyword
    pub location: Location,
    /// Optional pass name
    pub name: Option<String>,
    /// Pass annotations
    pub annotations: Annotations,
    /// Texture variables bound as render targets
    pub render_targets: [Id; 8],
    /// Vertex shader function
    pub vertex_shader: Id,
    /// Pixel shader function
    pub pixel_shader: Id,
    /// Clear render targets before drawing
    pub clear_render_targets: bool,
    /// sRGB conversion on write
    pub srgb_write_enable: bool,
    /// Blending
    pub blend_enable: bool,
    /// Stencil test
    pub stencil_enable: bool,
    /// RGBA write mask
    pub color_write_mask: u8,
    /// Stencil read mask
    pub stencil_read_mask: u8,
    /// Stencil write mask
    pub stencil_write_mask: u8,
    /// Color blend operation
    pub blend_op: BlendOp,
    /// Alpha blend operation
    pub blend_op_alpha: BlendOp,
    /// Color source factor
    pub src_blend: BlendFactor,
    /// Color destination factor
    pub dest_blend: BlendFactor,
    /// Alpha source factor
    pub src_blend_alpha: BlendFactor,
    /// Alpha destination factor
    pub dest_blend_alpha: BlendFactor,
    /// Stencil comparison
    pub stencil_func: ComparisonFunc,
    /// Stencil reference value
    pub stencil_ref: u32,
    /// Operation when the stencil and depth tests pass
    pub stencil_pass: StencilOp,
    /// Operation when the stencil test fails
    pub stencil_fail: StencilOp,
    /// Operation when the depth test fails
    pub stencil_depth_fail: StencilOp,
}

impl PassProperties {
    /// Pass with default render state
    pub fn new(location: Location) -> Self {
        Self {
            location,
            name: None,
            annotations: Annotations::new(),
            render_targets: [Id::NONE; 8],
            vertex_shader: Id::NONE,
            pixel_shader: Id::NONE,
            clear_render_targets: true,
            srgb_write_enable: false,
            blend_enable: false,
            stencil_enable: false,
            color_write_mask: 0xF,
            stencil_read_mask: 0xFF,
            stencil_write_mask: 0xFF,
            blend_op: BlendOp::Add,
            blend_op_alpha: BlendOp::Add,
            src_blend: BlendFactor::One,
            dest_blend: BlendFactor::Zero,
            src_blend_alpha: BlendFactor::One,
            dest_blend_alpha: BlendFactor::Zero,
            stencil_func: ComparisonFunc::Always,
            stencil_ref: 0,
            stencil_pass: StencilOp::Keep,
            stencil_fail: StencilOp::Keep,
            stencil_depth_fail: StencilOp::Keep,
        }
    }
}

/// A technique and its passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechniqueProperties {
    /// Location of the `technique` keyword
    pub location: Location,
    /// Declared name
    pub name: String,
    /// Namespace-qualified name
    pub unique_name: String,
    /// Technique annotations
    pub annotations: Annotations,
    /// Passes in declaration order
    pub passes: Vec<PassProperties>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotations_keep_order_and_overwrite() {
        let mut a = Annotations::new();
        a.insert("ui_min", Variant::Float(0.0));
        a.insert("ui_max", Variant::Float(1.0));
        a.insert("ui_min", Variant::Int(-1));
        let names: Vec<&str> = a.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["ui_min", "ui_max"]);
        assert_eq!(a.get("ui_min"), Some(&Variant::Int(-1)));
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_state_values() {
        assert_eq!(BlendFactor::from_name("INVDESTCOLOR").map(|b| b.value()), Some(9));
        assert_eq!(BlendOp::from_name("MAX").map(|b| b.value()), Some(5));
        assert_eq!(StencilOp::from_name("REPLACE").map(|s| s.value()), Some(3));
        assert_eq!(ComparisonFunc::from_name("ALWAYS").map(|c| c.value()), Some(8));
        assert_eq!(BlendFactor::from_name("ADD"), None);
        assert_eq!(StencilOp::from_value(7), Some(StencilOp::Incr));
        assert_eq!(StencilOp::from_value(2), None);
    }

    #[test]
    fn test_pass_defaults() {
        let pass = PassProperties::new(Location::default());
        assert!(pass.clear_render_targets);
        assert_eq!(pass.color_write_mask, 0xF);
        assert_eq!(pass.src_blend, BlendFactor::One);
        assert_eq!(pass.dest_blend, BlendFactor::Zero);
        assert_eq!(pass.stencil_func, ComparisonFunc::Always);
    }

    #[test]
    fn test_resource_names() {
        assert_eq!(TextureFormat::from_name("RGBA16F"), Some(TextureFormat::RGBA16F));
        assert_eq!(AddressMode::from_name("REPEAT"), Some(AddressMode::Wrap));
        assert_eq!(FilterMode::from_name("POINT"), Some(FilterMode::Point));
    }
}
