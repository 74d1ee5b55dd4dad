//! # Effect Type System
//!
//! [`TypeInfo`] describes the shape of every value the parser handles: scalars,
//! vectors (`float3`), matrices (`float4x4`), arrays, structs, textures,
//! samplers, plus a pointer flag for l-values.
//!
//! Equality and hashing deliberately ignore [`Qualifiers`]: `const float` and
//! `float` are the same type used in different ways. The IR builder relies on
//! this when it interns type nodes.
//!
//! Implicit conversions are scored by [`rank`]; lower is better, `None` means
//! no conversion exists.

mod rank;

pub use rank::{common_type, rank, SPLAT_COST};

use crate::ir::Id;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

bitflags::bitflags! {
    /// Storage, direction, modifier and interpolation qualifiers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Qualifiers: u32 {
        /// `extern`
        const EXTERN = 1 << 0;
        /// `static`
        const STATIC = 1 << 1;
        /// `uniform`
        const UNIFORM = 1 << 2;
        /// `volatile`
        const VOLATILE = 1 << 3;
        /// `precise`
        const PRECISE = 1 << 4;
        /// `in`
        const IN = 1 << 5;
        /// `out`
        const OUT = 1 << 6;
        /// `inout`
        const INOUT = Self::IN.bits() | Self::OUT.bits();
        /// `const`
        const CONST = 1 << 8;
        /// `linear`
        const LINEAR = 1 << 10;
        /// `noperspective`
        const NOPERSPECTIVE = 1 << 11;
        /// `centroid`
        const CENTROID = 1 << 12;
        /// `nointerpolation`
        const NOINTERPOLATION = 1 << 13;
    }
}

/// Base kind of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseType {
    /// No value
    Void,
    /// Boolean
    Bool,
    /// Signed or unsigned integer
    Int,
    /// Floating point
    Float,
    /// String (annotation values only)
    String,
    /// User-defined struct
    Struct,
    /// Texture
    Image,
    /// Sampler bound to a texture
    SampledImage,
}

/// Numeric element kind, ordered by promotion priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum NumericKind {
    Bool,
    Int,
    Uint,
    Float,
}

/// Static type of a value or declaration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Base kind
    pub base: BaseType,
    /// Element width in bits
    pub size: u8,
    /// Rows (vector components for vectors)
    pub rows: u8,
    /// Columns
    pub cols: u8,
    /// Signedness of integers
    pub is_signed: bool,
    /// Whether this is an l-value reference to storage
    pub is_pointer: bool,
    /// Qualifier bit set (ignored by equality)
    pub qualifiers: Qualifiers,
    /// 0 = not an array, > 0 = sized, < 0 = runtime sized
    pub array_length: i32,
    /// IR type node of the struct definition
    pub definition: Id,
}

impl TypeInfo {
    const fn new(base: BaseType, size: u8, rows: u8, cols: u8, is_signed: bool) -> Self {
        TypeInfo {
            base,
            size,
            rows,
            cols,
            is_signed,
            is_pointer: false,
            qualifiers: Qualifiers::empty(),
            array_length: 0,
            definition: Id::NONE,
        }
    }

    /// `void`
    pub const fn void() -> Self {
        Self::new(BaseType::Void, 0, 0, 0, false)
    }

    /// `bool`, `boolN` or `boolNxM`
    pub const fn boolean(rows: u8, cols: u8) -> Self {
        Self::new(BaseType::Bool, 32, rows, cols, false)
    }

    /// `int`, `intN` or `intNxM`
    pub const fn int(rows: u8, cols: u8) -> Self {
        Self::new(BaseType::Int, 32, rows, cols, true)
    }

    /// `uint`, `uintN` or `uintNxM`
    pub const fn uint(rows: u8, cols: u8) -> Self {
        Self::new(BaseType::Int, 32, rows, cols, false)
    }

    /// `float`, `floatN` or `floatNxM`
    pub const fn float(rows: u8, cols: u8) -> Self {
        Self::new(BaseType::Float, 32, rows, cols, true)
    }

    /// `half`, `halfN` or `halfNxM`
    pub const fn half(rows: u8, cols: u8) -> Self {
        Self::new(BaseType::Float, 16, rows, cols, true)
    }

    /// `string`
    pub const fn string() -> Self {
        Self::new(BaseType::String, 0, 0, 0, false)
    }

    /// `texture`
    pub const fn texture() -> Self {
        Self::new(BaseType::Image, 0, 0, 0, false)
    }

    /// `sampler`
    pub const fn sampler() -> Self {
        Self::new(BaseType::SampledImage, 0, 0, 0, false)
    }

    /// Struct type referring to its IR definition
    pub const fn structure(definition: Id) -> Self {
        let mut ty = Self::new(BaseType::Struct, 0, 0, 0, false);
        ty.definition = definition;
        ty
    }

    /// Parse a built-in type name such as `float3`, `int2x2` or `sampler2D`
    pub fn from_name(name: &str) -> Option<TypeInfo> {
        match name {
            "void" => return Some(Self::void()),
            "string" => return Some(Self::string()),
            "texture" | "texture2D" => return Some(Self::texture()),
            "sampler" | "sampler2D" => return Some(Self::sampler()),
            _ => {}
        }

        let (scalar, dims) = ["bool", "int", "uint", "dword", "float", "half"]
            .iter()
            .find_map(|prefix| name.strip_prefix(prefix).map(|rest| (*prefix, rest)))?;

        let (rows, cols) = match dims.as_bytes() {
            [] => (1, 1),
            [r] => (dimension(*r)?, 1),
            [r, b'x', c] => (dimension(*r)?, dimension(*c)?),
            _ => return None,
        };

        Some(match scalar {
            "bool" => Self::boolean(rows, cols),
            "int" => Self::int(rows, cols),
            "uint" | "dword" => Self::uint(rows, cols),
            "half" => Self::half(rows, cols),
            _ => Self::float(rows, cols),
        })
    }

    /// Whether all bits of `qualifier` are set
    pub fn has(&self, qualifier: Qualifiers) -> bool {
        self.qualifiers.contains(qualifier)
    }

    /// Array of any length
    pub fn is_array(&self) -> bool {
        self.array_length != 0
    }

    /// Single numeric value
    pub fn is_scalar(&self) -> bool {
        !self.is_array() && !self.is_matrix() && !self.is_vector() && self.is_numeric()
    }

    /// `rows > 1 && cols == 1`
    pub fn is_vector(&self) -> bool {
        self.rows > 1 && self.cols == 1
    }

    /// `rows >= 1 && cols > 1`
    pub fn is_matrix(&self) -> bool {
        self.rows >= 1 && self.cols > 1
    }

    /// Bool, integer or floating point
    pub fn is_numeric(&self) -> bool {
        self.is_boolean() || self.is_integral() || self.is_floating_point()
    }

    /// `void`
    pub fn is_void(&self) -> bool {
        self.base == BaseType::Void
    }

    /// Boolean element kind
    pub fn is_boolean(&self) -> bool {
        self.base == BaseType::Bool
    }

    /// Integer element kind
    pub fn is_integral(&self) -> bool {
        self.base == BaseType::Int
    }

    /// Floating-point element kind
    pub fn is_floating_point(&self) -> bool {
        self.base == BaseType::Float
    }

    /// User struct
    pub fn is_struct(&self) -> bool {
        self.base == BaseType::Struct
    }

    /// Texture
    pub fn is_image(&self) -> bool {
        self.base == BaseType::Image
    }

    /// Sampler
    pub fn is_sampled_image(&self) -> bool {
        self.base == BaseType::SampledImage
    }

    /// String
    pub fn is_string(&self) -> bool {
        self.base == BaseType::String
    }

    /// Number of scalar components of one element
    pub fn components(&self) -> u32 {
        self.rows as u32 * self.cols as u32
    }

    /// Same type without array dimension
    pub fn element(&self) -> TypeInfo {
        TypeInfo {
            array_length: 0,
            ..*self
        }
    }

    /// Same type as an r-value
    pub fn value(&self) -> TypeInfo {
        TypeInfo {
            is_pointer: false,
            ..*self
        }
    }

    /// Same type as an l-value reference
    pub fn pointer(&self) -> TypeInfo {
        TypeInfo {
            is_pointer: true,
            ..*self
        }
    }

    /// Same type without qualifiers
    pub fn unqualified(&self) -> TypeInfo {
        TypeInfo {
            qualifiers: Qualifiers::empty(),
            ..*self
        }
    }

    /// Same element kind with a different shape
    pub fn with_shape(&self, rows: u8, cols: u8) -> TypeInfo {
        TypeInfo {
            rows,
            cols,
            ..self.value().element().unqualified()
        }
    }

    /// Scalar of the same element kind
    pub fn scalar(&self) -> TypeInfo {
        self.with_shape(1, 1)
    }

    pub(crate) fn numeric_kind(&self) -> Option<NumericKind> {
        match self.base {
            BaseType::Bool => Some(NumericKind::Bool),
            BaseType::Int if self.is_signed => Some(NumericKind::Int),
            BaseType::Int => Some(NumericKind::Uint),
            BaseType::Float => Some(NumericKind::Float),
            _ => None,
        }
    }

    pub(crate) fn from_kind(kind: NumericKind, size: u8, rows: u8, cols: u8) -> TypeInfo {
        let mut ty = match kind {
            NumericKind::Bool => Self::boolean(rows, cols),
            NumericKind::Int => Self::int(rows, cols),
            NumericKind::Uint => Self::uint(rows, cols),
            NumericKind::Float => Self::float(rows, cols),
        };
        if kind != NumericKind::Bool {
            ty.size = size;
        }
        ty
    }

    /// Short name used in mangled function names
    pub fn mangle(&self) -> String {
        let mut out = match self.numeric_kind() {
            Some(NumericKind::Bool) => "b".to_string(),
            Some(NumericKind::Int) => "i".to_string(),
            Some(NumericKind::Uint) => "u".to_string(),
            Some(NumericKind::Float) if self.size == 16 => "h".to_string(),
            Some(NumericKind::Float) => "f".to_string(),
            None => match self.base {
                BaseType::Struct => format!("S{}", self.definition.0),
                BaseType::Image => "T".to_string(),
                BaseType::SampledImage => "s".to_string(),
                BaseType::String => "str".to_string(),
                _ => "v".to_string(),
            },
        };
        if self.is_numeric() {
            if self.is_matrix() {
                out.push_str(&format!("{}x{}", self.rows, self.cols));
            } else if self.is_vector() {
                out.push_str(&self.rows.to_string());
            }
        }
        if self.is_array() {
            out.push_str(&format!("a{}", self.array_length.max(0)));
        }
        out
    }
}

fn dimension(c: u8) -> Option<u8> {
    match c {
        b'1'..=b'4' => Some(c - b'0'),
        _ => None,
    }
}

impl Default for TypeInfo {
    fn default() -> Self {
        Self::void()
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
            && self.size == other.size
            && self.rows == other.rows
            && self.cols == other.cols
            && self.is_signed == other.is_signed
            && self.array_length == other.array_length
            && self.definition == other.definition
            && self.is_pointer == other.is_pointer
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base.hash(state);
        self.size.hash(state);
        self.rows.hash(state);
        self.cols.hash(state);
        self.is_signed.hash(state);
        self.array_length.hash(state);
        self.definition.hash(state);
        self.is_pointer.hash(state);
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scalar = match self.base {
            BaseType::Void => "void",
            BaseType::Bool => "bool",
            BaseType::Int if self.is_signed => "int",
            BaseType::Int => "uint",
            BaseType::Float if self.size == 16 => "half",
            BaseType::Float => "float",
            BaseType::String => "string",
            BaseType::Struct => "struct",
            BaseType::Image => "texture",
            BaseType::SampledImage => "sampler",
        };
        write!(f, "{}", scalar)?;
        if self.is_numeric() {
            if self.is_matrix() {
                write!(f, "{}x{}", self.rows, self.cols)?;
            } else if self.is_vector() {
                write!(f, "{}", self.rows)?;
            }
        }
        if self.array_length > 0 {
            write!(f, "[{}]", self.array_length)?;
        } else if self.array_length < 0 {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_from_name() {
        assert_eq!(TypeInfo::from_name("float3"), Some(TypeInfo::float(3, 1)));
        assert_eq!(TypeInfo::from_name("int2x4"), Some(TypeInfo::int(2, 4)));
        assert_eq!(TypeInfo::from_name("dword"), Some(TypeInfo::uint(1, 1)));
        assert_eq!(TypeInfo::from_name("half"), Some(TypeInfo::half(1, 1)));
        assert_eq!(TypeInfo::from_name("sampler2D"), Some(TypeInfo::sampler()));
        assert_eq!(TypeInfo::from_name("float5"), None);
        assert_eq!(TypeInfo::from_name("floaty"), None);
        assert_eq!(TypeInfo::from_name("integer"), None);
    }

    #[test]
    fn test_shape_predicates() {
        let scalar = TypeInfo::float(1, 1);
        let vector = TypeInfo::float(3, 1);
        let matrix = TypeInfo::float(4, 4);
        let row = TypeInfo::float(1, 3);
        assert!(scalar.is_scalar() && !scalar.is_vector() && !scalar.is_matrix());
        assert!(vector.is_vector() && !vector.is_scalar());
        assert!(matrix.is_matrix() && !matrix.is_vector());
        assert!(row.is_matrix());

        let mut array = scalar;
        array.array_length = 4;
        assert!(array.is_array() && !array.is_scalar());
    }

    #[test]
    fn test_equality_ignores_qualifiers() {
        let mut a = TypeInfo::float(3, 1);
        let b = TypeInfo::float(3, 1);
        a.qualifiers = Qualifiers::CONST | Qualifiers::UNIFORM;
        assert_eq!(a, b);
        assert!(a.has(Qualifiers::CONST));

        let mut c = b;
        c.array_length = 2;
        assert_ne!(b, c);
        assert_ne!(b, b.pointer());
    }

    #[test]
    fn test_inout_is_in_and_out() {
        let mut ty = TypeInfo::float(1, 1);
        ty.qualifiers = Qualifiers::INOUT;
        assert!(ty.has(Qualifiers::IN));
        assert!(ty.has(Qualifiers::OUT));
    }

    #[test]
    fn test_display_and_mangle() {
        assert_eq!(TypeInfo::float(4, 4).to_string(), "float4x4");
        assert_eq!(TypeInfo::uint(2, 1).to_string(), "uint2");
        let mut array = TypeInfo::int(1, 1);
        array.array_length = 8;
        assert_eq!(array.to_string(), "int[8]");
        assert_eq!(array.mangle(), "ia8");
        assert_eq!(TypeInfo::float(3, 1).mangle(), "f3");
    }
}
