//! IR operation codes
//!
//! Discriminants follow the SPIR-V numbering so a downstream generator can
//! write them out unchanged.

use std::fmt;

macro_rules! ops {
    ($($name:ident = $value:expr,)*) => {
        /// IR operation code
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum Op {
            $(
                #[allow(missing_docs)]
                $name = $value,
            )*
        }

        impl Op {
            /// Mnemonic without the `Op` prefix
            pub fn name(self) -> &'static str {
                match self {
                    $(Op::$name => stringify!($name),)*
                }
            }
        }
    };
}

ops! {
    Nop = 0,
    Undef = 1,
    Name = 5,
    MemberName = 6,
    String = 7,
    ExtInstImport = 11,
    ExtInst = 12,
    EntryPoint = 15,
    TypeVoid = 19,
    TypeBool = 20,
    TypeInt = 21,
    TypeFloat = 22,
    TypeVector = 23,
    TypeMatrix = 24,
    TypeImage = 25,
    TypeSampledImage = 27,
    TypeArray = 28,
    TypeRuntimeArray = 29,
    TypeStruct = 30,
    TypePointer = 32,
    TypeFunction = 33,
    ConstantTrue = 41,
    ConstantFalse = 42,
    Constant = 43,
    ConstantComposite = 44,
    ConstantNull = 46,
    Function = 54,
    FunctionParameter = 55,
    FunctionEnd = 56,
    FunctionCall = 57,
    Variable = 59,
    Load = 61,
    Store = 62,
    AccessChain = 65,
    Decorate = 71,
    MemberDecorate = 72,
    VectorShuffle = 79,
    CompositeConstruct = 80,
    CompositeExtract = 81,
    CompositeInsert = 82,
    ImageSampleImplicitLod = 87,
    ImageSampleExplicitLod = 88,
    ConvertFToU = 109,
    ConvertFToS = 110,
    ConvertSToF = 111,
    ConvertUToF = 112,
    UConvert = 113,
    SConvert = 114,
    FConvert = 115,
    Bitcast = 124,
    SNegate = 126,
    FNegate = 127,
    IAdd = 128,
    FAdd = 129,
    ISub = 130,
    FSub = 131,
    IMul = 132,
    FMul = 133,
    UDiv = 134,
    SDiv = 135,
    FDiv = 136,
    UMod = 137,
    SRem = 138,
    FRem = 140,
    Dot = 148,
    LogicalEqual = 164,
    LogicalNotEqual = 165,
    LogicalOr = 166,
    LogicalAnd = 167,
    LogicalNot = 168,
    Select = 169,
    IEqual = 170,
    INotEqual = 171,
    UGreaterThan = 172,
    SGreaterThan = 173,
    UGreaterThanEqual = 174,
    SGreaterThanEqual = 175,
    ULessThan = 176,
    SLessThan = 177,
    ULessThanEqual = 178,
    SLessThanEqual = 179,
    FOrdEqual = 180,
    FOrdNotEqual = 182,
    FOrdLessThan = 184,
    FOrdGreaterThan = 186,
    FOrdLessThanEqual = 188,
    FOrdGreaterThanEqual = 190,
    ShiftRightLogical = 194,
    ShiftRightArithmetic = 195,
    ShiftLeftLogical = 196,
    BitwiseOr = 197,
    BitwiseXor = 198,
    BitwiseAnd = 199,
    Not = 200,
    LoopMerge = 246,
    SelectionMerge = 247,
    Label = 248,
    Branch = 249,
    BranchConditional = 250,
    Kill = 252,
    Return = 253,
    ReturnValue = 254,
    Unreachable = 255,
}

impl Op {
    /// Numeric opcode
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Whether the node declares a type
    pub fn is_type(self) -> bool {
        (Op::TypeVoid.code()..=Op::TypeFunction.code()).contains(&self.code())
    }

    /// Whether the node is a compile-time constant
    pub fn is_constant(self) -> bool {
        matches!(
            self,
            Op::ConstantTrue
                | Op::ConstantFalse
                | Op::Constant
                | Op::ConstantComposite
                | Op::ConstantNull
        )
    }

    /// Whether the node ends a basic block
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Op::Branch
                | Op::BranchConditional
                | Op::Kill
                | Op::Return
                | Op::ReturnValue
                | Op::Unreachable
        )
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Op{}", self.name())
    }
}

/// Storage class operand of `Variable` and `TypePointer`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum StorageClass {
    /// Textures and samplers
    UniformConstant = 0,
    /// Shader inputs
    Input = 1,
    /// Uniform globals
    Uniform = 2,
    /// Shader outputs
    Output = 3,
    /// Static globals
    Private = 6,
    /// Function locals and parameters
    Function = 7,
}

impl StorageClass {
    /// Decode the operand word of a `TypePointer` node
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => StorageClass::UniformConstant,
            1 => StorageClass::Input,
            2 => StorageClass::Uniform,
            3 => StorageClass::Output,
            6 => StorageClass::Private,
            7 => StorageClass::Function,
            _ => return None,
        })
    }
}

/// `Decorate` kinds emitted by the parser
pub mod decoration {
    /// Semantic string attached to a variable, parameter or function result
    pub const HLSL_SEMANTIC: u32 = 5635;
    /// Interpolation `noperspective`
    pub const NO_PERSPECTIVE: u32 = 13;
    /// Interpolation `nointerpolation`
    pub const FLAT: u32 = 14;
    /// Interpolation `centroid`
    pub const CENTROID: u32 = 16;
    /// `precise`
    pub const NO_CONTRACTION: u32 = 42;
    /// Unsigned integer annotation or state value
    pub const ANNOTATION: u32 = 5636;
}

/// `SelectionMerge` / `LoopMerge` control hints
pub mod control {
    /// No hint
    pub const NONE: u32 = 0;
    /// `[flatten]`
    pub const FLATTEN: u32 = 0x1;
    /// `[branch]`
    pub const DONT_FLATTEN: u32 = 0x2;
    /// `[unroll]`
    pub const UNROLL: u32 = 0x1;
    /// `[loop]`
    pub const DONT_UNROLL: u32 = 0x2;
}

/// Execution models of `EntryPoint`
pub mod execution_model {
    /// Vertex shader
    pub const VERTEX: u32 = 0;
    /// Pixel shader
    pub const FRAGMENT: u32 = 4;
}
