//! Built-in function table
//!
//! Intrinsics are overloaded like user functions and resolved with the same
//! ranking. Most lower to `GLSL.std.450` extended instructions.

use crate::ir::Op;
use crate::types::TypeInfo;
use std::collections::HashMap;

/// How a resolved intrinsic call is lowered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrinsicOp {
    /// `ExtInst` of the `GLSL.std.450` set
    Glsl(u32),
    /// Core instruction taking the arguments as operands
    Core(Op),
    /// Clamp to [0, 1]
    Saturate,
    /// Implicit-LOD texture sample
    Sample,
    /// Explicit-LOD texture sample, LOD in the `w` coordinate
    SampleLod,
}

/// One overload of a built-in function
#[derive(Debug, Clone)]
pub struct Intrinsic {
    /// Function name
    pub name: &'static str,
    /// Lowering
    pub op: IntrinsicOp,
    /// Result type
    pub return_type: TypeInfo,
    /// Parameter types
    pub parameters: Vec<TypeInfo>,
}

pub(crate) mod glsl {
    pub const F_ABS: u32 = 4;
    pub const S_ABS: u32 = 5;
    pub const FLOOR: u32 = 8;
    pub const CEIL: u32 = 9;
    pub const FRACT: u32 = 10;
    pub const SIN: u32 = 13;
    pub const COS: u32 = 14;
    pub const TAN: u32 = 15;
    pub const POW: u32 = 26;
    pub const EXP: u32 = 27;
    pub const LOG: u32 = 28;
    pub const EXP2: u32 = 29;
    pub const LOG2: u32 = 30;
    pub const SQRT: u32 = 31;
    pub const INVERSE_SQRT: u32 = 32;
    pub const F_MIN: u32 = 37;
    pub const U_MIN: u32 = 38;
    pub const S_MIN: u32 = 39;
    pub const F_MAX: u32 = 40;
    pub const U_MAX: u32 = 41;
    pub const S_MAX: u32 = 42;
    pub const F_CLAMP: u32 = 43;
    pub const U_CLAMP: u32 = 44;
    pub const S_CLAMP: u32 = 45;
    pub const F_MIX: u32 = 46;
    pub const STEP: u32 = 48;
    pub const SMOOTH_STEP: u32 = 49;
    pub const LENGTH: u32 = 66;
    pub const DISTANCE: u32 = 67;
    pub const CROSS: u32 = 68;
    pub const NORMALIZE: u32 = 69;
}

lazy_static::lazy_static! {
    static ref INTRINSICS: HashMap<&'static str, Vec<Intrinsic>> = build_table();
}

/// Overloads of `name`, empty if it is not a built-in
pub fn overloads(name: &str) -> &'static [Intrinsic] {
    INTRINSICS.get(name).map(|v| v.as_slice()).unwrap_or(&[])
}

/// Whether `name` is a built-in function
pub fn is_intrinsic(name: &str) -> bool {
    INTRINSICS.contains_key(name)
}

fn build_table() -> HashMap<&'static str, Vec<Intrinsic>> {
    let mut table: HashMap<&'static str, Vec<Intrinsic>> = HashMap::new();
    let mut add = |name: &'static str, op: IntrinsicOp, return_type: TypeInfo, parameters: Vec<TypeInfo>| {
        table.entry(name).or_default().push(Intrinsic {
            name,
            op,
            return_type,
            parameters,
        });
    };

    let unary_float = [
        ("sqrt", glsl::SQRT),
        ("rsqrt", glsl::INVERSE_SQRT),
        ("sin", glsl::SIN),
        ("cos", glsl::COS),
        ("tan", glsl::TAN),
        ("exp", glsl::EXP),
        ("exp2", glsl::EXP2),
        ("log", glsl::LOG),
        ("log2", glsl::LOG2),
        ("floor", glsl::FLOOR),
        ("ceil", glsl::CEIL),
        ("frac", glsl::FRACT),
        ("abs", glsl::F_ABS),
        ("normalize", glsl::NORMALIZE),
    ];

    for n in 1..=4u8 {
        let f = TypeInfo::float(n, 1);
        let i = TypeInfo::int(n, 1);
        let u = TypeInfo::uint(n, 1);
        let scalar = TypeInfo::float(1, 1);

        for (name, code) in unary_float {
            add(name, IntrinsicOp::Glsl(code), f, vec![f]);
        }
        add("abs", IntrinsicOp::Glsl(glsl::S_ABS), i, vec![i]);
        add("saturate", IntrinsicOp::Saturate, f, vec![f]);

        add("min", IntrinsicOp::Glsl(glsl::F_MIN), f, vec![f, f]);
        add("min", IntrinsicOp::Glsl(glsl::S_MIN), i, vec![i, i]);
        add("min", IntrinsicOp::Glsl(glsl::U_MIN), u, vec![u, u]);
        add("max", IntrinsicOp::Glsl(glsl::F_MAX), f, vec![f, f]);
        add("max", IntrinsicOp::Glsl(glsl::S_MAX), i, vec![i, i]);
        add("max", IntrinsicOp::Glsl(glsl::U_MAX), u, vec![u, u]);
        add("clamp", IntrinsicOp::Glsl(glsl::F_CLAMP), f, vec![f, f, f]);
        add("clamp", IntrinsicOp::Glsl(glsl::S_CLAMP), i, vec![i, i, i]);
        add("clamp", IntrinsicOp::Glsl(glsl::U_CLAMP), u, vec![u, u, u]);

        add("pow", IntrinsicOp::Glsl(glsl::POW), f, vec![f, f]);
        add("step", IntrinsicOp::Glsl(glsl::STEP), f, vec![f, f]);
        add("lerp", IntrinsicOp::Glsl(glsl::F_MIX), f, vec![f, f, f]);
        add("smoothstep", IntrinsicOp::Glsl(glsl::SMOOTH_STEP), f, vec![f, f, f]);
        add("length", IntrinsicOp::Glsl(glsl::LENGTH), scalar, vec![f]);
        add("distance", IntrinsicOp::Glsl(glsl::DISTANCE), scalar, vec![f, f]);
        if n > 1 {
            add("dot", IntrinsicOp::Core(Op::Dot), scalar, vec![f, f]);
        }
    }

    let float3 = TypeInfo::float(3, 1);
    add("cross", IntrinsicOp::Glsl(glsl::CROSS), float3, vec![float3, float3]);

    let float4 = TypeInfo::float(4, 1);
    let sampler = TypeInfo::sampler();
    add("tex2D", IntrinsicOp::Sample, float4, vec![sampler, TypeInfo::float(2, 1)]);
    add("tex2Dlod", IntrinsicOp::SampleLod, float4, vec![sampler, float4]);

    table
}
