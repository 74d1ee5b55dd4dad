//! Implicit conversion ranking

use super::{NumericKind, TypeInfo};

/// Extra cost of broadcasting a scalar to a vector or matrix
pub const SPLAT_COST: u32 = 2;

/// Weight of the element kind cost relative to the shape cost
const KIND_WEIGHT: u32 = 4;

/// Scores the implicit conversion from `src` to `dst`
///
/// `Some(0)` is an exact match, higher values are worse conversions and
/// `None` means no implicit conversion exists.
pub fn rank(src: &TypeInfo, dst: &TypeInfo) -> Option<u32> {
    if src == dst {
        return Some(0);
    }
    if src.is_pointer != dst.is_pointer || src.is_array() || dst.is_array() {
        return None;
    }

    let (from, to) = (src.numeric_kind()?, dst.numeric_kind()?);

    let shape = if src.rows == dst.rows && src.cols == dst.cols {
        0
    } else if src.rows == 1 && src.cols == 1 {
        SPLAT_COST
    } else {
        return None;
    };

    Some(kind_cost(from, src.size, to, dst.size) * KIND_WEIGHT + shape)
}

fn kind_cost(from: NumericKind, from_size: u8, to: NumericKind, to_size: u8) -> u32 {
    use NumericKind::*;

    if from == to {
        return match from_size.cmp(&to_size) {
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Less => 1,
            std::cmp::Ordering::Greater => 2,
        };
    }

    match (from, to) {
        (Int, Uint) | (Uint, Int) => 2,
        (Bool, _) => 3,
        (Int | Uint, Float) => 3,
        _ => 4,
    }
}

/// Result type of a binary arithmetic operator applied to `a` and `b`
///
/// The element kind is the higher of the two in the order
/// bool < int < uint < float, a scalar operand is promoted to the shape of the
/// other one. Returns `None` when no common type exists.
pub fn common_type(a: &TypeInfo, b: &TypeInfo) -> Option<TypeInfo> {
    let (a, b) = (a.value().unqualified(), b.value().unqualified());
    if a == b {
        return Some(a);
    }
    if a.is_array() || b.is_array() {
        return None;
    }

    let (ka, kb) = (a.numeric_kind()?, b.numeric_kind()?);
    let kind = ka.max(kb);
    let size = match (ka == kind, kb == kind) {
        (true, true) => a.size.max(b.size),
        (true, false) => a.size,
        _ => b.size,
    };

    let (rows, cols) = if a.rows == b.rows && a.cols == b.cols {
        (a.rows, a.cols)
    } else if a.rows == 1 && a.cols == 1 {
        (b.rows, b.cols)
    } else if b.rows == 1 && b.cols == 1 {
        (a.rows, a.cols)
    } else {
        return None;
    };

    Some(TypeInfo::from_kind(kind, size, rows, cols))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Id;

    #[test]
    fn test_exact_match_is_zero() {
        let ty = TypeInfo::float(3, 1);
        assert_eq!(rank(&ty, &ty), Some(0));
    }

    #[test]
    fn test_kind_costs() {
        let float = TypeInfo::float(1, 1);
        let int = TypeInfo::int(1, 1);
        let uint = TypeInfo::uint(1, 1);
        let boolean = TypeInfo::boolean(1, 1);

        assert_eq!(rank(&int, &uint), Some(8));
        assert_eq!(rank(&int, &float), Some(12));
        assert_eq!(rank(&boolean, &int), Some(12));
        assert_eq!(rank(&float, &int), Some(16));
        assert_eq!(rank(&float, &boolean), Some(16));
        assert_eq!(rank(&TypeInfo::half(1, 1), &float), Some(4));
        assert_eq!(rank(&float, &TypeInfo::half(1, 1)), Some(8));
    }

    #[test]
    fn test_splat_and_shape() {
        let scalar = TypeInfo::float(1, 1);
        let vector = TypeInfo::float(3, 1);
        assert_eq!(rank(&scalar, &vector), Some(SPLAT_COST));
        assert_eq!(rank(&vector, &scalar), None);
        assert_eq!(rank(&TypeInfo::float(4, 1), &vector), None);
        assert_eq!(rank(&TypeInfo::int(1, 1), &TypeInfo::float(4, 4)), Some(14));
    }

    #[test]
    fn test_no_conversion_for_distinct_entities() {
        let a = TypeInfo::structure(Id(120));
        let b = TypeInfo::structure(Id(121));
        assert_eq!(rank(&a, &b), None);

        let mut array = TypeInfo::float(1, 1);
        array.array_length = 3;
        assert_eq!(rank(&array, &TypeInfo::float(1, 1)), None);
        assert_eq!(rank(&TypeInfo::texture(), &TypeInfo::sampler()), None);
        assert_eq!(rank(&TypeInfo::float(1, 1).pointer(), &TypeInfo::float(1, 1)), None);
    }

    #[test]
    fn test_common_type() {
        let int = TypeInfo::int(1, 1);
        let float3 = TypeInfo::float(3, 1);
        assert_eq!(common_type(&int, &float3), Some(float3));
        assert_eq!(
            common_type(&TypeInfo::int(2, 1), &TypeInfo::uint(2, 1)),
            Some(TypeInfo::uint(2, 1))
        );
        assert_eq!(common_type(&TypeInfo::float(2, 1), &float3), None);
        assert_eq!(common_type(&TypeInfo::texture(), &int), None);
    }
}
