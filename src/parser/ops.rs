//! Operator dispatch tables
//!
//! One table per operator position, keyed by the punctuation token, built
//! once and shared by every parser.

use crate::ir::Op;
use crate::lexer::Punct;
use std::collections::HashMap;

/// Semantic class of a binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryClass {
    /// `+ - * / %`
    Arithmetic,
    /// `& | ^`
    Bitwise,
    /// `<< >>`
    Shift,
    /// `< > <= >=`
    Relational,
    /// `== !=`
    Equality,
    /// `&& ||`
    Logical,
    /// `?:`
    Conditional,
}

/// Opcodes of one operator per element kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OpSet {
    pub boolean: Op,
    pub signed: Op,
    pub unsigned: Op,
    pub float: Op,
}

impl OpSet {
    const fn new(boolean: Op, signed: Op, unsigned: Op, float: Op) -> Self {
        Self {
            boolean,
            signed,
            unsigned,
            float,
        }
    }

    const fn integral(op: Op) -> Self {
        Self::new(Op::Nop, op, op, Op::Nop)
    }
}

/// Binary operator entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BinaryOperator {
    pub precedence: u32,
    pub right_assoc: bool,
    pub class: BinaryClass,
    pub ops: OpSet,
}

/// Prefix operator entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOperator {
    Negate,
    Plus,
    LogicalNot,
    BitwiseNot,
    Increment,
    Decrement,
}

lazy_static::lazy_static! {
    static ref BINARY: HashMap<Punct, BinaryOperator> = {
        use BinaryClass::*;
        let mut m = HashMap::new();
        let mut add = |punct: Punct, precedence: u32, class: BinaryClass, ops: OpSet| {
            m.insert(punct, BinaryOperator { precedence, right_assoc: class == Conditional, class, ops });
        };

        add(Punct::Question, 1, Conditional, OpSet::new(Op::Select, Op::Select, Op::Select, Op::Select));
        add(Punct::PipePipe, 2, Logical, OpSet::new(Op::LogicalOr, Op::Nop, Op::Nop, Op::Nop));
        add(Punct::AmpAmp, 3, Logical, OpSet::new(Op::LogicalAnd, Op::Nop, Op::Nop, Op::Nop));
        add(Punct::Pipe, 4, Bitwise, OpSet::integral(Op::BitwiseOr));
        add(Punct::Caret, 5, Bitwise, OpSet::integral(Op::BitwiseXor));
        add(Punct::Ampersand, 6, Bitwise, OpSet::integral(Op::BitwiseAnd));
        add(Punct::EqualEqual, 7, Equality, OpSet::new(Op::LogicalEqual, Op::IEqual, Op::IEqual, Op::FOrdEqual));
        add(Punct::ExclaimEqual, 7, Equality, OpSet::new(Op::LogicalNotEqual, Op::INotEqual, Op::INotEqual, Op::FOrdNotEqual));
        add(Punct::Less, 8, Relational, OpSet::new(Op::Nop, Op::SLessThan, Op::ULessThan, Op::FOrdLessThan));
        add(Punct::Greater, 8, Relational, OpSet::new(Op::Nop, Op::SGreaterThan, Op::UGreaterThan, Op::FOrdGreaterThan));
        add(Punct::LessEqual, 8, Relational, OpSet::new(Op::Nop, Op::SLessThanEqual, Op::ULessThanEqual, Op::FOrdLessThanEqual));
        add(Punct::GreaterEqual, 8, Relational, OpSet::new(Op::Nop, Op::SGreaterThanEqual, Op::UGreaterThanEqual, Op::FOrdGreaterThanEqual));
        add(Punct::ShiftLeft, 9, Shift, OpSet::integral(Op::ShiftLeftLogical));
        add(Punct::ShiftRight, 9, Shift, OpSet::new(Op::Nop, Op::ShiftRightArithmetic, Op::ShiftRightLogical, Op::Nop));
        add(Punct::Plus, 10, Arithmetic, OpSet::new(Op::Nop, Op::IAdd, Op::IAdd, Op::FAdd));
        add(Punct::Minus, 10, Arithmetic, OpSet::new(Op::Nop, Op::ISub, Op::ISub, Op::FSub));
        add(Punct::Star, 11, Arithmetic, OpSet::new(Op::Nop, Op::IMul, Op::IMul, Op::FMul));
        add(Punct::Slash, 11, Arithmetic, OpSet::new(Op::Nop, Op::SDiv, Op::UDiv, Op::FDiv));
        add(Punct::Percent, 11, Arithmetic, OpSet::new(Op::Nop, Op::SRem, Op::UMod, Op::FRem));
        m
    };

    static ref UNARY: HashMap<Punct, UnaryOperator> = {
        let mut m = HashMap::new();
        m.insert(Punct::Minus, UnaryOperator::Negate);
        m.insert(Punct::Plus, UnaryOperator::Plus);
        m.insert(Punct::Exclaim, UnaryOperator::LogicalNot);
        m.insert(Punct::Tilde, UnaryOperator::BitwiseNot);
        m.insert(Punct::PlusPlus, UnaryOperator::Increment);
        m.insert(Punct::MinusMinus, UnaryOperator::Decrement);
        m
    };

    /// Compound assignment -> underlying binary operator (`None` for `=`)
    static ref ASSIGNMENT: HashMap<Punct, Option<Punct>> = {
        let mut m = HashMap::new();
        m.insert(Punct::Equal, None);
        m.insert(Punct::PlusEqual, Some(Punct::Plus));
        m.insert(Punct::MinusEqual, Some(Punct::Minus));
        m.insert(Punct::StarEqual, Some(Punct::Star));
        m.insert(Punct::SlashEqual, Some(Punct::Slash));
        m.insert(Punct::PercentEqual, Some(Punct::Percent));
        m.insert(Punct::AmpEqual, Some(Punct::Ampersand));
        m.insert(Punct::PipeEqual, Some(Punct::Pipe));
        m.insert(Punct::CaretEqual, Some(Punct::Caret));
        m.insert(Punct::ShiftLeftEqual, Some(Punct::ShiftLeft));
        m.insert(Punct::ShiftRightEqual, Some(Punct::ShiftRight));
        m
    };
}

/// Binary or ternary operator introduced by `punct`
pub(crate) fn binary(punct: Punct) -> Option<BinaryOperator> {
    BINARY.get(&punct).copied()
}

/// Prefix operator introduced by `punct`
pub(crate) fn unary(punct: Punct) -> Option<UnaryOperator> {
    UNARY.get(&punct).copied()
}

/// Assignment operator: `Some(None)` for `=`, `Some(Some(op))` for compound forms
pub(crate) fn assignment(punct: Punct) -> Option<Option<BinaryOperator>> {
    let inner = *ASSIGNMENT.get(&punct)?;
    Some(inner.and_then(binary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_order() {
        let p = |punct| binary(punct).map(|b| b.precedence).unwrap_or(0);
        assert!(p(Punct::Star) > p(Punct::Plus));
        assert!(p(Punct::Plus) > p(Punct::ShiftLeft));
        assert!(p(Punct::Less) > p(Punct::EqualEqual));
        assert!(p(Punct::AmpAmp) > p(Punct::PipePipe));
        assert!(p(Punct::PipePipe) > p(Punct::Question));
        assert!(binary(Punct::Question).map(|b| b.right_assoc).unwrap_or(false));
        assert!(binary(Punct::Comma).is_none());
    }

    #[test]
    fn test_assignment_table() {
        assert_eq!(assignment(Punct::Equal), Some(None));
        let add = assignment(Punct::PlusEqual).flatten().map(|b| b.ops.float);
        assert_eq!(add, Some(Op::FAdd));
        assert_eq!(assignment(Punct::EqualEqual), None);
    }

    #[test]
    fn test_unary_table() {
        assert_eq!(unary(Punct::Tilde), Some(UnaryOperator::BitwiseNot));
        assert_eq!(unary(Punct::Star), None);
    }
}
