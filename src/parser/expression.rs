//! Expressions
//!
//! Every production returns a [`Value`]: either an r-value holding an IR id of
//! the value type, or an l-value holding a pointer id plus an optional pending
//! swizzle. L-values are only loaded when their value is needed.

use super::ops::{self, BinaryClass, BinaryOperator, OpSet, UnaryOperator};
use super::{Parser, Swizzle, Value};
use crate::diagnostics::codes;
use crate::error::{Error, Result};
use crate::intrinsics::{self, glsl, Intrinsic, IntrinsicOp};
use crate::ir::{Id, Op, StorageClass};
use crate::lexer::{Keyword, Location, Punct, TokenKind};
use crate::symbols::{resolve_overload, OverloadError, Symbol};
use crate::types::{common_type, rank, NumericKind, Qualifiers, TypeInfo};

/// Image operand mask selecting an explicit LOD
const IMAGE_OPERAND_LOD: u32 = 0x2;

/// An r-value id with its type
pub(crate) type Operand = (Id, TypeInfo);

impl Parser {
    /// `assignment (, assignment)*`
    pub(super) fn parse_expression(&mut self) -> Result<Value> {
        let mut value = self.parse_expression_assignment()?;
        while self.accept(Punct::Comma) {
            value = self.parse_expression_assignment()?;
        }
        Ok(value)
    }

    /// Assignment and compound assignment, right associative
    pub(super) fn parse_expression_assignment(&mut self) -> Result<Value> {
        let target = self.parse_expression_multary(0)?;
        let Some(operator) = self.peek_punct().and_then(ops::assignment) else {
            return Ok(target);
        };
        let location = self.location();
        self.consume();
        self.check_assignable(&target, &location)?;

        let rhs = self.parse_expression_assignment()?;
        let rhs = self.rvalue(&rhs, &location)?;
        let target_ty = target.ty.value().unqualified();

        let result = match operator {
            None => self.implicit_cast(rhs, &target_ty, &location)?,
            Some(binary) => {
                let current = self.rvalue(&target, &location)?;
                let combined = self.emit_binary(&binary, current, rhs, &location)?;
                self.implicit_cast(combined, &target_ty, &location)?
            }
        };
        self.store(&target, result, &location)?;
        Ok(Value::rvalue(result, target_ty))
    }

    /// Precedence climbing over the binary operator table
    ///
    /// Consumes operators binding tighter than `min_precedence`.
    pub(super) fn parse_expression_multary(&mut self, min_precedence: u32) -> Result<Value> {
        let mut lhs = self.parse_expression_unary()?;

        while let Some(operator) = self.peek_punct().and_then(ops::binary) {
            if operator.precedence <= min_precedence {
                break;
            }
            let location = self.location();
            self.consume();

            lhs = if operator.class == BinaryClass::Conditional {
                self.parse_conditional(lhs, &location)?
            } else {
                let left = self.rvalue(&lhs, &location)?;
                let next = if operator.right_assoc {
                    operator.precedence - 1
                } else {
                    operator.precedence
                };
                let rhs = self.parse_expression_multary(next)?;
                let right = self.rvalue(&rhs, &location)?;
                let (id, ty) = self.emit_binary(&operator, left, right, &location)?;
                Value::rvalue(id, ty)
            };
        }
        Ok(lhs)
    }

    fn parse_conditional(&mut self, condition: Value, location: &Location) -> Result<Value> {
        let condition = self.rvalue(&condition, location)?;
        let when_true = self.parse_expression_assignment()?;
        self.expect(Punct::Colon)?;
        let when_false = self.parse_expression_multary(0)?;

        let when_true = self.rvalue(&when_true, location)?;
        let when_false = self.rvalue(&when_false, location)?;
        self.check_operand(&condition.1, location)?;

        let ty = if when_true.1.value() == when_false.1.value() {
            when_true.1.value().unqualified()
        } else {
            self.check_operand(&when_true.1, location)?;
            self.check_operand(&when_false.1, location)?;
            common_type(&when_true.1, &when_false.1).ok_or_else(|| {
                mismatch(location, &when_true.1, &when_false.1, "?:")
            })?
        };

        let condition_ty = if condition.1.components() == 1 {
            TypeInfo::boolean(1, 1)
        } else {
            TypeInfo::boolean(ty.rows, ty.cols)
        };
        let condition = self.implicit_cast(condition, &condition_ty, location)?;
        let when_true = self.implicit_cast(when_true, &ty, location)?;
        let when_false = self.implicit_cast(when_false, &ty, location)?;

        let type_id = self.value_type_id(&ty)?;
        let id = self.emit_code(
            location,
            Op::Select,
            type_id,
            &[condition.0, when_true.0, when_false.0],
        );
        Ok(Value::rvalue(id, ty))
    }

    /// Prefix operators, then a primary expression with its postfix chain
    pub(super) fn parse_expression_unary(&mut self) -> Result<Value> {
        let location = self.location();
        if let Some(operator) = self.peek_punct().and_then(ops::unary) {
            self.consume();
            let operand = self.parse_expression_unary()?;
            return self.emit_unary(operator, operand, &location);
        }
        let value = self.parse_expression_primary(&location)?;
        self.parse_expression_postfix(value)
    }

    fn parse_expression_primary(&mut self, location: &Location) -> Result<Value> {
        match self.token_next.kind.clone() {
            TokenKind::Punct(Punct::LeftParen) => self.parse_parenthesized(location),
            TokenKind::IntLiteral(v) => {
                self.consume();
                self.literal(TypeInfo::int(1, 1), v as u32)
            }
            TokenKind::UintLiteral(v) => {
                self.consume();
                self.literal(TypeInfo::uint(1, 1), v)
            }
            TokenKind::FloatLiteral(v) => {
                self.consume();
                self.literal(TypeInfo::float(1, 1), v.to_bits())
            }
            TokenKind::Keyword(Keyword::True) => {
                self.consume();
                self.literal(TypeInfo::boolean(1, 1), 1)
            }
            TokenKind::Keyword(Keyword::False) => {
                self.consume();
                self.literal(TypeInfo::boolean(1, 1), 0)
            }
            TokenKind::StringLiteral(_) => Err(Error::type_error(
                location.clone(),
                codes::TYPE_MISMATCH,
                "string literals are only allowed in annotations",
            )),
            TokenKind::Identifier(_)
            | TokenKind::Punct(Punct::ColonColon)
            | TokenKind::Keyword(Keyword::Vector)
            | TokenKind::Keyword(Keyword::Matrix) => self.parse_identifier_expression(location),
            _ => Err(self.unexpected("expression")),
        }
    }

    /// `( type ) unary` or `( expression )`, told apart by backtracking
    fn parse_parenthesized(&mut self, location: &Location) -> Result<Value> {
        self.backup();
        self.consume();

        if let Some(ty) = self.accept_type()? {
            if self.accept(Punct::RightParen) {
                self.backup = None;
                let operand = self.parse_expression_unary()?;
                let operand = self.rvalue(&operand, location)?;
                let id = self.explicit_cast(operand, &ty, location)?;
                return Ok(Value::rvalue(id, ty.value().unqualified()));
            }
        }

        self.restore();
        self.consume();
        let value = self.parse_expression()?;
        self.expect(Punct::RightParen)?;
        Ok(value)
    }

    fn literal(&mut self, ty: TypeInfo, bits: u32) -> Result<Value> {
        let id = self.ir.convert_constant(&ty, bits)?;
        Ok(Value::rvalue(id, ty))
    }

    fn parse_identifier_expression(&mut self, location: &Location) -> Result<Value> {
        if let Some(ty) = self.accept_type()? {
            if ty.is_numeric() && self.peek(Punct::LeftParen) {
                return self.parse_constructor(ty, location);
            }
            return Err(self.unexpected("'('"));
        }

        let name = self.expect_qualified_identifier()?;
        if self.peek(Punct::LeftParen) {
            return self.parse_call(&name, location);
        }

        match self.symbols.find(&name).cloned() {
            Some(Symbol::Variable { id, ty }) => Ok(Value {
                id,
                ty,
                swizzle: None,
            }),
            Some(Symbol::Constant { id, ty }) => Ok(Value::rvalue(id, ty)),
            Some(_) => Err(Error::syntax(
                location.clone(),
                codes::SYNTAX,
                format!("'{}': not a value", name),
            )),
            None => Err(Error::name(
                location.clone(),
                codes::UNDECLARED,
                format!("undeclared identifier '{}'", name),
            )),
        }
    }

    fn parse_expression_postfix(&mut self, mut value: Value) -> Result<Value> {
        loop {
            let location = self.location();
            if self.accept(Punct::Dot) {
                let name = self.expect_identifier()?;
                value = self.access_member(value, &name, &location)?;
            } else if self.accept(Punct::LeftBracket) {
                let index = self.parse_expression()?;
                self.expect(Punct::RightBracket)?;
                value = self.access_index(value, index, &location)?;
            } else if self.peek(Punct::PlusPlus) || self.peek(Punct::MinusMinus) {
                let increment = self.peek(Punct::PlusPlus);
                self.consume();
                value = self.emit_increment(value, increment, true, &location)?;
            } else {
                return Ok(value);
            }
        }
    }

    // ------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------

    fn emit_unary(&mut self, operator: UnaryOperator, operand: Value, location: &Location) -> Result<Value> {
        match operator {
            UnaryOperator::Increment => self.emit_increment(operand, true, false, location),
            UnaryOperator::Decrement => self.emit_increment(operand, false, false, location),
            UnaryOperator::Plus => {
                let (id, ty) = self.rvalue(&operand, location)?;
                self.check_operand(&ty, location)?;
                Ok(Value::rvalue(id, ty))
            }
            UnaryOperator::Negate => {
                let (mut id, mut ty) = self.rvalue(&operand, location)?;
                self.check_operand(&ty, location)?;
                if ty.is_boolean() {
                    let promoted = TypeInfo::int(ty.rows, ty.cols);
                    id = self.implicit_cast((id, ty), &promoted, location)?;
                    ty = promoted;
                }
                if let Some(folded) = self.fold_negate(id, &ty)? {
                    return Ok(Value::rvalue(folded, ty));
                }
                let op = if ty.is_floating_point() { Op::FNegate } else { Op::SNegate };
                let type_id = self.value_type_id(&ty)?;
                Ok(Value::rvalue(self.emit_code(location, op, type_id, &[id.0]), ty))
            }
            UnaryOperator::LogicalNot => {
                let (id, ty) = self.rvalue(&operand, location)?;
                self.check_operand(&ty, location)?;
                let boolean = TypeInfo::boolean(ty.rows, ty.cols);
                let id = self.implicit_cast((id, ty), &boolean, location)?;
                let type_id = self.value_type_id(&boolean)?;
                Ok(Value::rvalue(
                    self.emit_code(location, Op::LogicalNot, type_id, &[id.0]),
                    boolean,
                ))
            }
            UnaryOperator::BitwiseNot => {
                let (id, ty) = self.rvalue(&operand, location)?;
                self.check_operand(&ty, location)?;
                if !ty.is_integral() {
                    return Err(integral_required(location, "~"));
                }
                let type_id = self.value_type_id(&ty)?;
                Ok(Value::rvalue(self.emit_code(location, Op::Not, type_id, &[id.0]), ty))
            }
        }
    }

    fn fold_negate(&mut self, id: Id, ty: &TypeInfo) -> Result<Option<Id>> {
        if ty.is_matrix() || ty.size == 16 {
            return Ok(None);
        }
        let elements: Vec<Id> = match self.ir.lookup(id) {
            Some(node) if node.op == Op::ConstantComposite => {
                node.operands.iter().map(|&w| Id(w)).collect()
            }
            Some(node) if node.op.is_constant() => vec![id],
            _ => return Ok(None),
        };

        let scalar = ty.scalar();
        let mut negated = Vec::with_capacity(elements.len());
        for element in elements {
            let Some(bits) = self.ir.constant_value(element) else {
                return Ok(None);
            };
            let bits = if ty.is_floating_point() {
                bits ^ 0x8000_0000
            } else {
                (bits as i32).wrapping_neg() as u32
            };
            negated.push(self.ir.convert_constant(&scalar, bits)?);
        }

        if ty.components() == 1 {
            return Ok(negated.first().copied());
        }
        Ok(Some(self.ir.convert_composite_constant(ty, &negated)?))
    }

    fn emit_increment(&mut self, target: Value, increment: bool, postfix: bool, location: &Location) -> Result<Value> {
        self.check_assignable(&target, location)?;
        let (current, ty) = self.rvalue(&target, location)?;
        if !ty.is_numeric() || ty.is_boolean() || ty.is_array() {
            return Err(Error::type_error(
                location.clone(),
                codes::TYPE_MISMATCH,
                format!("'{}': increment requires a numeric operand", ty),
            ));
        }

        let one = self.ir.one_constant(&ty)?;
        let op = match (ty.is_floating_point(), increment) {
            (true, true) => Op::FAdd,
            (true, false) => Op::FSub,
            (false, true) => Op::IAdd,
            (false, false) => Op::ISub,
        };
        let type_id = self.value_type_id(&ty)?;
        let updated = self.emit_code(location, op, type_id, &[current.0, one.0]);
        self.store(&target, updated, location)?;

        Ok(Value::rvalue(if postfix { current } else { updated }, ty))
    }

    pub(super) fn emit_binary(
        &mut self,
        operator: &BinaryOperator,
        lhs: Operand,
        rhs: Operand,
        location: &Location,
    ) -> Result<Operand> {
        self.check_operand(&lhs.1, location)?;
        self.check_operand(&rhs.1, location)?;
        let symbol = binary_symbol(operator);
        let Some(mut ty) = common_type(&lhs.1, &rhs.1) else {
            return Err(mismatch(location, &lhs.1, &rhs.1, symbol));
        };

        let result_ty = match operator.class {
            BinaryClass::Arithmetic => {
                if ty.is_boolean() {
                    ty = TypeInfo::int(ty.rows, ty.cols);
                }
                ty
            }
            BinaryClass::Bitwise | BinaryClass::Shift => {
                if !ty.is_integral() {
                    return Err(integral_required(location, symbol));
                }
                ty
            }
            BinaryClass::Relational => {
                if ty.is_boolean() {
                    ty = TypeInfo::int(ty.rows, ty.cols);
                }
                TypeInfo::boolean(ty.rows, ty.cols)
            }
            BinaryClass::Equality => TypeInfo::boolean(ty.rows, ty.cols),
            BinaryClass::Logical => {
                ty = TypeInfo::boolean(ty.rows, ty.cols);
                ty
            }
            BinaryClass::Conditional => {
                return Err(Error::syntax(location.clone(), codes::SYNTAX, "unexpected '?'"));
            }
        };

        let op = select_op(&operator.ops, &ty);
        if op == Op::Nop {
            return Err(mismatch(location, &lhs.1, &rhs.1, symbol));
        }

        let left = self.implicit_cast(lhs, &ty, location)?;
        let right = self.implicit_cast(rhs, &ty, location)?;
        let type_id = self.value_type_id(&result_ty)?;
        let id = self.emit_code(location, op, type_id, &[left.0, right.0]);
        Ok((id, result_ty))
    }

    // ------------------------------------------------------------------
    // Member access and indexing
    // ------------------------------------------------------------------

    fn access_member(&mut self, value: Value, name: &str, location: &Location) -> Result<Value> {
        let ty = value.ty.value();

        if ty.is_struct() && !ty.is_array() {
            let field = self
                .structs
                .iter()
                .find(|s| s.definition == ty.definition)
                .and_then(|s| s.field(name))
                .map(|(index, field)| (index as u32, field.ty));
            let Some((index, mut field_ty)) = field else {
                return Err(invalid_subscript(location, name));
            };
            inherit_access(&mut field_ty, &value.ty);

            if value.is_lvalue() {
                let index_id = self.ir.convert_constant(&TypeInfo::int(1, 1), index)?;
                let pointer = self.member_pointer(value.id, &field_ty, &[index_id], location)?;
                return Ok(Value::lvalue(pointer, field_ty));
            }
            let id = self.extract(value.id, &field_ty, &[index], location)?;
            return Ok(Value::rvalue(id, field_ty.value()));
        }

        if !ty.is_numeric() || ty.is_array() || ty.is_matrix() {
            return Err(invalid_subscript(location, name));
        }
        let Some(components) = parse_swizzle(name, ty.components()) else {
            return Err(invalid_subscript(location, name));
        };

        if !value.is_lvalue() {
            let id = self.apply_swizzle(value.id, &ty, &components, location)?;
            return Ok(Value::rvalue(id, ty.with_shape(components.len() as u8, 1)));
        }

        let (base_ty, components) = match &value.swizzle {
            Some(swizzle) => (
                swizzle.base_ty,
                components.iter().map(|&c| swizzle.components[c as usize]).collect(),
            ),
            None => (ty, components),
        };

        let mut result_ty = base_ty.with_shape(components.len() as u8, 1);
        inherit_access(&mut result_ty, &value.ty);
        let repeated = components
            .iter()
            .enumerate()
            .any(|(i, c)| components[..i].contains(c));
        if repeated {
            result_ty.qualifiers |= Qualifiers::CONST;
        }

        if base_ty.components() == 1 {
            if components.len() == 1 {
                return Ok(Value {
                    swizzle: None,
                    ..value
                });
            }
            let (id, _) = self.rvalue(&value, location)?;
            let id = self.apply_swizzle(id, &base_ty, &components, location)?;
            return Ok(Value::rvalue(id, result_ty.unqualified()));
        }

        if components.len() == 1 {
            let index_id = self.ir.convert_constant(&TypeInfo::int(1, 1), components[0])?;
            let pointer = self.member_pointer(value.id, &result_ty, &[index_id], location)?;
            return Ok(Value::lvalue(pointer, result_ty));
        }

        Ok(Value {
            id: value.id,
            ty: result_ty.pointer(),
            swizzle: Some(Swizzle { base_ty, components }),
        })
    }

    fn access_index(&mut self, value: Value, index: Value, location: &Location) -> Result<Value> {
        let (index_id, index_ty) = self.rvalue(&index, location)?;
        if !index_ty.is_numeric() || index_ty.is_array() || index_ty.components() != 1 {
            return Err(Error::type_error(
                location.clone(),
                codes::INTEGRAL_REQUIRED,
                "array index must be a scalar",
            ));
        }
        let index_id = self.implicit_cast((index_id, index_ty), &TypeInfo::int(1, 1), location)?;

        let value = if value.swizzle.is_some() {
            let (id, ty) = self.rvalue(&value, location)?;
            Value::rvalue(id, ty)
        } else {
            value
        };

        let ty = value.ty.value();
        let (mut element_ty, length) = if ty.is_array() {
            (ty.element(), ty.array_length)
        } else if ty.is_matrix() {
            (ty.with_shape(ty.cols, 1), ty.rows as i32)
        } else if ty.is_vector() {
            (ty.scalar(), ty.rows as i32)
        } else {
            return Err(Error::type_error(
                location.clone(),
                codes::INVALID_ACCESS,
                "subscripted value is not an array, matrix or vector",
            ));
        };
        inherit_access(&mut element_ty, &value.ty);

        let constant = self.ir.constant_value(index_id);
        if let Some(bits) = constant {
            let index = bits as i32;
            if length > 0 && (index < 0 || index >= length) {
                return Err(Error::type_error(
                    location.clone(),
                    codes::INVALID_ACCESS,
                    format!("array index {} out of bounds", index),
                ));
            }
        }

        if value.is_lvalue() {
            let pointer = self.member_pointer(value.id, &element_ty, &[index_id], location)?;
            return Ok(Value::lvalue(pointer, element_ty));
        }

        let element_ty = element_ty.value().unqualified();
        if let Some(index) = constant {
            let id = self.extract(value.id, &element_ty, &[index], location)?;
            return Ok(Value::rvalue(id, element_ty));
        }

        let spill = self.temporary(&ty, location)?;
        self.ir
            .add_node_without_result(self.section, location, Op::Store)
            .add_id(spill)
            .add_id(value.id);
        let pointer = self.member_pointer(spill, &element_ty, &[index_id], location)?;
        let type_id = self.value_type_id(&element_ty)?;
        let id = self.emit_code(location, Op::Load, type_id, &[pointer.0]);
        Ok(Value::rvalue(id, element_ty))
    }

    /// `AccessChain` into `base`, keeping its storage class
    fn member_pointer(&mut self, base: Id, element: &TypeInfo, indices: &[Id], location: &Location) -> Result<Id> {
        let storage = self.storage_class(base);
        let type_id = self.ir.convert_pointer_type(&element.value(), storage)?;
        let mut operands = vec![base.0];
        operands.extend(indices.iter().map(|id| id.0));
        Ok(self.emit_code(location, Op::AccessChain, type_id, &operands))
    }

    fn storage_class(&self, pointer: Id) -> StorageClass {
        self.ir
            .lookup(pointer)
            .and_then(|node| self.ir.lookup(node.result_type))
            .filter(|ty| ty.op == Op::TypePointer)
            .and_then(|ty| ty.operands.first().copied())
            .and_then(StorageClass::from_code)
            .unwrap_or(StorageClass::Function)
    }

    /// `CompositeExtract`, resolved at compile time through constant composites
    fn extract(&mut self, composite: Id, result_ty: &TypeInfo, path: &[u32], location: &Location) -> Result<Id> {
        let mut current = composite;
        let mut resolved = true;
        for &index in path {
            match self.ir.lookup(current) {
                Some(node) if node.op == Op::ConstantComposite => {
                    match node.operands.get(index as usize) {
                        Some(&word) => current = Id(word),
                        None => {
                            resolved = false;
                            break;
                        }
                    }
                }
                _ => {
                    resolved = false;
                    break;
                }
            }
        }
        if resolved {
            return Ok(current);
        }

        let type_id = self.value_type_id(result_ty)?;
        let mut operands = vec![composite.0];
        operands.extend_from_slice(path);
        Ok(self.emit_code(location, Op::CompositeExtract, type_id, &operands))
    }

    fn apply_swizzle(&mut self, id: Id, base_ty: &TypeInfo, components: &[u32], location: &Location) -> Result<Id> {
        let result_ty = base_ty.with_shape(components.len() as u8, 1);
        if base_ty.components() == 1 {
            if components.len() == 1 {
                return Ok(id);
            }
            let type_id = self.value_type_id(&result_ty)?;
            let operands = vec![id.0; components.len()];
            return Ok(self.emit_code(location, Op::CompositeConstruct, type_id, &operands));
        }
        if components.len() == 1 {
            return self.extract(id, &result_ty, &[components[0]], location);
        }
        let type_id = self.value_type_id(&result_ty)?;
        let mut operands = vec![id.0, id.0];
        operands.extend_from_slice(components);
        Ok(self.emit_code(location, Op::VectorShuffle, type_id, &operands))
    }

    // ------------------------------------------------------------------
    // Loads and stores
    // ------------------------------------------------------------------

    /// Value of an expression, loading l-values
    pub(super) fn rvalue(&mut self, value: &Value, location: &Location) -> Result<Operand> {
        if !value.is_lvalue() {
            return Ok((value.id, value.ty));
        }
        let base_ty = match &value.swizzle {
            Some(swizzle) => swizzle.base_ty,
            None => value.ty.value(),
        };
        let type_id = self.value_type_id(&base_ty)?;
        let loaded = self.emit_code(location, Op::Load, type_id, &[value.id.0]);

        let result_ty = value.ty.value().unqualified();
        match &value.swizzle {
            None => Ok((loaded, result_ty)),
            Some(swizzle) => {
                let components = swizzle.components.clone();
                let id = self.apply_swizzle(loaded, &base_ty, &components, location)?;
                Ok((id, result_ty))
            }
        }
    }

    /// Write `value` (already of the target's value type) through an l-value
    pub(super) fn store(&mut self, target: &Value, value: Id, location: &Location) -> Result<()> {
        let value = match &target.swizzle {
            None => value,
            Some(swizzle) => {
                let base = swizzle.base_ty.value().unqualified();
                let components = swizzle.components.clone();
                let type_id = self.value_type_id(&base)?;
                let current = self.emit_code(location, Op::Load, type_id, &[target.id.0]);
                let width = base.rows as u32;
                let mut operands = vec![current.0, value.0];
                for i in 0..width {
                    operands.push(match components.iter().position(|&c| c == i) {
                        Some(j) => width + j as u32,
                        None => i,
                    });
                }
                self.emit_code(location, Op::VectorShuffle, type_id, &operands)
            }
        };
        self.ir
            .add_node_without_result(self.section, location, Op::Store)
            .add_id(target.id)
            .add_id(value);
        Ok(())
    }

    pub(super) fn check_assignable(&self, target: &Value, location: &Location) -> Result<()> {
        if !target.is_lvalue() {
            return Err(Error::type_error(
                location.clone(),
                codes::NOT_LVALUE,
                "expression is not assignable",
            ));
        }
        if target.ty.has(Qualifiers::CONST) || target.ty.has(Qualifiers::UNIFORM) {
            return Err(Error::type_error(
                location.clone(),
                codes::NOT_LVALUE,
                "l-value specifies const object",
            ));
        }
        Ok(())
    }

    /// Function-local variable used for spills and out arguments
    pub(super) fn temporary(&mut self, ty: &TypeInfo, location: &Location) -> Result<Id> {
        let pointer = self
            .ir
            .convert_pointer_type(&ty.value(), StorageClass::Function)?;
        Ok(self.emit_code(
            location,
            Op::Variable,
            pointer,
            &[StorageClass::Function as u32],
        ))
    }

    // ------------------------------------------------------------------
    // Conversions
    // ------------------------------------------------------------------

    /// Conversion allowed without a cast
    pub(super) fn implicit_cast(&mut self, (id, from): Operand, to: &TypeInfo, location: &Location) -> Result<Id> {
        let (from, to) = (from.value(), to.value());
        if from == to {
            return Ok(id);
        }
        if from.is_void() {
            return Err(void_value(location));
        }
        if rank(&from, &to).is_none() {
            return Err(cannot_convert(location, &from, &to));
        }
        self.ir
            .add_cast_node(self.section, location, &from, &to, id)
            .map_err(|_| cannot_convert(location, &from, &to))
    }

    /// C-style cast; additionally allows truncation
    fn explicit_cast(&mut self, (id, from): Operand, to: &TypeInfo, location: &Location) -> Result<Id> {
        let (from, to) = (from.value(), to.value());
        if from == to {
            return Ok(id);
        }
        if from.is_void() {
            return Err(void_value(location));
        }
        self.ir
            .add_cast_node(self.section, location, &from, &to, id)
            .map_err(|_| cannot_convert(location, &from, &to))
    }

    /// `float3(...)` and friends
    fn parse_constructor(&mut self, ty: TypeInfo, location: &Location) -> Result<Value> {
        let ty = ty.value().unqualified();
        let args = self.parse_arguments()?;
        let mut operands = Vec::with_capacity(args.len());
        for arg in &args {
            operands.push(self.rvalue(arg, location)?);
        }

        if let [single] = operands.as_slice() {
            let from = single.1;
            let same_shape = (from.rows, from.cols) == (ty.rows, ty.cols);
            if from.components() == 1 || ty.components() == 1 || same_shape {
                let id = self.explicit_cast(*single, &ty, location)?;
                return Ok(Value::rvalue(id, ty));
            }
        }

        let scalar = ty.scalar();
        let mut components = Vec::with_capacity(ty.components() as usize);
        for (id, from) in operands {
            if !from.is_numeric() || from.is_array() {
                return Err(cannot_convert(location, &from, &ty));
            }
            self.flatten_components(id, &from, &scalar, location, &mut components)?;
        }
        if components.len() != ty.components() as usize {
            return Err(Error::type_error(
                location.clone(),
                codes::CANNOT_CONVERT,
                format!("incorrect number of arguments to '{}' constructor", ty),
            ));
        }

        let id = self.compose(&ty, &components, location)?;
        Ok(Value::rvalue(id, ty))
    }

    pub(super) fn flatten_components(
        &mut self,
        id: Id,
        from: &TypeInfo,
        scalar_to: &TypeInfo,
        location: &Location,
        out: &mut Vec<Id>,
    ) -> Result<()> {
        let from_scalar = from.scalar();
        if from.components() == 1 {
            out.push(self.ir.add_cast_node(self.section, location, &from_scalar, scalar_to, id)?);
            return Ok(());
        }
        for row in 0..from.rows as u32 {
            for col in 0..from.cols as u32 {
                let path = if from.is_matrix() { vec![row, col] } else { vec![row] };
                let element = self.extract(id, &from_scalar, &path, location)?;
                out.push(self.ir.add_cast_node(self.section, location, &from_scalar, scalar_to, element)?);
            }
        }
        Ok(())
    }

    /// Assemble scalar components into `ty`, folding when all are constant
    pub(super) fn compose(&mut self, ty: &TypeInfo, components: &[Id], location: &Location) -> Result<Id> {
        if ty.components() == 1 {
            return components
                .first()
                .copied()
                .ok_or_else(|| cannot_convert(location, &TypeInfo::void(), ty));
        }
        if ty.is_matrix() {
            let row_ty = ty.with_shape(ty.cols, 1);
            let mut rows = Vec::with_capacity(ty.rows as usize);
            for chunk in components.chunks(ty.cols as usize) {
                rows.push(self.compose(&row_ty, chunk, location)?);
            }
            return self.composite(ty, &rows, location);
        }
        self.composite(ty, components, location)
    }

    pub(super) fn composite(&mut self, ty: &TypeInfo, parts: &[Id], location: &Location) -> Result<Id> {
        if parts.iter().all(|&id| self.ir.is_constant(id)) {
            return self.ir.convert_composite_constant(ty, parts);
        }
        let type_id = self.value_type_id(ty)?;
        let operands: Vec<u32> = parts.iter().map(|id| id.0).collect();
        Ok(self.emit_code(location, Op::CompositeConstruct, type_id, &operands))
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    fn parse_arguments(&mut self) -> Result<Vec<Value>> {
        self.expect(Punct::LeftParen)?;
        let mut args = Vec::new();
        if !self.peek(Punct::RightParen) {
            loop {
                args.push(self.parse_expression_assignment()?);
                if !self.accept(Punct::Comma) {
                    break;
                }
            }
        }
        self.expect(Punct::RightParen)?;
        Ok(args)
    }

    fn parse_call(&mut self, name: &str, location: &Location) -> Result<Value> {
        let args = self.parse_arguments()?;
        let arg_types: Vec<TypeInfo> = args.iter().map(|a| a.ty.value()).collect();
        if arg_types.iter().any(|t| t.is_void()) {
            return Err(void_value(location));
        }
        let builtin = intrinsics::is_intrinsic(name);

        let user = self.symbols.find_functions(name);
        if !user.is_empty() {
            let candidates: Vec<(usize, Vec<TypeInfo>)> = user
                .iter()
                .map(|&i| (i, self.functions[i].parameter_list.clone()))
                .collect();
            match resolve_overload(candidates.iter().map(|(i, p)| (*i, p.as_slice())), &arg_types) {
                Ok(index) => return self.emit_user_call(index, args, location),
                Err(OverloadError::NoMatch) if builtin => {}
                Err(err) => return Err(overload_error(err, location, name, &arg_types)),
            }
        }

        if builtin {
            let candidates = intrinsics::overloads(name)
                .iter()
                .map(|i| (i, i.parameters.as_slice()));
            return match resolve_overload(candidates, &arg_types) {
                Ok(intrinsic) => self.emit_intrinsic_call(intrinsic, args, location),
                Err(err) => Err(overload_error(err, location, name, &arg_types)),
            };
        }

        Err(Error::name(
            location.clone(),
            codes::UNDECLARED,
            format!("undeclared identifier '{}'", name),
        ))
    }

    fn emit_user_call(&mut self, index: usize, args: Vec<Value>, location: &Location) -> Result<Value> {
        let function = self.functions[index].clone();
        self.called_functions.push((index, location.clone()));
        tracing::trace!(function = %function.unique_name, "call");

        let mut operands = vec![function.definition.0];
        let mut write_backs = Vec::new();
        for (arg, param) in args.iter().zip(&function.parameter_list) {
            let param_ty = param.value().unqualified();
            if param.has(Qualifiers::OUT) {
                self.check_assignable(arg, location)?;
                let temp = self.temporary(&param_ty, location)?;
                if param.has(Qualifiers::IN) {
                    let current = self.rvalue(arg, location)?;
                    let current = self.implicit_cast(current, &param_ty, location)?;
                    self.ir
                        .add_node_without_result(self.section, location, Op::Store)
                        .add_id(temp)
                        .add_id(current);
                }
                operands.push(temp.0);
                write_backs.push((arg.clone(), temp, param_ty));
            } else {
                let current = self.rvalue(arg, location)?;
                operands.push(self.implicit_cast(current, &param_ty, location)?.0);
            }
        }

        let return_ty = function.return_type.value().unqualified();
        let type_id = self.value_type_id(&return_ty)?;
        let result = self.emit_code(location, Op::FunctionCall, type_id, &operands);

        for (arg, temp, param_ty) in write_backs {
            let type_id = self.value_type_id(&param_ty)?;
            let written = self.emit_code(location, Op::Load, type_id, &[temp.0]);
            let written = self.implicit_cast((written, param_ty), &arg.ty.value(), location)?;
            self.store(&arg, written, location)?;
        }
        Ok(Value::rvalue(result, return_ty))
    }

    fn emit_intrinsic_call(&mut self, intrinsic: &Intrinsic, args: Vec<Value>, location: &Location) -> Result<Value> {
        let mut operands = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(&intrinsic.parameters) {
            let value = self.rvalue(arg, location)?;
            operands.push(self.implicit_cast(value, param, location)?);
        }

        let ty = intrinsic.return_type;
        let type_id = self.value_type_id(&ty)?;
        let words: Vec<u32> = operands.iter().map(|id| id.0).collect();

        let id = match intrinsic.op {
            IntrinsicOp::Glsl(instruction) => {
                let import = self.ir.glsl_import();
                let mut all = vec![import.0, instruction];
                all.extend(words);
                self.emit_code(location, Op::ExtInst, type_id, &all)
            }
            IntrinsicOp::Core(op) => self.emit_code(location, op, type_id, &words),
            IntrinsicOp::Saturate => {
                let import = self.ir.glsl_import();
                let zero = self.ir.convert_constant(&ty, 0)?;
                let one = self.ir.one_constant(&ty)?;
                let mut all = vec![import.0, glsl::F_CLAMP];
                all.extend(words);
                all.extend([zero.0, one.0]);
                self.emit_code(location, Op::ExtInst, type_id, &all)
            }
            IntrinsicOp::Sample => self.emit_code(location, Op::ImageSampleImplicitLod, type_id, &words),
            IntrinsicOp::SampleLod => {
                let (sampler, coord) = match operands.as_slice() {
                    [sampler, coord] => (*sampler, *coord),
                    _ => return Err(Error::syntax(location.clone(), codes::SYNTAX, "tex2Dlod takes two arguments")),
                };
                let float2 = TypeInfo::float(2, 1);
                let float2_id = self.value_type_id(&float2)?;
                let xy = self.emit_code(location, Op::VectorShuffle, float2_id, &[coord.0, coord.0, 0, 1]);
                let lod = self.extract(coord, &TypeInfo::float(1, 1), &[3], location)?;
                self.emit_code(
                    location,
                    Op::ImageSampleExplicitLod,
                    type_id,
                    &[sampler.0, xy.0, IMAGE_OPERAND_LOD, lod.0],
                )
            }
        };
        Ok(Value::rvalue(id, ty))
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    pub(super) fn value_type_id(&mut self, ty: &TypeInfo) -> Result<Id> {
        self.ir.convert_type(&ty.value())
    }

    pub(super) fn emit_code(&mut self, location: &Location, op: Op, result_type: Id, operands: &[u32]) -> Id {
        self.ir.emit(self.section, location, op, result_type, operands)
    }

    fn check_operand(&self, ty: &TypeInfo, location: &Location) -> Result<()> {
        if ty.is_void() {
            return Err(void_value(location));
        }
        if !ty.is_numeric() || ty.is_array() {
            return Err(Error::type_error(
                location.clone(),
                codes::TYPE_MISMATCH,
                format!("'{}': operand must be a numeric scalar, vector or matrix", ty),
            ));
        }
        Ok(())
    }
}

/// Component indices of a `xyzw` or `rgba` swizzle over `length` components
fn parse_swizzle(name: &str, length: u32) -> Option<Vec<u32>> {
    if name.is_empty() || name.len() > 4 {
        return None;
    }
    let set = ["xyzw", "rgba"]
        .into_iter()
        .find(|set| name.chars().all(|c| set.contains(c)))?;
    name.chars()
        .map(|c| set.find(c).map(|i| i as u32))
        .map(|i| i.filter(|&i| i < length))
        .collect()
}

fn inherit_access(ty: &mut TypeInfo, parent: &TypeInfo) {
    ty.qualifiers |= parent.qualifiers & (Qualifiers::CONST | Qualifiers::UNIFORM);
}

fn select_op(ops: &OpSet, ty: &TypeInfo) -> Op {
    match ty.numeric_kind() {
        Some(NumericKind::Bool) => ops.boolean,
        Some(NumericKind::Int) => ops.signed,
        Some(NumericKind::Uint) => ops.unsigned,
        _ => ops.float,
    }
}

fn binary_symbol(operator: &BinaryOperator) -> &'static str {
    [
        Punct::PipePipe,
        Punct::AmpAmp,
        Punct::Pipe,
        Punct::Caret,
        Punct::Ampersand,
        Punct::EqualEqual,
        Punct::ExclaimEqual,
        Punct::Less,
        Punct::Greater,
        Punct::LessEqual,
        Punct::GreaterEqual,
        Punct::ShiftLeft,
        Punct::ShiftRight,
        Punct::Plus,
        Punct::Minus,
        Punct::Star,
        Punct::Slash,
        Punct::Percent,
    ]
    .into_iter()
    .find(|&p| ops::binary(p).as_ref() == Some(operator))
    .map(|p| p.as_str())
    .unwrap_or("?:")
}

fn mismatch(location: &Location, lhs: &TypeInfo, rhs: &TypeInfo, symbol: &str) -> Error {
    Error::type_error(
        location.clone(),
        codes::TYPE_MISMATCH,
        format!("'{}': no conversion between '{}' and '{}'", symbol, lhs, rhs),
    )
}

fn integral_required(location: &Location, symbol: &str) -> Error {
    Error::type_error(
        location.clone(),
        codes::INTEGRAL_REQUIRED,
        format!("'{}': operator requires integral operands", symbol),
    )
}

fn cannot_convert(location: &Location, from: &TypeInfo, to: &TypeInfo) -> Error {
    Error::type_error(
        location.clone(),
        codes::CANNOT_CONVERT,
        format!("cannot convert from '{}' to '{}'", from, to),
    )
}

fn void_value(location: &Location) -> Error {
    Error::type_error(location.clone(), codes::VOID_VALUE, "void type cannot be used as a value")
}

fn invalid_subscript(location: &Location, name: &str) -> Error {
    Error::type_error(
        location.clone(),
        codes::INVALID_ACCESS,
        format!("invalid subscript '{}'", name),
    )
}

fn overload_error(err: OverloadError, location: &Location, name: &str, args: &[TypeInfo]) -> Error {
    let signature = format!(
        "{}({})",
        name,
        args.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
    );
    match err {
        OverloadError::NoMatch => Error::name(
            location.clone(),
            codes::NO_MATCHING_OVERLOAD,
            format!("'{}': no matching overload", signature),
        ),
        OverloadError::Ambiguous => Error::name(
            location.clone(),
            codes::AMBIGUOUS_CALL,
            format!("'{}': ambiguous function call", signature),
        ),
    }
}
