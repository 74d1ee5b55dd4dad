//! Statements and structured control flow
//!
//! Every construct emits SPIR-V style structured blocks:
//!
//! ```text
//! if:     SelectionMerge merge ; BranchConditional c, then, else
//! while:  header: LoopMerge merge, continue ; Branch cond
//!         cond:   BranchConditional c, body, merge
//!         body … continue: Branch header ; merge:
//! do:     header: LoopMerge ; Branch body ; body … continue: BranchConditional c, header, merge
//! for:    init ; while-shape with the increment emitted in the continue block
//! ```
//!
//! A statement parsed after a terminator opens a fresh unreachable block so
//! the function body always stays well formed. A merge block that no edge
//! enters (both arms return, or an endless loop without `break`) is closed
//! with `Unreachable`.

use super::declaration::{non_literal, redefinition};
use super::{LoopLabels, Parser};
use crate::diagnostics::codes;
use crate::error::{Error, Result};
use crate::ir::{control, Id, Op};
use crate::lexer::{Keyword, Location, Punct, TokenKind};
use crate::symbols::Symbol;
use crate::types::{Qualifiers, TypeInfo};

/// Control hints collected from `[attribute]` prefixes
#[derive(Debug, Clone, Copy, Default)]
struct Attributes {
    selection: u32,
    looping: u32,
}

impl Parser {
    pub(super) fn parse_statement(&mut self) -> Result<()> {
        if !self.block_open {
            let label = self.ir.reserve_id();
            let location = self.location();
            self.emit_label(label, &location);
        }

        let attributes = self.parse_attributes()?;
        let location = self.location();

        if self.accept(Punct::Semicolon) {
            return Ok(());
        }
        if self.peek(Punct::LeftBrace) {
            return self.parse_block();
        }

        match self.token_next.kind {
            TokenKind::Keyword(Keyword::If) => return self.parse_if(attributes.selection, &location),
            TokenKind::Keyword(Keyword::While) => return self.parse_while(attributes.looping, &location),
            TokenKind::Keyword(Keyword::Do) => return self.parse_do(attributes.looping, &location),
            TokenKind::Keyword(Keyword::For) => return self.parse_for(attributes.looping, &location),
            TokenKind::Keyword(Keyword::Return) => return self.parse_return(&location),
            TokenKind::Keyword(Keyword::Break) => return self.parse_jump(true, &location),
            TokenKind::Keyword(Keyword::Continue) => return self.parse_jump(false, &location),
            TokenKind::Keyword(Keyword::Discard) => {
                self.consume();
                self.ir.add_node_without_result(self.section, &location, Op::Kill);
                self.block_open = false;
                return self.expect(Punct::Semicolon);
            }
            _ => {}
        }

        if self.parse_local_declaration()? {
            return self.expect(Punct::Semicolon);
        }

        self.parse_expression()?;
        self.expect(Punct::Semicolon)
    }

    /// `{ statement* }` in its own scope
    fn parse_block(&mut self) -> Result<()> {
        self.expect(Punct::LeftBrace)?;
        self.symbols.enter_scope();
        let result = self.parse_block_contents();
        self.symbols.leave_scope();
        result
    }

    fn parse_block_contents(&mut self) -> Result<()> {
        while !self.accept(Punct::RightBrace) {
            if self.peek_eof() {
                return Err(self.unexpected("'}'"));
            }
            self.parse_statement()?;
        }
        Ok(())
    }

    fn parse_attributes(&mut self) -> Result<Attributes> {
        let mut attributes = Attributes::default();
        while self.accept(Punct::LeftBracket) {
            let location = self.location();
            let name = self.expect_identifier()?;
            if self.accept(Punct::LeftParen) {
                while !self.accept(Punct::RightParen) {
                    if self.peek_eof() {
                        return Err(self.unexpected("')'"));
                    }
                    self.consume();
                }
            }
            self.expect(Punct::RightBracket)?;

            match name.as_str() {
                "unroll" => attributes.looping = control::UNROLL,
                "loop" => attributes.looping = control::DONT_UNROLL,
                "flatten" => attributes.selection = control::FLATTEN,
                "branch" => attributes.selection = control::DONT_FLATTEN,
                _ => self.warning(
                    location,
                    codes::UNKNOWN_ATTRIBUTE,
                    format!("'{}': unknown attribute, ignored", name),
                ),
            }
        }
        Ok(attributes)
    }

    // ------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------

    fn emit_label(&mut self, label: Id, location: &Location) {
        self.ir
            .add_node_with_id(self.section, location, Op::Label, Id::NONE, label);
        self.block_open = true;
    }

    /// Unconditional branch, only if the current block is still open
    fn emit_branch(&mut self, target: Id, location: &Location) {
        if !self.block_open {
            return;
        }
        self.ir
            .add_node_without_result(self.section, location, Op::Branch)
            .add_id(target);
        self.block_open = false;
    }

    fn emit_branch_conditional(&mut self, condition: Id, on_true: Id, on_false: Id, location: &Location) {
        self.ir
            .add_node_without_result(self.section, location, Op::BranchConditional)
            .add_id(condition)
            .add_id(on_true)
            .add_id(on_false);
        self.block_open = false;
    }

    fn emit_loop_merge(&mut self, merge: Id, continue_label: Id, hint: u32, location: &Location) {
        self.ir
            .add_node_without_result(self.section, location, Op::LoopMerge)
            .add_id(merge)
            .add_id(continue_label)
            .add(hint);
    }

    /// Merge block of a construct; closed with `Unreachable` when no edge enters it
    fn emit_merge(&mut self, merge: Id, reachable: bool, location: &Location) {
        self.emit_label(merge, location);
        if !reachable {
            self.ir
                .add_node_without_result(self.section, location, Op::Unreachable);
            self.block_open = false;
        }
    }

    fn is_constant_true(&self, condition: Id) -> bool {
        self.ir.constant_value(condition).is_some_and(|value| value != 0)
    }

    /// `( expression )` converted to a scalar bool
    fn parse_condition(&mut self) -> Result<Id> {
        self.expect(Punct::LeftParen)?;
        let location = self.location();
        let id = self.parse_condition_expression(&location)?;
        self.expect(Punct::RightParen)?;
        Ok(id)
    }

    fn parse_condition_expression(&mut self, location: &Location) -> Result<Id> {
        let value = self.parse_expression()?;
        let (id, ty) = self.rvalue(&value, location)?;
        if !ty.is_numeric() || ty.components() != 1 || ty.is_array() {
            return Err(Error::type_error(
                location.clone(),
                codes::TYPE_MISMATCH,
                format!("conditional expression must be a scalar, got '{}'", ty),
            ));
        }
        self.implicit_cast((id, ty), &TypeInfo::boolean(1, 1), location)
    }

    // ------------------------------------------------------------------
    // Control flow
    // ------------------------------------------------------------------

    fn parse_if(&mut self, hint: u32, location: &Location) -> Result<()> {
        self.expect_keyword(Keyword::If)?;
        let condition = self.parse_condition()?;

        let merge = self.ir.reserve_id();
        let then_label = self.ir.reserve_id();
        let else_label = self.ir.reserve_id();

        self.ir
            .add_node_without_result(self.section, location, Op::SelectionMerge)
            .add_id(merge)
            .add(hint);

        self.emit_branch_conditional(condition, then_label, else_label, location);

        self.emit_label(then_label, location);
        self.parse_statement()?;
        let mut reaches_merge = self.block_open;
        self.emit_branch(merge, location);

        // Without an else branch the false edge lands in an empty block.
        self.emit_label(else_label, location);
        if self.accept_keyword(Keyword::Else) {
            self.parse_statement()?;
        }
        reaches_merge |= self.block_open;
        self.emit_branch(merge, location);

        self.emit_merge(merge, reaches_merge, location);
        Ok(())
    }

    fn parse_while(&mut self, hint: u32, location: &Location) -> Result<()> {
        self.expect_keyword(Keyword::While)?;

        let header = self.ir.reserve_id();
        let condition_label = self.ir.reserve_id();
        let body = self.ir.reserve_id();
        let continue_label = self.ir.reserve_id();
        let merge = self.ir.reserve_id();

        self.emit_branch(header, location);
        self.emit_label(header, location);
        self.emit_loop_merge(merge, continue_label, hint, location);
        self.emit_branch(condition_label, location);

        self.emit_label(condition_label, location);
        let condition = self.parse_condition()?;
        self.emit_branch_conditional(condition, body, merge, location);

        self.emit_label(body, location);
        let has_break = self.parse_loop_body(merge, continue_label)?;
        self.emit_branch(continue_label, location);

        self.emit_label(continue_label, location);
        self.emit_branch(header, location);

        let reaches_merge = has_break || !self.is_constant_true(condition);
        self.emit_merge(merge, reaches_merge, location);
        Ok(())
    }

    fn parse_do(&mut self, hint: u32, location: &Location) -> Result<()> {
        self.expect_keyword(Keyword::Do)?;

        let header = self.ir.reserve_id();
        let body = self.ir.reserve_id();
        let continue_label = self.ir.reserve_id();
        let merge = self.ir.reserve_id();

        self.emit_branch(header, location);
        self.emit_label(header, location);
        self.emit_loop_merge(merge, continue_label, hint, location);
        self.emit_branch(body, location);

        self.emit_label(body, location);
        let has_break = self.parse_loop_body(merge, continue_label)?;
        self.emit_branch(continue_label, location);

        self.emit_label(continue_label, location);
        self.expect_keyword(Keyword::While)?;
        let condition = self.parse_condition()?;
        self.emit_branch_conditional(condition, header, merge, location);
        self.expect(Punct::Semicolon)?;

        let reaches_merge = has_break || !self.is_constant_true(condition);
        self.emit_merge(merge, reaches_merge, location);
        Ok(())
    }

    fn parse_for(&mut self, hint: u32, location: &Location) -> Result<()> {
        self.expect_keyword(Keyword::For)?;
        self.expect(Punct::LeftParen)?;
        self.symbols.enter_scope();
        let result = self.parse_for_contents(hint, location);
        self.symbols.leave_scope();
        result
    }

    fn parse_for_contents(&mut self, hint: u32, location: &Location) -> Result<()> {
        if !self.accept(Punct::Semicolon) {
            if !self.parse_local_declaration()? {
                self.parse_expression()?;
            }
            self.expect(Punct::Semicolon)?;
        }

        let header = self.ir.reserve_id();
        let condition_label = self.ir.reserve_id();
        let body = self.ir.reserve_id();
        let continue_label = self.ir.reserve_id();
        let merge = self.ir.reserve_id();

        self.emit_branch(header, location);
        self.emit_label(header, location);
        self.emit_loop_merge(merge, continue_label, hint, location);
        self.emit_branch(condition_label, location);

        self.emit_label(condition_label, location);
        let condition = if self.peek(Punct::Semicolon) {
            self.ir.convert_constant(&TypeInfo::boolean(1, 1), 1)?
        } else {
            let condition_location = self.location();
            self.parse_condition_expression(&condition_location)?
        };
        self.emit_branch_conditional(condition, body, merge, location);
        self.expect(Punct::Semicolon)?;

        // The increment runs in the continue block, after the body.
        let increment = self.snapshot();
        let mut depth = 0usize;
        loop {
            match self.token_next.kind {
                TokenKind::Eof => return Err(self.unexpected("')'")),
                TokenKind::Punct(Punct::LeftParen) => depth += 1,
                TokenKind::Punct(Punct::RightParen) if depth == 0 => break,
                TokenKind::Punct(Punct::RightParen) => depth -= 1,
                _ => {}
            }
            self.consume();
        }
        self.expect(Punct::RightParen)?;

        self.emit_label(body, location);
        let has_break = self.parse_loop_body(merge, continue_label)?;
        self.emit_branch(continue_label, location);

        self.emit_label(continue_label, location);
        let after_body = self.snapshot();
        self.rewind(increment);
        if !self.peek(Punct::RightParen) {
            self.parse_expression()?;
        }
        self.rewind(after_body);
        self.emit_branch(header, location);

        let reaches_merge = has_break || !self.is_constant_true(condition);
        self.emit_merge(merge, reaches_merge, location);
        Ok(())
    }

    /// Body of a loop; `true` when it contains a `break` of this loop
    fn parse_loop_body(&mut self, merge: Id, continue_label: Id) -> Result<bool> {
        self.loops.push(LoopLabels {
            break_label: merge,
            continue_label,
            has_break: false,
        });
        let result = self.parse_statement();
        let has_break = self.loops.pop().is_some_and(|labels| labels.has_break);
        result.map(|()| has_break)
    }

    /// `break;` or `continue;`
    fn parse_jump(&mut self, is_break: bool, location: &Location) -> Result<()> {
        let keyword = if is_break { "break" } else { "continue" };
        self.consume();
        let Some(labels) = self.loops.last().copied() else {
            return Err(Error::syntax(
                location.clone(),
                codes::OUTSIDE_LOOP,
                format!("{} must be used inside loops only", keyword),
            ));
        };
        let target = if is_break {
            labels.break_label
        } else {
            labels.continue_label
        };
        if is_break && self.block_open {
            if let Some(innermost) = self.loops.last_mut() {
                innermost.has_break = true;
            }
        }
        self.emit_branch(target, location);
        self.expect(Punct::Semicolon)
    }

    fn parse_return(&mut self, location: &Location) -> Result<()> {
        self.expect_keyword(Keyword::Return)?;
        let return_type = self
            .current_function
            .and_then(|index| self.functions.get(index))
            .map(|f| f.return_type)
            .unwrap_or_default();

        if self.accept(Punct::Semicolon) {
            if !return_type.is_void() {
                return Err(Error::type_error(
                    location.clone(),
                    codes::MISSING_RETURN,
                    "function must return a value",
                ));
            }
            self.ir.add_node_without_result(self.section, location, Op::Return);
            self.block_open = false;
            return Ok(());
        }

        let value_location = self.location();
        let value = self.parse_expression()?;
        let operand = self.rvalue(&value, &value_location)?;
        if return_type.is_void() {
            if !operand.1.is_void() {
                return Err(Error::type_error(
                    value_location,
                    codes::VOID_VALUE,
                    "void functions cannot return a value",
                ));
            }
            self.ir.add_node_without_result(self.section, location, Op::Return);
        } else {
            let id = self.implicit_cast(operand, &return_type, &value_location)?;
            self.ir
                .add_node_without_result(self.section, location, Op::ReturnValue)
                .add_id(id);
        }
        self.block_open = false;
        self.expect(Punct::Semicolon)
    }

    // ------------------------------------------------------------------
    // Local variables
    // ------------------------------------------------------------------

    /// Declaration list if the cursor is at one; the stream is untouched otherwise
    fn parse_local_declaration(&mut self) -> Result<bool> {
        self.backup();
        let qualifiers = self.accept_qualifiers()?;
        let ty = match self.accept_type()? {
            Some(ty) if self.peek_identifier().is_some() => ty,
            _ => {
                if !qualifiers.is_empty() {
                    return Err(self.unexpected("type"));
                }
                self.restore();
                return Ok(false);
            }
        };
        let mut ty = ty;
        ty.qualifiers |= qualifiers;

        if ty.is_void() {
            return Err(Error::type_error(self.location(), codes::VOID_VALUE, "variables cannot be void"));
        }

        loop {
            let location = self.location();
            let name = self.expect_identifier()?;
            self.parse_local_variable(ty, name, location)?;
            if !self.accept(Punct::Comma) {
                break;
            }
        }
        Ok(true)
    }

    fn parse_local_variable(&mut self, mut ty: TypeInfo, name: String, location: Location) -> Result<()> {
        ty.array_length = self.parse_array_size()?;
        if ty.is_image() || ty.is_sampled_image() || ty.is_string() {
            return Err(Error::type_error(
                location,
                codes::TYPE_MISMATCH,
                format!("'{}': type '{}' is only allowed at global scope", name, ty),
            ));
        }

        let mut initializer = None;
        if self.accept(Punct::Equal) {
            let init_location = self.location();
            let (id, init_ty) = self.parse_variable_initializer(&ty, &init_location)?;
            ty.array_length = init_ty.array_length;
            initializer = Some((id, init_location));
        }
        if ty.array_length < 0 {
            return Err(Error::type_error(
                location,
                codes::ARRAY_DIMENSION,
                "unsized arrays require an initializer",
            ));
        }

        if ty.has(Qualifiers::CONST) {
            match &initializer {
                Some((id, _)) if self.ir.is_constant(*id) => {
                    return self
                        .symbols
                        .insert(&name, Symbol::Constant { id: *id, ty })
                        .map_err(|_| redefinition(location, &name));
                }
                Some(_) => {}
                None => return Err(non_literal(&location)),
            }
        }

        let variable = self.temporary(&ty, &location)?;
        self.emit_name(variable, &name);
        if let Some((value, init_location)) = initializer {
            self.ir
                .add_node_without_result(self.section, &init_location, Op::Store)
                .add_id(variable)
                .add_id(value);
        }

        self.symbols
            .insert(&name, Symbol::Variable { id: variable, ty: ty.pointer() })
            .map_err(|_| redefinition(location, &name))
    }
}
