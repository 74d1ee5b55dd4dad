//! Top-level declarations: namespaces, structs, typedefs, globals, functions

use super::expression::Operand;
use super::Parser;
use crate::diagnostics::codes;
use crate::effect::{Annotations, FunctionInfo, StructField, StructInfo, Variant, VariableInfo};
use crate::error::{Error, Result};
use crate::ir::{control, decoration, Id, Op, SectionId, StorageClass};
use crate::lexer::{Keyword, Location, Punct, TokenKind};
use crate::symbols::Symbol;
use crate::types::{NumericKind, Qualifiers, TypeInfo};
use std::mem;

/// A parsed function parameter
#[derive(Debug, Clone)]
pub(super) struct Parameter {
    name: String,
    ty: TypeInfo,
    semantic: Option<String>,
    location: Location,
}

impl Parser {
    pub(super) fn parse_top_level(&mut self) -> Result<()> {
        if self.accept(Punct::Semicolon) {
            return Ok(());
        }
        if self.peek_keyword(Keyword::Namespace) {
            return self.parse_namespace();
        }
        if self.peek_keyword(Keyword::Struct) {
            self.parse_struct()?;
            return self.expect(Punct::Semicolon);
        }
        if self.peek_keyword(Keyword::Typedef) {
            return self.parse_typedef();
        }
        if self.peek_keyword(Keyword::Technique) {
            return self.parse_technique();
        }

        let ty = self.parse_type()?;
        let mut location = self.location();
        let mut name = self.expect_identifier()?;
        if self.peek(Punct::LeftParen) {
            return self.parse_function(ty, name, location);
        }

        loop {
            self.parse_global_variable(ty, name, location)?;
            if !self.accept(Punct::Comma) {
                break;
            }
            location = self.location();
            name = self.expect_identifier()?;
        }
        self.expect(Punct::Semicolon)
    }

    fn parse_namespace(&mut self) -> Result<()> {
        self.expect_keyword(Keyword::Namespace)?;
        let name = self.expect_identifier()?;
        self.expect(Punct::LeftBrace)?;
        self.symbols.enter_namespace(&name);
        while !self.accept(Punct::RightBrace) {
            if self.peek_eof() {
                return Err(self.unexpected("'}'"));
            }
            self.parse_top_level()?;
        }
        self.symbols.leave_namespace();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    /// Storage, interpolation and parameter qualifiers
    pub(super) fn accept_qualifiers(&mut self) -> Result<Qualifiers> {
        let mut qualifiers = Qualifiers::empty();
        loop {
            let qualifier = match self.token_next.kind {
                TokenKind::Keyword(keyword) => qualifier_of(keyword),
                _ => None,
            };
            let Some(qualifier) = qualifier else {
                return Ok(qualifiers);
            };
            if qualifiers.intersects(qualifier) {
                return Err(Error::syntax(
                    self.location(),
                    codes::DUPLICATE_QUALIFIER,
                    format!("duplicate usages specified: '{}'", self.token_next.lexeme),
                ));
            }
            qualifiers |= qualifier;
            self.consume();
        }
    }

    /// Qualifiers followed by a type name
    pub(super) fn parse_type(&mut self) -> Result<TypeInfo> {
        let qualifiers = self.accept_qualifiers()?;
        let Some(mut ty) = self.accept_type()? else {
            return Err(self.unexpected("type"));
        };
        ty.qualifiers |= qualifiers;
        Ok(ty)
    }

    /// Type name without qualifiers; the stream is untouched when there is none
    pub(super) fn accept_type(&mut self) -> Result<Option<TypeInfo>> {
        if self.accept_keyword(Keyword::Vector) {
            if !self.accept(Punct::Less) {
                return Ok(Some(TypeInfo::float(4, 1)));
            }
            let element = self.parse_template_scalar()?;
            self.expect(Punct::Comma)?;
            let rows = self.parse_template_dimension()?;
            self.expect(Punct::Greater)?;
            return Ok(Some(element.with_shape(rows, 1)));
        }
        if self.accept_keyword(Keyword::Matrix) {
            if !self.accept(Punct::Less) {
                return Ok(Some(TypeInfo::float(4, 4)));
            }
            let element = self.parse_template_scalar()?;
            self.expect(Punct::Comma)?;
            let rows = self.parse_template_dimension()?;
            self.expect(Punct::Comma)?;
            let cols = self.parse_template_dimension()?;
            self.expect(Punct::Greater)?;
            return Ok(Some(element.with_shape(rows, cols)));
        }

        match &self.token_next.kind {
            TokenKind::Identifier(name) => {
                if let Some(ty) = TypeInfo::from_name(name) {
                    self.consume();
                    return Ok(Some(ty));
                }
            }
            TokenKind::Punct(Punct::ColonColon) => {}
            _ => return Ok(None),
        }

        let snapshot = self.snapshot();
        let Ok(name) = self.expect_qualified_identifier() else {
            self.rewind(snapshot);
            return Ok(None);
        };
        match self.symbols.find(&name) {
            Some(Symbol::Struct { id, .. }) => Ok(Some(TypeInfo::structure(*id))),
            Some(Symbol::Alias(ty)) => Ok(Some(*ty)),
            _ => {
                self.rewind(snapshot);
                Ok(None)
            }
        }
    }

    fn parse_template_scalar(&mut self) -> Result<TypeInfo> {
        let ty = self
            .peek_identifier()
            .and_then(TypeInfo::from_name)
            .filter(|ty| ty.is_numeric() && ty.components() == 1);
        match ty {
            Some(ty) => {
                self.consume();
                Ok(ty)
            }
            None => Err(self.unexpected("scalar type")),
        }
    }

    fn parse_template_dimension(&mut self) -> Result<u8> {
        match self.token_next.kind {
            TokenKind::IntLiteral(n @ 1..=4) => {
                self.consume();
                Ok(n as u8)
            }
            _ => Err(self.unexpected("dimension between 1 and 4")),
        }
    }

    /// `[N]` or `[]`; 0 when absent, -1 when unsized
    pub(super) fn parse_array_size(&mut self) -> Result<i32> {
        let location = self.location();
        if !self.accept(Punct::LeftBracket) {
            return Ok(0);
        }
        if self.accept(Punct::RightBracket) {
            return Ok(-1);
        }

        let (id, ty) = self.parse_in_temporary(|p| {
            let size = p.parse_expression()?;
            p.rvalue(&size, &location)
        })?;
        self.expect(Punct::RightBracket)?;

        match self.ir.constant_value(id) {
            Some(n) if ty.is_integral() && ty.components() == 1 && (n as i32) > 0 => Ok(n as i32),
            _ => Err(Error::type_error(
                location,
                codes::ARRAY_DIMENSION,
                "array dimensions must be literal scalar expressions greater than zero",
            )),
        }
    }

    /// `: SEMANTIC`
    pub(super) fn parse_semantic(&mut self) -> Result<Option<String>> {
        if !self.accept(Punct::Colon) {
            return Ok(None);
        }
        Ok(Some(self.expect_identifier()?.to_uppercase()))
    }

    /// Run `f` with code emission redirected to the temporary section
    pub(super) fn parse_in_temporary<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = mem::replace(&mut self.section, SectionId::Temporary);
        let result = f(self);
        self.section = saved;
        result
    }

    // ------------------------------------------------------------------
    // Annotations
    // ------------------------------------------------------------------

    /// `< type name = value; ... >`
    pub(super) fn parse_annotations(&mut self) -> Result<Annotations> {
        let mut annotations = Annotations::new();
        if !self.accept(Punct::Less) {
            return Ok(annotations);
        }
        while !self.accept(Punct::Greater) {
            let location = self.location();
            let ty = self.parse_type()?;
            let name = self.expect_identifier()?;
            self.expect(Punct::Equal)?;
            let value = self.parse_annotation_value(&ty, &location)?;
            self.expect(Punct::Semicolon)?;
            annotations.insert(name, value);
        }
        Ok(annotations)
    }

    fn parse_annotation_value(&mut self, ty: &TypeInfo, location: &Location) -> Result<Variant> {
        if matches!(self.token_next.kind, TokenKind::StringLiteral(_)) {
            let mut text = String::new();
            while let TokenKind::StringLiteral(part) = &self.token_next.kind {
                text.push_str(part);
                self.consume();
            }
            if !ty.is_string() {
                return Err(Error::type_error(
                    location.clone(),
                    codes::TYPE_MISMATCH,
                    format!("cannot convert a string to '{}'", ty),
                ));
            }
            return Ok(Variant::String(text));
        }

        if !ty.is_numeric() || ty.is_array() || ty.components() != 1 {
            return Err(Error::type_error(
                location.clone(),
                codes::TYPE_MISMATCH,
                format!("'{}': annotation values must be scalars or strings", ty),
            ));
        }
        let target = ty.unqualified();
        let id = self.parse_in_temporary(|p| {
            let value = p.parse_expression_unary()?;
            let value = p.rvalue(&value, location)?;
            p.implicit_cast(value, &target, location)
        })?;
        self.constant_variant(id, &target)
            .ok_or_else(|| non_literal(location))
    }

    /// Scalar constant as an annotation value
    pub(super) fn constant_variant(&self, id: Id, ty: &TypeInfo) -> Option<Variant> {
        let bits = self.ir.constant_value(id)?;
        Some(match ty.numeric_kind()? {
            NumericKind::Bool => Variant::Bool(bits != 0),
            NumericKind::Int => Variant::Int(bits as i32),
            NumericKind::Uint => Variant::Uint(bits),
            NumericKind::Float => Variant::Float(f32::from_bits(bits)),
        })
    }

    /// One `Decorate` per annotation on an IR object
    pub(super) fn emit_annotations(&mut self, target: Id, annotations: &Annotations) -> Result<()> {
        let location = Location::default();
        for (name, value) in annotations.iter() {
            let name_id = self.emit_string(name);
            let value_id = match value {
                Variant::Bool(b) => self.ir.convert_constant(&TypeInfo::boolean(1, 1), *b as u32)?,
                Variant::Int(i) => self.ir.convert_constant(&TypeInfo::int(1, 1), *i as u32)?,
                Variant::Uint(u) => self.ir.convert_constant(&TypeInfo::uint(1, 1), *u)?,
                Variant::Float(f) => self.ir.convert_constant(&TypeInfo::float(1, 1), f.to_bits())?,
                Variant::String(s) => self.emit_string(s),
            };
            self.ir
                .add_node_without_result(SectionId::Annotations, &location, Op::Decorate)
                .add_id(target)
                .add(decoration::ANNOTATION)
                .add_id(name_id)
                .add_id(value_id);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Names and decorations
    // ------------------------------------------------------------------

    pub(super) fn emit_string(&mut self, text: &str) -> Id {
        let id = self
            .ir
            .add_node(SectionId::Strings, &Location::default(), Op::String, Id::NONE);
        if let Some(node) = self.ir.lookup_mut(id) {
            node.add_string(text);
        }
        id
    }

    pub(super) fn emit_name(&mut self, target: Id, name: &str) {
        self.ir
            .add_node_without_result(SectionId::Strings, &Location::default(), Op::Name)
            .add_id(target)
            .add_string(name);
    }

    pub(super) fn emit_semantic(&mut self, target: Id, semantic: &str) {
        self.ir
            .add_node_without_result(SectionId::Annotations, &Location::default(), Op::Decorate)
            .add_id(target)
            .add(decoration::HLSL_SEMANTIC)
            .add_string(semantic);
    }

    /// Interpolation and precision qualifiers as decorations
    pub(super) fn emit_qualifier_decorations(&mut self, target: Id, ty: &TypeInfo) {
        let table = [
            (Qualifiers::NOPERSPECTIVE, decoration::NO_PERSPECTIVE),
            (Qualifiers::NOINTERPOLATION, decoration::FLAT),
            (Qualifiers::CENTROID, decoration::CENTROID),
            (Qualifiers::PRECISE, decoration::NO_CONTRACTION),
        ];
        for (qualifier, kind) in table {
            if ty.has(qualifier) {
                self.ir
                    .add_node_without_result(SectionId::Annotations, &Location::default(), Op::Decorate)
                    .add_id(target)
                    .add(kind);
            }
        }
    }

    // ------------------------------------------------------------------
    // Structs and aliases
    // ------------------------------------------------------------------

    fn parse_struct(&mut self) -> Result<()> {
        let location = self.location();
        self.expect_keyword(Keyword::Struct)?;
        let name = match self.peek_identifier() {
            Some(_) => self.expect_identifier()?,
            None => format!("__anonymous_struct_{}_{}", location.line, location.column),
        };
        self.expect(Punct::LeftBrace)?;

        let mut fields: Vec<StructField> = Vec::new();
        while !self.accept(Punct::RightBrace) {
            let ty = self.parse_type()?;
            if ty.is_void() {
                return Err(Error::type_error(
                    self.token.location.clone(),
                    codes::VOID_VALUE,
                    "struct members cannot be void",
                ));
            }
            loop {
                let field_location = self.location();
                let field_name = self.expect_identifier()?;
                let mut field_ty = ty;
                field_ty.array_length = self.parse_array_size()?;
                if field_ty.array_length < 0 {
                    return Err(Error::type_error(
                        field_location,
                        codes::ARRAY_DIMENSION,
                        "struct members cannot be unsized arrays",
                    ));
                }
                let semantic = self.parse_semantic()?;
                if fields.iter().any(|f| f.name == field_name) {
                    return Err(redefinition(field_location, &field_name));
                }
                fields.push(StructField {
                    name: field_name,
                    ty: field_ty,
                    semantic,
                });
                if !self.accept(Punct::Comma) {
                    break;
                }
            }
            self.expect(Punct::Semicolon)?;
        }

        if fields.is_empty() {
            self.warning(location.clone(), codes::EMPTY_STRUCT, format!("'{}': struct has no members", name));
        }

        let mut operands = Vec::with_capacity(fields.len());
        for field in &fields {
            operands.push(self.ir.convert_type(&field.ty)?.0);
        }
        let definition = self
            .ir
            .emit(SectionId::Variables, &location, Op::TypeStruct, Id::NONE, &operands);
        self.emit_name(definition, &name);
        for (index, field) in fields.iter().enumerate() {
            self.ir
                .add_node_without_result(SectionId::Strings, &Location::default(), Op::MemberName)
                .add_id(definition)
                .add(index as u32)
                .add_string(&field.name);
            if let Some(semantic) = &field.semantic {
                self.ir
                    .add_node_without_result(SectionId::Annotations, &Location::default(), Op::MemberDecorate)
                    .add_id(definition)
                    .add(index as u32)
                    .add(decoration::HLSL_SEMANTIC)
                    .add_string(semantic);
            }
        }

        let index = self.structs.len();
        self.symbols
            .insert(&name, Symbol::Struct { id: definition, index })
            .map_err(|_| redefinition(location.clone(), &name))?;
        let unique_name = unique_name(&self.symbols.qualify(&name));
        tracing::debug!(name = %unique_name, fields = fields.len(), "declared struct");
        self.structs.push(StructInfo {
            name,
            unique_name,
            definition,
            fields,
        });
        Ok(())
    }

    fn parse_typedef(&mut self) -> Result<()> {
        self.expect_keyword(Keyword::Typedef)?;
        let ty = self.parse_type()?;
        loop {
            let location = self.location();
            let name = self.expect_identifier()?;
            let mut alias = ty;
            alias.array_length = self.parse_array_size()?;
            self.symbols
                .insert(&name, Symbol::Alias(alias))
                .map_err(|_| redefinition(location, &name))?;
            if !self.accept(Punct::Comma) {
                break;
            }
        }
        self.expect(Punct::Semicolon)
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    fn parse_global_variable(&mut self, mut ty: TypeInfo, name: String, location: Location) -> Result<()> {
        ty.array_length = self.parse_array_size()?;
        let semantic = self.parse_semantic()?;
        let annotations = self.parse_annotations()?;

        if ty.is_void() {
            return Err(Error::type_error(location, codes::VOID_VALUE, "variables cannot be void"));
        }
        if ty.is_image() {
            return self.parse_texture(ty, name, location, annotations);
        }
        if ty.is_sampled_image() {
            return self.parse_sampler(ty, name, location, annotations);
        }
        if ty.is_string() {
            return Err(Error::type_error(
                location,
                codes::TYPE_MISMATCH,
                "string variables are not supported",
            ));
        }

        let mut initializer = None;
        if self.accept(Punct::Equal) {
            let init_location = self.location();
            let (id, init_ty) = self.parse_in_temporary(|p| p.parse_variable_initializer(&ty, &init_location))?;
            if !self.ir.is_constant(id) {
                return Err(non_literal(&init_location));
            }
            ty.array_length = init_ty.array_length;
            initializer = Some(id);
        }
        if ty.array_length < 0 {
            return Err(Error::type_error(
                location,
                codes::ARRAY_DIMENSION,
                "unsized arrays require an initializer",
            ));
        }

        if ty.has(Qualifiers::CONST) {
            let Some(id) = initializer else {
                return Err(Error::type_error(
                    location,
                    codes::NON_LITERAL_INITIALIZER,
                    format!("'{}': missing initial value", name),
                ));
            };
            return self
                .symbols
                .insert(&name, Symbol::Constant { id, ty })
                .map_err(|_| redefinition(location, &name));
        }

        let uniform = !ty.has(Qualifiers::STATIC);
        let storage = if uniform {
            ty.qualifiers |= Qualifiers::UNIFORM;
            StorageClass::Uniform
        } else {
            StorageClass::Private
        };

        let pointer_type = self.ir.convert_pointer_type(&ty, storage)?;
        let mut operands = vec![storage as u32];
        operands.extend(initializer.map(|id| id.0));
        let id = self
            .ir
            .emit(SectionId::Variables, &location, Op::Variable, pointer_type, &operands);
        self.emit_name(id, &name);
        if let Some(semantic) = &semantic {
            self.emit_semantic(id, semantic);
        }
        self.emit_annotations(id, &annotations)?;

        self.symbols
            .insert(&name, Symbol::Variable { id, ty: ty.pointer() })
            .map_err(|_| redefinition(location.clone(), &name))?;

        if uniform {
            let unique = unique_name(&self.symbols.qualify(&name));
            tracing::trace!(name = %unique, "declared uniform");
            let mut info = VariableInfo::new(name, unique, ty, location);
            info.definition = id;
            info.annotations = annotations;
            self.uniforms.push(info);
        }
        Ok(())
    }

    /// `= value` or `= { a, b, ... }` converted to `ty`
    ///
    /// Returns the value and the final type, which differs from `ty` only
    /// for unsized arrays whose length comes from the list.
    pub(super) fn parse_variable_initializer(&mut self, ty: &TypeInfo, location: &Location) -> Result<Operand> {
        let target = ty.value().unqualified();

        if !self.accept(Punct::LeftBrace) {
            if target.array_length < 0 {
                return Err(Error::type_error(
                    location.clone(),
                    codes::ARRAY_DIMENSION,
                    "unsized arrays require an initializer list",
                ));
            }
            let value = self.parse_expression_assignment()?;
            let value = self.rvalue(&value, location)?;
            let id = self.implicit_cast(value, &target, location)?;
            return Ok((id, target));
        }

        let mut elements = Vec::new();
        while !self.peek(Punct::RightBrace) {
            let element = self.parse_expression_assignment()?;
            elements.push(self.rvalue(&element, location)?);
            if !self.accept(Punct::Comma) {
                break;
            }
        }
        self.expect(Punct::RightBrace)?;

        let wrong_count = |expected: usize| {
            Error::type_error(
                location.clone(),
                codes::CANNOT_CONVERT,
                format!(
                    "initializer list has {} elements, '{}' needs {}",
                    elements.len(),
                    target,
                    expected
                ),
            )
        };

        if target.is_array() {
            let length = if target.array_length < 0 {
                elements.len()
            } else {
                target.array_length as usize
            };
            if elements.len() != length {
                return Err(wrong_count(length));
            }
            let element_ty = target.element();
            let mut parts = Vec::with_capacity(length);
            for element in elements {
                parts.push(self.implicit_cast(element, &element_ty, location)?);
            }
            let mut array_ty = target;
            array_ty.array_length = length as i32;
            let id = self.composite(&array_ty, &parts, location)?;
            return Ok((id, array_ty));
        }

        if target.is_struct() {
            let fields: Vec<TypeInfo> = self
                .structs
                .iter()
                .find(|s| s.definition == target.definition)
                .map(|s| s.fields.iter().map(|f| f.ty).collect())
                .unwrap_or_default();
            if elements.len() != fields.len() {
                return Err(wrong_count(fields.len()));
            }
            let mut parts = Vec::with_capacity(fields.len());
            for (element, field_ty) in elements.into_iter().zip(&fields) {
                parts.push(self.implicit_cast(element, field_ty, location)?);
            }
            let id = self.composite(&target, &parts, location)?;
            return Ok((id, target));
        }

        if !target.is_numeric() {
            return Err(wrong_count(0));
        }
        let scalar = target.scalar();
        let mut components = Vec::with_capacity(target.components() as usize);
        for (id, element_ty) in &elements {
            if !element_ty.is_numeric() || element_ty.is_array() {
                return Err(Error::type_error(
                    location.clone(),
                    codes::CANNOT_CONVERT,
                    format!("cannot convert from '{}' to '{}'", element_ty, scalar),
                ));
            }
            self.flatten_components(*id, element_ty, &scalar, location, &mut components)?;
        }
        if components.len() != target.components() as usize {
            return Err(wrong_count(target.components() as usize));
        }
        let id = self.compose(&target, &components, location)?;
        Ok((id, target))
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    fn parse_function(&mut self, return_type: TypeInfo, name: String, location: Location) -> Result<()> {
        self.expect(Punct::LeftParen)?;
        let parameters = self.parse_parameters()?;
        self.expect(Punct::RightParen)?;
        let return_semantic = self.parse_semantic()?;

        let parameter_list: Vec<TypeInfo> = parameters.iter().map(|p| p.ty).collect();
        let qualified = self.symbols.qualify(&name);
        let unique = mangle_function(&qualified, &parameter_list);
        let key = (qualified, parameter_list.clone());

        let index = match self.declared_functions.get(&key).copied() {
            Some(index) => {
                let existing = &self.functions[index];
                if existing.return_type.unqualified() != return_type.unqualified() {
                    return Err(Error::name(
                        location,
                        codes::REDEFINITION,
                        format!("'{}': function return type differs from previous declaration", name),
                    ));
                }
                if existing.defined && self.peek(Punct::LeftBrace) {
                    return Err(Error::name(
                        location,
                        codes::REDEFINITION,
                        format!("'{}': function already has a body", name),
                    ));
                }
                index
            }
            None => {
                let index = self.functions.len();
                self.symbols
                    .insert_function(&name, index)
                    .map_err(|_| redefinition(location.clone(), &name))?;
                let definition = self.ir.reserve_id();
                tracing::debug!(function = %unique, "declared function");
                self.declared_functions.insert(key, index);
                self.functions.push(FunctionInfo {
                    return_type,
                    name: name.clone(),
                    unique_name: unique,
                    parameter_list,
                    parameter_names: Vec::new(),
                    parameter_semantics: Vec::new(),
                    return_semantic: None,
                    definition,
                    defined: false,
                    location: location.clone(),
                });
                index
            }
        };

        {
            let function = &mut self.functions[index];
            function.parameter_names = parameters.iter().map(|p| p.name.clone()).collect();
            function.parameter_semantics = parameters.iter().map(|p| p.semantic.clone()).collect();
            function.return_semantic = return_semantic;
        }

        if self.accept(Punct::Semicolon) {
            return Ok(());
        }
        self.functions[index].location = location;
        self.parse_function_body(index, &parameters)
    }

    fn parse_parameters(&mut self) -> Result<Vec<Parameter>> {
        let mut parameters = Vec::new();
        if self.peek(Punct::RightParen) {
            return Ok(parameters);
        }
        loop {
            let location = self.location();
            let ty = self.parse_type()?;
            if ty.is_void() {
                if parameters.is_empty() && self.peek(Punct::RightParen) {
                    break;
                }
                return Err(Error::type_error(location, codes::VOID_VALUE, "parameters cannot be void"));
            }

            let location = self.location();
            let name = self.expect_identifier()?;
            let mut ty = ty;
            ty.array_length = self.parse_array_size()?;
            if ty.array_length < 0 {
                return Err(Error::type_error(
                    location,
                    codes::ARRAY_DIMENSION,
                    "parameters cannot be unsized arrays",
                ));
            }
            let semantic = self.parse_semantic()?;
            parameters.push(Parameter {
                name,
                ty,
                semantic,
                location,
            });
            if !self.accept(Punct::Comma) {
                break;
            }
        }
        Ok(parameters)
    }

    fn parse_function_body(&mut self, index: usize, parameters: &[Parameter]) -> Result<()> {
        let function = self.functions[index].clone();
        let function_type = self.ir.convert_function_type(&function)?;
        let return_type = self.value_type_id(&function.return_type)?;
        self.ir
            .add_node_with_id(
                SectionId::Functions,
                &function.location,
                Op::Function,
                return_type,
                function.definition,
            )
            .add(control::NONE)
            .add_id(function_type);
        self.emit_name(function.definition, &function.name);
        if let Some(semantic) = &function.return_semantic {
            self.emit_semantic(function.definition, semantic);
        }

        self.functions[index].defined = true;
        self.section = SectionId::Functions;
        self.current_function = Some(index);
        self.loops.clear();
        self.symbols.enter_scope();

        let result = self.parse_function_contents(&function, parameters);

        self.symbols.leave_scope();
        self.current_function = None;
        result
    }

    fn parse_function_contents(&mut self, function: &FunctionInfo, parameters: &[Parameter]) -> Result<()> {
        let mut bound = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            let ty = parameter.ty;
            let by_pointer = ty.has(Qualifiers::OUT);
            let type_id = if by_pointer {
                self.ir.convert_type(&ty.pointer())?
            } else {
                self.value_type_id(&ty)?
            };
            let id = self.ir.add_node(
                SectionId::Functions,
                &parameter.location,
                Op::FunctionParameter,
                type_id,
            );
            self.emit_name(id, &parameter.name);
            if let Some(semantic) = &parameter.semantic {
                self.emit_semantic(id, semantic);
            }
            self.emit_qualifier_decorations(id, &ty);
            bound.push((id, by_pointer));
        }

        self.ir
            .add_node(SectionId::Functions, &function.location, Op::Label, Id::NONE);
        self.block_open = true;

        for (parameter, (id, by_pointer)) in parameters.iter().zip(bound) {
            let storage = if by_pointer {
                id
            } else {
                let local = self.temporary(&parameter.ty, &parameter.location)?;
                self.ir
                    .add_node_without_result(SectionId::Functions, &parameter.location, Op::Store)
                    .add_id(local)
                    .add_id(id);
                local
            };
            self.symbols
                .insert(
                    &parameter.name,
                    Symbol::Variable {
                        id: storage,
                        ty: parameter.ty.pointer(),
                    },
                )
                .map_err(|_| redefinition(parameter.location.clone(), &parameter.name))?;
        }

        self.expect(Punct::LeftBrace)?;
        while !self.accept(Punct::RightBrace) {
            if self.peek_eof() {
                return Err(self.unexpected("'}'"));
            }
            self.parse_statement()?;
        }

        let end = self.token.location.clone();
        if self.block_open {
            if !function.return_type.is_void() {
                return Err(Error::type_error(
                    end,
                    codes::MISSING_RETURN,
                    format!("'{}': not all control paths return a value", function.name),
                ));
            }
            self.ir
                .add_node_without_result(SectionId::Functions, &end, Op::Return);
            self.block_open = false;
        }
        self.ir
            .add_node_without_result(SectionId::Functions, &end, Op::FunctionEnd);
        Ok(())
    }
}

fn qualifier_of(keyword: Keyword) -> Option<Qualifiers> {
    Some(match keyword {
        Keyword::Extern => Qualifiers::EXTERN,
        Keyword::Static => Qualifiers::STATIC,
        Keyword::Uniform => Qualifiers::UNIFORM,
        Keyword::Volatile => Qualifiers::VOLATILE,
        Keyword::Precise => Qualifiers::PRECISE,
        Keyword::In => Qualifiers::IN,
        Keyword::Out => Qualifiers::OUT,
        Keyword::Inout => Qualifiers::INOUT,
        Keyword::Const => Qualifiers::CONST,
        Keyword::Linear => Qualifiers::LINEAR,
        Keyword::Noperspective => Qualifiers::NOPERSPECTIVE,
        Keyword::Centroid => Qualifiers::CENTROID,
        Keyword::Nointerpolation => Qualifiers::NOINTERPOLATION,
        _ => return None,
    })
}

/// Qualified name flattened to an identifier usable downstream
///
/// `::` becomes `__` and a literal `_` becomes `_1`, so distinct qualified
/// names never flatten to the same string.
pub(super) fn unique_name(qualified: &str) -> String {
    qualified
        .split("::")
        .map(|segment| segment.replace('_', "_1"))
        .collect::<Vec<_>>()
        .join("__")
}

/// `F<name>_<param>_<param>...`, distinct for every overload
fn mangle_function(qualified: &str, parameters: &[TypeInfo]) -> String {
    let mut out = format!("F{}", unique_name(qualified));
    for parameter in parameters {
        out.push('_');
        out.push_str(&parameter.mangle());
    }
    out
}

pub(super) fn redefinition(location: Location, name: &str) -> Error {
    Error::name(location, codes::REDEFINITION, format!("'{}': redefinition", name))
}

pub(super) fn non_literal(location: &Location) -> Error {
    Error::type_error(
        location.clone(),
        codes::NON_LITERAL_INITIALIZER,
        "initial value must be a literal expression",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mangle_function() {
        let params = [TypeInfo::float(3, 1), TypeInfo::int(1, 1)];
        assert_eq!(mangle_function("foo", &params), "Ffoo_f3_i");
        assert_eq!(mangle_function("A::foo", &[]), "FA__foo");
        assert_eq!(mangle_function("A_foo", &[]), "FA_1foo");
        assert_ne!(mangle_function("foo_f", &[]), mangle_function("foo", &[TypeInfo::float(1, 1)]));
    }

    #[test]
    fn test_unique_names_do_not_collide() {
        assert_eq!(unique_name("Util::Blur_H"), "Util__Blur_1H");
        let names = ["A::B", "A_B", "A__B", "A::_B", "A_::B"];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(unique_name(a), unique_name(b), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_qualifier_keywords() {
        assert_eq!(qualifier_of(Keyword::Inout), Some(Qualifiers::INOUT));
        assert_eq!(qualifier_of(Keyword::Struct), None);
    }
}
