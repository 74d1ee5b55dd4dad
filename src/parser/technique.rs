//! Textures, samplers, techniques and passes
//!
//! Property and state blocks share one value grammar: a (possibly qualified)
//! name or a literal unary expression.
//!
//! | Block     | Keys                                                        |
//! |-----------|-------------------------------------------------------------|
//! | texture   | Width Height Depth MipLevels Format SRGBTexture             |
//! | sampler   | Texture Min/Mag/MipFilter AddressU/V/W Min/MaxLOD MipLODBias SRGBTexture |
//! | pass      | render targets, shaders, blend, stencil and write masks     |

use super::declaration::{non_literal, redefinition, unique_name};
use super::Parser;
use crate::diagnostics::codes;
use crate::effect::{
    AddressMode, Annotations, BlendFactor, BlendOp, ComparisonFunc, FilterMode, PassProperties, StencilOp,
    TechniqueProperties, TextureFormat, Variant, VariableInfo,
};
use crate::error::{Error, Result};
use crate::ir::{execution_model, Id, Op, SectionId, StorageClass};
use crate::lexer::{Keyword, Location, Punct, TokenKind};
use crate::symbols::Symbol;
use crate::types::{Qualifiers, TypeInfo};

/// Right-hand side of a property or pass state assignment
#[derive(Debug, Clone, PartialEq)]
enum StateValue {
    Name(String),
    Value(Variant),
}

impl StateValue {
    fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Value(Variant::Bool(b)) => Some(*b),
            StateValue::Value(Variant::Int(i)) => Some(*i != 0),
            StateValue::Value(Variant::Uint(u)) => Some(*u != 0),
            StateValue::Name(name) => match name.as_str() {
                "TRUE" | "true" => Some(true),
                "FALSE" | "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn as_uint(&self) -> Option<u32> {
        match self {
            StateValue::Value(Variant::Bool(b)) => Some(*b as u32),
            StateValue::Value(Variant::Int(i)) => u32::try_from(*i).ok(),
            StateValue::Value(Variant::Uint(u)) => Some(*u),
            StateValue::Value(Variant::Float(f)) if *f >= 0.0 && f.fract() == 0.0 => Some(*f as u32),
            _ => None,
        }
    }

    fn as_float(&self) -> Option<f32> {
        match self {
            StateValue::Value(value) => value.as_float(),
            StateValue::Name(_) => None,
        }
    }

    fn as_name(&self) -> Option<&str> {
        match self {
            StateValue::Name(name) => Some(name),
            StateValue::Value(_) => None,
        }
    }

    /// Symbolic constant by name or by its numeric value
    fn as_enum<T>(&self, from_name: fn(&str) -> Option<T>, from_value: fn(u32) -> Option<T>) -> Option<T> {
        match self {
            StateValue::Name(name) => from_name(&name.to_uppercase()),
            _ => self.as_uint().and_then(from_value),
        }
    }
}

/// `name = value;` as read from a block
struct Assignment {
    key: String,
    value: StateValue,
    location: Location,
}

impl Parser {
    // ------------------------------------------------------------------
    // Property blocks
    // ------------------------------------------------------------------

    fn parse_state_value(&mut self) -> Result<StateValue> {
        if matches!(
            self.token_next.kind,
            TokenKind::Identifier(_) | TokenKind::Punct(Punct::ColonColon)
        ) {
            return Ok(StateValue::Name(self.expect_qualified_identifier()?));
        }

        let location = self.location();
        let (id, ty) = self.parse_in_temporary(|p| {
            let value = p.parse_expression_unary()?;
            p.rvalue(&value, &location)
        })?;
        if ty.is_array() || ty.components() != 1 {
            return Err(invalid_value(&location, "scalar"));
        }
        self.constant_variant(id, &ty)
            .map(StateValue::Value)
            .ok_or_else(|| non_literal(&location))
    }

    /// `{ key = value; ... }`, empty when the block is absent
    fn parse_assignments(&mut self) -> Result<Vec<Assignment>> {
        let mut assignments = Vec::new();
        if !self.accept(Punct::LeftBrace) {
            return Ok(assignments);
        }
        while !self.accept(Punct::RightBrace) {
            let location = self.location();
            let key = self.expect_identifier()?;
            self.expect(Punct::Equal)?;
            let value = self.parse_state_value()?;
            self.expect(Punct::Semicolon)?;
            assignments.push(Assignment { key, value, location });
        }
        Ok(assignments)
    }

    fn declare_resource(
        &mut self,
        ty: &mut TypeInfo,
        name: &str,
        location: &Location,
        annotations: &Annotations,
    ) -> Result<Id> {
        if ty.is_array() {
            return Err(Error::type_error(
                location.clone(),
                codes::ARRAY_DIMENSION,
                format!("'{}': arrays of textures and samplers are not supported", name),
            ));
        }
        ty.qualifiers |= Qualifiers::UNIFORM;
        let pointer_type = self.ir.convert_pointer_type(ty, StorageClass::UniformConstant)?;
        let id = self.ir.emit(
            SectionId::Variables,
            location,
            Op::Variable,
            pointer_type,
            &[StorageClass::UniformConstant as u32],
        );
        self.emit_name(id, name);
        self.emit_annotations(id, annotations)?;
        self.symbols
            .insert(name, Symbol::Variable { id, ty: ty.pointer() })
            .map_err(|_| redefinition(location.clone(), name))?;
        Ok(id)
    }

    pub(super) fn parse_texture(
        &mut self,
        mut ty: TypeInfo,
        name: String,
        location: Location,
        annotations: Annotations,
    ) -> Result<()> {
        let assignments = self.parse_assignments()?;
        let id = self.declare_resource(&mut ty, &name, &location, &annotations)?;

        let unique = unique_name(&self.symbols.qualify(&name));
        let mut info = VariableInfo::new(name, unique, ty, location);
        info.definition = id;
        info.annotations = annotations;

        let mut levels_location = None;
        let mut srgb_location = None;
        for Assignment { key, value, location } in assignments {
            match key.as_str() {
                "Width" => info.width = positive(&value, &location)?,
                "Height" => info.height = positive(&value, &location)?,
                "Depth" => info.depth = positive(&value, &location)?,
                "MipLevels" => {
                    info.levels = value.as_uint().ok_or_else(|| invalid_value(&location, "integer"))?;
                    levels_location = Some(location);
                }
                "Format" => {
                    info.format = value
                        .as_name()
                        .and_then(|n| TextureFormat::from_name(&n.to_uppercase()))
                        .ok_or_else(|| invalid_value(&location, "texture format"))?;
                }
                "SRGBTexture" => {
                    info.srgb_texture = value.as_bool().ok_or_else(|| invalid_value(&location, "boolean"))?;
                    srgb_location = Some(location);
                }
                _ => return Err(unknown_state(&location, &key)),
            }
        }

        if let Some(location) = levels_location {
            let max_levels = 32 - info.width.max(info.height).max(info.depth).leading_zeros();
            if info.levels == 0 {
                self.warning(location, codes::PROPERTY_ADJUSTED, "a texture cannot have 0 mipmap levels, changed it to 1");
                info.levels = 1;
            } else if info.levels > max_levels {
                self.warning(
                    location,
                    codes::PROPERTY_ADJUSTED,
                    format!("too many mipmap levels, clamped to {}", max_levels),
                );
                info.levels = max_levels;
            }
        }
        if let Some(location) = srgb_location {
            if info.srgb_texture && info.format != TextureFormat::RGBA8 {
                self.warning(
                    location,
                    codes::PROPERTY_ADJUSTED,
                    "texture does not support sRGB sampling (only textures with RGBA8 format do)",
                );
                info.srgb_texture = false;
            }
        }

        tracing::trace!(texture = %info.unique_name, width = info.width, height = info.height, "declared texture");
        self.textures.push(info);
        Ok(())
    }

    pub(super) fn parse_sampler(
        &mut self,
        mut ty: TypeInfo,
        name: String,
        location: Location,
        annotations: Annotations,
    ) -> Result<()> {
        let assignments = self.parse_assignments()?;
        let id = self.declare_resource(&mut ty, &name, &location, &annotations)?;

        let unique = unique_name(&self.symbols.qualify(&name));
        let mut info = VariableInfo::new(name, unique, ty, location.clone());
        info.definition = id;
        info.annotations = annotations;

        for Assignment { key, value, location } in assignments {
            match key.as_str() {
                "Texture" => {
                    let texture = value.as_name().and_then(|n| match self.symbols.find(n) {
                        Some(Symbol::Variable { id, ty }) if ty.is_image() => Some(*id),
                        _ => None,
                    });
                    info.texture = texture.ok_or_else(|| invalid_value(&location, "texture"))?;
                }
                "MinFilter" => info.min_filter = filter(&value, &location)?,
                "MagFilter" => info.mag_filter = filter(&value, &location)?,
                "MipFilter" => info.mip_filter = filter(&value, &location)?,
                "AddressU" => info.address_u = address(&value, &location)?,
                "AddressV" => info.address_v = address(&value, &location)?,
                "AddressW" => info.address_w = address(&value, &location)?,
                "MinLOD" => info.min_lod = float(&value, &location)?,
                "MaxLOD" => info.max_lod = float(&value, &location)?,
                "MipLODBias" => info.lod_bias = float(&value, &location)?,
                "SRGBTexture" => {
                    info.srgb_texture = value.as_bool().ok_or_else(|| invalid_value(&location, "boolean"))?;
                }
                _ => return Err(unknown_state(&location, &key)),
            }
        }

        if !info.texture.is_some() {
            return Err(Error::property(
                location,
                codes::MISSING_STATE,
                format!("sampler '{}' is missing required 'Texture' property", info.name),
            ));
        }

        tracing::trace!(sampler = %info.unique_name, "declared sampler");
        self.samplers.push(info);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Techniques
    // ------------------------------------------------------------------

    pub(super) fn parse_technique(&mut self) -> Result<()> {
        let location = self.location();
        self.expect_keyword(Keyword::Technique)?;
        let name = self.expect_identifier()?;
        let annotations = self.parse_annotations()?;

        let mut passes = Vec::new();
        self.expect(Punct::LeftBrace)?;
        while !self.accept(Punct::RightBrace) {
            passes.push(self.parse_pass()?);
        }

        let unique = unique_name(&self.symbols.qualify(&name));
        tracing::debug!(technique = %unique, passes = passes.len(), "declared technique");
        self.techniques.push(TechniqueProperties {
            location,
            name,
            unique_name: unique,
            annotations,
            passes,
        });
        Ok(())
    }

    fn parse_pass(&mut self) -> Result<PassProperties> {
        let location = self.location();
        self.expect_keyword(Keyword::Pass)?;
        let mut pass = PassProperties::new(location.clone());
        if self.peek_identifier().is_some() {
            pass.name = Some(self.expect_identifier()?);
        }
        pass.annotations = self.parse_annotations()?;

        if !self.peek(Punct::LeftBrace) {
            return Err(self.unexpected("'{'"));
        }
        for Assignment { key, value, location } in self.parse_assignments()? {
            self.apply_pass_state(&mut pass, &key, &value, &location)?;
        }

        if !pass.vertex_shader.is_some() || !pass.pixel_shader.is_some() {
            return Err(Error::property(
                location,
                codes::MISSING_STATE,
                "pass is missing 'VertexShader' or 'PixelShader' property",
            ));
        }
        Ok(pass)
    }

    fn apply_pass_state(
        &mut self,
        pass: &mut PassProperties,
        key: &str,
        value: &StateValue,
        location: &Location,
    ) -> Result<()> {
        let enumerated = |ok: bool| if ok { Ok(()) } else { Err(invalid_value(location, "state constant")) };

        if let Some(index) = render_target_index(key) {
            let target = value.as_name().and_then(|n| match self.symbols.find(n) {
                Some(Symbol::Variable { id, ty }) if ty.is_image() => Some(*id),
                _ => None,
            });
            pass.render_targets[index] = target.ok_or_else(|| invalid_value(location, "texture"))?;
            return Ok(());
        }

        match key {
            "VertexShader" => pass.vertex_shader = self.resolve_shader(value, execution_model::VERTEX, location)?,
            "PixelShader" => pass.pixel_shader = self.resolve_shader(value, execution_model::FRAGMENT, location)?,
            "ClearRenderTargets" => pass.clear_render_targets = boolean(value, location)?,
            "SRGBWriteEnable" => pass.srgb_write_enable = boolean(value, location)?,
            "BlendEnable" => pass.blend_enable = boolean(value, location)?,
            "StencilEnable" => pass.stencil_enable = boolean(value, location)?,
            "ColorWriteMask" | "RenderTargetWriteMask" => pass.color_write_mask = mask(value, location)?,
            "StencilReadMask" => pass.stencil_read_mask = mask(value, location)?,
            "StencilWriteMask" => pass.stencil_write_mask = mask(value, location)?,
            "StencilRef" => {
                pass.stencil_ref = value.as_uint().ok_or_else(|| invalid_value(location, "integer"))?;
            }
            "BlendOp" | "BlendOpAlpha" => {
                let op = value.as_enum(BlendOp::from_name, BlendOp::from_value);
                enumerated(op.is_some())?;
                if let Some(op) = op {
                    if key == "BlendOp" {
                        pass.blend_op = op;
                    } else {
                        pass.blend_op_alpha = op;
                    }
                }
            }
            "SrcBlend" | "DestBlend" | "SrcBlendAlpha" | "DestBlendAlpha" => {
                let factor = value.as_enum(BlendFactor::from_name, BlendFactor::from_value);
                enumerated(factor.is_some())?;
                if let Some(factor) = factor {
                    match key {
                        "SrcBlend" => pass.src_blend = factor,
                        "DestBlend" => pass.dest_blend = factor,
                        "SrcBlendAlpha" => pass.src_blend_alpha = factor,
                        _ => pass.dest_blend_alpha = factor,
                    }
                }
            }
            "StencilFunc" => {
                let func = value.as_enum(ComparisonFunc::from_name, ComparisonFunc::from_value);
                pass.stencil_func = func.ok_or_else(|| invalid_value(location, "comparison function"))?;
            }
            "StencilPass" | "StencilFail" | "StencilDepthFail" => {
                let op = value.as_enum(StencilOp::from_name, StencilOp::from_value);
                enumerated(op.is_some())?;
                if let Some(op) = op {
                    match key {
                        "StencilPass" => pass.stencil_pass = op,
                        "StencilFail" => pass.stencil_fail = op,
                        _ => pass.stencil_depth_fail = op,
                    }
                }
            }
            _ => return Err(unknown_state(location, key)),
        }
        Ok(())
    }

    /// Function named by a shader state, declared as an entry point once
    fn resolve_shader(&mut self, value: &StateValue, model: u32, location: &Location) -> Result<Id> {
        let Some(name) = value.as_name() else {
            return Err(invalid_value(location, "function name"));
        };
        let Some(&index) = self.symbols.find_functions(name).first() else {
            return Err(Error::name(
                location.clone(),
                codes::UNDECLARED,
                format!("'{}': undeclared identifier", name),
            ));
        };
        self.called_functions.push((index, location.clone()));

        let function = &self.functions[index];
        let definition = function.definition;
        let entry_name = function.name.clone();
        let exists = self.ir.section(SectionId::Entries).iter().any(|node| {
            node.op == Op::EntryPoint
                && node.operands.first() == Some(&model)
                && node.operand_id(1) == definition
        });
        if !exists {
            tracing::debug!(entry = %entry_name, model, "registered entry point");
            self.ir
                .add_node_without_result(SectionId::Entries, location, Op::EntryPoint)
                .add(model)
                .add_id(definition)
                .add_string(&entry_name);
        }
        Ok(definition)
    }
}

/// `RenderTarget` and `RenderTarget0` .. `RenderTarget7`
fn render_target_index(key: &str) -> Option<usize> {
    let suffix = key.strip_prefix("RenderTarget")?;
    if suffix.is_empty() {
        return Some(0);
    }
    match suffix.parse::<usize>() {
        Ok(index) if index < 8 && suffix.len() == 1 => Some(index),
        _ => None,
    }
}

fn positive(value: &StateValue, location: &Location) -> Result<u32> {
    match value.as_uint() {
        Some(n) if n > 0 => Ok(n),
        _ => Err(invalid_value(location, "positive integer")),
    }
}

fn boolean(value: &StateValue, location: &Location) -> Result<bool> {
    value.as_bool().ok_or_else(|| invalid_value(location, "boolean"))
}

fn mask(value: &StateValue, location: &Location) -> Result<u8> {
    value
        .as_uint()
        .map(|m| (m & 0xFF) as u8)
        .ok_or_else(|| invalid_value(location, "integer"))
}

fn float(value: &StateValue, location: &Location) -> Result<f32> {
    value.as_float().ok_or_else(|| invalid_value(location, "number"))
}

fn filter(value: &StateValue, location: &Location) -> Result<FilterMode> {
    value
        .as_name()
        .and_then(|n| FilterMode::from_name(&n.to_uppercase()))
        .ok_or_else(|| invalid_value(location, "filter mode"))
}

fn address(value: &StateValue, location: &Location) -> Result<AddressMode> {
    value
        .as_name()
        .and_then(|n| AddressMode::from_name(&n.to_uppercase()))
        .ok_or_else(|| invalid_value(location, "address mode"))
}

fn unknown_state(location: &Location, key: &str) -> Error {
    Error::property(
        location.clone(),
        codes::UNKNOWN_STATE,
        format!("unrecognized state '{}'", key),
    )
}

fn invalid_value(location: &Location, expected: &str) -> Error {
    Error::property(
        location.clone(),
        codes::TYPE_MISMATCH,
        format!("invalid state value, expected {}", expected),
    )
}
