//! IR builder: identifier allocation, sections, type interning and casts

use super::node::{Id, Node, SectionId};
use super::op::{Op, StorageClass};
use crate::effect::FunctionInfo;
use crate::error::{Error, Result};
use crate::lexer::Location;
use crate::types::{NumericKind, Qualifiers, TypeInfo};
use std::collections::HashMap;

/// `TypeImage` dimensionality operand for 2D textures
const DIM_2D: u32 = 1;
/// `TypeImage` format operand for RGBA8
const IMAGE_FORMAT_RGBA8: u32 = 4;

/// Builds the sectioned IR of one compile
///
/// Identifiers come from a single counter starting at [`Id::FIRST`] and are
/// never reused. Every node with a result can be found again through
/// [`IrBuilder::lookup`] until [`IrBuilder::reset`] is called.
///
/// Matrices are stored as `rows` row vectors of `cols` components each.
#[derive(Debug)]
pub struct IrBuilder {
    next_id: u32,
    sections: [Vec<Node>; SectionId::COUNT],
    /// id -> (section, position)
    index: Vec<Option<(SectionId, usize)>>,
    types: HashMap<TypeInfo, Id>,
    pointer_types: HashMap<(Id, StorageClass), Id>,
    function_types: HashMap<(Id, Vec<Id>), Id>,
    glsl_import: Id,
}

impl Default for IrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IrBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self {
            next_id: Id::FIRST.0,
            sections: Default::default(),
            index: Vec::new(),
            types: HashMap::new(),
            pointer_types: HashMap::new(),
            function_types: HashMap::new(),
            glsl_import: Id::NONE,
        }
    }

    /// Drop all nodes and restart identifier allocation
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Nodes of one section in emission order
    pub fn section(&self, section: SectionId) -> &[Node] {
        &self.sections[section.index()]
    }

    /// Number of identifiers handed out so far
    pub fn id_count(&self) -> u32 {
        self.next_id - Id::FIRST.0
    }

    /// Allocate an identifier without creating a node for it yet
    pub fn reserve_id(&mut self) -> Id {
        let id = Id(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a node with a fresh result identifier
    pub fn add_node(&mut self, section: SectionId, location: &Location, op: Op, result_type: Id) -> Id {
        let id = self.reserve_id();
        self.add_node_with_id(section, location, op, result_type, id);
        id
    }

    /// Append a node whose result identifier was obtained from [`Self::reserve_id`]
    pub fn add_node_with_id(
        &mut self,
        section: SectionId,
        location: &Location,
        op: Op,
        result_type: Id,
        id: Id,
    ) -> &mut Node {
        let slot = id.0 as usize;
        if self.index.len() <= slot {
            self.index.resize(slot + 1, None);
        }
        let position = self.sections[section.index()].len();
        self.index[slot] = Some((section, position));

        let node = self.push(section, location, op);
        node.result = id;
        node.result_type = result_type;
        node
    }

    /// Append a side-effect-only node
    pub fn add_node_without_result(&mut self, section: SectionId, location: &Location, op: Op) -> &mut Node {
        self.push(section, location, op)
    }

    /// Append a node with operands and return its result identifier
    pub fn emit(
        &mut self,
        section: SectionId,
        location: &Location,
        op: Op,
        result_type: Id,
        operands: &[u32],
    ) -> Id {
        let id = self.add_node(section, location, op, result_type);
        if let Some(node) = self.lookup_mut(id) {
            node.operands.extend_from_slice(operands);
        }
        id
    }

    fn push(&mut self, section: SectionId, location: &Location, op: Op) -> &mut Node {
        let nodes = &mut self.sections[section.index()];
        nodes.push(Node {
            op,
            result: Id::NONE,
            result_type: Id::NONE,
            operands: Vec::new(),
            index: nodes.len(),
            location: location.clone(),
        });
        let last = nodes.len() - 1;
        &mut nodes[last]
    }

    /// Resolve an identifier to its node
    pub fn lookup(&self, id: Id) -> Option<&Node> {
        let (section, position) = (*self.index.get(id.0 as usize)?)?;
        self.sections[section.index()].get(position)
    }

    /// Resolve an identifier to its node for patching operands
    pub fn lookup_mut(&mut self, id: Id) -> Option<&mut Node> {
        let (section, position) = (*self.index.get(id.0 as usize)?)?;
        self.sections[section.index()].get_mut(position)
    }

    /// Section owning an identifier
    pub fn section_of(&self, id: Id) -> Option<SectionId> {
        self.index.get(id.0 as usize).copied().flatten().map(|(s, _)| s)
    }

    /// Intern the IR type node for `info`
    ///
    /// Structurally equal types (qualifiers aside) always map to the same
    /// identifier. Struct types return their definition. Pointers use the
    /// `Function` storage class.
    pub fn convert_type(&mut self, info: &TypeInfo) -> Result<Id> {
        let key = info.unqualified();
        if let Some(&id) = self.types.get(&key) {
            return Ok(id);
        }

        let unsupported = || Error::UnsupportedType { ty: info.to_string() };
        let location = Location::default();
        let section = SectionId::Variables;

        let id = if key.is_pointer {
            return self.convert_pointer_type(&key.value(), StorageClass::Function);
        } else if key.is_array() {
            let element = self.convert_type(&key.element())?;
            if key.array_length > 0 {
                let length = self.convert_constant(&TypeInfo::uint(1, 1), key.array_length as u32)?;
                self.emit(section, &location, Op::TypeArray, Id::NONE, &[element.0, length.0])
            } else {
                self.emit(section, &location, Op::TypeRuntimeArray, Id::NONE, &[element.0])
            }
        } else if key.is_numeric() && key.is_vector() {
            let element = self.convert_type(&key.scalar())?;
            self.emit(section, &location, Op::TypeVector, Id::NONE, &[element.0, key.rows as u32])
        } else if key.is_numeric() && key.is_matrix() {
            let row = self.convert_type(&key.with_shape(key.cols, 1))?;
            self.emit(section, &location, Op::TypeMatrix, Id::NONE, &[row.0, key.rows as u32])
        } else {
            match key.numeric_kind() {
                Some(NumericKind::Bool) => self.add_node(section, &location, Op::TypeBool, Id::NONE),
                Some(NumericKind::Int) | Some(NumericKind::Uint) => self.emit(
                    section,
                    &location,
                    Op::TypeInt,
                    Id::NONE,
                    &[key.size as u32, key.is_signed as u32],
                ),
                Some(NumericKind::Float) => {
                    self.emit(section, &location, Op::TypeFloat, Id::NONE, &[key.size as u32])
                }
                None if key.is_void() => self.add_node(section, &location, Op::TypeVoid, Id::NONE),
                None if key.is_struct() => {
                    if !key.definition.is_some() {
                        return Err(unsupported());
                    }
                    key.definition
                }
                None if key.is_image() => {
                    let sampled = self.convert_type(&TypeInfo::float(1, 1))?;
                    self.emit(
                        section,
                        &location,
                        Op::TypeImage,
                        Id::NONE,
                        &[sampled.0, DIM_2D, 0, 0, 0, 1, IMAGE_FORMAT_RGBA8],
                    )
                }
                None if key.is_sampled_image() => {
                    let image = self.convert_type(&TypeInfo::texture())?;
                    self.emit(section, &location, Op::TypeSampledImage, Id::NONE, &[image.0])
                }
                None => return Err(unsupported()),
            }
        };

        self.types.insert(key, id);
        Ok(id)
    }

    /// Intern a pointer type with an explicit storage class
    pub fn convert_pointer_type(&mut self, pointee: &TypeInfo, storage: StorageClass) -> Result<Id> {
        let pointee = self.convert_type(&pointee.value())?;
        if let Some(&id) = self.pointer_types.get(&(pointee, storage)) {
            return Ok(id);
        }
        let id = self.emit(
            SectionId::Variables,
            &Location::default(),
            Op::TypePointer,
            Id::NONE,
            &[storage as u32, pointee.0],
        );
        self.pointer_types.insert((pointee, storage), id);
        Ok(id)
    }

    /// Intern the signature type of a function
    ///
    /// `out` and `inout` parameters are passed by pointer.
    pub fn convert_function_type(&mut self, info: &FunctionInfo) -> Result<Id> {
        let return_type = self.convert_type(&info.return_type)?;
        let mut parameters = Vec::with_capacity(info.parameter_list.len());
        for param in &info.parameter_list {
            let id = if param.has(Qualifiers::OUT) {
                self.convert_type(&param.pointer())?
            } else {
                self.convert_type(param)?
            };
            parameters.push(id);
        }

        let key = (return_type, parameters);
        if let Some(&id) = self.function_types.get(&key) {
            return Ok(id);
        }

        let mut operands = vec![return_type.0];
        operands.extend(key.1.iter().map(|id| id.0));
        let id = self.emit(
            SectionId::Variables,
            &Location::default(),
            Op::TypeFunction,
            Id::NONE,
            &operands,
        );
        self.function_types.insert(key, id);
        Ok(id)
    }

    /// Create a scalar constant from its raw 32-bit value
    ///
    /// Zero becomes `ConstantNull`, a non-zero bool `ConstantTrue`.
    pub fn convert_constant(&mut self, ty: &TypeInfo, value: u32) -> Result<Id> {
        let type_id = self.convert_type(&ty.value())?;
        let location = Location::default();
        Ok(if value == 0 {
            self.add_node(SectionId::Variables, &location, Op::ConstantNull, type_id)
        } else if ty.is_boolean() {
            self.add_node(SectionId::Variables, &location, Op::ConstantTrue, type_id)
        } else {
            self.emit(SectionId::Variables, &location, Op::Constant, type_id, &[value])
        })
    }

    /// Create a composite constant from constant elements
    pub fn convert_composite_constant(&mut self, ty: &TypeInfo, elements: &[Id]) -> Result<Id> {
        let type_id = self.convert_type(&ty.value())?;
        let operands: Vec<u32> = elements.iter().map(|id| id.0).collect();
        Ok(self.emit(
            SectionId::Variables,
            &Location::default(),
            Op::ConstantComposite,
            type_id,
            &operands,
        ))
    }

    /// Whether `id` names a compile-time constant
    pub fn is_constant(&self, id: Id) -> bool {
        self.lookup(id).map(|n| n.op.is_constant()).unwrap_or(false)
    }

    /// Raw value of a scalar constant
    pub fn constant_value(&self, id: Id) -> Option<u32> {
        let node = self.lookup(id)?;
        match node.op {
            Op::ConstantNull | Op::ConstantFalse => Some(0),
            Op::ConstantTrue => Some(1),
            Op::Constant => node.operands.first().copied(),
            _ => None,
        }
    }

    /// Identifier of the `GLSL.std.450` extended instruction set import
    pub fn glsl_import(&mut self) -> Id {
        if !self.glsl_import.is_some() {
            let id = self.add_node(SectionId::Entries, &Location::default(), Op::ExtInstImport, Id::NONE);
            if let Some(node) = self.lookup_mut(id) {
                node.add_string("GLSL.std.450");
            }
            self.glsl_import = id;
        }
        self.glsl_import
    }

    /// Convert `input` from type `from` to type `to`
    ///
    /// Handles element kind changes, scalar splats and truncation to fewer
    /// components. Constant inputs are folded into new constants. Legality is
    /// checked by the caller.
    pub fn add_cast_node(
        &mut self,
        section: SectionId,
        location: &Location,
        from: &TypeInfo,
        to: &TypeInfo,
        input: Id,
    ) -> Result<Id> {
        let from = from.value().unqualified();
        let to = to.value().unqualified();
        if from == to {
            return Ok(input);
        }
        let unsupported = || Error::UnsupportedType {
            ty: format!("{} to {}", from, to),
        };
        if !from.is_numeric() || !to.is_numeric() || from.is_array() || to.is_array() {
            return Err(unsupported());
        }

        if let Some(folded) = self.fold_cast(&from, &to, input)? {
            return Ok(folded);
        }

        let mut value = input;
        let mut current = from;

        let splat = current.components() == 1 && to.components() > 1;
        if !splat && (current.rows, current.cols) != (to.rows, to.cols) {
            if to.components() > current.components() {
                return Err(unsupported());
            }
            value = self.truncate(section, location, &current, to.rows, to.cols, value)?;
            current = current.with_shape(to.rows, to.cols);
        }

        let converted = to.with_shape(current.rows, current.cols);
        value = self.convert_kind(section, location, &current, &converted, value)?;
        current = converted;

        if splat {
            value = self.splat(section, location, &current, &to, value)?;
        }
        Ok(value)
    }

    fn truncate(
        &mut self,
        section: SectionId,
        location: &Location,
        from: &TypeInfo,
        rows: u8,
        cols: u8,
        value: Id,
    ) -> Result<Id> {
        let target = from.with_shape(rows, cols);
        let target_type = self.convert_type(&target)?;

        if from.is_matrix() {
            if rows == 1 && cols == 1 {
                return Ok(self.emit(section, location, Op::CompositeExtract, target_type, &[value.0, 0, 0]));
            }
            if !target.is_matrix() {
                return Err(Error::UnsupportedType {
                    ty: format!("{} to {}", from, target),
                });
            }
            let row_from = from.with_shape(from.cols, 1);
            let row_type = self.convert_type(&row_from)?;
            let mut row_ids = Vec::with_capacity(rows as usize);
            for r in 0..rows as u32 {
                let row = self.emit(section, location, Op::CompositeExtract, row_type, &[value.0, r]);
                let row = if cols < from.cols {
                    self.truncate(section, location, &row_from, cols, 1, row)?
                } else {
                    row
                };
                row_ids.push(row.0);
            }
            return Ok(self.emit(section, location, Op::CompositeConstruct, target_type, &row_ids));
        }

        if rows == 1 {
            return Ok(self.emit(section, location, Op::CompositeExtract, target_type, &[value.0, 0]));
        }
        let mut operands = vec![value.0, value.0];
        operands.extend(0..rows as u32);
        Ok(self.emit(section, location, Op::VectorShuffle, target_type, &operands))
    }

    fn convert_kind(
        &mut self,
        section: SectionId,
        location: &Location,
        from: &TypeInfo,
        to: &TypeInfo,
        value: Id,
    ) -> Result<Id> {
        let (Some(src), Some(dst)) = (from.numeric_kind(), to.numeric_kind()) else {
            return Err(Error::UnsupportedType {
                ty: format!("{} to {}", from, to),
            });
        };
        if src == dst && from.size == to.size {
            return Ok(value);
        }
        let to_type = self.convert_type(to)?;

        use NumericKind::*;
        let id = match (src, dst) {
            (Float, Int) => self.emit(section, location, Op::ConvertFToS, to_type, &[value.0]),
            (Float, Uint) => self.emit(section, location, Op::ConvertFToU, to_type, &[value.0]),
            (Int, Float) => self.emit(section, location, Op::ConvertSToF, to_type, &[value.0]),
            (Uint, Float) => self.emit(section, location, Op::ConvertUToF, to_type, &[value.0]),
            (Float, Float) => self.emit(section, location, Op::FConvert, to_type, &[value.0]),
            (Int, Int) => self.emit(section, location, Op::SConvert, to_type, &[value.0]),
            (Uint, Uint) => self.emit(section, location, Op::UConvert, to_type, &[value.0]),
            (Int, Uint) | (Uint, Int) => {
                let resized = if from.size != to.size {
                    let mut intermediate = *to;
                    intermediate.is_signed = from.is_signed;
                    let intermediate_type = self.convert_type(&intermediate)?;
                    let op = if from.is_signed { Op::SConvert } else { Op::UConvert };
                    self.emit(section, location, op, intermediate_type, &[value.0])
                } else {
                    value
                };
                self.emit(section, location, Op::Bitcast, to_type, &[resized.0])
            }
            (_, Bool) => {
                let zero = self.convert_constant(from, 0)?;
                let op = if src == Float { Op::FOrdNotEqual } else { Op::INotEqual };
                self.emit(section, location, op, to_type, &[value.0, zero.0])
            }
            (Bool, _) => {
                let one = self.one_constant(to)?;
                let zero = self.convert_constant(to, 0)?;
                self.emit(section, location, Op::Select, to_type, &[value.0, one.0, zero.0])
            }
        };
        Ok(id)
    }

    fn splat(
        &mut self,
        section: SectionId,
        location: &Location,
        scalar: &TypeInfo,
        to: &TypeInfo,
        value: Id,
    ) -> Result<Id> {
        let to_type = self.convert_type(to)?;
        if to.is_matrix() {
            let row_type = scalar.with_shape(to.cols, 1);
            let row = self.splat(section, location, scalar, &row_type, value)?;
            let operands = vec![row.0; to.rows as usize];
            return Ok(self.emit(section, location, Op::CompositeConstruct, to_type, &operands));
        }
        let operands = vec![value.0; to.rows as usize];
        Ok(self.emit(section, location, Op::CompositeConstruct, to_type, &operands))
    }

    /// Constant with value one in every component of `ty`
    pub(crate) fn one_constant(&mut self, ty: &TypeInfo) -> Result<Id> {
        let scalar = ty.scalar();
        let bits = match scalar.numeric_kind() {
            Some(NumericKind::Float) if scalar.size == 16 => 0x3C00,
            Some(NumericKind::Float) => 1.0f32.to_bits(),
            _ => 1,
        };
        let one = self.convert_constant(&scalar, bits)?;
        self.splat_constant(&scalar, ty, one)
    }

    fn splat_constant(&mut self, scalar: &TypeInfo, to: &TypeInfo, value: Id) -> Result<Id> {
        if to.components() == 1 {
            return Ok(value);
        }
        if to.is_matrix() {
            let row = self.splat_constant(scalar, &scalar.with_shape(to.cols, 1), value)?;
            return self.convert_composite_constant(to, &vec![row; to.rows as usize]);
        }
        self.convert_composite_constant(to, &vec![value; to.rows as usize])
    }

    /// Fold a cast of a constant, if the shapes allow it
    fn fold_cast(&mut self, from: &TypeInfo, to: &TypeInfo, input: Id) -> Result<Option<Id>> {
        if from.is_matrix() || to.is_matrix() && from.components() > 1 {
            return Ok(None);
        }
        let (Some(src), Some(dst)) = (from.numeric_kind(), to.numeric_kind()) else {
            return Ok(None);
        };

        let elements: Vec<Id> = match self.lookup(input) {
            Some(node) if node.op == Op::ConstantComposite => {
                node.operands.iter().map(|&w| Id(w)).collect()
            }
            Some(node) if node.op.is_constant() => vec![input],
            _ => return Ok(None),
        };
        if elements.len() > 1 && to.components() as usize > elements.len() {
            return Ok(None);
        }
        let count = if elements.len() == 1 {
            1
        } else {
            (to.components() as usize).min(elements.len())
        };

        let scalar_to = to.scalar();
        let mut converted = Vec::with_capacity(count);
        for &element in &elements[..count] {
            let Some(bits) = self.constant_value(element) else {
                return Ok(None);
            };
            let bits = if is_half(from) { f16_to_f32(bits as u16).to_bits() } else { bits };
            let bits = convert_bits(bits, src, dst);
            let bits = if is_half(to) { f32_to_f16(f32::from_bits(bits)) as u32 } else { bits };
            converted.push(self.convert_constant(&scalar_to, bits)?);
        }

        let folded = if converted.len() == 1 {
            self.splat_constant(&scalar_to, to, converted[0])?
        } else {
            self.convert_composite_constant(to, &converted)?
        };
        Ok(Some(folded))
    }
}

/// Reinterpret and convert a raw scalar value between element kinds
fn convert_bits(bits: u32, from: NumericKind, to: NumericKind) -> u32 {
    use NumericKind::*;
    match (from, to) {
        (a, b) if a == b => bits,
        (Int, Uint) | (Uint, Int) => bits,
        (_, Bool) if from == Float => (f32::from_bits(bits) != 0.0) as u32,
        (_, Bool) => (bits != 0) as u32,
        (Bool, Float) => if bits != 0 { 1.0f32.to_bits() } else { 0 },
        (Bool, _) => (bits != 0) as u32,
        (Int, Float) => (bits as i32 as f32).to_bits(),
        (Uint, Float) => (bits as f32).to_bits(),
        (Float, Int) => f32::from_bits(bits) as i32 as u32,
        (Float, Uint) => f32::from_bits(bits) as u32,
        _ => bits,
    }
}

fn is_half(ty: &TypeInfo) -> bool {
    ty.numeric_kind() == Some(NumericKind::Float) && ty.size == 16
}

/// IEEE 754 binary32 to binary16, rounding to nearest even
fn f32_to_f16(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exponent = ((bits >> 23) & 0xFF) as i32;
    let mantissa = bits & 0x007F_FFFF;

    if exponent == 0xFF {
        let nan = if mantissa != 0 { 0x0200 } else { 0 };
        return sign | 0x7C00 | nan;
    }

    let half_exponent = exponent - 127 + 15;
    if half_exponent >= 0x1F {
        return sign | 0x7C00;
    }
    if half_exponent <= 0 {
        // Subnormal result
        if half_exponent < -10 {
            return sign;
        }
        let mantissa = mantissa | 0x0080_0000;
        let shift = (14 - half_exponent) as u32;
        let mut half = mantissa >> shift;
        let remainder = mantissa & ((1 << shift) - 1);
        let halfway = 1 << (shift - 1);
        if remainder > halfway || (remainder == halfway && half & 1 != 0) {
            half += 1;
        }
        return sign | half as u16;
    }

    // A carry out of the mantissa rolls into the exponent, up to infinity.
    let mut half = ((half_exponent as u32) << 10) | (mantissa >> 13);
    let remainder = mantissa & 0x1FFF;
    if remainder > 0x1000 || (remainder == 0x1000 && half & 1 != 0) {
        half += 1;
    }
    sign | half as u16
}

/// IEEE 754 binary16 to binary32, always exact
fn f16_to_f32(half: u16) -> f32 {
    let negative = half & 0x8000 != 0;
    let exponent = ((half >> 10) & 0x1F) as u32;
    let mantissa = (half & 0x03FF) as u32;
    let sign = if negative { 0x8000_0000 } else { 0 };
    match exponent {
        0 => {
            let magnitude = mantissa as f32 / 16_777_216.0;
            if negative { -magnitude } else { magnitude }
        }
        0x1F => f32::from_bits(sign | 0x7F80_0000 | (mantissa << 13)),
        _ => f32::from_bits(sign | ((exponent + 127 - 15) << 23) | (mantissa << 13)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_conversion() {
        assert_eq!(f32_to_f16(1.0), 0x3C00);
        assert_eq!(f32_to_f16(0.5), 0x3800);
        assert_eq!(f32_to_f16(-2.0), 0xC000);
        assert_eq!(f32_to_f16(65504.0), 0x7BFF);
        assert_eq!(f32_to_f16(65520.0), 0x7C00);
        assert_eq!(f32_to_f16(1.0e-8), 0);
        assert_eq!(f32_to_f16(2.0f32.powi(-24)), 0x0001);
        // 1 + 2^-11 sits halfway between 0x3C00 and 0x3C01
        assert_eq!(f32_to_f16(1.0 + 2.0f32.powi(-11)), 0x3C00);
        assert_eq!(f32_to_f16(f32::INFINITY), 0x7C00);

        assert_eq!(f16_to_f32(0x3C01), 1.0 + 2.0f32.powi(-10));
        assert_eq!(f16_to_f32(0x0001), 2.0f32.powi(-24));
        assert_eq!(f16_to_f32(0xC000), -2.0);
        assert!(f16_to_f32(0x7E00).is_nan());
    }

    #[test]
    fn test_half_constants_fold() {
        let mut b = IrBuilder::new();
        let loc = Location::default();
        let one = b.convert_constant(&TypeInfo::float(1, 1), 1.0f32.to_bits()).unwrap();
        let half = b
            .add_cast_node(SectionId::Functions, &loc, &TypeInfo::float(1, 1), &TypeInfo::half(1, 1), one)
            .unwrap();
        assert_eq!(b.constant_value(half), Some(0x3C00));

        let back = b
            .add_cast_node(SectionId::Functions, &loc, &TypeInfo::half(1, 1), &TypeInfo::int(1, 1), half)
            .unwrap();
        assert_eq!(b.constant_value(back), Some(1));
        assert!(b.section(SectionId::Functions).is_empty());
    }

    #[test]
    fn test_ids_start_at_100_and_resolve() {
        let mut b = IrBuilder::new();
        let loc = Location::default();
        let ty = b.convert_type(&TypeInfo::float(1, 1)).unwrap();
        assert_eq!(ty, Id(100));
        let id = b.add_node(SectionId::Functions, &loc, Op::FAdd, ty);
        let node = b.lookup(id).unwrap();
        assert_eq!(node.op, Op::FAdd);
        assert_eq!(node.result_type, ty);
        assert_eq!(b.section_of(id), Some(SectionId::Functions));
    }

    #[test]
    fn test_type_interning_ignores_qualifiers() {
        let mut b = IrBuilder::new();
        let plain = TypeInfo::float(3, 1);
        let mut qualified = plain;
        qualified.qualifiers = Qualifiers::CONST | Qualifiers::STATIC;
        let a = b.convert_type(&plain).unwrap();
        let c = b.convert_type(&qualified).unwrap();
        assert_eq!(a, c);

        let mut two = plain;
        two.array_length = 2;
        let mut three = plain;
        three.array_length = 3;
        assert_ne!(b.convert_type(&two).unwrap(), b.convert_type(&three).unwrap());
    }

    #[test]
    fn test_composite_types_reference_elements() {
        let mut b = IrBuilder::new();
        let matrix = b.convert_type(&TypeInfo::float(4, 3)).unwrap();
        let row = b.convert_type(&TypeInfo::float(3, 1)).unwrap();
        let node = b.lookup(matrix).unwrap();
        assert_eq!(node.op, Op::TypeMatrix);
        assert_eq!(node.operands, vec![row.0, 4]);
    }

    #[test]
    fn test_unsupported_types_fail() {
        let mut b = IrBuilder::new();
        assert!(b.convert_type(&TypeInfo::string()).is_err());
        assert!(b.convert_type(&TypeInfo::structure(Id::NONE)).is_err());
    }

    #[test]
    fn test_constants() {
        let mut b = IrBuilder::new();
        let zero = b.convert_constant(&TypeInfo::int(1, 1), 0).unwrap();
        let five = b.convert_constant(&TypeInfo::int(1, 1), 5).unwrap();
        assert_eq!(b.lookup(zero).unwrap().op, Op::ConstantNull);
        assert_eq!(b.lookup(five).unwrap().op, Op::Constant);
        assert_eq!(b.constant_value(five), Some(5));
        assert!(b.is_constant(five));
    }

    #[test]
    fn test_cast_folds_constants() {
        let mut b = IrBuilder::new();
        let loc = Location::default();
        let two = b.convert_constant(&TypeInfo::int(1, 1), 2).unwrap();
        let cast = b
            .add_cast_node(SectionId::Functions, &loc, &TypeInfo::int(1, 1), &TypeInfo::float(3, 1), two)
            .unwrap();
        let node = b.lookup(cast).unwrap();
        assert_eq!(node.op, Op::ConstantComposite);
        let first = node.operand_id(0);
        assert_eq!(b.constant_value(first), Some(2.0f32.to_bits()));
        assert!(b.section(SectionId::Functions).is_empty());
    }

    #[test]
    fn test_cast_emits_conversion() {
        let mut b = IrBuilder::new();
        let loc = Location::default();
        let float = b.convert_type(&TypeInfo::float(1, 1)).unwrap();
        let value = b.add_node(SectionId::Functions, &loc, Op::Undef, float);
        let cast = b
            .add_cast_node(SectionId::Functions, &loc, &TypeInfo::float(1, 1), &TypeInfo::int(1, 1), value)
            .unwrap();
        assert_eq!(b.lookup(cast).unwrap().op, Op::ConvertFToS);

        let vector = b.convert_type(&TypeInfo::float(4, 1)).unwrap();
        let v = b.add_node(SectionId::Functions, &loc, Op::Undef, vector);
        let t = b
            .add_cast_node(SectionId::Functions, &loc, &TypeInfo::float(4, 1), &TypeInfo::float(2, 1), v)
            .unwrap();
        assert_eq!(b.lookup(t).unwrap().op, Op::VectorShuffle);
    }

    #[test]
    fn test_reserved_ids() {
        let mut b = IrBuilder::new();
        let label = b.reserve_id();
        assert!(b.lookup(label).is_none());
        b.add_node_with_id(SectionId::Functions, &Location::default(), Op::Label, Id::NONE, label);
        assert_eq!(b.lookup(label).unwrap().op, Op::Label);
    }
}
