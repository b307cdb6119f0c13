/* class_data_item and code_item */

use serde::Serialize;

use crate::dex::cursor::Cursor;
use crate::dex::error::DexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedField
{
    /// Absolute index into field_ids.
    pub field_idx: u32,
    pub access_flags: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedMethod
{
    /// Absolute index into method_ids.
    pub method_idx: u32,
    pub access_flags: u32,
    /// 0 for abstract and native methods.
    pub code_off: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassDataItem
{
    pub static_fields: Vec<EncodedField>,
    pub instance_fields: Vec<EncodedField>,
    pub direct_methods: Vec<EncodedMethod>,
    pub virtual_methods: Vec<EncodedMethod>,
}

impl ClassDataItem
{
    /// Read a class_data_item at the cursor. Member indices are stored as
    /// deltas from the previous entry of the same list and are summed back
    /// into absolute indices here.
    pub fn read(cursor: &mut Cursor<'_>) -> Result<ClassDataItem, DexError>
    {
        let static_fields_size = cursor.read_uleb128_u32()? as usize;
        let instance_fields_size = cursor.read_uleb128_u32()? as usize;
        let direct_methods_size = cursor.read_uleb128_u32()? as usize;
        let virtual_methods_size = cursor.read_uleb128_u32()? as usize;

        let static_fields = read_fields(cursor, static_fields_size)
            .map_err(|e| DexError::with_context(e, "static fields"))?;
        let instance_fields = read_fields(cursor, instance_fields_size)
            .map_err(|e| DexError::with_context(e, "instance fields"))?;
        let direct_methods = read_methods(cursor, direct_methods_size)
            .map_err(|e| DexError::with_context(e, "direct methods"))?;
        let virtual_methods = read_methods(cursor, virtual_methods_size)
            .map_err(|e| DexError::with_context(e, "virtual methods"))?;

        Ok(ClassDataItem { static_fields, instance_fields, direct_methods, virtual_methods })
    }
}

fn next_index(previous: u32, delta: u32) -> Result<u32, DexError>
{
    match previous.checked_add(delta)
    {
        Some(idx) => Ok(idx),
        None => fail!(Overflow => "member index delta {} overflows after index {}", delta, previous),
    }
}

fn read_fields(cursor: &mut Cursor<'_>, count: usize) -> Result<Vec<EncodedField>, DexError>
{
    // two ULEB128s per entry, at least one byte each
    cursor.check_count(count, 2)?;
    let mut fields = Vec::with_capacity(count);
    let mut idx = 0u32;
    for _ in 0..count
    {
        idx = next_index(idx, cursor.read_uleb128_u32()?)?;
        let access_flags = cursor.read_uleb128_u32()?;
        fields.push(EncodedField { field_idx: idx, access_flags });
    }
    Ok(fields)
}

fn read_methods(cursor: &mut Cursor<'_>, count: usize) -> Result<Vec<EncodedMethod>, DexError>
{
    cursor.check_count(count, 3)?;
    let mut methods = Vec::with_capacity(count);
    let mut idx = 0u32;
    for _ in 0..count
    {
        idx = next_index(idx, cursor.read_uleb128_u32()?)?;
        let access_flags = cursor.read_uleb128_u32()?;
        let code_off = cursor.read_uleb128_u32()?;
        methods.push(EncodedMethod { method_idx: idx, access_flags, code_off });
    }
    Ok(methods)
}

/// code_item header plus the raw instruction payload. Try blocks and
/// exception handlers that follow the payload are not read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeItem
{
    pub registers_size: u16,
    pub ins_size: u16,
    pub outs_size: u16,
    pub tries_size: u16,
    pub debug_info_off: u32,
    /// `insns_size` code units, i.e. twice as many bytes.
    pub insns: Vec<u8>,
}

impl CodeItem
{
    pub fn read(cursor: &mut Cursor<'_>) -> Result<CodeItem, DexError>
    {
        let registers_size = cursor.read_u16()?;
        let ins_size = cursor.read_u16()?;
        let outs_size = cursor.read_u16()?;
        let tries_size = cursor.read_u16()?;
        let debug_info_off = cursor.read_u32()?;
        let insns_size = cursor.read_u32()? as usize;
        cursor.check_count(insns_size, 2)?;
        let insns = cursor.read_bytes(insns_size * 2)?.to_vec();

        Ok(CodeItem { registers_size, ins_size, outs_size, tries_size, debug_info_off, insns })
    }

    /// Number of 16-bit code units in the payload.
    pub fn insns_size(&self) -> usize
    {
        self.insns.len() / 2
    }
}
