//! Instruction stream decoding.
//!
//! Each instruction becomes an [`Instruction`] whose operands are normalized to
//! `i64`: register numbers, table indices, branch offsets and literals, in
//! the order the encoding lays them out. Register lists of invoke and
//! filled-new-array forms come first, followed by the referenced table index.

use log::trace;
use serde::Serialize;
use std::fmt;

use crate::dex::cursor::Cursor;
use crate::dex::error::DexError;
use crate::dex::opcodes::{opcode_info, InstructionType, Opcode, OperandType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    /// Byte offset of the opcode within the method's instruction payload.
    pub offset: usize,
    pub opcode: u8,
    pub instruction_type: InstructionType,
    pub operand_type: OperandType,
    pub operands: Vec<i64>,
}

impl Instruction {
    pub fn op(&self) -> Option<Opcode> {
        Opcode::from_byte(self.opcode)
    }

    pub fn is(&self, opcode: Opcode) -> bool {
        self.opcode == opcode.byte()
    }

    pub fn is_invocation(&self) -> bool {
        self.instruction_type == InstructionType::Invocation
    }

    /// For invocations: the method_ids index of the callee.
    pub fn method_index(&self) -> Option<u32> {
        if !self.is_invocation() {
            return None;
        }
        self.operands.last().map(|idx| *idx as u32)
    }

    /// For invocations: the argument registers, receiver included.
    pub fn argument_registers(&self) -> &[i64] {
        if !self.is_invocation() || self.operands.is_empty() {
            return &[];
        }
        &self.operands[..self.operands.len() - 1]
    }

    /// The literal loaded by a numeric `const*` instruction, read at its encoded width.
    pub fn literal(&self) -> Option<i64> {
        let raw = *self.operands.get(1)?;
        match self.op()? {
            Opcode::Const4 => Some((((raw as u8) << 4) as i8 >> 4) as i64),
            Opcode::Const16 => Some(raw as u16 as i16 as i64),
            Opcode::Const | Opcode::ConstHigh16 => Some(raw as u32 as i32 as i64),
            Opcode::ConstWide16 | Opcode::ConstWide32 | Opcode::ConstWide | Opcode::ConstWideHigh16 => Some(raw),
            _ => None,
        }
    }

    /// Length of the encoded instruction in bytes.
    pub fn len(&self) -> usize {
        let trailing = self.op().map(|op| op.trailing_units() * 2).unwrap_or(0);
        self.operand_type.instruction_len() + trailing
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op() {
            Some(op) => write!(f, "{}", op)?,
            None => write!(f, "unknown-0x{:02x}", self.opcode)?,
        }
        let mut sep = " ";
        for operand in &self.operands {
            write!(f, "{}{}", sep, operand)?;
            sep = ", ";
        }
        Ok(())
    }
}

fn reg_byte(cursor: &mut Cursor<'_>) -> Result<i64, DexError> {
    Ok(cursor.read_u8()? as i64)
}

fn short(cursor: &mut Cursor<'_>) -> Result<i64, DexError> {
    Ok(cursor.read_u16()? as i64)
}

fn uint(cursor: &mut Cursor<'_>) -> Result<i64, DexError> {
    Ok(cursor.read_u32()? as i64)
}

fn nibble_pair(cursor: &mut Cursor<'_>) -> Result<[i64; 2], DexError> {
    let b = cursor.read_u8()?;
    Ok([(b & 0x0f) as i64, (b >> 4) as i64])
}

/// `A|G BBBB F|E|D|C`: A registers, taken from C, D, E, F and then G.
fn register_array(cursor: &mut Cursor<'_>) -> Result<Vec<i64>, DexError> {
    let b = cursor.read_u8()?;
    let g = (b & 0x0f) as i64;
    let count = (b >> 4) as usize;
    let index = short(cursor)?;
    let mut word = cursor.read_u16()?;

    let mut operands = Vec::with_capacity(count.min(5) + 1);
    for i in 0..count.min(5) {
        if i == 4 {
            operands.push(g);
            break;
        }
        operands.push((word & 0x0f) as i64);
        word >>= 4;
    }
    operands.push(index);
    Ok(operands)
}

/// `AA BBBB CCCC`: registers CCCC .. CCCC+AA.
fn register_range(cursor: &mut Cursor<'_>) -> Result<Vec<i64>, DexError> {
    let count = cursor.read_u8()? as i64;
    let index = short(cursor)?;
    let first = short(cursor)?;
    let mut operands: Vec<i64> = (first..first + count).collect();
    operands.push(index);
    Ok(operands)
}

fn read_operands(cursor: &mut Cursor<'_>, operand_type: OperandType) -> Result<Vec<i64>, DexError> {
    let operands = match operand_type {
        OperandType::None | OperandType::Reg => vec![reg_byte(cursor)?],
        OperandType::TwoReg => nibble_pair(cursor)?.to_vec(),
        OperandType::RegShort => vec![reg_byte(cursor)?, short(cursor)?],
        OperandType::Short => {
            cursor.skip(1)?;
            vec![short(cursor)?]
        }
        OperandType::TwoShort => {
            cursor.skip(1)?;
            vec![short(cursor)?, short(cursor)?]
        }
        OperandType::TwoRegShort => {
            let [a, b] = nibble_pair(cursor)?;
            vec![a, b, short(cursor)?]
        }
        OperandType::Uint => {
            cursor.skip(1)?;
            vec![uint(cursor)?]
        }
        OperandType::RegUint => vec![reg_byte(cursor)?, uint(cursor)?],
        OperandType::RegUlong => vec![reg_byte(cursor)?, cursor.read_u64()? as i64],
        OperandType::ThreeReg => vec![reg_byte(cursor)?, reg_byte(cursor)?, reg_byte(cursor)?],
        OperandType::RegisterArray => register_array(cursor)?,
        OperandType::RegisterRange => register_range(cursor)?,
        OperandType::RegHigh32 => vec![reg_byte(cursor)?, short(cursor)? << 16],
        OperandType::RegHigh64 => vec![reg_byte(cursor)?, ((cursor.read_u16()? as u64) << 48) as i64],
        OperandType::RegWide16 => vec![reg_byte(cursor)?, cursor.read_u16()? as i16 as i64],
        OperandType::RegWide32 => vec![reg_byte(cursor)?, cursor.read_u32()? as i32 as i64],
    };
    Ok(operands)
}

/// Decode one instruction at the cursor.
pub fn decode_instruction(cursor: &mut Cursor<'_>) -> Result<Instruction, DexError> {
    let offset = cursor.position();
    let opcode = cursor.read_u8()?;
    let info = opcode_info(opcode);
    let operands = read_operands(cursor, info.operand_type)
        .map_err(|e| DexError::with_context(e, format!("operands of opcode 0x{:02x}", opcode)))?;
    if let Some(op) = info.opcode {
        cursor.skip(op.trailing_units() * 2)?;
    }

    Ok(Instruction {
        offset,
        opcode,
        instruction_type: info.instruction_type,
        operand_type: info.operand_type,
        operands,
    })
}

fn is_payload_reference(instruction: &Instruction) -> bool {
    matches!(
        instruction.op(),
        Some(Opcode::FillArrayData | Opcode::PackedSwitch | Opcode::SparseSwitch)
    )
}

/// Decode a method's instruction payload.
///
/// Decoding stops at the first `nop` carrying a payload identifier, and the
/// end of the stream is pulled in to the start of any switch or array-data
/// payload referenced from earlier in the stream, so payload tables are never
/// read as instructions.
pub fn decode_method_body(insns: &[u8]) -> Result<Vec<Instruction>, DexError> {
    let mut end = insns.len();
    let mut cursor = Cursor::new(insns);
    let mut instructions = Vec::new();

    while cursor.position() < end {
        let instruction = decode_instruction(&mut cursor)
            .map_err(|e| DexError::with_context(e, format!("instruction at 0x{:x}", cursor.position())))?;

        if instruction.is(Opcode::Nop) && instruction.operands[0] != 0 {
            break;
        }

        if is_payload_reference(&instruction) {
            let units = instruction.operands[1] as u32 as i32 as i64;
            let payload = instruction.offset as i64 + units * 2;
            let position = cursor.position() as i64;
            if payload >= position && payload < end as i64 {
                trace!(
                    "{} at 0x{:x} moves end of stream from 0x{:x} to payload at 0x{:x}",
                    instruction,
                    instruction.offset,
                    end,
                    payload
                );
                end = payload as usize;
                let position = cursor.position();
                cursor = Cursor::new(&insns[..end]);
                cursor.seek(position)?;
            }
        }

        instructions.push(instruction);
    }

    Ok(instructions)
}
