use serde::Serialize;

use crate::dex::cursor::Cursor;
use crate::dex::error::DexError;

/// Values nested deeper than this are rejected rather than recursed into.
const MAX_NESTING: usize = 64;

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct EncodedAnnotation {
    pub type_idx: u32,
    pub elements: Vec<AnnotationElement>,
}

impl EncodedAnnotation {
    pub fn read(cursor: &mut Cursor<'_>) -> Result<EncodedAnnotation, DexError> {
        Self::read_nested(cursor, 0)
    }

    fn read_nested(cursor: &mut Cursor<'_>, depth: usize) -> Result<EncodedAnnotation, DexError> {
        let type_idx = cursor.read_uleb128_u32()?;
        let size = cursor.read_uleb128_u32()? as usize;
        // Each element takes at least two bytes: a name index and a value header.
        cursor.check_count(size, 2)?;

        let mut elements = Vec::with_capacity(size);
        for _ in 0..size {
            let name_idx = cursor.read_uleb128_u32()?;
            let value = EncodedValue::read_nested(cursor, depth + 1)?;
            elements.push(AnnotationElement { name_idx, value });
        }

        Ok(EncodedAnnotation { type_idx, elements })
    }
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct AnnotationElement {
    pub name_idx: u32,
    pub value: EncodedValue,
}

/// An `encoded_value`: one variant per value type tag, with arrays and
/// annotations holding their children.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub enum EncodedValue {
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    MethodType(u32),
    MethodHandle(u32),
    String(u32),
    Type(u32),
    Field(u32),
    Method(u32),
    Enum(u32),
    Array(Vec<EncodedValue>),
    Annotation(EncodedAnnotation),
    Null,
    Boolean(bool),
}

impl EncodedValue {
    /// Return a shared reference to the inner `EncodedAnnotation` if this value is `EncodedValue::Annotation`.
    #[inline]
    pub fn as_annotation(&self) -> Option<&EncodedAnnotation> {
        match self {
            EncodedValue::Annotation(ann) => Some(ann),
            _ => None,
        }
    }

    /// Flattened 64-bit view: integral kinds by value, floating kinds by bit
    /// pattern, reference kinds by table index, `null` and `false` as zero.
    /// Arrays and annotations have no scalar view and yield 0.
    pub fn as_i64(&self) -> i64 {
        match self {
            EncodedValue::Byte(x) => *x as i64,
            EncodedValue::Short(x) => *x as i64,
            EncodedValue::Char(x) => *x as i64,
            EncodedValue::Int(x) => *x as i64,
            EncodedValue::Long(x) => *x,
            EncodedValue::Float(x) => x.to_bits() as i64,
            EncodedValue::Double(x) => x.to_bits() as i64,
            EncodedValue::MethodType(x)
            | EncodedValue::MethodHandle(x)
            | EncodedValue::String(x)
            | EncodedValue::Type(x)
            | EncodedValue::Field(x)
            | EncodedValue::Method(x)
            | EncodedValue::Enum(x) => *x as i64,
            EncodedValue::Boolean(b) => *b as i64,
            EncodedValue::Null | EncodedValue::Array(_) | EncodedValue::Annotation(_) => 0,
        }
    }

    pub fn read(cursor: &mut Cursor<'_>) -> Result<EncodedValue, DexError> {
        Self::read_nested(cursor, 0)
    }

    fn read_nested(cursor: &mut Cursor<'_>, depth: usize) -> Result<EncodedValue, DexError> {
        if depth > MAX_NESTING {
            fail!("EncodedValue nesting deeper than {} at index {}", MAX_NESTING, cursor.position());
        }

        let header_byte = cursor.read_u8()?;
        let value_arg = header_byte >> 5;
        let value_type = header_byte & 0x1F;
        let size = (value_arg + 1) as usize;

        match value_type {
            0x00 => Ok(EncodedValue::Byte(cursor.read_u8()? as i8)),
            0x02 => Ok(EncodedValue::Short(read_signed(cursor, size, 2)? as i16)),
            0x03 => Ok(EncodedValue::Char(read_unsigned(cursor, size, 2)? as u16)),
            0x04 => Ok(EncodedValue::Int(read_signed(cursor, size, 4)? as i32)),
            0x06 => Ok(EncodedValue::Long(read_signed(cursor, size, 8)?)),
            0x10 => Ok(EncodedValue::Float(f32::from_bits(read_right_extended(cursor, size, 4)? as u32))),
            0x11 => Ok(EncodedValue::Double(f64::from_bits(read_right_extended(cursor, size, 8)?))),
            0x15 => Ok(EncodedValue::MethodType(read_unsigned(cursor, size, 4)? as u32)),
            0x16 => Ok(EncodedValue::MethodHandle(read_unsigned(cursor, size, 4)? as u32)),
            0x17 => Ok(EncodedValue::String(read_unsigned(cursor, size, 4)? as u32)),
            0x18 => Ok(EncodedValue::Type(read_unsigned(cursor, size, 4)? as u32)),
            0x19 => Ok(EncodedValue::Field(read_unsigned(cursor, size, 4)? as u32)),
            0x1A => Ok(EncodedValue::Method(read_unsigned(cursor, size, 4)? as u32)),
            0x1B => Ok(EncodedValue::Enum(read_unsigned(cursor, size, 4)? as u32)),
            0x1C => Ok(EncodedValue::Array(read_array_nested(cursor, depth + 1)?)),
            0x1D => Ok(EncodedValue::Annotation(EncodedAnnotation::read_nested(cursor, depth + 1)?)),
            0x1E => Ok(EncodedValue::Null),
            0x1F => Ok(EncodedValue::Boolean(value_arg != 0)),
            _ => fail!("Unknown EncodedValue type 0x{:02x} at index {}", value_type, cursor.position() - 1),
        }
    }
}

fn check_width(cursor: &Cursor<'_>, size: usize, max: usize) -> Result<(), DexError> {
    if size > max {
        fail!(
            "EncodedValue width {} exceeds {} bytes at index {}",
            size,
            max,
            cursor.position()
        );
    }
    Ok(())
}

fn read_unsigned(cursor: &mut Cursor<'_>, size: usize, max: usize) -> Result<u64, DexError> {
    check_width(cursor, size, max)?;
    let mut result = 0u64;
    for (i, byte) in cursor.read_bytes(size)?.iter().enumerate() {
        result |= (*byte as u64) << (8 * i);
    }
    Ok(result)
}

fn read_signed(cursor: &mut Cursor<'_>, size: usize, max: usize) -> Result<i64, DexError> {
    let raw = read_unsigned(cursor, size, max)?;
    let unused = 64 - 8 * size as u32;
    Ok(((raw << unused) as i64) >> unused)
}

// Float and double payloads drop trailing zero bytes, so the read bytes are the high-order ones.
fn read_right_extended(cursor: &mut Cursor<'_>, size: usize, max: usize) -> Result<u64, DexError> {
    let raw = read_unsigned(cursor, size, max)?;
    Ok(raw << (8 * (max - size)))
}

fn read_array_nested(cursor: &mut Cursor<'_>, depth: usize) -> Result<Vec<EncodedValue>, DexError> {
    let size = cursor.read_uleb128_u32()? as usize;
    cursor.check_count(size, 1)?;

    let mut values = Vec::with_capacity(size);
    for _ in 0..size {
        values.push(EncodedValue::read_nested(cursor, depth)?);
    }

    Ok(values)
}

/// Read an `encoded_array` (a ULEB128 count followed by that many values).
pub fn read_encoded_array(cursor: &mut Cursor<'_>) -> Result<Vec<EncodedValue>, DexError> {
    read_array_nested(cursor, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(bytes: &[u8]) -> EncodedValue {
        let mut c = Cursor::new(bytes);
        let v = EncodedValue::read(&mut c).expect("Failed to read EncodedValue");
        assert!(!c.has_more(), "value did not consume all input");
        v
    }

    #[test]
    fn test_encoded_value_byte() {
        assert_eq!(read(&[0x00, 0x7F]), EncodedValue::Byte(127));
        assert_eq!(read(&[0x00, 0x80]), EncodedValue::Byte(-128));
    }

    #[test]
    fn test_encoded_value_short_and_char() {
        assert_eq!(read(&[0x22, 0x34, 0x12]), EncodedValue::Short(0x1234));
        assert_eq!(read(&[0x02, 0xFF]), EncodedValue::Short(-1));
        assert_eq!(read(&[0x03, 0xFF]), EncodedValue::Char(0xFF));
        assert_eq!(read(&[0x23, 0x34, 0x12]), EncodedValue::Char(0x1234));
    }

    #[test]
    fn narrow_ints_are_sign_extended() {
        assert_eq!(read(&[0x04, 0x9C]), EncodedValue::Int(-100));
        assert_eq!(read(&[0x24, 0x00, 0x80]), EncodedValue::Int(-32768));
        assert_eq!(read(&[0x64, 0x78, 0x56, 0x34, 0x12]), EncodedValue::Int(0x12345678));
        assert_eq!(read(&[0x06, 0xFE]), EncodedValue::Long(-2));
    }

    #[test]
    fn floats_are_right_extended() {
        // 1.0f32 = 0x3f800000, stored as its two high bytes.
        assert_eq!(read(&[0x30, 0x80, 0x3F]), EncodedValue::Float(1.0));
        // 2.0f64 = 0x4000000000000000, stored as one byte.
        assert_eq!(read(&[0x11, 0x40]), EncodedValue::Double(2.0));
    }

    #[test]
    fn references_and_constants() {
        assert_eq!(read(&[0x17, 0x05]), EncodedValue::String(5));
        assert_eq!(read(&[0x38, 0x01, 0x01]), EncodedValue::Type(0x0101));
        assert_eq!(read(&[0x1E]), EncodedValue::Null);
        assert_eq!(read(&[0x3F]), EncodedValue::Boolean(true));
        assert_eq!(read(&[0x1F]), EncodedValue::Boolean(false));
    }

    #[test]
    fn nested_array_and_annotation() {
        // array [ string@2, annotation type@7 { name@3 = int 9 } ]
        let bytes = [0x1C, 0x02, 0x17, 0x02, 0x1D, 0x07, 0x01, 0x03, 0x04, 0x09];
        let v = read(&bytes);
        let expected = EncodedValue::Array(vec![
            EncodedValue::String(2),
            EncodedValue::Annotation(EncodedAnnotation {
                type_idx: 7,
                elements: vec![AnnotationElement { name_idx: 3, value: EncodedValue::Int(9) }],
            }),
        ]);
        assert_eq!(v, expected);
        if let EncodedValue::Array(items) = &v {
            assert!(items[1].as_annotation().is_some());
        }
    }

    #[test]
    fn rejects_bad_tags_and_widths() {
        let mut c = Cursor::new(&[0x05, 0x00]);
        assert!(EncodedValue::read(&mut c).is_err());
        // Int with width 5
        let mut c = Cursor::new(&[0x84, 0, 0, 0, 0, 0]);
        assert!(EncodedValue::read(&mut c).is_err());
        // truncated
        let mut c = Cursor::new(&[0x64, 0x01]);
        assert!(EncodedValue::read(&mut c).is_err());
    }

    #[test]
    fn flattened_view() {
        assert_eq!(EncodedValue::Int(-5).as_i64(), -5);
        assert_eq!(EncodedValue::String(12).as_i64(), 12);
        assert_eq!(EncodedValue::Boolean(true).as_i64(), 1);
        assert_eq!(EncodedValue::Null.as_i64(), 0);
        assert_eq!(EncodedValue::Float(1.0).as_i64(), 0x3f800000);
    }
}
