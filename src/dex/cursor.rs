//! Positioned little-endian reader shared by the DEX and resource parsers.
//!
//! One `Cursor` is threaded through every sub-parser of a file. Sub-parsers
//! seek freely and never restore the position they found; a caller that needs
//! to come back must save `position()` itself or use [`Cursor::peek_at`].

use crate::dex::error::DexError;
use crate::dex::leb::{decode_sleb128, decode_uleb128};

/// A fixed-layout little-endian record.
pub trait ReadStruct: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    fn read(cursor: &mut Cursor<'_>) -> Result<Self, DexError>;
}

/// Upper bound on any declared element count, independent of the buffer size.
pub const MAX_DECLARED_COUNT: usize = 1 << 24;

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// True when at least one more byte can be read.
    pub fn has_more(&self) -> bool {
        self.pos < self.data.len()
    }

    pub fn seek(&mut self, offset: usize) -> Result<(), DexError> {
        if offset > self.data.len() {
            fail!(Bounds => "Attempted to seek to 0x{:x} past end of buffer (len 0x{:x})", offset, self.data.len());
        }
        self.pos = offset;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<(), DexError> {
        let target = self
            .pos
            .checked_add(n)
            .ok_or_else(|| err!(Bounds => "Skip of {} bytes overflows at index {}", n, self.pos))?;
        self.seek(target)
    }

    /// Run `f` at `offset`, then put the position back where it was.
    pub fn peek_at<T>(
        &mut self,
        offset: usize,
        f: impl FnOnce(&mut Cursor<'a>) -> Result<T, DexError>,
    ) -> Result<T, DexError> {
        let saved = self.pos;
        self.seek(offset)?;
        let result = f(self);
        self.pos = saved;
        result
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DexError> {
        if n > self.remaining() {
            fail!(Bounds => "Unexpected end of stream reading {} bytes at index {}", n, self.pos);
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DexError> {
        if N > self.remaining() {
            fail!(Bounds => "Unexpected end of stream reading u{} at index {}", N * 8, self.pos);
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DexError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DexError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DexError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DexError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_uleb128(&mut self) -> Result<u64, DexError> {
        let start = self.pos;
        let (value, len) = decode_uleb128(&self.data[start.min(self.data.len())..])
            .map_err(|e| DexError::with_context(e, format!("index {}", start)))?;
        self.pos += len;
        Ok(value)
    }

    /// ULEB128 that must fit a `u32`, as DEX indices and sizes do.
    pub fn read_uleb128_u32(&mut self) -> Result<u32, DexError> {
        let start = self.pos;
        let value = self.read_uleb128()?;
        u32::try_from(value)
            .map_err(|_| err!(Overflow => "uleb128 value {} at index {} exceeds 32 bits", value, start))
    }

    pub fn read_sleb128(&mut self) -> Result<i64, DexError> {
        let start = self.pos;
        let (value, len) = decode_sleb128(&self.data[start.min(self.data.len())..])
            .map_err(|e| DexError::with_context(e, format!("index {}", start)))?;
        self.pos += len;
        Ok(value)
    }

    pub fn read_struct<T: ReadStruct>(&mut self) -> Result<T, DexError> {
        T::read(self)
    }

    /// Reject a declared element count that cannot possibly fit in what is left of the buffer.
    pub fn check_count(&self, count: usize, element_size: usize) -> Result<(), DexError> {
        let needed = count.checked_mul(element_size.max(1));
        match needed {
            Some(n) if count <= MAX_DECLARED_COUNT && n <= self.remaining() => Ok(()),
            _ => fail!(
                Bounds => "Declared count {} of {}-byte elements at index {} exceeds the {} bytes remaining",
                count,
                element_size,
                self.pos,
                self.remaining()
            ),
        }
    }

    /// Read `count` fixed-size records starting at the current position.
    pub fn read_structs<T: ReadStruct>(&mut self, count: usize) -> Result<Vec<T>, DexError> {
        self.check_count(count, T::SIZE)?;
        let mut items = Vec::with_capacity(count);
        for i in 0..count {
            let item = T::read(self).map_err(|e| DexError::with_context(e, format!("entry #{}", i)))?;
            items.push(item);
        }
        Ok(items)
    }
}
