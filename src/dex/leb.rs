//! LEB128 variable-length integers. DEX uses the unsigned form for class
//! data, string lengths and encoded values, and the signed form in debug
//! info and catch handlers.
//!
//! At most 10 bytes are accepted, enough for any 64-bit value.

use crate::dex::error::DexError;

pub const MAX_LEB128_BYTES: usize = 10;

/// Encode `value` as unsigned LEB128.
pub fn encode_uleb128(mut value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_LEB128_BYTES);
    while value >= 0x80 {
        out.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
    out
}

/// Decode an unsigned LEB128 value, returning it with the number of bytes consumed.
pub fn decode_uleb128(encoded: &[u8]) -> Result<(u64, usize), DexError> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;

    for count in 0..MAX_LEB128_BYTES {
        let Some(&byte) = encoded.get(count) else {
            fail!(Bounds => "Unexpected end of stream reading uleb128 after {} bytes", count);
        };

        // Only bit 0 of a terminating tenth byte still fits in a u64.
        if shift == 63 && byte & 0x80 == 0 && byte > 1 {
            fail!(Overflow => "uleb128 overflows 64 bits (byte 0x{:02x})", byte);
        }

        value |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, count + 1));
        }
        shift += 7;
    }

    fail!(TooLong => "uleb128 longer than {} bytes", MAX_LEB128_BYTES)
}

/// Encode `value` as signed LEB128, stopping once the remaining bits are
/// all sign and bit 6 of the last byte agrees with it.
pub fn encode_sleb128(mut value: i64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_LEB128_BYTES);
    loop {
        let low = value as u8 & 0x7F;
        value >>= 7;
        let done = (value == 0 && low & 0x40 == 0) || (value == -1 && low & 0x40 != 0);
        out.push(if done { low } else { low | 0x80 });
        if done {
            return out;
        }
    }
}

/// Decode a signed LEB128 value. The result is sign-extended from bit 6 of the final byte.
pub fn decode_sleb128(encoded: &[u8]) -> Result<(i64, usize), DexError> {
    let mut value: i64 = 0;
    let mut shift: u32 = 0;

    for count in 0..MAX_LEB128_BYTES {
        let Some(&byte) = encoded.get(count) else {
            fail!(Bounds => "Unexpected end of stream reading sleb128 after {} bytes", count);
        };

        // A terminating tenth byte carries only bit 63, so it must be all sign.
        if shift == 63 && byte & 0x80 == 0 && byte != 0x00 && byte != 0x7F {
            fail!(Overflow => "sleb128 overflows 64 bits (byte 0x{:02x})", byte);
        }

        value |= ((byte & 0x7F) as i64) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            if shift < 64 && (byte & 0x40) != 0 {
                value |= -1i64 << shift;
            }
            return Ok((value, count + 1));
        }
    }

    fail!(TooLong => "sleb128 longer than {} bytes", MAX_LEB128_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::error::ErrorKind;

    #[test]
    fn class_data_sizes() {
        // typical class_data_item headers and deltas
        assert_eq!(encode_uleb128(0), [0x00]);
        assert_eq!(encode_uleb128(3), [0x03]);
        assert_eq!(encode_uleb128(0x7F), [0x7F]);
        assert_eq!(encode_uleb128(0x80), [0x80, 0x01]);
        assert_eq!(encode_uleb128(0x10001), [0x81, 0x80, 0x04]);
        assert_eq!(encode_uleb128(u32::MAX as u64), [0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn decodes_with_length() {
        assert_eq!(decode_uleb128(&[0x2A]).unwrap(), (42, 1));
        assert_eq!(decode_uleb128(&[0xE5, 0x8E, 0x26]).unwrap(), (624485, 3));
        assert_eq!(decode_uleb128(&[0x05, 0xAA]).unwrap(), (5, 1));
        assert_eq!(decode_uleb128(&[0x81, 0x80, 0x04]).unwrap(), (0x10001, 3));
        // redundant continuation bytes are legal
        assert_eq!(decode_uleb128(&[0x80, 0x80, 0x00]).unwrap(), (0, 3));
        let max = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert_eq!(decode_uleb128(&max).unwrap(), (u64::MAX, 10));
    }

    #[test]
    fn rejects_overflow_and_truncation() {
        let overflow = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x02];
        assert_eq!(decode_uleb128(&overflow).unwrap_err().kind(), ErrorKind::Overflow);

        let unterminated = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x81, 0x00];
        assert_eq!(decode_uleb128(&unterminated).unwrap_err().kind(), ErrorKind::TooLong);
        assert_eq!(decode_uleb128(&[0xFF; 11]).unwrap_err().kind(), ErrorKind::TooLong);

        assert_eq!(decode_uleb128(&[0x80]).unwrap_err().kind(), ErrorKind::Bounds);
        assert_eq!(decode_uleb128(&[]).unwrap_err().kind(), ErrorKind::Bounds);
    }

    #[test]
    fn encoding_stays_within_ten_bytes() {
        for v in [u64::MAX, 1 << 63, 0x1234_5678_9abc_def0, 300] {
            let encoded = encode_uleb128(v);
            assert!(encoded.len() <= MAX_LEB128_BYTES);
            assert_eq!(decode_uleb128(&encoded).unwrap(), (v, encoded.len()));
        }
    }

    #[test]
    fn sleb128_sign_extends_from_bit_six() {
        assert_eq!(decode_sleb128(&[0x7E]).unwrap(), (-2, 1));
        assert_eq!(decode_sleb128(&[0x40]).unwrap(), (-64, 1));
        assert_eq!(decode_sleb128(&[0x3F]).unwrap(), (63, 1));
        assert_eq!(decode_sleb128(&[0x9B, 0x7F]).unwrap(), (-101, 2));
        assert_eq!(decode_sleb128(&[0xC0, 0x00]).unwrap(), (64, 2));
        assert_eq!(encode_sleb128(-101), [0x9B, 0x7F]);
        assert_eq!(encode_sleb128(64), [0xC0, 0x00]);
        assert_eq!(encode_sleb128(-64), [0x40]);
    }

    #[test]
    fn sleb128_limits() {
        for v in [i64::MIN, i64::MAX, -1, 0] {
            let encoded = encode_sleb128(v);
            assert!(encoded.len() <= MAX_LEB128_BYTES);
            assert_eq!(decode_sleb128(&encoded).unwrap(), (v, encoded.len()));
        }
        let overflow = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert_eq!(decode_sleb128(&overflow).unwrap_err().kind(), ErrorKind::Overflow);
        assert_eq!(decode_sleb128(&[0x80; 10]).unwrap_err().kind(), ErrorKind::TooLong);
        assert_eq!(decode_sleb128(&[0xFF; 12]).unwrap_err().kind(), ErrorKind::TooLong);
        assert_eq!(decode_sleb128(&[0xFF]).unwrap_err().kind(), ErrorKind::Bounds);
    }
}
