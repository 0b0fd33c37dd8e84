//! Varint encoding and decoding.
//!
//! Avro uses the same varint encoding as Protocol Buffers:
//! - Each byte has 7 bits of data and 1 continuation bit (MSB)
//! - Bytes are in little-endian order
//!
//! Signed integers are zigzag encoded first, so small magnitudes of either
//! sign stay short:
//! - 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, 2 -> 4, ...
//! - Encoding formula: (n << 1) ^ (n >> 63)
//! - Decoding formula: (n >> 1) ^ -(n & 1)

use bytes::BufMut;

use crate::error::CodecError;

/// Longest valid encoding of a 64-bit value.
pub const MAX_VARINT_LEN: usize = 10;

// ============================================================================
// Decoding Functions
// ============================================================================

/// Decode an unsigned variable-length integer.
///
/// # Arguments
/// * `data` - The input byte slice (cursor is advanced past the varint)
///
/// # Errors
/// - `CodecError::ShortBuffer` if the input is truncated
/// - `CodecError::InvalidBinary` if the varint exceeds 10 bytes
#[inline]
pub fn decode_varint(data: &mut &[u8]) -> Result<u64, CodecError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let Some((&byte, rest)) = data.split_first() else {
            return Err(CodecError::short(1, 0));
        };
        *data = rest;

        result |= ((byte & 0x7F) as u64) << shift;

        // Last byte has the MSB clear
        if byte & 0x80 == 0 {
            return Ok(result);
        }

        shift += 7;
        if shift >= 7 * MAX_VARINT_LEN as u32 {
            return Err(CodecError::binary(format!(
                "varint longer than {} bytes",
                MAX_VARINT_LEN
            )));
        }
    }
}

/// Decode a signed (zigzag) variable-length integer.
#[inline]
pub fn decode_zigzag(data: &mut &[u8]) -> Result<i64, CodecError> {
    let unsigned = decode_varint(data)?;
    Ok(((unsigned >> 1) as i64) ^ (-((unsigned & 1) as i64)))
}

// ============================================================================
// Encoding Functions
// ============================================================================

/// Append an unsigned variable-length integer.
#[inline]
pub fn encode_varint<B: BufMut>(buf: &mut B, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(byte);
            return;
        }
        buf.put_u8(byte | 0x80);
    }
}

/// Append a signed integer as a zigzag varint.
#[inline]
pub fn encode_zigzag<B: BufMut>(buf: &mut B, value: i64) {
    encode_varint(buf, ((value << 1) ^ (value >> 63)) as u64);
}
