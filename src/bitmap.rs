//! Presence bitmap over three chained 8-byte blocks.
//!
//! The bitmap is the single source of truth for "is field N present on the
//! wire": every other component queries it before reading or writing a
//! field. All three blocks are always allocated; extension presence is
//! structural rather than tracked by a separate flag, a simplification the
//! dialect's fixed 24-byte bitmap field makes consistent.
//!
//! Bit numbering: bit `p - 1` of the flattened bit string (bit 0 = most
//! significant bit of the first byte) answers for field position `p`.
//! Positions 0 (message type) and 1 (the bitmap itself) are always present.

use crate::bytes;
use crate::error::CodecError;

/// Raw width of the bitmap on the wire.
pub const BITMAP_BYTES: usize = 24;
/// Addressable field positions.
pub const BITMAP_BITS: usize = BITMAP_BYTES * 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    data: [u8; BITMAP_BYTES],
}

impl Default for Bitmap {
    fn default() -> Self {
        Bitmap::new()
    }
}

impl Bitmap {
    pub fn new() -> Self {
        Bitmap {
            data: [0; BITMAP_BYTES],
        }
    }

    /// Bind the first [`BITMAP_BYTES`] of an incoming buffer.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < BITMAP_BYTES {
            return Err(CodecError::truncated("bitmap", BITMAP_BYTES, bytes.len()));
        }
        let mut data = [0; BITMAP_BYTES];
        data.copy_from_slice(&bytes[..BITMAP_BYTES]);
        Ok(Bitmap { data })
    }

    pub fn from_hex(hex: &str) -> Result<Self, CodecError> {
        Self::from_bytes(&bytes::hex_to_bytes(hex)?)
    }

    /// Is the field at `position` present? Positions 0 and 1 always are;
    /// positions beyond the last block never are.
    pub fn is_set(&self, position: usize) -> bool {
        if position < 2 {
            return true;
        }
        if position > BITMAP_BITS {
            return false;
        }
        let bit = position - 1;
        self.data[bit / 8] & (0x80 >> (bit % 8)) != 0
    }

    /// Mark a field as participating. No-op for positions 0 and 1.
    pub fn set_bit(&mut self, position: usize) -> Result<(), CodecError> {
        if position < 2 {
            return Ok(());
        }
        let bit = self.bit_index(position)?;
        self.data[bit / 8] |= 0x80 >> (bit % 8);
        Ok(())
    }

    /// Withdraw a field from participation. No-op for positions 0..=2:
    /// position 1 can be set structurally but never cleared.
    pub fn clear_bit(&mut self, position: usize) -> Result<(), CodecError> {
        if position < 3 {
            return Ok(());
        }
        let bit = self.bit_index(position)?;
        self.data[bit / 8] &= !(0x80 >> (bit % 8));
        Ok(())
    }

    fn bit_index(&self, position: usize) -> Result<usize, CodecError> {
        if position == 0 || position > BITMAP_BITS {
            return Err(CodecError::IndexError {
                position,
                count: BITMAP_BITS,
            });
        }
        Ok(position - 1)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.data)
    }

    pub fn to_binary_string(&self) -> String {
        self.data.iter().map(|b| format!("{b:08b}")).collect()
    }
}
