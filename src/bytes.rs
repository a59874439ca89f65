//! Primitive hex/binary/ASCII conversions.
//!
//! Pure, stateless helpers used by the schema, field, message and TLV layers.
//! Hex output is uppercase; hex input accepts either case. Everything fails
//! with [`CodecError::MalformedInput`] on odd-length or out-of-alphabet input.

use crate::error::CodecError;

/// Decode a hex string into bytes. Fails on odd length or non-hex characters.
pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, CodecError> {
    hex::decode(hex).map_err(|e| CodecError::MalformedInput(format!("hex string {hex:?}: {e}")))
}

/// Render `len` bytes starting at `start` as an uppercase hex string.
pub fn bytes_to_hex(bytes: &[u8], start: usize, len: usize) -> Result<String, CodecError> {
    let end = start
        .checked_add(len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| {
            CodecError::MalformedInput(format!(
                "byte range {start}..{} outside buffer of {} bytes",
                start + len,
                bytes.len()
            ))
        })?;
    Ok(hex::encode_upper(&bytes[start..end]))
}

/// Convert a binary digit string into hex, left-padding to a whole number
/// of bytes.
pub fn bin_to_hex(binary: &str) -> Result<String, CodecError> {
    if let Some(c) = binary.chars().find(|c| *c != '0' && *c != '1') {
        return Err(CodecError::MalformedInput(format!(
            "binary string contains {c:?}"
        )));
    }
    let pad = (8 - binary.len() % 8) % 8;
    let padded = format!("{}{}", "0".repeat(pad), binary);
    let mut out = String::with_capacity(padded.len() / 4);
    for chunk in padded.as_bytes().chunks(8) {
        let mut byte = 0u8;
        for &bit in chunk {
            byte = (byte << 1) | (bit - b'0');
        }
        out.push_str(&format!("{byte:02X}"));
    }
    Ok(out)
}

/// Expand a hex string into its binary digit representation (4 bits per
/// hex character).
pub fn hex_to_bin(hex: &str) -> Result<String, CodecError> {
    let mut out = String::with_capacity(hex.len() * 4);
    for c in hex.chars() {
        let nibble = c.to_digit(16).ok_or_else(|| {
            CodecError::MalformedInput(format!("hex string contains {c:?}"))
        })?;
        out.push_str(&format!("{nibble:04b}"));
    }
    Ok(out)
}

/// Hex-encode the bytes of an ASCII/UTF-8 string.
pub fn ascii_to_hex(ascii: &str) -> String {
    hex::encode(ascii.as_bytes())
}

/// Decode a hex string and render each byte as a character.
pub fn hex_to_ascii(hex: &str) -> Result<String, CodecError> {
    Ok(hex_to_bytes(hex)?.iter().map(|&b| b as char).collect())
}

/// Accumulate a byte array into an integer, least-significant byte first.
pub fn bytes_to_int(bytes: &[u8]) -> u64 {
    let mut result = 0u64;
    for (i, &b) in bytes.iter().enumerate().take(8) {
        result |= (b as u64) << (8 * i);
    }
    result
}
