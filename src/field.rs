//! A field value bound to one schema position.
//!
//! The [`FieldSpec`] attributes (type, length class, length encoding, fixed
//! length) are copied in at message construction; `declared_length` then tracks the
//! value in digits for Numeric/Binary fields and in bytes for everything
//! else. Fixed-length fields never recompute their length from input; the
//! schema is authoritative there.

use crate::bytes;
use crate::error::CodecError;
use crate::schema::{FieldSpec, FieldType, LengthClass, LengthEncoding};

#[derive(Debug, Clone)]
pub struct FieldValue {
    position: usize,
    field_type: FieldType,
    length_class: LengthClass,
    length_encoding: LengthEncoding,
    declared_length: usize,
    raw: Vec<u8>,
}

impl FieldValue {
    /// Create an empty value bound to `spec`. The declared length starts at
    /// the schema fixed length (0 for variable-length fields).
    pub fn new(spec: &FieldSpec) -> Self {
        FieldValue {
            position: spec.position,
            field_type: spec.field_type,
            length_class: spec.length_class,
            length_encoding: spec.length_encoding,
            declared_length: spec.fixed_length,
            raw: Vec::new(),
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn length_class(&self) -> LengthClass {
        self.length_class
    }

    pub fn length_encoding(&self) -> LengthEncoding {
        self.length_encoding
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Assign from text. Character-class types travel as their ASCII bytes;
    /// Numeric/Binary/Track2 text is a hex digit string converted directly
    /// to bytes.
    pub fn set_value(&mut self, text: &str) -> Result<(), CodecError> {
        self.raw = match self.field_type {
            FieldType::Alpha
            | FieldType::Special
            | FieldType::Alphanumeric
            | FieldType::AlphaSpecial
            | FieldType::NumericSpecial
            | FieldType::AlphaNumericSpecial => {
                bytes::hex_to_bytes(&bytes::ascii_to_hex(text))?
            }
            FieldType::Numeric | FieldType::Binary | FieldType::Track2 | FieldType::Bitmap => {
                bytes::hex_to_bytes(text)?
            }
            FieldType::None => {
                return Err(CodecError::MalformedInput(format!(
                    "field {} carries no data",
                    self.position
                )))
            }
        };
        if self.length_class != LengthClass::Fixed {
            // digit count for digit-counted types, byte count otherwise
            self.declared_length = if self.field_type.digit_counted() {
                text.len()
            } else {
                self.raw.len()
            };
        }
        Ok(())
    }

    /// Assign raw bytes directly.
    pub fn set_value_bytes(&mut self, value: &[u8]) {
        self.raw = value.to_vec();
        if self.length_class != LengthClass::Fixed {
            self.declared_length = if self.field_type.digit_counted() {
                value.len() * 2
            } else {
                value.len()
            };
        }
    }

    pub fn value_as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn value_as_hex(&self) -> String {
        hex::encode_upper(&self.raw)
    }

    /// Render for display. Position 63 always renders as hex since its
    /// payload is a packed tag/length/value accumulator, not character data.
    pub fn value_as_text(&self) -> String {
        if self.position == 63 {
            return self.value_as_hex();
        }
        if self.field_type.is_text() {
            self.raw.iter().map(|&b| b as char).collect()
        } else {
            self.value_as_hex()
        }
    }

    /// Declared length in digits (Numeric/Binary) or bytes (other types).
    pub fn declared_length(&self) -> usize {
        self.declared_length
    }

    /// Width of the value on the wire, in bytes.
    pub fn length_in_units(&self) -> usize {
        if self.field_type.digit_counted() {
            self.declared_length / 2
        } else {
            self.declared_length
        }
    }

    /// Wire width plus the 0/1/2 indicator bytes the length class implies.
    pub fn length_including_indicator(&self) -> usize {
        self.length_in_units() + self.length_class.indicator_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LengthEncoding;

    #[test]
    fn numeric_lengths_count_digits() {
        let spec = FieldSpec::llvar(2, FieldType::Numeric, LengthEncoding::Bcd, "Account Number");
        let mut field = FieldValue::new(&spec);
        assert_eq!(field.length_in_units(), 0);
        field.set_value("4111111111111111").unwrap();
        assert_eq!(field.declared_length(), 16);
        assert_eq!(field.length_in_units(), 8);
        assert_eq!(field.length_including_indicator(), 9);
    }

    #[test]
    fn fixed_length_is_schema_authoritative() {
        let spec = FieldSpec::fixed(3, FieldType::Numeric, 6, "Processing Code");
        let mut field = FieldValue::new(&spec);
        field.set_value("300000").unwrap();
        assert_eq!(field.declared_length(), 6);
        assert_eq!(field.length_in_units(), 3);
        assert_eq!(field.value_as_hex(), "300000");
    }

    #[test]
    fn every_character_class_accepts_text() {
        for field_type in [
            FieldType::Alpha,
            FieldType::Special,
            FieldType::Alphanumeric,
            FieldType::AlphaSpecial,
            FieldType::NumericSpecial,
            FieldType::AlphaNumericSpecial,
        ] {
            let spec = FieldSpec::fixed(41, field_type, 4, "Terminal");
            let mut field = FieldValue::new(&spec);
            field.set_value("AB12").unwrap();
            assert_eq!(field.value_as_bytes(), b"AB12");
            assert_eq!(field.value_as_text(), "AB12");
        }
    }

    #[test]
    fn text_types_round_trip_ascii() {
        let spec = FieldSpec::fixed(39, FieldType::Alphanumeric, 2, "Response Code");
        let mut field = FieldValue::new(&spec);
        field.set_value("00").unwrap();
        assert_eq!(field.value_as_bytes(), b"00");
        assert_eq!(field.value_as_text(), "00");
        assert_eq!(field.value_as_hex(), "3030");
    }

    #[test]
    fn byte_path_matches_text_path() {
        let spec = FieldSpec::lllvar(
            60,
            FieldType::AlphaNumericSpecial,
            LengthEncoding::Bcd,
            "Private Use",
        );
        let mut field = FieldValue::new(&spec);
        field.set_value_bytes(b"BATCH001");
        assert_eq!(field.declared_length(), 8);
        assert_eq!(field.length_in_units(), 8);
        assert_eq!(field.length_including_indicator(), 10);
    }

    #[test]
    fn unset_value_reads_empty() {
        let spec = FieldSpec::llvar(35, FieldType::Track2, LengthEncoding::Bcd, "Track2 Data");
        let field = FieldValue::new(&spec);
        assert!(field.is_empty());
        assert_eq!(field.value_as_bytes(), &[] as &[u8]);
        assert_eq!(field.length_in_units(), 0);
    }
}
