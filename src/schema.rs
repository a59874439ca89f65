//! Dialect schema: the ordered table of per-position field definitions.
//!
//! A dialect is built once per message-type family and shared read-only
//! across every message of that family. Position 0 is always the message
//! type identifier, position 1 the bitmap.
//!
//! Length convention: `fixed_length` counts **digits** for Numeric/Binary
//! fields (two digits per wire byte) and **bytes** for everything else.
//! The bitmap field is Binary with 48 digits, i.e. the 24 wire bytes of
//! three 8-byte blocks.

use crate::error::CodecError;
use crate::trace::TraceSink;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Character/data class of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Alpha, including blanks.
    Alpha,
    /// Numeric values only.
    Numeric,
    /// Special characters only.
    Special,
    Alphanumeric,
    AlphaSpecial,
    NumericSpecial,
    AlphaNumericSpecial,
    /// Binary data.
    Binary,
    /// Track 2/3 code set (ISO/IEC 7813, ISO/IEC 4909).
    Track2,
    /// Position carries no data.
    None,
    Bitmap,
}

impl FieldType {
    /// Lengths of these types are counted in digits, two per wire byte.
    pub fn digit_counted(self) -> bool {
        matches!(self, FieldType::Numeric | FieldType::Binary)
    }

    /// Character-class types whose text values travel as ASCII bytes.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            FieldType::Alpha
                | FieldType::Special
                | FieldType::Alphanumeric
                | FieldType::AlphaSpecial
                | FieldType::NumericSpecial
                | FieldType::AlphaNumericSpecial
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Alpha => "A",
            FieldType::Numeric => "N",
            FieldType::Special => "S",
            FieldType::Alphanumeric => "AN",
            FieldType::AlphaSpecial => "AS",
            FieldType::NumericSpecial => "NS",
            FieldType::AlphaNumericSpecial => "ANS",
            FieldType::Binary => "B",
            FieldType::Track2 => "Z",
            FieldType::None => "NULL",
            FieldType::Bitmap => "BITMAP",
        }
    }
}

/// Length class of a field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthClass {
    /// No length indicator; the schema length is authoritative.
    Fixed,
    /// One length-indicator byte precedes the value.
    Llvar,
    /// Two length-indicator bytes precede the value.
    Lllvar,
}

impl LengthClass {
    /// Width in bytes of the length indicator this class implies.
    pub fn indicator_len(self) -> usize {
        match self {
            LengthClass::Fixed => 0,
            LengthClass::Llvar => 1,
            LengthClass::Lllvar => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LengthClass::Fixed => "FIXED",
            LengthClass::Llvar => "LLVAR",
            LengthClass::Lllvar => "LLLVAR",
        }
    }
}

/// Encoding of a variable-length field's length indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthEncoding {
    Ascii,
    /// Two decimal digits per indicator byte.
    Bcd,
    Ebcdic,
    Hex,
    /// No indicator (fixed-length fields).
    None,
}

impl LengthEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            LengthEncoding::Ascii => "ASCII",
            LengthEncoding::Bcd => "BCD",
            LengthEncoding::Ebcdic => "EBCDIC",
            LengthEncoding::Hex => "HEX",
            LengthEncoding::None => "NULL",
        }
    }
}

/// Static per-position field metadata. Immutable after construction.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub position: usize,
    pub field_type: FieldType,
    pub length_class: LengthClass,
    pub length_encoding: LengthEncoding,
    /// Digits for Numeric/Binary fields, bytes otherwise. Meaningful only
    /// when `length_class` is Fixed.
    pub fixed_length: usize,
    pub description: &'static str,
}

impl FieldSpec {
    pub const fn fixed(
        position: usize,
        field_type: FieldType,
        fixed_length: usize,
        description: &'static str,
    ) -> Self {
        FieldSpec {
            position,
            field_type,
            length_class: LengthClass::Fixed,
            length_encoding: LengthEncoding::None,
            fixed_length,
            description,
        }
    }

    pub const fn llvar(
        position: usize,
        field_type: FieldType,
        length_encoding: LengthEncoding,
        description: &'static str,
    ) -> Self {
        FieldSpec {
            position,
            field_type,
            length_class: LengthClass::Llvar,
            length_encoding,
            fixed_length: 0,
            description,
        }
    }

    pub const fn lllvar(
        position: usize,
        field_type: FieldType,
        length_encoding: LengthEncoding,
        description: &'static str,
    ) -> Self {
        FieldSpec {
            position,
            field_type,
            length_class: LengthClass::Lllvar,
            length_encoding,
            fixed_length: 0,
            description,
        }
    }

    const fn unused(position: usize) -> Self {
        FieldSpec::fixed(position, FieldType::None, 0, "")
    }

    /// Width in bytes of this field's length indicator.
    pub fn indicator_len(&self) -> usize {
        self.length_class.indicator_len()
    }
}

/// The canonical bankcard dialect: 67 positions, BCD length indicators on
/// every variable-length field.
const BANKCARD_FIELDS: &[FieldSpec] = &[
    FieldSpec::fixed(0, FieldType::Numeric, 4, "Message Type Identifier"),
    FieldSpec::fixed(1, FieldType::Binary, 48, "Bitmap Indicator"),
    FieldSpec::llvar(2, FieldType::Numeric, LengthEncoding::Bcd, "Account Number"),
    FieldSpec::fixed(3, FieldType::Numeric, 6, "Processing Code"),
    FieldSpec::fixed(4, FieldType::Numeric, 12, "Transaction Amount"),
    FieldSpec::unused(5),
    FieldSpec::unused(6),
    FieldSpec::unused(7),
    FieldSpec::unused(8),
    FieldSpec::unused(9),
    FieldSpec::unused(10),
    FieldSpec::fixed(11, FieldType::Numeric, 6, "System Trace Audit Number"),
    FieldSpec::fixed(12, FieldType::Numeric, 6, "Local Transaction Time"),
    FieldSpec::fixed(13, FieldType::Numeric, 4, "Local Transaction Date"),
    FieldSpec::fixed(14, FieldType::Numeric, 4, "Account Expiration Date"),
    FieldSpec::unused(15),
    FieldSpec::unused(16),
    FieldSpec::unused(17),
    FieldSpec::unused(18),
    FieldSpec::unused(19),
    FieldSpec::unused(20),
    FieldSpec::unused(21),
    FieldSpec::fixed(22, FieldType::Numeric, 4, "Point of Service Entry Mode"),
    FieldSpec::unused(23),
    FieldSpec::fixed(24, FieldType::Numeric, 4, "Network International Identifier"),
    FieldSpec::fixed(25, FieldType::Numeric, 2, "POS Condition Code"),
    FieldSpec::unused(26),
    FieldSpec::unused(27),
    FieldSpec::unused(28),
    FieldSpec::unused(29),
    FieldSpec::unused(30),
    FieldSpec::unused(31),
    FieldSpec::unused(32),
    FieldSpec::unused(33),
    FieldSpec::unused(34),
    FieldSpec::llvar(35, FieldType::Track2, LengthEncoding::Bcd, "Track2 Data"),
    FieldSpec::unused(36),
    FieldSpec::fixed(37, FieldType::Alphanumeric, 12, "Retrieval Reference Number"),
    FieldSpec::fixed(38, FieldType::Alphanumeric, 6, "Authorization Code"),
    FieldSpec::fixed(39, FieldType::Alphanumeric, 2, "Response Code"),
    FieldSpec::unused(40),
    FieldSpec::fixed(
        41,
        FieldType::AlphaNumericSpecial,
        8,
        "Card Acceptor Terminal Identification",
    ),
    FieldSpec::fixed(
        42,
        FieldType::AlphaNumericSpecial,
        15,
        "Card Acceptor Identification Code",
    ),
    FieldSpec::unused(43),
    FieldSpec::unused(44),
    FieldSpec::unused(45),
    FieldSpec::unused(46),
    FieldSpec::unused(47),
    FieldSpec::unused(48),
    FieldSpec::fixed(49, FieldType::Numeric, 4, "Transaction Currency Code"),
    FieldSpec::unused(50),
    FieldSpec::unused(51),
    FieldSpec::fixed(52, FieldType::Binary, 16, "Personal Identification Code"),
    FieldSpec::unused(53),
    FieldSpec::unused(54),
    FieldSpec::lllvar(55, FieldType::Binary, LengthEncoding::Bcd, "ICC System Related Data"),
    FieldSpec::unused(56),
    FieldSpec::unused(57),
    FieldSpec::unused(58),
    FieldSpec::unused(59),
    FieldSpec::lllvar(
        60,
        FieldType::AlphaNumericSpecial,
        LengthEncoding::Bcd,
        "Private Use - Batch Number + SoftID + OrigData + OrigAmt + EncKey",
    ),
    FieldSpec::unused(61),
    FieldSpec::lllvar(
        62,
        FieldType::AlphaNumericSpecial,
        LengthEncoding::Bcd,
        "Reconciliation Totals",
    ),
    FieldSpec::lllvar(
        63,
        FieldType::AlphaNumericSpecial,
        LengthEncoding::Bcd,
        "Additional Data",
    ),
    FieldSpec::fixed(64, FieldType::Binary, 8, "MAC - Message Authentication Code"),
    FieldSpec::fixed(65, FieldType::Binary, 1, "Bitmap Extender"),
    FieldSpec::fixed(66, FieldType::Binary, 8, "MAC - Message Authentication Code"),
];

/// Ordered, immutable sequence of field definitions for one dialect.
#[derive(Debug, Clone)]
pub struct DialectSchema {
    name: &'static str,
    fields: Vec<FieldSpec>,
}

impl DialectSchema {
    /// The built-in bankcard dialect table.
    pub fn bankcard() -> Self {
        DialectSchema {
            name: "bankcard",
            fields: BANKCARD_FIELDS.to_vec(),
        }
    }

    /// Load a dialect from an external definition file. Declared for parity
    /// with [`save_to_file`](Self::save_to_file); loading is out of scope.
    pub fn from_file(_path: &Path) -> Result<Self, CodecError> {
        Err(CodecError::NotImplemented(
            "loading dialect definitions from a file",
        ))
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn count(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, position: usize) -> Result<&FieldSpec, CodecError> {
        self.fields.get(position).ok_or(CodecError::IndexError {
            position,
            count: self.fields.len(),
        })
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Serialize the field table to an XML document. Not required for
    /// decode/encode correctness.
    pub fn save_to_file(&self, path: &Path) -> Result<(), CodecError> {
        let file = BufWriter::new(File::create(path)?);
        let mut writer = Writer::new_with_indent(file, b' ', 2);

        let mut root = BytesStart::new("isodialect");
        root.push_attribute(("name", self.name));
        writer.write_event(Event::Start(root))?;

        for f in &self.fields {
            let mut el = BytesStart::new("field");
            el.push_attribute(("num", format!("{:03}", f.position).as_str()));
            el.push_attribute(("type", f.field_type.as_str()));
            el.push_attribute(("lenType", f.length_class.as_str()));
            el.push_attribute(("lenEnc", f.length_encoding.as_str()));
            el.push_attribute(("len", format!("{:03}", f.fixed_length).as_str()));
            el.push_attribute(("desc", f.description));
            writer.write_event(Event::Empty(el))?;
        }

        writer.write_event(Event::End(BytesEnd::new("isodialect")))?;
        // BufWriter's drop-time flush swallows errors; flush here so a
        // short write surfaces as Io.
        writer.into_inner().flush()?;
        Ok(())
    }

    /// Dump the dialect definition through the given trace sink.
    pub fn trace(&self, sink: &dyn TraceSink) {
        sink.log("Tracing dialect definition:");
        sink.log(&format!("Dialect name: {}", self.name));
        sink.log(&format!("Number of fields: {}", self.fields.len()));
        for f in &self.fields {
            sink.log(&format!(
                "Field [{:03}] {:6} {:4} len {:03} {}",
                f.position,
                f.length_class.as_str(),
                f.field_type.as_str(),
                f.fixed_length,
                f.description
            ));
        }
    }
}
