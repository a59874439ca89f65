//! Message assembly: header, bitmap and field values over one dialect.
//!
//! Wire layout, in order: 2-byte big-endian total length, fixed-width
//! transport header, field 0 (MTI), field 1 (bitmap, 24 bytes), then every
//! field whose bitmap bit is set in ascending position order, each prefixed
//! by the 0/1/2 length-indicator bytes its length class implies.
//!
//! BCD length indicators carry two decimal digits per byte. The indicator
//! counts digits for Numeric/Track2 fields and bytes for every other type;
//! digit-to-byte conversion happens before the read, and the cursor always
//! advances by exactly the bytes consumed.

use crate::bitmap::Bitmap;
use crate::bytes;
use crate::error::CodecError;
use crate::field::FieldValue;
use crate::schema::{DialectSchema, FieldType, LengthClass, LengthEncoding};
use crate::trace::TraceSink;
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

/// Width of the transport (TPDU) header in bytes.
pub const HEADER_LEN: usize = 5;

/// Fixed-width transport header preceding the MTI.
#[derive(Debug, Clone)]
pub struct Header {
    data: Vec<u8>,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            data: vec![0; HEADER_LEN],
        }
    }
}

impl Header {
    pub fn new() -> Self {
        Header::default()
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        Header {
            data: data.to_vec(),
        }
    }

    pub fn from_hex(hex: &str) -> Result<Self, CodecError> {
        Ok(Header {
            data: bytes::hex_to_bytes(hex)?,
        })
    }

    pub fn set_bytes(&mut self, data: &[u8]) {
        self.data = data.to_vec();
    }

    pub fn set_hex(&mut self, hex: &str) -> Result<(), CodecError> {
        self.data = bytes::hex_to_bytes(hex)?;
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.data)
    }

    pub fn to_binary_string(&self) -> String {
        self.data.iter().map(|b| format!("{b:08b}")).collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One decode/encode session over a borrowed dialect. Owns its bitmap and
/// field values exclusively; the schema is shared read-only.
pub struct Message<'d> {
    schema: &'d DialectSchema,
    pub header: Header,
    pub bitmap: Bitmap,
    fields: Vec<FieldValue>,
    f63_pending: String,
    request: Vec<u8>,
    response: Vec<u8>,
    trace: Option<&'d dyn TraceSink>,
}

impl<'d> Message<'d> {
    pub fn new(schema: &'d DialectSchema) -> Self {
        let fields = schema.fields().iter().map(FieldValue::new).collect();
        Message {
            schema,
            header: Header::new(),
            bitmap: Bitmap::new(),
            fields,
            f63_pending: String::new(),
            request: Vec::new(),
            response: Vec::new(),
            trace: None,
        }
    }

    pub fn with_trace(schema: &'d DialectSchema, sink: &'d dyn TraceSink) -> Self {
        let mut msg = Message::new(schema);
        msg.trace = Some(sink);
        msg
    }

    fn trace_line(&self, line: &str) {
        if let Some(sink) = self.trace {
            sink.log(line);
        }
    }

    pub fn schema(&self) -> &DialectSchema {
        self.schema
    }

    fn field_at(&self, position: usize) -> Result<&FieldValue, CodecError> {
        self.fields.get(position).ok_or(CodecError::IndexError {
            position,
            count: self.fields.len(),
        })
    }

    fn field_at_mut(&mut self, position: usize) -> Result<&mut FieldValue, CodecError> {
        let count = self.fields.len();
        self.fields
            .get_mut(position)
            .ok_or(CodecError::IndexError { position, count })
    }

    /// Decode a received buffer into this message.
    pub fn parse(&mut self, buf: &[u8]) -> Result<(), CodecError> {
        self.request = buf.to_vec();
        let mut pos = 0usize;

        // frame length prefix, then transport header
        take(buf, &mut pos, 2, "length prefix")?;
        self.header = Header::from_bytes(take(buf, &mut pos, HEADER_LEN, "transport header")?);

        let mti_len = self.fields[0].length_in_units();
        let mti = take(buf, &mut pos, mti_len, "field 0 (MTI)")?.to_vec();
        self.fields[0].set_value_bytes(&mti);

        let bitmap_len = self.fields[1].length_in_units();
        let bitmap_raw = take(buf, &mut pos, bitmap_len, "field 1 (bitmap)")?.to_vec();
        self.bitmap = Bitmap::from_bytes(&bitmap_raw)?;
        self.fields[1].set_value_bytes(&bitmap_raw);
        self.trace_line(&format!("parse: bitmap {}", self.bitmap.to_hex()));

        for i in 2..self.schema.count() {
            if !self.bitmap.is_set(i) {
                continue;
            }
            let class = self.fields[i].length_class();
            let byte_len = match class {
                LengthClass::Fixed => self.fields[i].length_in_units(),
                LengthClass::Llvar | LengthClass::Lllvar => {
                    if self.fields[i].length_encoding() != LengthEncoding::Bcd {
                        return Err(CodecError::NotImplemented(
                            "non-BCD length indicators",
                        ));
                    }
                    let indicator =
                        take(buf, &mut pos, class.indicator_len(), "length indicator")?;
                    let digits = bcd_indicator(indicator, i)?;
                    match self.fields[i].field_type() {
                        // digit count; odd counts consume the pad byte
                        FieldType::Numeric | FieldType::Track2 => (digits + 1) / 2,
                        _ => digits,
                    }
                }
            };
            let value = take(buf, &mut pos, byte_len, &format!("field {i}"))?.to_vec();
            self.fields[i].set_value_bytes(&value);
            self.trace_line(&format!(
                "parse: field {:03} [{} bytes] {}",
                i,
                byte_len,
                self.fields[i].value_as_hex()
            ));
        }
        Ok(())
    }

    /// Encode this message for transmission; also retained as the response
    /// buffer for [`buffer_hex`](Self::buffer_hex).
    pub fn pack(&mut self) -> Result<Vec<u8>, CodecError> {
        if !self.f63_pending.is_empty() {
            let baked = bytes::hex_to_bytes(&self.f63_pending)?;
            self.bitmap.set_bit(63)?;
            self.fields[63].set_value_bytes(&baked);
            self.f63_pending.clear();
        }

        let mut total = 2 + self.header.len();
        for i in 0..self.schema.count() {
            if self.bitmap.is_set(i) {
                total += self.fields[i].length_including_indicator();
            }
        }
        self.trace_line(&format!("pack: total outgoing length {total}"));

        let mut out = Vec::with_capacity(total);
        out.write_u16::<BigEndian>((total - 2) as u16)?;
        out.extend_from_slice(self.header.as_bytes());

        let mti = &self.fields[0];
        if mti.value_as_bytes().len() != mti.length_in_units() {
            return Err(CodecError::InvalidBitmapState(format!(
                "field 0 (MTI) value is {} bytes, schema declares {}",
                mti.value_as_bytes().len(),
                mti.length_in_units()
            )));
        }
        out.extend_from_slice(mti.value_as_bytes());
        out.extend_from_slice(self.bitmap.as_bytes());

        for i in 2..self.schema.count() {
            if !self.bitmap.is_set(i) {
                continue;
            }
            let field = &self.fields[i];
            let units = field.length_in_units();
            if field.is_empty() {
                return Err(CodecError::InvalidBitmapState(format!(
                    "field {i} marked present but no value assigned"
                )));
            }
            if field.value_as_bytes().len() != units {
                return Err(CodecError::InvalidBitmapState(format!(
                    "field {i} value is {} bytes, declared length implies {units}",
                    field.value_as_bytes().len()
                )));
            }
            let indicator = field.length_class().indicator_len();
            if indicator > 0 {
                let digits = match field.field_type() {
                    FieldType::Numeric | FieldType::Track2 => 2 * units,
                    _ => units,
                };
                let max = if indicator == 1 { 99 } else { 9999 };
                if digits > max {
                    return Err(CodecError::MalformedInput(format!(
                        "field {i} length {digits} exceeds a {}-byte BCD indicator",
                        indicator
                    )));
                }
                let packed = format!("{digits:0width$}", width = indicator * 2);
                out.extend_from_slice(&bytes::hex_to_bytes(&packed)?);
            }
            out.extend_from_slice(field.value_as_bytes());
            self.trace_line(&format!(
                "pack: field {:03} [{} bytes] {}",
                i,
                units,
                field.value_as_hex()
            ));
        }

        debug_assert_eq!(out.len(), total);
        self.response = out.clone();
        Ok(out)
    }

    /// Set a field's bitmap bit and assign its value from text.
    pub fn set_field_value(&mut self, position: usize, value: &str) -> Result<(), CodecError> {
        self.bitmap.set_bit(position)?;
        self.field_at_mut(position)?.set_value(value)
    }

    /// Set a field's bitmap bit and assign its raw bytes.
    pub fn set_field_bytes(&mut self, position: usize, value: &[u8]) -> Result<(), CodecError> {
        self.bitmap.set_bit(position)?;
        self.field_at_mut(position)?.set_value_bytes(value);
        Ok(())
    }

    /// Render a field's value; empty when its bit is clear.
    pub fn field_value(&self, position: usize) -> Result<String, CodecError> {
        let field = self.field_at(position)?;
        if self.bitmap.is_set(position) {
            Ok(field.value_as_text())
        } else {
            Ok(String::new())
        }
    }

    pub fn field(&self, position: usize) -> Result<&FieldValue, CodecError> {
        self.field_at(position)
    }

    pub fn is_field_set(&self, position: usize) -> bool {
        self.bitmap.is_set(position)
    }

    pub fn set_field(&mut self, position: usize) -> Result<(), CodecError> {
        self.bitmap.set_bit(position)
    }

    pub fn clear_field(&mut self, position: usize) -> Result<(), CodecError> {
        self.bitmap.clear_bit(position)
    }

    pub fn field_description(&self, position: usize) -> Result<&str, CodecError> {
        Ok(self.schema.get(position)?.description)
    }

    /// Wire width of a field's value in bytes.
    pub fn field_length(&self, position: usize) -> Result<usize, CodecError> {
        Ok(self.field_at(position)?.length_in_units())
    }

    /// Append one tag/value unit to the field-63 accumulator: ascii-hex tag
    /// and value, prefixed by their combined byte length as four decimal
    /// digits. Baked into field 63's raw bytes at pack time.
    pub fn append_tag_value(&mut self, tag: &str, value: &str) -> Result<(), CodecError> {
        self.bitmap.set_bit(63)?;
        let unit = format!("{}{}", bytes::ascii_to_hex(tag), bytes::ascii_to_hex(value));
        self.f63_pending
            .push_str(&format!("{:04}", unit.len() / 2));
        self.f63_pending.push_str(&unit);
        Ok(())
    }

    /// Hex rendering of the received frame's 2-byte length prefix.
    pub fn length_hex(&self) -> Result<String, CodecError> {
        bytes::bytes_to_hex(&self.request, 0, 2)
    }

    /// The received frame's declared length.
    pub fn length_int(&self) -> Result<u16, CodecError> {
        if self.request.len() < 2 {
            return Err(CodecError::truncated("length prefix", 2, self.request.len()));
        }
        Ok(BigEndian::read_u16(&self.request))
    }

    pub fn bitmap_hex(&self) -> String {
        self.bitmap.to_hex()
    }

    pub fn bitmap_binary(&self) -> String {
        self.bitmap.to_binary_string()
    }

    /// Hex of the last packed buffer.
    pub fn buffer_hex(&self) -> String {
        hex::encode_upper(&self.response)
    }

    /// Raw bytes of the received buffer.
    pub fn request_buffer(&self) -> &[u8] {
        &self.request
    }
}

/// Read `n` bytes at the cursor, advancing it; typed failure past the end.
fn take<'a>(
    buf: &'a [u8],
    pos: &mut usize,
    n: usize,
    context: &str,
) -> Result<&'a [u8], CodecError> {
    let end = pos.checked_add(n).filter(|&end| end <= buf.len()).ok_or_else(|| {
        CodecError::truncated(context, n, buf.len().saturating_sub(*pos))
    })?;
    let slice = &buf[*pos..end];
    *pos = end;
    Ok(slice)
}

/// Decode a BCD length indicator: two decimal digits per byte.
fn bcd_indicator(indicator: &[u8], position: usize) -> Result<usize, CodecError> {
    let mut digits = 0usize;
    for &b in indicator {
        let hi = (b >> 4) as usize;
        let lo = (b & 0x0F) as usize;
        if hi > 9 || lo > 9 {
            return Err(CodecError::MalformedInput(format!(
                "field {position}: length indicator byte {b:02X} is not BCD"
            )));
        }
        digits = digits * 100 + hi * 10 + lo;
    }
    Ok(digits)
}
