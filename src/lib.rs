//! # iso8583codec: ISO 8583 message codec with embedded BER-TLV
//!
//! Schema-driven codec for ISO-8583-style financial transaction messages:
//! a dialect table of per-position field definitions, a presence bitmap
//! over three chained 8-byte blocks, BCD length indicators for LLVAR/LLLVAR
//! fields, and a recursive BER-style TLV codec for the chip-card (ICC) data
//! carried inside field 55.
//!
//! ## Wire format
//!
//! ```text
//! [2-byte BE total length][5-byte transport header][field 0: MTI]
//! [field 1: bitmap, 24 bytes][fields 2..N in ascending position order,
//!  each present iff its bitmap bit is set, each prefixed by 0/1/2
//!  length-indicator bytes per its length class]
//! ```
//!
//! ## Usage
//!
//! ```
//! use iso8583codec::{DialectSchema, Message};
//!
//! let schema = DialectSchema::bankcard();
//! let mut msg = Message::new(&schema);
//! msg.header.set_hex("6000030000").unwrap();
//! msg.set_field_value(0, "0800").unwrap();
//! msg.set_field_value(3, "300000").unwrap();
//! msg.set_field_value(39, "00").unwrap();
//! let wire = msg.pack().unwrap();
//!
//! let mut echo = Message::new(&schema);
//! echo.parse(&wire).unwrap();
//! assert_eq!(echo.field_value(3).unwrap(), "300000");
//! ```
//!
//! The codec is synchronous and allocation-only: parsing and packing are
//! pure transformations over in-memory buffers. A [`DialectSchema`] is
//! immutable after construction and safe to share across messages; each
//! [`Message`] is exclusive to one decode/encode session.

pub mod bitmap;
pub mod bytes;
pub mod error;
pub mod field;
pub mod message;
pub mod schema;
pub mod tlv;
pub mod trace;

pub use bitmap::{Bitmap, BITMAP_BITS, BITMAP_BYTES};
pub use error::CodecError;
pub use field::FieldValue;
pub use message::{Header, Message, HEADER_LEN};
pub use schema::{DialectSchema, FieldSpec, FieldType, LengthClass, LengthEncoding};
pub use tlv::{NodeId, TlvNode, TlvTree};
pub use trace::{ConsoleTrace, FileTrace, NoTrace, TraceSink};
