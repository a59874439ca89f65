//! Integration tests: built-in dialect table contents, XML export, and the
//! trace dump of the field definitions.

use iso8583codec::{
    CodecError, DialectSchema, FieldType, LengthClass, LengthEncoding, TraceSink,
};
use std::fs;
use std::sync::Mutex;

#[test]
fn bankcard_table_shape() {
    let schema = DialectSchema::bankcard();
    assert_eq!(schema.name(), "bankcard");
    assert_eq!(schema.count(), 67);

    let mti = schema.get(0).unwrap();
    assert_eq!(mti.field_type, FieldType::Numeric);
    assert_eq!(mti.length_class, LengthClass::Fixed);
    assert_eq!(mti.fixed_length, 4);

    let bitmap = schema.get(1).unwrap();
    assert_eq!(bitmap.field_type, FieldType::Binary);
    assert_eq!(bitmap.fixed_length, 48);

    let pan = schema.get(2).unwrap();
    assert_eq!(pan.field_type, FieldType::Numeric);
    assert_eq!(pan.length_class, LengthClass::Llvar);
    assert_eq!(pan.length_encoding, LengthEncoding::Bcd);

    let icc = schema.get(55).unwrap();
    assert_eq!(icc.field_type, FieldType::Binary);
    assert_eq!(icc.length_class, LengthClass::Lllvar);

    assert!(matches!(
        schema.get(67),
        Err(CodecError::IndexError { position: 67, count: 67 })
    ));
}

#[test]
fn from_file_is_declared_but_unsupported() {
    let err = DialectSchema::from_file(std::path::Path::new("bankcard.xml"));
    assert!(matches!(err, Err(CodecError::NotImplemented(_))));
}

#[test]
fn save_to_file_writes_field_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bankcard.xml");

    let schema = DialectSchema::bankcard();
    schema.save_to_file(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("<isodialect name=\"bankcard\">"));
    assert!(text.trim_end().ends_with("</isodialect>"));
    assert!(text.contains(
        r#"<field num="000" type="N" lenType="FIXED" lenEnc="NULL" len="004" desc="Message Type Identifier"/>"#
    ));
    assert!(text.contains(r#"num="002" type="N" lenType="LLVAR" lenEnc="BCD""#));
    assert!(text.contains(r#"num="055" type="B" lenType="LLLVAR" lenEnc="BCD""#));
    // One element per table entry.
    assert_eq!(text.matches("<field ").count(), schema.count());
}

#[cfg(unix)]
#[test]
fn save_to_file_surfaces_write_failures() {
    // /dev/full accepts the open but fails every flushed write with ENOSPC.
    let schema = DialectSchema::bankcard();
    // Depending on buffering the failure surfaces at a write or the final
    // flush; either way it must not be swallowed.
    let err = schema.save_to_file(std::path::Path::new("/dev/full"));
    assert!(err.is_err());
}

struct CollectingSink(Mutex<Vec<String>>);

impl TraceSink for CollectingSink {
    fn log(&self, line: &str) {
        if let Ok(mut lines) = self.0.lock() {
            lines.push(line.to_owned());
        }
    }
}

#[test]
fn trace_dumps_every_field() {
    let schema = DialectSchema::bankcard();
    let sink = CollectingSink(Mutex::new(Vec::new()));
    schema.trace(&sink);

    let lines = sink.0.into_inner().unwrap();
    // Three header lines, then one per field.
    assert_eq!(lines.len(), 3 + schema.count());
    assert_eq!(lines[1], "Dialect name: bankcard");
    assert!(lines[3].starts_with("Field [000]"));
    assert!(lines.iter().any(|l| l.contains("Account Number")));
}
