//! Integration tests: message pack/parse round-trips across field kinds,
//! bitmap presence, length indicators, field-63 accumulation, and error paths.

use iso8583codec::{CodecError, DialectSchema, LengthClass, Message};

const HEADER: &str = "6000030000";

/// Network-management request with two data fields, matching a terminal
/// sign-on exchange byte for byte.
#[test]
fn minimal_network_management_pack() {
    let schema = DialectSchema::bankcard();
    let mut msg = Message::new(&schema);
    msg.header.set_hex(HEADER).unwrap();
    msg.set_field_value(0, "0800").unwrap();
    msg.set_field_value(3, "300000").unwrap();
    msg.set_field_value(39, "00").unwrap();

    let wire = msg.pack().unwrap();

    // 2 prefix + 5 header + 2 MTI + 24 bitmap + 3 + 2 data bytes.
    assert_eq!(wire.len(), 38);
    // Length prefix excludes itself.
    assert_eq!(&wire[..2], &[0x00, 0x24]);
    assert_eq!(&wire[2..7], &[0x60, 0x00, 0x03, 0x00, 0x00]);
    assert_eq!(&wire[7..9], &[0x08, 0x00]);

    // Field 3 sets bit 2 of byte 0, field 39 sets bit 6 of byte 4.
    let bitmap = &wire[9..33];
    assert_eq!(bitmap[0], 0x20);
    assert_eq!(bitmap[4], 0x02);
    assert!(bitmap[1..4].iter().all(|&b| b == 0));
    assert!(bitmap[5..].iter().all(|&b| b == 0));

    // Field 3 is numeric (BCD digits); field 39 is alphanumeric (ascii).
    assert_eq!(&wire[33..36], &[0x30, 0x00, 0x00]);
    assert_eq!(&wire[36..38], &[0x30, 0x30]);

    assert!(msg.is_field_set(3));
    assert!(msg.is_field_set(39));
    for p in 2..schema.count() {
        if p != 3 && p != 39 {
            assert!(!msg.is_field_set(p), "field {p} should be absent");
        }
    }
}

#[test]
fn minimal_network_management_parse() {
    let schema = DialectSchema::bankcard();
    let mut msg = Message::new(&schema);
    msg.header.set_hex(HEADER).unwrap();
    msg.set_field_value(0, "0800").unwrap();
    msg.set_field_value(3, "300000").unwrap();
    msg.set_field_value(39, "00").unwrap();
    let wire = msg.pack().unwrap();

    let mut echo = Message::new(&schema);
    echo.parse(&wire).unwrap();
    assert_eq!(echo.length_int().unwrap(), 36);
    assert_eq!(echo.length_hex().unwrap(), "0024");
    assert_eq!(echo.request_buffer(), &wire[..]);
    assert_eq!(echo.field_length(3).unwrap(), 3);
    assert_eq!(echo.field_description(3).unwrap(), "Processing Code");
    assert_eq!(echo.header.to_hex(), HEADER);
    assert_eq!(echo.field_value(0).unwrap(), "0800");
    assert_eq!(echo.field_value(3).unwrap(), "300000");
    assert_eq!(echo.field_value(39).unwrap(), "00");
    assert_eq!(echo.bitmap_hex(), msg.bitmap_hex());
    // Absent field reads back empty, not an error.
    assert_eq!(echo.field_value(4).unwrap(), "");
}

/// Round-trip covering every length class: LLVAR numeric, LLVAR track2,
/// LLLVAR text, LLLVAR binary, and fixed numeric/binary fields.
#[test]
fn mixed_field_kinds_round_trip() {
    let schema = DialectSchema::bankcard();
    let mut msg = Message::new(&schema);
    msg.header.set_hex(HEADER).unwrap();
    msg.set_field_value(0, "0200").unwrap();
    msg.set_field_value(2, "4111111111111111").unwrap();
    msg.set_field_value(3, "000000").unwrap();
    msg.set_field_value(4, "000000012345").unwrap();
    msg.set_field_value(35, "4111111111111111D2512101000000000F").unwrap();
    msg.set_field_value(41, "TERM0001").unwrap();
    msg.set_field_value(52, "0011223344556677").unwrap();
    msg.set_field_value(60, "BATCH001SOFT").unwrap();
    msg.set_field_bytes(55, &[0x9F, 0x02, 0x06, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00])
        .unwrap();

    let wire = msg.pack().unwrap();

    let mut echo = Message::new(&schema);
    echo.parse(&wire).unwrap();
    assert_eq!(echo.field_value(2).unwrap(), "4111111111111111");
    assert_eq!(echo.field_value(3).unwrap(), "000000");
    assert_eq!(echo.field_value(4).unwrap(), "000000012345");
    assert_eq!(
        echo.field_value(35).unwrap(),
        "4111111111111111D2512101000000000F"
    );
    assert_eq!(echo.field_value(41).unwrap(), "TERM0001");
    assert_eq!(echo.field_value(52).unwrap(), "0011223344556677");
    assert_eq!(echo.field_value(60).unwrap(), "BATCH001SOFT");
    assert_eq!(
        echo.field(55).unwrap().value_as_bytes(),
        &[0x9F, 0x02, 0x06, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00]
    );

    // Packing the parsed message reproduces the original buffer.
    let wire2 = echo.pack().unwrap();
    assert_eq!(wire2, wire);
}

/// A k-digit numeric variable field occupies k/2 value bytes plus one
/// indicator byte on the wire.
#[test]
fn numeric_llvar_length_indicator() {
    let schema = DialectSchema::bankcard();
    let mut msg = Message::new(&schema);
    msg.set_field_value(2, "4111111111111111").unwrap();

    let f = msg.field(2).unwrap();
    assert_eq!(f.length_class(), LengthClass::Llvar);
    assert_eq!(f.declared_length(), 16);
    assert_eq!(f.length_in_units(), 8);
    assert_eq!(f.length_including_indicator(), 9);
}

#[test]
fn llvar_indicator_digits_on_wire() {
    let schema = DialectSchema::bankcard();
    let mut msg = Message::new(&schema);
    msg.header.set_hex(HEADER).unwrap();
    msg.set_field_value(0, "0200").unwrap();
    msg.set_field_value(2, "4111111111111111").unwrap();
    let wire = msg.pack().unwrap();

    // Field 2 starts right after prefix+header+MTI+bitmap. The indicator is
    // BCD 16 (the digit count), not 8 (the byte count).
    assert_eq!(wire[33], 0x16);
    assert_eq!(&wire[34..42], &[0x41, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11]);
}

#[test]
fn field_63_accumulates_tag_value_units() {
    let schema = DialectSchema::bankcard();
    let mut msg = Message::new(&schema);
    msg.header.set_hex(HEADER).unwrap();
    msg.set_field_value(0, "0200").unwrap();
    msg.append_tag_value("DE", "01").unwrap();
    msg.append_tag_value("DF", "0203").unwrap();

    let wire = msg.pack().unwrap();
    let mut echo = Message::new(&schema);
    echo.parse(&wire).unwrap();

    assert!(echo.is_field_set(63));
    // Each unit is a 4-digit decimal length followed by ascii-hex tag+value.
    let hex = echo.field_value(63).unwrap();
    assert_eq!(hex, "0004444530310006444630323033");
    assert_eq!(&hex[..4], "0004");
    assert_eq!(&hex[4..8], "4445"); // "DE"
    assert_eq!(&hex[8..12], "3031"); // "01"
    assert_eq!(&hex[12..16], "0006");
}

#[test]
fn parse_rejects_truncated_buffer() {
    let schema = DialectSchema::bankcard();
    let mut msg = Message::new(&schema);
    msg.header.set_hex(HEADER).unwrap();
    msg.set_field_value(0, "0800").unwrap();
    msg.set_field_value(3, "300000").unwrap();
    let wire = msg.pack().unwrap();

    // Cut anywhere; the parser must report truncation, never panic.
    for cut in [1, 4, 8, 20, wire.len() - 1] {
        let mut echo = Message::new(&schema);
        match echo.parse(&wire[..cut]) {
            Err(CodecError::TruncatedMessage { .. }) => {}
            other => panic!("cut at {cut}: expected truncation, got {other:?}"),
        }
    }
}

#[test]
fn parse_rejects_non_bcd_length_indicator() {
    let schema = DialectSchema::bankcard();
    let mut wire = vec![0x00, 0x23];
    wire.extend_from_slice(&[0x60, 0x00, 0x03, 0x00, 0x00]);
    wire.extend_from_slice(&[0x02, 0x00]);
    let mut bitmap = [0u8; 24];
    bitmap[0] = 0x40; // field 2
    wire.extend_from_slice(&bitmap);
    // Hex nibbles above 9 are not decimal digits.
    wire.push(0xAB);
    wire.extend_from_slice(&[0x41, 0x11]);

    let mut msg = Message::new(&schema);
    match msg.parse(&wire) {
        Err(CodecError::MalformedInput(_)) => {}
        other => panic!("expected malformed-input error, got {other:?}"),
    }
}

#[test]
fn pack_rejects_value_exceeding_indicator_capacity() {
    let schema = DialectSchema::bankcard();
    let mut msg = Message::new(&schema);
    msg.header.set_hex(HEADER).unwrap();
    msg.set_field_value(0, "0200").unwrap();
    // 100 digits can never fit a one-byte BCD indicator (max 99).
    msg.set_field_value(2, &"1".repeat(100)).unwrap();

    match msg.pack() {
        Err(CodecError::MalformedInput(_)) => {}
        other => panic!("expected malformed-input error, got {other:?}"),
    }
}

/// An odd incoming digit count consumes the pad byte; the re-packed message
/// declares the even byte-aligned count, everything else byte-identical.
#[test]
fn odd_indicator_normalizes_to_even_on_repack() {
    let schema = DialectSchema::bankcard();
    let mut wire = vec![0x00, 0x28];
    wire.extend_from_slice(&[0x60, 0x00, 0x03, 0x00, 0x00]);
    wire.extend_from_slice(&[0x02, 0x00]);
    let mut bitmap = [0u8; 24];
    bitmap[0] = 0x40; // field 2
    wire.extend_from_slice(&bitmap);
    wire.push(0x15); // 15 digits -> 8 bytes including the pad
    let value = [0x12, 0x34, 0x56, 0x78, 0x90, 0x12, 0x34, 0x56];
    wire.extend_from_slice(&value);

    let mut msg = Message::new(&schema);
    msg.parse(&wire).unwrap();
    assert_eq!(msg.field(2).unwrap().value_as_bytes(), &value);
    assert_eq!(msg.field(2).unwrap().declared_length(), 16);

    let repacked = msg.pack().unwrap();
    assert_eq!(repacked.len(), wire.len());
    assert_eq!(&repacked[..33], &wire[..33]);
    assert_eq!(repacked[33], 0x16);
    assert_eq!(&repacked[34..], &value);
}

#[test]
fn pack_rejects_present_bit_without_value() {
    let schema = DialectSchema::bankcard();
    let mut msg = Message::new(&schema);
    msg.header.set_hex(HEADER).unwrap();
    msg.set_field_value(0, "0800").unwrap();
    msg.set_field(4).unwrap();

    match msg.pack() {
        Err(CodecError::InvalidBitmapState(_)) => {}
        other => panic!("expected bitmap-state error, got {other:?}"),
    }
}

#[test]
fn pack_rejects_fixed_length_mismatch() {
    let schema = DialectSchema::bankcard();
    let mut msg = Message::new(&schema);
    msg.header.set_hex(HEADER).unwrap();
    msg.set_field_value(0, "0800").unwrap();
    // Field 3 is fixed at 6 digits (3 bytes); give it 2 bytes.
    msg.set_field_bytes(3, &[0x30, 0x00]).unwrap();

    match msg.pack() {
        Err(CodecError::InvalidBitmapState(_)) => {}
        other => panic!("expected bitmap-state error, got {other:?}"),
    }
}

#[test]
fn set_field_value_rejects_bad_hex() {
    let schema = DialectSchema::bankcard();
    let mut msg = Message::new(&schema);
    match msg.set_field_value(2, "41G1") {
        Err(CodecError::MalformedInput(_)) => {}
        other => panic!("expected malformed-input error, got {other:?}"),
    }
}

#[test]
fn out_of_range_positions_are_index_errors() {
    let schema = DialectSchema::bankcard();
    let mut msg = Message::new(&schema);
    assert!(matches!(
        msg.set_field_value(200, "00"),
        Err(CodecError::IndexError { .. })
    ));
    assert!(matches!(
        msg.field_value(100),
        Err(CodecError::IndexError { .. })
    ));
    assert!(matches!(
        msg.field_description(100),
        Err(CodecError::IndexError { .. })
    ));
}

#[test]
fn clear_field_removes_it_from_the_wire() {
    let schema = DialectSchema::bankcard();
    let mut msg = Message::new(&schema);
    msg.header.set_hex(HEADER).unwrap();
    msg.set_field_value(0, "0800").unwrap();
    msg.set_field_value(3, "300000").unwrap();
    msg.set_field_value(39, "00").unwrap();
    msg.clear_field(39).unwrap();

    let wire = msg.pack().unwrap();
    assert!(!msg.is_field_set(39));
    assert_eq!(wire.len(), 36);

    let mut echo = Message::new(&schema);
    echo.parse(&wire).unwrap();
    assert!(!echo.is_field_set(39));
    assert_eq!(echo.field_value(39).unwrap(), "");
}

#[test]
fn positions_zero_and_one_always_read_present() {
    let schema = DialectSchema::bankcard();
    let msg = Message::new(&schema);
    assert!(msg.is_field_set(0));
    assert!(msg.is_field_set(1));
    assert!(!msg.is_field_set(2));
}
