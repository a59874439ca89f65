//! Build a network-management (0800) request, pack it, parse it back, and
//! walk the TLV content of a field-55 style ICC payload.
//!
//! Usage:
//!   iso_demo [DIALECT_XML]
//!
//! When a path is given, the dialect table is also saved there as XML.

use anyhow::{Context, Result};
use iso8583codec::{DialectSchema, Message, TlvTree, TraceSink};
use std::env;
use std::path::Path;

/// Demo sink: codec tracing straight to stdout.
struct StdoutTrace;

impl TraceSink for StdoutTrace {
    fn log(&self, line: &str) {
        println!("{line}");
    }
}

fn main() -> Result<()> {
    let schema = DialectSchema::bankcard();
    let trace = StdoutTrace;
    schema.trace(&trace);

    let mut msg = Message::with_trace(&schema, &trace);
    msg.header.set_hex("6000030000")?;
    msg.set_field_value(0, "0800")?;
    msg.set_field_value(3, "300000")?;
    msg.set_field_value(39, "00")?;
    msg.append_tag_value("DE", "01")?;

    let wire = msg.pack()?;
    println!("ISO Bitmap HEX:     [{}]", msg.bitmap_hex());
    println!("ISO Bitmap Binary:  [{}]", msg.bitmap_binary());
    println!("Message Buffer HEX: [{}]", msg.buffer_hex());

    let mut echo = Message::new(&schema);
    echo.parse(&wire).context("parsing the packed buffer back")?;
    println!(
        "Parsed back: MTI [{}] field 3 [{}] field 39 [{}] field 63 [{}]",
        echo.field_value(0)?,
        echo.field_value(3)?,
        echo.field_value(39)?,
        echo.field_value(63)?,
    );

    // A representative ICC payload: amount (9F02), currency (5F2A), and an
    // FCI template (6F) wrapping a DF name (84).
    let icc = [
        0x9F, 0x02, 0x06, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, //
        0x5F, 0x2A, 0x02, 0x09, 0x78, //
        0x6F, 0x04, 0x84, 0x02, 0xA0, 0x00,
    ];
    let tree = TlvTree::parse(&icc)?;
    println!("ICC data: {} TLV elements", tree.len());
    for node in tree.nodes() {
        println!(
            "  TAG:{} LEN:{} DATA:{}{}",
            node.tag_hex(),
            node.len(),
            node.value_hex(),
            node.parent()
                .and_then(|p| tree.node(p))
                .map(|p| format!(" PARENT:{}", p.tag_hex()))
                .unwrap_or_default(),
        );
    }
    if let Some(amount) = tree.first_with_tag("9F02") {
        println!("Transaction amount: {}", amount.value_hex());
    }

    if let Some(path) = env::args().nth(1) {
        schema.save_to_file(Path::new(&path))?;
        println!("Dialect saved to {path}");
    }
    Ok(())
}
