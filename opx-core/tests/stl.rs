use opx_core::export::stl::{build_gsi, GsiOptions, StlExporter};
use opx_core::model::{FormatTag, Line};
use opx_core::Timecode;
use std::io::Cursor;

fn text_line(text: &str, row: u8, tc: Timecode) -> Line {
    let mut raw = vec![0x20u8; 42];
    for (i, b) in text.bytes().enumerate().take(40) {
        raw[2 + i] = b;
    }
    Line {
        raw,
        format: FormatTag::T42,
        sample_coding: 0,
        sample_count: 42,
        magazine: Some(8),
        row: Some(row),
        text: Some(text.to_string()),
        timecode: tc,
    }
}

#[test]
fn gsi_header_is_exactly_1024_bytes() {
    let gsi = build_gsi(&GsiOptions::default());
    assert_eq!(gsi.len(), 1024);
}

#[test]
fn a_full_session_writes_a_header_plus_one_tti_block_per_subtitle() {
    let mut exporter = StlExporter::new(true, GsiOptions::default());
    let mut out = Cursor::new(Vec::new());
    let tc0 = Timecode::zero(25, false);
    exporter.push_line(&mut out, &text_line("hello", 20, tc0)).unwrap();
    let tc1 = tc0.next();
    exporter.push_line(&mut out, &text_line("", 20, tc1)).unwrap();
    for _ in 0..31 {
        exporter.push_line(&mut out, &text_line("", 20, tc1)).unwrap();
    }
    exporter.finish(&mut out).unwrap();

    let bytes = out.into_inner();
    assert!(bytes.len() > 1024);
    assert_eq!((bytes.len() - 1024) % 128, 0);
}
