mod common;

use common::t42_line;
use opx_core::convert::t42_to_vbi;
use opx_core::FormatIo;
use opx_core::FormatTag;
use std::io::Cursor;

#[test]
fn decodes_a_synthesised_vbi_line_back_to_its_magazine() {
    let t42 = t42_line(3, 20, b"hello");
    let vbi_line = t42_to_vbi(&t42);
    let mut io = FormatIo::open_stream(Cursor::new(vbi_line.to_vec()), FormatTag::Vbi);
    let lines = io.parse_lines().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].magazine, Some(3));
}

#[test]
fn missing_clock_run_in_decodes_to_a_filtered_blank_line() {
    let blank = vec![0u8; 720];
    let mut io = FormatIo::open_stream(Cursor::new(blank), FormatTag::Vbi);
    let lines = io.parse_lines().unwrap();
    // magazine 8 (normalised from 0), row 0 falls within the default filter.
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].magazine, Some(8));
}
