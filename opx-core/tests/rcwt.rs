use opx_core::export::rcwt::{RcwtExporter, RCWT_HEADER};
use std::io::Cursor;

#[test]
fn writes_header_once_and_scales_fts_by_frame_number() {
    let mut exporter = RcwtExporter::new();
    let mut out = Cursor::new(Vec::new());
    exporter.write_line(&mut out, 0, &[0u8; 42]).unwrap();
    exporter.write_line(&mut out, 3, &[0u8; 42]).unwrap();

    let bytes = out.into_inner();
    assert_eq!(&bytes[0..RCWT_HEADER.len()], &RCWT_HEADER);

    let second_record_at = RCWT_HEADER.len() + (4 + 1 + 42);
    let fts = u32::from_le_bytes(bytes[second_record_at..second_record_at + 4].try_into().unwrap());
    assert_eq!(fts, 120);
}
