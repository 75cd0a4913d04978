mod common;

use common::anc_packet;
use opx_core::model::ParseOptions;
use opx_core::FormatIo;
use opx_core::FormatTag;
use std::io::Cursor;

#[test]
fn decodes_two_packets_with_timecode_advancing() {
    let mut data = anc_packet(&[(1, 20, b"abc")]);
    data.extend(anc_packet(&[(1, 21, b"de")]));
    let mut io = FormatIo::open_stream(Cursor::new(data), FormatTag::Anc);
    let packets = io.parse_packets().unwrap();
    assert_eq!(packets.len(), 2);
    assert_eq!(
        packets[1].timecode.frame_number(),
        packets[0].timecode.frame_number() + 1
    );
}

#[test]
fn magazine_filter_suppresses_non_matching_lines() {
    let data = anc_packet(&[(1, 20, b"abc")]);
    let mut io = FormatIo::open_stream(Cursor::new(data), FormatTag::Anc)
        .with_options(ParseOptions::default().with_magazine(9));
    let packets = io.parse_packets().unwrap();
    assert!(packets.is_empty());
}
