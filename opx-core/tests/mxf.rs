mod common;

use common::{anc_packet, klv_unit, system_value, timecode_component_value};
use opx_core::codec::mxf;
use opx_core::codec::mxf::keys::{ESSENCE_KEYS, FOURCC, GENERIC_KEYS};
use opx_core::model::ParseOptions;
use opx_core::Timecode;
use std::io::Cursor;

fn key_from(rest: &[u8]) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[0..4].copy_from_slice(&FOURCC);
    key[4..16].copy_from_slice(rest);
    key
}

#[test]
fn find_start_timecode_discovers_an_embedded_component() {
    let value = timecode_component_value(250, 25, false);
    let data = klv_unit(key_from(GENERIC_KEYS[0].0), &value);
    let mut cursor = Cursor::new(data);
    let tc = mxf::find_start_timecode(&mut cursor, 4096).unwrap();
    assert_eq!(tc.frame_number(), 250);
}

#[test]
fn filter_packets_decodes_data_units_with_the_current_system_timecode() {
    let start = Timecode::new(10, 0, 0, 0, 25, false).unwrap();

    let mut data = Vec::new();
    data.extend(klv_unit(
        key_from(GENERIC_KEYS[1].0),
        &system_value(start.hours(), start.minutes(), start.seconds(), start.frames() as u8),
    ));
    data.extend(klv_unit(
        key_from(ESSENCE_KEYS[2].0), // Data
        &anc_packet(&[(1, 20, b"hi")]),
    ));

    let mut cursor = Cursor::new(data);
    let options = ParseOptions::default();
    let packets = mxf::filter_packets(&mut cursor, start, &options, true).unwrap();
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].timecode.frame_number(), start.frame_number());
}
