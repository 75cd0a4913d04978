use opx_core::Timecode;

#[test]
fn non_drop_frame_advances_and_wraps() {
    let mut tc = Timecode::new(0, 0, 0, 0, 25, false).unwrap();
    for _ in 0..25 {
        tc = tc.next();
    }
    assert_eq!(tc.seconds(), 1);
    assert_eq!(tc.frames(), 0);
}

#[test]
fn frame_number_round_trips_through_display() {
    let tc = Timecode::new(2, 30, 15, 10, 25, false).unwrap();
    let recovered = Timecode::from_frame_number(tc.frame_number(), 25, false);
    assert_eq!(tc.to_string(), recovered.to_string());
}

#[test]
fn drop_frame_skips_labels_at_non_decade_minutes() {
    let tc = Timecode::new(0, 0, 59, 29, 30, true).unwrap();
    let next = tc.next();
    assert_eq!((next.minutes(), next.seconds(), next.frames()), (1, 0, 2));
}
