//! Timecode restripe (spec §4.5 Restripe protocol): rewrites every
//! `TimecodeComponent` and per-frame `System` timecode in place, preserving
//! file length and every BER length.

use super::keys::{classify, KeyType};
use super::{encode_system_timecode, encode_timecode_component, find_start_timecode, SYSTEM_TIMECODE_OFFSET};
use crate::error::Result;
use crate::timecode::Timecode;
use std::io::{Read, Seek, SeekFrom, Write};

const DISCOVERY_WINDOW: u64 = 128 * 1024;

fn wrap_frame(frame_number: i64, frames_per_day: i64) -> u64 {
    (((frame_number % frames_per_day) + frames_per_day) % frames_per_day) as u64
}

/// Rewrites every timecode-bearing KLV unit in `file` so the sequence
/// starts at `new_start`. File length and BER lengths are preserved.
pub fn restripe<F: Read + Write + Seek>(file: &mut F, new_start: Timecode) -> Result<()> {
    file.seek(SeekFrom::Start(0))?;
    let old_start = find_start_timecode(file, DISCOVERY_WINDOW)?;
    let timebase = old_start.timebase();
    let drop_frame = old_start.is_drop_frame();
    let frames_per_day = timebase as i64 * 86400;
    let delta = new_start.frame_number() as i64 - old_start.frame_number() as i64;

    file.seek(SeekFrom::Start(0))?;
    loop {
        let mut key = [0u8; 16];
        match file.read_exact(&mut key) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }

        let (length, _length_bytes) = crate::codec::mxf::klv::read_ber_length(file)?;
        let value_start = file.stream_position()?;
        let key_type = classify(&key);

        match key_type {
            KeyType::TimecodeComponent => {
                let mut value = vec![0u8; length as usize];
                file.read_exact(&mut value)?;
                let old = Timecode::from_frame_number(
                    u32::from_be_bytes(value[0..4].try_into().unwrap()) as u64,
                    timebase,
                    drop_frame,
                );
                let new_frame = wrap_frame(old.frame_number() as i64 + delta, frames_per_day);
                let new_tc = Timecode::from_frame_number(new_frame, timebase, drop_frame);
                let encoded = encode_timecode_component(&new_tc);
                file.seek(SeekFrom::Start(value_start))?;
                file.write_all(&encoded)?;
                file.seek(SeekFrom::Start(value_start + length))?;
            }
            KeyType::System if length as usize >= SYSTEM_TIMECODE_OFFSET + 4 => {
                let mut value = vec![0u8; length as usize];
                file.read_exact(&mut value)?;
                let bytes = &value[SYSTEM_TIMECODE_OFFSET..SYSTEM_TIMECODE_OFFSET + 4];
                let old = Timecode::new(bytes[0], bytes[1], bytes[2], bytes[3] as u32, timebase, drop_frame)?;
                let new_frame = wrap_frame(old.frame_number() as i64 + delta, frames_per_day);
                let new_tc = Timecode::from_frame_number(new_frame, timebase, drop_frame);
                let encoded = encode_system_timecode(&new_tc);
                file.seek(SeekFrom::Start(value_start + SYSTEM_TIMECODE_OFFSET as u64))?;
                file.write_all(&encoded)?;
                file.seek(SeekFrom::Start(value_start + length))?;
            }
            _ => {
                file.seek(SeekFrom::Start(value_start + length))?;
            }
        }
    }

    Ok(())
}
