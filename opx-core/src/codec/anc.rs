//! SMPTE-291-style ancillary packet decoder (spec §4.4), consumed from
//! MXF `.bin`-extracted Data essence.

use crate::error::{OpxError, Result};
use crate::model::{FormatTag, Line, Packet, ParseOptions};
use crate::timecode::Timecode;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Read;

/// Bytes in a packet header: a 16-bit line count.
const PACKET_HEADER_SIZE: usize = 2;
/// Bytes in a line header: magazine (1), row (1), sample_coding (1),
/// sample_count (2, big-endian), before `line.length` payload bytes.
const LINE_HEADER_SIZE: usize = 5;

fn read_line<R: Read>(reader: &mut R, timecode: Timecode) -> Result<Line> {
    let magazine = reader.read_u8()?;
    let row = reader.read_u8()?;
    let sample_coding = reader.read_u8()?;
    let length = reader.read_u16::<BigEndian>()? as i32;

    if length <= 0 {
        return Err(OpxError::structural("ANC line declared non-positive length"));
    }

    let mut payload = vec![0u8; length as usize];
    reader.read_exact(&mut payload)?;

    Ok(Line {
        sample_count: length as u32,
        raw: payload,
        format: FormatTag::Anc,
        sample_coding,
        magazine: Some(magazine),
        row: Some(row),
        text: None,
        timecode,
    })
}

/// Reads one ANC packet: a header giving the line count, then that many
/// fixed-header lines. Returns `Ok(None)` at a clean end of stream.
fn read_packet<R: Read>(
    reader: &mut R,
    timecode: Timecode,
    options: &ParseOptions,
) -> Result<Option<Packet>> {
    let mut header = [0u8; PACKET_HEADER_SIZE];
    match reader.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let line_count = u16::from_be_bytes(header) as usize;

    let mut lines = Vec::with_capacity(line_count);
    for _ in 0..line_count {
        let line = match read_line(reader, timecode) {
            Ok(line) => line,
            Err(OpxError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        };
        if !line.filtered_out(options) {
            lines.push(line);
        }
    }

    Ok(Some(Packet::new(timecode, options.magazine.unwrap_or(0), lines)))
}

/// Decodes ANC packets from `reader`, advancing one frame per packet and
/// suppressing packets whose every line was filtered out.
pub fn decode_packets<R: Read>(reader: &mut R, options: &ParseOptions) -> Result<Vec<Packet>> {
    let mut packets = Vec::new();
    let mut timecode = options
        .start_timecode
        .unwrap_or_else(|| Timecode::zero(25, false));

    loop {
        options.check_cancellation()?;
        let Some(packet) = read_packet(reader, timecode, options)? else {
            break;
        };
        if !packet.is_empty() {
            packets.push(packet);
        }
        timecode = timecode.next();
    }

    Ok(packets)
}
