//! VBI waveform line decoder (spec §4.3): raw sampled teletext lines,
//! normalised/thresholded/offset-searched down to a T42 payload.

use crate::error::Result;
use crate::model::{FormatTag, Line, ParseOptions};
use crate::timecode::Timecode;
use std::io::Read;

const THRESHOLD: f32 = 0.40;

/// How far (in bit-position units, one unit = one upsampled sample) the
/// offset search scans looking for clock run-in + framing code. The clock
/// pattern `0x55` repeats every 8 samples at the nominal bit stride, so one
/// full stride cycle is enough to find it if present at all.
const MAX_OFFSET_SEARCH: usize = 32;
const CLOCK_OFFSET_1: usize = 32;
const FRAMING_OFFSET_1: usize = 64;
const FRAMING_OFFSET_2: usize = 68;
const NORMAL_STRIDE: usize = 32;
const EXTENDED_STRIDE: usize = 36;
const PAYLOAD_BYTES: usize = 42;

/// Upsamples a 720-byte VBI line to 1440 bytes by nearest-neighbour
/// interpolation of adjacent samples; the last sample is duplicated.
fn upsample_720_to_1440(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1440);
    for i in 0..input.len() {
        out.push(input[i]);
        let next = input.get(i + 1).copied().unwrap_or(input[i]);
        out.push(((input[i] as u16 + next as u16) / 2) as u8);
    }
    out
}

/// Normalises a line's samples to `[0.0, 1.0]` using its own min/max.
fn normalise(samples: &[u8]) -> Vec<f32> {
    let min = *samples.iter().min().unwrap_or(&0) as f32;
    let max = *samples.iter().max().unwrap_or(&255) as f32;
    let range = if max == min { 1.0 } else { max - min };
    samples
        .iter()
        .map(|&b| (b as f32 - min) / range)
        .collect()
}

fn threshold(normalised: &[f32]) -> Vec<u8> {
    normalised
        .iter()
        .map(|&f| if f > THRESHOLD { 1 } else { 0 })
        .collect()
}

/// Reconstructs a byte from bits sampled at relative positions
/// `{0,4,8,...,28}` from `offset`, LSB first.
fn read_byte(bits: &[u8], offset: usize) -> u8 {
    let mut byte = 0u8;
    for k in 0..8 {
        let pos = offset + k * 4;
        if bits.get(pos).copied().unwrap_or(0) != 0 {
            byte |= 1 << k;
        }
    }
    byte
}

/// Scans for clock run-in (`0x55 0x55`) followed by a framing code
/// (`0x27`), returning the bit offset just past the framing code.
fn find_offset(bits: &[u8]) -> Option<usize> {
    for o in 0..MAX_OFFSET_SEARCH.min(bits.len()) {
        let b0 = read_byte(bits, o);
        let b1 = read_byte(bits, o + CLOCK_OFFSET_1);
        if b0 != 0x55 || b1 != 0x55 {
            continue;
        }
        let b2 = read_byte(bits, o + FRAMING_OFFSET_1);
        let b3 = read_byte(bits, o + FRAMING_OFFSET_2);
        if b2 == 0x27 {
            return Some(o + FRAMING_OFFSET_1 + NORMAL_STRIDE);
        }
        if b3 == 0x27 {
            return Some(o + FRAMING_OFFSET_2 + NORMAL_STRIDE);
        }
    }
    None
}

/// Forces odd parity on a data byte by flipping bit 7 when the decoded
/// byte currently has even parity.
fn enforce_odd_parity(byte: u8) -> u8 {
    if byte.count_ones() % 2 == 0 {
        byte ^ 0x80
    } else {
        byte
    }
}

/// Copies 42 payload bytes past the framing code, using a drift-compensating
/// byte stride. The emitted byte value is always the sample at the current
/// offset; only the stride to the next byte differs between branches.
fn collect_payload(bits: &[u8], start_offset: usize) -> [u8; PAYLOAD_BYTES] {
    let mut out = [0u8; PAYLOAD_BYTES];
    let mut offset = start_offset;
    for slot in out.iter_mut() {
        let prev = read_byte(bits, offset.saturating_sub(NORMAL_STRIDE));
        let cur = read_byte(bits, offset);
        let next = read_byte(bits, offset + NORMAL_STRIDE);
        let next2 = read_byte(bits, offset + 2 * NORMAL_STRIDE);

        *slot = enforce_odd_parity(cur);

        let stride = if prev == cur && (cur != next2 || (next2 | 0x80) == cur) {
            NORMAL_STRIDE
        } else if prev != cur && cur == next {
            EXTENDED_STRIDE
        } else {
            NORMAL_STRIDE
        };
        offset += stride;
    }
    out
}

/// Decodes one VBI line (720 or 1440 bytes) to its 42-byte T42 payload. On
/// failed offset search, returns a blank (all-zero) line.
pub fn vbi_line_to_t42(samples: &[u8]) -> [u8; PAYLOAD_BYTES] {
    let upsampled = if samples.len() == 720 {
        upsample_720_to_1440(samples)
    } else {
        samples.to_vec()
    };
    let normalised = normalise(&upsampled);
    let bits = threshold(&normalised);

    match find_offset(&bits) {
        Some(offset) => collect_payload(&bits, offset),
        None => [0u8; PAYLOAD_BYTES],
    }
}

/// Reads VBI lines from `reader` (fixed-length per `options.output_format`)
/// and yields their decoded T42 lines, applying magazine/row filters.
pub fn decode_lines<R: Read>(reader: &mut R, options: &ParseOptions) -> Result<Vec<Line>> {
    let line_len = if options.output_format == FormatTag::VbiDouble {
        1440
    } else {
        720
    };
    let mut lines = Vec::new();
    let mut buf = vec![0u8; line_len];
    let mut timecode = options
        .start_timecode
        .unwrap_or_else(|| Timecode::zero(25, false));
    let mut line_in_frame = 0usize;

    loop {
        options.check_cancellation()?;

        match reader.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }

        let payload = vbi_line_to_t42(&buf);
        let mut line = Line::new(payload.to_vec(), FormatTag::T42, timecode)?;
        let magazine = crate::hamming::decode_byte(payload[0]) & 0x07;
        line.magazine = Some(if magazine == 0 { 8 } else { magazine });
        line.row = Some(crate::hamming::decode_pair(payload[0], payload[1]) >> 3);

        if !line.filtered_out(options) {
            lines.push(line);
        }

        line_in_frame += 1;
        if line_in_frame >= options.line_count.max(1) {
            line_in_frame = 0;
            timecode = timecode.next();
        }
    }

    Ok(lines)
}
