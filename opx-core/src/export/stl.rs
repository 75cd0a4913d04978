//! EBU-t3264 (STL) subtitle encoder (spec §4.7): a 1024-byte GSI header
//! then 128-byte TTI blocks, with an opt-in merge exporter that collapses
//! frame-by-frame caption growth into human-readable subtitles.

use crate::error::Result;
use crate::model::Line;
use crate::timecode::Timecode;
use chrono::Local;
use std::io::Write;

const GSI_LEN: usize = 1024;
const TTI_LEN: usize = 128;
const TF_LEN: usize = 112;

fn write_ascii(buf: &mut [u8], offset: usize, value: &str) {
    let bytes = value.as_bytes();
    buf[offset..offset + bytes.len()].copy_from_slice(bytes);
}

/// Country-of-origin and publisher fields a caller may override; everything
/// else in the GSI is fixed by the format.
#[derive(Debug, Clone)]
pub struct GsiOptions {
    pub country_of_origin: String,
    pub publisher: String,
}

impl Default for GsiOptions {
    fn default() -> Self {
        GsiOptions {
            country_of_origin: "AUS".to_string(),
            publisher: String::new(),
        }
    }
}

/// Builds the fixed 1024-byte GSI header (spec §4.7 table), space-filled
/// except for the documented literal fields.
pub fn build_gsi(options: &GsiOptions) -> [u8; GSI_LEN] {
    let mut gsi = [0x20u8; GSI_LEN];

    write_ascii(&mut gsi, 0, "437");
    write_ascii(&mut gsi, 3, "STL25.01");
    gsi[11] = 0x31;
    write_ascii(&mut gsi, 12, "00");
    write_ascii(&mut gsi, 14, "09");
    // OPT (16, 32 bytes) stays space-padded.

    let today = Local::now().format("%y%m%d").to_string();
    write_ascii(&mut gsi, 224, &today);
    write_ascii(&mut gsi, 230, &today);
    write_ascii(&mut gsi, 236, "01");

    write_ascii(&mut gsi, 238, "00000");
    write_ascii(&mut gsi, 243, "00000");
    write_ascii(&mut gsi, 248, "001");

    write_ascii(&mut gsi, 251, "38");
    write_ascii(&mut gsi, 253, "23");
    gsi[255] = 0x31;
    write_ascii(&mut gsi, 256, "00000000");
    write_ascii(&mut gsi, 264, "00000000");
    gsi[272] = 0x31;
    gsi[273] = 0x31;
    write_ascii(&mut gsi, 274, &options.country_of_origin);
    write_ascii(&mut gsi, 277, &options.publisher);

    gsi
}

fn build_tf(text: &str) -> [u8; TF_LEN] {
    let mut tf = [0x20u8; TF_LEN];
    let bytes = text.as_bytes();
    let n = bytes.len().min(TF_LEN);
    tf[0..n].copy_from_slice(&bytes[0..n]);
    if n < TF_LEN {
        tf[n] = 0x8F;
    }
    tf
}

fn tc_bytes(tc: &Timecode) -> [u8; 4] {
    [tc.hours(), tc.minutes(), tc.seconds(), tc.frames() as u8]
}

/// Builds one 128-byte TTI block.
pub fn build_tti(subtitle_number: u16, row: u8, start: &Timecode, end: &Timecode, text: &str) -> [u8; TTI_LEN] {
    let mut tti = [0u8; TTI_LEN];
    tti[0] = 0; // SGN: subtitle group number
    tti[1..3].copy_from_slice(&subtitle_number.to_le_bytes());
    tti[3] = 0xFF; // EBN: no extension block follows
    tti[4] = 0; // CS: not cumulative
    tti[5..9].copy_from_slice(&tc_bytes(start));
    tti[9..13].copy_from_slice(&tc_bytes(end));
    tti[13] = row;
    tti[14] = 2; // JC: centred
    tti[15] = 0; // CF: no comment
    tti[16..128].copy_from_slice(&build_tf(text));
    tti
}

/// A line is "empty" iff every byte from its first displayable position
/// is a space or control code (spec §4.7 blank-line filter).
fn is_blank(line: &Line) -> bool {
    let first_displayable = if line.row == Some(0) { 10 } else { 2 };
    line.raw
        .iter()
        .skip(first_displayable)
        .all(|&b| b <= 0x20)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Growing,
}

struct Pending {
    text: String,
    start: Timecode,
    row: u8,
    #[allow(dead_code)]
    kind: PendingKind,
}

/// Per-session STL encoder: owns the GSI header-written flag and the
/// subtitle counter, plus (in merge mode) the growth-collapsing state
/// machine described in spec §4.7.
pub struct StlExporter {
    header_written: bool,
    subtitle_counter: u16,
    merge: bool,
    pending: Option<Pending>,
    clear_countdown: Option<u32>,
    last_tc: Timecode,
    options: GsiOptions,
}

const CLEAR_COUNTDOWN_FRAMES: u32 = 30;

impl StlExporter {
    pub fn new(merge: bool, options: GsiOptions) -> Self {
        StlExporter {
            header_written: false,
            subtitle_counter: 1,
            merge,
            pending: None,
            clear_countdown: None,
            last_tc: Timecode::zero(25, false),
            options,
        }
    }

    pub fn reset(&mut self) {
        self.header_written = false;
        self.subtitle_counter = 1;
        self.pending = None;
        self.clear_countdown = None;
    }

    fn ensure_header<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        if !self.header_written {
            writer.write_all(&build_gsi(&self.options))?;
            self.header_written = true;
        }
        Ok(())
    }

    fn emit<W: Write>(&mut self, writer: &mut W, pending: &Pending, end: Timecode) -> Result<()> {
        let tti = build_tti(self.subtitle_counter, pending.row, &pending.start, &end, &pending.text);
        writer.write_all(&tti)?;
        self.subtitle_counter += 1;
        Ok(())
    }

    /// True if `grown` is `base` with more, non-whitespace-trimmed content
    /// appended — the growth test the merge state machine uses to decide
    /// whether to extend the current subtitle instead of starting a new one.
    /// Also tolerant to `base`'s top row scrolling off: if dropping
    /// `base`'s first row still prefixes `grown`, that counts as growth too.
    fn is_growth(base: &str, grown: &str) -> bool {
        let base_trimmed = base.trim_end();
        let grown_trimmed = grown.trim_end();
        if grown_trimmed.len() > base_trimmed.len() && grown_trimmed.starts_with(base_trimmed) {
            return true;
        }
        if let Some(nl) = base_trimmed.find('\n') {
            let shifted = &base_trimmed[nl + 1..];
            if !shifted.is_empty()
                && grown_trimmed.len() > shifted.len()
                && grown_trimmed.starts_with(shifted)
            {
                return true;
            }
        }
        false
    }

    fn push_naive<W: Write>(&mut self, writer: &mut W, line: &Line) -> Result<()> {
        self.ensure_header(writer)?;
        if is_blank(line) {
            return Ok(());
        }
        let text = line.text.clone().unwrap_or_default();
        let tti = build_tti(self.subtitle_counter, line.row.unwrap_or(0), &line.timecode, &line.timecode.next(), &text);
        writer.write_all(&tti)?;
        self.subtitle_counter += 1;
        Ok(())
    }

    fn push_merge<W: Write>(&mut self, writer: &mut W, line: &Line) -> Result<()> {
        self.ensure_header(writer)?;
        self.last_tc = line.timecode;

        if is_blank(line) {
            if self.pending.is_some() {
                match self.clear_countdown {
                    None => self.clear_countdown = Some(CLEAR_COUNTDOWN_FRAMES),
                    Some(0) => {
                        let pending = self.pending.take().unwrap();
                        self.emit(writer, &pending, line.timecode)?;
                        self.clear_countdown = None;
                    }
                    Some(n) => self.clear_countdown = Some(n - 1),
                }
            }
            return Ok(());
        }

        self.clear_countdown = None;
        let text = line.text.clone().unwrap_or_default();
        let row = line.row.unwrap_or(0);

        match &mut self.pending {
            None => {
                self.pending = Some(Pending {
                    text,
                    start: line.timecode,
                    row,
                    kind: PendingKind::Growing,
                });
            }
            Some(pending) if Self::is_growth(&pending.text, &text) => {
                pending.text = text;
            }
            Some(_) => {
                let old = self.pending.take().unwrap();
                self.emit(writer, &old, line.timecode)?;
                self.pending = Some(Pending {
                    text,
                    start: line.timecode,
                    row,
                    kind: PendingKind::Growing,
                });
            }
        }
        Ok(())
    }

    /// Feeds one decoded line, emitting a TTI block when the state machine
    /// (merge mode) or the per-line policy (naive mode) decides to.
    pub fn push_line<W: Write>(&mut self, writer: &mut W, line: &Line) -> Result<()> {
        if self.merge {
            self.push_merge(writer, line)
        } else {
            self.push_naive(writer, line)
        }
    }

    /// Flushes any pending subtitle using the last observed timecode.
    pub fn finish<W: Write>(mut self, writer: &mut W) -> Result<()> {
        self.ensure_header(writer)?;
        if let Some(pending) = self.pending.take() {
            self.emit(writer, &pending, self.last_tc)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FormatTag;
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
    fn gsi_has_fixed_length_and_literal_fields() {
        let gsi = build_gsi(&GsiOptions::default());
        assert_eq!(gsi.len(), GSI_LEN);
        assert_eq!(&gsi[0..3], b"437");
        assert_eq!(&gsi[3..11], b"STL25.01");
        assert_eq!(gsi[11], 0x31);
    }

    #[test]
    fn tti_has_fixed_length() {
        let tc = Timecode::zero(25, false);
        let tti = build_tti(1, 20, &tc, &tc, "hello");
        assert_eq!(tti.len(), TTI_LEN);
        assert_eq!(u16::from_le_bytes([tti[1], tti[2]]), 1);
    }

    #[test]
    fn merge_collapses_growing_caption_into_one_subtitle() {
        let mut exporter = StlExporter::new(true, GsiOptions::default());
        let mut out = Cursor::new(Vec::new());
        let tc0 = Timecode::zero(25, false);
        exporter.push_line(&mut out, &text_line("hello", 20, tc0)).unwrap();
        let tc1 = tc0.next();
        exporter.push_line(&mut out, &text_line("hello world", 20, tc1)).unwrap();
        exporter.finish(&mut out).unwrap();

        let bytes = out.into_inner();
        let tti_count = (bytes.len() - GSI_LEN) / TTI_LEN;
        assert_eq!(tti_count, 1);
    }

    #[test]
    fn merge_emits_separate_subtitles_for_unrelated_text() {
        let mut exporter = StlExporter::new(true, GsiOptions::default());
        let mut out = Cursor::new(Vec::new());
        let tc0 = Timecode::zero(25, false);
        exporter.push_line(&mut out, &text_line("hello", 20, tc0)).unwrap();
        let tc1 = tc0.next();
        exporter.push_line(&mut out, &text_line("goodbye", 20, tc1)).unwrap();
        exporter.finish(&mut out).unwrap();

        let bytes = out.into_inner();
        let tti_count = (bytes.len() - GSI_LEN) / TTI_LEN;
        assert_eq!(tti_count, 2);
    }

    #[test]
    fn merge_collapses_caption_that_shifted_up_one_row() {
        let mut exporter = StlExporter::new(true, GsiOptions::default());
        let mut out = Cursor::new(Vec::new());
        let tc0 = Timecode::zero(25, false);
        exporter
            .push_line(&mut out, &text_line("line1\nline2", 20, tc0))
            .unwrap();
        let tc1 = tc0.next();
        exporter
            .push_line(&mut out, &text_line("line2\nline3", 20, tc1))
            .unwrap();
        exporter.finish(&mut out).unwrap();

        let bytes = out.into_inner();
        let tti_count = (bytes.len() - GSI_LEN) / TTI_LEN;
        assert_eq!(tti_count, 1);
    }

    #[test]
    fn blank_line_is_detected_past_first_displayable_position() {
        let tc = Timecode::zero(25, false);
        let blank = text_line("", 20, tc);
        assert!(is_blank(&blank));
        let non_blank = text_line("hi", 20, tc);
        assert!(!is_blank(&non_blank));
    }
}
