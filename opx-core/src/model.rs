use crate::cancel::CancellationToken;
use crate::error::{OpxError, Result};
use crate::timecode::Timecode;
use std::collections::HashSet;

/// Closed set of container/line formats the kernel understands (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTag {
    Vbi,
    VbiDouble,
    T42,
    Anc,
    Mxf,
    Ts,
    Rcwt,
    Stl,
    Unknown,
}

impl FormatTag {
    /// Case-insensitive extension lookup used by the façade's path
    /// auto-detection (spec §4.10).
    pub fn from_extension(ext: &str) -> Option<FormatTag> {
        match ext.to_ascii_lowercase().as_str() {
            "vbi" => Some(FormatTag::Vbi),
            "vbid" => Some(FormatTag::VbiDouble),
            "t42" => Some(FormatTag::T42),
            "bin" => Some(FormatTag::Anc),
            "mxf" => Some(FormatTag::Mxf),
            "ts" => Some(FormatTag::Ts),
            "rcwt" => Some(FormatTag::Rcwt),
            "stl" => Some(FormatTag::Stl),
            _ => None,
        }
    }

    /// Inverse of [`FormatTag::from_extension`]; used to validate an
    /// explicit `save_to` path against a requested output format.
    pub fn default_extension(&self) -> Option<&'static str> {
        match self {
            FormatTag::Vbi => Some("vbi"),
            FormatTag::VbiDouble => Some("vbid"),
            FormatTag::T42 => Some("t42"),
            FormatTag::Anc => Some("bin"),
            FormatTag::Mxf => Some("mxf"),
            FormatTag::Ts => Some("ts"),
            FormatTag::Rcwt => Some("rcwt"),
            FormatTag::Stl => Some("stl"),
            FormatTag::Unknown => None,
        }
    }

    /// Byte length of one decoded line of this format, when the format has
    /// a fixed line length (spec §4.1).
    pub fn fixed_line_length(&self) -> Option<usize> {
        match self {
            FormatTag::T42 => Some(42),
            FormatTag::Vbi => Some(720),
            FormatTag::VbiDouble => Some(1440),
            _ => None,
        }
    }

    pub fn yields_packets(&self) -> bool {
        matches!(self, FormatTag::Anc | FormatTag::Mxf | FormatTag::Ts)
    }
}

/// Teletext page display rows (spec §4.1): the default row filter.
pub const DEFAULT_ROWS: std::ops::RangeInclusive<u8> = 0..=23;

/// Closed-caption rows subset, documented as a fixed array in spec §4.1.
pub const CAPTION_ROWS: [u8; 3] = [20, 21, 22];

/// A single decoded teletext-class line with its metadata (spec §3).
#[derive(Debug, Clone)]
pub struct Line {
    pub raw: Vec<u8>,
    pub format: FormatTag,
    /// SMPTE 291-style sample-coding byte; meaningful for ANC-sourced lines.
    pub sample_coding: u8,
    pub sample_count: u32,
    pub magazine: Option<u8>,
    pub row: Option<u8>,
    pub text: Option<String>,
    pub timecode: Timecode,
}

impl Line {
    pub fn new(raw: Vec<u8>, format: FormatTag, timecode: Timecode) -> Result<Self> {
        if let Some(expected) = format.fixed_line_length() {
            if raw.len() != expected {
                return Err(OpxError::structural(format!(
                    "{format:?} line must be {expected} bytes, got {}",
                    raw.len()
                )));
            }
        }
        Ok(Line {
            sample_count: raw.len() as u32,
            raw,
            format,
            sample_coding: 0,
            magazine: None,
            row: None,
            text: None,
            timecode,
        })
    }

    pub fn length(&self) -> usize {
        self.raw.len()
    }

    /// True if the line's magazine/row fail the given filter — a
    /// Filter-mismatch per spec §7, never surfaced as an error.
    pub fn filtered_out(&self, options: &ParseOptions) -> bool {
        if let Some(mag) = options.magazine {
            if self.magazine != Some(mag) {
                return true;
            }
        }
        if let Some(row) = self.row {
            if !options.rows.contains(&row) {
                return true;
            }
        }
        false
    }
}

/// A frame-level grouping of lines (spec §3). Invariant: `lines.len() ==
/// line_count`.
#[derive(Debug, Clone)]
pub struct Packet {
    pub timecode: Timecode,
    pub magazine: u8,
    pub lines: Vec<Line>,
}

impl Packet {
    pub fn new(timecode: Timecode, magazine: u8, lines: Vec<Line>) -> Self {
        Packet {
            timecode,
            magazine,
            lines,
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Configuration consumed by every decoder (spec §3).
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub magazine: Option<u8>,
    pub rows: HashSet<u8>,
    pub output_format: FormatTag,
    pub start_timecode: Option<Timecode>,
    pub pids: Option<HashSet<u16>>,
    /// Lines per frame for formats without an intrinsic frame boundary.
    pub line_count: usize,
    pub verbose: bool,
    /// Checked once per decoded unit (spec §5); `None` means uncancellable.
    pub cancellation: Option<CancellationToken>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            magazine: None,
            rows: DEFAULT_ROWS.collect(),
            output_format: FormatTag::Unknown,
            start_timecode: None,
            pids: None,
            line_count: 2,
            verbose: false,
            cancellation: None,
        }
    }
}

impl ParseOptions {
    pub fn with_magazine(mut self, magazine: u8) -> Self {
        self.magazine = Some(magazine);
        self
    }

    pub fn with_rows<I: IntoIterator<Item = u8>>(mut self, rows: I) -> Self {
        self.rows = rows.into_iter().collect();
        self
    }

    pub fn with_line_count(mut self, line_count: usize) -> Self {
        self.line_count = line_count;
        self
    }

    pub fn with_start_timecode(mut self, tc: Timecode) -> Self {
        self.start_timecode = Some(tc);
        self
    }

    pub fn with_pids<I: IntoIterator<Item = u16>>(mut self, pids: I) -> Self {
        self.pids = Some(pids.into_iter().collect());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The suspension-point check every decode loop calls once per unit.
    pub(crate) fn check_cancellation(&self) -> Result<()> {
        match &self.cancellation {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_extension_is_case_insensitive() {
        assert_eq!(FormatTag::from_extension("MXF"), Some(FormatTag::Mxf));
        assert_eq!(FormatTag::from_extension("VbiD"), Some(FormatTag::VbiDouble));
        assert_eq!(FormatTag::from_extension("xyz"), None);
    }

    #[test]
    fn line_enforces_fixed_length() {
        let tc = Timecode::zero(25, false);
        assert!(Line::new(vec![0u8; 42], FormatTag::T42, tc).is_ok());
        assert!(Line::new(vec![0u8; 41], FormatTag::T42, tc).is_err());
    }

    #[test]
    fn default_rows_cover_teletext_page() {
        let opts = ParseOptions::default();
        assert!(opts.rows.contains(&0));
        assert!(opts.rows.contains(&23));
        assert!(!opts.rows.contains(&24));
    }
}
