//! [`FormatIo`]: the builder-style pipeline façade over the individual
//! codec modules (spec §4.10). Most callers go through this rather than
//! reaching into `codec`/`convert`/`export` directly.

use crate::codec::{anc, mxf, t42, ts, vbi};
use crate::convert::{t42_to_vbi, t42_to_vbi_double, vbi_to_t42};
use crate::error::{OpxError, Result};
use crate::export::rcwt::RcwtExporter;
use crate::export::stl::{GsiOptions, StlExporter};
use crate::model::{FormatTag, Line, Packet, ParseOptions};
use crate::timecode::Timecode;
use std::collections::HashSet;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

/// Conversion matrix the façade enforces (spec §4.10): line-yielding
/// formats may convert to any of themselves or to either session-stateful
/// export format; everything else fails fast at `convert_to` time.
fn conversion_is_supported(from: FormatTag, to: FormatTag) -> bool {
    let source_ok = matches!(from, FormatTag::Vbi | FormatTag::VbiDouble | FormatTag::T42);
    let target_ok = matches!(
        to,
        FormatTag::Vbi | FormatTag::VbiDouble | FormatTag::T42 | FormatTag::Rcwt | FormatTag::Stl
    );
    source_ok && target_ok
}

enum Source {
    Path(PathBuf),
    Reader(Box<dyn ReadSeek>),
}

trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

/// Builder-style entry point into the decode/convert/export pipeline.
pub struct FormatIo {
    source: Option<Source>,
    format: FormatTag,
    options: ParseOptions,
    target_format: Option<FormatTag>,
    /// STL "intelligent merge" toggle (spec §4.7): opt-in, so the naive
    /// one-subtitle-per-line exporter is the default.
    stl_merge: bool,
}

impl Default for FormatIo {
    fn default() -> Self {
        FormatIo {
            source: None,
            format: FormatTag::Unknown,
            options: ParseOptions::default(),
            target_format: None,
            stl_merge: false,
        }
    }
}

impl FormatIo {
    pub fn new() -> Self {
        FormatIo::default()
    }

    /// Opens a path, auto-detecting the format from its extension.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| OpxError::UnknownExtension(path.display().to_string()))?;
        let format = FormatTag::from_extension(ext)
            .ok_or_else(|| OpxError::UnknownExtension(ext.to_string()))?;
        Ok(FormatIo {
            source: Some(Source::Path(path.to_path_buf())),
            format,
            options: ParseOptions::default(),
            target_format: None,
            stl_merge: false,
        })
    }

    /// Opens an in-memory (or otherwise already-seekable) stream with an
    /// explicitly given format.
    pub fn open_stream<R: Read + Seek + Send + 'static>(reader: R, format: FormatTag) -> Self {
        FormatIo {
            source: Some(Source::Reader(Box::new(reader))),
            format,
            options: ParseOptions::default(),
            target_format: None,
            stl_merge: false,
        }
    }

    /// Buffers all of stdin into memory and opens it as `format` (stdin is
    /// not generally seekable, but MXF/TS decoding needs `Seek`).
    pub fn open_stdin(format: FormatTag) -> Result<Self> {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        Ok(FormatIo::open_stream(Cursor::new(buf), format))
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn filter(mut self, magazine: u8, rows: impl IntoIterator<Item = u8>) -> Self {
        self.options = self.options.with_magazine(magazine).with_rows(rows);
        self
    }

    pub fn with_line_count(mut self, line_count: usize) -> Self {
        self.options = self.options.with_line_count(line_count);
        self
    }

    pub fn with_start_timecode(mut self, tc: Timecode) -> Self {
        self.options = self.options.with_start_timecode(tc);
        self
    }

    pub fn with_pids(mut self, pids: impl IntoIterator<Item = u16>) -> Self {
        self.options = self.options.with_pids(pids);
        self
    }

    /// Opts an STL target into the growth-collapsing merge exporter (spec
    /// §4.7); the naive one-subtitle-per-line exporter is used otherwise.
    pub fn with_stl_merge(mut self, merge: bool) -> Self {
        self.stl_merge = merge;
        self
    }

    /// Declares the output format this pipeline will convert to, validating
    /// it against the conversion matrix immediately.
    pub fn convert_to(mut self, target: FormatTag) -> Result<Self> {
        if !conversion_is_supported(self.format, target) {
            return Err(OpxError::UnsupportedConversion {
                from: format!("{:?}", self.format),
                to: format!("{target:?}"),
            });
        }
        self.target_format = Some(target);
        Ok(self)
    }

    fn take_reader(&mut self) -> Result<Box<dyn ReadSeek>> {
        match self.source.take() {
            Some(Source::Path(path)) => Ok(Box::new(File::open(path)?)),
            Some(Source::Reader(r)) => Ok(r),
            None => Err(OpxError::structural("FormatIo has no source configured")),
        }
    }

    /// Decodes this source as a line-yielding format (VBI/VBI_DOUBLE/T42).
    pub fn parse_lines(&mut self) -> Result<Vec<Line>> {
        let format = self.format;
        let mut reader = self.take_reader()?;
        match format {
            FormatTag::T42 => t42::decode_lines(&mut reader, &self.options),
            FormatTag::Vbi | FormatTag::VbiDouble => vbi::decode_lines(&mut reader, &self.options),
            other => Err(OpxError::UnsupportedConversion {
                from: format!("{other:?}"),
                to: "lines".to_string(),
            }),
        }
    }

    /// Decodes this source as a packet-yielding format (ANC/MXF/TS).
    pub fn parse_packets(&mut self) -> Result<Vec<Packet>> {
        let format = self.format;
        let mut reader = self.take_reader()?;
        match format {
            FormatTag::Anc => anc::decode_packets(&mut reader, &self.options),
            FormatTag::Mxf => {
                let start = self.options.start_timecode.unwrap_or_else(|| Timecode::zero(25, false));
                mxf::filter_packets(&mut reader, start, &self.options, true)
            }
            FormatTag::Ts => ts::decode_packets(&mut reader, &self.options).map(|(packets, _)| packets),
            other => Err(OpxError::UnsupportedConversion {
                from: format!("{other:?}"),
                to: "packets".to_string(),
            }),
        }
    }

    /// Converts the already-decoded `lines` to the declared target format
    /// and writes them to `writer`.
    pub fn save_to<W: Write>(&self, writer: &mut W, lines: &[Line]) -> Result<()> {
        let target = self
            .target_format
            .ok_or_else(|| OpxError::structural("no target format declared; call convert_to first"))?;

        match target {
            FormatTag::T42 => {
                for line in lines {
                    let payload: [u8; 42] = line.raw.clone().try_into().map_err(|_| {
                        OpxError::structural("T42 target requires 42-byte decoded lines")
                    })?;
                    writer.write_all(&payload)?;
                }
                Ok(())
            }
            FormatTag::Vbi => {
                for line in lines {
                    let t42: [u8; 42] = line.raw.clone().try_into().map_err(|_| {
                        OpxError::structural("VBI target requires 42-byte decoded lines")
                    })?;
                    writer.write_all(&t42_to_vbi(&t42))?;
                }
                Ok(())
            }
            FormatTag::VbiDouble => {
                for line in lines {
                    let t42: [u8; 42] = line.raw.clone().try_into().map_err(|_| {
                        OpxError::structural("VBI_DOUBLE target requires 42-byte decoded lines")
                    })?;
                    writer.write_all(&t42_to_vbi_double(&t42))?;
                }
                Ok(())
            }
            FormatTag::Rcwt => {
                let mut exporter = RcwtExporter::new();
                for line in lines {
                    let t42: [u8; 42] = line.raw.clone().try_into().map_err(|_| {
                        OpxError::structural("RCWT target requires 42-byte decoded lines")
                    })?;
                    exporter.write_line(writer, line.timecode.frame_number(), &t42)?;
                }
                Ok(())
            }
            FormatTag::Stl => {
                let mut exporter = StlExporter::new(self.stl_merge, GsiOptions::default());
                for line in lines {
                    exporter.push_line(writer, line)?;
                }
                exporter.finish(writer)
            }
            other => Err(OpxError::UnsupportedConversion {
                from: format!("{:?}", self.format),
                to: format!("{other:?}"),
            }),
        }
    }

    pub fn save_to_stdout(&self, lines: &[Line]) -> Result<()> {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        self.save_to(&mut lock, lines)
    }

    /// Async counterpart to [`FormatIo::parse_lines`] (spec §5): runs the
    /// same synchronous decoder on a blocking task so a
    /// [`crate::cancel::CancellationToken`] set from another thread is
    /// observed at the next per-line suspension point inside the decoder,
    /// without an internal per-format async rewrite.
    #[cfg(feature = "async")]
    pub async fn parse_lines_async(&mut self) -> Result<Vec<Line>> {
        let format = self.format;
        let options = self.options.clone();
        let mut reader = self.take_reader()?;
        tokio::task::spawn_blocking(move || match format {
            FormatTag::T42 => t42::decode_lines(&mut reader, &options),
            FormatTag::Vbi | FormatTag::VbiDouble => vbi::decode_lines(&mut reader, &options),
            other => Err(OpxError::UnsupportedConversion {
                from: format!("{other:?}"),
                to: "lines".to_string(),
            }),
        })
        .await
        .map_err(|_| OpxError::structural("async line-decode task panicked"))?
    }

    /// Async counterpart to [`FormatIo::parse_packets`] (spec §5): same
    /// blocking-task bridge, with the cancellation check sitting once per
    /// TS packet / MXF KLV unit inside the decoder it runs.
    #[cfg(feature = "async")]
    pub async fn parse_packets_async(&mut self) -> Result<Vec<Packet>> {
        let format = self.format;
        let options = self.options.clone();
        let mut reader = self.take_reader()?;
        tokio::task::spawn_blocking(move || match format {
            FormatTag::Anc => anc::decode_packets(&mut reader, &options),
            FormatTag::Mxf => {
                let start = options.start_timecode.unwrap_or_else(|| Timecode::zero(25, false));
                mxf::filter_packets(&mut reader, start, &options, true)
            }
            FormatTag::Ts => ts::decode_packets(&mut reader, &options).map(|(packets, _)| packets),
            other => Err(OpxError::UnsupportedConversion {
                from: format!("{other:?}"),
                to: "packets".to_string(),
            }),
        })
        .await
        .map_err(|_| OpxError::structural("async packet-decode task panicked"))?
    }
}

/// Decodes a VBI/VBI_DOUBLE buffer directly to T42 lines without going
/// through the `FormatIo` builder, for callers that already hold bytes.
pub fn vbi_bytes_to_t42_lines(samples: &[u8], line_len: usize) -> Vec<[u8; 42]> {
    samples.chunks(line_len).map(vbi_to_t42).collect()
}

pub fn pids_from_names(names: impl IntoIterator<Item = u16>) -> HashSet<u16> {
    names.into_iter().collect()
}
