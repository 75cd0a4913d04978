//! RCWT binary subtitle encoder (spec §4.8): an 11-byte header then
//! per-line `{fts: u32, field_number: u8, t42: [u8; 42]}` records.

use crate::error::Result;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

/// Fixed 11-byte file header, written exactly once per session.
pub const RCWT_HEADER: [u8; 11] = [0xCC, 0xCC, 0xED, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00];

/// Milliseconds per frame the `fts` field assumes, regardless of the
/// source's actual frame rate (25fps convention, preserved literally).
const FTS_SCALE: u32 = 40;

/// Per-session RCWT encoder state: header-written flag and field-number
/// toggle. Lives on the instance, not as process-wide statics.
#[derive(Debug, Default)]
pub struct RcwtExporter {
    header_written: bool,
    field_number: u8,
}

impl RcwtExporter {
    pub fn new() -> Self {
        RcwtExporter::default()
    }

    /// Clears the written-header flag and resets field/subtitle counters
    /// so the same process can produce multiple independent sessions.
    pub fn reset(&mut self) {
        self.header_written = false;
        self.field_number = 0;
    }

    fn write_header<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        if !self.header_written {
            writer.write_all(&RCWT_HEADER)?;
            self.header_written = true;
        }
        Ok(())
    }

    /// Writes one record. `frame_number` drives `fts = frame_number * 40`
    /// regardless of the stream's actual frame rate.
    pub fn write_line<W: Write>(
        &mut self,
        writer: &mut W,
        frame_number: u64,
        t42: &[u8; 42],
    ) -> Result<()> {
        self.write_header(writer)?;
        let fts = (frame_number as u32).wrapping_mul(FTS_SCALE);
        writer.write_u32::<LittleEndian>(fts)?;
        writer.write_u8(self.field_number)?;
        writer.write_all(t42)?;
        self.field_number = 1 - self.field_number;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_written_exactly_once() {
        let mut exporter = RcwtExporter::new();
        let mut out = Cursor::new(Vec::new());
        exporter.write_line(&mut out, 0, &[0u8; 42]).unwrap();
        exporter.write_line(&mut out, 0, &[0u8; 42]).unwrap();
        let bytes = out.into_inner();
        assert_eq!(bytes.len(), 11 + 2 * (4 + 1 + 42));
        assert_eq!(&bytes[0..11], &RCWT_HEADER);
    }

    #[test]
    fn field_number_alternates_and_fts_scales_by_frame() {
        let mut exporter = RcwtExporter::new();
        let mut out = Cursor::new(Vec::new());
        for frame in [0u64, 0, 1, 1] {
            exporter.write_line(&mut out, frame, &[0u8; 42]).unwrap();
        }
        let bytes = out.into_inner();
        let record_at = |i: usize| &bytes[11 + i * 47..11 + i * 47 + 5];
        assert_eq!(u32::from_le_bytes(record_at(0)[0..4].try_into().unwrap()), 0);
        assert_eq!(record_at(0)[4], 0);
        assert_eq!(record_at(1)[4], 1);
        assert_eq!(u32::from_le_bytes(record_at(2)[0..4].try_into().unwrap()), 40);
        assert_eq!(record_at(2)[4], 0);
        assert_eq!(record_at(3)[4], 1);
    }

    #[test]
    fn reset_rewrites_header_on_next_session() {
        let mut exporter = RcwtExporter::new();
        let mut out = Cursor::new(Vec::new());
        exporter.write_line(&mut out, 0, &[0u8; 42]).unwrap();
        exporter.reset();
        exporter.write_line(&mut out, 0, &[0u8; 42]).unwrap();
        let bytes = out.into_inner();
        assert_eq!(&bytes[0..11], &RCWT_HEADER);
        assert_eq!(&bytes[11 + 47..11 + 47 + 11], &RCWT_HEADER);
    }
}
