//! Broadcast teletext and ancillary-data codec kernel.
//!
//! Decodes VBI/T42/ANC/MXF/MPEG-TS into a common [`model::Line`]/
//! [`model::Packet`] representation, converts between line-based formats,
//! and exports to RCWT or EBU STL.

pub mod cancel;
pub mod codec;
pub mod convert;
pub mod error;
pub mod export;
pub mod hamming;
pub mod io;
pub mod model;
pub mod prelude;
pub mod registry;
pub mod timecode;

pub use cancel::CancellationToken;
pub use error::{OpxError, Result};
pub use io::FormatIo;
pub use model::{FormatTag, Line, Packet, ParseOptions};
pub use timecode::Timecode;
