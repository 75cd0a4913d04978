//! Convenience re-export for callers who want the common types in scope
//! with a single `use opx_core::prelude::*;`.

pub use crate::cancel::CancellationToken;
pub use crate::error::{OpxError, Result};
pub use crate::io::FormatIo;
pub use crate::model::{FormatTag, Line, Packet, ParseOptions};
pub use crate::timecode::Timecode;
