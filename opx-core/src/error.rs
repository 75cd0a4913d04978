use std::string::FromUtf8Error;
use thiserror::Error;

/// One variant per error kind in the format codec kernel's error-handling
/// design: IO, format-detection, decode-structural, decode-soft,
/// unsupported-conversion, sequential-violation and cancellation.
/// Filter-mismatch is not represented here — it is a silent drop, not an
/// error.
#[derive(Error, Debug)]
pub enum OpxError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    InvalidString(#[from] FromUtf8Error),

    #[error("unrecognised format extension: {0:?}")]
    UnknownExtension(String),

    #[error("no sync byte found in transport stream")]
    NoSyncFound,

    #[error("decode error at offset {offset:?}: {message}")]
    DecodeStructural {
        offset: Option<u64>,
        message: String,
    },

    #[error("conversion from {from:?} to {to:?} is not supported")]
    UnsupportedConversion { from: String, to: String },

    #[error("non-sequential timecode at frame {frame}: expected {expected}, got {got}")]
    SequentialViolation {
        frame: u64,
        expected: String,
        got: String,
    },

    #[error("operation was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, OpxError>;

impl OpxError {
    pub fn structural<S: Into<String>>(message: S) -> Self {
        OpxError::DecodeStructural {
            offset: None,
            message: message.into(),
        }
    }

    pub fn structural_at<S: Into<String>>(offset: u64, message: S) -> Self {
        OpxError::DecodeStructural {
            offset: Some(offset),
            message: message.into(),
        }
    }
}
