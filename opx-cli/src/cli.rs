//! Argument definitions for the `opx` CLI (spec §6): `filter`, `convert`,
//! `extract` and `restripe` subcommands sharing a common set of
//! magazine/row/PID selectors.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "opx", version, author, about = "Broadcast teletext and ancillary-data codec kernel")]
pub struct OpxArgs {
    #[command(subcommand)]
    pub command: OpxCommand,

    /// Increase log verbosity (can be repeated).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum OpxCommand {
    /// Decode a VBI/T42/ANC/MXF/TS source, optionally filtered by
    /// magazine/row/PID, and print decoded lines as text.
    Filter(FilterArgs),

    /// Convert a line-based source (VBI/VBI_DOUBLE/T42) to another
    /// line-based format or to RCWT/STL.
    Convert(ConvertArgs),

    /// Extract one output file per KLV key type (or per distinct key, in
    /// demux mode) from an MXF container.
    Extract(ExtractArgs),

    /// Restripe the embedded timecodes of an MXF container in place.
    Restripe(RestripeArgs),
}

#[derive(Parser, Debug)]
pub struct FilterArgs {
    pub input: PathBuf,

    /// Restrict to one teletext magazine (1-8).
    #[arg(short, long)]
    pub magazine: Option<u8>,

    /// Restrict to a comma-separated list of teletext rows.
    #[arg(short, long, value_delimiter = ',')]
    pub rows: Option<Vec<u8>>,

    /// Restrict to a comma-separated list of MPEG-TS PIDs (TS sources only).
    #[arg(short, long, value_delimiter = ',')]
    pub pids: Option<Vec<u16>>,
}

#[derive(Parser, Debug)]
pub struct ConvertArgs {
    pub input: PathBuf,
    pub output: PathBuf,

    #[arg(short, long)]
    pub magazine: Option<u8>,

    #[arg(short, long, value_delimiter = ',')]
    pub rows: Option<Vec<u8>>,

    /// For STL output, collapse growing captions into one subtitle instead
    /// of emitting one per decoded line (opt-in; off by default).
    #[arg(long)]
    pub stl_merge: bool,
}

#[derive(Parser, Debug)]
pub struct ExtractArgs {
    pub input: PathBuf,

    /// Output base path; per-key-type suffixes are appended (spec §4.5).
    #[arg(short, long, default_value = "out")]
    pub output: PathBuf,

    /// Demux one file per distinct key instead of one per key type.
    #[arg(long)]
    pub demux: bool,

    /// Use symbolic key-type names instead of hex key ids for filenames.
    #[arg(long)]
    pub names: bool,

    /// Write `.klv` (key+length+value) instead of `.raw` (value only).
    #[arg(long)]
    pub klv: bool,

    /// Restrict to these key types: any of d(ata) v(ideo) s(ystem)
    /// t(imecode) a(udio).
    #[arg(short = 'k', long, value_delimiter = ',')]
    pub key_types: Option<Vec<char>>,
}

#[derive(Parser, Debug)]
pub struct RestripeArgs {
    pub input: PathBuf,

    /// New starting timecode, `HH:MM:SS:FF` or `HH:MM:SS;FF` for drop-frame.
    #[arg(short, long)]
    pub start: String,
}
