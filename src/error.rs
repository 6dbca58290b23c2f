//! Error types shared by the reader, the native bindings and the sweep view.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A (channel, sweep) pair whose raw sample read returned no points.
///
/// `sweep` is 0-based; the native dataset number is `sweep + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedRead {
    pub channel: usize,
    pub sweep: usize,
    pub points_read: i64,
}

/// Errors raised while opening, decoding or browsing a CFS recording.
#[derive(Error, Debug)]
pub enum CfsError {
    #[error("CFS file does not exist: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to load the CFS library: {0}")]
    Library(#[from] libloading::Error),

    #[error("native library could not open {} (code {code})", .path.display())]
    OpenFailed { path: PathBuf, code: i32 },

    #[error("native call {call}({args}) failed with code {code}")]
    NativeCall {
        call: &'static str,
        args: String,
        code: i32,
    },

    #[error("unknown variable type code {0}")]
    UnknownVarType(i16),

    #[error("invalid {what} reported by the native library: {value}")]
    InvalidCount { what: &'static str, value: i64 },

    #[error("{} channel/sweep read(s) returned no data: {}", .reads.len(), summarize(.reads))]
    EmptyReads { reads: Vec<FailedRead> },

    #[error("channel {channel} has sweeps of differing lengths: {lengths:?}")]
    RaggedChannel { channel: usize, lengths: Vec<usize> },

    #[error("channel {channel}, sweep {sweep}: native read returned {read} points, expected {expected}")]
    ShortRead {
        channel: usize,
        sweep: usize,
        expected: usize,
        read: i64,
    },

    #[error("sweep {index} does not exist (valid sweeps are 0–{max})")]
    SweepOutOfRange { index: usize, max: usize },

    #[error("channel {index} does not exist (file has {count} channels)")]
    ChannelOutOfRange { index: usize, count: usize },

    #[error("sweep {sweep} of channel {channel} has no data")]
    MissingSweep { channel: usize, sweep: usize },

    #[error("inconsistent recording: {0}")]
    Inconsistent(String),

    #[error("malformed settings file {}: {source}", .path.display())]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

fn summarize(reads: &[FailedRead]) -> String {
    reads
        .iter()
        .map(|r| format!("(channel {}, sweep {})", r.channel, r.sweep))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, CfsError>;
