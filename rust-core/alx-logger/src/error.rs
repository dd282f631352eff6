// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Auralix storage - logger error types
// Copyright (c) 2026 Auralix d.o.o.
//
// `MetadataError` describes why a persisted metadata image was rejected; the
// logger treats every one of them as "no valid metadata" and reformats.
// `LoggerError` is what the public operations return.

use alx_fs::FsError;
use thiserror::Error;

/// Reasons a metadata image fails validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    /// The image does not have the encoded size.
    #[error("metadata is {actual} bytes, expected {expected}")]
    Length { expected: usize, actual: usize },

    #[error("metadata CRC mismatch: stored {expected:#010x}, calculated {actual:#010x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("bad metadata magic number {0:#010x}")]
    BadMagic(u32),

    #[error("unsupported metadata version {0}")]
    UnsupportedVersion(u32),

    /// The persisted grid differs from the configured grid.
    #[error("metadata grid does not match the configured grid")]
    GridMismatch,

    /// A cursor's coordinates disagree with its id.
    #[error("metadata {which} cursor coordinates disagree with its id")]
    CursorMismatch { which: &'static str },

    /// The write cursor is behind the read cursor.
    #[error("metadata write cursor {write} is behind read cursor {read}")]
    CursorOrder { read: u64, write: u64 },

    /// A cursor points past the end of its file, so the file lost data the
    /// metadata counts.
    #[error("metadata {which} cursor position {position} is past the end of its {size}-byte file")]
    PositionPastEnd {
        which: &'static str,
        position: u32,
        size: u64,
    },
}

/// Errors that can occur during logger operations.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// The underlying file system failed.
    #[error("logger file-system error: {0}")]
    Fs(#[from] FsError),

    #[error("invalid logger metadata: {0}")]
    Metadata(#[from] MetadataError),

    #[error("invalid logger configuration: {0}")]
    InvalidConfig(String),

    #[error("logger is not initialized")]
    NotInitialized,

    #[error("logger is already initialized")]
    AlreadyInitialized,

    /// The read cursor has caught up with the write cursor.
    #[error("no logs to read")]
    NoLogsToRead,

    /// The in-memory write cursor is behind the read cursor. This is an
    /// invariant violation and is never expected in normal operation.
    #[error("write cursor {write} is behind read cursor {read}")]
    CursorOrder { read: u64, write: u64 },

    /// The record at the read cursor is not terminated by the delimiter.
    #[error("malformed log in dir {dir} file {file} at position {position}")]
    MalformedLog { dir: u32, file: u32, position: u32 },

    #[error("log of {len} bytes exceeds the maximum of {max} bytes")]
    LogTooLong { len: usize, max: usize },

    /// A record passed without `append_delimiter` does not end with it.
    #[error("log does not end with the delimiter")]
    MissingDelimiter,

    /// The record body contains the delimiter, which would split it in two.
    #[error("log body contains the delimiter")]
    EmbeddedDelimiter,
}

/// Convenience type alias for logger results.
pub type LoggerResult<T> = Result<T, LoggerError>;
