// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Auralix storage - safe store error types
// Copyright (c) 2026 Auralix d.o.o.

use alx_fs::FsError;
use thiserror::Error;

/// Errors that can occur during dual-copy store operations.
#[derive(Debug, Error)]
pub enum SafeError {
    /// The underlying file system failed while writing or removing a copy.
    #[error("safe store file-system error: {0}")]
    Fs(#[from] FsError),

    /// Neither copy (nor the original, when enabled) holds a usable record.
    #[error("no valid copy of {path}")]
    NoValidCopy {
        /// Path of copy A.
        path: String,
    },

    /// The record does not fit into the scratch buffers configured by
    /// `max_record_len`.
    #[error("record of {len} bytes exceeds the maximum of {max} bytes")]
    RecordTooLarge {
        /// Requested record length.
        len: usize,
        /// Configured maximum record length.
        max: usize,
    },
}

/// Convenience type alias for safe store results.
pub type SafeResult<T> = Result<T, SafeError>;

/// Errors that can occur during parameter store operations.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("parameter store file-system error: {0}")]
    Fs(#[from] FsError),

    #[error("parameter store is not initialized")]
    NotInitialized,

    #[error("parameter store is already initialized")]
    AlreadyInitialized,
}

/// Convenience type alias for parameter store results.
pub type KvResult<T> = Result<T, KvError>;
