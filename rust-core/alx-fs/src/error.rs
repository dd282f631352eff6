// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Auralix storage - file-system error types
// Copyright (c) 2026 Auralix d.o.o.
//
// Every backend maps its native failures onto `FsError` so that the store
// layers above can tell "medium not formatted" (format and retry) apart from
// ordinary I/O failures (propagate).

use thiserror::Error;

use crate::fs::FsOp;

/// Errors reported by a [`FileSystem`](crate::FileSystem) backend.
#[derive(Debug, Error)]
pub enum FsError {
    /// A host I/O error occurred in the underlying medium.
    #[error("file-system I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation requires a mounted file system.
    #[error("file system is not mounted")]
    NotMounted,

    /// `mount()` was called on an already mounted file system.
    #[error("file system is already mounted")]
    AlreadyMounted,

    /// The medium carries no valid file system and must be formatted first.
    #[error("medium is not formatted")]
    NotFormatted,

    /// The path (or its parent directory) does not exist.
    #[error("no such file or directory: {0}")]
    NotFound(String),

    /// The path already exists.
    #[error("path already exists: {0}")]
    AlreadyExists(String),

    /// A path component that must be a directory is a file.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// A file operation was attempted on a directory.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// `remove()` on a directory that still has entries.
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// The open-mode string is not one of `r`, `w`, `a`, `r+`, `w+`, `a+`.
    #[error("invalid open mode: {0:?}")]
    InvalidMode(String),

    /// The handle was not opened with the access the operation needs, or
    /// the path may not be modified.
    #[error("permission denied on {path}: {reason}")]
    PermissionDenied {
        /// The path the operation targeted.
        path: String,
        /// What was refused.
        reason: &'static str,
    },

    /// A seek would move the file position before the start of the file.
    #[error("invalid seek to offset {0}")]
    InvalidSeek(i64),

    /// The handle refers to a file that no longer exists.
    #[error("stale file handle for {0}")]
    BadHandle(String),

    /// A fault injected by a test backend.
    #[error("injected fault in {0:?}")]
    Injected(FsOp),
}

impl FsError {
    /// Returns `true` for errors that mean the medium has to be formatted
    /// before it can be used.
    pub fn needs_format(&self) -> bool {
        matches!(self, FsError::NotFormatted)
    }
}

/// Convenience type alias for file-system results.
pub type FsResult<T> = Result<T, FsError>;
