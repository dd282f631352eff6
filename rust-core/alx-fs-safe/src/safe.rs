// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Auralix storage - redundant dual-copy record store
// Copyright (c) 2026 Auralix d.o.o.
//
// A fixed-size record is stored twice, each copy followed by its checksum:
//
// ```text
// path          copy A: [len bytes: record][crc_len bytes: checksum]
// {stem}B.{ext} copy B: [len bytes: record][crc_len bytes: checksum]
// ```
//
// Reads reconcile the two copies and rewrite whichever one is missing,
// corrupt or stale, so a single torn write or flipped bit heals itself on the
// next read. Devices upgraded from firmware that stored the bare record at
// `path` can opt into reading that "original" when both copies are unusable.

use alx_crc::{Checksum, Crc32};
use alx_fs::{FileSystem, FsError, OpenMode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{SafeError, SafeResult};
use crate::path::copy_b_path;

/// Default maximum record length in bytes.
pub const DEFAULT_MAX_RECORD_LEN: usize = 256;

/// Dual-copy store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsSafeConfig {
    /// Fall back to a bare, unprotected record at `path` when neither copy
    /// is valid.
    pub use_orig: bool,
    /// Largest record the store accepts. Sizes the scratch buffers.
    pub max_record_len: usize,
}

impl Default for FsSafeConfig {
    fn default() -> Self {
        Self {
            use_orig: false,
            max_record_len: DEFAULT_MAX_RECORD_LEN,
        }
    }
}

/// Where the record returned by [`FsSafe::read`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    CopyA,
    CopyB,
    Original,
}

/// Which copies [`FsSafe::read`] rewrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Repaired {
    Nothing,
    CopyA,
    CopyB,
    Both,
}

/// Result of a successful [`FsSafe::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeRead {
    pub source: Source,
    pub repaired: Repaired,
}

/// Redundant dual-copy record store over a mounted file system.
#[derive(Debug)]
pub struct FsSafe<F, C = Crc32> {
    fs: F,
    crc: C,
    config: FsSafeConfig,
    copy_a: Vec<u8>,
    copy_b: Vec<u8>,
}

impl<F: FileSystem> FsSafe<F, Crc32> {
    /// Create a store protecting records with CRC-32. `fs` must already be
    /// mounted.
    pub fn new(fs: F, config: FsSafeConfig) -> Self {
        Self::with_checksum(fs, Crc32, config)
    }
}

impl<F: FileSystem, C: Checksum> FsSafe<F, C> {
    /// Create a store protecting records with a custom checksum.
    pub fn with_checksum(fs: F, crc: C, config: FsSafeConfig) -> Self {
        // One spare byte lets a load tell an exact-length file from a longer one.
        let capacity = config.max_record_len + crc.trailer_len() + 1;
        Self {
            fs,
            crc,
            config,
            copy_a: Vec::with_capacity(capacity),
            copy_b: Vec::with_capacity(capacity),
        }
    }

    pub fn config(&self) -> &FsSafeConfig {
        &self.config
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn fs_mut(&mut self) -> &mut F {
        &mut self.fs
    }

    pub fn into_inner(self) -> F {
        self.fs
    }

    /// Read the record stored at `path` into `data`. The record length is
    /// `data.len()`.
    ///
    /// Copies that are missing, have the wrong length, or fail the checksum
    /// are rewritten from the copy that was used. When a repair write fails
    /// the error is returned, but `data` already holds the record.
    pub fn read(&mut self, path: &str, data: &mut [u8]) -> SafeResult<SafeRead> {
        let len = data.len();
        self.check_len(len)?;
        let frame_len = len + self.crc.trailer_len();
        let path_b = copy_b_path(path);

        let a_ok = load(&mut self.fs, path, frame_len + 1, &mut self.copy_a) == Some(frame_len)
            && self.crc.is_ok(&self.copy_a).is_some();
        let b_ok = load(&mut self.fs, &path_b, frame_len + 1, &mut self.copy_b) == Some(frame_len)
            && self.crc.is_ok(&self.copy_b).is_some();

        match (a_ok, b_ok) {
            (true, true) => {
                data.copy_from_slice(&self.copy_a[..len]);
                if self.copy_a == self.copy_b {
                    return Ok(SafeRead {
                        source: Source::CopyA,
                        repaired: Repaired::Nothing,
                    });
                }
                warn!(path, "Copies diverge, rewriting copy B from copy A");
                self.fs.write_all(&path_b, &self.copy_a)?;
                Ok(SafeRead {
                    source: Source::CopyA,
                    repaired: Repaired::CopyB,
                })
            }
            (true, false) => {
                data.copy_from_slice(&self.copy_a[..len]);
                warn!(path = %path_b, "Copy B invalid, rewriting from copy A");
                self.fs.write_all(&path_b, &self.copy_a)?;
                Ok(SafeRead {
                    source: Source::CopyA,
                    repaired: Repaired::CopyB,
                })
            }
            (false, true) => {
                data.copy_from_slice(&self.copy_b[..len]);
                warn!(path, "Copy A invalid, rewriting from copy B");
                self.fs.write_all(path, &self.copy_b)?;
                Ok(SafeRead {
                    source: Source::CopyB,
                    repaired: Repaired::CopyA,
                })
            }
            (false, false) => {
                if !self.config.use_orig
                    || load(&mut self.fs, path, len + 1, &mut self.copy_a) != Some(len)
                {
                    warn!(path, "No valid copy");
                    return Err(SafeError::NoValidCopy {
                        path: path.to_string(),
                    });
                }
                data.copy_from_slice(&self.copy_a[..len]);
                warn!(path, "Both copies invalid, restoring from original");
                self.copy_b.clear();
                self.crc.append(&mut self.copy_b, data);
                self.fs.write_all(path, &self.copy_b)?;
                self.fs.write_all(&path_b, &self.copy_b)?;
                Ok(SafeRead {
                    source: Source::Original,
                    repaired: Repaired::Both,
                })
            }
        }
    }

    /// Write `data` as copy A, then copy B.
    pub fn write(&mut self, path: &str, data: &[u8]) -> SafeResult<()> {
        self.check_len(data.len())?;
        self.copy_a.clear();
        self.crc.append(&mut self.copy_a, data);
        self.fs.write_all(path, &self.copy_a)?;
        self.fs.write_all(&copy_b_path(path), &self.copy_a)?;
        debug!(path, len = data.len(), "Wrote both copies");
        Ok(())
    }

    /// Remove both copies. A copy that does not exist is not an error.
    pub fn remove(&mut self, path: &str) -> SafeResult<()> {
        for copy in [path.to_string(), copy_b_path(path)] {
            match self.fs.remove(&copy) {
                Ok(()) | Err(FsError::NotFound(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn check_len(&self, len: usize) -> SafeResult<()> {
        if len > self.config.max_record_len {
            return Err(SafeError::RecordTooLarge {
                len,
                max: self.config.max_record_len,
            });
        }
        Ok(())
    }
}

/// Read at most `limit` bytes of `path` into `buf`. Returns the number of
/// bytes read, or `None` when the file cannot be read at all.
fn load<F: FileSystem>(fs: &mut F, path: &str, limit: usize, buf: &mut Vec<u8>) -> Option<usize> {
    buf.clear();
    buf.resize(limit, 0);
    let read = read_up_to(fs, path, buf);
    match read {
        Ok(n) => {
            buf.truncate(n);
            Some(n)
        }
        Err(err) => {
            debug!(path, error = %err, "Copy unreadable");
            buf.clear();
            None
        }
    }
}

fn read_up_to<F: FileSystem>(fs: &mut F, path: &str, buf: &mut [u8]) -> Result<usize, FsError> {
    let mut file = fs.file_open(path, OpenMode::Read)?;
    let mut filled = 0;
    let read = loop {
        if filled == buf.len() {
            break Ok(filled);
        }
        match fs.file_read(&mut file, &mut buf[filled..]) {
            Ok(0) => break Ok(filled),
            Ok(n) => filled += n,
            Err(err) => break Err(err),
        }
    };
    let closed = fs.file_close(file);
    let filled = read?;
    closed?;
    Ok(filled)
}
