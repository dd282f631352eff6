// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Auralix storage - file-system contract
// Copyright (c) 2026 Auralix d.o.o.
//
// `FileSystem` is the seam between the store layers and a concrete medium
// (littlefs or FatFs on target, `MemFs`/`HostFs` on a host). Paths are
// absolute, `/`-separated and case-sensitive; `/` is the root directory.
// Handles are backend-specific values that are passed back into the file
// system for every operation, the way littlefs and FatFs do it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FsError, FsResult};
use crate::mode::OpenMode;

/// Reference point for [`FileSystem::file_seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    /// From the beginning of the file.
    Set,
    /// From the current position.
    Cur,
    /// From the end of the file.
    End,
}

/// Outcome of [`FileSystem::file_read_until`]. Each variant carries the
/// number of bytes appended to the output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Until {
    /// The delimiter was found; the count includes the delimiter bytes.
    Found(usize),
    /// End of file was reached before the delimiter.
    Eof(usize),
    /// `max_len` bytes were read without seeing the delimiter.
    Full(usize),
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Dir,
}

/// One entry returned by [`FileSystem::dir_read`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// File or directory name, without the parent path.
    pub name: String,
    pub kind: EntryKind,
    /// Size in bytes; 0 for directories.
    pub size: u64,
}

/// File-system operations, used to target injected faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FsOp {
    Mount,
    Unmount,
    Format,
    Remove,
    Rename,
    Open,
    Close,
    Read,
    Write,
    Sync,
    Seek,
    Truncate,
    DirMake,
    DirRead,
}

/// A mountable, POSIX-like file system.
///
/// All operations other than `mount`, `format` and `is_mounted` require a
/// mounted file system and fail with [`FsError::NotMounted`] otherwise.
pub trait FileSystem {
    /// Backend-specific open file handle.
    type File;

    /// Mount the medium. Fails with [`FsError::NotFormatted`] when the
    /// medium carries no file system.
    fn mount(&mut self) -> FsResult<()>;

    fn unmount(&mut self) -> FsResult<()>;

    /// Erase the medium and create an empty root directory. The file system
    /// is left unmounted.
    fn format(&mut self) -> FsResult<()>;

    fn is_mounted(&self) -> bool;

    /// Remove a file or an empty directory.
    fn remove(&mut self, path: &str) -> FsResult<()>;

    /// Rename a file or directory, replacing an existing file at `new`.
    fn rename(&mut self, old: &str, new: &str) -> FsResult<()>;

    /// Open a file. The parent directory must exist.
    fn file_open(&mut self, path: &str, mode: OpenMode) -> FsResult<Self::File>;

    /// Close a file, flushing any buffered data.
    fn file_close(&mut self, file: Self::File) -> FsResult<()>;

    /// Read up to `buf.len()` bytes at the current position. Returns 0 at
    /// end of file.
    fn file_read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> FsResult<usize>;

    /// Write the whole of `data` at the current position (or at the end for
    /// append modes).
    fn file_write(&mut self, file: &mut Self::File, data: &[u8]) -> FsResult<()>;

    fn file_sync(&mut self, file: &mut Self::File) -> FsResult<()>;

    /// Move the file position and return the new absolute position.
    fn file_seek(&mut self, file: &mut Self::File, offset: i64, origin: SeekOrigin)
        -> FsResult<u64>;

    fn file_tell(&mut self, file: &mut Self::File) -> FsResult<u64>;

    fn file_size(&mut self, file: &mut Self::File) -> FsResult<u64>;

    /// Shrink or zero-extend the file to `size` bytes. The file position is
    /// not changed.
    fn file_truncate(&mut self, file: &mut Self::File, size: u64) -> FsResult<()>;

    /// Create a directory. The parent must exist.
    fn dir_make(&mut self, path: &str) -> FsResult<()>;

    /// List a directory, sorted by name.
    fn dir_read(&mut self, path: &str) -> FsResult<Vec<DirEntry>>;

    // -----------------------------------------------------------------------
    // Provided operations
    // -----------------------------------------------------------------------

    /// Mount, formatting and retrying once when the medium cannot be
    /// mounted.
    fn mount_or_format(&mut self) -> FsResult<()> {
        match self.mount() {
            Ok(()) => Ok(()),
            Err(err) => {
                debug!(error = %err, "Mount failed, formatting medium");
                self.format()?;
                self.mount()
            }
        }
    }

    fn file_rewind(&mut self, file: &mut Self::File) -> FsResult<()> {
        self.file_seek(file, 0, SeekOrigin::Set).map(|_| ())
    }

    fn file_write_str(&mut self, file: &mut Self::File, s: &str) -> FsResult<()> {
        self.file_write(file, s.as_bytes())
    }

    /// Read bytes into `out` until the complete `delim` sequence has been
    /// read, end of file is reached, or `max_len` bytes were consumed.
    ///
    /// Bytes are read one at a time so that the file position is left
    /// exactly after the delimiter. An empty delimiter never matches.
    fn file_read_until(
        &mut self,
        file: &mut Self::File,
        delim: &[u8],
        max_len: usize,
        out: &mut Vec<u8>,
    ) -> FsResult<Until> {
        let start = out.len();
        let mut byte = [0u8; 1];
        while out.len() - start < max_len {
            if self.file_read(file, &mut byte)? == 0 {
                return Ok(Until::Eof(out.len() - start));
            }
            out.push(byte[0]);
            let read = out.len() - start;
            if !delim.is_empty() && read >= delim.len() && out.ends_with(delim) {
                return Ok(Until::Found(read));
            }
        }
        Ok(Until::Full(out.len() - start))
    }

    /// Stream a whole file through `callback` in chunks of `chunk_len`
    /// bytes. Returns the total number of bytes read. A callback error aborts
    /// the stream; the file is closed in every case.
    fn file_read_in_chunks<E, C>(
        &mut self,
        path: &str,
        chunk_len: usize,
        mut callback: C,
    ) -> Result<u64, E>
    where
        Self: Sized,
        E: From<FsError>,
        C: FnMut(&[u8]) -> Result<(), E>,
    {
        let mut file = self.file_open(path, OpenMode::Read)?;
        let mut chunk = vec![0u8; chunk_len.max(1)];
        let mut total = 0u64;

        let streamed = loop {
            let n = match self.file_read(&mut file, &mut chunk) {
                Ok(n) => n,
                Err(err) => break Err(E::from(err)),
            };
            if n == 0 {
                break Ok(total);
            }
            total += n as u64;
            if let Err(err) = callback(&chunk[..n]) {
                break Err(err);
            }
        };

        let closed = self.file_close(file);
        let total = streamed?;
        closed?;
        Ok(total)
    }

    /// Read a whole file into memory.
    fn read_to_vec(&mut self, path: &str) -> FsResult<Vec<u8>>
    where
        Self: Sized,
    {
        let mut data = Vec::new();
        self.file_read_in_chunks::<FsError, _>(path, 256, |chunk| {
            data.extend_from_slice(chunk);
            Ok(())
        })?;
        Ok(data)
    }

    /// Create or truncate `path`, write `data` to it and sync it to the
    /// medium before closing.
    fn write_all(&mut self, path: &str, data: &[u8]) -> FsResult<()> {
        let mut file = self.file_open(path, OpenMode::Write)?;
        let written = self
            .file_write(&mut file, data)
            .and_then(|()| self.file_sync(&mut file));
        let closed = self.file_close(file);
        written?;
        closed
    }

    /// Dump a file at `debug` level, lossily decoded as UTF-8.
    fn file_trace(&mut self, path: &str) -> FsResult<()>
    where
        Self: Sized,
    {
        let data = self.read_to_vec(path)?;
        debug!(
            path,
            len = data.len(),
            contents = %String::from_utf8_lossy(&data),
            "File contents"
        );
        Ok(())
    }

    /// List a directory at `debug` level, descending into subdirectories
    /// when `recursive` is set.
    fn dir_trace(&mut self, path: &str, recursive: bool) -> FsResult<()> {
        for entry in self.dir_read(path)? {
            let child = join(path, &entry.name);
            debug!(path = %child, kind = ?entry.kind, size = entry.size, "Directory entry");
            if recursive && entry.kind == EntryKind::Dir {
                self.dir_trace(&child, true)?;
            }
        }
        Ok(())
    }
}

/// Join a directory path and an entry name.
pub fn join(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Normalize an absolute path: collapse repeated separators, drop `.`
/// components and any trailing separator. `..` is not supported.
pub fn normalize(path: &str) -> FsResult<String> {
    if !path.starts_with('/') {
        return Err(FsError::NotFound(path.to_string()));
    }
    let mut normalized = String::with_capacity(path.len());
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => return Err(FsError::NotFound(path.to_string())),
            name => {
                normalized.push('/');
                normalized.push_str(name);
            }
        }
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    Ok(normalized)
}

/// Parent directory of a normalized path; `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}
