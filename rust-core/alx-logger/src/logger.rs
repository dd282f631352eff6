// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Auralix storage - ring-buffered multi-file logger
// Copyright (c) 2026 Auralix d.o.o.
//
// Records are appended to the file under the write cursor and consumed from
// the file under the read cursor. Metadata is persisted at every file
// boundary, so after a power cut the persisted write cursor is at most one
// file behind the data. `init()` closes that gap by replaying the records
// found after the persisted write position and cutting off a torn trailing
// record.
//
// When the write cursor enters a directory it clears the directory's files
// and, if the read cursor still points into the lap being overwritten, moves
// the read cursor forward to the oldest directory that survives. The ring
// therefore never blocks on a full buffer; it drops the oldest directory.

use alx_crc::{Checksum, Crc32};
use alx_fs::{FileSystem, OpenMode, SeekOrigin, Until};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::LoggerConfig;
use crate::cursor::{Cursor, Grid};
use crate::error::{LoggerError, LoggerResult, MetadataError};
use crate::layout::{dir_path, file_path, METADATA_PATH};
use crate::metadata::Metadata;

// ---------------------------------------------------------------------------
// StoreConfig / InitOutcome
// ---------------------------------------------------------------------------

/// Which cursors [`Logger::store_metadata`] takes from memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreConfig {
    /// In-memory read cursor, persisted write cursor. If the read cursor has
    /// moved past the persisted write cursor, the in-memory write cursor is
    /// stored as well so the image stays ordered.
    Read,
    /// Persisted read cursor, in-memory write cursor.
    Write,
    /// Both cursors from memory.
    ReadWrite,
    /// Factory default: both cursors reset to zero and every log file
    /// cleared.
    Default,
}

/// What [`Logger::init`] found on the medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// Valid metadata was loaded. `recovered` records written after the last
    /// persisted boundary were replayed; `truncated` reports whether a torn
    /// trailing record was discarded.
    Mounted { recovered: u32, truncated: bool },
    /// No valid metadata was found and the ring was formatted.
    Formatted,
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

/// Ring-buffered multi-file log store.
///
/// The logger owns its file system. All operations take `&mut self`; share
/// a logger between tasks by wrapping it in a mutex.
#[derive(Debug)]
pub struct Logger<F, C = Crc32> {
    fs: F,
    crc: C,
    config: LoggerConfig,
    grid: Grid,

    /// In-memory cursors.
    read: Cursor,
    write: Cursor,

    /// Last image successfully written to the medium.
    persisted: Metadata,

    /// The write cursor crossed a file boundary whose metadata flush failed.
    boundary_pending: bool,

    /// Record plus delimiter, assembled before a single append.
    scratch: Vec<u8>,

    is_init: bool,
}

impl<F: FileSystem> Logger<F, Crc32> {
    /// Create a logger over `fs`, protecting metadata with CRC-32.
    pub fn new(fs: F, config: LoggerConfig) -> LoggerResult<Self> {
        Self::with_checksum(fs, Crc32, config)
    }
}

impl<F: FileSystem, C: Checksum> Logger<F, C> {
    /// Create a logger with a custom metadata checksum.
    pub fn with_checksum(fs: F, crc: C, config: LoggerConfig) -> LoggerResult<Self> {
        config.validate()?;
        if !(1..=alx_crc::MAX_LEN).contains(&crc.len()) {
            return Err(LoggerError::InvalidConfig(format!(
                "checksum length {} outside 1..={}",
                crc.len(),
                alx_crc::MAX_LEN
            )));
        }
        let grid = config.grid();
        let scratch = Vec::with_capacity(config.max_log_len);
        Ok(Self {
            fs,
            crc,
            config,
            grid,
            read: Cursor::ZERO,
            write: Cursor::ZERO,
            persisted: Metadata::new(grid),
            boundary_pending: false,
            scratch,
            is_init: false,
        })
    }

    /// Mount the medium and load the ring, formatting it when no valid
    /// metadata is found or any step of mounting fails.
    pub fn init(&mut self) -> LoggerResult<InitOutcome> {
        if self.is_init {
            return Err(LoggerError::AlreadyInitialized);
        }
        let outcome = match self.mount_existing() {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "No usable log ring on the medium, formatting");
                self.format_ring()?;
                InitOutcome::Formatted
            }
        };
        self.is_init = true;
        info!(
            ?outcome,
            read = self.read.id,
            write = self.write.id,
            "Logger initialized"
        );
        Ok(outcome)
    }

    /// Unmount the medium. In-memory read progress that was not stored with
    /// [`StoreConfig::Read`] is lost.
    pub fn deinit(&mut self) -> LoggerResult<()> {
        self.ensure_init()?;
        self.fs.unmount()?;
        self.is_init = false;
        Ok(())
    }

    /// Append up to `num_of_logs` records to `out`, oldest first, and return
    /// how many were read.
    ///
    /// Records are appended back to back with their delimiters. If a failure
    /// occurs after at least one record was read, the records read so far
    /// are kept and counted; the failure recurs on the next call.
    pub fn read_log(&mut self, out: &mut Vec<u8>, num_of_logs: u32) -> LoggerResult<u32> {
        self.ensure_init()?;
        if num_of_logs == 0 {
            return Ok(0);
        }

        let mut count = 0u32;
        let mut handle: Option<F::File> = None;
        let mut result = loop {
            if count == num_of_logs {
                break Ok(());
            }
            match self.available() {
                Err(err) => break Err(err),
                Ok(0) if count == 0 => break Err(LoggerError::NoLogsToRead),
                Ok(0) => break Ok(()),
                Ok(_) => {}
            }

            let mut file = match handle.take() {
                Some(file) => file,
                None => match self.open_at_read_cursor() {
                    Ok(file) => file,
                    Err(err) => break Err(err),
                },
            };
            if let Err(err) = self.read_record(&mut file, out) {
                handle = Some(file);
                break Err(err);
            }
            count += 1;

            if self.read.is_file_start() {
                if let Err(err) = self.fs.file_close(file) {
                    break Err(err.into());
                }
            } else {
                handle = Some(file);
            }
        };

        if let Some(file) = handle {
            if let Err(err) = self.fs.file_close(file) {
                if result.is_ok() {
                    result = Err(err.into());
                }
            }
        }

        match result {
            Ok(()) => Ok(count),
            Err(err) if count > 0 => {
                warn!(error = %err, delivered = count, "Read stopped early");
                Ok(count)
            }
            Err(err) => Err(err),
        }
    }

    /// Append one record. With `append_delimiter` the delimiter is added;
    /// without it `log` must already end with the delimiter.
    pub fn write_log(&mut self, log: &[u8], append_delimiter: bool) -> LoggerResult<()> {
        self.ensure_init()?;
        let body = self.validate_log(log, append_delimiter)?;

        if self.boundary_pending {
            self.run_boundary()?;
        }

        self.scratch.clear();
        self.scratch.extend_from_slice(body);
        self.scratch.extend_from_slice(self.config.delimiter.as_bytes());
        let len = self.scratch.len();

        let path = file_path(self.write.dir, self.write.file);
        if let Err(err) = self.append_scratch(&path) {
            warn!(path = %path, error = %err, "Log write failed, rolling back");
            self.rollback(&path);
            return Err(err);
        }

        // `len` is bounded by `max_log_len`, which validation keeps in u32.
        self.write = self.write.advance(&self.grid, len as u32);
        debug!(
            id = self.write.id,
            dir = self.write.dir,
            file = self.write.file,
            len,
            "Wrote log"
        );

        if self.write.is_file_start() {
            self.boundary_pending = true;
            if let Err(err) = self.run_boundary() {
                warn!(error = %err, "File boundary flush failed, retrying before next write");
            }
        }
        Ok(())
    }

    /// Append `log` followed by the delimiter.
    pub fn write_str(&mut self, log: &str) -> LoggerResult<()> {
        self.write_log(log.as_bytes(), true)
    }

    /// Persist the cursors selected by `config`.
    pub fn store_metadata(&mut self, config: StoreConfig) -> LoggerResult<()> {
        self.ensure_init()?;
        self.store(config)
    }

    pub fn read_cursor(&self) -> Cursor {
        self.read
    }

    pub fn write_cursor(&self) -> Cursor {
        self.write
    }

    /// The metadata image last written to the medium.
    pub fn persisted(&self) -> &Metadata {
        &self.persisted
    }

    /// Number of records between the read and the write cursor.
    pub fn num_of_logs_to_read(&self) -> u64 {
        self.write.id.saturating_sub(self.read.id)
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn is_init(&self) -> bool {
        self.is_init
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn fs_mut(&mut self) -> &mut F {
        &mut self.fs
    }

    /// Give back the file system, e.g. to simulate a reboot in tests.
    pub fn into_inner(self) -> F {
        self.fs
    }

    // -----------------------------------------------------------------------
    // Mount path
    // -----------------------------------------------------------------------

    fn mount_existing(&mut self) -> LoggerResult<InitOutcome> {
        if !self.fs.is_mounted() {
            self.fs.mount()?;
        }
        let image = self.fs.read_to_vec(METADATA_PATH)?;
        let metadata = Metadata::decode(&image, &self.crc)?;
        metadata.check_grid(&self.grid)?;

        self.persisted = metadata;
        self.read = metadata.read;
        self.write = metadata.write;
        self.boundary_pending = false;

        let floor = self.grid.eviction_floor(self.write.id);
        if self.read.id < floor {
            warn!(read = self.read.id, floor, "Read cursor in recycled directory, evicting");
            self.read = Cursor::at_file_start(&self.grid, floor);
        }

        let (recovered, truncated, crossed) = self.repair_write_file()?;
        if crossed {
            self.boundary_pending = true;
            self.run_boundary()?;
        }
        // After the boundary so a reader evicted from a cleared directory
        // is already back at a file start.
        self.check_read_position()?;
        self.store(StoreConfig::ReadWrite)?;

        if recovered > 0 || truncated {
            info!(recovered, truncated, write = self.write.id, "Repaired write file");
        }
        Ok(InitOutcome::Mounted {
            recovered,
            truncated,
        })
    }

    fn check_read_position(&mut self) -> LoggerResult<()> {
        if self.read.position == 0 {
            return Ok(());
        }
        let path = file_path(self.read.dir, self.read.file);
        let mut file = self.fs.file_open(&path, OpenMode::Read)?;
        let size = self.fs.file_size(&mut file);
        let closed = self.fs.file_close(file);
        let size = size?;
        closed?;
        if size < u64::from(self.read.position) {
            return Err(MetadataError::PositionPastEnd {
                which: "read",
                position: self.read.position,
                size,
            }
            .into());
        }
        Ok(())
    }

    /// Replay the records after the persisted write position. Returns the
    /// number recovered, whether a torn record was cut off, and whether a
    /// file boundary was crossed.
    fn repair_write_file(&mut self) -> LoggerResult<(u32, bool, bool)> {
        let path = file_path(self.write.dir, self.write.file);
        let mut file = self.fs.file_open(&path, OpenMode::ReadUpdate)?;
        let replayed = self.replay(&mut file, &path);
        let closed = self.fs.file_close(file);
        let replayed = replayed?;
        closed?;
        Ok(replayed)
    }

    fn replay(&mut self, file: &mut F::File, path: &str) -> LoggerResult<(u32, bool, bool)> {
        let size = self.fs.file_size(file)?;
        if size < u64::from(self.write.position) {
            return Err(MetadataError::PositionPastEnd {
                which: "write",
                position: self.write.position,
                size,
            }
            .into());
        }
        self.fs
            .file_seek(file, i64::from(self.write.position), SeekOrigin::Set)?;
        let mut recovered = 0u32;
        let mut record = Vec::with_capacity(self.config.max_log_len);
        loop {
            record.clear();
            let until = self.fs.file_read_until(
                file,
                self.config.delimiter.as_bytes(),
                self.config.max_log_len,
                &mut record,
            )?;
            match until {
                Until::Found(len) => {
                    self.write = self.write.advance(&self.grid, len as u32);
                    recovered += 1;
                    debug!(id = self.write.id, len, "Recovered log");
                    if self.write.is_file_start() {
                        return Ok((recovered, false, true));
                    }
                }
                Until::Eof(0) => return Ok((recovered, false, false)),
                Until::Eof(len) | Until::Full(len) => {
                    warn!(
                        path,
                        position = self.write.position,
                        len,
                        "Discarding torn log"
                    );
                    self.fs.file_truncate(file, u64::from(self.write.position))?;
                    return Ok((recovered, true, false));
                }
            }
        }
    }

    /// Format the medium, create the empty grid of files and persist
    /// default metadata.
    fn format_ring(&mut self) -> LoggerResult<()> {
        if self.fs.is_mounted() {
            if let Err(err) = self.fs.unmount() {
                debug!(error = %err, "Unmount before format failed");
            }
        }
        self.fs.format()?;
        self.fs.mount()?;
        for dir in 0..self.grid.num_of_dir {
            self.fs.dir_make(&dir_path(dir))?;
            for file in 0..self.grid.num_of_files_per_dir {
                self.fs.write_all(&file_path(dir, file), &[])?;
            }
        }
        self.read = Cursor::ZERO;
        self.write = Cursor::ZERO;
        self.boundary_pending = false;
        self.persist(Metadata::new(self.grid))?;
        info!(
            dirs = self.grid.num_of_dir,
            files_per_dir = self.grid.num_of_files_per_dir,
            logs_per_file = self.grid.num_of_logs_per_file,
            "Formatted log ring"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read path
    // -----------------------------------------------------------------------

    fn available(&self) -> LoggerResult<u64> {
        self.write.id.checked_sub(self.read.id).ok_or_else(|| {
            error!(
                read = self.read.id,
                write = self.write.id,
                "Write cursor behind read cursor"
            );
            LoggerError::CursorOrder {
                read: self.read.id,
                write: self.write.id,
            }
        })
    }

    fn open_at_read_cursor(&mut self) -> LoggerResult<F::File> {
        let path = file_path(self.read.dir, self.read.file);
        let mut file = self.fs.file_open(&path, OpenMode::Read)?;
        if let Err(err) = self
            .fs
            .file_seek(&mut file, i64::from(self.read.position), SeekOrigin::Set)
        {
            if let Err(close_err) = self.fs.file_close(file) {
                debug!(path = %path, error = %close_err, "Close after failed seek failed");
            }
            return Err(err.into());
        }
        Ok(file)
    }

    fn read_record(&mut self, file: &mut F::File, out: &mut Vec<u8>) -> LoggerResult<()> {
        let start = out.len();
        let until = self.fs.file_read_until(
            file,
            self.config.delimiter.as_bytes(),
            self.config.max_log_len,
            out,
        )?;
        match until {
            Until::Found(len) => {
                self.read = self.read.advance(&self.grid, len as u32);
                debug!(id = self.read.id, len, "Read log");
                Ok(())
            }
            Until::Eof(_) | Until::Full(_) => {
                out.truncate(start);
                warn!(
                    dir = self.read.dir,
                    file = self.read.file,
                    position = self.read.position,
                    "Malformed log"
                );
                Err(LoggerError::MalformedLog {
                    dir: self.read.dir,
                    file: self.read.file,
                    position: self.read.position,
                })
            }
        }
    }

    // -----------------------------------------------------------------------
    // Write path
    // -----------------------------------------------------------------------

    /// Check a record against the delimiter rules and return its body.
    fn validate_log<'a>(&self, log: &'a [u8], append_delimiter: bool) -> LoggerResult<&'a [u8]> {
        let delim = self.config.delimiter.as_bytes();
        let body = if append_delimiter {
            log
        } else {
            log.strip_suffix(delim)
                .ok_or(LoggerError::MissingDelimiter)?
        };
        if body.windows(delim.len()).any(|window| window == delim) {
            return Err(LoggerError::EmbeddedDelimiter);
        }
        // A delimiter may also start in the body's tail and end inside the
        // appended delimiter ("xa" + "aa").
        let mut tail = body[body.len().saturating_sub(delim.len() - 1)..].to_vec();
        tail.extend_from_slice(delim);
        if tail.windows(delim.len()).position(|window| window == delim)
            != Some(tail.len() - delim.len())
        {
            return Err(LoggerError::EmbeddedDelimiter);
        }
        let len = body.len() + delim.len();
        if len > self.config.max_log_len {
            return Err(LoggerError::LogTooLong {
                len,
                max: self.config.max_log_len,
            });
        }
        Ok(body)
    }

    /// Append the assembled record and sync it, so metadata flushed later
    /// never counts a record the medium does not hold.
    fn append_scratch(&mut self, path: &str) -> LoggerResult<()> {
        let mut file = self.fs.file_open(path, OpenMode::Append)?;
        let written = self
            .fs
            .file_write(&mut file, &self.scratch)
            .and_then(|()| self.fs.file_sync(&mut file));
        let closed = self.fs.file_close(file);
        written?;
        closed?;
        Ok(())
    }

    /// Cut the write file back to the write cursor after a failed append.
    fn rollback(&mut self, path: &str) {
        let position = u64::from(self.write.position);
        let result = self.fs.file_open(path, OpenMode::ReadUpdate).and_then(|mut file| {
            let truncated = self.fs.file_truncate(&mut file, position);
            let closed = self.fs.file_close(file);
            truncated.and(closed)
        });
        if let Err(err) = result {
            warn!(path, position, error = %err, "Rollback of failed write failed");
        }
    }

    /// Side effects of the write cursor reaching the start of a file: clear
    /// a directory being entered, evict the read cursor from the lap being
    /// overwritten, and flush metadata.
    fn run_boundary(&mut self) -> LoggerResult<()> {
        if self.write.is_dir_start() {
            self.clear_dir(self.write.dir)?;
            debug!(dir = self.write.dir, id = self.write.id, "Entered directory");
        }

        let floor = self.grid.eviction_floor(self.write.id);
        let mut config = StoreConfig::Write;
        if self.read.id < floor {
            warn!(
                read = self.read.id,
                floor,
                lost = floor - self.read.id,
                "Ring full, evicting oldest directory"
            );
            self.read = Cursor::at_file_start(&self.grid, floor);
            config = StoreConfig::ReadWrite;
        }
        if self.persisted.read.id < floor {
            config = StoreConfig::ReadWrite;
        }

        self.store(config)?;
        self.boundary_pending = false;
        Ok(())
    }

    fn clear_dir(&mut self, dir: u32) -> LoggerResult<()> {
        for file in 0..self.grid.num_of_files_per_dir {
            self.fs.write_all(&file_path(dir, file), &[])?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Metadata
    // -----------------------------------------------------------------------

    fn store(&mut self, config: StoreConfig) -> LoggerResult<()> {
        let metadata = match config {
            StoreConfig::Read if self.read.id > self.persisted.write.id => Metadata {
                read: self.read,
                write: self.write,
                ..self.persisted
            },
            StoreConfig::Read => Metadata {
                read: self.read,
                ..self.persisted
            },
            StoreConfig::Write => Metadata {
                write: self.write,
                ..self.persisted
            },
            StoreConfig::ReadWrite => Metadata {
                read: self.read,
                write: self.write,
                ..self.persisted
            },
            StoreConfig::Default => {
                for dir in 0..self.grid.num_of_dir {
                    self.clear_dir(dir)?;
                }
                self.read = Cursor::ZERO;
                self.write = Cursor::ZERO;
                self.boundary_pending = false;
                Metadata::new(self.grid)
            }
        };
        self.persist(metadata)?;
        debug!(?config, read = metadata.read.id, write = metadata.write.id, "Stored metadata");
        Ok(())
    }

    fn persist(&mut self, metadata: Metadata) -> LoggerResult<()> {
        let image = metadata.encode(&self.crc);
        self.fs.write_all(METADATA_PATH, &image)?;
        self.persisted = metadata;
        Ok(())
    }

    fn ensure_init(&self) -> LoggerResult<()> {
        if self.is_init {
            Ok(())
        } else {
            Err(LoggerError::NotInitialized)
        }
    }
}
