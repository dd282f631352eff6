// SPDX-License-Identifier: PMPL-1.0-or-later
//! Logger configuration.
//!
//! The grid dimensions are baked into the persisted metadata. Changing them
//! on a device with existing logs makes the metadata invalid, and the next
//! `init()` reformats the ring.

use serde::{Deserialize, Serialize};

use crate::cursor::Grid;
use crate::error::{LoggerError, LoggerResult};

/// Configuration for the ring-buffered logger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Number of directories in the ring. Eviction frees one directory at a
    /// time.
    pub num_of_dir: u32,
    /// Number of log files in each directory.
    pub num_of_files_per_dir: u32,
    /// Number of records in each log file.
    pub num_of_logs_per_file: u32,
    /// Record terminator.
    pub delimiter: String,
    /// Maximum record length in bytes, delimiter included.
    pub max_log_len: usize,
}

impl LoggerConfig {
    pub fn grid(&self) -> Grid {
        Grid::new(
            self.num_of_dir,
            self.num_of_files_per_dir,
            self.num_of_logs_per_file,
        )
    }

    /// Check that the configuration describes a usable ring.
    pub fn validate(&self) -> LoggerResult<()> {
        if !self.grid().is_valid() {
            return Err(LoggerError::InvalidConfig(format!(
                "grid {}x{}x{} must be at least 1x1x1",
                self.num_of_dir, self.num_of_files_per_dir, self.num_of_logs_per_file
            )));
        }
        if self.delimiter.is_empty() {
            return Err(LoggerError::InvalidConfig(
                "delimiter must not be empty".to_string(),
            ));
        }
        if self.max_log_len <= self.delimiter.len() {
            return Err(LoggerError::InvalidConfig(format!(
                "max_log_len {} must exceed the delimiter length {}",
                self.max_log_len,
                self.delimiter.len()
            )));
        }
        // File positions are u32.
        let file_len = (self.max_log_len as u64).checked_mul(u64::from(self.num_of_logs_per_file));
        if file_len.map_or(true, |len| len > u64::from(u32::MAX)) {
            return Err(LoggerError::InvalidConfig(format!(
                "{} logs of {} bytes overflow a log file",
                self.num_of_logs_per_file, self.max_log_len
            )));
        }
        Ok(())
    }
}

impl Default for LoggerConfig {
    /// 4 directories of 16 files of 128 records, `\r\n` terminated, at most
    /// 256 bytes each.
    fn default() -> Self {
        Self {
            num_of_dir: 4,
            num_of_files_per_dir: 16,
            num_of_logs_per_file: 128,
            delimiter: "\r\n".to_string(),
            max_log_len: 256,
        }
    }
}
