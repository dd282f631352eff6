// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Auralix storage - ring-buffered logger crate
// Copyright (c) 2026 Auralix d.o.o.
//
// Stores delimiter-terminated text records in a fixed grid of files:
//
// ```text
// /md.bin            metadata: grid, read cursor, write cursor, CRC
// /0/0.csv ... /0/{files_per_dir - 1}.csv
// ...
// /{num_of_dir - 1}/...
// ```
//
// The writer appends to the file under the write cursor, the reader consumes
// from the file under the read cursor. When the ring is full the oldest
// directory is recycled. Metadata is flushed at every file boundary and the
// file under the write cursor is repaired on mount, so a power cut loses at
// most the record that was being written.
//
// ## Usage
//
// ```
// use alx_fs::MemFs;
// use alx_logger::{Logger, LoggerConfig, StoreConfig};
//
// let mut logger = Logger::new(MemFs::new(), LoggerConfig::default()).unwrap();
// logger.init().unwrap();
//
// logger.write_str("t=1;temp=21.5").unwrap();
// logger.write_str("t=2;temp=21.7").unwrap();
//
// let mut out = Vec::new();
// assert_eq!(logger.read_log(&mut out, 10).unwrap(), 2);
// assert_eq!(out, b"t=1;temp=21.5\r\nt=2;temp=21.7\r\n");
//
// // Remember read progress across reboots.
// logger.store_metadata(StoreConfig::Read).unwrap();
// ```

pub mod config;
pub mod cursor;
pub mod error;
pub mod layout;
pub mod logger;
pub mod metadata;

pub use config::LoggerConfig;
pub use cursor::{Cursor, Grid, Location};
pub use error::{LoggerError, LoggerResult, MetadataError};
pub use layout::{dir_path, file_path, METADATA_PATH};
pub use logger::{InitOutcome, Logger, StoreConfig};
pub use metadata::{Metadata, ENCODED_LEN, MAGIC_NUMBER, VERSION};
