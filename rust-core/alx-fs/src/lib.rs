// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Auralix storage - file-system abstraction crate
// Copyright (c) 2026 Auralix d.o.o.
//
// Provides the `FileSystem` trait that the safe store and the ring-buffered
// logger are written against, together with two backends:
//
// - `MemFs`: an in-memory medium with fault injection, power-cut snapshots
//   and raw byte access, used by the test suites and the benchmarks.
// - `HostFs`: maps absolute virtual paths onto a host directory.
//
// On target the trait is implemented over littlefs or FatFs; nothing in the
// layers above depends on which backend is in use.
//
// ## Usage
//
// ```
// use alx_fs::{FileSystem, MemFs, OpenMode};
//
// let mut fs = MemFs::new();
// fs.mount_or_format().unwrap();
// fs.dir_make("/0").unwrap();
//
// let mut file = fs.file_open("/0/0.csv", OpenMode::Append).unwrap();
// fs.file_write(&mut file, b"hello\r\n").unwrap();
// fs.file_close(file).unwrap();
//
// assert_eq!(fs.read_to_vec("/0/0.csv").unwrap(), b"hello\r\n");
// ```

pub mod error;
pub mod fs;
pub mod host;
pub mod memory;
pub mod mode;

// Re-export the primary public API for ergonomic imports.
pub use error::{FsError, FsResult};
pub use fs::{join, normalize, parent, DirEntry, EntryKind, FileSystem, FsOp, SeekOrigin, Until};
pub use host::{HostFile, HostFs};
pub use memory::{MemFile, MemFs};
pub use mode::OpenMode;
