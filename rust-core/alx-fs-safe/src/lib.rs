// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Auralix storage - safe record store crate
// Copyright (c) 2026 Auralix d.o.o.
//
// Two small stores for configuration data that must survive power loss:
//
// - `FsSafe` keeps two CRC-protected copies of a fixed-size record and heals
//   a damaged copy from the good one on every read.
// - `ParamKvStore` maps parameter keys onto whole files.
//
// ## Usage
//
// ```
// use alx_fs::{FileSystem, MemFs};
// use alx_fs_safe::{FsSafe, FsSafeConfig, Source};
//
// let mut fs = MemFs::new();
// fs.mount_or_format().unwrap();
//
// let mut safe = FsSafe::new(fs, FsSafeConfig::default());
// safe.write("/cal.bin", &[1, 2, 3, 4]).unwrap();
//
// let mut data = [0u8; 4];
// let read = safe.read("/cal.bin", &mut data).unwrap();
// assert_eq!(data, [1, 2, 3, 4]);
// assert_eq!(read.source, Source::CopyA);
// ```

pub mod error;
pub mod kv;
pub mod path;
pub mod safe;

pub use error::{KvError, KvResult, SafeError, SafeResult};
pub use kv::ParamKvStore;
pub use path::copy_b_path;
pub use safe::{FsSafe, FsSafeConfig, Repaired, SafeRead, Source, DEFAULT_MAX_RECORD_LEN};
