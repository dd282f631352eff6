// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Auralix storage - on-medium paths of the log ring
// Copyright (c) 2026 Auralix d.o.o.

/// Persisted metadata image.
pub const METADATA_PATH: &str = "/md.bin";

/// Directory holding the files of ring directory `dir`.
pub fn dir_path(dir: u32) -> String {
    format!("/{dir}")
}

/// Log file `file` of ring directory `dir`.
pub fn file_path(dir: u32, file: u32) -> String {
    format!("/{dir}/{file}.csv")
}
