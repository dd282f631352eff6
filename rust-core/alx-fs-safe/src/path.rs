// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Auralix storage - copy path naming
// Copyright (c) 2026 Auralix d.o.o.

/// Path of copy B for a record stored at `path`.
///
/// `B` is inserted before the extension of the final path component
/// (`/cfg.bin` becomes `/cfgB.bin`). A final component without an extension
/// gets `B` appended. Dots in directory names are not extensions.
pub fn copy_b_path(path: &str) -> String {
    let name_start = path.rfind('/').map_or(0, |idx| idx + 1);
    match path[name_start..].rfind('.') {
        Some(dot) => {
            let split = name_start + dot;
            format!("{}B{}", &path[..split], &path[split..])
        }
        None => format!("{path}B"),
    }
}
