// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for dual-copy reconciliation over arbitrary copy contents

#![no_main]

use alx_fs::{FileSystem, MemFs};
use alx_fs_safe::{FsSafe, FsSafeConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // [1 byte: record length][1 byte: split point][rest: copy A ‖ copy B]
    if data.len() < 2 {
        return;
    }
    let len = usize::from(data[0] % 64);
    let rest = &data[2..];
    let split = usize::from(data[1]).min(rest.len());

    let mut fs = MemFs::new();
    if fs.mount_or_format().is_err() {
        return;
    }
    fs.set_raw("/rec.bin", &rest[..split]);
    fs.set_raw("/recB.bin", &rest[split..]);

    let mut safe = FsSafe::new(fs, FsSafeConfig { use_orig: true, max_record_len: 64 });
    let mut record = vec![0u8; len];
    if safe.read("/rec.bin", &mut record).is_ok() {
        // A successful read heals both copies.
        let mut again = vec![0u8; len];
        let _ = safe.read("/rec.bin", &mut again);
        assert_eq!(record, again);
    }
});
