// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for logger metadata decoding and validation

#![no_main]

use alx_crc::Crc32;
use alx_logger::{Grid, Metadata};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes must never panic.
    if let Ok(metadata) = Metadata::decode(data, &Crc32) {
        let _ = metadata.check_grid(&Grid::new(4, 16, 128));

        // Anything that decodes re-encodes to the same image.
        assert_eq!(metadata.encode(&Crc32), data);
    }
});
