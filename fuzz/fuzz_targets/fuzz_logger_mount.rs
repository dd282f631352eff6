// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for mounting a log ring whose write file holds arbitrary bytes

#![no_main]

use alx_fs::{FileSystem, MemFs};
use alx_logger::{Logger, LoggerConfig, LoggerError};
use libfuzzer_sys::fuzz_target;

fn config() -> LoggerConfig {
    LoggerConfig {
        num_of_dir: 2,
        num_of_files_per_dir: 2,
        num_of_logs_per_file: 4,
        max_log_len: 32,
        ..Default::default()
    }
}

fuzz_target!(|data: &[u8]| {
    let mut logger = match Logger::new(MemFs::new(), config()) {
        Ok(logger) => logger,
        Err(_) => return,
    };
    if logger.init().is_err() {
        return;
    }
    let mut fs = logger.into_inner();
    fs.set_raw("/0/0.csv", data);
    if fs.unmount().is_err() {
        return;
    }

    // Mount-time repair must leave a ring that reads back cleanly.
    let mut logger = match Logger::new(fs, config()) {
        Ok(logger) => logger,
        Err(_) => return,
    };
    if logger.init().is_err() {
        return;
    }
    let mut out = Vec::new();
    loop {
        match logger.read_log(&mut out, 4) {
            Ok(_) => {}
            Err(LoggerError::NoLogsToRead) => break,
            Err(err) => panic!("read after repair failed: {err}"),
        }
    }
    assert!(logger.write_cursor().id >= logger.read_cursor().id);
});
