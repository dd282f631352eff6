// SPDX-License-Identifier: PMPL-1.0-or-later
//! Integration tests for the logger: eviction, power-cut recovery and
//! reformat on invalid metadata.
//!
//! A reboot is simulated by taking the medium out of one logger, dropping
//! its mount state and handing it to a fresh logger.

use alx_fs::{FileSystem, HostFs, MemFs};
use alx_logger::{
    Cursor, InitOutcome, Logger, LoggerConfig, LoggerError, StoreConfig, METADATA_PATH,
};
use tracing_subscriber::EnvFilter;

fn config_222() -> LoggerConfig {
    LoggerConfig {
        num_of_dir: 2,
        num_of_files_per_dir: 2,
        num_of_logs_per_file: 2,
        ..Default::default()
    }
}

/// Route logger tracing into the test output; `RUST_LOG=debug` shows the
/// per-record events.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fresh() -> Logger<MemFs> {
    fresh_with(config_222())
}

fn fresh_with(config: LoggerConfig) -> Logger<MemFs> {
    init_tracing();
    let mut logger = Logger::new(MemFs::new(), config).unwrap();
    assert_eq!(logger.init().unwrap(), InitOutcome::Formatted);
    logger
}

fn reboot(logger: Logger<MemFs>, config: LoggerConfig) -> (Logger<MemFs>, InitOutcome) {
    let mut fs = logger.into_inner();
    if fs.is_mounted() {
        fs.unmount().unwrap();
    }
    let mut logger = Logger::new(fs, config).unwrap();
    let outcome = logger.init().unwrap();
    (logger, outcome)
}

fn write_all(logger: &mut Logger<MemFs>, records: &[&str]) {
    for record in records {
        logger.write_str(record).unwrap();
    }
}

fn drain<F: FileSystem>(logger: &mut Logger<F>) -> Vec<String> {
    let mut out = Vec::new();
    loop {
        match logger.read_log(&mut out, 3) {
            Ok(_) => {}
            Err(LoggerError::NoLogsToRead) => break,
            Err(err) => panic!("unexpected read error: {err}"),
        }
    }
    String::from_utf8(out)
        .unwrap()
        .split_terminator("\r\n")
        .map(str::to_string)
        .collect()
}

// ===========================================================================
// Eviction
// ===========================================================================

#[test]
fn test_full_ring_evicts_oldest_directory() {
    let mut logger = fresh();
    let records: Vec<String> = (0..10).map(|i| format!("L{i}")).collect();
    let refs: Vec<&str> = records.iter().map(String::as_str).collect();
    write_all(&mut logger, &refs);

    assert_eq!(logger.read_cursor(), Cursor::at_file_start(logger.grid(), 4));
    assert_eq!(logger.num_of_logs_to_read(), 6);
    assert_eq!(drain(&mut logger), ["L4", "L5", "L6", "L7", "L8", "L9"]);
    let mut out = Vec::new();
    assert!(matches!(
        logger.read_log(&mut out, 1),
        Err(LoggerError::NoLogsToRead)
    ));
}

#[test]
fn test_entering_directory_clears_previous_lap() {
    let mut logger = fresh();
    write_all(&mut logger, &["L0", "L1", "L2", "L3", "L4", "L5", "L6", "L7"]);
    assert_eq!(logger.fs().raw("/0/0.csv"), Some(&b""[..]));
    assert_eq!(logger.fs().raw("/0/1.csv"), Some(&b""[..]));
    assert_eq!(logger.fs().raw("/1/0.csv"), Some(&b"L4\r\nL5\r\n"[..]));
}

#[test]
fn test_eviction_is_persisted() {
    let mut logger = fresh();
    let records: Vec<String> = (0..9).map(|i| format!("L{i}")).collect();
    let refs: Vec<&str> = records.iter().map(String::as_str).collect();
    write_all(&mut logger, &refs);
    assert_eq!(logger.persisted().read.id, 4);

    let (mut logger, outcome) = reboot(logger, config_222());
    assert_eq!(
        outcome,
        InitOutcome::Mounted {
            recovered: 1,
            truncated: false
        }
    );
    assert_eq!(drain(&mut logger), ["L4", "L5", "L6", "L7", "L8"]);
}

#[test]
fn test_reader_keeping_up_is_never_evicted() {
    let mut logger = fresh();
    for lap in 0..5 {
        for i in 0..3 {
            logger.write_str(&format!("{lap}-{i}")).unwrap();
        }
        let expected: Vec<String> = (0..3).map(|i| format!("{lap}-{i}")).collect();
        assert_eq!(drain(&mut logger), expected);
    }
}

// ===========================================================================
// Power-cut recovery
// ===========================================================================

#[test]
fn test_records_after_last_boundary_recovered() {
    let mut logger = fresh();
    write_all(&mut logger, &["L0", "L1", "L2"]);
    assert_eq!(logger.persisted().write.id, 2);

    let (mut logger, outcome) = reboot(logger, config_222());
    assert_eq!(
        outcome,
        InitOutcome::Mounted {
            recovered: 1,
            truncated: false
        }
    );
    assert_eq!(logger.write_cursor().id, 3);
    assert_eq!(logger.persisted().write.id, 3);
    assert_eq!(drain(&mut logger), ["L0", "L1", "L2"]);
}

#[test]
fn test_torn_record_truncated() {
    let mut logger = fresh();
    write_all(&mut logger, &["L0", "L1", "L2"]);
    logger.fs_mut().set_raw("/0/1.csv", b"L2\r\nL3-cut-sh".to_vec());

    let (mut logger, outcome) = reboot(logger, config_222());
    assert_eq!(
        outcome,
        InitOutcome::Mounted {
            recovered: 1,
            truncated: true
        }
    );
    assert_eq!(logger.fs().raw("/0/1.csv"), Some(&b"L2\r\n"[..]));

    logger.write_str("L3").unwrap();
    assert_eq!(drain(&mut logger), ["L0", "L1", "L2", "L3"]);
}

#[test]
fn test_torn_first_record_of_file_truncated() {
    let mut logger = fresh();
    write_all(&mut logger, &["L0", "L1"]);
    logger.fs_mut().set_raw("/0/1.csv", b"L2\r".to_vec());

    let (mut logger, outcome) = reboot(logger, config_222());
    assert_eq!(
        outcome,
        InitOutcome::Mounted {
            recovered: 0,
            truncated: true
        }
    );
    assert_eq!(logger.fs().raw("/0/1.csv"), Some(&b""[..]));
    assert_eq!(drain(&mut logger), ["L0", "L1"]);
}

#[test]
fn test_recovery_across_unflushed_boundary() {
    let mut logger = fresh();
    write_all(&mut logger, &["L0", "L1", "L2"]);
    // The boundary flush after L3 fails and power is lost before the retry.
    logger.fs_mut().fail_open(METADATA_PATH);
    logger.write_str("L3").unwrap();
    assert_eq!(logger.persisted().write.id, 2);

    let (mut logger, outcome) = reboot(logger, config_222());
    assert_eq!(
        outcome,
        InitOutcome::Mounted {
            recovered: 2,
            truncated: false
        }
    );
    assert_eq!(logger.write_cursor(), Cursor::at_file_start(logger.grid(), 4));
    logger.write_str("L4").unwrap();
    assert_eq!(drain(&mut logger), ["L0", "L1", "L2", "L3", "L4"]);
}

#[test]
fn test_reader_in_cleared_directory_evicted_on_replay() {
    let mut logger = fresh();
    write_all(&mut logger, &["L0", "L1", "L2", "L3", "L4", "L5"]);
    let mut out = Vec::new();
    assert_eq!(logger.read_log(&mut out, 1).unwrap(), 1);
    logger.store_metadata(StoreConfig::Read).unwrap();
    logger.write_str("L6").unwrap();
    // Entering dir 0 again clears it, but the flush is lost.
    logger.fs_mut().fail_open(METADATA_PATH);
    logger.write_str("L7").unwrap();
    assert_eq!(logger.persisted().read.position, 4);
    assert_eq!(logger.fs().raw("/0/0.csv"), Some(&b""[..]));

    let (mut logger, outcome) = reboot(logger, config_222());
    assert_eq!(
        outcome,
        InitOutcome::Mounted {
            recovered: 2,
            truncated: false
        }
    );
    assert_eq!(drain(&mut logger), ["L4", "L5", "L6", "L7"]);
}

#[test]
fn test_read_progress_survives_reboot() {
    let mut logger = fresh();
    write_all(&mut logger, &["L0", "L1", "L2", "L3", "L4"]);
    let mut out = Vec::new();
    assert_eq!(logger.read_log(&mut out, 2).unwrap(), 2);
    logger.store_metadata(StoreConfig::Read).unwrap();
    logger.deinit().unwrap();

    let (mut logger, _) = reboot(logger, config_222());
    assert_eq!(logger.read_cursor().id, 2);
    assert_eq!(logger.write_cursor().id, 5);
    assert_eq!(drain(&mut logger), ["L2", "L3", "L4"]);
}

#[test]
fn test_unstored_read_progress_is_replayed() {
    let mut logger = fresh();
    write_all(&mut logger, &["L0", "L1"]);
    assert_eq!(drain(&mut logger), ["L0", "L1"]);

    let (mut logger, _) = reboot(logger, config_222());
    assert_eq!(drain(&mut logger), ["L0", "L1"]);
}

// ===========================================================================
// Reformat
// ===========================================================================

#[test]
fn test_grid_mismatch_reformats() {
    let mut logger = fresh();
    write_all(&mut logger, &["L0", "L1", "L2"]);

    let config = LoggerConfig {
        num_of_logs_per_file: 3,
        ..config_222()
    };
    let (mut logger, outcome) = reboot(logger, config);
    assert_eq!(outcome, InitOutcome::Formatted);
    assert_eq!(logger.num_of_logs_to_read(), 0);
    assert_eq!(logger.persisted().grid.num_of_logs_per_file, 3);
    assert!(drain(&mut logger).is_empty());
}

#[test]
fn test_corrupt_metadata_reformats() {
    let mut logger = fresh();
    write_all(&mut logger, &["L0", "L1", "L2"]);
    let mut image = logger.fs().raw(METADATA_PATH).unwrap().to_vec();
    image[25] ^= 0x80;
    logger.fs_mut().set_raw(METADATA_PATH, image);

    let (logger, outcome) = reboot(logger, config_222());
    assert_eq!(outcome, InitOutcome::Formatted);
    assert_eq!(logger.fs().raw("/0/0.csv"), Some(&b""[..]));
}

#[test]
fn test_unmountable_medium_reformats() {
    let mut logger = fresh();
    write_all(&mut logger, &["L0"]);
    let mut fs = logger.into_inner();
    fs.corrupt();

    let mut logger = Logger::new(fs, config_222()).unwrap();
    assert_eq!(logger.init().unwrap(), InitOutcome::Formatted);
    logger.write_str("L1").unwrap();
    assert_eq!(drain(&mut logger), ["L1"]);
}

#[test]
fn test_missing_log_file_reformats() {
    let mut logger = fresh();
    write_all(&mut logger, &["L0"]);
    logger.fs_mut().remove("/0/0.csv").unwrap();

    let (_, outcome) = reboot(logger, config_222());
    assert_eq!(outcome, InitOutcome::Formatted);
}

#[test]
fn test_write_position_past_end_of_file_reformats() {
    let mut logger = fresh_with(LoggerConfig {
        num_of_logs_per_file: 4,
        ..config_222()
    });
    write_all(&mut logger, &["L0", "L1"]);
    logger.store_metadata(StoreConfig::Write).unwrap();
    assert_eq!(logger.persisted().write.position, 8);
    // The medium lost L1 although the metadata counts it.
    logger.fs_mut().set_raw("/0/0.csv", b"L0\r\n".to_vec());

    let config = logger.config().clone();
    let (mut logger, outcome) = reboot(logger, config);
    assert_eq!(outcome, InitOutcome::Formatted);
    logger.write_str("L2").unwrap();
    assert_eq!(drain(&mut logger), ["L2"]);
}

#[test]
fn test_read_position_past_end_of_file_reformats() {
    let mut logger = fresh();
    write_all(&mut logger, &["L0", "L1", "L2"]);
    let mut out = Vec::new();
    assert_eq!(logger.read_log(&mut out, 1).unwrap(), 1);
    logger.store_metadata(StoreConfig::Read).unwrap();
    logger.fs_mut().set_raw("/0/0.csv", Vec::new());

    let (mut logger, outcome) = reboot(logger, config_222());
    assert_eq!(outcome, InitOutcome::Formatted);
    assert_eq!(logger.num_of_logs_to_read(), 0);
}

// ===========================================================================
// Host directory backend
// ===========================================================================

#[test]
fn test_host_directory_ring() {
    init_tracing();
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path().join("logs");

    let mut logger = Logger::new(HostFs::new(&root), config_222()).unwrap();
    assert_eq!(logger.init().unwrap(), InitOutcome::Formatted);
    for i in 0..5 {
        logger.write_str(&format!("L{i}")).unwrap();
    }
    logger.deinit().unwrap();
    assert_eq!(
        std::fs::read(root.join("1").join("0.csv")).unwrap(),
        b"L4\r\n"
    );

    let mut logger = Logger::new(HostFs::new(&root), config_222()).unwrap();
    assert_eq!(
        logger.init().unwrap(),
        InitOutcome::Mounted {
            recovered: 1,
            truncated: false
        }
    );
    assert_eq!(drain(&mut logger), ["L0", "L1", "L2", "L3", "L4"]);
}
