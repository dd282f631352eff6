// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Auralix storage - parameter key-value store
// Copyright (c) 2026 Auralix d.o.o.
//
// Each key is a file path and each value is the whole file. The store owns
// the mount lifecycle: `init()` mounts, formatting a medium that cannot be
// mounted.

use alx_fs::{FileSystem, OpenMode};
use tracing::{debug, info};

use crate::error::{KvError, KvResult};

/// File-per-key parameter store.
#[derive(Debug)]
pub struct ParamKvStore<F> {
    fs: F,
    is_init: bool,
}

impl<F: FileSystem> ParamKvStore<F> {
    pub fn new(fs: F) -> Self {
        Self { fs, is_init: false }
    }

    /// Mount the file system, formatting and remounting when the mount
    /// fails.
    pub fn init(&mut self) -> KvResult<()> {
        if self.is_init {
            return Err(KvError::AlreadyInitialized);
        }
        self.fs.mount_or_format()?;
        self.is_init = true;
        info!("Parameter store initialized");
        Ok(())
    }

    pub fn deinit(&mut self) -> KvResult<()> {
        self.ensure_init()?;
        self.fs.unmount()?;
        self.is_init = false;
        Ok(())
    }

    pub fn is_init(&self) -> bool {
        self.is_init
    }

    /// Read the value of `key` into `buf`, returning the number of bytes
    /// read. Values longer than `buf` are cut off.
    pub fn get(&mut self, key: &str, buf: &mut [u8]) -> KvResult<usize> {
        self.ensure_init()?;
        let mut file = self.fs.file_open(key, OpenMode::Read)?;
        let mut filled = 0;
        let read = loop {
            if filled == buf.len() {
                break Ok(filled);
            }
            match self.fs.file_read(&mut file, &mut buf[filled..]) {
                Ok(0) => break Ok(filled),
                Ok(n) => filled += n,
                Err(err) => break Err(err),
            }
        };
        let closed = self.fs.file_close(file);
        let filled = read?;
        closed?;
        debug!(key, len = filled, "Parameter read");
        Ok(filled)
    }

    /// Replace the value of `key`.
    pub fn set(&mut self, key: &str, data: &[u8]) -> KvResult<()> {
        self.ensure_init()?;
        self.fs.write_all(key, data)?;
        debug!(key, len = data.len(), "Parameter written");
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> KvResult<()> {
        self.ensure_init()?;
        self.fs.remove(key)?;
        Ok(())
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn into_inner(self) -> F {
        self.fs
    }

    fn ensure_init(&self) -> KvResult<()> {
        if self.is_init {
            Ok(())
        } else {
            Err(KvError::NotInitialized)
        }
    }
}
