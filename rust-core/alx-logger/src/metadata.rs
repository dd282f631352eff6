// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Auralix storage - persisted logger metadata
// Copyright (c) 2026 Auralix d.o.o.
//
// ## On-disk format (all integers little-endian)
//
// ```text
// [4 bytes: magic_number (u32)]         -- 0x002DCA5D
// [4 bytes: version (u32)]              -- 1
// [4 bytes: num_of_dir (u32)]
// [4 bytes: num_of_files_per_dir (u32)]
// [4 bytes: num_of_logs_per_file (u32)]
// [24 bytes: read cursor]               -- id u64, position, line, file, dir u32
// [24 bytes: write cursor]
// [crc_len bytes: checksum]             -- over all preceding bytes
// ```
//
// With the workspace CRC-32 the image is 72 bytes.

use alx_crc::Checksum;
use serde::{Deserialize, Serialize};

use crate::cursor::{Cursor, Grid};
use crate::error::MetadataError;

/// Identifies a logger metadata image.
pub const MAGIC_NUMBER: u32 = 0x002D_CA5D;

/// Current metadata format version.
pub const VERSION: u32 = 1;

/// Encoded size of everything before the checksum trailer.
pub const BODY_LEN: usize = 68;

/// Encoded size with the 4-byte CRC-32 trailer.
pub const ENCODED_LEN: usize = BODY_LEN + 4;

const CURSOR_LEN: usize = 24;
const READ_OFFSET: usize = 20;
const WRITE_OFFSET: usize = READ_OFFSET + CURSOR_LEN;

/// The logger state that survives a reboot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub magic_number: u32,
    pub version: u32,
    pub grid: Grid,
    pub read: Cursor,
    pub write: Cursor,
}

impl Metadata {
    /// Factory default metadata: both cursors at the start of the ring.
    pub fn new(grid: Grid) -> Self {
        Self {
            magic_number: MAGIC_NUMBER,
            version: VERSION,
            grid,
            read: Cursor::ZERO,
            write: Cursor::ZERO,
        }
    }

    /// Serialize to the on-disk image, checksum included.
    pub fn encode<C: Checksum>(&self, crc: &C) -> Vec<u8> {
        let mut body = Vec::with_capacity(BODY_LEN);
        body.extend_from_slice(&self.magic_number.to_le_bytes());
        body.extend_from_slice(&self.version.to_le_bytes());
        body.extend_from_slice(&self.grid.num_of_dir.to_le_bytes());
        body.extend_from_slice(&self.grid.num_of_files_per_dir.to_le_bytes());
        body.extend_from_slice(&self.grid.num_of_logs_per_file.to_le_bytes());
        encode_cursor(&mut body, &self.read);
        encode_cursor(&mut body, &self.write);

        let mut image = Vec::with_capacity(BODY_LEN + crc.trailer_len());
        crc.append(&mut image, &body);
        image
    }

    /// Parse an on-disk image, checking length, checksum, magic number,
    /// version and cursor order.
    pub fn decode<C: Checksum>(bytes: &[u8], crc: &C) -> Result<Self, MetadataError> {
        let expected = BODY_LEN + crc.trailer_len();
        if bytes.len() != expected {
            return Err(MetadataError::Length {
                expected,
                actual: bytes.len(),
            });
        }
        if crc.is_ok(bytes).is_none() {
            let mut stored = [0u8; 4];
            stored[..crc.trailer_len()].copy_from_slice(&bytes[BODY_LEN..]);
            return Err(MetadataError::CrcMismatch {
                expected: u32::from_le_bytes(stored),
                actual: crc.calc(&bytes[..BODY_LEN]),
            });
        }

        let magic_number = read_u32(bytes, 0);
        if magic_number != MAGIC_NUMBER {
            return Err(MetadataError::BadMagic(magic_number));
        }
        let version = read_u32(bytes, 4);
        if version != VERSION {
            return Err(MetadataError::UnsupportedVersion(version));
        }

        let metadata = Self {
            magic_number,
            version,
            grid: Grid::new(read_u32(bytes, 8), read_u32(bytes, 12), read_u32(bytes, 16)),
            read: decode_cursor(bytes, READ_OFFSET),
            write: decode_cursor(bytes, WRITE_OFFSET),
        };
        if metadata.write.id < metadata.read.id {
            return Err(MetadataError::CursorOrder {
                read: metadata.read.id,
                write: metadata.write.id,
            });
        }
        Ok(metadata)
    }

    /// Check that a decoded image belongs to a ring of shape `grid`.
    pub fn check_grid(&self, grid: &Grid) -> Result<(), MetadataError> {
        if self.grid != *grid {
            return Err(MetadataError::GridMismatch);
        }
        if !self.read.is_consistent(grid) {
            return Err(MetadataError::CursorMismatch { which: "read" });
        }
        if !self.write.is_consistent(grid) {
            return Err(MetadataError::CursorMismatch { which: "write" });
        }
        Ok(())
    }
}

fn encode_cursor(out: &mut Vec<u8>, cursor: &Cursor) {
    out.extend_from_slice(&cursor.id.to_le_bytes());
    out.extend_from_slice(&cursor.position.to_le_bytes());
    out.extend_from_slice(&cursor.line.to_le_bytes());
    out.extend_from_slice(&cursor.file.to_le_bytes());
    out.extend_from_slice(&cursor.dir.to_le_bytes());
}

fn decode_cursor(bytes: &[u8], offset: usize) -> Cursor {
    Cursor {
        id: read_u64(bytes, offset),
        position: read_u32(bytes, offset + 8),
        line: read_u32(bytes, offset + 12),
        file: read_u32(bytes, offset + 16),
        dir: read_u32(bytes, offset + 20),
    }
}

// Callers have checked the length, so the slices below are in bounds.
fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(raw)
}
