// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Auralix storage - checksum primitive
// Copyright (c) 2026 Auralix d.o.o.
//
// Both the logger metadata and the safe dual-copy store protect their
// payloads with a fixed-length checksum stored as a little-endian trailer:
//
// ```text
// [N bytes: payload]
// [len() bytes: checksum of payload, little-endian]
// ```
//
// The `Checksum` trait is the seam; `Crc32` (CRC-32/ISO-HDLC via
// `crc32fast`) is the implementation used throughout the workspace.

use crc32fast::Hasher as Crc32Hasher;

/// Longest trailer a `Checksum` can occupy; `calc` yields a `u32`.
pub const MAX_LEN: usize = 4;

/// A fixed-length checksum over a byte buffer.
///
/// Implementations only provide [`Checksum::len`] and [`Checksum::calc`];
/// trailer validation and encoding are shared.
pub trait Checksum {
    /// Number of trailer bytes this checksum occupies on disk (at most
    /// [`MAX_LEN`]).
    fn len(&self) -> usize;

    /// Compute the checksum of `data`.
    fn calc(&self, data: &[u8]) -> u32;

    /// Trailer length actually stored: [`Checksum::len`] clamped to
    /// [`MAX_LEN`].
    fn trailer_len(&self) -> usize {
        self.len().min(MAX_LEN)
    }

    /// Validate a buffer laid out as `payload ‖ trailer`.
    ///
    /// Returns the validated checksum, or `None` when the buffer is shorter
    /// than the trailer or the trailer does not match the payload.
    fn is_ok(&self, data_with_crc: &[u8]) -> Option<u32> {
        let crc_len = self.trailer_len();
        if data_with_crc.len() < crc_len {
            return None;
        }
        let (payload, trailer) = data_with_crc.split_at(data_with_crc.len() - crc_len);
        let stored = decode_trailer(trailer);
        let calculated = self.calc(payload) & mask(crc_len);
        (stored == calculated).then_some(calculated)
    }

    /// Append `data` followed by its checksum trailer to `out`.
    fn append(&self, out: &mut Vec<u8>, data: &[u8]) {
        let crc = self.calc(data);
        out.extend_from_slice(data);
        out.extend_from_slice(&crc.to_le_bytes()[..self.trailer_len()]);
    }
}

/// CRC-32 (ISO-HDLC, the zlib/Ethernet polynomial), hardware accelerated
/// where `crc32fast` supports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Crc32;

impl Checksum for Crc32 {
    fn len(&self) -> usize {
        4
    }

    fn calc(&self, data: &[u8]) -> u32 {
        let mut hasher = Crc32Hasher::new();
        hasher.update(data);
        hasher.finalize()
    }
}

fn decode_trailer(trailer: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw[..trailer.len()].copy_from_slice(trailer);
    u32::from_le_bytes(raw)
}

fn mask(len: usize) -> u32 {
    if len >= 4 {
        u32::MAX
    } else {
        (1u32 << (len * 8)) - 1
    }
}
