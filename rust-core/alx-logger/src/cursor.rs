// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Auralix storage - ring grid and cursors
// Copyright (c) 2026 Auralix d.o.o.
//
// The log ring is a fixed grid of `num_of_dir` directories, each holding
// `num_of_files_per_dir` files of `num_of_logs_per_file` records. A cursor
// names one record slot: its monotonically increasing id plus the slot's
// coordinates and the byte offset inside the file. Because the grid is
// fixed, the coordinates are a pure function of the id:
//
// ```text
// line = id % logs_per_file
// file = (id / logs_per_file) % files_per_dir
// dir  = (id / logs_per_dir) % num_of_dir
// ```

use serde::{Deserialize, Serialize};

/// Shape of the log ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid {
    pub num_of_dir: u32,
    pub num_of_files_per_dir: u32,
    pub num_of_logs_per_file: u32,
}

/// Coordinates of a record slot in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub dir: u32,
    pub file: u32,
    pub line: u32,
}

impl Grid {
    pub fn new(num_of_dir: u32, num_of_files_per_dir: u32, num_of_logs_per_file: u32) -> Self {
        Self {
            num_of_dir,
            num_of_files_per_dir,
            num_of_logs_per_file,
        }
    }

    /// Every dimension is at least one and the ring capacity fits in `u64`.
    pub fn is_valid(&self) -> bool {
        self.num_of_dir >= 1
            && self.num_of_files_per_dir >= 1
            && self.num_of_logs_per_file >= 1
            && self.logs_per_dir().checked_mul(u64::from(self.num_of_dir)).is_some()
    }

    pub fn logs_per_dir(&self) -> u64 {
        u64::from(self.num_of_files_per_dir) * u64::from(self.num_of_logs_per_file)
    }

    /// Ring capacity in records.
    pub fn logs_max(&self) -> u64 {
        self.logs_per_dir().saturating_mul(u64::from(self.num_of_dir))
    }

    /// Coordinates of the slot with the given id.
    pub fn locate(&self, id: u64) -> Location {
        let per_file = u64::from(self.num_of_logs_per_file.max(1));
        let per_dir = self.logs_per_dir().max(1);
        // Each remainder is below a u32 divisor, so the narrowing is lossless.
        Location {
            line: (id % per_file) as u32,
            file: ((id / per_file) % u64::from(self.num_of_files_per_dir.max(1))) as u32,
            dir: ((id / per_dir) % u64::from(self.num_of_dir.max(1))) as u32,
        }
    }

    /// Lowest id the read cursor may hold once the write cursor is at
    /// `write_id`: everything before the start of the directory after the
    /// write cursor's directory (one lap back) has been recycled.
    pub fn eviction_floor(&self, write_id: u64) -> u64 {
        let per_dir = self.logs_per_dir();
        let dir_start = write_id - write_id % per_dir.max(1);
        dir_start.saturating_sub(u64::from(self.num_of_dir.saturating_sub(1)) * per_dir)
    }
}

/// Position of the read or write end of the ring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor {
    /// Sequence number of the record slot, counting from zero since format.
    pub id: u64,
    /// Byte offset of the slot inside its file.
    pub position: u32,
    pub line: u32,
    pub file: u32,
    pub dir: u32,
}

impl Cursor {
    /// The cursor of a freshly formatted ring.
    pub const ZERO: Cursor = Cursor {
        id: 0,
        position: 0,
        line: 0,
        file: 0,
        dir: 0,
    };

    /// Cursor at the first slot of the file containing `id`'s slot. `id`
    /// should be at a file boundary.
    pub fn at_file_start(grid: &Grid, id: u64) -> Self {
        let location = grid.locate(id);
        Self {
            id,
            position: 0,
            line: location.line,
            file: location.file,
            dir: location.dir,
        }
    }

    /// The cursor after a record of `bytes` bytes has been consumed.
    pub fn advance(self, grid: &Grid, bytes: u32) -> Self {
        let mut next = Self {
            id: self.id + 1,
            position: self.position + bytes,
            ..self
        };
        if self.line + 1 >= grid.num_of_logs_per_file {
            next.position = 0;
            next.line = 0;
            if self.file + 1 >= grid.num_of_files_per_dir {
                next.file = 0;
                next.dir = if self.dir + 1 >= grid.num_of_dir {
                    0
                } else {
                    self.dir + 1
                };
            } else {
                next.file = self.file + 1;
            }
        } else {
            next.line = self.line + 1;
        }
        next
    }

    pub fn location(&self) -> Location {
        Location {
            dir: self.dir,
            file: self.file,
            line: self.line,
        }
    }

    /// The cursor sits at the first slot of a file.
    pub fn is_file_start(&self) -> bool {
        self.line == 0
    }

    /// The cursor sits at the first slot of a directory.
    pub fn is_dir_start(&self) -> bool {
        self.line == 0 && self.file == 0
    }

    /// Coordinates agree with the id, and a cursor at the start of a file
    /// has position zero.
    pub fn is_consistent(&self, grid: &Grid) -> bool {
        grid.locate(self.id) == self.location() && (self.line != 0 || self.position == 0)
    }
}
