// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Auralix storage - fopen-style open modes
// Copyright (c) 2026 Auralix d.o.o.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FsError;

/// How a file is opened, following C `fopen` semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpenMode {
    /// `"r"`: read only, the file must exist.
    Read,
    /// `"w"`: write only, create or truncate.
    Write,
    /// `"a"`: write only, create, every write goes to the end.
    Append,
    /// `"r+"`: read and write, the file must exist.
    ReadUpdate,
    /// `"w+"`: read and write, create or truncate.
    WriteUpdate,
    /// `"a+"`: read and write, create, every write goes to the end.
    AppendUpdate,
}

impl OpenMode {
    /// The `fopen` mode string.
    pub fn as_str(self) -> &'static str {
        match self {
            OpenMode::Read => "r",
            OpenMode::Write => "w",
            OpenMode::Append => "a",
            OpenMode::ReadUpdate => "r+",
            OpenMode::WriteUpdate => "w+",
            OpenMode::AppendUpdate => "a+",
        }
    }

    pub fn readable(self) -> bool {
        !matches!(self, OpenMode::Write | OpenMode::Append)
    }

    pub fn writable(self) -> bool {
        !matches!(self, OpenMode::Read)
    }

    /// Missing files are created on open.
    pub fn creates(self) -> bool {
        !matches!(self, OpenMode::Read | OpenMode::ReadUpdate)
    }

    /// Existing contents are discarded on open.
    pub fn truncates(self) -> bool {
        matches!(self, OpenMode::Write | OpenMode::WriteUpdate)
    }

    /// Every write is positioned at the end of the file.
    pub fn appends(self) -> bool {
        matches!(self, OpenMode::Append | OpenMode::AppendUpdate)
    }
}

impl FromStr for OpenMode {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" => Ok(OpenMode::Read),
            "w" => Ok(OpenMode::Write),
            "a" => Ok(OpenMode::Append),
            "r+" => Ok(OpenMode::ReadUpdate),
            "w+" => Ok(OpenMode::WriteUpdate),
            "a+" => Ok(OpenMode::AppendUpdate),
            other => Err(FsError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
