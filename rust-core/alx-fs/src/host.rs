// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Auralix storage - host-directory file system
// Copyright (c) 2026 Auralix d.o.o.
//
// `HostFs` backs the virtual absolute paths with a directory on the host,
// so that a logger or safe store can run against a real file system during
// development or in a simulator. The root directory plays the role of the
// formatted medium: it must exist to mount, and `format()` recreates it
// empty.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{FsError, FsResult};
use crate::fs::{normalize, DirEntry, EntryKind, FileSystem, SeekOrigin};
use crate::mode::OpenMode;

/// Open file handle into a [`HostFs`].
#[derive(Debug)]
pub struct HostFile {
    file: File,
    path: String,
    mode: OpenMode,
}

/// A [`FileSystem`] rooted at a host directory.
#[derive(Debug)]
pub struct HostFs {
    root: PathBuf,
    mounted: bool,
}

impl HostFs {
    /// Use `root` as the medium. Nothing is touched until `mount()` or
    /// `format()`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            mounted: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_mounted(&self) -> FsResult<()> {
        if self.mounted {
            Ok(())
        } else {
            Err(FsError::NotMounted)
        }
    }

    /// Map a virtual path onto the host, returning the normalized virtual
    /// path alongside for error messages.
    fn resolve(&self, path: &str) -> FsResult<(String, PathBuf)> {
        let normalized = normalize(path)?;
        let host = normalized
            .split('/')
            .filter(|component| !component.is_empty())
            .fold(self.root.clone(), |acc, component| acc.join(component));
        Ok((normalized, host))
    }
}

/// Map host I/O errors onto the portable variants where one exists.
fn map_io(path: &str, err: io::Error) -> FsError {
    match err.kind() {
        io::ErrorKind::NotFound => FsError::NotFound(path.to_string()),
        io::ErrorKind::AlreadyExists => FsError::AlreadyExists(path.to_string()),
        _ => FsError::Io(err),
    }
}

impl FileSystem for HostFs {
    type File = HostFile;

    fn mount(&mut self) -> FsResult<()> {
        if self.mounted {
            return Err(FsError::AlreadyMounted);
        }
        if !self.root.is_dir() {
            return Err(FsError::NotFormatted);
        }
        self.mounted = true;
        debug!(root = %self.root.display(), "Mounted host file system");
        Ok(())
    }

    fn unmount(&mut self) -> FsResult<()> {
        self.ensure_mounted()?;
        self.mounted = false;
        Ok(())
    }

    fn format(&mut self) -> FsResult<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        fs::create_dir_all(&self.root)?;
        self.mounted = false;
        info!(root = %self.root.display(), "Formatted host file system");
        Ok(())
    }

    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn remove(&mut self, path: &str) -> FsResult<()> {
        self.ensure_mounted()?;
        let (path, host) = self.resolve(path)?;
        if path == "/" {
            return Err(FsError::PermissionDenied {
                path,
                reason: "root directory cannot be modified",
            });
        }
        let metadata = fs::metadata(&host).map_err(|err| map_io(&path, err))?;
        if metadata.is_dir() {
            let mut entries = fs::read_dir(&host).map_err(|err| map_io(&path, err))?;
            if entries.next().is_some() {
                return Err(FsError::DirectoryNotEmpty(path));
            }
            fs::remove_dir(&host).map_err(|err| map_io(&path, err))
        } else {
            fs::remove_file(&host).map_err(|err| map_io(&path, err))
        }
    }

    fn rename(&mut self, old: &str, new: &str) -> FsResult<()> {
        self.ensure_mounted()?;
        let (old, old_host) = self.resolve(old)?;
        let (_, new_host) = self.resolve(new)?;
        fs::rename(&old_host, &new_host).map_err(|err| map_io(&old, err))
    }

    fn file_open(&mut self, path: &str, mode: OpenMode) -> FsResult<HostFile> {
        self.ensure_mounted()?;
        let (path, host) = self.resolve(path)?;
        if host.is_dir() {
            return Err(FsError::IsADirectory(path));
        }
        let mut options = OpenOptions::new();
        match mode {
            OpenMode::Read => options.read(true),
            OpenMode::Write => options.write(true).create(true).truncate(true),
            OpenMode::Append => options.append(true).create(true),
            OpenMode::ReadUpdate => options.read(true).write(true),
            OpenMode::WriteUpdate => options.read(true).write(true).create(true).truncate(true),
            OpenMode::AppendUpdate => options.read(true).append(true).create(true),
        };
        let file = options.open(&host).map_err(|err| map_io(&path, err))?;
        Ok(HostFile { file, path, mode })
    }

    fn file_close(&mut self, mut file: HostFile) -> FsResult<()> {
        self.ensure_mounted()?;
        file.file.flush()?;
        Ok(())
    }

    fn file_read(&mut self, file: &mut HostFile, buf: &mut [u8]) -> FsResult<usize> {
        self.ensure_mounted()?;
        if !file.mode.readable() {
            return Err(FsError::PermissionDenied {
                path: file.path.clone(),
                reason: "not opened for reading",
            });
        }
        Ok(file.file.read(buf)?)
    }

    fn file_write(&mut self, file: &mut HostFile, data: &[u8]) -> FsResult<()> {
        self.ensure_mounted()?;
        if !file.mode.writable() {
            return Err(FsError::PermissionDenied {
                path: file.path.clone(),
                reason: "not opened for writing",
            });
        }
        Ok(file.file.write_all(data)?)
    }

    fn file_sync(&mut self, file: &mut HostFile) -> FsResult<()> {
        self.ensure_mounted()?;
        Ok(file.file.sync_all()?)
    }

    fn file_seek(&mut self, file: &mut HostFile, offset: i64, origin: SeekOrigin) -> FsResult<u64> {
        self.ensure_mounted()?;
        let target = match origin {
            SeekOrigin::Set => {
                let start = u64::try_from(offset).map_err(|_| FsError::InvalidSeek(offset))?;
                SeekFrom::Start(start)
            }
            SeekOrigin::Cur => SeekFrom::Current(offset),
            SeekOrigin::End => SeekFrom::End(offset),
        };
        file.file.seek(target).map_err(|err| match err.kind() {
            io::ErrorKind::InvalidInput => FsError::InvalidSeek(offset),
            _ => FsError::Io(err),
        })
    }

    fn file_tell(&mut self, file: &mut HostFile) -> FsResult<u64> {
        self.ensure_mounted()?;
        Ok(file.file.stream_position()?)
    }

    fn file_size(&mut self, file: &mut HostFile) -> FsResult<u64> {
        self.ensure_mounted()?;
        Ok(file.file.metadata()?.len())
    }

    fn file_truncate(&mut self, file: &mut HostFile, size: u64) -> FsResult<()> {
        self.ensure_mounted()?;
        if !file.mode.writable() {
            return Err(FsError::PermissionDenied {
                path: file.path.clone(),
                reason: "not opened for writing",
            });
        }
        Ok(file.file.set_len(size)?)
    }

    fn dir_make(&mut self, path: &str) -> FsResult<()> {
        self.ensure_mounted()?;
        let (path, host) = self.resolve(path)?;
        fs::create_dir(&host).map_err(|err| map_io(&path, err))
    }

    fn dir_read(&mut self, path: &str) -> FsResult<Vec<DirEntry>> {
        self.ensure_mounted()?;
        let (path, host) = self.resolve(path)?;
        if host.is_file() {
            return Err(FsError::NotADirectory(path));
        }
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&host).map_err(|err| map_io(&path, err))? {
            let dir_entry = dir_entry?;
            let metadata = dir_entry.metadata()?;
            entries.push(DirEntry {
                name: dir_entry.file_name().to_string_lossy().to_string(),
                kind: if metadata.is_dir() {
                    EntryKind::Dir
                } else {
                    EntryKind::File
                },
                size: if metadata.is_dir() { 0 } else { metadata.len() },
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::Until;
    use tempfile::TempDir;

    fn mounted(dir: &TempDir) -> HostFs {
        let mut fs = HostFs::new(dir.path().join("medium"));
        fs.mount_or_format().unwrap();
        fs
    }

    #[test]
    fn test_missing_root_is_not_formatted() {
        let dir = TempDir::new().unwrap();
        let mut fs = HostFs::new(dir.path().join("medium"));
        assert!(matches!(fs.mount(), Err(FsError::NotFormatted)));
    }

    #[test]
    fn test_format_wipes_root() {
        let dir = TempDir::new().unwrap();
        let mut fs = mounted(&dir);
        fs.write_all("/a.bin", b"x").unwrap();
        fs.unmount().unwrap();
        fs.format().unwrap();
        fs.mount().unwrap();
        assert!(fs.dir_read("/").unwrap().is_empty());
    }

    #[test]
    fn test_paths_map_under_root() {
        let dir = TempDir::new().unwrap();
        let mut fs = mounted(&dir);
        fs.dir_make("/0").unwrap();
        fs.write_all("/0/1.csv", b"rec\r\n").unwrap();
        let on_host = std::fs::read(dir.path().join("medium").join("0").join("1.csv")).unwrap();
        assert_eq!(on_host, b"rec\r\n");
    }

    #[test]
    fn test_append_and_read_until() {
        let dir = TempDir::new().unwrap();
        let mut fs = mounted(&dir);
        for record in [&b"a\r\n"[..], b"bb\r\n"] {
            let mut file = fs.file_open("/l.csv", OpenMode::Append).unwrap();
            fs.file_write(&mut file, record).unwrap();
            fs.file_close(file).unwrap();
        }
        let mut file = fs.file_open("/l.csv", OpenMode::Read).unwrap();
        fs.file_seek(&mut file, 3, SeekOrigin::Set).unwrap();
        let mut out = Vec::new();
        assert_eq!(
            fs.file_read_until(&mut file, b"\r\n", 16, &mut out).unwrap(),
            Until::Found(4)
        );
        assert_eq!(out, b"bb\r\n");
    }

    #[test]
    fn test_truncate_and_size() {
        let dir = TempDir::new().unwrap();
        let mut fs = mounted(&dir);
        fs.write_all("/a", b"0123456789").unwrap();
        let mut file = fs.file_open("/a", OpenMode::ReadUpdate).unwrap();
        fs.file_truncate(&mut file, 3).unwrap();
        assert_eq!(fs.file_size(&mut file).unwrap(), 3);
        fs.file_close(file).unwrap();
        assert_eq!(fs.read_to_vec("/a").unwrap(), b"012");
    }

    #[test]
    fn test_negative_seek_rejected() {
        let dir = TempDir::new().unwrap();
        let mut fs = mounted(&dir);
        fs.write_all("/a", b"x").unwrap();
        let mut file = fs.file_open("/a", OpenMode::Read).unwrap();
        assert!(matches!(
            fs.file_seek(&mut file, -1, SeekOrigin::Set),
            Err(FsError::InvalidSeek(-1))
        ));
    }

    #[test]
    fn test_not_found_maps_to_portable_error() {
        let dir = TempDir::new().unwrap();
        let mut fs = mounted(&dir);
        assert!(matches!(
            fs.file_open("/missing", OpenMode::Read),
            Err(FsError::NotFound(p)) if p == "/missing"
        ));
        assert!(matches!(fs.dir_make("/x/y"), Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_remove_non_empty_directory_rejected() {
        let dir = TempDir::new().unwrap();
        let mut fs = mounted(&dir);
        fs.dir_make("/0").unwrap();
        fs.write_all("/0/0.csv", b"").unwrap();
        assert!(matches!(fs.remove("/0"), Err(FsError::DirectoryNotEmpty(_))));
    }
}
