// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Auralix storage - in-memory file system
// Copyright (c) 2026 Auralix d.o.o.
//
// `MemFs` simulates a flash medium in process memory. It behaves like a
// small littlefs volume: a blank medium refuses to mount until formatted,
// formatting wipes everything, and a clone of the value is a snapshot of the
// medium (which is how tests simulate a reboot). Test hooks allow raw access
// to file bytes and one-shot fault injection per operation.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::error::{FsError, FsResult};
use crate::fs::{normalize, parent, DirEntry, EntryKind, FileSystem, FsOp, SeekOrigin};
use crate::mode::OpenMode;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// Open file handle into a [`MemFs`].
#[derive(Debug)]
pub struct MemFile {
    path: String,
    mode: OpenMode,
    position: u64,
}

impl MemFile {
    /// Normalized path of the open file.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }
}

/// An in-memory, littlefs-like file system.
#[derive(Debug, Clone, Default)]
pub struct MemFs {
    nodes: BTreeMap<String, Node>,
    formatted: bool,
    mounted: bool,
    faults: Vec<FsOp>,
    open_faults: Vec<String>,
}

impl MemFs {
    /// A blank, unformatted medium.
    pub fn new() -> Self {
        Self::default()
    }

    /// A freshly formatted, unmounted medium.
    pub fn formatted() -> Self {
        let mut fs = Self::new();
        fs.wipe();
        fs
    }

    /// Make the next call of `op` fail with [`FsError::Injected`]. Faults
    /// queue up and each one fires once.
    pub fn fail_next(&mut self, op: FsOp) {
        self.faults.push(op);
    }

    /// Make the next `file_open` of `path` fail with
    /// [`FsError::Injected`], leaving opens of other paths untouched.
    pub fn fail_open(&mut self, path: &str) {
        if let Ok(path) = normalize(path) {
            self.open_faults.push(path);
        }
    }

    /// Faults that have been queued but not fired yet.
    pub fn pending_faults(&self) -> &[FsOp] {
        &self.faults
    }

    pub fn clear_faults(&mut self) {
        self.faults.clear();
        self.open_faults.clear();
    }

    /// Destroy the file-system structures so that the next mount fails with
    /// [`FsError::NotFormatted`]. File contents are kept until the next
    /// format.
    pub fn corrupt(&mut self) {
        self.formatted = false;
        self.mounted = false;
    }

    /// Raw contents of a file, bypassing handles and the mount state.
    pub fn raw(&self, path: &str) -> Option<&[u8]> {
        let path = normalize(path).ok()?;
        match self.nodes.get(&path) {
            Some(Node::File(data)) => Some(data),
            _ => None,
        }
    }

    /// Overwrite (or create) a file with raw bytes, bypassing handles and
    /// the mount state. Used to simulate torn writes and bit rot.
    pub fn set_raw(&mut self, path: &str, data: impl Into<Vec<u8>>) {
        if let Ok(path) = normalize(path) {
            self.nodes.insert(path, Node::File(data.into()));
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        normalize(path)
            .map(|path| self.nodes.contains_key(&path))
            .unwrap_or(false)
    }

    /// Number of files on the medium.
    pub fn file_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| matches!(node, Node::File(_)))
            .count()
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn wipe(&mut self) {
        self.nodes.clear();
        self.nodes.insert("/".to_string(), Node::Dir);
        self.formatted = true;
        self.mounted = false;
    }

    fn check(&mut self, op: FsOp) -> FsResult<()> {
        if let Some(idx) = self.faults.iter().position(|fault| *fault == op) {
            self.faults.remove(idx);
            debug!(?op, "Firing injected fault");
            return Err(FsError::Injected(op));
        }
        if !self.mounted && !matches!(op, FsOp::Mount | FsOp::Format) {
            return Err(FsError::NotMounted);
        }
        Ok(())
    }

    fn require_dir(&self, path: &str) -> FsResult<()> {
        match self.nodes.get(path) {
            Some(Node::Dir) => Ok(()),
            Some(Node::File(_)) => Err(FsError::NotADirectory(path.to_string())),
            None => Err(FsError::NotFound(path.to_string())),
        }
    }

    fn require_parent(&self, path: &str) -> FsResult<()> {
        match parent(path) {
            Some(dir) => self.require_dir(dir),
            None => Err(FsError::PermissionDenied {
                path: path.to_string(),
                reason: "root directory cannot be modified",
            }),
        }
    }

    fn data(&self, file: &MemFile) -> FsResult<&Vec<u8>> {
        match self.nodes.get(&file.path) {
            Some(Node::File(data)) => Ok(data),
            _ => Err(FsError::BadHandle(file.path.clone())),
        }
    }

    fn data_mut(&mut self, file: &MemFile) -> FsResult<&mut Vec<u8>> {
        match self.nodes.get_mut(&file.path) {
            Some(Node::File(data)) => Ok(data),
            _ => Err(FsError::BadHandle(file.path.clone())),
        }
    }

    fn children(&self, dir: &str) -> impl Iterator<Item = (&String, &Node)> {
        let prefix = if dir == "/" {
            "/".to_string()
        } else {
            format!("{dir}/")
        };
        self.nodes
            .range(prefix.clone()..)
            .take_while(move |(key, _)| key.starts_with(&prefix))
            .filter(|(key, _)| key.as_str() != "/")
    }
}

impl FileSystem for MemFs {
    type File = MemFile;

    fn mount(&mut self) -> FsResult<()> {
        self.check(FsOp::Mount)?;
        if self.mounted {
            return Err(FsError::AlreadyMounted);
        }
        if !self.formatted {
            return Err(FsError::NotFormatted);
        }
        self.mounted = true;
        Ok(())
    }

    fn unmount(&mut self) -> FsResult<()> {
        self.check(FsOp::Unmount)?;
        self.mounted = false;
        Ok(())
    }

    fn format(&mut self) -> FsResult<()> {
        self.check(FsOp::Format)?;
        self.wipe();
        debug!("Formatted in-memory medium");
        Ok(())
    }

    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn remove(&mut self, path: &str) -> FsResult<()> {
        self.check(FsOp::Remove)?;
        let path = normalize(path)?;
        self.require_parent(&path)?;
        match self.nodes.get(&path) {
            None => return Err(FsError::NotFound(path)),
            Some(Node::Dir) if self.children(&path).next().is_some() => {
                return Err(FsError::DirectoryNotEmpty(path));
            }
            Some(_) => {}
        }
        self.nodes.remove(&path);
        Ok(())
    }

    fn rename(&mut self, old: &str, new: &str) -> FsResult<()> {
        self.check(FsOp::Rename)?;
        let old = normalize(old)?;
        let new = normalize(new)?;
        self.require_parent(&old)?;
        self.require_parent(&new)?;
        if old == new {
            return Ok(());
        }
        let node = self
            .nodes
            .get(&old)
            .cloned()
            .ok_or_else(|| FsError::NotFound(old.clone()))?;
        match (&node, self.nodes.get(&new)) {
            (_, Some(Node::Dir)) => return Err(FsError::AlreadyExists(new)),
            (Node::Dir, Some(Node::File(_))) => return Err(FsError::NotADirectory(new)),
            _ => {}
        }
        if node == Node::Dir {
            let moved: Vec<(String, Node)> = self
                .children(&old)
                .map(|(key, node)| (key.clone(), node.clone()))
                .collect();
            for (key, child) in moved {
                self.nodes.remove(&key);
                self.nodes.insert(format!("{new}{}", &key[old.len()..]), child);
            }
        }
        self.nodes.remove(&old);
        self.nodes.insert(new, node);
        Ok(())
    }

    fn file_open(&mut self, path: &str, mode: OpenMode) -> FsResult<MemFile> {
        self.check(FsOp::Open)?;
        let path = normalize(path)?;
        if let Some(idx) = self.open_faults.iter().position(|fault| *fault == path) {
            self.open_faults.remove(idx);
            debug!(path = %path, "Firing injected open fault");
            return Err(FsError::Injected(FsOp::Open));
        }
        self.require_parent(&path)?;
        match self.nodes.get_mut(&path) {
            Some(Node::Dir) => return Err(FsError::IsADirectory(path)),
            Some(Node::File(data)) => {
                if mode.truncates() {
                    data.clear();
                }
            }
            None if mode.creates() => {
                self.nodes.insert(path.clone(), Node::File(Vec::new()));
            }
            None => return Err(FsError::NotFound(path)),
        }
        trace!(path = %path, %mode, "Opened file");
        Ok(MemFile {
            path,
            mode,
            position: 0,
        })
    }

    fn file_close(&mut self, file: MemFile) -> FsResult<()> {
        self.check(FsOp::Close)?;
        self.data(&file)?;
        Ok(())
    }

    fn file_read(&mut self, file: &mut MemFile, buf: &mut [u8]) -> FsResult<usize> {
        self.check(FsOp::Read)?;
        if !file.mode.readable() {
            return Err(FsError::PermissionDenied {
                path: file.path.clone(),
                reason: "not opened for reading",
            });
        }
        let data = self.data(file)?;
        let start = usize::try_from(file.position).unwrap_or(usize::MAX);
        if start >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        file.position += n as u64;
        Ok(n)
    }

    fn file_write(&mut self, file: &mut MemFile, bytes: &[u8]) -> FsResult<()> {
        self.check(FsOp::Write)?;
        if !file.mode.writable() {
            return Err(FsError::PermissionDenied {
                path: file.path.clone(),
                reason: "not opened for writing",
            });
        }
        let appends = file.mode.appends();
        let position = file.position;
        let data = self.data_mut(file)?;
        let start = if appends {
            data.len()
        } else {
            usize::try_from(position).unwrap_or(usize::MAX)
        };
        let end = start + bytes.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(bytes);
        file.position = end as u64;
        Ok(())
    }

    fn file_sync(&mut self, file: &mut MemFile) -> FsResult<()> {
        self.check(FsOp::Sync)?;
        self.data(file).map(|_| ())
    }

    fn file_seek(&mut self, file: &mut MemFile, offset: i64, origin: SeekOrigin) -> FsResult<u64> {
        self.check(FsOp::Seek)?;
        let len = self.data(file)?.len() as i64;
        let base = match origin {
            SeekOrigin::Set => 0,
            SeekOrigin::Cur => file.position as i64,
            SeekOrigin::End => len,
        };
        let target = base.checked_add(offset).ok_or(FsError::InvalidSeek(offset))?;
        if target < 0 {
            return Err(FsError::InvalidSeek(offset));
        }
        file.position = target as u64;
        Ok(file.position)
    }

    fn file_tell(&mut self, file: &mut MemFile) -> FsResult<u64> {
        self.check(FsOp::Seek)?;
        self.data(file)?;
        Ok(file.position)
    }

    fn file_size(&mut self, file: &mut MemFile) -> FsResult<u64> {
        self.check(FsOp::Seek)?;
        Ok(self.data(file)?.len() as u64)
    }

    fn file_truncate(&mut self, file: &mut MemFile, size: u64) -> FsResult<()> {
        self.check(FsOp::Truncate)?;
        if !file.mode.writable() {
            return Err(FsError::PermissionDenied {
                path: file.path.clone(),
                reason: "not opened for writing",
            });
        }
        let size = usize::try_from(size).map_err(|_| FsError::InvalidSeek(i64::MAX))?;
        self.data_mut(file)?.resize(size, 0);
        Ok(())
    }

    fn dir_make(&mut self, path: &str) -> FsResult<()> {
        self.check(FsOp::DirMake)?;
        let path = normalize(path)?;
        if self.nodes.contains_key(&path) {
            return Err(FsError::AlreadyExists(path));
        }
        self.require_parent(&path)?;
        self.nodes.insert(path, Node::Dir);
        Ok(())
    }

    fn dir_read(&mut self, path: &str) -> FsResult<Vec<DirEntry>> {
        self.check(FsOp::DirRead)?;
        let path = normalize(path)?;
        self.require_dir(&path)?;
        let prefix_len = if path == "/" { 1 } else { path.len() + 1 };
        let mut entries: Vec<DirEntry> = self
            .children(&path)
            .filter(|(key, _)| !key[prefix_len..].contains('/'))
            .map(|(key, node)| DirEntry {
                name: key[prefix_len..].to_string(),
                kind: match node {
                    Node::File(_) => EntryKind::File,
                    Node::Dir => EntryKind::Dir,
                },
                size: match node {
                    Node::File(data) => data.len() as u64,
                    Node::Dir => 0,
                },
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::Until;

    fn mounted() -> MemFs {
        let mut fs = MemFs::formatted();
        fs.mount().unwrap();
        fs
    }

    #[test]
    fn test_blank_medium_refuses_mount() {
        let mut fs = MemFs::new();
        assert!(matches!(fs.mount(), Err(FsError::NotFormatted)));
        fs.mount_or_format().unwrap();
        assert!(fs.is_mounted());
    }

    #[test]
    fn test_operations_require_mount() {
        let mut fs = MemFs::formatted();
        assert!(matches!(
            fs.file_open("/a.bin", OpenMode::Write),
            Err(FsError::NotMounted)
        ));
    }

    #[test]
    fn test_write_then_read_back() {
        let mut fs = mounted();
        fs.write_all("/a.bin", b"hello").unwrap();
        assert_eq!(fs.read_to_vec("/a.bin").unwrap(), b"hello");
        assert_eq!(fs.raw("/a.bin"), Some(&b"hello"[..]));
    }

    #[test]
    fn test_append_mode_writes_at_end() {
        let mut fs = mounted();
        fs.write_all("/log.csv", b"a\n").unwrap();
        let mut file = fs.file_open("/log.csv", OpenMode::Append).unwrap();
        fs.file_seek(&mut file, 0, SeekOrigin::Set).unwrap();
        fs.file_write(&mut file, b"b\n").unwrap();
        fs.file_close(file).unwrap();
        assert_eq!(fs.raw("/log.csv"), Some(&b"a\nb\n"[..]));
    }

    #[test]
    fn test_read_mode_requires_existing_file() {
        let mut fs = mounted();
        assert!(matches!(
            fs.file_open("/missing", OpenMode::Read),
            Err(FsError::NotFound(_))
        ));
        assert!(matches!(
            fs.file_open("/missing", OpenMode::ReadUpdate),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn test_open_requires_parent_directory() {
        let mut fs = mounted();
        assert!(matches!(
            fs.file_open("/0/0.csv", OpenMode::Write),
            Err(FsError::NotFound(p)) if p == "/0"
        ));
        fs.dir_make("/0").unwrap();
        fs.file_open("/0/0.csv", OpenMode::Write).unwrap();
    }

    #[test]
    fn test_write_only_handle_cannot_read() {
        let mut fs = mounted();
        let mut file = fs.file_open("/a", OpenMode::Write).unwrap();
        let mut buf = [0u8; 4];
        assert!(matches!(
            fs.file_read(&mut file, &mut buf),
            Err(FsError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn test_seek_tell_truncate() {
        let mut fs = mounted();
        fs.write_all("/a", b"0123456789").unwrap();
        let mut file = fs.file_open("/a", OpenMode::ReadUpdate).unwrap();
        assert_eq!(fs.file_seek(&mut file, -3, SeekOrigin::End).unwrap(), 7);
        assert_eq!(fs.file_tell(&mut file).unwrap(), 7);
        assert!(matches!(
            fs.file_seek(&mut file, -20, SeekOrigin::Cur),
            Err(FsError::InvalidSeek(-20))
        ));
        fs.file_truncate(&mut file, 4).unwrap();
        assert_eq!(fs.file_size(&mut file).unwrap(), 4);
        fs.file_close(file).unwrap();
        assert_eq!(fs.raw("/a"), Some(&b"0123"[..]));
    }

    #[test]
    fn test_read_until_multi_byte_delimiter() {
        let mut fs = mounted();
        fs.write_all("/l.csv", b"a\rb\r\nc\r\ntail").unwrap();
        let mut file = fs.file_open("/l.csv", OpenMode::Read).unwrap();
        let mut out = Vec::new();
        assert_eq!(
            fs.file_read_until(&mut file, b"\r\n", 64, &mut out).unwrap(),
            Until::Found(5)
        );
        assert_eq!(
            fs.file_read_until(&mut file, b"\r\n", 64, &mut out).unwrap(),
            Until::Found(3)
        );
        assert_eq!(
            fs.file_read_until(&mut file, b"\r\n", 64, &mut out).unwrap(),
            Until::Eof(4)
        );
        assert_eq!(out, b"a\rb\r\nc\r\ntail");
    }

    #[test]
    fn test_read_until_stops_at_max_len() {
        let mut fs = mounted();
        fs.write_all("/l.csv", b"abcdef\n").unwrap();
        let mut file = fs.file_open("/l.csv", OpenMode::Read).unwrap();
        let mut out = Vec::new();
        assert_eq!(
            fs.file_read_until(&mut file, b"\n", 3, &mut out).unwrap(),
            Until::Full(3)
        );
        assert_eq!(fs.file_tell(&mut file).unwrap(), 3);
    }

    #[test]
    fn test_dir_read_lists_direct_children_sorted() {
        let mut fs = mounted();
        fs.dir_make("/1").unwrap();
        fs.dir_make("/0").unwrap();
        fs.write_all("/0/0.csv", b"x").unwrap();
        fs.write_all("/md.bin", b"meta").unwrap();

        let root = fs.dir_read("/").unwrap();
        let names: Vec<&str> = root.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["0", "1", "md.bin"]);
        assert_eq!(root[2].size, 4);

        let sub = fs.dir_read("/0").unwrap();
        assert_eq!(sub.len(), 1);
        assert_eq!(sub[0].kind, EntryKind::File);
    }

    #[test]
    fn test_remove_non_empty_directory_rejected() {
        let mut fs = mounted();
        fs.dir_make("/0").unwrap();
        fs.write_all("/0/0.csv", b"x").unwrap();
        assert!(matches!(fs.remove("/0"), Err(FsError::DirectoryNotEmpty(_))));
        fs.remove("/0/0.csv").unwrap();
        fs.remove("/0").unwrap();
        assert!(!fs.exists("/0"));
    }

    #[test]
    fn test_rename_directory_moves_children() {
        let mut fs = mounted();
        fs.dir_make("/old").unwrap();
        fs.write_all("/old/a", b"1").unwrap();
        fs.rename("/old", "/new").unwrap();
        assert!(!fs.exists("/old/a"));
        assert_eq!(fs.raw("/new/a"), Some(&b"1"[..]));
    }

    #[test]
    fn test_injected_fault_fires_once() {
        let mut fs = mounted();
        fs.fail_next(FsOp::Write);
        assert!(matches!(
            fs.write_all("/a", b"x"),
            Err(FsError::Injected(FsOp::Write))
        ));
        assert!(fs.pending_faults().is_empty());
        fs.write_all("/a", b"x").unwrap();
    }

    #[test]
    fn test_open_fault_targets_one_path() {
        let mut fs = mounted();
        fs.fail_open("/b");
        fs.write_all("/a", b"x").unwrap();
        assert!(matches!(
            fs.write_all("/b", b"x"),
            Err(FsError::Injected(FsOp::Open))
        ));
        fs.write_all("/b", b"x").unwrap();
    }

    #[test]
    fn test_corrupt_then_format_wipes() {
        let mut fs = mounted();
        fs.write_all("/a", b"x").unwrap();
        fs.corrupt();
        assert!(matches!(fs.mount(), Err(FsError::NotFormatted)));
        fs.format().unwrap();
        fs.mount().unwrap();
        assert!(!fs.exists("/a"));
    }

    #[test]
    fn test_clone_is_snapshot() {
        let mut fs = mounted();
        fs.write_all("/a", b"before").unwrap();
        let snapshot = fs.clone();
        fs.write_all("/a", b"after").unwrap();
        assert_eq!(snapshot.raw("/a"), Some(&b"before"[..]));
    }

    #[test]
    fn test_read_in_chunks_propagates_callback_error() {
        let mut fs = mounted();
        fs.write_all("/a", b"0123456789").unwrap();
        let mut seen = 0;
        let result = fs.file_read_in_chunks::<FsError, _>("/a", 4, |chunk| {
            seen += chunk.len();
            Err(FsError::Injected(FsOp::Read))
        });
        assert!(result.is_err());
        assert_eq!(seen, 4);
    }

    #[test]
    fn test_trace_helpers_walk_tree() {
        let mut fs = mounted();
        fs.dir_make("/logs").unwrap();
        fs.dir_make("/logs/0").unwrap();
        fs.write_all("/logs/0/0.csv", b"a\r\n").unwrap();
        fs.file_trace("/logs/0/0.csv").unwrap();
        fs.dir_trace("/", true).unwrap();
        assert!(matches!(
            fs.dir_trace("/missing", false),
            Err(FsError::NotFound(_))
        ));
    }
}
