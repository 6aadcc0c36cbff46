use super::{Directory, FileSystem, Inode};
use crate::path::TreePath;
use crate::{FsError, Result};
use std::fmt;
use std::io::{Read, Write};

/// A handle onto a file of a [`FileSystem`].
///
/// Once the file is deleted the handle is detached: reads observe an empty
/// file and writes fail with [`FsError::EntryNotFound`].
#[derive(Clone)]
pub struct File {
    inode: Inode,
    id: u64,
    fs: FileSystem,
}

impl File {
    pub(super) fn new(inode: Inode, id: u64, fs: FileSystem) -> Self {
        Self { inode, id, fs }
    }

    /// Whether the file is still part of its tree.
    pub fn exists(&self) -> bool {
        self.fs.inner.read().get_file(self.inode, self.id).is_some()
    }

    /// The name of the file, as a single-segment path.
    pub fn name(&self) -> TreePath {
        match self.fs.inner.read().get_file(self.inode, self.id) {
            Some(node) => TreePath::segment(node.name.clone()),
            None => TreePath::empty(),
        }
    }

    pub fn absolute_path(&self) -> TreePath {
        let guard = self.fs.inner.read();
        if guard.get_file(self.inode, self.id).is_none() {
            return TreePath::empty();
        }
        guard.absolute_path(self.inode)
    }

    pub fn permissions(&self) -> u32 {
        self.fs
            .inner
            .read()
            .get_file(self.inode, self.id)
            .map(|node| node.mode)
            .unwrap_or(0)
    }

    pub fn set_permissions(&self, mode: u32) {
        if let Some(node) = self.fs.inner.write().get_file_mut(self.inode, self.id) {
            node.mode = mode;
        }
    }

    /// Set the permission bits and hand the file back.
    pub fn with_permissions(self, mode: u32) -> Self {
        self.set_permissions(mode);
        self
    }

    /// The directory holding this file.
    pub fn parent(&self) -> Option<Directory> {
        let guard = self.fs.inner.read();
        let parent = guard.get_file(self.inode, self.id)?.parent;
        Some(Directory::new(parent, guard.id_of(parent), self.fs.clone()))
    }

    /// Size of the content in bytes.
    pub fn len(&self) -> usize {
        self.fs
            .inner
            .read()
            .get_file(self.inode, self.id)
            .map(|node| node.content.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of the content.
    pub fn content(&self) -> Vec<u8> {
        self.fs
            .inner
            .read()
            .get_file(self.inode, self.id)
            .map(|node| node.content.clone())
            .unwrap_or_default()
    }

    /// Write the whole content into `writer`.
    pub fn copy_content(&self, mut writer: impl Write) -> Result<()> {
        let content = {
            let guard = self.fs.inner.read();
            let node = guard
                .get_file(self.inode, self.id)
                .ok_or(FsError::EntryNotFound)?;
            node.content.clone()
        };
        writer.write_all(&content)?;
        Ok(())
    }

    /// Replace the content with everything `reader` yields.
    pub fn write(&self, reader: impl Read) -> Result<()> {
        self.write_flagged(reader, false)
    }

    /// Replace the content with everything `reader` yields, or append it
    /// when `append` is set.
    ///
    /// The reader is drained before the tree is locked.
    pub fn write_flagged(&self, mut reader: impl Read, append: bool) -> Result<()> {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;

        let mut guard = self.fs.inner.write();
        let node = guard
            .get_file_mut(self.inode, self.id)
            .ok_or(FsError::EntryNotFound)?;
        if append {
            node.content.extend_from_slice(&buffer);
        } else {
            node.content = buffer;
        }
        Ok(())
    }

    /// Remove the file from its directory.
    pub fn delete(&self) {
        let mut guard = self.fs.inner.write();
        if let Some(parent) = guard.get_file(self.inode, self.id).map(|node| node.parent) {
            guard.detach(parent, self.inode);
        }
    }
}

impl PartialEq for File {
    fn eq(&self, other: &Self) -> bool {
        self.inode == other.inode && self.id == other.id && self.fs.same_tree(&other.fs)
    }
}

impl Eq for File {}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("inode", &self.inode)
            .field("path", &self.absolute_path().to_slash_string())
            .field("mode", &format_args!("{:o}", self.permissions()))
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn path(raw: &str) -> TreePath {
        TreePath::of(raw)
    }

    #[test]
    fn write_and_read_back() {
        let root = Directory::new_root();
        root.new_file(&path("test.txt"))
            .unwrap()
            .write(Cursor::new("test"))
            .unwrap();

        assert_eq!(root.files().len(), 1);
        let file = root.file(&path("test.txt")).unwrap();
        let mut buffer = Vec::new();
        file.copy_content(&mut buffer).unwrap();
        assert_eq!(buffer, b"test");
        assert_eq!(file.len(), 4);
    }

    #[test]
    fn new_file_twice_returns_the_same_node() {
        let root = Directory::new_root();
        let first = root.new_file(&path("/usr/homeport/home/test.go")).unwrap();
        let second = root.new_file(&path("/usr/homeport/home/test.go")).unwrap();

        assert_eq!(first, second);
        assert_eq!(root.directories().len(), 1);
        let home = root.directory(&path("/usr/homeport/home")).unwrap();
        assert_eq!(home.files().len(), 1);
    }

    #[test]
    fn absolute_path_of_nested_file() {
        let root = Directory::new_root();
        let file = root
            .new_directory(&path("usr"))
            .unwrap()
            .new_directory(&path("homeport"))
            .unwrap()
            .new_directory(&path("home"))
            .unwrap()
            .new_file(&path("test.go"))
            .unwrap();

        assert_eq!(file.absolute_path().to_slash_string(), "/usr/homeport/home/test.go");
    }

    #[test]
    fn append_and_replace() {
        let root = Directory::new_root();
        let file = root.new_file(&path("/usr/homeport/home/test.go")).unwrap();

        file.write(Cursor::new("te")).unwrap();
        file.write_flagged(Cursor::new("st"), true).unwrap();
        assert_eq!(file.content(), b"test");

        file.write_flagged(Cursor::new("new"), false).unwrap();
        assert_eq!(file.content(), b"new");
    }

    #[test]
    fn delete_by_path_and_from_the_file() {
        let root = Directory::new_root();
        let test_go = path("/usr/homeport/home/test.go");

        root.new_file(&test_go);
        let home = root.directory(&path("/usr/homeport/home")).unwrap();
        assert_eq!(home.files().len(), 1);
        root.delete_file(&test_go);
        assert_eq!(home.files().len(), 0);
        assert_eq!(root.file(&test_go), None);

        let file = root.new_file(&test_go).unwrap();
        file.delete();
        assert_eq!(root.file(&test_go), None);
        assert!(!file.exists());
    }

    #[test]
    fn detached_handles_refuse_writes() {
        let root = Directory::new_root();
        let file = root.new_file(&path("a.txt")).unwrap();
        file.write(Cursor::new("content")).unwrap();
        file.delete();

        assert!(matches!(
            file.write(Cursor::new("more")),
            Err(FsError::EntryNotFound)
        ));
        assert!(file.content().is_empty());
        assert_eq!(file.parent(), None);

        // A new node reusing the slot is not reachable through the old handle.
        let other = root.new_file(&path("b.txt")).unwrap();
        other.write(Cursor::new("other")).unwrap();
        assert!(file.content().is_empty());
        assert_ne!(file, other);
    }

    #[test]
    fn parent_of_a_file() {
        let root = Directory::new_root();
        let file = root.new_file(&path("a/b.txt")).unwrap();

        assert_eq!(file.parent(), root.directory(&path("a")));
    }
}
