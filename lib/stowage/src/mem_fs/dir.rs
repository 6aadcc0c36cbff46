use super::filesystem::FileSystemInner;
use super::{File, FileSystem, Inode, Node, ROOT_INODE};
use crate::path::TreePath;
use std::fmt;

/// A handle onto a directory of a [`FileSystem`].
///
/// Handles are cheap to clone; two handles compare equal when they point
/// at the same node of the same tree. Once the directory is deleted the
/// handle is detached: it reports an empty name, resolves nothing and
/// ignores mutations.
#[derive(Clone)]
pub struct Directory {
    inode: Inode,
    id: u64,
    fs: FileSystem,
}

impl Directory {
    pub(super) fn new(inode: Inode, id: u64, fs: FileSystem) -> Self {
        Self { inode, id, fs }
    }

    /// The root of a brand new, empty tree.
    pub fn new_root() -> Self {
        FileSystem::new().root()
    }

    /// The tree this directory belongs to.
    pub fn file_system(&self) -> &FileSystem {
        &self.fs
    }

    /// Whether the directory is still part of its tree.
    pub fn exists(&self) -> bool {
        self.fs.inner.read().get_directory(self.inode, self.id).is_some()
    }

    fn directory_handle(&self, inode: Inode, guard: &FileSystemInner) -> Directory {
        Directory::new(inode, guard.id_of(inode), self.fs.clone())
    }

    fn file_handle(&self, inode: Inode, guard: &FileSystemInner) -> File {
        File::new(inode, guard.id_of(inode), self.fs.clone())
    }

    /// The name of the directory, as a single-segment path.
    pub fn name(&self) -> TreePath {
        match self.fs.inner.read().get_directory(self.inode, self.id) {
            Some(node) => TreePath::segment(node.name.clone()),
            None => TreePath::empty(),
        }
    }

    /// The names of every ancestor, from the top of the tree, followed by
    /// the name of this directory.
    pub fn absolute_path(&self) -> TreePath {
        let guard = self.fs.inner.read();
        if guard.get_directory(self.inode, self.id).is_none() {
            return TreePath::empty();
        }
        guard.absolute_path(self.inode)
    }

    pub fn permissions(&self) -> u32 {
        self.fs
            .inner
            .read()
            .get_directory(self.inode, self.id)
            .map(|node| node.mode)
            .unwrap_or(0)
    }

    pub fn set_permissions(&self, mode: u32) {
        let mut guard = self.fs.inner.write();
        if let Some(node) = guard.get_mut(self.inode, self.id) {
            if matches!(node, Node::Directory(_)) {
                node.set_mode(mode);
            }
        }
    }

    /// Set the permission bits and hand the directory back.
    pub fn with_permissions(self, mode: u32) -> Self {
        self.set_permissions(mode);
        self
    }

    /// The directory holding this one, `None` for the root of a tree.
    pub fn parent(&self) -> Option<Directory> {
        let guard = self.fs.inner.read();
        let parent = guard.get_directory(self.inode, self.id)?.parent?;
        Some(self.directory_handle(parent, &guard))
    }

    /// Whether this directory is the top of its tree.
    pub fn is_root(&self) -> bool {
        self.inode == ROOT_INODE && self.exists()
    }

    /// The files directly inside this directory, in creation order.
    pub fn files(&self) -> Vec<File> {
        let guard = self.fs.inner.read();
        match guard.get_directory(self.inode, self.id) {
            Some(node) => node
                .files
                .iter()
                .map(|inode| self.file_handle(*inode, &guard))
                .collect(),
            None => Vec::new(),
        }
    }

    /// The sub-directories directly inside this directory, in creation order.
    pub fn directories(&self) -> Vec<Directory> {
        let guard = self.fs.inner.read();
        match guard.get_directory(self.inode, self.id) {
            Some(node) => node
                .directories
                .iter()
                .map(|inode| self.directory_handle(*inode, &guard))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Look up the file at `path`, relative to this directory.
    pub fn file(&self, path: &TreePath) -> Option<File> {
        let guard = self.fs.inner.read();
        guard.get_directory(self.inode, self.id)?;
        let inode = guard.resolve_file(self.inode, path)?;
        Some(self.file_handle(inode, &guard))
    }

    /// Look up the directory at `path`, relative to this directory.
    pub fn directory(&self, path: &TreePath) -> Option<Directory> {
        let guard = self.fs.inner.read();
        guard.get_directory(self.inode, self.id)?;
        let inode = guard.resolve_directory(self.inode, path)?;
        Some(self.directory_handle(inode, &guard))
    }

    /// Get the file at `path`, creating it and any missing parent
    /// directory if needed.
    ///
    /// New nodes start with the permission bits of the directory they are
    /// created in. Returns `None` for an invalid path.
    pub fn new_file(&self, path: &TreePath) -> Option<File> {
        let mut guard = self.fs.inner.write();
        guard.get_directory(self.inode, self.id)?;
        let inode = guard.create_file(self.inode, path)?;
        Some(self.file_handle(inode, &guard))
    }

    /// Get the directory at `path`, creating it and any missing parent
    /// directory if needed.
    pub fn new_directory(&self, path: &TreePath) -> Option<Directory> {
        let mut guard = self.fs.inner.write();
        guard.get_directory(self.inode, self.id)?;
        let inode = guard.create_directory(self.inode, path)?;
        Some(self.directory_handle(inode, &guard))
    }

    /// Delete the file at `path`. Does nothing when there is none.
    pub fn delete_file(&self, path: &TreePath) {
        let mut guard = self.fs.inner.write();
        if guard.get_directory(self.inode, self.id).is_some() {
            guard.remove_file(self.inode, path);
        }
    }

    /// Delete the directory at `path` and everything below it. Does nothing
    /// when there is none.
    pub fn delete_directory(&self, path: &TreePath) {
        let mut guard = self.fs.inner.write();
        if guard.get_directory(self.inode, self.id).is_some() {
            guard.remove_directory(self.inode, path);
        }
    }

    /// Deep-copy this directory into a new, independent tree whose root is
    /// the copy.
    pub fn as_root(&self) -> Directory {
        let guard = self.fs.inner.read();
        let mut copy = FileSystemInner::default();
        if let Some(node) = guard.get_directory(self.inode, self.id) {
            let mode = node.mode;
            if let Some(root) = copy.storage.get_mut(ROOT_INODE) {
                root.set_mode(mode);
            }
            guard.copy_children(self.inode, &mut copy, ROOT_INODE);
        }
        drop(guard);

        FileSystem::from_inner(copy).root()
    }

    /// Visit every file below this directory: the files of a directory
    /// first, then those of each sub-directory, recursively.
    ///
    /// The walk stops at the first error returned by `visit`, which is
    /// handed back to the caller. The tree is not locked while `visit`
    /// runs.
    pub fn walk_files<E>(&self, mut visit: impl FnMut(&File) -> Result<(), E>) -> Result<(), E> {
        let mut files = Vec::new();
        {
            let guard = self.fs.inner.read();
            if guard.get_directory(self.inode, self.id).is_some() {
                guard.collect_files(self.inode, &mut files);
            }
        }

        for (inode, id) in files {
            visit(&File::new(inode, id, self.fs.clone()))?;
        }
        Ok(())
    }

    /// Visit this directory and every directory below it, parents before
    /// their children. Stops at the first error returned by `visit`.
    pub fn walk_directories<E>(
        &self,
        mut visit: impl FnMut(&Directory) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut directories = Vec::new();
        {
            let guard = self.fs.inner.read();
            if guard.get_directory(self.inode, self.id).is_some() {
                guard.collect_directories(self.inode, &mut directories);
            }
        }

        for (inode, id) in directories {
            visit(&Directory::new(inode, id, self.fs.clone()))?;
        }
        Ok(())
    }
}

impl PartialEq for Directory {
    fn eq(&self, other: &Self) -> bool {
        self.inode == other.inode && self.id == other.id && self.fs.same_tree(&other.fs)
    }
}

impl Eq for Directory {}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory")
            .field("inode", &self.inode)
            .field("path", &self.absolute_path().to_slash_string())
            .field("mode", &format_args!("{:o}", self.permissions()))
            .finish()
    }
}
