//! This module contains the [`FileSystem`] type itself.

use super::*;
use crate::path::TreePath;
use parking_lot::RwLock;
use slab::Slab;
use std::fmt;
use std::sync::Arc;

/// An in-memory file tree.
///
/// This `FileSystem` type can be cloned, it's a light copy of the
/// `FileSystemInner` (which is behind a `Arc` + `RwLock`). Every handle
/// operation takes the lock once, so concurrent readers never block each
/// other and mutations of the tree are serialized.
#[derive(Clone, Default)]
pub struct FileSystem {
    pub(super) inner: Arc<RwLock<FileSystemInner>>,
}

impl FileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tree whose root carries the given permission bits.
    pub fn with_root_permissions(mode: u32) -> Self {
        let fs = Self::default();
        fs.root().set_permissions(mode);
        fs
    }

    pub(super) fn from_inner(inner: FileSystemInner) -> Self {
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    /// The root directory of this tree.
    pub fn root(&self) -> Directory {
        Directory::new(ROOT_INODE, ROOT_ID, self.clone())
    }

    /// Number of live nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.inner.read().storage.len()
    }

    pub(super) fn same_tree(&self, other: &FileSystem) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for FileSystem {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fs: &FileSystemInner = &self.inner.read();

        fs.fmt(formatter)
    }
}

/// The core of the file tree. It contains a collection of `Node`s,
/// indexed by their respective `Inode` in a slab.
pub(super) struct FileSystemInner {
    pub(super) storage: Slab<Node>,
    next_id: u64,
}

impl FileSystemInner {
    /// Get a node if the slot still holds the node identified by `id`.
    pub(super) fn get(&self, inode: Inode, id: u64) -> Option<&Node> {
        self.storage.get(inode).filter(|node| node.id() == id)
    }

    pub(super) fn get_mut(&mut self, inode: Inode, id: u64) -> Option<&mut Node> {
        self.storage.get_mut(inode).filter(|node| node.id() == id)
    }

    pub(super) fn get_directory(&self, inode: Inode, id: u64) -> Option<&DirectoryNode> {
        match self.get(inode, id) {
            Some(Node::Directory(node)) => Some(node),
            _ => None,
        }
    }

    pub(super) fn get_file(&self, inode: Inode, id: u64) -> Option<&FileNode> {
        match self.get(inode, id) {
            Some(Node::File(node)) => Some(node),
            _ => None,
        }
    }

    pub(super) fn get_file_mut(&mut self, inode: Inode, id: u64) -> Option<&mut FileNode> {
        match self.get_mut(inode, id) {
            Some(Node::File(node)) => Some(node),
            _ => None,
        }
    }

    /// The id of the node currently living at `inode`.
    ///
    /// Only meaningful for inodes just obtained from a live directory.
    pub(super) fn id_of(&self, inode: Inode) -> u64 {
        self.storage.get(inode).map(Node::id).unwrap_or(u64::MAX)
    }

    fn directory_node(&self, inode: Inode) -> Option<&DirectoryNode> {
        match self.storage.get(inode) {
            Some(Node::Directory(node)) => Some(node),
            _ => None,
        }
    }

    fn directory_node_mut(&mut self, inode: Inode) -> Option<&mut DirectoryNode> {
        match self.storage.get_mut(inode) {
            Some(Node::Directory(node)) => Some(node),
            _ => None,
        }
    }

    /// Find the sub-directory `name` of the directory `inode`.
    pub(super) fn child_directory(&self, inode: Inode, name: &str) -> Option<Inode> {
        self.directory_node(inode)?
            .directories
            .iter()
            .copied()
            .find(|child| self.storage.get(*child).map(Node::name) == Some(name))
    }

    /// Find the file `name` of the directory `inode`.
    pub(super) fn child_file(&self, inode: Inode, name: &str) -> Option<Inode> {
        self.directory_node(inode)?
            .files
            .iter()
            .copied()
            .find(|child| self.storage.get(*child).map(Node::name) == Some(name))
    }

    /// Resolve a directory relative to the directory `inode`.
    pub(super) fn resolve_directory(&self, inode: Inode, path: &TreePath) -> Option<Inode> {
        if !path.is_valid() {
            return None;
        }

        path.segments()
            .iter()
            .try_fold(inode, |current, name| self.child_directory(current, name))
    }

    /// Resolve a file relative to the directory `inode`.
    pub(super) fn resolve_file(&self, inode: Inode, path: &TreePath) -> Option<Inode> {
        let (parent, name) = self.resolve_parent(inode, path)?;
        self.child_file(parent, &name)
    }

    /// Split `path` into the directory holding its last segment (resolved
    /// relative to `inode`) and that last segment.
    fn resolve_parent(&self, inode: Inode, path: &TreePath) -> Option<(Inode, String)> {
        if !path.is_valid() {
            return None;
        }

        let mut parent_path = path.clone();
        let name = parent_path.drop_last();
        let parent = if parent_path.is_valid() {
            self.resolve_directory(inode, &parent_path)?
        } else {
            inode
        };

        Some((parent, name.first()?.to_owned()))
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Create (or get) the directory at `path` relative to the directory
    /// `inode`, creating every missing intermediate directory.
    pub(super) fn create_directory(&mut self, inode: Inode, path: &TreePath) -> Option<Inode> {
        if !path.is_valid() {
            return None;
        }
        self.directory_node(inode)?;

        let mut current = inode;
        for name in path.segments() {
            current = match self.child_directory(current, name) {
                Some(child) => child,
                None => self.insert_directory(current, name),
            };
        }

        Some(current)
    }

    /// Create (or get) the file at `path` relative to the directory `inode`.
    pub(super) fn create_file(&mut self, inode: Inode, path: &TreePath) -> Option<Inode> {
        if !path.is_valid() {
            return None;
        }

        let mut parent_path = path.clone();
        let name = parent_path.drop_last();
        let parent = if parent_path.is_valid() {
            self.create_directory(inode, &parent_path)?
        } else {
            self.directory_node(inode)?;
            inode
        };
        let name = name.first()?;

        Some(match self.child_file(parent, name) {
            Some(existing) => existing,
            None => self.insert_file(parent, name),
        })
    }

    /// Insert a new directory under `parent`, inheriting its permission bits.
    ///
    /// `parent` must be a live directory.
    fn insert_directory(&mut self, parent: Inode, name: &str) -> Inode {
        let mode = self.storage.get(parent).map(Node::mode).unwrap_or(0);
        let id = self.next_id();
        let entry = self.storage.vacant_entry();
        let inode = entry.key();
        entry.insert(Node::Directory(DirectoryNode {
            inode,
            id,
            parent: Some(parent),
            name: name.to_owned(),
            files: Vec::new(),
            directories: Vec::new(),
            mode,
        }));

        if let Some(node) = self.directory_node_mut(parent) {
            node.directories.push(inode);
        }

        inode
    }

    /// Insert a new empty file under `parent`, inheriting its permission bits.
    ///
    /// `parent` must be a live directory.
    fn insert_file(&mut self, parent: Inode, name: &str) -> Inode {
        let mode = self.storage.get(parent).map(Node::mode).unwrap_or(0);
        let id = self.next_id();
        let entry = self.storage.vacant_entry();
        let inode = entry.key();
        entry.insert(Node::File(FileNode {
            inode,
            id,
            parent,
            name: name.to_owned(),
            content: Vec::new(),
            mode,
        }));

        if let Some(node) = self.directory_node_mut(parent) {
            node.files.push(inode);
        }

        inode
    }

    /// Remove the file at `path` relative to the directory `inode`, if any.
    pub(super) fn remove_file(&mut self, inode: Inode, path: &TreePath) {
        if let Some((parent, name)) = self.resolve_parent(inode, path) {
            if let Some(child) = self.child_file(parent, &name) {
                self.detach(parent, child);
            }
        }
    }

    /// Remove the directory at `path` relative to the directory `inode`,
    /// with everything below it.
    pub(super) fn remove_directory(&mut self, inode: Inode, path: &TreePath) {
        if let Some((parent, name)) = self.resolve_parent(inode, path) {
            if let Some(child) = self.child_directory(parent, &name) {
                self.detach(parent, child);
            }
        }
    }

    /// Unlink `child` from the directory `parent` and free its subtree.
    pub(super) fn detach(&mut self, parent: Inode, child: Inode) {
        if let Some(node) = self.directory_node_mut(parent) {
            node.files.retain(|inode| *inode != child);
            node.directories.retain(|inode| *inode != child);
        }
        self.free(child);
    }

    fn free(&mut self, inode: Inode) {
        if let Some(Node::Directory(node)) = self.storage.try_remove(inode) {
            for child in node.files.into_iter().chain(node.directories) {
                self.free(child);
            }
        }
    }

    /// The names of every ancestor of `inode`, from the top of the tree
    /// down to the node itself.
    pub(super) fn absolute_path(&self, inode: Inode) -> TreePath {
        let mut names = Vec::new();
        let mut current = self.storage.get(inode);
        while let Some(node) = current {
            names.push(node.name());
            current = node.parent().and_then(|parent| self.storage.get(parent));
        }

        names
            .into_iter()
            .rev()
            .fold(TreePath::empty(), |path, name| {
                path.concat(&TreePath::segment(name))
            })
    }

    /// Collect every file below the directory `inode`: its own files first,
    /// then the files of each sub-directory, recursively.
    pub(super) fn collect_files(&self, inode: Inode, out: &mut Vec<(Inode, u64)>) {
        if let Some(node) = self.directory_node(inode) {
            out.extend(node.files.iter().map(|file| (*file, self.id_of(*file))));
            for directory in &node.directories {
                self.collect_files(*directory, out);
            }
        }
    }

    /// Collect the directory `inode` and every directory below it, parents
    /// before their children.
    pub(super) fn collect_directories(&self, inode: Inode, out: &mut Vec<(Inode, u64)>) {
        if let Some(node) = self.directory_node(inode) {
            out.push((inode, node.id));
            for directory in &node.directories {
                self.collect_directories(*directory, out);
            }
        }
    }

    /// Deep-copy the children of `source` (a directory of `self`) into the
    /// directory `target` of `other`.
    pub(super) fn copy_children(&self, source: Inode, other: &mut FileSystemInner, target: Inode) {
        let Some(node) = self.directory_node(source) else {
            return;
        };

        for file in &node.files {
            if let Some(Node::File(file)) = self.storage.get(*file) {
                let copy = other.insert_file(target, &file.name);
                if let Some(Node::File(copy)) = other.storage.get_mut(copy) {
                    copy.content = file.content.clone();
                    copy.mode = file.mode;
                }
            }
        }

        for directory in &node.directories {
            if let Some(Node::Directory(directory)) = self.storage.get(*directory) {
                let copy = other.insert_directory(target, &directory.name);
                if let Some(node) = other.storage.get_mut(copy) {
                    node.set_mode(directory.mode);
                }
                self.copy_children(directory.inode, other, copy);
            }
        }
    }
}

impl fmt::Debug for FileSystemInner {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            formatter,
            "\n{inode:<8}    {ty:<4}    {mode:<6}    name",
            inode = "inode",
            ty = "type",
            mode = "mode",
        )?;

        fn debug(
            nodes: Vec<&Node>,
            slf: &FileSystemInner,
            formatter: &mut fmt::Formatter<'_>,
            indentation: usize,
        ) -> fmt::Result {
            for node in nodes {
                writeln!(
                    formatter,
                    "{inode:<8}    {ty:<4}    {mode:<6o}   {indentation_symbol:indentation_width$}{name}",
                    inode = node.inode(),
                    ty = match node {
                        Node::File { .. } => "file",
                        Node::Directory { .. } => "dir",
                    },
                    mode = node.mode(),
                    name = node.name(),
                    indentation_symbol = " ",
                    indentation_width = indentation * 2 + 1,
                )?;

                if let Node::Directory(DirectoryNode {
                    files, directories, ..
                }) = node
                {
                    debug(
                        files
                            .iter()
                            .chain(directories)
                            .filter_map(|inode| slf.storage.get(*inode))
                            .collect(),
                        slf,
                        formatter,
                        indentation + 1,
                    )?;
                }
            }

            Ok(())
        }

        debug(
            self.storage.get(ROOT_INODE).into_iter().collect(),
            self,
            formatter,
            0,
        )
    }
}

impl Default for FileSystemInner {
    fn default() -> Self {
        let mut slab = Slab::new();
        slab.insert(Node::Directory(DirectoryNode {
            inode: ROOT_INODE,
            id: ROOT_ID,
            parent: None,
            name: String::new(),
            files: Vec::new(),
            directories: Vec::new(),
            mode: DEFAULT_DIRECTORY_MODE,
        }));

        Self {
            storage: slab,
            next_id: ROOT_ID,
        }
    }
}
