//! The in-memory file tree.
//!
//! Nodes live in a slab owned by a [`FileSystem`]. A directory owns its
//! children through their inodes; the back-link to the parent is a plain
//! inode index. [`Directory`] and [`File`] are lightweight handles onto a
//! slot of that slab, tagged with the unique id of the node they were
//! created for, so that a handle outliving its node never aliases a node
//! allocated later in the same slot.

mod dir;
mod file;
mod filesystem;

pub use dir::Directory;
pub use file::File;
pub use filesystem::FileSystem;

type Inode = usize;
const ROOT_INODE: Inode = 0;
const ROOT_ID: u64 = 0;

/// Permission bits carried by the root of a freshly created tree.
pub const DEFAULT_DIRECTORY_MODE: u32 = 0o755;

#[derive(Debug)]
struct FileNode {
    inode: Inode,
    id: u64,
    parent: Inode,
    name: String,
    content: Vec<u8>,
    mode: u32,
}

#[derive(Debug)]
struct DirectoryNode {
    inode: Inode,
    id: u64,
    parent: Option<Inode>,
    name: String,
    files: Vec<Inode>,
    directories: Vec<Inode>,
    mode: u32,
}

#[derive(Debug)]
enum Node {
    File(FileNode),
    Directory(DirectoryNode),
}

impl Node {
    fn inode(&self) -> Inode {
        match self {
            Self::File(FileNode { inode, .. }) => *inode,
            Self::Directory(DirectoryNode { inode, .. }) => *inode,
        }
    }

    fn id(&self) -> u64 {
        match self {
            Self::File(FileNode { id, .. }) => *id,
            Self::Directory(DirectoryNode { id, .. }) => *id,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::File(FileNode { name, .. }) => name,
            Self::Directory(DirectoryNode { name, .. }) => name,
        }
    }

    fn parent(&self) -> Option<Inode> {
        match self {
            Self::File(FileNode { parent, .. }) => Some(*parent),
            Self::Directory(DirectoryNode { parent, .. }) => *parent,
        }
    }

    fn mode(&self) -> u32 {
        match self {
            Self::File(FileNode { mode, .. }) => *mode,
            Self::Directory(DirectoryNode { mode, .. }) => *mode,
        }
    }

    fn set_mode(&mut self, new_mode: u32) {
        match self {
            Self::File(FileNode { mode, .. }) => *mode = new_mode,
            Self::Directory(DirectoryNode { mode, .. }) => *mode = new_mode,
        }
    }
}
