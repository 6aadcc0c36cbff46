//! Build-time asset packaging.
//!
//! `stowage` models a directory hierarchy entirely in memory ([`mem_fs`]),
//! mirrors it from and to a real filesystem ([`host_fs`]), serializes it into
//! a single portable blob and back ([`codec`]), and parses the small
//! annotation language used to request assets from source comments
//! ([`annotation`]). [`pack::Packer`] ties the pieces together.

pub mod annotation;
pub mod codec;
pub mod config;
pub mod host_fs;
pub mod mem_fs;
pub mod pack;
pub mod path;

use std::io;
use std::path::PathBuf;

pub use annotation::{
    Annotation, AnnotationError, AssetAnnotation, Block, FieldValue, PairSeparator, Parser, Syntax,
};
pub use codec::{Codec, CodecError, Registry, TarCodec};
pub use config::{ConfigError, PackConfig};
pub use host_fs::{load_from_disk, load_from_disk_and_type, write_to_disk};
pub use mem_fs::{DEFAULT_DIRECTORY_MODE, Directory, File, FileSystem};
pub use pack::{PackError, PackedAsset, Packer};
pub use path::TreePath;

pub type Result<T, E = FsError> = std::result::Result<T, E>;

/// Errors raised by the in-memory tree and the disk synchronizer.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FsError {
    /// The handle refers to a node that was deleted from its tree.
    #[error("the entry no longer exists in the tree")]
    EntryNotFound,
    /// Reading from or writing to an in-memory stream failed.
    #[error("IO Error: {0:?}")]
    Io(#[from] io::Error),
    #[error("Unable to stat \"{}\"", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("Unable to read \"{}\"", path.display())]
    Read {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("Unable to list the entries of \"{}\"", path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("Unable to write \"{}\"", path.display())]
    Write {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("Unable to create the directory \"{}\"", path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("Unable to set the permissions of \"{}\"", path.display())]
    SetPermissions {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    /// A directory was expected but a file was found.
    #[error("\"{}\" is a file", path.display())]
    PathIsFile { path: PathBuf },
    /// A file was expected but a directory was found.
    #[error("\"{}\" is a directory", path.display())]
    PathIsDirectory { path: PathBuf },
    #[error("\"{}\" is not valid UTF-8", path.display())]
    InvalidName { path: PathBuf },
}

impl FsError {
    /// Whether this error reports a file/directory kind mismatch.
    pub fn is_kind_conflict(&self) -> bool {
        matches!(
            self,
            FsError::PathIsFile { .. } | FsError::PathIsDirectory { .. }
        )
    }
}
