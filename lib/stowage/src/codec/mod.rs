//! Archive codecs turning a tree into a single byte stream and back.

mod tar_gz;

pub use self::tar_gz::TarCodec;

use crate::FsError;
use crate::config::PackConfig;
use crate::mem_fs::Directory;
use std::collections::HashMap;
use std::fmt::Debug;
use std::io::{self, Read, Write};
use std::sync::Arc;

/// A format able to serialize a [`Directory`] into bytes and to rebuild it.
///
/// Codecs are stateless: a blob written by `compress` can be read back by
/// `decompress` of the same codec at any later time. Only files are
/// addressable in an archive, so directories without any file below them
/// do not survive a round trip.
pub trait Codec: Debug + Send + Sync {
    /// The name the codec is usually registered under.
    fn name(&self) -> &str;

    /// Serialize every file below `directory` into `output`.
    fn compress(&self, directory: &Directory, output: &mut dyn Write) -> Result<(), CodecError>;

    /// Rebuild a tree from a stream produced by [`Codec::compress`].
    fn decompress(&self, input: &mut dyn Read) -> Result<Directory, CodecError>;
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CodecError {
    #[error("Unable to read \"{path}\" from the tree")]
    ReadEntry {
        path: String,
        #[source]
        error: FsError,
    },
    #[error("Unable to write the archive entry for \"{path}\"")]
    WriteEntry {
        path: String,
        #[source]
        error: io::Error,
    },
    #[error("Unable to finish the archive stream")]
    Finish(#[source] io::Error),
    #[error("Unable to open the archive stream")]
    Open(#[source] io::Error),
    #[error("Malformed archive entry")]
    MalformedEntry(#[source] io::Error),
    #[error("Unsupported archive entry \"{path}\" ({kind})")]
    UnsupportedEntry { path: String, kind: String },
    #[error("Unable to populate \"{path}\"")]
    Populate {
        path: String,
        #[source]
        error: FsError,
    },
}

/// Normalize a codec name for lookups: trimmed and lower-cased.
fn normalize_codec_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A set of codecs addressed by case-insensitive names.
///
/// The registry is a plain value handed to whatever needs codecs; there is
/// no process-wide instance.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in codecs with their default settings.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.put("tar", TarCodec::default());
        registry
    }

    /// A registry holding the built-in codecs configured from `config`.
    pub fn from_config(config: &PackConfig) -> Self {
        let mut registry = Self::new();
        registry.put(
            "tar",
            TarCodec::with_compression_level(config.compression_level),
        );
        registry
    }

    /// Register `codec` under `name`, replacing any codec already
    /// registered under that name.
    pub fn put(&mut self, name: impl AsRef<str>, codec: impl Codec + 'static) -> &mut Self {
        self.put_arc(name, Arc::new(codec))
    }

    pub fn put_arc(&mut self, name: impl AsRef<str>, codec: Arc<dyn Codec>) -> &mut Self {
        self.codecs
            .insert(normalize_codec_name(name.as_ref()), codec);
        self
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn Codec>> {
        self.codecs.get(&normalize_codec_name(name)).cloned()
    }

    /// The registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.codecs.keys().cloned().collect();
        names.sort();
        names
    }
}
