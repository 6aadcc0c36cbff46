//! The load, compress, decompress and extract pipeline.

use crate::annotation::AssetAnnotation;
use crate::codec::{Codec, CodecError, Registry};
use crate::config::PackConfig;
use crate::host_fs::{load_from_disk_and_type, write_to_disk};
use crate::mem_fs::{Directory, FileSystem};
use crate::FsError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PackError {
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("No codec registered as \"{name}\"")]
    UnknownCodec { name: String },
}

/// A compressed asset together with what is needed to restore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedAsset {
    /// Registry name of the codec that produced `data`.
    pub codec: String,
    /// Whether the source was a directory rather than a single file.
    pub is_directory: bool,
    pub data: Vec<u8>,
}

/// Packs files and directories from disk into blobs and restores them.
#[derive(Debug, Clone)]
pub struct Packer {
    registry: Registry,
    config: PackConfig,
}

impl Default for Packer {
    fn default() -> Self {
        Self::from_config(PackConfig::default())
    }
}

impl Packer {
    pub fn new(registry: Registry, config: PackConfig) -> Self {
        Self { registry, config }
    }

    /// A packer using the built-in codecs configured from `config`.
    pub fn from_config(config: PackConfig) -> Self {
        Self::new(Registry::from_config(&config), config)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &PackConfig {
        &self.config
    }

    /// Pack `path` with the configured codec.
    pub fn pack(&self, path: impl AsRef<Path>) -> Result<PackedAsset, PackError> {
        self.pack_with(path, &self.config.codec)
    }

    /// Pack `path` with the codec registered as `codec_name`.
    pub fn pack_with(
        &self,
        path: impl AsRef<Path>,
        codec_name: &str,
    ) -> Result<PackedAsset, PackError> {
        let path = path.as_ref();
        let codec = self.codec(codec_name)?;

        let root = FileSystem::with_root_permissions(self.config.root_mode).root();
        let is_directory = load_from_disk_and_type(&root, path)?;

        let mut data = Vec::new();
        codec.compress(&root, &mut data)?;

        debug!(
            path = %path.display(),
            codec = codec_name,
            is_directory,
            len = data.len(),
            "Packed asset"
        );

        Ok(PackedAsset {
            codec: codec_name.trim().to_lowercase(),
            is_directory,
            data,
        })
    }

    /// Pack the asset an annotation asks for.
    ///
    /// Relative asset paths are resolved against `base_dir`. An empty
    /// compressor selects the configured codec.
    pub fn pack_annotated(
        &self,
        annotation: &AssetAnnotation,
        base_dir: impl AsRef<Path>,
    ) -> Result<PackedAsset, PackError> {
        let path = resolve_asset_path(annotation, base_dir.as_ref());
        let codec_name = if annotation.compressor.trim().is_empty() {
            self.config.codec.as_str()
        } else {
            annotation.compressor.as_str()
        };

        self.pack_with(path, codec_name)
    }

    /// Rebuild the tree held by `asset`.
    pub fn unpack(&self, asset: &PackedAsset) -> Result<Directory, PackError> {
        let codec = self.codec(&asset.codec)?;
        let root = codec.decompress(&mut asset.data.as_slice())?;
        debug!(codec = %asset.codec, len = asset.data.len(), "Unpacked asset");
        Ok(root)
    }

    /// Rebuild the tree held by `asset` and write it below `target`.
    ///
    /// Existing files are replaced only when the configuration allows it.
    pub fn extract(&self, asset: &PackedAsset, target: impl AsRef<Path>) -> Result<(), PackError> {
        let target = target.as_ref();
        let root = self.unpack(asset)?;
        write_to_disk(&root, target, self.config.overwrite)?;
        debug!(target = %target.display(), "Extracted asset");
        Ok(())
    }

    fn codec(&self, name: &str) -> Result<Arc<dyn Codec>, PackError> {
        self.registry
            .find(name)
            .ok_or_else(|| PackError::UnknownCodec {
                name: name.to_string(),
            })
    }
}

fn resolve_asset_path(annotation: &AssetAnnotation, base_dir: &Path) -> PathBuf {
    let asset = Path::new(annotation.asset.trim());
    if annotation.absolute || asset.is_absolute() {
        asset.to_path_buf()
    } else {
        base_dir.join(asset)
    }
}
