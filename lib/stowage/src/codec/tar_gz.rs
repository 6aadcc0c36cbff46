use super::{Codec, CodecError};
use crate::mem_fs::Directory;
use crate::path::TreePath;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};
use tar::{Archive, Builder, EntryType, Header};
use tracing::{debug, trace};

/// Tape archive framing wrapped in a gzip stream.
///
/// Each file becomes one regular-file entry named after its absolute path
/// with `/` separators. The leading root separator is left out of the
/// member name and restored on decoding, since the root of the tree is the
/// only possible anchor.
#[derive(Debug, Clone)]
pub struct TarCodec {
    level: Compression,
}

impl Default for TarCodec {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl TarCodec {
    /// A codec compressing at `level`, from 0 (store) to 9 (best).
    pub fn with_compression_level(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }

    pub fn compression_level(&self) -> u32 {
        self.level.level()
    }
}

impl Codec for TarCodec {
    fn name(&self) -> &str {
        "tar"
    }

    fn compress(&self, directory: &Directory, output: &mut dyn Write) -> Result<(), CodecError> {
        let mut builder = Builder::new(GzEncoder::new(output, self.level));
        let mut entries = 0usize;

        directory.walk_files(|file| -> Result<(), CodecError> {
            let path = file.absolute_path().to_slash_string();
            let mut content = Vec::new();
            file.copy_content(&mut content)
                .map_err(|error| CodecError::ReadEntry {
                    path: path.clone(),
                    error,
                })?;

            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Regular);
            header.set_mode(file.permissions());
            header.set_size(content.len() as u64);
            header.set_mtime(0);

            builder
                .append_data(&mut header, path.trim_start_matches('/'), content.as_slice())
                .map_err(|error| CodecError::WriteEntry {
                    path: path.clone(),
                    error,
                })?;

            trace!(path = %path, len = content.len(), "Archived file");
            entries += 1;
            Ok(())
        })?;

        let encoder = builder.into_inner().map_err(CodecError::Finish)?;
        encoder.finish().map_err(CodecError::Finish)?;

        debug!(entries, "Compressed tree");
        Ok(())
    }

    fn decompress(&self, input: &mut dyn Read) -> Result<Directory, CodecError> {
        let root = Directory::new_root();
        let mut archive = Archive::new(GzDecoder::new(input));
        let mut entries = 0usize;

        for entry in archive.entries().map_err(CodecError::Open)? {
            let mut entry = entry.map_err(CodecError::MalformedEntry)?;
            let path = entry
                .path()
                .map_err(CodecError::MalformedEntry)?
                .to_string_lossy()
                .replace('\\', "/");
            let mode = entry.header().mode().map_err(CodecError::MalformedEntry)?;
            let kind = entry.header().entry_type();
            let tree_path = TreePath::of(&path);

            if kind.is_file() {
                let file = root
                    .new_file(&tree_path)
                    .ok_or_else(|| CodecError::UnsupportedEntry {
                        path: path.clone(),
                        kind: "unnamed file".to_string(),
                    })?;
                file.set_permissions(mode);
                file.write(&mut entry)
                    .map_err(|error| CodecError::Populate {
                        path: path.clone(),
                        error,
                    })?;
                trace!(path = %path, len = file.len(), "Extracted file");
                entries += 1;
            } else if kind.is_dir() {
                if let Some(directory) = root.new_directory(&tree_path) {
                    directory.set_permissions(mode);
                }
            } else {
                return Err(CodecError::UnsupportedEntry {
                    path,
                    kind: format!("{kind:?}"),
                });
            }
        }

        debug!(entries, "Decompressed tree");
        Ok(root)
    }
}
