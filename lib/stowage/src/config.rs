//! Packing settings, usually read from a `stowage.toml` file.

use crate::mem_fs::DEFAULT_DIRECTORY_MODE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings driving a [`Packer`](crate::Packer).
///
/// Every key is optional:
///
/// ```toml
/// codec = "tar"
/// compression-level = 6
/// root-mode = 493
/// overwrite = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PackConfig {
    /// Name of the codec used when an annotation does not pick one.
    pub codec: String,
    /// Gzip level of the built-in codec, from 0 to 9.
    pub compression_level: u32,
    /// Permission bits of the root of a freshly loaded tree.
    pub root_mode: u32,
    /// Whether extracting replaces files already present on disk.
    pub overwrite: bool,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            codec: "tar".to_string(),
            compression_level: 6,
            root_mode: DEFAULT_DIRECTORY_MODE,
            overwrite: false,
        }
    }
}

impl PackConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(ConfigError::Parse)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(ConfigError::Serialize)
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Unable to read \"{}\"", path.display())]
    Read {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("Unable to parse the configuration")]
    Parse(#[source] toml::de::Error),
    #[error("Unable to serialize the configuration")]
    Serialize(#[source] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn empty_document_uses_defaults() {
        let config = PackConfig::from_toml_str("").unwrap();

        assert_eq!(config, PackConfig::default());
        assert_eq!(config.codec, "tar");
        assert_eq!(config.root_mode, 0o755);
    }

    #[test]
    fn keys_override_defaults() {
        let config = PackConfig::from_toml_str(
            r#"
            codec = "TAR"
            compression-level = 9
            overwrite = true
            "#,
        )
        .unwrap();

        assert_eq!(
            config,
            PackConfig {
                codec: "TAR".to_string(),
                compression_level: 9,
                root_mode: 0o755,
                overwrite: true,
            }
        );
    }

    #[test]
    fn wrong_types_are_rejected() {
        let error = PackConfig::from_toml_str("overwrite = \"sure\"").unwrap_err();
        assert!(matches!(error, ConfigError::Parse(_)), "{error:?}");
    }

    #[test]
    fn load_from_a_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("stowage.toml");
        let config = PackConfig {
            root_mode: 0o700,
            ..PackConfig::default()
        };
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        assert_eq!(PackConfig::load(&path).unwrap(), config);

        let error = PackConfig::load(temp.path().join("missing.toml")).unwrap_err();
        assert!(matches!(error, ConfigError::Read { .. }), "{error:?}");
    }
}
