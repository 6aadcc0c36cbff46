//! Mirroring between an in-memory tree and the host filesystem.

use crate::mem_fs::Directory;
use crate::path::TreePath;
use crate::{FsError, Result};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, trace};

/// Load `path` into `directory`.
///
/// See [`load_from_disk_and_type`].
pub fn load_from_disk(directory: &Directory, path: impl AsRef<Path>) -> Result<()> {
    load_from_disk_and_type(directory, path).map(|_| ())
}

/// Load `path` into `directory` and report whether `path` was a directory.
///
/// When `path` is a directory every entry below it is mirrored into
/// `directory`, with the permission bits of each entry. When it is a file,
/// the file is added to `directory` under its base name.
pub fn load_from_disk_and_type(directory: &Directory, path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    let metadata = fs::metadata(path).map_err(|error| FsError::Stat {
        path: path.to_path_buf(),
        error,
    })?;

    if metadata.is_dir() {
        debug!(path = %path.display(), "Loading directory from disk");
        mirror_directory(directory, path)?;
        Ok(true)
    } else {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| FsError::InvalidName {
                path: path.to_path_buf(),
            })?;
        debug!(path = %path.display(), "Loading file from disk");
        read_file_into(directory, path, name, &metadata)?;
        Ok(false)
    }
}

fn mirror_directory(directory: &Directory, path: &Path) -> Result<()> {
    let read_dir_error = |error| FsError::ReadDirectory {
        path: path.to_path_buf(),
        error,
    };
    let mut entries = fs::read_dir(path)
        .map_err(read_dir_error)?
        .collect::<io::Result<Vec<_>>>()
        .map_err(read_dir_error)?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let entry_path = entry.path();
        let name = entry
            .file_name()
            .into_string()
            .map_err(|_| FsError::InvalidName {
                path: entry_path.clone(),
            })?;
        let metadata = fs::metadata(&entry_path).map_err(|error| FsError::Stat {
            path: entry_path.clone(),
            error,
        })?;

        if metadata.is_dir() {
            let sub_directory = directory
                .new_directory(&TreePath::segment(name))
                .ok_or(FsError::EntryNotFound)?;
            sub_directory.set_permissions(mode_of(&metadata));
            mirror_directory(&sub_directory, &entry_path)?;
        } else if metadata.is_file() {
            read_file_into(directory, &entry_path, &name, &metadata)?;
        } else {
            debug!(path = %entry_path.display(), "Skipping special file");
        }
    }

    Ok(())
}

fn read_file_into(
    directory: &Directory,
    path: &Path,
    name: &str,
    metadata: &fs::Metadata,
) -> Result<()> {
    let content = fs::read(path).map_err(|error| FsError::Read {
        path: path.to_path_buf(),
        error,
    })?;

    let file = directory
        .new_file(&TreePath::segment(name))
        .ok_or(FsError::EntryNotFound)?;
    file.set_permissions(mode_of(metadata));
    file.write(content.as_slice())?;

    trace!(path = %path.display(), len = content.len(), "Loaded file");
    Ok(())
}

/// Write `directory` and everything below it to `path`.
///
/// `path` is created, with the permission bits of `directory`, if it does
/// not exist yet. Files that already exist on disk are only replaced when
/// `overwrite` is set.
pub fn write_to_disk(directory: &Directory, path: impl AsRef<Path>, overwrite: bool) -> Result<()> {
    let path = path.as_ref();
    match fs::metadata(path) {
        Ok(metadata) if !metadata.is_dir() => {
            return Err(FsError::PathIsFile {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Creating directory");
            create_directory(path, directory.permissions()).map_err(|error| {
                FsError::CreateDirectory {
                    path: path.to_path_buf(),
                    error,
                }
            })?;
        }
        Err(error) => {
            return Err(FsError::Stat {
                path: path.to_path_buf(),
                error,
            });
        }
    }

    for sub_directory in directory.directories() {
        let target = path.join(sub_directory.name().to_string());
        write_to_disk(&sub_directory, target, overwrite)?;
    }

    for file in directory.files() {
        let target = path.join(file.name().to_string());
        match fs::metadata(&target) {
            Ok(metadata) if metadata.is_dir() => {
                return Err(FsError::PathIsDirectory { path: target });
            }
            Ok(_) if !overwrite => {
                debug!(path = %target.display(), "Keeping existing file");
                continue;
            }
            Ok(_) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => return Err(FsError::Stat { path: target, error }),
        }

        fs::write(&target, file.content()).map_err(|error| FsError::Write {
            path: target.clone(),
            error,
        })?;
        apply_mode(&target, file.permissions()).map_err(|error| FsError::SetPermissions {
            path: target.clone(),
            error,
        })?;
        trace!(path = %target.display(), "Wrote file");
    }

    Ok(())
}

#[cfg(unix)]
fn mode_of(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    metadata.permissions().mode() & 0o7777
}

// Only the read-only flag is available here.
#[cfg(not(unix))]
fn mode_of(metadata: &fs::Metadata) -> u32 {
    let base = if metadata.is_dir() { 0o555 } else { 0o444 };
    if metadata.permissions().readonly() {
        base
    } else {
        base | 0o200
    }
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_mode(path: &Path, mode: u32) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(path, permissions)
}

#[cfg(unix)]
fn create_directory(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(mode).create(path)
}

#[cfg(not(unix))]
fn create_directory(path: &Path, _mode: u32) -> io::Result<()> {
    fs::create_dir_all(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn path(raw: &str) -> TreePath {
        TreePath::of(raw)
    }

    fn sample_tree() -> Directory {
        let root = Directory::new_root();
        root.new_file(&path("a/b/test.txt"))
            .unwrap()
            .with_permissions(0o644)
            .write(&b"hello"[..])
            .unwrap();
        root.new_file(&path("a/c.txt"))
            .unwrap()
            .with_permissions(0o755)
            .write(&b"world"[..])
            .unwrap();
        root
    }

    #[test]
    fn load_a_single_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("asset.txt");
        std::fs::write(&file, "content").unwrap();

        let root = Directory::new_root();
        let is_directory = load_from_disk_and_type(&root, &file).unwrap();

        assert!(!is_directory);
        assert_eq!(root.file(&path("asset.txt")).unwrap().content(), b"content");
    }

    #[test]
    fn load_a_directory_recursively() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("nested").join("dir")).unwrap();
        std::fs::write(temp.path().join("top.txt"), "top").unwrap();
        std::fs::write(temp.path().join("nested").join("dir").join("deep.txt"), "deep").unwrap();

        let root = Directory::new_root();
        let is_directory = load_from_disk_and_type(&root, temp.path()).unwrap();

        assert!(is_directory);
        assert_eq!(root.file(&path("top.txt")).unwrap().content(), b"top");
        assert_eq!(
            root.file(&path("nested/dir/deep.txt")).unwrap().content(),
            b"deep"
        );
    }

    #[test]
    fn load_a_missing_path() {
        let temp = TempDir::new().unwrap();
        let root = Directory::new_root();

        let error = load_from_disk(&root, temp.path().join("missing")).unwrap_err();
        assert!(matches!(error, FsError::Stat { .. }), "{error:?}");
    }

    #[test]
    fn write_creates_the_target() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("out").join("assets");

        write_to_disk(&sample_tree(), &target, false).unwrap();

        assert_eq!(
            std::fs::read_to_string(target.join("a").join("b").join("test.txt")).unwrap(),
            "hello"
        );
        assert_eq!(
            std::fs::read_to_string(target.join("a").join("c.txt")).unwrap(),
            "world"
        );
    }

    #[test]
    fn overwrite_policy() {
        let temp = TempDir::new().unwrap();
        let root = Directory::new_root();
        let file = root.new_file(&path("config.txt")).unwrap();

        file.write(&b"first"[..]).unwrap();
        write_to_disk(&root, temp.path(), false).unwrap();

        file.write(&b"second"[..]).unwrap();
        write_to_disk(&root, temp.path(), false).unwrap();
        assert_eq!(
            std::fs::read_to_string(temp.path().join("config.txt")).unwrap(),
            "first"
        );

        write_to_disk(&root, temp.path(), true).unwrap();
        assert_eq!(
            std::fs::read_to_string(temp.path().join("config.txt")).unwrap(),
            "second"
        );
    }

    #[test]
    fn writing_over_a_file_is_a_kind_conflict() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("plain.txt");
        std::fs::write(&target, "not a directory").unwrap();

        let error = write_to_disk(&sample_tree(), &target, true).unwrap_err();
        assert!(matches!(error, FsError::PathIsFile { .. }), "{error:?}");
        assert!(error.is_kind_conflict());
    }

    #[test]
    fn writing_a_file_over_a_directory_is_a_kind_conflict() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("c.txt")).unwrap();

        let root = Directory::new_root();
        root.new_file(&path("c.txt")).unwrap();

        let error = write_to_disk(&root, temp.path(), true).unwrap_err();
        assert!(matches!(error, FsError::PathIsDirectory { .. }), "{error:?}");
    }

    #[cfg(unix)]
    #[test]
    fn disk_round_trip_keeps_permissions() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("mirror");

        write_to_disk(&sample_tree(), &target, false).unwrap();

        let loaded = Directory::new_root();
        assert!(load_from_disk_and_type(&loaded, &target).unwrap());

        let test_txt = loaded.file(&path("a/b/test.txt")).unwrap();
        assert_eq!(test_txt.content(), b"hello");
        assert_eq!(test_txt.permissions(), 0o644);

        let c_txt = loaded.file(&path("a/c.txt")).unwrap();
        assert_eq!(c_txt.content(), b"world");
        assert_eq!(c_txt.permissions(), 0o755);
    }
}
