//! File system utils.

use std::{io::Write, path::Path};

use anyhow::Context;

pub struct FsHandler;

impl FsHandler {
    pub fn set_writable(path: &Path) -> anyhow::Result<()> {
        let metadata = std::fs::metadata(path).context("Failed to get metadata for file")?;

        let mut perms = metadata.permissions();

        perms.set_readonly(false);

        std::fs::set_permissions(path, perms).context("Failed to set permissions")?;

        Ok(())
    }

    // Create a data directory if it doesn't exist
    pub fn create_data_directory(path: &Path) -> anyhow::Result<()> {
        if path.is_dir() {
            return Ok(());
        }

        std::fs::create_dir_all(path).context("Failed to create data directory")?;
        tracing::debug!("Created data directory: {}", path.display());

        Self::set_writable(path).context("Failed to set permissions on data directory")?;

        Ok(())
    }

    /// Replace `path` with `contents` so readers see either the old or the new file.
    ///
    /// The data is written to a sibling temporary file, flushed to disk, then
    /// renamed over the destination. Returns once the rename itself is on disk.
    pub fn write_atomic(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
        let parent = path
            .parent()
            .context("File path must have a parent directory")?;
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        Self::create_data_directory(parent)?;

        let file_name = path
            .file_name()
            .context("File path must have a file name")?
            .to_string_lossy();
        let tmp_path = parent.join(format!(".{file_name}.tmp"));

        let mut file = std::fs::File::create(&tmp_path)
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
        file.write_all(contents)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("Failed to sync {}", tmp_path.display()))?;
        drop(file);

        std::fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to move {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        // The rename itself is only durable once the directory entry is flushed.
        #[cfg(unix)]
        std::fs::File::open(parent)
            .and_then(|dir| dir.sync_all())
            .with_context(|| format!("Failed to sync directory {}", parent.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = TempDir::new("shipwright-fs").expect("Failed to create temp dir");
        let path = dir.path().join("nested/out.json");

        FsHandler::write_atomic(&path, b"first").unwrap();
        FsHandler::write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!dir.path().join("nested/.out.json.tmp").exists());
    }

    #[test]
    fn test_write_atomic_leaves_only_destination() {
        let dir = TempDir::new("shipwright-fs").expect("Failed to create temp dir");
        let path = dir.path().join("1-addresses.json");

        FsHandler::write_atomic(&path, b"{}").unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("1-addresses.json")]);
    }
}
