//! Durable storage of deployment records.

use std::path::PathBuf;

use anyhow::Context;

use crate::{DeploymentRecord, fs::FsHandler};

/// Maps a network id to the record of the contract deployed there.
///
/// `put` is write-through: once it returns `Ok`, the record is durable. There is
/// no locking; concurrent writers to the same network race and the last write wins.
pub trait AddressStore {
    fn put(&self, network_id: u64, record: &DeploymentRecord) -> anyhow::Result<()>;

    fn get(&self, network_id: u64) -> anyhow::Result<Option<DeploymentRecord>>;
}

/// Stores one `<network_id>-addresses.json` file per network in a directory.
#[derive(Debug, Clone)]
pub struct FileAddressStore {
    dir: PathBuf,
}

impl FileAddressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file holding the record for `network_id`.
    pub fn path_for(&self, network_id: u64) -> PathBuf {
        self.dir.join(format!("{network_id}-addresses.json"))
    }
}

impl AddressStore for FileAddressStore {
    fn put(&self, network_id: u64, record: &DeploymentRecord) -> anyhow::Result<()> {
        let path = self.path_for(network_id);
        let json =
            serde_json::to_string_pretty(record).context("Failed to serialize deployment record")?;

        FsHandler::write_atomic(&path, json.as_bytes())
            .with_context(|| format!("Failed to write deployment record to {}", path.display()))?;

        tracing::info!(path = %path.display(), network_id, "Deployment record saved");
        Ok(())
    }

    fn get(&self, network_id: u64) -> anyhow::Result<Option<DeploymentRecord>> {
        let path = self.path_for(network_id);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let record = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse deployment record {}", path.display()))?;

        Ok(Some(record))
    }
}
