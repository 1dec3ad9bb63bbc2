//! Network identification.

use serde::{Deserialize, Serialize};

/// Chain ids used by local simulators (Hardhat / Anvil and Ganache / Geth dev).
pub const EPHEMERAL_CHAIN_IDS: [u64; 2] = [31337, 1337];

/// The network a deployment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkContext {
    /// Chain id of the network; also the address store key.
    pub network_id: u64,
    /// Ephemeral networks have no explorer, so verification is skipped.
    pub is_ephemeral: bool,
}

impl NetworkContext {
    pub fn new(network_id: u64, is_ephemeral: bool) -> Self {
        Self {
            network_id,
            is_ephemeral,
        }
    }

    /// Build a context from a chain id, classifying local simulator ids as ephemeral.
    pub fn from_chain_id(network_id: u64) -> Self {
        Self::new(network_id, EPHEMERAL_CHAIN_IDS.contains(&network_id))
    }
}
