//! Deployment backends.
//!
//! A backend submits transactions and answers questions about deployed code.
//! It is stateless between calls; the orchestrator owns everything else.

use std::future::Future;

use alloy_core::primitives::{Address, B256, b256};
use serde::Deserialize;

use crate::{Artifact, rpc};

mod rpc_backend;
pub use rpc_backend::{ReceiptPolling, RpcBackend};

/// EIP-1967 implementation slot: `bytes32(uint256(keccak256("eip1967.proxy.implementation")) - 1)`.
pub const EIP1967_IMPLEMENTATION_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// EIP-1967 admin slot: `bytes32(uint256(keccak256("eip1967.proxy.admin")) - 1)`.
pub const EIP1967_ADMIN_SLOT: B256 =
    b256!("b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

fn default_status() -> bool {
    true
}

/// The parts of a mined transaction receipt the orchestrator cares about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(deserialize_with = "rpc::deserialize_u64_from_hex")]
    pub block_number: u64,
    #[serde(
        default = "default_status",
        deserialize_with = "rpc::deserialize_status"
    )]
    pub status: bool,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(deserialize_with = "rpc::deserialize_u64_from_hex")]
    pub gas_used: u64,
}

/// A contract deployed by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub address: Address,
    pub receipt: TransactionReceipt,
}

/// Capability to put contracts on chain and manage EIP-1967 proxies.
///
/// Every method suspends until the underlying transaction is mined (or the
/// query answered). Implementations must never resubmit a transaction.
pub trait DeploymentBackend: Send + Sync {
    /// Deploy `artifact` with ABI-encoded constructor arguments, waiting for the receipt.
    fn deploy(
        &self,
        artifact: &Artifact,
        constructor_args: &[u8],
    ) -> impl Future<Output = anyhow::Result<Deployment>> + Send;

    /// Whether `address` holds a proxy this backend knows how to upgrade.
    fn probe_proxy(&self, address: Address) -> impl Future<Output = anyhow::Result<bool>> + Send;

    /// The implementation `proxy` currently delegates to.
    fn get_implementation(
        &self,
        proxy: Address,
    ) -> impl Future<Output = anyhow::Result<Address>> + Send;

    /// Point `proxy` at `implementation`.
    fn upgrade_proxy(
        &self,
        proxy: Address,
        implementation: Address,
    ) -> impl Future<Output = anyhow::Result<TransactionReceipt>> + Send;
}
