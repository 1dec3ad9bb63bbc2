//! JSON-RPC deployment backend.
//!
//! Transactions are sent with `eth_sendTransaction` from an account the node
//! manages (an unlocked dev account, or a signing proxy in front of a remote
//! node). Signing and gas estimation are left to the node.

use std::time::Duration;

use alloy_core::{
    primitives::{Address, B256, Bytes},
    sol,
    sol_types::SolCall,
};
use anyhow::Context;
use backon::{ConstantBuilder, Retryable};
use serde_json::Value;
use url::Url;

use super::{
    Deployment, DeploymentBackend, EIP1967_ADMIN_SLOT, EIP1967_IMPLEMENTATION_SLOT,
    TransactionReceipt,
};
use crate::{Artifact, rpc};

sol! {
    /// `ProxyAdmin.upgradeAndCall` of an OpenZeppelin transparent proxy.
    function upgradeAndCall(address proxy, address implementation, bytes data) external payable;

    /// `upgradeToAndCall` exposed by UUPS implementations through the proxy.
    function upgradeToAndCall(address newImplementation, bytes data) external payable;

    /// `ProxyAdmin.upgrade` of OpenZeppelin 4.x transparent proxies.
    function upgrade(address proxy, address implementation) external;

    /// `upgradeTo` of OpenZeppelin 4.x UUPS implementations.
    function upgradeTo(address newImplementation) external;

    /// Only defined from OpenZeppelin 5.0 on, by `ProxyAdmin` and `UUPSUpgradeable`.
    function UPGRADE_INTERFACE_VERSION() external view returns (string);
}

/// How a proxy is repointed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProxyKind {
    /// Upgraded by calling its admin contract.
    Transparent,
    /// Upgraded by calling the proxy itself.
    Uups,
}

/// Calldata repointing `proxy` at `implementation`.
///
/// OpenZeppelin 4.x contracts force a delegate call on `*AndCall` upgrades,
/// which reverts with empty data, so the plain functions are used unless the
/// target reports an `UPGRADE_INTERFACE_VERSION`. 5.x contracts only have the
/// `*AndCall` variants.
fn repoint_calldata(
    kind: ProxyKind,
    interface_version: Option<&str>,
    proxy: Address,
    implementation: Address,
) -> Bytes {
    let calldata = match (kind, interface_version) {
        (ProxyKind::Transparent, Some(_)) => upgradeAndCallCall {
            proxy,
            implementation,
            data: Bytes::new(),
        }
        .abi_encode(),
        (ProxyKind::Transparent, None) => upgradeCall {
            proxy,
            implementation,
        }
        .abi_encode(),
        (ProxyKind::Uups, Some(_)) => upgradeToAndCallCall {
            newImplementation: implementation,
            data: Bytes::new(),
        }
        .abi_encode(),
        (ProxyKind::Uups, None) => upgradeToCall {
            newImplementation: implementation,
        }
        .abi_encode(),
    };
    calldata.into()
}

/// How long to wait for a transaction to be mined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptPolling {
    /// Delay between `eth_getTransactionReceipt` calls.
    pub interval: Duration,
    /// Number of polls before the transaction is reported as never mined.
    pub max_attempts: usize,
}

impl Default for ReceiptPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 150,
        }
    }
}

/// A [`DeploymentBackend`] talking to an Ethereum JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcBackend {
    client: reqwest::Client,
    url: Url,
    from: Address,
    polling: ReceiptPolling,
}

impl RpcBackend {
    /// Create a backend sending transactions from `from` through `url`.
    pub fn new(url: Url, from: Address) -> anyhow::Result<Self> {
        Ok(Self {
            client: rpc::create_client(rpc::DEFAULT_TIMEOUT)?,
            url,
            from,
            polling: ReceiptPolling::default(),
        })
    }

    /// Override how receipts are polled.
    pub fn with_receipt_polling(mut self, polling: ReceiptPolling) -> Self {
        self.polling = polling;
        self
    }

    /// Query the chain id of the endpoint.
    pub async fn chain_id(&self) -> anyhow::Result<u64> {
        let chain_id: String = self.call("eth_chainId", vec![]).await?;
        rpc::parse_quantity(&chain_id)
    }

    /// Return the first account managed by the node (`eth_accounts`).
    pub async fn default_account(url: &Url) -> anyhow::Result<Address> {
        let client = rpc::create_client(rpc::DEFAULT_TIMEOUT)?;
        let accounts: Vec<Address> =
            rpc::json_rpc_call(&client, url.as_str(), "eth_accounts", vec![]).await?;

        accounts
            .into_iter()
            .next()
            .context("The RPC endpoint manages no accounts; configure a sender address")
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> anyhow::Result<T> {
        rpc::json_rpc_call(&self.client, self.url.as_str(), method, params).await
    }

    async fn get_code(&self, address: Address) -> anyhow::Result<Bytes> {
        self.call(
            "eth_getCode",
            vec![serde_json::json!(address), serde_json::json!("latest")],
        )
        .await
        .with_context(|| format!("Failed to fetch code at {address}"))
    }

    /// Read a storage slot holding an address (right-aligned in the word).
    async fn get_storage_address(&self, address: Address, slot: B256) -> anyhow::Result<Address> {
        let word: B256 = self
            .call(
                "eth_getStorageAt",
                vec![
                    serde_json::json!(address),
                    serde_json::json!(slot),
                    serde_json::json!("latest"),
                ],
            )
            .await
            .with_context(|| format!("Failed to read storage slot {slot} of {address}"))?;

        Ok(Address::from_word(word))
    }

    /// `UPGRADE_INTERFACE_VERSION()` of `target`, or `None` if it does not answer.
    async fn upgrade_interface_version(&self, target: Address) -> Option<String> {
        let data: Bytes = UPGRADE_INTERFACE_VERSIONCall {}.abi_encode().into();
        let result: anyhow::Result<Bytes> = self
            .call(
                "eth_call",
                vec![
                    serde_json::json!({ "to": target, "data": data }),
                    serde_json::json!("latest"),
                ],
            )
            .await;

        match result {
            Ok(output) if !output.is_empty() => {
                UPGRADE_INTERFACE_VERSIONCall::abi_decode_returns(&output, true)
                    .map(|version| version._0)
                    .ok()
            }
            Ok(_) => None,
            Err(err) => {
                tracing::debug!(error = %err, target = %target, "No upgrade interface version");
                None
            }
        }
    }

    /// Send a transaction and wait for it to be mined successfully.
    async fn transact(&self, to: Option<Address>, data: Bytes) -> anyhow::Result<TransactionReceipt> {
        let mut tx = serde_json::json!({
            "from": self.from,
            "data": data,
        });
        if let Some(to) = to {
            tx["to"] = serde_json::json!(to);
        }

        let tx_hash: B256 = self
            .call("eth_sendTransaction", vec![tx])
            .await
            .context("Failed to send transaction")?;

        tracing::info!(tx_hash = %tx_hash, "Transaction sent, waiting for it to be mined...");

        let receipt = self.wait_for_receipt(tx_hash).await?;
        if !receipt.status {
            anyhow::bail!(
                "Transaction {} reverted in block {}",
                receipt.transaction_hash,
                receipt.block_number
            );
        }

        tracing::debug!(
            tx_hash = %receipt.transaction_hash,
            block_number = receipt.block_number,
            gas_used = receipt.gas_used,
            "Transaction mined"
        );

        Ok(receipt)
    }

    /// Poll for a receipt. Only the lookup is repeated, never the transaction.
    async fn wait_for_receipt(&self, tx_hash: B256) -> anyhow::Result<TransactionReceipt> {
        let fetch = || async {
            let receipt: Option<TransactionReceipt> = self
                .call("eth_getTransactionReceipt", vec![serde_json::json!(tx_hash)])
                .await?;
            receipt.with_context(|| format!("Transaction {tx_hash} is not mined yet"))
        };

        fetch
            .retry(
                ConstantBuilder::default()
                    .with_delay(self.polling.interval)
                    .with_max_times(self.polling.max_attempts),
            )
            .notify(|err, _| {
                tracing::trace!(error = %err, tx_hash = %tx_hash, "Receipt not available, retrying...");
            })
            .await
            .with_context(|| {
                format!(
                    "Transaction {tx_hash} was not mined after {} polls",
                    self.polling.max_attempts
                )
            })
    }
}

impl DeploymentBackend for RpcBackend {
    async fn deploy(
        &self,
        artifact: &Artifact,
        constructor_args: &[u8],
    ) -> anyhow::Result<Deployment> {
        tracing::debug!(
            contract = %artifact.fully_qualified_name(),
            from = %self.from,
            "Sending deploy transaction"
        );

        let receipt = self
            .transact(None, artifact.creation_code(constructor_args))
            .await?;

        let address = receipt
            .contract_address
            .context("Deploy receipt carries no contract address")?;

        Ok(Deployment { address, receipt })
    }

    async fn probe_proxy(&self, address: Address) -> anyhow::Result<bool> {
        if self.get_code(address).await?.is_empty() {
            tracing::debug!(address = %address, "No code at address");
            return Ok(false);
        }

        let implementation = self
            .get_storage_address(address, EIP1967_IMPLEMENTATION_SLOT)
            .await?;

        Ok(!implementation.is_zero())
    }

    async fn get_implementation(&self, proxy: Address) -> anyhow::Result<Address> {
        let implementation = self
            .get_storage_address(proxy, EIP1967_IMPLEMENTATION_SLOT)
            .await?;

        if implementation.is_zero() {
            anyhow::bail!("Proxy {proxy} has no implementation set");
        }

        Ok(implementation)
    }

    async fn upgrade_proxy(
        &self,
        proxy: Address,
        implementation: Address,
    ) -> anyhow::Result<TransactionReceipt> {
        let admin = self.get_storage_address(proxy, EIP1967_ADMIN_SLOT).await?;

        // Transparent proxies are upgraded through their admin contract, UUPS proxies directly.
        let (kind, to) = if !admin.is_zero() && !self.get_code(admin).await?.is_empty() {
            (ProxyKind::Transparent, admin)
        } else {
            (ProxyKind::Uups, proxy)
        };
        let version = self.upgrade_interface_version(to).await;

        tracing::info!(
            proxy = %proxy,
            kind = ?kind,
            target = %to,
            interface_version = version.as_deref().unwrap_or("pre-5.0"),
            "Upgrading proxy"
        );

        let calldata = repoint_calldata(kind, version.as_deref(), proxy, implementation);

        self.transact(Some(to), calldata)
            .await
            .with_context(|| format!("Failed to point proxy {proxy} at {implementation}"))
    }
}
