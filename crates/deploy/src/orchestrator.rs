//! Deployment and upgrade orchestration.
//!
//! Every run follows the same sequence, each step gated on the previous one:
//! resolve the artifact and check arguments, deploy through the backend, wait a
//! fixed delay and verify once (skipped on ephemeral networks), then persist the
//! record. Verification is best effort: its failure is logged and recorded as
//! `verified: false`, never propagated.

use std::time::Duration;

use alloy_core::primitives::{Address, Bytes};
use anyhow::Context;

use crate::{
    AddressStore, Artifact, ArtifactRegistry, ConstructorArg, DeployError, DeployMode,
    Deployment, DeploymentBackend, DeploymentConfig, DeploymentRecord, NetworkContext,
    ProxyHandle, VerificationAttempt, VerificationClient, VerificationOutcome,
};

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Deployed(DeploymentRecord),
    Upgraded(ProxyHandle),
}

/// A proxy that now delegates to `implementation`, with what is needed to
/// verify and record it.
struct Repointed<'a> {
    proxy: Address,
    implementation: Address,
    artifact: &'a Artifact,
    encoded_args: Bytes,
    /// Store content read before anything was sent to the chain.
    existing: Option<DeploymentRecord>,
}

/// Drives deployments and upgrades through a backend, a verifier and a store.
///
/// The orchestrator is the only writer of the store.
#[derive(Debug)]
pub struct Orchestrator<B, V, S> {
    artifacts: ArtifactRegistry,
    backend: B,
    verifier: V,
    store: S,
}

impl<B, V, S> Orchestrator<B, V, S>
where
    B: DeploymentBackend,
    V: VerificationClient,
    S: AddressStore,
{
    pub fn new(artifacts: ArtifactRegistry, backend: B, verifier: V, store: S) -> Self {
        Self {
            artifacts,
            backend,
            verifier,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Perform the operation selected by `config.mode`.
    pub async fn run(&self, config: &DeploymentConfig) -> Result<RunOutcome, DeployError> {
        match &config.mode {
            DeployMode::Direct | DeployMode::Proxy { .. } => {
                self.deploy_and_verify(config).await.map(RunOutcome::Deployed)
            }
            DeployMode::Upgrade {
                proxy_address,
                resume_implementation: None,
            } => self
                .upgrade(
                    *proxy_address,
                    &config.contract_name,
                    config.artifact_path.as_deref(),
                    config.network,
                    config.verification_delay(),
                )
                .await
                .map(RunOutcome::Upgraded),
            DeployMode::Upgrade {
                proxy_address,
                resume_implementation: Some(implementation),
            } => self
                .resume_upgrade(
                    *proxy_address,
                    *implementation,
                    &config.contract_name,
                    config.artifact_path.as_deref(),
                    config.network,
                    config.verification_delay(),
                )
                .await
                .map(RunOutcome::Upgraded),
        }
    }

    /// Deploy a contract (directly or behind a new proxy), verify it, and record it.
    ///
    /// Deployment is not memoized: two calls with identical arguments put two
    /// contracts on chain, and the store only keeps the second one.
    pub async fn deploy_and_verify(
        &self,
        config: &DeploymentConfig,
    ) -> Result<DeploymentRecord, DeployError> {
        let artifact = self
            .artifacts
            .resolve(&config.contract_name, config.artifact_path.as_deref())?;

        let (address, implementation_address, verified) = match &config.mode {
            DeployMode::Direct => {
                let encoded_args = artifact.encode_constructor_args(&config.constructor_args)?;
                let deployment = self.deploy(&artifact, &encoded_args, config.network).await?;
                let verified = self
                    .verify(config, deployment.address, &artifact, encoded_args)
                    .await;
                (deployment.address, None, verified)
            }
            DeployMode::Proxy {
                proxy_contract,
                initializer,
            } => {
                let (proxy, implementation, encoded_args) = self
                    .deploy_behind_proxy(config, &artifact, proxy_contract, initializer)
                    .await?;
                let verified = self
                    .verify(config, implementation, &artifact, encoded_args)
                    .await;
                (proxy, Some(implementation), verified)
            }
            DeployMode::Upgrade { .. } => {
                return Err(DeployError::InvalidArguments(
                    "upgrade runs must go through `upgrade` or `run`".to_string(),
                ));
            }
        };

        let record = DeploymentRecord {
            network_id: config.network.network_id,
            contract_name: artifact.contract_name.clone(),
            address,
            implementation_address,
            constructor_args: config.constructor_args.clone(),
            verified,
        };

        self.store
            .put(record.network_id, &record)
            .map_err(DeployError::Store)?;

        tracing::info!(
            contract = %record.contract_name,
            address = %record.address,
            network_id = record.network_id,
            verified = record.verified,
            "Deployment complete"
        );

        Ok(record)
    }

    /// Deploy a new implementation and repoint `proxy_address` to it.
    ///
    /// The new implementation must be storage-layout compatible with the old
    /// one; this is not checked. Only the new implementation is verified.
    pub async fn upgrade(
        &self,
        proxy_address: Address,
        new_contract_name: &str,
        artifact_path: Option<&str>,
        network: NetworkContext,
        verification_delay: Duration,
    ) -> Result<ProxyHandle, DeployError> {
        let artifact = self.artifacts.resolve(new_contract_name, artifact_path)?;
        let encoded_args = artifact.encode_constructor_args(&[])?;
        let existing = self
            .store
            .get(network.network_id)
            .map_err(DeployError::Store)?;

        self.ensure_proxy(proxy_address).await?;
        let previous = self
            .backend
            .get_implementation(proxy_address)
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, proxy = %proxy_address, "Failed to read implementation");
                DeployError::NotAProxy {
                    address: proxy_address,
                }
            })?;

        tracing::info!(
            proxy = %proxy_address,
            current_implementation = %previous,
            contract = %artifact.contract_name,
            "Upgrading proxy..."
        );

        let deployment = self.deploy(&artifact, &encoded_args, network).await?;
        self.repoint(proxy_address, deployment.address).await?;

        self.finish_upgrade(
            Repointed {
                proxy: proxy_address,
                implementation: deployment.address,
                artifact: &artifact,
                encoded_args,
                existing,
            },
            network,
            verification_delay,
        )
        .await
    }

    /// Retry only the repoint step of an upgrade that ended in
    /// [`DeployError::PartialUpgrade`], reusing the orphaned implementation.
    pub async fn resume_upgrade(
        &self,
        proxy_address: Address,
        implementation: Address,
        contract_name: &str,
        artifact_path: Option<&str>,
        network: NetworkContext,
        verification_delay: Duration,
    ) -> Result<ProxyHandle, DeployError> {
        let artifact = self.artifacts.resolve(contract_name, artifact_path)?;
        let encoded_args = artifact.encode_constructor_args(&[])?;
        let existing = self
            .store
            .get(network.network_id)
            .map_err(DeployError::Store)?;

        self.ensure_proxy(proxy_address).await?;

        tracing::info!(
            proxy = %proxy_address,
            implementation = %implementation,
            "Resuming upgrade with an already deployed implementation..."
        );

        self.repoint(proxy_address, implementation).await?;

        self.finish_upgrade(
            Repointed {
                proxy: proxy_address,
                implementation,
                artifact: &artifact,
                encoded_args,
                existing,
            },
            network,
            verification_delay,
        )
        .await
    }

    async fn deploy(
        &self,
        artifact: &Artifact,
        encoded_args: &[u8],
        network: NetworkContext,
    ) -> Result<Deployment, DeployError> {
        tracing::info!(
            contract = %artifact.fully_qualified_name(),
            network_id = network.network_id,
            "Deploying contract..."
        );

        let deployment = self
            .backend
            .deploy(artifact, encoded_args)
            .await
            .map_err(|e| DeployError::deploy_failed(&artifact.contract_name, e))?;

        tracing::info!(
            contract = %artifact.contract_name,
            address = %deployment.address,
            tx_hash = %deployment.receipt.transaction_hash,
            block_number = deployment.receipt.block_number,
            "Contract deployed"
        );

        Ok(deployment)
    }

    /// Deploy `artifact` as an implementation, then a proxy initialized with the
    /// run's arguments. Returns `(proxy, implementation, implementation args)`.
    async fn deploy_behind_proxy(
        &self,
        config: &DeploymentConfig,
        artifact: &Artifact,
        proxy_contract: &str,
        initializer: &str,
    ) -> Result<(Address, Address, Bytes), DeployError> {
        let proxy_artifact = self.artifacts.resolve(proxy_contract, None)?;

        // Check every argument before sending anything.
        let init_calldata = artifact.encode_function_call(initializer, &config.constructor_args)?;
        let implementation_args = artifact.encode_constructor_args(&[])?;
        let proxy_args = |implementation: Address| {
            proxy_artifact.encode_constructor_args(&[
                ConstructorArg::from(implementation),
                ConstructorArg::String(init_calldata.to_string()),
            ])
        };
        proxy_args(Address::ZERO)?;

        let implementation = self
            .deploy(artifact, &implementation_args, config.network)
            .await?;

        let proxy = self
            .deploy(&proxy_artifact, &proxy_args(implementation.address)?, config.network)
            .await
            .map_err(|e| match e {
                DeployError::DeployFailed { contract, reason } => DeployError::DeployFailed {
                    contract,
                    reason: format!(
                        "{reason} (implementation {} was deployed and is unused)",
                        implementation.address
                    ),
                },
                other => other,
            })?;

        Ok((proxy.address, implementation.address, implementation_args))
    }

    async fn ensure_proxy(&self, address: Address) -> Result<(), DeployError> {
        match self.backend.probe_proxy(address).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(DeployError::NotAProxy { address }),
            Err(e) => {
                tracing::debug!(error = %e, address = %address, "Proxy probe failed");
                Err(DeployError::NotAProxy { address })
            }
        }
    }

    /// Point `proxy` at `implementation` and confirm the proxy reports it.
    async fn repoint(&self, proxy: Address, implementation: Address) -> Result<(), DeployError> {
        let partial = |reason: String| DeployError::PartialUpgrade {
            proxy,
            implementation,
            reason,
        };

        let receipt = self
            .backend
            .upgrade_proxy(proxy, implementation)
            .await
            .map_err(|e| partial(format!("{e:#}")))?;

        let current = self
            .backend
            .get_implementation(proxy)
            .await
            .map_err(|e| partial(format!("could not confirm the new implementation: {e:#}")))?;

        if current != implementation {
            return Err(partial(format!("proxy still points at {current}")));
        }

        tracing::info!(
            proxy = %proxy,
            implementation = %implementation,
            tx_hash = %receipt.transaction_hash,
            "Proxy repointed"
        );

        Ok(())
    }

    /// Verify the new implementation and record it against the proxy.
    async fn finish_upgrade(
        &self,
        repointed: Repointed<'_>,
        network: NetworkContext,
        verification_delay: Duration,
    ) -> Result<ProxyHandle, DeployError> {
        let Repointed {
            proxy,
            implementation,
            artifact,
            encoded_args,
            existing,
        } = repointed;

        let verified = self
            .verify_on(network, verification_delay, implementation, artifact, encoded_args)
            .await;

        let record = match existing {
            Some(mut record) if record.address == proxy => {
                record.contract_name = artifact.contract_name.clone();
                record.implementation_address = Some(implementation);
                record.verified = verified;
                record
            }
            _ => DeploymentRecord {
                network_id: network.network_id,
                contract_name: artifact.contract_name.clone(),
                address: proxy,
                implementation_address: Some(implementation),
                constructor_args: Vec::new(),
                verified,
            },
        };

        self.store
            .put(network.network_id, &record)
            .with_context(|| {
                format!("proxy {proxy} already points at {implementation} but was not recorded")
            })
            .map_err(DeployError::Store)?;

        tracing::info!(
            proxy = %proxy,
            implementation = %implementation,
            verified,
            "Upgrade complete"
        );

        Ok(ProxyHandle {
            address: proxy,
            implementation_address: implementation,
        })
    }

    async fn verify(
        &self,
        config: &DeploymentConfig,
        address: Address,
        artifact: &Artifact,
        encoded_args: Bytes,
    ) -> bool {
        self.verify_on(
            config.network,
            config.verification_delay(),
            address,
            artifact,
            encoded_args,
        )
        .await
    }

    /// Submit `address` for verification once, after the fixed delay.
    ///
    /// Returns whether the explorer holds verified source afterwards.
    async fn verify_on(
        &self,
        network: NetworkContext,
        delay: Duration,
        address: Address,
        artifact: &Artifact,
        encoded_args: Bytes,
    ) -> bool {
        if network.is_ephemeral {
            tracing::info!(
                network_id = network.network_id,
                "Ephemeral network, skipping verification"
            );
            return false;
        }

        tracing::info!(
            delay_secs = delay.as_secs(),
            address = %address,
            "Waiting for the explorer to index the deployment..."
        );
        tokio::time::sleep(delay).await;

        let attempt = VerificationAttempt {
            address,
            artifact,
            constructor_args: encoded_args,
            network_id: network.network_id,
        };

        match self.verifier.submit(&attempt).await {
            VerificationOutcome::Verified => {
                tracing::info!(address = %address, "Contract verified");
                true
            }
            VerificationOutcome::AlreadyVerified => {
                tracing::info!(address = %address, "Contract was already verified");
                true
            }
            VerificationOutcome::Failed(failure) => {
                tracing::warn!(
                    address = %address,
                    kind = %failure.kind,
                    error = %failure.message,
                    "Contract verification failed, continuing without it"
                );
                false
            }
        }
    }
}
