//! Per-run deployment configuration.
//!
//! A [`DeploymentConfig`] carries everything one run needs: what to deploy,
//! with which arguments, where, and how. It is built once by the caller and
//! handed to [`crate::Orchestrator::run`].

use std::time::Duration;

use alloy_core::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{ConstructorArg, NetworkContext};

/// Default delay between a deployment and its verification, giving the explorer
/// time to index the transaction.
pub const DEFAULT_VERIFICATION_DELAY_SECS: u64 = 30;

/// Default proxy contract deployed in front of implementations.
pub const DEFAULT_PROXY_CONTRACT: &str = "ERC1967Proxy";

/// Default initializer called through the proxy on first deployment.
pub const DEFAULT_INITIALIZER: &str = "initialize";

/// Which lifecycle operation a run performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DeployMode {
    /// Deploy the contract with its constructor.
    Direct,
    /// Deploy the contract as an implementation behind a new proxy.
    Proxy {
        /// Name of the proxy artifact, constructed with `(implementation, initializerCalldata)`.
        proxy_contract: String,
        /// Function called through the proxy with the run's arguments.
        initializer: String,
    },
    /// Deploy a new implementation and repoint an existing proxy to it.
    Upgrade {
        proxy_address: Address,
        /// Skip deployment and only repoint to this already deployed implementation.
        resume_implementation: Option<Address>,
    },
}

impl DeployMode {
    /// Proxy mode with the default proxy contract and initializer.
    pub fn proxy() -> Self {
        Self::Proxy {
            proxy_contract: DEFAULT_PROXY_CONTRACT.to_string(),
            initializer: DEFAULT_INITIALIZER.to_string(),
        }
    }

    /// Upgrade mode for `proxy_address`.
    pub fn upgrade(proxy_address: Address) -> Self {
        Self::Upgrade {
            proxy_address,
            resume_implementation: None,
        }
    }
}

/// Everything a single deploy or upgrade run needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub contract_name: String,
    pub constructor_args: Vec<ConstructorArg>,
    pub network: NetworkContext,
    /// Fully qualified `source.sol:Name`; resolved from `contract_name` when absent.
    pub artifact_path: Option<String>,
    pub verification_delay_secs: u64,
    pub mode: DeployMode,
}

impl DeploymentConfig {
    /// Start building a configuration for `contract_name` on `network`.
    pub fn builder(contract_name: impl Into<String>, network: NetworkContext) -> DeploymentConfigBuilder {
        DeploymentConfigBuilder::new(contract_name, network)
    }

    pub fn verification_delay(&self) -> Duration {
        Duration::from_secs(self.verification_delay_secs)
    }
}

/// Builder for a [`DeploymentConfig`].
///
/// # Example
///
/// ```
/// use shipwright_deploy::{DeploymentConfig, DeployMode, NetworkContext};
///
/// let config = DeploymentConfig::builder("PredictionMarket", NetworkContext::from_chain_id(1))
///     .constructor_args(vec![
///         "0xd0D5e3DB44DE05E9F294BB0a3bEEaF030DE24Ada".into(),
///         "0x024D3242650d6c7b0ee6DE408E33E803dbfb00Ea".into(),
///     ])
///     .artifact_path("contracts/PredictionMarket.sol:PredictionMarket")
///     .mode(DeployMode::proxy())
///     .build();
///
/// assert_eq!(config.verification_delay_secs, 30);
/// ```
#[derive(Debug, Clone)]
pub struct DeploymentConfigBuilder {
    contract_name: String,
    network: NetworkContext,
    constructor_args: Vec<ConstructorArg>,
    artifact_path: Option<String>,
    verification_delay_secs: u64,
    mode: DeployMode,
}

impl DeploymentConfigBuilder {
    pub fn new(contract_name: impl Into<String>, network: NetworkContext) -> Self {
        Self {
            contract_name: contract_name.into(),
            network,
            constructor_args: Vec::new(),
            artifact_path: None,
            verification_delay_secs: DEFAULT_VERIFICATION_DELAY_SECS,
            mode: DeployMode::Direct,
        }
    }

    /// Set the constructor (or initializer, in proxy mode) arguments.
    pub fn constructor_args(mut self, args: Vec<ConstructorArg>) -> Self {
        self.constructor_args = args;
        self
    }

    /// Set the fully qualified artifact name.
    pub fn artifact_path(mut self, path: impl Into<String>) -> Self {
        self.artifact_path = Some(path.into());
        self
    }

    /// Set the delay before verification, in seconds.
    pub fn verification_delay_secs(mut self, secs: u64) -> Self {
        self.verification_delay_secs = secs;
        self
    }

    pub fn mode(mut self, mode: DeployMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn build(self) -> DeploymentConfig {
        DeploymentConfig {
            contract_name: self.contract_name,
            constructor_args: self.constructor_args,
            network: self.network,
            artifact_path: self.artifact_path,
            verification_delay_secs: self.verification_delay_secs,
            mode: self.mode,
        }
    }
}
