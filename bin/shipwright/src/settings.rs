//! `Shipwright.toml` settings, layered with `SHIPWRIGHT_` environment variables.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use shipwright_deploy::{ConstructorArg, DEFAULT_VERIFICATION_DELAY_SECS, primitives::Address};
use url::Url;

/// Name of the network used when none is configured.
pub const LOCALHOST: &str = "localhost";
const LOCALHOST_RPC_URL: &str = "http://127.0.0.1:8545";

/// `SHIPWRIGHT_*` variables read by the command line parser, not by settings.
const CLI_ENV_KEYS: [&str; 8] = [
    "verbosity",
    "config",
    "network",
    "mode",
    "contract",
    "artifact",
    "proxy",
    "verification_delay",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    #[serde(default = "default_deployments_dir")]
    pub deployments_dir: PathBuf,
    #[serde(default = "default_verification_delay_secs")]
    pub verification_delay_secs: u64,
    #[serde(default)]
    pub contract: Option<ContractSettings>,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkSettings>,
}

/// The `[contract]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContractSettings {
    pub name: String,
    /// Fully qualified artifact name, for contracts whose name is ambiguous.
    pub artifact: Option<String>,
    #[serde(default)]
    pub args: Vec<ConstructorArg>,
    pub proxy_contract: Option<String>,
    pub initializer: Option<String>,
}

/// A `[networks.<name>]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NetworkSettings {
    pub rpc_url: Url,
    /// Sender account. Defaults to the first account managed by the node.
    pub from: Option<Address>,
    /// Overrides the chain id based ephemeral detection.
    pub ephemeral: Option<bool>,
    pub explorer_api_url: Option<Url>,
    pub explorer_api_key: Option<String>,
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_deployments_dir() -> PathBuf {
    PathBuf::from("deployments")
}

fn default_verification_delay_secs() -> u64 {
    DEFAULT_VERIFICATION_DELAY_SECS
}

impl Settings {
    /// Load settings from `path` (if it exists), then from the environment.
    ///
    /// `SHIPWRIGHT_NETWORKS__SEPOLIA__EXPLORER_API_KEY` sets
    /// `networks.sepolia.explorer_api_key`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("SHIPWRIGHT_").ignore(&CLI_ENV_KEYS).split("__"))
            .extract()
            .with_context(|| format!("Failed to load settings from {}", path.display()))
    }

    /// Settings of the network called `name`.
    pub fn network(&self, name: &str) -> anyhow::Result<NetworkSettings> {
        if let Some(network) = self.networks.get(name) {
            return Ok(network.clone());
        }

        if name == LOCALHOST {
            return Ok(NetworkSettings {
                rpc_url: Url::parse(LOCALHOST_RPC_URL).context("Invalid localhost RPC URL")?,
                from: None,
                ephemeral: None,
                explorer_api_url: None,
                explorer_api_key: None,
            });
        }

        anyhow::bail!(
            "Unknown network `{name}`; known networks: {}",
            self.networks.keys().cloned().collect::<Vec<_>>().join(", ")
        )
    }
}
