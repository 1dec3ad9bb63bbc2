//! Error taxonomy surfaced by the orchestrators.

use alloy_core::primitives::Address;
use std::path::PathBuf;

/// Errors returned by [`crate::Orchestrator`] operations.
///
/// Every variant is fatal for the current run. Verification problems are not
/// part of this enum: they are downgraded to [`crate::VerificationFailure`]
/// values and logged.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// No compiled artifact matches the requested contract.
    #[error("no deployable artifact found for contract `{name}`")]
    UnknownArtifact { name: String },

    /// The artifact exists but could not be read or parsed.
    #[error("invalid artifact at {}: {reason}", path.display())]
    InvalidArtifact { path: PathBuf, reason: String },

    /// Constructor or initializer arguments do not match the declared signature.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The deploy transaction reverted, was never mined, or could not be sent.
    #[error("deployment of `{contract}` failed: {reason}")]
    DeployFailed { contract: String, reason: String },

    /// The address given to an upgrade is not a recognized proxy.
    #[error("{address} is not a recognized proxy")]
    NotAProxy { address: Address },

    /// A new implementation was deployed but the proxy was not repointed to it.
    ///
    /// `implementation` is the orphaned deployment; pass it back to
    /// [`crate::Orchestrator::resume_upgrade`] to retry the repoint only.
    #[error(
        "upgrade of proxy {proxy} is incomplete: implementation {implementation} was deployed but the proxy was not repointed ({reason})"
    )]
    PartialUpgrade {
        proxy: Address,
        implementation: Address,
        reason: String,
    },

    /// The address store could not be read or written.
    #[error("address store error: {0:#}")]
    Store(anyhow::Error),
}

impl DeployError {
    pub(crate) fn deploy_failed(contract: &str, reason: impl std::fmt::Display) -> Self {
        Self::DeployFailed {
            contract: contract.to_string(),
            reason: format!("{reason:#}"),
        }
    }
}
