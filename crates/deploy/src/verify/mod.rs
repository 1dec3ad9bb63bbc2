//! Source verification against block explorers.

use std::future::Future;

use alloy_core::primitives::{Address, Bytes};

use crate::Artifact;

mod etherscan;
pub use etherscan::{EtherscanVerifier, StatusPolling, classify_message};

/// One submission to an explorer. Not persisted.
#[derive(Debug, Clone)]
pub struct VerificationAttempt<'a> {
    pub address: Address,
    pub artifact: &'a Artifact,
    /// ABI-encoded constructor arguments the contract was deployed with.
    pub constructor_args: Bytes,
    pub network_id: u64,
}

/// Whether a verification failure is worth retrying later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum FailureKind {
    /// Rate limiting, explorer not yet indexed, network trouble.
    Transient,
    /// Wrong compiler input, unsupported contract, bad API key.
    Permanent,
}

/// Why an explorer did not verify a contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} verification failure: {message}")]
pub struct VerificationFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl VerificationFailure {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Permanent,
            message: message.into(),
        }
    }
}

/// Result of a single verification submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    /// The explorer already had the source; counts as success.
    AlreadyVerified,
    Failed(VerificationFailure),
}

impl VerificationOutcome {
    /// Whether the contract's source is verified on the explorer after this attempt.
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified | Self::AlreadyVerified)
    }
}

/// Capability to publish a contract's source to an explorer.
///
/// Implementations report every problem through [`VerificationOutcome::Failed`];
/// nothing escapes as an error.
pub trait VerificationClient: Send + Sync {
    fn submit(
        &self,
        attempt: &VerificationAttempt<'_>,
    ) -> impl Future<Output = VerificationOutcome> + Send;
}

/// No client configured: every submission fails permanently.
impl<V: VerificationClient> VerificationClient for Option<V> {
    async fn submit(&self, attempt: &VerificationAttempt<'_>) -> VerificationOutcome {
        match self {
            Some(client) => client.submit(attempt).await,
            None => VerificationOutcome::Failed(VerificationFailure::permanent(
                "no explorer API configured for this network",
            )),
        }
    }
}
