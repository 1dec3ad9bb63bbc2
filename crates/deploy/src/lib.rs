//! shipwright-deploy - Contract deployment and upgrade orchestration.
//!
//! This crate deploys compiled contracts (directly or behind an EIP-1967 proxy),
//! upgrades existing proxies, verifies sources on block explorers and records
//! the resulting addresses per network.

pub use alloy_core::primitives;

mod artifact;
pub use artifact::{Artifact, ArtifactRegistry, BuildInfo};

mod backend;
pub use backend::{
    Deployment, DeploymentBackend, EIP1967_ADMIN_SLOT, EIP1967_IMPLEMENTATION_SLOT,
    ReceiptPolling, RpcBackend, TransactionReceipt,
};

mod config;
pub use config::{
    DEFAULT_INITIALIZER, DEFAULT_PROXY_CONTRACT, DEFAULT_VERIFICATION_DELAY_SECS, DeployMode,
    DeploymentConfig, DeploymentConfigBuilder,
};

mod error;
pub use error::DeployError;

mod fs;

mod network;
pub use network::{EPHEMERAL_CHAIN_IDS, NetworkContext};

mod orchestrator;
pub use orchestrator::{Orchestrator, RunOutcome};

mod record;
pub use record::{ConstructorArg, DeploymentRecord, ProxyHandle};

pub mod rpc;

mod store;
pub use store::{AddressStore, FileAddressStore};

pub mod verify;
pub use verify::{
    EtherscanVerifier, FailureKind, StatusPolling, VerificationAttempt, VerificationClient,
    VerificationFailure, VerificationOutcome,
};
