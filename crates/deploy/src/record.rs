//! Persisted deployment data.

use std::fmt;

use alloy_core::primitives::Address;
use serde::{Deserialize, Serialize};

/// A primitive constructor or initializer argument.
///
/// Addresses, byte strings and integers wider than 64 bits are given as strings
/// and coerced against the declared ABI type at deploy time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstructorArg {
    Bool(bool),
    Uint(u64),
    Int(i64),
    String(String),
}

impl fmt::Display for ConstructorArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructorArg::Bool(b) => write!(f, "{b}"),
            ConstructorArg::Uint(n) => write!(f, "{n}"),
            ConstructorArg::Int(n) => write!(f, "{n}"),
            ConstructorArg::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ConstructorArg {
    fn from(value: &str) -> Self {
        ConstructorArg::String(value.to_string())
    }
}

impl From<Address> for ConstructorArg {
    fn from(value: Address) -> Self {
        ConstructorArg::String(value.to_checksum(None))
    }
}

impl From<u64> for ConstructorArg {
    fn from(value: u64) -> Self {
        ConstructorArg::Uint(value)
    }
}

impl From<i64> for ConstructorArg {
    fn from(value: i64) -> Self {
        ConstructorArg::Int(value)
    }
}

impl From<bool> for ConstructorArg {
    fn from(value: bool) -> Self {
        ConstructorArg::Bool(value)
    }
}

/// The record kept in the address store for a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    /// Chain id of the network the contract lives on.
    pub network_id: u64,
    /// Name of the deployed contract (the implementation's name for proxies).
    pub contract_name: String,
    /// Address callers interact with. For proxy deployments this is the proxy.
    pub address: Address,
    /// Current implementation behind [`Self::address`], only set for proxies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation_address: Option<Address>,
    /// Arguments passed to the constructor (or the initializer for proxies).
    #[serde(default)]
    pub constructor_args: Vec<ConstructorArg>,
    /// Whether the explorer accepted the source for the deployed code.
    pub verified: bool,
}

impl DeploymentRecord {
    /// Whether this record describes a proxy deployment.
    pub fn is_proxy(&self) -> bool {
        self.implementation_address.is_some()
    }
}

/// A stable proxy address paired with the implementation it currently delegates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyHandle {
    pub address: Address,
    pub implementation_address: Address,
}
