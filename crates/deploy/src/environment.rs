//! Resolution of the execution environment the pipeline targets.

use serde::{Deserialize, Serialize};

use crate::config::NetworkEntry;

/// Network names that are short-lived local chains.
///
/// These chains have no VRF coordinator of their own, so the pipeline bootstraps a mock.
pub const EPHEMERAL_NETWORKS: &[&str] = &["hardhat", "localhost", "anvil"];

/// Number of confirmations waited for when the network does not specify one.
pub const DEFAULT_CONFIRMATIONS: u64 = 1;

/// Environment variable holding the block explorer verification credential.
pub const ETHERSCAN_API_KEY_ENV: &str = "ETHERSCAN_API_KEY";

/// Returns true if the network name belongs to an ephemeral chain.
pub fn is_ephemeral_network(name: &str) -> bool {
    EPHEMERAL_NETWORKS.contains(&name)
}

/// The execution target of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentProfile {
    /// The network name, as selected on the command line.
    pub name: String,
    /// The chain id of the network.
    pub chain_id: u64,
    /// Whether the network is ephemeral (see [`EPHEMERAL_NETWORKS`]).
    pub is_ephemeral: bool,
    /// Number of confirmations to wait for on the application deployment.
    pub confirmations: u64,
}

impl EnvironmentProfile {
    /// Resolve the profile of a configured network.
    pub fn resolve(name: &str, entry: &NetworkEntry) -> Self {
        Self {
            name: name.to_string(),
            chain_id: entry.chain_id,
            is_ephemeral: is_ephemeral_network(name),
            confirmations: entry.block_confirmations.unwrap_or(DEFAULT_CONFIRMATIONS),
        }
    }
}

/// Read the verification credential from the process environment.
///
/// An empty value counts as absent.
pub fn verification_key_from_env() -> Option<String> {
    std::env::var(ETHERSCAN_API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
}
