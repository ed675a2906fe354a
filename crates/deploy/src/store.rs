//! Deployment records persisted between runs.
//!
//! Records are saved as formatted JSON under `{outdata}/{network}/{Name}.json`, one file per
//! deployed contract, so that a later run on the same network can find them again.

use std::path::{Path, PathBuf};

use alloy_core::primitives::{Address, B256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::contracts::RaffleConstructorArgs;

/// Well-known name of the mock coordinator record.
pub const MOCK_COORDINATOR_NAME: &str = "VRFCoordinatorV2Mock";

/// Well-known name of the raffle record.
pub const RAFFLE_NAME: &str = "Raffle";

/// A deployed VRF coordinator mock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockOracleDeployment {
    pub address: Address,
    /// Flat fee per request, in wei of LINK.
    pub base_fee: u128,
    /// LINK per gas.
    pub gas_price_link: u128,
    pub transaction_hash: B256,
    /// Unix timestamp of the deployment.
    pub deployed_at: i64,
}

/// A funded consumer registration on the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: u64,
    /// Balance of the subscription after funding, in wei of LINK.
    ///
    /// `None` for subscriptions funded out of band on remote networks.
    pub funded_amount: Option<u128>,
}

/// A deployed raffle contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub name: String,
    pub address: Address,
    pub constructor_args: RaffleConstructorArgs,
    pub transaction_hash: B256,
    pub block_number: u64,
    /// Confirmations observed when the deployment returned.
    pub confirmations: u64,
    /// Unix timestamp of the deployment.
    pub deployed_at: i64,
}

/// Current unix timestamp, for record metadata.
pub fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Directory of deployment records for one network.
#[derive(Debug, Clone)]
pub struct DeploymentStore {
    root: PathBuf,
}

impl DeploymentStore {
    /// Create a store for the given network under `outdata`.
    pub fn new(outdata: &Path, network: &str) -> Self {
        Self {
            root: outdata.join(network),
        }
    }

    /// Directory holding the records.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    /// Save a record under `name`, replacing any previous one.
    pub fn save<T: Serialize>(&self, name: &str, record: &T) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.root).with_context(|| {
            format!(
                "Failed to create deployments directory {}",
                self.root.display()
            )
        })?;

        let path = self.record_path(name);
        let json = serde_json::to_string_pretty(record)
            .with_context(|| format!("Failed to serialize {name} deployment"))?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write deployment to {}", path.display()))?;

        tracing::debug!(name, path = %path.display(), "Deployment saved");
        Ok(path)
    }

    /// Load the record saved under `name`, if any.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.record_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read deployment from {}", path.display()))?;
        let record = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse deployment {}", path.display()))?;
        Ok(Some(record))
    }
}
