//! Deployment configuration.
//!
//! The configuration is layered with figment: built-in defaults, then the `Raffle.toml` file,
//! then `RAFFLE_`-prefixed environment variables (nested keys separated by `__`).

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use alloy_core::primitives::{Address, B256, U256, address, b256};
use anyhow::{Context, Result};
use derive_more::Deref;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

/// The default name for the configuration file.
pub const CONFIG_FILENAME: &str = "Raffle.toml";

/// Prefix of the environment variables overriding the configuration.
pub const ENV_PREFIX: &str = "RAFFLE_";

/// Default directory where deployment records are written.
pub const DEFAULT_OUTDATA: &str = "deployments";

/// Default timeout when waiting for a transaction receipt.
pub const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 300;

/// Gas lane (key hash) of the 30 gwei lane on Sepolia.
const SEPOLIA_GAS_LANE: B256 =
    b256!("474e34a077df58807dbe9c96d3c009b23b3c6d0cce433e59bbf5b34f823bc56c");

/// VRF coordinator v2 on Sepolia.
const SEPOLIA_VRF_COORDINATOR: Address = address!("8103B0A8A00be2DDC778e6e7eaa21791Cd364625");

/// 0.01 ether.
const DEFAULT_MINIMUM_ENTRY_AMOUNT: u64 = 10_000_000_000_000_000;

const DEFAULT_CALLBACK_GAS_LIMIT: u32 = 500_000;

const DEFAULT_INTERVAL_SECS: u64 = 30;

/// A network the pipeline can target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEntry {
    /// The chain id, used to look up the [`NetworkParameters`].
    pub chain_id: u64,
    /// JSON-RPC endpoint of the network.
    pub url: String,
    /// Confirmations to wait for on the application deployment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_confirmations: Option<u64>,
}

/// Per-chain constructor parameters of the raffle contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParameters {
    /// The chain id these parameters apply to.
    pub chain_id: u64,
    /// Human readable name of the chain.
    #[serde(default)]
    pub name: String,
    /// Address of the VRF coordinator. Only used on remote networks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vrf_coordinator: Option<Address>,
    /// Pre-existing, pre-funded subscription id. Only used on remote networks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<u64>,
    /// Gas lane (key hash) used for randomness requests.
    pub gas_lane: B256,
    /// Minimum amount (in wei) to enter the raffle.
    pub minimum_entry_amount: U256,
    /// Gas limit of the randomness fulfillment callback.
    pub callback_gas_limit: u32,
    /// Seconds between two draws.
    pub interval: u64,
}

impl NetworkParameters {
    /// The coordinator address and subscription id of a remote network.
    ///
    /// Both must be present; remote subscriptions are created and funded out of band.
    pub fn remote_subscription(&self) -> Result<(Address, u64)> {
        let coordinator = self.vrf_coordinator.with_context(|| {
            format!(
                "No `vrf_coordinator` configured for chain id {}",
                self.chain_id
            )
        })?;
        let subscription_id = self.subscription_id.with_context(|| {
            format!(
                "No `subscription_id` configured for chain id {}",
                self.chain_id
            )
        })?;
        Ok((coordinator, subscription_id))
    }
}

/// The parameters table, keyed by chain id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref)]
pub struct NetworkTable(BTreeMap<u64, NetworkParameters>);

impl NetworkTable {
    /// Build the table from configuration entries.
    ///
    /// Later entries override earlier ones with the same chain id, so that user
    /// configuration takes precedence over the built-in defaults.
    pub fn from_entries(entries: impl IntoIterator<Item = NetworkParameters>) -> Self {
        let mut table = BTreeMap::new();
        for entry in entries {
            if let Some(previous) = table.insert(entry.chain_id, entry) {
                tracing::debug!(
                    chain_id = previous.chain_id,
                    "Overriding network parameters"
                );
            }
        }
        Self(table)
    }

    /// Look up the parameters of a chain, failing if they are absent.
    pub fn require(&self, chain_id: u64) -> Result<&NetworkParameters> {
        self.0
            .get(&chain_id)
            .with_context(|| format!("No network parameters configured for chain id {chain_id}"))
    }
}

/// Paths to the Hardhat artifacts of the deployed contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    /// Artifact of the VRF coordinator mock.
    pub mock_coordinator: PathBuf,
    /// Artifact of the raffle contract.
    pub raffle: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            mock_coordinator: PathBuf::from(
                "artifacts/@chainlink/contracts/src/v0.8/mocks/VRFCoordinatorV2Mock.sol/VRFCoordinatorV2Mock.json",
            ),
            raffle: PathBuf::from("artifacts/contracts/Raffle.sol/Raffle.json"),
        }
    }
}

/// Configuration of the source verification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Etherscan v2 API endpoint.
    pub api_url: String,
    /// Number of times the verification status is polled.
    pub status_attempts: usize,
    /// Delay between two status polls, in seconds.
    pub status_interval_secs: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.etherscan.io/v2/api".to_string(),
            status_attempts: 10,
            status_interval_secs: 5,
        }
    }
}

/// The complete deployment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// The network to deploy to.
    pub network: String,
    /// Directory where deployment records are written.
    pub outdata: PathBuf,
    /// Deploying account. Defaults to the first account of the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployer: Option<Address>,
    /// Timeout when waiting for a transaction receipt.
    pub receipt_timeout_secs: u64,
    /// Known networks, by name.
    pub networks: BTreeMap<String, NetworkEntry>,
    /// Raffle parameters, one entry per chain id.
    pub parameters: Vec<NetworkParameters>,
    /// Contract artifacts.
    pub artifacts: ArtifactPaths,
    /// Source verification.
    pub verification: VerificationConfig,
}

impl Default for DeployConfig {
    fn default() -> Self {
        let local = NetworkEntry {
            chain_id: 31337,
            url: "http://127.0.0.1:8545".to_string(),
            block_confirmations: None,
        };

        let networks = BTreeMap::from([
            ("hardhat".to_string(), local.clone()),
            ("localhost".to_string(), local.clone()),
            ("anvil".to_string(), local),
            (
                "sepolia".to_string(),
                NetworkEntry {
                    chain_id: 11155111,
                    url: "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
                    block_confirmations: Some(6),
                },
            ),
        ]);

        let parameters = vec![
            NetworkParameters {
                chain_id: 31337,
                name: "hardhat".to_string(),
                vrf_coordinator: None,
                subscription_id: None,
                gas_lane: SEPOLIA_GAS_LANE,
                minimum_entry_amount: U256::from(DEFAULT_MINIMUM_ENTRY_AMOUNT),
                callback_gas_limit: DEFAULT_CALLBACK_GAS_LIMIT,
                interval: DEFAULT_INTERVAL_SECS,
            },
            NetworkParameters {
                chain_id: 11155111,
                name: "sepolia".to_string(),
                vrf_coordinator: Some(SEPOLIA_VRF_COORDINATOR),
                // Subscriptions are personal; it must be provided by the user.
                subscription_id: None,
                gas_lane: SEPOLIA_GAS_LANE,
                minimum_entry_amount: U256::from(DEFAULT_MINIMUM_ENTRY_AMOUNT),
                callback_gas_limit: DEFAULT_CALLBACK_GAS_LIMIT,
                interval: DEFAULT_INTERVAL_SECS,
            },
        ];

        Self {
            network: "hardhat".to_string(),
            outdata: PathBuf::from(DEFAULT_OUTDATA),
            deployer: None,
            receipt_timeout_secs: DEFAULT_RECEIPT_TIMEOUT_SECS,
            networks,
            parameters,
            artifacts: ArtifactPaths::default(),
            verification: VerificationConfig::default(),
        }
    }
}

impl DeployConfig {
    /// Build the layered figment: defaults, then the TOML file, then the environment.
    ///
    /// The TOML file is adjoined so that its `[[parameters]]` extend the default ones.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .admerge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load the configuration.
    ///
    /// If `path` is a directory, the [`CONFIG_FILENAME`] inside it is used. A missing file is
    /// not an error; the defaults and environment still apply.
    pub fn load(path: &Path) -> Result<Self> {
        let config_path = if path.is_dir() {
            path.join(CONFIG_FILENAME)
        } else {
            path.to_path_buf()
        };

        let config: Self = Self::figment(&config_path)
            .extract()
            .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

        tracing::debug!(path = %config_path.display(), network = %config.network, "Configuration loaded");
        Ok(config)
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// The entry of the selected network.
    pub fn network_entry(&self) -> Result<&NetworkEntry> {
        self.networks.get(&self.network).with_context(|| {
            format!(
                "Unknown network `{}`; known networks: {}",
                self.network,
                self.networks.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })
    }

    /// The parameters table, keyed by chain id.
    pub fn network_table(&self) -> NetworkTable {
        NetworkTable::from_entries(self.parameters.iter().cloned())
    }
}
