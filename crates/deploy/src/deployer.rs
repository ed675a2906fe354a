use std::time::Duration;

use anyhow::{Context, Result};

use crate::{
    DeployConfig, EnvironmentProfile, EtherscanVerifier, Pipeline, PipelineReport, RpcChain,
    VerificationConfig,
    environment::verification_key_from_env,
    stages::{Stage, select_stages},
    store::DeploymentStore,
};

/// Build the source verifier for a run.
///
/// Ephemeral networks are never verified. Remote networks are verified only when a non-empty
/// API key is available.
pub fn source_verifier(
    profile: &EnvironmentProfile,
    api_key: Option<String>,
    config: &VerificationConfig,
) -> Result<Option<EtherscanVerifier>> {
    if profile.is_ephemeral {
        return Ok(None);
    }

    match api_key.filter(|key| !key.trim().is_empty()) {
        Some(api_key) => Ok(Some(EtherscanVerifier::new(api_key, config)?)),
        None => {
            tracing::info!("No verification API key set, contracts will not be verified");
            Ok(None)
        }
    }
}

/// Main deployer that wires the configuration to a live chain and runs the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployer {
    pub config: DeployConfig,
}

impl Deployer {
    pub fn new(config: DeployConfig) -> Self {
        Self { config }
    }

    /// Resolve the profile of the configured network.
    pub fn profile(&self) -> Result<EnvironmentProfile> {
        let entry = self.config.network_entry()?;
        Ok(EnvironmentProfile::resolve(&self.config.network, entry))
    }

    /// Run the stages selected by `tags` against the configured network.
    ///
    /// Configuration problems are reported before any transaction is sent.
    pub async fn deploy<S: AsRef<str>>(&self, tags: &[S]) -> Result<PipelineReport> {
        let stages = select_stages(tags)?;
        let profile = self.profile()?;
        let entry = self.config.network_entry()?;

        let table = self.config.network_table();
        let params = table.require(profile.chain_id)?;
        if !profile.is_ephemeral && stages.contains(&Stage::Raffle) {
            params.remote_subscription()?;
        }

        let chain = RpcChain::connect(
            &entry.url,
            profile.chain_id,
            self.config.deployer,
            Duration::from_secs(self.config.receipt_timeout_secs),
        )
        .await
        .with_context(|| format!("Failed to connect to network `{}`", profile.name))?;

        let verifier = source_verifier(
            &profile,
            verification_key_from_env(),
            &self.config.verification,
        )?;

        let store = DeploymentStore::new(&self.config.outdata, &profile.name);

        Pipeline {
            chain: &chain,
            verifier: verifier.as_ref(),
            profile: &profile,
            params,
            store: &store,
            artifacts: &self.config.artifacts,
        }
        .run(&stages)
        .await
    }
}
