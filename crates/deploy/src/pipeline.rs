//! Deployment execution engine.

use alloy_core::primitives::Address;
use anyhow::Result;

use crate::{
    chain::ChainClient,
    config::{ArtifactPaths, NetworkParameters},
    environment::EnvironmentProfile,
    stages::{
        BootstrapContext, DeploymentContext, RaffleDeployment, Stage, bootstrap_mock_coordinator,
        deploy_raffle,
    },
    store::{DeploymentStore, MockOracleDeployment},
    verify::SourceVerifier,
};

/// Result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub network: String,
    pub chain_id: u64,
    pub deployer: Address,
    /// The mock coordinator, on ephemeral networks.
    pub mock: Option<MockOracleDeployment>,
    /// The raffle deployment, if the raffle stage ran.
    pub raffle: Option<RaffleDeployment>,
}

/// Everything the stages run against.
pub struct Pipeline<'a, C, V> {
    pub chain: &'a C,
    pub verifier: Option<&'a V>,
    pub profile: &'a EnvironmentProfile,
    pub params: &'a NetworkParameters,
    pub store: &'a DeploymentStore,
    pub artifacts: &'a ArtifactPaths,
}

impl<C: ChainClient, V: SourceVerifier> Pipeline<'_, C, V> {
    /// Run the given stages in order. Any stage error aborts the run.
    pub async fn run(&self, stages: &[Stage]) -> Result<PipelineReport> {
        let mut stages = stages.to_vec();
        stages.sort();
        stages.dedup();

        tracing::info!(
            network = %self.profile.name,
            chain_id = self.profile.chain_id,
            ephemeral = self.profile.is_ephemeral,
            deployer = %self.chain.deployer(),
            stages = ?stages,
            "Starting deployment pipeline..."
        );

        let mut report = PipelineReport {
            network: self.profile.name.clone(),
            chain_id: self.profile.chain_id,
            deployer: self.chain.deployer(),
            mock: None,
            raffle: None,
        };

        for stage in stages {
            tracing::debug!(%stage, "Running stage");
            match stage {
                Stage::Mock => {
                    let ctx = BootstrapContext {
                        chain: self.chain,
                        profile: self.profile,
                        store: self.store,
                        artifact: &self.artifacts.mock_coordinator,
                    };
                    report.mock = bootstrap_mock_coordinator(ctx).await?;
                }
                Stage::Raffle => {
                    let ctx = DeploymentContext {
                        chain: self.chain,
                        profile: self.profile,
                        params: self.params,
                        store: self.store,
                        artifact: &self.artifacts.raffle,
                        mock: report.mock.as_ref(),
                        verifier: self.verifier,
                    };
                    report.raffle = Some(deploy_raffle(ctx).await?);
                }
            }
        }

        tracing::info!(records = %self.store.root().display(), "Deployment pipeline complete");
        Ok(report)
    }
}
