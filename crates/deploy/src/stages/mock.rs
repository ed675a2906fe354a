//! Mock oracle bootstrap.

use std::path::Path;

use anyhow::{Context, Result};

use crate::{
    artifact::ContractArtifact,
    chain::ChainClient,
    contracts::encode_mock_constructor,
    environment::EnvironmentProfile,
    store::{DeploymentStore, MOCK_COORDINATOR_NAME, MockOracleDeployment, now_timestamp},
};

/// Flat LINK fee charged per randomness request by the mock (0.25 LINK).
pub const BASE_FEE: u128 = 250_000_000_000_000_000;

/// LINK per gas charged by the mock.
pub const GAS_PRICE_LINK: u128 = 1_000_000_000;

/// Context of the mock stage.
pub struct BootstrapContext<'a, C> {
    pub chain: &'a C,
    pub profile: &'a EnvironmentProfile,
    pub store: &'a DeploymentStore,
    /// Artifact of the coordinator mock. Only read when a deployment is needed.
    pub artifact: &'a Path,
}

/// Deploy the VRF coordinator mock on ephemeral networks.
///
/// Returns `None` on remote networks, which have a real coordinator. A mock recorded by a
/// previous run is reused when its code is still on chain and its costs match.
pub async fn bootstrap_mock_coordinator<C: ChainClient>(
    ctx: BootstrapContext<'_, C>,
) -> Result<Option<MockOracleDeployment>> {
    if !ctx.profile.is_ephemeral {
        tracing::info!(network = %ctx.profile.name, "Remote network, skipping mock coordinator");
        return Ok(None);
    }

    if let Some(existing) = ctx.store.load::<MockOracleDeployment>(MOCK_COORDINATOR_NAME)? {
        if existing.base_fee == BASE_FEE && existing.gas_price_link == GAS_PRICE_LINK {
            let code = ctx.chain.code_at(existing.address).await?;
            if !code.is_empty() {
                tracing::info!(address = %existing.address, "Mock coordinator already deployed, reusing it");
                return Ok(Some(existing));
            }
        }
        tracing::debug!(address = %existing.address, "Recorded mock coordinator is stale");
    }

    tracing::info!(
        network = %ctx.profile.name,
        base_fee = BASE_FEE,
        gas_price_link = GAS_PRICE_LINK,
        "Local network detected, deploying mock coordinator..."
    );

    let artifact = ContractArtifact::load(ctx.artifact)?;
    let constructor_args = encode_mock_constructor(BASE_FEE, GAS_PRICE_LINK)?;
    let receipt = ctx
        .chain
        .deploy(artifact.init_code(&constructor_args), ctx.profile.confirmations)
        .await
        .context("Failed to deploy mock coordinator")?;

    let address = receipt
        .contract_address
        .context("Mock coordinator receipt has no contract address")?;

    let deployment = MockOracleDeployment {
        address,
        base_fee: BASE_FEE,
        gas_price_link: GAS_PRICE_LINK,
        transaction_hash: receipt.transaction_hash,
        deployed_at: now_timestamp(),
    };
    ctx.store.save(MOCK_COORDINATOR_NAME, &deployment)?;

    tracing::info!(address = %address, tx_hash = %receipt.transaction_hash, "Mock coordinator deployed");
    Ok(Some(deployment))
}
