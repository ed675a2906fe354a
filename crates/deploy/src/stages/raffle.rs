//! Raffle deployment.
//!
//! On ephemeral networks the raffle is wired to the mock coordinator through a freshly created
//! and funded subscription. On remote networks the configured coordinator and subscription are
//! used as is, and the deployed source is submitted for verification when a verifier is
//! available.

use std::path::Path;

use alloy_core::primitives::{Address, U256};
use anyhow::{Context, Result};

use crate::{
    artifact::ContractArtifact,
    chain::ChainClient,
    config::NetworkParameters,
    contracts::{MockCoordinator, RaffleConstructorArgs},
    environment::EnvironmentProfile,
    store::{
        DeploymentRecord, DeploymentStore, MockOracleDeployment, RAFFLE_NAME, Subscription,
        now_timestamp,
    },
    verify::{SourceVerifier, VerificationOutcome, VerificationRequest, verify_deployment},
};

/// LINK a local subscription is funded with (30 LINK).
pub const VRF_SUB_FUND_AMOUNT: u128 = 30_000_000_000_000_000_000;

/// Context of the raffle stage.
pub struct DeploymentContext<'a, C, V> {
    pub chain: &'a C,
    pub profile: &'a EnvironmentProfile,
    pub params: &'a NetworkParameters,
    pub store: &'a DeploymentStore,
    /// Artifact of the raffle contract.
    pub artifact: &'a Path,
    /// Mock coordinator deployed by the mock stage, if any.
    pub mock: Option<&'a MockOracleDeployment>,
    /// Source verifier. Only used on remote networks.
    pub verifier: Option<&'a V>,
}

/// Outcome of the raffle stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaffleDeployment {
    pub record: DeploymentRecord,
    pub subscription: Subscription,
    /// `None` when verification was not attempted.
    pub verification: Option<VerificationOutcome>,
}

/// Deploy the raffle contract.
pub async fn deploy_raffle<C: ChainClient, V: SourceVerifier>(
    ctx: DeploymentContext<'_, C, V>,
) -> Result<RaffleDeployment> {
    // Fail on a missing artifact before sending any transaction.
    let artifact = ContractArtifact::load(ctx.artifact)?;

    let (vrf_coordinator, subscription) = if ctx.profile.is_ephemeral {
        let address = local_coordinator(&ctx)?;
        let subscription = open_local_subscription(ctx.chain, address).await?;
        (address, subscription)
    } else {
        let (address, id) = ctx.params.remote_subscription()?;
        tracing::info!(
            coordinator = %address,
            subscription_id = id,
            "Using configured coordinator and subscription"
        );
        (
            address,
            Subscription {
                id,
                funded_amount: None,
            },
        )
    };

    let args = RaffleConstructorArgs {
        vrf_coordinator,
        minimum_entry_amount: ctx.params.minimum_entry_amount,
        gas_lane: ctx.params.gas_lane,
        subscription_id: subscription.id,
        callback_gas_limit: ctx.params.callback_gas_limit,
        interval: U256::from(ctx.params.interval),
    };

    tracing::info!(
        network = %ctx.profile.name,
        confirmations = ctx.profile.confirmations,
        "Deploying Raffle..."
    );
    let receipt = ctx
        .chain
        .deploy(artifact.init_code(&args.abi_encode()), ctx.profile.confirmations)
        .await
        .context("Failed to deploy Raffle")?;

    let address = receipt
        .contract_address
        .context("Raffle receipt has no contract address")?;

    let record = DeploymentRecord {
        name: RAFFLE_NAME.to_string(),
        address,
        constructor_args: args,
        transaction_hash: receipt.transaction_hash,
        block_number: receipt.block_number,
        confirmations: receipt.confirmations,
        deployed_at: now_timestamp(),
    };
    ctx.store.save(RAFFLE_NAME, &record)?;
    tracing::info!(address = %address, tx_hash = %receipt.transaction_hash, "Raffle deployed");

    if ctx.profile.is_ephemeral {
        MockCoordinator::new(ctx.chain, vrf_coordinator)
            .add_consumer(subscription.id, address)
            .await?;
    }

    let verification = match ctx.verifier {
        Some(verifier) if !ctx.profile.is_ephemeral => {
            Some(verify_raffle(verifier, &artifact, ctx.profile.chain_id, &record).await)
        }
        _ => {
            tracing::debug!("Skipping source verification");
            None
        }
    };

    Ok(RaffleDeployment {
        record,
        subscription,
        verification,
    })
}

/// Address of the mock coordinator bootstrapped in this run.
///
/// Only the mock stage output is trusted, since it checked the code is live.
fn local_coordinator<C, V>(ctx: &DeploymentContext<'_, C, V>) -> Result<Address> {
    ctx.mock.map(|mock| mock.address).with_context(|| {
        format!(
            "No mock coordinator deployed on `{}`; run the `mock` stage first",
            ctx.profile.name
        )
    })
}

/// Create a subscription on the mock and fund it up to [`VRF_SUB_FUND_AMOUNT`].
async fn open_local_subscription<C: ChainClient>(
    chain: &C,
    coordinator: Address,
) -> Result<Subscription> {
    let coordinator = MockCoordinator::new(chain, coordinator);
    let id = coordinator.create_subscription().await?;

    let balance = coordinator.subscription_balance(id).await?;
    let shortfall = VRF_SUB_FUND_AMOUNT.saturating_sub(balance);
    if shortfall > 0 {
        coordinator.fund_subscription(id, shortfall).await?;
    } else {
        tracing::info!(subscription_id = id, balance, "Subscription already funded");
    }

    let funded_amount = coordinator.subscription_balance(id).await?;
    Ok(Subscription {
        id,
        funded_amount: Some(funded_amount),
    })
}

async fn verify_raffle<V: SourceVerifier>(
    verifier: &V,
    artifact: &ContractArtifact,
    chain_id: u64,
    record: &DeploymentRecord,
) -> VerificationOutcome {
    match verification_request(artifact, chain_id, record) {
        Ok(request) => verify_deployment(verifier, &request).await,
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "Cannot verify Raffle");
            VerificationOutcome::Failed(format!("{err:#}"))
        }
    }
}

fn verification_request(
    artifact: &ContractArtifact,
    chain_id: u64,
    record: &DeploymentRecord,
) -> Result<VerificationRequest> {
    let build_info = artifact
        .build_info()
        .context("Failed to load build info for verification")?;

    Ok(VerificationRequest {
        chain_id,
        address: record.address,
        contract_name: artifact.fully_qualified_name(),
        compiler_version: build_info.solc_long_version,
        source: build_info.input,
        constructor_args: record.constructor_args.abi_encode(),
    })
}
