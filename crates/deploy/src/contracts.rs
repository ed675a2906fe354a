//! ABI bindings of the deployed contracts.

use alloy_core::primitives::{Address, B256, Bytes, U256, aliases::U96};
use alloy_sol_types::{SolCall, SolEvent, SolValue, sol};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::chain::{ChainClient, TransactionReceipt};

sol! {
    /// The subset of the Chainlink `VRFCoordinatorV2Mock` used by the pipeline.
    interface VRFCoordinatorV2Mock {
        event SubscriptionCreated(uint64 indexed subId, address owner);
        event SubscriptionFunded(uint64 indexed subId, uint256 oldBalance, uint256 newBalance);
        event ConsumerAdded(uint64 indexed subId, address consumer);

        function createSubscription() external returns (uint64 subId);
        function fundSubscription(uint64 subId, uint96 amount) external;
        function addConsumer(uint64 subId, address consumer) external;
        function getSubscription(uint64 subId)
            external
            view
            returns (uint96 balance, uint64 reqCount, address owner, address[] memory consumers);
    }
}

/// The Solidity tuple of the raffle constructor.
pub type RaffleConstructorTuple = (Address, U256, B256, u64, u32, U256);

/// Constructor arguments of the raffle contract, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaffleConstructorArgs {
    pub vrf_coordinator: Address,
    pub minimum_entry_amount: U256,
    pub gas_lane: B256,
    pub subscription_id: u64,
    pub callback_gas_limit: u32,
    pub interval: U256,
}

impl RaffleConstructorArgs {
    /// The arguments as the positional constructor tuple.
    pub fn to_tuple(&self) -> RaffleConstructorTuple {
        (
            self.vrf_coordinator,
            self.minimum_entry_amount,
            self.gas_lane,
            self.subscription_id,
            self.callback_gas_limit,
            self.interval,
        )
    }

    /// ABI-encode the arguments, as appended to the creation bytecode.
    pub fn abi_encode(&self) -> Bytes {
        self.to_tuple().abi_encode_params().into()
    }

    /// Decode ABI-encoded constructor arguments.
    pub fn abi_decode(data: &[u8]) -> Result<Self> {
        let (
            vrf_coordinator,
            minimum_entry_amount,
            gas_lane,
            subscription_id,
            callback_gas_limit,
            interval,
        ) = RaffleConstructorTuple::abi_decode_params(data, true)
            .context("Failed to decode raffle constructor arguments")?;

        Ok(Self {
            vrf_coordinator,
            minimum_entry_amount,
            gas_lane,
            subscription_id,
            callback_gas_limit,
            interval,
        })
    }

    /// The arguments rendered for display, in order.
    pub fn display_values(&self) -> [String; 6] {
        [
            self.vrf_coordinator.to_string(),
            self.minimum_entry_amount.to_string(),
            self.gas_lane.to_string(),
            self.subscription_id.to_string(),
            self.callback_gas_limit.to_string(),
            self.interval.to_string(),
        ]
    }
}

/// Encode the mock coordinator constructor arguments `(uint96 baseFee, uint96 gasPriceLink)`.
pub fn encode_mock_constructor(base_fee: u128, gas_price_link: u128) -> Result<Bytes> {
    U96::try_from(base_fee)
        .map_err(|_| anyhow::anyhow!("Base fee {} does not fit in uint96", base_fee))?;
    U96::try_from(gas_price_link).map_err(|_| {
        anyhow::anyhow!("Gas price link {} does not fit in uint96", gas_price_link)
    })?;

    // A uint96 is encoded like a uint256 once it is known to fit.
    let encoded = (U256::from(base_fee), U256::from(gas_price_link)).abi_encode_params();
    Ok(encoded.into())
}

/// Extract the subscription id from the receipt of `createSubscription`.
///
/// The id is the first argument of the first event of the transaction.
pub fn subscription_id_from_receipt(receipt: &TransactionReceipt) -> Result<u64> {
    let log = receipt
        .logs
        .first()
        .context("createSubscription emitted no event")?;

    let signature = log.topics.first().context("Event has no signature topic")?;
    if *signature != VRFCoordinatorV2Mock::SubscriptionCreated::SIGNATURE_HASH {
        anyhow::bail!(
            "First event is not SubscriptionCreated (topic {})",
            signature
        );
    }

    let sub_id = log
        .topics
        .get(1)
        .context("SubscriptionCreated has no subscription id topic")?;

    let (padding, id) = sub_id.split_at(24);
    if padding.iter().any(|byte| *byte != 0) {
        anyhow::bail!("Subscription id {} does not fit in uint64", sub_id);
    }
    let id: [u8; 8] = id.try_into().context("Malformed subscription id topic")?;
    Ok(u64::from_be_bytes(id))
}

/// A deployed coordinator, driven through a [`ChainClient`].
pub struct MockCoordinator<'a, C> {
    chain: &'a C,
    address: Address,
}

impl<'a, C: ChainClient> MockCoordinator<'a, C> {
    pub fn new(chain: &'a C, address: Address) -> Self {
        Self { chain, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Create a subscription and return its id.
    pub async fn create_subscription(&self) -> Result<u64> {
        let input = VRFCoordinatorV2Mock::createSubscriptionCall {}.abi_encode();
        let receipt = self
            .chain
            .send(self.address, input.into(), 1)
            .await
            .context("createSubscription transaction failed")?;

        let id = subscription_id_from_receipt(&receipt)?;
        tracing::info!(
            subscription_id = id,
            tx_hash = %receipt.transaction_hash,
            "Subscription created"
        );
        Ok(id)
    }

    /// Fund a subscription with `amount` wei of LINK.
    pub async fn fund_subscription(&self, subscription_id: u64, amount: u128) -> Result<()> {
        let amount_u96 = U96::try_from(amount)
            .map_err(|_| anyhow::anyhow!("Funding amount {} does not fit in uint96", amount))?;
        let input = VRFCoordinatorV2Mock::fundSubscriptionCall {
            subId: subscription_id,
            amount: amount_u96,
        }
        .abi_encode();

        let receipt = self
            .chain
            .send(self.address, input.into(), 1)
            .await
            .context("fundSubscription transaction failed")?;

        tracing::info!(
            subscription_id,
            amount,
            tx_hash = %receipt.transaction_hash,
            "Subscription funded"
        );
        Ok(())
    }

    /// Register a consumer contract on a subscription.
    pub async fn add_consumer(&self, subscription_id: u64, consumer: Address) -> Result<()> {
        let input = VRFCoordinatorV2Mock::addConsumerCall {
            subId: subscription_id,
            consumer,
        }
        .abi_encode();

        let receipt = self
            .chain
            .send(self.address, input.into(), 1)
            .await
            .context("addConsumer transaction failed")?;

        tracing::info!(
            subscription_id,
            consumer = %consumer,
            tx_hash = %receipt.transaction_hash,
            "Consumer registered"
        );
        Ok(())
    }

    /// Current balance of a subscription, in wei of LINK.
    pub async fn subscription_balance(&self, subscription_id: u64) -> Result<u128> {
        let input = VRFCoordinatorV2Mock::getSubscriptionCall {
            subId: subscription_id,
        }
        .abi_encode();

        let output = self
            .chain
            .call(self.address, input.into())
            .await
            .context("getSubscription call failed")?;

        let subscription =
            VRFCoordinatorV2Mock::getSubscriptionCall::abi_decode_returns(&output, true)
                .context("Failed to decode getSubscription output")?;

        Ok(subscription.balance.to::<u128>())
    }
}
