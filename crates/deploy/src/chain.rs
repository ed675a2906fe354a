//! Access to the execution environment.
//!
//! [`ChainClient`] is the seam between the pipeline and the chain. [`RpcChain`] implements it
//! over JSON-RPC, with transactions signed by the node (`eth_sendTransaction`).

use std::{future::Future, time::Duration};

use alloy_core::primitives::{Address, B256, Bytes, U64};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::rpc;

/// Interval between two receipt polls.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A log emitted by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// A mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    /// Address of the created contract, for deployments.
    pub contract_address: Option<Address>,
    pub logs: Vec<Log>,
    /// Confirmations observed when the receipt was returned.
    pub confirmations: u64,
}

/// The operations the pipeline needs from the execution environment.
///
/// Transactions are sent from the deployer account, and the returned futures only
/// resolve once the transaction is mined with the requested number of confirmations.
pub trait ChainClient: Send + Sync {
    /// The account acting as the deploying party.
    fn deployer(&self) -> Address;

    /// Deploy a contract. `init_code` is the bytecode followed by the encoded constructor
    /// arguments.
    fn deploy(
        &self,
        init_code: Bytes,
        confirmations: u64,
    ) -> impl Future<Output = Result<TransactionReceipt>> + Send;

    /// Send a transaction to a contract.
    fn send(
        &self,
        to: Address,
        input: Bytes,
        confirmations: u64,
    ) -> impl Future<Output = Result<TransactionReceipt>> + Send;

    /// Execute a read-only call against the latest block.
    fn call(&self, to: Address, input: Bytes) -> impl Future<Output = Result<Bytes>> + Send;

    /// Code deployed at an address. Empty if there is no contract.
    fn code_at(&self, address: Address) -> impl Future<Output = Result<Bytes>> + Send;
}

/// Receipt as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: B256,
    block_number: U64,
    #[serde(default)]
    status: Option<U64>,
    #[serde(default)]
    contract_address: Option<Address>,
    #[serde(default)]
    logs: Vec<Log>,
}

/// Transaction object for `eth_sendTransaction`.
#[derive(Debug, Serialize)]
struct TransactionRequest {
    from: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<Address>,
    data: Bytes,
}

/// A [`ChainClient`] talking to a JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcChain {
    client: reqwest::Client,
    url: Url,
    deployer: Address,
    receipt_timeout: Duration,
}

impl RpcChain {
    /// Connect to a JSON-RPC endpoint.
    ///
    /// Fails if the endpoint reports a chain id other than `expected_chain_id`. If no deployer is
    /// given, the first account managed by the node is used.
    pub async fn connect(
        url: &str,
        expected_chain_id: u64,
        deployer: Option<Address>,
        receipt_timeout: Duration,
    ) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid RPC URL: {url}"))?;
        let client = rpc::create_client()?;

        let chain_id: String = rpc::json_rpc_call(&client, url.as_str(), "eth_chainId", vec![])
            .await
            .with_context(|| format!("Failed to reach RPC endpoint {url}"))?;
        let chain_id = rpc::parse_quantity(&chain_id)?;
        if chain_id != expected_chain_id {
            anyhow::bail!(
                "RPC endpoint {} serves chain id {}, expected {}",
                url,
                chain_id,
                expected_chain_id
            );
        }

        let deployer = match deployer {
            Some(deployer) => deployer,
            None => {
                let accounts: Vec<Address> =
                    rpc::json_rpc_call(&client, url.as_str(), "eth_accounts", vec![])
                        .await
                        .context("Failed to list node accounts")?;
                *accounts.first().context(
                    "The node manages no accounts; configure `deployer` explicitly",
                )?
            }
        };

        tracing::info!(url = %url, chain_id, deployer = %deployer, "Connected to chain");

        Ok(Self {
            client,
            url,
            deployer,
            receipt_timeout,
        })
    }

    async fn block_number(&self) -> Result<u64> {
        let number: String =
            rpc::json_rpc_call(&self.client, self.url.as_str(), "eth_blockNumber", vec![]).await?;
        rpc::parse_quantity(&number)
    }

    async fn send_transaction(
        &self,
        request: TransactionRequest,
        confirmations: u64,
    ) -> Result<TransactionReceipt> {
        let tx_hash: B256 = rpc::json_rpc_call(
            &self.client,
            self.url.as_str(),
            "eth_sendTransaction",
            vec![json!(request)],
        )
        .await
        .context("Failed to send transaction")?;

        tracing::debug!(tx_hash = %tx_hash, "Transaction sent, waiting for receipt");

        self.wait_for_receipt(tx_hash, confirmations).await
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: B256,
        confirmations: u64,
    ) -> Result<TransactionReceipt> {
        let receipt = rpc::wait_until(
            &format!("receipt of {tx_hash}"),
            self.receipt_timeout,
            RECEIPT_POLL_INTERVAL,
            || async {
                rpc::json_rpc_call::<Option<RpcReceipt>>(
                    &self.client,
                    self.url.as_str(),
                    "eth_getTransactionReceipt",
                    vec![json!(tx_hash)],
                )
                .await
            },
        )
        .await?;

        if receipt.status.is_some_and(|status| status.is_zero()) {
            anyhow::bail!("Transaction {} reverted", tx_hash);
        }

        let mined_at = receipt.block_number.to::<u64>();
        let confirmations = confirmations.max(1);

        let observed = rpc::wait_until(
            &format!("{confirmations} confirmations of {tx_hash}"),
            self.receipt_timeout,
            RECEIPT_POLL_INTERVAL,
            || async {
                let head = self.block_number().await?;
                let observed = head.saturating_sub(mined_at) + 1;
                Ok((observed >= confirmations).then_some(observed))
            },
        )
        .await?;

        Ok(TransactionReceipt {
            transaction_hash: receipt.transaction_hash,
            block_number: mined_at,
            contract_address: receipt.contract_address,
            logs: receipt.logs,
            confirmations: observed,
        })
    }
}

impl ChainClient for RpcChain {
    fn deployer(&self) -> Address {
        self.deployer
    }

    async fn deploy(&self, init_code: Bytes, confirmations: u64) -> Result<TransactionReceipt> {
        let request = TransactionRequest {
            from: self.deployer,
            to: None,
            data: init_code,
        };
        let receipt = self.send_transaction(request, confirmations).await?;
        if receipt.contract_address.is_none() {
            anyhow::bail!(
                "Deployment transaction {} created no contract",
                receipt.transaction_hash
            );
        }
        Ok(receipt)
    }

    async fn send(
        &self,
        to: Address,
        input: Bytes,
        confirmations: u64,
    ) -> Result<TransactionReceipt> {
        let request = TransactionRequest {
            from: self.deployer,
            to: Some(to),
            data: input,
        };
        self.send_transaction(request, confirmations).await
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes> {
        rpc::json_rpc_call(
            &self.client,
            self.url.as_str(),
            "eth_call",
            vec![json!({ "to": to, "data": input }), json!("latest")],
        )
        .await
    }

    async fn code_at(&self, address: Address) -> Result<Bytes> {
        rpc::json_rpc_call(
            &self.client,
            self.url.as_str(),
            "eth_getCode",
            vec![json!(address), json!("latest")],
        )
        .await
    }
}
