//! In-memory chain and verifier used by the pipeline tests.

#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::Mutex,
};

use alloy_core::primitives::{Address, B256, Bytes, U256, keccak256};
use alloy_sol_types::{SolCall, SolEvent, SolValue};
use anyhow::Result;
use raffle_deploy::{
    ArtifactPaths, ChainClient, Log, RaffleConstructorArgs, SourceVerifier, TransactionReceipt,
    VerificationOutcome, VerificationRequest, contracts::VRFCoordinatorV2Mock,
};
use serde_json::{Value, json};
use tempdir::TempDir;

pub const MOCK_BYTECODE: [u8; 3] = [0x60, 0x80, 0x01];
pub const RAFFLE_BYTECODE: [u8; 3] = [0x60, 0x80, 0x02];
pub const SOLC_LONG_VERSION: &str = "0.8.7+commit.e28d00a7";

/// A transaction observed by [`FakeChain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tx {
    DeployMock {
        base_fee: u128,
        gas_price_link: u128,
        confirmations: u64,
    },
    DeployRaffle {
        args: RaffleConstructorArgs,
        confirmations: u64,
    },
    CreateSubscription {
        id: u64,
    },
    FundSubscription {
        id: u64,
        amount: u128,
    },
    AddConsumer {
        id: u64,
        consumer: Address,
    },
}

#[derive(Debug, Default, Clone)]
pub struct FakeSubscription {
    pub balance: u128,
    pub consumers: Vec<Address>,
}

#[derive(Debug, Clone)]
enum Contract {
    Mock {
        subscriptions: BTreeMap<u64, FakeSubscription>,
    },
    Raffle,
}

#[derive(Debug, Default)]
struct State {
    nonce: u64,
    contracts: HashMap<Address, Contract>,
    txs: Vec<Tx>,
}

/// A [`ChainClient`] simulating the coordinator mock in memory.
#[derive(Debug, Default)]
pub struct FakeChain {
    state: Mutex<State>,
    fail_raffle_deploy: bool,
}

impl FakeChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// A chain on which every raffle deployment reverts.
    pub fn failing_raffle_deploy() -> Self {
        Self {
            fail_raffle_deploy: true,
            ..Self::default()
        }
    }

    pub fn txs(&self) -> Vec<Tx> {
        self.state.lock().unwrap().txs.clone()
    }

    pub fn subscription(&self, coordinator: Address, id: u64) -> Option<FakeSubscription> {
        match self.state.lock().unwrap().contracts.get(&coordinator) {
            Some(Contract::Mock { subscriptions }) => subscriptions.get(&id).cloned(),
            _ => None,
        }
    }

    fn receipt(
        state: &mut State,
        contract_address: Option<Address>,
        logs: Vec<Log>,
        confirmations: u64,
    ) -> TransactionReceipt {
        let block_number = state.txs.len() as u64;
        TransactionReceipt {
            transaction_hash: keccak256(block_number.to_be_bytes()),
            block_number,
            contract_address,
            logs,
            confirmations,
        }
    }

    fn mock_subscriptions(
        state: &mut State,
        to: Address,
    ) -> Result<&mut BTreeMap<u64, FakeSubscription>> {
        match state.contracts.get_mut(&to) {
            Some(Contract::Mock { subscriptions }) => Ok(subscriptions),
            _ => anyhow::bail!("execution reverted: {to} is not a coordinator"),
        }
    }
}

impl ChainClient for FakeChain {
    fn deployer(&self) -> Address {
        Address::repeat_byte(0xde)
    }

    async fn deploy(&self, init_code: Bytes, confirmations: u64) -> Result<TransactionReceipt> {
        let mut state = self.state.lock().unwrap();

        let (contract, tx) = if let Some(args) = init_code.strip_prefix(&MOCK_BYTECODE[..]) {
            let (base_fee, gas_price_link) = <(U256, U256)>::abi_decode_params(args, true)?;
            (
                Contract::Mock {
                    subscriptions: BTreeMap::new(),
                },
                Tx::DeployMock {
                    base_fee: base_fee.to(),
                    gas_price_link: gas_price_link.to(),
                    confirmations,
                },
            )
        } else if let Some(args) = init_code.strip_prefix(&RAFFLE_BYTECODE[..]) {
            if self.fail_raffle_deploy {
                anyhow::bail!("Transaction reverted");
            }
            (
                Contract::Raffle,
                Tx::DeployRaffle {
                    args: RaffleConstructorArgs::abi_decode(args)?,
                    confirmations,
                },
            )
        } else {
            anyhow::bail!("Unknown bytecode");
        };

        state.nonce += 1;
        let address = Address::left_padding_from(&state.nonce.to_be_bytes());
        state.contracts.insert(address, contract);
        state.txs.push(tx);
        Ok(Self::receipt(&mut state, Some(address), vec![], confirmations))
    }

    async fn send(
        &self,
        to: Address,
        input: Bytes,
        confirmations: u64,
    ) -> Result<TransactionReceipt> {
        let mut state = self.state.lock().unwrap();
        state.nonce += 1;
        let selector: [u8; 4] = input[..4].try_into()?;

        let (tx, logs) = match selector {
            VRFCoordinatorV2Mock::createSubscriptionCall::SELECTOR => {
                let subscriptions = Self::mock_subscriptions(&mut state, to)?;
                let id = subscriptions.len() as u64 + 1;
                subscriptions.insert(id, FakeSubscription::default());
                let log = Log {
                    address: to,
                    topics: vec![
                        VRFCoordinatorV2Mock::SubscriptionCreated::SIGNATURE_HASH,
                        B256::left_padding_from(&id.to_be_bytes()),
                    ],
                    data: self.deployer().abi_encode().into(),
                };
                (Tx::CreateSubscription { id }, vec![log])
            }
            VRFCoordinatorV2Mock::fundSubscriptionCall::SELECTOR => {
                let call = VRFCoordinatorV2Mock::fundSubscriptionCall::abi_decode(&input, true)?;
                let amount: u128 = call.amount.to();
                let subscription = Self::mock_subscriptions(&mut state, to)?
                    .get_mut(&call.subId)
                    .ok_or_else(|| anyhow::anyhow!("execution reverted: InvalidSubscription"))?;
                subscription.balance += amount;
                (
                    Tx::FundSubscription {
                        id: call.subId,
                        amount,
                    },
                    vec![],
                )
            }
            VRFCoordinatorV2Mock::addConsumerCall::SELECTOR => {
                let call = VRFCoordinatorV2Mock::addConsumerCall::abi_decode(&input, true)?;
                let subscription = Self::mock_subscriptions(&mut state, to)?
                    .get_mut(&call.subId)
                    .ok_or_else(|| anyhow::anyhow!("execution reverted: InvalidSubscription"))?;
                subscription.consumers.push(call.consumer);
                (
                    Tx::AddConsumer {
                        id: call.subId,
                        consumer: call.consumer,
                    },
                    vec![],
                )
            }
            _ => anyhow::bail!("execution reverted: unknown selector"),
        };

        state.txs.push(tx);
        Ok(Self::receipt(&mut state, None, logs, confirmations))
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes> {
        let mut state = self.state.lock().unwrap();
        let call = VRFCoordinatorV2Mock::getSubscriptionCall::abi_decode(&input, true)?;
        let subscription = Self::mock_subscriptions(&mut state, to)?
            .get(&call.subId)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("execution reverted: InvalidSubscription"))?;

        // uint96 and uint64 words are encoded like uint256 ones.
        let output = (
            U256::from(subscription.balance),
            U256::ZERO,
            self.deployer(),
            subscription.consumers,
        )
            .abi_encode_params();
        Ok(output.into())
    }

    async fn code_at(&self, address: Address) -> Result<Bytes> {
        let state = self.state.lock().unwrap();
        Ok(match state.contracts.get(&address) {
            Some(Contract::Mock { .. }) => Bytes::from_static(&MOCK_BYTECODE),
            Some(Contract::Raffle) => Bytes::from_static(&RAFFLE_BYTECODE),
            None => Bytes::new(),
        })
    }
}

/// A [`SourceVerifier`] answering with a fixed outcome and recording requests.
#[derive(Debug)]
pub struct RecordingVerifier {
    outcome: VerificationOutcome,
    requests: Mutex<Vec<VerificationRequest>>,
}

impl RecordingVerifier {
    pub fn new(outcome: VerificationOutcome) -> Self {
        Self {
            outcome,
            requests: Mutex::new(vec![]),
        }
    }

    pub fn requests(&self) -> Vec<VerificationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl SourceVerifier for RecordingVerifier {
    async fn verify(&self, request: &VerificationRequest) -> VerificationOutcome {
        self.requests.lock().unwrap().push(request.clone());
        self.outcome.clone()
    }
}

fn write_json(path: &Path, value: Value) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

/// Write Hardhat artifacts for both contracts under `dir`.
pub fn write_artifacts(dir: &Path) -> ArtifactPaths {
    let artifacts = dir.join("artifacts");
    let mock = artifacts.join("contracts/test/VRFCoordinatorV2Mock.sol/VRFCoordinatorV2Mock.json");
    let raffle = artifacts.join("contracts/Raffle.sol/Raffle.json");

    write_json(
        &mock,
        json!({
            "_format": "hh-sol-artifact-1",
            "contractName": "VRFCoordinatorV2Mock",
            "sourceName": "contracts/test/VRFCoordinatorV2Mock.sol",
            "abi": [],
            "bytecode": format!("0x{}", hex::encode(MOCK_BYTECODE)),
        }),
    );
    write_json(
        &raffle,
        json!({
            "_format": "hh-sol-artifact-1",
            "contractName": "Raffle",
            "sourceName": "contracts/Raffle.sol",
            "abi": [],
            "bytecode": format!("0x{}", hex::encode(RAFFLE_BYTECODE)),
        }),
    );
    write_json(
        &raffle.with_extension("dbg.json"),
        json!({ "_format": "hh-sol-dbg-1", "buildInfo": "../../build-info/raffle.json" }),
    );
    write_json(
        &artifacts.join("build-info/raffle.json"),
        json!({
            "solcVersion": "0.8.7",
            "solcLongVersion": SOLC_LONG_VERSION,
            "input": { "language": "Solidity", "sources": {} },
        }),
    );

    ArtifactPaths {
        mock_coordinator: mock,
        raffle,
    }
}

/// A temporary workspace with artifacts and a deployments directory.
pub struct Workspace {
    pub dir: TempDir,
    pub artifacts: ArtifactPaths,
}

/// Route logs to the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

impl Workspace {
    pub fn new() -> Self {
        init_tracing();
        let dir = TempDir::new("raffle-pipeline").unwrap();
        let artifacts = write_artifacts(dir.path());
        Self { dir, artifacts }
    }

    pub fn outdata(&self) -> PathBuf {
        self.dir.path().join("deployments")
    }
}
