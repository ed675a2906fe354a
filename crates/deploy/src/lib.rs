//! raffle-deploy - Deployment library for the Raffle contract.
//!
//! This crate deploys a Chainlink VRF-backed raffle. On local development chains it first
//! bootstraps a VRF coordinator mock and a funded subscription; on public networks it wires
//! the raffle to the configured coordinator and submits the source for verification.

pub mod artifact;
pub mod chain;
pub mod config;
pub mod contracts;
mod deployer;
pub mod environment;
pub mod pipeline;
pub mod rpc;
pub mod stages;
pub mod store;
pub mod verify;

pub use artifact::{BuildInfo, ContractArtifact};
pub use chain::{ChainClient, Log, RpcChain, TransactionReceipt};
pub use config::{
    ArtifactPaths, CONFIG_FILENAME, DeployConfig, NetworkEntry, NetworkParameters, NetworkTable,
    VerificationConfig,
};
pub use contracts::{MockCoordinator, RaffleConstructorArgs};
pub use deployer::{Deployer, source_verifier};
pub use environment::{EnvironmentProfile, is_ephemeral_network};
pub use pipeline::{Pipeline, PipelineReport};
pub use stages::{RaffleDeployment, Stage, select_stages};
pub use store::{DeploymentRecord, DeploymentStore, MockOracleDeployment, Subscription};
pub use verify::{
    EtherscanVerifier, SourceVerifier, VerificationOutcome, VerificationRequest,
    verify_deployment,
};
