use std::path::PathBuf;

use alloy_core::primitives::Address;
use clap::Parser;
use raffle_deploy::CONFIG_FILENAME;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "raffle")]
#[command(
    author,
    version,
    about = "Deploy a Chainlink VRF raffle, with a local mock oracle on development chains"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "RAFFLE_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// The network to deploy to, as named in the configuration.
    ///
    /// `hardhat`, `localhost` and `anvil` are local chains: a VRF coordinator mock and a funded
    /// subscription are created for them.
    #[arg(short, long, env = "RAFFLE_NETWORK")]
    pub network: Option<String>,

    /// Stage tags to run, comma separated (`all`, `mock`, `raffle`).
    #[arg(
        short,
        long,
        env = "RAFFLE_TAGS",
        value_delimiter = ',',
        default_value = "all"
    )]
    pub tags: Vec<String>,

    /// Path to the configuration file, or to a directory containing it.
    #[arg(long, alias = "conf", default_value = CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Directory where deployment records are written.
    #[arg(long, env = "RAFFLE_OUTDATA")]
    pub outdata: Option<PathBuf>,

    /// The deploying account. Defaults to the first account of the node.
    #[arg(long, env = "RAFFLE_DEPLOYER")]
    pub deployer: Option<Address>,

    /// Save the resolved configuration to a TOML file before deploying.
    #[arg(long)]
    pub save_config: Option<PathBuf>,

    /// Print the resolved configuration as TOML and exit.
    #[arg(long, default_value_t = false)]
    pub print_config: bool,
}
