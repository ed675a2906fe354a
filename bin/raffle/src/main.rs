//! raffle is a CLI tool to deploy a Chainlink VRF raffle to local and public networks.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::{Table, presets::UTF8_FULL};

use cli::Cli;
use raffle_deploy::{DeployConfig, Deployer, PipelineReport};

const CONSTRUCTOR_ARG_NAMES: [&str; 6] = [
    "vrfCoordinator",
    "minimumEntryAmount",
    "gasLane",
    "subscriptionId",
    "callbackGasLimit",
    "interval",
];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let mut config = DeployConfig::load(&cli.config)?;
    if let Some(network) = cli.network {
        config.network = network;
    }
    if let Some(outdata) = cli.outdata {
        config.outdata = outdata;
    }
    if let Some(deployer) = cli.deployer {
        config.deployer = Some(deployer);
    }

    if cli.print_config {
        let content =
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?;
        print!("{content}");
        return Ok(());
    }

    if let Some(path) = &cli.save_config {
        config.save_to_file(path)?;
    }

    tracing::info!(
        network = %config.network,
        tags = ?cli.tags,
        outdata = %config.outdata.display(),
        "Deploying..."
    );

    let report = Deployer::new(config).deploy(&cli.tags).await?;
    println!("{}", summary(&report));

    Ok(())
}

fn summary(report: &PipelineReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["", "Value"]);

    table.add_row(vec!["Network".to_string(), report.network.clone()]);
    table.add_row(vec!["Chain id".to_string(), report.chain_id.to_string()]);
    table.add_row(vec!["Deployer".to_string(), report.deployer.to_string()]);

    if let Some(mock) = &report.mock {
        table.add_row(vec![
            "VRFCoordinatorV2Mock".to_string(),
            mock.address.to_string(),
        ]);
    }

    if let Some(raffle) = &report.raffle {
        let funded = raffle
            .subscription
            .funded_amount
            .map(|amount| amount.to_string())
            .unwrap_or_else(|| "managed externally".to_string());
        table.add_row(vec![
            "Subscription".to_string(),
            format!("{} (funded: {funded})", raffle.subscription.id),
        ]);
        table.add_row(vec!["Raffle".to_string(), raffle.record.address.to_string()]);
        table.add_row(vec![
            "Transaction".to_string(),
            raffle.record.transaction_hash.to_string(),
        ]);

        for (name, value) in CONSTRUCTOR_ARG_NAMES
            .iter()
            .zip(raffle.record.constructor_args.display_values())
        {
            table.add_row(vec![format!("  {name}"), value]);
        }

        let verification = match &raffle.verification {
            Some(outcome) => format!("{outcome:?}"),
            None => "skipped".to_string(),
        };
        table.add_row(vec!["Verification".to_string(), verification]);
    }

    table
}
