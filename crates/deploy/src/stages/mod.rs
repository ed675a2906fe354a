//! Pipeline stages and their selection.
//!
//! The stage order is fixed: Mock -> Raffle. Each stage is registered under the `all` tag and
//! its own name; selecting a stage also selects the stages it depends on.

pub mod mock;
pub mod raffle;

use std::collections::BTreeSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

pub use mock::{BASE_FEE, BootstrapContext, GAS_PRICE_LINK, bootstrap_mock_coordinator};
pub use raffle::{DeploymentContext, RaffleDeployment, VRF_SUB_FUND_AMOUNT, deploy_raffle};

/// Tag selecting every stage.
pub const ALL_TAG: &str = "all";

/// A pipeline stage, in execution order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Deploy the VRF coordinator mock on ephemeral networks.
    Mock,
    /// Deploy the raffle contract.
    Raffle,
}

impl Stage {
    /// Tags this stage is registered under.
    pub fn tags(&self) -> [&'static str; 2] {
        match self {
            Stage::Mock => [ALL_TAG, "mock"],
            Stage::Raffle => [ALL_TAG, "raffle"],
        }
    }

    /// Stages that must run before this one.
    pub fn dependencies(&self) -> &'static [Stage] {
        match self {
            Stage::Mock => &[],
            Stage::Raffle => &[Stage::Mock],
        }
    }
}

/// Select the stages registered under any of `tags`, with their dependencies.
///
/// The result is in execution order. Unknown tags are rejected.
pub fn select_stages<S: AsRef<str>>(tags: &[S]) -> Result<Vec<Stage>> {
    if tags.is_empty() {
        anyhow::bail!("No stage tags given");
    }

    let mut selected = BTreeSet::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        let matching: Vec<Stage> = Stage::iter()
            .filter(|stage| stage.tags().contains(&tag))
            .collect();

        if matching.is_empty() {
            let known: BTreeSet<&str> = Stage::iter().flat_map(|stage| stage.tags()).collect();
            anyhow::bail!(
                "Unknown tag `{}`; known tags: {}",
                tag,
                known.into_iter().collect::<Vec<_>>().join(", ")
            );
        }

        for stage in matching {
            add_with_dependencies(stage, &mut selected);
        }
    }

    // `Stage` orders by declaration, which is the execution order.
    Ok(selected.into_iter().collect())
}

fn add_with_dependencies(stage: Stage, selected: &mut BTreeSet<Stage>) {
    if selected.insert(stage) {
        for dependency in stage.dependencies() {
            add_with_dependencies(*dependency, selected);
        }
    }
}
