//! Hardhat compilation artifacts.

use std::path::{Path, PathBuf};

use alloy_core::primitives::Bytes;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// A compiled contract, as written by Hardhat (`hh-sol-artifact-1`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    pub contract_name: String,
    pub source_name: String,
    pub bytecode: Bytes,
    /// Path the artifact was loaded from.
    #[serde(skip)]
    pub path: PathBuf,
}

/// Debug file written next to each artifact, pointing at its build info.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: PathBuf,
}

/// The compiler input and version that produced an artifact.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub solc_long_version: String,
    /// Standard JSON input of the compilation.
    pub input: Value,
}

impl ContractArtifact {
    /// Load an artifact from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read artifact {}", path.display()))?;
        let mut artifact: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse artifact {}", path.display()))?;

        if artifact.bytecode.is_empty() {
            anyhow::bail!(
                "Artifact {} has no bytecode; is {} abstract?",
                path.display(),
                artifact.contract_name
            );
        }

        artifact.path = path.to_path_buf();
        Ok(artifact)
    }

    /// The creation code with encoded constructor arguments appended.
    pub fn init_code(&self, constructor_args: &[u8]) -> Bytes {
        [self.bytecode.as_ref(), constructor_args].concat().into()
    }

    /// The `source:name` identifier of the contract.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }

    /// Load the build info of the artifact through its `.dbg.json` file.
    pub fn build_info(&self) -> Result<BuildInfo> {
        let dbg_path = self.path.with_extension("dbg.json");
        let content = std::fs::read_to_string(&dbg_path)
            .with_context(|| format!("Failed to read {}", dbg_path.display()))?;
        let dbg: DebugFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", dbg_path.display()))?;

        // The build info path is relative to the debug file.
        let build_info_path = dbg_path
            .parent()
            .context("Artifact path has no parent directory")?
            .join(dbg.build_info);

        let content = std::fs::read_to_string(&build_info_path)
            .with_context(|| format!("Failed to read build info {}", build_info_path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse build info {}", build_info_path.display()))
    }
}
