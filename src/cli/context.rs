use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rapidtap_policy_center::{load_snapshot_with_options, LoadOptions, PolicySnapshot};

use super::output::OutputFormat;

pub struct CliContext {
    policy_paths: Vec<PathBuf>,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(policy_paths: Vec<PathBuf>, output: OutputFormat) -> Self {
        Self {
            policy_paths,
            output,
        }
    }

    pub fn policy_paths(&self) -> &[PathBuf] {
        &self.policy_paths
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    /// Defaults, then the policy files, then the environment layers.
    pub fn load_policy(&self) -> Result<PolicySnapshot> {
        for path in &self.policy_paths {
            ensure_exists(path)?;
        }
        let options = LoadOptions {
            paths: self.policy_paths.clone(),
            include_env: true,
            include_cli_env: true,
        };
        load_snapshot_with_options(&options).context("Failed to load policy")
    }
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        anyhow::bail!("policy file {} does not exist", path.display())
    }
}
