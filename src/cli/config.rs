//! Shared configuration arguments for CLI commands

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AgentConfig;

/// Arguments every command that builds an agent or a level accepts
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// JSON configuration file (missing fields use defaults)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,

    /// Step cap per episode
    #[arg(long)]
    pub max_steps: Option<usize>,
}

impl CommonArgs {
    /// Load the configuration file (or defaults) and apply overrides.
    pub fn load(&self) -> Result<AgentConfig> {
        let mut config = match &self.config {
            Some(path) => AgentConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => AgentConfig::new(),
        };
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(max_steps) = self.max_steps {
            config = config.with_max_steps(max_steps);
        }
        Ok(config)
    }
}
