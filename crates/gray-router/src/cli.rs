use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::config::ConfigOverrides;

/// Gray-release traffic router
#[derive(Debug, Clone, Parser)]
#[command(name = "gray-router", version, about = "Gray-release traffic router")]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "GRAY_ROUTER_CONFIG", default_value = "gray-router.yaml")]
    pub config: PathBuf,

    /// Override the listen port from the configuration file
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Rollout percentage (0-100); unparseable values are ignored
    #[arg(long, env = "GRAY_PERCENTAGE")]
    pub gray_percentage: Option<String>,

    /// Comma-separated path prefixes always served by the old version
    #[arg(long, env = "ALWAYS_OLD_ROUTES")]
    pub always_old_routes: Option<String>,

    /// Log output format
    #[arg(long, env = "GRAY_ROUTER_LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

impl Args {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port,
            percentage: self.gray_percentage.clone(),
            forced_legacy_prefixes: self.always_old_routes.clone(),
        }
    }
}
