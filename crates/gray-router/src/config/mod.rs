//! Configuration types for the gray router.

mod listen;
mod project;
mod protocol;
mod rollout;
mod upstream;

use std::collections::HashSet;
use std::path::Path;

use hyper::header::HeaderName;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use listen::{ListenConfig, MetricsConfig};
pub use project::{interpolate, ProjectConfig, ENV_PLACEHOLDER};
pub use protocol::{DeploymentMode, Protocol};
pub use rollout::{parse_percentage, parse_prefix_list, NoTagPolicy, RolloutConfig};
pub use upstream::{ConnectionPoolConfig, UpstreamConfig};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub listen: ListenConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub connection_pool: ConnectionPoolConfig,
    #[serde(default)]
    pub rollout: RolloutConfig,

    /// Hostnames that are forwarded untouched (apex and API domains).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub whitelist: Vec<String>,

    /// Project every unmatched hostname resolves to. Defaults to the first project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_project: Option<String>,

    pub projects: Vec<ProjectConfig>,
}

/// Startup overrides coming from the environment or the command line.
///
/// Values stay string-encoded until applied so a malformed deployment variable
/// degrades to the configured default instead of aborting.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub percentage: Option<String>,
    pub forced_legacy_prefixes: Option<String>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.projects.is_empty() {
            anyhow::bail!("At least one project must be configured");
        }

        let mut names = HashSet::new();
        for project in &self.projects {
            project.validate().map_err(|e| anyhow::anyhow!(e))?;
            if !names.insert(project.name.as_str()) {
                anyhow::bail!("Duplicate project name: '{}'", project.name);
            }
        }

        if let Some(ref name) = self.default_project {
            if !names.contains(name.as_str()) {
                anyhow::bail!("default_project '{name}' does not name a configured project");
            }
        }

        if let Some(percentage) = self.rollout.percentage {
            if percentage > 100 {
                anyhow::bail!("rollout.percentage {percentage} exceeds 100");
            }
        }

        if self.rollout.tag_cookie.trim().is_empty() {
            anyhow::bail!("rollout.tag_cookie must not be empty");
        }

        HeaderName::from_bytes(self.rollout.env_header.as_bytes()).map_err(|e| {
            anyhow::anyhow!(
                "rollout.env_header '{}' is not a valid header name: {e}",
                self.rollout.env_header
            )
        })?;

        Ok(())
    }

    /// Index of the project unmatched hostnames fall back to.
    pub fn default_project_index(&self) -> usize {
        self.default_project
            .as_ref()
            .and_then(|name| self.projects.iter().position(|p| &p.name == name))
            .unwrap_or(0)
    }

    /// Apply environment/CLI overrides on top of the file configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(port) = overrides.port {
            self.listen.port = port;
        }

        if let Some(ref raw) = overrides.percentage {
            match parse_percentage(raw) {
                Some(percentage) => {
                    info!("Rollout percentage overridden to {}%", percentage);
                    self.rollout.percentage = Some(percentage);
                }
                None => warn!(
                    "Ignoring unparseable rollout percentage {:?}; keeping {:?}",
                    raw, self.rollout.percentage
                ),
            }
        }

        if let Some(ref raw) = overrides.forced_legacy_prefixes {
            self.rollout.forced_legacy_prefixes = parse_prefix_list(raw);
        }
    }
}
