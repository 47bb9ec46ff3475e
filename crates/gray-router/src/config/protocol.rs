//! Protocol and deployment mode types.

use serde::{Deserialize, Serialize};

use super::rollout::NoTagPolicy;

/// Scheme used for outbound requests when the inbound request does not carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    /// Origins are static-site hosts served over TLS, so this is the default.
    #[default]
    Https,
}

impl Protocol {
    /// Get protocol name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }

    /// Parse protocol from URL scheme
    pub fn from_scheme(scheme: &str) -> Result<Self, String> {
        match scheme.to_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            _ => Err(format!("Unsupported protocol scheme: {scheme}")),
        }
    }
}

/// Deployment mode for the router.
///
/// Offline (staging) and online (production upgrade) deployments share one
/// engine; the mode only selects defaults that explicit config can override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentMode {
    /// Staging deployment: unseen clients stay on the old version.
    #[default]
    Offline,
    /// Production upgrade: unseen clients move to the new version.
    Online,
}

impl DeploymentMode {
    pub fn default_no_tag_policy(&self) -> NoTagPolicy {
        match self {
            DeploymentMode::Offline => NoTagPolicy::TreatAsOld,
            DeploymentMode::Online => NoTagPolicy::TreatAsNew,
        }
    }

    /// Rollout percentage used when neither the deployment nor the project sets one.
    pub fn default_percentage(&self) -> u8 {
        100
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentMode::Offline => "offline",
            DeploymentMode::Online => "online",
        }
    }
}
