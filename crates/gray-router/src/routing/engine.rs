//! The routing decision engine.
//!
//! Rules are evaluated in a fixed order and the first one that applies picks
//! the target hostname:
//!
//! 1. whitelist passthrough
//! 2. environment override header
//! 3. forced-legacy path prefix
//! 4. canary bucket from the tag cookie
//! 5. no-tag policy

use std::collections::HashSet;

use tracing::debug;

use super::context::RoutingContext;
use super::extract::parse_cookies;
use super::hash::hash_to_bucket;
use super::resolver::{label_count, MatchKind, Project, ProjectResolver, Resolution};
use crate::config::{interpolate, Config, NoTagPolicy, RolloutConfig};

/// Which rule produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingRule {
    Whitelist,
    EnvOverride,
    ForcedLegacy,
    Canary,
    NoTag,
}

impl RoutingRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingRule::Whitelist => "whitelist",
            RoutingRule::EnvOverride => "env_override",
            RoutingRule::ForcedLegacy => "forced_legacy",
            RoutingRule::Canary => "canary",
            RoutingRule::NoTag => "no_tag",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    New,
    Old,
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::New => "new",
            Version::Old => "old",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Hostname the request is forwarded to.
    pub target: String,
    pub rule: RoutingRule,
    /// Unset for whitelist passthrough and environment overrides.
    pub version: Option<Version>,
    /// Set only when a tag cookie was bucketed.
    pub bucket: Option<u8>,
    /// Unset for whitelist passthrough.
    pub project: Option<String>,
}

impl Decision {
    pub fn version_label(&self) -> &'static str {
        self.version.map(|v| v.as_str()).unwrap_or("none")
    }

    pub fn project_label(&self) -> &str {
        self.project.as_deref().unwrap_or("none")
    }
}

/// Immutable routing state shared by every request.
pub struct RoutingEngine {
    whitelist: HashSet<String>,
    resolver: ProjectResolver,
    rollout: RolloutConfig,
}

impl RoutingEngine {
    pub fn new(config: &Config) -> Result<Self, anyhow::Error> {
        let resolver = ProjectResolver::new(&config.projects, config.default_project_index())
            .map_err(|e| anyhow::anyhow!(e))?;

        Ok(RoutingEngine {
            whitelist: config.whitelist.iter().cloned().collect(),
            resolver,
            rollout: config.rollout.clone(),
        })
    }

    pub fn rollout(&self) -> &RolloutConfig {
        &self.rollout
    }

    pub fn resolver(&self) -> &ProjectResolver {
        &self.resolver
    }

    pub fn is_whitelisted(&self, hostname: &str) -> bool {
        self.whitelist.contains(hostname)
    }

    pub fn decide(&self, ctx: &RoutingContext) -> Decision {
        let hostname = ctx.url.hostname.as_str();

        if self.is_whitelisted(hostname) {
            return Decision {
                target: hostname.to_string(),
                rule: RoutingRule::Whitelist,
                version: None,
                bucket: None,
                project: None,
            };
        }

        let resolution = self.resolver.resolve(hostname);
        let project = resolution.project;

        if let Some(env) = self.env_override(ctx) {
            return Decision {
                target: project.config.env_domain(env),
                rule: RoutingRule::EnvOverride,
                version: None,
                bucket: None,
                project: Some(project.name().to_string()),
            };
        }

        if let Some(prefix) = self.rollout.forced_legacy_prefix(ctx.url.path()) {
            debug!("Path {} forced to legacy by prefix {}", ctx.url.path(), prefix);
            return self.versioned(&resolution, hostname, RoutingRule::ForcedLegacy, Version::Old, None);
        }

        let tag = ctx
            .cookie_header
            .as_deref()
            .and_then(|header| parse_cookies(header).remove(&self.rollout.tag_cookie));

        match tag {
            Some(tag) => {
                let bucket = hash_to_bucket(&tag);
                let percentage = self
                    .rollout
                    .effective_percentage(project.config.default_percentage);
                let version = if bucket < percentage {
                    Version::New
                } else {
                    Version::Old
                };
                self.versioned(&resolution, hostname, RoutingRule::Canary, version, Some(bucket))
            }
            None => {
                let version = match self.rollout.no_tag_policy() {
                    NoTagPolicy::TreatAsNew => Version::New,
                    NoTagPolicy::TreatAsOld => Version::Old,
                };
                self.versioned(&resolution, hostname, RoutingRule::NoTag, version, None)
            }
        }
    }

    fn env_override<'c>(&self, ctx: &'c RoutingContext) -> Option<&'c str> {
        if !self.rollout.env_override {
            return None;
        }
        ctx.env_override
            .as_deref()
            .map(str::trim)
            .filter(|env| !env.is_empty())
    }

    fn versioned(
        &self,
        resolution: &Resolution<'_>,
        hostname: &str,
        rule: RoutingRule,
        version: Version,
        bucket: Option<u8>,
    ) -> Decision {
        let project = resolution.project;
        let target = match version {
            Version::New => new_domain(project, resolution.kind, hostname),
            Version::Old => project.config.old_domain(),
        };

        Decision {
            target,
            rule,
            version: Some(version),
            bucket,
            project: Some(project.name().to_string()),
        }
    }
}

/// New-version domain, carrying the leading label over when the project asks
/// for it and the hostname has exactly the matched pattern's shape.
fn new_domain(project: &Project, kind: MatchKind, hostname: &str) -> String {
    let config = &project.config;
    if let (true, MatchKind::Pattern { labels }, Some(template)) =
        (config.preserve_subdomain, kind, config.new_version_template.as_deref())
    {
        if label_count(hostname) == labels {
            if let Some(subdomain) = hostname.split('.').next().filter(|s| !s.is_empty()) {
                return interpolate(template, subdomain);
            }
        }
    }
    config.default_new_domain()
}
