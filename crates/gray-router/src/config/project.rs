//! Per-project domain configuration.

use serde::{Deserialize, Serialize};

/// Placeholder replaced inside domain templates.
pub const ENV_PLACEHOLDER: &str = "{env}";

/// A frontend project: which hostnames it claims and where its versions live.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
    pub name: String,

    /// Exact hostnames, checked before any pattern.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_domains: Vec<String>,

    /// Wildcard patterns with at most one `*`, e.g. `*.example.com`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_patterns: Vec<String>,

    /// Template used for environment overrides, e.g. `{env}-h5.pages.dev`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_template: Option<String>,

    /// Template for the new version, e.g. `{env}.web-next.pages.dev`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_version_template: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_new_domain: Option<String>,

    /// Legacy origin. Defaults to the new domain when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_version_domain: Option<String>,

    /// Copy the leading label of a pattern-matched hostname into
    /// `new_version_template` (`app.example.com` -> `app.web-next.pages.dev`).
    #[serde(default)]
    pub preserve_subdomain: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_percentage: Option<u8>,
}

/// Replace the first `{env}` in `template` with `value`.
pub fn interpolate(template: &str, value: &str) -> String {
    template.replacen(ENV_PLACEHOLDER, value, 1)
}

impl ProjectConfig {
    /// Plain new-version domain, without sub-domain preservation.
    pub fn default_new_domain(&self) -> String {
        match (&self.default_new_domain, &self.new_version_template) {
            (Some(domain), _) => domain.clone(),
            (None, Some(template)) => interpolate(template, &self.name),
            // rejected by validate()
            (None, None) => self.name.clone(),
        }
    }

    pub fn old_domain(&self) -> String {
        self.old_version_domain
            .clone()
            .unwrap_or_else(|| self.default_new_domain())
    }

    /// Domain for an explicit environment override.
    pub fn env_domain(&self, env: &str) -> String {
        match self
            .env_template
            .as_deref()
            .or(self.new_version_template.as_deref())
        {
            Some(template) => interpolate(template, env),
            None => self.default_new_domain(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Project name must not be empty".to_string());
        }

        if self.default_new_domain.is_none() && self.new_version_template.is_none() {
            return Err(format!(
                "Project '{}' needs 'default_new_domain' or 'new_version_template'",
                self.name
            ));
        }

        if self.preserve_subdomain && self.new_version_template.is_none() {
            return Err(format!(
                "Project '{}' sets 'preserve_subdomain' without a 'new_version_template'",
                self.name
            ));
        }

        for pattern in &self.match_patterns {
            if pattern.is_empty() {
                return Err(format!("Project '{}' has an empty match pattern", self.name));
            }
            if pattern.matches('*').count() > 1 {
                return Err(format!(
                    "Pattern '{}' in project '{}' has more than one '*'",
                    pattern, self.name
                ));
            }
        }

        if let Some(percentage) = self.default_percentage {
            if percentage > 100 {
                return Err(format!(
                    "Project '{}' default_percentage {} exceeds 100",
                    self.name, percentage
                ));
            }
        }

        Ok(())
    }
}
