//! Rollout configuration: percentage, forced-legacy paths and the no-tag policy.

use super::protocol::DeploymentMode;
use serde::{Deserialize, Serialize};

/// What to do with clients that carry no canary tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoTagPolicy {
    TreatAsNew,
    TreatAsOld,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RolloutConfig {
    #[serde(default)]
    pub mode: DeploymentMode,

    /// Share of bucket space (0-100) routed to the new version.
    /// Falls back to the project default, then the mode default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<u8>,

    /// Path prefixes that always go to the old version, checked in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forced_legacy_prefixes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_tag_policy: Option<NoTagPolicy>,

    /// Honour the environment override header.
    #[serde(default = "default_env_override")]
    pub env_override: bool,

    /// Cookie carrying the client's canary tag.
    #[serde(default = "default_tag_cookie")]
    pub tag_cookie: String,

    /// Request header pinning a request to a named environment.
    #[serde(default = "default_env_header")]
    pub env_header: String,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            mode: DeploymentMode::default(),
            percentage: None,
            forced_legacy_prefixes: Vec::new(),
            no_tag_policy: None,
            env_override: default_env_override(),
            tag_cookie: default_tag_cookie(),
            env_header: default_env_header(),
        }
    }
}

fn default_env_override() -> bool {
    true
}

fn default_tag_cookie() -> String {
    "x-gray-tag".to_string()
}

fn default_env_header() -> String {
    "x-gray-env".to_string()
}

impl RolloutConfig {
    pub fn no_tag_policy(&self) -> NoTagPolicy {
        self.no_tag_policy
            .unwrap_or_else(|| self.mode.default_no_tag_policy())
    }

    pub fn effective_percentage(&self, project_default: Option<u8>) -> u8 {
        self.percentage
            .or(project_default)
            .unwrap_or_else(|| self.mode.default_percentage())
    }

    /// First forced-legacy prefix the path starts with.
    pub fn forced_legacy_prefix(&self, path: &str) -> Option<&str> {
        self.forced_legacy_prefixes
            .iter()
            .map(String::as_str)
            .find(|prefix| path.starts_with(prefix))
    }
}

/// Parse a string-encoded rollout percentage.
///
/// Accepts a leading decimal integer the way deployment variables are usually
/// written (`"50"`, `" 30"`, `"42.9"`, `"75%"`) and clamps it to 0-100.
/// Returns `None` when no digits can be read.
pub fn parse_percentage(raw: &str) -> Option<u8> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    if negative {
        return Some(0);
    }

    // Long digit runs saturate instead of failing.
    let value = digits[..end].parse::<u64>().unwrap_or(u64::MAX);
    Some(value.min(100) as u8)
}

/// Parse a comma-separated prefix list, dropping blank entries.
pub fn parse_prefix_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_percentage_plain() {
        assert_eq!(parse_percentage("50"), Some(50));
        assert_eq!(parse_percentage("0"), Some(0));
        assert_eq!(parse_percentage("100"), Some(100));
    }

    #[test]
    fn test_parse_percentage_truncates() {
        assert_eq!(parse_percentage("42.9"), Some(42));
        assert_eq!(parse_percentage("  30"), Some(30));
        assert_eq!(parse_percentage("75%"), Some(75));
        assert_eq!(parse_percentage("+12"), Some(12));
    }

    #[test]
    fn test_parse_percentage_clamps() {
        assert_eq!(parse_percentage("150"), Some(100));
        assert_eq!(parse_percentage("-5"), Some(0));
        assert_eq!(parse_percentage("99999999999999999999999"), Some(100));
    }

    #[test]
    fn test_parse_percentage_rejects_garbage() {
        assert_eq!(parse_percentage(""), None);
        assert_eq!(parse_percentage("abc"), None);
        assert_eq!(parse_percentage("-"), None);
        assert_eq!(parse_percentage("  "), None);
    }

    #[test]
    fn test_parse_prefix_list() {
        assert_eq!(
            parse_prefix_list("/legacy, /old-api ,,"),
            vec!["/legacy".to_string(), "/old-api".to_string()]
        );
        assert!(parse_prefix_list("").is_empty());
        assert!(parse_prefix_list(" , ").is_empty());
    }

    #[test]
    fn test_forced_legacy_prefix_first_match() {
        let rollout = RolloutConfig {
            forced_legacy_prefixes: vec!["/legacy".to_string(), "/leg".to_string()],
            ..Default::default()
        };
        assert_eq!(rollout.forced_legacy_prefix("/legacy/users"), Some("/legacy"));
        assert_eq!(rollout.forced_legacy_prefix("/leg"), Some("/leg"));
        assert_eq!(rollout.forced_legacy_prefix("/dashboard"), None);
    }

    #[test]
    fn test_effective_percentage_layers() {
        let mut rollout = RolloutConfig::default();
        assert_eq!(rollout.effective_percentage(None), 100);
        assert_eq!(rollout.effective_percentage(Some(20)), 20);

        rollout.percentage = Some(0);
        assert_eq!(rollout.effective_percentage(Some(20)), 0);
    }

    #[test]
    fn test_no_tag_policy_follows_mode() {
        let mut rollout = RolloutConfig::default();
        assert_eq!(rollout.no_tag_policy(), NoTagPolicy::TreatAsOld);

        rollout.mode = DeploymentMode::Online;
        assert_eq!(rollout.no_tag_policy(), NoTagPolicy::TreatAsNew);

        rollout.no_tag_policy = Some(NoTagPolicy::TreatAsOld);
        assert_eq!(rollout.no_tag_policy(), NoTagPolicy::TreatAsOld);
    }

    #[test]
    fn test_rollout_yaml() {
        let yaml = r#"
mode: online
percentage: 25
forced_legacy_prefixes: ["/legacy"]
no_tag_policy: treat-as-old
tag_cookie: tag
"#;
        let rollout: RolloutConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rollout.mode, DeploymentMode::Online);
        assert_eq!(rollout.percentage, Some(25));
        assert_eq!(rollout.no_tag_policy(), NoTagPolicy::TreatAsOld);
        assert_eq!(rollout.tag_cookie, "tag");
        assert_eq!(rollout.env_header, "x-gray-env");
        assert!(rollout.env_override);
    }
}
