//! Outbound request and connection pool configuration.

use super::protocol::Protocol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Scheme assumed for inbound requests that carry neither an absolute URI
    /// nor `x-forwarded-proto`.
    #[serde(default)]
    pub scheme: Protocol,
    /// Pin every outbound connection to this port instead of the inbound one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Upper bound for one outbound attempt, response body included.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Re-issue the original request once when the routed fetch fails.
    #[serde(default = "default_fallback")]
    pub fallback: bool,
    /// Static hostname pins that bypass DNS.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resolve: BTreeMap<String, IpAddr>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            scheme: Protocol::default(),
            port: None,
            request_timeout_secs: default_request_timeout(),
            fallback: default_fallback(),
            resolve: BTreeMap::new(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}

fn default_fallback() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionPoolConfig {
    #[serde(default = "default_pool_max_idle_per_host")]
    pub max_idle_per_host: usize,

    #[serde(default = "default_pool_idle_timeout")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_keepalive_timeout")]
    pub keepalive_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: default_pool_max_idle_per_host(),
            idle_timeout_secs: default_pool_idle_timeout(),
            keepalive_timeout_secs: default_keepalive_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_pool_max_idle_per_host() -> usize {
    100
}

fn default_pool_idle_timeout() -> u64 {
    90
}

fn default_keepalive_timeout() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_defaults() {
        let upstream: UpstreamConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(upstream.scheme, Protocol::Https);
        assert_eq!(upstream.port, None);
        assert_eq!(upstream.request_timeout_secs, 30);
        assert!(upstream.fallback);
        assert!(upstream.resolve.is_empty());
    }

    #[test]
    fn test_upstream_resolve_pins() {
        let yaml = r#"
scheme: http
port: 8443
fallback: false
resolve:
  app.new.test: 127.0.0.1
  legacy.test: "::1"
"#;
        let upstream: UpstreamConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(upstream.scheme, Protocol::Http);
        assert_eq!(upstream.port, Some(8443));
        assert!(!upstream.fallback);
        assert_eq!(
            upstream.resolve.get("app.new.test"),
            Some(&"127.0.0.1".parse::<IpAddr>().unwrap())
        );
        assert_eq!(upstream.resolve.len(), 2);
    }

    #[test]
    fn test_pool_defaults() {
        let pool = ConnectionPoolConfig::default();
        assert_eq!(pool.max_idle_per_host, 100);
        assert_eq!(pool.connect_timeout_secs, 5);
    }
}
