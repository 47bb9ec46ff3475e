//! Listen and metrics configuration.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default = "default_listen_address")]
    pub address: IpAddr,
    pub port: u16,
    /// Number of worker threads (0 = auto-detect CPU count)
    #[serde(default)]
    pub workers: usize,
}

impl ListenConfig {
    pub fn worker_threads(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}

fn default_listen_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

/// Admin listener serving `/health` and `/metrics`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_defaults() {
        let listen: ListenConfig = serde_yaml::from_str("port: 8080").unwrap();
        assert_eq!(listen.address, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(listen.workers, 0);
        assert!(listen.worker_threads() >= 1);
    }

    #[test]
    fn test_explicit_workers() {
        let listen: ListenConfig = serde_yaml::from_str("port: 8080\nworkers: 3").unwrap();
        assert_eq!(listen.worker_threads(), 3);
    }
}
