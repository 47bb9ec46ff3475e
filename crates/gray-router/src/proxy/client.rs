//! HTTP client creation and configuration.
//!
//! One pooled client is shared by every request. Hostnames listed under
//! `upstream.resolve` are answered from configuration instead of DNS.

use crate::config::Config;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper_util::client::legacy::connect::dns::{GaiResolver, Name};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::collections::BTreeMap;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;
use tracing::{debug, info, warn};

/// Type alias for the HTTP client used by the router.
pub type HttpClient =
    Client<hyper_rustls::HttpsConnector<HttpConnector<PinnedResolver>>, Full<Bytes>>;

type ResolveFuture =
    Pin<Box<dyn Future<Output = Result<std::vec::IntoIter<SocketAddr>, std::io::Error>> + Send>>;

/// DNS resolver that answers pinned hostnames from a static table and
/// delegates everything else to the system resolver.
///
/// The connector fills in the port, so pinned entries resolve to port 0.
#[derive(Clone)]
pub struct PinnedResolver {
    pins: Arc<BTreeMap<String, IpAddr>>,
    system: GaiResolver,
}

impl PinnedResolver {
    pub fn new(pins: BTreeMap<String, IpAddr>) -> Self {
        Self {
            pins: Arc::new(pins),
            system: GaiResolver::new(),
        }
    }
}

impl Service<Name> for PinnedResolver {
    type Response = std::vec::IntoIter<SocketAddr>;
    type Error = std::io::Error;
    type Future = ResolveFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.system.poll_ready(cx)
    }

    fn call(&mut self, name: Name) -> Self::Future {
        if let Some(ip) = self.pins.get(name.as_str()) {
            debug!("Resolved {} from static pin {}", name.as_str(), ip);
            let addrs = vec![SocketAddr::new(*ip, 0)];
            return Box::pin(async move { Ok(addrs.into_iter()) });
        }

        let lookup = self.system.call(name);
        Box::pin(async move {
            let addrs: Vec<SocketAddr> = lookup.await?.collect();
            Ok(addrs.into_iter())
        })
    }
}

/// Create the shared HTTP client with connection pooling.
pub fn create_http_client(config: &Config) -> Result<HttpClient, anyhow::Error> {
    // Both ring and aws-lc-rs end up compiled in; pick one explicitly.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let mut http_connector = HttpConnector::new_with_resolver(PinnedResolver::new(
        config.upstream.resolve.clone(),
    ));
    http_connector.set_keepalive(Some(Duration::from_secs(
        config.connection_pool.keepalive_timeout_secs,
    )));
    http_connector.set_connect_timeout(Some(Duration::from_secs(
        config.connection_pool.connect_timeout_secs,
    )));
    http_connector.enforce_http(false); // Allow both HTTP and HTTPS

    let builder = match hyper_rustls::HttpsConnectorBuilder::new().with_native_roots() {
        Ok(builder) => builder,
        Err(e) => {
            warn!(
                "Failed to load native root certificates ({}); HTTPS origins will fail verification",
                e
            );
            hyper_rustls::HttpsConnectorBuilder::new().with_tls_config(
                rustls::ClientConfig::builder()
                    .with_root_certificates(rustls::RootCertStore::empty())
                    .with_no_client_auth(),
            )
        }
    };
    let https_connector = builder
        .https_or_http()
        .enable_http1()
        .wrap_connector(http_connector);

    let http_client = Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(
            config.connection_pool.idle_timeout_secs,
        ))
        .pool_max_idle_per_host(config.connection_pool.max_idle_per_host)
        .build(https_connector);

    info!(
        "Connection pool configured (HTTP/1.1): max_idle={}, idle_timeout={}s, keepalive={}s, pinned_hosts={}",
        config.connection_pool.max_idle_per_host,
        config.connection_pool.idle_timeout_secs,
        config.connection_pool.keepalive_timeout_secs,
        config.upstream.resolve.len()
    );

    Ok(http_client)
}
