//! RouterServer struct and main run loop.
//!
//! This module contains the RouterServer struct which holds all shared state,
//! and the accept loop that serves each connection on its own task.

use super::client::create_http_client;
use super::forwarding::Forwarder;
use super::handler::{handle_request, RequestHandlerContext};
use super::network::create_reusable_listener;
use crate::config::Config;
use crate::routing::RoutingEngine;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::HeaderName;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// The main router server struct.
pub struct RouterServer {
    config: Arc<Config>,
    engine: RoutingEngine,
    forwarder: Forwarder,
    env_header: HeaderName,
}

impl RouterServer {
    /// Create a new RouterServer from configuration.
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let engine = RoutingEngine::new(&config)?;
        let http_client = create_http_client(&config)?;
        let forwarder = Forwarder::new(http_client, &config.upstream);
        let env_header = HeaderName::from_bytes(config.rollout.env_header.as_bytes())?;

        Ok(Self {
            config: Arc::new(config),
            engine,
            forwarder,
            env_header,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.config.listen.address, self.config.listen.port)
    }

    /// Bind the configured address and serve until the listener fails.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let addr = self.listen_addr();
        let listener = create_reusable_listener(addr)?;
        info!("Listening on http://{}", addr);
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), anyhow::Error> {
        let rollout = self.engine.rollout();
        info!(
            "Routing {} projects (mode={}, percentage={:?}, no_tag_policy={:?}, forced_legacy={:?})",
            self.engine.resolver().projects().len(),
            rollout.mode.as_str(),
            rollout.percentage,
            rollout.no_tag_policy(),
            rollout.forced_legacy_prefixes
        );

        let server = Arc::new(self);

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let server = Arc::clone(&server);

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let server = Arc::clone(&server);
                    async move { server.handle_request_internal(req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!(
                        "Error serving HTTP connection from {}: {}",
                        remote_addr, err
                    );
                }
            });
        }
    }

    async fn handle_request_internal(
        &self,
        req: hyper::Request<hyper::body::Incoming>,
    ) -> Result<hyper::Response<Full<Bytes>>, Infallible> {
        let ctx = RequestHandlerContext {
            engine: &self.engine,
            forwarder: &self.forwarder,
            env_header: &self.env_header,
            default_scheme: self.config.upstream.scheme,
        };

        handle_request(&ctx, req).await
    }
}
