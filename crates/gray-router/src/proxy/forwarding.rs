//! Request forwarding with a single fallback to the original host.
//!
//! Bodies are buffered in both directions: the request so the fallback can
//! replay it, the response so a partial upstream reply is never relayed.

use super::client::HttpClient;
use crate::config::UpstreamConfig;
use crate::metrics;
use crate::routing::RequestUrl;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE, HOST};
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, warn};

const SERVICE_UNAVAILABLE_BODY: &str = "Service Unavailable";

/// Set on every outbound attempt. An inbound request carrying it has already
/// passed through a router and is not routed again.
pub const HOP_HEADER: HeaderName = HeaderName::from_static("x-gray-router-hop");

/// Why one outbound attempt failed.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid target '{target}': {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: hyper::http::Error,
    },

    #[error("upstream request failed: {0}")]
    Client(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read upstream response body: {0}")]
    Body(#[from] hyper::Error),

    #[error("upstream request timed out after {0:?}")]
    Timeout(Duration),
}

impl ForwardError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ForwardError::InvalidTarget { .. } => "invalid_target",
            ForwardError::Client(e) if e.is_connect() => "connect",
            ForwardError::Client(_) => "client",
            ForwardError::Body(_) => "body",
            ForwardError::Timeout(_) => "timeout",
        }
    }
}

/// An inbound request with its body already collected.
#[derive(Debug, Clone)]
pub struct BufferedRequest {
    pub method: Method,
    pub url: RequestUrl,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// The fixed reply sent when neither the routed target nor the original host answered.
pub fn service_unavailable() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(
        SERVICE_UNAVAILABLE_BODY.as_bytes(),
    )));
    *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain"),
    );
    response
}

/// Sends buffered requests to upstream origins.
pub struct Forwarder {
    client: HttpClient,
    timeout: Duration,
    port_override: Option<u16>,
    fallback: bool,
}

impl Forwarder {
    pub fn new(client: HttpClient, upstream: &UpstreamConfig) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(upstream.request_timeout_secs),
            port_override: upstream.port,
            fallback: upstream.fallback,
        }
    }

    /// Forward to `target`; on failure re-issue once to the host the request
    /// was addressed to, then give up with a 503.
    pub async fn forward_with_fallback(
        &self,
        req: &BufferedRequest,
        target: &str,
    ) -> Response<Full<Bytes>> {
        let err = match self.send(req, target).await {
            Ok(response) => return response,
            Err(e) => e,
        };
        metrics::record_upstream_failure("primary", err.reason());

        if !self.fallback {
            warn!("Upstream {} failed: {}; fallback disabled", target, err);
            return service_unavailable();
        }

        warn!(
            "Upstream {} failed: {}; falling back to {}",
            target, err, req.url.hostname
        );

        match self.send(req, &req.url.hostname).await {
            Ok(response) => {
                metrics::record_fallback(true);
                response
            }
            Err(e) => {
                metrics::record_upstream_failure("fallback", e.reason());
                metrics::record_fallback(false);
                error!("Fallback to {} failed: {}", req.url.hostname, e);
                service_unavailable()
            }
        }
    }

    /// One outbound attempt, response body included, bounded by the timeout.
    pub async fn send(
        &self,
        req: &BufferedRequest,
        host: &str,
    ) -> Result<Response<Full<Bytes>>, ForwardError> {
        let uri = req
            .url
            .to_uri(host, self.port_override)
            .map_err(|source| ForwardError::InvalidTarget {
                target: host.to_string(),
                source,
            })?;

        debug!("Forwarding {} {}", req.method, uri);

        let mut upstream_req = Request::new(Full::new(req.body.clone()));
        *upstream_req.method_mut() = req.method.clone();
        *upstream_req.uri_mut() = uri;
        // The client derives Host from the rewritten URI.
        for (key, value) in req.headers.iter() {
            if *key != HOST {
                upstream_req.headers_mut().append(key, value.clone());
            }
        }
        upstream_req
            .headers_mut()
            .insert(HOP_HEADER, HeaderValue::from_static("1"));

        let start = Instant::now();
        let attempt = async {
            let upstream_response = self.client.request(upstream_req).await?;
            let (parts, body) = upstream_response.into_parts();
            let body_bytes = body.collect().await?.to_bytes();
            Ok::<_, ForwardError>(Response::from_parts(parts, Full::new(body_bytes)))
        };

        let response = tokio::time::timeout(self.timeout, attempt)
            .await
            .map_err(|_| ForwardError::Timeout(self.timeout))??;

        metrics::record_upstream_duration(
            req.method.as_str(),
            response.status().as_u16(),
            start.elapsed().as_secs_f64() * 1000.0,
        );

        Ok(response)
    }
}
