//! Request handling: decide the target, forward, record.

use super::forwarding::{service_unavailable, BufferedRequest, Forwarder, HOP_HEADER};
use crate::config::Protocol;
use crate::metrics;
use crate::routing::{RoutingContext, RoutingEngine};
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::HeaderName;
use hyper::{Request, Response};
use std::convert::Infallible;
use tracing::{debug, warn};

/// Shared state every request is handled against.
pub struct RequestHandlerContext<'a> {
    pub engine: &'a RoutingEngine,
    pub forwarder: &'a Forwarder,
    pub env_header: &'a HeaderName,
    pub default_scheme: Protocol,
}

/// Route one inbound request and relay the upstream response.
pub async fn handle_request<B>(
    ctx: &RequestHandlerContext<'_>,
    req: Request<B>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let start_time = std::time::Instant::now();

    if req.headers().contains_key(&HOP_HEADER) {
        warn!(
            "Refusing to route {} {}: request already passed through the router",
            req.method(),
            req.uri()
        );
        metrics::record_loop_rejected();
        metrics::record_request(req.method().as_str(), 503);
        return Ok(service_unavailable());
    }

    let routing_ctx = RoutingContext::from_request(&req, ctx.default_scheme, ctx.env_header);
    let decision = ctx.engine.decide(&routing_ctx);

    debug!(
        "Routing {} {}{} -> {} (project={}, rule={}, version={}, bucket={:?})",
        req.method(),
        routing_ctx.url.hostname,
        routing_ctx.url.path_and_query,
        decision.target,
        decision.project_label(),
        decision.rule.as_str(),
        decision.version_label(),
        decision.bucket
    );
    metrics::record_decision(
        decision.project_label(),
        decision.rule.as_str(),
        decision.version_label(),
    );

    let (parts, body) = req.into_parts();
    let method = parts.method;

    let response = match body.collect().await {
        Ok(collected) => {
            let buffered = BufferedRequest {
                method: method.clone(),
                url: routing_ctx.url,
                headers: parts.headers,
                body: collected.to_bytes(),
            };
            ctx.forwarder
                .forward_with_fallback(&buffered, &decision.target)
                .await
        }
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            service_unavailable()
        }
    };

    let status = response.status().as_u16();
    let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
    metrics::record_proxy_duration(method.as_str(), duration_ms, decision.rule.as_str());
    metrics::record_request(method.as_str(), status);

    Ok(response)
}
