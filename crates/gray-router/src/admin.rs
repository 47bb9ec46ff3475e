//! Admin listener: health check and Prometheus metrics.

use crate::metrics::collect_metrics;
use anyhow::Context;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Admin server for health probes and metric scrapes.
pub struct AdminServer {
    listener: TcpListener,
}

impl AdminServer {
    /// Bind the admin address; a port conflict is returned to the caller.
    pub async fn bind(addr: SocketAddr) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind admin listener on {addr}"))?;
        info!("Admin endpoint listening on http://{}", listener.local_addr()?);
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) -> Result<(), anyhow::Error> {
        serve(self.listener).await
    }
}

pub async fn serve(listener: TcpListener) -> Result<(), anyhow::Error> {
    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            let service =
                service_fn(|req: Request<hyper::body::Incoming>| async move {
                    Ok::<_, Infallible>(route_request(&req))
                });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Admin connection error: {}", e);
            }
        });
    }
}

pub fn route_request<B>(req: &Request<B>) -> Response<Full<Bytes>> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/health") => handle_health(),
        (&Method::GET, "/metrics") => handle_metrics(),
        _ => json_response(
            StatusCode::NOT_FOUND,
            &serde_json::json!({"error": "Not Found"}),
        ),
    }
}

/// GET /health - Health check
pub fn handle_health() -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &serde_json::json!({"status": "ok"}))
}

/// GET /metrics - Prometheus metrics
pub fn handle_metrics() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(collect_metrics())));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static(PROMETHEUS_CONTENT_TYPE),
    );
    response
}

fn json_response(status: StatusCode, body: &serde_json::Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn get(path: &str) -> Request<()> {
        Request::builder().uri(path).body(()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = route_request(&get("/health"));
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_metrics() {
        crate::metrics::record_decision("web", "canary", "new");

        let response = route_request(&get("/metrics"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            PROMETHEUS_CONTENT_TYPE
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("gray_router_routing_decisions_total"));
    }

    #[tokio::test]
    async fn test_bind_conflict_fails() {
        let first = AdminServer::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = first.local_addr().unwrap();

        let err = AdminServer::bind(addr).await.err().unwrap();
        assert!(err.to_string().contains("Failed to bind admin listener"));
    }

    #[test]
    fn test_unknown_path() {
        assert_eq!(route_request(&get("/nope")).status(), StatusCode::NOT_FOUND);

        let post = Request::builder()
            .method(Method::POST)
            .uri("/health")
            .body(())
            .unwrap();
        assert_eq!(route_request(&post).status(), StatusCode::NOT_FOUND);
    }
}
