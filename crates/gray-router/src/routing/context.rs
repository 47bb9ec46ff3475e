//! Per-request routing inputs.

use super::extract::RequestSignals;
use crate::config::Protocol;
use hyper::header::{HeaderName, HOST};
use hyper::http::uri::{Authority, Uri};
use hyper::Request;

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// The parts of the inbound URL the router reads or carries forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUrl {
    pub scheme: Protocol,
    /// Hostname as received, port stripped.
    pub hostname: String,
    pub port: Option<u16>,
    /// Path and query exactly as received.
    pub path_and_query: String,
}

impl RequestUrl {
    pub fn new(scheme: Protocol, hostname: impl Into<String>, path_and_query: &str) -> Self {
        Self {
            scheme,
            hostname: hostname.into(),
            port: None,
            path_and_query: if path_and_query.is_empty() {
                "/".to_string()
            } else {
                path_and_query.to_string()
            },
        }
    }

    /// Read scheme, hostname and path from an inbound request.
    ///
    /// The hostname comes from an absolute-form URI when present, otherwise from
    /// the `Host` header. A missing or malformed host yields an empty hostname.
    pub fn from_request<B>(req: &Request<B>, default_scheme: Protocol) -> Self {
        let uri = req.uri();

        let (hostname, port) = match uri.authority() {
            Some(authority) => (authority.host().to_string(), authority.port_u16()),
            None => req
                .headers()
                .get(HOST)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<Authority>().ok())
                .map(|a| (a.host().to_string(), a.port_u16()))
                .unwrap_or_default(),
        };

        let scheme = uri
            .scheme_str()
            .or_else(|| {
                req.headers()
                    .get(X_FORWARDED_PROTO)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.split(',').next())
                    .map(str::trim)
            })
            .and_then(|s| Protocol::from_scheme(s).ok())
            .unwrap_or(default_scheme);

        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
            .to_string();

        Self {
            scheme,
            hostname,
            port,
            path_and_query,
        }
    }

    pub fn path(&self) -> &str {
        match self.path_and_query.split_once('?') {
            Some((path, _)) => path,
            None => &self.path_and_query,
        }
    }

    pub fn query(&self) -> Option<&str> {
        self.path_and_query.split_once('?').map(|(_, q)| q)
    }

    /// Build the outbound URI for `host`, keeping scheme, path and query.
    /// `port_override` wins over the inbound port.
    pub fn to_uri(&self, host: &str, port_override: Option<u16>) -> Result<Uri, hyper::http::Error> {
        let authority = match port_override.or(self.port) {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Uri::builder()
            .scheme(self.scheme.as_str())
            .authority(authority)
            .path_and_query(self.path_and_query.as_str())
            .build()
    }
}

/// Everything the decision engine needs from one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingContext {
    pub url: RequestUrl,
    pub cookie_header: Option<String>,
    pub env_override: Option<String>,
}

impl RoutingContext {
    pub fn new(url: RequestUrl) -> Self {
        Self {
            url,
            cookie_header: None,
            env_override: None,
        }
    }

    pub fn from_request<B>(
        req: &Request<B>,
        default_scheme: Protocol,
        env_header: &HeaderName,
    ) -> Self {
        let signals = RequestSignals::from_headers(req.headers(), env_header);
        Self {
            url: RequestUrl::from_request(req, default_scheme),
            cookie_header: signals.cookie_header,
            env_override: signals.env_override,
        }
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie_header = Some(cookie.into());
        self
    }

    pub fn with_env_override(mut self, env: impl Into<String>) -> Self {
        self.env_override = Some(env.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_header() -> HeaderName {
        HeaderName::from_static("x-gray-env")
    }

    #[test]
    fn test_from_origin_form_request() {
        let req = Request::builder()
            .uri("/dashboard?tab=1&sort=desc")
            .header(HOST, "app.example.com:8443")
            .body(())
            .unwrap();

        let url = RequestUrl::from_request(&req, Protocol::Https);
        assert_eq!(url.scheme, Protocol::Https);
        assert_eq!(url.hostname, "app.example.com");
        assert_eq!(url.port, Some(8443));
        assert_eq!(url.path(), "/dashboard");
        assert_eq!(url.query(), Some("tab=1&sort=desc"));
    }

    #[test]
    fn test_from_absolute_form_request() {
        let req = Request::builder()
            .uri("http://app.example.com/a/b")
            .header(HOST, "ignored.example.com")
            .body(())
            .unwrap();

        let url = RequestUrl::from_request(&req, Protocol::Https);
        assert_eq!(url.scheme, Protocol::Http);
        assert_eq!(url.hostname, "app.example.com");
        assert_eq!(url.port, None);
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_forwarded_proto() {
        let req = Request::builder()
            .uri("/")
            .header(HOST, "app.example.com")
            .header(X_FORWARDED_PROTO, "http, https")
            .body(())
            .unwrap();
        assert_eq!(RequestUrl::from_request(&req, Protocol::Https).scheme, Protocol::Http);

        let req = Request::builder()
            .uri("/")
            .header(HOST, "app.example.com")
            .header(X_FORWARDED_PROTO, "gopher")
            .body(())
            .unwrap();
        assert_eq!(RequestUrl::from_request(&req, Protocol::Https).scheme, Protocol::Https);
    }

    #[test]
    fn test_missing_host() {
        let req = Request::builder().uri("/x").body(()).unwrap();
        let url = RequestUrl::from_request(&req, Protocol::Https);
        assert_eq!(url.hostname, "");
        assert_eq!(url.port, None);
    }

    #[test]
    fn test_to_uri_preserves_path_and_query() {
        let url = RequestUrl::new(
            Protocol::Https,
            "app.example.com",
            "/p/a%20th?q=1&q=2&empty=",
        );
        let uri = url.to_uri("app.web-next.pages.dev", None).unwrap();
        assert_eq!(
            uri.to_string(),
            "https://app.web-next.pages.dev/p/a%20th?q=1&q=2&empty="
        );
    }

    #[test]
    fn test_to_uri_port() {
        let mut url = RequestUrl::new(Protocol::Http, "app.example.com", "/");
        url.port = Some(8080);
        assert_eq!(
            url.to_uri("target.dev", None).unwrap().to_string(),
            "http://target.dev:8080/"
        );
        assert_eq!(
            url.to_uri("target.dev", Some(9000)).unwrap().to_string(),
            "http://target.dev:9000/"
        );
        assert_eq!(
            url.to_uri(&url.hostname, None).unwrap().to_string(),
            "http://app.example.com:8080/"
        );
    }

    #[test]
    fn test_to_uri_rejects_invalid_host() {
        let url = RequestUrl::new(Protocol::Https, "app.example.com", "/");
        assert!(url.to_uri("bad host", None).is_err());
    }

    #[test]
    fn test_routing_context_from_request() {
        let req = Request::builder()
            .uri("/legacy/users")
            .header(HOST, "app.example.com")
            .header("cookie", "tag=user789")
            .header("x-gray-env", "staging")
            .body(())
            .unwrap();

        let ctx = RoutingContext::from_request(&req, Protocol::Https, &env_header());
        assert_eq!(ctx.url.path(), "/legacy/users");
        assert_eq!(ctx.cookie_header.as_deref(), Some("tag=user789"));
        assert_eq!(ctx.env_override.as_deref(), Some("staging"));
    }
}
