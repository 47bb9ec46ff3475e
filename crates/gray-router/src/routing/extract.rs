//! Cookie and override-header extraction.

use hyper::header::{HeaderName, COOKIE};
use hyper::HeaderMap;
use std::borrow::Cow;
use std::collections::HashMap;

/// Parse a raw `Cookie` header into name/value pairs.
///
/// Pairs are split on `;` and at the first `=`; names and values are trimmed and
/// pairs missing either side are dropped. Later duplicates replace earlier ones.
/// Malformed input never fails, it only yields fewer pairs.
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for pair in header.split(';') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }
        cookies.insert(key.to_string(), value.to_string());
    }
    cookies
}

/// Raw routing inputs carried by request headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestSignals {
    pub cookie_header: Option<String>,
    pub env_override: Option<String>,
}

impl RequestSignals {
    /// Read the cookie header (all lines joined with `"; "`) and the override header.
    ///
    /// Cookie lines are decoded lossily so one non-ASCII pair does not hide the
    /// others. An override value that is not visible ASCII is treated as absent.
    pub fn from_headers(headers: &HeaderMap, env_header: &HeaderName) -> Self {
        let cookie_lines: Vec<Cow<'_, str>> = headers
            .get_all(COOKIE)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
            .collect();
        let cookie_header = if cookie_lines.is_empty() {
            None
        } else {
            Some(cookie_lines.join("; "))
        };

        let env_override = headers
            .get(env_header)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self {
            cookie_header,
            env_override,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn test_parse_simple_cookies() {
        let cookies = parse_cookies("name=value; key=another_value");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies["name"], "value");
        assert_eq!(cookies["key"], "another_value");
    }

    #[test]
    fn test_parse_tag_among_others() {
        let cookies = parse_cookies("session=abc; x-gray-tag=testuser; theme=dark");
        assert_eq!(cookies.get("x-gray-tag").map(String::as_str), Some("testuser"));
        assert_eq!(cookies.len(), 3);
    }

    #[test]
    fn test_parse_empty_header() {
        assert!(parse_cookies("").is_empty());
        assert!(parse_cookies(";;;").is_empty());
    }

    #[test]
    fn test_parse_splits_at_first_equals() {
        let cookies = parse_cookies("token=a=b=c");
        assert_eq!(cookies["token"], "a=b=c");
    }

    #[test]
    fn test_parse_drops_incomplete_pairs() {
        let cookies = parse_cookies("novalue=; =noname; bare; ok=1");
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies["ok"], "1");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let cookies = parse_cookies("  a  =  1  ;b= 2");
        assert_eq!(cookies["a"], "1");
        assert_eq!(cookies["b"], "2");
    }

    #[test]
    fn test_parse_last_duplicate_wins() {
        let cookies = parse_cookies("tag=first; tag=second");
        assert_eq!(cookies["tag"], "second");
    }

    #[test]
    fn test_signals_from_headers() {
        let env_header = HeaderName::from_static("x-gray-env");
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1"));
        headers.append(COOKIE, HeaderValue::from_static("tag=user789"));
        headers.insert(&env_header, HeaderValue::from_static("staging"));

        let signals = RequestSignals::from_headers(&headers, &env_header);
        assert_eq!(signals.cookie_header.as_deref(), Some("a=1; tag=user789"));
        assert_eq!(signals.env_override.as_deref(), Some("staging"));
    }

    #[test]
    fn test_signals_keep_tag_beside_non_ascii_pair() {
        let env_header = HeaderName::from_static("x-gray-env");
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_bytes("name=J\u{00fc}rgen; tag=user789".as_bytes()).unwrap(),
        );
        headers.append(COOKIE, HeaderValue::from_bytes(b"bad=\xff\xfe").unwrap());

        let signals = RequestSignals::from_headers(&headers, &env_header);
        let cookie_header = signals.cookie_header.unwrap();
        let cookies = parse_cookies(&cookie_header);
        assert_eq!(cookies["tag"], "user789");
        assert_eq!(cookies["name"], "J\u{00fc}rgen");
    }

    #[test]
    fn test_signals_absent() {
        let env_header = HeaderName::from_static("x-gray-env");
        let signals = RequestSignals::from_headers(&HeaderMap::new(), &env_header);
        assert_eq!(signals, RequestSignals::default());
    }
}
