//! Throttling layer in front of every route.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Args;
use crate::metrics::{ADMITTED, RATE_LIMITED, REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::ceil_secs;
use crate::policy::RouteLimit;
use crate::rate_limit::RateStatus;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let class = match state.routes.resolve(req.method(), req.uri().path()) {
        RouteLimit::Exempt => return next.run(req).await,
        RouteLimit::Limited(class) => class,
    };

    let identifier = state.identity.client_identifier(&req);
    let status = state.policy.limiter(class).check(&identifier);

    if !status.allowed {
        RATE_LIMITED.with_label_values(&[class.as_str()]).inc();
        tracing::debug!(%class, path = %req.uri().path(), "rate limit exceeded");
        return too_many_requests(&status);
    }
    ADMITTED.with_label_values(&[class.as_str()]).inc();

    let mut response = next.run(req).await;
    apply_rate_headers(response.headers_mut(), &status);
    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    response
}

/// Decides who a request counts against. Both headers are client-controlled,
/// so neither is honoured by default: an API key must be on the configured
/// list and `X-Forwarded-For` needs explicit proxy trust. Everything else
/// falls back to the peer address.
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    trust_forwarded_for: bool,
    // sha256 hex of each accepted key
    key_digests: HashSet<String>,
}

impl IdentityResolver {
    pub fn new<I, S>(trust_forwarded_for: bool, api_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let key_digests = api_keys
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .map(|k| digest_hex(&k))
            .collect();
        Self {
            trust_forwarded_for,
            key_digests,
        }
    }

    pub fn from_args(args: &Args) -> Self {
        Self::new(args.trust_forwarded_for, &args.api_keys)
    }

    pub fn client_identifier(&self, req: &Request) -> String {
        let headers = req.headers();

        if let Some(key) = header_str(headers, API_KEY_HEADER) {
            let digest = digest_hex(key);
            if self.key_digests.contains(&digest) {
                return format!("key:{digest}");
            }
        }

        if self.trust_forwarded_for {
            if let Some(hop) = header_str(headers, FORWARDED_FOR_HEADER)
                .and_then(|v| v.split(',').map(str::trim).find(|s| !s.is_empty()))
            {
                return format!("ip:{hop}");
            }
        }

        match req.extensions().get::<ConnectInfo<SocketAddr>>() {
            Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
            None => "anonymous".to_string(),
        }
    }
}

fn digest_hex(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.as_bytes()))
}

pub fn apply_rate_headers(headers: &mut HeaderMap, status: &RateStatus) {
    let reset = status.reset_after.map(ceil_secs).unwrap_or(0);
    headers.insert(LIMIT_HEADER, HeaderValue::from(status.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(status.remaining));
    headers.insert(RESET_HEADER, HeaderValue::from(reset));
}

fn too_many_requests(status: &RateStatus) -> Response {
    let retry_after = status.reset_after.map(ceil_secs).unwrap_or(1).max(1);
    let body = Json(serde_json::json!({
        "error": "rate_limited",
        "message": "Rate limit exceeded. Try again later.",
        "retry_after_secs": retry_after,
    }));

    let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
    apply_rate_headers(response.headers_mut(), status);
    response
        .headers_mut()
        .insert(axum::http::header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(headers: &[(&str, &str)]) -> Request {
        let mut builder = axum::http::Request::builder().uri("/v1/jobs");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn peer(req: &mut Request, addr: &str) {
        let addr: SocketAddr = addr.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
    }

    #[test]
    fn listed_api_key_wins_and_is_hashed() {
        let resolver = IdentityResolver::new(true, ["secret"]);
        let id = resolver.client_identifier(&request(&[
            ("x-api-key", "secret"),
            ("x-forwarded-for", "10.0.0.1"),
        ]));
        assert!(id.starts_with("key:"));
        assert!(!id.contains("secret"));
        assert_eq!(id.len(), "key:".len() + 64);
    }

    #[test]
    fn unlisted_api_key_falls_back_to_peer() {
        let resolver = IdentityResolver::new(false, ["secret"]);
        let mut req = request(&[("x-api-key", "made-up")]);
        peer(&mut req, "192.0.2.4:5555");
        assert_eq!(resolver.client_identifier(&req), "ip:192.0.2.4");
    }

    #[test]
    fn forwarded_for_ignored_unless_trusted() {
        let mut req = request(&[("x-forwarded-for", " 203.0.113.7, 10.0.0.1")]);
        peer(&mut req, "192.0.2.4:5555");

        assert_eq!(IdentityResolver::default().client_identifier(&req), "ip:192.0.2.4");
        assert_eq!(
            IdentityResolver::new(true, Vec::<String>::new()).client_identifier(&req),
            "ip:203.0.113.7"
        );
    }

    #[test]
    fn peer_address_then_anonymous() {
        let resolver = IdentityResolver::default();
        let mut req = request(&[]);
        assert_eq!(resolver.client_identifier(&req), "anonymous");

        peer(&mut req, "192.0.2.4:5555");
        assert_eq!(resolver.client_identifier(&req), "ip:192.0.2.4");
    }

    #[test]
    fn headers_round_reset_up() {
        let mut headers = HeaderMap::new();
        let status = RateStatus {
            allowed: true,
            limit: 10,
            remaining: 4,
            reset_after: Some(std::time::Duration::from_millis(2_100)),
        };
        apply_rate_headers(&mut headers, &status);

        assert_eq!(headers["x-ratelimit-limit"], "10");
        assert_eq!(headers["x-ratelimit-remaining"], "4");
        assert_eq!(headers["x-ratelimit-reset"], "3");
    }
}
