//! Which limiter guards which route.
//!
//! Routes declare their class up front in a [`RouteTable`] instead of each
//! handler picking a limiter by convention.

use axum::http::Method;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::config::Args;
use crate::error::{AppError, RateLimitError};
use crate::rate_limit::SlidingWindowLimiter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitClass {
    // general API traffic
    Api,
    // form submissions, stricter
    Form,
}

impl LimitClass {
    pub const ALL: [LimitClass; 2] = [LimitClass::Api, LimitClass::Form];

    pub fn as_str(&self) -> &'static str {
        match self {
            LimitClass::Api => "api",
            LimitClass::Form => "form",
        }
    }
}

impl fmt::Display for LimitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LimitClass {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(LimitClass::Api),
            "form" => Ok(LimitClass::Form),
            other => Err(AppError::UnknownClass(other.to_string())),
        }
    }
}

// One limiter per class
#[derive(Clone)]
pub struct RateLimitPolicy {
    api: SlidingWindowLimiter,
    form: SlidingWindowLimiter,
}

impl RateLimitPolicy {
    pub fn new(api: SlidingWindowLimiter, form: SlidingWindowLimiter) -> Self {
        Self { api, form }
    }

    pub fn from_args(args: &Args) -> Result<Self, RateLimitError> {
        let api = SlidingWindowLimiter::new(args.api_rate_limit, args.api_window())
            .map_err(|e| e.in_class(LimitClass::Api))?;
        let form = SlidingWindowLimiter::new(args.form_rate_limit, args.form_window())
            .map_err(|e| e.in_class(LimitClass::Form))?;
        Ok(Self { api, form })
    }

    pub fn limiter(&self, class: LimitClass) -> &SlidingWindowLimiter {
        match class {
            LimitClass::Api => &self.api,
            LimitClass::Form => &self.form,
        }
    }
}

impl RateLimitError {
    fn in_class(self, class: LimitClass) -> Self {
        RateLimitError::Class {
            class: class.as_str(),
            source: Box::new(self),
        }
    }
}

/// What the table decided for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteLimit {
    Exempt,
    Limited(LimitClass),
}

struct RouteRule {
    // None matches any method
    method: Option<Method>,
    prefix: &'static str,
    limit: RouteLimit,
}

/// Ordered `(method, path prefix) -> limit` rules. First match wins;
/// anything unmatched falls under [`LimitClass::Api`].
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn exempt(mut self, prefix: &'static str) -> Self {
        self.rules.push(RouteRule {
            method: None,
            prefix,
            limit: RouteLimit::Exempt,
        });
        self
    }

    pub fn route(mut self, method: Option<Method>, prefix: &'static str, class: LimitClass) -> Self {
        self.rules.push(RouteRule {
            method,
            prefix,
            limit: RouteLimit::Limited(class),
        });
        self
    }

    pub fn resolve(&self, method: &Method, path: &str) -> RouteLimit {
        self.rules
            .iter()
            .find(|rule| {
                rule.method.as_ref().is_none_or(|m| m == method) && matches_prefix(path, rule.prefix)
            })
            .map(|rule| rule.limit)
            .unwrap_or(RouteLimit::Limited(LimitClass::Api))
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        RouteTable::empty()
            .exempt("/health")
            .exempt("/metrics")
            .route(Some(Method::POST), "/v1/forms", LimitClass::Form)
    }
}

// "/v1/forms" matches "/v1/forms" and "/v1/forms/x", not "/v1/formsx"
fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_routes_forms_and_exempts_probes() {
        let table = RouteTable::default();

        assert_eq!(table.resolve(&Method::GET, "/health"), RouteLimit::Exempt);
        assert_eq!(table.resolve(&Method::GET, "/metrics"), RouteLimit::Exempt);
        assert_eq!(
            table.resolve(&Method::POST, "/v1/forms/application"),
            RouteLimit::Limited(LimitClass::Form)
        );
        assert_eq!(
            table.resolve(&Method::GET, "/v1/forms/application"),
            RouteLimit::Limited(LimitClass::Api)
        );
        assert_eq!(
            table.resolve(&Method::POST, "/v1/formsx"),
            RouteLimit::Limited(LimitClass::Api)
        );
    }

    #[test]
    fn first_matching_rule_wins() {
        let table = RouteTable::empty()
            .exempt("/v1/forms/internal")
            .route(None, "/v1/forms", LimitClass::Form);

        assert_eq!(table.resolve(&Method::POST, "/v1/forms/internal"), RouteLimit::Exempt);
        assert_eq!(
            table.resolve(&Method::PUT, "/v1/forms/public"),
            RouteLimit::Limited(LimitClass::Form)
        );
    }

    #[test]
    fn class_names_parse() {
        assert_eq!("form".parse::<LimitClass>().unwrap(), LimitClass::Form);
        assert!(matches!(
            "premium".parse::<LimitClass>(),
            Err(AppError::UnknownClass(name)) if name == "premium"
        ));
    }

    #[test]
    fn invalid_args_name_the_class() {
        let mut args = Args::default();
        args.form_rate_limit = 0;

        let err = RateLimitPolicy::from_args(&args).err().unwrap();
        assert_eq!(err.to_string(), "invalid form limiter: max_requests must be greater than zero");
    }

    #[test]
    fn classes_use_separate_limiters() {
        let policy = RateLimitPolicy::from_args(&Args::default()).unwrap();

        assert_eq!(policy.limiter(LimitClass::Api).max_requests(), 60);
        assert_eq!(policy.limiter(LimitClass::Form).max_requests(), 10);
    }
}
