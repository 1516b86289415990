use std::sync::Arc;

use crate::middleware::IdentityResolver;
use crate::policy::{RateLimitPolicy, RouteTable};

// app's shared state
pub struct AppState {
    pub policy: RateLimitPolicy,
    pub routes: Arc<RouteTable>, // which limiter guards which route
    pub identity: IdentityResolver,
}

impl AppState {
    // Keys clients by peer address only until `with_identity` says otherwise
    pub fn new(policy: RateLimitPolicy, routes: RouteTable) -> Self {
        Self {
            policy,
            routes: Arc::new(routes),
            identity: IdentityResolver::default(),
        }
    }

    pub fn with_identity(mut self, identity: IdentityResolver) -> Self {
        self.identity = identity;
        self
    }
}
