use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;

use recruit_gateway::config::Args;
use recruit_gateway::middleware::IdentityResolver;
use recruit_gateway::policy::{RateLimitPolicy, RouteTable};
use recruit_gateway::state::AppState;
use recruit_gateway::{build_router, sweeper, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    telemetry::init();

    let policy = RateLimitPolicy::from_args(&args).context("invalid rate limit settings")?;
    let state = Arc::new(
        AppState::new(policy.clone(), RouteTable::default())
            .with_identity(IdentityResolver::from_args(&args)),
    );

    let _sweeper = sweeper::spawn_sweeper(policy, args.sweep_every());

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!(port = args.port, "gateway listening");
    tracing::info!(
        limit = args.api_rate_limit,
        window_secs = args.api_rate_window,
        "api rate limit"
    );
    tracing::info!(
        limit = args.form_rate_limit,
        window_secs = args.form_rate_window,
        "form rate limit"
    );
    tracing::info!(
        trust_forwarded_for = args.trust_forwarded_for,
        api_keys = args.api_keys.len(),
        "client identity"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;
    Ok(())
}
