use anyhow::Context;
use prometheus::{Encoder, TextEncoder};

use crate::error::Result;

pub async fn metrics_handler() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("encoding metrics")?;
    Ok(String::from_utf8(buffer).context("metrics were not utf-8")?)
}
