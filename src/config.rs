use clap::Parser;
use std::time::Duration;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "recruit-gateway")]
#[command(about = "Rate-limiting edge for the recruitment platform API")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "GATEWAY_PORT", default_value_t = 8080)]
    pub port: u16,

    // General API traffic: max requests per window
    #[arg(long, env = "GATEWAY_API_RATE_LIMIT", default_value_t = 60)]
    pub api_rate_limit: u32,

    // General API traffic: window in seconds
    #[arg(long, env = "GATEWAY_API_RATE_WINDOW", default_value_t = 60)]
    pub api_rate_window: u64,

    // Form submissions: max requests per window
    #[arg(long, env = "GATEWAY_FORM_RATE_LIMIT", default_value_t = 10)]
    pub form_rate_limit: u32,

    // Form submissions: window in seconds
    #[arg(long, env = "GATEWAY_FORM_RATE_WINDOW", default_value_t = 60)]
    pub form_rate_window: u64,

    // How often idle identifiers are evicted, in seconds
    #[arg(long, env = "GATEWAY_SWEEP_INTERVAL", default_value_t = 30)]
    pub sweep_interval: u64,

    // Key clients by X-Forwarded-For. Only safe behind a proxy that overwrites it
    #[arg(long, env = "GATEWAY_TRUST_FORWARDED_FOR")]
    pub trust_forwarded_for: bool,

    // API keys that identify a client on their own (comma-separated)
    #[arg(long, env = "GATEWAY_API_KEYS", value_delimiter = ',')]
    pub api_keys: Vec<String>,
}

impl Args {
    pub fn api_window(&self) -> Duration {
        Duration::from_secs(self.api_rate_window)
    }

    pub fn form_window(&self) -> Duration {
        Duration::from_secs(self.form_rate_window)
    }

    pub fn sweep_every(&self) -> Duration {
        // interval() panics on a zero period
        Duration::from_secs(self.sweep_interval.max(1))
    }
}

impl Default for Args {
    fn default() -> Self {
        Self::parse_from(["recruit-gateway"])
    }
}
