mod forms;
mod health;
mod metrics;
mod quota;

pub use forms::submit_form_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use quota::{check_quota_handler, inspect_quota_handler};
