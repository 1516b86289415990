use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::metrics::{SWEEP_EVICTED, TRACKED_IDENTIFIERS};
use crate::policy::{LimitClass, RateLimitPolicy};

// Evicts idle identifiers from every limiter on a fixed interval
pub fn spawn_sweeper(policy: RateLimitPolicy, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        tracing::info!(interval = ?every, "sweeper started");

        loop {
            ticker.tick().await;
            sweep_once(&policy);
        }
    })
}

/// One pass over all limiters. Returns identifiers evicted.
pub fn sweep_once(policy: &RateLimitPolicy) -> usize {
    let mut evicted = 0;
    for class in LimitClass::ALL {
        let limiter = policy.limiter(class);
        let removed = limiter.sweep();
        let tracked = limiter.tracked();

        TRACKED_IDENTIFIERS
            .with_label_values(&[class.as_str()])
            .set(tracked as i64);
        if removed > 0 {
            tracing::debug!(%class, removed, remaining = tracked, "evicted idle identifiers");
        }
        evicted += removed;
    }
    SWEEP_EVICTED.inc_by(evicted as f64);
    evicted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::SlidingWindowLimiter;

    #[test]
    fn sweep_once_covers_every_class() {
        let short = Duration::from_millis(20);
        let policy = RateLimitPolicy::new(
            SlidingWindowLimiter::new(5, short).unwrap(),
            SlidingWindowLimiter::new(5, short).unwrap(),
        );
        policy.limiter(LimitClass::Api).is_allowed("a");
        policy.limiter(LimitClass::Form).is_allowed("b");

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(sweep_once(&policy), 2);
        assert_eq!(policy.limiter(LimitClass::Api).tracked(), 0);
    }

    #[tokio::test]
    async fn spawned_sweeper_keeps_active_identifiers() {
        let policy = RateLimitPolicy::new(
            SlidingWindowLimiter::new(5, Duration::from_secs(3600)).unwrap(),
            SlidingWindowLimiter::new(5, Duration::from_secs(3600)).unwrap(),
        );
        policy.limiter(LimitClass::Api).is_allowed("active");

        let handle = spawn_sweeper(policy.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(policy.limiter(LimitClass::Api).tracked(), 1);
        handle.abort();
    }
}
