//! Per-IP sliding-window rate limiting

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Sliding-window limiter keyed by source IP.
///
/// Each IP keeps the timestamps of its recent requests; a request is
/// admitted when fewer than `max_per_window` fall inside the window.
/// Rejections report how long until the oldest request ages out.
pub struct RateLimiter {
    window: Mutex<HashMap<IpAddr, Vec<Instant>>>,
    max_per_window: usize,
    period: Duration,
}

impl RateLimiter {
    pub fn new(max_per_window: usize, period: Duration) -> Self {
        Self {
            window: Mutex::new(HashMap::new()),
            max_per_window,
            period,
        }
    }

    /// One request per hour window of the configured size.
    pub fn hourly(max_per_hour: usize) -> Self {
        Self::new(max_per_hour, Duration::from_secs(3600))
    }

    /// Admit or reject a request from `ip`. On rejection, returns the
    /// seconds until the window has room again (at least 1).
    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let now = Instant::now();
        let cutoff = now - self.period;

        let mut guard = self.window.lock();
        let entries = guard.entry(ip).or_default();
        entries.retain(|t| *t > cutoff);

        if entries.len() >= self.max_per_window {
            // Entries are pushed in order, so the first is the oldest.
            let oldest = entries[0];
            let retry_after = self.period.saturating_sub(now - oldest);
            return Err(retry_after.as_secs().max(1));
        }

        entries.push(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_admits_up_to_limit() {
        let limiter = RateLimiter::hourly(10);
        for _ in 0..10 {
            assert!(limiter.check(ip(1)).is_ok());
        }
        let retry_after = limiter.check(ip(1)).unwrap_err();
        assert!(retry_after > 0);
        assert!(retry_after <= 3600);
    }

    #[test]
    fn test_ips_are_independent() {
        let limiter = RateLimiter::hourly(1);
        assert!(limiter.check(ip(1)).is_ok());
        assert!(limiter.check(ip(2)).is_ok());
        assert!(limiter.check(ip(1)).is_err());
    }

    #[test]
    fn test_window_expiry() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10));
        assert!(limiter.check(ip(1)).is_ok());
        assert!(limiter.check(ip(1)).is_err());
        std::thread::sleep(Duration::from_millis(20));
        assert!(limiter.check(ip(1)).is_ok());
    }
}
