// apex-resilience/src/health.rs
// ============================================================================
// Module: Health Checks
// Description: Tracks a driver's last-known health status, refreshed on a
//              configurable interval (§4.10).
// ============================================================================

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tracing::warn;

/// Last-known-healthy flag for a single driver, updated by periodic
/// `healthy()` probes.
pub struct HealthMonitor {
    healthy: AtomicBool,
    interval: Duration,
}

impl HealthMonitor {
    /// Builds a monitor that starts out healthy, to be refreshed every
    /// `interval` by [`HealthMonitor::watch`].
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { healthy: AtomicBool::new(true), interval }
    }

    /// The most recently recorded status.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Records a single probe result.
    pub fn record(&self, healthy: bool) {
        if healthy != self.healthy.swap(healthy, Ordering::Relaxed) && !healthy {
            warn!("health check transitioned to unhealthy");
        }
    }

    /// Runs `probe` every `interval`, recording its result, until the
    /// caller drops the returned future (normally spawned as a background
    /// task by the driver registry). Never returns on its own.
    pub async fn watch<F, Fut>(&self, mut probe: F) -> !
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.record(probe().await);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_healthy() {
        let monitor = HealthMonitor::new(Duration::from_secs(1));
        assert!(monitor.is_healthy());
    }

    #[test]
    fn records_unhealthy_probe() {
        let monitor = HealthMonitor::new(Duration::from_secs(1));
        monitor.record(false);
        assert!(!monitor.is_healthy());
    }
}
