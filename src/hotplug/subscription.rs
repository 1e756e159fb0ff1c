use std::time::{Duration, Instant};

use cosmic::iced::{
    futures::{SinkExt, Stream},
    stream,
};
use tokio::sync::mpsc::error::TrySendError;

use super::udev_monitor::UdevMonitor;
use crate::app::AppMsg;

/// Minimum time between two re-enumerations
const MIN_INTERVAL: Duration = Duration::from_millis(1500);
/// Let the X server pick up the new connector before querying it
const SETTLE: Duration = Duration::from_millis(500);

/// Spaces hotplug notifications at least `interval` apart
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// How long to wait before the next notification may go out at `now`
    pub fn wait_at(&self, now: Instant) -> Duration {
        match self.last {
            Some(last) => self.interval.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }
}

pub fn hotplug_subscription() -> impl Stream<Item = AppMsg> {
    stream::channel(10, |mut output| async move {
        let (tx, mut rx) = tokio::sync::mpsc::channel(100);

        std::thread::spawn(move || {
            let monitor = match UdevMonitor::new() {
                Ok(m) => m,
                Err(e) => {
                    error!("can't watch for output hotplug: {}", e);
                    return;
                }
            };

            let err = monitor.run(|_event| match tx.try_send(()) {
                Ok(()) | Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Closed(_)) => false,
            });
            warn!("output hotplug monitoring stopped: {}", err);
        });

        let mut limiter = RateLimiter::new(MIN_INTERVAL);

        while rx.recv().await.is_some() {
            let wait = limiter.wait_at(Instant::now()).max(SETTLE);
            tokio::time::sleep(wait).await;

            let mut drained = 0;
            while rx.try_recv().is_ok() {
                drained += 1;
            }
            if drained > 0 {
                debug!("drained {} additional hotplug events", drained);
            }

            limiter.mark(Instant::now());
            info!("output hotplug settled, re-enumerating");
            if output.send(AppMsg::HotplugDetected).await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_event_is_not_delayed() {
        let limiter = RateLimiter::new(MIN_INTERVAL);
        assert_eq!(limiter.wait_at(Instant::now()), Duration::ZERO);
    }

    #[test]
    fn test_events_are_spaced() {
        let mut limiter = RateLimiter::new(MIN_INTERVAL);
        let start = Instant::now();
        limiter.mark(start);

        assert_eq!(
            limiter.wait_at(start + Duration::from_millis(500)),
            Duration::from_millis(1000)
        );
        assert_eq!(limiter.wait_at(start + Duration::from_secs(2)), Duration::ZERO);
    }
}
