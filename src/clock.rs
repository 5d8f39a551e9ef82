// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timers are a capability (Design Notes §9): every component that waits on
//! time goes through a [`Clock`] rather than calling `tokio::time` directly,
//! so tests can drive it with `tokio::time::pause`/`advance` without a fake
//! implementation of its own.

use std::time::Duration;

/// Milliseconds since the Unix epoch, as stamped onto agent events and log
/// records.
pub fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Thin wrapper over `tokio::time` so call sites read as "wait on the clock"
/// rather than reaching for the runtime directly. There is deliberately no
/// fake implementation: `#[tokio::test(start_paused = true)]` plus
/// `tokio::time::advance` exercises real timer code paths without a second
/// implementation to keep in sync.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clock;

impl Clock {
    pub async fn sleep(self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    pub fn interval(self, period: Duration) -> tokio::time::Interval {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        interval
    }

    pub async fn timeout<F: std::future::Future>(
        self,
        duration: Duration,
        fut: F,
    ) -> Result<F::Output, tokio::time::error::Elapsed> {
        tokio::time::timeout(duration, fut).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_millis_is_nonzero() {
        assert!(unix_millis() > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_advances_with_paused_clock() {
        let clock = Clock;
        let start = tokio::time::Instant::now();
        let handle = tokio::spawn(async move { clock.sleep(Duration::from_millis(500)).await });
        tokio::time::advance(Duration::from_millis(500)).await;
        handle.await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
    }
}
