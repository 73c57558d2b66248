//! Operation timeouts.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep};

/// Upper bound on how long a bounded operation may wait.
///
/// A zero or negative millisecond value disables the timer, as does
/// [`Timeout::INFINITE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Timeout(Option<Duration>);

impl Timeout {
    /// No timer; the operation waits until it completes or is cancelled.
    pub const INFINITE: Self = Self(None);

    /// Create a timeout from milliseconds. Non-positive values, including
    /// the `-1` sentinel, mean no timeout.
    pub fn from_millis(millis: i64) -> Self {
        match u64::try_from(millis) {
            Ok(ms) if ms > 0 => Self(Some(Duration::from_millis(ms))),
            _ => Self::INFINITE,
        }
    }

    /// The timer duration, or `None` if the timer is disabled.
    pub fn duration(&self) -> Option<Duration> {
        self.0
    }

    /// Check if the timer is disabled.
    pub fn is_infinite(&self) -> bool {
        self.0.is_none()
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() {
            Self::INFINITE
        } else {
            Self(Some(duration))
        }
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(duration: Option<Duration>) -> Self {
        duration.map_or(Self::INFINITE, Self::from)
    }
}

/// A one-shot timer shared by the phases of one operation.
///
/// The timer starts on creation. [`restart`](Self::restart) re-arms the same
/// timer for a further full duration.
pub(crate) struct PhaseTimer {
    timeout: Timeout,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl PhaseTimer {
    pub(crate) fn start(timeout: Timeout) -> Self {
        Self {
            timeout,
            sleep: timeout.duration().map(|d| Box::pin(tokio::time::sleep(d))),
        }
    }

    /// The configured duration, or zero for an infinite timer.
    pub(crate) fn duration(&self) -> Duration {
        self.timeout.duration().unwrap_or_default()
    }

    pub(crate) fn restart(&mut self) {
        if let (Some(duration), Some(sleep)) = (self.timeout.duration(), self.sleep.as_mut()) {
            sleep.as_mut().reset(Instant::now() + duration);
        }
    }

    /// Completes when the timer elapses. Never completes for an infinite timer.
    pub(crate) async fn elapsed(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => sleep.as_mut().await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_millis_disable_timer() {
        assert!(Timeout::from_millis(0).is_infinite());
        assert!(Timeout::from_millis(-1).is_infinite());
        assert_eq!(
            Timeout::from_millis(50).duration(),
            Some(Duration::from_millis(50))
        );
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Timeout::from(Duration::ZERO), Timeout::INFINITE);
        assert_eq!(Timeout::from(None), Timeout::INFINITE);
        assert_eq!(
            Timeout::from(Some(Duration::from_secs(1))).duration(),
            Some(Duration::from_secs(1))
        );
    }

    #[tokio::test]
    async fn test_timer_elapses() {
        let mut timer = PhaseTimer::start(Timeout::from_millis(10));
        let fired = tokio::time::timeout(Duration::from_secs(2), timer.elapsed()).await;
        assert!(fired.is_ok());
    }

    #[tokio::test]
    async fn test_infinite_timer_never_elapses() {
        let mut timer = PhaseTimer::start(Timeout::INFINITE);
        let fired = tokio::time::timeout(Duration::from_millis(30), timer.elapsed()).await;
        assert!(fired.is_err());
        assert_eq!(timer.duration(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_restart_rearms_full_duration() {
        let mut timer = PhaseTimer::start(Timeout::from_millis(200));
        tokio::time::sleep(Duration::from_millis(100)).await;
        timer.restart();
        let early = tokio::time::timeout(Duration::from_millis(150), timer.elapsed()).await;
        assert!(early.is_err());
        let late = tokio::time::timeout(Duration::from_secs(2), timer.elapsed()).await;
        assert!(late.is_ok());
    }
}
