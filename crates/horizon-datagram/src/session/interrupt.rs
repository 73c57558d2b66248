//! Classification of interrupted operations.

/// Why a bounded operation stopped before its transport call completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Interruption {
    /// The operation's timer elapsed.
    TimedOut,
    /// The caller's cancellation token fired.
    Cancelled,
}

impl Interruption {
    /// Classify an elapsed timer.
    ///
    /// Cancellation takes precedence: if the token has fired by the time the
    /// timer is observed, the outcome is [`Interruption::Cancelled`].
    pub(crate) fn on_timer(signal_fired: bool) -> Self {
        if signal_fired {
            Self::Cancelled
        } else {
            Self::TimedOut
        }
    }
}

impl std::fmt::Display for Interruption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interruption::TimedOut => write!(f, "timed out"),
            Interruption::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_alone_is_timeout() {
        assert_eq!(Interruption::on_timer(false), Interruption::TimedOut);
    }

    #[test]
    fn test_cancellation_wins_tie() {
        assert_eq!(Interruption::on_timer(true), Interruption::Cancelled);
    }
}
