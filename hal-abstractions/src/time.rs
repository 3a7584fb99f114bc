//! Millisecond time base shared by the core and the boards

/// Monotonic instant with millisecond resolution
pub type Instant = fugit::TimerInstantU64<1000>;

/// Duration with millisecond resolution
pub type Duration = fugit::MillisDurationU64;

/// Monotonic clock source
///
/// Boards back this with their system timer. The core reads it once per
/// orchestrator step and passes the instant down explicitly, so tests can
/// drive time by hand.
pub trait Clock {
    /// Current monotonic time
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}
