//! Clock abstraction shared by the compute and display schedules.

use async_trait::async_trait;
use std::time::Duration;

/// Time source for the simulation drivers.
///
/// The display schedule paces itself through this trait so the same loop
/// runs against wall-clock time in production and against a virtual clock
/// in tests.
///
/// # Implementations
///
/// - **Production**: `TokioClock` - wraps `tokio::time`
/// - **Simulation**: `VirtualClock` (in `ethogram_sim`) - manually advanced
#[async_trait]
pub trait SimClock: Send + Sync + 'static {
    /// Returns the monotonic time since the clock was created.
    fn now(&self) -> Duration;

    /// Suspends the caller for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual time and yields
    async fn sleep(&self, duration: Duration);

    /// Returns the clock's seed (0 when not seeded).
    fn seed(&self) -> u64;
}
