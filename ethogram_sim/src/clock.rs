//! Virtual clock implementing SimClock for deterministic runs.

use async_trait::async_trait;
use ethogram_env::SimClock;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Clock whose time only moves when someone sleeps on it or advances it.
///
/// `sleep` advances virtual time and yields to the scheduler, so a display
/// loop paced at 33 ms per tick runs as fast as the compute loop allows.
pub struct VirtualClock {
    /// Master seed for this simulation
    seed: u64,

    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: Arc<Mutex<u64>>,
}

impl VirtualClock {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            virtual_time_ns: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates an Arc-wrapped clock for sharing.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    pub fn advance_time(&self, duration: Duration) {
        let mut time = self.virtual_time_ns.lock().unwrap_or_else(PoisonError::into_inner);
        *time += duration.as_nanos() as u64;
    }

    pub fn set_time(&self, time_ns: u64) {
        *self.virtual_time_ns.lock().unwrap_or_else(PoisonError::into_inner) = time_ns;
    }

    pub fn time_ns(&self) -> u64 {
        *self.virtual_time_ns.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clone for VirtualClock {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
        }
    }
}

#[async_trait]
impl SimClock for VirtualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }

    async fn sleep(&self, duration: Duration) {
        self.advance_time(duration);
        tokio::task::yield_now().await;
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_clock_time() {
        let clock = VirtualClock::new(42);
        assert_eq!(clock.now(), Duration::ZERO);

        clock.advance_time(Duration::from_secs(1));
        clock.advance_time(Duration::from_millis(500));
        assert_eq!(clock.now(), Duration::from_millis(1500));

        clock.set_time(7);
        assert_eq!(clock.time_ns(), 7);
    }

    #[tokio::test]
    async fn test_sleep_advances_virtual_time() {
        let clock = VirtualClock::new(1);
        clock.sleep(Duration::from_millis(33)).await;
        clock.sleep(Duration::from_millis(33)).await;
        assert_eq!(clock.now(), Duration::from_millis(66));
        assert_eq!(clock.seed(), 1);
    }

    #[test]
    fn test_clone_shares_time() {
        let clock = VirtualClock::new(42);
        let other = clock.clone();
        clock.advance_time(Duration::from_secs(5));
        assert_eq!(other.now(), Duration::from_secs(5));
    }
}
