//! Buffer-switch protocol between the compute and display schedules.
//!
//! Each entity owns two trajectory arrays, `Main` and `Backup`. The producer
//! fills one while the consumer drains the other:
//!
//! ```text
//!   compute ──fills──► [ Main ]   done? ──► display drains ──► clears done
//!   compute ──fills──► [ Backup ] done? ──► display drains ──► clears done
//! ```
//!
//! The four flags live in one `SwitchState` behind a mutex, and every change
//! is announced on a `Notify`, so both sides block instead of spinning.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{watch, Notify};
use tracing::debug;

/// One of the two trajectory arrays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Buffer {
    #[default]
    Main,
    Backup,
}

impl Buffer {
    pub fn other(self) -> Buffer {
        match self {
            Buffer::Main => Buffer::Backup,
            Buffer::Backup => Buffer::Main,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Buffer::Main => 0,
            Buffer::Backup => 1,
        }
    }
}

/// Snapshot of the coordination flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchState {
    /// Array the producer fills
    pub compute: Buffer,

    /// Array the consumer reads
    pub display: Buffer,

    pub main_done: bool,

    pub backup_done: bool,

    /// Compute passes completed since the last reset
    pub pass: u64,
}

impl SwitchState {
    pub fn is_done(&self, buffer: Buffer) -> bool {
        match buffer {
            Buffer::Main => self.main_done,
            Buffer::Backup => self.backup_done,
        }
    }

    fn set_done(&mut self, buffer: Buffer, done: bool) {
        match buffer {
            Buffer::Main => self.main_done = done,
            Buffer::Backup => self.backup_done = done,
        }
    }
}

/// Grant to compute one pass into `buffer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeLease {
    pub buffer: Buffer,

    /// Number of the pass being computed (0 for the first after a reset)
    pub pass: u64,
}

impl ComputeLease {
    /// Tick 0 of the first pass is seeded at insertion, not computed.
    pub fn first_tick(&self) -> usize {
        if self.pass == 0 {
            1
        } else {
            0
        }
    }
}

/// Cooperative cancellation flag of one loop.
#[derive(Debug, Clone)]
pub struct LoopControl {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl LoopControl {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    /// Asks the loop to stop after its current entity/tick.
    pub fn suspend(&self) {
        self.tx.send_replace(true);
    }

    /// Clears a previous suspension so the loop can be restarted.
    pub fn resume(&self) {
        self.tx.send_replace(false);
    }

    pub fn is_suspended(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the loop is suspended.
    pub async fn suspended(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as `self`, so this only ends on suspension
        let _ = rx.wait_for(|suspended| *suspended).await;
    }
}

impl Default for LoopControl {
    fn default() -> Self {
        Self::new()
    }
}

/// The synchronized buffer-switch state machine.
#[derive(Debug, Default)]
pub struct BufferSwitch {
    state: Mutex<SwitchState>,
    changed: Notify,
}

impl BufferSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SwitchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SwitchState {
        *self.lock()
    }

    pub fn compute_buffer(&self) -> Buffer {
        self.lock().compute
    }

    pub fn display_buffer(&self) -> Buffer {
        self.lock().display
    }

    pub fn is_done(&self, buffer: Buffer) -> bool {
        self.lock().is_done(buffer)
    }

    pub fn pass(&self) -> u64 {
        self.lock().pass
    }

    /// Claims the compute-selected array if it is free.
    ///
    /// A done array is still owned by the display side, so the selection
    /// flips to the other one; `None` when both are done.
    pub fn try_begin_compute_pass(&self) -> Option<ComputeLease> {
        let mut state = self.lock();
        if state.is_done(state.compute) {
            state.compute = state.compute.other();
        }
        if state.is_done(state.compute) {
            return None;
        }
        Some(ComputeLease {
            buffer: state.compute,
            pass: state.pass,
        })
    }

    /// Waits until an array is free for writing.
    pub async fn begin_compute_pass(&self, control: &LoopControl) -> SimResult<ComputeLease> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if control.is_suspended() {
                return Err(SimError::Suspended);
            }
            if let Some(lease) = self.try_begin_compute_pass() {
                return Ok(lease);
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = control.suspended() => return Err(SimError::Suspended),
            }
        }
    }

    /// Publishes a fully written array to the display side.
    ///
    /// Returns the number of completed passes.
    pub fn finish_compute_pass(&self, lease: ComputeLease) -> SimResult<u64> {
        let pass = {
            let mut state = self.lock();
            if state.compute != lease.buffer || state.pass != lease.pass {
                return Err(SimError::protocol(format!(
                    "compute lease {:?}/pass {} is stale (state {:?}/pass {})",
                    lease.buffer, lease.pass, state.compute, state.pass
                )));
            }
            if state.is_done(lease.buffer) {
                return Err(SimError::protocol(format!("{:?} already marked done", lease.buffer)));
            }
            state.set_done(lease.buffer, true);
            state.compute = lease.buffer.other();
            state.pass += 1;
            state.pass
        };

        debug!(buffer = ?lease.buffer, pass, "compute pass published");
        self.changed.notify_waiters();
        Ok(pass)
    }

    /// Returns the display-selected array if it has been fully computed.
    pub fn try_begin_display_pass(&self) -> Option<Buffer> {
        let state = self.lock();
        state.is_done(state.display).then_some(state.display)
    }

    /// Waits until the display-selected array has been fully computed.
    pub async fn begin_display_pass(&self, control: &LoopControl) -> SimResult<Buffer> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if control.is_suspended() {
                return Err(SimError::Suspended);
            }
            if let Some(buffer) = self.try_begin_display_pass() {
                return Ok(buffer);
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = control.suspended() => return Err(SimError::Suspended),
            }
        }
    }

    /// Hands a drained array back to the compute side.
    pub fn finish_display_pass(&self, buffer: Buffer) -> SimResult<()> {
        {
            let mut state = self.lock();
            if state.display != buffer {
                return Err(SimError::protocol(format!(
                    "display finished {:?} but {:?} is selected",
                    buffer, state.display
                )));
            }
            if !state.is_done(buffer) {
                return Err(SimError::protocol(format!("{:?} drained before it was computed", buffer)));
            }
            state.set_done(buffer, false);
            state.display = buffer.other();
        }

        debug!(?buffer, "display pass drained");
        self.changed.notify_waiters();
        Ok(())
    }

    /// Clears all flags and the pass counter.
    pub fn reset(&self) {
        *self.lock() = SwitchState::default();
        self.changed.notify_waiters();
    }
}
