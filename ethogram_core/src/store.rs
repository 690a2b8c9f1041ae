//! Double-buffered trajectory store.

use crate::entity::{EntityKey, EntityRecord, Position};
use crate::error::{SimError, SimResult};
use crate::handoff::{Buffer, BufferSwitch};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A written record plus the compute pass that wrote it.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub record: EntityRecord,
    pub pass: u64,
}

/// The two `T`-long arrays of one entity.
#[derive(Debug, Clone)]
pub struct Trajectory {
    buffers: [Vec<Option<Slot>>; 2],
}

impl Trajectory {
    fn new(ticks: usize) -> Self {
        Self {
            buffers: [vec![None; ticks], vec![None; ticks]],
        }
    }

    pub fn slot(&self, buffer: Buffer, tick: usize) -> Option<&Slot> {
        let slots = &self.buffers[buffer.index()];
        slots.get(tick % slots.len()).and_then(Option::as_ref)
    }

    fn put(&mut self, buffer: Buffer, tick: usize, slot: Slot) {
        let slots = &mut self.buffers[buffer.index()];
        let len = slots.len();
        slots[tick % len] = Some(slot);
    }
}

/// Per-entity trajectories for `T` ticks, shared by the compute and display loops.
///
/// The compute side writes into the compute-active array, the display side
/// reads the display-active one; which is which is decided by the
/// [`BufferSwitch`].
#[derive(Debug)]
pub struct TrajectoryStore {
    ticks: usize,
    tracks: RwLock<HashMap<EntityKey, Trajectory>>,
    switch: BufferSwitch,
}

impl TrajectoryStore {
    pub fn new(ticks: usize) -> SimResult<Self> {
        if ticks == 0 {
            return Err(SimError::configuration("trajectory length must be at least 1 tick"));
        }
        Ok(Self {
            ticks,
            tracks: RwLock::new(HashMap::new()),
            switch: BufferSwitch::new(),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<EntityKey, Trajectory>> {
        self.tracks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<EntityKey, Trajectory>> {
        self.tracks.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn switch(&self) -> &BufferSwitch {
        &self.switch
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.read().contains_key(&key)
    }

    /// Allocates both arrays and seeds tick 0 of the compute-active one.
    pub fn add(&self, key: EntityKey, seed: EntityRecord) -> SimResult<()> {
        let mut tracks = self.write();
        if tracks.contains_key(&key) {
            return Err(SimError::configuration(format!("entity {} already has a trajectory", key)));
        }
        let mut trajectory = Trajectory::new(self.ticks);
        let state = self.switch.snapshot();
        // A done array belongs to the display side until it is drained
        if let Some(buffer) = [state.compute, state.compute.other()]
            .into_iter()
            .find(|buffer| !state.is_done(*buffer))
        {
            trajectory.put(buffer, 0, Slot { record: seed, pass: state.pass });
        }
        tracks.insert(key, trajectory);
        Ok(())
    }

    pub fn remove(&self, key: EntityKey) -> SimResult<()> {
        self.write()
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| SimError::missing(key, 0))
    }

    /// Re-seeds tick 0 of the compute-active array, keeping the allocation.
    pub fn seed(&self, key: EntityKey, record: EntityRecord) -> SimResult<()> {
        self.store(key, record, 0)
    }

    /// Writes compute-active slot `tick mod T`.
    pub fn store(&self, key: EntityKey, record: EntityRecord, tick: usize) -> SimResult<()> {
        let state = self.switch.snapshot();
        if state.is_done(state.compute) {
            return Err(SimError::protocol(format!(
                "write to {:?} at tick {} while it is being displayed",
                state.compute, tick
            )));
        }
        let mut tracks = self.write();
        let trajectory = tracks.get_mut(&key).ok_or_else(|| SimError::missing(key, tick))?;
        trajectory.put(state.compute, tick, Slot { record, pass: state.pass });
        Ok(())
    }

    /// Reads display-active slot `tick mod T`.
    pub fn get_record(&self, key: EntityKey, tick: usize) -> SimResult<EntityRecord> {
        let display = self.readable_display_buffer(tick)?;
        self.read()
            .get(&key)
            .and_then(|trajectory| trajectory.slot(display, tick))
            .map(|slot| slot.record.clone())
            .ok_or_else(|| SimError::missing(key, tick))
    }

    /// Reads the record preceding `tick` on the compute side.
    ///
    /// Tick 0 continues from the last slot of the array that is not being
    /// computed, which holds the end of the previous pass.
    pub fn get_previous_record(&self, key: EntityKey, tick: usize) -> SimResult<EntityRecord> {
        let compute = self.switch.compute_buffer();
        let (buffer, previous) = match tick % self.ticks {
            0 => (compute.other(), self.ticks - 1),
            t => (compute, t - 1),
        };
        self.read()
            .get(&key)
            .and_then(|trajectory| trajectory.slot(buffer, previous))
            .map(|slot| slot.record.clone())
            .ok_or_else(|| SimError::missing(key, previous))
    }

    /// Every entity's display-active position at `tick`.
    pub fn populate_positions(&self, tick: usize) -> SimResult<HashMap<EntityKey, Position>> {
        let display = self.readable_display_buffer(tick)?;
        Ok(self
            .read()
            .iter()
            .filter_map(|(key, trajectory)| {
                trajectory
                    .slot(display, tick)
                    .map(|slot| (*key, slot.record.position()))
            })
            .collect())
    }

    /// Write stamp of one slot.
    pub fn slot_pass(&self, key: EntityKey, buffer: Buffer, tick: usize) -> Option<u64> {
        self.read()
            .get(&key)
            .and_then(|trajectory| trajectory.slot(buffer, tick))
            .map(|slot| slot.pass)
    }

    /// Clears the switch flags and pass counter; trajectories stay allocated.
    pub fn reset(&self) {
        self.switch.reset();
    }

    fn readable_display_buffer(&self, tick: usize) -> SimResult<Buffer> {
        let state = self.switch.snapshot();
        if !state.is_done(state.display) {
            return Err(SimError::protocol(format!(
                "display read of {:?} at tick {} before it was computed",
                state.display, tick
            )));
        }
        Ok(state.display)
    }
}
