//! Compute/display loop behavior against the shared store.

use ethogram_core::{
    Agent, BehaviorDocument, BoundaryKind, Entity, EntityId, EntityRecord, Environment, LoopControl, NetworkDocument,
    Position, SimError, SimulationContext,
};
use ethogram_env::{EntityMut, HandlerTable};
use ethogram_sim::{
    ComputeLoop, LoopRole, RecordingSink, RenderSink, RunError, SimEvent, Simulation, VirtualClock,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

fn walker(name: &str, x: f64, y: f64) -> Agent {
    let entity = Entity::new(name, "walker").with_position(x, y);
    Agent::from_document(
        entity,
        NetworkDocument::Cooperative {
            behaviors: vec![
                BehaviorDocument::new("east", "1", "forward 1 0"),
                BehaviorDocument::new("south", "1", "forward 1 1.5708; hold"),
            ],
            weights: vec![0.5, 0.5],
        },
    )
    .unwrap()
}

fn context(ticks: usize, entities: usize) -> Arc<SimulationContext> {
    let env = Environment::new(200.0, 200.0, BoundaryKind::Rounded);
    let ctx = SimulationContext::scripted(env, ticks, HandlerTable::new()).unwrap();
    for i in 0..entities {
        let at = 1.0 + (i % 100) as f64;
        ctx.insert_agent(walker(&format!("w{}", i), at, at)).unwrap();
    }
    Arc::new(ctx)
}

fn simulation(ctx: &Arc<SimulationContext>, passes: u64) -> Simulation {
    Simulation::new(Arc::clone(ctx), VirtualClock::shared(1))
        .with_display_interval(Duration::ZERO)
        .with_passes(passes)
}

async fn wait_for(events: &mut broadcast::Receiver<SimEvent>, pred: impl Fn(&SimEvent) -> bool) -> SimEvent {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(e) => panic!("event channel closed: {}", e),
            }
        }
    })
    .await
    .expect("event did not arrive")
}

/// Records the write stamp of every slot the display side reads.
struct StampSink {
    ctx: Arc<SimulationContext>,
    stamps: Mutex<Vec<Option<u64>>>,
}

impl RenderSink for StampSink {
    fn render_tick(&self, entity: EntityId, tick: usize, _record: &EntityRecord) {
        let key = self.ctx.population().get(entity).map(|a| a.key()).unwrap();
        let buffer = self.ctx.store().switch().display_buffer();
        let stamp = self.ctx.store().slot_pass(key, buffer, tick);
        self.stamps.lock().unwrap().push(stamp);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_display_never_sees_a_partial_pass() {
    const TICKS: usize = 16;
    const ENTITIES: usize = 64;
    const PASSES: u64 = 6;

    let ctx = context(TICKS, ENTITIES);
    let sink = Arc::new(StampSink {
        ctx: Arc::clone(&ctx),
        stamps: Mutex::new(Vec::new()),
    });
    let mut sim = simulation(&ctx, PASSES).with_sink(sink.clone());

    sim.start().unwrap();
    let summary = sim.join().await.unwrap();
    assert_eq!(summary.compute.unwrap().passes, PASSES);
    assert_eq!(summary.display.unwrap().passes, PASSES);

    let stamps = sink.stamps.lock().unwrap();
    assert_eq!(stamps.len(), PASSES as usize * TICKS * ENTITIES);
    for (i, stamp) in stamps.iter().enumerate() {
        let pass = (i / (TICKS * ENTITIES)) as u64;
        assert_eq!(*stamp, Some(pass), "record {} read from the wrong pass", i);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_passes_alternate_buffers() {
    let ctx = context(4, 2);
    let mut sim = simulation(&ctx, 4);
    let mut events = sim.subscribe();

    sim.start().unwrap();
    sim.join().await.unwrap();

    let mut computed = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SimEvent::PassComputed { buffer, .. } = event {
            computed.push(buffer);
        }
    }
    use ethogram_core::Buffer::{Backup, Main};
    assert_eq!(computed, vec![Main, Backup, Main, Backup]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_suspend_then_reset_and_restart() {
    let ctx = context(8, 3);
    let sink = RecordingSink::new();
    let mut sim = simulation(&ctx, 0).with_sink(Arc::new(sink.clone()));
    let mut events = sim.subscribe();

    sim.start().unwrap();
    assert!(sim.start_compute().is_err());
    wait_for(&mut events, |e| matches!(e, SimEvent::PassDisplayed { .. })).await;

    assert!(sim.reset(&HashMap::new()).is_err());
    let summary = sim.suspend().await.unwrap();
    assert!(summary.compute.unwrap().suspended);
    assert!(summary.display.unwrap().suspended);
    assert!(!sim.is_running());
    assert!(sink.passes() >= 1);

    while events.try_recv().is_ok() {}

    let home = HashMap::from([(EntityId(0), Position::new(50.0, 50.0))]);
    sim.reset(&home).unwrap();
    assert_eq!(ctx.store().switch().pass(), 0);

    sim.start().unwrap();
    wait_for(&mut events, |e| matches!(e, SimEvent::PassDisplayed { .. })).await;
    sim.suspend().await.unwrap();

    let restarted = sink
        .rendered()
        .into_iter()
        .filter(|r| r.entity == EntityId(0) && r.tick == 0)
        .any(|r| r.record.position() == Position::new(50.0, 50.0));
    assert!(restarted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_insertion_mid_run_is_reported() {
    let ctx = context(8, 2);
    let mut sim = simulation(&ctx, 0);
    let mut events = sim.subscribe();

    sim.start().unwrap();
    wait_for(&mut events, |e| matches!(e, SimEvent::PassComputed { .. })).await;
    sim.insert_agent(walker("late", 10.0, 10.0)).unwrap();

    let changed = wait_for(&mut events, |e| matches!(e, SimEvent::PopulationChanged { .. })).await;
    assert_eq!(changed, SimEvent::PopulationChanged { before: 2, after: 3 });

    sim.remove_agent(EntityId(0)).unwrap();
    wait_for(&mut events, |e| matches!(e, SimEvent::PassDisplayed { .. })).await;
    sim.suspend().await.unwrap();
    assert_eq!(ctx.entity_count(), 2);
}

/// Clears the switch under the display loop's feet on the first record.
struct SabotageSink {
    ctx: Arc<SimulationContext>,
    fired: AtomicBool,
}

impl RenderSink for SabotageSink {
    fn render_tick(&self, _entity: EntityId, _tick: usize, _record: &EntityRecord) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.ctx.store().switch().reset();
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_protocol_violation_terminates_loops() {
    let ctx = context(4, 1);
    let sink = Arc::new(SabotageSink {
        ctx: Arc::clone(&ctx),
        fired: AtomicBool::new(false),
    });
    let mut sim = simulation(&ctx, 0).with_sink(sink);
    let mut events = sim.subscribe();

    sim.start().unwrap();
    let result = tokio::time::timeout(Duration::from_secs(10), sim.join()).await.unwrap();
    assert!(matches!(result, Err(RunError::Sim(SimError::BufferProtocolViolation(_)))));

    let terminated = wait_for(&mut events, |e| matches!(e, SimEvent::LoopTerminated { .. })).await;
    assert!(matches!(
        terminated,
        SimEvent::LoopTerminated { role: LoopRole::Display | LoopRole::Compute, .. }
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_restart_after_mid_pass_suspend_keeps_unit_steps() {
    const TICKS: usize = 10;

    // Each call moves one unit east; the 5th call suspends the first loop
    // between the two entities of tick 3
    let first = LoopControl::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let handlers = HandlerTable::new();
    {
        let first = first.clone();
        let calls = Arc::clone(&calls);
        handlers.register("step_east", move |entity: &mut dyn EntityMut| {
            let [x, y] = entity.position();
            entity.set_position([x + 1.0, y]);
            if calls.fetch_add(1, Ordering::SeqCst) + 1 == 5 {
                first.suspend();
            }
            Ok(())
        });
    }

    let env = Environment::new(200.0, 200.0, BoundaryKind::Open);
    let ctx = Arc::new(SimulationContext::scripted(env, TICKS, handlers).unwrap());
    for (name, x) in [("a", 10.0), ("b", 20.0)] {
        let agent = Agent::from_document(
            Entity::new(name, "stepper").with_position(x, 50.0),
            NetworkDocument::SystemDynamics {
                handler: "step_east".into(),
                script: "x += 1".into(),
            },
        )
        .unwrap();
        ctx.insert_agent(agent).unwrap();
    }
    let (events, _rx) = broadcast::channel(16);

    let interrupted = ComputeLoop::new(Arc::clone(&ctx), first, events.clone())
        .with_max_passes(1)
        .run()
        .await
        .unwrap();
    assert!(interrupted.suspended);
    assert_eq!(interrupted.passes, 0);

    let resumed = ComputeLoop::new(Arc::clone(&ctx), LoopControl::new(), events)
        .with_max_passes(1)
        .run()
        .await
        .unwrap();
    assert_eq!(resumed.passes, 1);

    for ((_, key), start) in ctx.roster().into_iter().zip([10.0, 20.0]) {
        let xs: Vec<f64> = (0..TICKS)
            .map(|tick| ctx.store().get_record(key, tick).unwrap().position().x)
            .collect();
        assert_eq!(xs[0], start);
        for (tick, pair) in xs.windows(2).enumerate() {
            assert_eq!(pair[1] - pair[0], 1.0, "tick {} of {:?} is not one step", tick + 1, xs);
        }
    }
}
