//! Ethogram Simulation Drivers
//!
//! This crate runs the core's double-buffered store as two independent
//! schedules and wraps them into scenarios and a CLI.
//!
//! # Core Principle: Producer/Consumer Handoff
//!
//! - **Compute**: fills the free trajectory buffer one whole pass at a time
//! - **Display**: drains the other buffer tick by tick at its own pace
//! - **Handoff**: done flags on the `BufferSwitch` decide who owns which buffer
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        Simulation                         │
//! │  ┌──────────────┐   PassComputed   ┌──────────────┐       │
//! │  │ ComputeLoop  │ ───────────────► │ DisplayLoop  │─► sink │
//! │  │ (tokio task) │ ◄─────────────── │ (tokio task) │       │
//! │  └──────┬───────┘   PassDisplayed  └──────┬───────┘       │
//! │         │                                 │               │
//! │  ┌──────▼─────────────────────────────────▼───────┐       │
//! │  │      Arc<SimulationContext> (ethogram_core)    │       │
//! │  └────────────────────────────────────────────────┘       │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use ethogram_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).with_passes(2).run(ScenarioId::Flock).await;
//! assert!(result.passed);
//! ```

mod clock;
mod compute;
mod config;
mod display;
mod engine;
mod error;
mod events;
mod exporter;
mod runner;
pub mod scenarios;

pub use clock::VirtualClock;
pub use compute::ComputeLoop;
pub use config::{SimConfig, SpawnSpec};
pub use display::{DisplayLoop, RecordingSink, RenderSink, RenderedTick, TracingSink};
pub use engine::{RunSummary, Simulation};
pub use error::{RunError, RunResult};
pub use events::{LoopReport, LoopRole, SimEvent};
pub use exporter::{EntityPosition, TrajectoryExport, TrajectoryFrame};
pub use runner::{ScenarioResult, ScenarioRunner};
