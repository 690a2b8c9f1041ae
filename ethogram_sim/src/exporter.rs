//! JSON exporter for rendered trajectories.
//!
//! Exports one frame per displayed tick for offline plotting.

use ethogram_core::{EntityId, Position};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Position of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPosition {
    pub id: usize,
    pub x: f64,
    pub y: f64,
}

impl EntityPosition {
    pub fn new(id: EntityId, pos: Position) -> Self {
        Self {
            id: id.index(),
            x: pos.x,
            y: pos.y,
        }
    }
}

/// Every entity's display-side position at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryFrame {
    pub tick: usize,
    pub entities: Vec<EntityPosition>,
}

/// Complete trajectory export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Ticks per pass
    pub ticks: usize,

    /// All frames, in display order
    pub frames: Vec<TrajectoryFrame>,
}

impl TrajectoryExport {
    pub fn new(scenario: &str, seed: u64, ticks: usize) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            ticks,
            frames: Vec::new(),
        }
    }

    /// Adds a frame, entities ordered by id.
    pub fn push_frame(&mut self, tick: usize, positions: HashMap<EntityId, Position>) {
        let mut entities: Vec<EntityPosition> = positions
            .into_iter()
            .map(|(id, pos)| EntityPosition::new(id, pos))
            .collect();
        entities.sort_by_key(|e| e.id);
        self.frames.push(TrajectoryFrame { tick, entities });
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_sorted_by_id() {
        let mut export = TrajectoryExport::new("still", 42, 10);
        let positions = HashMap::from([
            (EntityId(2), Position::new(3.0, 4.0)),
            (EntityId(0), Position::new(1.0, 2.0)),
        ]);
        export.push_frame(5, positions);

        let frame = &export.frames[0];
        assert_eq!(frame.tick, 5);
        assert_eq!(frame.entities.iter().map(|e| e.id).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_json_shape() {
        let mut export = TrajectoryExport::new("still", 42, 10);
        export.push_frame(0, HashMap::from([(EntityId(0), Position::new(1.0, 2.0))]));

        let value: serde_json::Value = serde_json::from_str(&export.to_json().unwrap()).unwrap();
        assert_eq!(value["scenario"], "still");
        assert_eq!(value["frames"][0]["entities"][0]["y"], 2.0);
    }

    #[test]
    fn test_write_to_file() {
        let path = std::env::temp_dir().join(format!("ethogram_export_{}.json", std::process::id()));
        let export = TrajectoryExport::new("flock", 7, 3);
        export.write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let back: TrajectoryExport = serde_json::from_str(&text).unwrap();
        assert_eq!(back, export);
        let _ = std::fs::remove_file(&path);
    }
}
