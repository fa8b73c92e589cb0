// ==============================================================================
// sensor.rs — FORWARD OBSTACLE PROBES
// ==============================================================================
// Two independent probe pairs, both firing straight ahead from the nose:
// - detection pair: wide spacing, answers "is there a wall ahead at all"
// - ranging pair: narrow spacing, answers "how far is the nearest wall"
//
// Detection and ranging stay separate because the state machine consumes
// them with different thresholds: detection arms the wall-reverse state,
// ranging drives its hysteresis exit and the forced-reverse branch.
//
// The module only builds probe geometry and interprets hit distances; the
// physics shell performs the actual raycasts against obstacle-tagged
// colliders.
// ==============================================================================

use crate::drive::types::{BodyFrame, Vec3, v_add, v_scale};

#[derive(Debug, Clone, Copy)]
pub struct SensorConfig {
    pub detection_range: f32,       // m, "wall ahead" threshold
    pub reverse_wall_distance: f32, // m, wall-reverse hysteresis exit
    pub detection_spread: f32,      // m, lateral half-spacing of the detection pair
    pub ranging_spread: f32,        // m, lateral half-spacing of the ranging pair
    pub nose_offset: f32,           // m, probe origins ahead of the chassis center
    pub probe_height: f32,          // m, probe origins above the chassis center
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            detection_range: 10.0,
            reverse_wall_distance: 3.0,
            detection_spread: 0.7,
            ranging_spread: 0.4,
            nose_offset: 2.2,
            probe_height: 0.1,
        }
    }
}

impl SensorConfig {
    /// "Clear enough to stop reversing" sentinel.
    pub fn clear_distance(&self) -> f32 {
        self.reverse_wall_distance + 1.0
    }

    /// Single cast length covering both probe purposes.
    pub fn cast_range(&self) -> f32 {
        self.detection_range.max(self.clear_distance())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Probe {
    pub origin: Vec3,
    pub dir: Vec3, // unit
    pub max_dist: f32,
}

/// Recomputed every physics tick; never retained.
#[derive(Debug, Clone, Copy)]
pub struct ObstacleReading {
    pub wall_detected: bool,
    pub distance_to_wall: f32,
}

pub struct ObstacleSensor {
    pub config: SensorConfig,
}

impl ObstacleSensor {
    pub fn new(config: SensorConfig) -> Self {
        Self { config }
    }

    /// Probe bundle for this tick: [detection L, detection R, ranging L,
    /// ranging R], all firing along the chassis forward.
    pub fn probes(&self, frame: &BodyFrame) -> [Probe; 4] {
        let cfg = &self.config;
        let nose = v_add(
            frame.position,
            v_add(
                v_scale(frame.forward, cfg.nose_offset),
                v_scale(frame.up, cfg.probe_height),
            ),
        );
        let max_dist = cfg.cast_range();

        let at = |spread: f32| Probe {
            origin: v_add(nose, v_scale(frame.right, spread)),
            dir: frame.forward,
            max_dist,
        };

        [
            at(-cfg.detection_spread),
            at(cfg.detection_spread),
            at(-cfg.ranging_spread),
            at(cfg.ranging_spread),
        ]
    }

    /// Interpret the four hit distances (same order as `probes`).
    pub fn interpret(&self, hits: &[Option<f32>; 4]) -> ObstacleReading {
        let cfg = &self.config;

        let wall_detected = hits[..2]
            .iter()
            .flatten()
            .any(|&d| d <= cfg.detection_range);

        let distance_to_wall = hits[2..]
            .iter()
            .flatten()
            .copied()
            .fold(f32::INFINITY, f32::min);
        let distance_to_wall = if distance_to_wall.is_finite() {
            distance_to_wall
        } else {
            cfg.clear_distance()
        };

        ObstacleReading { wall_detected, distance_to_wall }
    }
}
