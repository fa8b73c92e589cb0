// ==============================================================================
// controller.rs — PURSUIT STATE MACHINE (seek / wall-reverse)
// ==============================================================================
// Ticked once per physics step. Consumes the navigation corner list and the
// obstacle reading, emits the same normalized command tuple a human input
// source would.
//
//   Seek -> WallReverse : wall detected (entry timestamp recorded)
//   WallReverse -> Seek : distance to wall past the hysteresis exit
//
// Braking on approach is a speed sub-mode inside Seek, not a separate state.
// While in WallReverse the controller holds full brake; actual reversing is
// produced by the drive model's own sustained-brake hysteresis. When the wall
// is critically close and the wait timer has elapsed, the speed gate is
// bypassed (forced reverse) - the drive model's timer still applies.
// ==============================================================================

use crate::drive::types::{
    BodyFrame, DriveCommand, Vec3, signed_yaw_angle, v_dot, v_mag, v_norm, v_sub,
};
use crate::nav::NavPath;
use crate::pursuit::sensor::ObstacleReading;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PursuitState {
    Seek,
    WallReverse,
}

#[derive(Debug, Clone, Copy)]
pub struct PursuitConfig {
    pub reached_target_distance: f32, // units
    pub brake_speed: f32,             // km/h, coast-down threshold at the target
    pub reverse_distance: f32,        // units, closer than this + facing away => brake
    pub stopping_distance: f32,       // units, approach deceleration window
    pub stopping_speed: f32,          // km/h, approach deceleration trigger
    pub steering_smoothing: f32,      // 1/s, turn low-pass rate
    pub max_steering_angle: f32,      // deg, angle normalization for turn strength

    // wall handling (feature-flagged: earlier controller revisions shipped
    // without it)
    pub wall_detection: bool,
    pub forced_reverse: bool,
    pub reverse_wall_distance: f32,   // m, hysteresis exit (matches the sensor)
    pub critical_wall_distance: f32,  // m, forced-reverse proximity
    pub force_reverse_wait_time: f32, // s
    pub reverse_speed_threshold: f32, // km/h
}

impl Default for PursuitConfig {
    fn default() -> Self {
        Self {
            reached_target_distance: 7.0,
            brake_speed: 15.0,
            reverse_distance: 25.0,
            stopping_distance: 30.0,
            stopping_speed: 50.0,
            steering_smoothing: 10.0,
            max_steering_angle: 30.0,

            wall_detection: true,
            forced_reverse: true,
            reverse_wall_distance: 3.0,
            critical_wall_distance: 2.0,
            force_reverse_wait_time: 2.0,
            reverse_speed_threshold: 5.0,
        }
    }
}

/// What the controller wants done this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PursuitDecision {
    /// Feed this command to the drive model.
    Command(DriveCommand),
    /// No valid path: ask the navigation collaborator for a snap-back point
    /// and skip command emission this tick.
    SnapToSurface,
}

pub struct PursuitController {
    pub config: PursuitConfig,

    state: PursuitState,
    current_turn: f32,        // -1..1, low-pass filtered
    wall_reverse_elapsed: f32, // s in the current WallReverse episode
    forced_reverse: bool,      // telemetry: forced branch active last tick
    last_waypoint: Vec3,
    warned_no_target: bool,
}

impl PursuitController {
    pub fn new(config: PursuitConfig) -> Self {
        Self {
            config,
            state: PursuitState::Seek,
            current_turn: 0.0,
            wall_reverse_elapsed: 0.0,
            forced_reverse: false,
            last_waypoint: [0.0, 0.0, 0.0],
            warned_no_target: false,
        }
    }

    pub fn state(&self) -> PursuitState {
        self.state
    }

    pub fn current_turn(&self) -> f32 {
        self.current_turn
    }

    /// True while the forced-reverse branch (critical wall + elapsed wait)
    /// is the one holding the brake.
    pub fn forced_reverse(&self) -> bool {
        self.forced_reverse
    }

    pub fn last_waypoint(&self) -> Vec3 {
        self.last_waypoint
    }

    /// One tick. `speed_kmh` is the drive model's signed forward speed.
    pub fn tick(
        &mut self,
        frame: &BodyFrame,
        speed_kmh: f32,
        target: Option<Vec3>,
        path: &NavPath,
        reading: &ObstacleReading,
        dt: f32,
    ) -> PursuitDecision {
        // Target lookup failed everywhere: idle and retry next tick.
        let Some(target) = target else {
            if !self.warned_no_target {
                log::warn!("pursuit target not found in any active area; idling");
                self.warned_no_target = true;
            }
            return PursuitDecision::Command(DriveCommand::idle());
        };
        self.warned_no_target = false;

        if !path.is_valid() {
            return PursuitDecision::SnapToSurface;
        }

        if let Some(cmd) = self.wall_reverse(reading, dt) {
            return PursuitDecision::Command(cmd);
        }

        PursuitDecision::Command(self.seek(frame, speed_kmh, target, path, dt))
    }

    /// Immediately zero the last-emitted steering state (controller disabled
    /// at a tick boundary).
    pub fn reset(&mut self) {
        self.state = PursuitState::Seek;
        self.current_turn = 0.0;
        self.wall_reverse_elapsed = 0.0;
        self.forced_reverse = false;
    }

    // ----------------------------------------------------------
    // Wall-reverse state handling. Returns the command while active.
    // ----------------------------------------------------------
    fn wall_reverse(&mut self, reading: &ObstacleReading, dt: f32) -> Option<DriveCommand> {
        let cfg = &self.config;
        if !cfg.wall_detection {
            return None;
        }

        match self.state {
            PursuitState::Seek => {
                if reading.wall_detected {
                    self.state = PursuitState::WallReverse;
                    self.wall_reverse_elapsed = 0.0;
                    log::debug!("wall detected at {:.1} m, backing out", reading.distance_to_wall);
                } else {
                    return None;
                }
            }
            PursuitState::WallReverse => {
                if reading.distance_to_wall > cfg.reverse_wall_distance {
                    self.state = PursuitState::Seek;
                    self.forced_reverse = false;
                    return None;
                }
            }
        }

        self.wall_reverse_elapsed += dt;

        // Forced reverse: the wall is too close to bleed speed first and the
        // wait timer has elapsed, so the speed gate is bypassed. Above the
        // gate (and not forced) the brake bleeds speed; at or below it, the
        // same sustained brake is what flips the drive model into reverse.
        // The emitted tuple is identical either way.
        let forced = cfg.forced_reverse
            && reading.distance_to_wall < cfg.critical_wall_distance
            && self.wall_reverse_elapsed > cfg.force_reverse_wait_time;
        self.forced_reverse = forced;
        Some(DriveCommand { throttle: 0.0, brake: 1.0, steer: 0.0 })
    }

    // ----------------------------------------------------------
    // Seek: head for the next corner, brake on approach, smooth the turn.
    // ----------------------------------------------------------
    fn seek(
        &mut self,
        frame: &BodyFrame,
        speed_kmh: f32,
        target: Vec3,
        path: &NavPath,
        dt: f32,
    ) -> DriveCommand {
        let cfg = self.config;

        // Next corner, the final corner when only one remains, or the raw
        // target position when there is no path at all.
        let waypoint = if path.corners.len() > 1 {
            path.corners[1]
        } else if let Some(&last) = path.corners.last() {
            last
        } else {
            target
        };
        self.last_waypoint = waypoint;

        let mut forward_amount = 0.0;
        let mut brake_amount = 0.0;
        let mut target_turn = 0.0;

        let to_waypoint = v_sub(waypoint, frame.position);
        let distance = v_mag(to_waypoint);

        if distance > cfg.reached_target_distance {
            let facing_dot = v_dot(frame.forward, v_norm(to_waypoint));

            if facing_dot > 0.0 {
                forward_amount = 1.0;
                // Approach deceleration: close and still fast.
                if distance < cfg.stopping_distance && speed_kmh > cfg.stopping_speed {
                    forward_amount = 0.0;
                    brake_amount = 1.0;
                }
            } else if distance > cfg.reverse_distance {
                // Far enough that turning around forward is cheaper than
                // reversing.
                forward_amount = 1.0;
            } else {
                brake_amount = 1.0;
            }

            let angle = signed_yaw_angle(frame.forward, to_waypoint, frame.up);
            target_turn = (angle / cfg.max_steering_angle).clamp(-1.0, 1.0);
        } else if speed_kmh > cfg.brake_speed {
            brake_amount = 1.0;
        }
        // else: reached and slow - idle, no throttle, no brake.

        // Exponential approach toward the target turn; assigning it directly
        // jitters visibly at tick rate.
        let t = (cfg.steering_smoothing * dt).clamp(0.0, 1.0);
        self.current_turn += (target_turn - self.current_turn) * t;

        DriveCommand {
            throttle: forward_amount,
            brake: brake_amount,
            steer: self.current_turn,
        }
    }
}
