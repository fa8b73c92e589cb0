// ==============================================================================
// model.rs — DRIVE MODEL (command tuple -> wheel torques + body effects)
// ==============================================================================
// One call per physics tick:
//
//   drive(frame, command, dt)
//
// 1) Reverse detection: signed forward speed + sustained-brake hysteresis
// 2) Drive torque: engine * final drive, split across drive wheels, with a
//    per-wheel speed governor
// 3) Brake torque: input source swaps with direction (throttle brakes while
//    reversing)
// 4) Steering: front axle only, authority shrinks with speed (floor 25%)
// 5) Engine RPM: derived from wheel rpm, display/telemetry only
// 6) Downforce + anti-rollover torque, returned as body effects
//
// The model mutates its wheel array; the physics shell turns wheel torques
// into ground impulses (tire.rs) and applies the body effects.
// ==============================================================================

use crate::drive::types::{
    BodyEffects, BodyFrame, Direction, DriveCommand, DriveConfig, Impulse,
    lerp, v_cross, v_dot, v_scale,
};
use crate::drive::wheel::WheelActuator;

pub struct DriveModel {
    pub config: DriveConfig,
    pub wheels: Vec<WheelActuator>,

    direction: Direction,
    engine_rpm: f32,
    forward_speed_kmh: f32, // signed, body-frame projection
    speed_kmh: f32,         // unsigned chassis speed
    reverse_timer: f32,     // s of sustained brake at near-zero speed
    setup_warned: bool,
}

impl DriveModel {
    /// Build a model with the standard 4-wheel layout: front axle steerable,
    /// all four driven. Spring/damper constants are derived from static sag,
    /// per wheel.
    pub fn new(config: DriveConfig) -> Self {
        let track = config.chassis_half_extents[0] * 0.8;
        let axle = config.chassis_half_extents[2] * 0.7;
        let y = -config.chassis_half_extents[1];

        let mut wheels = vec![
            WheelActuator::new([-track, y, -axle], 0.35, true, true), // FL
            WheelActuator::new([track, y, -axle], 0.35, true, true),  // FR
            WheelActuator::new([-track, y, axle], 0.35, true, false), // RL
            WheelActuator::new([track, y, axle], 0.35, true, false),  // RR
        ];

        let (k, c) = suspension_from_sag(
            config.mass,
            wheels.len(),
            config.suspension_sag,
            config.damping_ratio,
        );
        for w in wheels.iter_mut() {
            w.stiffness = k;
            w.damping = c;
        }

        Self::with_wheels(config, wheels)
    }

    pub fn with_wheels(config: DriveConfig, wheels: Vec<WheelActuator>) -> Self {
        Self {
            config,
            wheels,
            direction: Direction::Forward,
            engine_rpm: config.minimum_engine_rpm,
            forward_speed_kmh: 0.0,
            speed_kmh: 0.0,
            reverse_timer: 0.0,
            setup_warned: false,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn engine_rpm(&self) -> f32 {
        self.engine_rpm
    }

    /// Signed forward speed, m/s. Exposed to other systems (collision
    /// handler, pursuit controller).
    pub fn current_speed(&self) -> f32 {
        self.forward_speed_kmh / 3.6
    }

    pub fn forward_speed_kmh(&self) -> f32 {
        self.forward_speed_kmh
    }

    pub fn speed_kmh(&self) -> f32 {
        self.speed_kmh
    }

    /// Main drive interface. Expected to be invoked exactly once per physics
    /// step, with whatever command is current (level-triggered, not edge).
    pub fn drive(&mut self, frame: &BodyFrame, command: DriveCommand, dt: f32) -> BodyEffects {
        let mut effects = BodyEffects::default();

        if self.wheels.is_empty() {
            if !self.setup_warned {
                log::warn!("drive model has no wheels; drive() is a no-op");
                self.setup_warned = true;
            }
            return effects;
        }

        let cmd = command.clamped();

        self.forward_speed_kmh = frame.forward_speed() * 3.6;
        self.speed_kmh = frame.speed_kmh();

        self.reverse_logic(cmd.brake, dt);
        self.apply_traction_and_brakes(cmd.throttle, cmd.brake);
        self.apply_steering(cmd.steer);
        self.engine_rpm_calculation();

        self.add_downforce(frame, dt, &mut effects);
        self.apply_anti_rollover(frame, dt, &mut effects);

        effects
    }

    // ----------------------------------------------------------
    // Reverse detection (low-speed long-brake hysteresis)
    // ----------------------------------------------------------
    fn reverse_logic(&mut self, brake: f32, dt: f32) {
        let cfg = &self.config;
        let near_zero = self.forward_speed_kmh.abs() <= cfg.reverse_speed_threshold;

        if near_zero && brake >= cfg.reverse_brake_entry {
            self.reverse_timer += dt;
        } else if near_zero && brake <= cfg.reverse_brake_release {
            self.reverse_timer = 0.0;
        }
        // Between the two thresholds (or above the speed gate) the timer
        // holds: direction stays sticky until the brake is clearly released.

        self.direction = if self.reverse_timer >= cfg.force_reverse_entry_time {
            Direction::Reverse
        } else {
            Direction::Forward
        };
    }

    // ----------------------------------------------------------
    // Drive + brake torque distribution
    // ----------------------------------------------------------
    fn apply_traction_and_brakes(&mut self, throttle: f32, brake: f32) {
        let cfg = self.config;

        let drive_count = self.wheels.iter().filter(|w| w.is_drive).count().max(1) as f32;
        let brake_count = self.wheels.len().max(1) as f32;

        // Forward: throttle drives. Reverse: brake input becomes reverse
        // torque and the accelerator takes over as the brake.
        let drive_input = match self.direction {
            Direction::Forward => throttle,
            Direction::Reverse => -brake,
        };
        let total_torque = cfg.engine_torque * cfg.final_drive_ratio * drive_input;
        let per_wheel_torque = total_torque / drive_count;

        let input_for_brake = match self.direction {
            Direction::Forward => brake,
            Direction::Reverse => throttle,
        };
        let per_wheel_brake = cfg.brake_torque * input_for_brake / brake_count;

        let speed = self.speed_kmh;
        for w in self.wheels.iter_mut() {
            if w.is_drive {
                // Hard governor, checked per wheel: one spinning wheel cannot
                // exceed the cap even if the chassis is under it.
                if speed >= cfg.maximum_speed || w.speed_kmh() >= cfg.maximum_speed {
                    w.motor_torque = 0.0;
                } else {
                    w.motor_torque = per_wheel_torque;
                }
            } else {
                w.motor_torque = 0.0;
            }
            w.brake_torque = per_wheel_brake;
        }
    }

    // ----------------------------------------------------------
    // Steering (front axle, speed-sensitive authority)
    // ----------------------------------------------------------
    fn apply_steering(&mut self, steer: f32) {
        let cfg = &self.config;
        let speed_factor = lerp(
            1.0,
            0.25,
            (self.forward_speed_kmh.abs() / cfg.high_speed_steer_ref).clamp(0.0, 1.0),
        );
        let applied = cfg.steering_angle * steer * speed_factor;

        for w in self.wheels.iter_mut() {
            w.steer_angle = if w.is_steerable { applied } else { 0.0 };
        }
    }

    // ----------------------------------------------------------
    // Engine RPM (derived display value, not used for torque)
    // ----------------------------------------------------------
    fn engine_rpm_calculation(&mut self) {
        let cfg = &self.config;
        let count = self.wheels.len() as f32;
        let avg_rpm: f32 =
            self.wheels.iter().map(|w| w.rotational_speed.abs()).sum::<f32>() / count;

        let normalized = ((avg_rpm / 60.0) / (cfg.maximum_speed / 3.6 + 1e-4)).clamp(0.0, 1.0);
        self.engine_rpm = lerp(cfg.minimum_engine_rpm, cfg.maximum_engine_rpm, normalized)
            .clamp(cfg.minimum_engine_rpm, cfg.maximum_engine_rpm);
    }

    // ----------------------------------------------------------
    // Downforce: presses the chassis down proportional to speed
    // ----------------------------------------------------------
    fn add_downforce(&self, frame: &BodyFrame, dt: f32, effects: &mut BodyEffects) {
        let magnitude = self.config.downforce * (self.speed_kmh / 3.6);
        if magnitude > 0.0 {
            effects.impulses.push(Impulse {
                impulse: v_scale(frame.up, -magnitude * dt),
                at_point: None,
            });
        }
    }

    // ----------------------------------------------------------
    // Anti-rollover: corrective torque above the tilt limit
    // ----------------------------------------------------------
    fn apply_anti_rollover(&self, frame: &BodyFrame, dt: f32, effects: &mut BodyEffects) {
        let cfg = &self.config;
        let world_up = [0.0, 1.0, 0.0];

        let tilt = v_dot(frame.up, world_up).clamp(-1.0, 1.0).acos().to_degrees();
        if tilt <= cfg.max_tilt_angle {
            return;
        }

        // Torque axis rights the chassis toward world up. Scaled by mass so
        // the gain behaves as an angular acceleration, independent of tune.
        let corrective = v_scale(
            v_cross(frame.up, world_up),
            cfg.anti_rollover_force * frame.mass * dt,
        );
        effects.torques.push(corrective);

        if cfg.clamp_tilt_spin {
            // Optional tuning: bleed roll/pitch spin while correcting, so the
            // torque does not wind the chassis up into an oscillation.
            let yaw_part = v_scale(frame.up, v_dot(frame.angvel, frame.up));
            let spin = [
                frame.angvel[0] - yaw_part[0],
                frame.angvel[1] - yaw_part[1],
                frame.angvel[2] - yaw_part[2],
            ];
            effects.torques.push(v_scale(spin, -0.5 * frame.mass * dt));
        }
    }
}

/// Spring constant from static sag, damper from the damping ratio.
fn suspension_from_sag(vehicle_mass: f32, wheels: usize, sag_m: f32, zeta: f32) -> (f32, f32) {
    let m = vehicle_mass / wheels.max(1) as f32;
    let g = 9.81_f32;
    let k = (m * g) / sag_m.max(1e-3); // N/m
    let c = 2.0 * zeta * (k * m).sqrt();
    (k, c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::types::SEDAN;

    fn frame_at(forward_mps: f32) -> BodyFrame {
        BodyFrame {
            position: [0.0, 0.5, 0.0],
            forward: [0.0, 0.0, -1.0],
            right: [1.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            linvel: [0.0, 0.0, -forward_mps],
            angvel: [0.0, 0.0, 0.0],
            mass: SEDAN.mass,
        }
    }

    fn model() -> DriveModel {
        DriveModel::new(SEDAN)
    }

    #[test]
    fn full_throttle_splits_torque_evenly() {
        let mut m = model();
        m.drive(
            &frame_at(0.0),
            DriveCommand { throttle: 1.0, brake: 0.0, steer: 0.0 },
            1.0 / 60.0,
        );
        // 400 * 3.2 = 1280 total, 320 per drive wheel
        for w in &m.wheels {
            assert!((w.motor_torque - 320.0).abs() < 1e-3);
        }
    }

    #[test]
    fn per_wheel_torque_never_exceeds_total_over_drive_count() {
        let cap = SEDAN.engine_torque * SEDAN.final_drive_ratio / 4.0;
        for t in 0..=10 {
            for b in 0..=10 {
                let mut m = model();
                let cmd = DriveCommand {
                    throttle: t as f32 / 10.0,
                    brake: b as f32 / 10.0,
                    steer: 0.0,
                };
                m.drive(&frame_at(3.0), cmd, 1.0 / 60.0);
                for w in &m.wheels {
                    assert!(w.motor_torque.abs() <= cap + 1e-3);
                }
            }
        }
    }

    #[test]
    fn governor_zeroes_only_the_spinning_wheel() {
        let mut m = model();
        // One wheel spun up past the cap; chassis itself is slow.
        m.wheels[2].rotational_speed = 10_000.0;
        m.drive(
            &frame_at(2.0),
            DriveCommand { throttle: 1.0, brake: 0.0, steer: 0.0 },
            1.0 / 60.0,
        );
        assert_eq!(m.wheels[2].motor_torque, 0.0);
        assert!((m.wheels[0].motor_torque - 320.0).abs() < 1e-3);
        assert!((m.wheels[3].motor_torque - 320.0).abs() < 1e-3);
    }

    #[test]
    fn reverse_requires_sustained_brake() {
        let dt = 1.0 / 60.0;
        let mut m = model();
        let hold = DriveCommand { throttle: 0.0, brake: 1.0, steer: 0.0 };

        // Not enough sustained time: still forward.
        for _ in 0..12 {
            m.drive(&frame_at(0.0), hold, dt); // 0.2 s
        }
        assert_eq!(m.direction(), Direction::Forward);

        // Past the entry time: reverse.
        for _ in 0..18 {
            m.drive(&frame_at(0.0), hold, dt); // 0.5 s total
        }
        assert_eq!(m.direction(), Direction::Reverse);

        // Releasing the brake at near-zero speed resets immediately.
        m.drive(&frame_at(0.0), DriveCommand::idle(), dt);
        assert_eq!(m.direction(), Direction::Forward);
    }

    #[test]
    fn throttle_interleaving_does_not_break_the_hysteresis() {
        let dt = 1.0 / 60.0;
        let mut m = model();
        // Brake held >= 0.75 the whole window while throttle flaps: the
        // timer accumulates regardless of throttle.
        for i in 0..30 {
            let cmd = DriveCommand {
                throttle: if i % 2 == 0 { 1.0 } else { 0.0 },
                brake: 0.8,
                steer: 0.0,
            };
            m.drive(&frame_at(0.0), cmd, dt);
        }
        assert_eq!(m.direction(), Direction::Reverse);

        // Brake in the dead band (release < b < entry): timer holds, the
        // direction does not flap back.
        let mut m = model();
        for _ in 0..30 {
            m.drive(&frame_at(0.0), DriveCommand { throttle: 0.0, brake: 1.0, steer: 0.0 }, dt);
        }
        assert_eq!(m.direction(), Direction::Reverse);
        m.drive(&frame_at(0.0), DriveCommand { throttle: 0.0, brake: 0.5, steer: 0.0 }, dt);
        assert_eq!(m.direction(), Direction::Reverse);
    }

    #[test]
    fn accelerator_brakes_while_reversing() {
        let dt = 1.0 / 60.0;
        let mut m = model();
        for _ in 0..30 {
            m.drive(&frame_at(0.0), DriveCommand { throttle: 0.0, brake: 1.0, steer: 0.0 }, dt);
        }
        assert_eq!(m.direction(), Direction::Reverse);

        // Reverse with brake held: negative motor torque, no brake torque
        // (throttle is the brake source now and it is zero).
        assert!(m.wheels[0].motor_torque < 0.0);
        assert_eq!(m.wheels[0].brake_torque, 0.0);
    }

    #[test]
    fn steering_authority_shrinks_with_speed() {
        let dt = 1.0 / 60.0;
        let cmd = DriveCommand { throttle: 0.0, brake: 0.0, steer: 1.0 };

        let mut m = model();
        m.drive(&frame_at(0.0), cmd, dt);
        assert!((m.wheels[0].steer_angle - SEDAN.steering_angle).abs() < 1e-3);

        // At the reference speed: exactly 25% authority.
        let ref_mps = SEDAN.high_speed_steer_ref / 3.6;
        let mut m = model();
        m.drive(&frame_at(ref_mps), cmd, dt);
        assert!((m.wheels[0].steer_angle - SEDAN.steering_angle * 0.25).abs() < 1e-3);

        // Rear axle never steers.
        assert_eq!(m.wheels[2].steer_angle, 0.0);
        assert_eq!(m.wheels[3].steer_angle, 0.0);
    }

    #[test]
    fn engine_rpm_stays_in_range() {
        let dt = 1.0 / 60.0;
        let mut m = model();
        m.drive(&frame_at(0.0), DriveCommand::idle(), dt);
        assert_eq!(m.engine_rpm(), SEDAN.minimum_engine_rpm);

        for w in m.wheels.iter_mut() {
            w.rotational_speed = 100_000.0;
        }
        m.drive(&frame_at(0.0), DriveCommand::idle(), dt);
        assert_eq!(m.engine_rpm(), SEDAN.maximum_engine_rpm);
    }

    #[test]
    fn downforce_opposes_body_up_and_scales_with_speed() {
        let dt = 1.0 / 60.0;
        let mut m = model();
        let fx = m.drive(&frame_at(20.0), DriveCommand::idle(), dt);
        let down = fx
            .impulses
            .iter()
            .find(|i| i.at_point.is_none())
            .expect("downforce impulse");
        assert!(down.impulse[1] < 0.0);
        assert!((down.impulse[1].abs() - SEDAN.downforce * 20.0 * dt).abs() < 1e-3);
    }

    #[test]
    fn anti_rollover_engages_past_the_tilt_limit() {
        let dt = 1.0 / 60.0;
        let mut m = model();

        let mut tilted = frame_at(0.0);
        // Rolled ~60 deg about the forward axis: up leans toward +X.
        let a = 60.0_f32.to_radians();
        tilted.up = [a.sin(), a.cos(), 0.0];

        let fx = m.drive(&tilted, DriveCommand::idle(), dt);
        assert_eq!(fx.torques.len(), 1);

        let mut upright = frame_at(0.0);
        upright.up = [0.0, 1.0, 0.0];
        let fx = m.drive(&upright, DriveCommand::idle(), dt);
        assert!(fx.torques.is_empty());
    }

    #[test]
    fn empty_wheel_array_is_an_inert_no_op() {
        let mut m = DriveModel::with_wheels(SEDAN, Vec::new());
        let fx = m.drive(
            &frame_at(5.0),
            DriveCommand { throttle: 1.0, brake: 0.0, steer: 0.5 },
            1.0 / 60.0,
        );
        assert!(fx.impulses.is_empty());
        assert!(fx.torques.is_empty());
    }
}
