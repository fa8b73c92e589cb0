//! Core shared types for the drive model (engine-agnostic).

pub type Vec3 = [f32; 3];

// ----- tiny vec helpers (avoid pulling a math crate into the drive core) -----
#[inline] pub fn v_add(a: Vec3, b: Vec3) -> Vec3 { [a[0]+b[0], a[1]+b[1], a[2]+b[2]] }
#[inline] pub fn v_sub(a: Vec3, b: Vec3) -> Vec3 { [a[0]-b[0], a[1]-b[1], a[2]-b[2]] }
#[inline] pub fn v_scale(v: Vec3, s: f32) -> Vec3 { [v[0]*s, v[1]*s, v[2]*s] }
#[inline] pub fn v_dot(a: Vec3, b: Vec3) -> f32 { a[0]*b[0] + a[1]*b[1] + a[2]*b[2] }
#[inline] pub fn v_mag(v: Vec3) -> f32 { v_dot(v, v).sqrt() }

#[inline]
pub fn v_norm(v: Vec3) -> Vec3 {
    let m = v_mag(v);
    if m > 1e-6 { v_scale(v, 1.0 / m) } else { [0.0, 0.0, 0.0] }
}

#[inline]
pub fn v_cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1]*b[2] - a[2]*b[1],
        a[2]*b[0] - a[0]*b[2],
        a[0]*b[1] - a[1]*b[0],
    ]
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Signed yaw angle (degrees) from `from` to `to`, both projected onto the
/// ground plane. Positive when `to` lies toward the vehicle's right.
pub fn signed_yaw_angle(from: Vec3, to: Vec3, up: Vec3) -> f32 {
    let f = v_norm(v_sub(from, v_scale(up, v_dot(from, up))));
    let t = v_norm(v_sub(to, v_scale(up, v_dot(to, up))));
    let sin = -v_dot(v_cross(f, t), up);
    let cos = v_dot(f, t);
    sin.atan2(cos).to_degrees()
}

// ============================================
// ----- command + body snapshot --------------
// ============================================

/// The one command contract of the core: any producer (human or AI) that
/// emits this tuple at fixed-tick rate can drive a vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveCommand {
    pub throttle: f32, // 0..1
    pub brake: f32,    // 0..1
    pub steer: f32,    // -1..1, positive = right
}

impl DriveCommand {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn clamped(self) -> Self {
        Self {
            throttle: self.throttle.clamp(0.0, 1.0),
            brake: self.brake.clamp(0.0, 1.0),
            steer: self.steer.clamp(-1.0, 1.0),
        }
    }
}

/// Per-tick snapshot of the chassis rigid body, sampled by the physics shell.
/// Basis: `forward = -Z`, `up = +Y`, `right = forward x up` in body space.
#[derive(Debug, Clone, Copy)]
pub struct BodyFrame {
    pub position: Vec3,
    pub forward: Vec3, // unit, world space
    pub right: Vec3,   // unit, world space
    pub up: Vec3,      // unit, world space
    pub linvel: Vec3,  // m/s
    pub angvel: Vec3,  // rad/s
    pub mass: f32,     // kg
}

impl BodyFrame {
    /// Signed forward speed (m/s, body-frame projection).
    pub fn forward_speed(&self) -> f32 {
        v_dot(self.linvel, self.forward)
    }

    /// Unsigned chassis speed (km/h).
    pub fn speed_kmh(&self) -> f32 {
        v_mag(self.linvel) * 3.6
    }

    /// Chassis-local point to world space. Local basis: -Z forward, +Y up.
    pub fn local_to_world(&self, p: Vec3) -> Vec3 {
        v_add(
            self.position,
            v_add(
                v_scale(self.right, p[0]),
                v_add(v_scale(self.up, p[1]), v_scale(self.forward, -p[2])),
            ),
        )
    }
}

// ============================================
// ----- impulse requests ---------------------
// ============================================

#[derive(Clone, Copy, Debug)]
pub struct Impulse {
    /// Linear impulse in world space (N*s).
    pub impulse: Vec3,
    /// Optional application point (world). If None => apply at COM.
    pub at_point: Option<Vec3>,
}

/// Body-level side effects of one `drive()` call, applied by the physics
/// shell in the same tick.
#[derive(Debug, Default)]
pub struct BodyEffects {
    pub impulses: Vec<Impulse>,
    /// Torque impulses in world space (N*m*s).
    pub torques: Vec<Vec3>,
}

// ============================================
// ----- configuration ------------------------
// ============================================

/// Travel direction of the drivetrain (not of the chassis velocity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy)]
pub struct DriveConfig {
    pub engine_torque: f32,       // Nm, base torque coefficient
    pub final_drive_ratio: f32,
    pub brake_torque: f32,        // Nm, split across braking wheels
    pub maximum_speed: f32,       // km/h, hard governor

    pub steering_angle: f32,          // deg, max at standstill
    pub high_speed_steer_ref: f32,    // km/h where authority bottoms out

    pub minimum_engine_rpm: f32,
    pub maximum_engine_rpm: f32,

    pub downforce: f32,               // N per (m/s) of chassis speed
    pub anti_rollover_force: f32,     // corrective torque gain
    pub max_tilt_angle: f32,          // deg
    /// Optional tuning: damp roll/pitch spin while the corrective torque is
    /// active. Off by default; the stock behavior applies torque only.
    pub clamp_tilt_spin: bool,

    // reverse hysteresis
    pub reverse_speed_threshold: f32,   // km/h
    pub reverse_brake_entry: f32,       // brake input >= this accumulates
    pub reverse_brake_release: f32,     // brake input <= this resets
    pub force_reverse_entry_time: f32,  // s

    // chassis + suspension
    pub mass: f32,                  // kg
    pub chassis_half_extents: Vec3, // [hx, hy, hz] meters
    pub com_height: f32,            // local COM y offset, negative = lowered
    pub suspension_sag: f32,        // m, static sag used to derive the spring
    pub damping_ratio: f32,         // 0.7-1.0
    pub anti_roll_force: f32,       // N per unit travel difference, per axle
    pub mu: f32,                    // tire friction coefficient
}

pub const SEDAN: DriveConfig = DriveConfig {
    engine_torque: 400.0,       // Nm
    final_drive_ratio: 3.2,
    brake_torque: 500.0,        // Nm
    maximum_speed: 160.0,       // km/h

    steering_angle: 30.0,       // deg
    high_speed_steer_ref: 100.0,// km/h

    minimum_engine_rpm: 650.0,
    maximum_engine_rpm: 7000.0,

    downforce: 100.0,
    anti_rollover_force: 3.0,
    max_tilt_angle: 45.0,
    clamp_tilt_spin: false,

    reverse_speed_threshold: 5.0,  // km/h
    reverse_brake_entry: 0.75,
    reverse_brake_release: 0.25,
    force_reverse_entry_time: 0.4, // s

    mass: 1350.0,                  // kg
    chassis_half_extents: [1.0, 0.35, 2.1],
    com_height: -0.15,             // slightly below visual center
    suspension_sag: 0.05,          // m
    damping_ratio: 0.9,
    anti_roll_force: 1000.0,
    mu: 0.9,
};

/// Chaser tune: same drivetrain, slightly softer brakes so pursuit braking
/// bleeds speed over a few ticks instead of locking instantly.
pub const PURSUER: DriveConfig = DriveConfig {
    brake_torque: 450.0,
    maximum_speed: 150.0,
    ..SEDAN
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaw_angle_is_positive_toward_the_right() {
        let forward = [0.0, 0.0, -1.0];
        let up = [0.0, 1.0, 0.0];

        assert!((signed_yaw_angle(forward, [1.0, 0.0, 0.0], up) - 90.0).abs() < 1e-3);
        assert!((signed_yaw_angle(forward, [-1.0, 0.0, 0.0], up) + 90.0).abs() < 1e-3);
        assert!(signed_yaw_angle(forward, [1.0, 0.0, -1.0], up) > 0.0);
        assert!(signed_yaw_angle(forward, forward, up).abs() < 1e-3);
    }

    #[test]
    fn command_clamping_keeps_the_contract_ranges() {
        let c = DriveCommand { throttle: 2.0, brake: -0.5, steer: -3.0 }.clamped();
        assert_eq!(c.throttle, 1.0);
        assert_eq!(c.brake, 0.0);
        assert_eq!(c.steer, -1.0);
    }

    #[test]
    fn local_points_map_through_the_body_basis() {
        let frame = BodyFrame {
            position: [10.0, 1.0, -5.0],
            forward: [0.0, 0.0, -1.0],
            right: [1.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            linvel: [0.0, 0.0, 0.0],
            angvel: [0.0, 0.0, 0.0],
            mass: 1000.0,
        };
        // local +Z is behind the vehicle when forward is -Z
        assert_eq!(frame.local_to_world([0.0, 0.0, 2.0]), [10.0, 1.0, -3.0]);
        assert_eq!(frame.local_to_world([1.0, -0.5, 0.0]), [11.0, 0.5, -5.0]);
    }
}
