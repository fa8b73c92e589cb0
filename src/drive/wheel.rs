//! Per-wheel actuator state + suspension geometry.

use crate::drive::types::Vec3;

/// One wheel: static geometry assigned at construction, runtime state
/// refreshed once per physics tick. Owned exclusively by the drive model.
#[derive(Debug, Clone)]
pub struct WheelActuator {
    // --- geometry (fixed at construction) ---
    pub offset: Vec3,        // chassis local space
    pub radius: f32,         // m
    pub rest_length: f32,    // suspension neutral length, m
    pub max_travel: f32,     // max compression, m
    pub stiffness: f32,      // N/m
    pub damping: f32,        // N*s/m
    pub is_drive: bool,      // receives motor torque
    pub is_steerable: bool,  // front axle

    // --- runtime state (refreshed per tick) ---
    pub rotational_speed: f32,   // rpm, signed
    pub forward_slip: f32,
    pub sideways_slip: f32,
    pub motor_torque: f32,       // Nm
    pub brake_torque: f32,       // Nm
    pub steer_angle: f32,        // deg
    pub is_grounded: bool,
    pub suspension_travel: f32,  // current compression, m
}

impl WheelActuator {
    pub fn new(offset: Vec3, radius: f32, is_drive: bool, is_steerable: bool) -> Self {
        Self {
            offset,
            radius: radius.max(MIN_RADIUS),
            rest_length: 0.5,
            max_travel: 0.4,
            stiffness: 0.0, // derived in DriveModel::new from sag
            damping: 0.0,
            is_drive,
            is_steerable,
            rotational_speed: 0.0,
            forward_slip: 0.0,
            sideways_slip: 0.0,
            motor_torque: 0.0,
            brake_torque: 0.0,
            steer_angle: 0.0,
            is_grounded: false,
            suspension_travel: 0.0,
        }
    }

    /// Refresh rotation state from the measured longitudinal contact
    /// velocity. Rolling without angular wheel dynamics: rpm follows the
    /// ground speed at the patch.
    pub fn update_from_contact(&mut self, v_long: f32, v_lat: f32) {
        let circumference = 2.0 * std::f32::consts::PI * self.radius.max(MIN_RADIUS);
        self.rotational_speed = v_long / circumference * 60.0;
        self.forward_slip = 0.0; // overwritten by the tire solve when torque saturates
        self.sideways_slip = v_lat / v_long.abs().max(1.0);
    }

    /// Implied linear speed of this wheel from its rpm (km/h).
    pub fn speed_kmh(&self) -> f32 {
        (self.rotational_speed.abs() / 60.0)
            * (2.0 * std::f32::consts::PI * self.radius.max(MIN_RADIUS))
            * 3.6
    }

    /// Ray length for the suspension cast.
    pub fn cast_length(&self) -> f32 {
        self.rest_length + self.max_travel + self.radius
    }
}

/// Zero radius / zero travel are setup mistakes; clamp before any division.
pub const MIN_RADIUS: f32 = 0.05;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpm_follows_contact_speed() {
        let mut w = WheelActuator::new([0.0, 0.0, 0.0], 0.35, true, false);
        // 10 m/s over a 0.35 m wheel: v / (2*pi*r) * 60 rpm
        w.update_from_contact(10.0, 0.0);
        let expected = 10.0 / (2.0 * std::f32::consts::PI * 0.35) * 60.0;
        assert!((w.rotational_speed - expected).abs() < 1e-3);
        // and the round trip back to km/h matches the contact speed
        assert!((w.speed_kmh() - 36.0).abs() < 0.1);
    }

    #[test]
    fn zero_radius_is_clamped() {
        let w = WheelActuator::new([0.0, 0.0, 0.0], 0.0, true, false);
        assert!(w.radius >= MIN_RADIUS);
        assert!(w.speed_kmh().is_finite());
    }
}
