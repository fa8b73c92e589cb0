// ==============================================================================
// tire.rs — CONTACT SOLVE (wheel torques -> ground impulses)
// ==============================================================================
// Impulse-domain model:
// - Drive force = motor torque / radius, along the steered wheel forward
// - Brake impulse cancels longitudinal velocity, capped by brake torque
//   (never "pushes forward" when braking)
// - Lateral impulse cancels slip velocity at the patch, giving grip + yaw
// - A combined friction ellipse keeps long + lat inside mu * Fz * dt
//
// No wheel angular velocity state is tracked; slip telemetry is derived from
// demand vs capacity. Stability comes from the per-tick impulse clamps.
// ==============================================================================

use crate::drive::types::{BodyFrame, Impulse, Vec3, v_mag, v_scale};
use crate::drive::wheel::{MIN_RADIUS, WheelActuator};

/// One wheel's ground contact for this tick, produced by the suspension
/// raycast pass.
#[derive(Debug, Clone, Copy)]
pub struct ContactPatch {
    pub wheel: usize, // index into the drive model's wheel array
    pub grounded: bool,

    pub hit_point: Vec3,
    pub apply_point: Vec3, // lifted slightly above the patch

    pub forward: Vec3, // steered wheel forward on the ground plane
    pub side: Vec3,    // wheel right on the ground plane

    pub v_long: f32, // m/s along forward
    pub v_lat: f32,  // m/s along side

    pub normal_force: f32, // N
}

/// Minimum support force before a patch generates traction.
const MIN_TRACTION_FORCE: f32 = 50.0;

/// Longitudinal velocity deadzone, kills micro jitter at standstill.
const BRAKE_DEADZONE: f32 = 0.05;

pub fn solve_contacts(
    frame: &BodyFrame,
    wheels: &mut [WheelActuator],
    contacts: &[ContactPatch],
    mu: f32,
    dt: f32,
) -> Vec<Impulse> {
    let mut impulses = Vec::new();

    let grounded = contacts.iter().filter(|c| c.grounded).count().max(1) as f32;
    let mass_share = frame.mass / grounded;

    for c in contacts {
        if !c.grounded || c.normal_force < MIN_TRACTION_FORCE {
            continue;
        }
        let Some(w) = wheels.get_mut(c.wheel) else { continue };

        let capacity = (mu * c.normal_force * dt).max(1e-6); // N*s this tick
        let radius = w.radius.max(MIN_RADIUS);

        // -------------------------
        // ENGINE
        // -------------------------
        let drive_demand = (w.motor_torque / radius) * dt;
        let drive_scalar = drive_demand.clamp(-capacity, capacity);
        // Slip telemetry: how far past traction the torque demand went.
        w.forward_slip = (drive_demand.abs() / capacity - 1.0).max(0.0);

        // -------------------------
        // BRAKE (opposes v_long)
        // -------------------------
        let max_brake = ((w.brake_torque / radius) * dt).min(capacity);
        let mut brake_scalar = -(c.v_long * mass_share).clamp(-max_brake, max_brake);
        if c.v_long.abs() < BRAKE_DEADZONE {
            brake_scalar = 0.0;
        }

        let long_scalar = drive_scalar + brake_scalar;
        let long = v_scale(c.forward, long_scalar);

        // -------------------------
        // LATERAL (grip)
        // -------------------------
        let lat_desired = -(c.v_lat * mass_share);
        let lat = v_scale(c.side, lat_desired.clamp(-capacity, capacity));

        // -------------------------
        // Combined friction ellipse
        // -------------------------
        let nx = v_mag(long) / capacity;
        let ny = v_mag(lat) / capacity;
        let ellipse = nx * nx + ny * ny;
        let scale = if ellipse > 1.0 { 1.0 / ellipse.sqrt() } else { 1.0 };

        let long = v_scale(long, scale);
        let lat = v_scale(lat, scale);

        // Longitudinal at COM; lateral at the (lifted) patch so cornering
        // produces yaw.
        if v_mag(long) > 1e-6 {
            impulses.push(Impulse { impulse: long, at_point: None });
        }
        if v_mag(lat) > 1e-6 {
            impulses.push(Impulse { impulse: lat, at_point: Some(c.apply_point) });
        }
    }

    impulses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::types::SEDAN;

    fn frame() -> BodyFrame {
        BodyFrame {
            position: [0.0, 0.5, 0.0],
            forward: [0.0, 0.0, -1.0],
            right: [1.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            linvel: [0.0, 0.0, 0.0],
            angvel: [0.0, 0.0, 0.0],
            mass: SEDAN.mass,
        }
    }

    fn patch(wheel: usize, v_long: f32, v_lat: f32, fz: f32) -> ContactPatch {
        ContactPatch {
            wheel,
            grounded: true,
            hit_point: [0.0, 0.0, 0.0],
            apply_point: [0.0, 0.09, 0.0],
            forward: [0.0, 0.0, -1.0],
            side: [1.0, 0.0, 0.0],
            v_long,
            v_lat,
            normal_force: fz,
        }
    }

    #[test]
    fn motor_torque_pushes_along_wheel_forward() {
        let mut wheels = vec![WheelActuator::new([0.0, 0.0, 0.0], 0.35, true, false)];
        wheels[0].motor_torque = 320.0;
        let dt = 1.0 / 60.0;

        let out = solve_contacts(&frame(), &mut wheels, &[patch(0, 0.0, 0.0, 4000.0)], 0.9, dt);
        assert_eq!(out.len(), 1);
        // forward is -Z: positive torque gives a -Z impulse
        assert!(out[0].impulse[2] < 0.0);
        let expected = 320.0 / 0.35 * dt;
        assert!((v_mag(out[0].impulse) - expected).abs() < 1e-3);
    }

    #[test]
    fn impulse_is_capped_by_traction() {
        let mut wheels = vec![WheelActuator::new([0.0, 0.0, 0.0], 0.35, true, false)];
        wheels[0].motor_torque = 50_000.0; // far past what the patch can carry
        let dt = 1.0 / 60.0;
        let fz = 3000.0;

        let out = solve_contacts(&frame(), &mut wheels, &[patch(0, 0.0, 0.0, fz)], 0.9, dt);
        assert!((v_mag(out[0].impulse) - 0.9 * fz * dt).abs() < 1e-3);
        assert!(wheels[0].forward_slip > 0.0);
    }

    #[test]
    fn brake_opposes_motion_and_never_reverses_it() {
        let mut wheels = vec![WheelActuator::new([0.0, 0.0, 0.0], 0.35, true, false)];
        wheels[0].brake_torque = 125.0;
        let dt = 1.0 / 60.0;

        // Rolling forward (v_long > 0 along wheel forward)
        let out = solve_contacts(&frame(), &mut wheels, &[patch(0, 5.0, 0.0, 4000.0)], 0.9, dt);
        assert!(out[0].impulse[2] > 0.0); // opposes -Z motion

        // Nearly stopped: deadzone, no brake impulse at all
        let out = solve_contacts(&frame(), &mut wheels, &[patch(0, 0.01, 0.0, 4000.0)], 0.9, dt);
        assert!(out.is_empty());
    }

    #[test]
    fn lateral_slip_is_cancelled_at_the_patch() {
        let mut wheels = vec![WheelActuator::new([0.0, 0.0, 0.0], 0.35, true, false)];
        let out = solve_contacts(&frame(), &mut wheels, &[patch(0, 0.0, 2.0, 4000.0)], 0.9, 1.0 / 60.0);
        assert_eq!(out.len(), 1);
        assert!(out[0].at_point.is_some());
        assert!(out[0].impulse[0] < 0.0); // opposes +X slip
    }

    #[test]
    fn airborne_wheel_generates_nothing() {
        let mut wheels = vec![WheelActuator::new([0.0, 0.0, 0.0], 0.35, true, false)];
        wheels[0].motor_torque = 320.0;
        let mut p = patch(0, 0.0, 0.0, 4000.0);
        p.grounded = false;
        let out = solve_contacts(&frame(), &mut wheels, &[p], 0.9, 1.0 / 60.0);
        assert!(out.is_empty());
    }
}
