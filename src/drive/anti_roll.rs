// ==============================================================================
// anti_roll.rs — ANTI-ROLL BAR LOAD TRANSFER
// ==============================================================================
// Anti-roll bars do not create net vertical force; they push the two sides of
// an axle toward equal suspension travel. Per pair:
//
//   transfer = (travel_left - travel_right) * force
//
// where travel is the normalized extension ratio (1.0 fully extended, also
// the default when a wheel is airborne). The transfer is applied downward on
// the more-extended side and upward on the other, at the wheel positions,
// grounded sides only.
// ==============================================================================

use crate::drive::types::{BodyFrame, Impulse, v_scale};
use crate::drive::wheel::WheelActuator;

/// Left/right wheel indices of one axle.
#[derive(Debug, Clone, Copy)]
pub struct AxlePair {
    pub left: usize,
    pub right: usize,
}

/// Standard 4-wheel layout: front (0,1) and rear (2,3).
pub const AXLE_PAIRS: [AxlePair; 2] = [
    AxlePair { left: 0, right: 1 },
    AxlePair { left: 2, right: 3 },
];

fn travel_ratio(w: &WheelActuator) -> f32 {
    if !w.is_grounded {
        return 1.0;
    }
    (1.0 - w.suspension_travel / w.max_travel.max(1e-3)).clamp(0.0, 1.0)
}

pub fn solve_anti_roll(
    frame: &BodyFrame,
    wheels: &[WheelActuator],
    force: f32,
    dt: f32,
) -> Vec<Impulse> {
    let mut impulses = Vec::new();

    for pair in AXLE_PAIRS {
        let (Some(l), Some(r)) = (wheels.get(pair.left), wheels.get(pair.right)) else {
            continue;
        };

        let transfer = (travel_ratio(l) - travel_ratio(r)) * force;
        if transfer.abs() < 1e-4 {
            continue;
        }

        if l.is_grounded {
            impulses.push(Impulse {
                impulse: v_scale(frame.up, -transfer * dt),
                at_point: Some(frame.local_to_world(l.offset)),
            });
        }
        if r.is_grounded {
            impulses.push(Impulse {
                impulse: v_scale(frame.up, transfer * dt),
                at_point: Some(frame.local_to_world(r.offset)),
            });
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

    fn wheels() -> Vec<WheelActuator> {
        let mut ws = vec![
            WheelActuator::new([-0.8, -0.35, -1.4], 0.35, true, true),
            WheelActuator::new([0.8, -0.35, -1.4], 0.35, true, true),
            WheelActuator::new([-0.8, -0.35, 1.4], 0.35, true, false),
            WheelActuator::new([0.8, -0.35, 1.4], 0.35, true, false),
        ];
        for w in ws.iter_mut() {
            w.is_grounded = true;
            w.suspension_travel = 0.2; // mid travel
        }
        ws
    }

    #[test]
    fn level_axle_produces_no_transfer() {
        let out = solve_anti_roll(&frame(), &wheels(), 1000.0, 1.0 / 60.0);
        assert!(out.is_empty());
    }

    #[test]
    fn compressed_side_is_pushed_down_on_the_other() {
        let mut ws = wheels();
        ws[0].suspension_travel = 0.35; // left front heavily compressed
        let out = solve_anti_roll(&frame(), &ws, 1000.0, 1.0 / 60.0);
        assert_eq!(out.len(), 2);
        // left travel ratio < right: transfer negative, so left gets +up
        assert!(out[0].impulse[1] > 0.0);
        assert!(out[1].impulse[1] < 0.0);
    }

    #[test]
    fn airborne_side_receives_no_force() {
        let mut ws = wheels();
        ws[0].is_grounded = false; // treated as fully extended
        let out = solve_anti_roll(&frame(), &ws, 1000.0, 1.0 / 60.0);
        // only the grounded right wheel is pushed
        assert_eq!(out.len(), 1);
        assert!(out[0].impulse[1] > 0.0);
    }
}
