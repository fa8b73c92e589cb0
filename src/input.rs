//! Human input source for the drive command tuple.
//!
//! Raw device axes arrive over the wire at whatever rate the client sends
//! them; the adapter rate-limits toward the latest target so a keyboard tap
//! ramps instead of stepping. Both this and the pursuit controller satisfy
//! the same command contract.

use crate::drive::types::DriveCommand;

pub struct InputAdapter {
    target: DriveCommand,
    current: DriveCommand,
    /// Change rate, units per second.
    pub smoothing: f32,
}

impl Default for InputAdapter {
    fn default() -> Self {
        Self {
            target: DriveCommand::idle(),
            current: DriveCommand::idle(),
            smoothing: 5.0,
        }
    }
}

fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

impl InputAdapter {
    /// Latest raw axes from the device; clamped, not yet smoothed.
    pub fn push(&mut self, throttle: f32, brake: f32, steer: f32) {
        self.target = DriveCommand { throttle, brake, steer }.clamped();
    }

    /// Smoothed command for this tick.
    pub fn sample(&mut self, dt: f32) -> DriveCommand {
        let step = self.smoothing * dt;
        self.current = DriveCommand {
            throttle: move_towards(self.current.throttle, self.target.throttle, step),
            brake: move_towards(self.current.brake, self.target.brake, step),
            steer: move_towards(self.current.steer, self.target.steer, step),
        };
        self.current
    }

    /// Drop straight to idle (controller disabled / out of gas).
    pub fn clear(&mut self) {
        self.target = DriveCommand::idle();
        self.current = DriveCommand::idle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramps_toward_the_target_at_the_configured_rate() {
        let mut input = InputAdapter::default();
        input.push(1.0, 0.0, 0.0);

        let c = input.sample(0.1); // 5.0/s * 0.1s = 0.5
        assert!((c.throttle - 0.5).abs() < 1e-6);
        let c = input.sample(0.1);
        assert!((c.throttle - 1.0).abs() < 1e-6);
        // holds at the target, no overshoot
        let c = input.sample(0.1);
        assert!((c.throttle - 1.0).abs() < 1e-6);
    }

    #[test]
    fn raw_axes_are_clamped() {
        let mut input = InputAdapter::default();
        input.push(3.0, -1.0, -7.0);
        let c = input.sample(10.0); // large dt: lands on the target
        assert_eq!(c.throttle, 1.0);
        assert_eq!(c.brake, 0.0);
        assert_eq!(c.steer, -1.0);
    }
}
