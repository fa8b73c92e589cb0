//! Chaser population keeper.
//!
//! Periodically counts live chasers and tops the arena back up to the
//! configured minimum, picking random spawn points away from the player.

use rand::Rng;

use crate::drive::types::Vec3;
use crate::physics::{NAV_HALF_EXTENT, PhysicsWorld};
use crate::state::{EntityKind, SharedGameState};
use crate::vehicle::VehicleRole;

pub struct ChaserSpawner {
    pub check_interval: f32,      // s between population checks
    pub min_chaser_count: usize,
    pub min_player_distance: f32, // m, keep spawns out of the player's face
    elapsed: f32,
    first_check_done: bool,
}

impl Default for ChaserSpawner {
    fn default() -> Self {
        Self {
            check_interval: 60.0,
            min_chaser_count: 3,
            min_player_distance: 30.0,
            elapsed: 0.0,
            first_check_done: false,
        }
    }
}

impl ChaserSpawner {
    pub fn tick(&mut self, world: &mut PhysicsWorld, state: &mut SharedGameState, dt: f32) {
        self.elapsed += dt;
        if self.first_check_done && self.elapsed < self.check_interval {
            return;
        }
        self.elapsed = 0.0;
        self.first_check_done = true;

        let alive = world
            .vehicles
            .values()
            .filter(|v| v.role == VehicleRole::Chaser)
            .count();
        if alive >= self.min_chaser_count {
            return;
        }

        let player_pos: Option<Vec3> = world
            .vehicles
            .iter()
            .find(|(_, v)| v.role == VehicleRole::Player)
            .map(|(id, _)| id.clone())
            .and_then(|id| world.vehicle_frame(&id))
            .map(|f| f.position);

        let missing = self.min_chaser_count - alive;
        for _ in 0..missing {
            let point = self.pick_spawn_point(player_pos);
            let id = state.add_entity(EntityKind::Chaser);
            world.spawn_vehicle(&id, VehicleRole::Chaser, point);
        }
        log::info!("topped chaser population up by {missing}");
    }

    fn pick_spawn_point(&self, player_pos: Option<Vec3>) -> Vec3 {
        let mut rng = rand::thread_rng();
        let bound = NAV_HALF_EXTENT - 20.0;

        let mut candidate = [0.0, 0.0, 0.0];
        for _ in 0..10 {
            candidate = [
                rng.gen_range(-bound..bound),
                0.0,
                rng.gen_range(-bound..bound),
            ];
            let Some(p) = player_pos else { break };
            let dx = candidate[0] - p[0];
            let dz = candidate[2] - p[2];
            if (dx * dx + dz * dz).sqrt() >= self.min_player_distance {
                break;
            }
        }
        candidate
    }
}
