//! End-to-end simulation checks: a real rapier world, real suspension, real
//! controllers. Assertions stay loose on numbers and strict on behavior.

use chase_server::events::Observers;
use chase_server::nav::PlanarNav;
use chase_server::physics::{NAV_HALF_EXTENT, PhysicsWorld};
use chase_server::pursuit::controller::PursuitState;
use chase_server::vehicle::VehicleRole;

const DT: f32 = 1.0 / 60.0;

fn nav() -> PlanarNav {
    PlanarNav {
        half_extent_x: NAV_HALF_EXTENT,
        half_extent_z: NAV_HALF_EXTENT,
    }
}

fn planar_distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dz = a[2] - b[2];
    (dx * dx + dz * dz).sqrt()
}

#[test]
fn idle_vehicle_settles_on_its_suspension() {
    let mut world = PhysicsWorld::new();
    let mut observers = Observers::default();
    world.spawn_vehicle("player-1", VehicleRole::Player, [0.0, 0.0, 0.0]);

    for _ in 0..300 {
        world.step(DT, &nav(), &mut observers);
    }

    let frame = world.vehicle_frame("player-1").unwrap();
    assert!(frame.position.iter().all(|c| c.is_finite()));
    // resting on the wheels, not on the ground and not airborne
    assert!(
        frame.position[1] > 0.2 && frame.position[1] < 2.0,
        "ride height {}",
        frame.position[1]
    );
    // no runaway drift while idle
    assert!(planar_distance(frame.position, [0.0, 0.0, 0.0]) < 3.0);
}

#[test]
fn throttle_drives_the_player_forward() {
    let mut world = PhysicsWorld::new();
    let mut observers = Observers::default();
    world.spawn_vehicle("player-1", VehicleRole::Player, [0.0, 0.0, 0.0]);

    // settle the suspension first
    for _ in 0..120 {
        world.step(DT, &nav(), &mut observers);
    }
    let start = world.vehicle_frame("player-1").unwrap().position;

    for _ in 0..240 {
        world
            .vehicles
            .get_mut("player-1")
            .unwrap()
            .input
            .push(1.0, 0.0, 0.0);
        world.step(DT, &nav(), &mut observers);
    }

    let end = world.vehicle_frame("player-1").unwrap().position;
    let dz = end[2] - start[2];
    assert!(dz < -3.0, "expected forward (-Z) travel, got dz = {dz}");
    // mostly straight: lateral drift stays small relative to travel
    assert!((end[0] - start[0]).abs() < dz.abs() * 0.5);
}

#[test]
fn chaser_closes_on_a_static_player() {
    let mut world = PhysicsWorld::new();
    let mut observers = Observers::default();
    world.spawn_vehicle("player-1", VehicleRole::Player, [0.0, 0.0, 0.0]);
    world.spawn_vehicle("chaser-1", VehicleRole::Chaser, [0.0, 0.0, 60.0]);
    world.resolve_targets();

    for _ in 0..120 {
        world.step(DT, &nav(), &mut observers);
    }
    let d0 = planar_distance(
        world.vehicle_frame("chaser-1").unwrap().position,
        world.vehicle_frame("player-1").unwrap().position,
    );

    for _ in 0..300 {
        world.step(DT, &nav(), &mut observers);
    }
    let d1 = planar_distance(
        world.vehicle_frame("chaser-1").unwrap().position,
        world.vehicle_frame("player-1").unwrap().position,
    );

    assert!(d1 < d0 - 10.0, "chaser failed to close: {d0:.1} -> {d1:.1}");
}

#[test]
fn chaser_facing_a_wall_enters_wall_reverse() {
    let mut world = PhysicsWorld::new();
    let mut observers = Observers::default();
    // Player behind the chaser so the controller has a live target.
    world.spawn_vehicle("player-1", VehicleRole::Player, [0.0, 0.0, 0.0]);
    // Nose inside the wall-reverse hysteresis band, facing the south wall,
    // still on the navigable surface.
    world.spawn_vehicle("chaser-1", VehicleRole::Chaser, [0.0, 0.0, -89.5]);
    world.resolve_targets();

    for _ in 0..30 {
        world.step(DT, &nav(), &mut observers);
    }

    let chaser = world.vehicles.get("chaser-1").unwrap();
    assert_eq!(
        chaser.controller.as_ref().unwrap().state(),
        PursuitState::WallReverse
    );
    // wall-reverse means full brake, no throttle, straight wheels
    assert_eq!(chaser.last_command.brake, 1.0);
    assert_eq!(chaser.last_command.throttle, 0.0);
    assert_eq!(chaser.last_command.steer, 0.0);
}

#[test]
fn ramming_damages_both_vehicles() {
    let mut world = PhysicsWorld::new();
    let mut observers = Observers::default();
    world.spawn_vehicle("player-1", VehicleRole::Player, [0.0, 0.0, 0.0]);
    // Slightly overlapping spawn forces a contact immediately.
    world.spawn_vehicle("chaser-1", VehicleRole::Chaser, [1.8, 0.0, 0.0]);
    world.resolve_targets();

    for _ in 0..60 {
        world.step(DT, &nav(), &mut observers);
        if world
            .vehicles
            .get("player-1")
            .is_some_and(|v| v.character.hp < 100.0)
        {
            break;
        }
    }

    let player_hp = world.vehicles.get("player-1").unwrap().character.hp;
    let chaser_hp = world.vehicles.get("chaser-1").unwrap().character.hp;
    assert!(player_hp < 100.0, "player took no ram damage");
    assert!(chaser_hp < 100.0, "chaser took no self damage");
}
