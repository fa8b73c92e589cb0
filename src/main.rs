use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{Duration, interval};

use chase_server::events::{LogObserver, Observers};
use chase_server::nav::PlanarNav;
use chase_server::net::start_websocket_server;
use chase_server::physics::{NAV_HALF_EXTENT, PhysicsWorld};
use chase_server::spawn::ChaserSpawner;
use chase_server::state::{EntityKind, SharedGameState};

const DT: f32 = 1.0 / 60.0;
/// Target re-resolution + other frame-cadence work runs every N physics
/// ticks, allowed to lag the physics state.
const FRAME_CADENCE_TICKS: u64 = 6;

#[tokio::main]
async fn main() {
    env_logger::init();
    log::info!("starting chase server");

    let state = Arc::new(Mutex::new(SharedGameState::new()));
    let physics = Arc::new(Mutex::new(PhysicsWorld::new()));

    tokio::spawn(start_websocket_server(
        Arc::clone(&state),
        Arc::clone(&physics),
    ));

    let nav = PlanarNav {
        half_extent_x: NAV_HALF_EXTENT,
        half_extent_z: NAV_HALF_EXTENT,
    };
    let mut observers = Observers::default();
    observers.register(Box::new(LogObserver));
    let mut spawner = ChaserSpawner::default();

    // Fixed timestep: ~60 Hz
    let mut ticker = interval(Duration::from_millis(16));

    loop {
        ticker.tick().await;

        let mut phys = physics.lock().await;
        let mut game = state.lock().await;

        // Latest raw axes into each player vehicle's input adapter.
        for entity in game.entities.values() {
            if let (Some(input), Some(vehicle)) =
                (entity.last_input.as_ref(), phys.vehicles.get_mut(&entity.id))
            {
                vehicle
                    .input
                    .push(input.axes.throttle, input.axes.brake, input.axes.steer);
            }
        }

        if game.tick % FRAME_CADENCE_TICKS == 0 {
            phys.resolve_targets();
        }

        spawner.tick(&mut phys, &mut game, DT);
        phys.step(DT, &nav, &mut observers);

        // Chasers destroyed this tick free their entity slot so the spawner
        // can refill the arena later.
        let gone: Vec<String> = game
            .entities
            .values()
            .filter(|e| e.kind == EntityKind::Chaser && !phys.vehicles.contains_key(&e.id))
            .map(|e| e.id.clone())
            .collect();
        for id in gone {
            game.remove_entity(&id);
        }

        game.tick += 1;
        game.broadcast_snapshot(&phys);
    }
}
