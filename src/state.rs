use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::physics::{PhysicsWorld, frame_of};
use crate::vehicle::VehicleRole;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Player,
    Chaser,
}

impl EntityKind {
    pub fn role(self) -> VehicleRole {
        match self {
            EntityKind::Player => VehicleRole::Player,
            EntityKind::Chaser => VehicleRole::Chaser,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            EntityKind::Player => "player",
            EntityKind::Chaser => "chaser",
        }
    }
}

/// Raw command axes from a client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Axes {
    pub throttle: f32,
    pub brake: f32,
    pub steer: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityInput {
    pub tick: u64,
    pub axes: Axes,
}

pub struct Entity {
    pub id: String,
    pub kind: EntityKind,
    pub last_input: Option<EntityInput>,
}

#[derive(Serialize)]
pub struct VehicleSnapshot {
    pub id: String,
    pub kind: EntityKind,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub speed_kmh: f32,
    pub rpm: f32,
    pub hp: f32,
    pub gas: f32,
}

#[derive(Serialize)]
pub struct Snapshot {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub tick: u64,
    pub vehicles: Vec<VehicleSnapshot>,
}

pub struct SharedGameState {
    pub tick: u64,
    pub clients: Vec<UnboundedSender<String>>,
    pub entities: HashMap<String, Entity>,
}

impl SharedGameState {
    pub fn new() -> Self {
        Self {
            tick: 0,
            clients: Vec::new(),
            entities: HashMap::new(),
        }
    }

    pub fn register_client(&mut self, tx: UnboundedSender<String>) {
        self.clients.push(tx);
    }

    pub fn add_entity(&mut self, kind: EntityKind) -> String {
        let id = format!("{}-{}", kind.tag(), Uuid::new_v4());
        self.entities.insert(
            id.clone(),
            Entity { id: id.clone(), kind, last_input: None },
        );
        id
    }

    pub fn remove_entity(&mut self, id: &str) {
        self.entities.remove(id);
    }

    pub fn update_input(&mut self, id: &str, axes: Axes, tick: u64) {
        if let Some(e) = self.entities.get_mut(id) {
            e.last_input = Some(EntityInput { tick, axes });
        }
    }

    /// Build and send a snapshot of all vehicles to all clients. Dead client
    /// channels are dropped on the way.
    pub fn broadcast_snapshot(&mut self, world: &PhysicsWorld) {
        let mut vehicles = Vec::with_capacity(world.vehicles.len());

        for (id, vehicle) in world.vehicles.iter() {
            let Some(body) = world.bodies.get(vehicle.body) else { continue };
            let frame = frame_of(body);
            let kind = match vehicle.role {
                VehicleRole::Player => EntityKind::Player,
                VehicleRole::Chaser => EntityKind::Chaser,
            };
            vehicles.push(VehicleSnapshot {
                id: id.clone(),
                kind,
                x: frame.position[0],
                y: frame.position[1],
                z: frame.position[2],
                speed_kmh: vehicle.drive.speed_kmh(),
                rpm: vehicle.drive.engine_rpm(),
                hp: vehicle.character.hp,
                gas: vehicle.character.gas,
            });
        }

        let snapshot = Snapshot { msg_type: "snapshot", tick: self.tick, vehicles };
        match serde_json::to_string(&snapshot) {
            Ok(json) => self.clients.retain(|tx| tx.send(json.clone()).is_ok()),
            Err(e) => log::error!("snapshot serialization failed: {e}"),
        }
    }
}
