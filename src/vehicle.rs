//! Per-entity aggregate: one rigid body plus the components that drive it.

use rapier3d::prelude::RigidBodyHandle;

use crate::character::Character;
use crate::drive::model::DriveModel;
use crate::drive::types::{DriveCommand, PURSUER, SEDAN};
use crate::input::InputAdapter;
use crate::pursuit::controller::{PursuitConfig, PursuitController};
use crate::pursuit::sensor::{ObstacleSensor, SensorConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleRole {
    Player,
    Chaser,
}

/// Everything a vehicle entity owns exclusively. Created with the entity,
/// destroyed with it; no state survives the entity.
pub struct Vehicle {
    pub body: RigidBodyHandle,
    pub role: VehicleRole,
    /// Identity tag used for best-effort target lookup.
    pub tag: &'static str,

    pub drive: DriveModel,
    pub controller: Option<PursuitController>,
    pub sensor: Option<ObstacleSensor>,
    pub input: InputAdapter,
    pub character: Character,

    /// Tag this vehicle hunts; resolved to an id at frame rate, not per tick.
    pub target_tag: Option<&'static str>,
    pub target_id: Option<String>,

    /// Last command fed to the drive model (level-triggered contract).
    pub last_command: DriveCommand,
    pub enabled: bool,
}

impl Vehicle {
    pub fn player(body: RigidBodyHandle) -> Self {
        Self {
            body,
            role: VehicleRole::Player,
            tag: "player",
            drive: DriveModel::new(SEDAN),
            controller: None,
            sensor: None,
            input: InputAdapter::default(),
            character: Character::new(100.0, 100.0, 100.0, 1.0),
            target_tag: None,
            target_id: None,
            last_command: DriveCommand::idle(),
            enabled: true,
        }
    }

    pub fn chaser(body: RigidBodyHandle) -> Self {
        let sensor_cfg = SensorConfig::default();
        let controller_cfg = PursuitConfig {
            reverse_wall_distance: sensor_cfg.reverse_wall_distance,
            ..PursuitConfig::default()
        };
        let mut character = Character::new(100.0, 100.0, 100.0, 0.0);
        character.gas_consumption_enabled = false; // chasers never run dry

        Self {
            body,
            role: VehicleRole::Chaser,
            tag: "chaser",
            drive: DriveModel::new(PURSUER),
            controller: Some(PursuitController::new(controller_cfg)),
            sensor: Some(ObstacleSensor::new(sensor_cfg)),
            input: InputAdapter::default(),
            character,
            target_tag: Some("player"),
            target_id: None,
            last_command: DriveCommand::idle(),
            enabled: true,
        }
    }

    /// Disable at a tick boundary: zero the cached command immediately.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.last_command = DriveCommand::idle();
        self.input.clear();
        if let Some(c) = self.controller.as_mut() {
            c.reset();
        }
    }
}
