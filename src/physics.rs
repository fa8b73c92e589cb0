// src/physics.rs
//
// rapier3d world hosting the vehicles. One fixed tick advances, per vehicle:
// obstacle probes -> pursuit controller (or player input) -> drive model ->
// suspension raycasts + tire impulses -> rigid-body integration, strictly in
// that order. Impulses are collected first and applied in one pass.

use rapier3d::prelude::*;
use std::collections::HashMap;

use crate::drive::anti_roll::solve_anti_roll;
use crate::drive::tire::{ContactPatch, solve_contacts};
use crate::drive::types::{BodyFrame, DriveCommand, Impulse, Vec3};
use crate::events::Observers;
use crate::nav::{NavPath, NavigationQuery};
use crate::pursuit::controller::PursuitDecision;
use crate::vehicle::{Vehicle, VehicleRole};

pub const GROUP_GROUND: Group = Group::from_bits_truncate(0b0001);
pub const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);
pub const GROUP_OBSTACLE: Group = Group::from_bits_truncate(0b0100);

/// Playable square, wall to wall.
pub const ARENA_HALF_EXTENT: f32 = 95.0;
/// Navigable surface handed to the navigation provider (a margin inside the
/// walls so waypoints never sit inside an obstacle).
pub const NAV_HALF_EXTENT: f32 = 90.0;

const LINEAR_DAMPING: f32 = 0.08;
const ANGULAR_DAMPING: f32 = 0.6;
const SPAWN_HEIGHT: f32 = 1.3;
const SNAP_SEARCH_RADIUS: f32 = 5.0;
const MAX_SUSPENSION_FORCE: f32 = 25_000.0;

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    pub query_pipeline: QueryPipeline,

    pub vehicles: HashMap<String, Vehicle>,   // entity id -> vehicle
    pub body_to_id: HashMap<RigidBodyHandle, String>,
    /// (id, id) pairs -> last collision response time, see contact.rs
    pub contact_cooldowns: HashMap<(String, String), f32>,
    pub time: f32,
}

pub fn frame_of(body: &RigidBody) -> BodyFrame {
    let iso = body.position();
    let rot = iso.rotation;
    let forward = rot * vector![0.0, 0.0, -1.0];
    let right = rot * vector![1.0, 0.0, 0.0];
    let up = rot * vector![0.0, 1.0, 0.0];

    BodyFrame {
        position: iso.translation.vector.into(),
        forward: forward.into(),
        right: right.into(),
        up: up.into(),
        linvel: (*body.linvel()).into(),
        angvel: (*body.angvel()).into(),
        mass: body.mass(),
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let gravity = vector![0.0, -9.81, 0.0];

        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // === Ground: large thin static box, top surface at y = 0 ===
        let ground_rb = RigidBodyBuilder::fixed()
            .translation(vector![0.0, -1.0, 0.0])
            .build();
        let ground_handle = bodies.insert(ground_rb);
        let ground_collider = ColliderBuilder::cuboid(500.0, 1.0, 500.0)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.2)
            .restitution(0.0)
            .build();
        colliders.insert_with_parent(ground_collider, ground_handle, &mut bodies);

        // === Arena walls: obstacle-tagged, probe-visible ===
        let walls: [(Vector<Real>, Vector<Real>); 4] = [
            (
                vector![0.0, 2.0, -ARENA_HALF_EXTENT],
                vector![ARENA_HALF_EXTENT + 5.0, 2.0, 1.0],
            ),
            (
                vector![0.0, 2.0, ARENA_HALF_EXTENT],
                vector![ARENA_HALF_EXTENT + 5.0, 2.0, 1.0],
            ),
            (
                vector![-ARENA_HALF_EXTENT, 2.0, 0.0],
                vector![1.0, 2.0, ARENA_HALF_EXTENT + 5.0],
            ),
            (
                vector![ARENA_HALF_EXTENT, 2.0, 0.0],
                vector![1.0, 2.0, ARENA_HALF_EXTENT + 5.0],
            ),
        ];
        for (center, half) in walls {
            let rb = RigidBodyBuilder::fixed().translation(center).build();
            let handle = bodies.insert(rb);
            let collider = ColliderBuilder::cuboid(half.x, half.y, half.z)
                .collision_groups(InteractionGroups::new(
                    GROUP_OBSTACLE,
                    GROUP_CHASSIS,
                ))
                .friction(0.2)
                .restitution(0.1)
                .build();
            colliders.insert_with_parent(collider, handle, &mut bodies);
        }

        log::info!(
            "world ready: {} bodies, {} colliders",
            bodies.len(),
            colliders.len()
        );

        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            vehicles: HashMap::new(),
            body_to_id: HashMap::new(),
            contact_cooldowns: HashMap::new(),
            time: 0.0,
        }
    }

    /// Spawn a vehicle entity at `position` (y is overridden by the server
    /// spawn convention so the suspension settles from above the ground).
    pub fn spawn_vehicle(&mut self, id: &str, role: VehicleRole, position: Vec3) {
        let config = match role {
            VehicleRole::Player => crate::drive::types::SEDAN,
            VehicleRole::Chaser => crate::drive::types::PURSUER,
        };

        let rb = RigidBodyBuilder::dynamic()
            .translation(vector![position[0], SPAWN_HEIGHT, position[2]])
            .linear_damping(LINEAR_DAMPING)
            .angular_damping(ANGULAR_DAMPING)
            .ccd_enabled(true)
            .build();

        let [hx, hy, hz] = config.chassis_half_extents;
        let volume = 8.0 * hx * hy * hz;
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .translation(vector![0.0, config.com_height, 0.0]) // lowered COM
            .collision_groups(InteractionGroups::new(
                GROUP_CHASSIS,
                GROUP_GROUND | GROUP_CHASSIS | GROUP_OBSTACLE,
            ))
            .density(config.mass / volume)
            .friction(0.0)
            .restitution(0.0)
            .build();

        let handle = self.bodies.insert(rb);
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        self.body_to_id.insert(handle, id.to_string());

        let vehicle = match role {
            VehicleRole::Player => Vehicle::player(handle),
            VehicleRole::Chaser => Vehicle::chaser(handle),
        };
        self.vehicles.insert(id.to_string(), vehicle);

        log::info!("spawned {role:?} {id} at ({:.1}, {:.1})", position[0], position[2]);
    }

    pub fn despawn_vehicle(&mut self, id: &str) {
        if let Some(v) = self.vehicles.remove(id) {
            self.body_to_id.remove(&v.body);
            self.bodies.remove(
                v.body,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.joints,
                &mut self.multibody_joints,
                true,
            );
            log::info!("despawned {id}");
        }
    }

    pub fn vehicle_frame(&self, id: &str) -> Option<BodyFrame> {
        let v = self.vehicles.get(id)?;
        self.bodies.get(v.body).map(frame_of)
    }

    /// Re-resolve chaser targets by identity tag. Runs at frame rate (not
    /// every physics tick): a stale reference for one frame is accepted.
    pub fn resolve_targets(&mut self) {
        let ids_by_tag: Vec<(String, &'static str)> = self
            .vehicles
            .iter()
            .map(|(k, v)| (k.clone(), v.tag))
            .collect();

        for v in self.vehicles.values_mut() {
            let Some(tag) = v.target_tag else { continue };
            let still_valid = v
                .target_id
                .as_ref()
                .is_some_and(|tid| ids_by_tag.iter().any(|(k, t)| k == tid && *t == tag));
            if !still_valid {
                v.target_id = ids_by_tag
                    .iter()
                    .find(|(_, t)| *t == tag)
                    .map(|(k, _)| k.clone());
            }
        }
    }

    /// One fixed physics tick.
    pub fn step(&mut self, dt: Real, nav: &dyn NavigationQuery, observers: &mut Observers) {
        self.time += dt;
        self.query_pipeline.update(&self.colliders);

        let ids: Vec<String> = self.vehicles.keys().cloned().collect();

        let mut pending: Vec<(RigidBodyHandle, Impulse)> = Vec::new();
        let mut pending_torques: Vec<(RigidBodyHandle, Vec3)> = Vec::new();
        let mut snaps: Vec<(RigidBodyHandle, Vec3)> = Vec::new();
        let mut dry_tanks: Vec<String> = Vec::new();

        for id in &ids {
            // Target world position first, while nothing is mutably borrowed.
            let target_pos: Option<Vec3> = self
                .vehicles
                .get(id)
                .and_then(|v| v.target_id.clone())
                .and_then(|tid| self.vehicles.get(&tid))
                .and_then(|t| self.bodies.get(t.body))
                .map(|b| (*b.translation()).into());

            let Some(vehicle) = self.vehicles.get_mut(id) else { continue };
            let Some(body) = self.bodies.get(vehicle.body) else {
                continue; // setup error: body gone, vehicle is inert
            };

            let frame = frame_of(body);
            let iso = *body.position();
            let rot = iso.rotation;
            let linvel = *body.linvel();
            let angvel = *body.angvel();
            let com = *body.center_of_mass();
            let cfg = vehicle.drive.config;

            // ============================================================
            // 1) Sensing + command selection
            // ============================================================
            let command: Option<DriveCommand> = if !vehicle.enabled
                || !vehicle.character.has_gas()
            {
                Some(DriveCommand::idle())
            } else {
                match vehicle.role {
                    VehicleRole::Player => Some(vehicle.input.sample(dt)),
                    VehicleRole::Chaser => {
                        let sensor = vehicle.sensor.as_ref();
                        let controller = vehicle.controller.as_mut();
                        match (sensor, controller) {
                            (Some(sensor), Some(controller)) => {
                                let probes = sensor.probes(&frame);
                                let mut hits = [None; 4];
                                for (slot, probe) in hits.iter_mut().zip(probes.iter()) {
                                    let ray = Ray::new(
                                        Point::from(probe.origin),
                                        Vector::from(probe.dir),
                                    );
                                    let filter = QueryFilter::default()
                                        .exclude_rigid_body(vehicle.body)
                                        .groups(InteractionGroups::new(
                                            GROUP_CHASSIS,
                                            GROUP_OBSTACLE,
                                        ));
                                    *slot = self
                                        .query_pipeline
                                        .cast_ray(
                                            &self.bodies,
                                            &self.colliders,
                                            &ray,
                                            probe.max_dist,
                                            true,
                                            filter,
                                        )
                                        .map(|(_, toi)| toi);
                                }
                                let reading = sensor.interpret(&hits);

                                let path = match target_pos {
                                    Some(t) => nav.compute_path(frame.position, t),
                                    None => NavPath::invalid(),
                                };
                                let speed_kmh = vehicle.drive.forward_speed_kmh();

                                match controller.tick(
                                    &frame, speed_kmh, target_pos, &path, &reading, dt,
                                ) {
                                    PursuitDecision::Command(c) => Some(c),
                                    PursuitDecision::SnapToSurface => {
                                        if let Some(p) = nav.sample_point_on_surface(
                                            frame.position,
                                            SNAP_SEARCH_RADIUS,
                                        ) {
                                            snaps.push((vehicle.body, p));
                                        }
                                        None // skip command emission this tick
                                    }
                                }
                            }
                            // Missing sensor or controller is a setup error:
                            // the chaser stays inert rather than crashing.
                            _ => Some(DriveCommand::idle()),
                        }
                    }
                }
            };

            // ============================================================
            // 2) Drive model (mutates wheels, yields body effects)
            // ============================================================
            if let Some(cmd) = command {
                vehicle.last_command = cmd;
                let effects = vehicle.drive.drive(&frame, cmd, dt);
                pending.extend(effects.impulses.into_iter().map(|i| (vehicle.body, i)));
                pending_torques.extend(effects.torques.into_iter().map(|t| (vehicle.body, t)));
            }

            // ============================================================
            // 3) Suspension raycast + contact patches
            // ============================================================
            let ground_n = vector![0.0, 1.0, 0.0];
            let suspension_filter = QueryFilter::default()
                .exclude_rigid_body(vehicle.body)
                .groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND));

            let mut contacts: Vec<ContactPatch> = Vec::with_capacity(vehicle.drive.wheels.len());

            for (i, wheel) in vehicle.drive.wheels.iter_mut().enumerate() {
                let origin =
                    iso * (Point::from(wheel.offset) + vector![0.0, wheel.radius + 0.02, 0.0]);
                let dir = vector![0.0, -1.0, 0.0];
                let ray = Ray::new(origin, dir);

                wheel.is_grounded = false;
                wheel.suspension_travel = 0.0;

                if let Some((_hit, toi)) = self.query_pipeline.cast_ray(
                    &self.bodies,
                    &self.colliders,
                    &ray,
                    wheel.cast_length() + 0.02,
                    true,
                    suspension_filter,
                ) {
                    if toi > wheel.radius {
                        let suspension_length = toi - wheel.radius;
                        let compression =
                            (wheel.rest_length - suspension_length).clamp(0.0, wheel.max_travel);

                        if compression > 0.0 {
                            wheel.is_grounded = true;
                            wheel.suspension_travel = compression;

                            let hit_point = origin + dir * toi;
                            let r = hit_point - com;
                            let point_vel = linvel + angvel.cross(&r);

                            let mut suspension_vel = point_vel.dot(&ground_n);
                            // Deadzone kills micro jitter; one-way damper
                            // kills rebound bounce.
                            if suspension_vel.abs() < 0.05 {
                                suspension_vel = 0.0;
                            }
                            if suspension_vel > 0.0 {
                                suspension_vel *= 0.15;
                            }

                            let spring_force = wheel.stiffness * compression;
                            let damper_force = (-wheel.damping * suspension_vel)
                                .clamp(-spring_force * 0.6, spring_force * 0.6);
                            let mut normal_force =
                                (spring_force + damper_force).clamp(0.0, MAX_SUSPENSION_FORCE);
                            // Keep minimal support force to avoid tunneling.
                            if normal_force < 200.0 {
                                normal_force = 200.0;
                            }

                            pending.push((
                                vehicle.body,
                                Impulse {
                                    impulse: (ground_n * (normal_force * dt)).into(),
                                    at_point: Some(hit_point.into()),
                                },
                            ));

                            // Steered wheel basis on the ground plane.
                            let angle = wheel.steer_angle.to_radians();
                            let chassis_fwd = rot * vector![0.0, 0.0, -1.0];
                            let chassis_right = rot * vector![1.0, 0.0, 0.0];
                            let steered = chassis_fwd * angle.cos() + chassis_right * angle.sin();
                            let planar = steered - ground_n * steered.dot(&ground_n);
                            let wheel_forward = if planar.magnitude() > 1e-6 {
                                planar.normalize()
                            } else {
                                chassis_fwd
                            };
                            let wheel_side = wheel_forward.cross(&ground_n);

                            let v_long = point_vel.dot(&wheel_forward);
                            let v_lat = point_vel.dot(&wheel_side);
                            wheel.update_from_contact(v_long, v_lat);

                            contacts.push(ContactPatch {
                                wheel: i,
                                grounded: true,
                                hit_point: hit_point.into(),
                                apply_point: (hit_point + ground_n * (wheel.radius * 0.25)).into(),
                                forward: wheel_forward.into(),
                                side: wheel_side.into(),
                                v_long,
                                v_lat,
                                normal_force,
                            });
                        }
                    }
                }

                if !wheel.is_grounded {
                    // Airborne: no contact to follow, let the spin bleed off.
                    wheel.rotational_speed *= 0.98;
                }
            }

            // ============================================================
            // 4) Tire solve + anti-roll load transfer
            // ============================================================
            let tire = solve_contacts(&frame, &mut vehicle.drive.wheels, &contacts, cfg.mu, dt);
            pending.extend(tire.into_iter().map(|imp| (vehicle.body, imp)));

            let arb = solve_anti_roll(&frame, &vehicle.drive.wheels, cfg.anti_roll_force, dt);
            pending.extend(arb.into_iter().map(|imp| (vehicle.body, imp)));

            // ============================================================
            // 5) Gas drain
            // ============================================================
            if vehicle.character.consume_gas(dt) {
                dry_tanks.push(id.clone());
            }
        }

        // Apply everything in one pass, then integrate.
        for (handle, imp) in pending {
            if let Some(body) = self.bodies.get_mut(handle) {
                match imp.at_point {
                    Some(p) => body.apply_impulse_at_point(imp.impulse.into(), Point::from(p), true),
                    None => body.apply_impulse(imp.impulse.into(), true),
                }
            }
        }
        for (handle, torque) in pending_torques {
            if let Some(body) = self.bodies.get_mut(handle) {
                body.apply_torque_impulse(torque.into(), true);
            }
        }
        for (handle, point) in snaps {
            if let Some(body) = self.bodies.get_mut(handle) {
                body.set_translation(Vector::from(point), true);
                log::debug!("snapped body back onto the navigable surface");
            }
        }

        let hooks = ();
        let events = ();
        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters { dt, ..IntegrationParameters::default() },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &hooks,
            &events,
        );

        // Safety: reset bodies that escaped to insane coordinates.
        for (_, body) in self.bodies.iter_mut() {
            let pos = *body.translation();
            let bad = !pos.x.is_finite()
                || !pos.y.is_finite()
                || !pos.z.is_finite()
                || pos.x.abs() > 1_000.0
                || pos.y.abs() > 1_000.0
                || pos.z.abs() > 1_000.0;
            if bad {
                body.set_translation(vector![0.0, 1.0, 0.0], true);
                body.set_linvel(vector![0.0, 0.0, 0.0], true);
                body.set_angvel(vector![0.0, 0.0, 0.0], true);
                log::warn!("reset runaway body to the arena center");
            }
        }

        // Collision responses (impulse push + damage with cooldown).
        crate::contact::resolve_collisions(self, observers);

        for id in dry_tanks {
            observers.gas_empty(&id);
        }

        // Destroyed vehicles leave the world at the tick boundary.
        let dead: Vec<String> = self
            .vehicles
            .iter()
            .filter(|(_, v)| v.character.is_destroyed())
            .map(|(k, _)| k.clone())
            .collect();
        for id in dead {
            self.despawn_vehicle(&id);
            observers.destroyed(&id);
        }
    }
}
