//! Vehicle-vehicle collision response.
//!
//! Rapier resolves the rigid-body contact itself; this pass adds the game
//! response on top: a horizontal shove on the rammed vehicle, recoil on the
//! rammer, and damage to both, rate-limited per pair by a cooldown. The shove
//! scales with the chaser's current speed so a full-tilt ram hits harder than
//! a nudge.

use rapier3d::prelude::*;

use crate::events::Observers;
use crate::physics::PhysicsWorld;
use crate::vehicle::VehicleRole;

pub const PUSH_FORCE: f32 = 100.0;     // N*s on the rammed player
pub const RECOIL_FORCE: f32 = 50.0;    // N*s back onto the chaser
pub const COLLISION_FORCE: f32 = 10.0; // N*s between chasers
pub const DAMAGE: f32 = 10.0;          // to the player per ram
pub const SELF_DAMAGE: f32 = 20.0;     // to the chaser per ram
pub const COLLISION_COOLDOWN: f32 = 1.0; // s per pair

fn horizontal_dir(from: Vector<Real>, to: Vector<Real>) -> Option<Vector<Real>> {
    let mut d = to - from;
    d.y = 0.0;
    let m = d.magnitude();
    if m > 1e-4 { Some(d / m) } else { None }
}

pub fn resolve_collisions(world: &mut PhysicsWorld, observers: &mut Observers) {
    // Gather touching vehicle pairs first; responses mutate the sets.
    let mut pairs: Vec<(String, String)> = Vec::new();
    for pair in world.narrow_phase.contact_pairs() {
        if !pair.has_any_active_contact {
            continue;
        }
        let (Some(c1), Some(c2)) = (
            world.colliders.get(pair.collider1),
            world.colliders.get(pair.collider2),
        ) else {
            continue;
        };
        let (Some(b1), Some(b2)) = (c1.parent(), c2.parent()) else { continue };
        let (Some(id1), Some(id2)) = (world.body_to_id.get(&b1), world.body_to_id.get(&b2))
        else {
            continue;
        };
        pairs.push((id1.clone(), id2.clone()));
    }

    for (a, b) in pairs {
        let key = if a < b { (a.clone(), b.clone()) } else { (b.clone(), a.clone()) };
        let now = world.time;
        if world
            .contact_cooldowns
            .get(&key)
            .is_some_and(|&t| now - t < COLLISION_COOLDOWN)
        {
            continue;
        }

        let (Some(va), Some(vb)) = (world.vehicles.get(&a), world.vehicles.get(&b)) else {
            continue;
        };

        let responded = match (va.role, vb.role) {
            (VehicleRole::Player, VehicleRole::Chaser) => ram(world, observers, &a, &b),
            (VehicleRole::Chaser, VehicleRole::Player) => ram(world, observers, &b, &a),
            (VehicleRole::Chaser, VehicleRole::Chaser) => separate(world, &a, &b),
            (VehicleRole::Player, VehicleRole::Player) => false,
        };

        if responded {
            world.contact_cooldowns.insert(key, now);
        }
    }
}

/// Chaser rams the player: shove, recoil, damage both.
fn ram(world: &mut PhysicsWorld, observers: &mut Observers, player: &str, chaser: &str) -> bool {
    let (Some(pv), Some(cv)) = (world.vehicles.get(player), world.vehicles.get(chaser)) else {
        return false;
    };
    let (p_body, c_body) = (pv.body, cv.body);

    let (Some(p_pos), Some(c_pos)) = (
        world.bodies.get(p_body).map(|b| *b.translation()),
        world.bodies.get(c_body).map(|b| *b.translation()),
    ) else {
        return false;
    };
    let Some(dir) = horizontal_dir(c_pos, p_pos) else { return false };

    // Impact force follows how fast the chaser was actually going.
    let impact = (cv.drive.current_speed().abs() / 10.0).clamp(0.5, 2.0);

    if let Some(body) = world.bodies.get_mut(p_body) {
        body.apply_impulse(dir * (PUSH_FORCE * impact), true);
    }
    if let Some(body) = world.bodies.get_mut(c_body) {
        body.apply_impulse(-dir * RECOIL_FORCE, true);
    }

    if let Some(v) = world.vehicles.get_mut(player) {
        v.character.take_damage(DAMAGE);
        observers.damage(player, DAMAGE, v.character.hp);
    }
    if let Some(v) = world.vehicles.get_mut(chaser) {
        v.character.take_damage(SELF_DAMAGE);
        observers.damage(chaser, SELF_DAMAGE, v.character.hp);
    }
    true
}

/// Two chasers shoulder to shoulder: push them apart, no damage.
fn separate(world: &mut PhysicsWorld, a: &str, b: &str) -> bool {
    let (Some(va), Some(vb)) = (world.vehicles.get(a), world.vehicles.get(b)) else {
        return false;
    };
    let (a_body, b_body) = (va.body, vb.body);

    let (Some(a_pos), Some(b_pos)) = (
        world.bodies.get(a_body).map(|b| *b.translation()),
        world.bodies.get(b_body).map(|b| *b.translation()),
    ) else {
        return false;
    };
    let Some(dir) = horizontal_dir(a_pos, b_pos) else { return false };

    if let Some(body) = world.bodies.get_mut(b_body) {
        body.apply_impulse(dir * COLLISION_FORCE, true);
    }
    if let Some(body) = world.bodies.get_mut(a_body) {
        body.apply_impulse(-dir * COLLISION_FORCE, true);
    }
    true
}
