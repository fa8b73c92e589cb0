//! chase-server - pursuit vehicle control core for a top-down chase game.
//!
//! A fixed-tick rapier3d world hosts player and chaser vehicles. Both feed
//! the same normalized `(throttle, brake, steer)` command contract into a
//! per-wheel drive model; chasers produce it from a seek / wall-reverse state
//! machine over navigation waypoints and forward obstacle probes, players
//! from raw device axes over a WebSocket.

pub mod character;
pub mod contact;
pub mod drive;
pub mod events;
pub mod input;
pub mod nav;
pub mod net;
pub mod physics;
pub mod pursuit;
pub mod spawn;
pub mod state;
pub mod vehicle;
