use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};

use crate::physics::PhysicsWorld;
use crate::state::{Axes, EntityKind, SharedGameState};

#[derive(Debug)]
struct ClientMessage {
    msg_type: String,
    throttle: f32,
    brake: f32,
    steer: f32,
}

impl ClientMessage {
    fn from_json(txt: &str) -> Option<Self> {
        let v = serde_json::from_str::<serde_json::Value>(txt).ok()?;

        Some(ClientMessage {
            msg_type: v.get("type")?.as_str()?.to_string(),
            throttle: v.get("throttle").and_then(|x| x.as_f64()).unwrap_or(0.0) as f32,
            brake: v.get("brake").and_then(|x| x.as_f64()).unwrap_or(0.0) as f32,
            steer: v.get("steer").and_then(|x| x.as_f64()).unwrap_or(0.0) as f32,
        })
    }
}

pub async fn start_websocket_server(
    state: Arc<Mutex<SharedGameState>>,
    physics: Arc<Mutex<PhysicsWorld>>,
) {
    let listener = TcpListener::bind("0.0.0.0:9001")
        .await
        .expect("Failed to bind WebSocket port");

    log::info!("WebSocket listening on ws://localhost:9001");

    loop {
        let Ok((raw, _)) = listener.accept().await else { continue };
        let state_clone = Arc::clone(&state);
        let physics_clone = Arc::clone(&physics);

        tokio::spawn(async move {
            let ws = match accept_async(raw).await {
                Ok(ws) => ws,
                Err(e) => {
                    log::warn!("WebSocket handshake failed: {e}");
                    return;
                }
            };
            let (mut write, mut read) = ws.split();

            // -------------------------------
            // 1) Outgoing message channel
            // -------------------------------
            let (tx, mut rx) = mpsc::unbounded_channel::<String>();

            {
                let mut game = state_clone.lock().await;
                game.register_client(tx.clone());
            }

            tokio::spawn(async move {
                while let Some(msg) = rx.recv().await {
                    let _ = write.send(Message::Text(msg)).await;
                }
            });

            // -------------------------------
            // 2) Entity + vehicle for this player
            // -------------------------------
            // Lock order matches the tick loop (physics, then state).
            let player_id = {
                let mut phys = physics_clone.lock().await;
                let mut game = state_clone.lock().await;
                let id = game.add_entity(EntityKind::Player);
                phys.spawn_vehicle(&id, EntityKind::Player.role(), [0.0, 0.0, 0.0]);
                id
            };

            log::info!("player connected: {player_id}");

            let welcome = format!(r#"{{"type":"welcome","player_id":"{player_id}"}}"#);
            let _ = tx.send(welcome);

            // -------------------------------
            // 3) Main receive loop
            // -------------------------------
            while let Some(msg) = read.next().await {
                let msg = match msg {
                    Ok(m) => m,
                    Err(_) => break,
                };

                if !msg.is_text() {
                    continue;
                }
                let Ok(text) = msg.to_text() else { continue };

                if text.contains("\"type\":\"ping\"") {
                    let _ = tx.send("{\"type\":\"pong\"}".into());
                    continue;
                }

                let Some(parsed) = ClientMessage::from_json(text) else { continue };

                if parsed.msg_type == "input" {
                    let axes = Axes {
                        throttle: parsed.throttle,
                        brake: parsed.brake,
                        steer: parsed.steer,
                    };

                    let mut game = state_clone.lock().await;
                    let tick = game.tick;
                    game.update_input(&player_id, axes, tick);
                }
            }

            log::info!("player disconnected: {player_id}");
            let mut phys = physics_clone.lock().await;
            let mut game = state_clone.lock().await;
            game.remove_entity(&player_id);
            phys.despawn_vehicle(&player_id);
        });
    }
}
