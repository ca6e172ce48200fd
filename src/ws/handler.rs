//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use governor::clock::Clock;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{ArenaInput, Command, ConnectionId};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{decode_client, encode_server, ClientMsg, ProtocolError, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id: ConnectionId = Uuid::new_v4();
    info!(conn_id = %conn_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    // Register before anything can be broadcast to this connection
    let outbound_rx = state.hub.register(conn_id);

    let welcome = ServerMsg::Welcome {
        id: conn_id,
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(conn_id = %conn_id, error = %e, "Failed to send welcome");
        state.hub.unregister(conn_id);
        return;
    }

    let input_tx = state.arena.input_tx.clone();
    let rate_limiter = ConnectionRateLimiter::new(
        state.config.input_rate_limit,
        state.config.shoot_rate_limit,
    );

    run_session(conn_id, ws_sink, ws_stream, &input_tx, outbound_rx, rate_limiter).await;

    // Transport-level disconnect
    let _ = input_tx
        .send(ArenaInput {
            conn_id,
            command: Command::Disconnect,
        })
        .await;
    state.hub.unregister(conn_id);

    info!(conn_id = %conn_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    conn_id: ConnectionId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    input_tx: &mpsc::Sender<ArenaInput>,
    mut outbound_rx: mpsc::Receiver<ServerMsg>,
    rate_limiter: ConnectionRateLimiter,
) {
    // Spawn writer task: outbound queue -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> arena
    while let Some(result) = ws_stream.next().await {
        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => {
                warn!(conn_id = %conn_id, error = %ProtocolError::UnsupportedFrame("binary"), "Ignoring frame");
                continue;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                debug!(conn_id = %conn_id, "Received ping/pong");
                continue;
            }
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        };

        let client_msg = match decode_client(&text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "Failed to parse client message");
                continue;
            }
        };

        if !admit(&rate_limiter, &client_msg) {
            warn!(conn_id = %conn_id, "Rate limited input message");
            continue;
        }

        let input = ArenaInput {
            conn_id,
            command: Command::from(client_msg),
        };

        if input_tx.send(input).await.is_err() {
            debug!(conn_id = %conn_id, "Arena input channel closed");
            break;
        }
    }

    writer_handle.abort();
}

/// Joins are never throttled; motion and shots use their own buckets
fn admit<C: Clock>(limiter: &ConnectionRateLimiter<C>, msg: &ClientMsg) -> bool {
    match msg {
        ClientMsg::Join { .. } => true,
        ClientMsg::Move { .. } | ClientMsg::Rotate { .. } => limiter.check_motion(),
        ClientMsg::Shoot { .. } => limiter.check_shot(),
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), ProtocolError> {
    let json = encode_server(msg)?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use governor::clock::FakeRelativeClock;
    use std::time::Duration;

    fn join() -> ClientMsg {
        ClientMsg::Join {
            x: 100.0,
            y: 100.0,
            name: None,
            color: None,
        }
    }

    fn shot() -> ClientMsg {
        ClientMsg::Shoot {
            x: 10.0,
            y: 10.0,
            vx: 6.0,
            vy: 0.0,
        }
    }

    #[test]
    fn join_is_never_limited() {
        let clock = FakeRelativeClock::default();
        let limiter = ConnectionRateLimiter::with_clock(1, 1, &clock);
        assert!(admit(&limiter, &ClientMsg::Move { x: 1.0, y: 1.0 }));
        assert!(admit(&limiter, &shot()));

        for _ in 0..100 {
            assert!(admit(&limiter, &join()));
        }
    }

    #[test]
    fn frame_rate_client_keeps_every_message() {
        // 144 Hz: a move and a rotate each frame, a shot every 14 frames
        let clock = FakeRelativeClock::default();
        let limiter = ConnectionRateLimiter::with_clock(360, 20, &clock);
        let frame = Duration::from_nanos(1_000_000_000 / 144);

        let mut shots = 0;
        for n in 0..288 {
            assert!(admit(&limiter, &ClientMsg::Move { x: 1.0, y: 1.0 }), "move on frame {n}");
            assert!(admit(&limiter, &ClientMsg::Rotate { angle: 0.5 }), "rotate on frame {n}");
            if n % 14 == 0 {
                assert!(admit(&limiter, &shot()), "shot on frame {n}");
                shots += 1;
            }
            clock.advance(frame);
        }
        assert_eq!(shots, 21);
    }

    #[test]
    fn flooding_motion_does_not_starve_shots() {
        let clock = FakeRelativeClock::default();
        let limiter = ConnectionRateLimiter::with_clock(360, 20, &clock);
        let flood = (0..1000)
            .filter(|_| admit(&limiter, &ClientMsg::Rotate { angle: 0.0 }))
            .count();
        assert_eq!(flood, 360);

        assert!(admit(&limiter, &shot()));
    }

    #[test]
    fn shot_spam_is_capped() {
        let clock = FakeRelativeClock::default();
        let limiter = ConnectionRateLimiter::with_clock(360, 20, &clock);
        let allowed = (0..100).filter(|_| admit(&limiter, &shot())).count();
        assert_eq!(allowed, 20);
    }
}
