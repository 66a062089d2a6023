use crate::domain::ConnectionId;
use crate::interface_adapters::protocol::{
    ClientMessage, decode_client_message, echo_reply, encode_message,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids::next_connection_id;
use crate::use_cases::{EnqueueError, GameEvent, SessionHandle};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    SessionClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_MESSAGES: u32 = 10;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let session = state.session.clone();
    ws.on_upgrade(move |socket| {
        let conn_id = next_connection_id();
        handle_socket(socket, session, conn_id)
            .instrument(info_span!("conn", conn_id = conn_id.0))
    })
}

async fn handle_socket(mut socket: WebSocket, session: SessionHandle, conn_id: ConnectionId) {
    // The outbound buffer must reach the session before any command from this socket.
    let (outbound, outbound_rx) = session.outbound_channel();
    if session
        .submit(GameEvent::Join { conn_id, outbound })
        .await
        .is_err()
    {
        warn!("session unavailable; refusing connection");
        let _ = send_close_with_reason(&mut socket, close_code::AWAY, "server shutting down").await;
        return;
    }

    info!("client connected");

    let now = Instant::now() - LOG_THROTTLE;
    let mut ctx = ConnCtx {
        conn_id,
        session,
        outbound_rx,
        msgs_in: 0,
        msgs_out: 0,
        bytes_in: 0,
        bytes_out: 0,
        invalid_msgs: 0,
        last_queue_full_log: now,
        last_invalid_input_log: now,
        close_frame: None,
    };

    // Main Client Loop
    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

struct ConnCtx {
    conn_id: ConnectionId,
    session: SessionHandle,
    // Pre-serialized messages from the session loop; ends when the session stops.
    outbound_rx: mpsc::Receiver<Utf8Bytes>,

    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,

    invalid_msgs: u32,

    last_queue_full_log: Instant,
    last_invalid_input_log: Instant,

    close_frame: Option<CloseFrame>,
}

enum LoopControl {
    Continue,
    Disconnect,
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(incoming, socket, ctx).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing Session Traffic
            outbound = ctx.outbound_rx.recv() => {
                match outbound {
                    Some(bytes) => match forward_bytes(bytes, socket, ctx).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    None => {
                        // Session dropped our buffer: shutdown, or we were treated as gone.
                        ctx.close_frame = Some(CloseFrame {
                            code: close_code::AWAY,
                            reason: "server shutting down".into(),
                        });
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(ctx).await {
        debug!(error = ?e, "leave not delivered; session already stopped");
    }

    if let Some(err) = fatal {
        Err(err)
    } else {
        Ok(())
    }
}

async fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match decode_client_message(&text) {
                    Ok(command) => process_command(command, socket, ctx).await,
                    Err(err) => {
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(
                                bytes = text.len(),
                                error = %err,
                                "failed to parse client message"
                            );
                        }
                        Ok(register_invalid(ctx))
                    }
                }
            }
            Message::Binary(data) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += data.len() as u64;
                if should_log(&mut ctx.last_invalid_input_log) {
                    warn!(bytes = data.len(), "binary messages not supported; dropping");
                }
                Ok(register_invalid(ctx))
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

fn register_invalid(ctx: &mut ConnCtx) -> LoopControl {
    ctx.invalid_msgs += 1;
    if ctx.invalid_msgs > MAX_INVALID_MESSAGES {
        ctx.close_frame = Some(CloseFrame {
            code: close_code::POLICY,
            reason: "too many invalid messages".into(),
        });
        return LoopControl::Disconnect;
    }
    LoopControl::Continue
}

async fn process_command(
    command: ClientMessage,
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    if let ClientMessage::Echo(payload) = &command {
        // Only the sender hears the reply; the session never sees it.
        return Ok(match encode_message(&echo_reply(payload)) {
            Some(bytes) => forward_bytes(bytes, socket, ctx).await,
            None => LoopControl::Continue,
        });
    }
    let Some(event) = command.into_event(ctx.conn_id) else {
        return Ok(LoopControl::Continue);
    };

    match ctx.session.submit(event).await {
        Ok(()) => Ok(LoopControl::Continue),
        Err(EnqueueError::Full) => {
            if should_log(&mut ctx.last_queue_full_log) {
                warn!("command queue full; dropping paddle move");
            }
            Ok(LoopControl::Continue)
        }
        Err(EnqueueError::Closed) => Err(NetError::SessionClosed),
    }
}

async fn forward_bytes(bytes: Utf8Bytes, socket: &mut WebSocket, ctx: &mut ConnCtx) -> LoopControl {
    let bytes_len = bytes.len();
    match socket.send(Message::Text(bytes)).await.map_err(NetError::Ws) {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send session message");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) -> Result<(), NetError> {
    debug!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_msgs = ctx.invalid_msgs,
        "connection stats"
    );
    info!("client disconnected");

    ctx.session
        .submit(GameEvent::Leave {
            conn_id: ctx.conn_id,
        })
        .await
        .map_err(|_| NetError::SessionClosed)
}
