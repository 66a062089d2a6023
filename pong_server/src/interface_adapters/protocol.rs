// Wire protocol DTOs and conversions for the public WebSocket and HTTP surfaces.
// Every frame is a JSON object of the form {"type": <name>, "data": <payload>}.

use crate::domain::{ConnectionId, GameSnapshot, Lifecycle, Role, Score};
use crate::use_cases::{GameEvent, SessionEvent, SessionStatus};
use axum::extract::ws::Utf8Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::error;

/// Sent to an observer when both player slots are taken.
pub const GAME_FULL_MESSAGE: &str = "Game is full. You are a spectator.";

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    // Role granted to the receiving connection.
    PlayerAssignment {
        role: RoleDto,
        connection_id: String,
    },
    // Authoritative state for a given tick.
    GameUpdate(GameUpdateDto),
    ScoreUpdate(ScoresDto),
    GameStarted {
        started_by: String,
    },
    PlayerDisconnected {
        role: RoleDto,
        connection_id: String,
    },
    GameFull {
        message: String,
    },
    SessionState {
        lifecycle: LifecycleDto,
    },
    // Informational text for display.
    Message {
        text: String,
    },
    ServerResponse {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleDto {
    Player1,
    Player2,
    Observer,
}

impl From<Role> for RoleDto {
    fn from(role: Role) -> Self {
        match role {
            Role::Player1 => RoleDto::Player1,
            Role::Player2 => RoleDto::Player2,
            Role::Observer => RoleDto::Observer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleDto {
    Empty,
    AwaitingPlayers,
    Ready,
    Running,
}

impl From<Lifecycle> for LifecycleDto {
    fn from(lifecycle: Lifecycle) -> Self {
        match lifecycle {
            Lifecycle::Empty => LifecycleDto::Empty,
            Lifecycle::AwaitingPlayers => LifecycleDto::AwaitingPlayers,
            Lifecycle::Ready => LifecycleDto::Ready,
            Lifecycle::Running => LifecycleDto::Running,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoresDto {
    pub player1: u32,
    pub player2: u32,
}

impl From<Score> for ScoresDto {
    fn from(score: Score) -> Self {
        Self {
            player1: score.player1,
            player2: score.player2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BallDto {
    pub x: f32,
    pub y: f32,
}

/// Snapshot of the session sent to clients on each tick and on role changes.
#[derive(Debug, Clone, Serialize)]
pub struct GameUpdateDto {
    pub tick: u64,
    pub ball: BallDto,
    // Keyed by connection id; only occupied player slots appear.
    pub paddles: BTreeMap<String, f32>,
    pub player_roles: BTreeMap<String, RoleDto>,
    pub scores: ScoresDto,
}

impl From<&GameSnapshot> for GameUpdateDto {
    fn from(snapshot: &GameSnapshot) -> Self {
        Self {
            tick: snapshot.tick,
            ball: BallDto {
                x: snapshot.ball.x,
                y: snapshot.ball.y,
            },
            paddles: snapshot
                .paddles
                .iter()
                .map(|(id, y)| (id.to_string(), *y))
                .collect(),
            player_roles: snapshot
                .roles
                .iter()
                .map(|(id, role)| (id.to_string(), RoleDto::from(*role)))
                .collect(),
            scores: snapshot.score.into(),
        }
    }
}

impl From<&SessionEvent> for ServerMessage {
    fn from(event: &SessionEvent) -> Self {
        match event {
            SessionEvent::RoleAssigned { conn_id, role } => ServerMessage::PlayerAssignment {
                role: (*role).into(),
                connection_id: conn_id.to_string(),
            },
            SessionEvent::StateUpdate(snapshot) => ServerMessage::GameUpdate(snapshot.into()),
            SessionEvent::ScoreChanged(score) => ServerMessage::ScoreUpdate((*score).into()),
            SessionEvent::GameStarted { started_by } => ServerMessage::GameStarted {
                started_by: started_by.to_string(),
            },
            SessionEvent::PlayerDisconnected { conn_id, role } => {
                ServerMessage::PlayerDisconnected {
                    role: (*role).into(),
                    connection_id: conn_id.to_string(),
                }
            }
            SessionEvent::GameFull => ServerMessage::GameFull {
                message: GAME_FULL_MESSAGE.to_string(),
            },
            SessionEvent::LifecycleChanged(lifecycle) => ServerMessage::SessionState {
                lifecycle: (*lifecycle).into(),
            },
            SessionEvent::Notice(text) => ServerMessage::Message { text: text.clone() },
        }
    }
}

/// Serializes a session event once so the bytes can be shared by every recipient.
pub fn encode_event(event: &SessionEvent) -> Option<Utf8Bytes> {
    encode_message(&ServerMessage::from(event))
}

pub fn encode_message(message: &ServerMessage) -> Option<Utf8Bytes> {
    match serde_json::to_string(message) {
        Ok(txt) => Some(Utf8Bytes::from(txt)),
        Err(e) => {
            error!(error = ?e, "failed to serialize server message");
            None
        }
    }
}

/// Response body for `GET /session`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatusDto {
    pub lifecycle: LifecycleDto,
    pub tick: u64,
    pub scores: ScoresDto,
    pub players: usize,
    pub observers: usize,
}

impl From<SessionStatus> for SessionStatusDto {
    fn from(status: SessionStatus) -> Self {
        Self {
            lifecycle: status.lifecycle.into(),
            tick: status.tick,
            scores: status.score.into(),
            players: status.players,
            observers: status.observers,
        }
    }
}

/// Commands a client may send once connected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    PaddleMove(PaddleMovePayload),
    // `data` may be `{}`, `null` or absent.
    StartGame(Option<EmptyPayload>),
    ResetGame(Option<EmptyPayload>),
    // Connectivity check answered by the connection itself.
    #[serde(rename = "client_message")]
    Echo(EchoPayload),
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PaddleMovePayload {
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct EmptyPayload {}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EchoPayload {
    #[serde(default)]
    pub message: Option<String>,
}

impl ClientMessage {
    /// Session command for this message; `None` for messages the connection answers itself.
    pub fn into_event(self, conn_id: ConnectionId) -> Option<GameEvent> {
        match self {
            ClientMessage::PaddleMove(payload) => Some(GameEvent::MovePaddle {
                conn_id,
                y: payload.y as f32,
            }),
            ClientMessage::StartGame(_) => Some(GameEvent::Start { conn_id }),
            ClientMessage::ResetGame(_) => Some(GameEvent::Reset { conn_id }),
            ClientMessage::Echo(_) => None,
        }
    }
}

#[derive(Debug)]
pub enum DecodeError {
    // Not JSON, unknown `type`, or `data` of the wrong shape.
    Json(serde_json::Error),
    NonFinite,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Json(e) => write!(f, "invalid message: {e}"),
            DecodeError::NonFinite => write!(f, "paddle position is not finite"),
        }
    }
}

/// Parses one inbound text frame. Nothing that fails here reaches the session.
pub fn decode_client_message(text: &str) -> Result<ClientMessage, DecodeError> {
    let message: ClientMessage = serde_json::from_str(text).map_err(DecodeError::Json)?;

    match message {
        ClientMessage::PaddleMove(payload) if !(payload.y as f32).is_finite() => {
            Err(DecodeError::NonFinite)
        }
        message => Ok(message),
    }
}

/// Reply to a `client_message`, sent to the asking connection only.
pub fn echo_reply(payload: &EchoPayload) -> ServerMessage {
    ServerMessage::ServerResponse {
        message: format!(
            "Server received your message: {}",
            payload.message.as_deref().unwrap_or_default()
        ),
    }
}
