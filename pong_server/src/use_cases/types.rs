// Use-case level inputs/outputs for the session loop.

use crate::domain::{ConnectionId, GameSnapshot, Lifecycle, Role, Score};
use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc;

/// Per-connection outbound buffer carrying pre-serialized messages.
pub type OutboundTx = mpsc::Sender<Utf8Bytes>;

/// Commands flowing from connection tasks into the session loop.
#[derive(Debug, Clone)]
pub enum GameEvent {
    // The outbound link is attached to the broadcaster before the join is applied.
    Join {
        conn_id: ConnectionId,
        outbound: OutboundTx,
    },
    Leave {
        conn_id: ConnectionId,
    },
    MovePaddle {
        conn_id: ConnectionId,
        y: f32,
    },
    Start {
        conn_id: ConnectionId,
    },
    Reset {
        conn_id: ConnectionId,
    },
}

impl GameEvent {
    pub fn conn_id(&self) -> ConnectionId {
        match self {
            GameEvent::Join { conn_id, .. }
            | GameEvent::Leave { conn_id }
            | GameEvent::MovePaddle { conn_id, .. }
            | GameEvent::Start { conn_id }
            | GameEvent::Reset { conn_id } => *conn_id,
        }
    }
}

/// Things the session tells its connections about.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    RoleAssigned { conn_id: ConnectionId, role: Role },
    StateUpdate(GameSnapshot),
    ScoreChanged(Score),
    GameStarted { started_by: ConnectionId },
    PlayerDisconnected { conn_id: ConnectionId, role: Role },
    GameFull,
    LifecycleChanged(Lifecycle),
    Notice(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    All,
    Only(ConnectionId),
}

/// A session event addressed to its recipients.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub to: Recipient,
    pub event: SessionEvent,
}

/// Latest published summary of the session for read-only consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub lifecycle: Lifecycle,
    pub tick: u64,
    pub score: Score,
    pub players: usize,
    pub observers: usize,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            lifecycle: Lifecycle::Empty,
            tick: 0,
            score: Score::default(),
            players: 0,
            observers: 0,
        }
    }
}
