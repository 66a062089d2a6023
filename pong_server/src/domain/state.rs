// Domain-level simulation entities and snapshot types.

use std::fmt;

/// Process-unique identifier for one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player1,
    Player2,
    Observer,
}

impl Role {
    pub fn is_player(self) -> bool {
        !matches!(self, Role::Observer)
    }
}

/// Court side a paddle defends. Player1 plays left, Player2 plays right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn role(self) -> Role {
        match self {
            Side::Left => Role::Player1,
            Side::Right => Role::Player2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Empty,
    AwaitingPlayers,
    Ready,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paddle {
    pub side: Side,
    // Top edge in court coordinates (y grows downward).
    pub y: f32,
    // Latched client request; applied (clamped) on the next tick.
    pub target_y: f32,
}

impl Paddle {
    pub fn new(side: Side, y: f32) -> Self {
        Self {
            side,
            y,
            target_y: y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl Ball {
    pub fn speed(&self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    pub player1: u32,
    pub player2: u32,
}

/// Everything the physics step reads and writes for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rally {
    pub ball: Ball,
    pub left: Option<Paddle>,
    pub right: Option<Paddle>,
    pub score: Score,
}

/// Serializable view of the session sent to clients once per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    pub tick: u64,
    pub ball: Ball,
    pub paddles: Vec<(ConnectionId, f32)>,
    pub roles: Vec<(ConnectionId, Role)>,
    pub score: Score,
}

impl GameSnapshot {
    pub fn paddle_y(&self, conn_id: ConnectionId) -> Option<f32> {
        self.paddles
            .iter()
            .find(|(id, _)| *id == conn_id)
            .map(|(_, y)| *y)
    }

    pub fn role_of(&self, conn_id: ConnectionId) -> Option<Role> {
        self.roles
            .iter()
            .find(|(id, _)| *id == conn_id)
            .map(|(_, role)| *role)
    }
}
