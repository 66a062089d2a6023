// Domain layer: core simulation types and rules.

pub mod roles;
pub mod state;
pub mod systems;
pub mod tuning;

pub use roles::{PlayerSlot, RoleAssigner};
pub use state::{
    Ball, ConnectionId, GameSnapshot, Lifecycle, Paddle, Rally, Role, Score, Side,
};
pub use tuning::{BallTuning, Court};
