// Use cases layer: application workflows for the game server.

pub mod broadcast;
pub mod game;
pub mod handle;
pub mod queue;
pub mod session;
pub mod types;

pub use broadcast::{Broadcaster, Encoder};
pub use handle::{SessionHandle, SessionSettings};
pub use queue::{CommandInbox, CommandQueue, EnqueueError};
pub use session::Session;
pub use types::{Dispatch, GameEvent, OutboundTx, Recipient, SessionEvent, SessionStatus};
