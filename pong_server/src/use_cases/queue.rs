// Bounded FIFO between connection tasks and the session loop.

use super::types::GameEvent;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

#[derive(Debug, PartialEq, Eq)]
pub enum EnqueueError {
    /// Queue at capacity; only returned for paddle moves, which are droppable.
    Full,
    /// The session loop is gone.
    Closed,
}

/// Producer side, cloned into every connection task.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    tx: mpsc::Sender<GameEvent>,
}

/// Consumer side, owned by the session loop.
#[derive(Debug)]
pub struct CommandInbox {
    rx: mpsc::Receiver<GameEvent>,
}

pub fn command_queue(capacity: usize) -> (CommandQueue, CommandInbox) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (CommandQueue { tx }, CommandInbox { rx })
}

impl CommandQueue {
    /// Paddle moves are superseded by the next one, so they never wait for room.
    /// Everything else applies back-pressure to the sending connection.
    pub async fn enqueue(&self, event: GameEvent) -> Result<(), EnqueueError> {
        if let GameEvent::MovePaddle { .. } = event {
            return self.tx.try_send(event).map_err(|err| match err {
                TrySendError::Full(_) => EnqueueError::Full,
                TrySendError::Closed(_) => EnqueueError::Closed,
            });
        }

        self.tx.send(event).await.map_err(|_| EnqueueError::Closed)
    }
}

impl CommandInbox {
    /// Takes every command queued so far, in arrival order, without waiting.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        events
    }
}
