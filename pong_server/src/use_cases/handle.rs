// Session orchestration: wires the command queue, broadcaster and tick loop together.

use crate::domain::{BallTuning, Court};
use crate::use_cases::broadcast::{Broadcaster, Encoder};
use crate::use_cases::game::session_task;
use crate::use_cases::queue::{CommandQueue, EnqueueError, command_queue};
use crate::use_cases::session::Session;
use crate::use_cases::types::{GameEvent, SessionStatus};
use axum::extract::ws::Utf8Bytes;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;

/// Shared configuration for spawning the session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Capacity for inbound commands from all connections.
    pub command_capacity: usize,
    /// Per-connection capacity for pre-serialized outbound messages.
    pub outbound_capacity: usize,
    /// Fixed tick interval for the game loop.
    pub tick_interval: Duration,
    /// Fixed seed for serve directions; entropy when absent.
    pub rng_seed: Option<u64>,
    pub court: Court,
    pub tuning: BallTuning,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            command_capacity: 1024,
            outbound_capacity: 64,
            tick_interval: Duration::from_millis(1000 / 60),
            rng_seed: None,
            court: Court::default(),
            tuning: BallTuning::default(),
        }
    }
}

/// Cloneable access to a running session for connection tasks and HTTP routes.
#[derive(Clone)]
pub struct SessionHandle {
    commands: CommandQueue,
    status_rx: watch::Receiver<SessionStatus>,
    outbound_capacity: usize,
    shutdown: Arc<Notify>,
}

impl SessionHandle {
    /// Creates the session and spawns its tick loop.
    pub fn spawn(settings: SessionSettings, encode: Encoder) -> (Self, JoinHandle<()>) {
        let rng = match settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let session = Session::new(settings.court, settings.tuning, rng);

        // Channel wiring for the session loop.
        let (commands, inbox) = command_queue(settings.command_capacity);
        let (status_tx, status_rx) = watch::channel(SessionStatus::default());
        let shutdown = Arc::new(Notify::new());

        let task = tokio::spawn(session_task(
            session,
            inbox,
            Broadcaster::new(encode),
            status_tx,
            settings.tick_interval,
            shutdown.clone(),
        ));

        let handle = Self {
            commands,
            status_rx,
            outbound_capacity: settings.outbound_capacity.max(1),
            shutdown,
        };
        (handle, task)
    }

    /// Buffer the session loop writes a connection's messages into.
    pub fn outbound_channel(&self) -> (mpsc::Sender<Utf8Bytes>, mpsc::Receiver<Utf8Bytes>) {
        mpsc::channel(self.outbound_capacity)
    }

    pub async fn submit(&self, event: GameEvent) -> Result<(), EnqueueError> {
        self.commands.enqueue(event).await
    }

    /// Latest status published by the loop, cloned out of the watch.
    pub fn status(&self) -> SessionStatus {
        self.status_rx.borrow().clone()
    }

    /// Stops the tick loop; connections see their outbound stream end.
    pub fn shutdown(&self) {
        // `notify_one` stores a permit, so a signal sent mid-tick is not lost.
        self.shutdown.notify_one();
    }
}
