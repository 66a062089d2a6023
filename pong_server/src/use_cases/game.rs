use super::broadcast::Broadcaster;
use super::queue::CommandInbox;
use super::session::Session;
use super::types::{GameEvent, SessionStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// The single writer for session state.
///
/// Each tick drains queued commands in arrival order, advances the simulation once,
/// then flushes everything the session emitted to the connections.
pub async fn session_task(
    mut session: Session,
    mut inbox: CommandInbox,
    mut broadcaster: Broadcaster,
    status_tx: watch::Sender<SessionStatus>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
) {
    // Drive the fixed-step game loop at the configured tick rate.
    let mut interval = tokio::time::interval(tick_interval);
    // An overrun pushes the schedule back instead of bursting to catch up.
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let dt = tick_interval.as_secs_f32();

    info!(tick_ms = tick_interval.as_millis() as u64, "session loop started");

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                break;
            }
            _ = interval.tick() => {}
        }

        for event in inbox.drain() {
            apply(&mut session, &mut broadcaster, event);
        }

        session.tick(dt);
        flush(&mut session, &mut broadcaster);

        let _ = status_tx.send_replace(session.status());
    }

    // Dropping the outbound buffers ends every connection's writer.
    broadcaster.close_all();
    info!("session loop stopped");
}

fn apply(session: &mut Session, broadcaster: &mut Broadcaster, event: GameEvent) {
    match event {
        GameEvent::Join { conn_id, outbound } => {
            broadcaster.attach(conn_id, outbound);
            session.join(conn_id);
        }
        GameEvent::Leave { conn_id } => {
            broadcaster.detach(conn_id);
            session.leave(conn_id);
        }
        GameEvent::MovePaddle { conn_id, y } => session.move_paddle(conn_id, y),
        GameEvent::Start { conn_id } => session.start(conn_id),
        GameEvent::Reset { conn_id } => session.reset(conn_id),
    }
}

// A closed outbound buffer counts as a departure; its Leave may emit more traffic.
fn flush(session: &mut Session, broadcaster: &mut Broadcaster) {
    loop {
        let closed = broadcaster.deliver(session.take_dispatches());
        if closed.is_empty() {
            return;
        }
        for conn_id in closed {
            debug!(%conn_id, "outbound buffer closed; treating as leave");
            session.leave(conn_id);
        }
    }
}
