// Fan-out of session events to per-connection outbound buffers.

use super::types::{Dispatch, OutboundTx, Recipient, SessionEvent};
use crate::domain::ConnectionId;
use axum::extract::ws::Utf8Bytes;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

const LOG_THROTTLE: Duration = Duration::from_secs(2);

/// Turns an event into its wire form. `None` means the event is skipped.
pub type Encoder = fn(&SessionEvent) -> Option<Utf8Bytes>;

pub struct Broadcaster {
    links: HashMap<ConnectionId, OutboundTx>,
    encode: Encoder,
    dropped: u64,
    last_full_log: Instant,
}

impl Broadcaster {
    pub fn new(encode: Encoder) -> Self {
        Self {
            links: HashMap::new(),
            encode,
            dropped: 0,
            last_full_log: Instant::now() - LOG_THROTTLE,
        }
    }

    pub fn attach(&mut self, conn_id: ConnectionId, outbound: OutboundTx) {
        self.links.insert(conn_id, outbound);
    }

    pub fn detach(&mut self, conn_id: ConnectionId) -> bool {
        self.links.remove(&conn_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Messages dropped so far because a connection's buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Sends each dispatch to its recipients, serializing it once.
    ///
    /// A full buffer loses that one message for that one connection. Connections whose
    /// buffer is closed are detached and returned so the caller can treat them as gone.
    pub fn deliver(&mut self, dispatches: Vec<Dispatch>) -> Vec<ConnectionId> {
        let mut closed = Vec::new();
        let dropped_before = self.dropped;

        for dispatch in dispatches {
            let Some(bytes) = (self.encode)(&dispatch.event) else {
                continue;
            };

            match dispatch.to {
                Recipient::All => {
                    for (conn_id, link) in &self.links {
                        if !try_push(link, bytes.clone(), &mut self.dropped) {
                            closed.push(*conn_id);
                        }
                    }
                }
                Recipient::Only(conn_id) => {
                    if let Some(link) = self.links.get(&conn_id) {
                        if !try_push(link, bytes, &mut self.dropped) {
                            closed.push(conn_id);
                        }
                    }
                }
            }

            // Stop sending to closed links for the rest of this batch.
            for conn_id in &closed {
                self.links.remove(conn_id);
            }
        }

        if self.dropped > dropped_before && should_log(&mut self.last_full_log) {
            warn!(
                dropped = self.dropped - dropped_before,
                total_dropped = self.dropped,
                "outbound buffers full; dropping messages for slow connections"
            );
        }

        closed.sort_unstable();
        closed.dedup();
        closed
    }

    /// Drops every outbound buffer, which ends each connection's send side.
    pub fn close_all(&mut self) {
        self.links.clear();
    }
}

// Returns false when the receiving connection has gone away.
fn try_push(link: &OutboundTx, bytes: Utf8Bytes, dropped: &mut u64) -> bool {
    match link.try_send(bytes) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            *dropped += 1;
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}
