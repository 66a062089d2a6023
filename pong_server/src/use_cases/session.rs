// The single shared game session: roles, lifecycle, and the authoritative rally state.

use super::types::{Dispatch, Recipient, SessionEvent, SessionStatus};
use crate::domain::systems::physics;
use crate::domain::{
    Ball, BallTuning, ConnectionId, Court, GameSnapshot, Lifecycle, Rally, Role, RoleAssigner,
    Score, Side,
};
use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, info};

pub const READY_NOTICE: &str = "Two players connected. Ready to start!";

/// Owns all mutable game state. Only the session loop holds one of these.
///
/// Every operation is infallible: commands that make no sense for the current
/// state or sender are ignored. Outbound traffic accumulates in an outbox that the
/// caller drains with [`Session::take_dispatches`].
pub struct Session {
    court: Court,
    tuning: BallTuning,
    lifecycle: Lifecycle,
    roles: RoleAssigner,
    ball: Ball,
    score: Score,
    tick: u64,
    rng: StdRng,
    outbox: Vec<Dispatch>,
}

impl Session {
    pub fn new(court: Court, tuning: BallTuning, mut rng: StdRng) -> Self {
        let toward = random_side(&mut rng);
        let ball = physics::serve(&court, &tuning, toward, &mut rng);
        Self {
            court,
            tuning,
            lifecycle: Lifecycle::Empty,
            roles: RoleAssigner::new(),
            ball,
            score: Score::default(),
            tick: 0,
            rng,
            outbox: Vec::new(),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn ball(&self) -> Ball {
        self.ball
    }

    pub fn role_of(&self, conn_id: ConnectionId) -> Option<Role> {
        self.roles.role_of(conn_id)
    }

    pub fn join(&mut self, conn_id: ConnectionId) {
        if let Some(role) = self.roles.role_of(conn_id) {
            debug!(%conn_id, ?role, "duplicate join ignored");
            return;
        }

        let role = self.roles.on_connect(conn_id, self.court.paddle_start_y());
        info!(
            %conn_id,
            ?role,
            players = self.roles.player_count(),
            observers = self.roles.observer_count(),
            "connection joined"
        );
        self.send(
            Recipient::Only(conn_id),
            SessionEvent::RoleAssigned { conn_id, role },
        );

        if role.is_player() {
            self.sync_lifecycle();
            if self.roles.player_count() == 2 {
                self.send(Recipient::All, SessionEvent::Notice(READY_NOTICE.to_string()));
            }
            // The role map changed for everyone.
            self.send(Recipient::All, SessionEvent::StateUpdate(self.snapshot()));
        } else {
            self.send(Recipient::Only(conn_id), SessionEvent::GameFull);
            self.send(
                Recipient::Only(conn_id),
                SessionEvent::StateUpdate(self.snapshot()),
            );
        }
    }

    pub fn leave(&mut self, conn_id: ConnectionId) {
        let Some(role) = self.roles.on_disconnect(conn_id) else {
            return;
        };
        info!(%conn_id, ?role, "connection left");

        if role.is_player() {
            self.send(
                Recipient::All,
                SessionEvent::PlayerDisconnected { conn_id, role },
            );
            self.sync_lifecycle();
            self.send(Recipient::All, SessionEvent::StateUpdate(self.snapshot()));
        }
    }

    /// Latches a paddle target; it is clamped and applied on the next tick.
    pub fn move_paddle(&mut self, conn_id: ConnectionId, y: f32) {
        if !y.is_finite() {
            return;
        }
        match self.roles.slot_for_mut(conn_id) {
            Some(slot) => slot.paddle.target_y = y,
            None => debug!(%conn_id, "paddle move from non-player ignored"),
        }
    }

    pub fn start(&mut self, conn_id: ConnectionId) {
        if !self.is_player(conn_id) {
            debug!(%conn_id, "start from non-player ignored");
            return;
        }

        match self.lifecycle {
            Lifecycle::Ready => {
                self.score = Score::default();
                self.serve_random();
                info!(%conn_id, "game started");
                self.send(Recipient::All, SessionEvent::ScoreChanged(self.score));
                self.send(
                    Recipient::All,
                    SessionEvent::GameStarted {
                        started_by: conn_id,
                    },
                );
                self.transition(Lifecycle::Running);
            }
            Lifecycle::Running => {
                // Already running; repeat the notice so the sender's UI settles.
                self.send(
                    Recipient::All,
                    SessionEvent::GameStarted {
                        started_by: conn_id,
                    },
                );
            }
            Lifecycle::Empty | Lifecycle::AwaitingPlayers => {
                debug!(%conn_id, lifecycle = ?self.lifecycle, "start ignored; waiting for players");
            }
        }
    }

    /// Zeroes the score and recenters the ball. Slots are untouched.
    pub fn reset(&mut self, conn_id: ConnectionId) {
        if !self.is_player(conn_id) {
            debug!(%conn_id, "reset from non-player ignored");
            return;
        }

        self.score = Score::default();
        self.serve_random();
        if self.lifecycle == Lifecycle::Running {
            self.transition(Lifecycle::Ready);
        }
        info!(%conn_id, "game reset");
        self.send(Recipient::All, SessionEvent::ScoreChanged(self.score));
        self.send(Recipient::All, SessionEvent::StateUpdate(self.snapshot()));
    }

    /// Runs one fixed step and queues the per-tick state update for everyone.
    pub fn tick(&mut self, dt: f32) {
        let mut rally = self.rally();
        let mut goal = None;

        if self.lifecycle == Lifecycle::Running {
            let outcome =
                physics::advance(rally, &self.court, &self.tuning, dt, &mut self.rng);
            rally = outcome.rally;
            goal = outcome.goal;
        } else {
            physics::apply_paddle_targets(&mut rally, &self.court);
        }

        self.ball = rally.ball;
        self.score = rally.score;
        self.roles.store_paddles(rally.left, rally.right);
        self.tick += 1;

        if let Some(scorer) = goal {
            info!(
                ?scorer,
                player1 = self.score.player1,
                player2 = self.score.player2,
                "goal"
            );
            self.send(Recipient::All, SessionEvent::ScoreChanged(self.score));
        }
        self.send(Recipient::All, SessionEvent::StateUpdate(self.snapshot()));
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            tick: self.tick,
            ball: self.ball,
            paddles: self
                .roles
                .slots()
                .map(|slot| (slot.conn_id, slot.paddle.y))
                .collect(),
            roles: self
                .roles
                .slots()
                .map(|slot| (slot.conn_id, slot.role()))
                .collect(),
            score: self.score,
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            lifecycle: self.lifecycle,
            tick: self.tick,
            score: self.score,
            players: self.roles.player_count(),
            observers: self.roles.observer_count(),
        }
    }

    pub fn take_dispatches(&mut self) -> Vec<Dispatch> {
        std::mem::take(&mut self.outbox)
    }

    #[cfg(test)]
    pub(crate) fn place_ball(&mut self, ball: Ball) {
        self.ball = ball;
    }

    fn is_player(&self, conn_id: ConnectionId) -> bool {
        self.roles.role_of(conn_id).is_some_and(Role::is_player)
    }

    fn rally(&self) -> Rally {
        Rally {
            ball: self.ball,
            left: self.roles.slot(Side::Left).map(|slot| slot.paddle),
            right: self.roles.slot(Side::Right).map(|slot| slot.paddle),
            score: self.score,
        }
    }

    fn serve_random(&mut self) {
        let toward = random_side(&mut self.rng);
        self.ball = physics::serve(&self.court, &self.tuning, toward, &mut self.rng);
    }

    // Lifecycle follows slot occupancy; Running survives only while both slots are filled.
    fn sync_lifecycle(&mut self) {
        let next = match (self.lifecycle, self.roles.player_count()) {
            (_, 0) => Lifecycle::Empty,
            (_, 1) => Lifecycle::AwaitingPlayers,
            (Lifecycle::Running, _) => Lifecycle::Running,
            _ => Lifecycle::Ready,
        };
        self.transition(next);
    }

    fn transition(&mut self, next: Lifecycle) {
        if next == self.lifecycle {
            return;
        }
        info!(from = ?self.lifecycle, to = ?next, "lifecycle changed");
        self.lifecycle = next;
        self.send(Recipient::All, SessionEvent::LifecycleChanged(next));
    }

    fn send(&mut self, to: Recipient, event: SessionEvent) {
        self.outbox.push(Dispatch { to, event });
    }
}

fn random_side(rng: &mut StdRng) -> Side {
    if rng.gen_bool(0.5) {
        Side::Left
    } else {
        Side::Right
    }
}
