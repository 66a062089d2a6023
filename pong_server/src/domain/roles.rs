// Player slot arbitration: two paddles, any number of observers.

use crate::domain::state::{ConnectionId, Paddle, Role, Side};
use std::collections::BTreeSet;

/// A connection bound to one side of the court.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSlot {
    pub conn_id: ConnectionId,
    pub paddle: Paddle,
}

impl PlayerSlot {
    pub fn role(&self) -> Role {
        self.paddle.side.role()
    }
}

#[derive(Debug, Default)]
pub struct RoleAssigner {
    left: Option<PlayerSlot>,
    right: Option<PlayerSlot>,
    observers: BTreeSet<ConnectionId>,
}

impl RoleAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a role by arrival order: Player1, then Player2, then Observer.
    ///
    /// Existing players are never preempted and observers are not promoted later.
    /// A connection that is already known keeps its current role.
    pub fn on_connect(&mut self, conn_id: ConnectionId, paddle_y: f32) -> Role {
        if let Some(role) = self.role_of(conn_id) {
            return role;
        }

        let side = if self.left.is_none() {
            Side::Left
        } else if self.right.is_none() {
            Side::Right
        } else {
            self.observers.insert(conn_id);
            return Role::Observer;
        };

        *self.slot_entry(side) = Some(PlayerSlot {
            conn_id,
            paddle: Paddle::new(side, paddle_y),
        });
        side.role()
    }

    /// Frees whatever the connection held. Returns the vacated role, if any.
    pub fn on_disconnect(&mut self, conn_id: ConnectionId) -> Option<Role> {
        for side in [Side::Left, Side::Right] {
            let entry = self.slot_entry(side);
            if entry.is_some_and(|slot| slot.conn_id == conn_id) {
                *entry = None;
                return Some(side.role());
            }
        }

        self.observers.remove(&conn_id).then_some(Role::Observer)
    }

    pub fn role_of(&self, conn_id: ConnectionId) -> Option<Role> {
        if let Some(slot) = self.slots().find(|slot| slot.conn_id == conn_id) {
            return Some(slot.role());
        }
        self.observers.contains(&conn_id).then_some(Role::Observer)
    }

    pub fn slot(&self, side: Side) -> Option<&PlayerSlot> {
        match side {
            Side::Left => self.left.as_ref(),
            Side::Right => self.right.as_ref(),
        }
    }

    pub fn slot_for_mut(&mut self, conn_id: ConnectionId) -> Option<&mut PlayerSlot> {
        [self.left.as_mut(), self.right.as_mut()]
            .into_iter()
            .flatten()
            .find(|slot| slot.conn_id == conn_id)
    }

    /// Occupied slots, Player1 first.
    pub fn slots(&self) -> impl Iterator<Item = &PlayerSlot> {
        self.left.iter().chain(self.right.iter())
    }

    pub fn player_count(&self) -> usize {
        self.slots().count()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Writes physics results back into the occupied slots.
    pub fn store_paddles(&mut self, left: Option<Paddle>, right: Option<Paddle>) {
        if let (Some(slot), Some(paddle)) = (self.left.as_mut(), left) {
            slot.paddle = paddle;
        }
        if let (Some(slot), Some(paddle)) = (self.right.as_mut(), right) {
            slot.paddle = paddle;
        }
    }

    fn slot_entry(&mut self, side: Side) -> &mut Option<PlayerSlot> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_Y: f32 = 150.0;

    #[test]
    fn when_three_connect_then_roles_follow_arrival_order() {
        let mut roles = RoleAssigner::new();

        assert_eq!(roles.on_connect(ConnectionId(1), START_Y), Role::Player1);
        assert_eq!(roles.on_connect(ConnectionId(2), START_Y), Role::Player2);
        assert_eq!(roles.on_connect(ConnectionId(3), START_Y), Role::Observer);

        assert_eq!(roles.player_count(), 2);
        assert_eq!(roles.observer_count(), 1);
    }

    #[test]
    fn when_player1_leaves_then_next_arrival_takes_the_slot_and_observer_stays() {
        let mut roles = RoleAssigner::new();
        roles.on_connect(ConnectionId(1), START_Y);
        roles.on_connect(ConnectionId(2), START_Y);
        roles.on_connect(ConnectionId(3), START_Y);

        assert_eq!(roles.on_disconnect(ConnectionId(1)), Some(Role::Player1));
        assert_eq!(roles.role_of(ConnectionId(3)), Some(Role::Observer));

        assert_eq!(roles.on_connect(ConnectionId(4), START_Y), Role::Player1);
        assert_eq!(
            roles.slot(Side::Left).map(|slot| slot.conn_id),
            Some(ConnectionId(4))
        );
    }

    #[test]
    fn when_known_connection_reconnects_then_role_is_unchanged() {
        let mut roles = RoleAssigner::new();
        roles.on_connect(ConnectionId(1), START_Y);

        assert_eq!(roles.on_connect(ConnectionId(1), START_Y), Role::Player1);
        assert_eq!(roles.player_count(), 1);
        assert!(roles.slot(Side::Right).is_none());
    }

    #[test]
    fn when_unknown_or_observer_disconnects_then_slots_are_untouched() {
        let mut roles = RoleAssigner::new();
        roles.on_connect(ConnectionId(1), START_Y);
        roles.on_connect(ConnectionId(2), START_Y);
        roles.on_connect(ConnectionId(3), START_Y);

        assert_eq!(roles.on_disconnect(ConnectionId(9)), None);
        assert_eq!(roles.on_disconnect(ConnectionId(3)), Some(Role::Observer));
        assert_eq!(roles.on_disconnect(ConnectionId(3)), None);
        assert_eq!(roles.player_count(), 2);
    }
}
