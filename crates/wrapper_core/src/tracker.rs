//! Player state tracking.
//!
//! One [`Player`] per connection pair, created on the first packet seen for
//! the pair and kept current from login and movement packets.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};
use wrapper_api::{ConnectionId, Endpoint, Packet, Player, Position};

/// Owns the player record of every live connection pair.
#[derive(Debug, Default)]
pub struct EntityTracker {
    players: HashMap<ConnectionId, Player>,
}

impl EntityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record for `client`'s pair, creating it with defaults if
    /// this is the first time the pair is seen.
    pub fn get_or_create(&mut self, client: &Arc<dyn Endpoint>) -> &mut Player {
        self.players
            .entry(client.connection_id())
            .or_insert_with(|| {
                debug!("Tracking new connection {}", client.connection_id());
                Player::new(client.clone())
            })
    }

    /// Looks up a pair's record without creating one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wrapper_core::{EntityTracker, MemoryEndpoint};
    ///
    /// let mut tracker = EntityTracker::new();
    /// let (client, _server) = MemoryEndpoint::pair();
    /// assert!(tracker.get(client.connection_id()).is_none());
    ///
    /// tracker.get_or_create(&client).username = "Alice".to_string();
    /// assert_eq!(tracker.get(client.connection_id()).unwrap().username, "Alice");
    /// ```
    pub fn get(&self, id: ConnectionId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Mutable form of [`get`](Self::get).
    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Forgets a pair. The transport calls this when the pair closes.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Player> {
        let removed = self.players.remove(&id);
        if let Some(player) = &removed {
            debug!("Stopped tracking {} ({})", player.username, id);
        }
        removed
    }

    /// Number of tracked pairs.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Iterates over every record, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }
}

/// Applies the built-in state rule for `packet` to `player`.
///
/// At most one field group changes per packet. Entity-targeted packets only
/// apply when they name the player's own entity. Returns whether the record
/// was modified.
pub fn apply_packet(player: &mut Player, packet: &Packet) -> bool {
    match packet {
        Packet::LogIn { username, .. } => {
            player.username = username.clone();
            debug!("Connection {} logging in as {}", player.connection_id(), username);
        }
        Packet::LoggedIn { player_id, .. } => {
            player.entity_id = *player_id;
            debug!("{} logged in with entity id {}", player.username, player_id);
        }
        Packet::Move { x, y, z, .. }
        | Packet::MoveAndLook { x, y, z, .. }
        | Packet::MoveAndLookCorrection { x, y, z, .. } => {
            player.position = Position::new(*x, *y, *z);
        }
        Packet::SpawnPosition { x, y, z } => {
            player.position = Position::new(f64::from(*x), f64::from(*y), f64::from(*z));
        }
        Packet::TeleportEntity {
            entity_id, x, y, z, ..
        } if *entity_id == player.entity_id => {
            player.position = Position::new(f64::from(*x), f64::from(*y), f64::from(*z));
        }
        Packet::MoveEntity {
            entity_id, dx, dy, dz,
        }
        | Packet::MoveAndPointEntity {
            entity_id, dx, dy, dz, ..
        } if *entity_id == player.entity_id => {
            player.position += Position::new(f64::from(*dx), f64::from(*dy), f64::from(*dz));
        }
        Packet::TeleportEntity { .. }
        | Packet::MoveEntity { .. }
        | Packet::MoveAndPointEntity { .. }
        | Packet::KeepAlive
        | Packet::ChatMessage { .. }
        | Packet::Look { .. }
        | Packet::Disconnect { .. }
        | Packet::Unknown { .. } => return false,
    }

    trace!("{} now at {}", player.username, player.position);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEndpoint;

    fn player() -> Player {
        let (client, _server) = MemoryEndpoint::pair();
        Player::new(client)
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let (client, server) = MemoryEndpoint::pair();
        let mut tracker = EntityTracker::new();

        tracker.get_or_create(&client).username = "Alice".to_string();
        // the other side of the pair maps to the same record
        let again = tracker.get_or_create(&server.other());
        assert_eq!(again.username, "Alice");
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_pairs_do_not_share_records() {
        let (first, _) = MemoryEndpoint::pair();
        let (second, _) = MemoryEndpoint::pair();
        let mut tracker = EntityTracker::new();

        tracker.get_or_create(&first).entity_id = 7;
        assert_eq!(tracker.get_or_create(&second).entity_id, Player::UNASSIGNED_ENTITY_ID);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_remove_forgets_pair() {
        let (client, _) = MemoryEndpoint::pair();
        let mut tracker = EntityTracker::new();
        tracker.get_or_create(&client).username = "Bob".to_string();

        let removed = tracker.remove(client.connection_id()).unwrap();
        assert_eq!(removed.username, "Bob");
        assert!(tracker.is_empty());
        assert_eq!(tracker.get_or_create(&client).username, Player::DEFAULT_USERNAME);
    }

    #[test]
    fn test_defaults() {
        let player = player();
        assert_eq!(player.entity_id, -1);
        assert_eq!(player.username, "Unknown");
        assert_eq!(player.position, Position::default());
        assert!(!player.has_entity_id());
    }

    #[test]
    fn test_login_sets_username_then_entity_id() {
        let mut player = player();
        assert!(apply_packet(
            &mut player,
            &Packet::LogIn {
                protocol_version: 14,
                username: "Alice".to_string(),
            }
        ));
        assert!(apply_packet(
            &mut player,
            &Packet::LoggedIn {
                player_id: 42,
                map_seed: 0,
                dimension: 0,
            }
        ));
        assert_eq!(player.username, "Alice");
        assert_eq!(player.entity_id, 42);
    }

    #[test]
    fn test_absolute_moves_overwrite_position() {
        let mut player = player();
        apply_packet(
            &mut player,
            &Packet::Move {
                x: 1.5,
                y: 64.0,
                stance: 65.62,
                z: -3.25,
                on_ground: true,
            },
        );
        assert_eq!(player.position, Position::new(1.5, 64.0, -3.25));

        apply_packet(
            &mut player,
            &Packet::MoveAndLookCorrection {
                x: 10.0,
                stance: 71.62,
                y: 70.0,
                z: 20.0,
                yaw: 0.0,
                pitch: 0.0,
                on_ground: false,
            },
        );
        assert_eq!(player.position, Position::new(10.0, 70.0, 20.0));
    }

    #[test]
    fn test_spawn_position_is_coerced() {
        let mut player = player();
        apply_packet(&mut player, &Packet::SpawnPosition { x: -8, y: 64, z: 250 });
        assert_eq!(player.position, Position::new(-8.0, 64.0, 250.0));
    }

    #[test]
    fn test_teleport_only_applies_to_own_entity() {
        let mut player = player();
        player.entity_id = 5;

        let teleport = |entity_id| Packet::TeleportEntity {
            entity_id,
            x: 100,
            y: 65,
            z: -40,
            yaw: 0,
            pitch: 0,
        };
        assert!(!apply_packet(&mut player, &teleport(6)));
        assert_eq!(player.position, Position::default());
        assert!(apply_packet(&mut player, &teleport(5)));
        assert_eq!(player.position, Position::new(100.0, 65.0, -40.0));
    }

    #[test]
    fn test_relative_moves_accumulate() {
        let mut player = player();
        player.entity_id = 9;
        player.position = Position::new(10.0, 64.0, 10.0);

        let step = Packet::MoveEntity {
            entity_id: 9,
            dx: 1,
            dy: 0,
            dz: -2,
        };
        apply_packet(&mut player, &step);
        apply_packet(&mut player, &step);
        assert_eq!(player.position, Position::new(12.0, 64.0, 6.0));

        apply_packet(
            &mut player,
            &Packet::MoveAndPointEntity {
                entity_id: 9,
                dx: -2,
                dy: 1,
                dz: 0,
                yaw: 12,
                pitch: 0,
            },
        );
        assert_eq!(player.position, Position::new(10.0, 65.0, 6.0));
    }

    #[test]
    fn test_relative_move_for_other_entity_ignored() {
        let mut player = player();
        player.entity_id = 9;
        let moved = apply_packet(
            &mut player,
            &Packet::MoveEntity {
                entity_id: 10,
                dx: 1,
                dy: 1,
                dz: 1,
            },
        );
        assert!(!moved);
        assert_eq!(player.position, Position::default());
    }

    #[test]
    fn test_relative_move_before_login_ignored() {
        let mut player = player();
        assert!(!apply_packet(
            &mut player,
            &Packet::MoveEntity {
                entity_id: 1,
                dx: 1,
                dy: 0,
                dz: 0,
            }
        ));
    }

    #[test]
    fn test_stateless_packets() {
        let mut player = player();
        for packet in [
            Packet::KeepAlive,
            Packet::chat("hi"),
            Packet::Look {
                yaw: 90.0,
                pitch: 0.0,
                on_ground: true,
            },
            Packet::Unknown {
                id: 0x12,
                payload: vec![],
            },
        ] {
            assert!(!apply_packet(&mut player, &packet));
        }
        assert_eq!(player.username, "Unknown");
    }
}
