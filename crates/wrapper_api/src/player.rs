//! Per-connection player record.

use crate::endpoint::Endpoint;
use crate::packet::Packet;
use crate::types::{ConnectionId, Position};
use std::sync::Arc;

/// State the wrapper tracks for one proxied client.
///
/// Created with defaults on the first packet seen for a connection pair and
/// updated in place as login and movement packets pass through. Commands and
/// handlers receive it mutably and may change any public field.
#[derive(Debug)]
pub struct Player {
    client: Arc<dyn Endpoint>,
    /// Entity id assigned by the server at login, `-1` before that.
    pub entity_id: i32,
    pub username: String,
    pub position: Position,
}

impl Player {
    /// Entity id of a player the server has not logged in yet.
    pub const UNASSIGNED_ENTITY_ID: i32 = -1;

    pub const DEFAULT_USERNAME: &'static str = "Unknown";

    /// Creates a record for the given client-facing endpoint.
    pub fn new(client: Arc<dyn Endpoint>) -> Self {
        Self {
            client,
            entity_id: Self::UNASSIGNED_ENTITY_ID,
            username: Self::DEFAULT_USERNAME.to_string(),
            position: Position::default(),
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.client.connection_id()
    }

    /// The client-facing endpoint this record is keyed on.
    pub fn client(&self) -> &Arc<dyn Endpoint> {
        &self.client
    }

    pub fn has_entity_id(&self) -> bool {
        self.entity_id != Self::UNASSIGNED_ENTITY_ID
    }

    /// Sends a chat line to the player.
    pub fn message(&self, text: impl Into<String>) {
        self.send(Packet::chat(text));
    }

    /// Sends a packet to the client. The client will believe it arrived
    /// from the server.
    pub fn send(&self, packet: Packet) {
        self.client.send(packet);
    }

    /// Injects a packet towards the server. The server will believe it
    /// originated from the client.
    pub fn inject(&self, packet: Packet) {
        self.client.other().send(packet);
    }
}
