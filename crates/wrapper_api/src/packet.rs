//! # Packet Model
//!
//! Decoded packets as the wrapper sees them. The wire codec lives in the
//! transport; by the time a packet reaches the core it is one variant of
//! [`Packet`], wrapped in a [`Message`] that records the direction it is
//! travelling and whether it has been suppressed.
//!
//! Only the packets the wrapper reacts to get their own variant. Everything
//! else is carried opaquely as [`Packet::Unknown`] so handlers can still be
//! keyed on its id.

use crate::types::{Direction, Directions};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    KeepAlive,
    /// Login request sent by the client.
    LogIn {
        protocol_version: i32,
        username: String,
    },
    /// Login acknowledgement carrying the player's entity id.
    LoggedIn {
        player_id: i32,
        map_seed: i64,
        dimension: i8,
    },
    ChatMessage {
        message: String,
    },
    /// World spawn point, in block coordinates.
    SpawnPosition {
        x: i32,
        y: i32,
        z: i32,
    },
    Move {
        x: f64,
        y: f64,
        stance: f64,
        z: f64,
        on_ground: bool,
    },
    Look {
        yaw: f32,
        pitch: f32,
        on_ground: bool,
    },
    MoveAndLook {
        x: f64,
        y: f64,
        stance: f64,
        z: f64,
        yaw: f32,
        pitch: f32,
        on_ground: bool,
    },
    /// Server-side position correction. Shares its id with `MoveAndLook`
    /// but travels the other way.
    MoveAndLookCorrection {
        x: f64,
        stance: f64,
        y: f64,
        z: f64,
        yaw: f32,
        pitch: f32,
        on_ground: bool,
    },
    /// Relative entity movement.
    MoveEntity {
        entity_id: i32,
        dx: i8,
        dy: i8,
        dz: i8,
    },
    /// Relative entity movement with a new facing.
    MoveAndPointEntity {
        entity_id: i32,
        dx: i8,
        dy: i8,
        dz: i8,
        yaw: i8,
        pitch: i8,
    },
    /// Absolute entity position.
    TeleportEntity {
        entity_id: i32,
        x: i32,
        y: i32,
        z: i32,
        yaw: i8,
        pitch: i8,
    },
    Disconnect {
        reason: String,
    },
    /// Any packet the wrapper does not model, kept as raw bytes.
    Unknown {
        id: u8,
        payload: Vec<u8>,
    },
}

impl Packet {
    /// Convenience constructor for a chat packet.
    pub fn chat(message: impl Into<String>) -> Self {
        Packet::ChatMessage {
            message: message.into(),
        }
    }

    /// Returns the discriminant of this packet.
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::KeepAlive => PacketKind::KeepAlive,
            Packet::LogIn { .. } => PacketKind::LogIn,
            Packet::LoggedIn { .. } => PacketKind::LoggedIn,
            Packet::ChatMessage { .. } => PacketKind::ChatMessage,
            Packet::SpawnPosition { .. } => PacketKind::SpawnPosition,
            Packet::Move { .. } => PacketKind::Move,
            Packet::Look { .. } => PacketKind::Look,
            Packet::MoveAndLook { .. } => PacketKind::MoveAndLook,
            Packet::MoveAndLookCorrection { .. } => PacketKind::MoveAndLookCorrection,
            Packet::MoveEntity { .. } => PacketKind::MoveEntity,
            Packet::MoveAndPointEntity { .. } => PacketKind::MoveAndPointEntity,
            Packet::TeleportEntity { .. } => PacketKind::TeleportEntity,
            Packet::Disconnect { .. } => PacketKind::Disconnect,
            Packet::Unknown { id, .. } => PacketKind::Unknown(*id),
        }
    }
}

/// Packet discriminant used as half of a handler registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketKind {
    KeepAlive,
    LogIn,
    LoggedIn,
    ChatMessage,
    SpawnPosition,
    Move,
    Look,
    MoveAndLook,
    MoveAndLookCorrection,
    MoveEntity,
    MoveAndPointEntity,
    TeleportEntity,
    Disconnect,
    Unknown(u8),
}

impl PacketKind {
    /// Wire id of the packet.
    pub fn id(self) -> u8 {
        match self {
            PacketKind::KeepAlive => 0x00,
            PacketKind::LogIn | PacketKind::LoggedIn => 0x01,
            PacketKind::ChatMessage => 0x03,
            PacketKind::SpawnPosition => 0x06,
            PacketKind::Move => 0x0B,
            PacketKind::Look => 0x0C,
            PacketKind::MoveAndLook | PacketKind::MoveAndLookCorrection => 0x0D,
            PacketKind::MoveEntity => 0x1F,
            PacketKind::MoveAndPointEntity => 0x21,
            PacketKind::TeleportEntity => 0x22,
            PacketKind::Disconnect => 0xFF,
            PacketKind::Unknown(id) => id,
        }
    }

    /// The directions this kind of packet can travel in.
    ///
    /// Handler registrations that omit a direction use this set.
    pub fn directions(self) -> Directions {
        match self {
            PacketKind::LogIn | PacketKind::Move | PacketKind::Look | PacketKind::MoveAndLook => {
                Directions::TO_SERVER
            }
            PacketKind::LoggedIn
            | PacketKind::SpawnPosition
            | PacketKind::MoveAndLookCorrection
            | PacketKind::MoveEntity
            | PacketKind::MoveAndPointEntity
            | PacketKind::TeleportEntity => Directions::TO_CLIENT,
            PacketKind::KeepAlive
            | PacketKind::ChatMessage
            | PacketKind::Disconnect
            | PacketKind::Unknown(_) => Directions::BOTH,
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketKind::Unknown(id) => write!(f, "Unknown(0x{id:02X})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A packet in flight between the two endpoints of a connection pair.
///
/// Suppressing a message tells the transport to drop it instead of
/// forwarding it to the other side. Suppression is sticky: nothing in the
/// core ever un-suppresses a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub packet: Packet,
    direction: Direction,
    suppressed: bool,
}

impl Message {
    pub fn new(packet: Packet, direction: Direction) -> Self {
        Self {
            packet,
            direction,
            suppressed: false,
        }
    }

    pub fn to_client(packet: Packet) -> Self {
        Self::new(packet, Direction::ToClient)
    }

    pub fn to_server(packet: Packet) -> Self {
        Self::new(packet, Direction::ToServer)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn kind(&self) -> PacketKind {
        self.packet.kind()
    }

    /// Marks the message so the transport drops it.
    pub fn suppress(&mut self) {
        self.suppressed = true;
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn into_packet(self) -> Packet {
        self.packet
    }
}
