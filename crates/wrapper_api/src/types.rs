//! # Core Type Definitions
//!
//! Small value types used throughout the wrapper: connection identifiers,
//! positions and the direction a packet travels in.
//!
//! ## Key Types
//!
//! - [`ConnectionId`] - Identity of a proxied connection pair
//! - [`Position`] - 3D position with double precision
//! - [`Direction`] - Which endpoint a packet is heading towards
//! - [`Directions`] - A set of directions, used when registering handlers
//! - [`Side`] - Which side of a connection pair an endpoint faces

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;
use uuid::Uuid;

/// Unique identifier for a proxied connection pair.
///
/// Both endpoints of a pair report the same id, which makes it the natural
/// key for per-player state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Creates a new random connection id using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Represents a 3D position in the game world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate (east-west axis)
    pub x: f64,
    /// Y coordinate (vertical axis)
    pub y: f64,
    /// Z coordinate (north-south axis)
    pub z: f64,
}

impl Position {
    /// Creates a new position with the specified coordinates.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl AddAssign for Position {
    fn add_assign(&mut self, delta: Position) {
        self.x += delta.x;
        self.y += delta.y;
        self.z += delta.z;
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// The endpoint a packet is travelling towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Sent by the server, heading to the client
    ToClient,
    /// Sent by the client, heading to the server
    ToServer,
}

impl Direction {
    /// Both directions, in a stable order.
    pub const ALL: [Direction; 2] = [Direction::ToClient, Direction::ToServer];

    /// Returns the opposite direction.
    pub fn reverse(self) -> Self {
        match self {
            Direction::ToClient => Direction::ToServer,
            Direction::ToServer => Direction::ToClient,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ToClient => f.write_str("to_client"),
            Direction::ToServer => f.write_str("to_server"),
        }
    }
}

/// A set of [`Direction`]s.
///
/// Packet kinds declare the directions they can travel in, and handler
/// registrations may name a subset of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Directions {
    to_client: bool,
    to_server: bool,
}

impl Directions {
    pub const NONE: Directions = Directions { to_client: false, to_server: false };
    pub const TO_CLIENT: Directions = Directions { to_client: true, to_server: false };
    pub const TO_SERVER: Directions = Directions { to_client: false, to_server: true };
    pub const BOTH: Directions = Directions { to_client: true, to_server: true };

    pub fn contains(self, direction: Direction) -> bool {
        match direction {
            Direction::ToClient => self.to_client,
            Direction::ToServer => self.to_server,
        }
    }

    pub fn is_empty(self) -> bool {
        !self.to_client && !self.to_server
    }

    /// Returns `true` if every direction in `self` is also in `other`.
    pub fn is_subset_of(self, other: Directions) -> bool {
        (!self.to_client || other.to_client) && (!self.to_server || other.to_server)
    }

    /// Iterates the contained directions, `ToClient` first.
    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

impl From<Direction> for Directions {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::ToClient => Directions::TO_CLIENT,
            Direction::ToServer => Directions::TO_SERVER,
        }
    }
}

/// The side of a connection pair an endpoint faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Accepted from the game client
    Client,
    /// Opened towards the upstream game server
    Server,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::Client => Side::Server,
            Side::Server => Side::Client,
        }
    }
}
