//! The transport seam.
//!
//! The proxy owns sockets and the forwarding loop; the core only needs to
//! know which pair an endpoint belongs to, which side it faces, how to reach
//! its peer, and how to queue a packet for its remote end.

use crate::packet::Packet;
use crate::types::{ConnectionId, Side};
use std::fmt;
use std::sync::Arc;

/// One side of a proxied connection pair.
///
/// Calling [`Endpoint::send`] on the client-facing endpoint delivers a
/// packet to the game client; on the server-facing endpoint it delivers the
/// packet to the upstream server.
pub trait Endpoint: Send + Sync + fmt::Debug {
    /// Identity of the pair. Both sides report the same id.
    fn connection_id(&self) -> ConnectionId;

    /// Which side of the pair this endpoint faces.
    fn side(&self) -> Side;

    /// The other side of the same pair.
    fn other(&self) -> Arc<dyn Endpoint>;

    /// Appends a packet to this endpoint's outbound queue.
    fn send(&self, packet: Packet);
}
