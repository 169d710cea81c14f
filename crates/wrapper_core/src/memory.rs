//! In-memory connection pairs.
//!
//! Lets the dispatcher be driven without sockets: each side's outbound
//! packets collect in a lock-free queue that the embedding code (or a test)
//! drains.

use crossbeam::queue::SegQueue;
use std::fmt;
use std::sync::Arc;
use wrapper_api::{ConnectionId, Endpoint, Packet, Side};

struct PairQueues {
    id: ConnectionId,
    to_client: SegQueue<Packet>,
    to_server: SegQueue<Packet>,
}

/// One side of an in-memory connection pair.
pub struct MemoryEndpoint {
    queues: Arc<PairQueues>,
    side: Side,
}

impl MemoryEndpoint {
    /// Creates a linked pair, returned as `(client-facing, server-facing)`.
    pub fn pair() -> (Arc<dyn Endpoint>, Arc<dyn Endpoint>) {
        let (client, server) = Self::typed_pair();
        (client, server)
    }

    /// Like [`MemoryEndpoint::pair`] but keeps the concrete type, which
    /// gives access to [`drain`](Self::drain).
    pub fn typed_pair() -> (Arc<MemoryEndpoint>, Arc<MemoryEndpoint>) {
        let queues = Arc::new(PairQueues {
            id: ConnectionId::new(),
            to_client: SegQueue::new(),
            to_server: SegQueue::new(),
        });
        let client = Arc::new(MemoryEndpoint {
            queues: queues.clone(),
            side: Side::Client,
        });
        let server = Arc::new(MemoryEndpoint {
            queues,
            side: Side::Server,
        });
        (client, server)
    }

    fn outbound(&self) -> &SegQueue<Packet> {
        match self.side {
            Side::Client => &self.queues.to_client,
            Side::Server => &self.queues.to_server,
        }
    }

    /// Takes every packet queued for this endpoint's remote, oldest first.
    pub fn drain(&self) -> Vec<Packet> {
        let queue = self.outbound();
        let mut packets = Vec::with_capacity(queue.len());
        while let Some(packet) = queue.pop() {
            packets.push(packet);
        }
        packets
    }

    pub fn pending(&self) -> usize {
        self.outbound().len()
    }
}

impl Endpoint for MemoryEndpoint {
    fn connection_id(&self) -> ConnectionId {
        self.queues.id
    }

    fn side(&self) -> Side {
        self.side
    }

    fn other(&self) -> Arc<dyn Endpoint> {
        Arc::new(MemoryEndpoint {
            queues: self.queues.clone(),
            side: self.side.other(),
        })
    }

    fn send(&self, packet: Packet) {
        self.outbound().push(packet);
    }
}

impl fmt::Debug for MemoryEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryEndpoint")
            .field("connection", &self.queues.id)
            .field("side", &self.side)
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_shares_identity() {
        let (client, server) = MemoryEndpoint::typed_pair();
        assert_eq!(client.connection_id(), server.connection_id());
        assert_eq!(client.side(), Side::Client);
        assert_eq!(server.side(), Side::Server);
        assert_eq!(client.other().side(), Side::Server);
        assert_eq!(client.other().connection_id(), client.connection_id());
    }

    #[test]
    fn test_sides_have_separate_queues() {
        let (client, server) = MemoryEndpoint::typed_pair();
        client.send(Packet::chat("to the client"));
        client.other().send(Packet::KeepAlive);
        server.send(Packet::chat("to the server"));

        assert_eq!(client.drain(), vec![Packet::chat("to the client")]);
        assert_eq!(server.drain(), vec![Packet::KeepAlive, Packet::chat("to the server")]);
        assert_eq!(client.pending(), 0);
    }
}
