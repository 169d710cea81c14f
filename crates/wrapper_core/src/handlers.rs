//! Packet handler invocation.

use crate::error::DispatchError;
use tracing::trace;
use wrapper_api::{HandlerRegistry, Message, Player};

/// Runs every handler registered for the message's `(kind, direction)`, in
/// registration order, and returns how many ran.
///
/// Handler errors are not contained: the first failure stops the remaining
/// handlers for this message and is returned to the caller.
pub fn run(
    registry: &HandlerRegistry,
    player: &mut Player,
    message: &mut Message,
) -> Result<usize, DispatchError> {
    let kind = message.kind();
    let direction = message.direction();
    let handlers = registry.handlers_for(kind, direction);

    for handler in handlers {
        handler(player, message).map_err(|source| DispatchError::Handler {
            kind,
            direction,
            source,
        })?;
    }

    if !handlers.is_empty() {
        trace!("Ran {} handlers for {} ({})", handlers.len(), kind, direction);
    }
    Ok(handlers.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEndpoint;
    use std::sync::{Arc, Mutex};
    use wrapper_api::{HandlerError, Packet, PacketKind};

    #[test]
    fn test_handlers_run_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        for id in ["h1", "h2"] {
            let order = order.clone();
            registry
                .on(PacketKind::ChatMessage, move |_player, _message| {
                    order.lock().unwrap().push(id);
                    Ok(())
                })
                .unwrap();
        }

        let (client, _) = MemoryEndpoint::pair();
        let mut player = Player::new(client);
        let mut message = Message::to_client(Packet::chat("hello"));

        assert_eq!(run(&registry, &mut player, &mut message).unwrap(), 2);
        assert_eq!(*order.lock().unwrap(), vec!["h1", "h2"]);
    }

    #[test]
    fn test_no_handlers_is_a_no_op() {
        let registry = HandlerRegistry::new();
        let (client, _) = MemoryEndpoint::pair();
        let mut player = Player::new(client);
        let mut message = Message::to_server(Packet::KeepAlive);
        assert_eq!(run(&registry, &mut player, &mut message).unwrap(), 0);
        assert!(!message.is_suppressed());
    }

    #[test]
    fn test_error_stops_later_handlers() {
        let calls = Arc::new(Mutex::new(0));
        let mut registry = HandlerRegistry::new();
        registry
            .on(PacketKind::KeepAlive, |_player, _message| {
                Err(HandlerError::Failed("bad state".to_string()))
            })
            .unwrap();
        let counter = calls.clone();
        registry
            .on(PacketKind::KeepAlive, move |_player, _message| {
                *counter.lock().unwrap() += 1;
                Ok(())
            })
            .unwrap();

        let (client, _) = MemoryEndpoint::pair();
        let mut player = Player::new(client);
        let mut message = Message::to_client(Packet::KeepAlive);

        let err = run(&registry, &mut player, &mut message).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Handler {
                kind: PacketKind::KeepAlive,
                ..
            }
        ));
        assert_eq!(*calls.lock().unwrap(), 0);
    }
}
