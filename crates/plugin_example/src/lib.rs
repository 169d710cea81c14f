//! Example wrapper extension.
//!
//! Serves as both the command module and the handler module:
//!
//! - `/where` (`/pos`) - tells the player where the wrapper thinks they are
//! - `/whoami` - username and entity id
//! - `/tp <x> <y> <z>` - moves the player, telling both client and server
//! - `/say <text>` - sends chat to the server on the player's behalf
//!
//! Handlers log logins and disconnects and drop server chat containing a
//! blocked word before it reaches the client.
//!
//! Built as a `cdylib` for dynamic loading and as an `rlib` so the wrapper
//! binary can link it in directly. As a `cdylib` it carries its own copy of
//! `tracing`; [`export_extension!`] exports the hook the loader uses to point
//! that copy at the host's subscriber, so the login and disconnect logs show
//! up either way.

use tracing::{debug, info};
use wrapper_api::{
    export_extension, CommandError, CommandRegistry, Direction, Extension, HandlerRegistry,
    Message, Packet, PacketKind, Player, Position, RegistrationError,
};

/// Height of the player's eyes above their feet.
const STANCE_OFFSET: f64 = 1.62;

pub struct ExampleExtension {
    blocked_words: Vec<String>,
}

impl ExampleExtension {
    pub fn new() -> Self {
        Self::with_blocked_words(["griefer"])
    }

    pub fn with_blocked_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blocked_words: words
                .into_iter()
                .map(|w| w.into().to_lowercase())
                .collect(),
        }
    }
}

impl Default for ExampleExtension {
    fn default() -> Self {
        Self::new()
    }
}

impl Extension for ExampleExtension {
    fn name(&self) -> &str {
        "example"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn register_commands(&self, commands: &mut CommandRegistry) -> Result<(), RegistrationError> {
        commands.register(&["where", "pos"], where_am_i)?;
        commands.register(&["whoami"], who_am_i)?;
        commands.register(&["tp"], teleport)?;
        commands.register(&["say"], say)?;
        Ok(())
    }

    fn register_handlers(&self, handlers: &mut HandlerRegistry) -> Result<(), RegistrationError> {
        handlers.on(PacketKind::LoggedIn, |player, _message| {
            info!("{} joined as entity {}", player.username, player.entity_id);
            Ok(())
        })?;

        handlers.on(PacketKind::Disconnect, |player, message| {
            if let Packet::Disconnect { reason } = &message.packet {
                info!("{} disconnect ({}): {}", player.username, message.direction(), reason);
            }
            Ok(())
        })?;

        let blocked = self.blocked_words.clone();
        handlers.register(
            PacketKind::ChatMessage,
            Some(Direction::ToClient.into()),
            move |player, message| {
                filter_chat(&blocked, player, message);
                Ok(())
            },
        )?;
        Ok(())
    }
}

export_extension!(ExampleExtension);

// ============================================================================
// Commands
// ============================================================================

fn where_am_i(player: &mut Player, _message: &mut Message, _args: &[&str]) -> Result<(), CommandError> {
    player.message(format!("§7You are at {}", player.position));
    Ok(())
}

fn who_am_i(player: &mut Player, _message: &mut Message, _args: &[&str]) -> Result<(), CommandError> {
    let text = if player.has_entity_id() {
        format!("§7{} (entity {})", player.username, player.entity_id)
    } else {
        format!("§7{} (not logged in)", player.username)
    };
    player.message(text);
    Ok(())
}

fn teleport(player: &mut Player, _message: &mut Message, args: &[&str]) -> Result<(), CommandError> {
    let usage = || CommandError::Usage("/tp <x> <y> <z>".to_string());
    let &[x, y, z] = args else {
        return Err(usage());
    };
    let parse = |value: &str| value.parse::<f64>().map_err(|_| usage());
    let target = Position::new(parse(x)?, parse(y)?, parse(z)?);

    debug!("Teleporting {} from {} to {}", player.username, player.position, target);
    player.send(Packet::MoveAndLookCorrection {
        x: target.x,
        stance: target.y + STANCE_OFFSET,
        y: target.y,
        z: target.z,
        yaw: 0.0,
        pitch: 0.0,
        on_ground: false,
    });
    player.inject(Packet::Move {
        x: target.x,
        y: target.y,
        stance: target.y + STANCE_OFFSET,
        z: target.z,
        on_ground: false,
    });
    player.position = target;
    player.message(format!("§7Teleported to {}", target));
    Ok(())
}

fn say(player: &mut Player, _message: &mut Message, args: &[&str]) -> Result<(), CommandError> {
    if args.is_empty() {
        return Err(CommandError::Usage("/say <text>".to_string()));
    }
    player.inject(Packet::chat(args.join(" ")));
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

fn filter_chat(blocked: &[String], player: &Player, message: &mut Message) {
    let Packet::ChatMessage { message: text } = &message.packet else {
        return;
    };
    let lowered = text.to_lowercase();
    if let Some(word) = blocked.iter().find(|w| lowered.contains(w.as_str())) {
        debug!("Dropping chat to {} containing {:?}", player.username, word);
        message.suppress();
    }
}
