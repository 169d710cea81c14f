//! The example extension loaded as a real shared library.
//!
//! These tests look for the `plugin_example` library that cargo builds next
//! to the test binary. When it is not there (for instance under a
//! cross-compiling runner) they pass without checking anything.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tracing_subscriber::fmt::MakeWriter;
use wrapper_core::plugin_system::{DynamicLibrarySource, ModuleLoader};
use wrapper_core::wrapper_api::{Endpoint, Message, Packet, Player};
use wrapper_core::{Dispatcher, MemoryEndpoint, Verdict};

/// Newest `plugin_example` library in the profile directory or its `deps`.
fn example_library() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let deps = exe.parent()?;
    let profile = deps.parent()?;
    let prefix = format!("{}plugin_example", std::env::consts::DLL_PREFIX);

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for dir in [profile, deps] {
        let Ok(entries) = std::fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(&prefix) || !name.ends_with(std::env::consts::DLL_SUFFIX) {
                continue;
            }
            let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            if newest.as_ref().map_or(true, |(time, _)| modified > *time) {
                newest = Some((modified, entry.path()));
            }
        }
    }

    if newest.is_none() {
        eprintln!("skipping: no plugin_example library next to {}", exe.display());
    }
    newest.map(|(_, path)| path)
}

fn dynamic_dispatcher(library: &Path) -> Dispatcher {
    let directory = library.parent().unwrap_or(Path::new("."));
    let module = library.to_string_lossy().to_string();

    let mut dispatcher = Dispatcher::new(ModuleLoader::new(DynamicLibrarySource::new(directory)));
    dispatcher.load_commands(&module).unwrap();
    dispatcher.load_handlers(&module).unwrap();
    dispatcher
}

fn chat(dispatcher: &mut Dispatcher, client: &Arc<dyn Endpoint>, text: &str) -> Verdict {
    let mut message = Message::to_server(Packet::chat(text));
    dispatcher.handle_packet(client, &mut message).unwrap()
}

#[test]
fn test_commands_survive_reload_while_snapshot_held() {
    let Some(library) = example_library() else {
        return;
    };
    let mut dispatcher = dynamic_dispatcher(&library);
    let (client, _server) = MemoryEndpoint::typed_pair();
    let endpoint: Arc<dyn Endpoint> = client.clone();
    let whoami = Packet::chat("§7Unknown (not logged in)");

    assert_eq!(chat(&mut dispatcher, &endpoint, "/whoami"), Verdict::Suppress);
    assert_eq!(client.drain(), vec![whoami.clone()]);

    let snapshot = dispatcher.commands().clone();
    assert_eq!(chat(&mut dispatcher, &endpoint, "/reload"), Verdict::Suppress);
    assert!(client.drain().is_empty(), "reload reported a failure");
    assert!(!Arc::ptr_eq(&snapshot, dispatcher.commands()));
    assert_eq!(snapshot.len(), dispatcher.commands().len());

    // the superseded registry still runs code from the library it was built from
    let command = snapshot.get("whoami").unwrap();
    let mut player = Player::new(endpoint.clone());
    let mut message = Message::to_server(Packet::chat("/whoami"));
    command(&mut player, &mut message, &[]).unwrap();
    assert_eq!(client.drain(), vec![whoami.clone()]);

    drop(snapshot);
    assert_eq!(chat(&mut dispatcher, &endpoint, "/whoami"), Verdict::Suppress);
    assert_eq!(client.drain(), vec![whoami]);
    assert_eq!(dispatcher.stats().commands, 5);
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Captured {
    type Writer = Captured;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn test_library_logs_reach_host_subscriber() {
    let Some(library) = example_library() else {
        return;
    };
    let captured = Captured::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(captured.clone())
        .with_ansi(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let mut dispatcher = dynamic_dispatcher(&library);
        let (client, server) = MemoryEndpoint::pair();

        let mut login = Message::to_server(Packet::LogIn {
            protocol_version: 14,
            username: "Alice".to_string(),
        });
        dispatcher.handle_packet(&client, &mut login).unwrap();
        let mut logged_in = Message::to_client(Packet::LoggedIn {
            player_id: 42,
            map_seed: 0,
            dimension: 0,
        });
        dispatcher.handle_packet(&server, &mut logged_in).unwrap();
    });

    assert!(
        captured.contents().contains("Alice joined as entity 42"),
        "{}",
        captured.contents()
    );
}
