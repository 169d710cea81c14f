//! Wrapper entry point.
//!
//! Loads configuration, sets up logging, builds the dispatcher with its
//! extension modules and keeps it alive for the transport that embeds it.
//! This binary opens no sockets itself. `SIGHUP` reloads the modules;
//! `SIGINT`/`SIGTERM` shut the wrapper down.

mod cli;
mod config;
mod logging;
mod signals;

use anyhow::{anyhow, Context};
use cli::CliArgs;
use config::{AppConfig, SourceKind};
use plugin_example::ExampleExtension;
use plugin_system::{DynamicLibrarySource, ModuleLoader, ModuleSource, StaticModuleSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use wrapper_core::Dispatcher;

// ============================================================================
// Application
// ============================================================================

pub struct Application {
    config: AppConfig,
    dispatcher: Arc<Mutex<Dispatcher>>,
}

impl Application {
    /// Builds the dispatcher and loads the configured modules. A module that
    /// fails to load at startup is fatal.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let source = module_source(&config);
        info!("Extension modules: {}", source.describe());
        let mut dispatcher = Dispatcher::new(ModuleLoader::from_boxed(source));

        if let Some(module) = &config.modules.commands {
            dispatcher
                .load_commands(module)
                .with_context(|| format!("Failed to load command module {module}"))?;
        }
        if let Some(module) = &config.modules.handlers {
            dispatcher
                .load_handlers(module)
                .with_context(|| format!("Failed to load handler module {module}"))?;
        }

        Ok(Self {
            config,
            dispatcher: Arc::new(Mutex::new(dispatcher)),
        })
    }

    /// Runs until a shutdown signal, reloading on `SIGHUP`.
    pub async fn run(self) -> anyhow::Result<()> {
        let monitor = match self.config.dispatcher.stats_interval_secs {
            0 => None,
            secs => Some(tokio::spawn(report_stats(
                self.dispatcher.clone(),
                Duration::from_secs(secs),
            ))),
        };

        let mut reload = signals::ReloadSignal::new()?;
        let shutdown = signals::shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = &mut shutdown => {
                    result?;
                    break;
                }
                _ = reload.recv() => {
                    let mut dispatcher = self.dispatcher.lock().await;
                    if let Err(e) = dispatcher.reload() {
                        warn!("Reload incomplete: {}", e);
                    }
                }
            }
        }

        info!("Shutting down");
        if let Some(handle) = monitor {
            handle.abort();
        }
        let stats = self.dispatcher.lock().await.stats();
        info!(
            "Dispatched {} packets ({} suppressed) for {} players",
            stats.packets_dispatched, stats.packets_suppressed, stats.players
        );
        Ok(())
    }
}

fn module_source(config: &AppConfig) -> Box<dyn ModuleSource> {
    match config.modules.source {
        SourceKind::Dynamic => Box::new(DynamicLibrarySource::new(&config.modules.directory)),
        SourceKind::Static => Box::new(
            StaticModuleSource::new()
                .with("plugin_example", || Box::new(ExampleExtension::new())),
        ),
    }
}

async fn report_stats(dispatcher: Arc<Mutex<Dispatcher>>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await;
    let mut last_dispatched = 0;

    loop {
        interval.tick().await;
        let stats = dispatcher.lock().await.stats();
        info!(
            "{} players | {} packets this period | {} commands | {} handlers",
            stats.players,
            stats.packets_dispatched - last_dispatched,
            stats.commands,
            stats.handlers
        );
        last_dispatched = stats.packets_dispatched;
    }
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let mut config = AppConfig::load_from_file(&args.config_path).await?;
    config.apply_overrides(&args);
    config
        .validate()
        .map_err(|e| anyhow!("Configuration validation failed: {e}"))?;

    logging::setup_logging(&config.logging)?;
    info!("wrapper v{}", env!("CARGO_PKG_VERSION"));

    let app = Application::new(config).inspect_err(|e| error!("{:#}", e))?;
    app.run().await
}
