//! Process signals: termination ends the wrapper, `SIGHUP` reloads its
//! extension modules.

use tokio::signal;
use tracing::info;

/// Resolves when a termination signal arrives (SIGINT or SIGTERM on Unix,
/// Ctrl+C on Windows).
pub async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT"),
            _ = sigterm.recv() => info!("Received SIGTERM"),
        }
    }

    #[cfg(windows)]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

/// Stream of reload requests.
pub struct ReloadSignal {
    #[cfg(unix)]
    inner: signal::unix::Signal,
}

impl ReloadSignal {
    pub fn new() -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            use signal::unix::{signal, SignalKind};
            Ok(Self {
                inner: signal(SignalKind::hangup())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Waits for the next `SIGHUP`. Never resolves on platforms without one.
    pub async fn recv(&mut self) {
        #[cfg(unix)]
        {
            if self.inner.recv().await.is_some() {
                info!("Received SIGHUP");
                return;
            }
        }
        std::future::pending::<()>().await
    }
}
