//! Signal handling for the long-running loops
//!
//! The job monitor and the cluster watch run until their own stop condition
//! fires or the process is interrupted. Interrupts are cooperative: loops
//! check a [`ShutdownListener`] between iterations and while sleeping, never
//! in the middle of an HTTP call.
//!
//! | Signal | Trigger |
//! |--------|---------|
//! | SIGINT | Ctrl+C |
//! | SIGTERM | kill, Kubernetes, Docker |
//! | SIGHUP | Terminal hangup |
//! | SIGQUIT | Ctrl+\ |

use log::{info, warn};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// The type of shutdown signal received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT - User interrupt (Ctrl+C)
    Interrupt,
    /// SIGTERM - Termination request (kill, Kubernetes, Docker)
    Terminate,
    /// SIGHUP - Terminal hangup
    Hangup,
    /// SIGQUIT - Quit (Ctrl+\)
    Quit,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "SIGINT (Ctrl+C)"),
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
            ShutdownSignal::Hangup => write!(f, "SIGHUP"),
            ShutdownSignal::Quit => write!(f, "SIGQUIT"),
        }
    }
}

/// Wait for any shutdown signal (SIGINT, SIGTERM, SIGHUP, SIGQUIT)
///
/// Falls back to Ctrl+C only when the unix handlers cannot be installed.
#[cfg(unix)]
pub async fn shutdown_signal() -> ShutdownSignal {
    use tokio::signal::unix::{SignalKind, signal};

    let handlers = (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
        signal(SignalKind::hangup()),
        signal(SignalKind::quit()),
    );

    let (Ok(mut sigterm), Ok(mut sigint), Ok(mut sighup), Ok(mut sigquit)) = handlers else {
        warn!("Failed to install unix signal handlers, listening for Ctrl+C only");
        return ctrl_c().await;
    };

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM - stopping");
            ShutdownSignal::Terminate
        }
        _ = sigint.recv() => {
            info!("Received SIGINT (Ctrl+C) - stopping");
            ShutdownSignal::Interrupt
        }
        _ = sighup.recv() => {
            info!("Received SIGHUP - stopping");
            ShutdownSignal::Hangup
        }
        _ = sigquit.recv() => {
            info!("Received SIGQUIT - stopping");
            ShutdownSignal::Quit
        }
    }
}

/// Windows-compatible shutdown signal handler (only handles Ctrl+C)
#[cfg(not(unix))]
pub async fn shutdown_signal() -> ShutdownSignal {
    ctrl_c().await
}

async fn ctrl_c() -> ShutdownSignal {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        // Without a handler the process can only be killed; never report a signal.
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C - stopping");
    ShutdownSignal::Interrupt
}

/// Broadcasts one shutdown signal to every loop that subscribed
///
/// A trigger is sticky: listeners created after the trigger still observe it.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    sender: broadcast::Sender<ShutdownSignal>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a listener that will be notified when shutdown is triggered
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
            triggered: Arc::clone(&self.triggered),
        }
    }

    /// Trigger a shutdown with the given signal
    pub fn trigger(&self, signal: ShutdownSignal) {
        self.triggered.store(true, Ordering::SeqCst);
        if self.sender.send(signal).is_err() {
            warn!("No shutdown listeners registered for {}", signal);
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Wait for an OS signal and then broadcast it to all subscribers
    ///
    /// Typically spawned as a background task next to the monitor loop.
    pub async fn wait_for_signal(&self) {
        let signal = shutdown_signal().await;
        self.trigger(signal);
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side handed to long-running loops
pub struct ShutdownListener {
    receiver: broadcast::Receiver<ShutdownSignal>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownListener {
    /// Non-blocking check, used between loop iterations
    pub fn is_triggered(&mut self) -> bool {
        // Drain so a later `wait` does not fire on an already-seen signal.
        while self.receiver.try_recv().is_ok() {}
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolve when shutdown is triggered; pends forever if it never is
    pub async fn wait(&mut self) {
        if self.triggered.load(Ordering::SeqCst) {
            return;
        }
        loop {
            match self.receiver.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => return,
                Err(broadcast::error::RecvError::Closed) => {
                    std::future::pending::<()>().await;
                }
            }
        }
    }
}
