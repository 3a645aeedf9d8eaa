// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Termination signals.
//!
//! Process interrupt and terminate are the only unsolicited shutdown
//! triggers. Their identity is preserved all the way to `wait`.

use std::fmt;

use tracing::{info, warn};

/// OS signal that ends the waiting phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl Signal {
    /// POSIX signal number.
    pub fn number(self) -> i32 {
        match self {
            Signal::Interrupt => 2,
            Signal::Terminate => 15,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Interrupt => write!(f, "interrupt"),
            Signal::Terminate => write!(f, "terminated"),
        }
    }
}

/// What ended the waiting phase of the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationCause {
    /// An OS termination signal arrived.
    Signal(Signal),
    /// The backend shut itself down.
    Shutdown {
        /// Exit code requested by whoever triggered the shutdown.
        exit_code: i32,
    },
}

impl From<Signal> for TerminationCause {
    fn from(signal: Signal) -> Self {
        TerminationCause::Signal(signal)
    }
}

/// Resolves on the first interrupt or terminate signal delivered to the process.
#[cfg(unix)]
pub async fn wait_for_signal() -> Signal {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = match signal(SignalKind::interrupt()) {
        Ok(stream) => Some(stream),
        Err(e) => {
            warn!(error = %e, "Failed to install SIGINT handler");
            None
        }
    };
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => Some(stream),
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            None
        }
    };

    let received = tokio::select! {
        Some(_) = recv(interrupt.as_mut()) => Signal::Interrupt,
        Some(_) = recv(terminate.as_mut()) => Signal::Terminate,
        else => std::future::pending::<Signal>().await,
    };
    info!(signal = %received, "Received termination signal");
    received
}

#[cfg(unix)]
async fn recv(stream: Option<&mut tokio::signal::unix::Signal>) -> Option<()> {
    match stream {
        Some(stream) => stream.recv().await,
        None => std::future::pending().await,
    }
}

/// Resolves on Ctrl-C.
#[cfg(not(unix))]
pub async fn wait_for_signal() -> Signal {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!(signal = %Signal::Interrupt, "Received termination signal");
    Signal::Interrupt
}
