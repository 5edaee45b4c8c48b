//! Shutdown coordination for the two accept loops
//!
//! The shutdown phase is published on a watch channel. Each listener races
//! `accept()` against "my stop phase was reached", so stopping a loop never
//! needs a connection to itself.
//!
//! Phases only move forward:
//! `Active -> ShutdownRequested -> RequestListenerStopped -> AdminListenerStopped`

use crate::log_admin;
use tokio::sync::watch;
use tracing::Level;

/// Shutdown state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShutdownPhase {
    Active,
    ShutdownRequested,
    RequestListenerStopped,
    AdminListenerStopped,
}

/// Which accept loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Request,
    Admin,
}

impl ListenerKind {
    /// First phase in which this listener must no longer accept
    #[inline]
    pub const fn stop_phase(self) -> ShutdownPhase {
        match self {
            ListenerKind::Request => ShutdownPhase::RequestListenerStopped,
            ListenerKind::Admin => ShutdownPhase::AdminListenerStopped,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ListenerKind::Request => "request",
            ListenerKind::Admin => "admin",
        }
    }
}

impl std::fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owns the shutdown phase and its running flags
#[derive(Debug)]
pub struct ShutdownCoordinator {
    phase: watch::Sender<ShutdownPhase>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(ShutdownPhase::Active);
        Self { phase }
    }

    #[inline]
    pub fn phase(&self) -> ShutdownPhase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ShutdownPhase> {
        self.phase.subscribe()
    }

    /// Running flag of a listener
    #[inline]
    pub fn is_running(&self, kind: ListenerKind) -> bool {
        self.phase() < kind.stop_phase()
    }

    /// Move forward to `to`. Returns false if already there or past it.
    fn advance(&self, to: ShutdownPhase) -> bool {
        let advanced = self.phase.send_if_modified(|phase| {
            if *phase < to {
                *phase = to;
                true
            } else {
                false
            }
        });
        if advanced {
            tracing::info!(target: "shutdown", phase = ?to, "Shutdown phase advanced");
        }
        advanced
    }

    /// Clear one listener's running flag. Returns true for the call that cleared it.
    pub fn stop_listener(&self, kind: ListenerKind) -> bool {
        self.advance(kind.stop_phase())
    }

    /// Full shutdown: request listener first, then admin listener
    ///
    /// Returns false if both listeners had already been stopped.
    pub fn shutdown(&self) -> bool {
        if self.phase() >= ShutdownPhase::AdminListenerStopped {
            log_admin!(Level::DEBUG, "Shutdown already complete");
            return false;
        }

        log_admin!(Level::INFO, "Shutdown requested");
        self.advance(ShutdownPhase::ShutdownRequested);
        self.stop_listener(ListenerKind::Request);
        self.stop_listener(ListenerKind::Admin)
    }

    /// Resolves once `kind` has been told to stop
    pub async fn stopped(&self, kind: ListenerKind) {
        let mut rx = self.phase.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = rx.wait_for(|phase| *phase >= kind.stop_phase()).await;
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_starts_active() {
        let coordinator = ShutdownCoordinator::new();
        assert_eq!(coordinator.phase(), ShutdownPhase::Active);
        assert!(coordinator.is_running(ListenerKind::Request));
        assert!(coordinator.is_running(ListenerKind::Admin));
    }

    #[test]
    fn test_full_shutdown_walks_all_phases() {
        let coordinator = ShutdownCoordinator::new();
        let mut rx = coordinator.subscribe();

        assert!(coordinator.shutdown());
        assert_eq!(coordinator.phase(), ShutdownPhase::AdminListenerStopped);
        assert!(!coordinator.is_running(ListenerKind::Request));
        assert!(!coordinator.is_running(ListenerKind::Admin));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), ShutdownPhase::AdminListenerStopped);

        // Second shutdown is a no-op
        assert!(!coordinator.shutdown());
    }

    #[test]
    fn test_internal_stop_leaves_admin_running() {
        let coordinator = ShutdownCoordinator::new();
        assert!(coordinator.stop_listener(ListenerKind::Request));
        assert!(!coordinator.stop_listener(ListenerKind::Request));
        assert!(!coordinator.is_running(ListenerKind::Request));
        assert!(coordinator.is_running(ListenerKind::Admin));

        // Admin shutdown still finishes the sequence
        assert!(coordinator.shutdown());
        assert!(!coordinator.is_running(ListenerKind::Admin));
    }

    #[test]
    fn test_phases_never_go_backwards() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.stop_listener(ListenerKind::Admin);
        assert!(!coordinator.stop_listener(ListenerKind::Request));
        assert_eq!(coordinator.phase(), ShutdownPhase::AdminListenerStopped);
    }

    #[tokio::test]
    async fn test_stopped_wakes_waiters() {
        let coordinator = std::sync::Arc::new(ShutdownCoordinator::new());

        let waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.stopped(ListenerKind::Admin).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        coordinator.shutdown();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_stopped_returns_immediately_when_already_stopped() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.stop_listener(ListenerKind::Request);
        tokio::time::timeout(Duration::from_millis(100), coordinator.stopped(ListenerKind::Request))
            .await
            .unwrap();
    }
}
