//! Connection lifecycle for the node link.
//!
//! One [`ConnectionManager`] instance owns the [`ChainHandle`] and its
//! [`ConnectionState`] for the whole process. Connect attempts are
//! serialized behind an async gate so at most one is ever in flight;
//! readers grab the current handle by value and never hold a lock
//! across a network round-trip. Constructed explicitly and injected
//! into the dispatcher and supervisor, so tests can run independent
//! managers side by side.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ChainConfig;
use crate::error::ChainError;
use crate::rpc::ChainHandle;

const DISCONNECTED: u8 = 0;
const CONNECTING: u8 = 1;
const CONNECTED: u8 = 2;

/// Where the node link currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            CONNECTING => ConnectionState::Connecting,
            CONNECTED => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => DISCONNECTED,
            ConnectionState::Connecting => CONNECTING,
            ConnectionState::Connected => CONNECTED,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// Owner of the single long-lived node connection.
pub struct ConnectionManager {
    config: ChainConfig,
    state: AtomicU8,
    handle: RwLock<Option<Arc<ChainHandle>>>,
    /// Serializes connect/disconnect; never held across a caller's RPC.
    gate: Mutex<()>,
}

impl ConnectionManager {
    pub fn new(config: ChainConfig) -> Self {
        Self {
            config,
            state: AtomicU8::new(DISCONNECTED),
            handle: RwLock::new(None),
            gate: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Current handle by value; callers keep their clone for the whole
    /// call even if a reconnect replaces it mid-flight.
    pub fn handle(&self) -> Option<Arc<ChainHandle>> {
        self.handle.read().clone()
    }

    /// Open both protocol clients and install the handle. Errors
    /// propagate; state ends Connected on success, Disconnected on
    /// failure.
    pub async fn connect(&self) -> Result<Arc<ChainHandle>, ChainError> {
        let _gate = self.gate.lock().await;
        if self.state() == ConnectionState::Connected {
            if let Some(handle) = self.handle() {
                return Ok(handle);
            }
        }
        self.dial().await
    }

    /// Connect, absorbing failure into `None`. Callers that arrive while
    /// an attempt is in flight wait for it and adopt its outcome rather
    /// than dialing again.
    pub async fn reconnect(&self) -> Option<Arc<ChainHandle>> {
        let joined_in_flight = self.state() == ConnectionState::Connecting;
        let _gate = self.gate.lock().await;
        if joined_in_flight || self.state() == ConnectionState::Connected {
            return self.handle();
        }
        match self.dial().await {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "reconnect failed; serving synthetic data until the next attempt");
                None
            }
        }
    }

    /// Requires the gate. Installs the new handle before the old one is
    /// released; in-flight calls finish on whichever clone they hold.
    async fn dial(&self) -> Result<Arc<ChainHandle>, ChainError> {
        self.set_state(ConnectionState::Connecting);
        debug!(endpoint = %self.config.rpc_endpoint, "opening node connection");
        match ChainHandle::open(&self.config).await {
            Ok(handle) => {
                let handle = Arc::new(handle);
                *self.handle.write() = Some(handle.clone());
                self.set_state(ConnectionState::Connected);
                info!(
                    endpoint = %self.config.rpc_endpoint,
                    chain_id = %self.config.chain_id,
                    "connected to node"
                );
                Ok(handle)
            }
            Err(e) => {
                self.handle.write().take();
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Best-effort teardown: drops the handle (closing both client
    /// pools once in-flight borrowers finish) and marks the link down.
    pub async fn disconnect(&self) {
        let _gate = self.gate.lock().await;
        let had_handle = self.handle.write().take().is_some();
        self.set_state(ConnectionState::Disconnected);
        if had_handle {
            info!("disconnected from node");
        }
    }

    /// Lightweight status probe through the current handle. Never
    /// mutates state; the supervisor decides what a failure means.
    pub async fn is_healthy(&self) -> bool {
        match self.handle() {
            Some(handle) => match handle.status.status().await {
                Ok(_) => true,
                Err(e) => {
                    debug!(error = %e, "health probe failed");
                    false
                }
            },
            None => false,
        }
    }

    /// Record a failed health probe: demote Connected to Disconnected.
    /// A Connecting state is left alone; the attempt owns it.
    pub fn mark_disconnected(&self) {
        let flipped = self
            .state
            .compare_exchange(CONNECTED, DISCONNECTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if flipped {
            warn!("node connection lost");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn unreachable_manager() -> ConnectionManager {
        ConnectionManager::new(ChainConfig {
            rpc_endpoint: "http://127.0.0.1:1".to_string(),
            call_timeout: Duration::from_secs(2),
            ..ChainConfig::default()
        })
    }

    // --- state word ---

    #[test]
    fn starts_disconnected_without_a_handle() {
        let manager = unreachable_manager();
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.handle().is_none());
    }

    #[test]
    fn state_round_trips_through_the_atomic() {
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ] {
            assert_eq!(ConnectionState::from_u8(state.as_u8()), state);
        }
    }

    #[test]
    fn display_matches_wire_strings() {
        assert_eq!(ConnectionState::Disconnected.to_string(), "disconnected");
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
    }

    #[test]
    fn mark_disconnected_only_demotes_connected() {
        let manager = unreachable_manager();
        manager.set_state(ConnectionState::Connected);
        manager.mark_disconnected();
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        manager.set_state(ConnectionState::Connecting);
        manager.mark_disconnected();
        assert_eq!(manager.state(), ConnectionState::Connecting);
    }

    // --- lifecycle against a dead endpoint ---

    #[tokio::test]
    async fn connect_failure_propagates_and_resets_state() {
        let manager = unreachable_manager();
        let err = manager.connect().await.err().unwrap();
        assert!(matches!(err, ChainError::Connection(_)), "got {err}");
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.handle().is_none());
    }

    #[tokio::test]
    async fn reconnect_failure_is_absorbed() {
        let manager = unreachable_manager();
        assert!(manager.reconnect().await.is_none());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn disconnect_without_a_connection_is_a_no_op() {
        let manager = unreachable_manager();
        manager.disconnect().await;
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn health_probe_without_a_handle_is_false() {
        let manager = unreachable_manager();
        assert!(!manager.is_healthy().await);
    }
}
