//! Background watchdog for the node link.
//!
//! A spawned task that, once per probe interval, health-checks an
//! established connection, demotes it when the probe fails, and dials
//! again whenever the link is down. Reconnects run through the same
//! [`ConnectionManager::reconnect`] entry point as manual triggers, so
//! the single-attempt guarantee holds across both. The task runs until
//! told to stop; a dead upstream never ends it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::manager::{ConnectionManager, ConnectionState};

#[derive(Debug)]
enum Command {
    Shutdown,
}

struct SharedState {
    running: AtomicBool,
}

/// Handle to the spawned watch loop.
pub struct Supervisor {
    command_tx: mpsc::UnboundedSender<Command>,
    state: Arc<SharedState>,
}

impl Supervisor {
    /// Spawn the watch loop on the current runtime, ticking at the
    /// manager's configured probe interval.
    pub fn spawn(manager: Arc<ConnectionManager>) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let state = Arc::new(SharedState { running: AtomicBool::new(true) });

        let state_clone = Arc::clone(&state);
        tokio::spawn(async move {
            watch_loop(manager, command_rx, state_clone).await;
        });

        Self { command_tx, state }
    }

    /// Ask the watch loop to stop. Honored at its next wakeup.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(Command::Shutdown);
    }

    /// Whether the watch loop is still alive.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Relaxed)
    }
}

async fn watch_loop(
    manager: Arc<ConnectionManager>,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    state: Arc<SharedState>,
) {
    let interval = manager.config().probe_interval;
    info!(interval = ?interval, "supervisor started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; the embedder already made
    // its startup connect attempt, so consume it and start the cadence.
    ticker.tick().await;

    loop {
        tokio::select! {
            cmd = command_rx.recv() => {
                match cmd {
                    Some(Command::Shutdown) | None => {
                        info!("supervisor stopped");
                        state.running.store(false, Ordering::Relaxed);
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                check(&manager).await;
            }
        }
    }
}

/// One supervisor pass over the link.
async fn check(manager: &ConnectionManager) {
    match manager.state() {
        ConnectionState::Connected => {
            if manager.is_healthy().await {
                debug!("health probe ok");
            } else {
                manager.mark_disconnected();
                manager.reconnect().await;
            }
        }
        // An attempt is already in flight; let it finish.
        ConnectionState::Connecting => {}
        ConnectionState::Disconnected => {
            manager.reconnect().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfig;
    use std::time::Duration;

    fn unreachable_manager(probe_interval: Duration) -> Arc<ConnectionManager> {
        Arc::new(ConnectionManager::new(ChainConfig {
            rpc_endpoint: "http://127.0.0.1:1".to_string(),
            call_timeout: Duration::from_secs(1),
            probe_interval,
            ..ChainConfig::default()
        }))
    }

    async fn wait_until_stopped(supervisor: &Supervisor) {
        for _ in 0..100 {
            if !supervisor.is_running() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("supervisor did not stop");
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let supervisor = Supervisor::spawn(unreachable_manager(Duration::from_secs(60)));
        assert!(supervisor.is_running());
        supervisor.shutdown();
        wait_until_stopped(&supervisor).await;
    }

    #[tokio::test]
    async fn dropping_the_handle_stops_the_loop() {
        let manager = unreachable_manager(Duration::from_secs(60));
        let supervisor = Supervisor::spawn(manager);
        let state = Arc::clone(&supervisor.state);
        drop(supervisor);
        for _ in 0..100 {
            if !state.running.load(Ordering::Relaxed) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("watch loop survived its handle");
    }

    #[tokio::test]
    async fn failed_attempts_leave_the_link_down_and_the_loop_alive() {
        let manager = unreachable_manager(Duration::from_millis(20));
        let supervisor = Supervisor::spawn(Arc::clone(&manager));
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(supervisor.is_running());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        supervisor.shutdown();
        wait_until_stopped(&supervisor).await;
    }
}
