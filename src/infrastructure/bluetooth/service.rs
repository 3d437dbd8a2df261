//! Discovery Service Module
//!
//! Main service that coordinates scanning, registry draining and the
//! per-peer sessions of each discovery cycle.

use crate::domain::models::AdvertisementEvent;
use crate::domain::registry::DiscoveryRegistry;
use crate::domain::settings::Settings;
use crate::infrastructure::bluetooth::connection::{SessionConfig, SessionController};
use crate::infrastructure::bluetooth::error::{BleError, Result};
use crate::infrastructure::bluetooth::outcome::SessionOutcome;
use crate::infrastructure::bluetooth::transport::BleTransport;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

/// Configuration for the discovery loop
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Substring the advertised name must contain
    pub name_marker: String,
    /// Quiet period without a new peer that ends a scan once something
    /// was found
    pub scan_idle: Duration,
    /// Hard cap on the scan, counted from the first registered peer
    pub scan_limit: Duration,
    /// Pause before retrying after a failed scan
    pub rescan_delay: Duration,
    pub session: SessionConfig,
}

impl From<&Settings> for DiscoveryConfig {
    fn from(s: &Settings) -> Self {
        Self {
            name_marker: s.name_marker.clone(),
            scan_idle: Duration::from_millis(s.scan_idle_ms),
            scan_limit: Duration::from_millis(s.scan_limit_ms),
            rescan_delay: Duration::from_millis(s.rescan_delay_ms),
            session: SessionConfig {
                acquisition_mode: s.acquisition_mode,
                date_decoding: s.date_decoding,
            },
        }
    }
}

/// Owns the transport and the registry for the discovery cycles
pub struct DiscoveryService<T: BleTransport> {
    transport: T,
    registry: DiscoveryRegistry,
    config: DiscoveryConfig,
}

impl<T: BleTransport> DiscoveryService<T> {
    pub fn new(transport: T, config: DiscoveryConfig) -> Self {
        Self {
            registry: DiscoveryRegistry::new(config.name_marker.clone()),
            transport,
            config,
        }
    }

    /// Run discovery cycles forever
    pub async fn run(&mut self) -> anyhow::Result<()> {
        info!(
            "Searching for devices advertising {:?}",
            self.config.name_marker
        );
        loop {
            match self.run_cycle().await {
                Ok(outcomes) => {
                    let complete = outcomes.iter().filter(|o| o.is_complete()).count();
                    info!("Cycle done: {}/{} sessions complete", complete, outcomes.len());
                }
                Err(e) => {
                    error!("Discovery cycle failed: {}", e);
                    tokio::time::sleep(self.config.rescan_delay).await;
                }
            }
        }
    }

    /// One scan, drain, session and clear pass
    pub async fn run_cycle(&mut self) -> Result<Vec<SessionOutcome>> {
        info!("Starting BLE scan");
        info!(">>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>");
        let (sink, mut events) = mpsc::unbounded_channel();
        self.transport.start_scanning(sink).await?;

        let collected = self.collect(&mut events).await;

        // Sessions can't run while the radio is scanning
        info!("<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<");
        info!("Stopping BLE scan");
        if let Err(e) = self.transport.stop_scanning().await {
            self.registry.clear();
            return Err(e);
        }
        // Late senders are refused; only what is already queued is taken
        events.close();
        while let Ok(event) = events.try_recv() {
            self.registry.on_advertisement(&event);
        }
        collected?;

        let peers = self.registry.drain();
        info!("Devices found = {}", peers.len());

        let controller = SessionController::new(&self.transport, self.config.session);
        let mut outcomes = Vec::with_capacity(peers.len());
        for peer in &peers {
            let outcome = controller.run_session(peer).await;
            outcome.log_summary();
            outcomes.push(outcome);
        }
        info!("---------------------------------------");

        self.registry.clear();
        Ok(outcomes)
    }

    /// Feed advertisements into the registry until no new peer has shown up
    /// for `scan_idle`, or `scan_limit` has passed since the first one.
    ///
    /// Repeats from known peers and filtered-out names never move the
    /// deadline, so a busy radio neighbourhood still ends the scan.
    async fn collect(&mut self, events: &mut mpsc::UnboundedReceiver<AdvertisementEvent>) -> Result<()> {
        let mut deadline: Option<Instant> = None;
        let mut limit: Option<Instant> = None;
        loop {
            let wait = deadline.unwrap_or_else(|| Instant::now() + self.config.scan_idle);
            match timeout_at(wait, events.recv()).await {
                Ok(Some(event)) => {
                    if self.registry.on_advertisement(&event) {
                        let now = Instant::now();
                        let limit = *limit.get_or_insert(now + self.config.scan_limit);
                        deadline = Some((now + self.config.scan_idle).min(limit));
                    }
                }
                Ok(None) => {
                    if self.registry.is_empty() {
                        return Err(BleError::TransportUnavailable(
                            "advertisement stream closed".to_string(),
                        ));
                    }
                    warn!("Advertisement stream closed early");
                    return Ok(());
                }
                Err(_) => {
                    if !self.registry.is_empty() {
                        return Ok(());
                    }
                    debug!("No devices found yet, still scanning");
                }
            }
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }
}
