//! Discovery filter and registry
//!
//! Accepts advertisements whose local name carries the device family marker
//! and keeps one entry per raw address for the current discovery cycle.

use crate::domain::models::{AdvertisementEvent, DiscoveredPeer};
use std::collections::HashSet;
use tracing::{debug, info};

pub struct DiscoveryRegistry {
    name_marker: String,
    seen: HashSet<u64>,
    peers: Vec<DiscoveredPeer>,
}

impl DiscoveryRegistry {
    pub fn new(name_marker: impl Into<String>) -> Self {
        Self {
            name_marker: name_marker.into(),
            seen: HashSet::new(),
            peers: Vec::new(),
        }
    }

    /// Check the advertised name for the device family marker
    pub fn accepts(&self, event: &AdvertisementEvent) -> bool {
        !event.local_name.is_empty() && event.local_name.contains(&self.name_marker)
    }

    /// Register the advertiser if it matches and is new.
    ///
    /// Returns true when a new peer was added. The first accepted
    /// advertisement for an address wins; later ones are ignored.
    pub fn on_advertisement(&mut self, event: &AdvertisementEvent) -> bool {
        if !self.accepts(event) {
            return false;
        }
        if !self.seen.insert(event.address.raw) {
            return false;
        }

        info!(
            "Found {} at {} ({:?})",
            event.local_name, event.address, event.address.kind
        );
        debug!("Advertisement type: {:?}", event.kind);

        self.peers.push(DiscoveredPeer {
            address: event.address,
            local_name: event.local_name.clone(),
        });
        true
    }

    /// Take every registered peer, in first-seen order
    pub fn drain(&mut self) -> Vec<DiscoveredPeer> {
        self.seen.clear();
        std::mem::take(&mut self.peers)
    }

    pub fn clear(&mut self) {
        self.seen.clear();
        self.peers.clear();
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
