//! BLE Transport Interface
//!
//! Capability interface the protocol code consumes. Platform backends
//! implement [`BleTransport`]; the session controller and discovery service
//! are written against it only.

use crate::domain::models::{AdvertisementEvent, PeerAddress};
use crate::infrastructure::bluetooth::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Channel end the transport pushes received advertisements into
pub type AdvertisementSink = mpsc::UnboundedSender<AdvertisementEvent>;

/// Communication status reported by the peer for an attribute operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattStatus {
    Success,
    Unreachable,
    ProtocolError,
    AccessDenied,
}

/// Requested delivery mode for attribute writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOption {
    /// Wait for the peer to acknowledge the write
    WithResponse,
    WithoutResponse,
}

/// A service or characteristic handle exposed by the transport
pub trait GattItem {
    fn uuid(&self) -> Uuid;
}

#[async_trait(?Send)]
pub trait BleTransport {
    /// Connected peer handle, released through [`BleTransport::close_session`]
    type Session;
    /// Attribute group (GATT service)
    type Group: GattItem;
    /// Attribute (GATT characteristic)
    type Attribute: GattItem;

    /// Start delivering advertisements into `sink` until stopped
    async fn start_scanning(&mut self, sink: AdvertisementSink) -> Result<()>;

    async fn stop_scanning(&mut self) -> Result<()>;

    async fn open_session(&self, address: PeerAddress) -> Result<Self::Session>;

    async fn close_session(&self, session: Self::Session) -> Result<()>;

    async fn attribute_groups(&self, session: &Self::Session) -> Result<Vec<Self::Group>>;

    async fn attributes(&self, group: &Self::Group) -> Result<Vec<Self::Attribute>>;

    async fn read_attribute(&self, attribute: &Self::Attribute) -> Result<Vec<u8>>;

    /// Write `payload` to `attribute`. With [`WriteOption::WithResponse`] this
    /// does not return before the peer acknowledged or the transport failed.
    async fn write_attribute(
        &self,
        attribute: &Self::Attribute,
        payload: &[u8],
        option: WriteOption,
    ) -> Result<GattStatus>;
}
