use serde::{Deserialize, Serialize};
use std::fmt;

/// Bluetooth address type reported alongside an advertisement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressType {
    Public,
    Random,
    Unspecified,
}

/// 48-bit peer address plus its type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerAddress {
    pub raw: u64,
    pub kind: AddressType,
}

impl PeerAddress {
    pub fn new(raw: u64, kind: AddressType) -> Self {
        Self {
            raw: raw & 0xFFFF_FFFF_FFFF,
            kind,
        }
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.raw.to_be_bytes();
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}

/// Kind of advertising PDU that carried an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisementKind {
    ConnectableUndirected,
    ConnectableDirected,
    ScannableUndirected,
    NonConnectableUndirected,
    ScanResponse,
    Extended,
}

/// A single advertisement as delivered by the transport
#[derive(Debug, Clone)]
pub struct AdvertisementEvent {
    pub address: PeerAddress,
    pub local_name: String,
    pub kind: AdvertisementKind,
}

/// A peer accepted by the discovery filter, waiting for a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPeer {
    pub address: PeerAddress,
    pub local_name: String,
}

/// Vendor battery properties register
///
/// ```text
/// [0-1] : Capacity (u16, mAh)
/// [2-3] : Level (u16, per mille)
/// [4-5] : Voltage (u16, mV)
/// [6-7] : Current (i16, mA)
/// [8-9] : Temperature (i16, 0.1 °C)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatteryRecord {
    pub capacity_mah: u16,
    pub level_per_mille: u16,
    pub voltage_mv: u16,
    pub current_ma: i16,
    pub temperature_decicelsius: i16,
}

/// Device calendar date register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRecord {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl fmt::Display for DateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.year, self.month, self.day)
    }
}

/// Which start frame the command sequence opens with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMode {
    #[default]
    Data,
    Impedance,
}

/// How the date register is assembled from the bytes read in a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateDecoding {
    /// Decode only from the date attribute's own buffer
    #[default]
    Strict,
    /// Older firmware tooling layout: year high byte from the date buffer,
    /// year low byte, month and day from the battery buffer
    LegacyBatteryOverlay,
}
