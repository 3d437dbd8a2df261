//! In-memory transport used by the unit tests.
//!
//! Serves scripted advertisements and GATT tables, and records every call
//! so tests can assert on ordering and open/close balance.

use crate::domain::models::{AddressType, AdvertisementEvent, AdvertisementKind, PeerAddress};
use crate::infrastructure::bluetooth::error::{BleError, Result};
use crate::infrastructure::bluetooth::protocol::*;
use crate::infrastructure::bluetooth::transport::{
    AdvertisementSink, BleTransport, GattItem, GattStatus, WriteOption,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct MockAttribute {
    pub uuid: Uuid,
    /// `None` makes reads fail with a communication error
    pub value: Option<Vec<u8>>,
    pub write_status: GattStatus,
}

impl MockAttribute {
    pub fn readable(uuid: Uuid, value: &[u8]) -> Self {
        Self {
            uuid,
            value: Some(value.to_vec()),
            write_status: GattStatus::Success,
        }
    }

    pub fn unreadable(uuid: Uuid) -> Self {
        Self {
            uuid,
            value: None,
            write_status: GattStatus::Success,
        }
    }

    pub fn writable(uuid: Uuid, write_status: GattStatus) -> Self {
        Self {
            uuid,
            value: None,
            write_status,
        }
    }
}

impl GattItem for MockAttribute {
    fn uuid(&self) -> Uuid {
        self.uuid
    }
}

#[derive(Debug, Clone)]
pub struct MockGroup {
    pub uuid: Uuid,
    pub attributes: Vec<MockAttribute>,
    /// Listing this group's characteristics fails
    pub fail_listing: bool,
}

impl MockGroup {
    pub fn new(uuid: Uuid, attributes: Vec<MockAttribute>) -> Self {
        Self {
            uuid,
            attributes,
            fail_listing: false,
        }
    }
}

impl GattItem for MockGroup {
    fn uuid(&self) -> Uuid {
        self.uuid
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockPeripheral {
    pub groups: Vec<MockGroup>,
    pub fail_enumeration: bool,
}

pub const NB2_NAME: &[u8] = b"NB2-AMP-000123";
pub const NB2_SERIAL: &[u8] = b"0042";
pub const NB2_BATTERY: [u8; 10] = [0x10, 0x00, 0x64, 0x03, 0xE8, 0x13, 0x05, 0x00, 0x32, 0x01];
pub const NB2_DATE: [u8; 4] = [0xEA, 0x07, 0x0A, 0x11];

impl MockPeripheral {
    /// A healthy amplifier exposing every register the collector reads
    pub fn nb2() -> Self {
        Self {
            groups: vec![
                MockGroup::new(
                    GENERIC_ACCESS_SERVICE,
                    vec![MockAttribute::readable(DEVICE_NAME_CHAR, NB2_NAME)],
                ),
                MockGroup::new(
                    DEVICE_INFORMATION_SERVICE,
                    vec![MockAttribute::readable(SERIAL_NUMBER_CHAR, NB2_SERIAL)],
                ),
                MockGroup::new(
                    BATTERY_SERVICE,
                    vec![MockAttribute::readable(BATTERY_PROPERTIES_CHAR, &NB2_BATTERY)],
                ),
                MockGroup::new(
                    CURRENT_DATE_SERVICE,
                    vec![MockAttribute::readable(DATE_CHAR, &NB2_DATE)],
                ),
                MockGroup::new(
                    CONTROL_SERVICE,
                    vec![MockAttribute::writable(COMMAND_CHAR, GattStatus::Success)],
                ),
            ],
            fail_enumeration: false,
        }
    }

    pub fn without_group(mut self, uuid: Uuid) -> Self {
        self.groups.retain(|g| g.uuid != uuid);
        self
    }

    pub fn with_attribute(mut self, group: Uuid, attribute: MockAttribute) -> Self {
        if let Some(g) = self.groups.iter_mut().find(|g| g.uuid == group) {
            g.attributes.retain(|a| a.uuid != attribute.uuid);
            g.attributes.push(attribute);
        }
        self
    }

    pub fn failing_enumeration(mut self) -> Self {
        self.fail_enumeration = true;
        self
    }

    pub fn failing_listing(mut self, group: Uuid) -> Self {
        if let Some(g) = self.groups.iter_mut().find(|g| g.uuid == group) {
            g.fail_listing = true;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    StartScan,
    StopScan,
    Open(u64),
    Close(u64),
    Write(Uuid),
}

#[derive(Debug, Clone)]
pub struct WriteRecord {
    pub attribute: Uuid,
    pub payload: Vec<u8>,
    pub option: WriteOption,
}

#[derive(Debug)]
pub struct MockSession {
    address: u64,
}

/// Re-send the queued advertisements on a timer, like a live radio
#[derive(Debug, Clone, Copy)]
struct Repeat {
    interval: Duration,
    /// Shift every round to unseen addresses
    fresh: bool,
}

#[derive(Default)]
struct MockState {
    advertisements: Vec<AdvertisementEvent>,
    repeat: Option<Repeat>,
    repeater: Option<JoinHandle<()>>,
    peripherals: HashMap<u64, MockPeripheral>,
    sink: Option<AdvertisementSink>,
    fail_scan: bool,
    /// Results for the next writes, in order; then the attribute's status
    write_results: VecDeque<Result<GattStatus>>,
    calls: Vec<Call>,
    writes: Vec<WriteRecord>,
}

#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

pub fn advertisement(raw: u64, name: &str) -> AdvertisementEvent {
    AdvertisementEvent {
        address: PeerAddress::new(raw, AddressType::Public),
        local_name: name.to_string(),
        kind: AdvertisementKind::ConnectableUndirected,
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connectable peripheral at `raw`
    pub fn with_peripheral(self, raw: u64, peripheral: MockPeripheral) -> Self {
        self.state
            .lock()
            .unwrap()
            .peripherals
            .insert(raw, peripheral);
        self
    }

    /// Queue an advertisement delivered on the next scan start
    pub fn with_advertisement(self, event: AdvertisementEvent) -> Self {
        self.state.lock().unwrap().advertisements.push(event);
        self
    }

    /// Keep re-sending the queued advertisements every `interval` until the
    /// receiving side goes away
    pub fn repeating_every(self, interval: Duration) -> Self {
        self.state.lock().unwrap().repeat = Some(Repeat {
            interval,
            fresh: false,
        });
        self
    }

    /// Make every repeat round advertise from addresses not seen before
    pub fn with_fresh_addresses(self) -> Self {
        if let Some(repeat) = self.state.lock().unwrap().repeat.as_mut() {
            repeat.fresh = true;
        }
        self
    }

    /// Script the results of the next writes; later writes fall back to the
    /// attribute's own status
    pub fn with_write_results(self, results: Vec<Result<GattStatus>>) -> Self {
        self.state.lock().unwrap().write_results = results.into();
        self
    }

    pub fn failing_scan(self) -> Self {
        self.state.lock().unwrap().fail_scan = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn open_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Open(_)))
    }

    pub fn close_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Close(_)))
    }

    pub fn is_scanning(&self) -> bool {
        self.state.lock().unwrap().sink.is_some()
    }

    fn count(&self, f: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| f(c)).count()
    }
}

#[async_trait(?Send)]
impl BleTransport for MockTransport {
    type Session = MockSession;
    type Group = MockGroup;
    type Attribute = MockAttribute;

    async fn start_scanning(&mut self, sink: AdvertisementSink) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_scan {
            return Err(BleError::TransportUnavailable("radio off".to_string()));
        }
        state.calls.push(Call::StartScan);
        for event in &state.advertisements {
            let _ = sink.send(event.clone());
        }
        if let Some(repeat) = state.repeat {
            let adverts = state.advertisements.clone();
            let sink = sink.clone();
            state.repeater = Some(tokio::spawn(async move {
                let mut round = 0u64;
                loop {
                    tokio::time::sleep(repeat.interval).await;
                    round += 1;
                    for advert in &adverts {
                        let mut event = advert.clone();
                        if repeat.fresh {
                            event.address =
                                PeerAddress::new(event.address.raw + (round << 16), event.address.kind);
                        }
                        if sink.send(event).is_err() {
                            return;
                        }
                    }
                }
            }));
        }
        // Keep the sink like a live watcher would
        state.sink = Some(sink);
        Ok(())
    }

    async fn stop_scanning(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::StopScan);
        if let Some(repeater) = state.repeater.take() {
            repeater.abort();
        }
        state.sink = None;
        Ok(())
    }

    async fn open_session(&self, address: PeerAddress) -> Result<Self::Session> {
        let mut state = self.state.lock().unwrap();
        if !state.peripherals.contains_key(&address.raw) {
            return Err(BleError::TransportUnavailable(format!(
                "{} not reachable",
                address
            )));
        }
        state.calls.push(Call::Open(address.raw));
        Ok(MockSession {
            address: address.raw,
        })
    }

    async fn close_session(&self, session: Self::Session) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(Call::Close(session.address));
        Ok(())
    }

    async fn attribute_groups(&self, session: &Self::Session) -> Result<Vec<Self::Group>> {
        let state = self.state.lock().unwrap();
        let peripheral = state
            .peripherals
            .get(&session.address)
            .ok_or_else(|| BleError::CommunicationError("peer vanished".to_string()))?;
        if peripheral.fail_enumeration {
            return Err(BleError::CommunicationError(
                "service discovery failed".to_string(),
            ));
        }
        Ok(peripheral.groups.clone())
    }

    async fn attributes(&self, group: &Self::Group) -> Result<Vec<Self::Attribute>> {
        if group.fail_listing {
            return Err(BleError::CommunicationError(format!(
                "characteristic discovery failed for {}",
                group.uuid
            )));
        }
        Ok(group.attributes.clone())
    }

    async fn read_attribute(&self, attribute: &Self::Attribute) -> Result<Vec<u8>> {
        attribute
            .value
            .clone()
            .ok_or_else(|| BleError::CommunicationError("read failed".to_string()))
    }

    async fn write_attribute(
        &self,
        attribute: &Self::Attribute,
        payload: &[u8],
        option: WriteOption,
    ) -> Result<GattStatus> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Write(attribute.uuid));
        state.writes.push(WriteRecord {
            attribute: attribute.uuid,
            payload: payload.to_vec(),
            option,
        });
        state
            .write_results
            .pop_front()
            .unwrap_or(Ok(attribute.write_status))
    }
}
