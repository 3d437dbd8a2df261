//! WinRT implementation of the BLE transport
//!
//! GATT access goes through `Windows.Devices.Bluetooth`, always uncached so
//! every session sees the peripheral's current table.

use crate::domain::models::{AddressType, PeerAddress};
use crate::infrastructure::bluetooth::error::{BleError, Result};
use crate::infrastructure::bluetooth::scanner::BleScanner;
use crate::infrastructure::bluetooth::transport::{
    AdvertisementSink, BleTransport, GattItem, GattStatus, WriteOption,
};
use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;
use windows::core::GUID;
use windows::Devices::Bluetooth::GenericAttributeProfile::{
    GattCharacteristic, GattCommunicationStatus, GattDeviceService, GattWriteOption,
};
use windows::Devices::Bluetooth::{BluetoothAddressType, BluetoothCacheMode, BluetoothLEDevice};
use windows::Storage::Streams::{DataReader, DataWriter};

fn to_uuid(guid: GUID) -> Uuid {
    Uuid::from_u128(guid.to_u128())
}

fn communication(e: windows::core::Error) -> BleError {
    BleError::CommunicationError(e.message().to_string())
}

fn check(status: GattCommunicationStatus, what: &str) -> Result<()> {
    if status == GattCommunicationStatus::Success {
        Ok(())
    } else {
        Err(BleError::CommunicationError(format!("{} failed: {:?}", what, status)))
    }
}

fn to_status(status: GattCommunicationStatus) -> GattStatus {
    match status {
        GattCommunicationStatus::Success => GattStatus::Success,
        GattCommunicationStatus::Unreachable => GattStatus::Unreachable,
        GattCommunicationStatus::AccessDenied => GattStatus::AccessDenied,
        _ => GattStatus::ProtocolError,
    }
}

pub struct WinRtSession {
    device: BluetoothLEDevice,
}

pub struct WinRtService {
    uuid: Uuid,
    service: GattDeviceService,
}

impl GattItem for WinRtService {
    fn uuid(&self) -> Uuid {
        self.uuid
    }
}

pub struct WinRtCharacteristic {
    uuid: Uuid,
    characteristic: GattCharacteristic,
}

impl GattItem for WinRtCharacteristic {
    fn uuid(&self) -> Uuid {
        self.uuid
    }
}

/// BLE transport backed by the Windows Bluetooth stack
#[derive(Default)]
pub struct WinRtTransport {
    scanner: BleScanner,
}

impl WinRtTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait(?Send)]
impl BleTransport for WinRtTransport {
    type Session = WinRtSession;
    type Group = WinRtService;
    type Attribute = WinRtCharacteristic;

    async fn start_scanning(&mut self, sink: AdvertisementSink) -> Result<()> {
        self.scanner
            .start(sink)
            .map_err(|e| BleError::TransportUnavailable(e.to_string()))
    }

    async fn stop_scanning(&mut self) -> Result<()> {
        self.scanner
            .stop()
            .map_err(|e| BleError::TransportUnavailable(e.to_string()))
    }

    async fn open_session(&self, address: PeerAddress) -> Result<Self::Session> {
        let address_type = match address.kind {
            AddressType::Public => BluetoothAddressType::Public,
            AddressType::Random => BluetoothAddressType::Random,
            AddressType::Unspecified => BluetoothAddressType::Unspecified,
        };

        let device = BluetoothLEDevice::FromBluetoothAddressWithBluetoothAddressTypeAsync(
            address.raw,
            address_type,
        )
        .map_err(|e| BleError::TransportUnavailable(e.message().to_string()))?
        .await
        .map_err(|e| BleError::TransportUnavailable(e.message().to_string()))?;

        info!("Device connected: {:?}", device.Name().map_err(communication)?);
        Ok(WinRtSession { device })
    }

    async fn close_session(&self, session: Self::Session) -> Result<()> {
        session.device.Close().map_err(communication)
    }

    async fn attribute_groups(&self, session: &Self::Session) -> Result<Vec<Self::Group>> {
        let result = session
            .device
            .GetGattServicesWithCacheModeAsync(BluetoothCacheMode::Uncached)
            .map_err(communication)?
            .await
            .map_err(communication)?;
        check(result.Status().map_err(communication)?, "Service discovery")?;

        let services = result.Services().map_err(communication)?;
        let mut groups = Vec::new();
        for i in 0..services.Size().map_err(communication)? {
            let service = services.GetAt(i).map_err(communication)?;
            let uuid = to_uuid(service.Uuid().map_err(communication)?);
            groups.push(WinRtService { uuid, service });
        }

        Ok(groups)
    }

    async fn attributes(&self, group: &Self::Group) -> Result<Vec<Self::Attribute>> {
        let result = group
            .service
            .GetCharacteristicsWithCacheModeAsync(BluetoothCacheMode::Uncached)
            .map_err(communication)?
            .await
            .map_err(communication)?;
        check(result.Status().map_err(communication)?, "Characteristic discovery")?;

        let characteristics = result.Characteristics().map_err(communication)?;
        let mut attributes = Vec::new();
        for i in 0..characteristics.Size().map_err(communication)? {
            let characteristic = characteristics.GetAt(i).map_err(communication)?;
            let uuid = to_uuid(characteristic.Uuid().map_err(communication)?);
            attributes.push(WinRtCharacteristic {
                uuid,
                characteristic,
            });
        }

        Ok(attributes)
    }

    async fn read_attribute(&self, attribute: &Self::Attribute) -> Result<Vec<u8>> {
        let result = attribute
            .characteristic
            .ReadValueWithCacheModeAsync(BluetoothCacheMode::Uncached)
            .map_err(communication)?
            .await
            .map_err(communication)?;
        check(result.Status().map_err(communication)?, "Read")?;

        let reader = DataReader::FromBuffer(&result.Value().map_err(communication)?)
            .map_err(communication)?;
        let length = reader.UnconsumedBufferLength().map_err(communication)? as usize;
        let mut bytes = vec![0u8; length];
        reader.ReadBytes(&mut bytes).map_err(communication)?;
        debug!("Read {} bytes from {}", length, attribute.uuid);

        Ok(bytes)
    }

    async fn write_attribute(
        &self,
        attribute: &Self::Attribute,
        payload: &[u8],
        option: WriteOption,
    ) -> Result<GattStatus> {
        let writer = DataWriter::new().map_err(communication)?;
        writer.WriteBytes(payload).map_err(communication)?;
        let buffer = writer.DetachBuffer().map_err(communication)?;

        let option = match option {
            WriteOption::WithResponse => GattWriteOption::WriteWithResponse,
            WriteOption::WithoutResponse => GattWriteOption::WriteWithoutResponse,
        };
        let result = attribute
            .characteristic
            .WriteValueWithResultAndOptionAsync(&buffer, option)
            .map_err(communication)?
            .await
            .map_err(communication)?;

        Ok(to_status(result.Status().map_err(communication)?))
    }
}
