//! BLE Scanner Module
//!
//! Wraps the WinRT advertisement watcher and forwards every received
//! advertisement into the discovery channel.

use crate::domain::models::{AddressType, AdvertisementEvent, AdvertisementKind, PeerAddress};
use crate::infrastructure::bluetooth::transport::AdvertisementSink;
use anyhow::Result;
use tracing::{info, trace};
use windows::Devices::Bluetooth::Advertisement::{
    BluetoothLEAdvertisementReceivedEventArgs, BluetoothLEAdvertisementType,
    BluetoothLEAdvertisementWatcher, BluetoothLEScanningMode,
};
use windows::Devices::Bluetooth::BluetoothAddressType;
use windows::Foundation::TypedEventHandler;

/// Active advertisement watcher plus its registration token
struct ActiveWatch {
    watcher: BluetoothLEAdvertisementWatcher,
    token: i64,
}

/// BLE Scanner feeding the discovery registry
#[derive(Default)]
pub struct BleScanner {
    active: Option<ActiveWatch>,
}

impl BleScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an active scan delivering every advertisement into `sink`
    pub fn start(&mut self, sink: AdvertisementSink) -> Result<()> {
        // Stop any existing scan
        self.stop()?;

        info!("Starting BluetoothLEAdvertisementWatcher");
        let watcher = BluetoothLEAdvertisementWatcher::new()?;
        watcher.SetScanningMode(BluetoothLEScanningMode::Active)?;

        let handler = TypedEventHandler::new(
            move |_: windows::core::Ref<BluetoothLEAdvertisementWatcher>,
                  args: windows::core::Ref<BluetoothLEAdvertisementReceivedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    // Name and services can arrive split across the advert
                    // and the scan response, so every event is forwarded
                    let event = to_event(args)?;
                    trace!("Advertisement {} {:?}", event.address, event.local_name);
                    let _ = sink.send(event);
                }
                Ok(())
            },
        );

        let token = watcher.Received(&handler)?;
        watcher.Start()?;
        self.active = Some(ActiveWatch { watcher, token });

        Ok(())
    }

    /// Stop scanning and release the delivery handler
    pub fn stop(&mut self) -> Result<()> {
        if let Some(active) = self.active.take() {
            info!("Stopping BluetoothLEAdvertisementWatcher");
            active.watcher.Stop()?;
            active.watcher.RemoveReceived(active.token)?;
        }
        Ok(())
    }
}

impl Drop for BleScanner {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn to_event(args: &BluetoothLEAdvertisementReceivedEventArgs) -> windows::core::Result<AdvertisementEvent> {
    let address_type = match args.BluetoothAddressType()? {
        BluetoothAddressType::Public => AddressType::Public,
        BluetoothAddressType::Random => AddressType::Random,
        _ => AddressType::Unspecified,
    };
    let kind = match args.AdvertisementType()? {
        BluetoothLEAdvertisementType::ConnectableUndirected => AdvertisementKind::ConnectableUndirected,
        BluetoothLEAdvertisementType::ConnectableDirected => AdvertisementKind::ConnectableDirected,
        BluetoothLEAdvertisementType::ScannableUndirected => AdvertisementKind::ScannableUndirected,
        BluetoothLEAdvertisementType::NonConnectableUndirected => {
            AdvertisementKind::NonConnectableUndirected
        }
        BluetoothLEAdvertisementType::ScanResponse => AdvertisementKind::ScanResponse,
        _ => AdvertisementKind::Extended,
    };

    Ok(AdvertisementEvent {
        address: PeerAddress::new(args.BluetoothAddress()?, address_type),
        local_name: args.Advertisement()?.LocalName()?.to_string(),
        kind,
    })
}
