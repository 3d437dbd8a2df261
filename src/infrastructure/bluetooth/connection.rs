//! Device Session Controller
//!
//! Drives one connected session with an NB2 amplifier: service listing,
//! identity and status reads, the command sequence, and teardown.

use crate::domain::models::{
    AcquisitionMode, BatteryRecord, DateDecoding, DateRecord, DiscoveredPeer,
};
use crate::infrastructure::bluetooth::codec::{self, BATTERY_RECORD_LEN};
use crate::infrastructure::bluetooth::error::{BleError, Result};
use crate::infrastructure::bluetooth::executor::CommandExecutor;
use crate::infrastructure::bluetooth::outcome::{
    listing_result, CommandReport, ServiceListing, SessionOutcome, SessionStep,
};
use crate::infrastructure::bluetooth::protocol::{self, *};
use crate::infrastructure::bluetooth::transport::{BleTransport, GattItem};
use tracing::{info, warn};
use uuid::Uuid;

/// Configuration for session behavior
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionConfig {
    /// Which start frame opens the command sequence
    pub acquisition_mode: AcquisitionMode,
    /// How the date register is decoded
    pub date_decoding: DateDecoding,
}

/// Runs the protocol against one peer at a time
pub struct SessionController<'a, T: BleTransport> {
    transport: &'a T,
    config: SessionConfig,
}

impl<'a, T: BleTransport> SessionController<'a, T> {
    pub fn new(transport: &'a T, config: SessionConfig) -> Self {
        Self { transport, config }
    }

    /// Run every protocol step against `peer`.
    ///
    /// Steps never abort the session: each failure is recorded in the
    /// outcome and the next step runs. Once a session was opened it is
    /// always closed.
    pub async fn run_session(&self, peer: &DiscoveredPeer) -> SessionOutcome {
        info!("Connecting to {} at {}", peer.local_name, peer.address);
        let mut outcome = SessionOutcome::new(peer.address);

        let session = match self.transport.open_session(peer.address).await {
            Ok(session) => {
                outcome.record(SessionStep::Connect, Ok(()));
                session
            }
            Err(e) => {
                outcome.record(SessionStep::Connect, Err(e));
                return outcome;
            }
        };

        // Step 1: Service listing (diagnostics only)
        match self.enumerate_services(&session).await {
            Ok(services) => {
                let listed = listing_result(&services);
                outcome.services = services;
                outcome.record(SessionStep::ServiceEnumeration, listed);
            }
            Err(e) => outcome.record(SessionStep::ServiceEnumeration, Err(e)),
        }

        // Step 2: Device name
        let name = self
            .read_text(&session, GENERIC_ACCESS_SERVICE, DEVICE_NAME_CHAR, DEVICE_NAME_LEN)
            .await;
        if let Ok(name) = &name {
            info!("Name: {}", name);
        }
        outcome.device_name = settle(&mut outcome, SessionStep::IdentityRead, name);

        // Step 3: Serial number
        let serial = self
            .read_text(
                &session,
                DEVICE_INFORMATION_SERVICE,
                SERIAL_NUMBER_CHAR,
                SERIAL_NUMBER_LEN,
            )
            .await;
        if let Ok(serial) = &serial {
            info!("Serial: {}", serial);
        }
        outcome.serial_number = settle(&mut outcome, SessionStep::SerialRead, serial);

        // Step 4: Battery properties
        let (battery_raw, battery) = match self
            .read(&session, BATTERY_SERVICE, BATTERY_PROPERTIES_CHAR)
            .await
        {
            Ok(raw) => {
                let decoded = codec::decode_battery_record(&raw).map_err(BleError::from);
                (Some(raw), decoded)
            }
            Err(e) => (None, Err(e)),
        };
        if let Ok(battery) = &battery {
            log_battery(battery);
        }
        outcome.battery = settle(&mut outcome, SessionStep::BatteryRead, battery);

        // Step 5: Date
        let date = match self.read(&session, CURRENT_DATE_SERVICE, DATE_CHAR).await {
            Ok(raw) => self.decode_date(&raw, battery_raw.as_deref()),
            Err(e) => Err(e),
        };
        if let Ok(date) = &date {
            info!("Date: {}", date);
        }
        outcome.date = settle(&mut outcome, SessionStep::DateRead, date);

        // Step 6: Acquisition start/stop, power off, connection close
        let commands = self.run_commands(&session, &mut outcome).await;
        outcome.record(SessionStep::CommandSequence, commands);

        // Step 7: Release the session whatever happened above
        let closed = self.transport.close_session(session).await;
        if closed.is_ok() {
            info!("Disconnected from {}", peer.address);
        }
        outcome.record(SessionStep::Teardown, closed);

        outcome
    }

    async fn enumerate_services(&self, session: &T::Session) -> Result<Vec<ServiceListing>> {
        let groups = self.transport.attribute_groups(session).await?;
        info!("Found {} services", groups.len());

        let mut listings = Vec::with_capacity(groups.len());
        for group in &groups {
            info!("{}", group.uuid());
            info!("===========================");

            // A service that refuses listing stays in the outcome, marked
            let (attributes, listing_error) = match self.transport.attributes(group).await {
                Ok(attributes) => (attributes.iter().map(GattItem::uuid).collect(), None),
                Err(e) => {
                    warn!("Could not list characteristics of {}: {}", group.uuid(), e);
                    (Vec::new(), Some(e))
                }
            };
            for uuid in &attributes {
                info!("{}", uuid);
            }
            info!("===========================");

            listings.push(ServiceListing {
                uuid: group.uuid(),
                attributes,
                listing_error,
            });
        }

        Ok(listings)
    }

    /// Find `attribute_uuid` inside the service `group_uuid`
    async fn resolve(
        &self,
        session: &T::Session,
        group_uuid: Uuid,
        attribute_uuid: Uuid,
    ) -> Result<T::Attribute> {
        let group = self
            .transport
            .attribute_groups(session)
            .await?
            .into_iter()
            .find(|g| g.uuid() == group_uuid)
            .ok_or_else(|| BleError::AttributeNotFound(format!("service {}", group_uuid)))?;

        self.transport
            .attributes(&group)
            .await?
            .into_iter()
            .find(|a| a.uuid() == attribute_uuid)
            .ok_or_else(|| {
                BleError::AttributeNotFound(format!(
                    "characteristic {} in service {}",
                    attribute_uuid, group_uuid
                ))
            })
    }

    async fn read(
        &self,
        session: &T::Session,
        group_uuid: Uuid,
        attribute_uuid: Uuid,
    ) -> Result<Vec<u8>> {
        let attribute = self.resolve(session, group_uuid, attribute_uuid).await?;
        self.transport.read_attribute(&attribute).await
    }

    async fn read_text(
        &self,
        session: &T::Session,
        group_uuid: Uuid,
        attribute_uuid: Uuid,
        len: usize,
    ) -> Result<String> {
        let raw = self.read(session, group_uuid, attribute_uuid).await?;
        Ok(codec::decode_text_field(&raw, len)?)
    }

    fn decode_date(&self, raw: &[u8], battery_raw: Option<&[u8]>) -> Result<DateRecord> {
        match self.config.date_decoding {
            DateDecoding::Strict => Ok(codec::decode_date_record(raw)?),
            DateDecoding::LegacyBatteryOverlay => {
                let battery: &[u8] = match battery_raw {
                    Some(raw) => raw,
                    None => {
                        warn!("Battery register unavailable, legacy date overlay uses zeros");
                        &[0u8; BATTERY_RECORD_LEN]
                    }
                };
                Ok(codec::decode_date_record_legacy(raw, battery)?)
            }
        }
    }

    /// Write the command sequence in order, ignoring individual statuses
    async fn run_commands(&self, session: &T::Session, outcome: &mut SessionOutcome) -> Result<()> {
        let sequence = protocol::command_sequence(self.config.acquisition_mode);

        let attribute = match self.resolve(session, CONTROL_SERVICE, COMMAND_CHAR).await {
            Ok(attribute) => attribute,
            Err(e) => {
                for command in sequence {
                    outcome.commands.push(CommandReport {
                        command,
                        result: Err(e.clone()),
                    });
                }
                return Err(e);
            }
        };
        info!("Command characteristic uuid: {}", attribute.uuid());

        let executor = CommandExecutor::new(self.transport);
        for command in sequence {
            let result = executor.send(command, &attribute).await;
            if let Err(e) = &result {
                warn!("{:?} not delivered: {}", command, e);
            }
            outcome.commands.push(CommandReport { command, result });
        }

        Ok(())
    }
}

/// Record a step's result and hand back its value on success
fn settle<V>(outcome: &mut SessionOutcome, step: SessionStep, result: Result<V>) -> Option<V> {
    match result {
        Ok(value) => {
            outcome.record(step, Ok(()));
            Some(value)
        }
        Err(e) => {
            outcome.record(step, Err(e));
            None
        }
    }
}

fn log_battery(battery: &BatteryRecord) {
    info!("capacity: {}", battery.capacity_mah);
    info!("level: {}", battery.level_per_mille);
    info!("voltage: {}", battery.voltage_mv);
    info!("current: {}", battery.current_ma);
    info!("temperature: {}", battery.temperature_decicelsius);
}
