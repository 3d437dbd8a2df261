//! Per-session result record

use crate::domain::models::{BatteryRecord, DateRecord, PeerAddress};
use crate::infrastructure::bluetooth::error::BleError;
use crate::infrastructure::bluetooth::protocol::CommandScript;
use crate::infrastructure::bluetooth::transport::GattStatus;
use tracing::{info, warn};
use uuid::Uuid;

/// Protocol steps of a device session, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    Connect,
    ServiceEnumeration,
    IdentityRead,
    SerialRead,
    BatteryRead,
    DateRead,
    CommandSequence,
    Teardown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub step: SessionStep,
    pub result: Result<(), BleError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandReport {
    pub command: CommandScript,
    pub result: Result<GattStatus, BleError>,
}

/// One GATT service and the characteristics found in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceListing {
    pub uuid: Uuid,
    pub attributes: Vec<Uuid>,
    /// Set when the characteristics could not be listed; `attributes` is
    /// then empty
    pub listing_error: Option<BleError>,
}

/// Result of the service listing step: failed if any service was skipped
pub fn listing_result(services: &[ServiceListing]) -> Result<(), BleError> {
    let skipped: Vec<String> = services
        .iter()
        .filter(|s| s.listing_error.is_some())
        .map(|s| s.uuid.to_string())
        .collect();
    if skipped.is_empty() {
        Ok(())
    } else {
        Err(BleError::CommunicationError(format!(
            "characteristics not listed for {}",
            skipped.join(", ")
        )))
    }
}

#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub peer: PeerAddress,
    pub services: Vec<ServiceListing>,
    pub device_name: Option<String>,
    pub serial_number: Option<String>,
    pub battery: Option<BatteryRecord>,
    pub date: Option<DateRecord>,
    pub commands: Vec<CommandReport>,
    pub steps: Vec<StepReport>,
}

impl SessionOutcome {
    pub fn new(peer: PeerAddress) -> Self {
        Self {
            peer,
            services: Vec::new(),
            device_name: None,
            serial_number: None,
            battery: None,
            date: None,
            commands: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Record the result of a step, logging failures
    pub fn record(&mut self, step: SessionStep, result: Result<(), BleError>) {
        if let Err(e) = &result {
            warn!("{} {:?} failed: {}", self.peer, step, e);
        }
        self.steps.push(StepReport { step, result });
    }

    pub fn step(&self, step: SessionStep) -> Option<&StepReport> {
        self.steps.iter().find(|r| r.step == step)
    }

    pub fn failed_steps(&self) -> Vec<SessionStep> {
        self.steps
            .iter()
            .filter(|r| r.result.is_err())
            .map(|r| r.step)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failed_steps().is_empty()
            && self
                .commands
                .iter()
                .all(|c| matches!(c.result, Ok(GattStatus::Success)))
    }

    /// Emit the per-session summary block
    pub fn log_summary(&self) {
        let acknowledged = self
            .commands
            .iter()
            .filter(|c| matches!(c.result, Ok(GattStatus::Success)))
            .count();
        info!(
            "Session {}: name {:?}, serial {:?}, {}/{} commands acknowledged",
            self.peer,
            self.device_name.as_deref().unwrap_or("-"),
            self.serial_number.as_deref().unwrap_or("-"),
            acknowledged,
            self.commands.len()
        );
        if let Some(b) = &self.battery {
            info!(
                "Battery: capacity {} mAh, level {}, voltage {} mV, current {} mA, temperature {}",
                b.capacity_mah, b.level_per_mille, b.voltage_mv, b.current_ma, b.temperature_decicelsius
            );
        }

        let failed = self.failed_steps();
        if failed.is_empty() {
            info!("Session finished without errors");
        } else {
            warn!("Session finished with failed steps: {:?}", failed);
        }
    }
}
