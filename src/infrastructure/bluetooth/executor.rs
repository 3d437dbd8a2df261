//! Command script executor
//!
//! Turns hex command scripts into payloads and writes them with
//! acknowledgment.

use crate::infrastructure::bluetooth::error::Result;
use crate::infrastructure::bluetooth::protocol::{self, CommandScript};
use crate::infrastructure::bluetooth::transport::{BleTransport, GattStatus, WriteOption};
use tracing::{debug, info};

pub struct CommandExecutor<'a, T: BleTransport> {
    transport: &'a T,
}

impl<'a, T: BleTransport> CommandExecutor<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Parse `script` and write it to `attribute`, waiting for the ack.
    ///
    /// A script that fails to parse is never partially written.
    pub async fn execute(&self, script: &str, attribute: &T::Attribute) -> Result<GattStatus> {
        let payload = protocol::parse_script(script)?;
        debug!("Writing {} byte command frame", payload.len());

        let status = self
            .transport
            .write_attribute(attribute, &payload, WriteOption::WithResponse)
            .await?;
        info!("Write result status: {:?}", status);
        Ok(status)
    }

    /// Run a named command
    pub async fn send(&self, command: CommandScript, attribute: &T::Attribute) -> Result<GattStatus> {
        info!("Sending {:?} command", command);
        self.execute(command.script(), attribute).await
    }
}
