//! NB2 Amplifier Protocol
//!
//! This module contains the GATT identifiers and command frames used to
//! talk to NB2 acquisition amplifiers.

use crate::domain::models::AcquisitionMode;
use crate::infrastructure::bluetooth::error::CodecError;
use uuid::Uuid;

/// Generic Access service (0x1800)
pub const GENERIC_ACCESS_SERVICE: Uuid = Uuid::from_u128(0x00001800_0000_1000_8000_00805f9b34fb);

/// Device Name characteristic (0x2A00)
pub const DEVICE_NAME_CHAR: Uuid = Uuid::from_u128(0x00002a00_0000_1000_8000_00805f9b34fb);

/// Device Information service (0x180A)
pub const DEVICE_INFORMATION_SERVICE: Uuid =
    Uuid::from_u128(0x0000180a_0000_1000_8000_00805f9b34fb);

/// Serial Number String characteristic (0x2A25)
pub const SERIAL_NUMBER_CHAR: Uuid = Uuid::from_u128(0x00002a25_0000_1000_8000_00805f9b34fb);

/// Battery service (0x180F)
pub const BATTERY_SERVICE: Uuid = Uuid::from_u128(0x0000180f_0000_1000_8000_00805f9b34fb);

/// Vendor battery properties characteristic, see [`BatteryRecord`](crate::domain::models::BatteryRecord)
pub const BATTERY_PROPERTIES_CHAR: Uuid = Uuid::from_u128(0x5c979c9f_a1ac_5715_9a1b_f81a581179d9);

/// Current Time service (0x1805), carries the vendor date characteristic
pub const CURRENT_DATE_SERVICE: Uuid = Uuid::from_u128(0x00001805_0000_1000_8000_00805f9b34fb);

/// Vendor date characteristic
pub const DATE_CHAR: Uuid = Uuid::from_u128(0xa9b157a1_5827_5553_9ba5_5f5ff8f8e173);

/// Vendor control service
pub const CONTROL_SERVICE: Uuid = Uuid::from_u128(0xa183c5a7_1e93_8deb_a113_e8d5bb5581db);

/// Command characteristic - where command frames are written
pub const COMMAND_CHAR: Uuid = Uuid::from_u128(0x7395ca15_5997_5a1b_a138_75a7a573b8e5);

/// Length of the device name text field
pub const DEVICE_NAME_LEN: usize = 14;

/// Length of the serial number text field
pub const SERIAL_NUMBER_LEN: usize = 4;

/// Substring every NB2 amplifier carries in its advertised local name
pub const DEFAULT_NAME_MARKER: &str = "NB2";

/// Signed command frames understood by the amplifier.
///
/// The frames are authenticated by the device and must be written verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandScript {
    /// Start streaming acquisition data
    StartAcquisition,
    /// Start impedance measurement
    StartImpedance,
    /// Stop any running acquisition
    StopAcquisition,
    /// Power the amplifier down
    PowerOff,
    /// Ask the amplifier to drop the connection
    CloseConnection,
}

impl CommandScript {
    /// Get the hex script for this command
    pub fn script(&self) -> &'static str {
        match self {
            Self::StartAcquisition => "01 00 00 01 00 FF FF 00 02 00 00 00 00 00 00 00 02 00 59 6D 3D B3 DC 5C 63 B8 1B 91 D2 76 2D E7 C5 28 DA A8 95 57 18 53 32 55 8B 7E 97 3C A6 A6 0D 99",
            Self::StartImpedance => "01 01 00 01 00 FF FF 00 02 00 00 00 00 00 00 00 02 00 3E 73 58 12 CE 8C 90 B1 B0 AB 03 20 35 C2 06 5A 0F C3 AE 3F BB C8 43 E6 24 FC 0F 9C 23 5A 49 70",
            Self::StopAcquisition => "02 8A DC 88 98 EC A3 3B 08 CB BD 40 12 50 FC 6C EA 4E FF 7D 01 C7 87 DC 69 9A 76 52 18 7F FF D5 21",
            Self::PowerOff => "05 0D DE C2 81 BC 8B 45 00 68 68 47 03 C7 6C B7 DA C0 49 C8 C1 C0 40 82 60 D7 D7 5B EE D9 4B A8 F8 0E",
            Self::CloseConnection => "03 67 ED AD EE C5 5D AF 5D A2 FB DC C5 8C 49 62 22 4E 63 64 ED A9 50 AC 9E 58 DF 70 77 CC 08 E2 BC",
        }
    }
}

/// Command sequence run once per session: start, stop, power off, close
pub fn command_sequence(mode: AcquisitionMode) -> [CommandScript; 4] {
    let start = match mode {
        AcquisitionMode::Data => CommandScript::StartAcquisition,
        AcquisitionMode::Impedance => CommandScript::StartImpedance,
    };
    [
        start,
        CommandScript::StopAcquisition,
        CommandScript::PowerOff,
        CommandScript::CloseConnection,
    ]
}

/// Parse a whitespace separated hex script into bytes.
///
/// Every token must be exactly two hex digits. Nothing is returned unless
/// the whole script parses.
pub fn parse_script(script: &str) -> Result<Vec<u8>, CodecError> {
    let mut bytes = Vec::new();

    for (index, token) in script.split_whitespace().enumerate() {
        let invalid = || CodecError::InvalidHexToken {
            index,
            token: token.to_string(),
        };
        if token.len() != 2 {
            return Err(invalid());
        }
        let decoded = hex::decode(token).map_err(|_| invalid())?;
        bytes.extend_from_slice(&decoded);
    }

    if bytes.is_empty() {
        return Err(CodecError::EmptyScript);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        assert_eq!(parse_script("01 00 FF").unwrap(), vec![0x01, 0x00, 0xFF]);
        assert_eq!(parse_script("  0a\tFf \n10 ").unwrap(), vec![0x0A, 0xFF, 0x10]);
    }

    #[test]
    fn test_parse_script_rejects_bad_tokens() {
        assert_eq!(
            parse_script("01 GG 02"),
            Err(CodecError::InvalidHexToken {
                index: 1,
                token: "GG".to_string()
            })
        );
        assert!(matches!(
            parse_script("01 0"),
            Err(CodecError::InvalidHexToken { index: 1, .. })
        ));
        assert!(matches!(
            parse_script("0102"),
            Err(CodecError::InvalidHexToken { index: 0, .. })
        ));
        assert_eq!(parse_script("   "), Err(CodecError::EmptyScript));
    }

    #[test]
    fn test_builtin_scripts_parse() {
        let start = parse_script(CommandScript::StartAcquisition.script()).unwrap();
        assert_eq!(start.len(), 50);
        assert_eq!(&start[..4], &[0x01, 0x00, 0x00, 0x01]);
        assert_eq!(start[49], 0x99);

        let impedance = parse_script(CommandScript::StartImpedance.script()).unwrap();
        assert_eq!(impedance.len(), 50);
        assert_eq!(impedance[1], 0x01);

        for command in [CommandScript::StopAcquisition, CommandScript::CloseConnection] {
            assert_eq!(parse_script(command.script()).unwrap().len(), 33);
        }
        let power_off = parse_script(CommandScript::PowerOff.script()).unwrap();
        assert_eq!(power_off.len(), 34);
        assert_eq!(power_off[0], 0x05);
    }

    #[test]
    fn test_command_sequence_order() {
        assert_eq!(
            command_sequence(AcquisitionMode::Data),
            [
                CommandScript::StartAcquisition,
                CommandScript::StopAcquisition,
                CommandScript::PowerOff,
                CommandScript::CloseConnection,
            ]
        );
        assert_eq!(
            command_sequence(AcquisitionMode::Impedance)[0],
            CommandScript::StartImpedance
        );
    }

    #[test]
    fn test_uuid_constants() {
        assert_eq!(
            GENERIC_ACCESS_SERVICE.to_string(),
            "00001800-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            SERIAL_NUMBER_CHAR.to_string(),
            "00002a25-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            BATTERY_PROPERTIES_CHAR.to_string(),
            "5c979c9f-a1ac-5715-9a1b-f81a581179d9"
        );
        assert_eq!(DATE_CHAR.to_string(), "a9b157a1-5827-5553-9ba5-5f5ff8f8e173");
        assert_eq!(
            CONTROL_SERVICE.to_string(),
            "a183c5a7-1e93-8deb-a113-e8d5bb5581db"
        );
        assert_eq!(
            COMMAND_CHAR.to_string(),
            "7395ca15-5997-5a1b-a138-75a7a573b8e5"
        );
    }
}
