//! OBD-II protocol definitions (ISO 15031-5 over 11-bit CAN).
//!
//! Covers the diagnostic service modes this monitor speaks, the standard
//! Mode 01 PID numbers, request frame encoding, and trouble code formatting.

use serde::{Deserialize, Serialize};

use crate::can::CanFrame;

/// Diagnostic service modes.
pub mod modes {
    /// Show current data
    pub const CURRENT_DATA: u8 = 0x01;
    /// Show stored diagnostic trouble codes
    pub const STORED_DTCS: u8 = 0x03;
    /// Clear diagnostic trouble codes
    pub const CLEAR_DTCS: u8 = 0x04;
    /// Oxygen sensor monitoring test results
    pub const O2_TEST_RESULTS: u8 = 0x05;

    /// Positive response = request mode + 0x40
    pub const POSITIVE_RESPONSE_OFFSET: u8 = 0x40;
    pub const NEGATIVE_RESPONSE: u8 = 0x7F;

    /// All modes the monitor issues requests for
    pub const SUPPORTED: &[u8] = &[CURRENT_DATA, STORED_DTCS, CLEAR_DTCS, O2_TEST_RESULTS];
}

/// Standard OBD-II PIDs (Mode 01).
pub mod pids {
    pub const ENGINE_LOAD: u8 = 0x04; // Calculated engine load (%)
    pub const COOLANT_TEMP: u8 = 0x05; // Engine coolant temperature (°C)
    pub const INTAKE_MAP: u8 = 0x0B; // Intake manifold absolute pressure (kPa)
    pub const ENGINE_RPM: u8 = 0x0C; // Engine RPM
    pub const VEHICLE_SPEED: u8 = 0x0D; // Vehicle speed (km/h)
    pub const INTAKE_AIR_TEMP: u8 = 0x0F; // Intake air temperature (°C)
    pub const MAF_RATE: u8 = 0x10; // MAF air flow rate (g/s)
    pub const RUN_TIME: u8 = 0x1F; // Run time since engine start (seconds)
    pub const DISTANCE_WITH_MIL: u8 = 0x21; // Distance traveled with MIL on (km)
    pub const FUEL_TANK_LEVEL: u8 = 0x2F; // Fuel tank level input (%)

    /// O2 sensor PID range for Mode 05 test results
    pub const O2_SENSOR_FIRST: u8 = 0x01;
    pub const O2_SENSOR_LAST: u8 = 0x20;
}

/// CAN identifiers for OBD-II diagnostics.
pub mod can_ids {
    /// Functional (broadcast) request to all ECUs
    pub const FUNCTIONAL_REQ: u16 = 0x7DF;
    /// First responding ECU (the engine ECU on most vehicles)
    pub const ECU_RESPONSE: u16 = 0x7E8;
}

/// A single diagnostic request.
///
/// Serializes to the 8-byte frame `[length, mode, pid, 0, 0, 0, 0, 0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObdRequest {
    pub length: u8,
    pub mode: u8,
    pub pid: u8,
}

impl ObdRequest {
    pub fn new(length: u8, mode: u8, pid: u8) -> Self {
        Self { length, mode, pid }
    }

    /// Mode 01 live data request
    pub fn current_data(pid: u8) -> Self {
        Self::new(0x02, modes::CURRENT_DATA, pid)
    }

    /// Mode 03 stored DTC request (no PID byte in the protocol; the echo
    /// byte in the response is matched against 0x00)
    pub fn stored_dtcs() -> Self {
        Self::new(0x01, modes::STORED_DTCS, 0x00)
    }

    /// Mode 04 clear DTC request
    pub fn clear_dtcs() -> Self {
        Self::new(0x02, modes::CLEAR_DTCS, 0x00)
    }

    /// Mode 05 O2 sensor test result request
    pub fn o2_sensor(pid: u8) -> Self {
        Self::new(0x02, modes::O2_TEST_RESULTS, pid)
    }

    pub fn to_frame(&self) -> [u8; 8] {
        [self.length, self.mode, self.pid, 0, 0, 0, 0, 0]
    }

    pub fn to_can_frame(&self, id: u16) -> CanFrame {
        CanFrame::new(id, self.to_frame())
    }
}

/// Diagnostic Trouble Code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dtc {
    /// Raw 16-bit code word as received
    pub raw: u16,
    /// Standard code form (P0XXX, C0XXX, B0XXX, U0XXX)
    pub code: String,
}

impl Dtc {
    pub fn from_raw(raw: u16) -> Self {
        Self {
            raw,
            code: Self::raw_to_code(raw),
        }
    }

    /// The top two bits select the category, the remaining 14 bits are the
    /// code number.
    fn raw_to_code(raw: u16) -> String {
        let category = match (raw >> 14) & 0x03 {
            0 => 'P', // Powertrain
            1 => 'C', // Chassis
            2 => 'B', // Body
            _ => 'U', // Network
        };
        format!("{}{:04X}", category, raw & 0x3FFF)
    }
}

/// Negative response code descriptions (ISO 14229 subset).
pub fn nrc_description(nrc: u8) -> &'static str {
    match nrc {
        0x10 => "General reject",
        0x11 => "Service not supported",
        0x12 => "Sub-function not supported",
        0x13 => "Incorrect message length",
        0x21 => "Busy - repeat request",
        0x22 => "Conditions not correct",
        0x31 => "Request out of range",
        0x33 => "Security access denied",
        0x78 => "Request correctly received - response pending",
        _ => "Unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_frame_layout() {
        let frame = ObdRequest::current_data(pids::ENGINE_RPM).to_frame();
        assert_eq!(frame, [0x02, 0x01, 0x0C, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_clear_dtc_frame() {
        let frame = ObdRequest::clear_dtcs().to_frame();
        assert_eq!(frame, [0x02, 0x04, 0x00, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_request_on_broadcast_id() {
        let frame = ObdRequest::current_data(pids::VEHICLE_SPEED).to_can_frame(can_ids::FUNCTIONAL_REQ);
        assert_eq!(frame.id, 0x7DF);
        assert_eq!(frame.data[2], 0x0D);
    }

    #[test]
    fn test_dtc_code_categories() {
        assert_eq!(Dtc::from_raw(0x0133).code, "P0133");
        assert_eq!(Dtc::from_raw(0x4123).code, "C0123");
        assert_eq!(Dtc::from_raw(0x8001).code, "B0001");
        assert_eq!(Dtc::from_raw(0xC100).code, "U0100");
    }
}
