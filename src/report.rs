//! Console reporting of poll outcomes.
//!
//! Line-oriented human-readable text. Informational only; there is no
//! machine-parseable schema.

use chrono::Local;

use crate::decode::Reading;
use crate::obd::nrc_description;
use crate::poller::PollOutcome;

pub fn format_reading(reading: &Reading) -> String {
    match reading {
        Reading::Value {
            value, name, unit, ..
        } => format!("{}: {:.1} {}", name, value, unit),
        Reading::O2Sensor { voltage, fuel_trim } => format!(
            "O2 Sensor Voltage: {:.2} V | Fuel Trim: {:.1} %",
            voltage, fuel_trim
        ),
        Reading::StoredDtc(dtc) => format!("Stored DTC: {} (0x{:04X})", dtc.code, dtc.raw),
        Reading::Unsupported { mode, pid } => format!(
            "Mode 0x{:02X} PID 0x{:02X}: not supported by this vehicle",
            mode, pid
        ),
    }
}

pub fn format_outcome(pid: u8, outcome: &PollOutcome) -> String {
    match outcome {
        PollOutcome::Reading(reading) => format_reading(reading),
        PollOutcome::Rejected { nrc } => format!(
            "PID 0x{:02X}: rejected by ECU ({}, NRC 0x{:02X})",
            pid,
            nrc_description(*nrc),
            nrc
        ),
        PollOutcome::NoResponse => format!("PID 0x{:02X}: no response from ECU", pid),
    }
}

#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    fn line(&self, text: &str) {
        println!("[{}] {}", Local::now().format("%H:%M:%S%.3f"), text);
    }

    pub fn report_pid(&self, pid: u8, outcome: &PollOutcome) {
        self.line(&format_outcome(pid, outcome));
    }

    pub fn report_stored_dtcs(&self, outcome: &PollOutcome) {
        match outcome {
            PollOutcome::NoResponse => self.line("Stored DTCs: no response from ECU"),
            other => self.line(&format_outcome(0x00, other)),
        }
    }
}
