//! Response payload decoding.
//!
//! Decodes matched ECU response payloads into physical units. The decode
//! table covers the standard Mode 01 PIDs the monitor polls; Mode 03 and
//! Mode 05 responses dispatch to trouble code and O2 sensor handling before
//! the table is consulted.

use serde::Serialize;

use crate::obd::{modes, pids, Dtc};

/// PID definition for the live data table.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PidDefinition {
    pub id: u8,
    pub name: &'static str,
    pub unit: &'static str,
    pub min: f64,
    pub max: f64,
}

/// Mode 01 PIDs this monitor can decode.
pub fn supported_pids() -> &'static [PidDefinition] {
    &[
        PidDefinition {
            id: pids::ENGINE_LOAD,
            name: "Engine Load",
            unit: "%",
            min: 0.0,
            max: 100.0,
        },
        PidDefinition {
            id: pids::COOLANT_TEMP,
            name: "Coolant Temp",
            unit: "°C",
            min: -40.0,
            max: 215.0,
        },
        PidDefinition {
            id: pids::INTAKE_MAP,
            name: "Intake Pressure",
            unit: "kPa",
            min: 0.0,
            max: 255.0,
        },
        PidDefinition {
            id: pids::ENGINE_RPM,
            name: "Engine RPM",
            unit: "rpm",
            min: 0.0,
            max: 16383.75,
        },
        PidDefinition {
            id: pids::VEHICLE_SPEED,
            name: "Vehicle Speed",
            unit: "km/h",
            min: 0.0,
            max: 255.0,
        },
        PidDefinition {
            id: pids::INTAKE_AIR_TEMP,
            name: "Intake Air Temp",
            unit: "°C",
            min: -40.0,
            max: 215.0,
        },
        PidDefinition {
            id: pids::MAF_RATE,
            name: "MAF Rate",
            unit: "g/s",
            min: 0.0,
            max: 655.35,
        },
        PidDefinition {
            id: pids::RUN_TIME,
            name: "Run Time",
            unit: "s",
            min: 0.0,
            max: 65535.0,
        },
        PidDefinition {
            id: pids::DISTANCE_WITH_MIL,
            name: "Distance with MIL",
            unit: "km",
            min: 0.0,
            max: 65535.0,
        },
        PidDefinition {
            id: pids::FUEL_TANK_LEVEL,
            name: "Fuel Level",
            unit: "%",
            min: 0.0,
            max: 100.0,
        },
    ]
}

pub fn pid_definition(pid: u8) -> Option<&'static PidDefinition> {
    supported_pids().iter().find(|d| d.id == pid)
}

/// Decoded response payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Reading {
    /// Physical quantity from the Mode 01 live data table
    Value {
        pid: u8,
        name: &'static str,
        value: f64,
        unit: &'static str,
        raw: [u8; 2],
    },
    /// Mode 05 O2 sensor test result
    O2Sensor { voltage: f64, fuel_trim: f64 },
    /// Mode 03 stored trouble code
    StoredDtc(Dtc),
    /// PID not in the decode table
    Unsupported { mode: u8, pid: u8 },
}

/// Decode a matched response payload.
///
/// Pure function of `(mode, pid, payload[3], payload[4])`. The caller has
/// already verified the arbitration ID and the mode/PID echo bytes.
pub fn decode(mode: u8, pid: u8, payload: &[u8; 8]) -> Reading {
    let b3 = payload[3];
    let b4 = payload[4];

    // Mode 05 carries O2 sensor test results for PIDs 0x01..=0x20
    if mode == modes::O2_TEST_RESULTS
        && (pids::O2_SENSOR_FIRST..=pids::O2_SENSOR_LAST).contains(&pid)
    {
        return Reading::O2Sensor {
            voltage: b3 as f64 / 200.0,
            fuel_trim: b4 as f64 - 128.0,
        };
    }

    if mode == modes::STORED_DTCS {
        return Reading::StoredDtc(Dtc::from_raw(((b3 as u16) << 8) | b4 as u16));
    }

    let value = match pid {
        pids::ENGINE_RPM => ((b3 as f64 * 256.0) + b4 as f64) / 4.0,
        pids::VEHICLE_SPEED => b3 as f64,
        pids::ENGINE_LOAD => b3 as f64 * (100.0 / 255.0),
        pids::COOLANT_TEMP => b3 as f64 - 40.0,
        pids::INTAKE_MAP => b3 as f64,
        pids::INTAKE_AIR_TEMP => b3 as f64 - 40.0,
        pids::MAF_RATE => ((b3 as f64 * 256.0) + b4 as f64) / 100.0,
        pids::RUN_TIME => (b3 as f64 * 256.0) + b4 as f64,
        pids::DISTANCE_WITH_MIL => (b3 as f64 * 256.0) + b4 as f64,
        pids::FUEL_TANK_LEVEL => b3 as f64 * 100.0 / 255.0,
        _ => return Reading::Unsupported { mode, pid },
    };

    let def = pid_definition(pid);
    Reading::Value {
        pid,
        name: def.map(|d| d.name).unwrap_or("Unknown"),
        value,
        unit: def.map(|d| d.unit).unwrap_or(""),
        raw: [b3, b4],
    }
}
