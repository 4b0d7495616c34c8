//! Monitor configuration.
//!
//! Everything is fixed for the lifetime of the process. Defaults match the
//! common adapter setup (500 kbaud serial link) and the standard OBD-II
//! addressing; a JSON file can override any field.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::obd::{can_ids, pids};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Serial port of the CAN adapter
    pub port: String,
    /// Serial link baud rate (adapter side, not the CAN bit rate)
    pub baud_rate: u32,
    /// Functional (broadcast) request identifier
    pub request_id: u16,
    /// Expected responder identifier
    pub response_id: u16,
    /// Per-request response timeout in milliseconds
    pub response_timeout_ms: u64,
    /// Delay between consecutive PID requests within one cycle
    pub inter_request_delay_ms: u64,
    /// Outer polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Mode 01 PIDs polled each cycle
    pub poll_pids: Vec<u8>,
    /// Also query stored DTCs each cycle
    pub poll_stored_dtcs: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 500_000,
            request_id: can_ids::FUNCTIONAL_REQ,
            response_id: can_ids::ECU_RESPONSE,
            response_timeout_ms: 200,
            inter_request_delay_ms: 50,
            poll_interval_ms: 1000,
            poll_pids: vec![
                pids::ENGINE_RPM,
                pids::VEHICLE_SPEED,
                pids::COOLANT_TEMP,
            ],
            poll_stored_dtcs: false,
        }
    }
}

impl MonitorConfig {
    /// Load a config file, falling back to defaults for missing fields.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self =
            serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the protocol layer cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.request_id > 0x7FF || self.response_id > 0x7FF {
            anyhow::bail!("CAN identifiers must fit in 11 bits");
        }
        if self.response_timeout_ms == 0 {
            anyhow::bail!("response timeout must be nonzero");
        }
        if self.poll_pids.is_empty() && !self.poll_stored_dtcs {
            anyhow::bail!("nothing to poll: configure poll_pids or poll_stored_dtcs");
        }
        Ok(())
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_millis(self.inter_request_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
