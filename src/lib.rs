//! OBD-II live data monitor for serial-bridged CAN adapters.
//!
//! Sends ISO 15031-5 diagnostic requests on the functional broadcast
//! identifier, waits for the matching ECU response within a deadline, and
//! decodes standard PIDs into physical units. Single-threaded by design:
//! one request in flight at a time, one responding ECU.

pub mod can;
pub mod config;
pub mod decode;
pub mod error;
pub mod obd;
pub mod poller;
pub mod report;

#[cfg(test)]
mod integration_tests;
