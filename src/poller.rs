//! Request/response polling against the ECU.
//!
//! One exchange: encode and send the request on the broadcast identifier,
//! then poll the transport until the matching response arrives or the
//! deadline passes. The outer loop re-issues requests every poll interval
//! regardless of the previous outcome.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, trace, warn};

use crate::can::CanTransport;
use crate::config::MonitorConfig;
use crate::decode::{decode, Reading};
use crate::error::TransportError;
use crate::obd::{modes, nrc_description, ObdRequest};
use crate::report::ConsoleReporter;

/// Outcome of one request/response exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Matched positive response, decoded
    Reading(Reading),
    /// ECU negative response with its reason code
    Rejected { nrc: u8 },
    /// Deadline elapsed with no matching frame
    NoResponse,
}

pub struct ObdPoller<T: CanTransport> {
    transport: T,
    request_id: u16,
    response_id: u16,
    response_timeout: Duration,
}

impl<T: CanTransport> ObdPoller<T> {
    pub fn new(transport: T, config: &MonitorConfig) -> Self {
        Self {
            transport,
            request_id: config.request_id,
            response_id: config.response_id,
            response_timeout: config.response_timeout(),
        }
    }

    /// Issue one diagnostic request and wait for the matching response.
    ///
    /// Frames on other arbitration IDs, and frames on the responder ID that
    /// do not echo the request, are discarded without ending the wait.
    pub fn read_data(&mut self, request: ObdRequest) -> Result<PollOutcome, TransportError> {
        self.transport.send(&request.to_can_frame(self.request_id))?;
        let deadline = Instant::now() + self.response_timeout;

        while Instant::now() < deadline {
            let frame = match self.transport.try_receive()? {
                Some(frame) => frame,
                None => {
                    thread::sleep(Duration::from_millis(1));
                    continue;
                }
            };

            if frame.id != self.response_id {
                trace!("Ignoring frame on ID 0x{:03X}", frame.id);
                continue;
            }

            if frame.data[1] == request.mode + modes::POSITIVE_RESPONSE_OFFSET
                && frame.data[2] == request.pid
            {
                return Ok(PollOutcome::Reading(decode(
                    request.mode,
                    request.pid,
                    &frame.data,
                )));
            }

            if frame.data[1] == modes::NEGATIVE_RESPONSE && frame.data[2] == request.mode {
                let nrc = frame.data[3];
                warn!(
                    "ECU rejected mode 0x{:02X}: {} (NRC 0x{:02X})",
                    request.mode,
                    nrc_description(nrc),
                    nrc
                );
                return Ok(PollOutcome::Rejected { nrc });
            }

            trace!("Discarding mismatched echo: {:02X?}", frame.data);
        }

        Ok(PollOutcome::NoResponse)
    }

    /// Mode 01 live data poll.
    pub fn read_pid(&mut self, pid: u8) -> Result<PollOutcome, TransportError> {
        self.read_data(ObdRequest::current_data(pid))
    }

    /// Mode 03 stored DTC poll.
    pub fn read_stored_dtcs(&mut self) -> Result<PollOutcome, TransportError> {
        self.read_data(ObdRequest::stored_dtcs())
    }

    /// Access the owned transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fire-and-forget Mode 04 clear request. No confirmation is awaited.
    pub fn clear_dtcs(&mut self) -> Result<(), TransportError> {
        self.transport
            .send(&ObdRequest::clear_dtcs().to_can_frame(self.request_id))?;
        info!("Clear DTCs request sent");
        Ok(())
    }
}

/// Outer scheduling loop: poll each configured PID, report, sleep, repeat.
///
/// Runs until a transport error surfaces. There is no backpressure: requests
/// are issued strictly periodically, independent of ECU load.
pub fn run<T: CanTransport>(
    poller: &mut ObdPoller<T>,
    config: &MonitorConfig,
    reporter: &ConsoleReporter,
) -> Result<(), TransportError> {
    loop {
        for &pid in &config.poll_pids {
            let outcome = poller.read_pid(pid)?;
            reporter.report_pid(pid, &outcome);
            thread::sleep(config.inter_request_delay());
        }

        if config.poll_stored_dtcs {
            let outcome = poller.read_stored_dtcs()?;
            reporter.report_stored_dtcs(&outcome);
        }

        thread::sleep(config.poll_interval());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::can::mock::MockTransport;

    fn fast_config() -> MonitorConfig {
        MonitorConfig {
            response_timeout_ms: 40,
            ..MonitorConfig::default()
        }
    }

    #[test]
    fn test_timeout_returns_no_response_after_deadline() {
        let mut poller = ObdPoller::new(MockTransport::new(), &fast_config());

        let start = Instant::now();
        let outcome = poller.read_data(ObdRequest::current_data(0x0C)).unwrap();
        let elapsed = start.elapsed();

        assert_eq!(outcome, PollOutcome::NoResponse);
        assert!(elapsed >= Duration::from_millis(40), "returned early: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(500), "returned far too late: {:?}", elapsed);
    }

    #[test]
    fn test_wrong_pid_echo_does_not_end_wait() {
        let mut transport = MockTransport::new();
        // Correct responder ID, wrong PID echo
        transport.queue_response(0x7E8, [0x04, 0x41, 0x0D, 0x3C, 0x00, 0, 0, 0]);
        let mut poller = ObdPoller::new(transport, &fast_config());

        let start = Instant::now();
        let outcome = poller.read_data(ObdRequest::current_data(0x0C)).unwrap();

        assert_eq!(outcome, PollOutcome::NoResponse);
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_foreign_id_is_discarded() {
        let mut transport = MockTransport::new();
        transport.queue_response(0x7E0, [0x04, 0x41, 0x0C, 0xFF, 0xFF, 0, 0, 0]);
        transport.queue_response(0x7E8, [0x04, 0x41, 0x0C, 0x1A, 0xF8, 0, 0, 0]);
        let mut poller = ObdPoller::new(transport, &fast_config());

        let outcome = poller.read_data(ObdRequest::current_data(0x0C)).unwrap();
        match outcome {
            PollOutcome::Reading(Reading::Value { value, .. }) => assert_eq!(value, 1726.0),
            other => panic!("expected decoded RPM, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_response_is_surfaced() {
        let mut transport = MockTransport::new();
        transport.queue_response(0x7E8, [0x03, 0x7F, 0x01, 0x22, 0x00, 0, 0, 0]);
        let mut poller = ObdPoller::new(transport, &fast_config());

        let outcome = poller.read_data(ObdRequest::current_data(0x0C)).unwrap();
        assert_eq!(outcome, PollOutcome::Rejected { nrc: 0x22 });
    }

    #[test]
    fn test_clear_dtcs_frame_on_broadcast_id() {
        let mut poller = ObdPoller::new(MockTransport::new(), &fast_config());
        poller.clear_dtcs().unwrap();

        let sent = &poller.transport.sent;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id, 0x7DF);
        assert_eq!(sent[0].data, [0x02, 0x04, 0x00, 0, 0, 0, 0, 0]);
    }
}
