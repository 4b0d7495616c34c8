//! Integration tests with realistic OBD-II traffic.
//!
//! These simulate complete request/response cycles against a scripted
//! transport standing in for the vehicle's engine ECU.

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use crate::can::mock::MockTransport;
    use crate::config::MonitorConfig;
    use crate::decode::Reading;
    use crate::obd::{pids, ObdRequest};
    use crate::poller::{ObdPoller, PollOutcome};
    use crate::report::format_outcome;

    // ========================================================================
    // REALISTIC ECU TRAFFIC
    // ========================================================================

    fn test_config() -> MonitorConfig {
        MonitorConfig {
            response_timeout_ms: 40,
            ..MonitorConfig::default()
        }
    }

    /// Positive response payload: `[len, mode+0x40, pid, b3, b4, 0, 0, 0]`
    fn positive(mode: u8, pid: u8, b3: u8, b4: u8) -> [u8; 8] {
        [0x04, mode + 0x40, pid, b3, b4, 0, 0, 0]
    }

    fn expect_value(outcome: PollOutcome) -> f64 {
        match outcome {
            PollOutcome::Reading(Reading::Value { value, .. }) => value,
            other => panic!("expected a decoded value, got {:?}", other),
        }
    }

    #[test]
    fn test_idle_engine_snapshot() {
        // Warm idle: 850 rpm, stationary, 92 °C coolant
        let mut transport = MockTransport::new();
        transport.queue_response(0x7E8, positive(0x01, pids::ENGINE_RPM, 0x0D, 0x48));
        let mut poller = ObdPoller::new(transport, &test_config());

        let rpm = expect_value(poller.read_pid(pids::ENGINE_RPM).unwrap());
        assert_eq!(rpm, 850.0);
    }

    #[test]
    fn test_request_frames_on_the_wire() {
        let mut poller = ObdPoller::new(MockTransport::new(), &test_config());
        let _ = poller.read_pid(pids::COOLANT_TEMP).unwrap();
        let _ = poller.read_stored_dtcs().unwrap();

        let sent = &poller.transport().sent;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].id, 0x7DF);
        assert_eq!(sent[0].data, [0x02, 0x01, 0x05, 0, 0, 0, 0, 0]);
        assert_eq!(sent[1].data, [0x01, 0x03, 0x00, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_highway_cruise_cycle() {
        let config = test_config();
        let mut transport = MockTransport::new();
        transport.queue_response(0x7E8, positive(0x01, pids::ENGINE_RPM, 0x1F, 0x40)); // 2000 rpm
        let mut poller = ObdPoller::new(transport, &config);
        assert_eq!(
            expect_value(poller.read_pid(pids::ENGINE_RPM).unwrap()),
            2000.0
        );
    }

    #[test]
    fn test_o2_sensor_workflow() {
        let mut transport = MockTransport::new();
        transport.queue_response(0x7E8, positive(0x05, 0x05, 100, 148));
        let mut poller = ObdPoller::new(transport, &test_config());

        let outcome = poller.read_data(ObdRequest::o2_sensor(0x05)).unwrap();
        match outcome {
            PollOutcome::Reading(Reading::O2Sensor { voltage, fuel_trim }) => {
                assert!((voltage - 0.5).abs() < 1e-9);
                assert!((fuel_trim - 20.0).abs() < 1e-9);
            }
            other => panic!("expected O2 reading, got {:?}", other),
        }
    }

    #[test]
    fn test_stored_dtc_workflow() {
        // P0133: O2 sensor circuit slow response (Bank 1 Sensor 1)
        let mut transport = MockTransport::new();
        transport.queue_response(0x7E8, positive(0x03, 0x00, 0x01, 0x33));
        let mut poller = ObdPoller::new(transport, &test_config());

        let outcome = poller.read_stored_dtcs().unwrap();
        match &outcome {
            PollOutcome::Reading(Reading::StoredDtc(dtc)) => assert_eq!(dtc.code, "P0133"),
            other => panic!("expected a stored DTC, got {:?}", other),
        }
        assert_eq!(format_outcome(0x00, &outcome), "Stored DTC: P0133 (0x0133)");
    }

    #[test]
    fn test_chatter_before_match_is_skipped() {
        let mut transport = MockTransport::new();
        // Normal bus chatter on other identifiers, then a stale echo on the
        // responder ID, then the real response
        transport.queue_response(0x0AA, [0x12; 8]);
        transport.queue_response(0x1D0, [0x34; 8]);
        transport.queue_response(0x7E8, positive(0x01, pids::VEHICLE_SPEED, 0x3C, 0x00));
        transport.queue_response(0x7E8, positive(0x01, pids::ENGINE_RPM, 0x0D, 0x48));
        let mut poller = ObdPoller::new(transport, &test_config());

        let rpm = expect_value(poller.read_pid(pids::ENGINE_RPM).unwrap());
        assert_eq!(rpm, 850.0);
    }

    #[test]
    fn test_unsupported_pid_distinct_from_timeout() {
        let config = test_config();

        // ECU answers a PID the decode table does not know
        let mut transport = MockTransport::new();
        transport.queue_response(0x7E8, positive(0x01, 0x99, 0x12, 0x34));
        let mut poller = ObdPoller::new(transport, &config);
        let answered = poller.read_pid(0x99).unwrap();
        assert_eq!(
            answered,
            PollOutcome::Reading(Reading::Unsupported {
                mode: 0x01,
                pid: 0x99
            })
        );

        // Silent ECU
        let mut poller = ObdPoller::new(MockTransport::new(), &config);
        let silent = poller.read_pid(0x99).unwrap();
        assert_eq!(silent, PollOutcome::NoResponse);

        assert_ne!(answered, silent);
    }

    #[test]
    fn test_busy_ecu_answers_before_deadline() {
        let mut transport = MockTransport::new();
        transport.queue_response(0x7E8, [0x03, 0x7F, 0x01, 0x21, 0, 0, 0, 0]);
        let mut poller = ObdPoller::new(transport, &test_config());

        let start = Instant::now();
        let outcome = poller.read_pid(pids::ENGINE_RPM).unwrap();
        assert_eq!(outcome, PollOutcome::Rejected { nrc: 0x21 });
        assert!(start.elapsed() < Duration::from_millis(40));
    }
}
