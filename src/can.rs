//! CAN transport layer.
//!
//! The monitor reaches the vehicle bus through a USB CAN adapter that
//! bridges CAN frames onto a serial stream. The adapter firmware exchanges
//! raw frames as fixed 12-byte records:
//!
//! `[LEN] [ID_HI] [ID_LO] [DATA x 8]`
//!
//! where LEN is always 12 and the ID is an 11-bit CAN identifier. The serial
//! link runs at 500 kbaud, matching the adapter's CAN-side bit rate
//! configuration (500 kbps, 16 MHz oscillator, listen-any acceptance).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::error::TransportError;

/// Length of one adapter record on the serial link.
pub const BRIDGE_RECORD_LEN: usize = 12;

/// A classic CAN data frame with an 11-bit identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanFrame {
    pub id: u16,
    pub data: [u8; 8],
}

impl CanFrame {
    pub fn new(id: u16, data: [u8; 8]) -> Self {
        Self { id, data }
    }
}

/// Send/receive primitives over the CAN bus.
///
/// The poller owns exactly one transport for its whole lifetime.
/// Implementations may block briefly in `try_receive` but must not wait for
/// a frame to arrive; returning `None` means nothing is pending right now.
pub trait CanTransport {
    fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError>;

    /// Returns the next pending frame, or `None` when nothing is buffered.
    fn try_receive(&mut self) -> Result<Option<CanFrame>, TransportError>;
}

fn encode_record(frame: &CanFrame) -> [u8; BRIDGE_RECORD_LEN] {
    let mut record = [0u8; BRIDGE_RECORD_LEN];
    record[0] = BRIDGE_RECORD_LEN as u8;
    record[1] = (frame.id >> 8) as u8;
    record[2] = (frame.id & 0xFF) as u8;
    record[3..11].copy_from_slice(&frame.data);
    record
}

// Adapter records must land on the link whole; a partial write desyncs the
// receive side's record framing.
fn write_record(w: &mut dyn std::io::Write, record: &[u8]) -> std::io::Result<()> {
    w.write_all(record)
}

fn decode_record(record: &[u8]) -> CanFrame {
    let id = ((record[1] as u16) << 8) | record[2] as u16;
    let mut data = [0u8; 8];
    data.copy_from_slice(&record[3..11]);
    CanFrame { id, data }
}

/// Serial-bridged CAN adapter.
pub struct SerialCanBridge {
    port: Box<dyn serialport::SerialPort>,
    rx_buf: Vec<u8>,
}

impl SerialCanBridge {
    /// Open the adapter's serial port and flush any stale traffic.
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self, TransportError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(1))
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|e| TransportError::Open {
                port: port_name.to_string(),
                source: e,
            })?;

        port.clear(serialport::ClearBuffer::All)?;

        info!("Connected to {} at {} baud", port_name, baud_rate);

        Ok(Self {
            port,
            rx_buf: Vec::new(),
        })
    }
}

impl CanTransport for SerialCanBridge {
    fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError> {
        let record = encode_record(frame);
        debug!("TX ID=0x{:03X}: {:02X?}", frame.id, frame.data);
        write_record(&mut self.port, &record)?;
        Ok(())
    }

    fn try_receive(&mut self) -> Result<Option<CanFrame>, TransportError> {
        let pending = self.port.bytes_to_read()? as usize;
        if pending > 0 {
            let mut buf = vec![0u8; pending];
            match self.port.read(&mut buf) {
                Ok(n) => self.rx_buf.extend_from_slice(&buf[..n]),
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => return Err(e.into()),
            }
        }

        // Resync on the record length marker if the stream drifts.
        while let Some(&first) = self.rx_buf.first() {
            if first == BRIDGE_RECORD_LEN as u8 {
                break;
            }
            self.rx_buf.remove(0);
        }

        if self.rx_buf.len() < BRIDGE_RECORD_LEN {
            return Ok(None);
        }

        let record: Vec<u8> = self.rx_buf.drain(..BRIDGE_RECORD_LEN).collect();
        let frame = decode_record(&record);
        trace!("RX ID=0x{:03X}: {:02X?}", frame.id, frame.data);
        Ok(Some(frame))
    }
}
