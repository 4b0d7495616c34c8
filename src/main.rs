//! OBD-II Monitor
//!
//! Polls the engine ECU for live data over a serial-bridged CAN adapter and
//! reports decoded values on the console.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use obd2_monitor::can::SerialCanBridge;
use obd2_monitor::config::MonitorConfig;
use obd2_monitor::poller::{run, ObdPoller};
use obd2_monitor::report::ConsoleReporter;

fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let clear_dtcs = if let Some(i) = args.iter().position(|a| a == "--clear-dtcs") {
        args.remove(i);
        true
    } else {
        false
    };

    let config = match args.first() {
        Some(path) => MonitorConfig::load(path)?,
        None => {
            let config = MonitorConfig::default();
            config.validate()?;
            config
        }
    };

    info!("Opening CAN adapter on {}...", config.port);
    let transport = SerialCanBridge::open(&config.port, config.baud_rate)?;
    let mut poller = ObdPoller::new(transport, &config);

    if clear_dtcs {
        poller.clear_dtcs()?;
        return Ok(());
    }

    info!(
        "Polling {} PID(s) every {} ms (request 0x{:03X} -> response 0x{:03X}, timeout {} ms)",
        config.poll_pids.len(),
        config.poll_interval_ms,
        config.request_id,
        config.response_id,
        config.response_timeout_ms
    );

    let reporter = ConsoleReporter::new();
    run(&mut poller, &config, &reporter)?;
    Ok(())
}
