use anyhow::{Context, Result};
use sercap_core::{run_capture, CaptureConfig, CaptureSink, SerialConfig, SerialService};
use std::io;
use std::path::Path;

// Fixed parameters of the bench link.
const PORT_NAME: &str = "COM4";
const BAUD_RATE: u32 = 9_600;
const CAPTURE_FILE: &str = "capture.txt";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SerialConfig {
        port_name: PORT_NAME.to_string(),
        baud_rate: BAUD_RATE,
        ..Default::default()
    };

    let service = SerialService::open(config).context("serial link unavailable")?;
    let mut sink = CaptureSink::open(Path::new(CAPTURE_FILE))
        .with_context(|| format!("cannot append to {CAPTURE_FILE}"))?;

    log::info!("listening on {PORT_NAME} at {BAUD_RATE} baud");

    let stdout = io::stdout();
    run_capture(
        service.events(),
        &mut sink,
        &mut stdout.lock(),
        &CaptureConfig::default(),
    )
    .context("capture stopped")?;

    Ok(())
}
