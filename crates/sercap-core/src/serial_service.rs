use crossbeam_channel::{unbounded, Receiver, Sender};
use std::io::Read;
use std::time::Duration;

use crate::error::CoreError;

/// Fixed parameters of the capture link.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: serialport::DataBits,
    pub parity: serialport::Parity,
    pub stop_bits: serialport::StopBits,
    pub flow_control: serialport::FlowControl,
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: 9_600,
            data_bits: serialport::DataBits::Eight,
            parity: serialport::Parity::None,
            stop_bits: serialport::StopBits::One,
            flow_control: serialport::FlowControl::None,
            timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SerialEvent {
    Opened(String),
    Rx(Vec<u8>),
    Error(String),
    Closed,
}

enum Command {
    Close,
}

/// Handle to a background reader thread owning the open port.
///
/// The worker emits exactly one `Closed` per lifetime and releases the
/// port handle when it returns, whether shutdown was requested or the
/// port failed.
pub struct SerialService {
    cfg: SerialConfig,
    tx_cmd: Sender<Command>,
    rx_evt: Receiver<SerialEvent>,
}

impl SerialService {
    /// Opens the port and starts the reader worker.
    ///
    /// Open failures are reported here, before any thread is spawned.
    pub fn open(cfg: SerialConfig) -> Result<Self, CoreError> {
        let port = serialport::new(&cfg.port_name, cfg.baud_rate)
            .data_bits(cfg.data_bits)
            .parity(cfg.parity)
            .stop_bits(cfg.stop_bits)
            .flow_control(cfg.flow_control)
            .timeout(cfg.timeout)
            .open()
            .map_err(|source| CoreError::Open {
                port: cfg.port_name.clone(),
                source,
            })?;

        let (tx_cmd, rx_cmd) = unbounded::<Command>();
        let (tx_evt, rx_evt) = unbounded::<SerialEvent>();
        let port_name = cfg.port_name.clone();

        std::thread::spawn(move || reader_loop(port, port_name, rx_cmd, tx_evt));

        Ok(Self { cfg, tx_cmd, rx_evt })
    }

    pub fn close(&self) {
        let _ = self.tx_cmd.send(Command::Close);
    }

    pub fn events(&self) -> &Receiver<SerialEvent> {
        &self.rx_evt
    }

    pub fn config(&self) -> &SerialConfig {
        &self.cfg
    }
}

impl Drop for SerialService {
    fn drop(&mut self) {
        let _ = self.tx_cmd.send(Command::Close);
    }
}

fn reader_loop(
    mut port: Box<dyn serialport::SerialPort>,
    port_name: String,
    rx_cmd: Receiver<Command>,
    tx_evt: Sender<SerialEvent>,
) {
    let _ = tx_evt.send(SerialEvent::Opened(port_name));
    let mut buf = [0u8; 4096];
    loop {
        // The configured timeout bounds this read; no busy wait.
        match port.read(&mut buf) {
            Ok(n) if n > 0 => {
                let _ = tx_evt.send(SerialEvent::Rx(buf[..n].to_vec()));
            }
            Ok(_) => {}
            Err(e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                let _ = tx_evt.send(SerialEvent::Error(e.to_string()));
                let _ = tx_evt.send(SerialEvent::Closed);
                return;
            }
        }
        while let Ok(cmd) = rx_cmd.try_recv() {
            match cmd {
                Command::Close => {
                    let _ = tx_evt.send(SerialEvent::Closed);
                    return;
                }
            }
        }
    }
}
