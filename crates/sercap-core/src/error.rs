use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the capture pipeline.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("capture file {path}: {source}")]
    Sink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("console echo: {0}")]
    Echo(#[from] io::Error),

    #[error("serial port failed: {0}")]
    Port(String),

    #[error("serial worker disconnected")]
    Disconnected,
}
