//! Core functionalities: serial I/O, line framing, capture sink, text decoding.

pub mod capture;
pub mod encoding;
pub mod error;
pub mod framing;
pub mod serial_service;

pub use capture::{run_capture, CaptureConfig, CaptureSink};
pub use encoding::TextEncoding;
pub use error::CoreError;
pub use framing::LineFramer;
pub use serial_service::{SerialConfig, SerialEvent, SerialService};
