use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::encoding::TextEncoding;
use crate::error::CoreError;
use crate::framing::LineFramer;
use crate::serial_service::SerialEvent;

/// Append-only destination for captured bytes.
///
/// Opened once and held; every append is flushed so each captured line is
/// durable on its own.
pub struct CaptureSink {
    path: PathBuf,
    file: File,
}

impl CaptureSink {
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| CoreError::Sink {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Appends raw bytes exactly as received, terminators included.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), CoreError> {
        self.file
            .write_all(bytes)
            .and_then(|()| self.file.flush())
            .map_err(|source| CoreError::Sink {
                path: self.path.clone(),
                source,
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Quiet period after which an unterminated tail is written out.
    pub idle_flush: Duration,
    /// Pending bytes above this are written out without waiting for a
    /// terminator, bounding the assembly buffer.
    pub max_pending: usize,
    /// Console echo decoding.
    pub encoding: TextEncoding,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            idle_flush: Duration::from_millis(100),
            max_pending: 1024,
            encoding: TextEncoding::Ascii,
        }
    }
}

/// Drains serial events until the worker closes, appending each framed
/// line to the sink and echoing its decoded text.
///
/// Failure policy: read timeouts are silent, worker-reported serial
/// errors are logged and become fatal once the worker closes, sink and
/// echo write failures are fatal immediately.
pub fn run_capture<W: Write>(
    events: &Receiver<SerialEvent>,
    sink: &mut CaptureSink,
    echo: &mut W,
    cfg: &CaptureConfig,
) -> Result<(), CoreError> {
    let mut framer = LineFramer::new();
    let mut worker_error: Option<String> = None;

    loop {
        match events.recv_timeout(cfg.idle_flush) {
            Ok(SerialEvent::Opened(port)) => {
                log::info!("capturing from {} into {}", port, sink.path().display());
            }
            Ok(SerialEvent::Rx(data)) => {
                log::debug!("rx {} bytes: {}", data.len(), hex::encode(&data));
                framer.push(&data);
                while let Some(line) = framer.pop_line() {
                    emit(sink, echo, &line, cfg.encoding)?;
                }
                if framer.pending() > cfg.max_pending {
                    if let Some(chunk) = framer.flush() {
                        emit(sink, echo, &chunk, cfg.encoding)?;
                    }
                }
            }
            Ok(SerialEvent::Error(e)) => {
                log::warn!("serial error: {}", e);
                worker_error = Some(e);
            }
            Ok(SerialEvent::Closed) => {
                if let Some(chunk) = framer.flush() {
                    emit(sink, echo, &chunk, cfg.encoding)?;
                }
                return match worker_error {
                    Some(e) => Err(CoreError::Port(e)),
                    None => Ok(()),
                };
            }
            Err(RecvTimeoutError::Timeout) => {
                if let Some(chunk) = framer.flush() {
                    emit(sink, echo, &chunk, cfg.encoding)?;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                if let Some(chunk) = framer.flush() {
                    emit(sink, echo, &chunk, cfg.encoding)?;
                }
                return Err(CoreError::Disconnected);
            }
        }
    }
}

fn emit<W: Write>(
    sink: &mut CaptureSink,
    echo: &mut W,
    bytes: &[u8],
    encoding: TextEncoding,
) -> Result<(), CoreError> {
    sink.append(bytes)?;

    if encoding == TextEncoding::Ascii && !bytes.is_ascii() {
        log::warn!("non-ascii bytes in line, echoing with replacements");
    }
    let text = encoding.decode(bytes);
    echo.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        echo.write_all(b"\n")?;
    }
    echo.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use tempfile::tempdir;

    fn sink_in(dir: &tempfile::TempDir) -> (PathBuf, CaptureSink) {
        let path = dir.path().join("capture.txt");
        let sink = CaptureSink::open(&path).unwrap();
        (path, sink)
    }

    #[test]
    fn sink_appends_across_reopens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.txt");

        CaptureSink::open(&path).unwrap().append(b"first\n").unwrap();
        CaptureSink::open(&path).unwrap().append(b"second\n").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"first\nsecond\n");
    }

    #[test]
    fn one_cycle_appends_exactly_the_received_bytes() {
        let dir = tempdir().unwrap();
        let (path, mut sink) = sink_in(&dir);
        let (tx, rx) = unbounded();
        tx.send(SerialEvent::Opened("sim".into())).unwrap();
        tx.send(SerialEvent::Rx(b"0A 1B\n".to_vec())).unwrap();
        tx.send(SerialEvent::Closed).unwrap();

        let mut echo = Vec::new();
        run_capture(&rx, &mut sink, &mut echo, &CaptureConfig::default()).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"0A 1B\n");
        assert_eq!(echo, b"0A 1B\n");
    }

    #[test]
    fn unterminated_tail_is_flushed_on_close() {
        let dir = tempdir().unwrap();
        let (path, mut sink) = sink_in(&dir);
        let (tx, rx) = unbounded();
        tx.send(SerialEvent::Rx(b"no terminator".to_vec())).unwrap();
        tx.send(SerialEvent::Closed).unwrap();

        let mut echo = Vec::new();
        run_capture(&rx, &mut sink, &mut echo, &CaptureConfig::default()).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"no terminator");
        assert_eq!(echo, b"no terminator\n");
    }

    #[test]
    fn oversize_pending_is_written_without_a_terminator() {
        let dir = tempdir().unwrap();
        let (path, mut sink) = sink_in(&dir);
        let (tx, rx) = unbounded();
        tx.send(SerialEvent::Rx(b"abcdefgh".to_vec())).unwrap();
        tx.send(SerialEvent::Closed).unwrap();

        let cfg = CaptureConfig {
            max_pending: 4,
            ..Default::default()
        };
        let mut echo = Vec::new();
        run_capture(&rx, &mut sink, &mut echo, &cfg).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"abcdefgh");
    }

    #[test]
    fn worker_error_is_fatal_after_close() {
        let dir = tempdir().unwrap();
        let (_path, mut sink) = sink_in(&dir);
        let (tx, rx) = unbounded();
        tx.send(SerialEvent::Error("device reports readiness to read but returned no data".into()))
            .unwrap();
        tx.send(SerialEvent::Closed).unwrap();

        let mut echo = Vec::new();
        let err = run_capture(&rx, &mut sink, &mut echo, &CaptureConfig::default()).unwrap_err();
        assert!(matches!(err, CoreError::Port(_)));
    }

    #[test]
    fn non_ascii_echo_is_replaced_not_fatal() {
        let dir = tempdir().unwrap();
        let (path, mut sink) = sink_in(&dir);
        let (tx, rx) = unbounded();
        tx.send(SerialEvent::Rx(vec![0xDE, 0xAD, b'\n'])).unwrap();
        tx.send(SerialEvent::Closed).unwrap();

        let mut echo = Vec::new();
        run_capture(&rx, &mut sink, &mut echo, &CaptureConfig::default()).unwrap();

        // Raw bytes land in the file; the console view is replaced.
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xDE, 0xAD, b'\n']);
        assert_eq!(echo, b"??\n");
    }
}
