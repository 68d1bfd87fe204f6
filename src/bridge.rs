//! Sandbox-to-host signaling channel.
//!
//! The only channel out of the embedding sandbox is a one-directional text
//! stream the privileged host observes. Each signal is one line: a fixed
//! sentinel prefix followed by a JSON payload carrying a `kind` tag and a
//! correlation `id`. The host filters the stream for the sentinel, decodes,
//! and answers insertion requests with a [`Completion`] over an in-process
//! channel - the engine stays in its Expanding state until that completion
//! arrives rather than guessing with a timer.
//!
//! Signal kinds:
//! - 'mode-active' / 'mode-inactive': armed/idle transitions, drives the
//!   host-rendered "shortcuts active" indicator with a live countdown
//! - 'insertion-request': clipboard-mediated multi-message expansion
//! - 'credential-capture' / 'form-autofill': adjacent detectors that reuse
//!   the channel (outside the engine core, carried for completeness)

use std::io::{BufRead, Write};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ShortcutMessage;
use crate::error::{AtalhoError, Result};

/// Fixed sentinel prefixing every signal line on the stream
pub const SIGNAL_SENTINEL: &str = "@@ATALHO@@";

/// The encoded payload of a clipboard-mediated expansion.
///
/// Messages are already keyword-substituted with `<ENTER>` resolved to
/// newlines; `chars_to_delete` counts the activation key plus the typed
/// search text up to and including the matched command, starting at the
/// anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertionRequest {
    pub messages: Vec<ShortcutMessage>,
    pub chars_to_delete: usize,
    pub command: String,
}

/// One signal on the sandbox-to-host stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Signal {
    #[serde(rename = "mode-active", rename_all = "camelCase")]
    ModeActive { id: u64, remaining_ms: u64 },

    #[serde(rename = "mode-inactive", rename_all = "camelCase")]
    ModeInactive { id: u64 },

    #[serde(rename = "insertion-request", rename_all = "camelCase")]
    InsertionRequest {
        id: u64,
        #[serde(flatten)]
        request: InsertionRequest,
    },

    #[serde(rename = "credential-capture", rename_all = "camelCase")]
    CredentialCapture { id: u64, payload: serde_json::Value },

    #[serde(rename = "form-autofill", rename_all = "camelCase")]
    FormAutofill { id: u64, payload: serde_json::Value },
}

impl Signal {
    pub fn id(&self) -> u64 {
        match self {
            Signal::ModeActive { id, .. }
            | Signal::ModeInactive { id }
            | Signal::InsertionRequest { id, .. }
            | Signal::CredentialCapture { id, .. }
            | Signal::FormAutofill { id, .. } => *id,
        }
    }
}

/// Encode a signal as one sentinel-prefixed line (without trailing newline)
pub fn encode_line(signal: &Signal) -> Result<String> {
    let payload = serde_json::to_string(signal)?;
    Ok(format!("{SIGNAL_SENTINEL}{payload}"))
}

/// Decode a stream line, if it carries a signal.
///
/// Lines without the sentinel are ordinary log output and answer `None`;
/// sentinel lines with malformed payloads are logged and also skipped.
pub fn decode_line(line: &str) -> Option<Signal> {
    let payload = line.trim().strip_prefix(SIGNAL_SENTINEL)?;
    match serde_json::from_str(payload) {
        Ok(signal) => Some(signal),
        Err(e) => {
            warn!(error = %e, "Malformed signal payload, skipping line");
            None
        }
    }
}

/// Sandbox-side handle that emits signals onto the stream.
///
/// Clones share the same sink so one surface's engine and its adjacent
/// detectors interleave whole lines, never partial ones.
#[derive(Clone)]
pub struct SandboxSignaler {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl SandboxSignaler {
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        SandboxSignaler {
            sink: Arc::new(Mutex::new(Box::new(sink))),
        }
    }

    /// Emit onto the process stdout stream (the host tails it)
    pub fn stdout() -> Self {
        SandboxSignaler::new(std::io::stdout())
    }

    pub fn emit(&self, signal: &Signal) -> Result<()> {
        let line = encode_line(signal)?;
        let mut sink = self.sink.lock();
        writeln!(sink, "{line}").map_err(|e| AtalhoError::Driver(e.to_string()))?;
        sink.flush().map_err(|e| AtalhoError::Driver(e.to_string()))?;
        debug!(id = signal.id(), "Emitted bridge signal");
        Ok(())
    }
}

/// Host-side decoder over the observed stream
pub struct HostEndpoint<R: BufRead> {
    reader: R,
}

impl<R: BufRead> HostEndpoint<R> {
    pub fn new(reader: R) -> Self {
        HostEndpoint { reader }
    }

    /// Next decoded signal, skipping non-signal and malformed lines.
    /// Returns `None` at end of stream.
    pub fn next_signal(&mut self) -> Option<Signal> {
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {
                    if let Some(signal) = decode_line(&line) {
                        return Some(signal);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read from signal stream");
                    return None;
                }
            }
        }
    }
}

/// Host answer for one insertion request, correlated by id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub id: u64,
    pub ok: bool,
}

/// Channel carrying completions back from the host executor.
///
/// The embedder forwards received completions into the owning engine as
/// [`crate::engine::EngineEvent::InsertionComplete`].
pub fn completion_channel() -> (Sender<Completion>, Receiver<Completion>) {
    channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn request() -> InsertionRequest {
        InsertionRequest {
            messages: vec![ShortcutMessage::new("Olá, bom dia!", false)],
            chars_to_delete: 3,
            command: "oi".to_string(),
        }
    }

    #[test]
    fn test_encode_line_shape() {
        let line = encode_line(&Signal::ModeInactive { id: 7 }).unwrap();
        assert!(line.starts_with(SIGNAL_SENTINEL));
        assert!(line.contains(r#""kind":"mode-inactive""#));
        assert!(line.contains(r#""id":7"#));
    }

    #[test]
    fn test_insertion_request_wire_fields() {
        let line = encode_line(&Signal::InsertionRequest {
            id: 1,
            request: request(),
        })
        .unwrap();
        assert!(line.contains(r#""kind":"insertion-request""#));
        assert!(line.contains(r#""charsToDelete":3"#));
        assert!(line.contains(r#""autoSend":false"#));
    }

    #[test]
    fn test_roundtrip() {
        let signal = Signal::InsertionRequest {
            id: 42,
            request: request(),
        };
        let line = encode_line(&signal).unwrap();
        assert_eq!(decode_line(&line), Some(signal));
    }

    #[test]
    fn test_decode_skips_plain_log_lines() {
        assert_eq!(decode_line("just an ordinary log line"), None);
    }

    #[test]
    fn test_decode_skips_malformed_payload() {
        assert_eq!(decode_line("@@ATALHO@@{not json"), None);
    }

    #[test]
    fn test_endpoint_filters_stream() {
        let mode = encode_line(&Signal::ModeActive {
            id: 1,
            remaining_ms: 10_000,
        })
        .unwrap();
        let req = encode_line(&Signal::InsertionRequest {
            id: 2,
            request: request(),
        })
        .unwrap();
        let stream = format!("noise\n{mode}\nmore noise\n@@ATALHO@@broken\n{req}\n");

        let mut endpoint = HostEndpoint::new(Cursor::new(stream));
        assert!(matches!(
            endpoint.next_signal(),
            Some(Signal::ModeActive { id: 1, .. })
        ));
        assert!(matches!(
            endpoint.next_signal(),
            Some(Signal::InsertionRequest { id: 2, .. })
        ));
        assert_eq!(endpoint.next_signal(), None);
    }

    #[test]
    fn test_signaler_writes_lines() {
        #[derive(Clone)]
        struct SharedBuf(Arc<Mutex<Vec<u8>>>);
        impl Write for SharedBuf {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let buf = SharedBuf(Arc::new(Mutex::new(Vec::new())));
        let signaler = SandboxSignaler::new(buf.clone());
        signaler.emit(&Signal::ModeInactive { id: 3 }).unwrap();
        signaler
            .emit(&Signal::ModeActive {
                id: 4,
                remaining_ms: 500,
            })
            .unwrap();

        let written = String::from_utf8(buf.0.lock().clone()).unwrap();
        let signals: Vec<Signal> = written.lines().filter_map(decode_line).collect();
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].id(), 3);
        assert_eq!(signals[1].id(), 4);
    }
}
