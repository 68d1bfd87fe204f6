//! Privileged host executor for clipboard-mediated insertion.
//!
//! Runs outside the sandbox with access to the OS clipboard and a driver for
//! the focused surface. Requests are processed strictly sequentially; every
//! step failure is logged and the sequence continues, because half an
//! expansion in the user's conversation beats a dialog box. The clipboard is
//! snapshotted before the first write and restored after the last step.
//!
//! Per request:
//! 1. snapshot the clipboard;
//! 2. delete the trigger text with discrete backspace key events (before the
//!    first message only);
//! 3. per message: clipboard write, focus, paste, and for auto-send messages
//!    a settle delay followed by locating and clicking the send control;
//! 4. inter-message delay between messages;
//! 5. restore the snapshot after a final delay, then answer the completion.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::bridge::{Completion, HostEndpoint, InsertionRequest, Signal};
use crate::clipboard::ClipboardAccess;
use crate::error::ResultExt;
use crate::locator::{ControlNode, NodePath, OriginAdapters};

/// Delay between discrete backspace key events
pub const KEYSTROKE_DELAY_MS: u64 = 10;

/// Delay after paste before locating the send control
pub const SETTLE_DELAY_MS: u64 = 150;

/// Delay between consecutive messages of one request
pub const INTER_MESSAGE_DELAY_MS: u64 = 250;

/// Delay before the clipboard snapshot is restored
pub const CLIPBOARD_RESTORE_DELAY_MS: u64 = 500;

/// Pacing configuration for the insertion sequence
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub keystroke_delay: Duration,
    pub settle_delay: Duration,
    pub inter_message_delay: Duration,
    pub clipboard_restore_delay: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            keystroke_delay: Duration::from_millis(KEYSTROKE_DELAY_MS),
            settle_delay: Duration::from_millis(SETTLE_DELAY_MS),
            inter_message_delay: Duration::from_millis(INTER_MESSAGE_DELAY_MS),
            clipboard_restore_delay: Duration::from_millis(CLIPBOARD_RESTORE_DELAY_MS),
        }
    }
}

impl ExecutorConfig {
    /// Zero-delay configuration for tests
    pub fn immediate() -> Self {
        ExecutorConfig {
            keystroke_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
            inter_message_delay: Duration::ZERO,
            clipboard_restore_delay: Duration::ZERO,
        }
    }
}

/// Privileged driver over the focused surface.
///
/// Implementations wrap whatever automation channel the host has for the
/// embedded view: synthetic key events, focus, paste and element clicks.
pub trait SurfaceDriver {
    /// Origin of the page the surface renders, for adapter selection
    fn origin(&self) -> String;
    fn key_down(&mut self, key: &str) -> Result<()>;
    fn key_up(&mut self, key: &str) -> Result<()>;
    fn focus_input(&mut self) -> Result<()>;
    /// Paste the current clipboard content at the caret
    fn paste(&mut self) -> Result<()>;
    /// Snapshot of the surface's control tree for send-control location
    fn control_tree(&mut self) -> Result<ControlNode>;
    fn click(&mut self, path: &NodePath) -> Result<()>;
}

/// Sequential executor for insertion requests
pub struct ActionExecutor {
    config: ExecutorConfig,
    clipboard: Box<dyn ClipboardAccess>,
    adapters: OriginAdapters,
}

impl ActionExecutor {
    pub fn new(clipboard: impl ClipboardAccess + 'static) -> Self {
        ActionExecutor {
            config: ExecutorConfig::default(),
            clipboard: Box::new(clipboard),
            adapters: OriginAdapters::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_adapters(mut self, adapters: OriginAdapters) -> Self {
        self.adapters = adapters;
        self
    }

    /// Execute one insertion request end to end.
    ///
    /// Returns whether every step succeeded; individual failures are logged
    /// and never abort the remaining sequence.
    #[instrument(skip(self, driver, request), fields(command = %request.command))]
    pub fn run(
        &mut self,
        driver: &mut dyn SurfaceDriver,
        id: u64,
        request: &InsertionRequest,
    ) -> bool {
        let mut ok = true;

        let snapshot = self.clipboard.read_text().warn_on_err();

        ok &= self.delete_trigger(driver, request.chars_to_delete);

        let last = request.messages.len().saturating_sub(1);
        for (index, message) in request.messages.iter().enumerate() {
            ok &= self.insert_message(driver, &message.text, message.auto_send);
            if index < last {
                thread::sleep(self.config.inter_message_delay);
            }
        }

        if let Some(snapshot) = snapshot {
            thread::sleep(self.config.clipboard_restore_delay);
            if self.clipboard.write_text(&snapshot).warn_on_err().is_none() {
                ok = false;
            }
        }

        info!(id, ok, "Insertion request finished");
        ok
    }

    /// Drive requests from the sandbox stream until it closes, answering
    /// each with a completion.
    pub fn serve<R: std::io::BufRead>(
        &mut self,
        endpoint: &mut HostEndpoint<R>,
        driver: &mut dyn SurfaceDriver,
        completions: &std::sync::mpsc::Sender<Completion>,
    ) {
        while let Some(signal) = endpoint.next_signal() {
            match signal {
                Signal::InsertionRequest { id, request } => {
                    let ok = self.run(driver, id, &request);
                    if completions.send(Completion { id, ok }).is_err() {
                        warn!(id, "Completion receiver gone, stopping");
                        return;
                    }
                }
                other => debug!(id = other.id(), "Ignoring non-insertion signal"),
            }
        }
    }

    /// Delete the typed trigger with discrete backspace events.
    ///
    /// Key events rather than a bulk edit: the host page's own handlers see
    /// each deletion and keep their state consistent.
    fn delete_trigger(&mut self, driver: &mut dyn SurfaceDriver, count: usize) -> bool {
        let mut ok = true;
        for _ in 0..count {
            if driver.key_down("Backspace").log_err().is_none() {
                ok = false;
            }
            if driver.key_up("Backspace").log_err().is_none() {
                ok = false;
            }
            thread::sleep(self.config.keystroke_delay);
        }
        debug!(count, "Deleted trigger text");
        ok
    }

    fn insert_message(
        &mut self,
        driver: &mut dyn SurfaceDriver,
        text: &str,
        auto_send: bool,
    ) -> bool {
        // A failed clipboard write means pasting would insert stale content;
        // skip this message's paste and send, keep the sequence going.
        if self.clipboard.write_text(text).log_err().is_none() {
            return false;
        }

        let mut ok = true;
        if driver.focus_input().log_err().is_none() {
            ok = false;
        }
        if driver.paste().log_err().is_none() {
            ok = false;
        }

        if auto_send {
            thread::sleep(self.config.settle_delay);
            ok &= self.click_send(driver);
        }
        ok
    }

    fn click_send(&mut self, driver: &mut dyn SurfaceDriver) -> bool {
        let tree = match driver.control_tree().log_err() {
            Some(tree) => tree,
            None => return false,
        };
        let origin = driver.origin();
        let Some(path) = self
            .adapters
            .locator_for(&origin)
            .locate_send_control(&tree)
        else {
            warn!(origin = %origin, "Send control not found, message left unsent");
            return false;
        };
        driver.click(&path).log_err().is_some()
    }
}
