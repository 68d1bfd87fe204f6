//! Clipboard access for the privileged executor.
//!
//! The system clipboard is the one resource shared across all surfaces and
//! the rest of the machine; the executor's discipline is snapshot before the
//! first write, restore after the last step. [`MemoryClipboard`] backs tests
//! and headless hosts.

use anyhow::{Context, Result};

/// Text clipboard operations needed by the executor
pub trait ClipboardAccess: Send {
    fn read_text(&mut self) -> Result<String>;
    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// Real OS clipboard via arboard
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self> {
        let inner = arboard::Clipboard::new().context("Failed to open system clipboard")?;
        Ok(SystemClipboard { inner })
    }
}

impl ClipboardAccess for SystemClipboard {
    fn read_text(&mut self) -> Result<String> {
        self.inner.get_text().context("Failed to read clipboard")
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        self.inner
            .set_text(text.to_string())
            .context("Failed to write clipboard")
    }
}

/// In-memory clipboard for tests and headless hosts
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    content: String,
    /// When set, the next `write_text` fails once (for failure-path tests)
    fail_next_write: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        MemoryClipboard::default()
    }

    pub fn with_content(content: impl Into<String>) -> Self {
        MemoryClipboard {
            content: content.into(),
            fail_next_write: false,
        }
    }

    pub fn fail_next_write(&mut self) {
        self.fail_next_write = true;
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

impl ClipboardAccess for MemoryClipboard {
    fn read_text(&mut self) -> Result<String> {
        Ok(self.content.clone())
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        if self.fail_next_write {
            self.fail_next_write = false;
            anyhow::bail!("clipboard write unavailable");
        }
        self.content = text.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_clipboard_roundtrip() {
        let mut clipboard = MemoryClipboard::new();
        clipboard.write_text("olá").unwrap();
        assert_eq!(clipboard.read_text().unwrap(), "olá");
    }

    #[test]
    fn test_fail_next_write_fails_once() {
        let mut clipboard = MemoryClipboard::with_content("antes");
        clipboard.fail_next_write();
        assert!(clipboard.write_text("depois").is_err());
        assert_eq!(clipboard.read_text().unwrap(), "antes");
        assert!(clipboard.write_text("depois").is_ok());
        assert_eq!(clipboard.read_text().unwrap(), "depois");
    }

    // Touches the real OS clipboard; run with: cargo test --features system-tests
    #[cfg(feature = "system-tests")]
    #[test]
    fn test_system_clipboard_roundtrip() {
        let mut clipboard = SystemClipboard::new().unwrap();
        let snapshot = clipboard.read_text().unwrap_or_default();
        clipboard.write_text("atalho-system-test").unwrap();
        assert_eq!(clipboard.read_text().unwrap(), "atalho-system-test");
        clipboard.write_text(&snapshot).unwrap();
    }
}
