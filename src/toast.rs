//! Toast notifications for match confirmation and session feedback.
//!
//! Presentation is cosmetic: the engine emits toasts through a [`ToastSink`]
//! and the embedder renders them however it likes. The confirmation toast is
//! optimistic - it fires before the host finishes processing and does not
//! reflect verified success.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

/// Toast variant determines the visual style and icon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastVariant {
    Success,
    Warning,
    Error,
    #[default]
    Info,
}

impl ToastVariant {
    /// Icon character for this variant
    pub fn icon(&self) -> &'static str {
        match self {
            ToastVariant::Success => "✓",
            ToastVariant::Warning => "⚠",
            ToastVariant::Error => "✕",
            ToastVariant::Info => "ℹ",
        }
    }
}

/// A transient notification
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub variant: ToastVariant,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Toast {
            variant: ToastVariant::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Toast {
            variant: ToastVariant::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Toast {
            variant: ToastVariant::Warning,
            message: message.into(),
        }
    }
}

/// Where toasts go; the embedder supplies the rendering sink
pub trait ToastSink: Send {
    fn show(&self, toast: &Toast);
}

/// Default sink: log the toast, render nothing
#[derive(Debug, Default)]
pub struct TracingToastSink;

impl ToastSink for TracingToastSink {
    fn show(&self, toast: &Toast) {
        match toast.variant {
            ToastVariant::Warning | ToastVariant::Error => {
                warn!(icon = toast.variant.icon(), message = %toast.message, "toast")
            }
            _ => info!(icon = toast.variant.icon(), message = %toast.message, "toast"),
        }
    }
}

/// Recording sink for tests and embedders that batch-render
#[derive(Clone, Default)]
pub struct RecordingToastSink {
    shown: Arc<Mutex<Vec<Toast>>>,
}

impl RecordingToastSink {
    pub fn new() -> Self {
        RecordingToastSink::default()
    }

    pub fn shown(&self) -> Vec<Toast> {
        self.shown.lock().clone()
    }
}

impl ToastSink for RecordingToastSink {
    fn show(&self, toast: &Toast) {
        self.shown.lock().push(toast.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_icons() {
        assert_eq!(ToastVariant::Success.icon(), "✓");
        assert_eq!(ToastVariant::Error.icon(), "✕");
    }

    #[test]
    fn test_recording_sink_captures() {
        let sink = RecordingToastSink::new();
        sink.show(&Toast::success("oi expandido"));
        let shown = sink.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].variant, ToastVariant::Success);
        assert_eq!(shown[0].message, "oi expandido");
    }
}
