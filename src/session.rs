//! Activation session state and the cancellable timers behind it.
//!
//! Timers are one-shot [`DelayedTask`]s: a worker thread parks on a condvar
//! with a deadline and fires its callback unless cancelled first. The engine
//! keys every fired event with the session generation that scheduled it, so
//! a stale task that loses the race with `cancel()` is ignored on receipt -
//! a replaced timer can never act against a newer session.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::suggest::Suggestions;

/// Why a session left the Armed state without expanding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisarmReason {
    Timeout,
    Escape,
    FocusLost,
    Reconfigured,
}

/// Ephemeral per-surface session state while Armed
#[derive(Debug, Clone, Default)]
pub struct ActivationSession {
    /// Caret char offset captured at arming time; text before it is never touched
    pub anchor: usize,
    /// Text typed after the activation key
    pub search_text: String,
    /// Live ranked suggestions (capped at 4)
    pub suggestions: Suggestions,
    /// Keyboard/pointer selection within `suggestions`
    pub selected: Option<usize>,
}

impl ActivationSession {
    pub fn new(anchor: usize) -> Self {
        ActivationSession {
            anchor,
            ..Default::default()
        }
    }
}

/// A cancellable one-shot delayed task.
///
/// Dropping the task cancels it. Cancellation after the callback has started
/// is a no-op; the generation check on the receiving side handles that race.
pub struct DelayedTask {
    cancel: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl DelayedTask {
    /// Spawn a task that runs `on_fire` after `delay` unless cancelled.
    pub fn spawn(delay: Duration, on_fire: impl FnOnce() + Send + 'static) -> Self {
        let cancel = Arc::new((Mutex::new(false), Condvar::new()));
        let shared = Arc::clone(&cancel);

        let handle = thread::spawn(move || {
            let (lock, cvar) = &*shared;
            let deadline = Instant::now() + delay;
            let mut cancelled = lock.lock();
            while !*cancelled {
                if cvar.wait_until(&mut cancelled, deadline).timed_out() {
                    break;
                }
            }
            let fire = !*cancelled;
            drop(cancelled);
            if fire {
                on_fire();
            }
        });

        DelayedTask {
            cancel,
            handle: Some(handle),
        }
    }

    /// Cancel the task and wait for its thread to finish.
    pub fn cancel(&mut self) {
        {
            let (lock, cvar) = &*self.cancel;
            let mut cancelled = lock.lock();
            *cancelled = true;
            cvar.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DelayedTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;

    #[test]
    fn test_delayed_task_fires() {
        let (tx, rx) = mpsc::channel();
        let _task = DelayedTask::spawn(Duration::from_millis(5), move || {
            let _ = tx.send(());
        });
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn test_cancel_prevents_fire() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let mut task = DelayedTask::spawn(Duration::from_millis(100), move || {
            flag.store(true, Ordering::SeqCst);
        });
        task.cancel();
        // cancel() joins the worker, so the flag is final here
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_drop_cancels() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        {
            let _task = DelayedTask::spawn(Duration::from_millis(100), move || {
                flag.store(true, Ordering::SeqCst);
            });
        }
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_session_starts_empty() {
        let session = ActivationSession::new(7);
        assert_eq!(session.anchor, 7);
        assert!(session.search_text.is_empty());
        assert!(session.suggestions.is_empty());
        assert_eq!(session.selected, None);
    }
}
