//! Per-surface expansion engine: the activation state machine.
//!
//! One `Engine` instance runs per embedded surface and owns all session
//! state; nothing lives in globals, so tearing an instance down on
//! reconfiguration or unmount cancels its timers and listeners with it.
//!
//! States: `Idle -> Armed -> Expanding -> Idle`. Arming captures the caret
//! anchor and starts the activation window; while armed every input event
//! recomputes the search text, refreshes the suggestion list and schedules a
//! debounced match check. A match enters Expanding, which is the reentrancy
//! guard: all mutation happens there, input is ignored, and the state is only
//! left on the insertion path's completion (synchronously for direct splice,
//! on the host's correlated completion for the bridge path), followed by a
//! short cool-down that swallows the input events our own synthetic mutation
//! may have triggered.
//!
//! Timer events carry the generation that scheduled them; a stale timer
//! firing against a newer session is ignored on receipt.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::bridge::{InsertionRequest, SandboxSignaler, Signal};
use crate::config::{EngineConfig, ShortcutDefinition, ShortcutMessage};
use crate::error::ResultExt;
use crate::keywords::KeywordTable;
use crate::session::{ActivationSession, DelayedTask, DisarmReason};
use crate::splice::{apply_direct_splice, apply_fallback_insert, compute_splice, SpliceOutcome};
use crate::suggest::{self, Suggestion};
use crate::surface::{EditableSurface, FieldKind};
use crate::toast::{Toast, ToastSink, TracingToastSink};
use crate::utils::{contains_ci, find_ci};

/// Debounce before a match check after an input event
pub const INPUT_DEBOUNCE_MS: u64 = 80;

/// Cool-down after an expansion during which input events are suppressed
pub const EXPAND_COOLDOWN_MS: u64 = 200;

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Armed,
    /// Transient; re-entered only via a matched command
    Expanding,
}

/// Events delivered to the engine by its timers and the host bridge.
///
/// The embedder pumps these from the receiver returned by [`Engine::new`]
/// into [`Engine::handle_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    ActivationTimeout { generation: u64 },
    MatchCheck { generation: u64 },
    InsertionComplete { id: u64, ok: bool },
}

/// How the matched span inside the search text was established
enum MatchSpan {
    /// Free-text match: command found at a char offset in the search text
    FreeText { at: usize },
    /// Forced via suggestion selection: the whole search text is consumed
    Forced,
}

/// Per-surface expansion engine
pub struct Engine {
    config: EngineConfig,
    keywords: KeywordTable,
    state: EngineState,
    session: Option<ActivationSession>,
    /// Bumped on every arm and reconfigure; keys timer events
    generation: u64,
    activation_timer: Option<DelayedTask>,
    debounce_timer: Option<DelayedTask>,
    deadline: Option<Instant>,
    cooldown_until: Option<Instant>,
    pending_request: Option<u64>,
    next_request_id: u64,
    events_tx: Sender<EngineEvent>,
    signaler: SandboxSignaler,
    toasts: Box<dyn ToastSink>,
}

impl Engine {
    /// Create an engine for one surface.
    ///
    /// The returned receiver delivers timer and completion events; the
    /// embedder forwards them to [`Engine::handle_event`].
    pub fn new(config: EngineConfig, signaler: SandboxSignaler) -> (Self, Receiver<EngineEvent>) {
        let (events_tx, events_rx) = channel();
        let keywords = KeywordTable::new(config.keywords.clone());
        let engine = Engine {
            config,
            keywords,
            state: EngineState::Idle,
            session: None,
            generation: 0,
            activation_timer: None,
            debounce_timer: None,
            deadline: None,
            cooldown_until: None,
            pending_request: None,
            next_request_id: 1,
            events_tx,
            signaler,
            toasts: Box::new(TracingToastSink),
        };
        (engine, events_rx)
    }

    pub fn with_toast_sink(mut self, sink: impl ToastSink + 'static) -> Self {
        self.toasts = Box::new(sink);
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == EngineState::Armed
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        self.session
            .as_ref()
            .map(|s| s.suggestions.as_slice())
            .unwrap_or(&[])
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.session.as_ref().and_then(|s| s.selected)
    }

    pub fn search_text(&self) -> &str {
        self.session
            .as_ref()
            .map(|s| s.search_text.as_str())
            .unwrap_or("")
    }

    /// Remaining activation window, for the host countdown indicator
    pub fn remaining_window(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Replace the configuration snapshot in place.
    ///
    /// Tears down the running session first so timers of the old
    /// configuration can never fire against the new one.
    pub fn reconfigure(&mut self, config: EngineConfig) {
        self.teardown(DisarmReason::Reconfigured);
        self.keywords = KeywordTable::new(config.keywords.clone());
        self.config = config;
        debug!("Engine reconfigured");
    }

    /// Key-down hook. Returns true when the engine consumed the key.
    pub fn on_key_down(&mut self, surface: &mut dyn EditableSurface, key: &str) -> bool {
        if self.state == EngineState::Expanding {
            return false;
        }

        if key == self.config.activation.activation_key {
            self.arm(surface);
            return true;
        }

        if self.state != EngineState::Armed {
            return false;
        }

        match key {
            "Escape" => {
                self.disarm(DisarmReason::Escape);
                true
            }
            "ArrowDown" => self.move_selection(1),
            "ArrowUp" => self.move_selection(-1),
            "Enter" => {
                if let Some(index) = self.selected_index() {
                    self.expand_suggestion(surface, index);
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    /// Key-up hook: space and tab trigger an immediate match check so the
    /// common "type command, hit space" flow feels instant.
    pub fn on_key_up(&mut self, surface: &mut dyn EditableSurface, key: &str) {
        if self.state == EngineState::Armed && (key == " " || key == "Tab") {
            self.refresh_search(surface);
            self.check_match(surface);
        }
    }

    /// Input-event hook: recompute the search text and schedule a debounced
    /// match check.
    pub fn on_input(&mut self, surface: &mut dyn EditableSurface) {
        if self.state == EngineState::Expanding {
            return;
        }
        if let Some(until) = self.cooldown_until {
            if Instant::now() < until {
                debug!("Input event suppressed by post-expansion cool-down");
                return;
            }
            self.cooldown_until = None;
        }
        if self.state != EngineState::Armed {
            return;
        }

        if !self.refresh_search(surface) {
            return;
        }

        let generation = self.generation;
        let tx = self.events_tx.clone();
        self.debounce_timer = Some(DelayedTask::spawn(
            Duration::from_millis(INPUT_DEBOUNCE_MS),
            move || {
                let _ = tx.send(EngineEvent::MatchCheck { generation });
            },
        ));
    }

    /// Focus left the editable region
    pub fn on_focus_lost(&mut self) {
        if self.state == EngineState::Armed {
            self.disarm(DisarmReason::FocusLost);
        }
    }

    /// Pointer click on a rendered suggestion
    pub fn click_suggestion(&mut self, surface: &mut dyn EditableSurface, index: usize) {
        if self.state == EngineState::Armed && index < self.suggestions().len() {
            self.expand_suggestion(surface, index);
        }
    }

    /// Deliver a timer or bridge event
    pub fn handle_event(&mut self, surface: &mut dyn EditableSurface, event: EngineEvent) {
        match event {
            EngineEvent::ActivationTimeout { generation } => {
                if self.state == EngineState::Armed && generation == self.generation {
                    self.disarm(DisarmReason::Timeout);
                } else {
                    debug!(generation, "Ignoring stale activation timeout");
                }
            }
            EngineEvent::MatchCheck { generation } => {
                if self.state == EngineState::Armed && generation == self.generation {
                    self.check_match(surface);
                }
            }
            EngineEvent::InsertionComplete { id, ok } => {
                if self.state == EngineState::Expanding && self.pending_request == Some(id) {
                    if !ok {
                        warn!(id, "Host reported insertion failure");
                    }
                    self.finish_expansion();
                } else {
                    debug!(id, "Ignoring unmatched insertion completion");
                }
            }
        }
    }

    /// Cancel timers and leave Idle; used on unmount and reconfiguration.
    pub fn teardown(&mut self, reason: DisarmReason) {
        self.debounce_timer = None;
        if self.state == EngineState::Armed {
            self.disarm(reason);
        }
        self.activation_timer = None;
        self.state = EngineState::Idle;
        self.session = None;
        self.pending_request = None;
        self.deadline = None;
    }

    fn arm(&mut self, surface: &mut dyn EditableSurface) {
        if !surface.focused() {
            debug!("Activation key without editable focus, ignoring");
            return;
        }

        // Re-arming replaces the session and its timer, it never stacks.
        self.generation += 1;
        let generation = self.generation;
        let anchor = surface.caret();
        let window = Duration::from_millis(self.config.activation.activation_window_ms);

        self.session = Some(ActivationSession::new(anchor));
        self.state = EngineState::Armed;
        self.deadline = Some(Instant::now() + window);
        self.debounce_timer = None;

        let tx = self.events_tx.clone();
        self.activation_timer = Some(DelayedTask::spawn(window, move || {
            let _ = tx.send(EngineEvent::ActivationTimeout { generation });
        }));

        self.signaler
            .emit(&Signal::ModeActive {
                id: generation,
                remaining_ms: self.config.activation.activation_window_ms,
            })
            .warn_on_err();

        debug!(generation, anchor, "Session armed");
    }

    fn disarm(&mut self, reason: DisarmReason) {
        self.activation_timer = None;
        self.debounce_timer = None;
        self.deadline = None;
        self.state = EngineState::Idle;
        self.session = None;

        self.signaler
            .emit(&Signal::ModeInactive {
                id: self.generation,
            })
            .warn_on_err();

        debug!(?reason, "Session disarmed");
    }

    /// Recompute the search text from the surface. Returns false when the
    /// session had to be abandoned because the region shrank under us.
    fn refresh_search(&mut self, surface: &mut dyn EditableSurface) -> bool {
        let typed_key_len = self.config.activation.typed_key_len();
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        let chars: Vec<char> = surface.text().chars().collect();
        if session.anchor > chars.len() {
            self.disarm(DisarmReason::FocusLost);
            return false;
        }

        session.search_text = chars[session.anchor..]
            .iter()
            .skip(typed_key_len)
            .collect();
        session.suggestions = suggest::rank(&self.config.shortcuts, &session.search_text);
        if let Some(selected) = session.selected {
            if selected >= session.suggestions.len() {
                session.selected = None;
            }
        }
        true
    }

    fn move_selection(&mut self, delta: i32) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let len = session.suggestions.len();
        if len == 0 {
            return false;
        }
        let current = session.selected.map(|i| i as i32).unwrap_or(-1);
        let next = (current + delta).clamp(0, len as i32 - 1);
        session.selected = Some(next as usize);
        true
    }

    /// Free-text match: first dictionary command occurring case-insensitively
    /// in the search text, in dictionary order.
    fn check_match(&mut self, surface: &mut dyn EditableSurface) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let search = session.search_text.clone();
        let matched = self
            .config
            .shortcuts
            .iter()
            .find(|def| contains_ci(&search, &def.command))
            .cloned();

        if let Some(def) = matched {
            let at = find_ci(&search, &def.command).unwrap_or(0);
            self.expand(surface, &def, MatchSpan::FreeText { at });
        }
    }

    fn expand_suggestion(&mut self, surface: &mut dyn EditableSurface, index: usize) {
        let Some(command) = self.suggestions().get(index).map(|s| s.command.clone()) else {
            return;
        };
        let Some(def) = self.config.find_shortcut(&command).cloned() else {
            return;
        };
        // A selected suggestion may only be a prefix match; when the command
        // does occur in the search text keep the free-text span so trailing
        // text survives, otherwise consume the whole search text.
        let search = self.search_text().to_string();
        let span = match find_ci(&search, &def.command) {
            Some(at) => MatchSpan::FreeText { at },
            None => MatchSpan::Forced,
        };
        self.expand(surface, &def, span);
    }

    fn expand(&mut self, surface: &mut dyn EditableSurface, def: &ShortcutDefinition, span: MatchSpan) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.state = EngineState::Expanding;
        self.activation_timer = None;
        self.debounce_timer = None;
        self.deadline = None;

        self.signaler
            .emit(&Signal::ModeInactive {
                id: self.generation,
            })
            .warn_on_err();

        let use_bridge = surface.kind() == FieldKind::Rich
            && self.config.is_compat_origin(surface.origin());

        if use_bridge {
            self.expand_via_bridge(&session, def, span);
        } else {
            self.expand_direct(surface, &session, def, span);
            self.finish_expansion();
        }
    }

    /// Direct-splice path: plain fields always, rich regions off
    /// compatibility origins. Only the first message applies here.
    fn expand_direct(
        &mut self,
        surface: &mut dyn EditableSurface,
        session: &ActivationSession,
        def: &ShortcutDefinition,
        span: MatchSpan,
    ) {
        let Some(first) = def.messages.first() else {
            return;
        };
        let replacement = self.resolve_text(&first.text);
        let typed_key_len = self.config.activation.typed_key_len();

        let outcome = match span {
            MatchSpan::FreeText { .. } => compute_splice(
                &surface.text(),
                session.anchor,
                typed_key_len,
                &def.command,
                &replacement,
            ),
            MatchSpan::Forced => {
                let chars: Vec<char> = surface.text().chars().collect();
                if session.anchor > chars.len() {
                    None
                } else {
                    let before: String = chars[..session.anchor].iter().collect();
                    Some(SpliceOutcome {
                        final_text: format!("{before}{replacement}"),
                        caret: session.anchor + replacement.chars().count(),
                    })
                }
            }
        };

        let Some(outcome) = outcome else {
            warn!(command = %def.command, "Region changed before splice, expansion dropped");
            return;
        };

        apply_direct_splice(surface, &outcome);
        if surface.text() != outcome.final_text {
            // evidence the hosting framework reverted the write
            apply_fallback_insert(surface, &outcome.final_text);
        }

        self.toasts
            .show(&Toast::success(format!("Atalho \"{}\" aplicado", def.command)));
    }

    /// Clipboard-mediated path: encode the full multi-message sequence and
    /// hand it to the host bridge. The toast is optimistic; Expanding is
    /// left when the host's completion arrives.
    fn expand_via_bridge(
        &mut self,
        session: &ActivationSession,
        def: &ShortcutDefinition,
        span: MatchSpan,
    ) {
        let typed_key_len = self.config.activation.typed_key_len();
        let chars_to_delete = match span {
            MatchSpan::FreeText { at } => typed_key_len + at + def.command.chars().count(),
            MatchSpan::Forced => typed_key_len + session.search_text.chars().count(),
        };

        let messages: Vec<ShortcutMessage> = def
            .messages
            .iter()
            .map(|m| ShortcutMessage::new(self.resolve_text(&m.text), m.auto_send))
            .collect();

        let id = self.next_request_id;
        self.next_request_id += 1;

        let emitted = self
            .signaler
            .emit(&Signal::InsertionRequest {
                id,
                request: InsertionRequest {
                    messages,
                    chars_to_delete,
                    command: def.command.clone(),
                },
            })
            .log_err();

        if emitted.is_some() {
            self.pending_request = Some(id);
            self.toasts
                .show(&Toast::success(format!("Atalho \"{}\" aplicado", def.command)));
            debug!(id, chars_to_delete, command = %def.command, "Insertion request emitted");
        } else {
            // nothing will ever complete this request
            self.finish_expansion();
        }
    }

    fn finish_expansion(&mut self) {
        self.state = EngineState::Idle;
        self.session = None;
        self.pending_request = None;
        self.cooldown_until = Some(Instant::now() + Duration::from_millis(EXPAND_COOLDOWN_MS));
    }

    fn resolve_text(&self, text: &str) -> String {
        self.keywords.substitute(text).replace("<ENTER>", "\n")
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.teardown(DisarmReason::Reconfigured);
    }
}
