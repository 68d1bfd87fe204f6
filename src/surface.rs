//! Editable-surface abstraction.
//!
//! Each embedded page exposes its focused editable region to the engine
//! through [`EditableSurface`]: a flat text representation with a char-offset
//! caret, plus hooks for the synthetic events that prompt the host page's
//! framework to notice a programmatic write. Plain `<input>`/`<textarea>`
//! fields report the native selection start; rich editable regions compute
//! the offset by walking the selection range relative to the region root -
//! either way the engine only ever sees a char offset.
//!
//! [`InMemorySurface`] is the reference implementation used by tests and
//! headless embedders.

/// Kind of editable region the engine is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain input/textarea: value assignment is reliable
    Plain,
    /// Rich contenteditable region: may be diff-reconciled by the page
    Rich,
}

/// A focused editable region inside one embedded surface.
///
/// Offsets are char positions within the region's flat text representation.
pub trait EditableSurface {
    /// Host page origin (domain), used for compatibility-mode selection
    fn origin(&self) -> &str;

    fn kind(&self) -> FieldKind;

    fn focused(&self) -> bool;

    fn text(&self) -> String;

    /// Replace the whole text content
    fn set_text(&mut self, text: &str);

    /// Caret char offset
    fn caret(&self) -> usize;

    fn set_caret(&mut self, offset: usize);

    /// Dispatch a synthetic input event so an observing framework updates
    /// its internal model after a programmatic write
    fn dispatch_input(&mut self);

    /// Dispatch the minimal fallback sequence (pre-input, input, key-up)
    /// used by the once-only fallback insertion path
    fn dispatch_edit_sequence(&mut self);
}

/// Synthetic events recorded by [`InMemorySurface`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    Input,
    EditSequence,
}

/// In-memory reference surface.
///
/// Records dispatched synthetic events so tests can assert on them, and can
/// optionally simulate a host framework that reverts programmatic writes
/// (the failure mode that motivates the fallback path).
#[derive(Debug, Clone)]
pub struct InMemorySurface {
    origin: String,
    kind: FieldKind,
    focused: bool,
    text: String,
    caret: usize,
    revert_writes_once: bool,
    pub events: Vec<SurfaceEvent>,
}

impl InMemorySurface {
    pub fn new(origin: impl Into<String>, kind: FieldKind) -> Self {
        InMemorySurface {
            origin: origin.into(),
            kind,
            focused: true,
            text: String::new(),
            caret: 0,
            revert_writes_once: false,
            events: Vec::new(),
        }
    }

    /// Simulate a framework that silently reverts the next programmatic write
    pub fn revert_next_write(mut self) -> Self {
        self.revert_writes_once = true;
        self
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    /// Simulate the user typing one character at the caret
    pub fn type_char(&mut self, c: char) {
        let mut chars: Vec<char> = self.text.chars().collect();
        let at = self.caret.min(chars.len());
        chars.insert(at, c);
        self.text = chars.into_iter().collect();
        self.caret = at + 1;
    }

    /// Simulate the user typing a string at the caret
    pub fn type_str(&mut self, s: &str) {
        for c in s.chars() {
            self.type_char(c);
        }
    }
}

impl EditableSurface for InMemorySurface {
    fn origin(&self) -> &str {
        &self.origin
    }

    fn kind(&self) -> FieldKind {
        self.kind
    }

    fn focused(&self) -> bool {
        self.focused
    }

    fn text(&self) -> String {
        self.text.clone()
    }

    fn set_text(&mut self, text: &str) {
        if self.revert_writes_once {
            // the hosting framework re-renders and discards the write
            self.revert_writes_once = false;
            return;
        }
        self.text = text.to_string();
    }

    fn caret(&self) -> usize {
        self.caret
    }

    fn set_caret(&mut self, offset: usize) {
        self.caret = offset.min(self.text.chars().count());
    }

    fn dispatch_input(&mut self) {
        self.events.push(SurfaceEvent::Input);
    }

    fn dispatch_edit_sequence(&mut self) {
        self.events.push(SurfaceEvent::EditSequence);
    }
}
