//! Direct-splice insertion: replace the trigger text in place.
//!
//! Used for plain fields always, and for rich regions on origins without
//! compatibility mode. Only the first message of a shortcut applies on this
//! path. The computation is pure; application writes the surface, dispatches
//! a synthetic input event and repositions the caret. Text before the anchor
//! is never touched.

use tracing::{debug, warn};

use crate::surface::EditableSurface;
use crate::utils::find_ci;

/// Result of a direct-splice computation
#[derive(Debug, Clone, PartialEq)]
pub struct SpliceOutcome {
    /// Full new text for the region
    pub final_text: String,
    /// Caret char offset: end of the inserted replacement
    pub caret: usize,
}

/// Compute the direct splice for a matched command.
///
/// `full_text` is the region's current text, `anchor` the caret offset
/// captured at arming time. The span erased is exactly
/// `[anchor, anchor + typed_key_len + i + len(command))` where `i` is the
/// char offset of the first case-insensitive occurrence of `command` in the
/// search text; everything before the anchor and after the match survives.
///
/// Returns `None` when the anchor is out of range or the command no longer
/// occurs in the search text (the region changed under us).
pub fn compute_splice(
    full_text: &str,
    anchor: usize,
    typed_key_len: usize,
    command: &str,
    replacement: &str,
) -> Option<SpliceOutcome> {
    let chars: Vec<char> = full_text.chars().collect();
    if anchor > chars.len() {
        return None;
    }

    let before: String = chars[..anchor].iter().collect();
    let tail: String = chars[anchor..].iter().collect();
    let search_text: String = tail.chars().skip(typed_key_len).collect();

    let at = find_ci(&search_text, command)?;
    let command_len = command.chars().count();

    let search_chars: Vec<char> = search_text.chars().collect();
    let head: String = search_chars[..at].iter().collect();
    let rest: String = search_chars[at + command_len..].iter().collect();

    let final_text = format!("{before}{head}{replacement}{rest}");
    let caret = anchor + at + replacement.chars().count();

    Some(SpliceOutcome { final_text, caret })
}

/// Apply a computed splice to the surface.
///
/// No verification happens before dispatching the input event; if the host
/// page's framework reverts the edit the expansion simply fails soft.
pub fn apply_direct_splice(surface: &mut dyn EditableSurface, outcome: &SpliceOutcome) {
    surface.set_text(&outcome.final_text);
    surface.dispatch_input();
    surface.set_caret(outcome.caret);
    debug!(caret = outcome.caret, "Applied direct splice");
}

/// Once-only fallback insertion path.
///
/// Used when evidence suggests the previous write did not take effect: clear
/// the content, insert the text plain, and dispatch the minimal event
/// sequence that prompts the page's framework to notice the change. No
/// further fallback exists after this one.
pub fn apply_fallback_insert(surface: &mut dyn EditableSurface, text: &str) {
    warn!("Direct write did not take effect, attempting fallback insertion");
    surface.set_text("");
    surface.set_text(text);
    surface.dispatch_edit_sequence();
    surface.set_caret(text.chars().count());
}
