//! Suggestion index: ranks dictionary commands against the live search text.
//!
//! Priority 0 = exact match, 1 = prefix, 2 = substring; anything else is
//! excluded. Ties keep dictionary insertion order and the result is capped at
//! [`MAX_SUGGESTIONS`] entries.

use smallvec::SmallVec;

use crate::config::ShortcutDefinition;
use crate::utils::{contains_ci, eq_ci, starts_with_ci, truncate_chars};

/// Hard cap on ranked results
pub const MAX_SUGGESTIONS: usize = 4;

/// Preview char budget for the first message
const FIRST_PREVIEW_BUDGET: usize = 80;
/// Preview char budget for subsequent messages
const REST_PREVIEW_BUDGET: usize = 75;

/// Visible break marker standing in for `<ENTER>` and literal newlines
const BREAK_MARKER: &str = "⏎";

/// Ranked suggestions, capped at `MAX_SUGGESTIONS`
pub type Suggestions = SmallVec<[Suggestion; MAX_SUGGESTIONS]>;

/// One ranked dictionary entry with its display preview
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub command: String,
    pub preview: String,
    /// 0 exact, 1 prefix, 2 substring
    pub priority: u8,
}

/// Match priority for a command against the search text, if it matches at all
fn priority_for(command: &str, search: &str) -> Option<u8> {
    if eq_ci(command, search) {
        Some(0)
    } else if starts_with_ci(command, search) {
        Some(1)
    } else if contains_ci(command, search) {
        Some(2)
    } else {
        None
    }
}

/// Rank dictionary entries against `search`.
///
/// The sort is stable: entries with equal priority keep their dictionary
/// order, so re-ranking the same input never reshuffles the list.
pub fn rank(dictionary: &[ShortcutDefinition], search: &str) -> Suggestions {
    let mut ranked: Vec<(u8, usize, &ShortcutDefinition)> = dictionary
        .iter()
        .enumerate()
        .filter_map(|(order, def)| {
            priority_for(&def.command, search).map(|priority| (priority, order, def))
        })
        .collect();
    ranked.sort_by_key(|(priority, order, _)| (*priority, *order));

    ranked
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(priority, _, def)| Suggestion {
            command: def.command.clone(),
            preview: build_preview(def),
            priority,
        })
        .collect()
}

/// Build the display preview for a shortcut.
///
/// Multi-message shortcuts get `(i/n)` index markers; each message is
/// truncated to its char budget and newlines render as a break marker.
pub fn build_preview(def: &ShortcutDefinition) -> String {
    let total = def.messages.len();
    let mut parts: Vec<String> = Vec::with_capacity(total);

    for (i, message) in def.messages.iter().enumerate() {
        let budget = if i == 0 {
            FIRST_PREVIEW_BUDGET
        } else {
            REST_PREVIEW_BUDGET
        };
        let flat = message
            .text
            .replace("<ENTER>", BREAK_MARKER)
            .replace('\n', BREAK_MARKER);
        let snippet = truncate_chars(&flat, budget);
        if total > 1 {
            parts.push(format!("({}/{}) {}", i + 1, total, snippet));
        } else {
            parts.push(snippet);
        }
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShortcutMessage;

    fn dict(commands: &[&str]) -> Vec<ShortcutDefinition> {
        commands
            .iter()
            .map(|c| ShortcutDefinition::single(*c, format!("texto de {c}")))
            .collect()
    }

    #[test]
    fn test_exact_before_prefix_before_substring() {
        let dictionary = dict(&["oi", "oioi", "boi"]);
        let ranked = rank(&dictionary, "oi");
        let commands: Vec<_> = ranked.iter().map(|s| s.command.as_str()).collect();
        assert_eq!(commands, vec!["oi", "oioi", "boi"]);
        assert_eq!(ranked[0].priority, 0);
        assert_eq!(ranked[1].priority, 1);
        assert_eq!(ranked[2].priority, 2);
    }

    #[test]
    fn test_non_matches_excluded() {
        let dictionary = dict(&["oi", "tchau"]);
        let ranked = rank(&dictionary, "oi");
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].command, "oi");
    }

    #[test]
    fn test_case_insensitive_ranking() {
        let dictionary = dict(&["Oi"]);
        let ranked = rank(&dictionary, "OI");
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].priority, 0);
    }

    #[test]
    fn test_capped_at_four() {
        let dictionary = dict(&["oi1", "oi2", "oi3", "oi4", "oi5", "oi6"]);
        let ranked = rank(&dictionary, "oi");
        assert_eq!(ranked.len(), MAX_SUGGESTIONS);
        // stable on insertion order for ties
        let commands: Vec<_> = ranked.iter().map(|s| s.command.as_str()).collect();
        assert_eq!(commands, vec!["oi1", "oi2", "oi3", "oi4"]);
    }

    #[test]
    fn test_single_message_preview_no_markers() {
        let def = ShortcutDefinition::single("oi", "Olá, bom dia!");
        assert_eq!(build_preview(&def), "Olá, bom dia!");
    }

    #[test]
    fn test_multi_message_preview_markers() {
        let def = ShortcutDefinition::new(
            "fat",
            vec![
                ShortcutMessage::new("Segue boleto", true),
                ShortcutMessage::new("Qualquer dúvida chame", true),
            ],
        );
        assert_eq!(
            build_preview(&def),
            "(1/2) Segue boleto (2/2) Qualquer dúvida chame"
        );
    }

    #[test]
    fn test_preview_truncation_budgets() {
        let long = "x".repeat(100);
        let def = ShortcutDefinition::new(
            "longo",
            vec![
                ShortcutMessage::new(long.clone(), false),
                ShortcutMessage::new(long, false),
            ],
        );
        let preview = build_preview(&def);
        let first = format!("(1/2) {}…", "x".repeat(80));
        let second = format!("(2/2) {}…", "x".repeat(75));
        assert_eq!(preview, format!("{first} {second}"));
    }

    #[test]
    fn test_preview_renders_breaks() {
        let def = ShortcutDefinition::single("end", "Rua X<ENTER>Bairro\nCidade");
        assert_eq!(build_preview(&def), "Rua X⏎Bairro⏎Cidade");
    }

    #[test]
    fn test_empty_search_ranks_everything_as_prefix() {
        let dictionary = dict(&["oi", "tchau"]);
        let ranked = rank(&dictionary, "");
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|s| s.priority == 1));
    }
}
