//! Keyword substitution: rewrites `<KEY>` tokens in message text.
//!
//! Two passes, both literal substring replacement (never regex):
//! 1. user keywords from the configured dictionary;
//! 2. computed "auto" keywords (`<SAUDACAO>`, `<DATA>`, `<HORA>`), resolved
//!    fresh on every call so a long-lived engine never serves stale times.

use chrono::{DateTime, Local, Timelike};

use crate::config::KeywordDefinition;

/// Time-of-day greeting token
pub const KEYWORD_SAUDACAO: &str = "<SAUDACAO>";
/// Current date token
pub const KEYWORD_DATA: &str = "<DATA>";
/// Current time token
pub const KEYWORD_HORA: &str = "<HORA>";

/// Greeting band for a local hour of day (0-23)
pub fn greeting_for_hour(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Bom dia",
        12..=17 => "Boa tarde",
        _ => "Boa noite",
    }
}

/// Immutable keyword dictionary snapshot for one engine instance
#[derive(Debug, Clone, Default)]
pub struct KeywordTable {
    entries: Vec<KeywordDefinition>,
}

impl KeywordTable {
    pub fn new(entries: Vec<KeywordDefinition>) -> Self {
        KeywordTable { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace all keyword tokens in `text` using the current local time.
    pub fn substitute(&self, text: &str) -> String {
        self.substitute_at(text, Local::now())
    }

    /// Replace all keyword tokens in `text` as of the given instant.
    ///
    /// Pass 1 runs the user keywords in dictionary order; replaced values are
    /// not re-scanned within a single replacement. Pass 2 resolves the auto
    /// keywords against `now`.
    pub fn substitute_at(&self, text: &str, now: DateTime<Local>) -> String {
        let mut out = text.to_string();

        for entry in &self.entries {
            let token = format!("<{}>", entry.key);
            out = out.replace(&token, &entry.value);
        }

        out = out.replace(KEYWORD_SAUDACAO, greeting_for_hour(now.hour()));
        out = out.replace(KEYWORD_DATA, &now.format("%d/%m/%Y").to_string());
        out = out.replace(KEYWORD_HORA, &now.format("%H:%M").to_string());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_hour(hour: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 15, hour, 30, 0).unwrap()
    }

    #[test]
    fn test_greeting_bands() {
        assert_eq!(greeting_for_hour(5), "Bom dia");
        assert_eq!(greeting_for_hour(11), "Bom dia");
        assert_eq!(greeting_for_hour(12), "Boa tarde");
        assert_eq!(greeting_for_hour(17), "Boa tarde");
        assert_eq!(greeting_for_hour(18), "Boa noite");
        assert_eq!(greeting_for_hour(0), "Boa noite");
        assert_eq!(greeting_for_hour(4), "Boa noite");
    }

    #[test]
    fn test_auto_keywords_non_empty_for_every_hour() {
        let table = KeywordTable::default();
        for hour in 0..24 {
            let now = at_hour(hour);
            for token in [KEYWORD_SAUDACAO, KEYWORD_DATA, KEYWORD_HORA] {
                let resolved = table.substitute_at(token, now);
                assert!(!resolved.is_empty(), "{token} empty at hour {hour}");
                assert_ne!(resolved, token, "{token} unresolved at hour {hour}");
            }
        }
    }

    #[test]
    fn test_user_keyword_replacement() {
        let table = KeywordTable::new(vec![KeywordDefinition::new("PIX", "chave-123")]);
        assert_eq!(
            table.substitute_at("Minha chave: <PIX>", at_hour(10)),
            "Minha chave: chave-123"
        );
    }

    #[test]
    fn test_replaces_all_occurrences() {
        let table = KeywordTable::new(vec![KeywordDefinition::new("X", "y")]);
        assert_eq!(table.substitute_at("<X> e <X>", at_hour(10)), "y e y");
    }

    #[test]
    fn test_value_containing_own_token_does_not_loop() {
        // literal single-pass replace: the replaced value is not re-scanned
        let table = KeywordTable::new(vec![KeywordDefinition::new("A", "<A>!")]);
        assert_eq!(table.substitute_at("<A>", at_hour(10)), "<A>!");
    }

    #[test]
    fn test_idempotent_without_tokens() {
        let table = KeywordTable::new(vec![KeywordDefinition::new("PIX", "chave")]);
        let text = "sem tokens aqui, nem <desconhecido>";
        let once = table.substitute_at(text, at_hour(9));
        let twice = table.substitute_at(&once, at_hour(9));
        assert_eq!(once, text);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_greeting_by_time_of_day() {
        let table = KeywordTable::default();
        assert_eq!(table.substitute_at("<SAUDACAO>", at_hour(8)), "Bom dia");
        assert_eq!(table.substitute_at("<SAUDACAO>", at_hour(14)), "Boa tarde");
        assert_eq!(table.substitute_at("<SAUDACAO>", at_hour(22)), "Boa noite");
    }

    #[test]
    fn test_date_and_time_format() {
        let table = KeywordTable::default();
        let now = at_hour(14);
        assert_eq!(table.substitute_at("<DATA>", now), "15/03/2024");
        assert_eq!(table.substitute_at("<HORA>", now), "14:30");
    }

    #[test]
    fn test_value_with_newlines_preserved() {
        let table = KeywordTable::new(vec![KeywordDefinition::new("END", "Rua X\nBairro Y")]);
        assert_eq!(
            table.substitute_at("<END>", at_hour(10)),
            "Rua X\nBairro Y"
        );
    }
}
