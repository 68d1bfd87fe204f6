//! Engine configuration: shortcut and keyword dictionaries, activation
//! timing, and the compatibility-mode origin list.
//!
//! Definitions are owned by the configuration supplier and are read-only
//! snapshots inside the engine; re-publishing a changed configuration into a
//! surface replaces the whole engine instance (see `controller`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

use crate::utils::contains_ci;

/// Default activation key: a single typed character
pub const DEFAULT_ACTIVATION_KEY: &str = "/";

/// Default activation window in milliseconds
pub const DEFAULT_ACTIVATION_WINDOW_MS: u64 = 10_000;

/// One text block of a shortcut, independently markable to auto-send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutMessage {
    pub text: String,
    #[serde(default)]
    pub auto_send: bool,
}

impl ShortcutMessage {
    pub fn new(text: impl Into<String>, auto_send: bool) -> Self {
        ShortcutMessage {
            text: text.into(),
            auto_send,
        }
    }
}

/// A shortcut definition: a command token plus its ordered message sequence.
///
/// `command` is unique case-insensitively within a dictionary. Message order
/// is semantically meaningful: the first message receives the trigger-text
/// deletion, later messages are appended in sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutDefinition {
    pub command: String,
    pub messages: Vec<ShortcutMessage>,
}

impl ShortcutDefinition {
    pub fn new(command: impl Into<String>, messages: Vec<ShortcutMessage>) -> Self {
        ShortcutDefinition {
            command: command.into(),
            messages,
        }
    }

    /// Single-message convenience constructor
    pub fn single(command: impl Into<String>, text: impl Into<String>) -> Self {
        ShortcutDefinition::new(command, vec![ShortcutMessage::new(text, false)])
    }
}

/// A user keyword: `key` is the token name, rendered as `<KEY>` in message text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordDefinition {
    pub key: String,
    pub value: String,
}

impl KeywordDefinition {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        KeywordDefinition {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Activation key and timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationConfig {
    /// Single character or named key (e.g. "/" or "F2")
    #[serde(default = "default_activation_key")]
    pub activation_key: String,
    /// How long a session stays armed without a match
    #[serde(default = "default_activation_window_ms")]
    pub activation_window_ms: u64,
}

fn default_activation_key() -> String {
    DEFAULT_ACTIVATION_KEY.to_string()
}

fn default_activation_window_ms() -> u64 {
    DEFAULT_ACTIVATION_WINDOW_MS
}

impl Default for ActivationConfig {
    fn default() -> Self {
        ActivationConfig {
            activation_key: default_activation_key(),
            activation_window_ms: default_activation_window_ms(),
        }
    }
}

impl ActivationConfig {
    /// Number of characters the activation key inserts into the surface.
    ///
    /// A named key (e.g. "F2") types nothing, so the search text and the
    /// backspace count start right at the anchor.
    pub fn typed_key_len(&self) -> usize {
        if self.activation_key.chars().count() == 1 {
            1
        } else {
            0
        }
    }
}

/// Full engine configuration snapshot for one surface
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Ordered shortcut dictionary; order breaks ranking ties
    #[serde(default)]
    pub shortcuts: Vec<ShortcutDefinition>,
    #[serde(default)]
    pub keywords: Vec<KeywordDefinition>,
    #[serde(default)]
    pub activation: ActivationConfig,
    /// Origin substrings that require clipboard-mediated insertion because
    /// the page's own framework resists direct content mutation
    #[serde(default)]
    pub compatibility_origins: Vec<String>,
}

impl EngineConfig {
    /// Whether the given host-page origin is flagged for clipboard-mediated
    /// insertion (substring match, case-insensitive).
    pub fn is_compat_origin(&self, origin: &str) -> bool {
        self.compatibility_origins
            .iter()
            .any(|pattern| contains_ci(origin, pattern))
    }

    /// Look up a shortcut by command, case-insensitive
    pub fn find_shortcut(&self, command: &str) -> Option<&ShortcutDefinition> {
        self.shortcuts
            .iter()
            .find(|def| def.command.eq_ignore_ascii_case(command))
    }
}

/// Path of the on-disk configuration file (~/.atalho/config.json)
pub fn config_path() -> PathBuf {
    PathBuf::from(shellexpand::tilde("~/.atalho/config.json").as_ref())
}

/// Load the engine configuration from disk, falling back to defaults.
///
/// Any IO or parse failure is logged and answered with
/// `EngineConfig::default()`; configuration problems never escalate.
#[instrument(name = "load_config")]
pub fn load_config() -> EngineConfig {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &PathBuf) -> EngineConfig {
    if !path.exists() {
        info!(path = %path.display(), "Config file not found, using defaults");
        return EngineConfig::default();
    }

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
            return EngineConfig::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(config) => {
            info!(path = %path.display(), "Loaded engine config");
            config
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
            EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_activation_config() {
        let config = ActivationConfig::default();
        assert_eq!(config.activation_key, "/");
        assert_eq!(config.activation_window_ms, 10_000);
        assert_eq!(config.typed_key_len(), 1);
    }

    #[test]
    fn test_named_activation_key_types_nothing() {
        let config = ActivationConfig {
            activation_key: "F2".to_string(),
            ..Default::default()
        };
        assert_eq!(config.typed_key_len(), 0);
    }

    #[test]
    fn test_compat_origin_substring_match() {
        let config = EngineConfig {
            compatibility_origins: vec!["web.whatsapp.com".to_string()],
            ..Default::default()
        };
        assert!(config.is_compat_origin("https://web.whatsapp.com/"));
        assert!(config.is_compat_origin("WEB.WHATSAPP.COM"));
        assert!(!config.is_compat_origin("https://example.com/"));
    }

    #[test]
    fn test_find_shortcut_case_insensitive() {
        let config = EngineConfig {
            shortcuts: vec![ShortcutDefinition::single("Oi", "Olá")],
            ..Default::default()
        };
        assert!(config.find_shortcut("oi").is_some());
        assert!(config.find_shortcut("OI").is_some());
        assert!(config.find_shortcut("tchau").is_none());
    }

    #[test]
    fn test_load_config_missing_file_defaults() {
        let path = PathBuf::from("/nonexistent/atalho-config.json");
        let config = load_config_from(&path);
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_config_invalid_json_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not json at all").unwrap();
        let config = load_config_from(&file.path().to_path_buf());
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                "shortcuts": [
                    {{"command": "oi", "messages": [{{"text": "Olá!", "autoSend": false}}]}}
                ],
                "keywords": [{{"key": "PIX", "value": "chave-pix-123"}}],
                "activation": {{"activationKey": "/", "activationWindowMs": 5000}},
                "compatibilityOrigins": ["web.whatsapp.com"]
            }}"#
        )
        .unwrap();

        let config = load_config_from(&file.path().to_path_buf());
        assert_eq!(config.shortcuts.len(), 1);
        assert_eq!(config.shortcuts[0].command, "oi");
        assert_eq!(config.keywords[0].key, "PIX");
        assert_eq!(config.activation.activation_window_ms, 5000);
        assert!(config.is_compat_origin("https://web.whatsapp.com/x"));
    }

    #[test]
    fn test_message_auto_send_defaults_false() {
        let msg: ShortcutMessage = serde_json::from_str(r#"{"text": "oi"}"#).unwrap();
        assert!(!msg.auto_send);
    }
}
