//! Configuration management for bot-dispatch.
//!
//! Handles loading the directive settings and order definitions from TOML
//! files. Orders are authored externally; this module only describes their
//! schema and converts them into engine inputs.

use crate::error::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Global directive settings shared by every order.
    #[serde(default)]
    pub directive: DirectiveConfig,

    /// Registered orders, in declaration order.
    #[serde(default)]
    pub orders: Vec<OrderConfig>,
}

/// Global directive settings.
///
/// The prefix is baked into compiled header sets; the two toggles are read
/// at match time, so flipping them takes effect without recompiling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectiveConfig {
    /// Global header prefix (e.g. "!" or "#").
    #[serde(default)]
    pub header: String,

    /// Recognize CJK headers anywhere in the input.
    #[serde(default)]
    pub fuzzy_match: bool,

    /// Recognize a header by literal prefix when arguments are malformed.
    #[serde(default = "default_match_prompt")]
    pub match_prompt: bool,

    /// Layout of rendered help lines.
    #[serde(default)]
    pub help_message_style: HelpMessageStyle,

    /// Upper bound on regex backtracking steps per match attempt.
    #[serde(default = "default_backtrack_limit")]
    pub backtrack_limit: usize,
}

fn default_match_prompt() -> bool {
    true
}

fn default_backtrack_limit() -> usize {
    1_000_000
}

impl Default for DirectiveConfig {
    fn default() -> Self {
        Self {
            header: String::new(),
            fuzzy_match: false,
            match_prompt: default_match_prompt(),
            help_message_style: HelpMessageStyle::default(),
            backtrack_limit: default_backtrack_limit(),
        }
    }
}

impl DirectiveConfig {
    /// Creates a directive config with the given prefix and default toggles.
    pub fn with_prefix(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..Default::default()
        }
    }

    /// Returns true if switching to `other` requires recompiling header sets.
    ///
    /// The fuzzy and prompt toggles are read at match time and never do.
    pub fn requires_recompile(&self, other: &DirectiveConfig) -> bool {
        self.header != other.header || self.backtrack_limit != other.backtrack_limit
    }
}

/// How a help line joins the description and the usage text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HelpMessageStyle {
    /// Description and usage on one line.
    #[default]
    Message,
    /// Usage on its own line below the description.
    Card,
}

impl HelpMessageStyle {
    /// Returns the separator placed between description and usage.
    pub fn separator(&self) -> &'static str {
        match self {
            Self::Message => " ",
            Self::Card => "\n",
        }
    }
}

impl std::str::FromStr for HelpMessageStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "message" => Ok(Self::Message),
            "card" => Ok(Self::Card),
            _ => Err(format!(
                "Invalid help message style: {s}. Expected: message or card"
            )),
        }
    }
}

/// Parameter patterns as authored: a single row or a list of rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Regexps {
    /// One row of fragment patterns.
    Single(Vec<String>),
    /// Several alternative rows.
    Rows(Vec<Vec<String>>),
}

impl Default for Regexps {
    fn default() -> Self {
        Self::Single(Vec::new())
    }
}

impl Regexps {
    /// Normalizes into a list of rows. A flat list (even an empty one) is one row.
    pub fn into_rows(self) -> Vec<Vec<String>> {
        match self {
            Self::Single(row) => vec![row],
            Self::Rows(rows) => rows,
        }
    }
}

/// One order as stored in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderConfig {
    /// Unique key of the order.
    pub name: String,

    /// Short description shown in help.
    #[serde(default)]
    pub description: String,

    /// Parameter usage text shown after the headers in help.
    #[serde(default)]
    pub param_usage: String,

    /// Natural-language name, used as an extra header under fuzzy matching.
    #[serde(default)]
    pub display_name: Option<String>,

    /// Header aliases, in precedence order.
    pub headers: Vec<String>,

    /// Parameter fragment patterns.
    #[serde(default)]
    pub regexps: Regexps,

    /// Require the header at the start of input.
    #[serde(default)]
    pub start: Option<bool>,

    /// Require the parameters to end the input.
    #[serde(default)]
    pub stop: Option<bool>,

    /// Evaluation priority; higher runs first.
    #[serde(default)]
    pub priority: Option<i32>,

    /// Match headers and parameters case-sensitively.
    #[serde(default)]
    pub case_sensitive: bool,

    /// Access level, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<serde_json::Value>,

    /// Chat scope, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<serde_json::Value>,

    /// Whether the order participates in dispatch.
    #[serde(default = "default_enable")]
    pub enable: bool,
}

fn default_enable() -> bool {
    true
}

impl OrderConfig {
    /// Returns the fields the admin layer writes back after edits.
    pub fn persisted(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "order",
            "auth": self.auth,
            "scope": self.scope,
            "headers": self.headers,
            "enable": self.enable,
            "priority": self.priority.unwrap_or(0),
        })
    }

    /// Merges fields written by [`OrderConfig::persisted`] back over the
    /// authored config.
    ///
    /// `headers`, `auth` and `scope` are replaced when present. A missing
    /// `enable` keeps the current value. `priority` is read leniently: a
    /// number or a string with a leading integer, anything else is 0.
    pub fn apply_persisted(&mut self, loaded: &serde_json::Value) {
        if let Some(headers) = loaded.get("headers").and_then(|h| h.as_array()) {
            self.headers = headers
                .iter()
                .filter_map(|h| h.as_str().map(str::to_string))
                .collect();
        }
        self.auth = loaded.get("auth").filter(|v| !v.is_null()).cloned();
        self.scope = loaded.get("scope").filter(|v| !v.is_null()).cloned();
        if let Some(enable) = loaded.get("enable").and_then(|e| e.as_bool()) {
            self.enable = enable;
        }
        self.priority = Some(lenient_priority(loaded.get("priority")));
    }
}

fn lenient_priority(value: Option<&serde_json::Value>) -> i32 {
    match value {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .and_then(|p| i32::try_from(p).ok())
            .unwrap_or(0),
        Some(serde_json::Value::String(s)) => {
            let s = s.trim_start();
            let digits = s
                .char_indices()
                .take_while(|&(i, c)| c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+')))
                .map(|(i, c)| i + c.len_utf8())
                .last()
                .unwrap_or(0);
            s[..digits].parse().unwrap_or(0)
        }
        _ => 0,
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bot-dispatch")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| DispatchError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            DispatchError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks structural constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (idx, order) in self.orders.iter().enumerate() {
            if order.name.trim().is_empty() {
                return Err(DispatchError::config(format!(
                    "orders[{idx}] has an empty name"
                )));
            }
            if !seen.insert(order.name.as_str()) {
                return Err(DispatchError::config(format!(
                    "Duplicate order name '{}'",
                    order.name
                )));
            }
        }
        Ok(())
    }

    /// Gets an order by name.
    pub fn get_order(&self, name: &str) -> Option<&OrderConfig> {
        self.orders.iter().find(|o| o.name == name)
    }
}
