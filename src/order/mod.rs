//! Order matching engine.
//!
//! An order is a command invoked by one of its headers followed by
//! arguments described as rows of regex fragments. This module compiles
//! orders into matchers and resolves input against them.

pub mod compiler;
pub mod header;
pub mod matcher;
pub mod usage;

pub use compiler::{compile, CompileOptions, CompiledHeaderSet, CompiledRow, HeaderEntry};
pub use matcher::MatchOutcome;

use crate::config::OrderConfig;

/// Engine input for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Unique key of the order.
    pub name: String,
    /// Header aliases, as configured (not yet combined with the prefix).
    pub headers: Vec<String>,
    /// Alternative argument syntaxes, each a sequence of fragment patterns.
    pub parameter_rows: Vec<Vec<String>>,
    pub start_anchor: bool,
    pub stop_anchor: bool,
    pub case_sensitive: bool,
    /// Higher runs first.
    pub priority: i32,
    pub description: String,
    pub param_usage: String,
    pub display_name: Option<String>,
}

impl CommandSpec {
    /// Creates a spec with both anchors on and case-insensitive matching.
    pub fn new(
        name: impl Into<String>,
        headers: Vec<String>,
        parameter_rows: Vec<Vec<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            headers,
            parameter_rows,
            start_anchor: true,
            stop_anchor: true,
            case_sensitive: false,
            priority: 0,
            description: String::new(),
            param_usage: String::new(),
            display_name: None,
        }
    }

    pub fn with_anchors(mut self, start: bool, stop: bool) -> Self {
        self.start_anchor = start;
        self.stop_anchor = stop;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_usage(mut self, description: impl Into<String>, param: impl Into<String>) -> Self {
        self.description = description.into();
        self.param_usage = param.into();
        self
    }
}

impl From<&OrderConfig> for CommandSpec {
    fn from(config: &OrderConfig) -> Self {
        Self {
            name: config.name.clone(),
            headers: config.headers.clone(),
            parameter_rows: config.regexps.clone().into_rows(),
            start_anchor: config.start != Some(false),
            stop_anchor: config.stop != Some(false),
            case_sensitive: config.case_sensitive,
            priority: config.priority.unwrap_or(0),
            description: config.description.clone(),
            param_usage: config.param_usage.clone(),
            display_name: config.display_name.clone(),
        }
    }
}
