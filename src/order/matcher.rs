//! Runtime matching of input against a compiled order.
//!
//! Headers are scanned in declaration order. For each header the compiled
//! rows are tried against the raw input first; if none hits, an optional
//! header probe decides whether the header was meant anyway. A recognized
//! header either rescues the input (strip and re-prepend the header, then
//! retry the rows) or reports bad arguments.

use super::compiler::{CompiledHeaderSet, HeaderEntry};
use super::header::{bare_header, contains_cjk};
use crate::config::DirectiveConfig;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Result of matching one input against one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchOutcome {
    /// A row matched; one argument per fragment of that row.
    Matched {
        header: String,
        arguments: Vec<String>,
    },
    /// The header was recognized but no row accepted the arguments.
    HeaderOnly {
        header: String,
        /// Input with prefix and header removed, trimmed.
        raw_remainder: String,
        /// The input as received.
        input: String,
    },
    /// Nothing recognized.
    NoMatch,
}

impl MatchOutcome {
    /// Returns true for `Matched` and `HeaderOnly`.
    pub fn is_conclusive(&self) -> bool {
        !matches!(self, Self::NoMatch)
    }

    /// Returns the header of a conclusive outcome.
    pub fn header(&self) -> Option<&str> {
        match self {
            Self::Matched { header, .. } | Self::HeaderOnly { header, .. } => Some(header),
            Self::NoMatch => None,
        }
    }
}

/// Why a header probe could not be built.
///
/// Headers and prefixes are escaped before assembly, so in practice this
/// only fires when an expression exceeds the engine's compiled size limit.
#[derive(Debug, Error)]
pub(crate) enum ProbeInapplicable {
    #[error("invalid detection pattern: {0}")]
    Detection(#[from] fancy_regex::Error),
    #[error("invalid strip pattern: {0}")]
    Strip(#[from] regex::Error),
}

/// Which heuristic produced the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeKind {
    /// CJK header found anywhere in the input.
    FuzzyContainment,
    /// Input starts with the literal header.
    PromptPrefix,
}

/// Detection and normalization expressions for one header.
#[derive(Debug)]
pub(crate) struct HeaderProbe {
    kind: ProbeKind,
    header: String,
    detector: fancy_regex::Regex,
    stripper: regex::Regex,
}

impl HeaderProbe {
    /// Builds the probe for `header`, or `None` if neither toggle applies
    /// or the expressions cannot be built.
    pub(crate) fn build(
        header: &str,
        directive: &DirectiveConfig,
        case_sensitive: bool,
    ) -> Option<Self> {
        let (kind, pattern) = detection_pattern(header, directive)?;
        match Self::compile(kind, &pattern, header, directive, case_sensitive) {
            Ok(probe) => Some(probe),
            Err(err) => {
                debug!(header, error = %err, "Header probe inapplicable");
                None
            }
        }
    }

    fn compile(
        kind: ProbeKind,
        pattern: &str,
        header: &str,
        directive: &DirectiveConfig,
        case_sensitive: bool,
    ) -> Result<Self, ProbeInapplicable> {
        let detector = fancy_regex::RegexBuilder::new(&case_flag(pattern, case_sensitive))
            .backtrack_limit(directive.backtrack_limit)
            .build()?;

        let prefix = directive.header.as_str();
        let bare = bare_header(header, prefix);
        let mut parts: Vec<&str> = Vec::with_capacity(2);
        for part in [prefix, bare.as_ref()] {
            if !part.is_empty() && !parts.contains(&part) {
                parts.push(part);
            }
        }
        let strip_pattern = parts
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|");
        let stripper = regex::RegexBuilder::new(&strip_pattern)
            .case_insensitive(!case_sensitive)
            .build()?;

        Ok(Self {
            kind,
            header: header.to_string(),
            detector,
            stripper,
        })
    }

    /// Returns true if the input looks like an invocation of this header.
    pub(crate) fn detects(&self, input: &str) -> bool {
        self.detector.is_match(input).unwrap_or(false)
    }

    /// Removes every prefix and bare-header occurrence, then trims.
    ///
    /// Removal repeats until nothing changes, so the result never contains
    /// an occurrence.
    pub(crate) fn remainder(&self, input: &str) -> String {
        let mut current = input.to_string();
        loop {
            let next = self.stripper.replace_all(&current, "");
            if next == current {
                break;
            }
            current = next.into_owned();
        }
        current.trim().to_string()
    }

    /// Re-anchors a loosely formatted invocation into canonical form.
    pub(crate) fn reconstruct(&self, input: &str) -> String {
        format!("{}{}", self.header, self.remainder(input))
    }
}

fn case_flag(pattern: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        pattern.to_string()
    } else {
        format!("(?i){pattern}")
    }
}

/// Chooses the heuristic for a header and builds its detection pattern.
fn detection_pattern(header: &str, directive: &DirectiveConfig) -> Option<(ProbeKind, String)> {
    let prefix = directive.header.as_str();
    let bare = bare_header(header, prefix);

    if directive.fuzzy_match && !bare.is_empty() && contains_cjk(&bare) {
        let mut pattern = String::new();
        if !prefix.is_empty() && header.contains(prefix) {
            pattern.push_str(&format!("(?=^{})", fancy_regex::escape(prefix)));
        }
        pattern.push_str(&format!("(?=.*?{})", fancy_regex::escape(&bare)));
        return Some((ProbeKind::FuzzyContainment, pattern));
    }

    if directive.match_prompt && !prefix.is_empty() && !header.is_empty() {
        return Some((
            ProbeKind::PromptPrefix,
            format!("^{}", fancy_regex::escape(header)),
        ));
    }

    None
}

impl HeaderEntry {
    fn resolve(
        &self,
        input: &str,
        directive: &DirectiveConfig,
        case_sensitive: bool,
    ) -> MatchOutcome {
        if let Some(arguments) = self.exact(input) {
            return MatchOutcome::Matched {
                header: self.header.clone(),
                arguments,
            };
        }

        if self.rows.is_empty() {
            return MatchOutcome::NoMatch;
        }
        let Some(probe) = HeaderProbe::build(&self.header, directive, case_sensitive) else {
            return MatchOutcome::NoMatch;
        };
        if !probe.detects(input) {
            return MatchOutcome::NoMatch;
        }

        let rebuilt = probe.reconstruct(input);
        if let Some(arguments) = self.exact(&rebuilt) {
            debug!(header = %self.header, kind = ?probe.kind, rebuilt = %rebuilt, "Rescued input");
            return MatchOutcome::Matched {
                header: self.header.clone(),
                arguments,
            };
        }

        MatchOutcome::HeaderOnly {
            header: self.header.clone(),
            raw_remainder: probe.remainder(input),
            input: input.to_string(),
        }
    }
}

impl CompiledHeaderSet {
    /// Matches `input` against every header, in declaration order.
    ///
    /// The first header producing `Matched` or `HeaderOnly` ends the scan.
    /// `directive` supplies the prefix and the fuzzy/prompt toggles; the
    /// display-name entry only participates while `fuzzy_match` is on.
    pub fn match_input(&self, input: &str, directive: &DirectiveConfig) -> MatchOutcome {
        self.entries
            .iter()
            .filter(|entry| directive.fuzzy_match || !entry.is_synthetic())
            .map(|entry| entry.resolve(input, directive, self.case_sensitive))
            .find(MatchOutcome::is_conclusive)
            .unwrap_or(MatchOutcome::NoMatch)
    }
}
