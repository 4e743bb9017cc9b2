//! Pattern compiler for orders.
//!
//! Turns a [`CommandSpec`] into a [`CompiledHeaderSet`]: one compiled matcher
//! per (header × parameter row). User-authored capturing groups are rewritten
//! to non-capturing groups before assembly, so capture index `i + 1` always
//! belongs to fragment `i` of the row.

use super::header::combine_header;
use super::CommandSpec;
use crate::config::DirectiveConfig;
use crate::error::{DispatchError, Result};
use fancy_regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

/// Compile-time settings taken from the directive config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Global header prefix combined into every header.
    pub header_prefix: String,
    /// Backtracking bound applied to every compiled matcher.
    pub backtrack_limit: usize,
}

impl CompileOptions {
    /// Creates options with the given prefix and the default backtrack limit.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            header_prefix: prefix.into(),
            ..Self::from_directive(&DirectiveConfig::default())
        }
    }

    /// Derives options from the directive config.
    pub fn from_directive(directive: &DirectiveConfig) -> Self {
        Self {
            header_prefix: directive.header.clone(),
            backtrack_limit: directive.backtrack_limit,
        }
    }
}

/// One compiled parameter row.
#[derive(Debug, Clone)]
pub struct CompiledRow {
    regex: Regex,
    /// Capture-group index for each fragment of the row, in order.
    capture_slots: Vec<usize>,
}

impl CompiledRow {
    /// Returns the generated pattern.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Returns the capture-group index of each fragment.
    pub fn capture_slots(&self) -> &[usize] {
        &self.capture_slots
    }

    /// Runs the row against `input`, returning one argument per fragment.
    ///
    /// A matcher that exceeds its backtrack limit counts as no match.
    pub fn arguments(&self, input: &str) -> Option<Vec<String>> {
        let caps = match self.regex.captures(input) {
            Ok(Some(caps)) => caps,
            Ok(None) => return None,
            Err(err) => {
                warn!(pattern = self.pattern(), error = %err, "Matcher aborted, treating as no match");
                return None;
            }
        };

        Some(
            self.capture_slots
                .iter()
                .map(|&slot| {
                    caps.get(slot)
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_default()
                })
                .collect(),
        )
    }
}

/// Compiled matchers for one header.
#[derive(Debug, Clone)]
pub struct HeaderEntry {
    pub(crate) header: String,
    pub(crate) rows: Vec<CompiledRow>,
    pub(crate) synthetic: bool,
}

impl HeaderEntry {
    /// The header, already combined with the global prefix.
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Compiled rows, in declaration order.
    pub fn rows(&self) -> &[CompiledRow] {
        &self.rows
    }

    /// True for the entry generated from the display name.
    ///
    /// Synthetic entries only take part in matching while fuzzy matching
    /// is enabled.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// Tries every row in order; the first hit wins.
    pub(crate) fn exact(&self, input: &str) -> Option<Vec<String>> {
        self.rows.iter().find_map(|row| row.arguments(input))
    }
}

/// All compiled matchers for one order.
#[derive(Debug, Clone)]
pub struct CompiledHeaderSet {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) param_usage: String,
    pub(crate) case_sensitive: bool,
    pub(crate) entries: Vec<HeaderEntry>,
}

impl CompiledHeaderSet {
    /// Name of the order this set was compiled from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Header entries, in evaluation order.
    pub fn entries(&self) -> &[HeaderEntry] {
        &self.entries
    }
}

/// Compiles every header and parameter row of an order.
///
/// Fails on the first row whose pattern does not compile.
pub fn compile(spec: &CommandSpec, options: &CompileOptions) -> Result<CompiledHeaderSet> {
    let mut headers: Vec<(String, bool)> = spec
        .headers
        .iter()
        .map(|h| (combine_header(h, &options.header_prefix), false))
        .collect();

    if let Some(name) = spec.display_name.as_deref().filter(|n| !n.is_empty()) {
        headers.push((combine_header(name, &options.header_prefix), true));
    }

    let entries = headers
        .into_iter()
        .map(|(header, synthetic)| -> Result<HeaderEntry> {
            let rows = spec
                .parameter_rows
                .iter()
                .enumerate()
                .map(|(row_idx, row)| compile_row(spec, &header, row_idx, row, options))
                .collect::<Result<Vec<_>>>()?;
            Ok(HeaderEntry {
                header,
                rows,
                synthetic,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        order = %spec.name,
        headers = entries.len(),
        rows = spec.parameter_rows.len(),
        "Compiled order"
    );

    Ok(CompiledHeaderSet {
        name: spec.name.clone(),
        description: spec.description.clone(),
        param_usage: spec.param_usage.clone(),
        case_sensitive: spec.case_sensitive,
        entries,
    })
}

fn compile_row(
    spec: &CommandSpec,
    header: &str,
    row_idx: usize,
    row: &[String],
    options: &CompileOptions,
) -> Result<CompiledRow> {
    let (pattern, capture_slots) = build_pattern(header, row, spec)
        .map_err(|message| DispatchError::compile(&spec.name, header, row_idx, message))?;

    let regex = RegexBuilder::new(&pattern)
        .backtrack_limit(options.backtrack_limit)
        .build()
        .map_err(|e| DispatchError::compile(&spec.name, header, row_idx, e.to_string()))?;

    let groups = regex.captures_len() - 1;
    if groups != capture_slots.len() {
        return Err(DispatchError::compile(
            &spec.name,
            header,
            row_idx,
            format!(
                "expected {} capture groups, pattern has {groups}",
                capture_slots.len()
            ),
        ));
    }

    Ok(CompiledRow {
        regex,
        capture_slots,
    })
}

/// Assembles the full pattern for one header and row.
fn build_pattern(
    header: &str,
    row: &[String],
    spec: &CommandSpec,
) -> std::result::Result<(String, Vec<usize>), String> {
    let mut pattern = String::new();
    if !spec.case_sensitive {
        pattern.push_str("(?i)");
    }
    if spec.start_anchor {
        pattern.push('^');
    }
    pattern.push_str(&fancy_regex::escape(header));

    let mut capture_slots = Vec::with_capacity(row.len());
    for (idx, fragment) in row.iter().enumerate() {
        pattern.push_str(r"\s*(");
        pattern.push_str(&normalize_groups(fragment)?);
        pattern.push(')');
        capture_slots.push(idx + 1);
    }

    if spec.stop_anchor {
        pattern.push('$');
    }
    Ok((pattern, capture_slots))
}

/// Rewrites every capturing group in a fragment into a non-capturing one.
///
/// Plain `(` and named groups `(?P<n>` / `(?<n>` become `(?:`. Escapes,
/// character classes and other `(?…)` constructs are left alone.
///
/// Backreferences (`\1`, `\k<n>`, `(?P=n)`) are rejected: once the groups
/// they name are gone they would resolve to the fragment captures instead.
pub fn normalize_groups(fragment: &str) -> std::result::Result<String, String> {
    let chars: Vec<char> = fragment.chars().collect();
    let mut out = String::with_capacity(fragment.len() + 8);
    let mut class_depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                if class_depth == 0 {
                    match chars.get(i + 1) {
                        Some(d @ '1'..='9') => {
                            return Err(format!("backreference \\{d} is not supported"));
                        }
                        Some('k') => return Err("backreference \\k is not supported".to_string()),
                        _ => {}
                    }
                }
                out.push(c);
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                }
                i += 2;
            }
            '[' => {
                class_depth += 1;
                out.push(c);
                i += 1;
                // a leading `]` (after an optional `^`) is a literal
                if chars.get(i) == Some(&'^') {
                    out.push('^');
                    i += 1;
                }
                if chars.get(i) == Some(&']') {
                    out.push(']');
                    i += 1;
                }
            }
            ']' if class_depth > 0 => {
                class_depth -= 1;
                out.push(c);
                i += 1;
            }
            '(' if class_depth == 0 => {
                if chars.get(i + 1) != Some(&'?') {
                    out.push_str("(?:");
                    i += 1;
                    continue;
                }
                if chars[i + 2..].starts_with(&['P', '=']) {
                    return Err("backreference (?P=...) is not supported".to_string());
                }
                match named_group_end(&chars[i + 2..]) {
                    Some(len) => {
                        out.push_str("(?:");
                        i += 2 + len;
                    }
                    None => {
                        out.push(c);
                        i += 1;
                    }
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok(out)
}

/// If `rest` (the text after `(?`) opens a named group, returns the length
/// of the `P<name>` / `<name>` part including the closing `>`.
fn named_group_end(rest: &[char]) -> Option<usize> {
    let skip = if rest.starts_with(&['P', '<']) {
        2
    } else if rest.first() == Some(&'<') && !matches!(rest.get(1), Some(&'=') | Some(&'!')) {
        1
    } else {
        return None;
    };
    rest[skip..]
        .iter()
        .position(|&c| c == '>')
        .map(|pos| skip + pos + 1)
}
