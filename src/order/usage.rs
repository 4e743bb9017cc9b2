//! Help text for compiled orders.

use super::compiler::CompiledHeaderSet;
use crate::config::HelpMessageStyle;

impl CompiledHeaderSet {
    /// All configured headers in declaration order, prefix included.
    ///
    /// The display-name entry is an alias for matching only and is omitted.
    pub fn list_headers(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| !e.is_synthetic())
            .map(|e| e.header())
            .collect()
    }

    /// Renders `h1|h2 <params>` after the description.
    ///
    /// `header_limit` caps how many headers are shown; `None` or `0` shows all.
    pub fn describe_usage(&self, header_limit: Option<usize>, style: HelpMessageStyle) -> String {
        let headers = self.list_headers();
        let shown = match header_limit {
            Some(limit) if limit > 0 => &headers[..limit.min(headers.len())],
            _ => &headers[..],
        };

        let mut follow = shown.join("|");
        if !self.param_usage.is_empty() {
            follow.push(' ');
            follow.push_str(&self.param_usage);
        }

        if self.description.is_empty() {
            follow
        } else {
            format!("{}{}{}", self.description, style.separator(), follow)
        }
    }
}
