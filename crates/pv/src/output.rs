//! Colored terminal output for status and error reporting.

use std::fmt::Display;

use console::{Style, Term};

/// Width the field labels are padded to, so values line up.
const LABEL_WIDTH: usize = 11;

/// Writes styled lines to stderr, leaving stdout for the rendered page.
pub(crate) struct Output {
    term: Term,
    label: Style,
    fresh: Style,
    stale: Style,
    failure: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            label: Style::new().bold(),
            fresh: Style::new().green(),
            stale: Style::new().yellow(),
            failure: Style::new().red(),
        }
    }

    /// Print `label: value` with the label bold and right-aligned.
    pub(crate) fn field(&self, label: &str, value: impl Display) {
        let label = format!("{label:>LABEL_WIDTH$}:");
        self.line(&format!("{} {value}", self.label.apply_to(label)));
    }

    /// Print a line about state that needs no action (green).
    pub(crate) fn fresh(&self, msg: &str) {
        self.line(&self.fresh.apply_to(msg).to_string());
    }

    /// Print a line about state that will change on the next render (yellow).
    pub(crate) fn stale(&self, msg: &str) {
        self.line(&self.stale.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        self.line(&self.failure.apply_to(msg).to_string());
    }

    fn line(&self, text: &str) {
        // Nothing useful to do if stderr is gone
        let _ = self.term.write_line(text);
    }
}
