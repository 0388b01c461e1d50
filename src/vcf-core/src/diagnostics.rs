use serde::Serialize;
use std::fmt;

/// Which grammatical section of the file a diagnostic was raised in.
///
/// Mirrors spec.md §2's four sections plus the coarse dispatch used by the
/// Error Policy's four (plus one) handler entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    FileFormat,
    Meta,
    Header,
    Body,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::FileFormat => "fileformat",
            Section::Meta => "meta",
            Section::Header => "header",
            Section::Body => "body",
        };
        write!(f, "{name}")
    }
}

/// `error` — input deviates from grammar. `warning` — input is grammatically
/// valid but violates a recommendation or cross-line consistency rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One reported deviation, per spec.md §6's "Diagnostic output" contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub line_number: u64,
    pub column_number: Option<u64>,
    pub severity: Severity,
    pub section: Section,
    pub message: String,
}

impl Diagnostic {
    pub fn error(section: Section, line_number: u64, column_number: Option<u64>, message: impl Into<String>) -> Self {
        Self { line_number, column_number, severity: Severity::Error, section, message: message.into() }
    }

    pub fn warning(section: Section, line_number: u64, column_number: Option<u64>, message: impl Into<String>) -> Self {
        Self { line_number, column_number, severity: Severity::Warning, section, message: message.into() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match self.column_number {
            Some(col) => write!(f, "{}:{col}: {tag} ({}): {}", self.line_number, self.section, self.message),
            None => write!(f, "{}: {tag} ({}): {}", self.line_number, self.section, self.message),
        }
    }
}

/// The Error Policy / Diagnostic Sink of spec.md §2.4 and §4.4.
///
/// Implementations decide whether diagnostics abort, accumulate, or stream
/// out immediately; the default (`CollectingSink`) accumulates. A trait
/// object is used here (rather than a generic parameter) because this is
/// the one capability set the design deliberately makes swappable at
/// construction time — the CLI, a JSON reporter and a test harness each
/// want a different sink, while the scanning/parsing/semantic logic never
/// changes.
pub trait DiagnosticSink {
    /// Record one diagnostic. Called in strict source order.
    fn report(&mut self, diagnostic: Diagnostic);

    /// When true, the `Validator` stops scanning after the first error
    /// (spec.md §7: "opt-in behavior through a policy switch").
    fn fail_fast(&self) -> bool {
        false
    }
}

/// Default sink: accumulates every diagnostic in source order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Vec<Diagnostic>,
    fail_fast: bool,
}

impl CollectingSink {
    pub fn new(fail_fast: bool) -> Self {
        Self { diagnostics: Vec::new(), fail_fast }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    fn fail_fast(&self) -> bool {
        self.fail_fast
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_preserves_report_order() {
        let mut sink = CollectingSink::new(false);
        sink.report(Diagnostic::error(Section::Body, 1, Some(1), "first"));
        sink.report(Diagnostic::warning(Section::Body, 2, None, "second"));
        assert_eq!(sink.diagnostics().len(), 2);
        assert_eq!(sink.diagnostics()[0].message, "first");
        assert!(sink.has_errors());
    }

    #[test]
    fn display_includes_column_only_when_known() {
        let with_col = Diagnostic::error(Section::FileFormat, 1, Some(3), "oops");
        assert_eq!(with_col.to_string(), "1:3: error (fileformat): oops");
        let without_col = Diagnostic::warning(Section::Meta, 4, None, "hmm");
        assert_eq!(without_col.to_string(), "4: warning (meta): hmm");
    }
}
