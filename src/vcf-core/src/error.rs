use thiserror::Error;

/// Genuinely exceptional conditions — never raised for grammar or semantic
/// violations, which are always reported as [`crate::diagnostics::Diagnostic`]
/// values instead (spec.md §7's two-channel error model).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("stopped after the first error diagnostic (fail-fast policy) at line {line}")]
    FailFastStop { line: u64 },
}
