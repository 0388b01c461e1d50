//! Streaming byte-level scanner, parse policy and semantic checker for the
//! Variant Call Format. See [`Validator`] for the entry point.

pub mod diagnostics;
pub mod error;
pub mod fields;
pub mod model;
pub mod policy;
pub mod scanner;
pub mod semantic;
pub mod state;

pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, Section, Severity};
pub use error::CoreError;
pub use model::{Alternate, MetaEntry, MetaValue, Record, Source, Version};
pub use policy::Validator;
