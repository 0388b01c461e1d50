use crate::model::Source;
use ahash::{AHashMap, AHashSet};

/// Shared data referenced by the parse policy and semantic checker for the
/// lifetime of a single scan, spec.md §3/§4.5 "ParsingState".
///
/// Note that `records` is *not* accumulated here: spec.md §1's Non-goals
/// exclude "producing a parsed AST for downstream tools", so each `Record`
/// is discarded as soon as the semantic checks that need it have run. Only
/// the small amount of state those cross-line checks require — counters
/// and suppression sets — persists across records.
#[derive(Debug)]
pub struct ParsingState {
    pub source: Source,
    pub records_seen: u64,
    pub line_number: u64,
    pub column_number: u64,
    /// Chromosomes already flagged as missing a `contig` meta entry, so the
    /// warning fires at most once per chromosome (spec.md §4.3).
    pub bad_defined_contigs: AHashSet<String>,
    /// Highest position seen so far, per chromosome, for the monotonic
    /// position check.
    pub max_position_per_chromosome: AHashMap<String, u64>,
}

impl ParsingState {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            source: Source::new(filename),
            records_seen: 0,
            line_number: 0,
            column_number: 1,
            bad_defined_contigs: AHashSet::default(),
            max_position_per_chromosome: AHashMap::default(),
        }
    }
}
