/// Resolved `##fileformat=` version, per spec.md §3 "Source".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V41,
    V42,
    V43,
    /// Well-formed (printable) version string that doesn't match a known
    /// release; spec.md's error taxonomy only flags non-printable or
    /// out-of-range bytes, not unrecognized-but-well-formed version
    /// strings, so this is accepted rather than rejected.
    Unknown,
}

impl Version {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "VCFv4.1" => Some(Version::V41),
            "VCFv4.2" => Some(Version::V42),
            "VCFv4.3" => Some(Version::V43),
            _ if s.starts_with("VCFv") => Some(Version::Unknown),
            _ => None,
        }
    }
}

/// Either a freeform meta value (`##reference=...`) or a structured,
/// ordered attribute list (`##INFO=<ID=...,Number=...,...>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    Freeform(String),
    Structured(Vec<(String, String)>),
}

impl MetaValue {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        match self {
            MetaValue::Freeform(_) => None,
            MetaValue::Structured(attrs) => attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str()),
        }
    }
}

/// One `##key=value` or `##key=<...>` line, spec.md §3 "MetaEntry".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaEntry {
    pub line_number: u64,
    pub category: String,
    pub id: Option<String>,
    pub value: MetaValue,
}

/// Structured meta categories that require a unique `ID` attribute.
pub const ID_CATEGORIES: &[&str] = &["INFO", "FORMAT", "FILTER", "ALT", "contig", "SAMPLE", "PEDIGREE"];

/// `Number` values an INFO/FORMAT meta entry may declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberSpec {
    Count(u32),
    PerAltAllele,  // A
    PerAllele,     // R (incl. REF)
    PerGenotype,   // G
    Unknown,       // .
}

impl NumberSpec {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "A" => Some(NumberSpec::PerAltAllele),
            "R" => Some(NumberSpec::PerAllele),
            "G" => Some(NumberSpec::PerGenotype),
            "." => Some(NumberSpec::Unknown),
            _ => s.parse::<u32>().ok().map(NumberSpec::Count),
        }
    }
}

/// `Type` values an INFO/FORMAT meta entry may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSpec {
    Integer,
    Float,
    Flag,
    Character,
    String,
}

impl TypeSpec {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Integer" => Some(TypeSpec::Integer),
            "Float" => Some(TypeSpec::Float),
            "Flag" => Some(TypeSpec::Flag),
            "Character" => Some(TypeSpec::Character),
            "String" => Some(TypeSpec::String),
            _ => None,
        }
    }
}

/// Declared ALT-id prefixes, spec.md §3 "MetaEntry" ALT invariant.
pub const ALT_PREFIXES: &[&str] = &["DEL", "INS", "DUP", "INV", "CNV"];

/// Header description accumulated while scanning meta + header lines.
/// Frozen conceptually once body records begin, but stays readable.
#[derive(Debug, Clone, Default)]
pub struct Source {
    pub filename: String,
    pub version: Option<Version>,
    pub meta_entries: Vec<MetaEntry>,
    pub sample_names: Vec<String>,
    pub has_format_column: bool,
}

impl Source {
    pub fn new(filename: impl Into<String>) -> Self {
        Self { filename: filename.into(), ..Default::default() }
    }

    pub fn meta_by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a MetaEntry> + 'a {
        self.meta_entries.iter().filter(move |m| m.category == category)
    }

    pub fn find_meta_id<'a>(&'a self, category: &str, id: &str) -> Option<&'a MetaEntry> {
        self.meta_by_category(category).find(|m| m.id.as_deref() == Some(id))
    }

    /// Total number of tab-separated columns a body line must have, as
    /// remembered at `end_of_header_line` (spec.md §4.2).
    pub fn expected_column_count(&self) -> usize {
        let base = 8;
        if self.has_format_column {
            base + 1 + self.sample_names.len()
        } else {
            base
        }
    }
}

/// One element of the `ALT` column, spec.md §3 "Record".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alternate {
    /// A literal base sequence over {A,C,G,T,N,a,c,g,t,n}.
    Bases(String),
    /// `<ID>`, cross-checked against declared `ALT` meta entries.
    Symbolic(String),
    /// A breakend expression, e.g. `G]17:198982]`.
    Breakend(String),
    /// `*`, an upstream deletion allele.
    Spanning,
    /// A standalone `.` (no variant called at this allele position).
    Missing,
}

/// One body line, assembled column by column, spec.md §3 "Record".
#[derive(Debug, Clone)]
pub struct Record {
    pub line_number: u64,
    pub chromosome: String,
    pub position: u64,
    pub ids: Vec<String>,
    pub reference: String,
    pub alternates: Vec<Alternate>,
    pub quality: Option<f64>,
    pub filter: Vec<String>,
    pub info: Vec<(String, Option<String>)>,
    pub format: Vec<String>,
    /// Raw, colon-separated per-sample field, one entry per declared sample.
    pub samples: Vec<String>,
}

/// Expected `Number`/`Type` grammar for the reserved INFO keys of spec.md
/// §3 ("reserved ones"). Declared INFO meta entries take precedence;
/// this table only applies to keys that aren't declared in the meta.
pub fn reserved_info_spec(key: &str) -> Option<(NumberSpec, TypeSpec)> {
    use NumberSpec::*;
    use TypeSpec::*;
    let spec = match key {
        "AA" => (Count(1), String),
        "AC" => (PerAltAllele, Integer),
        "AF" => (PerAltAllele, Float),
        "AN" => (Count(1), Integer),
        "BQ" => (Count(1), Float),
        "CIGAR" => (PerAltAllele, String),
        "DB" => (Count(0), Flag),
        "DP" => (Count(1), Integer),
        "END" => (Count(1), Integer),
        "H2" => (Count(0), Flag),
        "H3" => (Count(0), Flag),
        "MQ" => (Count(1), Float),
        "MQ0" => (Count(1), Integer),
        "NS" => (Count(1), Integer),
        "SB" => (Count(4), Integer),
        "SOMATIC" => (Count(0), Flag),
        "VALIDATED" => (Count(0), Flag),
        "1000G" => (Count(0), Flag),
        _ => return None,
    };
    Some(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parses_known_releases_and_accepts_unknown() {
        assert_eq!(Version::parse("VCFv4.1"), Some(Version::V41));
        assert_eq!(Version::parse("VCFv4.3"), Some(Version::V43));
        assert_eq!(Version::parse("VCFv9.9"), Some(Version::Unknown));
        assert_eq!(Version::parse("garbage"), None);
    }

    #[test]
    fn number_spec_parses_symbols_and_counts() {
        assert_eq!(NumberSpec::parse("A"), Some(NumberSpec::PerAltAllele));
        assert_eq!(NumberSpec::parse("3"), Some(NumberSpec::Count(3)));
        assert_eq!(NumberSpec::parse("."), Some(NumberSpec::Unknown));
        assert_eq!(NumberSpec::parse("x"), None);
    }

    #[test]
    fn source_expected_column_count_accounts_for_format_and_samples() {
        let mut source = Source::new("test.vcf");
        assert_eq!(source.expected_column_count(), 8);
        source.has_format_column = true;
        source.sample_names.push("NA001".to_string());
        source.sample_names.push("NA002".to_string());
        assert_eq!(source.expected_column_count(), 11);
    }

    #[test]
    fn reserved_info_spec_covers_af_and_flags() {
        assert_eq!(reserved_info_spec("AF"), Some((NumberSpec::PerAltAllele, TypeSpec::Float)));
        assert_eq!(reserved_info_spec("DB"), Some((NumberSpec::Count(0), TypeSpec::Flag)));
        assert_eq!(reserved_info_spec("NOTREAL"), None);
    }
}
