//! Per-field sub-grammars, spec.md §4.1: "Per-field sub-grammars (body
//! column): each follows its own local automaton."
//!
//! Each `validate_*` function is a small, deterministic, non-backtracking,
//! single left-to-right pass over one fully assembled field. The byte-level
//! boundary between fields (tabs, the structured-meta `<...>` span, etc.) is
//! found by [`crate::scanner::Scanner`]; the Parse Policy
//! ([`crate::policy::Validator`]) accumulates the bytes of each token and
//! calls the matching function here once the token is complete. Keeping one
//! function per column keeps every error message tied to the exact field
//! that produced it.

use crate::model::{Alternate, ALT_PREFIXES};

fn is_nucleotide(b: u8) -> bool {
    matches!(b, b'A' | b'C' | b'G' | b'T' | b'N' | b'a' | b'c' | b'g' | b't' | b'n')
}

/// CHROM: non-empty, no colon or whitespace; may be wrapped in `<...>`.
pub fn validate_chromosome(field: &str) -> Result<String, String> {
    if field.is_empty() {
        return Err("Chromosome is empty".to_string());
    }
    let inner = if let Some(stripped) = field.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        stripped
    } else {
        field
    };
    if inner.is_empty() {
        return Err("Chromosome is empty".to_string());
    }
    if inner.bytes().any(|b| b == b':' || b.is_ascii_whitespace()) {
        return Err(format!("Chromosome '{field}' contains a colon or whitespace"));
    }
    Ok(field.to_string())
}

/// POS: non-negative integer; the spec's own example message is kept
/// verbatim ("Position is not a positive number").
pub fn validate_position(field: &str) -> Result<u64, String> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err("Position is not a positive number".to_string());
    }
    field.parse::<u64>().map_err(|_| "Position is not a positive number".to_string())
}

/// ID: either a single `.` or a semicolon-separated list with no whitespace.
pub fn validate_ids(field: &str) -> Result<Vec<String>, String> {
    if field == "." {
        return Ok(Vec::new());
    }
    if field.is_empty() {
        return Err("ID field is empty".to_string());
    }
    let mut ids = Vec::new();
    for id in field.split(';') {
        if id.is_empty() || id.bytes().any(|b| b.is_ascii_whitespace()) {
            return Err(format!("ID entry '{id}' is empty or contains whitespace"));
        }
        ids.push(id.to_string());
    }
    Ok(ids)
}

/// REF: non-empty string over {A,C,G,T,N,a,c,g,t,n}.
pub fn validate_reference(field: &str) -> Result<String, String> {
    if field.is_empty() {
        return Err("Reference allele is empty".to_string());
    }
    if let Some(bad) = field.bytes().find(|b| !is_nucleotide(*b)) {
        return Err(format!("Reference allele contains invalid character '{}'", bad as char));
    }
    Ok(field.to_string())
}

/// Validate one breakend expression: `t[chr:pos[`, `t]chr:pos]`,
/// `[chr:pos[t` or `]chr:pos]t`, where `t` is a (possibly empty) base run.
fn validate_breakend(elem: &str) -> Result<(), String> {
    let opens = elem.matches('[').count();
    let closes = elem.matches(']').count();
    if opens + closes != 2 || (opens != 2 && closes != 2) {
        return Err(format!("Alternate allele '{elem}' is not a well-formed breakend expression"));
    }
    let bracket = if opens == 2 { '[' } else { ']' };
    let inner = elem.split(bracket).nth(1).unwrap_or("");
    let mut parts = inner.splitn(2, ':');
    let chrom = parts.next().unwrap_or("");
    let pos = parts.next().unwrap_or("");
    if chrom.is_empty() || pos.is_empty() || !pos.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("Alternate allele '{elem}' has a malformed breakend coordinate"));
    }
    Ok(())
}

/// ALT: `.` or a comma-separated list of bases / symbolic alleles /
/// breakends / `*` / `.`.
pub fn validate_alternates(field: &str) -> Result<Vec<Alternate>, String> {
    if field == "." {
        return Ok(Vec::new());
    }
    if field.is_empty() {
        return Err("Alternate allele field is empty".to_string());
    }
    let elements: Vec<&str> = field.split(',').collect();
    let mut out = Vec::with_capacity(elements.len());
    for elem in elements {
        if elem.is_empty() {
            return Err("Alternate allele list contains an empty entry".to_string());
        }
        let parsed = if elem == "*" {
            Alternate::Spanning
        } else if elem == "." {
            Alternate::Missing
        } else if let Some(id) = elem.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
            if id.is_empty() || id.bytes().any(|b| b.is_ascii_whitespace()) {
                return Err(format!("Symbolic allele '{elem}' has an invalid ID"));
            }
            Alternate::Symbolic(id.to_string())
        } else if elem.contains('[') || elem.contains(']') {
            validate_breakend(elem)?;
            Alternate::Breakend(elem.to_string())
        } else if elem.bytes().all(is_nucleotide) {
            Alternate::Bases(elem.to_string())
        } else {
            return Err(format!(
                "Alternate allele '{elem}' is not a valid base sequence, symbolic allele, or breakend expression"
            ));
        };
        out.push(parsed);
    }
    Ok(out)
}

/// QUAL: `.` or a non-negative decimal number, scientific notation allowed.
pub fn validate_quality(field: &str) -> Result<Option<f64>, String> {
    if field == "." {
        return Ok(None);
    }
    let bytes = field.as_bytes();
    let mut i = 0;
    let mut saw_digit = false;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        saw_digit = true;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            saw_digit = true;
        }
    }
    if !saw_digit {
        return Err("Quality is not a non-negative number".to_string());
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let mut saw_exp_digit = false;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            saw_exp_digit = true;
        }
        if !saw_exp_digit {
            return Err("Quality is not a non-negative number".to_string());
        }
    }
    if i != bytes.len() {
        return Err("Quality is not a non-negative number".to_string());
    }
    field.parse::<f64>().map(Some).map_err(|_| "Quality is not a non-negative number".to_string())
}

fn is_identifier_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-')
}

/// FILTER: `.` or a semicolon-separated list of identifiers (`PASS` or a
/// declared FILTER id — the cross-reference itself is a semantic check).
pub fn validate_filter(field: &str) -> Result<Vec<String>, String> {
    if field == "." {
        return Ok(Vec::new());
    }
    if field.is_empty() {
        return Err("Filter field is empty".to_string());
    }
    let mut filters = Vec::new();
    for id in field.split(';') {
        if id.is_empty() || !id.bytes().all(is_identifier_char) {
            return Err(format!("Filter entry '{id}' contains invalid characters"));
        }
        filters.push(id.to_string());
    }
    Ok(filters)
}

/// INFO: `.` or a semicolon-separated list of `key[=value]` pairs. Only
/// syntax is checked here; `Number`/`Type` conformance against declared
/// or reserved keys is a semantic check (`crate::semantic`).
///
/// The key's character class allows a leading digit: spec.md §3 reserves
/// `1000G` as a valid INFO key, so the syntax layer can't require the first
/// byte to be alphabetic.
pub fn validate_info_syntax(field: &str) -> Result<Vec<(String, Option<String>)>, String> {
    if field == "." {
        return Ok(Vec::new());
    }
    if field.is_empty() {
        return Err("Info field is empty".to_string());
    }
    let mut pairs = Vec::new();
    for entry in field.split(';') {
        if entry.is_empty() {
            return Err("Info field contains an empty entry".to_string());
        }
        let (key, value) = match entry.split_once('=') {
            Some((k, v)) => (k, Some(v.to_string())),
            None => (entry, None),
        };
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.') {
            return Err(format!("Info key '{key}' contains invalid characters"));
        }
        pairs.push((key.to_string(), value));
    }
    Ok(pairs)
}

/// FORMAT: colon-separated list of alphanumeric keys.
pub fn validate_format(field: &str) -> Result<Vec<String>, String> {
    if field.is_empty() {
        return Err("Format field is empty".to_string());
    }
    let mut keys = Vec::new();
    for key in field.split(':') {
        if key.is_empty() || !key.bytes().next().map(|b| b.is_ascii_alphabetic()).unwrap_or(false)
            || !key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return Err(format!("Format key '{key}' contains invalid characters"));
        }
        keys.push(key.to_string());
    }
    Ok(keys)
}

/// A sample field's first sub-value must look like a genotype:
/// digit-or-`.` tokens separated by `/` or `|`.
pub fn genotype_prefix_is_valid(first_subvalue: &str) -> bool {
    if first_subvalue.is_empty() {
        return false;
    }
    first_subvalue
        .split(|c| c == '/' || c == '|')
        .all(|token| token == "." || (!token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())))
}

/// Number of alleles (ploidy) encoded in a genotype-like first sub-value.
pub fn ploidy_of(first_subvalue: &str) -> usize {
    first_subvalue.split(|c| c == '/' || c == '|').count()
}

/// One sample field: colon-separated sub-values, non-empty overall, whose
/// first sub-value must parse as a genotype.
pub fn validate_sample(field: &str, sample_index: usize) -> Result<Vec<String>, String> {
    if field.is_empty() {
        return Err(format!("Sample #{} is empty", sample_index + 1));
    }
    let subvalues: Vec<String> = field.split(':').map(str::to_string).collect();
    if !genotype_prefix_is_valid(&subvalues[0]) {
        return Err(format!("Sample #{} does not start with a valid genotype", sample_index + 1));
    }
    Ok(subvalues)
}

/// `ALT` meta ids must begin with one of the declared prefixes, optionally
/// followed by `:subtype`.
pub fn alt_id_has_valid_prefix(id: &str) -> bool {
    let base = id.split(':').next().unwrap_or(id);
    ALT_PREFIXES.contains(&base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chromosome_rejects_colon_and_whitespace() {
        assert!(validate_chromosome("chr1").is_ok());
        assert!(validate_chromosome("<chr1>").is_ok());
        assert!(validate_chromosome("").is_err());
        assert!(validate_chromosome("chr 1").is_err());
        assert!(validate_chromosome("chr:1").is_err());
    }

    #[test]
    fn position_requires_positive_integer() {
        assert_eq!(validate_position("1000"), Ok(1000));
        assert!(validate_position("-1").is_err());
        assert!(validate_position("1.5").is_err());
        assert!(validate_position("").is_err());
    }

    #[test]
    fn alternates_accept_bases_symbolic_and_breakends() {
        let parsed = validate_alternates("A,<DEL>,N[1:100[").unwrap();
        assert_eq!(
            parsed,
            vec![
                Alternate::Bases("A".to_string()),
                Alternate::Symbolic("DEL".to_string()),
                Alternate::Breakend("N[1:100[".to_string()),
            ]
        );
        assert_eq!(validate_alternates("."), Ok(Vec::new()));
        assert!(validate_alternates("Z").is_err());
        assert!(validate_alternates("[1:bad[").is_err());
    }

    #[test]
    fn quality_accepts_scientific_notation() {
        assert_eq!(validate_quality("."), Ok(None));
        assert_eq!(validate_quality("10"), Ok(Some(10.0)));
        assert_eq!(validate_quality("1.5e3"), Ok(Some(1500.0)));
        assert!(validate_quality("abc").is_err());
        assert!(validate_quality("-1").is_err());
    }

    #[test]
    fn genotype_prefix_accepts_phased_and_unphased() {
        assert!(genotype_prefix_is_valid("0/1"));
        assert!(genotype_prefix_is_valid("0|1|1"));
        assert!(genotype_prefix_is_valid("."));
        assert!(!genotype_prefix_is_valid(""));
        assert!(!genotype_prefix_is_valid("x/1"));
        assert_eq!(ploidy_of("0/0/1"), 3);
    }

    #[test]
    fn sample_requires_valid_genotype_prefix() {
        assert!(validate_sample("0/1:30", 0).is_ok());
        let err = validate_sample("x/1", 2).unwrap_err();
        assert_eq!(err, "Sample #3 does not start with a valid genotype");
    }

    #[test]
    fn alt_prefix_rule_allows_optional_subtype() {
        assert!(alt_id_has_valid_prefix("DEL"));
        assert!(alt_id_has_valid_prefix("DEL:ME"));
        assert!(!alt_id_has_valid_prefix("FOO"));
    }

    #[test]
    fn info_syntax_accepts_the_reserved_1000g_key() {
        let parsed = validate_info_syntax("1000G;DP=10").unwrap();
        assert_eq!(parsed[0], ("1000G".to_string(), None));
        assert_eq!(parsed[1], ("DP".to_string(), Some("10".to_string())));
    }
}
