//! Semantic Checker, spec.md §4.3: rules the byte grammar can't express.
//! Every check here produces [`Diagnostic`]s and never aborts parsing.

use crate::diagnostics::{Diagnostic, Section};
use crate::fields::{alt_id_has_valid_prefix, ploidy_of};
use crate::model::{reserved_info_spec, Alternate, MetaEntry, NumberSpec, Record, Source, TypeSpec, ID_CATEGORIES};
use crate::state::ParsingState;

/// `ID` attribute values are restricted to the same identifier charset as
/// meta keys: alphanumerics, `_`, `.` and `-`. Catches things like stray
/// whitespace or a misplaced `<`/`>` copied in from a neighboring entry.
fn id_has_valid_characters(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-' | b':'))
}

/// `Description` is a free-text attribute but must be non-empty and must
/// not itself still be wrapped in the quotes the structured-value grammar
/// already strips — a malformed entry where quote-stripping left a stray
/// quote behind is a sign the original value was not a single well-formed
/// quoted string.
fn description_is_malformed(description: &str) -> bool {
    description.is_empty() || description.contains('"')
}

/// A crude but effective URL sanity check: must carry a `scheme://` prefix
/// and a non-empty remainder. Good enough to catch "forgot the scheme" and
/// "pasted a local path" mistakes without pulling in a full URL parser for
/// one attribute.
fn url_is_malformed(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, rest)) => scheme.is_empty() || rest.is_empty() || !scheme.bytes().all(|b| b.is_ascii_alphanumeric()),
        None => true,
    }
}

/// `SAMPLE` meta entries may declare `Genomes` and `Mixture` attributes
/// (both comma-separated, and — when both are present — the same length,
/// pairing a genome name with its mixture proportion).
fn sample_genomes_and_mixture_are_malformed(entry: &MetaEntry) -> Option<String> {
    let genomes = entry.value.attribute("Genomes").map(|g| g.split(',').collect::<Vec<_>>());
    let mixture = entry.value.attribute("Mixture").map(|m| m.split(',').collect::<Vec<_>>());
    if let Some(genomes) = &genomes {
        if genomes.iter().any(|g| g.trim().is_empty()) {
            return Some("SAMPLE 'Genomes' contains an empty entry".to_string());
        }
    }
    if let Some(mixture) = &mixture {
        if mixture.iter().any(|m| m.trim().parse::<f64>().is_err()) {
            return Some("SAMPLE 'Mixture' is not a comma-separated list of numbers".to_string());
        }
    }
    if let (Some(genomes), Some(mixture)) = (&genomes, &mixture) {
        if genomes.len() != mixture.len() {
            return Some("SAMPLE 'Genomes' and 'Mixture' have a different number of entries".to_string());
        }
    }
    None
}

/// Required structured attributes per meta category (beyond `ID`, which is
/// required for every category in [`crate::model::ID_CATEGORIES`]).
fn required_attributes(category: &str) -> &'static [&'static str] {
    match category {
        "INFO" | "FORMAT" => &["Number", "Type", "Description"],
        "FILTER" | "ALT" => &["Description"],
        _ => &[],
    }
}

/// Run after a structured meta entry has been assembled and appended to
/// `state.source.meta_entries` (it is always appended — duplicates and
/// malformed entries are flagged, not dropped, so later checks still see
/// the file's full meta-information).
pub fn check_meta_entry(state: &ParsingState, line_number: u64) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let Some(entry) = state.source.meta_entries.last() else { return out };
    if entry.line_number != line_number {
        return out;
    }

    if ID_CATEGORIES.contains(&entry.category.as_str()) {
        match &entry.id {
            None => out.push(Diagnostic::error(
                Section::Meta,
                line_number,
                None,
                format!("Meta entry '{}' is missing a required 'ID' attribute", entry.category),
            )),
            Some(id) => {
                let duplicate_count = state
                    .source
                    .meta_entries
                    .iter()
                    .filter(|m| m.category == entry.category && m.id.as_deref() == Some(id.as_str()))
                    .count();
                if duplicate_count > 1 {
                    out.push(Diagnostic::error(
                        Section::Meta,
                        line_number,
                        None,
                        format!("Duplicate {} ID '{}'", entry.category, id),
                    ));
                }
            }
        }

        for attr in required_attributes(&entry.category) {
            if entry.value.attribute(attr).is_none() {
                out.push(Diagnostic::error(
                    Section::Meta,
                    line_number,
                    None,
                    format!("Meta entry '{}' is missing required attribute '{attr}'", entry.category),
                ));
            }
        }

        if let Some(id) = &entry.id {
            if !id_has_valid_characters(id) {
                out.push(Diagnostic::error(
                    Section::Meta,
                    line_number,
                    None,
                    format!("{} ID '{id}' contains disallowed characters", entry.category),
                ));
            }
        }
    }

    if let Some(description) = entry.value.attribute("Description") {
        if description_is_malformed(description) {
            out.push(Diagnostic::error(
                Section::Meta,
                line_number,
                None,
                format!("{} Description is malformed", entry.category),
            ));
        }
    }

    if let Some(url) = entry.value.attribute("URL") {
        if url_is_malformed(url) {
            out.push(Diagnostic::error(
                Section::Meta,
                line_number,
                None,
                format!("{} URL '{url}' is malformed", entry.category),
            ));
        }
    }

    if entry.category == "SAMPLE" {
        if let Some(message) = sample_genomes_and_mixture_are_malformed(entry) {
            out.push(Diagnostic::error(Section::Meta, line_number, None, message));
        }
    }

    if matches!(entry.category.as_str(), "INFO" | "FORMAT") {
        if let Some(number) = entry.value.attribute("Number") {
            if NumberSpec::parse(number).is_none() {
                out.push(Diagnostic::error(
                    Section::Meta,
                    line_number,
                    None,
                    format!("{} Number value '{number}' is outside the allowed enumeration", entry.category),
                ));
            }
        }
        if let Some(ty) = entry.value.attribute("Type") {
            if TypeSpec::parse(ty).is_none() {
                out.push(Diagnostic::error(
                    Section::Meta,
                    line_number,
                    None,
                    format!("{} Type value '{ty}' is outside the allowed enumeration", entry.category),
                ));
            }
        }
    }

    if entry.category == "ALT" {
        if let Some(id) = &entry.id {
            if !alt_id_has_valid_prefix(id) {
                out.push(Diagnostic::error(
                    Section::Meta,
                    line_number,
                    None,
                    format!("ALT ID '{id}' does not begin with a recognized prefix (DEL, INS, DUP, INV, CNV)"),
                ));
            }
        }
    }

    out
}

/// Run once, right after the header line is accepted.
pub fn check_header(source: &Source, line_number: u64) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    if source.meta_by_category("reference").next().is_none() {
        out.push(Diagnostic::warning(
            Section::Header,
            line_number,
            None,
            "Missing recommended 'reference' meta entry",
        ));
    }

    let mut seen: Vec<&str> = Vec::with_capacity(source.sample_names.len());
    for name in &source.sample_names {
        if seen.contains(&name.as_str()) {
            out.push(Diagnostic::warning(
                Section::Header,
                line_number,
                None,
                format!("Duplicate sample name '{name}'"),
            ));
        } else {
            seen.push(name);
        }
    }
    out
}

/// Run after each body record is fully assembled.
pub fn check_record(record: &Record, state: &mut ParsingState) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let line = record.line_number;

    check_contig(record, state, &mut out);
    check_position_order(record, state, &mut out);
    check_filter_references(record, &state.source, line, &mut out);
    check_info_references(record, &state.source, line, &mut out);
    check_alt_references(record, &state.source, line, &mut out);
    check_ploidy(record, line, &mut out);

    out
}

fn check_contig(record: &Record, state: &mut ParsingState, out: &mut Vec<Diagnostic>) {
    let declared = state.source.find_meta_id("contig", &record.chromosome).is_some();
    if !declared && !state.bad_defined_contigs.contains(&record.chromosome) {
        state.bad_defined_contigs.insert(record.chromosome.clone());
        out.push(Diagnostic::warning(
            Section::Body,
            record.line_number,
            None,
            format!("Chromosome '{}' has no matching 'contig' meta entry", record.chromosome),
        ));
    }
}

fn check_position_order(record: &Record, state: &mut ParsingState, out: &mut Vec<Diagnostic>) {
    let max_seen = state.max_position_per_chromosome.entry(record.chromosome.clone()).or_insert(record.position);
    if record.position < *max_seen {
        out.push(Diagnostic::warning(
            Section::Body,
            record.line_number,
            None,
            format!(
                "Genomic position {}:{} is listed after {}:{}",
                record.chromosome, record.position, record.chromosome, max_seen
            ),
        ));
    } else {
        *max_seen = record.position;
    }
}

fn check_filter_references(record: &Record, source: &Source, line: u64, out: &mut Vec<Diagnostic>) {
    for filter in &record.filter {
        if filter == "PASS" {
            continue;
        }
        if source.find_meta_id("FILTER", filter).is_none() {
            out.push(Diagnostic::warning(
                Section::Body,
                line,
                None,
                format!("Filter '{filter}' is not 'PASS' and has no matching FILTER meta entry"),
            ));
        }
    }
}

fn check_alt_references(record: &Record, source: &Source, line: u64, out: &mut Vec<Diagnostic>) {
    for alt in &record.alternates {
        if let Alternate::Symbolic(id) = alt {
            if source.find_meta_id("ALT", id).is_none() {
                out.push(Diagnostic::warning(
                    Section::Body,
                    line,
                    None,
                    format!("Symbolic allele '<{id}>' has no matching ALT meta entry"),
                ));
            }
        }
    }
}

fn check_info_references(record: &Record, source: &Source, line: u64, out: &mut Vec<Diagnostic>) {
    for (key, value) in &record.info {
        let declared = source.find_meta_id("INFO", key);
        let (number, ty) = match declared {
            Some(entry) => {
                let number = entry.value.attribute("Number").and_then(NumberSpec::parse);
                let ty = entry.value.attribute("Type").and_then(TypeSpec::parse);
                (number, ty)
            }
            None => match reserved_info_spec(key) {
                Some((number, ty)) => (Some(number), Some(ty)),
                None => {
                    out.push(Diagnostic::warning(
                        Section::Body,
                        line,
                        None,
                        format!("Info key '{key}' has no matching INFO meta entry and is not a reserved key"),
                    ));
                    continue;
                }
            },
        };
        if let Some(ty) = ty {
            check_info_value_type(key, value.as_deref(), ty, number, line, out);
        }
    }
}

fn check_info_value_type(
    key: &str,
    value: Option<&str>,
    ty: TypeSpec,
    number: Option<NumberSpec>,
    line: u64,
    out: &mut Vec<Diagnostic>,
) {
    match ty {
        TypeSpec::Flag => {
            if value.is_some() {
                out.push(Diagnostic::warning(Section::Body, line, None, format!("Info {key} is not a flag")));
            }
        }
        TypeSpec::Integer => {
            let Some(value) = value else {
                out.push(Diagnostic::warning(Section::Body, line, None, format!("Info {key} is missing a value")));
                return;
            };
            if !values_are(value, number, |v| v.parse::<i64>().is_ok()) {
                out.push(Diagnostic::warning(
                    Section::Body,
                    line,
                    None,
                    format!("Info {key} value is not a comma-separated list of integers"),
                ));
            }
        }
        TypeSpec::Float => {
            let Some(value) = value else {
                out.push(Diagnostic::warning(Section::Body, line, None, format!("Info {key} is missing a value")));
                return;
            };
            if !values_are(value, number, |v| v.parse::<f64>().is_ok()) {
                out.push(Diagnostic::warning(
                    Section::Body,
                    line,
                    None,
                    format!("Info {key} value is not a comma-separated list of numbers"),
                ));
            }
        }
        TypeSpec::Character => {
            let Some(value) = value else {
                out.push(Diagnostic::warning(Section::Body, line, None, format!("Info {key} is missing a value")));
                return;
            };
            if !values_are(value, number, |v| v.chars().count() == 1) {
                out.push(Diagnostic::warning(
                    Section::Body,
                    line,
                    None,
                    format!("Info {key} value is not a comma-separated list of single characters"),
                ));
            }
        }
        TypeSpec::String => {
            // any non-empty text is acceptable
            if value.is_none() {
                out.push(Diagnostic::warning(Section::Body, line, None, format!("Info {key} is missing a value")));
            }
        }
    }
}

fn values_are(value: &str, number: Option<NumberSpec>, pred: impl Fn(&str) -> bool) -> bool {
    let parts: Vec<&str> = value.split(',').collect();
    if let Some(NumberSpec::Count(n)) = number {
        if parts.len() != n as usize {
            return false;
        }
    }
    parts.iter().all(|v| pred(v))
}

/// Intra-record only, per spec.md §9's resolved Open Question: the first
/// sample in a record establishes ploidy, and every later sample in the
/// *same record* must match it. No state persists across records.
fn check_ploidy(record: &Record, line: u64, out: &mut Vec<Diagnostic>) {
    let mut expected: Option<usize> = None;
    for (idx, sample) in record.samples.iter().enumerate() {
        let Some(first) = sample.split(':').next() else { continue };
        if !crate::fields::genotype_prefix_is_valid(first) {
            continue;
        }
        let ploidy = ploidy_of(first);
        match expected {
            None => expected = Some(ploidy),
            Some(n) if n != ploidy => {
                out.push(Diagnostic::warning(
                    Section::Body,
                    line,
                    None,
                    format!("Sample #{} has inconsistent ploidy ({ploidy} vs {n})", idx + 1),
                ));
            }
            _ => {}
        }
    }
}
