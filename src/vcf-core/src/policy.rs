//! Parse Policy, spec.md §4.2: drives the Byte Scanner ([`crate::scanner`])
//! and assembles its token/line event stream into [`crate::model::Record`]s
//! and [`crate::model::MetaEntry`]s, invoking the Semantic Checker and
//! Error Policy at the documented trigger points. [`Validator`] is the
//! public entry point; `feed`/`end_of_input`/`is_accepting` mirror the
//! scanner's own contract one level up.

use crate::diagnostics::{Diagnostic, DiagnosticSink, Section, Severity};
use crate::fields;
use crate::model::{MetaEntry, MetaValue, Record, Version};
use crate::scanner::{Event, Scanner};
use crate::semantic;
use crate::state::ParsingState;

/// Streaming VCF conformance validator: feed it bytes, drain diagnostics.
pub struct Validator<S: DiagnosticSink> {
    scanner: Scanner,
    /// In-progress byte accumulator for whatever token the scanner last
    /// opened — spec.md §4.2's `begin_token`/`char_of_token`/`end_token`.
    token: Vec<u8>,
    token_pos: (u64, u64),
    /// Outer meta key, recorded once its token ends, awaiting the value
    /// token that completes the entry.
    meta_key: Option<(u64, String)>,
    meta_value_is_structured: bool,
    /// Header/body columns accumulated for the line currently in progress.
    columns: Vec<((u64, u64), String)>,
    past_header: bool,
    state: ParsingState,
    sink: S,
    stopped: bool,
    saw_any_line: bool,
    saw_error: bool,
}

impl<S: DiagnosticSink> Validator<S> {
    pub fn new(filename: impl Into<String>, sink: S) -> Self {
        Self {
            scanner: Scanner::new(),
            token: Vec::new(),
            token_pos: (1, 1),
            meta_key: None,
            meta_value_is_structured: false,
            columns: Vec::new(),
            past_header: false,
            state: ParsingState::new(filename),
            sink,
            stopped: false,
            saw_any_line: false,
            saw_error: false,
        }
    }

    /// Feed more bytes. May be called repeatedly; the scanner's own state
    /// makes this restartable at any chunk boundary (spec.md §8 P1).
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.stopped {
            return;
        }
        let mut events = Vec::new();
        self.scanner.feed(bytes, &mut |e| events.push(e));
        self.drain(events);
    }

    /// Signal EOF: flush any trailing unterminated line.
    pub fn end_of_input(&mut self) {
        if self.stopped {
            return;
        }
        let mut events = Vec::new();
        self.scanner.end_of_input(&mut |e| events.push(e));
        self.drain(events);
        if !self.saw_any_line {
            self.report(Diagnostic::error(
                Section::FileFormat,
                1,
                Some(1),
                "Missing '##fileformat=' preamble: input is empty",
            ));
        }
    }

    /// True iff everything scanned so far conforms to the grammar of a
    /// complete VCF (fileformat + zero-or-more meta + header +
    /// zero-or-more body).
    pub fn is_accepting(&self) -> bool {
        self.saw_any_line && self.past_header && !self.saw_error
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn source(&self) -> &crate::model::Source {
        &self.state.source
    }

    pub fn records_seen(&self) -> u64 {
        self.state.records_seen
    }

    /// `Some(line)` if the fail-fast policy halted scanning early.
    pub fn stopped_early(&self) -> Option<u64> {
        self.stopped.then_some(self.state.line_number)
    }

    fn drain(&mut self, events: Vec<Event>) {
        for event in events {
            if self.stopped {
                break;
            }
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::TokenBegin(_, line, col) => self.begin_token(line, col),
            Event::TokenChar(_, byte) => self.char_of_token(byte),
            Event::TokenEnd(section) => self.end_of_token(section),
            Event::MetaValueIsStructured => self.meta_value_is_structured = true,
            Event::LineEnd(section, line) => self.end_of_line(section, line),
            Event::Error(section, line, col, message, _recovery_target) => {
                self.saw_any_line = true;
                self.state.line_number = line;
                self.report(Diagnostic::error(section, line, Some(col), message));
            }
        }
    }

    // --- Parse Policy operations, spec.md §4.2 -----------------------------

    fn begin_token(&mut self, line: u64, col: u64) {
        self.token.clear();
        self.token_pos = (line, col);
        self.state.line_number = line;
        self.state.column_number = col;
    }

    fn char_of_token(&mut self, byte: u8) {
        self.token.push(byte);
    }

    fn end_token(&self) -> Result<String, String> {
        match std::str::from_utf8(&self.token) {
            Ok(s) => {
                let mut owned = s.to_string();
                if owned.ends_with('\r') {
                    owned.pop();
                }
                Ok(owned)
            }
            Err(_) => Err("Token contains invalid UTF-8 data".to_string()),
        }
    }

    fn end_of_token(&mut self, section: Section) {
        self.saw_any_line = true;
        let (line, col) = self.token_pos;
        let text = match self.end_token() {
            Ok(text) => text,
            Err(message) => {
                self.report(Diagnostic::error(section, line, Some(col), message));
                return;
            }
        };
        match section {
            Section::FileFormat => self.finish_fileformat_token(text, line, col),
            Section::Meta => self.finish_meta_token(text, line, col),
            Section::Header | Section::Body => self.columns.push(((line, col), text)),
        }
    }

    fn finish_fileformat_token(&mut self, version_str: String, line: u64, col: u64) {
        if !version_str.bytes().all(|b| b.is_ascii_graphic()) {
            self.report(Diagnostic::error(
                Section::FileFormat,
                line,
                Some(col),
                "Fileformat version string contains non-printable characters",
            ));
            return;
        }
        match Version::parse(&version_str) {
            Some(version) => self.state.source.version = Some(version),
            None => self.report(Diagnostic::error(
                Section::FileFormat,
                line,
                Some(col),
                format!("Unrecognized fileformat version string '{version_str}'"),
            )),
        }
    }

    fn finish_meta_token(&mut self, text: String, line: u64, col: u64) {
        match self.meta_key.take() {
            None => self.record_meta_key(text, line, col),
            Some((key_line, category)) => {
                let structured = std::mem::take(&mut self.meta_value_is_structured);
                self.end_of_meta_line(category, key_line, text, structured);
            }
        }
    }

    /// `record_meta_key`: validates and remembers the outer `##key=` name,
    /// awaiting the value token that will complete the entry.
    fn record_meta_key(&mut self, key: String, line: u64, col: u64) {
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            self.report(Diagnostic::error(
                Section::Meta,
                line,
                Some(col),
                format!("Meta entry key '{key}' contains invalid characters"),
            ));
            return;
        }
        self.meta_key = Some((line, key));
    }

    /// `end_of_meta_line`: finalizes the `MetaEntry` (parsing the structured
    /// attribute blob via its own small comma/quote automaton if
    /// `structured`, recording each attribute's key — the `record_meta_typeid`
    /// bookkeeping — along the way), appends it to `source.meta_entries`,
    /// then runs the Semantic Checker.
    fn end_of_meta_line(&mut self, category: String, line_number: u64, raw_value: String, structured: bool) {
        let meta_value = if structured {
            match parse_structured_attrs(&raw_value) {
                Ok(attrs) => MetaValue::Structured(attrs),
                Err(message) => {
                    self.report(Diagnostic::error(
                        Section::Meta,
                        line_number,
                        None,
                        format!("Structured meta entry '{category}' is malformed: {message}"),
                    ));
                    return;
                }
            }
        } else {
            MetaValue::Freeform(raw_value)
        };

        let id = meta_value.attribute("ID").map(str::to_string);
        self.state.source.meta_entries.push(MetaEntry { line_number, category, id, value: meta_value });
        let diagnostics = semantic::check_meta_entry(&self.state, line_number);
        for diagnostic in diagnostics {
            self.report(diagnostic);
        }
    }

    fn end_of_line(&mut self, section: Section, line: u64) {
        self.saw_any_line = true;
        self.state.line_number = line;
        match section {
            Section::FileFormat => {}
            Section::Meta => {
                self.meta_key = None;
                self.meta_value_is_structured = false;
            }
            Section::Header => self.end_of_header_line(line),
            Section::Body => self.end_of_body_line(line),
        }
    }

    fn end_of_header_line(&mut self, line: u64) {
        const MANDATORY: [&str; 8] = ["CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO"];
        let columns = std::mem::take(&mut self.columns);
        let columns_ok = columns.len() >= 8 && columns.iter().zip(MANDATORY.iter()).all(|((_, c), e)| c == e);
        if !columns_ok {
            self.report(Diagnostic::error(
                Section::Header,
                line,
                Some(1),
                "Mandatory header columns are missing or out of order",
            ));
            self.past_header = true;
            return;
        }

        let mut has_format = false;
        if columns.len() > 8 {
            if columns[8].1 != "FORMAT" {
                self.report(Diagnostic::error(
                    Section::Header,
                    line,
                    Some(1),
                    "Extra header columns found before 'FORMAT'",
                ));
                self.past_header = true;
                return;
            }
            has_format = true;
            if columns.len() <= 9 {
                self.report(Diagnostic::error(
                    Section::Header,
                    line,
                    Some(1),
                    "'FORMAT' column declared with no sample columns",
                ));
            }
            for (_, name) in &columns[9..] {
                self.record_sample_name(name.clone());
            }
        }
        self.state.source.has_format_column = has_format;

        for diagnostic in semantic::check_header(&self.state.source, line) {
            self.report(diagnostic);
        }
        self.past_header = true;
    }

    /// `record_sample_name`: appends to `source.sample_names` during the
    /// header line.
    fn record_sample_name(&mut self, name: String) {
        self.state.source.sample_names.push(name);
    }

    /// `end_of_body_line`: constructs a `Record` from the assembled
    /// columns, invokes the Semantic Checker, then drops the accumulator.
    fn end_of_body_line(&mut self, line: u64) {
        let columns = std::mem::take(&mut self.columns);
        let expected = self.state.source.expected_column_count();
        if columns.len() != expected {
            self.report(Diagnostic::error(
                Section::Body,
                line,
                Some(1),
                format!("Expected {expected} tab-separated columns, found {}", columns.len()),
            ));
            return;
        }

        match parse_record(line, &columns, self.state.source.has_format_column) {
            Ok(record) => {
                self.state.records_seen += 1;
                let diagnostics = semantic::check_record(&record, &mut self.state);
                for diagnostic in diagnostics {
                    self.report(diagnostic);
                }
            }
            Err(errors) => {
                for diagnostic in errors {
                    self.report(diagnostic);
                }
            }
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        let is_error = diagnostic.severity == Severity::Error;
        self.saw_error |= is_error;
        self.sink.report(diagnostic);
        if is_error && self.sink.fail_fast() {
            self.stopped = true;
        }
    }
}

/// Parses a structured meta value's attribute list (`ID=DP,Number=1,...`),
/// one left-to-right pass, honoring double-quoted values that may
/// themselves contain commas (e.g. `Description="a, b"`). This is the
/// value's own small local automaton, the same way each body column has
/// one in `crate::fields`; the outer `<...>` span is already delimited by
/// the byte scanner.
fn parse_structured_attrs(s: &str) -> Result<Vec<(String, String)>, String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '\\' if in_quotes => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ',' if !in_quotes => pieces.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }
    pieces.push(current);

    let mut attrs = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let Some((key, value)) = piece.split_once('=') else {
            return Err(format!("attribute '{piece}' is missing '='"));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err("attribute name is empty".to_string());
        }
        attrs.push((key.to_string(), strip_quotes(value)));
    }
    Ok(attrs)
}

fn strip_quotes(value: &str) -> String {
    match value.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\""),
        None => value.to_string(),
    }
}

/// Assembles a [`Record`] from the columns the Parse Policy accumulated for
/// one body line. Every column is validated independently (spec.md §8 P2: a
/// line with several independently-checkable sub-fields may yield one
/// diagnostic per sub-field); if any column fails, no `Record` is produced
/// and the Semantic Checker never runs for this line.
fn parse_record(
    line_number: u64,
    columns: &[((u64, u64), String)],
    has_format: bool,
) -> Result<Record, Vec<Diagnostic>> {
    let mut errors = Vec::new();
    macro_rules! collect {
        ($idx:expr, $validator:expr) => {
            match $validator {
                Ok(value) => Some(value),
                Err(message) => {
                    errors.push(Diagnostic::error(Section::Body, line_number, Some((columns[$idx].0).1), message));
                    None
                }
            }
        };
    }

    let chromosome = collect!(0, fields::validate_chromosome(&columns[0].1));
    let position = collect!(1, fields::validate_position(&columns[1].1));
    let ids = collect!(2, fields::validate_ids(&columns[2].1));
    let reference = collect!(3, fields::validate_reference(&columns[3].1));
    let alternates = collect!(4, fields::validate_alternates(&columns[4].1));
    let quality = collect!(5, fields::validate_quality(&columns[5].1));
    let filter = collect!(6, fields::validate_filter(&columns[6].1));
    let info = collect!(7, fields::validate_info_syntax(&columns[7].1));

    let mut format = Vec::new();
    let mut samples = Vec::new();
    if has_format {
        if let Some(parsed) = collect!(8, fields::validate_format(&columns[8].1)) {
            format = parsed;
        }
        for (i, (pos, text)) in columns[9..].iter().enumerate() {
            match fields::validate_sample(text, i) {
                Ok(_) => samples.push(text.clone()),
                Err(message) => errors.push(Diagnostic::error(Section::Body, line_number, Some(pos.1), message)),
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Record {
        line_number,
        chromosome: chromosome.unwrap(),
        position: position.unwrap(),
        ids: ids.unwrap(),
        reference: reference.unwrap(),
        alternates: alternates.unwrap(),
        quality: quality.unwrap(),
        filter: filter.unwrap(),
        info: info.unwrap(),
        format,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CollectingSink, Severity};

    fn run(input: &str) -> Vec<Diagnostic> {
        let mut validator = Validator::new("t.vcf", CollectingSink::new(false));
        validator.feed(input.as_bytes());
        validator.end_of_input();
        validator.into_sink().into_diagnostics()
    }

    #[test]
    fn s1_missing_reference_meta_is_a_single_warning() {
        let diagnostics = run("##fileformat=VCFv4.1\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert!(diagnostics[0].message.contains("reference"));
    }

    #[test]
    fn s2_missing_fileformat_preamble_is_one_error_and_resyncs() {
        let diagnostics = run("fileformat=VCFv4.1\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n");
        let errors: Vec<_> = diagnostics.iter().filter(|d| d.severity == Severity::Error).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line_number, 1);
        assert_eq!(errors[0].section, Section::FileFormat);
    }

    #[test]
    fn s3_duplicate_info_id_errors_once_at_the_second_line() {
        let input = "##fileformat=VCFv4.1\n\
            ##INFO=<ID=DP,Number=1,Type=Integer,Description=\"depth\">\n\
            ##INFO=<ID=DP,Number=1,Type=Integer,Description=\"dup\">\n\
            ##reference=genome.fa\n\
            #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";
        let diagnostics = run(input);
        let errors: Vec<_> = diagnostics.iter().filter(|d| d.severity == Severity::Error).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line_number, 3);
        assert!(errors[0].message.contains("Duplicate INFO ID 'DP'"));
    }

    #[test]
    fn s4_single_sample_records_never_compare_ploidy_across_lines() {
        let input = "##fileformat=VCFv4.1\n\
            ##reference=genome.fa\n\
            ##contig=<ID=1,length=1000000>\n\
            #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNA001\n\
            1\t1000\t.\tT\tG\t.\t.\t.\tGT\t0/0/1\n\
            1\t1001\t.\tT\tG\t.\t.\t.\tGT\t0/1\n";
        let diagnostics = run(input);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn s5_decreasing_position_within_a_chromosome_warns() {
        let input = "##fileformat=VCFv4.1\n\
            ##reference=genome.fa\n\
            ##contig=<ID=1,length=1000000>\n\
            #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
            1\t2000\t.\tT\tG\t.\t.\t.\n\
            1\t1500\t.\tT\tG\t.\t.\t.\n";
        let diagnostics = run(input);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Genomic position 1:1500 is listed after 1:2000");
    }

    #[test]
    fn s6_missing_contig_warning_is_suppressed_after_first_chromosome_occurrence() {
        let input = "##fileformat=VCFv4.1\n\
            ##reference=genome.fa\n\
            #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
            chrUnknown\t10\t.\tT\tG\t.\t.\t.\n\
            chrUnknown\t20\t.\tT\tG\t.\t.\t.\n";
        let diagnostics = run(input);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("chrUnknown"));
    }

    #[test]
    fn p1_diagnostics_are_identical_regardless_of_feed_chunking() {
        let input = "##fileformat=VCFv4.1\n\
            ##reference=genome.fa\n\
            ##contig=<ID=1,length=1000000>\n\
            #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
            1\t2000\t.\tT\tG\t.\t.\t.\n\
            1\t1500\t.\tT\tG\t.\t.\t.\n";

        let whole = run(input);

        let mut chunked_validator = Validator::new("t.vcf", CollectingSink::new(false));
        for byte in input.as_bytes() {
            chunked_validator.feed(std::slice::from_ref(byte));
        }
        chunked_validator.end_of_input();
        let chunked = chunked_validator.into_sink().into_diagnostics();

        assert_eq!(whole, chunked);
    }

    #[test]
    fn p3_diagnostics_are_monotone_in_line_and_column() {
        let input = "##fileformat=VCFv4.1\n\
            ##INFO=<ID=DP,Number=1,Type=Integer,Description=\"depth\">\n\
            ##INFO=<ID=DP,Number=1,Type=Integer,Description=\"dup\">\n\
            #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
            1\tbad\t.\tT\tG\t.\t.\t.\n";
        let diagnostics = run(input);
        for pair in diagnostics.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!((a.line_number, a.column_number) <= (b.line_number, b.column_number));
        }
    }

    #[test]
    fn p4_a_clean_stream_stays_clean_on_rescan() {
        let input = "##fileformat=VCFv4.1\n\
            ##reference=genome.fa\n\
            ##contig=<ID=1,length=1000000>\n\
            #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
            1\t1000\t.\tT\tG\t.\tPASS\t.\n";
        assert!(run(input).is_empty());
        assert!(run(input).is_empty());
    }

    #[test]
    fn malformed_body_line_resyncs_without_derailing_the_next_line() {
        let input = "##fileformat=VCFv4.1\n\
            ##reference=genome.fa\n\
            #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
            1\tnotanumber\t.\tT\tG\t.\t.\t.\n\
            1\t1000\t.\tT\tG\t.\tPASS\t.\n";
        let diagnostics = run(input);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].line_number, 4);
        assert_eq!(diagnostics[0].severity, Severity::Error);
        assert_eq!(diagnostics[1].line_number, 5);
        assert_eq!(diagnostics[1].severity, Severity::Warning);
        assert!(diagnostics[1].message.contains("contig"));
    }

    #[test]
    fn info_syntax_accepts_the_reserved_1000g_key_end_to_end() {
        let input = "##fileformat=VCFv4.1\n\
            ##reference=genome.fa\n\
            #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
            1\t1000\t.\tT\tG\t.\t.\t1000G\n";
        let diagnostics = run(input);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn fail_fast_stops_after_the_first_error() {
        let input = "fileformat=VCFv4.1\nmore\nmore\n";
        let mut validator = Validator::new("t.vcf", CollectingSink::new(true));
        validator.feed(input.as_bytes());
        validator.end_of_input();
        assert_eq!(validator.stopped_early(), Some(1));
        assert_eq!(validator.into_sink().into_diagnostics().len(), 1);
    }
}
