//! Byte Scanner / State Machine, spec.md §4.1: "the hardest engineering is
//! here." A deterministic, non-backtracking automaton that classifies the
//! input one byte at a time and emits a strict, source-ordered stream of
//! [`Event`]s. It never materializes a line, never splits a string, and
//! never backtracks — every byte is consumed by exactly one state
//! transition. [`crate::policy::Validator`] (the Parse Policy) drives it and
//! reacts to the event stream via `begin_token`/`char_of_token`/`end_token`.
//!
//! The four grammatical sections (`FileFormat`, `Meta`, `Header`, `Body`)
//! and their transitions mirror spec.md §4.1's coarse state machine exactly:
//! `FileFormat -> Meta -> Header -> Body`, with `MetaSkip`/`BodySkip`
//! recovery sub-automata folded into a single [`State::Skip`] (it already
//! knows which section to resync to, via [`RecoveryTarget`]).

use crate::diagnostics::Section;

/// Where the scanner resumes after reporting an error: as the next byte
/// still in this line is swallowed up to `\n`, scanning picks back up in
/// whichever section the error occurred *for*.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryTarget {
    Meta,
    Body,
}

/// One unit of scanner output, delivered to the Parse Policy in strict byte
/// order. `TokenBegin`/`TokenEnd` bracket a lexeme of interest (a version
/// string, a meta key or value, a header or body column); `TokenChar` fires
/// once per byte inside it, letting the policy accumulate without an
/// intermediate copy of the whole line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    TokenBegin(Section, u64, u64),
    TokenChar(Section, u8),
    TokenEnd(Section),
    /// A structured meta value (`##key=<...>`) just began: the following
    /// token is the `<...>` attribute blob, not a freeform string.
    MetaValueIsStructured,
    LineEnd(Section, u64),
    Error(Section, u64, u64, String, RecoveryTarget),
}

const FILEFORMAT_LITERAL: &[u8] = b"##fileformat=";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FileformatLiteral(u8),
    FileformatVersion,
    LineStart,
    MetaFirstHash,
    MetaKey,
    MetaValueStart,
    MetaValueFreeform,
    MetaValueStructured { in_quotes: bool },
    MetaValueStructuredClosed,
    HeaderColumn,
    BodyColumn,
    Skip(RecoveryTarget),
}

/// Byte-at-a-time VCF scanner. Holds only what's needed to classify the
/// next byte (current state, current section phase, line/column counters);
/// the assembled values themselves live in the Parse Policy.
#[derive(Debug)]
pub struct Scanner {
    state: State,
    phase: Section,
    line: u64,
    column: u64,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    pub fn new() -> Self {
        Self { state: State::FileformatLiteral(0), phase: Section::Meta, line: 1, column: 1 }
    }

    /// Current 1-based line number (of the byte about to be scanned).
    pub fn line(&self) -> u64 {
        self.line
    }

    /// True once the scanner has returned to the top of a line with no
    /// partially-consumed token or line pending. `end_of_input` uses this to
    /// decide whether there's a trailing, unterminated line to flush.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::LineStart)
    }

    /// Feed more bytes. May be called repeatedly, at any chunk boundary:
    /// every transition depends only on `self.state` and the current byte,
    /// so splitting a feed into any number of calls never changes the
    /// resulting event stream (spec.md §8 P1).
    pub fn feed(&mut self, bytes: &[u8], on_event: &mut impl FnMut(Event)) {
        for &byte in bytes {
            self.process_byte(byte, on_event);
        }
    }

    /// Signal EOF: if a line was left unterminated (no trailing `\n`),
    /// synthesize the closing newline so its token/line-end events still
    /// fire.
    pub fn end_of_input(&mut self, on_event: &mut impl FnMut(Event)) {
        if !self.is_idle() {
            self.process_byte(b'\n', on_event);
        }
    }

    fn process_byte(&mut self, byte: u8, emit: &mut impl FnMut(Event)) {
        let line = self.line;
        let col = self.column;
        match self.state {
            State::FileformatLiteral(matched) => {
                let idx = matched as usize;
                if idx < FILEFORMAT_LITERAL.len() && byte == FILEFORMAT_LITERAL[idx] {
                    let matched = matched + 1;
                    if matched as usize == FILEFORMAT_LITERAL.len() {
                        emit(Event::TokenBegin(Section::FileFormat, line, col + 1));
                        self.state = State::FileformatVersion;
                    } else {
                        self.state = State::FileformatLiteral(matched);
                    }
                } else {
                    emit(Event::Error(
                        Section::FileFormat,
                        line,
                        1,
                        "Missing '##fileformat=' preamble".to_string(),
                        RecoveryTarget::Meta,
                    ));
                    self.recover(RecoveryTarget::Meta, byte, emit);
                }
            }
            State::FileformatVersion => {
                if byte == b'\n' {
                    emit(Event::TokenEnd(Section::FileFormat));
                    emit(Event::LineEnd(Section::FileFormat, line));
                    self.phase = Section::Meta;
                    self.state = State::LineStart;
                } else {
                    emit(Event::TokenChar(Section::FileFormat, byte));
                }
            }
            State::LineStart => match self.phase {
                Section::Meta => {
                    if byte == b'#' {
                        self.state = State::MetaFirstHash;
                    } else if byte == b'\n' {
                        emit(Event::Error(
                            Section::Header,
                            line,
                            col,
                            "Missing '#CHROM' header line".to_string(),
                            RecoveryTarget::Body,
                        ));
                        emit(Event::TokenBegin(Section::Body, line, col));
                        emit(Event::TokenEnd(Section::Body));
                        emit(Event::LineEnd(Section::Body, line));
                        self.phase = Section::Body;
                    } else {
                        emit(Event::Error(
                            Section::Header,
                            line,
                            col,
                            "Missing '#CHROM' header line".to_string(),
                            RecoveryTarget::Body,
                        ));
                        self.phase = Section::Body;
                        emit(Event::TokenBegin(Section::Body, line, col));
                        emit(Event::TokenChar(Section::Body, byte));
                        self.state = State::BodyColumn;
                    }
                }
                Section::Body => {
                    if byte == b'\n' {
                        emit(Event::TokenBegin(Section::Body, line, col));
                        emit(Event::TokenEnd(Section::Body));
                        emit(Event::LineEnd(Section::Body, line));
                    } else {
                        emit(Event::TokenBegin(Section::Body, line, col));
                        emit(Event::TokenChar(Section::Body, byte));
                        self.state = State::BodyColumn;
                    }
                }
                _ => unreachable!("phase is always Meta or Body past the fileformat line"),
            },
            State::MetaFirstHash => {
                if byte == b'#' {
                    emit(Event::TokenBegin(Section::Meta, line, col + 1));
                    self.state = State::MetaKey;
                } else if byte == b'\n' {
                    emit(Event::Error(
                        Section::Header,
                        line,
                        col,
                        "Header line is incomplete".to_string(),
                        RecoveryTarget::Body,
                    ));
                    emit(Event::LineEnd(Section::Header, line));
                    self.phase = Section::Body;
                    self.state = State::LineStart;
                } else {
                    emit(Event::TokenBegin(Section::Header, line, col));
                    emit(Event::TokenChar(Section::Header, byte));
                    self.state = State::HeaderColumn;
                }
            }
            State::MetaKey => {
                if byte == b'=' {
                    emit(Event::TokenEnd(Section::Meta));
                    self.state = State::MetaValueStart;
                } else if byte == b'\n' {
                    emit(Event::Error(
                        Section::Meta,
                        line,
                        col,
                        "Meta entry is missing '='".to_string(),
                        RecoveryTarget::Meta,
                    ));
                    emit(Event::LineEnd(Section::Meta, line));
                    self.state = State::LineStart;
                } else {
                    emit(Event::TokenChar(Section::Meta, byte));
                }
            }
            State::MetaValueStart => {
                if byte == b'<' {
                    emit(Event::TokenBegin(Section::Meta, line, col + 1));
                    emit(Event::MetaValueIsStructured);
                    self.state = State::MetaValueStructured { in_quotes: false };
                } else if byte == b'\n' {
                    emit(Event::TokenBegin(Section::Meta, line, col));
                    emit(Event::TokenEnd(Section::Meta));
                    emit(Event::LineEnd(Section::Meta, line));
                    self.state = State::LineStart;
                } else {
                    emit(Event::TokenBegin(Section::Meta, line, col));
                    emit(Event::TokenChar(Section::Meta, byte));
                    self.state = State::MetaValueFreeform;
                }
            }
            State::MetaValueFreeform => {
                if byte == b'\n' {
                    emit(Event::TokenEnd(Section::Meta));
                    emit(Event::LineEnd(Section::Meta, line));
                    self.state = State::LineStart;
                } else {
                    emit(Event::TokenChar(Section::Meta, byte));
                }
            }
            State::MetaValueStructured { in_quotes } => {
                if byte == b'\n' {
                    emit(Event::Error(
                        Section::Meta,
                        line,
                        col,
                        "Structured meta entry is missing a closing '>'".to_string(),
                        RecoveryTarget::Meta,
                    ));
                    emit(Event::LineEnd(Section::Meta, line));
                    self.state = State::LineStart;
                } else if byte == b'"' {
                    emit(Event::TokenChar(Section::Meta, byte));
                    self.state = State::MetaValueStructured { in_quotes: !in_quotes };
                } else if byte == b'>' && !in_quotes {
                    emit(Event::TokenEnd(Section::Meta));
                    self.state = State::MetaValueStructuredClosed;
                } else {
                    emit(Event::TokenChar(Section::Meta, byte));
                }
            }
            State::MetaValueStructuredClosed => {
                if byte == b'\n' {
                    emit(Event::LineEnd(Section::Meta, line));
                    self.state = State::LineStart;
                } else {
                    emit(Event::Error(
                        Section::Meta,
                        line,
                        col,
                        "Unexpected characters after structured meta entry's closing '>'".to_string(),
                        RecoveryTarget::Meta,
                    ));
                    self.recover(RecoveryTarget::Meta, byte, emit);
                }
            }
            State::HeaderColumn => {
                if byte == b'\t' {
                    emit(Event::TokenEnd(Section::Header));
                    emit(Event::TokenBegin(Section::Header, line, col + 1));
                } else if byte == b'\n' {
                    emit(Event::TokenEnd(Section::Header));
                    emit(Event::LineEnd(Section::Header, line));
                    self.phase = Section::Body;
                    self.state = State::LineStart;
                } else {
                    emit(Event::TokenChar(Section::Header, byte));
                }
            }
            State::BodyColumn => {
                if byte == b'\t' {
                    emit(Event::TokenEnd(Section::Body));
                    emit(Event::TokenBegin(Section::Body, line, col + 1));
                } else if byte == b'\n' {
                    emit(Event::TokenEnd(Section::Body));
                    emit(Event::LineEnd(Section::Body, line));
                    self.state = State::LineStart;
                } else {
                    emit(Event::TokenChar(Section::Body, byte));
                }
            }
            State::Skip(target) => {
                if byte == b'\n' {
                    emit(Event::LineEnd(Self::section_of(target), line));
                    self.phase = Self::section_of(target);
                    self.state = State::LineStart;
                }
            }
        }

        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    /// After reporting an error at `byte`: if it was the closing `\n`,
    /// resynchronization is already complete; otherwise swallow bytes until
    /// the next one.
    fn recover(&mut self, target: RecoveryTarget, byte: u8, emit: &mut impl FnMut(Event)) {
        if byte == b'\n' {
            emit(Event::LineEnd(Self::section_of(target), self.line));
            self.phase = Self::section_of(target);
            self.state = State::LineStart;
        } else {
            self.state = State::Skip(target);
        }
    }

    fn section_of(target: RecoveryTarget) -> Section {
        match target {
            RecoveryTarget::Meta => Section::Meta,
            RecoveryTarget::Body => Section::Body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(input: &str) -> Vec<Event> {
        let mut scanner = Scanner::new();
        let mut events = Vec::new();
        scanner.feed(input.as_bytes(), &mut |e| events.push(e));
        scanner.end_of_input(&mut |e| events.push(e));
        events
    }

    #[test]
    fn fileformat_line_emits_one_token_and_a_line_end() {
        let events = scan("##fileformat=VCFv4.2\n");
        assert!(events.contains(&Event::TokenBegin(Section::FileFormat, 1, 14)));
        assert!(events.contains(&Event::TokenEnd(Section::FileFormat)));
        assert!(events.contains(&Event::LineEnd(Section::FileFormat, 1)));
        let chars: String = events
            .iter()
            .filter_map(|e| match e {
                Event::TokenChar(Section::FileFormat, b) => Some(*b as char),
                _ => None,
            })
            .collect();
        assert_eq!(chars, "VCFv4.2");
    }

    #[test]
    fn missing_preamble_resyncs_to_meta_on_the_same_newline() {
        let events = scan("nope\n##reference=x\n");
        assert!(matches!(&events[0], Event::Error(Section::FileFormat, 1, 1, _, RecoveryTarget::Meta)));
        assert!(events.contains(&Event::TokenBegin(Section::Meta, 2, 3)));
    }

    #[test]
    fn structured_meta_value_is_flagged_before_its_token() {
        let events = scan("##fileformat=VCFv4.2\n##INFO=<ID=DP>\n");
        let structured_idx = events.iter().position(|e| *e == Event::MetaValueIsStructured).unwrap();
        let first_char_idx = events
            .iter()
            .position(|e| matches!(e, Event::TokenChar(Section::Meta, b) if *b == b'I'))
            .unwrap();
        assert!(structured_idx < first_char_idx);
    }

    #[test]
    fn header_line_tokenizes_each_tab_separated_column() {
        let events = scan("##fileformat=VCFv4.2\n#CHROM\tPOS\n");
        let columns: Vec<String> = events
            .iter()
            .fold((Vec::new(), String::new()), |(mut cols, mut cur), e| {
                match e {
                    Event::TokenChar(Section::Header, b) => cur.push(*b as char),
                    Event::TokenEnd(Section::Header) => {
                        cols.push(std::mem::take(&mut cur));
                    }
                    _ => {}
                }
                (cols, cur)
            })
            .0;
        assert_eq!(columns, vec!["CHROM".to_string(), "POS".to_string()]);
    }

    #[test]
    fn body_phase_begins_right_after_header_line_end() {
        let events = scan("##fileformat=VCFv4.2\n#CHROM\tPOS\n1\t100\n");
        let header_end = events.iter().position(|e| matches!(e, Event::LineEnd(Section::Header, _))).unwrap();
        let body_begin = events.iter().position(|e| matches!(e, Event::TokenBegin(Section::Body, ..))).unwrap();
        assert!(body_begin > header_end);
    }

    #[test]
    fn unterminated_trailing_line_is_flushed_on_end_of_input() {
        let mut scanner = Scanner::new();
        let mut events = Vec::new();
        scanner.feed(b"##fileformat=VCFv4.2\n#CHROM\n1", &mut |e| events.push(e));
        assert!(!scanner.is_idle());
        scanner.end_of_input(&mut |e| events.push(e));
        assert!(events.contains(&Event::LineEnd(Section::Body, 3)));
    }

    #[test]
    fn feed_in_arbitrary_chunks_yields_the_same_events_as_one_shot() {
        let input = "##fileformat=VCFv4.2\n##reference=x\n#CHROM\tPOS\n1\t100\n";
        let whole = scan(input);

        let mut chunked_scanner = Scanner::new();
        let mut chunked = Vec::new();
        for byte in input.as_bytes() {
            chunked_scanner.feed(std::slice::from_ref(byte), &mut |e| chunked.push(e));
        }
        chunked_scanner.end_of_input(&mut |e| chunked.push(e));

        assert_eq!(whole, chunked);
    }
}
