use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// vcf-validate: streaming conformance validator for the Variant Call Format.
#[derive(Parser, Debug)]
#[command(name = "vcf-validate", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the VCF file to validate. Omit (or pass `-`) to read from
    /// standard input.
    pub input: Option<PathBuf>,

    /// Set the verbosity level (-v -vv -vvv).
    ///
    /// -v: Info | -vv: Debug | -vvv: Trace {n}
    ///
    /// The program still emits warnings by default even when this flag is
    /// off; use `--quiet` to disable them.
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable warnings; only errors are printed.
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Stop at the first error diagnostic instead of accumulating every
    /// deviation found in the stream.
    #[arg(long)]
    pub fail_fast: bool,

    /// Number of decompression threads to use for BGZF-compressed (`.vcf.gz`) input.
    #[arg(long, default_value_t = 1)]
    pub threads: usize,

    /// Diagnostic report format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl Cli {
    /// `None` means stdin; `Some("-")` is also treated as stdin.
    pub fn input_path(&self) -> Option<&std::path::Path> {
        match &self.input {
            Some(path) if path.as_os_str() == "-" => None,
            Some(path) => Some(path.as_path()),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_and_absent_input_both_mean_stdin() {
        let cli = Cli::parse_from(["vcf-validate", "-"]);
        assert_eq!(cli.input_path(), None);

        let cli = Cli::parse_from(["vcf-validate"]);
        assert_eq!(cli.input_path(), None);
    }

    #[test]
    fn a_real_path_is_passed_through() {
        let cli = Cli::parse_from(["vcf-validate", "sample.vcf"]);
        assert_eq!(cli.input_path(), Some(std::path::Path::new("sample.vcf")));
    }

    #[test]
    fn verbosity_counts_repeated_flags() {
        let cli = Cli::parse_from(["vcf-validate", "-vvv", "in.vcf"]);
        assert_eq!(cli.verbose, 3);
    }
}
