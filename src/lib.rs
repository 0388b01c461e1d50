use std::io::Read;

use anyhow::Result;
use located_error::LocatedError;
use log::info;

use cli::{Cli, ReportFormat};
use vcf_core::{CollectingSink, CoreError, Diagnostic, Severity, Validator};

/// Opens the requested input (or stdin), feeds it through the [`Validator`]
/// and prints the resulting diagnostic report. Returns `true` if any
/// error-severity diagnostic was seen, matching spec.md §7's "exit status
/// derived from whether any errors were seen".
pub fn run(cli: &Cli) -> Result<bool> {
    let filename = cli.input_path().map(|p| p.display().to_string()).unwrap_or_else(|| "<stdin>".to_string());
    let loc_msg = || format!("While validating '{filename}'");

    let mut reader = vcf_io::open_input(cli.input_path(), cli.threads).with_loc(loc_msg)?;
    let total_len = cli.input_path().and_then(|p| std::fs::metadata(p).ok()).map(|m| m.len());
    logger::Logger::show_progress(total_len);
    let mut report_progress = logger::Logger::progress_callback();

    let sink = CollectingSink::new(cli.fail_fast);
    let mut validator = Validator::new(filename, sink);

    let mut buf = [0u8; 64 * 1024];
    let mut bytes_read_total = 0u64;
    loop {
        let n = reader.read(&mut buf).with_loc(loc_msg)?;
        if n == 0 {
            break;
        }
        validator.feed(&buf[..n]);
        bytes_read_total += n as u64;
        report_progress(bytes_read_total);
    }
    validator.end_of_input();
    logger::Logger::finish_progress();

    if let Some(line) = validator.stopped_early() {
        info!("{}", CoreError::FailFastStop { line });
    }

    let diagnostics = validator.into_sink().into_diagnostics();
    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    print_report(&diagnostics, cli.format, cli.quiet)?;
    Ok(has_errors)
}

fn print_report(diagnostics: &[Diagnostic], format: ReportFormat, quiet: bool) -> Result<()> {
    let visible: Vec<&Diagnostic> =
        diagnostics.iter().filter(|d| !quiet || d.severity == Severity::Error).collect();
    match format {
        ReportFormat::Text => {
            for diagnostic in &visible {
                println!("{diagnostic}");
            }
        }
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&visible)
                .with_loc(|| "While serializing the diagnostic report to JSON")?;
            println!("{json}");
        }
    }
    Ok(())
}
