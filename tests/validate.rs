use std::io::Write;

use clap::Parser;
use cli::Cli;

fn write_fixture(contents: &str) -> tempfile::NamedTempFile {
    let mut tmp = tempfile::Builder::new().suffix(".vcf").tempfile().expect("tempfile");
    tmp.write_all(contents.as_bytes()).expect("write fixture");
    tmp
}

#[test]
fn a_clean_minimal_file_reports_no_errors() {
    let tmp = write_fixture(
        "##fileformat=VCFv4.2\n\
         ##contig=<ID=1,length=1000000>\n\
         #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
         1\t100\t.\tA\tG\t.\tPASS\t.\n",
    );
    let cli = Cli::parse_from(["vcf-validate", tmp.path().to_str().unwrap()]);
    let has_errors = vcf_validate::run(&cli).expect("run should succeed");
    assert!(!has_errors);
}

#[test]
fn a_missing_fileformat_preamble_is_reported_as_an_error() {
    let tmp = write_fixture(
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
         1\t100\t.\tA\tG\t.\tPASS\t.\n",
    );
    let cli = Cli::parse_from(["vcf-validate", tmp.path().to_str().unwrap()]);
    let has_errors = vcf_validate::run(&cli).expect("run should succeed");
    assert!(has_errors);
}

#[test]
fn fail_fast_stops_the_stream_after_the_first_error() {
    let tmp = write_fixture(
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
         garbage\n\
         1\t100\t.\tA\tG\t.\tPASS\t.\n",
    );
    let cli = Cli::parse_from(["vcf-validate", "--fail-fast", tmp.path().to_str().unwrap()]);
    let has_errors = vcf_validate::run(&cli).expect("run should succeed");
    assert!(has_errors);
}

#[test]
fn a_nonexistent_input_file_is_an_operational_error() {
    let cli = Cli::parse_from(["vcf-validate", "/no/such/file.vcf"]);
    assert!(vcf_validate::run(&cli).is_err());
}
