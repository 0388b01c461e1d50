use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VcfIoError {
    #[error("Invalid or missing file extension. Accepted formats are ['.vcf', '.vcf.gz']")]
    InvalidFileExt,

    #[error("Failed to open input file '{0}'")]
    Open(PathBuf),
}
