//! Opaque decompression layer (spec.md §6 "Compression layer"): the core
//! validator only ever sees an already-decoded byte stream.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Read},
    path::Path,
};

use anyhow::Result;
use gzp::{deflate::Bgzf, par::decompress::ParDecompressBuilder};
use located_error::{LocatedError, LocatedOption};

use crate::error::VcfIoError;

/// Opens `path` for reading, transparently decompressing BGZF `.vcf.gz`
/// input; `path: None` reads uncompressed bytes from standard input.
pub fn open_input(path: Option<&Path>, threads: usize) -> Result<Box<dyn BufRead>> {
    let Some(path) = path else {
        return Ok(Box::new(BufReader::new(io::stdin())));
    };

    let loc_msg = || format!("While opening input file '{}'", path.display());
    let path_ext = path.extension().with_loc(|| VcfIoError::InvalidFileExt)?;
    let file = File::open(path).map_err(|_| VcfIoError::Open(path.to_path_buf())).with_loc(loc_msg)?;

    let source: Box<dyn Read> = match path_ext.to_str() {
        Some("vcf") => Box::new(file),
        Some("gz") => ParDecompressBuilder::<Bgzf>::new().maybe_num_threads(threads).maybe_par_from_reader(file),
        _ => return Err(VcfIoError::InvalidFileExt).with_loc(loc_msg),
    };
    Ok(Box::new(BufReader::new(source)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_an_uncompressed_file_verbatim() -> Result<()> {
        let mut tmp = tempfile::Builder::new().suffix(".vcf").tempfile()?;
        write!(tmp, "##fileformat=VCFv4.1\n")?;
        let mut reader = open_input(Some(tmp.path()), 1)?;
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;
        assert_eq!(contents, "##fileformat=VCFv4.1\n");
        Ok(())
    }

    #[test]
    fn missing_file_reports_open_error() {
        let result = open_input(Some(Path::new("/no/such/file.vcf")), 1);
        assert!(result.is_err());
    }

    #[test]
    fn an_unrecognized_extension_is_rejected_before_opening() {
        let result = open_input(Some(Path::new("/no/such/file.txt")), 1);
        assert!(result.is_err());
    }
}
