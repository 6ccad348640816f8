//! SHA-256 verification of the downloaded archive against the published
//! checksum file.

use crate::error::InstallError;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

/// Expected digest from a checksum file in `"<hex-digest> <filename>"` form.
///
/// Returns the first whitespace-delimited token, or an empty string for an
/// empty file.
pub fn parse_checksum(contents: &str) -> &str {
    contents.split_whitespace().next().unwrap_or("")
}

/// Lowercase hex SHA-256 of the file at `path`, read as a stream.
pub fn compute_sha256(path: &Path) -> Result<String, InstallError> {
    let mut file = fs::File::open(path).map_err(InstallError::io_at(path))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(InstallError::io_at(path))?;
    Ok(hex::encode(hasher.finalize()))
}

pub fn checksums_match(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}

/// Check `archive` against the digest published in `checksum_file`.
///
/// Returns the verified digest.
pub fn verify_archive(archive: &Path, checksum_file: &Path) -> Result<String, InstallError> {
    let contents = fs::read_to_string(checksum_file).map_err(InstallError::io_at(checksum_file))?;
    let expected = parse_checksum(&contents).trim().to_string();
    println!("Verifying checksum {}...", expected);

    let actual = compute_sha256(archive)?;
    if !checksums_match(&expected, &actual) {
        tracing::warn!(
            "Checksum mismatch for {}: expected {}, got {}",
            archive.display(),
            expected,
            actual
        );
        return Err(InstallError::IntegrityMismatch { expected, actual });
    }

    println!("Integrity check successful...");
    Ok(actual)
}
