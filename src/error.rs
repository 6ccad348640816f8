use reqwest::StatusCode;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("No release found at {url}")]
    ReleaseNotFound { url: String },

    #[error("Failed to get release info from {url}: {status}")]
    RequestFailed { url: String, status: StatusCode },

    #[error("Could not parse release metadata: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Insufficient permissions for {}, run as admin", target.display())]
    PermissionDenied { target: PathBuf },

    #[error(
        "Integrity check failed, invalid checksum\n  Calculated checksum: {actual}\n  Provided checksum: {expected}"
    )]
    IntegrityMismatch { expected: String, actual: String },

    #[error("No release asset contains both '{marker}' and '{extension}'")]
    AssetNotFound { marker: String, extension: String },

    #[error("Checksum asset '{name}' not found in release")]
    ChecksumAssetNotFound { name: String },

    #[error("Archive does not contain {}", path.display())]
    MissingArchiveEntry { path: PathBuf },

    #[error("Could not read archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Installation interrupted")]
    Interrupted,
}

impl InstallError {
    pub fn exit_code(&self) -> i32 {
        match self {
            InstallError::PermissionDenied { .. } | InstallError::IntegrityMismatch { .. } => 1,
            // 128 + SIGINT, what a shell reports for Ctrl-C
            InstallError::Interrupted => 130,
            _ => 2,
        }
    }

    /// Wraps an I/O error that happened at `path`, surfacing permission
    /// failures as [`InstallError::PermissionDenied`].
    pub fn io_at(path: &Path) -> impl FnOnce(io::Error) -> InstallError + '_ {
        move |source| {
            if source.kind() == io::ErrorKind::PermissionDenied {
                InstallError::PermissionDenied {
                    target: path.to_path_buf(),
                }
            } else {
                InstallError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let mismatch = InstallError::IntegrityMismatch {
            expected: "abc123".into(),
            actual: "def456".into(),
        };
        assert_eq!(mismatch.exit_code(), 1);

        let denied = InstallError::PermissionDenied {
            target: PathBuf::from("/opt/kryer"),
        };
        assert_eq!(denied.exit_code(), 1);

        let missing = InstallError::MissingArchiveEntry {
            path: PathBuf::from("kryer-windows/kryer.exe"),
        };
        assert_eq!(missing.exit_code(), 2);

        assert_eq!(InstallError::Interrupted.exit_code(), 130);
    }

    #[test]
    fn test_mismatch_reports_both_values() {
        let message = InstallError::IntegrityMismatch {
            expected: "abc123".into(),
            actual: "def456".into(),
        }
        .to_string();
        assert!(message.contains("abc123"));
        assert!(message.contains("def456"));
    }

    #[test]
    fn test_io_at_maps_permission_denied() {
        let path = Path::new("/opt/kryer");
        let err = InstallError::io_at(path)(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, InstallError::PermissionDenied { .. }));

        let err = InstallError::io_at(path)(io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, InstallError::Io { .. }));
    }
}
