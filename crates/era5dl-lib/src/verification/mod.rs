use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Retrieval reported success but {} does not exist", .path.display())]
    Missing { path: PathBuf },

    #[error("{} is not a regular file", .path.display())]
    NotAFile { path: PathBuf },

    #[error("{} is empty", .path.display())]
    Empty { path: PathBuf },

    #[error("Failed to inspect {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Checks that a retrieval left a non-empty regular file behind and returns its size.
///
/// This is a sanity check on the retrieval's success signal, not an integrity check.
pub async fn verify_output(path: &Path) -> Result<u64, VerificationError> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(VerificationError::Missing {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(VerificationError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if !metadata.is_file() {
        return Err(VerificationError::NotAFile {
            path: path.to_path_buf(),
        });
    }
    if metadata.len() == 0 {
        return Err(VerificationError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(metadata.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_non_empty_file_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tas_1966_01.nc");
        tokio::fs::write(&path, b"CDF\x01").await.unwrap();

        assert_eq!(verify_output(&path).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = verify_output(&dir.path().join("absent.nc")).await;
        assert!(matches!(result, Err(VerificationError::Missing { .. })));
    }

    #[tokio::test]
    async fn test_empty_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.nc");
        tokio::fs::write(&path, b"").await.unwrap();

        let result = verify_output(&path).await;
        assert!(matches!(result, Err(VerificationError::Empty { .. })));
    }

    #[tokio::test]
    async fn test_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = verify_output(dir.path()).await;
        assert!(matches!(result, Err(VerificationError::NotAFile { .. })));
    }
}
