//! Packaged artifact inspection.

use crate::error::{Error, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Content digest of a packaged artifact.
///
/// SHA-256, standard base64 with padding; the same string the compute
/// service reports as a function's code hash, so the two compare directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactDigest(String);

impl ArtifactDigest {
    /// Digest of a byte slice.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        Self(cloudkit::code_sha256(bytes))
    }

    /// Wrap a digest reported by the service.
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The encoded digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digest with the base64 padding removed.
    #[must_use]
    pub fn unpadded(&self) -> &str {
        self.0.trim_end_matches('=')
    }
}

impl fmt::Display for ArtifactDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A packaged artifact read into memory.
#[derive(Debug, Clone)]
pub struct Artifact {
    path: PathBuf,
    bytes: Vec<u8>,
    digest: ArtifactDigest,
}

impl Artifact {
    /// Wrap bytes that did not come from disk.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        let digest = ArtifactDigest::of(&bytes);
        Self {
            path: path.into(),
            bytes,
            digest,
        }
    }

    /// Where the artifact was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Package contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Content digest.
    #[must_use]
    pub fn digest(&self) -> &ArtifactDigest {
        &self.digest
    }

    /// Package size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the package is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Reads packaged artifacts and computes their digest.
pub struct ArtifactInspector;

impl ArtifactInspector {
    /// Read the artifact at `path`.
    ///
    /// An empty file is accepted; whether it is a usable package is for the
    /// service to decide.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArtifactMissing`] if the file cannot be read.
    pub fn inspect(path: impl AsRef<Path>) -> Result<Artifact> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| Error::ArtifactMissing {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact = Artifact::from_bytes(path, bytes);
        log::info!(
            "Artifact {} ({} bytes, digest {})",
            path.display(),
            artifact.len(),
            artifact.digest()
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_inspect_reads_and_hashes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lambda.zip");
        fs::write(&path, b"hello world").unwrap();

        let artifact = ArtifactInspector::inspect(&path).unwrap();
        assert_eq!(artifact.bytes(), b"hello world");
        assert_eq!(
            artifact.digest().as_str(),
            "uU0nuZNNPgilLlLX2n2r+sSE7+N6U4DukIj3rOLvzek="
        );
        assert_eq!(artifact.path(), path.as_path());
    }

    #[test]
    fn test_inspect_accepts_empty_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.zip");
        fs::write(&path, b"").unwrap();

        let artifact = ArtifactInspector::inspect(&path).unwrap();
        assert!(artifact.is_empty());
        assert_eq!(
            artifact.digest().as_str(),
            "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn test_inspect_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = ArtifactInspector::inspect(temp.path().join("nope.zip")).unwrap_err();
        assert!(matches!(err, Error::ArtifactMissing { .. }));
    }

    #[test]
    fn test_inspect_directory_is_missing_artifact() {
        let temp = TempDir::new().unwrap();
        let err = ArtifactInspector::inspect(temp.path()).unwrap_err();
        assert!(matches!(err, Error::ArtifactMissing { .. }));
    }

    #[test]
    fn test_digest_unpadded() {
        let digest = ArtifactDigest::of(b"hello world");
        assert_eq!(digest.unpadded(), "uU0nuZNNPgilLlLX2n2r+sSE7+N6U4DukIj3rOLvzek");
        assert_eq!(digest, ArtifactDigest::from_encoded(digest.as_str()));
    }
}
