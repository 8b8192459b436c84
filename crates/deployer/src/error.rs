//! Error types for deploy runs.
//!
//! Every failure is fatal for the run and names the phase it happened in.
//! Nothing is rolled back.

use cloudkit::ErrorCategory;
use std::fmt;
use std::path::PathBuf;

/// Result type alias for deploy operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Phase of a deploy run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Validating the deployment configuration.
    Configuration,
    /// Reading and hashing the packaged artifact.
    Artifact,
    /// Creating or updating the compute function.
    Publish,
    /// Converging the gateway resource tree and its method wiring.
    TreeSync,
    /// Ensuring the stage exists.
    Stage,
    /// Granting the gateway invoke permission.
    Permission,
}

impl Phase {
    /// Short lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Artifact => "artifact",
            Self::Publish => "publish",
            Self::TreeSync => "resource tree sync",
            Self::Stage => "stage",
            Self::Permission => "permission",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a deploy run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required setting is missing or malformed. Raised before any
    /// remote call.
    #[error("invalid deployment configuration: {0}")]
    Configuration(String),

    /// The packaged artifact could not be read.
    #[error("cannot read artifact {}: {source}", path.display())]
    ArtifactMissing {
        /// Path that was read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A remote call was rejected.
    #[error("{phase} failed: {source}")]
    Remote {
        /// Phase the call belonged to.
        phase: Phase,
        /// Underlying remote error.
        #[source]
        source: cloudkit::Error,
    },

    /// The local resource index lost track of a node.
    #[error("resource tree out of sync: {0}")]
    Tree(String),

    /// The service reports a different code hash than the one published.
    #[error("function {function} reports code hash {remote} after publish, expected {expected}")]
    DigestMismatch {
        /// Function name.
        function: String,
        /// Digest of the local artifact.
        expected: String,
        /// Digest the service reports.
        remote: String,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Phase the error aborted.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Self::Configuration(_) => Phase::Configuration,
            Self::ArtifactMissing { .. } => Phase::Artifact,
            Self::Remote { phase, .. } => *phase,
            Self::Tree(_) => Phase::TreeSync,
            Self::DigestMismatch { .. } => Phase::Publish,
        }
    }

    /// Category of the underlying remote error, if any.
    #[must_use]
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Remote { source, .. } => Some(source.category()),
            _ => None,
        }
    }
}

/// Attach a phase to remote results.
pub(crate) trait InPhase<T> {
    fn in_phase(self, phase: Phase) -> Result<T>;
}

impl<T> InPhase<T> for cloudkit::Result<T> {
    fn in_phase(self, phase: Phase) -> Result<T> {
        self.map_err(|source| Error::Remote { phase, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_of_each_error() {
        assert_eq!(Error::config("x").phase(), Phase::Configuration);
        assert_eq!(Error::Tree("x".into()).phase(), Phase::TreeSync);

        let err = Error::ArtifactMissing {
            path: PathBuf::from("lambda.zip"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.phase(), Phase::Artifact);
        assert!(err.to_string().contains("lambda.zip"));
    }

    #[test]
    fn test_in_phase_wraps_remote_error() {
        let result: cloudkit::Result<()> =
            Err(cloudkit::Error::conflict("PutMethod", "Method already exists"));
        let err = result.in_phase(Phase::TreeSync).unwrap_err();

        assert_eq!(err.phase(), Phase::TreeSync);
        assert_eq!(err.category(), Some(ErrorCategory::Conflict));
        assert_eq!(
            err.to_string(),
            "resource tree sync failed: PutMethod rejected (ConflictException): Method already exists"
        );
    }

    #[test]
    fn test_phases_are_ordered() {
        assert!(Phase::Configuration < Phase::Publish);
        assert!(Phase::TreeSync < Phase::Stage);
        assert!(Phase::Stage < Phase::Permission);
    }
}
