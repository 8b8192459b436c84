//! Error types for remote service operations.
//!
//! Errors are categorized to enable retry decisions and appropriate user
//! feedback. Remote rejections keep the operation name and the service's
//! error code so a failed deploy can say exactly which call was refused.

use std::fmt;

/// Result type alias for remote operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of remote errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Request rate exceeded; the service did not act on the request.
    Throttled,
    /// Target resource does not exist.
    NotFound,
    /// Target resource already exists or is being modified.
    Conflict,
    /// Request rejected as malformed.
    Validation,
    /// Credentials missing, invalid, or lacking permission.
    Auth,
    /// A listing had more pages than are read.
    Truncated,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is transient and safe to retry.
    ///
    /// Only throttling qualifies: a throttled request was rejected before
    /// the service acted on it, so retrying cannot apply a mutation twice.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Throttled => "Request rate exceeded",
            Self::NotFound => "Remote resource not found",
            Self::Conflict => "Remote resource conflict",
            Self::Validation => "Request rejected by the service",
            Self::Auth => "Not authorized",
            Self::Truncated => "Listing truncated",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Throttled => "Wait a moment and re-run the deploy, or raise retry.maxAttempts",
            Self::NotFound => "Something was removed concurrently; re-run the deploy",
            Self::Conflict => "Another change is in progress on the same API; re-run the deploy",
            Self::Validation => "Check the deployment configuration values",
            Self::Auth => "Check credentials, region and the IAM permissions of the caller",
            Self::Truncated => "The account holds more items than a single page; clean up unused ones",
            Self::Other => "Check the error details for more information",
        }
    }

    /// Map a service error code to a category.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "TooManyRequestsException" | "ThrottlingException" | "Throttling"
            | "LimitExceededException" => Self::Throttled,
            "NotFoundException" | "ResourceNotFoundException" => Self::NotFound,
            "ConflictException" | "ResourceConflictException" | "ResourceInUseException" => {
                Self::Conflict
            }
            "BadRequestException" | "InvalidParameterValueException" | "ValidationException" => {
                Self::Validation
            }
            "UnauthorizedException" | "AccessDeniedException" | "UnrecognizedClientException"
            | "InvalidSignatureException" | "ExpiredTokenException" => Self::Auth,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during remote operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The remote service rejected a call.
    #[error("{operation} rejected{}: {message}", code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
    Remote {
        /// Operation that was called.
        operation: &'static str,
        /// Service error code, if the service returned one.
        code: Option<String>,
        /// Error message.
        message: String,
    },

    /// A listing returned more than one page.
    #[error("{operation} returned more than one page; paging is not supported")]
    Truncated {
        /// Listing operation.
        operation: &'static str,
    },

    /// A function policy document could not be parsed.
    #[error("invalid policy document for {function}: {source}")]
    Policy {
        /// Function whose policy was fetched.
        function: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The service answered without a field the caller depends on.
    #[error("{operation} response is missing {field}")]
    MissingField {
        /// Operation that was called.
        operation: &'static str,
        /// Missing field.
        field: &'static str,
    },

    /// Failed to start the client runtime.
    #[error("failed to start client runtime: {0}")]
    Runtime(#[from] std::io::Error),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a remote error from a service error code.
    pub fn remote(
        operation: &'static str,
        code: Option<impl Into<String>>,
        message: impl Into<String>,
    ) -> Self {
        Self::Remote {
            operation,
            code: code.map(Into::into),
            message: message.into(),
        }
    }

    /// Create a not-found rejection, as the service would report it.
    pub fn not_found(operation: &'static str, message: impl Into<String>) -> Self {
        Self::remote(operation, Some("NotFoundException"), message)
    }

    /// Create a conflict rejection, as the service would report it.
    pub fn conflict(operation: &'static str, message: impl Into<String>) -> Self {
        Self::remote(operation, Some("ConflictException"), message)
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Remote { code: Some(code), .. } => ErrorCategory::from_code(code),
            Error::Remote { code: None, .. } => ErrorCategory::Other,
            Error::Truncated { .. } => ErrorCategory::Truncated,
            Error::Policy { .. } | Error::MissingField { .. } => ErrorCategory::Validation,
            Error::Runtime(_) | Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether the service reported the target as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// Operation that failed, when known.
    #[must_use]
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Error::Remote { operation, .. }
            | Error::Truncated { operation }
            | Error::MissingField { operation, .. } => Some(operation),
            _ => None,
        }
    }
}
