use std::fmt;
use thiserror::Error;

/// The error type for signing SageMaker MLflow requests.
#[derive(Error, Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
    context: Vec<String>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The resource identifier is malformed or names the wrong service.
    InvalidIdentifier,

    /// The partition of the identifier is recognized but not served.
    UnsupportedPartition,

    /// The resource type of the identifier is recognized but not served.
    UnsupportedResourceType,

    /// The delegated role identifier is malformed or not an IAM role.
    DelegatedRoleInvalid,

    /// The role exchange (STS AssumeRole) failed.
    CredentialExchangeFailure,

    /// The request body is neither empty, a byte buffer, nor a seekable stream.
    SigningContractViolation,

    /// Credentials exist but are invalid/malformed
    CredentialInvalid,

    /// Request cannot be signed (missing required fields, etc.)
    RequestInvalid,

    /// Configuration error (missing fields, invalid values)
    ConfigInvalid,

    /// Unexpected errors (network, I/O, service errors, etc.)
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            context: Vec::new(),
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach a piece of context, e.g. `role_arn: arn:aws:iam::...`.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message without kind and context.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the attached context.
    pub fn context(&self) -> &[String] {
        &self.context
    }

    /// Check if this error comes from parsing a resource identifier.
    pub fn is_identifier_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::InvalidIdentifier
                | ErrorKind::UnsupportedPartition
                | ErrorKind::UnsupportedResourceType
                | ErrorKind::DelegatedRoleInvalid
        )
    }
}

// Convenience constructors
impl Error {
    /// Create an invalid identifier error
    pub fn invalid_identifier(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidIdentifier, message)
    }

    /// Create an unsupported partition error
    pub fn unsupported_partition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedPartition, message)
    }

    /// Create an unsupported resource type error
    pub fn unsupported_resource_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedResourceType, message)
    }

    /// Create a delegated role invalid error
    pub fn delegated_role_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DelegatedRoleInvalid, message)
    }

    /// Create a credential exchange failure error
    pub fn credential_exchange_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialExchangeFailure, message)
    }

    /// Create a signing contract violation error
    pub fn signing_contract_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SigningContractViolation, message)
    }

    /// Create a credential invalid error
    pub fn credential_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialInvalid, message)
    }

    /// Create a request invalid error
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if !self.context.is_empty() {
            write!(f, " ({})", self.context.join(", "))?;
        }
        Ok(())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidIdentifier => write!(f, "invalid identifier"),
            ErrorKind::UnsupportedPartition => write!(f, "unsupported partition"),
            ErrorKind::UnsupportedResourceType => write!(f, "unsupported resource type"),
            ErrorKind::DelegatedRoleInvalid => write!(f, "invalid delegated role"),
            ErrorKind::CredentialExchangeFailure => write!(f, "credential exchange failed"),
            ErrorKind::SigningContractViolation => write!(f, "signing contract violated"),
            ErrorKind::CredentialInvalid => write!(f, "invalid credentials"),
            ErrorKind::RequestInvalid => write!(f, "invalid request"),
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUriParts> for Error {
    fn from(err: http::uri::InvalidUriParts) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}
