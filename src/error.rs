use std::path::PathBuf;

use thiserror::Error;

/// Main library error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Schema payload decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema loading failed: {file} - {details}")]
    SchemaLoad { file: String, details: String },

    #[error("failed to parse XML: {details}")]
    Parse { details: String },

    #[error("{}", join_validation_errors(errors))]
    Invalid { errors: Vec<String> },

    #[error("Schema not found: {name}")]
    SchemaNotFound { name: String },

    #[error("LibXML2 internal error: {details}")]
    LibXml2Internal { details: String },

    #[error("Configuration error: {0}")]
    Config(String),

    /// Returned to callers that waited on another caller's failed schema load.
    #[error("{details}")]
    InitializationFailed { details: String },
}

impl ValidationError {
    /// Individual engine messages for an `Invalid` error, empty otherwise.
    pub fn validation_errors(&self) -> &[String] {
        match self {
            ValidationError::Invalid { errors } => errors,
            _ => &[],
        }
    }
}

fn join_validation_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        "failed to validate XML".to_string()
    } else {
        format!("failed to validate XML: {}", errors.join("; "))
    }
}

/// Errors decoding the embedded schema payload
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload failed to inflate: {0}")]
    Inflate(#[source] std::io::Error),

    #[error("payload is not a JSON file map: {0}")]
    Json(#[from] serde_json::Error),

    #[error("entry {name} is not valid base64: {source}")]
    Entry {
        name: String,
        #[source]
        source: base64::DecodeError,
    },
}

/// Configuration-specific error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value: {field} = {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configured directory does not exist: {path}")]
    MissingDirectory { path: PathBuf },
}

/// LibXML2-specific error types
#[derive(Error, Debug)]
pub enum LibXml2Error {
    #[error("Schema parsing failed: {details}")]
    SchemaParseFailed { details: String },

    #[error("{details}")]
    DocumentParseFailed { details: String },

    #[error("Document of {len} bytes exceeds the libxml2 buffer limit")]
    DocumentTooLarge { len: usize },

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("Validation failed with internal code {code}")]
    ValidationFailed { code: i32 },

    #[error("Memory allocation failed in libxml2")]
    MemoryAllocation,

    #[error("Path is not representable as a C string: {path}")]
    InvalidPath { path: PathBuf },
}

// Error conversion implementations
impl From<ConfigError> for ValidationError {
    fn from(err: ConfigError) -> Self {
        ValidationError::Config(err.to_string())
    }
}

impl From<LibXml2Error> for ValidationError {
    fn from(err: LibXml2Error) -> Self {
        match err {
            LibXml2Error::DocumentParseFailed { details } => ValidationError::Parse { details },
            other => ValidationError::LibXml2Internal {
                details: other.to_string(),
            },
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Payload decode result type alias
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;
