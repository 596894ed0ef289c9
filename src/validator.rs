//! Document validation against the cached schema set.
//!
//! Validation is synchronous and safe to run from many threads at once: the
//! schema set is shared read-only and every call parses its own document and
//! creates its own libxml2 validation context.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, ValidationError};
use crate::libxml2::ValidationResult;
use crate::schema::Schema;
use crate::session::SchemaSession;

/// Validates XML documents using a [`SchemaSession`].
#[derive(Clone)]
pub struct Validator {
    session: Arc<SchemaSession>,
}

impl Validator {
    pub fn new(session: Arc<SchemaSession>) -> Self {
        Self { session }
    }

    /// A validator over the process-wide session.
    pub fn global() -> Self {
        Self::new(Arc::clone(SchemaSession::global()))
    }

    pub fn session(&self) -> &Arc<SchemaSession> {
        &self.session
    }

    /// Check `xml` against `schema`.
    ///
    /// # Errors
    ///
    /// - Any session loading error, unchanged, if the schemas are not loaded yet,
    ///   or [`ValidationError::InitializationFailed`] if this call waited on
    ///   another caller's failed load.
    /// - [`ValidationError::SchemaNotFound`] if `schema` is missing from the set.
    /// - [`ValidationError::Parse`] if `xml` is empty or not well-formed.
    /// - [`ValidationError::Invalid`] with every reported violation, in order.
    /// - [`ValidationError::LibXml2Internal`] for engine failures.
    pub fn validate(&self, xml: &[u8], schema: Schema) -> Result<()> {
        let schemas = self.session.schemas()?;
        let handle = schemas.schema(schema)?;

        let engine = self.session.engine();
        let doc = engine.parse_document(xml)?;

        match engine.validate_document(handle, &doc)? {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid {
                error_count,
                errors,
            } => {
                debug!(%schema, error_count, "document failed validation");
                Err(ValidationError::Invalid { errors })
            }
            ValidationResult::InternalError { code } => Err(ValidationError::LibXml2Internal {
                details: format!("validation returned internal code {code}"),
            }),
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::global()
    }
}
