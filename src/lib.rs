//! # saml-xsd
//!
//! Validate SAML 2.0 protocol messages, SAML 2.0 metadata and XHTML 1.0
//! Strict documents against XSD schemas compiled into the library.
//!
//! The schemas and their XML catalog are embedded at build time, written to a
//! private temporary directory the first time they are needed, parsed once by
//! libxml2 and cached for the life of the process.
//!
//! ```no_run
//! use saml_xsd::Schema;
//!
//! let xml = std::fs::read("metadata.xml")?;
//! saml_xsd::validate(&xml, Schema::Metadata)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod assets;
pub mod catalog;
pub mod config;
pub mod error;
pub mod libxml2;
pub mod materialize;
pub mod schema;
pub mod session;
pub mod validator;

pub use assets::{AssetSource, EmbeddedAssets, FileMapping};
pub use config::SessionConfig;
pub use error::{Result, ValidationError};
pub use libxml2::{LibXml2Wrapper, SchemaEngine, ValidationResult, XmlSchemaPtr};
pub use materialize::{MaterializedDir, Materializer};
pub use schema::Schema;
pub use session::{SchemaSession, SchemaSet};
pub use validator::Validator;

/// Validate `xml` against one of the bundled schemas using the process-wide session.
pub fn validate(xml: &[u8], schema: Schema) -> Result<()> {
    Validator::global().validate(xml, schema)
}
