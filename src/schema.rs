//! Identifiers for the bundled top-level schemas.

use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Name of the XML catalog shipped alongside the schemas.
pub const CATALOG_FILE: &str = "catalog";

/// Only files with this extension are handed to the schema parser.
pub const SCHEMA_EXTENSION: &str = "xsd";

/// A schema documents can be validated against.
///
/// Each variant names exactly one bundled file; the remaining bundled
/// files (assertion, xmldsig, xenc, xml) are only reachable through imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schema {
    /// SAML 2.0 protocol messages (`AuthnRequest`, `Response`, ...).
    Protocol,
    /// SAML 2.0 metadata (`EntityDescriptor`, `EntitiesDescriptor`).
    Metadata,
    /// XHTML 1.0 Strict.
    Xhtml,
}

impl Schema {
    pub const ALL: [Schema; 3] = [Schema::Protocol, Schema::Metadata, Schema::Xhtml];

    pub fn file_name(self) -> &'static str {
        match self {
            Schema::Protocol => "saml-schema-protocol-2.0.xsd",
            Schema::Metadata => "saml-schema-metadata-2.0.xsd",
            Schema::Xhtml => "xhtml1-strict.xsd",
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

impl FromStr for Schema {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Schema::ALL
            .into_iter()
            .find(|schema| schema.file_name() == name)
            .or_else(|| match name.to_ascii_lowercase().as_str() {
                "protocol" => Some(Schema::Protocol),
                "metadata" => Some(Schema::Metadata),
                "xhtml" => Some(Schema::Xhtml),
                _ => None,
            })
            .ok_or_else(|| ValidationError::SchemaNotFound {
                name: s.to_string(),
            })
    }
}
