//! LibXML2 FFI wrapper for XML Schema validation.
//!
//! No mature pure Rust XSD validator exists, so schema parsing, document
//! parsing and validation go straight to libxml2 through a narrow set of
//! `extern "C"` declarations. Everything above this module talks to the
//! [`SchemaEngine`] trait instead of the raw functions.
//!
//! ## Thread Safety
//!
//! According to the libxml2 documentation (http://xmlsoft.org/threads.html):
//!
//! - **Schema parsing** is NOT thread-safe and also depends on process-global
//!   catalog state; callers serialize it (see `catalog::CatalogLock`).
//! - **Validation** is thread-safe as long as every call uses its own
//!   validation context over a shared, read-only `xmlSchema`.
//!   [`LibXml2Wrapper::validate_document`] always creates a fresh context.
//! - **Document parsing** uses a fresh parser context per call.

use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::path::Path;
use std::ptr::NonNull;
use std::sync::{Arc, Once};

use libc::{c_char, c_int, c_void};
use tracing::debug;

use crate::error::{LibXml2Error, LibXml2Result};

/// Global initialization flag for libxml2
///
/// libxml2's initialization functions are NOT thread-safe, so they run
/// exactly once behind `std::sync::Once`.
static LIBXML2_INIT: Once = Once::new();

/// Suppress error reports on stderr; errors are collected through callbacks.
pub const XML_PARSE_NOERROR: c_int = 1 << 5;
/// Suppress warning reports on stderr.
pub const XML_PARSE_NOWARNING: c_int = 1 << 6;
/// Forbid network access while parsing.
pub const XML_PARSE_NONET: c_int = 1 << 11;

const DOCUMENT_PARSE_OPTIONS: c_int = XML_PARSE_NOERROR | XML_PARSE_NOWARNING | XML_PARSE_NONET;

/// `xmlErrorLevel::XML_ERR_ERROR`
const XML_ERR_ERROR: c_int = 2;

// Opaque libxml2 structures
#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlParserCtxt {
    _private: [u8; 0],
}

// External libxml2 FFI declarations
#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub fn xmlInitParser();

    // Schema parsing functions
    pub fn xmlSchemaNewParserCtxt(url: *const c_char) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaParse(ctxt: *const XmlSchemaParserCtxt) -> *mut XmlSchema;
    pub fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    pub fn xmlSchemaFree(schema: *mut XmlSchema);

    // Schema validation functions
    pub fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    pub fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    pub fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaValidateDoc(ctxt: *mut XmlSchemaValidCtxt, doc: *mut XmlDoc) -> c_int;

    // Document parsing functions
    pub fn xmlNewParserCtxt() -> *mut XmlParserCtxt;
    pub fn xmlFreeParserCtxt(ctxt: *mut XmlParserCtxt);
    pub fn xmlCtxtReadMemory(
        ctxt: *mut XmlParserCtxt,
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    pub fn xmlCtxtGetLastError(ctx: *mut c_void) -> *const xmlError;
    pub fn xmlFreeDoc(doc: *mut XmlDoc);

    // Error reporting
    pub fn xmlSetStructuredErrorFunc(ctx: *mut c_void, handler: XmlStructuredErrorFunc);

    // Catalogs
    pub fn xmlCatalogCleanup();
}

#[repr(C)]
pub struct xmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *mut xmlError)>;

/// Read the message of a libxml2 error, trimmed. `None` for null pointers.
///
/// # Safety
///
/// `error` must be null or point to a live `xmlError`.
unsafe fn error_message(error: *const xmlError) -> Option<String> {
    if error.is_null() {
        return None;
    }
    let msg_ptr = unsafe { (*error).message };
    if msg_ptr.is_null() {
        return None;
    }
    let c_str = unsafe { CStr::from_ptr(msg_ptr) };
    Some(c_str.to_string_lossy().trim().to_string())
}

/// Callback for libxml2 to report schema parsing and validation errors.
///
/// Warnings are dropped; `user_data` must be a `*mut Vec<String>`.
unsafe extern "C" fn structured_error_callback(user_data: *mut c_void, error: *mut xmlError) {
    if user_data.is_null() || error.is_null() {
        return;
    }
    if unsafe { (*error).level } < XML_ERR_ERROR {
        return;
    }

    let errors = unsafe { &mut *(user_data as *mut Vec<String>) };
    if let Some(message) = unsafe { error_message(error) } {
        errors.push(message);
    }
}

/// Thread-safe wrapper for libxml2 schema pointer with proper resource management
///
/// - Schema pointers are freed when the last clone is dropped
/// - The schema can be shared across threads (libxml2 schemas are read-only after parsing)
#[derive(Debug)]
pub struct XmlSchemaPtr {
    inner: Arc<XmlSchemaInner>,
}

#[derive(Debug)]
struct XmlSchemaInner {
    ptr: *mut XmlSchema,
    _phantom: PhantomData<XmlSchema>,
}

// Safety: libxml2 documentation states that xmlSchema structures are thread-safe for reading
// See: http://xmlsoft.org/threads.html
unsafe impl Send for XmlSchemaInner {}
unsafe impl Sync for XmlSchemaInner {}

impl XmlSchemaPtr {
    /// Create a new XmlSchemaPtr from a raw pointer
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - The pointer is null or points to a properly initialized xmlSchema
    /// - The pointer was allocated by libxml2 and should be freed with xmlSchemaFree
    /// - No other code will free this pointer
    pub(crate) unsafe fn from_raw(ptr: *mut XmlSchema) -> LibXml2Result<Self> {
        if ptr.is_null() {
            return Err(LibXml2Error::SchemaParseFailed {
                details: "null pointer returned".to_string(),
            });
        }

        Ok(XmlSchemaPtr {
            inner: Arc::new(XmlSchemaInner {
                ptr,
                _phantom: PhantomData,
            }),
        })
    }

    /// Get the raw pointer for FFI calls
    ///
    /// Only valid while this XmlSchemaPtr exists; never free it.
    pub(crate) fn as_ptr(&self) -> *const XmlSchema {
        self.inner.ptr
    }

    /// Check if the schema pointer is valid (non-null)
    pub fn is_valid(&self) -> bool {
        !self.inner.ptr.is_null()
    }
}

impl Clone for XmlSchemaPtr {
    fn clone(&self) -> Self {
        XmlSchemaPtr {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for XmlSchemaInner {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlSchemaFree(self.ptr);
            }
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// An owned, parsed XML document. Freed on drop.
#[derive(Debug)]
pub struct XmlDocPtr {
    ptr: NonNull<XmlDoc>,
}

impl XmlDocPtr {
    /// # Safety
    ///
    /// `ptr` must come from a libxml2 parse function and must not be freed elsewhere.
    unsafe fn from_raw(ptr: *mut XmlDoc) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| XmlDocPtr { ptr })
    }

    fn as_ptr(&self) -> *mut XmlDoc {
        self.ptr.as_ptr()
    }
}

impl Drop for XmlDocPtr {
    fn drop(&mut self) {
        unsafe { xmlFreeDoc(self.ptr.as_ptr()) }
    }
}

/// Validation result from libxml2
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Validation succeeded (return code 0)
    Valid,
    /// Validation failed with errors (return code > 0)
    Invalid {
        error_count: i32,
        errors: Vec<String>,
    },
    /// Internal error occurred (return code < 0)
    InternalError { code: i32 },
}

impl ValidationResult {
    /// Create ValidationResult from libxml2 return code and captured errors
    pub fn from_code(code: c_int, errors: Vec<String>) -> Self {
        match code {
            0 => ValidationResult::Valid,
            n if n > 0 => ValidationResult::Invalid {
                error_count: n,
                errors,
            },
            n => ValidationResult::InternalError { code: n },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, ValidationResult::Invalid { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValidationResult::InternalError { .. })
    }
}

/// The operations a schema session and validator need from an XSD engine.
pub trait SchemaEngine: Send + Sync {
    /// Parse the schema at `path`, resolving imports relative to it and through
    /// the active XML catalogs. Not safe to call concurrently.
    fn parse_schema_file(&self, path: &Path) -> LibXml2Result<XmlSchemaPtr>;

    /// Parse an in-memory document without network access.
    fn parse_document(&self, xml: &[u8]) -> LibXml2Result<XmlDocPtr>;

    /// Validate a parsed document. Safe to call concurrently on a shared schema.
    fn validate_document(
        &self,
        schema: &XmlSchemaPtr,
        doc: &XmlDocPtr,
    ) -> LibXml2Result<ValidationResult>;

    /// Drop loaded catalogs so the next lookup re-reads `XML_CATALOG_FILES`.
    fn reload_catalogs(&self);
}

/// LibXML2 wrapper providing safe access to libxml2 functionality
///
/// Creating instances is cheap; libxml2 itself is initialized once per process.
pub struct LibXml2Wrapper {
    _phantom: PhantomData<()>,
}

impl LibXml2Wrapper {
    /// Create a new LibXML2 wrapper instance, initializing libxml2 on first use.
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
        });

        LibXml2Wrapper {
            _phantom: PhantomData,
        }
    }
}

impl SchemaEngine for LibXml2Wrapper {
    fn parse_schema_file(&self, path: &Path) -> LibXml2Result<XmlSchemaPtr> {
        let c_path = path
            .to_str()
            .and_then(|s| CString::new(s).ok())
            .ok_or_else(|| LibXml2Error::InvalidPath {
                path: path.to_path_buf(),
            })?;

        let parser_ctxt = unsafe { xmlSchemaNewParserCtxt(c_path.as_ptr()) };
        if parser_ctxt.is_null() {
            return Err(LibXml2Error::MemoryAllocation);
        }

        let mut errors: Vec<String> = Vec::new();
        let errors_ptr = &mut errors as *mut Vec<String> as *mut c_void;

        let schema_ptr = unsafe {
            xmlSchemaSetParserStructuredErrors(
                parser_ctxt,
                Some(structured_error_callback),
                errors_ptr,
            );
            // XML and I/O errors from reading the schema documents go to the
            // thread's handler, not the schema parser context.
            xmlSetStructuredErrorFunc(errors_ptr, Some(structured_error_callback));
            let schema_ptr = xmlSchemaParse(parser_ctxt);
            xmlSetStructuredErrorFunc(std::ptr::null_mut(), None);
            xmlSchemaFreeParserCtxt(parser_ctxt);
            schema_ptr
        };
        errors.dedup();

        if schema_ptr.is_null() {
            let details = if errors.is_empty() {
                "null pointer returned".to_string()
            } else {
                errors.join("; ")
            };
            return Err(LibXml2Error::SchemaParseFailed { details });
        }

        let schema = unsafe { XmlSchemaPtr::from_raw(schema_ptr) }?;
        debug!(path = %path.display(), "parsed schema");
        Ok(schema)
    }

    fn parse_document(&self, xml: &[u8]) -> LibXml2Result<XmlDocPtr> {
        if xml.is_empty() {
            return Err(LibXml2Error::DocumentParseFailed {
                details: "line 1: Document is empty".to_string(),
            });
        }
        let size = c_int::try_from(xml.len())
            .map_err(|_| LibXml2Error::DocumentTooLarge { len: xml.len() })?;

        let ctxt = unsafe { xmlNewParserCtxt() };
        if ctxt.is_null() {
            return Err(LibXml2Error::MemoryAllocation);
        }

        let doc = unsafe {
            xmlCtxtReadMemory(
                ctxt,
                xml.as_ptr() as *const c_char,
                size,
                std::ptr::null(),
                std::ptr::null(),
                DOCUMENT_PARSE_OPTIONS,
            )
        };

        let result = match unsafe { XmlDocPtr::from_raw(doc) } {
            Some(doc) => Ok(doc),
            None => {
                let last = unsafe { xmlCtxtGetLastError(ctxt as *mut c_void) };
                let details = match unsafe { error_message(last) } {
                    Some(message) => format!("line {}: {}", unsafe { (*last).line }, message),
                    None => "document could not be parsed".to_string(),
                };
                Err(LibXml2Error::DocumentParseFailed { details })
            }
        };

        unsafe { xmlFreeParserCtxt(ctxt) };
        result
    }

    fn validate_document(
        &self,
        schema: &XmlSchemaPtr,
        doc: &XmlDocPtr,
    ) -> LibXml2Result<ValidationResult> {
        // Per-call context; the schema itself is only read.
        let valid_ctxt = unsafe { xmlSchemaNewValidCtxt(schema.as_ptr()) };
        if valid_ctxt.is_null() {
            return Err(LibXml2Error::ValidationContextCreationFailed);
        }

        let mut errors: Vec<String> = Vec::new();
        let errors_ptr = &mut errors as *mut Vec<String> as *mut c_void;

        let result_code = unsafe {
            xmlSchemaSetValidStructuredErrors(
                valid_ctxt,
                Some(structured_error_callback),
                errors_ptr,
            );
            let code = xmlSchemaValidateDoc(valid_ctxt, doc.as_ptr());
            xmlSchemaFreeValidCtxt(valid_ctxt);
            code
        };

        match ValidationResult::from_code(result_code, errors) {
            ValidationResult::InternalError { code } => {
                Err(LibXml2Error::ValidationFailed { code })
            }
            result => Ok(result),
        }
    }

    fn reload_catalogs(&self) {
        unsafe { xmlCatalogCleanup() }
    }
}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}
