//! End-to-end validation through the crate-level API.

mod common;

use common::test_helpers::{TestFixtures, strip_empty_elements};
use saml_xsd::{Schema, ValidationError, Validator};

#[test]
fn test_validate_metadata() {
    let fixtures = TestFixtures::new();
    saml_xsd::validate(&fixtures.metadata(), Schema::Metadata).unwrap();
}

#[test]
fn test_validate_protocol() {
    let fixtures = TestFixtures::new();
    saml_xsd::validate(&fixtures.authn_request(), Schema::Protocol).unwrap();
}

#[test]
fn test_validate_xhtml() {
    let fixtures = TestFixtures::new();
    saml_xsd::validate(&fixtures.xhtml(), Schema::Xhtml).unwrap();
}

#[test]
fn test_metadata_missing_required_element() {
    let fixtures = TestFixtures::new();
    let xml = String::from_utf8(fixtures.metadata()).unwrap();
    let xml = strip_empty_elements(&xml, "md:AssertionConsumerService");
    assert!(!xml.contains("AssertionConsumerService"));

    let err = saml_xsd::validate(xml.as_bytes(), Schema::Metadata).unwrap_err();
    assert!(matches!(err, ValidationError::Invalid { .. }), "{err:?}");
    assert!(err.to_string().contains("failed to validate XML"));
    assert!(
        err.validation_errors()
            .iter()
            .any(|e| e.contains("AttributeConsumingService")),
        "{err}"
    );
}

#[test]
fn test_metadata_missing_required_attribute() {
    let fixtures = TestFixtures::new();
    let xml = String::from_utf8(fixtures.metadata()).unwrap();
    let xml = xml.replacen(r#"entityID="https://sp.example.com/shibboleth""#, "", 1);

    let err = saml_xsd::validate(xml.as_bytes(), Schema::Metadata).unwrap_err();
    assert!(err.to_string().contains("failed to validate XML"));
    assert!(
        err.validation_errors().iter().any(|e| e.contains("entityID")),
        "{err}"
    );
}

#[test]
fn test_every_violation_is_reported_in_order() {
    let xml = br#"<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata"
    entityID="https://sp.example.org/metadata" validUntil="not-a-date">
  <md:SPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
    <md:AssertionConsumerService index="abc"
        Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST"
        Location="https://sp.example.org/acs"/>
  </md:SPSSODescriptor>
</md:EntityDescriptor>"#;

    let err = saml_xsd::validate(xml, Schema::Metadata).unwrap_err();
    let errors = err.validation_errors();
    assert_eq!(errors.len(), 2, "{errors:?}");
    assert!(errors[0].contains("attribute 'validUntil'"), "{}", errors[0]);
    assert!(errors[0].contains("'not-a-date'"), "{}", errors[0]);
    assert!(errors[1].contains("attribute 'index'"), "{}", errors[1]);
    assert!(errors[1].contains("'abc'"), "{}", errors[1]);

    let message = err.to_string();
    assert!(message.starts_with("failed to validate XML: Element "), "{message}");
    let first = message.find("'not-a-date'").unwrap();
    let separator = message.find("; ").unwrap();
    let second = message.find("'abc'").unwrap();
    assert!(first < separator && separator < second, "{message}");
}

#[test]
fn test_wrong_document_for_schema() {
    let fixtures = TestFixtures::new();
    let err = saml_xsd::validate(&fixtures.xhtml(), Schema::Metadata).unwrap_err();
    assert!(matches!(err, ValidationError::Invalid { .. }));
}

#[test]
fn test_parse_error() {
    let err = saml_xsd::validate(b"invalid", Schema::Metadata).unwrap_err();
    match &err {
        ValidationError::Parse { details } => {
            assert!(details.contains("Start tag expected, '<' not found"), "{details}")
        }
        other => panic!("Expected Parse, got {:?}", other),
    }
    assert!(err.to_string().contains("Start tag expected"));
}

#[test]
fn test_empty_and_garbage_input() {
    for input in [
        &b""[..],
        &b"\x00\x01\x02"[..],
        &b"<md:EntityDescriptor"[..],
        &b"<<>>"[..],
    ] {
        let err = saml_xsd::validate(input, Schema::Protocol).unwrap_err();
        assert!(
            matches!(err, ValidationError::Parse { .. }),
            "{input:?} -> {err:?}"
        );
    }
}

#[test]
fn test_parallel_validation_shares_global_session() {
    use rayon::prelude::*;

    let fixtures = TestFixtures::new();
    let cases = [
        (fixtures.metadata(), Schema::Metadata, true),
        (fixtures.authn_request(), Schema::Protocol, true),
        (fixtures.xhtml(), Schema::Xhtml, true),
        (fixtures.authn_request(), Schema::Metadata, false),
    ];

    let validator = Validator::global();
    (0..64).into_par_iter().for_each(|i| {
        let (xml, schema, expect_ok) = &cases[i % cases.len()];
        assert_eq!(validator.validate(xml, *schema).is_ok(), *expect_ok);
    });
    assert!(validator.session().is_ready());
}
