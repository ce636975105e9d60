#![allow(dead_code)]

use std::sync::{Arc, OnceLock};
use tessera_context::{InMemoryMetadataProvider, MemberInfo, TypeInfo, TypeKind};
use tessera_fhirpath::{Engine, Value};

pub const PATIENT_XML: &str = r#"<Patient xmlns="http://hl7.org/fhir">
  <id value="example"/>
  <active value="true"/>
  <name>
    <use value="official"/>
    <family value="Chalmers"/>
    <given value="Peter"/>
    <given value="James"/>
  </name>
  <name>
    <use value="usual"/>
    <given value="Jim"/>
  </name>
  <birthDate value="1974-12-25"/>
</Patient>"#;

pub const PATIENT_TURTLE: &str = r#"
@prefix fhir: <http://hl7.org/fhir/> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

<http://hl7.org/fhir/Patient/example> a fhir:Patient ;
  fhir:nodeRole fhir:treeRoot ;
  fhir:Resource.id [ fhir:value "example" ] ;
  fhir:Patient.active [ fhir:value true ] ;
  fhir:Patient.name [
    fhir:index 0 ;
    fhir:HumanName.use [ fhir:value "official" ] ;
    fhir:HumanName.family [ fhir:value "Chalmers" ] ;
    fhir:HumanName.given [ fhir:value "Peter" ; fhir:index 0 ] , [ fhir:value "James" ; fhir:index 1 ]
  ] , [
    fhir:index 1 ;
    fhir:HumanName.use [ fhir:value "usual" ] ;
    fhir:HumanName.given [ fhir:value "Jim" ; fhir:index 0 ]
  ] ;
  fhir:Patient.birthDate [ fhir:value "1974-12-25"^^xsd:date ] .
"#;

pub const PATIENT_JSON: &str = r#"{
  "resourceType": "Patient",
  "id": "example",
  "active": true,
  "name": [
    { "use": "official", "family": "Chalmers", "given": ["Peter", "James"] },
    { "use": "usual", "given": ["Jim"] }
  ],
  "birthDate": "1974-12-25"
}"#;

/// The three serializations above, labelled for assertion messages.
pub fn patient_formats() -> [(&'static str, &'static str); 3] {
    [
        ("xml", PATIENT_XML),
        ("turtle", PATIENT_TURTLE),
        ("json", PATIENT_JSON),
    ]
}

static METADATA: OnceLock<Arc<InMemoryMetadataProvider>> = OnceLock::new();

/// Just enough structure definitions for the Patient fixtures.
pub fn metadata() -> Arc<InMemoryMetadataProvider> {
    METADATA
        .get_or_init(|| {
            Arc::new(
                InMemoryMetadataProvider::new()
                    .with_type(
                        TypeInfo::new("Resource", TypeKind::Resource)
                            .with_member(MemberInfo::new("id", "id")),
                    )
                    .with_type(
                        TypeInfo::new("Patient", TypeKind::Resource)
                            .with_member(MemberInfo::new("id", "id"))
                            .with_member(MemberInfo::new("active", "boolean"))
                            .with_member(MemberInfo::new("name", "HumanName").repeating())
                            .with_member(MemberInfo::new("birthDate", "date")),
                    )
                    .with_type(
                        TypeInfo::new("HumanName", TypeKind::Complex)
                            .with_member(MemberInfo::new("use", "code"))
                            .with_member(MemberInfo::new("family", "string"))
                            .with_member(MemberInfo::new("given", "string").repeating()),
                    ),
            )
        })
        .clone()
}

pub fn engine() -> Engine {
    Engine::new()
}

pub fn typed_engine() -> Engine {
    Engine::new().with_metadata(metadata())
}

/// Render values by their lexical form.
pub fn strings(values: &[Value]) -> Vec<String> {
    values.iter().map(Value::to_string).collect()
}

/// Evaluate against one format by label.
pub fn evaluate(
    engine: &Engine,
    format: &str,
    text: &str,
    expr: &tessera_fhirpath::Expression,
) -> tessera_fhirpath::Result<Vec<Value>> {
    match format {
        "xml" => engine.evaluate_xml(expr, text),
        "turtle" => engine.evaluate_turtle(expr, text),
        _ => engine.evaluate_json(expr, text),
    }
}
