//! The same expressions evaluated over XML, Turtle and JSON serializations of one
//! Patient give the same answers.

use tessera_fhirpath::expression::{call, child, constant, method, path, variable};
use tessera_fhirpath::{Error, PrimitiveType, Value};

mod test_support;

use test_support::{evaluate, patient_formats, strings};

#[test]
fn paths_agree_across_formats() {
    let engine = test_support::engine();
    let given = path(&["Patient", "name", "given"]);
    for (format, text) in patient_formats() {
        let values = evaluate(&engine, format, text, &given).unwrap();
        assert_eq!(strings(&values), vec!["Peter", "James", "Jim"], "{format}");
    }
}

#[test]
fn where_and_first_agree_across_formats() {
    let engine = test_support::engine();
    let usual = method(
        method(
            child("name"),
            "where",
            vec![call("=", vec![child("use"), constant("usual")])],
        ),
        "builtin.children",
        vec![constant("given")],
    );
    let first_given = method(path(&["name", "given"]), "first", vec![]);

    for (format, text) in patient_formats() {
        assert_eq!(
            strings(&evaluate(&engine, format, text, &usual).unwrap()),
            vec!["Jim"],
            "{format}"
        );
        assert_eq!(
            strings(&evaluate(&engine, format, text, &first_given).unwrap()),
            vec!["Peter"],
            "{format}"
        );
    }
}

#[test]
fn untyped_booleans_work_in_boolean_context() {
    let engine = test_support::engine();
    let expr = call("and", vec![child("active"), method(child("name"), "exists", vec![])]);
    for (format, text) in patient_formats() {
        let values = evaluate(&engine, format, text, &expr).unwrap();
        assert_eq!(values, vec![Value::boolean(true)], "{format}");
    }
}

#[test]
fn metadata_types_primitive_values() {
    let engine = test_support::typed_engine();
    let active = path(&["active"]);
    let birth_date = path(&["birthDate"]);
    for (format, text) in patient_formats() {
        assert_eq!(
            evaluate(&engine, format, text, &active).unwrap(),
            vec![Value::boolean(true)],
            "{format}"
        );

        let dates = evaluate(&engine, format, text, &birth_date).unwrap();
        assert_eq!(dates.len(), 1, "{format}");
        assert_eq!(dates[0].primitive_type().name(), "Date", "{format}");
        assert_eq!(dates[0].to_string(), "1974-12-25", "{format}");
    }
}

#[test]
fn primitives_with_element_ids_keep_their_declared_type() {
    let engine = test_support::typed_engine();
    let xml = r#"<Patient xmlns="http://hl7.org/fhir"><birthDate id="bd" value="1974-12-25"/></Patient>"#;
    let turtle = r#"
        @prefix fhir: <http://hl7.org/fhir/> .
        <http://hl7.org/fhir/Patient/bd> a fhir:Patient ; fhir:nodeRole fhir:treeRoot ;
          fhir:Patient.birthDate [ fhir:Element.id [ fhir:value "bd" ] ; fhir:value "1974-12-25" ] .
    "#;
    let birthday = Value::parse(PrimitiveType::Date, "1974-12-25").unwrap();
    let expr = call("=", vec![child("birthDate"), constant(birthday)]);

    for (format, text) in [("xml", xml), ("turtle", turtle)] {
        assert_eq!(
            evaluate(&engine, format, text, &expr).unwrap(),
            vec![Value::boolean(true)],
            "{format}"
        );
    }
}

#[test]
fn resource_variables_point_at_the_root() {
    let engine = test_support::engine();
    let expr = method(variable("%resource"), "builtin.children", vec![constant("id")]);
    for (format, text) in patient_formats() {
        assert_eq!(
            strings(&evaluate(&engine, format, text, &expr).unwrap()),
            vec!["example"],
            "{format}"
        );
    }
}

#[test]
fn complex_results_cannot_be_returned_as_values() {
    let engine = test_support::engine();
    for (format, text) in patient_formats() {
        let result = evaluate(&engine, format, text, &path(&["name"]));
        assert!(matches!(result, Err(Error::TypeError(_))), "{format}");
    }
}

#[test]
fn malformed_input_surfaces_as_format_errors() {
    let engine = test_support::engine();
    let expr = path(&["id"]);

    let xml = engine.evaluate_xml(&expr, "<Patient><id value='x'></Patient>");
    assert!(matches!(xml, Err(Error::Format(_))));

    let turtle = engine.evaluate_turtle(&expr, "@prefix fhir: <http://hl7.org/fhir/> . fhir:a fhir:b");
    assert!(matches!(turtle, Err(Error::Format(_))));

    let rootless = engine.evaluate_turtle(
        &expr,
        "@prefix fhir: <http://hl7.org/fhir/> . <urn:x> a fhir:Patient .",
    );
    assert!(matches!(rootless, Err(Error::Format(_))));
}
