//! Criterion benchmarks for evaluation over the three navigator formats

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;
use tessera_fhirpath::expression::{call, child, constant, method, path, variable, Expression};
use tessera_fhirpath::Engine;
use tessera_format::{JsonDocument, TurtleDocument, XmlDocument};

const NAMES: usize = 200;

fn custom_criterion() -> Criterion {
    Criterion::default()
        .sample_size(20)
        .warm_up_time(Duration::from_millis(100))
        .measurement_time(Duration::from_secs(1))
        .nresamples(1000)
        .noise_threshold(0.05)
}

fn patient_xml() -> String {
    let mut xml = String::from(r#"<Patient xmlns="http://hl7.org/fhir"><id value="bench"/>"#);
    for i in 0..NAMES {
        xml.push_str(&format!(
            r#"<name><use value="{}"/><family value="Family{i}"/><given value="A{i}"/><given value="B{i}"/></name>"#,
            if i % 10 == 0 { "official" } else { "usual" }
        ));
    }
    xml.push_str("</Patient>");
    xml
}

fn patient_turtle() -> String {
    let mut ttl = String::from(
        "@prefix fhir: <http://hl7.org/fhir/> .\n\
         <http://hl7.org/fhir/Patient/bench> a fhir:Patient ; fhir:nodeRole fhir:treeRoot ;\n\
         fhir:Resource.id [ fhir:value \"bench\" ]",
    );
    for i in 0..NAMES {
        ttl.push_str(&format!(
            " ;\n fhir:Patient.name [ fhir:index {i} ; fhir:HumanName.use [ fhir:value \"{}\" ] ; \
             fhir:HumanName.family [ fhir:value \"Family{i}\" ] ; \
             fhir:HumanName.given [ fhir:value \"A{i}\" ; fhir:index 0 ] , [ fhir:value \"B{i}\" ; fhir:index 1 ] ]",
            if i % 10 == 0 { "official" } else { "usual" }
        ));
    }
    ttl.push_str(" .\n");
    ttl
}

fn patient_json() -> String {
    let names: Vec<String> = (0..NAMES)
        .map(|i| {
            format!(
                r#"{{"use": "{}", "family": "Family{i}", "given": ["A{i}", "B{i}"]}}"#,
                if i % 10 == 0 { "official" } else { "usual" }
            )
        })
        .collect();
    format!(
        r#"{{"resourceType": "Patient", "id": "bench", "name": [{}]}}"#,
        names.join(",")
    )
}

fn expressions() -> Vec<(&'static str, Expression)> {
    vec![
        ("path", path(&["Patient", "name", "given"])),
        (
            "where",
            method(
                child("name"),
                "where",
                vec![call("=", vec![child("use"), constant("official")])],
            ),
        ),
        ("exists", method(path(&["name", "family"]), "exists", vec![])),
        ("count", method(call("descendants", vec![]), "count", vec![])),
        (
            "union",
            call(
                "|",
                vec![path(&["name", "use"]), method(variable("%resource"), "builtin.children", vec![constant("id")])],
            ),
        ),
    ]
}

fn bench_navigation(c: &mut Criterion) {
    let engine = Engine::new();
    let xml_text = patient_xml();
    let turtle_text = patient_turtle();
    let json_text = patient_json();

    let xml = XmlDocument::parse(&xml_text).unwrap();
    let turtle = TurtleDocument::parse(&turtle_text).unwrap();
    let json = JsonDocument::parse(&json_text).unwrap();

    for (label, expr) in expressions() {
        c.bench_function(&format!("xml_{label}"), |b| {
            b.iter(|| {
                engine
                    .evaluate_node(black_box(&expr), xml.root_node())
                    .and_then(|seq| seq.count())
                    .unwrap()
            })
        });
        c.bench_function(&format!("turtle_{label}"), |b| {
            b.iter(|| {
                engine
                    .evaluate_node(black_box(&expr), turtle.root_node())
                    .and_then(|seq| seq.count())
                    .unwrap()
            })
        });
        c.bench_function(&format!("json_{label}"), |b| {
            b.iter(|| {
                engine
                    .evaluate_node(black_box(&expr), json.root_node())
                    .and_then(|seq| seq.count())
                    .unwrap()
            })
        });
    }
}

fn bench_parse_and_evaluate(c: &mut Criterion) {
    let engine = Engine::new();
    let expr = path(&["name", "family"]);
    let xml_text = patient_xml();
    let turtle_text = patient_turtle();
    let json_text = patient_json();

    c.bench_function("xml_parse_evaluate", |b| {
        b.iter(|| engine.evaluate_xml(&expr, black_box(&xml_text)).unwrap())
    });
    c.bench_function("turtle_parse_evaluate", |b| {
        b.iter(|| engine.evaluate_turtle(&expr, black_box(&turtle_text)).unwrap())
    });
    c.bench_function("json_parse_evaluate", |b| {
        b.iter(|| engine.evaluate_json(&expr, black_box(&json_text)).unwrap())
    });
}

criterion_group! {
    name = benches;
    config = custom_criterion();
    targets =
        bench_navigation,
        bench_parse_and_evaluate
}
criterion_main!(benches);
