mod common;

use acord_pdf_factory::generators::GeneratorError;
use acord_pdf_factory::{FactorySettings, Generator, Job, RequestRecord};
use common::{factory, factory_with_settings, project, write};
use regex::Regex;
use serde_json::json;

fn record(value: serde_json::Value) -> RequestRecord {
    RequestRecord::from_value(value)
}

// HTML engine

#[tokio::test]
async fn test_html_form_end_to_end() {
    let root = project();
    let (factory, recorder) = factory(root.path());

    let job = Job::new(record(json!({
        "id": "abc123",
        "applicant_name": "Joe's Plumbing & Sons",
        "segment": "plumber"
    })))
    .with_template("acord125_v1");

    let document = factory.generate(job).await.unwrap();

    assert_eq!(document.filename(), "plumber_Joes_Plumbing_Sons_abc123.pdf");
    assert_eq!(document.meta.content_type, "application/pdf");
    assert!(document.buffer.starts_with(b"%PDF"));
    assert_eq!(recorder.opened(), 1);
    assert_eq!(recorder.closed(), 1);

    let markup = recorder.last_markup();
    assert!(markup.contains("<h1>Joe&#x27;s Plumbing &amp; Sons</h1>"));
    assert!(markup.contains("<p></p>"), "missing values bind as blank");
    assert!(markup.contains("h1 { font-size: 14pt }"));
}

#[tokio::test]
async fn test_alias_resolves_to_form() {
    let root = project();
    let (factory, _) = factory(root.path());

    let job = Job::new(record(json!({"id": "1", "applicant_name": "Joe"})))
        .with_template("Accord125")
        .with_segment("plumber");
    let document = factory.generate(job).await.unwrap();
    assert_eq!(document.filename(), "plumber_Joe_1.pdf");
}

#[tokio::test]
async fn test_form_id_from_record() {
    let root = project();
    let (factory, recorder) = factory(root.path());

    let job = Job::new(record(json!({"id": "7", "form_id": "acord125_v1", "business_name": "Acme"})));
    let document = factory.generate(job).await.unwrap();

    assert_eq!(document.filename(), "default_Acme_7.pdf");
    assert!(recorder.last_markup().contains("<title>ACORD 125</title>"));
}

#[tokio::test]
async fn test_field_mapping_applies_before_binding() {
    let root = project();
    write(root.path(), "mapping/ACORD125.json", r#"{ "insured.name": "business_name" }"#);
    let (factory, recorder) = factory(root.path());

    let job = Job::new(record(json!({"id": "1", "business_name": "Acme Pipe"})))
        .with_template("acord125_v1");
    factory.generate(job).await.unwrap();

    assert!(recorder.last_markup().contains("<p>Acme Pipe</p>"));
}

#[tokio::test]
async fn test_same_job_same_output() {
    let root = project();
    let (factory, recorder) = factory(root.path());
    let job = Job::new(record(json!({"id": "r1", "applicant_name": "Joe", "segment": "plumber"})))
        .with_template("acord125_v1");

    let first = factory.generate(job.clone()).await.unwrap();
    let second = factory.generate(job).await.unwrap();

    assert_eq!(first.filename(), second.filename());
    assert_eq!(first.buffer, second.buffer);
    let markup = recorder.markup.lock().unwrap();
    assert_eq!(markup[0], markup[1]);
}

#[tokio::test]
async fn test_missing_id_uses_timestamp() {
    let root = project();
    let (factory, _) = factory(root.path());

    let job = Job::new(record(json!({"applicant_name": "Joe"})))
        .with_template("acord125_v1")
        .with_segment("plumber");
    let document = factory.generate(job).await.unwrap();

    let pattern = Regex::new(r"^plumber_Joe_\d{14}\.pdf$").unwrap();
    assert!(pattern.is_match(document.filename()), "{}", document.filename());
}

// SVG engine

#[tokio::test]
async fn test_svg_pages_get_overlays() {
    let root = project();
    let (factory, recorder) = factory(root.path());

    let job = Job::new(record(json!({
        "id": "c-9",
        "holder_name": "City of Springfield",
        "segment": "plumber"
    })))
    .with_template("acord25_v1");

    let document = factory.generate(job).await.unwrap();
    assert_eq!(document.filename(), "COI_plumber_City_of_Springfield_c_9.pdf");
    assert!(document.buffer.starts_with(b"%PDF"));

    let markup = recorder.last_markup();
    let page_one = markup.find("data-page=\"1\"").unwrap();
    let page_two = markup.find("data-page=\"2\"").unwrap();
    assert!(page_one < page_two);

    let holder = markup
        .find(r#"data-field="holder_name" x="40" y="120" font-size="10">City of Springfield</text>"#)
        .unwrap();
    assert!(page_one < holder && holder < page_two);

    let policy = markup
        .find(r#"data-field="policy_number" x="60" y="300" font-size="9"></text>"#)
        .unwrap();
    assert!(page_two < policy);

    assert!(markup.contains("size: 8.5in 11in"));
    assert!(!markup.contains("undefined"));
    assert_eq!(recorder.closed(), 1);
}

#[tokio::test]
async fn test_orphan_page_map_strict_and_lenient() {
    let root = project();
    write(
        root.path(),
        "templates/ACORD25/mapping/page-3.map.json",
        r#"{ "pageId": 3, "fields": [ { "name": "x", "x": 1, "y": 1 } ] }"#,
    );
    let job = Job::new(record(json!({"id": "1", "holder_name": "A"}))).with_template("acord25_v1");

    let (strict, recorder) = factory(root.path());
    let err = strict.generate(job.clone()).await.unwrap_err();
    assert!(err.is_configuration(), "{err}");
    assert!(err.to_string().contains("page 3"));
    assert_eq!(recorder.opened(), 0);

    let (lenient, _) =
        factory_with_settings(FactorySettings::new(root.path()).with_strict_mapping(false));
    assert!(lenient.generate(job).await.is_ok());
}

#[tokio::test]
async fn test_malformed_page_map_fails_strict() {
    let root = project();
    write(root.path(), "templates/ACORD25/mapping/page-2.map.json", "{ not json");
    let (factory, _) = factory(root.path());

    let err = factory
        .generate(Job::new(RequestRecord::new()).with_template("acord25_v1"))
        .await
        .unwrap_err();
    assert!(err.is_configuration(), "{err}");
}

// Configuration failures never reach the browser

#[tokio::test]
async fn test_unknown_form_id() {
    let root = project();
    let (factory, recorder) = factory(root.path());

    let err = factory
        .generate(Job::new(RequestRecord::new()).with_template("acord999_v1"))
        .await
        .unwrap_err();

    assert!(matches!(err, GeneratorError::Configuration(ref msg) if msg.contains("acord999_v1")));
    assert_eq!(recorder.opened(), 0);
}

#[tokio::test]
async fn test_unknown_engine() {
    let root = project();
    let (factory, recorder) = factory(root.path());

    let err = factory
        .generate(Job::new(RequestRecord::new()).with_template("legacy_v1"))
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert!(err.to_string().contains("pdfkit"));
    assert_eq!(recorder.opened(), 0);
}

#[tokio::test]
async fn test_missing_template_directory() {
    let root = project();
    let (factory, recorder) = factory(root.path());

    let err = factory
        .generate(Job::new(RequestRecord::new()).with_template("acord126_v1"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("template directory not found"));
    assert_eq!(recorder.opened(), 0);
}

#[tokio::test]
async fn test_missing_index_names_expected_file() {
    let root = project();
    std::fs::remove_file(root.path().join("templates/ACORD125/index.ejs")).unwrap();
    let (factory, recorder) = factory(root.path());

    let err = factory
        .generate(Job::new(RequestRecord::new()).with_template("acord125_v1"))
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert!(err.to_string().contains("index.hbs"));
    assert_eq!(recorder.opened(), 0);
}
