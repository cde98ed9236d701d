//! Rendered form → session → submission engine.
//!
//! Run with: cargo test --test submission_flow

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use soar_forms::forms::settings::ElementType;
use soar_forms::forms::{xml, FormBuilder, FormDocument};
use soar_forms::render::FormSession;
use soar_forms::submit::{
    ArtifactOutcome, CaseApi, FileStatus, FileUpload, NewArtifact, SubmissionEngine, VaultReceipt,
};
use soar_forms::{CaseApiAuth, CaseApiClient, CaseApiConfig, FormError, Result};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

/// Stored form with a table, two scalar inputs and two file inputs.
fn stored_form() -> FormDocument {
    let mut b = FormBuilder::new();
    b.set_name("malware-triage");
    b.set_label("events");
    let table = b.add_element(ElementType::Table);
    b.attach_csv(table, "iocs.csv", b"a,b\n1,2\n3,4\n").unwrap();
    b.add_element(ElementType::InputText);
    b.add_element(ElementType::Email);
    b.add_element(ElementType::File);
    b.add_element(ElementType::File);
    xml::decode(&xml::encode(b.document())).unwrap()
}

#[derive(Default)]
struct FakeCaseApi {
    artifacts: Mutex<Vec<(String, Map<String, Value>)>>,
    uploads: Mutex<Vec<String>>,
    broken_files: Vec<String>,
}

#[async_trait]
impl CaseApi for FakeCaseApi {
    async fn create_container(&self, _name: &str, _label: &str) -> Result<u64> {
        Ok(100)
    }

    async fn add_artifact(&self, container_id: u64, artifact: NewArtifact<'_>) -> Result<u64> {
        assert_eq!(container_id, 100);
        let mut artifacts = self.artifacts.lock().unwrap();
        artifacts.push((artifact.name.to_string(), artifact.cef.clone()));
        Ok(artifacts.len() as u64)
    }

    async fn upload_file(&self, container_id: u64, file: &FileUpload) -> Result<VaultReceipt> {
        assert_eq!(container_id, 100);
        self.uploads.lock().unwrap().push(file.file_name.clone());
        if self.broken_files.contains(&file.file_name) {
            return Err(FormError::ExternalApi {
                operation: "upload file",
                status: Some(502),
                message: "vault unavailable".into(),
            });
        }
        Ok(VaultReceipt {
            hash: format!("sha-{}", file.file_name),
            vault_id: None,
        })
    }
}

fn filled_session(doc: &FormDocument) -> FormSession<'_> {
    let mut session = FormSession::new(doc, today());
    session.set_value("inputText1", "dropper seen on web01").unwrap();
    session.set_value("email1", "analyst@example.com").unwrap();
    session
        .attach_file("file1", FileUpload::new("a.eml", "message/rfc822", vec![7; 10]))
        .unwrap();
    session
        .attach_file("file2", FileUpload::new("b.pcap", "application/octet-stream", vec![9; 3 * 1024 * 1024]))
        .unwrap();
    session
}

#[tokio::test]
async fn failed_upload_does_not_fail_submission() {
    let doc = stored_form();
    let session = filled_session(&doc);
    let api = FakeCaseApi {
        broken_files: vec!["a.eml".into()],
        ..Default::default()
    };
    let engine = SubmissionEngine::new(api);

    let report = engine.submit(&doc, session.values()).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.container_id, 100);
    assert!(matches!(report.fields_artifact, ArtifactOutcome::Created { .. }));
    assert_eq!(report.files.len(), 2);
    assert!(matches!(report.files[0].status, FileStatus::UploadFailed { .. }));
    assert!(matches!(report.files[1].status, FileStatus::Uploaded { .. }));
    assert_eq!(report.failed_files().count(), 1);

    let api = engine.api();
    assert_eq!(*api.uploads.lock().unwrap(), vec!["a.eml", "b.pcap"]);

    let artifacts = api.artifacts.lock().unwrap();
    // fields artifact + one metadata artifact for b.pcap only
    assert_eq!(artifacts.len(), 2);
    let (name, fields) = &artifacts[0];
    assert_eq!(name, "malware-triage");
    assert_eq!(
        Value::Object(fields.clone()),
        json!({
            "a": ["1", "3"],
            "b": ["2", "4"],
            "inputText1": "dropper seen on web01",
            "email1": "analyst@example.com",
        })
    );
    let (name, meta) = &artifacts[1];
    assert_eq!(name, "b.pcap");
    assert_eq!(
        Value::Object(meta.clone()),
        json!({
            "hash": "sha-b.pcap",
            "filename": "b.pcap",
            "filetype": "application/octet-stream",
            "filesize": "3.00 MB",
        })
    );
}

#[tokio::test]
async fn end_to_end_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/container"))
        .and(body_partial_json(json!({"name": "malware-triage", "label": "events"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/artifact"))
        .and(body_partial_json(json!({"container_id": 5, "cef": {"a": ["1", "3"]}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 11})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/artifact"))
        .and(body_partial_json(json!({"container_id": 5, "cef": {"filename": "b.pcap"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 12})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/container_attachment"))
        .and(body_partial_json(json!({"file_name": "a.eml"})))
        .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/container_attachment"))
        .and(body_partial_json(json!({"file_name": "b.pcap"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hash": "feed"})))
        .mount(&server)
        .await;

    let config = CaseApiConfig::new(
        Url::parse(&server.uri()).unwrap(),
        CaseApiAuth::Token("token".into()),
    );
    let engine = SubmissionEngine::new(CaseApiClient::new(config).unwrap());

    let doc = stored_form();
    let session = filled_session(&doc);
    let report = engine.submit(&doc, session.values()).await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.fields_artifact, ArtifactOutcome::Created { artifact_id: 11 });
    match &report.files[0].status {
        FileStatus::UploadFailed { error } => assert!(error.contains("disk full")),
        other => panic!("unexpected status {:?}", other),
    }
    assert_eq!(
        report.files[1].status,
        FileStatus::Uploaded {
            hash: "feed".into(),
            artifact_id: 12
        }
    );
}

#[tokio::test]
async fn container_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/container"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "bad token"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/container_attachment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hash": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let config = CaseApiConfig::new(
        Url::parse(&server.uri()).unwrap(),
        CaseApiAuth::Token("expired".into()),
    );
    let engine = SubmissionEngine::new(CaseApiClient::new(config).unwrap());
    let doc = stored_form();
    let session = filled_session(&doc);

    let err = engine.submit(&doc, session.values()).await.unwrap_err();
    assert!(matches!(
        err,
        FormError::ExternalApi {
            status: Some(401),
            ..
        }
    ));
}
