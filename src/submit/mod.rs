//! Submission Engine
//!
//! Packages a filled-in form for the case-management API:
//! 1. one container per submission
//! 2. one artifact holding every table column and scalar value
//! 3. per file, a vault upload followed by a metadata artifact
//!
//! A container failure aborts the submission. Everything after that is
//! best effort and recorded in the returned `SubmissionReport`.

pub mod aggregate;
pub mod case_api;
pub mod values;

pub use aggregate::{aggregate, human_file_size, transpose_table, Aggregated};
pub use case_api::{CaseApi, CaseApiClient, NewArtifact, VaultReceipt};
pub use values::{FileUpload, SubmissionValue, SubmissionValues};

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::Result;
use crate::forms::document::FormDocument;

const FIELDS_ARTIFACT_LABEL: &str = "form";
const FILE_ARTIFACT_LABEL: &str = "vault file";

/// What happened to the fields artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcome {
    Created { artifact_id: u64 },
    /// No table or scalar values to send.
    Skipped,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Uploaded { hash: String, artifact_id: u64 },
    /// Vault upload failed; no metadata artifact was created.
    UploadFailed { error: String },
    /// Stored in the vault but the metadata artifact failed.
    ArtifactFailed { hash: String, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub key: String,
    pub file_name: String,
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, FileStatus::Uploaded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
    pub container_id: u64,
    pub fields_artifact: ArtifactOutcome,
    pub files: Vec<FileOutcome>,
}

impl SubmissionReport {
    /// Container and fields artifact succeeded. File outcomes do not count.
    pub fn is_success(&self) -> bool {
        !matches!(self.fields_artifact, ArtifactOutcome::Failed { .. })
    }

    pub fn failed_files(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| !f.is_success())
    }
}

pub struct SubmissionEngine<A: CaseApi> {
    api: A,
}

impl<A: CaseApi> SubmissionEngine<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn submit(
        &self,
        doc: &FormDocument,
        values: &SubmissionValues,
    ) -> Result<SubmissionReport> {
        let aggregated = aggregate(doc, values);

        let container_id = self.api.create_container(&doc.name, &doc.label).await?;
        info!(form = %doc.name, container_id, "created container");

        let fields_artifact = if aggregated.fields.is_empty() {
            ArtifactOutcome::Skipped
        } else {
            let artifact = NewArtifact {
                name: &doc.name,
                label: FIELDS_ARTIFACT_LABEL,
                cef: &aggregated.fields,
            };
            match self.api.add_artifact(container_id, artifact).await {
                Ok(artifact_id) => {
                    info!(container_id, artifact_id, fields = aggregated.fields.len(), "added form artifact");
                    ArtifactOutcome::Created { artifact_id }
                }
                Err(e) => {
                    warn!(container_id, error = %e, "form artifact failed");
                    ArtifactOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            }
        };

        let mut files = Vec::with_capacity(aggregated.files.len());
        for (key, file) in aggregated.files {
            let status = self.submit_file(container_id, file).await;
            files.push(FileOutcome {
                key: key.to_string(),
                file_name: file.file_name.clone(),
                status,
            });
        }

        let report = SubmissionReport {
            container_id,
            fields_artifact,
            files,
        };
        info!(
            container_id,
            success = report.is_success(),
            failed_files = report.failed_files().count(),
            "submission finished"
        );
        Ok(report)
    }

    async fn submit_file(&self, container_id: u64, file: &FileUpload) -> FileStatus {
        let receipt = match self.api.upload_file(container_id, file).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(container_id, file = %file.file_name, error = %e, "file upload failed");
                return FileStatus::UploadFailed {
                    error: e.to_string(),
                };
            }
        };

        let cef = file_metadata(file, &receipt.hash);
        let artifact = NewArtifact {
            name: &file.file_name,
            label: FILE_ARTIFACT_LABEL,
            cef: &cef,
        };
        match self.api.add_artifact(container_id, artifact).await {
            Ok(artifact_id) => FileStatus::Uploaded {
                hash: receipt.hash,
                artifact_id,
            },
            Err(e) => {
                warn!(container_id, file = %file.file_name, error = %e, "file artifact failed");
                FileStatus::ArtifactFailed {
                    hash: receipt.hash,
                    error: e.to_string(),
                }
            }
        }
    }
}

fn file_metadata(file: &FileUpload, hash: &str) -> Map<String, Value> {
    let mut cef = Map::new();
    cef.insert("hash".into(), Value::String(hash.to_string()));
    cef.insert("filename".into(), Value::String(file.file_name.clone()));
    cef.insert("filetype".into(), Value::String(file.content_type.clone()));
    cef.insert("filesize".into(), Value::String(human_file_size(file.size)));
    cef
}
