//! Case-management API
//!
//! `CaseApi` is the seam the submission engine talks through. `CaseApiClient`
//! is the HTTP implementation against the `/rest` endpoints.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::config::{CaseApiAuth, CaseApiConfig};
use crate::error::{FormError, Result};
use crate::submit::values::FileUpload;

const TOKEN_HEADER: &str = "ph-auth-token";
const CONTAINER_DESCRIPTION: &str = "Created from form submission";
const ARTIFACT_DESCRIPTION: &str = "Form submission";

/// One artifact to attach to a container.
#[derive(Debug, Clone, Copy)]
pub struct NewArtifact<'a> {
    pub name: &'a str,
    pub label: &'a str,
    pub cef: &'a Map<String, Value>,
}

/// Result of a vault upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VaultReceipt {
    pub hash: String,
    #[serde(default)]
    pub vault_id: Option<String>,
}

#[async_trait]
pub trait CaseApi: Send + Sync {
    /// Create a container and return its id.
    async fn create_container(&self, name: &str, label: &str) -> Result<u64>;

    /// Attach an artifact to a container and return its id.
    async fn add_artifact(&self, container_id: u64, artifact: NewArtifact<'_>) -> Result<u64>;

    /// Store a file in the vault, attached to a container.
    async fn upload_file(&self, container_id: u64, file: &FileUpload) -> Result<VaultReceipt>;
}

/// HTTP client for the case-management REST API.
#[derive(Clone)]
pub struct CaseApiClient {
    config: CaseApiConfig,
    client: reqwest::Client,
}

impl CaseApiClient {
    pub fn new(config: CaseApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| FormError::InvalidConfig(format!("http client: {}", e)))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &CaseApiConfig {
        &self.config
    }

    /// Connection test. Returns the version string the server reports.
    pub async fn version(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct VersionResponse {
            version: String,
        }

        let url = self.config.endpoint("rest/version")?;
        let response = self.authorize(self.client.get(url)).send().await?;
        let body: VersionResponse = read_json("version", response).await?;
        info!(version = %body.version, "case API reachable");
        Ok(body.version)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.auth {
            CaseApiAuth::Token(token) => request.header(TOKEN_HEADER, token),
            CaseApiAuth::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
        }
    }

    async fn post(&self, operation: &'static str, path: &str, body: Value) -> Result<Response> {
        let url = self.config.endpoint(path)?;
        debug!(operation, %url, "case API request");
        let response = self
            .authorize(self.client.post(url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                FormError::external(operation, e.status().map(|s| s.as_u16()), e.to_string())
            })?;
        Ok(response)
    }
}

#[derive(Deserialize)]
struct CreatedResponse {
    id: u64,
}

/// Decode a success body, or turn a non-2xx status into `ExternalApi`.
async fn read_json<T: serde::de::DeserializeOwned>(
    operation: &'static str,
    response: Response,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FormError::external(
            operation,
            Some(status.as_u16()),
            error_message(&body),
        ));
    }
    response.json::<T>().await.map_err(|e| {
        FormError::external(operation, Some(status.as_u16()), format!("invalid response: {}", e))
    })
}

/// Prefer the API's `message` field over the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl CaseApi for CaseApiClient {
    async fn create_container(&self, name: &str, label: &str) -> Result<u64> {
        let body = json!({
            "name": name,
            "label": label,
            "description": CONTAINER_DESCRIPTION,
        });
        let response = self.post("create container", "rest/container", body).await?;
        let created: CreatedResponse = read_json("create container", response).await?;
        Ok(created.id)
    }

    async fn add_artifact(&self, container_id: u64, artifact: NewArtifact<'_>) -> Result<u64> {
        let body = json!({
            "container_id": container_id,
            "cef": artifact.cef,
            "name": artifact.name,
            "label": artifact.label,
            "description": ARTIFACT_DESCRIPTION,
        });
        let response = self.post("add artifact", "rest/artifact", body).await?;
        let created: CreatedResponse = read_json("add artifact", response).await?;
        Ok(created.id)
    }

    async fn upload_file(&self, container_id: u64, file: &FileUpload) -> Result<VaultReceipt> {
        let body = json!({
            "container_id": container_id,
            "file_content": file.base64_content(),
            "file_name": file.file_name,
        });
        let response = self
            .post("upload file", "rest/container_attachment", body)
            .await?;
        read_json("upload file", response).await
    }
}
