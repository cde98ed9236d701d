//! Case API configuration
//!
//! Read once per session, then moved into `CaseApiClient`. Nothing mutates it
//! afterwards.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::error::{FormError, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, PartialEq, Eq)]
pub enum CaseApiAuth {
    /// Sent as the `ph-auth-token` header.
    Token(String),
    Basic { username: String, password: String },
}

impl fmt::Debug for CaseApiAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseApiAuth::Token(_) => f.debug_tuple("Token").field(&"***").finish(),
            CaseApiAuth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaseApiConfig {
    pub base_url: Url,
    pub auth: CaseApiAuth,
    pub verify_tls: bool,
    pub timeout: Duration,
}

impl CaseApiConfig {
    pub fn new(base_url: Url, auth: CaseApiAuth) -> Self {
        Self {
            base_url,
            auth,
            verify_tls: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load from `CASE_API_*` environment variables.
    ///
    /// `CASE_API_TOKEN` wins over `CASE_API_USERNAME`/`CASE_API_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = lookup("CASE_API_URL")
            .ok_or_else(|| FormError::InvalidConfig("CASE_API_URL is not set".to_string()))?;
        let base_url = parse_base_url(&url)?;

        let auth = match lookup("CASE_API_TOKEN").filter(|t| !t.is_empty()) {
            Some(token) => CaseApiAuth::Token(token),
            None => {
                let username = lookup("CASE_API_USERNAME").ok_or_else(|| {
                    FormError::InvalidConfig(
                        "set CASE_API_TOKEN or CASE_API_USERNAME/CASE_API_PASSWORD".to_string(),
                    )
                })?;
                CaseApiAuth::Basic {
                    username,
                    password: lookup("CASE_API_PASSWORD").unwrap_or_default(),
                }
            }
        };

        let verify_tls = match lookup("CASE_API_VERIFY_TLS") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                FormError::InvalidConfig(format!("CASE_API_VERIFY_TLS: '{}' is not a boolean", raw))
            })?,
            None => true,
        };

        let timeout = match lookup("CASE_API_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                FormError::InvalidConfig(format!("CASE_API_TIMEOUT_SECS: '{}' is not a number", raw))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url,
            auth,
            verify_tls,
            timeout: Duration::from_secs(timeout),
        })
    }

    /// Load from the JSON blob the hosting app hands to forms:
    /// `{"url", "username", "password", "sslVerification"}`, optionally
    /// with `"token"`.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawAuthInfo = serde_json::from_str(json)
            .map_err(|e| FormError::InvalidConfig(format!("auth info: {}", e)))?;

        let auth = match raw.token.filter(|t| !t.is_empty()) {
            Some(token) => CaseApiAuth::Token(token),
            None => CaseApiAuth::Basic {
                username: raw.username.unwrap_or_default(),
                password: raw.password.unwrap_or_default(),
            },
        };

        let verify_tls = match raw.ssl_verification {
            serde_json::Value::Null => true,
            serde_json::Value::Bool(b) => b,
            serde_json::Value::String(s) => parse_flag(&s).unwrap_or(true),
            other => {
                return Err(FormError::InvalidConfig(format!(
                    "sslVerification: unexpected value {}",
                    other
                )))
            }
        };

        Ok(Self {
            base_url: parse_base_url(&raw.url)?,
            auth,
            verify_tls,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// `base_url` joined with a REST path such as `rest/container`.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| FormError::InvalidConfig(format!("endpoint '{}': {}", path, e)))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAuthInfo {
    url: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    ssl_verification: serde_json::Value,
}

/// Parse and normalize to a trailing slash so `join` appends.
fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    Url::parse(&with_slash)
        .map_err(|e| FormError::InvalidConfig(format!("case API url '{}': {}", trimmed, e)))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
