use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};

use crate::error::{FormError, Result};

/// A file picked in a file element, already read into memory.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub content: Vec<u8>,
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .field("last_modified", &self.last_modified)
            .finish_non_exhaustive()
    }
}

impl FileUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            size: content.len() as u64,
            last_modified: None,
            content,
        }
    }

    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = Some(at);
        self
    }

    /// Build from a browser `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(file_name: impl Into<String>, data_url: &str) -> Result<Self> {
        let file_name = file_name.into();
        let rest = data_url.strip_prefix("data:").ok_or_else(|| {
            FormError::InvalidUpload(format!("'{}' is not a data URL", file_name))
        })?;
        let (meta, payload) = rest.split_once(',').ok_or_else(|| {
            FormError::InvalidUpload(format!("data URL for '{}' has no payload", file_name))
        })?;
        let content_type = meta.strip_suffix(";base64").ok_or_else(|| {
            FormError::InvalidUpload(format!("data URL for '{}' is not base64", file_name))
        })?;
        let content = STANDARD.decode(payload.trim()).map_err(|e| {
            FormError::InvalidUpload(format!("data URL for '{}': {}", file_name, e))
        })?;
        let content_type = if content_type.is_empty() {
            "application/octet-stream"
        } else {
            content_type
        };
        Ok(Self::new(file_name, content_type, content))
    }

    /// File bytes as plain base64, without any data-URL prefix.
    pub fn base64_content(&self) -> String {
        STANDARD.encode(&self.content)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionValue {
    Scalar(String),
    File(FileUpload),
}

/// Values collected from a form, keyed by element key in the order they
/// were first entered. Setting an existing key replaces it in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionValues {
    entries: Vec<(String, SubmissionValue)>,
}

impl SubmissionValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: SubmissionValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn insert_scalar(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.insert(key, SubmissionValue::Scalar(value.into()));
    }

    pub fn insert_file(&mut self, key: impl Into<String>, file: FileUpload) {
        self.insert(key, SubmissionValue::File(file));
    }

    pub fn remove(&mut self, key: &str) -> Option<SubmissionValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, key: &str) -> Option<&SubmissionValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn scalar(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            SubmissionValue::Scalar(s) => Some(s),
            SubmissionValue::File(_) => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SubmissionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, SubmissionValue)> for SubmissionValues {
    fn from_iter<I: IntoIterator<Item = (K, SubmissionValue)>>(iter: I) -> Self {
        let mut values = SubmissionValues::new();
        for (k, v) in iter {
            values.insert(k, v);
        }
        values
    }
}
