//! Form persistence
//!
//! `FormStore` is the storage seam: stored forms are XML plus the metadata
//! needed to list them. `FormCatalog` sits on top and speaks `FormDocument`.

pub mod catalog;
pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

pub use catalog::{FormCatalog, LoadedForm};
pub use memory::MemoryFormStore;
#[cfg(feature = "database")]
pub use postgres::{DatabaseConfig, PgFormStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::error::Result;

pub type FormId = i64;

/// A form ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewForm {
    pub name: String,
    pub label: String,
    pub tags: Vec<String>,
    pub xml_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredForm {
    pub id: FormId,
    pub name: String,
    pub label: String,
    pub tags: Vec<String>,
    pub xml_data: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSummary {
    pub id: FormId,
    pub name: String,
    pub label: String,
}

impl From<&StoredForm> for FormSummary {
    fn from(form: &StoredForm) -> Self {
        Self {
            id: form.id,
            name: form.name.clone(),
            label: form.label.clone(),
        }
    }
}

/// Lookup by id or by unique name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormRef {
    Id(FormId),
    Name(String),
}

impl FormRef {
    pub fn matches(&self, form: &StoredForm) -> bool {
        match self {
            FormRef::Id(id) => form.id == *id,
            FormRef::Name(name) => form.name == *name,
        }
    }
}

impl fmt::Display for FormRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormRef::Id(id) => write!(f, "#{}", id),
            FormRef::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// All-digit strings are ids; anything else is a name.
impl FromStr for FormRef {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.parse::<FormId>() {
            Ok(id) if s.chars().all(|c| c.is_ascii_digit()) => FormRef::Id(id),
            _ => FormRef::Name(s.to_string()),
        })
    }
}

#[async_trait]
pub trait FormStore: Send + Sync {
    /// Insert a form. If the name is taken, fails with `Conflict` unless
    /// `overwrite` is set, in which case the stored row is replaced in one
    /// step and keeps its id.
    async fn save(&self, form: &NewForm, overwrite: bool) -> Result<StoredForm>;

    async fn list(&self) -> Result<Vec<FormSummary>>;

    /// Fails with `NotFound`.
    async fn get(&self, reference: &FormRef) -> Result<StoredForm>;

    /// Remove and return the form. Fails with `NotFound`.
    async fn delete(&self, id: FormId) -> Result<StoredForm>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_ref_parsing() {
        assert_eq!("42".parse::<FormRef>().unwrap(), FormRef::Id(42));
        assert_eq!(
            "-1".parse::<FormRef>().unwrap(),
            FormRef::Name("-1".to_string())
        );
        assert_eq!(
            "phishing".parse::<FormRef>().unwrap(),
            FormRef::Name("phishing".to_string())
        );
        assert_eq!(FormRef::Id(3).to_string(), "#3");
    }
}
