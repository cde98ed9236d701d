use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::info;

use super::{FormId, FormRef, FormStore, FormSummary, NewForm, StoredForm};
use crate::error::{FormError, Result};

/// In-memory implementation for tests and the CLI.
pub struct MemoryFormStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    forms: BTreeMap<FormId, StoredForm>,
    next_id: FormId,
}

impl MemoryFormStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                forms: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for MemoryFormStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FormStore for MemoryFormStore {
    async fn save(&self, form: &NewForm, overwrite: bool) -> Result<StoredForm> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();

        let existing = inner
            .forms
            .values()
            .find(|f| f.name == form.name)
            .map(|f| (f.id, f.created_at));

        let stored = match existing {
            Some(_) if !overwrite => {
                return Err(FormError::Conflict {
                    name: form.name.clone(),
                })
            }
            Some((id, created_at)) => StoredForm {
                id,
                name: form.name.clone(),
                label: form.label.clone(),
                tags: form.tags.clone(),
                xml_data: form.xml_data.clone(),
                created_at,
                updated_at: now,
            },
            None => {
                let id = inner.next_id;
                inner.next_id += 1;
                StoredForm {
                    id,
                    name: form.name.clone(),
                    label: form.label.clone(),
                    tags: form.tags.clone(),
                    xml_data: form.xml_data.clone(),
                    created_at: now,
                    updated_at: now,
                }
            }
        };

        inner.forms.insert(stored.id, stored.clone());
        info!(id = stored.id, name = %stored.name, overwrite, "saved form");
        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<FormSummary>> {
        let inner = self.inner.read().await;
        Ok(inner.forms.values().map(FormSummary::from).collect())
    }

    async fn get(&self, reference: &FormRef) -> Result<StoredForm> {
        let inner = self.inner.read().await;
        inner
            .forms
            .values()
            .find(|f| reference.matches(f))
            .cloned()
            .ok_or_else(|| FormError::NotFound {
                reference: reference.to_string(),
            })
    }

    async fn delete(&self, id: FormId) -> Result<StoredForm> {
        let mut inner = self.inner.write().await;
        let removed = inner.forms.remove(&id).ok_or_else(|| FormError::NotFound {
            reference: FormRef::Id(id).to_string(),
        })?;
        info!(id, name = %removed.name, "deleted form");
        Ok(removed)
    }
}
