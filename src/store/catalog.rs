use tracing::{info, warn};

use super::{FormId, FormRef, FormStore, FormSummary, NewForm, StoredForm};
use crate::error::{FormError, Result};
use crate::forms::document::FormDocument;
use crate::forms::xml;

/// A stored form decoded back into a document.
#[derive(Debug, Clone)]
pub struct LoadedForm {
    pub id: FormId,
    pub document: FormDocument,
}

/// Encodes on save and decodes on load over any `FormStore`.
///
/// Missing and undecodable forms both surface as `FormUnavailable`.
pub struct FormCatalog<S: FormStore> {
    store: S,
}

impl<S: FormStore> FormCatalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn save(&self, doc: &FormDocument, overwrite: bool) -> Result<StoredForm> {
        if doc.name.trim().is_empty() {
            return Err(FormError::MissingFormName);
        }
        let form = NewForm {
            name: doc.name.clone(),
            label: doc.label.clone(),
            tags: doc.tags.clone(),
            xml_data: xml::encode(doc),
        };
        self.store.save(&form, overwrite).await
    }

    pub async fn list(&self) -> Result<Vec<FormSummary>> {
        self.store.list().await
    }

    pub async fn load(&self, reference: &FormRef) -> Result<LoadedForm> {
        let unavailable = || FormError::FormUnavailable {
            reference: reference.to_string(),
        };

        let stored = match self.store.get(reference).await {
            Ok(stored) => stored,
            Err(FormError::NotFound { .. }) => return Err(unavailable()),
            Err(e) => return Err(e),
        };

        match xml::decode(&stored.xml_data) {
            Ok(document) => {
                info!(id = stored.id, name = %stored.name, elements = document.len(), "loaded form");
                Ok(LoadedForm {
                    id: stored.id,
                    document,
                })
            }
            Err(e) => {
                warn!(id = stored.id, name = %stored.name, error = %e, "stored form is not decodable");
                Err(unavailable())
            }
        }
    }

    pub async fn delete(&self, id: FormId) -> Result<StoredForm> {
        self.store.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::builder::FormBuilder;
    use crate::forms::settings::ElementType;
    use crate::store::memory::MemoryFormStore;

    #[tokio::test]
    async fn save_and_load_by_name_or_id() {
        let catalog = FormCatalog::new(MemoryFormStore::new());
        let mut b = FormBuilder::new();
        b.set_name("phishing");
        b.set_label("Phishing report");
        b.add_element(ElementType::Email);

        let stored = catalog.save(b.document(), false).await.unwrap();
        assert_eq!(stored.tags, Vec::<String>::new());
        assert!(stored.xml_data.contains("<name>phishing</name>"));

        let by_name = catalog.load(&"phishing".parse().unwrap()).await.unwrap();
        assert!(by_name.document.same_content(b.document()));
        let by_id = catalog.load(&FormRef::Id(stored.id)).await.unwrap();
        assert_eq!(by_id.id, stored.id);
    }

    #[tokio::test]
    async fn unnamed_form_is_rejected() {
        let catalog = FormCatalog::new(MemoryFormStore::new());
        assert!(matches!(
            catalog.save(&FormDocument::default(), false).await,
            Err(FormError::MissingFormName)
        ));
    }

    #[tokio::test]
    async fn missing_or_broken_forms_are_unavailable() {
        let catalog = FormCatalog::new(MemoryFormStore::new());
        assert!(matches!(
            catalog.load(&FormRef::Name("nope".into())).await,
            Err(FormError::FormUnavailable { .. })
        ));

        let broken = NewForm {
            name: "broken".into(),
            label: String::new(),
            tags: Vec::new(),
            xml_data: "<form><label>no name</label></form>".into(),
        };
        catalog.store().save(&broken, false).await.unwrap();
        assert!(matches!(
            catalog.load(&FormRef::Name("broken".into())).await,
            Err(FormError::FormUnavailable { .. })
        ));
    }
}
