//! Builder Engine
//!
//! Mutations over a `FormDocument`. Element edits go through a single open
//! draft: `begin_edit` snapshots the element, the caller changes the draft,
//! and `commit_edit` validates and applies it in one step. A failed commit
//! leaves both the document and the open draft untouched.

use tracing::debug;

use crate::error::{FormError, Result};
use crate::forms::csv_table::{ensure_csv_file_name, parse_csv};
use crate::forms::document::{ElementId, FormDocument, FormElement};
use crate::forms::registry::ElementRegistry;
use crate::forms::settings::{Alignment, ElementSettings, ElementType};

/// Uncommitted copy of one element's editable fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDraft {
    element_id: ElementId,
    pub key: String,
    pub label: String,
    pub alignment: Alignment,
    pub required: bool,
    pub settings: ElementSettings,
}

impl ElementDraft {
    pub fn element_id(&self) -> ElementId {
        self.element_id
    }
}

pub struct FormBuilder {
    document: FormDocument,
    editing: Option<ElementId>,
    registry: &'static ElementRegistry,
}

impl Default for FormBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FormBuilder {
    pub fn new() -> Self {
        Self::from_document(FormDocument::default())
    }

    /// Continue editing a loaded document.
    pub fn from_document(document: FormDocument) -> Self {
        Self {
            document,
            editing: None,
            registry: ElementRegistry::builtin(),
        }
    }

    pub fn document(&self) -> &FormDocument {
        &self.document
    }

    pub fn into_document(self) -> FormDocument {
        self.document
    }

    /// Id of the element with an open draft, if any.
    pub fn active_edit(&self) -> Option<ElementId> {
        self.editing
    }

    // ── Metadata ──

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.document.name = name.into();
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.document.label = label.into();
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.document.tags = tags;
    }

    /// Comma-separated tag input; entries are trimmed and blanks dropped.
    pub fn set_tags_from_str(&mut self, tags: &str) {
        self.document.tags = tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
    }

    pub fn set_submit_label(&mut self, label: impl Into<String>) {
        self.document.submit.label = label.into();
    }

    // ── Elements ──

    /// Append a new element of `ty` with registry defaults, ahead of the
    /// submit control. Returns the minted id.
    pub fn add_element(&mut self, ty: ElementType) -> ElementId {
        let descriptor = self.registry.descriptor(ty);
        let element = FormElement {
            id: ElementId::new(),
            key: self.generate_key(ty),
            label: descriptor.default_label.to_string(),
            alignment: Alignment::Center,
            required: false,
            settings: descriptor.default_settings.clone(),
        };
        let id = element.id;
        debug!(%id, key = %element.key, "added element");
        self.document.elements.push(element);
        id
    }

    /// `add_element` for a palette id coming from the UI.
    pub fn add_element_by_id(&mut self, type_id: &str) -> Result<ElementId> {
        let ty = self.registry.get(type_id)?.type_id;
        Ok(self.add_element(ty))
    }

    /// `{type}{n}` where `n` starts at the live count of that type plus one and
    /// advances past keys already in use.
    fn generate_key(&self, ty: ElementType) -> String {
        let mut n = self.document.count_of_type(ty) + 1;
        loop {
            let key = format!("{}{}", ty.as_str(), n);
            if self.document.is_key_unique(&key, None) {
                return key;
            }
            n += 1;
        }
    }

    pub fn remove_element(&mut self, id: ElementId) -> Result<FormElement> {
        if id.is_submit() {
            return Err(FormError::ProtectedElement);
        }
        let index = self
            .document
            .position(id)
            .ok_or(FormError::ElementNotFound(id))?;
        if self.editing == Some(id) {
            self.editing = None;
        }
        let removed = self.document.elements.remove(index);
        debug!(%id, key = %removed.key, "removed element");
        Ok(removed)
    }

    /// Move the element at `from` to `to`, keeping the others in order.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.document.elements.len();
        for index in [from, to] {
            if index == len {
                return Err(FormError::ProtectedElement);
            }
            if index > len {
                return Err(FormError::IndexOutOfRange { index, len });
            }
        }
        if from != to {
            let element = self.document.elements.remove(from);
            self.document.elements.insert(to, element);
        }
        Ok(())
    }

    /// Drag-and-drop: move `active` to the slot currently held by `over`.
    pub fn move_element(&mut self, active: ElementId, over: ElementId) -> Result<()> {
        if active.is_submit() || over.is_submit() {
            return Err(FormError::ProtectedElement);
        }
        let from = self
            .document
            .position(active)
            .ok_or(FormError::ElementNotFound(active))?;
        let to = self
            .document
            .position(over)
            .ok_or(FormError::ElementNotFound(over))?;
        self.reorder(from, to)
    }

    // ── Draft protocol ──

    /// Open a draft for `id`, replacing any draft already open.
    pub fn begin_edit(&mut self, id: ElementId) -> Result<ElementDraft> {
        if id.is_submit() {
            return Err(FormError::ProtectedElement);
        }
        let element = self
            .document
            .element(id)
            .ok_or(FormError::ElementNotFound(id))?;
        let draft = ElementDraft {
            element_id: id,
            key: element.key.clone(),
            label: element.label.clone(),
            alignment: element.alignment,
            required: element.required,
            settings: element.settings.clone(),
        };
        self.editing = Some(id);
        Ok(draft)
    }

    pub fn commit_edit(&mut self, draft: ElementDraft) -> Result<()> {
        let id = draft.element_id;
        if self.editing != Some(id) {
            return Err(FormError::NoActiveEdit);
        }

        let element = self
            .document
            .element(id)
            .ok_or(FormError::ElementNotFound(id))?;

        let found = draft.settings.element_type();
        if found != element.element_type() {
            return Err(FormError::SettingsMismatch {
                expected: element.element_type().as_str(),
                found: found.as_str(),
            });
        }
        if draft.required && draft.label.trim().is_empty() {
            return Err(FormError::MissingLabel { key: draft.key });
        }
        if !self.document.is_key_unique(&draft.key, Some(id)) {
            return Err(FormError::DuplicateKey { key: draft.key });
        }

        if let Some(element) = self.document.element_mut(id) {
            element.key = draft.key;
            element.label = draft.label;
            element.alignment = draft.alignment;
            element.required = draft.required;
            element.settings = draft.settings;
            debug!(%id, key = %element.key, "committed element edit");
        }
        self.editing = None;
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    // ── Uploads ──

    /// Load a CSV upload into a table or file element. Applied immediately,
    /// outside the draft protocol. Returns the number of rows read.
    pub fn attach_csv(&mut self, id: ElementId, file_name: &str, bytes: &[u8]) -> Result<usize> {
        ensure_csv_file_name(file_name)?;
        let grid = parse_csv(bytes)?;
        let element = self
            .document
            .element_mut(id)
            .ok_or(FormError::ElementNotFound(id))?;
        let found = element.element_type();
        let slot = element
            .settings
            .csv_data_mut()
            .ok_or(FormError::SettingsMismatch {
                expected: ElementType::Table.as_str(),
                found: found.as_str(),
            })?;
        let rows = grid.len();
        *slot = grid;
        debug!(%id, file_name, rows, "attached csv data");
        Ok(rows)
    }

    /// Drop every element and all metadata.
    pub fn reset(&mut self) {
        self.document = FormDocument::default();
        self.editing = None;
    }
}
