//! Form Document Model
//!
//! A `FormDocument` owns an ordered list of `FormElement`s plus the metadata
//! used to store and submit it. The submit control lives outside the element
//! list and is always rendered last.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::FormError;
use crate::forms::settings::{Alignment, ElementSettings, ElementType};

/// Wire id of the submit control in stored documents.
pub const SUBMIT_ELEMENT_ID: &str = "submit-button";
pub const SUBMIT_KEY: &str = "Submit";

/// Opaque element identifier, unique for the lifetime of a builder session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Reserved id of the submit control.
    pub const SUBMIT: ElementId = ElementId(Uuid::nil());

    pub fn new() -> Self {
        ElementId(Uuid::new_v4())
    }

    pub fn is_submit(&self) -> bool {
        *self == Self::SUBMIT
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_submit() {
            f.write_str(SUBMIT_ELEMENT_ID)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormElement {
    pub id: ElementId,
    /// Field name used in the submission payload.
    pub key: String,
    pub label: String,
    pub alignment: Alignment,
    pub required: bool,
    pub settings: ElementSettings,
}

impl FormElement {
    pub fn element_type(&self) -> ElementType {
        self.settings.element_type()
    }

    /// Label shown to the user; falls back to the key when blank.
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.key
        } else {
            &self.label
        }
    }

    /// Compare everything except the session-local id.
    pub fn same_content(&self, other: &FormElement) -> bool {
        self.key == other.key
            && self.label == other.label
            && self.alignment == other.alignment
            && self.required == other.required
            && self.settings == other.settings
    }
}

/// Trailing control that triggers submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitControl {
    pub label: String,
    pub alignment: Alignment,
}

impl Default for SubmitControl {
    fn default() -> Self {
        Self {
            label: SUBMIT_KEY.to_string(),
            alignment: Alignment::Center,
        }
    }
}

/// Deserializing checks the same invariants the builder keeps: unique keys
/// and no element carrying the submit control's id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "UncheckedDocument")]
pub struct FormDocument {
    pub name: String,
    pub label: String,
    pub tags: Vec<String>,
    pub(crate) elements: Vec<FormElement>,
    pub(crate) submit: SubmitControl,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UncheckedDocument {
    name: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    tags: Vec<String>,
    elements: Vec<FormElement>,
    #[serde(default)]
    submit: SubmitControl,
}

impl TryFrom<UncheckedDocument> for FormDocument {
    type Error = FormError;

    fn try_from(raw: UncheckedDocument) -> Result<Self, Self::Error> {
        let doc = FormDocument {
            name: raw.name,
            label: raw.label,
            tags: raw.tags,
            elements: raw.elements,
            submit: raw.submit,
        };
        if doc.elements.iter().any(|el| el.id.is_submit()) {
            return Err(FormError::ProtectedElement);
        }
        if let Some(key) = doc.duplicate_keys().first() {
            return Err(FormError::DuplicateKey {
                key: key.to_string(),
            });
        }
        Ok(doc)
    }
}

impl FormDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn elements(&self) -> &[FormElement] {
        &self.elements
    }

    pub fn submit_control(&self) -> &SubmitControl {
        &self.submit
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, id: ElementId) -> Option<&FormElement> {
        self.elements.iter().find(|el| el.id == id)
    }

    pub(crate) fn element_mut(&mut self, id: ElementId) -> Option<&mut FormElement> {
        self.elements.iter_mut().find(|el| el.id == id)
    }

    pub fn position(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|el| el.id == id)
    }

    pub fn element_by_key(&self, key: &str) -> Option<&FormElement> {
        self.elements.iter().find(|el| el.key == key)
    }

    /// True when no element other than `except` uses `key`.
    pub fn is_key_unique(&self, key: &str, except: Option<ElementId>) -> bool {
        !self
            .elements
            .iter()
            .any(|el| el.key == key && Some(el.id) != except)
    }

    pub fn count_of_type(&self, ty: ElementType) -> usize {
        self.elements
            .iter()
            .filter(|el| el.element_type() == ty)
            .count()
    }

    /// Keys that appear on more than one element.
    pub fn duplicate_keys(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        let mut dups = Vec::new();
        for el in &self.elements {
            if !seen.insert(el.key.as_str()) && !dups.contains(&el.key.as_str()) {
                dups.push(el.key.as_str());
            }
        }
        dups
    }

    /// Compare name, label, tags, submit control and element content, ignoring ids.
    pub fn same_content(&self, other: &FormDocument) -> bool {
        self.name == other.name
            && self.label == other.label
            && self.tags == other.tags
            && self.submit == other.submit
            && self.elements.len() == other.elements.len()
            && self
                .elements
                .iter()
                .zip(&other.elements)
                .all(|(a, b)| a.same_content(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(key: &str, settings: ElementSettings) -> FormElement {
        FormElement {
            id: ElementId::new(),
            key: key.to_string(),
            label: String::new(),
            alignment: Alignment::Center,
            required: false,
            settings,
        }
    }

    #[test]
    fn key_uniqueness_ignores_the_edited_element() {
        let mut doc = FormDocument::new("contact");
        let a = element("email1", ElementSettings::Email { placeholder: String::new() });
        let a_id = a.id;
        doc.elements.push(a);
        doc.elements.push(element("text1", ElementSettings::Text));

        assert!(doc.is_key_unique("email1", Some(a_id)));
        assert!(!doc.is_key_unique("email1", None));
        assert!(!doc.is_key_unique("text1", Some(a_id)));
        assert!(doc.is_key_unique("other", None));
    }

    #[test]
    fn display_label_falls_back_to_key() {
        let el = element("inputText1", ElementSettings::Text);
        assert_eq!(el.display_label(), "inputText1");
    }

    #[test]
    fn duplicate_keys_are_listed_once() {
        let mut doc = FormDocument::new("dups");
        for _ in 0..3 {
            doc.elements.push(element("same", ElementSettings::Divider));
        }
        doc.elements.push(element("other", ElementSettings::Divider));
        assert_eq!(doc.duplicate_keys(), vec!["same"]);
    }

    #[test]
    fn deserializing_checks_keys() {
        let mut doc = FormDocument::new("serde");
        doc.elements.push(element("a", ElementSettings::Text));
        doc.elements.push(element("b", ElementSettings::Divider));
        let json = serde_json::to_value(&doc).unwrap();
        let back: FormDocument = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, doc);

        let mut dup = json.clone();
        dup["elements"][1]["key"] = "a".into();
        let err = serde_json::from_value::<FormDocument>(dup).unwrap_err();
        assert!(err.to_string().contains("Key 'a' is already used"));

        let mut submit = json;
        submit["elements"][0]["id"] = serde_json::to_value(ElementId::SUBMIT).unwrap();
        assert!(serde_json::from_value::<FormDocument>(submit).is_err());
    }

    #[test]
    fn submit_id_displays_reserved_name() {
        assert_eq!(ElementId::SUBMIT.to_string(), SUBMIT_ELEMENT_ID);
        assert!(!ElementId::new().is_submit());
    }
}
