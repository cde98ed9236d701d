//! Live values for one rendering of a form.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{FormError, Result};
use crate::forms::document::{FormDocument, FormElement};
use crate::forms::settings::{ElementSettings, ElementType};
use crate::render::validation::{is_valid_email, is_valid_number, meets_password_policy};
use crate::submit::values::{FileUpload, SubmissionValue, SubmissionValues};

/// Values entered into a rendered form, keyed by element key.
///
/// Seeded with what the controls show before the user touches them: number
/// defaults, boolean defaults and the current date.
pub struct FormSession<'a> {
    document: &'a FormDocument,
    values: SubmissionValues,
    invalid: BTreeSet<String>,
}

impl<'a> FormSession<'a> {
    pub fn new(document: &'a FormDocument, today: NaiveDate) -> Self {
        let mut values = SubmissionValues::new();
        for element in document.elements() {
            let seed = match &element.settings {
                ElementSettings::Number(n) => n.default_value.map(|v| v.to_string()),
                ElementSettings::Boolean { default_value } => Some(default_value.to_string()),
                ElementSettings::DateTime {
                    use_current_date: true,
                } => Some(today.format("%Y-%m-%d").to_string()),
                _ => None,
            };
            if let Some(seed) = seed {
                values.insert_scalar(element.key.clone(), seed);
            }
        }
        Self {
            document,
            values,
            invalid: BTreeSet::new(),
        }
    }

    pub fn document(&self) -> &'a FormDocument {
        self.document
    }

    /// Set a scalar field. An empty value clears it.
    pub fn set_value(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let element = self.input(key)?;
        if element.element_type() == ElementType::File {
            return Err(FormError::UnknownField {
                key: key.to_string(),
            });
        }
        let value = value.into();
        if value.is_empty() {
            self.values.remove(key);
        } else {
            self.values.insert_scalar(key, value);
        }
        Ok(())
    }

    pub fn attach_file(&mut self, key: &str, file: FileUpload) -> Result<()> {
        let element = self.input(key)?;
        if element.element_type() != ElementType::File {
            return Err(FormError::UnknownField {
                key: key.to_string(),
            });
        }
        debug!(key, file = %file.file_name, size = file.size, "file attached");
        self.values.insert_file(key, file);
        Ok(())
    }

    /// Run the field's blur check and update its invalid flag. Returns
    /// whether the field is valid. Email, number, dropdown and boolean
    /// fields are only checked once something was entered; password policy
    /// is checked whatever the value.
    pub fn blur(&mut self, key: &str) -> Result<bool> {
        let element = self.input(key)?;
        let value = self.values.scalar(key).unwrap_or_default();
        let blank = value.trim().is_empty();
        let valid = match &element.settings {
            ElementSettings::Password(policy) => meets_password_policy(value, policy),
            _ if blank => true,
            ElementSettings::Email { .. } => is_valid_email(value),
            ElementSettings::Number(settings) => is_valid_number(value, settings),
            ElementSettings::Dropdown { options } => options.iter().any(|o| o == value),
            ElementSettings::Boolean { .. } => matches!(value, "true" | "false"),
            _ => true,
        };
        if valid {
            self.invalid.remove(key);
        } else {
            self.invalid.insert(key.to_string());
        }
        Ok(valid)
    }

    pub fn is_invalid(&self, key: &str) -> bool {
        self.invalid.contains(key)
    }

    /// Keys of required inputs with no value.
    pub fn missing_required(&self) -> Vec<&'a str> {
        self.document
            .elements()
            .iter()
            .filter(|el| el.required && el.element_type().is_input())
            .filter(|el| match self.values.get(&el.key) {
                Some(SubmissionValue::Scalar(s)) => s.trim().is_empty(),
                Some(SubmissionValue::File(_)) => false,
                None => true,
            })
            .map(|el| el.key.as_str())
            .collect()
    }

    pub fn values(&self) -> &SubmissionValues {
        &self.values
    }

    pub fn into_values(self) -> SubmissionValues {
        self.values
    }

    fn input(&self, key: &str) -> Result<&'a FormElement> {
        self.document
            .element_by_key(key)
            .filter(|el| el.element_type().is_input())
            .ok_or_else(|| FormError::UnknownField {
                key: key.to_string(),
            })
    }
}
