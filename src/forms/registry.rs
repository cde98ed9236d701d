//! Element Schema Registry
//!
//! Static catalog of the element types offered by the builder palette and the
//! settings every freshly created element of that type starts with.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::{FormError, Result};
use crate::forms::settings::{
    ElementSettings, ElementType, HeaderLevel, NumberSettings, PasswordSettings,
};

const TEXT_PLACEHOLDER: &str = "Enter text here...";
const EMAIL_PLACEHOLDER: &str = "Email Address";
const PASSWORD_PLACEHOLDER: &str = "Enter password";

/// Palette section an element type is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementCategory {
    Layout,
    Input,
}

#[derive(Debug, Clone)]
pub struct ElementTypeDescriptor {
    pub type_id: ElementType,
    pub display_name: &'static str,
    pub category: ElementCategory,
    pub default_label: &'static str,
    pub default_settings: ElementSettings,
}

pub struct ElementRegistry {
    descriptors: BTreeMap<&'static str, ElementTypeDescriptor>,
}

static BUILTIN: OnceLock<ElementRegistry> = OnceLock::new();

impl ElementRegistry {
    /// The process-wide registry of built-in element types.
    pub fn builtin() -> &'static ElementRegistry {
        BUILTIN.get_or_init(|| {
            let descriptors = ElementType::ALL
                .iter()
                .map(|ty| (ty.as_str(), describe(*ty)))
                .collect();
            ElementRegistry { descriptors }
        })
    }

    pub fn get(&self, type_id: &str) -> Result<&ElementTypeDescriptor> {
        self.descriptors
            .get(type_id)
            .ok_or_else(|| FormError::UnknownElementType {
                type_id: type_id.to_string(),
            })
    }

    pub fn descriptor(&self, ty: ElementType) -> &ElementTypeDescriptor {
        // Every ElementType is registered by `builtin()`.
        match self.descriptors.get(ty.as_str()) {
            Some(d) => d,
            None => unreachable!("element type {} missing from registry", ty),
        }
    }

    /// Default settings template for a registered type id.
    pub fn defaults_for(&self, type_id: &str) -> Result<ElementSettings> {
        self.get(type_id).map(|d| d.default_settings.clone())
    }

    /// Like `defaults_for`, but falls back to the generic text input for
    /// unregistered ids.
    pub fn defaults_or_text_input(&self, type_id: &str) -> (ElementType, ElementSettings) {
        match self.get(type_id) {
            Ok(d) => (d.type_id, d.default_settings.clone()),
            Err(_) => {
                tracing::warn!(type_id, "unknown element type, using text input defaults");
                let d = self.descriptor(ElementType::InputText);
                (d.type_id, d.default_settings.clone())
            }
        }
    }

    pub fn by_category(
        &self,
        category: ElementCategory,
    ) -> impl Iterator<Item = &ElementTypeDescriptor> + '_ {
        ElementType::ALL
            .iter()
            .map(move |ty| self.descriptor(*ty))
            .filter(move |d| d.category == category)
    }
}

fn describe(ty: ElementType) -> ElementTypeDescriptor {
    let (display_name, category, default_label) = match ty {
        ElementType::Heading => ("Heading", ElementCategory::Layout, "Heading"),
        ElementType::Text => ("Text", ElementCategory::Layout, "text"),
        ElementType::Divider => ("Divider", ElementCategory::Layout, "divider"),
        ElementType::Button => ("Button", ElementCategory::Layout, "button"),
        ElementType::Image => ("Image", ElementCategory::Layout, "image"),
        ElementType::Table => ("Table", ElementCategory::Layout, "table"),
        ElementType::InputText => ("Input Text", ElementCategory::Input, "inputText"),
        ElementType::Email => ("Email", ElementCategory::Input, "email"),
        ElementType::DateTime => ("Date or Time", ElementCategory::Input, "dateTime"),
        ElementType::Dropdown => ("Dropdown", ElementCategory::Input, "dropdown"),
        ElementType::Boolean => ("Boolean", ElementCategory::Input, "boolean"),
        ElementType::Number => ("Number", ElementCategory::Input, "number"),
        ElementType::File => ("File Upload", ElementCategory::Input, "file"),
        ElementType::Password => ("Password", ElementCategory::Input, "password"),
    };

    ElementTypeDescriptor {
        type_id: ty,
        display_name,
        category,
        default_label,
        default_settings: default_settings(ty),
    }
}

fn default_settings(ty: ElementType) -> ElementSettings {
    match ty {
        ElementType::Heading => ElementSettings::Heading {
            header_level: HeaderLevel::H1,
        },
        ElementType::Text => ElementSettings::Text,
        ElementType::Divider => ElementSettings::Divider,
        ElementType::Button => ElementSettings::Button,
        ElementType::Image => ElementSettings::Image { source: None },
        ElementType::Table => ElementSettings::Table {
            csv_data: Vec::new(),
        },
        ElementType::InputText => ElementSettings::InputText {
            placeholder: TEXT_PLACEHOLDER.to_string(),
        },
        ElementType::Email => ElementSettings::Email {
            placeholder: EMAIL_PLACEHOLDER.to_string(),
        },
        ElementType::DateTime => ElementSettings::DateTime {
            use_current_date: false,
        },
        ElementType::Dropdown => ElementSettings::Dropdown {
            options: Vec::new(),
        },
        ElementType::Boolean => ElementSettings::Boolean {
            default_value: true,
        },
        ElementType::Number => ElementSettings::Number(NumberSettings::default()),
        ElementType::File => ElementSettings::File {
            csv_data: Vec::new(),
        },
        ElementType::Password => ElementSettings::Password(PasswordSettings {
            placeholder: PASSWORD_PLACEHOLDER.to_string(),
            show_password_option: false,
            min_length: None,
            require_symbols: false,
            require_numbers: false,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_type_is_registered() {
        let registry = ElementRegistry::builtin();
        for ty in ElementType::ALL {
            let settings = registry.defaults_for(ty.as_str()).unwrap();
            assert_eq!(settings.element_type(), ty);
        }
    }

    #[test]
    fn unknown_type_is_reported() {
        let registry = ElementRegistry::builtin();
        let err = registry.defaults_for("slider").unwrap_err();
        assert!(matches!(err, FormError::UnknownElementType { ref type_id } if type_id == "slider"));
    }

    #[test]
    fn unknown_type_falls_back_to_text_input() {
        let registry = ElementRegistry::builtin();
        let (ty, settings) = registry.defaults_or_text_input("slider");
        assert_eq!(ty, ElementType::InputText);
        assert_eq!(settings.placeholder(), Some(TEXT_PLACEHOLDER));
    }

    #[test]
    fn placeholders_follow_type() {
        let registry = ElementRegistry::builtin();
        let email = registry.defaults_for("email").unwrap();
        assert_eq!(email.placeholder(), Some("Email Address"));
        let password = registry.defaults_for("password").unwrap();
        assert_eq!(password.placeholder(), Some("Enter password"));
    }

    #[test]
    fn palette_sections() {
        let registry = ElementRegistry::builtin();
        let layout: Vec<_> = registry
            .by_category(ElementCategory::Layout)
            .map(|d| d.type_id)
            .collect();
        assert_eq!(layout.len(), 6);
        assert!(layout.contains(&ElementType::Table));
        assert_eq!(registry.by_category(ElementCategory::Input).count(), 8);
    }
}
