use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FormError;

/// Two-dimensional grid loaded from a CSV upload. Row 0 is the header row.
pub type CsvGrid = Vec<Vec<String>>;

// ── Element type ids ──

/// Every element type the builder can place on a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementType {
    Heading,
    Text,
    Divider,
    Button,
    Image,
    Table,
    InputText,
    Email,
    DateTime,
    Dropdown,
    Boolean,
    Number,
    File,
    Password,
}

impl ElementType {
    pub const ALL: [ElementType; 14] = [
        ElementType::Heading,
        ElementType::Text,
        ElementType::Divider,
        ElementType::Button,
        ElementType::Image,
        ElementType::Table,
        ElementType::InputText,
        ElementType::Email,
        ElementType::DateTime,
        ElementType::Dropdown,
        ElementType::Boolean,
        ElementType::Number,
        ElementType::File,
        ElementType::Password,
    ];

    /// Wire id used in stored documents and generated keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Heading => "heading",
            ElementType::Text => "text",
            ElementType::Divider => "divider",
            ElementType::Button => "button",
            ElementType::Image => "image",
            ElementType::Table => "table",
            ElementType::InputText => "inputText",
            ElementType::Email => "email",
            ElementType::DateTime => "dateTime",
            ElementType::Dropdown => "dropdown",
            ElementType::Boolean => "boolean",
            ElementType::Number => "number",
            ElementType::File => "file",
            ElementType::Password => "password",
        }
    }

    /// Whether the element collects a value on submit.
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            ElementType::InputText
                | ElementType::Email
                | ElementType::DateTime
                | ElementType::Dropdown
                | ElementType::Boolean
                | ElementType::Number
                | ElementType::File
                | ElementType::Password
        )
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FormError::UnknownElementType {
                type_id: s.to_string(),
            })
    }
}

// ── Scalar setting enums ──

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

impl Alignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "left" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" => Some(Alignment::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderLevel {
    #[default]
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
}

impl HeaderLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderLevel::H1 => "h1",
            HeaderLevel::H2 => "h2",
            HeaderLevel::H3 => "h3",
            HeaderLevel::H4 => "h4",
            HeaderLevel::H5 => "h5",
            HeaderLevel::H6 => "h6",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "h1" => Some(HeaderLevel::H1),
            "h2" => Some(HeaderLevel::H2),
            "h3" => Some(HeaderLevel::H3),
            "h4" => Some(HeaderLevel::H4),
            "h5" => Some(HeaderLevel::H5),
            "h6" => Some(HeaderLevel::H6),
            _ => None,
        }
    }

    /// Numeric level, 1 through 6.
    pub fn level(&self) -> u8 {
        *self as u8 + 1
    }
}

// ── Per-type settings ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordSettings {
    pub placeholder: String,
    pub show_password_option: bool,
    /// Minimum accepted length; `None` disables the length check.
    pub min_length: Option<u32>,
    pub require_symbols: bool,
    pub require_numbers: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberSettings {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub default_value: Option<f64>,
}

/// Settings carried by a form element, one variant per element type.
///
/// The variant always agrees with the element's type: the element type is
/// derived from the settings rather than stored next to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ElementSettings {
    Heading {
        header_level: HeaderLevel,
    },
    Text,
    Divider,
    Button,
    Image {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
    Table {
        #[serde(default)]
        csv_data: CsvGrid,
    },
    InputText {
        placeholder: String,
    },
    Email {
        placeholder: String,
    },
    DateTime {
        use_current_date: bool,
    },
    Dropdown {
        #[serde(default)]
        options: Vec<String>,
    },
    Boolean {
        default_value: bool,
    },
    Number(NumberSettings),
    File {
        #[serde(default)]
        csv_data: CsvGrid,
    },
    Password(PasswordSettings),
}

impl ElementSettings {
    pub fn element_type(&self) -> ElementType {
        match self {
            ElementSettings::Heading { .. } => ElementType::Heading,
            ElementSettings::Text => ElementType::Text,
            ElementSettings::Divider => ElementType::Divider,
            ElementSettings::Button => ElementType::Button,
            ElementSettings::Image { .. } => ElementType::Image,
            ElementSettings::Table { .. } => ElementType::Table,
            ElementSettings::InputText { .. } => ElementType::InputText,
            ElementSettings::Email { .. } => ElementType::Email,
            ElementSettings::DateTime { .. } => ElementType::DateTime,
            ElementSettings::Dropdown { .. } => ElementType::Dropdown,
            ElementSettings::Boolean { .. } => ElementType::Boolean,
            ElementSettings::Number(_) => ElementType::Number,
            ElementSettings::File { .. } => ElementType::File,
            ElementSettings::Password(_) => ElementType::Password,
        }
    }

    /// CSV grid for table and file elements.
    pub fn csv_data(&self) -> Option<&CsvGrid> {
        match self {
            ElementSettings::Table { csv_data } | ElementSettings::File { csv_data } => {
                Some(csv_data)
            }
            _ => None,
        }
    }

    pub(crate) fn csv_data_mut(&mut self) -> Option<&mut CsvGrid> {
        match self {
            ElementSettings::Table { csv_data } | ElementSettings::File { csv_data } => {
                Some(csv_data)
            }
            _ => None,
        }
    }

    pub fn placeholder(&self) -> Option<&str> {
        match self {
            ElementSettings::InputText { placeholder } | ElementSettings::Email { placeholder } => {
                Some(placeholder)
            }
            ElementSettings::Password(p) => Some(&p.placeholder),
            _ => None,
        }
    }
}
