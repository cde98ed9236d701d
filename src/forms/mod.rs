//! Form model and builder
//!
//! - `registry`: element types offered by the palette and their defaults
//! - `document`: the form document and its elements
//! - `builder`: draft/commit editing over a document
//! - `xml`: storage encoding

pub mod builder;
pub mod csv_table;
pub mod document;
pub mod registry;
pub mod settings;
pub mod xml;

pub use builder::{ElementDraft, FormBuilder};
pub use document::{ElementId, FormDocument, FormElement, SubmitControl};
pub use registry::{ElementCategory, ElementRegistry, ElementTypeDescriptor};
pub use settings::{
    Alignment, CsvGrid, ElementSettings, ElementType, HeaderLevel, NumberSettings,
    PasswordSettings,
};
