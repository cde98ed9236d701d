//! SOAR Forms - form builder, storage codec and submission engine
//!
//! Analysts compose forms from a fixed palette of element types, store them
//! as XML, and render them for data entry. Submitted values are packaged
//! into a container, artifacts and vault attachments on the case-management
//! API.
//!
//! ## Flow
//! Builder -> XML codec -> store -> decode -> renderer/session -> submission engine
//!
//! ## Quick Start
//!
//! ```rust
//! use soar_forms::forms::{xml, ElementType, FormBuilder};
//!
//! let mut builder = FormBuilder::new();
//! builder.set_name("phishing-report");
//! builder.add_element(ElementType::Email);
//! let stored = xml::encode(builder.document());
//! let loaded = xml::decode(&stored).unwrap();
//! assert!(loaded.same_content(builder.document()));
//! ```

// Core error handling
pub mod error;

// Case API and database settings
pub mod config;

// Form model, builder engine and XML codec
pub mod forms;

// Stored forms
pub mod store;

// Controls, live values and client-side validation
pub mod render;

// Aggregation and case API submission
pub mod submit;

pub use config::{CaseApiAuth, CaseApiConfig};
pub use error::{FormError, Result};
pub use forms::{ElementId, ElementType, FormBuilder, FormDocument, FormElement};
pub use render::{FormSession, RenderContext, Renderer};
pub use store::{FormCatalog, FormRef, FormStore, MemoryFormStore};
pub use submit::{CaseApi, CaseApiClient, SubmissionEngine, SubmissionReport};
