//! Renderer
//!
//! Maps a decoded form to controls and tracks the values a user enters
//! before they are handed to the submission engine.

pub mod controls;
pub mod session;
pub mod validation;

pub use controls::{
    ControlKind, RenderContext, RenderedControl, Renderer, SelectOption, TextInput,
    DATE_DISPLAY_FORMAT,
};
pub use session::FormSession;
pub use validation::{
    is_valid_email, is_valid_number, meets_password_policy, password_requirements,
};
