//! Element type → control mapping
//!
//! `Renderer::render` turns a decoded document into a flat list of control
//! descriptions a front end can draw. The submit control is always the last
//! entry.

use chrono::NaiveDate;
use serde::Serialize;

use crate::forms::document::{ElementId, FormDocument, FormElement};
use crate::forms::settings::{Alignment, CsvGrid, ElementSettings, HeaderLevel};
use crate::render::validation::password_requirements;

/// Display format for read-only current-date fields.
pub const DATE_DISPLAY_FORMAT: &str = "%-m/%-d/%Y";

const DROPDOWN_PROMPT: &str = "Select an option";

/// Where the form is being drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderContext {
    /// Builder canvas: tables show their CSV upload control.
    Builder,
    /// Data entry: tables render their stored grid read-only.
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TextInput {
    Plain,
    Email,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    fn same(text: &str) -> Self {
        Self {
            value: text.to_string(),
            label: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "control", rename_all = "camelCase")]
pub enum ControlKind {
    Header {
        level: HeaderLevel,
    },
    Label,
    Separator,
    /// A user-added button. Not wired to submission.
    StaticButton,
    Image {
        source: Option<String>,
    },
    TextField {
        input: TextInput,
        placeholder: String,
    },
    PasswordField {
        placeholder: String,
        reveal_toggle: bool,
        requirements: Vec<String>,
    },
    DatePicker,
    CurrentDate {
        display: String,
        value: NaiveDate,
    },
    Select {
        prompt: Option<String>,
        options: Vec<SelectOption>,
        selected: Option<String>,
    },
    NumberField {
        min: Option<f64>,
        max: Option<f64>,
        step: Option<f64>,
        default_value: Option<f64>,
    },
    FilePicker,
    CsvUpload {
        rows: CsvGrid,
    },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Submit,
}

impl ControlKind {
    /// Whether the control produces a submission value.
    pub fn collects_value(&self) -> bool {
        matches!(
            self,
            ControlKind::TextField { .. }
                | ControlKind::PasswordField { .. }
                | ControlKind::DatePicker
                | ControlKind::CurrentDate { .. }
                | ControlKind::Select { .. }
                | ControlKind::NumberField { .. }
                | ControlKind::FilePicker
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedControl {
    pub element_id: ElementId,
    pub key: String,
    pub label: String,
    pub alignment: Alignment,
    pub required: bool,
    #[serde(flatten)]
    pub kind: ControlKind,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    context: RenderContext,
    today: NaiveDate,
}

impl Renderer {
    pub fn new(context: RenderContext) -> Self {
        Self::with_today(context, chrono::Local::now().date_naive())
    }

    /// Pin the date shown by current-date fields.
    pub fn with_today(context: RenderContext, today: NaiveDate) -> Self {
        Self { context, today }
    }

    pub fn context(&self) -> RenderContext {
        self.context
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn render(&self, doc: &FormDocument) -> Vec<RenderedControl> {
        let mut controls: Vec<RenderedControl> =
            doc.elements().iter().map(|el| self.render_element(el)).collect();

        let submit = doc.submit_control();
        controls.push(RenderedControl {
            element_id: ElementId::SUBMIT,
            key: crate::forms::document::SUBMIT_KEY.to_string(),
            label: submit.label.clone(),
            alignment: submit.alignment,
            required: false,
            kind: ControlKind::Submit,
        });
        controls
    }

    pub fn render_element(&self, element: &FormElement) -> RenderedControl {
        RenderedControl {
            element_id: element.id,
            key: element.key.clone(),
            label: element.display_label().to_string(),
            alignment: element.alignment,
            required: element.required,
            kind: self.control_kind(&element.settings),
        }
    }

    fn control_kind(&self, settings: &ElementSettings) -> ControlKind {
        match settings {
            ElementSettings::Heading { header_level } => ControlKind::Header {
                level: *header_level,
            },
            ElementSettings::Text => ControlKind::Label,
            ElementSettings::Divider => ControlKind::Separator,
            ElementSettings::Button => ControlKind::StaticButton,
            ElementSettings::Image { source } => ControlKind::Image {
                source: source.clone(),
            },
            ElementSettings::InputText { placeholder } => ControlKind::TextField {
                input: TextInput::Plain,
                placeholder: placeholder.clone(),
            },
            ElementSettings::Email { placeholder } => ControlKind::TextField {
                input: TextInput::Email,
                placeholder: placeholder.clone(),
            },
            ElementSettings::Password(p) => ControlKind::PasswordField {
                placeholder: p.placeholder.clone(),
                reveal_toggle: p.show_password_option,
                requirements: password_requirements(p),
            },
            ElementSettings::DateTime { use_current_date } => {
                if *use_current_date {
                    ControlKind::CurrentDate {
                        display: self.today.format(DATE_DISPLAY_FORMAT).to_string(),
                        value: self.today,
                    }
                } else {
                    ControlKind::DatePicker
                }
            }
            ElementSettings::Dropdown { options } => ControlKind::Select {
                prompt: Some(DROPDOWN_PROMPT.to_string()),
                options: options.iter().map(|o| SelectOption::same(o)).collect(),
                selected: None,
            },
            ElementSettings::Boolean { default_value } => ControlKind::Select {
                prompt: None,
                options: vec![
                    SelectOption {
                        value: "true".to_string(),
                        label: "True".to_string(),
                    },
                    SelectOption {
                        value: "false".to_string(),
                        label: "False".to_string(),
                    },
                ],
                selected: Some(default_value.to_string()),
            },
            ElementSettings::Number(n) => ControlKind::NumberField {
                min: n.min,
                max: n.max,
                step: n.step,
                default_value: n.default_value,
            },
            ElementSettings::File { .. } => ControlKind::FilePicker,
            ElementSettings::Table { csv_data } => match self.context {
                RenderContext::Builder => ControlKind::CsvUpload {
                    rows: csv_data.clone(),
                },
                RenderContext::Viewer => {
                    let mut rows = csv_data.iter();
                    let header = rows.next().cloned().unwrap_or_default();
                    ControlKind::Table {
                        header,
                        rows: rows.cloned().collect(),
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::builder::FormBuilder;
    use crate::forms::settings::{ElementType, PasswordSettings};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    #[test]
    fn submit_is_always_last() {
        let mut b = FormBuilder::new();
        b.add_element(ElementType::Heading);
        b.add_element(ElementType::Email);
        b.set_submit_label("Send");
        let controls = Renderer::with_today(RenderContext::Viewer, today()).render(b.document());
        assert_eq!(controls.len(), 3);
        let last = controls.last().unwrap();
        assert_eq!(last.kind, ControlKind::Submit);
        assert_eq!(last.label, "Send");
        assert_eq!(last.element_id, ElementId::SUBMIT);
    }

    #[test]
    fn current_date_display() {
        let mut b = FormBuilder::new();
        let id = b.add_element(ElementType::DateTime);
        let mut draft = b.begin_edit(id).unwrap();
        draft.settings = ElementSettings::DateTime {
            use_current_date: true,
        };
        b.commit_edit(draft).unwrap();

        let control = Renderer::with_today(RenderContext::Viewer, today())
            .render_element(b.document().element(id).unwrap());
        assert_eq!(
            control.kind,
            ControlKind::CurrentDate {
                display: "3/7/2024".to_string(),
                value: today(),
            }
        );
        assert!(control.kind.collects_value());
    }

    #[test]
    fn table_depends_on_context() {
        let mut b = FormBuilder::new();
        let id = b.add_element(ElementType::Table);
        b.attach_csv(id, "t.csv", b"h1,h2\na,b\n").unwrap();
        let element = b.document().element(id).unwrap();

        let builder = Renderer::with_today(RenderContext::Builder, today()).render_element(element);
        assert!(matches!(builder.kind, ControlKind::CsvUpload { ref rows } if rows.len() == 2));

        let viewer = Renderer::with_today(RenderContext::Viewer, today()).render_element(element);
        assert_eq!(
            viewer.kind,
            ControlKind::Table {
                header: vec!["h1".into(), "h2".into()],
                rows: vec![vec!["a".into(), "b".into()]],
            }
        );
        assert!(!viewer.kind.collects_value());
    }

    #[test]
    fn boolean_offers_fixed_choices() {
        let mut b = FormBuilder::new();
        let id = b.add_element(ElementType::Boolean);
        let control = Renderer::new(RenderContext::Viewer).render_element(b.document().element(id).unwrap());
        match control.kind {
            ControlKind::Select {
                options, selected, ..
            } => {
                let values: Vec<_> = options.iter().map(|o| o.value.as_str()).collect();
                assert_eq!(values, vec!["true", "false"]);
                assert_eq!(selected.as_deref(), Some("true"));
            }
            other => panic!("unexpected control {:?}", other),
        }
    }

    #[test]
    fn password_lists_requirements() {
        let mut b = FormBuilder::new();
        let id = b.add_element(ElementType::Password);
        let mut draft = b.begin_edit(id).unwrap();
        draft.settings = ElementSettings::Password(PasswordSettings {
            placeholder: "Secret".into(),
            show_password_option: true,
            min_length: Some(10),
            require_symbols: true,
            require_numbers: false,
        });
        b.commit_edit(draft).unwrap();

        let control = Renderer::new(RenderContext::Viewer).render_element(b.document().element(id).unwrap());
        assert_eq!(
            control.kind,
            ControlKind::PasswordField {
                placeholder: "Secret".into(),
                reveal_toggle: true,
                requirements: vec![
                    "Requires Minimum Length: 10".into(),
                    "Requires Symbols: Yes".into()
                ],
            }
        );
    }

    #[test]
    fn blank_label_shows_key() {
        let mut b = FormBuilder::new();
        let id = b.add_element(ElementType::InputText);
        let mut draft = b.begin_edit(id).unwrap();
        draft.label = String::new();
        b.commit_edit(draft).unwrap();
        let control = Renderer::new(RenderContext::Viewer).render_element(b.document().element(id).unwrap());
        assert_eq!(control.label, "inputText1");
    }
}
