//! XML Codec
//!
//! Storage encoding for `FormDocument`. Every scalar field is a leaf tag,
//! lists become a wrapper tag with one child per item, and CSV grids become
//! `<row>`/`<cell>` nesting. Decoding is lenient: any optional tag may be
//! missing and falls back to the defaults a freshly added element gets.
//!
//! ```xml
//! <form>
//!   <name>incident</name>
//!   <label>Incident Report</label>
//!   <tags><tag>soc</tag></tags>
//!   <elements>
//!     <element>
//!       <id>…</id>
//!       <type>dropdown</type>
//!       <key>severity</key>
//!       …
//!       <settings>
//!         <dropdownOptions><option>low</option></dropdownOptions>
//!       </settings>
//!     </element>
//!   </elements>
//! </form>
//! ```

use std::fmt::Write as _;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::warn;

use crate::error::{FormError, Result};
use crate::forms::document::{
    ElementId, FormDocument, FormElement, SubmitControl, SUBMIT_ELEMENT_ID, SUBMIT_KEY,
};
use crate::forms::registry::ElementRegistry;
use crate::forms::settings::{
    Alignment, CsvGrid, ElementSettings, ElementType, HeaderLevel, NumberSettings,
};

const ROOT_TAG: &str = "form";
const INDENT: &str = "  ";

// ============================================================================
// Encode
// ============================================================================

/// Serialize a document, including the trailing submit control.
pub fn encode(doc: &FormDocument) -> String {
    let mut w = XmlWriter::default();
    w.open(ROOT_TAG);
    w.leaf("name", &doc.name);
    w.leaf("label", &doc.label);
    w.list("tags", "tag", &doc.tags);

    w.open("elements");
    for element in doc.elements() {
        write_element(&mut w, element);
    }
    write_submit(&mut w, doc.submit_control());
    w.close("elements");

    w.close(ROOT_TAG);
    w.finish()
}

fn write_element(w: &mut XmlWriter, element: &FormElement) {
    w.open("element");
    w.leaf("id", &element.id.to_string());
    w.leaf("type", element.element_type().as_str());
    w.leaf("key", &element.key);
    w.leaf("label", &element.label);
    w.leaf("alignment", element.alignment.as_str());
    w.leaf("required", bool_text(element.required));
    write_settings(w, &element.settings);
    w.close("element");
}

fn write_submit(w: &mut XmlWriter, submit: &SubmitControl) {
    w.open("element");
    w.leaf("id", SUBMIT_ELEMENT_ID);
    w.leaf("type", ElementType::Button.as_str());
    w.leaf("key", SUBMIT_KEY);
    w.leaf("label", &submit.label);
    w.leaf("alignment", submit.alignment.as_str());
    w.leaf("required", bool_text(false));
    w.empty("settings");
    w.close("element");
}

fn write_settings(w: &mut XmlWriter, settings: &ElementSettings) {
    match settings {
        ElementSettings::Text | ElementSettings::Divider | ElementSettings::Button => {
            w.empty("settings");
            return;
        }
        _ => w.open("settings"),
    }

    match settings {
        ElementSettings::Heading { header_level } => {
            w.leaf("headerLevel", header_level.as_str());
        }
        ElementSettings::Image { source } => {
            if let Some(source) = source {
                w.leaf("imageSrc", source);
            }
        }
        ElementSettings::Table { csv_data } | ElementSettings::File { csv_data } => {
            w.grid("csvData", csv_data);
        }
        ElementSettings::InputText { placeholder } | ElementSettings::Email { placeholder } => {
            w.leaf("placeholder", placeholder);
        }
        ElementSettings::DateTime { use_current_date } => {
            w.leaf("useCurrentDate", bool_text(*use_current_date));
        }
        ElementSettings::Dropdown { options } => {
            w.list("dropdownOptions", "option", options);
        }
        ElementSettings::Boolean { default_value } => {
            w.leaf("defaultBoolean", bool_text(*default_value));
        }
        ElementSettings::Number(n) => {
            w.leaf("min", &number_text(n.min));
            w.leaf("max", &number_text(n.max));
            w.leaf("step", &number_text(n.step));
            w.leaf("defaultValue", &number_text(n.default_value));
        }
        ElementSettings::Password(p) => {
            w.leaf("placeholder", &p.placeholder);
            w.leaf("showPasswordOption", bool_text(p.show_password_option));
            let length = p.min_length.map(|n| n.to_string()).unwrap_or_default();
            w.leaf("passwordLength", &length);
            w.leaf("requireSymbols", bool_text(p.require_symbols));
            w.leaf("requireNumbers", bool_text(p.require_numbers));
        }
        ElementSettings::Text | ElementSettings::Divider | ElementSettings::Button => {}
    }

    w.close("settings");
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn number_text(value: Option<f64>) -> String {
    value.map(|n| n.to_string()).unwrap_or_default()
}

/// Indenting writer. Leaf text is written verbatim (escaped) so it survives
/// decode byte for byte.
#[derive(Default)]
struct XmlWriter {
    out: String,
    depth: usize,
}

impl XmlWriter {
    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
    }

    fn open(&mut self, tag: &str) {
        self.indent();
        let _ = writeln!(self.out, "<{}>", tag);
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        let _ = writeln!(self.out, "</{}>", tag);
    }

    fn empty(&mut self, tag: &str) {
        self.indent();
        let _ = writeln!(self.out, "<{}/>", tag);
    }

    fn leaf(&mut self, tag: &str, text: &str) {
        self.indent();
        let _ = writeln!(self.out, "<{tag}>{}</{tag}>", escape(text));
    }

    fn list(&mut self, tag: &str, item_tag: &str, items: &[String]) {
        if items.is_empty() {
            self.empty(tag);
            return;
        }
        self.open(tag);
        for item in items {
            self.leaf(item_tag, item);
        }
        self.close(tag);
    }

    fn grid(&mut self, tag: &str, rows: &CsvGrid) {
        if rows.is_empty() {
            self.empty(tag);
            return;
        }
        self.open(tag);
        for row in rows {
            self.list("row", "cell", row);
        }
        self.close(tag);
    }

    fn finish(self) -> String {
        self.out
    }
}

// ============================================================================
// Decode
// ============================================================================

/// Parse a stored document. Element ids are freshly minted; the stored
/// submit element is folded back into the document's `SubmitControl`.
pub fn decode(xml: &str) -> Result<FormDocument> {
    let root = parse_tree(xml)?;
    if root.name != ROOT_TAG {
        return Err(FormError::malformed(format!(
            "expected <{}> root, found <{}>",
            ROOT_TAG, root.name
        )));
    }

    let name = root
        .child("name")
        .ok_or_else(|| FormError::malformed("missing <name>"))?;
    let elements = root
        .child("elements")
        .ok_or_else(|| FormError::malformed("missing <elements>"))?;

    let mut doc = FormDocument::new(name.text.clone());
    doc.label = root.child_text("label").unwrap_or_default().to_string();
    doc.tags = root.child("tags").map(XmlNode::items).unwrap_or_default();

    // Documents written by `encode` mark the submit element by id. Only
    // documents without that id fall back to the `button`/`Submit` pairing.
    let tagged = elements
        .children
        .iter()
        .any(|node| node.child_text("id") == Some(SUBMIT_ELEMENT_ID));

    let registry = ElementRegistry::builtin();
    let mut submit_seen = false;
    for node in &elements.children {
        if !submit_seen && is_submit_node(node, tagged) {
            submit_seen = true;
            doc.submit = SubmitControl {
                label: node.child_text("label").unwrap_or(SUBMIT_KEY).to_string(),
                alignment: parse_alignment(node.child_text("alignment")),
            };
            continue;
        }
        doc.elements.push(read_element(registry, node));
    }

    for key in doc.duplicate_keys() {
        warn!(form = %doc.name, key, "decoded form has duplicate element keys");
    }
    Ok(doc)
}

fn is_submit_node(node: &XmlNode, tagged: bool) -> bool {
    if tagged {
        return node.child_text("id") == Some(SUBMIT_ELEMENT_ID);
    }
    node.child_text("type") == Some(ElementType::Button.as_str())
        && node.child_text("key") == Some(SUBMIT_KEY)
}

fn read_element(registry: &ElementRegistry, node: &XmlNode) -> FormElement {
    let type_id = node
        .child_text("type")
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(ElementType::Text.as_str());
    let (ty, mut settings) = registry.defaults_or_text_input(type_id);

    let key = node.child_text("key").unwrap_or_default().to_string();
    let label = match node.child_text("label") {
        Some(label) => label.to_string(),
        None => registry.descriptor(ty).default_label.to_string(),
    };

    let source = SettingsSource {
        settings: node.child("settings"),
        element: node,
    };
    overlay_settings(&mut settings, &source);

    FormElement {
        id: ElementId::new(),
        key,
        label,
        alignment: parse_alignment(node.child_text("alignment")),
        required: parse_bool(node.child_text("required")).unwrap_or(false),
        settings,
    }
}

/// Settings tags are read from `<settings>` first and then from the element
/// itself, where older documents kept them.
struct SettingsSource<'a> {
    settings: Option<&'a XmlNode>,
    element: &'a XmlNode,
}

impl<'a> SettingsSource<'a> {
    fn node(&self, tag: &str) -> Option<&'a XmlNode> {
        self.settings
            .and_then(|s| s.child(tag))
            .or_else(|| self.element.child(tag))
    }

    fn text(&self, tag: &str) -> Option<&'a str> {
        self.node(tag).map(|n| n.text.as_str())
    }

    fn bool(&self, tag: &str) -> Option<bool> {
        parse_bool(self.text(tag))
    }

    fn number(&self, tag: &str) -> Option<Option<f64>> {
        self.text(tag).map(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            match raw.parse::<f64>() {
                Ok(n) => Some(n),
                Err(_) => {
                    warn!(tag, value = raw, "ignoring non-numeric setting");
                    None
                }
            }
        })
    }
}

fn overlay_settings(settings: &mut ElementSettings, src: &SettingsSource<'_>) {
    match settings {
        ElementSettings::Heading { header_level } => {
            if let Some(level) = src.text("headerLevel") {
                *header_level = HeaderLevel::parse(level.trim()).unwrap_or_default();
            }
        }
        ElementSettings::Image { source } => {
            if let Some(src_text) = src.text("imageSrc") {
                *source = Some(src_text.to_string()).filter(|s| !s.is_empty());
            }
        }
        ElementSettings::Table { csv_data } | ElementSettings::File { csv_data } => {
            if let Some(grid) = src.node("csvData") {
                *csv_data = grid.rows();
            }
        }
        ElementSettings::InputText { placeholder } | ElementSettings::Email { placeholder } => {
            if let Some(text) = src.text("placeholder") {
                *placeholder = text.to_string();
            }
        }
        ElementSettings::DateTime { use_current_date } => {
            if let Some(value) = src.bool("useCurrentDate") {
                *use_current_date = value;
            }
        }
        ElementSettings::Dropdown { options } => {
            if let Some(list) = src.node("dropdownOptions") {
                *options = list.items();
            }
        }
        ElementSettings::Boolean { default_value } => {
            if let Some(value) = src.bool("defaultBoolean") {
                *default_value = value;
            }
        }
        ElementSettings::Number(n) => overlay_number(n, src),
        ElementSettings::Password(p) => {
            if let Some(text) = src.text("placeholder") {
                p.placeholder = text.to_string();
            }
            if let Some(value) = src.bool("showPasswordOption") {
                p.show_password_option = value;
            }
            if let Some(length) = src.number("passwordLength") {
                p.min_length = length.filter(|n| *n >= 0.0).map(|n| n as u32);
            }
            if let Some(value) = src.bool("requireSymbols") {
                p.require_symbols = value;
            }
            if let Some(value) = src.bool("requireNumbers") {
                p.require_numbers = value;
            }
        }
        ElementSettings::Text | ElementSettings::Divider | ElementSettings::Button => {}
    }
}

fn overlay_number(n: &mut NumberSettings, src: &SettingsSource<'_>) {
    if let Some(v) = src.number("min") {
        n.min = v;
    }
    if let Some(v) = src.number("max") {
        n.max = v;
    }
    if let Some(v) = src.number("step") {
        n.step = v;
    }
    if let Some(v) = src.number("defaultValue") {
        n.default_value = v;
    }
}

fn parse_bool(text: Option<&str>) -> Option<bool> {
    text.map(|t| t.trim() == "true")
}

fn parse_alignment(text: Option<&str>) -> Alignment {
    text.and_then(|t| Alignment::parse(t.trim()))
        .unwrap_or_default()
}

// ── Tree ──

#[derive(Debug, Default)]
struct XmlNode {
    name: String,
    text: String,
    children: Vec<XmlNode>,
}

impl XmlNode {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    /// Text of every child, whatever the item tag is called.
    fn items(&self) -> Vec<String> {
        self.children.iter().map(|c| c.text.clone()).collect()
    }

    fn rows(&self) -> CsvGrid {
        self.children.iter().map(XmlNode::items).collect()
    }
}

fn parse_tree(xml: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| FormError::malformed(e.to_string()))?;
        match event {
            Event::Start(e) => stack.push(XmlNode::new(tag_name(e.local_name().as_ref())?)),
            Event::Empty(e) => {
                let node = XmlNode::new(tag_name(e.local_name().as_ref())?);
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| FormError::malformed("unbalanced closing tag"))?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| FormError::malformed(e.to_string()))?;
                    top.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    let text = std::str::from_utf8(&c)
                        .map_err(|e| FormError::malformed(e.to_string()))?;
                    top.text.push_str(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(FormError::malformed(format!("unclosed <{}>", open.name)));
    }
    root.ok_or_else(|| FormError::malformed("empty document"))
}

fn tag_name(raw: &[u8]) -> Result<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| FormError::malformed(e.to_string()))
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_some() => {
            return Err(FormError::malformed("more than one root element"));
        }
        None => *root = Some(node),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::builder::FormBuilder;

    #[test]
    fn encodes_nested_lists() {
        let mut b = FormBuilder::new();
        b.set_name("triage");
        b.set_tags(vec!["soc".into(), "p1".into()]);
        let id = b.add_element(ElementType::Dropdown);
        let mut draft = b.begin_edit(id).unwrap();
        draft.settings = ElementSettings::Dropdown {
            options: vec!["low".into(), "high".into()],
        };
        b.commit_edit(draft).unwrap();

        let xml = encode(b.document());
        assert!(xml.starts_with("<form>\n"));
        assert!(xml.contains("<tag>soc</tag>"));
        assert!(xml.contains("<option>low</option>"));
        assert!(xml.contains("<id>submit-button</id>"));
    }

    #[test]
    fn leaf_text_is_escaped_and_restored() {
        let mut doc = FormDocument::new("a<b & \"c\"");
        doc.label = "  padded  ".to_string();
        let xml = encode(&doc);
        assert!(xml.contains("<name>a&lt;b &amp; &quot;c&quot;</name>"));
        let back = decode(&xml).unwrap();
        assert_eq!(back.name, "a<b & \"c\"");
        assert_eq!(back.label, "  padded  ");
    }

    #[test]
    fn missing_required_tags_are_malformed() {
        for xml in [
            "<form><elements/></form>",
            "<form><name>x</name></form>",
            "<other><name>x</name><elements/></other>",
            "",
            "<form><name>x</name><elements>",
            "not xml at all <",
        ] {
            assert!(
                matches!(decode(xml), Err(FormError::MalformedDocument { .. })),
                "{xml:?} should be rejected"
            );
        }
    }

    #[test]
    fn minimal_document() {
        let doc = decode("<form><name>bare</name><elements/></form>").unwrap();
        assert_eq!(doc.name, "bare");
        assert_eq!(doc.label, "");
        assert!(doc.tags.is_empty());
        assert!(doc.is_empty());
        assert_eq!(doc.submit_control(), &SubmitControl::default());
    }

    #[test]
    fn absent_optional_tags_match_fresh_elements() {
        let xml = r#"
            <form>
              <name>defaults</name>
              <elements>
                <element><type>heading</type><key>heading1</key></element>
                <element><type>password</type><key>password1</key></element>
                <element><type>boolean</type><key>boolean1</key></element>
              </elements>
            </form>"#;
        let doc = decode(xml).unwrap();

        let mut b = FormBuilder::new();
        b.set_name("defaults");
        b.add_element(ElementType::Heading);
        b.add_element(ElementType::Password);
        b.add_element(ElementType::Boolean);
        assert!(doc.same_content(b.document()));
    }

    #[test]
    fn legacy_layout_is_accepted() {
        let xml = r#"
            <form>
              <name>legacy</name>
              <tags><element>one</element><element>two</element></tags>
              <elements>
                <element>
                  <id>abc</id>
                  <type>dropdown</type>
                  <key>pick</key>
                  <dropdownOptions><element>a</element><element>b</element></dropdownOptions>
                </element>
                <element>
                  <type>button</type>
                  <key>Submit</key>
                  <label>Send</label>
                  <alignment>right</alignment>
                </element>
              </elements>
            </form>"#;
        let doc = decode(xml).unwrap();
        assert_eq!(doc.tags, vec!["one", "two"]);
        assert_eq!(doc.len(), 1);
        assert_eq!(
            doc.elements()[0].settings,
            ElementSettings::Dropdown {
                options: vec!["a".into(), "b".into()]
            }
        );
        assert_eq!(doc.submit_control().label, "Send");
        assert_eq!(doc.submit_control().alignment, Alignment::Right);
    }

    #[test]
    fn user_buttons_survive() {
        let mut b = FormBuilder::new();
        b.set_name("buttons");
        b.add_element(ElementType::Button);
        let back = decode(&encode(b.document())).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.elements()[0].element_type(), ElementType::Button);
    }

    #[test]
    fn submit_id_takes_precedence_over_submit_key() {
        let xml = r#"<form><name>x</name><elements>
            <element><id>a</id><type>button</type><key>Submit</key><label>Help</label></element>
            <element><id>submit-button</id><type>button</type><key>Submit</key><label>Go</label></element>
        </elements></form>"#;
        let doc = decode(xml).unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.elements()[0].label, "Help");
        assert_eq!(doc.submit_control().label, "Go");
    }

    #[test]
    fn unknown_type_decodes_as_text_input() {
        let xml = "<form><name>x</name><elements><element><type>slider</type>\
                   <key>s</key><label>Volume</label></element></elements></form>";
        let doc = decode(xml).unwrap();
        let el = &doc.elements()[0];
        assert_eq!(el.element_type(), ElementType::InputText);
        assert_eq!(el.key, "s");
        assert_eq!(el.label, "Volume");
    }

    #[test]
    fn csv_grid_and_numbers() {
        let xml = r#"<form><name>x</name><elements>
            <element><type>table</type><key>t</key><settings>
              <csvData><row><cell>h1</cell><cell>h2</cell></row><row><cell>1</cell></row><row/></csvData>
            </settings></element>
            <element><type>number</type><key>n</key><settings>
              <min>0</min><max></max><step>0.5</step><defaultValue>abc</defaultValue>
            </settings></element>
        </elements></form>"#;
        let doc = decode(xml).unwrap();
        assert_eq!(
            doc.elements()[0].settings.csv_data().unwrap(),
            &vec![
                vec!["h1".to_string(), "h2".to_string()],
                vec!["1".to_string()],
                vec![],
            ]
        );
        assert_eq!(
            doc.elements()[1].settings,
            ElementSettings::Number(NumberSettings {
                min: Some(0.0),
                max: None,
                step: Some(0.5),
                default_value: None,
            })
        );
    }

    #[test]
    fn fresh_ids_on_every_decode() {
        let mut b = FormBuilder::new();
        b.set_name("ids");
        let id = b.add_element(ElementType::Text);
        let back = decode(&encode(b.document())).unwrap();
        assert_ne!(back.elements()[0].id, id);
    }
}
