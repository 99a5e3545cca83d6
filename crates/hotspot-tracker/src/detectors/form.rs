//! Form field focus and blur.
//!
//! Field values are never read; blur only reports whether one was present.

use hotspot_core::events::{EventData, FormBlurData, FormFocusData};
use hotspot_core::types::ElementMeta;

use crate::dom::DomNode;
use crate::element::describe;
use crate::recorder::Record;

const FORM_TAGS: [&str; 3] = ["input", "select", "textarea"];

/// A focus target that qualifies as a form field.
#[derive(Clone, Debug, PartialEq)]
pub struct FormField {
    pub element: ElementMeta,
    pub field_type: String,
    pub field_name: Option<String>,
    pub has_value: bool,
}

impl FormField {
    /// `None` unless `node` is an input, select or textarea.
    pub fn from_node<N: DomNode>(node: &N) -> Option<Self> {
        let tag = node.tag_name().to_ascii_lowercase();
        if !FORM_TAGS.contains(&tag.as_str()) {
            return None;
        }

        let field_type = if tag == "input" {
            node.attribute("type")
                .filter(|t| !t.is_empty())
                .map(|t| t.to_ascii_lowercase())
                .unwrap_or_else(|| "text".to_string())
        } else {
            tag
        };

        Some(Self {
            element: describe(node),
            field_type,
            field_name: node
                .attribute("name")
                .filter(|n| !n.is_empty())
                .or_else(|| node.id()),
            has_value: node.has_value(),
        })
    }
}

#[derive(Debug, Default)]
pub struct FormDetector;

impl FormDetector {
    pub fn on_focus(&self, field: FormField, rec: &mut dyn Record) {
        rec.record(EventData::FormFocus(FormFocusData {
            element: Some(field.element),
            field_type: field.field_type,
            field_name: field.field_name,
        }));
    }

    pub fn on_blur(&self, field: FormField, rec: &mut dyn Record) {
        rec.record(EventData::FormBlur(FormBlurData {
            element: Some(field.element),
            field_type: field.field_type,
            field_name: field.field_name,
            has_value: field.has_value,
        }));
    }
}
