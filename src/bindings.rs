//! The built-in bindings.

use std::rc::Rc;

use adom::{Document, NodeId};
use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::{registry::{Binding, BindingHandler},
            repeat::each,
            value::{to_display_string, opt_to_display_string, is_truthy}};


fn handler(f: impl BindingHandler + 'static) -> Rc<dyn BindingHandler> {
    Rc::new(f)
}

pub(crate) fn builtins() -> Vec<(&'static str, Rc<dyn BindingHandler>)> {
    vec![
        ("text", handler(text)),
        ("html", handler(html)),
        ("attr", handler(attr)),
        ("data", handler(data)),
        ("show", handler(show)),
        ("hide", handler(hide)),
        ("class", handler(class)),
        ("on", handler(on)),
        ("each", handler(each)),
    ]
}

fn qualifier<'b>(binding: &Binding<'b>, kind: &str) -> Result<&'b str> {
    binding.qualifier(kind).ok_or_else(
        || anyhow!("missing name after {}-{kind}-", binding.prefix))
}

// A missing value removes the attribute, so that there's no stale
// value left after an update.
fn set_or_remove(
    doc: &mut Document,
    node: NodeId,
    name: &str,
    value: Option<&Value>,
) -> Result<()> {
    match value {
        Some(v) => doc.set_attribute(node, name, &to_display_string(v)),
        None => {
            doc.remove_attribute(node, name)?;
            Ok(())
        }
    }
}

/// `mns-text="path"`: the text content.
pub fn text(doc: &mut Document, binding: &Binding<'_>) -> Result<()> {
    doc.set_text_content(binding.node, &opt_to_display_string(binding.value_from_model))
}

/// `mns-html="path"`: the value is parsed as markup and replaces the
/// children.
pub fn html(doc: &mut Document, binding: &Binding<'_>) -> Result<()> {
    doc.set_inner_html(binding.node, &opt_to_display_string(binding.value_from_model))
}

/// `mns-attr-<name>="path"`
pub fn attr(doc: &mut Document, binding: &Binding<'_>) -> Result<()> {
    let name = qualifier(binding, "attr")?;
    set_or_remove(doc, binding.node, name, binding.value_from_model)
}

/// `mns-data-<name>="path"` sets `data-<name>`.
pub fn data(doc: &mut Document, binding: &Binding<'_>) -> Result<()> {
    let name = format!("data-{}", qualifier(binding, "data")?);
    set_or_remove(doc, binding.node, &name, binding.value_from_model)
}

fn set_display(doc: &mut Document, node: NodeId, visible: bool) -> Result<()> {
    doc.set_style_property(node, "display", if visible { "block" } else { "none" })
}

pub fn show(doc: &mut Document, binding: &Binding<'_>) -> Result<()> {
    set_display(doc, binding.node, is_truthy(binding.value_from_model))
}

pub fn hide(doc: &mut Document, binding: &Binding<'_>) -> Result<()> {
    set_display(doc, binding.node, ! is_truthy(binding.value_from_model))
}

/// `mns-class="path"`: adds the value's words to the classes. Classes
/// added on earlier runs stay.
pub fn class(doc: &mut Document, binding: &Binding<'_>) -> Result<()> {
    if let Some(value) = binding.value_from_model {
        for class in to_display_string(value).split_ascii_whitespace() {
            doc.add_class(binding.node, class)?;
        }
    }
    Ok(())
}

/// `mns-on-<event>="actionname"`: the value is looked up in the
/// controller, not in the model. Nothing happens if the controller
/// doesn't have it.
pub fn on(doc: &mut Document, binding: &Binding<'_>) -> Result<()> {
    let event = qualifier(binding, "on")?;
    if let Some(action) = binding.controller.action(binding.value) {
        doc.add_event_listener(binding.node, event, action)?;
    }
    Ok(())
}
