//! The `each` binding: `<ul mns-each-song="band.songs"><li
//! mns-text="song.title"></li></ul>` repeats the children of the host
//! element once per entry of `band.songs`, each copy bound in its own
//! view with the entry visible as `song`.

use std::rc::Rc;

use adom::{Document, NodeId};
use anyhow::{Result, anyhow, bail};
use kstring::KString;
use serde_json::{Map, Value};

use crate::{controller::Controller,
            registry::Binding,
            view::{View, ViewOptions},
            warn};

/// Key of the fragment on the host holding the original children.
pub const EACH_TEMPLATE_KEY: &str = "mnster:each";

// The original children, copied into a detached element the first
// time round. Later runs (updates) have to start from these, not from
// what the previous run left in the host.
fn item_template(doc: &mut Document, host: NodeId) -> Result<NodeId> {
    if let Some(template) = doc.fragment(host, EACH_TEMPLATE_KEY) {
        return Ok(template)
    }
    let template = doc.create_element("template");
    for child in doc.children(host).to_vec() {
        let copy = doc.deep_clone(child)?;
        doc.append_child(template, copy)?;
    }
    doc.set_fragment(host, EACH_TEMPLATE_KEY, template)?;
    Ok(template)
}

fn append_item(
    doc: &mut Document,
    host: NodeId,
    template: NodeId,
    alias: &str,
    item: &Value,
    controller: &Rc<Controller>,
) -> Result<()> {
    let root = doc.deep_clone(template)?;
    let result = fill_item(doc, host, root, alias, item, controller);
    doc.remove(root)?;
    result
}

// Binds `root` for `item` and moves its children over to `host`.
fn fill_item(
    doc: &mut Document,
    host: NodeId,
    root: NodeId,
    alias: &str,
    item: &Value,
    controller: &Rc<Controller>,
) -> Result<()> {
    let model = if item.is_null() {
        Value::Object(Map::new())
    } else {
        item.clone()
    };
    View::new(doc, root, ViewOptions {
        context: Some(KString::from_ref(alias)),
        model: Some(model),
        controller: Some(controller.clone()),
    })?;
    for child in doc.children(root).to_vec() {
        doc.append_child(host, child)?;
    }
    Ok(())
}

/// Sequences are iterated in order, maps in insertion order with the
/// keys ignored. Null entries are rendered with an empty map as the
/// model. A missing collection renders nothing. If an entry fails,
/// that is reported and the remaining ones are still rendered. The
/// items of the previous run are freed.
pub fn each(doc: &mut Document, binding: &Binding<'_>) -> Result<()> {
    let host = binding.node;
    let alias = binding.qualifier("each").ok_or_else(
        || anyhow!("missing item name after {}-each-", binding.prefix))?;
    let template = item_template(doc, host)?;
    doc.remove_children(host)?;

    let items: Vec<&Value> = match binding.value_from_model {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(map)) => map.values().collect(),
        Some(other) => bail!("expected a sequence or a map at {:?}, got {other}",
                             binding.value),
    };
    for (i, item) in items.into_iter().enumerate() {
        if let Err(e) = append_item(doc, host, template, alias, item, binding.controller) {
            warn!("{}: item {i} of {:?} failed: {e:#}", binding.attribute, binding.value);
        }
    }
    Ok(())
}
