//! Finding and dispatching the bound attributes of one element.

use std::rc::Rc;

use adom::{Document, NodeId};
use kstring::KString;
use serde_json::Value;

use crate::{controller::Controller,
            path::resolve,
            registry::{with_registry, Binding, BindingHandler, BindingRegistry},
            warn};

/// Attributes `<prefix>-on-<event>` always go to this binding, as
/// event names are open-ended.
pub const EVENT_BINDING: &str = "on";

fn is_alnum(b: u8) -> bool {
    b.is_ascii_alphanumeric()
}

/// The binding name for an attribute name with the prefix already
/// removed: the first run of `-<alphanumerics>` segments is cut out,
/// so `attr-href` gives `attr`, `each-song` and `data-user-id` give
/// `each` and `data`. A hyphen not followed by an alphanumeric
/// character is kept (`text-` stays `text-`).
pub fn strip_qualifier(name: &str) -> String {
    let bytes = name.as_bytes();
    let len = bytes.len();
    let segment_at = |i: usize| bytes[i] == b'-' && i + 1 < len && is_alnum(bytes[i + 1]);
    let start = match (0..len).find(|i| segment_at(*i)) {
        Some(start) => start,
        None => return name.to_string()
    };
    let mut end = start;
    while end < len && segment_at(end) {
        end += 1;
        while end < len && is_alnum(bytes[end]) {
            end += 1;
        }
    }
    // start and end are at ASCII positions, thus char boundaries
    format!("{}{}", &name[..start], &name[end..])
}

fn find_handler(registry: &BindingRegistry, rest: &str) -> Option<Rc<dyn BindingHandler>> {
    registry.lookup(&strip_qualifier(rest)).or_else(|| {
        match rest.strip_prefix(EVENT_BINDING) {
            Some(r) if r.starts_with('-') => registry.lookup(EVENT_BINDING),
            _ => None
        }
    })
}

/// Calls the registered handler for every attribute of `node` that
/// carries the prefix and names a known binding. Attributes are
/// visited last to first; handlers must not depend on the order. A
/// handler failing is reported via `warn!` and doesn't stop the
/// others. Returns the number of handlers called.
pub fn scan_node(
    doc: &mut Document,
    node: NodeId,
    scope: &Value,
    controller: &Rc<Controller>,
) -> usize {
    let prefix: KString = with_registry(|r| KString::from_ref(r.prefix()));
    let attributes: Vec<(KString, KString)> = doc.attributes(node).to_vec();
    let mut called = 0;
    for (name, value) in attributes.iter().rev() {
        let rest = match name.strip_prefix(prefix.as_str()).and_then(|r| r.strip_prefix('-')) {
            Some(rest) => rest,
            None => continue
        };
        // Looked up per attribute, and not kept borrowed while the
        // handler runs.
        let handler = match with_registry(|r| find_handler(r, rest)) {
            Some(h) => h,
            None => continue
        };
        // An earlier handler may have removed it
        if doc.get_attribute(node, name).is_none() {
            continue
        }
        let binding = Binding {
            node,
            attribute: name,
            value,
            value_from_model: resolve(scope, value),
            controller,
            prefix: &prefix,
        };
        called += 1;
        if let Err(e) = handler.bind(doc, &binding) {
            warn!("binding {}=\"{}\" on <{}> failed: {e:#}",
                  name.as_str(),
                  value.as_str(),
                  doc.tag_name(node).unwrap_or("?"));
        }
    }
    called
}
