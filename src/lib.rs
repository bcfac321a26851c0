//! Declarative data binding for HTML templates.
//!
//! Attributes prefixed with `mns-` name a binding and a path into the
//! model, e.g. `<h1 mns-text="person.name.first">`. `create_view`
//! binds a template element (from an `adom::Document`) to a model made
//! visible under a context name (here `person`); `View::update` binds
//! again after the model was changed.

pub mod warn;
pub mod error;
pub mod path;
pub mod value;
pub mod controller;
pub mod registry;
pub mod scanner;
pub mod view;
pub mod bindings;
pub mod repeat;

use std::rc::Rc;

use adom::{Document, NodeId};
use anyhow::Result;
use kstring::KString;

pub use crate::{controller::{Controller, Action, root_controller},
                error::BindError,
                registry::{Binding, BindingHandler, BindingRegistry, DEFAULT_PREFIX},
                view::{View, ViewOptions}};


pub fn create_view(
    doc: &mut Document,
    template: NodeId,
    options: ViewOptions,
) -> Result<View, BindError> {
    View::new(doc, template, options)
}

/// Add a binding to this thread's registry, used for attributes
/// `<prefix>-<name>` (and `<prefix>-<name>-<qualifier>`).
pub fn register_binding(
    name: &str,
    handler: impl Fn(&mut Document, &Binding<'_>) -> Result<()> + 'static,
) -> Result<(), BindError> {
    register_handler(name, Rc::new(handler))
}

pub fn register_handler(
    name: &str,
    handler: Rc<dyn BindingHandler>,
) -> Result<(), BindError> {
    registry::with_registry_mut(|r| r.register(name, handler))
}

/// Unknown names are ignored.
pub fn unregister_binding(name: &str) -> Result<(), BindError> {
    registry::with_registry_mut(|r| r.unregister(name))?;
    Ok(())
}

/// Affects views created or updated afterwards.
pub fn set_prefix(prefix: &str) -> Result<(), BindError> {
    registry::with_registry_mut(|r| r.set_prefix(prefix))
}

pub fn prefix() -> KString {
    registry::with_registry(|r| KString::from_ref(r.prefix()))
}
