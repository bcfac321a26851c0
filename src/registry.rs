//! Binding handlers by name, plus the attribute prefix that marks
//! bound attributes.
//!
//! There is one registry per thread (initialised with the built-in
//! bindings on first use), reachable via `with_registry` and
//! `with_registry_mut`. Views consult it on every scan, so changes
//! apply to views created or updated afterwards. The scanner releases
//! the registry before calling a handler, so handlers are free to
//! create views or change the registry themselves.

use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use adom::{Document, NodeId};
use anyhow::Result;
use kstring::KString;
use serde_json::Value;

use crate::{bindings, controller::Controller, error::BindError};

pub const DEFAULT_PREFIX: &str = "mns";

/// What a handler gets to know about one bound attribute.
#[derive(Debug)]
pub struct Binding<'b> {
    pub node: NodeId,
    /// The full attribute name, e.g. `mns-attr-href`.
    pub attribute: &'b str,
    /// The attribute value as written, usually a path.
    pub value: &'b str,
    /// `value` resolved in the view's scope, `None` if missing or null.
    pub value_from_model: Option<&'b Value>,
    pub controller: &'b Rc<Controller>,
    /// The prefix in force, e.g. `mns`.
    pub prefix: &'b str,
}

impl<'b> Binding<'b> {
    /// The part of the attribute name after `<prefix>-<kind>-`,
    /// e.g. `href` for `mns-attr-href` and kind `attr`. `None` if the
    /// attribute isn't of that form or nothing follows.
    pub fn qualifier(&self, kind: &str) -> Option<&'b str> {
        let attribute: &'b str = self.attribute;
        let rest = attribute.strip_prefix(self.prefix)?
            .strip_prefix('-')?
            .strip_prefix(kind)?
            .strip_prefix('-')?;
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}

pub trait BindingHandler {
    fn bind(&self, doc: &mut Document, binding: &Binding<'_>) -> Result<()>;
}

impl<F> BindingHandler for F
where F: Fn(&mut Document, &Binding<'_>) -> Result<()>
{
    fn bind(&self, doc: &mut Document, binding: &Binding<'_>) -> Result<()> {
        self(doc, binding)
    }
}

// Binding names and the prefix are matched against attribute names
// cut at hyphens, thus they can't contain any.
fn check_name(what: &str, name: &str) -> Result<(), BindError> {
    if name.is_empty() {
        return Err(BindError::InvalidArgument(format!("{what} must not be empty")))
    }
    if name.contains(|c: char| c == '-' || c.is_whitespace()) {
        return Err(BindError::InvalidArgument(format!(
            "{what} {name:?} must not contain hyphens or whitespace")))
    }
    Ok(())
}

pub struct BindingRegistry {
    prefix: KString,
    handlers: HashMap<KString, Rc<dyn BindingHandler>>,
}

impl BindingRegistry {
    /// Without any bindings, with the default prefix.
    pub fn empty() -> Self {
        BindingRegistry {
            prefix: KString::from_static(DEFAULT_PREFIX),
            handlers: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for (name, handler) in bindings::builtins() {
            registry.handlers.insert(KString::from_static(name), handler);
        }
        registry
    }

    pub fn register(
        &mut self,
        name: &str,
        handler: Rc<dyn BindingHandler>,
    ) -> Result<(), BindError> {
        check_name("binding name", name)?;
        if self.handlers.contains_key(name) {
            return Err(BindError::DuplicateBinding(KString::from_ref(name)))
        }
        self.handlers.insert(KString::from_ref(name), handler);
        Ok(())
    }

    /// Removing a name that isn't registered is not an error; returns
    /// the removed handler, if any.
    pub fn unregister(
        &mut self,
        name: &str,
    ) -> Result<Option<Rc<dyn BindingHandler>>, BindError> {
        if name.is_empty() {
            return Err(BindError::InvalidArgument("binding name must not be empty".into()))
        }
        Ok(self.handlers.remove(name))
    }

    pub fn lookup(&self, name: &str) -> Option<Rc<dyn BindingHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Sorted.
    pub fn names(&self) -> Vec<KString> {
        let mut names: Vec<KString> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `prefix` is given without the separating hyphen. Attribute
    /// names are lower case in parsed HTML, so is the prefix.
    pub fn set_prefix(&mut self, prefix: &str) -> Result<(), BindError> {
        check_name("prefix", prefix)?;
        if prefix.chars().any(|c| c.is_uppercase()) {
            return Err(BindError::InvalidArgument(format!(
                "prefix {prefix:?} must be lower case")))
        }
        self.prefix = KString::from_ref(prefix);
        Ok(())
    }
}

impl fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("prefix", &self.prefix)
            .field("handlers", &self.names())
            .finish()
    }
}

thread_local! {
    static REGISTRY: RefCell<BindingRegistry> = RefCell::new(BindingRegistry::with_builtins());
}

/// Panics if called from within `with_registry_mut`.
pub fn with_registry<R>(f: impl FnOnce(&BindingRegistry) -> R) -> R {
    REGISTRY.with(|r| f(&r.borrow()))
}

/// Panics if called from within `with_registry` or
/// `with_registry_mut`.
pub fn with_registry_mut<R>(f: impl FnOnce(&mut BindingRegistry) -> R) -> R {
    REGISTRY.with(|r| f(&mut r.borrow_mut()))
}


#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut Document, _: &Binding<'_>) -> Result<()> {
        Ok(())
    }

    #[test]
    fn t_builtins() {
        let r = BindingRegistry::with_builtins();
        assert_eq!(r.names().len(), 9);
        for name in ["attr", "class", "data", "each", "hide", "html", "on", "show", "text"] {
            assert!(r.contains(name), "{name}");
        }
        assert_eq!(r.prefix(), "mns");
    }

    #[test]
    fn t_register_lookup() -> Result<()> {
        let mut r = BindingRegistry::empty();
        let handler: Rc<dyn BindingHandler> = Rc::new(noop);
        r.register("sample", handler.clone())?;
        let found = r.lookup("sample").unwrap();
        assert!(Rc::ptr_eq(&found, &handler));
        assert_eq!(r.register("sample", Rc::new(noop)),
                   Err(BindError::DuplicateBinding(KString::from_static("sample"))));
        assert!(r.unregister("sample")?.is_some());
        assert!(r.lookup("sample").is_none());
        assert!(r.unregister("sample")?.is_none());
        Ok(())
    }

    #[test]
    fn t_invalid_names() {
        let mut r = BindingRegistry::empty();
        for name in ["", "a-b", "a b"] {
            match r.register(name, Rc::new(noop)) {
                Err(BindError::InvalidArgument(_)) => (),
                other => panic!("{name:?}: {other:?}"),
            }
        }
        assert!(matches!(r.unregister(""), Err(BindError::InvalidArgument(_))));
        assert!(matches!(r.set_prefix(""), Err(BindError::InvalidArgument(_))));
        assert!(matches!(r.set_prefix("data-"), Err(BindError::InvalidArgument(_))));
        assert!(matches!(r.set_prefix("Mns"), Err(BindError::InvalidArgument(_))));
        assert_eq!(r.set_prefix("bind"), Ok(()));
        assert_eq!(r.prefix(), "bind");
    }

    #[test]
    fn t_qualifier() {
        let controller = Rc::new(Controller::new());
        let mut doc = Document::new();
        let node = doc.create_element("a");
        let binding = |attribute| Binding {
            node,
            attribute,
            value: "x.y",
            value_from_model: None,
            controller: &controller,
            prefix: "mns",
        };
        assert_eq!(binding("mns-attr-href").qualifier("attr"), Some("href"));
        assert_eq!(binding("mns-attr-aria-label").qualifier("attr"), Some("aria-label"));
        assert_eq!(binding("mns-attr-").qualifier("attr"), None);
        assert_eq!(binding("mns-attr").qualifier("attr"), None);
        assert_eq!(binding("mns-data-id").qualifier("attr"), None);
    }
}
