//! Views: a template element bound to a model under a context name.

use std::rc::Rc;

use adom::{Document, NodeId};
use kstring::KString;
use serde_json::{Map, Value};

use crate::{controller::{Controller, root_controller},
            error::BindError,
            scanner::scan_node};


/// Arguments to `View::new`. `context` and `model` are required; a
/// missing `controller` means the thread's root controller.
#[derive(Debug, Default)]
pub struct ViewOptions {
    pub context: Option<KString>,
    pub model: Option<Value>,
    pub controller: Option<Rc<Controller>>,
}

impl ViewOptions {
    pub fn new(context: &str, model: Value) -> Self {
        ViewOptions {
            context: Some(KString::from_ref(context)),
            model: Some(model),
            controller: None,
        }
    }

    pub fn controller(mut self, controller: Rc<Controller>) -> Self {
        self.controller = Some(controller);
        self
    }
}

#[derive(Debug)]
pub struct View {
    template: NodeId,
    context: KString,
    // `{ context: model }`, what paths are resolved against
    scope: Value,
    controller: Rc<Controller>,
    nodes: Vec<NodeId>,
}

impl View {
    /// Binds `template` right away. The template is changed in place.
    pub fn new(
        doc: &mut Document,
        template: NodeId,
        options: ViewOptions,
    ) -> Result<View, BindError> {
        if ! doc.contains(template) {
            return Err(BindError::InvalidTemplate(format!(
                "{template:?} does not belong to this document")))
        }
        if ! doc.is_element(template) {
            return Err(BindError::InvalidTemplate(format!(
                "{template:?} is not an element")))
        }
        let context = match options.context {
            Some(c) if ! c.is_empty() => c,
            _ => return Err(BindError::MissingBindingContext("context"))
        };
        let model = match options.model {
            Some(m) if ! m.is_null() => m,
            _ => return Err(BindError::MissingBindingContext("model"))
        };
        let mut scope = Map::new();
        scope.insert(context.to_string(), model);
        let mut view = View {
            template,
            context,
            scope: Value::Object(scope),
            controller: options.controller.unwrap_or_else(root_controller),
            nodes: Vec::new(),
        };
        view.bind_model(doc);
        Ok(view)
    }

    /// Collects the elements below the template afresh and binds the
    /// template and all of them.
    pub fn bind_model(&mut self, doc: &mut Document) {
        self.nodes = doc.descendant_elements(self.template);
        self.scan(doc);
    }

    /// Binds again, with the current model contents (see
    /// `model_mut`), over the elements collected at construction
    /// time. Elements added since (e.g. by `each`) are not looked at,
    /// elements no longer below the template are skipped.
    pub fn update(&self, doc: &mut Document) {
        self.scan(doc);
    }

    // Document order matters: a binding replacing the children of its
    // node (each, html) runs before those children would be bound in
    // this scope; afterwards they are detached, and skipped.
    fn scan(&self, doc: &mut Document) {
        scan_node(doc, self.template, &self.scope, &self.controller);
        for node in &self.nodes {
            if doc.is_inclusive_ancestor(self.template, *node) {
                scan_node(doc, *node, &self.scope, &self.controller);
            }
        }
    }

    pub fn template(&self) -> NodeId {
        self.template
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn model(&self) -> &Value {
        &self.scope[self.context.as_str()]
    }

    /// Changes show up on the next `update`.
    pub fn model_mut(&mut self) -> &mut Value {
        &mut self.scope[self.context.as_str()]
    }

    pub fn scope(&self) -> &Value {
        &self.scope
    }

    pub fn controller(&self) -> &Rc<Controller> {
        &self.controller
    }

    /// The elements below the template as collected by the last
    /// `bind_model`.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }
}
