//! Controllers: named actions that `on-*` bindings attach to nodes as
//! event listeners.

use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use adom::{Document, Event, EventListener};
use anyhow::Result;
use kstring::KString;

/// Actions are event listeners; attaching the same action twice for
/// the same event is a no-op.
pub type Action = EventListener;

/// A mapping from names to actions. Uses interior mutability so that
/// actions can be added to a controller that views already refer to.
#[derive(Default)]
pub struct Controller {
    actions: RefCell<HashMap<KString, Action>>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder style variant of `define_fn`.
    pub fn with_action(
        self,
        name: &str,
        f: impl Fn(&mut Document, &Event) -> Result<()> + 'static,
    ) -> Self {
        self.define_fn(name, f);
        self
    }

    /// Returns the action previously defined under `name`.
    pub fn define(&self, name: &str, action: Action) -> Option<Action> {
        self.actions.borrow_mut().insert(KString::from_ref(name), action)
    }

    pub fn define_fn(
        &self,
        name: &str,
        f: impl Fn(&mut Document, &Event) -> Result<()> + 'static,
    ) -> Option<Action> {
        self.define(name, Rc::new(f))
    }

    pub fn remove(&self, name: &str) -> Option<Action> {
        self.actions.borrow_mut().remove(name)
    }

    pub fn action(&self, name: &str) -> Option<Action> {
        self.actions.borrow().get(name).cloned()
    }

    pub fn names(&self) -> Vec<KString> {
        let mut names: Vec<KString> = self.actions.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("actions", &self.names())
            .finish()
    }
}

thread_local! {
    static ROOT_CONTROLLER: Rc<Controller> = Rc::new(Controller::new());
}

/// The controller of views created without one. There is one per
/// thread.
pub fn root_controller() -> Rc<Controller> {
    ROOT_CONTROLLER.with(|c| c.clone())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_define_lookup() {
        let c = Controller::new()
            .with_action("save", |_, _| Ok(()));
        let save = c.action("save").unwrap();
        assert!(Rc::ptr_eq(&save, &c.action("save").unwrap()));
        assert!(c.action("load").is_none());
        assert!(c.remove("save").is_some());
        assert!(c.names().is_empty());
    }

    #[test]
    fn t_root_is_shared_per_thread() {
        root_controller().define_fn("t_root_is_shared_per_thread", |_, _| Ok(()));
        assert!(root_controller().action("t_root_is_shared_per_thread").is_some());
        std::thread::spawn(|| {
            assert!(root_controller().action("t_root_is_shared_per_thread").is_none());
        }).join().unwrap();
    }
}
