use std::{collections::BTreeMap,
          fmt,
          rc::Rc,
          sync::atomic::{AtomicU32, Ordering}};

use anyhow::{Result, bail, anyhow};
use kstring::KString;


static NEXT_DOCUMENT_ID: AtomicU32 = AtomicU32::new(0);

/// Handle to a node in a `Document`. Only valid for the document
/// that created it, and only until the node is freed; passing it to
/// another document or using it after `remove` gives errors (or
/// `None`), never a different node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    document_id: u32,
    index: u32,
    // Of the slot at `index` when the node was allocated
    generation: u32,
}

impl NodeId {
    /// Position in the arena, for diagnostics.
    pub fn index(self) -> u32 {
        self.index
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: KString,
    /// The node `dispatch_event` was called on.
    pub target: NodeId,
}

/// Listeners get the document to allow them to change it.
pub type EventListener = Rc<dyn Fn(&mut Document, &Event) -> Result<()>>;

pub struct Element {
    pub tag_name: KString,
    attributes: Vec<(KString, KString)>,
    children: Vec<NodeId>,
    listeners: Vec<(KString, EventListener)>,
    // Detached nodes stored on behalf of whoever manipulates the
    // element, not part of the tree, not cloned.
    fragments: BTreeMap<KString, NodeId>,
}

impl Element {
    fn new(tag_name: KString) -> Self {
        Element {
            tag_name,
            attributes: Vec::new(),
            children: Vec::new(),
            listeners: Vec::new(),
            fragments: BTreeMap::new(),
        }
    }

    /// In the order they were added (parsing adds them sorted by
    /// name).
    pub fn attributes(&self) -> &[(KString, KString)] {
        &self.attributes
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag_name", &self.tag_name)
            .field("attributes", &self.attributes)
            .field("children", &self.children)
            .field("listeners", &self.listeners.len())
            .field("fragments", &self.fragments)
            .finish()
    }
}

#[derive(Debug)]
pub enum Node {
    Element(Element),
    Text(KString),
    Comment(KString),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None
        }
    }
}

#[derive(Debug)]
struct Slot {
    // Bumped on every free; a slot whose generation reached u32::MAX
    // is not reused any more.
    generation: u32,
    parent: Option<NodeId>,
    // None: free
    node: Option<Node>,
}

/// Owns all nodes, attached to a tree or not. Detached nodes stay
/// allocated until they are freed via `remove` (or by one of the
/// operations replacing children); freed slots are reused.
#[derive(Debug)]
pub struct Document {
    id: u32,
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Document {
            id: NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    fn slot_index(&self, id: NodeId) -> Option<usize> {
        if id.document_id != self.id {
            return None
        }
        let i = id.index as usize;
        match self.slots.get(i) {
            Some(slot) if slot.generation == id.generation && slot.node.is_some() => Some(i),
            _ => None
        }
    }

    fn slot(&self, id: NodeId) -> Result<&Slot> {
        let i = self.slot_index(id).ok_or_else(
            || anyhow!("node {id:?} does not belong to this document (or was freed)"))?;
        Ok(&self.slots[i])
    }

    fn slot_mut(&mut self, id: NodeId) -> Result<&mut Slot> {
        let i = self.slot_index(id).ok_or_else(
            || anyhow!("node {id:?} does not belong to this document (or was freed)"))?;
        Ok(&mut self.slots[i])
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.parent = None;
            slot.node = Some(node);
            return NodeId { document_id: self.id, index, generation: slot.generation }
        }
        // Slots are reused, thus this means more than u32::MAX live
        // nodes
        let index = match u32::try_from(self.slots.len()) {
            Ok(index) => index,
            Err(_) => panic!("Document: node index space exhausted")
        };
        self.slots.push(Slot { generation: 0, parent: None, node: Some(node) });
        NodeId { document_id: self.id, index, generation: 0 }
    }

    fn release(&mut self, i: usize) {
        let slot = &mut self.slots[i];
        slot.parent = None;
        slot.node = None;
        self.live -= 1;
        if slot.generation < u32::MAX {
            slot.generation += 1;
            self.free.push(i as u32);
        }
    }

    /// Frees the given (detached) nodes with everything below them,
    /// plus the fragments stored on the freed elements as long as
    /// those are still detached.
    pub(crate) fn free_subtrees(&mut self, roots: Vec<NodeId>) {
        let mut stack = roots;
        while let Some(id) = stack.pop() {
            let i = match self.slot_index(id) {
                Some(i) => i,
                None => continue
            };
            let node = self.slots[i].node.take();
            self.release(i);
            if let Some(Node::Element(e)) = node {
                stack.extend(e.children);
                for fragment in e.fragments.into_values() {
                    if self.parent(fragment).is_none() {
                        stack.push(fragment);
                    }
                }
            }
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slot_index(id).is_some()
    }

    /// Number of live nodes, attached to a tree or not.
    pub fn node_count(&self) -> usize {
        self.live
    }

    /// Number of slots in the arena, free ones included.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.slot_index(id).and_then(|i| self.slots[i].node.as_ref())
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.get_node(id).and_then(Node::as_element)
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> Result<&mut Element> {
        match &mut self.slot_mut(id)?.node {
            Some(Node::Element(e)) => Ok(e),
            _ => bail!("node {id:?} is not an element")
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag_name.as_str())
    }

    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.push(Node::Element(Element::new(KString::from_ref(tag_name))))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(Node::Text(KString::from_ref(text)))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(Node::Comment(KString::from_ref(text)))
    }

    // ------------------------------------------------------------------
    // Tree structure

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot_index(id).and_then(|i| self.slots[i].parent)
    }

    /// Empty for non-elements and unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.element(id) {
            Some(e) => &e.children,
            None => &[]
        }
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    /// Whether `node` is `ancestor` or lies somewhere below it.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true
            }
            current = self.parent(n);
        }
        false
    }

    /// All elements below `id` (not including it), in document order.
    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            if let Some(e) = self.element(n) {
                result.push(n);
                stack.extend(e.children.iter().rev());
            }
        }
        result
    }

    /// Remove `id` from its parent, if it has one.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        let parent = self.slot(id)?.parent;
        if let Some(parent) = parent {
            self.element_mut(parent)?.children.retain(|c| *c != id);
            self.slot_mut(id)?.parent = None;
        }
        Ok(())
    }

    /// Moves `child` to the end of `parent`'s children, detaching it
    /// from where it was.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.slot(child)?;
        if ! self.is_element(parent) {
            bail!("append_child: parent {parent:?} is not an element")
        }
        if self.is_inclusive_ancestor(child, parent) {
            bail!("append_child: {child:?} is {parent:?} or one of its ancestors")
        }
        self.detach(child)?;
        self.link(parent, child)
    }

    // `child` must be detached and not an ancestor of `parent`.
    pub(crate) fn link(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.element_mut(parent)?.children.push(child);
        self.slot_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Detaches all children of `id`. They stay allocated (see
    /// `remove_children`).
    pub fn clear_children(&mut self, id: NodeId) -> Result<()> {
        let children = std::mem::take(&mut self.element_mut(id)?.children);
        for child in children {
            self.slot_mut(child)?.parent = None;
        }
        Ok(())
    }

    /// Detaches `id` and frees it together with its subtree and the
    /// fragments stored on the freed elements. Handles to any of these
    /// become invalid.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        self.detach(id)?;
        self.free_subtrees(vec![id]);
        Ok(())
    }

    /// Frees all children of `id`, like `remove` on each of them.
    pub fn remove_children(&mut self, id: NodeId) -> Result<()> {
        let children = std::mem::take(&mut self.element_mut(id)?.children);
        self.free_subtrees(children);
        Ok(())
    }

    fn shallow_clone(&mut self, id: NodeId) -> Result<NodeId> {
        let node = match self.get_node(id) {
            Some(Node::Element(e)) => {
                let mut copy = Element::new(e.tag_name.clone());
                copy.attributes = e.attributes.clone();
                Node::Element(copy)
            }
            Some(Node::Text(s)) => Node::Text(s.clone()),
            Some(Node::Comment(s)) => Node::Comment(s.clone()),
            None => bail!("deep_clone: node {id:?} does not belong to this document \
                           (or was freed)")
        };
        Ok(self.push(node))
    }

    /// Detached copy of the subtree at `id`. Attributes and children
    /// are copied, event listeners and fragments are not.
    pub fn deep_clone(&mut self, id: NodeId) -> Result<NodeId> {
        let root = self.shallow_clone(id)?;
        // (original, parent of its copy)
        let mut stack: Vec<(NodeId, NodeId)> =
            self.children(id).iter().rev().map(|c| (*c, root)).collect();
        while let Some((original, parent)) = stack.pop() {
            let copy = self.shallow_clone(original)?;
            self.link(parent, copy)?;
            stack.extend(self.children(original).iter().rev().map(|c| (*c, copy)));
        }
        Ok(root)
    }

    // ------------------------------------------------------------------
    // Attributes

    /// Empty for non-elements and unknown ids.
    pub fn attributes(&self, id: NodeId) -> &[(KString, KString)] {
        match self.element(id) {
            Some(e) => &e.attributes,
            None => &[]
        }
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.get_attribute(name))
    }

    /// Replaces the value in place if the attribute exists, appends
    /// it otherwise.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        if name.is_empty() {
            bail!("set_attribute: empty attribute name")
        }
        let e = self.element_mut(id)?;
        if let Some(att) = e.attributes.iter_mut().find(|(k, _)| k.as_str() == name) {
            att.1 = KString::from_ref(value);
        } else {
            e.attributes.push((KString::from_ref(name), KString::from_ref(value)));
        }
        Ok(())
    }

    /// Returns whether the attribute was present.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<bool> {
        let e = self.element_mut(id)?;
        let len = e.attributes.len();
        e.attributes.retain(|(k, _)| k.as_str() != name);
        Ok(e.attributes.len() != len)
    }

    // ------------------------------------------------------------------
    // Text

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            match self.get_node(n) {
                Some(Node::Element(e)) => stack.extend(e.children.iter().rev()),
                Some(Node::Text(s)) => out.push_str(s),
                Some(Node::Comment(_)) | None => (),
            }
        }
        out
    }

    /// Replaces all children with a single text node (or none, if
    /// `text` is empty). The old children are freed.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<()> {
        self.remove_children(id)?;
        if ! text.is_empty() {
            let t = self.create_text(text);
            self.link(id, t)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Events

    /// Returns false if this same listener was already registered for
    /// `event_type`, in which case nothing changes.
    pub fn add_event_listener(
        &mut self,
        id: NodeId,
        event_type: &str,
        listener: EventListener,
    ) -> Result<bool> {
        let e = self.element_mut(id)?;
        if e.listeners.iter().any(
            |(t, l)| t.as_str() == event_type && Rc::ptr_eq(l, &listener))
        {
            return Ok(false)
        }
        e.listeners.push((KString::from_ref(event_type), listener));
        Ok(true)
    }

    pub fn listener_count(&self, id: NodeId, event_type: &str) -> usize {
        self.element(id).map_or(0, |e| {
            e.listeners.iter().filter(|(t, _)| t.as_str() == event_type).count()
        })
    }

    /// Calls all listeners for `event_type` on `id` (there is no
    /// bubbling), in registration order. All of them are run even if
    /// some fail; the first error is returned. Returns the number of
    /// listeners called otherwise.
    pub fn dispatch_event(&mut self, id: NodeId, event_type: &str) -> Result<usize> {
        let listeners: Vec<EventListener> = self.element(id)
            .ok_or_else(|| anyhow!("dispatch_event: {id:?} is not an element \
                                    of this document"))?
            .listeners.iter()
            .filter(|(t, _)| t.as_str() == event_type)
            .map(|(_, l)| l.clone())
            .collect();
        let event = Event {
            event_type: KString::from_ref(event_type),
            target: id,
        };
        let mut first_error = None;
        for listener in &listeners {
            if let Err(e) = listener(self, &event) {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e.context(format!("listener for {event_type:?} on {id:?}"))),
            None => Ok(listeners.len())
        }
    }

    // ------------------------------------------------------------------
    // Fragments

    /// Store the detached node `fragment` on element `id` under
    /// `key`, returning the one previously stored there (which is
    /// left alone). Stored fragments are freed with `id`.
    pub fn set_fragment(
        &mut self,
        id: NodeId,
        key: &str,
        fragment: NodeId,
    ) -> Result<Option<NodeId>> {
        if self.slot(fragment)?.parent.is_some() {
            bail!("set_fragment: {fragment:?} is attached to a tree")
        }
        Ok(self.element_mut(id)?.fragments.insert(KString::from_ref(key), fragment))
    }

    pub fn fragment(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self.element(id).and_then(|e| e.fragments.get(key).copied())
    }
}


#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use super::*;

    fn sample(doc: &mut Document) -> (NodeId, NodeId, NodeId) {
        let ul = doc.create_element("ul");
        let li = doc.create_element("li");
        let t = doc.create_text("one");
        doc.append_child(li, t).unwrap();
        doc.append_child(ul, li).unwrap();
        (ul, li, t)
    }

    #[test]
    fn t_append_moves() -> Result<()> {
        let mut doc = Document::new();
        let (ul, li, _) = sample(&mut doc);
        let ol = doc.create_element("ol");
        doc.append_child(ol, li)?;
        assert!(doc.children(ul).is_empty());
        assert_eq!(doc.children(ol), &[li]);
        assert_eq!(doc.parent(li), Some(ol));
        assert!(doc.append_child(li, ol).is_err());
        assert!(doc.append_child(li, li).is_err());
        Ok(())
    }

    #[test]
    fn t_foreign_ids() {
        let mut doc1 = Document::new();
        let doc2 = Document::new();
        let (ul, _, _) = sample(&mut doc1);
        assert!(doc1.contains(ul));
        assert!(! doc2.contains(ul));
        assert!(doc2.element(ul).is_none());
    }

    #[test]
    fn t_clone_and_clear() -> Result<()> {
        let mut doc = Document::new();
        let (ul, li, _) = sample(&mut doc);
        doc.set_attribute(li, "class", "x")?;
        let copy = doc.deep_clone(ul)?;
        assert_eq!(doc.parent(copy), None);
        let copy_li = doc.element_children(copy)[0];
        assert_ne!(copy_li, li);
        assert_eq!(doc.get_attribute(copy_li, "class"), Some("x"));
        assert_eq!(doc.text_content(copy), "one");

        doc.clear_children(ul)?;
        assert!(doc.children(ul).is_empty());
        assert_eq!(doc.parent(li), None);
        assert_eq!(doc.text_content(copy), "one");
        Ok(())
    }

    #[test]
    fn t_descendants_in_document_order() -> Result<()> {
        let mut doc = Document::new();
        let (ul, li, _) = sample(&mut doc);
        let span = doc.create_element("span");
        doc.append_child(li, span)?;
        let li2 = doc.create_element("li");
        doc.append_child(ul, li2)?;
        assert_eq!(doc.descendant_elements(ul), vec![li, span, li2]);
        assert!(doc.is_inclusive_ancestor(ul, span));
        assert!(! doc.is_inclusive_ancestor(li2, span));
        Ok(())
    }

    #[test]
    fn t_attributes() -> Result<()> {
        let mut doc = Document::new();
        let a = doc.create_element("a");
        doc.set_attribute(a, "href", "/x")?;
        doc.set_attribute(a, "title", "t")?;
        doc.set_attribute(a, "href", "/y")?;
        assert_eq!(doc.attributes(a)[0].1.as_str(), "/y");
        assert_eq!(doc.attributes(a).len(), 2);
        assert!(doc.remove_attribute(a, "title")?);
        assert!(! doc.remove_attribute(a, "title")?);
        let t = doc.create_text("x");
        assert!(doc.set_attribute(t, "href", "/x").is_err());
        Ok(())
    }

    #[test]
    fn t_events() -> Result<()> {
        let mut doc = Document::new();
        let button = doc.create_element("button");
        let counter = Rc::new(Cell::new(0));
        let c = counter.clone();
        let listener: EventListener = Rc::new(move |doc: &mut Document, ev: &Event| {
            c.set(c.get() + 1);
            doc.set_text_content(ev.target, "clicked")
        });
        assert!(doc.add_event_listener(button, "click", listener.clone())?);
        assert!(! doc.add_event_listener(button, "click", listener)?);
        assert_eq!(doc.dispatch_event(button, "click")?, 1);
        assert_eq!(doc.dispatch_event(button, "submit")?, 0);
        assert_eq!(counter.get(), 1);
        assert_eq!(doc.text_content(button), "clicked");
        Ok(())
    }

    #[test]
    fn t_remove_frees_and_reuses() -> Result<()> {
        let mut doc = Document::new();
        let (ul, li, t) = sample(&mut doc);
        assert_eq!(doc.node_count(), 3);
        doc.remove(li)?;
        assert!(doc.children(ul).is_empty());
        assert!(! doc.contains(li));
        assert!(! doc.contains(t));
        assert_eq!(doc.node_count(), 1);
        // the slots get reused, the old handles stay invalid
        let a = doc.create_element("a");
        let b = doc.create_text("b");
        assert_eq!(doc.slot_count(), 3);
        assert!(a != li && a != t && b != li && b != t);
        assert!(doc.element(li).is_none());
        assert_eq!(doc.text_content(t), "");
        assert!(doc.append_child(ul, li).is_err());
        assert!(doc.remove(li).is_err());
        Ok(())
    }

    #[test]
    fn t_replacing_children_frees_them() -> Result<()> {
        let mut doc = Document::new();
        let (ul, li, t) = sample(&mut doc);
        let kept = doc.deep_clone(li)?;
        doc.set_fragment(li, "k", kept)?;
        doc.set_text_content(ul, "x")?;
        assert!(! doc.contains(li) && ! doc.contains(t) && ! doc.contains(kept));
        assert_eq!(doc.node_count(), 2);
        for _ in 0..100 {
            doc.set_text_content(ul, "y")?;
        }
        assert_eq!(doc.node_count(), 2);
        assert!(doc.slot_count() <= 5);
        doc.remove_children(ul)?;
        assert_eq!(doc.node_count(), 1);
        Ok(())
    }

    #[test]
    fn t_deep_nesting() -> Result<()> {
        let mut doc = Document::new();
        // built from the inside out, the other way round append_child
        // walks up the whole chain every time
        let mut root = doc.create_text("deep");
        for _ in 0..200_000 {
            let div = doc.create_element("div");
            doc.append_child(div, root)?;
            root = div;
        }
        let copy = doc.deep_clone(root)?;
        assert_eq!(doc.text_content(copy), "deep");
        assert_eq!(doc.node_count(), 2 * 200_001);
        doc.remove(copy)?;
        doc.remove(root)?;
        assert_eq!(doc.node_count(), 0);
        Ok(())
    }

    #[test]
    fn t_fragments() -> Result<()> {
        let mut doc = Document::new();
        let (ul, li, _) = sample(&mut doc);
        let f = doc.deep_clone(li)?;
        assert_eq!(doc.set_fragment(ul, "k", f)?, None);
        assert_eq!(doc.fragment(ul, "k"), Some(f));
        assert_eq!(doc.fragment(ul, "other"), None);
        let copy = doc.deep_clone(ul)?;
        assert_eq!(doc.fragment(copy, "k"), None);
        assert!(doc.set_fragment(copy, "k", li).is_err());
        Ok(())
    }
}
