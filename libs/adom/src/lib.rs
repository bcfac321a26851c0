//! Mutable html dom abstraction, nodes living in a `Document` arena
//! and addressed via `NodeId` handles.

pub mod document;
pub mod parse;
pub mod print;
pub mod style;

pub use document::{Document, NodeId, Node, Element, Event, EventListener};
pub use parse::is_void_element;
