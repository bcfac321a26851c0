//! Helpers for the `class` and `style` attributes.

use anyhow::Result;

use crate::document::{Document, NodeId};


// "a: b; c: d" -> [("a", "b"), ("c", "d")]; entries without colon are
// dropped.
fn parse_declarations(style: &str) -> Vec<(&str, &str)> {
    style.split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let k = k.trim();
            if k.is_empty() {
                None
            } else {
                Some((k, v.trim()))
            }
        })
        .collect()
}

impl Document {
    pub fn class_list(&self, id: NodeId) -> Vec<&str> {
        self.get_attribute(id, "class")
            .map(|c| c.split_ascii_whitespace().collect())
            .unwrap_or_default()
    }

    /// Adds `class` to the `class` attribute unless already there
    /// (like `classList.add`). Returns whether it was added.
    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<bool> {
        let class = class.trim();
        if class.is_empty() || self.class_list(id).contains(&class) {
            return Ok(false)
        }
        let new = match self.get_attribute(id, "class") {
            Some(old) if ! old.trim().is_empty() => format!("{} {class}", old.trim_end()),
            _ => class.to_string(),
        };
        self.set_attribute(id, "class", &new)?;
        Ok(true)
    }

    pub fn style_property(&self, id: NodeId, property: &str) -> Option<String> {
        let style = self.get_attribute(id, "style")?;
        parse_declarations(style).into_iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(property))
            .map(|(_, v)| v.to_string())
    }

    /// Sets (or replaces) a declaration in the `style` attribute,
    /// keeping the other ones.
    pub fn set_style_property(&mut self, id: NodeId, property: &str, value: &str) -> Result<()> {
        let mut decls: Vec<String> = Vec::new();
        if let Some(style) = self.get_attribute(id, "style") {
            for (k, v) in parse_declarations(style) {
                if ! k.eq_ignore_ascii_case(property) {
                    decls.push(format!("{k}: {v}"));
                }
            }
        }
        decls.push(format!("{property}: {value}"));
        let new = decls.join("; ");
        self.set_attribute(id, "style", &new)
    }
}
