//! Serialise nodes back to HTML.

use crate::{document::{Document, NodeId, Node},
            parse::is_void_element};


/// `s` escaped for use in text as well as in double-quoted attribute
/// values.
pub fn html_escape(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c)
        }
    }
}

enum Step {
    Node(NodeId),
    EndTag(NodeId),
}

impl Document {
    pub fn print_html(&self, id: NodeId, out: &mut String) {
        let mut stack = vec![Step::Node(id)];
        while let Some(step) = stack.pop() {
            let id = match step {
                Step::Node(id) => id,
                Step::EndTag(id) => {
                    if let Some(tag_name) = self.tag_name(id) {
                        out.push_str("</");
                        out.push_str(tag_name);
                        out.push('>');
                    }
                    continue
                }
            };
            match self.get_node(id) {
                Some(Node::Element(e)) => {
                    out.push('<');
                    out.push_str(&e.tag_name);
                    for (k, v) in e.attributes() {
                        out.push(' ');
                        out.push_str(k); // XX no escape ever needed?
                        out.push_str("=\"");
                        html_escape(v, out);
                        out.push('"');
                    }
                    out.push('>');
                    if ! is_void_element(&e.tag_name) {
                        stack.push(Step::EndTag(id));
                    }
                    stack.extend(e.children().iter().rev().map(|c| Step::Node(*c)));
                }
                Some(Node::Text(s)) => html_escape(s, out),
                Some(Node::Comment(s)) => {
                    out.push_str("<!--");
                    out.push_str(s);
                    out.push_str("-->");
                }
                None => (),
            }
        }
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.print_html(id, &mut out);
        out
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.print_html(*child, &mut out);
        }
        out
    }
}
