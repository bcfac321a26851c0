//! Parse HTML fragments into `Document` nodes.

use std::collections::HashSet;

use anyhow::{Result, bail};
use html5gum::{Token, HtmlString};
use kstring::KString;
use lazy_static::lazy_static;

use crate::document::{Document, NodeId};


lazy_static!{
    // Elements without closing tag, https://html.spec.whatwg.org/#void-elements
    static ref VOID_ELEMENTS: HashSet<&'static str> = [
        "area", "base", "br", "col", "embed", "hr", "img", "input",
        "link", "meta", "source", "track", "wbr",
    ].into_iter().collect();
}

pub fn is_void_element(tag_name: &str) -> bool {
    VOID_ELEMENTS.contains(tag_name)
}

fn kstring(s: HtmlString) -> Result<KString> {
    Ok(KString::from_string(String::from_utf8(s.0)?))
}

impl Document {
    /// Parse `html` into new, detached nodes, returning the top-level
    /// ones in order. The tree building is simple: end tags close the
    /// innermost open element with the same name (stray end tags are
    /// ignored), elements still open at the end are closed
    /// implicitly, doctypes are dropped. On errors, the nodes created
    /// so far are freed again.
    pub fn parse_fragment(&mut self, html: &str) -> Result<Vec<NodeId>> {
        let mut toplevel: Vec<NodeId> = Vec::new();
        match self.parse_into(html, &mut toplevel) {
            Ok(()) => Ok(toplevel),
            Err(e) => {
                self.free_subtrees(toplevel);
                Err(e)
            }
        }
    }

    fn parse_into(&mut self, html: &str, toplevel: &mut Vec<NodeId>) -> Result<()> {
        let mut open: Vec<(NodeId, KString)> = Vec::new();

        for token in html5gum::Tokenizer::new(html).infallible() {
            match token {
                Token::StartTag(starttag) => {
                    let name = kstring(starttag.name)?;
                    let elt = self.create_element(&name);
                    // Attach first, so that it's freed on errors
                    self.attach(toplevel, &open, elt)?;
                    for (k, v) in starttag.attributes {
                        self.set_attribute(elt, &kstring(k)?, &kstring(v)?)?;
                    }
                    if ! (starttag.self_closing || is_void_element(&name)) {
                        open.push((elt, name));
                    }
                }
                Token::EndTag(endtag) => {
                    let name = kstring(endtag.name)?;
                    if let Some(pos) = open.iter().rposition(|(_, n)| *n == name) {
                        open.truncate(pos);
                    }
                }
                Token::String(s) => {
                    let node = self.create_text(&kstring(s)?);
                    self.attach(toplevel, &open, node)?;
                }
                Token::Comment(s) => {
                    let node = self.create_comment(&kstring(s)?);
                    self.attach(toplevel, &open, node)?;
                }
                Token::Doctype(_) => (),
                Token::Error(e) => bail!("HTML5 parsing error: {e} for {html:?}"),
            }
        }
        Ok(())
    }

    // `node` is new, thus can be linked without cycle check.
    fn attach(
        &mut self,
        toplevel: &mut Vec<NodeId>,
        open: &[(NodeId, KString)],
        node: NodeId,
    ) -> Result<()> {
        match open.last() {
            Some((parent, _)) => self.link(*parent, node),
            None => {
                toplevel.push(node);
                Ok(())
            }
        }
    }

    /// Replace the children of `id` with the nodes parsed from
    /// `html`; the old children are freed. On parse errors, `id` is
    /// left unchanged.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> Result<()> {
        if ! self.is_element(id) {
            bail!("set_inner_html: {id:?} is not an element")
        }
        let nodes = self.parse_fragment(html)?;
        self.remove_children(id)?;
        for node in nodes {
            self.link(id, node)?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_parse_nested() -> Result<()> {
        let mut doc = Document::new();
        let nodes = doc.parse_fragment(
            "<ul mns-each-song=\"band.songs\"><li mns-text=\"song.title\"></li></ul>text")?;
        assert_eq!(nodes.len(), 2);
        let ul = nodes[0];
        assert_eq!(doc.tag_name(ul), Some("ul"));
        assert_eq!(doc.get_attribute(ul, "mns-each-song"), Some("band.songs"));
        let lis = doc.element_children(ul);
        assert_eq!(lis.len(), 1);
        assert_eq!(doc.get_attribute(lis[0], "mns-text"), Some("song.title"));
        assert_eq!(doc.text_content(nodes[1]), "text");
        Ok(())
    }

    #[test]
    fn t_void_and_unclosed() -> Result<()> {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.set_inner_html(div, "<p>a<br>b</span><p>c")?;
        let ps = doc.element_children(div);
        // no implied end tags, the second p ends up inside the first
        assert_eq!(ps.len(), 1);
        assert_eq!(doc.text_content(div), "abc");
        let inner = doc.element_children(ps[0]);
        assert_eq!(doc.tag_name(inner[0]), Some("br"));
        assert!(doc.children(inner[0]).is_empty());
        Ok(())
    }

    #[test]
    fn t_entities() -> Result<()> {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.set_inner_html(div, "<a title=\"x &amp; y\">1 &lt; 2</a><!-- c -->")?;
        let a = doc.element_children(div)[0];
        assert_eq!(doc.get_attribute(a, "title"), Some("x & y"));
        assert_eq!(doc.text_content(a), "1 < 2");
        assert_eq!(doc.children(div).len(), 2);
        Ok(())
    }

    #[test]
    fn t_set_inner_html_frees_old_children() -> Result<()> {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.set_inner_html(div, "<p>a</p><p>b</p>")?;
        let old = doc.children(div)[0];
        let count = doc.node_count();
        for _ in 0..50 {
            doc.set_inner_html(div, "<p>a</p><p>b</p>")?;
        }
        assert_eq!(doc.node_count(), count);
        assert!(! doc.contains(old));
        Ok(())
    }
}
