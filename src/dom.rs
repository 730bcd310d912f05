//! Minimal document tree used as the render target.
//!
//! Elements are reference-counted handles: cloning an [`Element`] yields a
//! second handle to the same node, which is how the renderer keeps explicit
//! references to the page regions it owns. The tree is single-threaded
//! (`Rc<RefCell<_>>`), matching the synchronous dispatch model of the view.
//!
//! Text is only ever stored as text nodes. There is no way to inject markup
//! through this API, and [`Element::outer_html`] escapes every text node and
//! attribute value on output.

use quick_xml::escape::escape;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A child of an element: either another element or a run of plain text.
#[derive(Clone)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

#[derive(Default)]
struct ElementData {
    tag: String,
    /// Attributes in insertion order, `class` excluded.
    attributes: Vec<(String, String)>,
    classes: Vec<String>,
    children: Vec<Node>,
}

/// Shared handle to an element node.
#[derive(Clone)]
pub struct Element(Rc<RefCell<ElementData>>);

impl Element {
    pub fn new(tag: &str) -> Self {
        Self(Rc::new(RefCell::new(ElementData {
            tag: tag.to_string(),
            ..Default::default()
        })))
    }

    /// Builder shorthand for `new` followed by `set_attribute("class", ..)`.
    pub fn with_class(tag: &str, class: &str) -> Self {
        let element = Self::new(tag);
        element.set_attribute("class", class);
        element
    }

    pub fn tag(&self) -> String {
        self.0.borrow().tag.clone()
    }

    /// True if both handles point at the same node.
    pub fn same_node(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Sets an attribute. `class` replaces the whole class list.
    pub fn set_attribute(&self, name: &str, value: &str) {
        let mut data = self.0.borrow_mut();
        if name == "class" {
            data.classes = value.split_whitespace().map(str::to_string).collect();
            return;
        }
        match data.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => data.attributes.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attribute(&self, name: &str) {
        let mut data = self.0.borrow_mut();
        if name == "class" {
            data.classes.clear();
            return;
        }
        data.attributes.retain(|(k, _)| k != name);
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        let data = self.0.borrow();
        if name == "class" {
            return (!data.classes.is_empty()).then(|| data.classes.join(" "));
        }
        data.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    // ------------------------------------------------------------------
    // Class list
    // ------------------------------------------------------------------

    pub fn add_class(&self, class: &str) {
        let mut data = self.0.borrow_mut();
        if !data.classes.iter().any(|c| c == class) {
            data.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&self, class: &str) {
        self.0.borrow_mut().classes.retain(|c| c != class);
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.0.borrow().classes.iter().any(|c| c == class)
    }

    // ------------------------------------------------------------------
    // Children and text
    // ------------------------------------------------------------------

    pub fn append_child(&self, child: impl Into<Node>) {
        self.0.borrow_mut().children.push(child.into());
    }

    /// Replaces all children in one step.
    ///
    /// Callers build the new subtree first and swap it in here, so the element
    /// never holds a mix of old and new children.
    pub fn replace_children(&self, children: Vec<Node>) {
        self.0.borrow_mut().children = children;
    }

    /// Replaces the children with a single text node.
    pub fn set_text_content(&self, text: &str) {
        let children = if text.is_empty() {
            Vec::new()
        } else {
            vec![Node::Text(text.to_string())]
        };
        self.replace_children(children);
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in self.0.borrow().children.iter() {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => element.collect_text(out),
            }
        }
    }

    /// Element children, in order.
    pub fn children(&self) -> Vec<Element> {
        self.0
            .borrow()
            .children
            .iter()
            .filter_map(|child| match child {
                Node::Element(element) => Some(element.clone()),
                Node::Text(_) => None,
            })
            .collect()
    }

    pub fn child_count(&self) -> usize {
        self.0.borrow().children.len()
    }

    /// Every descendant element in document order, not including `self`.
    pub fn descendants(&self) -> Vec<Element> {
        let mut out = Vec::new();
        for child in self.children() {
            out.push(child.clone());
            out.extend(child.descendants());
        }
        out
    }

    /// Descendants with the given tag, in document order.
    pub fn find_all_by_tag(&self, tag: &str) -> Vec<Element> {
        self.descendants()
            .into_iter()
            .filter(|e| e.0.borrow().tag == tag)
            .collect()
    }

    /// First descendant carrying the given class.
    pub fn find_by_class(&self, class: &str) -> Option<Element> {
        self.descendants().into_iter().find(|e| e.has_class(class))
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serializes the element and its subtree as HTML.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    /// Serializes the children only.
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in self.0.borrow().children.iter() {
            write_node(child, &mut out);
        }
        out
    }

    fn write_html(&self, out: &mut String) {
        let data = self.0.borrow();
        out.push('<');
        out.push_str(&data.tag);
        if !data.classes.is_empty() {
            out.push_str(" class=\"");
            out.push_str(&escape(data.classes.join(" ").as_str()));
            out.push('"');
        }
        for (name, value) in &data.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
        out.push('>');
        if is_void(&data.tag) {
            return;
        }
        for child in &data.children {
            write_node(child, out);
        }
        out.push_str("</");
        out.push_str(&data.tag);
        out.push('>');
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&escape(text.as_str())),
        Node::Element(element) => element.write_html(out),
    }
}

fn is_void(tag: &str) -> bool {
    matches!(tag, "input" | "br" | "hr" | "img" | "meta" | "link")
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.outer_html())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_is_escaped_on_output() {
        let p = Element::new("p");
        p.set_text_content("<script>alert('x')</script> & more");
        assert_eq!(
            p.outer_html(),
            "<p>&lt;script&gt;alert(&apos;x&apos;)&lt;/script&gt; &amp; more</p>"
        );
        // The stored text stays verbatim.
        assert_eq!(p.text_content(), "<script>alert('x')</script> & more");
        assert!(p.children().is_empty());
    }

    #[test]
    fn test_attribute_values_are_escaped() {
        let a = Element::new("a");
        a.set_attribute("href", "https://example.com/?a=1&b=\"2\"");
        assert_eq!(
            a.outer_html(),
            "<a href=\"https://example.com/?a=1&amp;b=&quot;2&quot;\"></a>"
        );
    }

    #[test]
    fn test_class_attribute_and_class_list_agree() {
        let li = Element::with_class("li", "list-group-item  d-flex");
        assert!(li.has_class("d-flex"));
        li.add_class("active");
        li.add_class("active");
        li.remove_class("d-flex");
        assert_eq!(li.attribute("class").as_deref(), Some("list-group-item active"));

        li.remove_attribute("class");
        assert!(li.attribute("class").is_none());
    }

    #[test]
    fn test_set_attribute_overwrites_in_place() {
        let button = Element::new("button");
        button.set_attribute("data-id", "1");
        button.set_attribute("type", "submit");
        button.set_attribute("data-id", "2");
        assert_eq!(
            button.outer_html(),
            "<button data-id=\"2\" type=\"submit\"></button>"
        );
    }

    #[test]
    fn test_handles_share_the_node() {
        let root = Element::new("div");
        let child = Element::with_class("section", "posts");
        root.append_child(child.clone());

        child.set_text_content("hello");
        assert_eq!(root.text_content(), "hello");
        assert!(root.find_by_class("posts").unwrap().same_node(&child));
    }

    #[test]
    fn test_replace_children_swaps_whole_subtree() {
        let ul = Element::new("ul");
        ul.append_child(Element::new("li"));
        ul.append_child(Element::new("li"));

        ul.replace_children(vec![Element::new("li").into()]);
        assert_eq!(ul.child_count(), 1);

        ul.replace_children(Vec::new());
        assert_eq!(ul.inner_html(), "");
    }

    #[test]
    fn test_void_elements_have_no_end_tag() {
        let input = Element::new("input");
        input.set_attribute("readonly", "true");
        assert_eq!(input.outer_html(), "<input readonly=\"true\">");
    }

    #[test]
    fn test_find_all_by_tag_is_document_order() {
        let root = Element::new("div");
        let first = Element::new("section");
        let a1 = Element::new("a");
        a1.set_attribute("id", "1");
        first.append_child(a1);
        root.append_child(first);
        let a2 = Element::new("a");
        a2.set_attribute("id", "2");
        root.append_child(a2);

        let ids: Vec<_> = root
            .find_all_by_tag("a")
            .iter()
            .filter_map(|a| a.attribute("id"))
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}
