//! RSS 2.0 parsing: raw XML text into a [`FeedDocument`].
//!
//! Parsing happens in two passes. The first builds a generic element tree with
//! `quick-xml` and turns every structural problem into [`FeedError::Parse`].
//! The second walks that tree and pulls out the channel and item fields,
//! reporting absent elements as [`FeedError::MalformedFeed`].
//!
//! Text is passed through verbatim: no trimming, no whitespace folding.
//! Entity references are resolved exactly as XML requires, and nothing more.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use thiserror::Error;

/// SEC-003: Maximum element nesting depth accepted from a feed document.
const MAX_XML_DEPTH: usize = 256;

/// Errors produced while turning feed text into a [`FeedDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The text is not well-formed XML. Carries the reader's diagnostic.
    #[error("XML parse error: {message}")]
    Parse { message: String },

    /// The document parsed but a required element is absent.
    #[error("Malformed feed: missing required element `{field}`")]
    MalformedFeed { field: &'static str },
}

impl FeedError {
    fn parse(message: impl Into<String>) -> Self {
        FeedError::Parse {
            message: message.into(),
        }
    }
}

/// A parsed feed: channel metadata plus its items in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedDocument {
    pub title: String,
    pub description: String,
    pub items: Vec<FeedItem>,
}

/// One `<item>` of a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub item_title: String,
    pub item_link: String,
    pub item_description: String,
}

/// Parses RSS text into a [`FeedDocument`].
///
/// # Errors
///
/// - [`FeedError::Parse`] when the input is not well-formed XML (unclosed or
///   mismatched tags, unknown entities, no root element, content after the
///   root element).
/// - [`FeedError::MalformedFeed`] when the channel `title`/`description` or an
///   item's `title`/`link`/`description` is missing.
///
/// # Example
///
/// ```
/// use feedview::feed::parse_feed;
///
/// let doc = parse_feed(
///     "<rss><channel><title>T</title><description>D</description></channel></rss>",
/// )
/// .unwrap();
/// assert_eq!(doc.title, "T");
/// assert!(doc.items.is_empty());
/// ```
pub fn parse_feed(raw: &str) -> Result<FeedDocument, FeedError> {
    let root = parse_tree(raw)?;

    let title = find_outside_items(&root, "title")
        .ok_or(FeedError::MalformedFeed { field: "title" })?;
    let description = find_outside_items(&root, "description")
        .ok_or(FeedError::MalformedFeed {
            field: "description",
        })?;

    let mut item_elements = Vec::new();
    collect_named(&root, "item", &mut item_elements);

    let items = item_elements
        .into_iter()
        .map(|item| {
            let field = |name: &str, label: &'static str| {
                find_first(item, name)
                    .map(XmlElement::text_content)
                    .ok_or(FeedError::MalformedFeed { field: label })
            };
            Ok(FeedItem {
                item_title: field("title", "item.title")?,
                item_link: field("link", "item.link")?,
                item_description: field("description", "item.description")?,
            })
        })
        .collect::<Result<Vec<_>, FeedError>>()?;

    tracing::debug!(title = %title.text_content(), items = items.len(), "Parsed feed");

    Ok(FeedDocument {
        title: title.text_content(),
        description: description.text_content(),
        items,
    })
}

// ============================================================================
// Generic XML tree
// ============================================================================

#[derive(Debug)]
struct XmlElement {
    name: String,
    children: Vec<XmlNode>,
}

#[derive(Debug)]
enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    fn new(name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            children: Vec::new(),
        }
    }

    fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(element) => element.push_text(out),
            }
        }
    }
}

/// Builds the element tree, rejecting anything that is not a single
/// well-formed root element.
fn parse_tree(raw: &str) -> Result<XmlElement, FeedError> {
    // SEC-002: quick-xml (0.37) never expands <!ENTITY> declarations. Only the
    // five predefined entities and character references are resolved by
    // `unescape()`; anything else is reported as an error.
    let mut reader = Reader::from_str(raw);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if root.is_some() {
                    return Err(FeedError::parse("content after the root element"));
                }
                if stack.len() >= MAX_XML_DEPTH {
                    return Err(FeedError::parse(format!(
                        "nesting depth exceeds maximum of {} levels",
                        MAX_XML_DEPTH
                    )));
                }
                stack.push(start_element(&reader, &e)?);
            }
            Ok(Event::Empty(e)) => {
                let element = start_element(&reader, &e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                // Name mismatches are rejected by the reader itself.
                let element = stack
                    .pop()
                    .ok_or_else(|| FeedError::parse("unexpected closing tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| FeedError::parse(err.to_string()))?;
                push_text(&mut stack, &text)?;
            }
            Ok(Event::CData(e)) => {
                let inner = e.into_inner();
                push_text(&mut stack, &String::from_utf8_lossy(&inner))?;
            }
            Ok(Event::Comment(e)) => {
                if e.windows(2).any(|pair| pair == b"--") || e.ends_with(b"-") {
                    return Err(FeedError::parse("'--' is not allowed inside a comment"));
                }
            }
            Ok(Event::Eof) => break,
            // Declarations, processing instructions and DOCTYPE carry no content.
            Ok(_) => {}
            Err(e) => {
                return Err(FeedError::parse(format!(
                    "{} at position {}",
                    e,
                    reader.buffer_position()
                )))
            }
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(FeedError::parse(format!(
            "unexpected end of input: element <{}> is not closed",
            open.name
        )));
    }
    root.ok_or_else(|| FeedError::parse("no root element found"))
}

/// Opens an element, checking its name and every attribute.
///
/// The reader only tokenizes start tags; attribute syntax (missing `=`,
/// unquoted values, duplicates, bad entity references) is checked here.
fn start_element(
    reader: &Reader<&[u8]>,
    start: &BytesStart<'_>,
) -> Result<XmlElement, FeedError> {
    let element = XmlElement::new(start.name().as_ref());
    check_name(&element.name)?;

    for attr in start.attributes() {
        let attr = attr.map_err(|e| {
            FeedError::parse(format!("bad attribute in <{}>: {}", element.name, e))
        })?;
        check_name(&String::from_utf8_lossy(attr.key.as_ref()))?;
        attr.decode_and_unescape_value(reader.decoder())
            .map_err(|e| FeedError::parse(e.to_string()))?;
    }

    Ok(element)
}

/// Rejects names that cannot start or continue an XML `Name`.
fn check_name(name: &str) -> Result<(), FeedError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_alphabetic() || first == '_' || first == ':')
                && chars.all(|c| {
                    c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.' | '\u{b7}')
                })
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(FeedError::parse(format!("invalid name `{}`", name)))
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), FeedError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(FeedError::parse("content after the root element")),
    }
    Ok(())
}

fn push_text(stack: &mut [XmlElement], text: &str) -> Result<(), FeedError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Text(text.to_string())),
        None if text.trim().is_empty() => {}
        None => return Err(FeedError::parse("text outside the root element")),
    }
    Ok(())
}

// ============================================================================
// Lookups (document order)
// ============================================================================

/// First element named `name`, searching `element` and its descendants.
fn find_first<'a>(element: &'a XmlElement, name: &str) -> Option<&'a XmlElement> {
    element.elements().find_map(|child| {
        if child.name == name {
            Some(child)
        } else {
            find_first(child, name)
        }
    })
}

/// Like [`find_first`] but never descends into `<item>` subtrees, so channel
/// fields cannot be satisfied by an item's fields.
fn find_outside_items<'a>(element: &'a XmlElement, name: &str) -> Option<&'a XmlElement> {
    if element.name == name {
        return Some(element);
    }
    element
        .elements()
        .filter(|child| child.name != "item")
        .find_map(|child| find_outside_items(child, name))
}

fn collect_named<'a>(element: &'a XmlElement, name: &str, out: &mut Vec<&'a XmlElement>) {
    for child in element.elements() {
        if child.name == name {
            out.push(child);
        }
        collect_named(child, name, out);
    }
}
