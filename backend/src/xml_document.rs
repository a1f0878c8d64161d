//! In-memory XML element tree
//!
//! Each element keeps the character data before its first child (`text`) and the
//! character data following its end tag inside the parent (`tail`), which is the
//! shape the verse text reconstruction works on.

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

use crate::types::ImportError;

/// Deepest element nesting accepted. Deeper documents are `MalformedDocument`, as
/// the text reconstruction recurses once per level.
pub const MAX_NESTING_DEPTH: usize = 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    namespace: Option<String>,
    attributes: Vec<(String, String)>,
    namespace_declarations: Vec<(String, String)>,
    text: Option<String>,
    tail: Option<String>,
    children: Vec<Element>,
}

impl Element {
    /// Local name without prefix, e.g. `div` for `<osis:div>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clark notation: `{namespace}local`, or just `local` when unbound.
    pub fn tag(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{{{}}}{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// `xmlns` / `xmlns:prefix` attributes declared on this element.
    pub fn namespace_declarations(&self) -> &[(String, String)] {
        &self.namespace_declarations
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn tail(&self) -> Option<&str> {
        self.tail.as_deref()
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// This element and everything below it, in document order.
    pub fn iter(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Everything below this element, in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: self.children.iter().rev().collect() }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<&'a Element> {
        let el = self.stack.pop()?;
        self.stack.extend(el.children.iter().rev());
        Some(el)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    root: Element,
}

impl ParsedDocument {
    /// Parse a complete XML document. Anything that is not well-formed is a
    /// `MalformedDocument` error.
    pub fn parse(content: &str) -> Result<Self, ImportError> {
        let mut reader = NsReader::from_str(content);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut pending = String::new();

        loop {
            let position = reader.buffer_position();
            let (ns, event) = reader
                .read_resolved_event()
                .map_err(|e| malformed(format!("{} (near byte {})", e, position)))?;
            let namespace = namespace_of(&ns);

            match event {
                Event::Start(ref e) => {
                    flush_pending(&mut pending, &mut stack, &root)?;
                    if stack.len() >= MAX_NESTING_DEPTH {
                        return Err(malformed(format!(
                            "Elements nested deeper than {} levels (near byte {})",
                            MAX_NESTING_DEPTH, position
                        )));
                    }
                    stack.push(new_element(e, namespace)?);
                }
                Event::Empty(ref e) => {
                    flush_pending(&mut pending, &mut stack, &root)?;
                    if stack.len() >= MAX_NESTING_DEPTH {
                        return Err(malformed(format!(
                            "Elements nested deeper than {} levels (near byte {})",
                            MAX_NESTING_DEPTH, position
                        )));
                    }
                    let el = new_element(e, namespace)?;
                    attach(el, &mut stack, &mut root)?;
                }
                Event::End(_) => {
                    flush_pending(&mut pending, &mut stack, &root)?;
                    let el = stack.pop()
                        .ok_or_else(|| malformed("Unexpected end tag".to_string()))?;
                    attach(el, &mut stack, &mut root)?;
                }
                Event::Text(ref e) => {
                    pending.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
                Event::CData(ref e) => {
                    pending.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
                Event::GeneralRef(ref e) => {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    let resolved = resolve_entity(&entity)
                        .ok_or_else(|| malformed(format!("Undefined entity: &{};", entity)))?;
                    pending.push_str(&resolved);
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions and doctypes carry no verse data.
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(malformed(format!("Unclosed element: <{}>", open.name)));
        }
        flush_pending(&mut pending, &mut stack, &root)?;

        match root {
            Some(root) => Ok(ParsedDocument { root }),
            None => Err(malformed("No root element found".to_string())),
        }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }
}

fn malformed(msg: String) -> ImportError {
    ImportError::MalformedDocument(msg)
}

fn namespace_of(ns: &ResolveResult) -> Option<String> {
    match ns {
        ResolveResult::Bound(n) => Some(String::from_utf8_lossy(n.as_ref()).into_owned()),
        _ => None,
    }
}

fn new_element(start: &BytesStart, namespace: Option<String>) -> Result<Element, ImportError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();

    let mut attributes = Vec::new();
    let mut namespace_declarations = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| malformed(format!("Bad attribute in <{}>: {}", name, e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = unescape(&raw)
            .map_err(|e| malformed(format!("Bad attribute value {}=\"{}\": {}", key, raw, e)))?
            .into_owned();

        if key == "xmlns" || key.starts_with("xmlns:") {
            namespace_declarations.push((key, value));
        } else {
            attributes.push((key, value));
        }
    }

    Ok(Element {
        name,
        namespace,
        attributes,
        namespace_declarations,
        ..Default::default()
    })
}

/// Text goes to the open element's `text` until it has a child, and to the last
/// child's `tail` after that.
fn flush_pending(
    pending: &mut String,
    stack: &mut [Element],
    root: &Option<Element>,
) -> Result<(), ImportError> {
    if pending.is_empty() {
        return Ok(());
    }
    let chunk = std::mem::take(pending);

    match stack.last_mut() {
        Some(parent) => {
            let target = match parent.children.last_mut() {
                Some(child) => &mut child.tail,
                None => &mut parent.text,
            };
            target.get_or_insert_with(String::new).push_str(&chunk);
        }
        None => {
            if !chunk.trim().is_empty() {
                let place = if root.is_some() { "after" } else { "before" };
                return Err(malformed(format!("Text {} the root element", place)));
            }
        }
    }
    Ok(())
}

fn attach(el: Element, stack: &mut [Element], root: &mut Option<Element>) -> Result<(), ImportError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None => {
            if root.is_some() {
                return Err(malformed(format!("Second root element: <{}>", el.name)));
            }
            *root = Some(el);
        }
    }
    Ok(())
}

fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#')
        && let Ok(code) = dec.parse::<u32>()
        && let Some(c) = char::from_u32(code)
    {
        return Some(c.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_tail() {
        let doc = ParsedDocument::parse("<v>Hello <i>world</i> today</v>").unwrap();
        let root = doc.root();
        assert_eq!(root.name(), "v");
        assert_eq!(root.text(), Some("Hello "));
        assert_eq!(root.children()[0].text(), Some("world"));
        assert_eq!(root.children()[0].tail(), Some(" today"));
    }

    #[test]
    fn test_namespace_and_tag() {
        let xml = r#"<osis xmlns="http://www.bibletechnologies.net/2003/OSIS/namespace"><osisText/></osis>"#;
        let doc = ParsedDocument::parse(xml).unwrap();
        assert_eq!(doc.root().tag(), "{http://www.bibletechnologies.net/2003/OSIS/namespace}osis");
        assert_eq!(doc.root().children()[0].name(), "osisText");
        assert!(doc.root().attributes().is_empty());
        assert_eq!(
            doc.root().namespace_declarations(),
            &[("xmlns".to_string(), "http://www.bibletechnologies.net/2003/OSIS/namespace".to_string())]
        );
    }

    #[test]
    fn test_prefixed_elements() {
        let xml = r#"<o:osis xmlns:o="urn:x"><o:div type="book"/></o:osis>"#;
        let doc = ParsedDocument::parse(xml).unwrap();
        let div = &doc.root().children()[0];
        assert_eq!(div.name(), "div");
        assert_eq!(div.tag(), "{urn:x}div");
        assert_eq!(div.attr("type"), Some("book"));
    }

    #[test]
    fn test_entities() {
        let doc = ParsedDocument::parse(r#"<v n="a&amp;b">x &lt; y &#65;&#x42;</v>"#).unwrap();
        assert_eq!(doc.root().attr("n"), Some("a&b"));
        assert_eq!(doc.root().text(), Some("x < y AB"));
    }

    #[test]
    fn test_document_order() {
        let doc = ParsedDocument::parse("<a><b><c/></b><d/></a>").unwrap();
        let names: Vec<&str> = doc.root().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
        let names: Vec<&str> = doc.root().descendants().map(|e| e.name()).collect();
        assert_eq!(names, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_malformed() {
        for xml in ["<a><b></a>", "<a>", "", "just text", "<a/><b/>", "<a>&nbsp;</a>"] {
            let res = ParsedDocument::parse(xml);
            assert!(
                matches!(res, Err(ImportError::MalformedDocument(_))),
                "expected malformed: {:?}", xml
            );
        }
    }

    #[test]
    fn test_declaration_and_comments_ignored() {
        let xml = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!-- c -->\n<usfx><book id=\"GEN\"/></usfx>\n";
        let doc = ParsedDocument::parse(xml).unwrap();
        assert_eq!(doc.root().tag(), "usfx");
        assert_eq!(doc.root().children().len(), 1);
    }

    fn nested(depth: usize) -> String {
        format!("<v>{}deep{}</v>", "<i>".repeat(depth - 1), "</i>".repeat(depth - 1))
    }

    #[test]
    fn test_nesting_depth_limit() {
        let doc = ParsedDocument::parse(&nested(MAX_NESTING_DEPTH)).unwrap();
        assert_eq!(doc.root().iter().count(), MAX_NESTING_DEPTH);

        let res = ParsedDocument::parse(&nested(MAX_NESTING_DEPTH + 1));
        assert!(matches!(res, Err(ImportError::MalformedDocument(_))));

        let res = ParsedDocument::parse(&nested(50_000));
        assert!(matches!(res, Err(ImportError::MalformedDocument(_))));

        let empty_too_deep = format!("<v>{}<i/>{}</v>", "<i>".repeat(MAX_NESTING_DEPTH - 1), "</i>".repeat(MAX_NESTING_DEPTH - 1));
        assert!(matches!(ParsedDocument::parse(&empty_too_deep), Err(ImportError::MalformedDocument(_))));
    }
}
