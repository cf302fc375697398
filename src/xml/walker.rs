/*!
 * Verbatim, position-aware XML tree walker.
 *
 * The walker tokenizes with quick-xml and slices every element's `source`
 * straight out of the (newline-normalised) input, so attribute order, quoting
 * and entity references survive untouched.
 *
 * Internal general entities declared in the DOCTYPE subset are expanded in
 * text and attribute values. External entities, and internal ones whose
 * replacement text holds markup, are not supported and fail the walk.
 */

use log::debug;
use once_cell::sync::Lazy;
use quick_xml::escape::{escape, unescape_with};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::node::{Attribute, ElementNode, NodeId, XmlDocument};
use crate::errors::WalkError;

static NEXT_WALK_ID: AtomicU64 = AtomicU64::new(1);

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

static ENTITY_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<!ENTITY\s+([^\s%"'>]+)\s+(?:"([^"]*)"|'([^']*)')\s*>"#).unwrap()
});

/// An element whose end tag has not been seen yet
struct OpenElement {
    id: NodeId,
    start: usize,
    text_start: usize,
    child_count: u32,
    last_child: Option<NodeId>,
}

/// Traversal state for a single document
struct WalkState<'a> {
    input: &'a str,
    walk_id: u64,
    nodes: Vec<ElementNode>,
    text: String,
    open: Vec<OpenElement>,
    root_closed: bool,
    entities: HashMap<String, String>,
}

/// Walk raw XML bytes into an element arena in document order.
///
/// The whole walk fails if the document is not well-formed; no partial
/// result is ever returned.
pub fn walk(xml: &[u8]) -> Result<XmlDocument, WalkError> {
    let decoded = decode(xml)?;
    let input = normalize_newlines(decoded);
    check_chars(&input, 0)?;

    let state = WalkState {
        input: &input,
        walk_id: NEXT_WALK_ID.fetch_add(1, Ordering::Relaxed),
        nodes: Vec::new(),
        text: String::new(),
        open: Vec::new(),
        root_closed: false,
        entities: HashMap::new(),
    };
    let document = state.run()?;

    debug!(
        "Walked {} elements (walk {})",
        document.nodes.len(),
        document.walk_id
    );
    Ok(document)
}

fn decode(xml: &[u8]) -> Result<&str, WalkError> {
    let bytes = xml.strip_prefix(UTF8_BOM).unwrap_or(xml);
    std::str::from_utf8(bytes).map_err(|e| WalkError::Encoding(e.to_string()))
}

/// Fail on the first character outside the XML `Char` production
fn check_chars(text: &str, position: usize) -> Result<(), WalkError> {
    match text.char_indices().find(|(_, c)| !is_xml_char(*c)) {
        Some((offset, c)) => Err(WalkError::malformed(
            position + offset,
            format!("character U+{:04X} is not allowed in XML", c as u32),
        )),
        None => Ok(()),
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | '_' | 'A'..='Z' | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9'
            | '\u{B7}'
            | '\u{300}'..='\u{36F}'
            | '\u{203F}'..='\u{2040}')
}

/// Whether `name` matches the XML `Name` production
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => is_name_start_char(first) && chars.all(is_name_char),
        None => false,
    }
}

fn read_name(raw: &[u8], position: usize) -> Result<String, WalkError> {
    let name = std::str::from_utf8(raw).map_err(|e| WalkError::malformed(position, e.to_string()))?;
    if !is_xml_name(name) {
        return Err(WalkError::malformed(position, format!("invalid name {:?}", name)));
    }
    Ok(name.to_string())
}

/// Predefined entities first, then the ones declared in the DOCTYPE
fn resolve_entity<'e>(entities: &'e HashMap<String, String>, name: &str) -> Option<&'e str> {
    match name {
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "apos" => Some("'"),
        "quot" => Some("\""),
        _ => entities.get(name).map(String::as_str),
    }
}

/// Collapse CRLF and lone CR into LF
fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

impl<'a> WalkState<'a> {
    fn run(mut self) -> Result<XmlDocument, WalkError> {
        let mut reader = Reader::from_str(self.input);
        {
            let config = reader.config_mut();
            config.trim_text(false);
            config.check_end_names = true;
            config.check_comments = true;
        }

        loop {
            let before = reader.buffer_position() as usize;
            let event = reader
                .read_event()
                .map_err(|e| WalkError::malformed(before, e.to_string()))?;
            let after = reader.buffer_position() as usize;

            match event {
                Event::Start(start) => {
                    self.open_element(&start, before)?;
                }
                Event::Empty(start) => {
                    self.open_element(&start, before)?;
                    self.close_element(after)?;
                }
                Event::End(_) => {
                    self.close_element(after)?;
                }
                Event::Text(text) => {
                    if text.windows(3).any(|w| w == b"]]>") {
                        return Err(WalkError::malformed(before, "']]>' in character data"));
                    }
                    let entities = &self.entities;
                    let unescaped = text
                        .unescape_with(|name| resolve_entity(entities, name))
                        .map_err(|e| WalkError::malformed(before, e.to_string()))?;
                    check_chars(&unescaped, before)?;
                    self.push_text(&unescaped, before)?;
                }
                Event::CData(cdata) => {
                    let raw = std::str::from_utf8(&cdata)
                        .map_err(|e| WalkError::malformed(before, e.to_string()))?;
                    self.push_text(raw, before)?;
                }
                Event::DocType(doctype) => {
                    self.declare_entities(&doctype, before)?;
                }
                Event::Eof => break,
                // Comments, processing instructions and declarations do not
                // take part in element structure.
                _ => {}
            }
        }

        if let Some(open) = self.open.last() {
            let name = self.nodes[open.id].name.clone();
            return Err(WalkError::malformed(
                self.input.len(),
                format!("element <{}> is never closed", name),
            ));
        }
        if self.nodes.is_empty() {
            return Err(WalkError::NoRoot);
        }

        Ok(XmlDocument {
            walk_id: self.walk_id,
            nodes: self.nodes,
            text: self.text,
        })
    }

    /// Record the internal general entities of a DOCTYPE subset
    fn declare_entities(&mut self, doctype: &BytesText<'_>, position: usize) -> Result<(), WalkError> {
        let subset = std::str::from_utf8(doctype).map_err(|e| WalkError::malformed(position, e.to_string()))?;
        for captures in ENTITY_DECLARATION.captures_iter(subset) {
            let name = &captures[1];
            let literal = captures.get(2).or_else(|| captures.get(3)).map_or("", |m| m.as_str());
            if literal.contains('<') {
                return Err(WalkError::malformed(
                    position,
                    format!("entity `{}` holds markup, which is not supported", name),
                ));
            }
            let entities = &self.entities;
            let value = unescape_with(literal, |n| resolve_entity(entities, n))
                .map_err(|e| WalkError::malformed(position, e.to_string()))?
                .into_owned();
            // the first declaration of an entity is binding
            self.entities.entry(name.to_string()).or_insert(value);
        }
        Ok(())
    }

    /// `tag_start` is the offset of the start tag's `<`
    fn open_element(&mut self, start: &BytesStart<'_>, tag_start: usize) -> Result<(), WalkError> {
        if self.open.is_empty() && (self.root_closed || !self.nodes.is_empty()) {
            return Err(WalkError::malformed(tag_start, "more than one root element"));
        }

        let name = read_name(start.name().as_ref(), tag_start)?;
        let attributes = read_attributes(start, &self.entities, tag_start)?;

        let id = self.nodes.len();
        let (parent, depth, position, preceding_sibling) = match self.open.last_mut() {
            Some(parent) => {
                parent.child_count += 1;
                let preceding = parent.last_child.replace(id);
                let depth = self.nodes[parent.id].depth + 1;
                (Some(parent.id), depth, parent.child_count, preceding)
            }
            None => (None, 1, 1, None),
        };

        let inherited: &[(String, String)] = match parent {
            Some(p) => &self.nodes[p].namespaces,
            None => &[],
        };
        let namespaces = scope_namespaces(inherited, &attributes);

        self.nodes.push(ElementNode {
            id,
            name,
            attributes,
            source: String::new(),
            depth,
            position,
            parent,
            preceding_sibling,
            namespaces,
            walk_id: self.walk_id,
            subtree_end: id + 1,
            text: 0..0,
        });
        self.open.push(OpenElement {
            id,
            start: tag_start,
            text_start: self.text.len(),
            child_count: 0,
            last_child: None,
        });
        Ok(())
    }

    fn close_element(&mut self, end: usize) -> Result<(), WalkError> {
        let open = self
            .open
            .pop()
            .ok_or_else(|| WalkError::malformed(end, "end tag without matching start tag"))?;

        let source = self.element_source(open.id, open.start, end);
        let subtree_end = self.nodes.len();
        let text_end = self.text.len();

        let node = &mut self.nodes[open.id];
        node.source = source;
        node.subtree_end = subtree_end;
        node.text = open.text_start..text_end;

        if self.open.is_empty() {
            self.root_closed = true;
        }
        Ok(())
    }

    fn push_text(&mut self, text: &str, position: usize) -> Result<(), WalkError> {
        if self.open.is_empty() {
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err(WalkError::malformed(position, "text outside the root element"));
        }
        self.text.push_str(text);
        Ok(())
    }

    /// Slice the element markup, adding namespace declarations it relies on
    /// from its ancestors right after the element name
    fn element_source(&self, id: NodeId, start: usize, end: usize) -> String {
        let raw = &self.input[start..end];
        let node = &self.nodes[id];
        let Some(parent) = node.parent else {
            return raw.to_string();
        };

        let mut declarations = String::new();
        for (prefix, uri) in &self.nodes[parent].namespaces {
            if uri.is_empty() || declares(&node.attributes, prefix) {
                continue;
            }
            declarations.push(' ');
            if prefix.is_empty() {
                declarations.push_str("xmlns");
            } else {
                declarations.push_str("xmlns:");
                declarations.push_str(prefix);
            }
            declarations.push_str("=\"");
            declarations.push_str(&escape(uri.as_str()));
            declarations.push('"');
        }

        if declarations.is_empty() {
            return raw.to_string();
        }
        let split = 1 + node.name.len();
        let mut source = String::with_capacity(raw.len() + declarations.len());
        source.push_str(&raw[..split]);
        source.push_str(&declarations);
        source.push_str(&raw[split..]);
        source
    }
}

fn read_attributes(
    start: &BytesStart<'_>,
    entities: &HashMap<String, String>,
    position: usize,
) -> Result<Vec<Attribute>, WalkError> {
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| WalkError::malformed(position, e.to_string()))?;
        let name = read_name(attribute.key.as_ref(), position)?;
        if attribute.value.contains(&b'<') {
            return Err(WalkError::malformed(
                position,
                format!("'<' in the value of attribute {:?}", name),
            ));
        }
        let value = attribute
            .unescape_value_with(|n| resolve_entity(entities, n))
            .map_err(|e| WalkError::malformed(position, e.to_string()))?
            .into_owned();
        check_chars(&value, position)?;
        attributes.push(Attribute { name, value });
    }
    Ok(attributes)
}

/// Prefix declared by a namespace attribute, empty for the default namespace
fn declared_prefix(name: &str) -> Option<&str> {
    if name == "xmlns" {
        Some("")
    } else {
        name.strip_prefix("xmlns:")
    }
}

fn declares(attributes: &[Attribute], prefix: &str) -> bool {
    attributes
        .iter()
        .any(|a| declared_prefix(&a.name) == Some(prefix))
}

fn scope_namespaces(inherited: &[(String, String)], attributes: &[Attribute]) -> Vec<(String, String)> {
    let mut scope: Vec<(String, String)> = inherited.to_vec();
    for attribute in attributes {
        let Some(prefix) = declared_prefix(&attribute.name) else {
            continue;
        };
        match scope.iter_mut().find(|(p, _)| p == prefix) {
            Some(binding) => binding.1 = attribute.value.clone(),
            None => scope.push((prefix.to_string(), attribute.value.clone())),
        }
    }
    scope
}
