//! Whitespace-exact vehicle document model.
//!
//! Stormworks embeds multi-line Lua source inside `script` attributes, so the
//! usual parse → DOM → serialize cycle is off the table: any writer that
//! re-escapes or re-indents attribute text corrupts the scripts. This model
//! keeps the original source text verbatim and only records where the
//! script-bearing start tags live. Edits are staged per element and applied at
//! serialize time by splicing a rebuilt start tag into the otherwise
//! untouched source, so every byte outside an edited tag round-trips
//! identically.

use crate::error::VehicleError;
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use std::ops::Range;

/// Name of the attribute holding embedded Lua source.
const SCRIPT_ATTR: &str = "script";

const UTF8_BOM: &str = "\u{feff}";

/// Stable handle to a script-bearing element, valid for the lifetime of the
/// document it came from. Documents hand these out in document order;
/// reloading a file produces a fresh document and invalidates all old ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// One element carrying a `script` attribute.
#[derive(Debug, Clone)]
struct ScriptElement {
    /// Byte range of the start (or empty) tag within `source`, brackets
    /// included.
    tag_span: Range<usize>,
    /// `<element ... />` rather than `<element ...>`.
    self_closing: bool,
    name: String,
    /// All attributes in document order: name and raw (still-escaped) value
    /// exactly as written in the source.
    attrs: Vec<(String, String)>,
    /// Index into `attrs` of the script attribute.
    script_attr: usize,
    /// Current unescaped script text.
    value: String,
    /// The value no longer matches the source; the tag is rebuilt on
    /// serialize.
    edited: bool,
}

/// A parsed vehicle file.
///
/// Holds the source text plus a table of script-bearing elements. All writes
/// go through [`VehicleDocument::set_script_attribute`]; callers hold
/// [`NodeId`]s, never references into the tree.
#[derive(Debug, Clone)]
pub struct VehicleDocument {
    source: String,
    had_bom: bool,
    nodes: Vec<ScriptElement>,
}

impl VehicleDocument {
    /// Parse a vehicle file from raw bytes.
    ///
    /// Text trimming is disabled and attribute values are taken verbatim, so
    /// embedded newlines and indentation inside scripts survive untouched. A
    /// leading UTF-8 BOM is remembered and re-emitted on serialize.
    pub fn parse(bytes: &[u8]) -> Result<Self, VehicleError> {
        let text = std::str::from_utf8(bytes)?;
        let (had_bom, body) = match text.strip_prefix(UTF8_BOM) {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let mut reader = Reader::from_str(body);
        reader.config_mut().trim_text(false);

        let mut nodes = Vec::new();
        loop {
            let tag_start = reader.buffer_position() as usize;
            let event = reader.read_event().map_err(|e| {
                VehicleError::Parse(format!(
                    "{e} (at byte {})",
                    reader.buffer_position()
                ))
            })?;
            let tag_end = reader.buffer_position() as usize;

            match event {
                Event::Start(ref e) => {
                    if let Some(el) = Self::script_element(e, tag_start..tag_end, false)? {
                        nodes.push(el);
                    }
                }
                Event::Empty(ref e) => {
                    if let Some(el) = Self::script_element(e, tag_start..tag_end, true)? {
                        nodes.push(el);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self {
            source: body.to_string(),
            had_bom,
            nodes,
        })
    }

    /// Build a [`ScriptElement`] if the tag carries a `script` attribute.
    fn script_element(
        tag: &BytesStart<'_>,
        tag_span: Range<usize>,
        self_closing: bool,
    ) -> Result<Option<ScriptElement>, VehicleError> {
        let name = std::str::from_utf8(tag.name().as_ref())?.to_string();

        let mut attrs: Vec<(String, String)> = Vec::new();
        let mut script_attr: Option<usize> = None;
        for attr in tag.attributes() {
            let attr = attr.map_err(|e| VehicleError::Parse(e.to_string()))?;
            let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
            let raw = std::str::from_utf8(&attr.value)?.to_string();
            if key == SCRIPT_ATTR {
                script_attr = Some(attrs.len());
            }
            attrs.push((key, raw));
        }

        let Some(script_attr) = script_attr else {
            return Ok(None);
        };

        let raw = attrs[script_attr].1.as_str();
        let value = unescape(raw)
            .map_err(|e| VehicleError::Parse(format!("bad entity in script attribute: {e}")))?
            .into_owned();

        Ok(Some(ScriptElement {
            tag_span,
            self_closing,
            name,
            attrs,
            script_attr,
            value,
            edited: false,
        }))
    }

    /// Number of script-bearing elements.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Script-bearing elements in document order with their current
    /// (unescaped) attribute value.
    pub fn script_nodes(&self) -> impl Iterator<Item = (NodeId, &str)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, el)| (NodeId(i), el.value.as_str()))
    }

    /// Current script text of an element, or `None` for an unknown id.
    pub fn script_attribute(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).map(|el| el.value.as_str())
    }

    /// Overwrite an element's script attribute. Returns `false` (and changes
    /// nothing) for an unknown id.
    pub fn set_script_attribute(&mut self, node: NodeId, value: &str) -> bool {
        match self.nodes.get_mut(node.0) {
            Some(el) => {
                el.value = value.to_string();
                el.edited = true;
                true
            }
            None => false,
        }
    }

    /// Serialize to UTF-8 bytes.
    ///
    /// Unedited regions are copied from the source verbatim; each edited
    /// element gets its start tag rebuilt with the new script value, all
    /// other attributes keeping their raw source text.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::with_capacity(self.source.len() + 256);
        if self.had_bom {
            out.push('\u{feff}');
        }

        let mut cursor = 0;
        for el in &self.nodes {
            if !el.edited {
                continue;
            }
            out.push_str(&self.source[cursor..el.tag_span.start]);
            rebuild_tag(el, &mut out);
            cursor = el.tag_span.end;
        }
        out.push_str(&self.source[cursor..]);

        out.into_bytes()
    }
}

/// Rebuild the start tag of an edited element.
fn rebuild_tag(el: &ScriptElement, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for (i, (key, raw)) in el.attrs.iter().enumerate() {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        if i == el.script_attr {
            out.push_str(&escape_attr(&el.value));
        } else {
            // Raw source bytes; a literal quote only appears when the source
            // quoted this value with apostrophes, so escape just that.
            out.push_str(&raw.replace('"', "&quot;"));
        }
        out.push('"');
    }
    if el.self_closing {
        out.push_str(" />");
    } else {
        out.push('>');
    }
}

/// Escape a string for use inside a double-quoted attribute value.
///
/// Newlines stay literal: the game writes them that way and the parser above
/// never normalizes them away.
fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
