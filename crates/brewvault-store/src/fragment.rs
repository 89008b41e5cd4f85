//! Forest scanning and span-tagged fragment parsing
//!
//! A physical document in this family is not a well-formed single-root XML
//! file: the application appends user records as *sibling* top-level
//! elements after the library section. We therefore parse a forest, not a
//! tree: [`scan_fragments`] finds top-level element boundaries by depth
//! counting alone, and each boundary-delimited fragment is then handed to
//! quick-xml. Every parsed element keeps its byte span so the writer can
//! splice replacements without touching sibling bytes.

use std::ops::Range;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::FormatError;

/// One top-level element's byte range within a physical document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub root_tag: String,
    pub span: Range<usize>,
}

/// A parsed element with absolute byte spans into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    /// Full span including the open and close tags.
    pub span: Range<usize>,
    /// Span of the content between the tags.
    pub content: Range<usize>,
    pub children: Vec<XmlElement>,
    /// Raw (undecoded) text content; meaningful for leaf elements.
    pub raw_text: String,
}

impl XmlElement {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.child(name).is_some()
    }
}

/// Scan for top-level element boundaries without assuming a single root.
///
/// Prolog (`<?xml …?>`), comments, doctype and inter-fragment text are
/// skipped; they are preserved on write because the writer splices into the
/// original bytes rather than re-rendering.
pub fn scan_fragments(bytes: &[u8]) -> Result<Vec<Fragment>, FormatError> {
    let mut fragments = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut frag_start = 0usize;
    let mut frag_root = String::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let Some(lt) = find_byte(bytes, i, b'<') else {
            break;
        };

        if bytes[lt..].starts_with(b"<?") {
            i = skip_until(bytes, lt, b"?>").ok_or_else(|| FormatError::UnexpectedEof {
                section: "<?".to_string(),
            })?;
            continue;
        }
        if bytes[lt..].starts_with(b"<!--") {
            i = skip_until(bytes, lt, b"-->").ok_or_else(|| FormatError::UnexpectedEof {
                section: "<!--".to_string(),
            })?;
            continue;
        }
        if bytes[lt..].starts_with(b"<![CDATA[") {
            // CDATA may contain `>` and element-like text; only `]]>` ends it.
            i = skip_until(bytes, lt, b"]]>").ok_or_else(|| FormatError::UnexpectedEof {
                section: "<![CDATA[".to_string(),
            })?;
            continue;
        }
        if bytes[lt..].starts_with(b"<!") {
            i = skip_until(bytes, lt, b">").ok_or_else(|| FormatError::UnexpectedEof {
                section: "<!".to_string(),
            })?;
            continue;
        }

        if bytes[lt..].starts_with(b"</") {
            let (name, gt) = read_tag_name(bytes, lt + 2)?;
            match stack.pop() {
                Some(open) if open == name => {}
                Some(open) => {
                    return Err(FormatError::Unbalanced {
                        section: open,
                        offset: lt,
                    });
                }
                None => {
                    return Err(FormatError::Unbalanced {
                        section: name,
                        offset: lt,
                    });
                }
            }
            if stack.is_empty() {
                fragments.push(Fragment {
                    root_tag: std::mem::take(&mut frag_root),
                    span: frag_start..gt + 1,
                });
            }
            i = gt + 1;
            continue;
        }

        // Opening (or self-closing) tag.
        let (name, gt) = read_open_tag(bytes, lt)?;
        let self_closing = gt > lt && bytes[gt - 1] == b'/';
        if stack.is_empty() {
            frag_start = lt;
            frag_root = name.clone();
        }
        if self_closing {
            if stack.is_empty() {
                fragments.push(Fragment {
                    root_tag: std::mem::take(&mut frag_root),
                    span: lt..gt + 1,
                });
            }
        } else {
            stack.push(name);
        }
        i = gt + 1;
    }

    if let Some(open) = stack.pop() {
        return Err(FormatError::UnexpectedEof { section: open });
    }
    Ok(fragments)
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == needle).map(|p| from + p)
}

/// Position just past `needle`, searching from `from`.
fn skip_until(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p + needle.len())
}

/// Read the element name of a close tag starting after `</`; returns the
/// name and the position of the terminating `>`.
fn read_tag_name(bytes: &[u8], from: usize) -> Result<(String, usize), FormatError> {
    let gt = find_byte(bytes, from, b'>').ok_or_else(|| FormatError::UnexpectedEof {
        section: String::from_utf8_lossy(&bytes[from..bytes.len().min(from + 32)]).into_owned(),
    })?;
    let name = std::str::from_utf8(&bytes[from..gt])
        .map_err(|_| FormatError::Encoding {
            section: String::from_utf8_lossy(&bytes[from..gt]).into_owned(),
        })?
        .trim()
        .to_string();
    Ok((name, gt))
}

/// Read an open tag starting at `<`; returns the element name and the
/// position of the terminating `>`, honoring quoted attribute values.
fn read_open_tag(bytes: &[u8], lt: usize) -> Result<(String, usize), FormatError> {
    let mut quote: Option<u8> = None;
    let mut gt = None;
    for (off, &b) in bytes[lt..].iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => {
                gt = Some(lt + off);
                break;
            }
            None => {}
        }
    }
    let gt = gt.ok_or_else(|| FormatError::UnexpectedEof {
        section: String::from_utf8_lossy(&bytes[lt..bytes.len().min(lt + 32)]).into_owned(),
    })?;
    let inner = &bytes[lt + 1..gt];
    let name_end = inner
        .iter()
        .position(|&b| b.is_ascii_whitespace() || b == b'/')
        .unwrap_or(inner.len());
    let name = std::str::from_utf8(&inner[..name_end])
        .map_err(|_| FormatError::Encoding {
            section: String::from_utf8_lossy(&inner[..name_end]).into_owned(),
        })?
        .to_string();
    if name.is_empty() {
        return Err(FormatError::Syntax {
            section: String::from_utf8_lossy(&bytes[lt..gt + 1]).into_owned(),
            detail: "empty element name".to_string(),
        });
    }
    Ok((name, gt))
}

/// Parse one boundary-delimited fragment into a span-tagged element tree.
///
/// Text is kept raw: the files carry HTML-style entities that strict XML
/// rejects, so decoding is deferred to field extraction.
pub fn parse_fragment(bytes: &[u8], frag: &Fragment) -> Result<XmlElement, FormatError> {
    let offset = frag.span.start;
    let slice = &bytes[frag.span.clone()];
    let mut reader = Reader::from_reader(slice);
    reader.trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let before = reader.buffer_position();
        let event = reader.read_event_into(&mut buf).map_err(|e| FormatError::Syntax {
            section: frag.root_tag.clone(),
            detail: e.to_string(),
        })?;
        let after = reader.buffer_position();

        match event {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                stack.push(XmlElement {
                    name,
                    span: offset + before..offset + before,
                    content: offset + after..offset + after,
                    children: Vec::new(),
                    raw_text: String::new(),
                });
            }
            Event::Empty(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                let element = XmlElement {
                    name,
                    span: offset + before..offset + after,
                    content: offset + after..offset + after,
                    children: Vec::new(),
                    raw_text: String::new(),
                };
                attach(&mut stack, &mut root, element, &frag.root_tag)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.raw_text
                        .push_str(&String::from_utf8_lossy(&text.into_inner()));
                }
            }
            Event::CData(cdata) => {
                if let Some(top) = stack.last_mut() {
                    top.raw_text
                        .push_str(&String::from_utf8_lossy(&cdata.into_inner()));
                }
            }
            Event::End(_) => {
                let mut element = stack.pop().ok_or_else(|| FormatError::Unbalanced {
                    section: frag.root_tag.clone(),
                    offset: offset + before,
                })?;
                element.content.end = offset + before;
                element.span.end = offset + after;
                attach(&mut stack, &mut root, element, &frag.root_tag)?;
            }
            Event::Eof => break,
            // Prolog, comments and doctype never appear inside a scanned
            // fragment; ignore them defensively.
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.pop() {
        return Err(FormatError::UnexpectedEof { section: open.name });
    }
    root.ok_or_else(|| FormatError::Syntax {
        section: frag.root_tag.clone(),
        detail: "fragment contains no element".to_string(),
    })
}

fn attach(
    stack: &mut Vec<XmlElement>,
    root: &mut Option<XmlElement>,
    element: XmlElement,
    section: &str,
) -> Result<(), FormatError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(FormatError::Syntax {
            section: section.to_string(),
            detail: "multiple roots inside one fragment".to_string(),
        })
    }
}
