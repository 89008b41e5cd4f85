//! Field values and the text conventions of the persisted format
//!
//! The format stores every field as element text. Numeric-looking text is
//! coerced (int if it has no '.', then float, else text), and the writer
//! emits floats as `{:.7}` the way the originating application does.
//!
//! The files also carry HTML-style entities (`&ldquo;`, `&nbsp;`, numeric
//! character references) that a strict XML parser would reject. Decoding
//! happens only when *reading* text out into a [`FieldValue`]; the
//! underlying bytes are never rewritten, which is what keeps untouched
//! spans byte-identical on write.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A typed field value parsed from element text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Number(f64),
    Text(String),
    /// Nested records (mash steps, recipe ingredients, embedded profiles).
    List(Vec<FieldMap>),
}

/// Field name → value, with names lowercased at parse time.
pub type FieldMap = BTreeMap<String, FieldValue>;

impl FieldValue {
    /// Name of the variant, used in type-mismatch diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Int(_) => "int",
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "text",
            FieldValue::List(_) => "list",
        }
    }

    /// Numeric view with the documented sentinel 0.0 for absent/non-numeric.
    pub fn as_f64(&self) -> f64 {
        match self {
            FieldValue::Int(i) => *i as f64,
            FieldValue::Number(n) => *n,
            _ => 0.0,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            FieldValue::Int(i) => *i,
            FieldValue::Number(n) => *n as i64,
            _ => 0,
        }
    }

    pub fn as_text(&self) -> &str {
        match self {
            FieldValue::Text(s) => s,
            _ => "",
        }
    }

    /// Coerce element text the way the source application's own parser
    /// does: int when there is no '.', then float, otherwise text.
    pub fn coerce(text: &str) -> FieldValue {
        if text.is_empty() {
            return FieldValue::Text(String::new());
        }
        if !text.contains('.') {
            if let Ok(i) = text.parse::<i64>() {
                return FieldValue::Int(i);
            }
        }
        if let Ok(n) = text.parse::<f64>() {
            return FieldValue::Number(n);
        }
        FieldValue::Text(text.to_string())
    }

    /// Serialize for writing back into an element's text content.
    ///
    /// Floats as `{:.7}`, strings XML-escaped with non-ASCII emitted as
    /// decimal character references — both matching what the originating
    /// application writes.
    pub fn to_store_text(&self) -> String {
        match self {
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Number(n) => format!("{n:.7}"),
            FieldValue::Text(s) => xml_escape(s),
            FieldValue::List(_) => String::new(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(i) => write!(f, "{i}"),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::List(items) => write!(f, "[{} records]", items.len()),
        }
    }
}

/// Escape text for embedding in element content. Non-ASCII becomes a
/// decimal character reference, which is what the target application
/// itself emits.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c if (c as u32) > 127 => {
                out.push_str(&format!("&#{};", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

/// HTML-style named entities the document family is known to contain.
/// Extending this table never touches parsing code.
const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&ldquo;", "\u{201c}"),
    ("&rdquo;", "\u{201d}"),
    ("&lsquo;", "'"),
    ("&rsquo;", "'"),
    ("&ndash;", "-"),
    ("&mdash;", "--"),
    ("&nbsp;", " "),
    ("&auml;", "ä"),
    ("&ouml;", "ö"),
    ("&uuml;", "ü"),
    ("&Auml;", "Ä"),
    ("&Ouml;", "Ö"),
    ("&Uuml;", "Ü"),
    ("&szlig;", "ß"),
    ("&eacute;", "é"),
    ("&egrave;", "è"),
    ("&aacute;", "á"),
    ("&iacute;", "í"),
    ("&oacute;", "ó"),
    ("&uacute;", "ú"),
    ("&ntilde;", "ñ"),
    ("&copy;", "©"),
    ("&reg;", "®"),
    ("&trade;", "™"),
    ("&deg;", "°"),
    ("&plusmn;", "±"),
    ("&frac12;", "½"),
    ("&frac14;", "¼"),
    ("&frac34;", "¾"),
    ("&times;", "×"),
    ("&divide;", "÷"),
    ("&aring;", "å"),
    ("&Aring;", "Å"),
    ("&ordm;", "º"),
    ("&shy;", ""),
    ("&hellip;", "..."),
    ("&bull;", "•"),
    ("&middot;", "·"),
    ("&ccedil;", "ç"),
    ("&Ccedil;", "Ç"),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&#39;", "'"),
];

/// Decode raw element text: named entities, then `&#N;` / `&#xN;`
/// character references. Unknown entities pass through untouched.
pub fn decode_text(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    'outer: while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        // Numeric character reference.
        if let Some(stripped) = tail.strip_prefix("&#") {
            if let Some(end) = stripped.find(';') {
                let body = &stripped[..end];
                let code = if let Some(hex) = body.strip_prefix('x').or(body.strip_prefix('X')) {
                    u32::from_str_radix(hex, 16).ok()
                } else {
                    body.parse::<u32>().ok()
                };
                if let Some(ch) = code.and_then(char::from_u32) {
                    out.push(ch);
                    rest = &stripped[end + 1..];
                    continue;
                }
            }
        }
        // Named entity.
        for (name, replacement) in HTML_ENTITIES {
            if let Some(after) = tail.strip_prefix(name) {
                out.push_str(replacement);
                rest = after;
                continue 'outer;
            }
        }
        // Bare ampersand or unknown entity: keep it.
        out.push('&');
        rest = &rest[pos + 1..];
    }
    out.push_str(rest);
    out
}
