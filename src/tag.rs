// src/tag.rs
//
// Tag grammar, entered with the cursor on '<'.
//
// - `<!-- ... -->` comments are skipped up to the first "-->" (no nesting).
//   An unterminated comment swallows the rest of the input.
// - `<![CDATA[ ... ]]>` sections are handed back for verbatim copying.
// - Any other `<!...>` or `<?...>` is dropped through the next '>', together
//   with the line break(s) right after it.
// - Element tags: optional '/', a name of letters, digits and ':' starting
//   with a letter, then attributes up to '>'. Names are lowercased.
// - Attributes are normalized so the tag is valid XML: values always double
//   quoted, stray '"' and '<' inside values escaped, minimized attributes
//   expanded, entities rewritten as numeric references. Attributes whose name
//   is not an XML name, and repeats of a name already seen, are dropped.
//
// Anything that does not reach its closing '>' is "not a tag": the cursor is
// put back on the '<' and the caller emits it as text.

use std::ops::Range;

use memchr::{memchr, memmem};

use crate::cursor::Cursor;
use crate::elements::{is_name_char, is_restricted_control, is_void, is_ws};
use crate::entities::convert_entities;

/// One parsed element tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    /// Lowercased element name, e.g. `p` or `o:p`.
    pub name: String,
    pub is_end_tag: bool,
    /// Written `<x .../>`, or a void element however it was written.
    pub self_closing: bool,
    /// Normalized attribute text, including its leading whitespace and
    /// without a self-closing '/'.
    pub attributes: String,
}

/// Outcome of parsing at a '<'.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Parsed {
    Tag(Tag),
    /// Comment, declaration or processing instruction; nothing to write.
    Skipped,
    /// Byte range of a CDATA section to copy through unchanged.
    Verbatim(Range<usize>),
    /// Malformed; the cursor is back on the '<'.
    NotATag,
}

/// Parse whatever starts at the cursor's '<'.
pub fn parse_tag<S: AsRef<str>>(cursor: &mut Cursor<S>) -> Parsed {
    debug_assert_eq!(cursor.peek(0), b'<');
    let start = cursor.position();

    let parsed = match cursor.peek(1) {
        b'!' if cursor.starts_with(b"<!--") => skip_comment(cursor),
        b'!' if cursor.starts_with(b"<![CDATA[") => cdata_section(cursor),
        b'!' | b'?' => skip_declaration(cursor),
        _ => element_tag(cursor).map_or(Parsed::NotATag, Parsed::Tag),
    };

    if parsed == Parsed::NotATag {
        log::debug!(target: "xhtmlfix::tag", "unparsable tag at byte {start}; emitting '<' as text");
        cursor.rewind(start);
    }
    parsed
}

/* ============================== Comments ================================ */

fn skip_comment<S: AsRef<str>>(cursor: &mut Cursor<S>) -> Parsed {
    let found = memmem::find(&cursor.rest()[4..], b"-->");
    match found {
        Some(off) => cursor.advance(4 + off + 3),
        None => {
            log::debug!(target: "xhtmlfix::tag", "unterminated comment; dropping the rest of the input");
            cursor.advance(cursor.rest().len());
        }
    }
    Parsed::Skipped
}

fn cdata_section<S: AsRef<str>>(cursor: &mut Cursor<S>) -> Parsed {
    const OPEN: usize = b"<![CDATA[".len();
    let Some(off) = memmem::find(&cursor.rest()[OPEN..], b"]]>") else {
        return Parsed::NotATag;
    };
    let start = cursor.position();
    let len = OPEN + off + 3;
    cursor.advance(len);
    Parsed::Verbatim(start..start + len)
}

fn skip_declaration<S: AsRef<str>>(cursor: &mut Cursor<S>) -> Parsed {
    let Some(off) = memchr(b'>', cursor.rest()) else {
        return Parsed::NotATag;
    };
    cursor.advance(off + 1);
    while matches!(cursor.peek(0), b'\n' | b'\r') {
        cursor.advance(1);
    }
    Parsed::Skipped
}

/* =============================== Elements =============================== */

fn element_tag<S: AsRef<str>>(cursor: &mut Cursor<S>) -> Option<Tag> {
    let is_end_tag = cursor.peek(1) == b'/';
    let mut i = if is_end_tag { 2 } else { 1 };

    if !cursor.peek(i).is_ascii_alphabetic() {
        return None;
    }
    let name_start = cursor.position() + i;
    while is_name_char(cursor.peek(i)) {
        i += 1;
    }
    let name_len = cursor.position() + i - name_start;

    let term = cursor.peek(i);
    if !(is_ws(term) || term == b'/' || term == b'>') {
        return None;
    }
    // `<foo:>` is a dangling namespace prefix, not a name.
    if cursor.char_at(name_start + name_len - 1) == b':' {
        return None;
    }

    let name = cursor.substring(name_start, name_len).to_ascii_lowercase();
    cursor.advance(i);

    let (mut attributes, slash) = normalize_attributes(cursor)?;
    if attributes.contains('&') {
        attributes = convert_entities(&attributes).into_owned();
    }
    let self_closing = slash || is_void(&name);

    Some(Tag {
        name,
        is_end_tag,
        self_closing,
        attributes,
    })
}

/* ============================== Attributes ============================== */

#[inline]
fn is_attr_name_char(b: u8) -> bool {
    !(is_ws(b) || matches!(b, b'=' | b'>' | b'/' | b'<' | b'"'))
}

/// ASCII XML name: letter, '_' or ':' first, then also digits, '.' and '-'.
fn is_xml_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    bytes
        .next()
        .is_some_and(|b| b.is_ascii_alphabetic() || matches!(b, b'_' | b':'))
        && bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b':' | b'.' | b'-'))
}

/// Form feed is HTML whitespace but not XML whitespace.
#[inline]
fn push_ws(out: &mut String, b: u8) {
    out.push(if b == b'\x0c' { ' ' } else { char::from(b) });
}

/// Consume attributes through the closing '>'. Returns the normalized text
/// and whether the tag ended with "/>".
fn normalize_attributes<S: AsRef<str>>(cursor: &mut Cursor<S>) -> Option<(String, bool)> {
    let mut out = String::new();
    let mut after_attribute = false;
    let mut seen: Vec<String> = Vec::new();

    loop {
        if cursor.at_end() {
            return None;
        }
        match cursor.peek(0) {
            b'>' => {
                cursor.advance(1);
                return Some((out, false));
            }
            b'/' => {
                if cursor.peek(1) == b'>' {
                    cursor.advance(2);
                    return Some((out, true));
                }
                // stray slash between attributes
                cursor.advance(1);
            }
            b'<' => return None,
            b'"' => {
                out.push_str("&#34;");
                cursor.advance(1);
            }
            // '=' with no attribute name in front of it
            b'=' => cursor.advance(1),
            b if is_ws(b) => {
                push_ws(&mut out, b);
                cursor.advance(1);
                after_attribute = false;
            }
            _ => {
                let mut attr = String::new();
                let name_len = attribute(cursor, &mut attr)?;
                let name = &attr[..name_len];
                if !is_xml_name(name) {
                    log::debug!(target: "xhtmlfix::tag", "dropping attribute with invalid name {name:?}");
                } else if seen.iter().any(|n| n == name) {
                    log::debug!(target: "xhtmlfix::tag", "dropping repeated attribute {name}");
                } else {
                    if after_attribute {
                        out.push(' ');
                    }
                    seen.push(name.to_owned());
                    out.push_str(&attr);
                    after_attribute = true;
                }
            }
        }
    }
}

/// One `name`, `name=value`, `name="value"` or `name='value'`. Returns the
/// length of the name, which starts `out`.
fn attribute<S: AsRef<str>>(cursor: &mut Cursor<S>, out: &mut String) -> Option<usize> {
    let name_start = cursor.position();
    while !cursor.at_end() && is_attr_name_char(cursor.peek(0)) {
        cursor.advance(1);
    }
    let name_len = cursor.position() - name_start;
    out.push_str(cursor.substring(name_start, name_len));

    let mut k = 0;
    while is_ws(cursor.peek(k)) {
        k += 1;
    }
    if cursor.peek(k) != b'=' {
        // minimized: `checked` → `checked="checked"`
        out.push_str("=\"");
        out.push_str(cursor.substring(name_start, name_len));
        out.push('"');
        return Some(name_len);
    }

    // whitespace around '=' is kept as written
    while is_ws(cursor.peek(0)) {
        push_ws(out, cursor.peek(0));
        cursor.advance(1);
    }
    out.push('=');
    cursor.advance(1);
    while is_ws(cursor.peek(0)) {
        push_ws(out, cursor.peek(0));
        cursor.advance(1);
    }

    attribute_value(cursor, out)?;
    Some(name_len)
}

fn attribute_value<S: AsRef<str>>(cursor: &mut Cursor<S>, out: &mut String) -> Option<()> {
    match cursor.peek(0) {
        quote @ (b'"' | b'\'') => {
            cursor.advance(1);
            out.push('"');
            if !copy_value(cursor, out, |b, _| b == quote) {
                return None;
            }
            cursor.advance(1);
            out.push('"');
        }
        b'>' => out.push_str("\"\""),
        b'/' if cursor.peek(1) == b'>' => out.push_str("\"\""),
        _ => {
            out.push('"');
            copy_value(cursor, out, |b, next| {
                is_ws(b) || b == b'>' || b == b'<' || (b == b'/' && next == b'>')
            });
            out.push('"');
        }
    }
    Some(())
}

/// Copy value text up to the first byte matching `stop(byte, next_byte)`,
/// escaping '"' and '<' and dropping restricted controls. Returns false when
/// the input ended first.
fn copy_value<S, F>(cursor: &mut Cursor<S>, out: &mut String, stop: F) -> bool
where
    S: AsRef<str>,
    F: Fn(u8, u8) -> bool,
{
    let start = cursor.position();
    let avail = cursor.rest().len();
    let mut i = 0;
    while i < avail && !stop(cursor.peek(i), cursor.peek(i + 1)) {
        i += 1;
    }

    for ch in cursor.substring(start, i).chars() {
        match ch {
            '"' => out.push_str("&#34;"),
            '<' => out.push_str("&#60;"),
            c if u8::try_from(c).is_ok_and(is_restricted_control) => {}
            _ => out.push(ch),
        }
    }
    cursor.advance(i);
    i < avail
}
