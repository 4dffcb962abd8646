//! Entity normalization.
//!
//! Every named character reference is rewritten as a decimal numeric
//! reference (`&mdash;` → `&#8212;`), numeric references pass through, and
//! any `&` that does not start a reference is escaped to `&amp;`.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::LazyLock;

use memchr::memchr;

use crate::cursor::Cursor;
use crate::entity_table::ENTITIES;

static BY_NAME: LazyLock<HashMap<&'static str, u32>> =
    LazyLock::new(|| ENTITIES.iter().copied().collect());

/// Names XML itself predefines. These are already valid and are kept as is.
const XML_PREDEFINED: &[&str] = &["amp", "lt", "gt", "quot", "apos"];

/// Code point for a named entity: exact case first, then lowercase.
pub fn lookup(name: &str) -> Option<u32> {
    if let Some(&cp) = BY_NAME.get(name) {
        return Some(cp);
    }
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        return BY_NAME.get(name.to_ascii_lowercase().as_str()).copied();
    }
    None
}

/// Code points XML 1.0 allows as characters.
fn is_xml_char(cp: u32) -> bool {
    matches!(cp, 0x9 | 0xA | 0xD | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF)
}

/// Length of a well-formed numeric reference at the cursor (`&#123;` or
/// `&#x1F;`), including `&` and `;`. References to characters XML cannot
/// carry (`&#0;`, surrogates) do not count.
fn numeric_reference_len<S: AsRef<str>>(cursor: &Cursor<S>) -> Option<usize> {
    if cursor.peek(1) != b'#' {
        return None;
    }
    let hex = matches!(cursor.peek(2), b'x' | b'X');
    let first_digit = if hex { 3 } else { 2 };
    let mut i = first_digit;
    loop {
        let b = cursor.peek(i);
        let ok = if hex {
            b.is_ascii_hexdigit()
        } else {
            b.is_ascii_digit()
        };
        if !ok {
            break;
        }
        i += 1;
    }
    if i == first_digit || cursor.peek(i) != b';' {
        return None;
    }
    let digits = cursor.substring(cursor.position() + first_digit, i - first_digit);
    let cp = u32::from_str_radix(digits, if hex { 16 } else { 10 }).ok()?;
    is_xml_char(cp).then_some(i + 1)
}

/// Convert the reference (or bare ampersand) at the cursor into `out`.
///
/// The cursor must be on `&`. It is always moved past at least that `&`.
pub fn convert_entity<S: AsRef<str>>(cursor: &mut Cursor<S>, out: &mut String) {
    debug_assert_eq!(cursor.peek(0), b'&');
    let start = cursor.position();

    if let Some(len) = numeric_reference_len(cursor) {
        out.push_str(cursor.substring(start, len));
        cursor.advance(len);
        return;
    }

    // Candidate name: a letter, then letters or digits (`frac12`, `sup2`).
    let mut n = 0usize;
    if cursor.peek(1).is_ascii_alphabetic() {
        n = 1;
        while cursor.peek(1 + n).is_ascii_alphanumeric() {
            n += 1;
        }
    }

    if n > 0 && cursor.peek(1 + n) == b';' {
        let name = cursor.substring(start + 1, n);
        if XML_PREDEFINED.contains(&name) {
            out.push_str(cursor.substring(start, n + 2));
        } else if let Some(cp) = lookup(name) {
            // Writing into a String cannot fail.
            let _ = write!(out, "&#{cp};");
        } else {
            log::debug!(target: "xhtmlfix::entities", "unknown entity &{name}; kept as text");
            out.push_str("&amp;");
            out.push_str(name);
            out.push(';');
        }
        cursor.advance(n + 2);
        return;
    }

    out.push_str("&amp;");
    cursor.advance(1);
}

/// Run entity normalization over a whole string. Borrowed when there is no
/// `&` to look at.
pub fn convert_entities(text: &str) -> Cow<'_, str> {
    if memchr(b'&', text.as_bytes()).is_none() {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    let mut cursor = Cursor::new(text);
    while !cursor.at_end() {
        match memchr(b'&', cursor.rest()) {
            Some(0) => convert_entity(&mut cursor, &mut out),
            Some(off) => {
                out.push_str(cursor.substring(cursor.position(), off));
                cursor.advance(off);
            }
            None => {
                out.push_str(cursor.substring(cursor.position(), cursor.rest().len()));
                cursor.advance(cursor.rest().len());
            }
        }
    }
    Cow::Owned(out)
}
