/* =============================== Core sets =============================== */
//
// Names reaching these predicates are already lowercased by the tag parser.

/// Elements that never have content or an end tag; always written `<x/>`.
pub fn is_void(name: &str) -> bool {
    matches_any(
        name,
        &[
            "area", "base", "basefont", "bgsound", "br", "col", "command", "embed", "frame",
            "hr", "img", "input", "isindex", "keygen", "link", "meta", "param", "source",
            "track", "wbr",
        ],
    )
}

/// Elements that do not terminate an enclosing paragraph. Any namespaced name
/// (`o:p`, `svg:rect`) counts as inline.
pub fn is_inline(name: &str) -> bool {
    name.contains(':')
        || matches_any(
            name,
            &[
                "a", "abbr", "acronym", "audio", "b", "bdi", "bdo", "big", "br", "button",
                "canvas", "cite", "code", "data", "datalist", "del", "dfn", "em", "embed",
                "font", "i", "iframe", "img", "input", "ins", "kbd", "label", "map", "mark",
                "math", "meter", "noscript", "object", "optgroup", "option", "output",
                "picture", "progress", "q", "rp", "rt", "ruby", "s", "samp", "script",
                "select", "small", "span", "strike", "strong", "style", "sub", "sup", "svg",
                "textarea", "time", "tt", "u", "var", "video", "wbr",
            ],
        )
}

/// Elements whose content is copied verbatim up to the matching end tag.
pub fn is_raw_text(name: &str) -> bool {
    matches_any(name, &["script", "style"])
}

/* ============================ Utility predicates ========================= */

#[inline]
pub(crate) fn matches_any(name: &str, set: &[&str]) -> bool {
    set.contains(&name)
}

/// Characters allowed in an element name after the first letter.
#[inline]
pub(crate) fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b':'
}

#[inline]
pub(crate) fn is_ws(b: u8) -> bool {
    b == b' ' || b == b'\t' || b == b'\n' || b == b'\r' || b == b'\x0c'
}

/// C0 controls other than tab, newline and carriage return. XML 1.0 has no
/// way to write them, not even as references.
#[inline]
pub(crate) fn is_restricted_control(b: u8) -> bool {
    b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r')
}

/// Append `text`, dropping restricted control characters.
pub(crate) fn push_xml_text(out: &mut String, text: &str) {
    if !text.bytes().any(is_restricted_control) {
        out.push_str(text);
        return;
    }
    out.extend(
        text.chars()
            .filter(|&c| !u8::try_from(c).is_ok_and(is_restricted_control)),
    );
}
