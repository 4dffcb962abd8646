//! A small well-formedness check for converter output: tags nest, names are
//! XML names, attributes are quoted and unique, no bare '<' or '>' in text,
//! no restricted control characters, and every '&' starts a reference XML
//! understands without a DTD.

const XML_NAMED: &[&str] = &["amp", "lt", "gt", "quot", "apos"];

fn is_xml_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    bytes
        .next()
        .is_some_and(|b| b.is_ascii_alphabetic() || matches!(b, b'_' | b':'))
        && bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b':' | b'.' | b'-'))
}

fn is_xml_char(cp: u32) -> bool {
    matches!(cp, 0x9 | 0xA | 0xD | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF)
}

/// Find the '>' closing the tag at `i`, skipping quoted attribute values.
fn find_tag_end(s: &[u8], mut i: usize) -> Option<usize> {
    i += 1;
    let mut quote = 0u8;
    while i < s.len() {
        let b = s[i];
        if quote != 0 {
            if b == quote {
                quote = 0;
            }
        } else if b == b'"' || b == b'\'' {
            quote = b;
        } else if b == b'>' {
            return Some(i);
        } else if b == b'<' {
            return None;
        }
        i += 1;
    }
    None
}

fn check_references(text: &str, base: usize) -> Result<(), String> {
    let b = text.as_bytes();
    for (i, _) in text.match_indices('&') {
        let rest = &b[i + 1..];
        let len = rest.iter().position(|&c| c == b';');
        let ok = len.is_some_and(|len| {
            let body = &text[i + 1..i + 1 + len];
            if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).is_ok_and(is_xml_char)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.bytes().all(|c| c.is_ascii_digit())
                    && dec.parse::<u32>().is_ok_and(is_xml_char)
            } else {
                XML_NAMED.contains(&body)
            }
        });
        if !ok {
            return Err(format!("bad reference at byte {}", base + i));
        }
    }
    Ok(())
}

/// `attrs` is everything between the element name and '>' (or "/>").
fn check_attributes(attrs: &str, at: usize) -> Result<(), String> {
    let b = attrs.as_bytes();
    let mut seen: Vec<&str> = Vec::new();
    let mut i = 0usize;
    loop {
        while i < b.len() && is_xml_ws(b[i]) {
            i += 1;
        }
        if i >= b.len() {
            return Ok(());
        }
        let start = i;
        while i < b.len() && !(is_xml_ws(b[i]) || b[i] == b'=') {
            i += 1;
        }
        let name = &attrs[start..i];
        if !is_name(name) {
            return Err(format!("bad attribute name {name:?} in tag at byte {at}"));
        }
        if seen.contains(&name) {
            return Err(format!("repeated attribute {name:?} in tag at byte {at}"));
        }
        seen.push(name);

        while i < b.len() && is_xml_ws(b[i]) {
            i += 1;
        }
        if b.get(i) != Some(&b'=') {
            return Err(format!("attribute {name:?} without value in tag at byte {at}"));
        }
        i += 1;
        while i < b.len() && is_xml_ws(b[i]) {
            i += 1;
        }
        let quote = match b.get(i) {
            Some(&q @ (b'"' | b'\'')) => q,
            _ => return Err(format!("unquoted value for {name:?} in tag at byte {at}")),
        };
        i += 1;
        let close = b[i..]
            .iter()
            .position(|&c| c == quote)
            .ok_or_else(|| format!("unterminated value for {name:?} in tag at byte {at}"))?;
        if b[i..i + close].contains(&b'<') {
            return Err(format!("'<' in value of {name:?} in tag at byte {at}"));
        }
        i += close + 1;
        if i < b.len() && !is_xml_ws(b[i]) {
            return Err(format!("no space after {name:?} in tag at byte {at}"));
        }
    }
}

pub fn check_well_formed(xml: &str) -> Result<(), String> {
    if let Some(p) = xml
        .bytes()
        .position(|c| c < 0x20 && !matches!(c, b'\t' | b'\n' | b'\r'))
    {
        return Err(format!("control character at byte {p}"));
    }

    let b = xml.as_bytes();
    let mut open: Vec<&str> = Vec::new();
    let mut i = 0usize;
    let mut text_start = 0usize;

    while i < b.len() {
        match b[i] {
            b'<' => {
                check_references(&xml[text_start..i], text_start)?;
                if xml[i..].starts_with("<![CDATA[") {
                    let end = xml[i..]
                        .find("]]>")
                        .ok_or_else(|| format!("unterminated CDATA at byte {i}"))?;
                    i += end + 3;
                    text_start = i;
                    continue;
                }
                let end = find_tag_end(b, i).ok_or_else(|| format!("unterminated tag at byte {i}"))?;
                let inner = &xml[i + 1..end];
                check_references(inner, i + 1)?;

                if let Some(name) = inner.strip_prefix('/') {
                    let name = name.trim_end();
                    match open.pop() {
                        Some(top) if top == name => {}
                        other => return Err(format!("</{name}> at byte {i} closes {other:?}")),
                    }
                } else {
                    let name_len = inner
                        .find(|c: char| c.is_whitespace() || c == '/')
                        .unwrap_or(inner.len());
                    let name = &inner[..name_len];
                    if !is_name(name) {
                        return Err(format!("bad tag name {name:?} at byte {i}"));
                    }
                    let self_closing = inner.ends_with('/');
                    let attrs = &inner[name_len..inner.len() - usize::from(self_closing)];
                    check_attributes(attrs, i)?;
                    if !self_closing {
                        open.push(name);
                    }
                }
                i = end + 1;
                text_start = i;
            }
            b'>' => return Err(format!("bare '>' in text at byte {i}")),
            _ => i += 1,
        }
    }
    check_references(&xml[text_start..], text_start)?;

    if open.is_empty() {
        Ok(())
    } else {
        Err(format!("unclosed at end: {open:?}"))
    }
}
