// src/convert.rs
//
// Single-pass driver.
//
// - Text is copied through; a stray '>' becomes "&gt;", '&' goes to the
//   entity converter, '<' goes to the tag parser.
// - A '<' that does not start a tag is written as "&lt;" and scanning resumes
//   right after it.
// - Start tags: closing policies of the open elements run first (innermost
//   out), then the tag is written and pushed unless self-closing.
// - End tags close back to the innermost open element of that name; end tags
//   with no open match are dropped.
// - script/style content is copied verbatim up to its end tag, shielded in
//   a comment-wrapped CDATA section unless it is already fully shielded.
// - C0 control characters other than tab, LF and CR are dropped everywhere.
// - At end of input every open element is closed, innermost first.

use std::borrow::Cow;

use memchr::{memchr, memchr3, memmem};

use crate::cursor::Cursor;
use crate::elements::{is_raw_text, is_restricted_control, is_ws, push_xml_text};
use crate::entities::convert_entity;
use crate::error::Error;
use crate::policy::{policy_for, Verdict};
use crate::stack::OpenElements;
use crate::tag::{parse_tag, Parsed, Tag};

const CDATA_OPEN: &str = "/*<![CDATA[*/";
const CDATA_CLOSE: &str = "/*]]>*/";

/// Convert HTML to well-formed XHTML.
///
/// Input without any `<`, `>`, `&` or control characters is returned
/// borrowed and unchanged.
pub fn convert(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    if memchr3(b'<', b'>', b'&', bytes).is_none()
        && !bytes.iter().any(|&b| is_restricted_control(b))
    {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + input.len() / 8 + 16);
    convert_into(&mut Cursor::new(input), &mut out);
    Cow::Owned(out)
}

/// Convert everything from the cursor's position to the end of its input,
/// appending to `out`.
pub fn convert_into<S: AsRef<str>>(cursor: &mut Cursor<S>, out: &mut String) {
    Converter {
        cursor,
        out,
        open: OpenElements::new(),
    }
    .run();
}

/// Convert raw bytes, which must be UTF-8.
pub fn convert_bytes(input: &[u8]) -> Result<String, Error> {
    let text = std::str::from_utf8(input).map_err(|e| Error::InvalidUtf8 {
        offset: e.valid_up_to(),
    })?;
    Ok(convert(text).into_owned())
}

struct Converter<'a, S> {
    cursor: &'a mut Cursor<S>,
    out: &'a mut String,
    open: OpenElements,
}

impl<S: AsRef<str>> Converter<'_, S> {
    fn run(mut self) {
        while !self.cursor.at_end() {
            match self.cursor.peek(0) {
                b'<' => self.markup(),
                b'>' => {
                    self.out.push_str("&gt;");
                    self.cursor.advance(1);
                }
                b'&' => convert_entity(self.cursor, self.out),
                _ => self.text_run(),
            }
        }

        if !self.open.is_empty() {
            log::trace!(
                target: "xhtmlfix::convert",
                "end of input closes {} open element(s)",
                self.open.len()
            );
        }
        self.close_to(0);
    }

    fn text_run(&mut self) {
        let rest = self.cursor.rest();
        let len = memchr3(b'<', b'>', b'&', rest).unwrap_or(rest.len());
        let start = self.cursor.position();
        push_xml_text(self.out, self.cursor.substring(start, len));
        self.cursor.advance(len);
    }

    fn markup(&mut self) {
        match parse_tag(self.cursor) {
            Parsed::Tag(tag) => self.handle_tag(tag),
            Parsed::Skipped => {}
            Parsed::Verbatim(range) => {
                push_xml_text(self.out, self.cursor.substring(range.start, range.len()));
            }
            Parsed::NotATag => {
                self.out.push_str("&lt;");
                self.cursor.advance(1);
            }
        }
    }

    fn handle_tag(&mut self, tag: Tag) {
        if tag.is_end_tag {
            // `</br>`, `</x/>`
            if tag.self_closing {
                return;
            }
            match self.open.index_of(&tag.name) {
                Some(index) => self.close_to(index),
                None => log::debug!(
                    target: "xhtmlfix::convert",
                    "dropping end tag </{}> with no open element",
                    tag.name
                ),
            }
            return;
        }

        self.apply_policies(&tag.name);

        self.out.push('<');
        self.out.push_str(&tag.name);
        self.out.push_str(&tag.attributes);
        if tag.self_closing {
            if self.out.ends_with(' ') {
                self.out.pop();
            }
            self.out.push_str("/>");
            return;
        }
        self.out.push('>');

        if is_raw_text(&tag.name) {
            let ended = self.raw_text(&tag.name);
            self.open.push(tag.name);
            if ended {
                self.close_to(self.open.len() - 1);
            }
        } else {
            self.open.push(tag.name);
        }
    }

    /// Run the closing policies of the open elements against a new start tag.
    fn apply_policies(&mut self, new_name: &str) {
        let mut i = self.open.len();
        while i > 0 {
            i -= 1;
            let Some(policy) = self.open.get(i).and_then(policy_for) else {
                continue;
            };
            let verdict = policy.evaluate(new_name, self.open.above(i));
            if verdict != Verdict::Continue {
                log::debug!(
                    target: "xhtmlfix::convert",
                    "<{new_name}> implicitly closes <{}>",
                    self.open.get(i).unwrap_or_default()
                );
            }
            match verdict {
                Verdict::Continue => {}
                Verdict::Close => self.close_to(i),
                Verdict::CloseAndStop => {
                    self.close_to(i);
                    break;
                }
            }
        }
    }

    /// Close the element at `index` and everything opened inside it.
    fn close_to(&mut self, index: usize) {
        let out = &mut *self.out;
        self.open.truncate_with(index, |name| {
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        });
    }

    /// Copy script/style content verbatim and consume its end tag. Returns
    /// false when the input ends first.
    fn raw_text(&mut self, name: &str) -> bool {
        let start = self.cursor.position();
        let found = find_end_tag(self.cursor.rest(), name);
        let content_len = found.map_or(self.cursor.rest().len(), |(off, _)| off);
        let content = self.cursor.substring(start, content_len);

        if is_shielded(content) {
            // e.g. our own earlier output
            push_xml_text(self.out, content);
        } else if !content.is_empty() {
            self.out.push_str(CDATA_OPEN);
            push_xml_text(self.out, &content.replace("]]>", "]]]]><![CDATA[>"));
            self.out.push_str(CDATA_CLOSE);
        }
        self.cursor.advance(content_len);

        match found {
            Some((_, end_len)) => {
                self.cursor.advance(end_len);
                true
            }
            None => {
                log::debug!(target: "xhtmlfix::convert", "<{name}> runs to the end of input");
                false
            }
        }
    }
}

/// True when `content` has at least one CDATA section, every section is
/// closed, and nothing between sections needs escaping.
fn is_shielded(content: &str) -> bool {
    const START: &[u8] = b"<![CDATA[";
    let mut rest = content.as_bytes();
    let mut sections = 0usize;
    loop {
        let outside = memmem::find(rest, START).unwrap_or(rest.len());
        if memchr3(b'<', b'>', b'&', &rest[..outside]).is_some() {
            return false;
        }
        if outside == rest.len() {
            return sections > 0;
        }
        let body = &rest[outside + START.len()..];
        let Some(end) = memmem::find(body, b"]]>") else {
            return false;
        };
        sections += 1;
        rest = &body[end + 3..];
    }
}

/// Offset and length of the first `</name>` (any case, optional whitespace
/// before '>') in `hay`.
fn find_end_tag(hay: &[u8], name: &str) -> Option<(usize, usize)> {
    let name = name.as_bytes();
    let mut j = 0usize;
    while let Some(off) = memchr(b'<', &hay[j..]) {
        let p = j + off;
        let name_end = p + 2 + name.len();
        if hay.get(p + 1) == Some(&b'/')
            && hay
                .get(p + 2..name_end)
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        {
            let mut k = name_end;
            while hay.get(k).is_some_and(|&b| is_ws(b)) {
                k += 1;
            }
            if hay.get(k) == Some(&b'>') {
                return Some((p, k + 1 - p));
            }
        }
        j = p + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv(s: &str) -> String {
        convert(s).into_owned()
    }

    #[test]
    fn fast_path_borrows() {
        assert!(matches!(convert(""), Cow::Borrowed("")));
        assert!(matches!(convert("plain text"), Cow::Borrowed("plain text")));
        assert!(matches!(convert("<p>"), Cow::Owned(_)));
        assert!(matches!(convert("bell\u{7}"), Cow::Owned(_)));
    }

    #[test]
    fn paragraphs() {
        assert_eq!(conv("<p>A<p>B"), "<p>A</p><p>B</p>");
        assert_eq!(conv("<p>A<div>B</div>"), "<p>A</p><div>B</div>");
        assert_eq!(conv("<p>A<o:p>B</o:p></p>"), "<p>A<o:p>B</o:p></p>");
        assert_eq!(conv("<p>A <b>bold<p>B"), "<p>A <b>bold</b></p><p>B</p>");
    }

    #[test]
    fn list_items() {
        assert_eq!(conv("<ul><li>1<li>2</ul>"), "<ul><li>1</li><li>2</li></ul>");
        assert_eq!(
            conv("<ul><li>1<ul><li>1.1</ul><li>2</li></ul>"),
            "<ul><li>1<ul><li>1.1</li></ul></li><li>2</li></ul>"
        );
    }

    #[test]
    fn table_cells_and_rows() {
        assert_eq!(
            conv("<table><tr><td>C1<td>C2"),
            "<table><tr><td>C1</td><td>C2</td></tr></table>"
        );
        assert_eq!(
            conv("<table><tr><td>a<tr><td>b</table>"),
            "<table><tr><td>a</td></tr><tr><td>b</td></tr></table>"
        );
    }

    #[test]
    fn nested_table_keeps_outer_cell_open() {
        assert_eq!(
            conv("<table><tr><td><table><tr><td>x<td>y</table><td>z</table>"),
            "<table><tr><td><table><tr><td>x</td><td>y</td></tr></table></td><td>z</td></tr></table>"
        );
    }

    #[test]
    fn void_elements_self_close() {
        assert_eq!(conv("<img src=x>"), "<img src=\"x\"/>");
        assert_eq!(conv("a<br>b<br />c"), "a<br/>b<br/>c");
        assert_eq!(conv("<hr>"), "<hr/>");
    }

    #[test]
    fn stray_brackets() {
        assert_eq!(conv("a > b"), "a &gt; b");
        assert_eq!(conv("a < b"), "a &lt; b");
        assert_eq!(conv("1<2"), "1&lt;2");
        assert_eq!(conv("<<p>"), "&lt;<p></p>");
    }

    #[test]
    fn malformed_tag_is_text_and_its_end_tag_is_dropped() {
        assert_eq!(
            conv("<div><a href=\"foo\"text</a></div>"),
            "<div>&lt;a href=\"foo\"text</div>"
        );
    }

    #[test]
    fn end_tags() {
        assert_eq!(conv("</b>text"), "text");
        assert_eq!(conv("<div><b>x</div>"), "<div><b>x</b></div>");
        assert_eq!(conv("a</br>b"), "ab");
        assert_eq!(conv("<p>x</p/>"), "<p>x</p>");
    }

    #[test]
    fn comments_vanish() {
        assert_eq!(conv("a<!-- <b>x</b> -->b"), "ab");
        assert_eq!(conv("<p>a<!-- x"), "<p>a</p>");
    }

    #[test]
    fn doctype_is_dropped() {
        assert_eq!(
            conv("<!DOCTYPE html>\n<html><body>x</html>"),
            "<html><body>x</body></html>"
        );
    }

    #[test]
    fn script_content_is_shielded() {
        assert_eq!(
            conv("<script>if (a < b && c) {}</script>"),
            "<script>/*<![CDATA[*/if (a < b && c) {}/*]]>*/</script>"
        );
        assert_eq!(conv("<script src=x></script>"), "<script src=\"x\"></script>");
        assert_eq!(conv("<style>p > a {}</STYLE >"), "<style>/*<![CDATA[*/p > a {}/*]]>*/</style>");
    }

    #[test]
    fn script_end_tag_search_is_exact() {
        assert_eq!(
            conv("<script>document.write('</scr' + 'ipt>');</script>"),
            "<script>/*<![CDATA[*/document.write('</scr' + 'ipt>');/*]]>*/</script>"
        );
        assert_eq!(
            conv("<script>x = '</scripts>';</script>"),
            "<script>/*<![CDATA[*/x = '</scripts>';/*]]>*/</script>"
        );
    }

    #[test]
    fn unterminated_script_runs_to_end() {
        assert_eq!(conv("<script>a<b"), "<script>/*<![CDATA[*/a<b/*]]>*/</script>");
    }

    #[test]
    fn cdata_terminator_inside_script_is_split() {
        assert_eq!(
            conv("<script>a[b[0]]>1</script>"),
            "<script>/*<![CDATA[*/a[b[0]]]]><![CDATA[>1/*]]>*/</script>"
        );
    }

    #[test]
    fn only_fully_shielded_content_skips_the_wrapper() {
        assert!(is_shielded("/*<![CDATA[*/x < y/*]]>*/"));
        assert!(is_shielded("\n<![CDATA[a]]>\n<![CDATA[b]]>\n"));
        assert!(!is_shielded(""));
        assert!(!is_shielded("x = 1;"));
        assert!(!is_shielded("var s = '<![CDATA[';"));
        assert!(!is_shielded("s='<![CDATA[x]]>'; if (a<b) {}"));
        assert!(!is_shielded("<![CDATA[x]]>&amp"));
    }

    #[test]
    fn stray_cdata_marker_in_script_is_still_wrapped() {
        assert_eq!(
            conv("<script>var s = '<![CDATA[';</script><p>x"),
            "<script>/*<![CDATA[*/var s = '<![CDATA[';/*]]>*/</script><p>x</p>"
        );
        assert_eq!(
            conv("<script>s='<![CDATA[x]]>'; if (a<b) {}</script>"),
            "<script>/*<![CDATA[*/s='<![CDATA[x]]]]><![CDATA[>'; if (a<b) {}/*]]>*/</script>"
        );
    }

    #[test]
    fn control_characters_are_dropped() {
        assert_eq!(conv("a\u{1}b"), "ab");
        assert_eq!(conv("<p>\u{0}x</p>"), "<p>x</p>");
        assert_eq!(conv("<script>a\u{7}</script>"), "<script>/*<![CDATA[*/a/*]]>*/</script>");
        assert_eq!(conv("<![CDATA[\u{2}]]>"), "<![CDATA[]]>");
        assert_eq!(conv("tab\tnewline\n"), "tab\tnewline\n");
    }

    #[test]
    fn self_closing_script_has_no_content() {
        assert_eq!(conv("<script src=x />y"), "<script src=\"x\"/>y");
    }

    #[test]
    fn growable_cursor_can_be_extended_before_converting() {
        let mut cursor = Cursor::new(String::from("<ul><li>a"));
        cursor.push_str("<li>b");
        let mut out = String::new();
        convert_into(&mut cursor, &mut out);
        assert_eq!(out, "<ul><li>a</li><li>b</li></ul>");
        assert!(cursor.at_end());
    }

    #[test]
    fn convert_into_starts_at_the_cursor_position() {
        let mut cursor = Cursor::new("ignored|<b>x");
        cursor.advance(8);
        let mut out = String::from("prefix:");
        convert_into(&mut cursor, &mut out);
        assert_eq!(out, "prefix:<b>x</b>");
    }

    #[test]
    fn bytes_must_be_utf8() {
        assert_eq!(convert_bytes(b"<p>ok").unwrap(), "<p>ok</p>");
        let err = convert_bytes(b"ab\xffcd").unwrap_err();
        assert!(matches!(err, Error::InvalidUtf8 { offset: 2 }));
    }

    #[test]
    fn find_end_tag_matches_case_insensitively() {
        assert_eq!(find_end_tag(b"abc</Script>", "script"), Some((3, 9)));
        assert_eq!(find_end_tag(b"abc</script\n>", "script"), Some((3, 10)));
        assert_eq!(find_end_tag(b"abc</scrip>", "script"), None);
        assert_eq!(find_end_tag(b"<", "script"), None);
    }
}
