//! Implicit end tags.
//!
//! Before a start tag is written, each open element that has a policy is
//! asked, innermost first, whether the new element ends it. A policy is one of
//! a small closed set of variants; the registry is a fixed lookup on the
//! element name.

use crate::elements::{is_inline, matches_any};

/// What to do with one open element when a new start tag arrives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Leave it open and look at the next one out.
    Continue,
    /// Close it (and everything inside it), then keep looking outward.
    Close,
    /// Close it and stop; the new element is its sibling.
    CloseAndStop,
}

/// Name sets for elements that end when a sibling or a new row/section starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Siblings {
    /// New elements that make this one a finished sibling.
    pub peers: &'static [&'static str],
    /// Containers that, when open inside this element, shield it: the new
    /// element belongs to the nested container instead.
    pub parents: &'static [&'static str],
    /// New elements that end this one at all.
    pub closers: &'static [&'static str],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClosingPolicy {
    /// `p`: ended by anything that is not inline.
    Paragraph,
    Siblings(Siblings),
}

impl ClosingPolicy {
    /// Decide for an open element, given the new element's name and the
    /// elements opened inside the open one (outermost first).
    pub fn evaluate(&self, new_name: &str, opened_inside: &[String]) -> Verdict {
        match self {
            ClosingPolicy::Paragraph => {
                if is_inline(new_name) {
                    Verdict::Continue
                } else {
                    Verdict::Close
                }
            }
            ClosingPolicy::Siblings(s) => {
                if !matches_any(new_name, s.closers) {
                    Verdict::Continue
                } else if opened_inside.iter().any(|n| matches_any(n, s.parents)) {
                    Verdict::Continue
                } else if matches_any(new_name, s.peers) {
                    Verdict::CloseAndStop
                } else {
                    Verdict::Close
                }
            }
        }
    }
}

/* =============================== Registry =============================== */

static LIST_ITEM: ClosingPolicy = ClosingPolicy::Siblings(Siblings {
    peers: &["li"],
    parents: &["ol", "ul"],
    closers: &["li"],
});

static TABLE_CELL: ClosingPolicy = ClosingPolicy::Siblings(Siblings {
    peers: &["td", "th"],
    parents: &["table"],
    closers: &["td", "th", "tr", "thead", "tbody", "tfoot", "caption"],
});

static TABLE_ROW: ClosingPolicy = ClosingPolicy::Siblings(Siblings {
    peers: &["tr"],
    parents: &["table"],
    closers: &["tr", "thead", "tbody", "tfoot", "caption"],
});

static TABLE_SECTION: ClosingPolicy = ClosingPolicy::Siblings(Siblings {
    peers: &["thead", "tbody", "tfoot", "caption"],
    parents: &["table"],
    closers: &["thead", "tbody", "tfoot", "caption"],
});

static DOCUMENT_SECTION: ClosingPolicy = ClosingPolicy::Siblings(Siblings {
    peers: &["head", "body"],
    parents: &["html"],
    closers: &["head", "body"],
});

static DEFINITION_ITEM: ClosingPolicy = ClosingPolicy::Siblings(Siblings {
    peers: &["dt", "dd"],
    parents: &["dl"],
    closers: &["dt", "dd"],
});

static OPTION: ClosingPolicy = ClosingPolicy::Siblings(Siblings {
    peers: &["option"],
    parents: &["select", "datalist"],
    closers: &["option", "optgroup"],
});

static OPTION_GROUP: ClosingPolicy = ClosingPolicy::Siblings(Siblings {
    peers: &["optgroup"],
    parents: &["select"],
    closers: &["optgroup"],
});

/// Policy for an open element, if it has one.
pub fn policy_for(name: &str) -> Option<&'static ClosingPolicy> {
    Some(match name {
        "p" => &ClosingPolicy::Paragraph,
        "li" => &LIST_ITEM,
        "td" | "th" => &TABLE_CELL,
        "tr" => &TABLE_ROW,
        "thead" | "tbody" | "tfoot" | "caption" => &TABLE_SECTION,
        "head" | "body" => &DOCUMENT_SECTION,
        "dt" | "dd" => &DEFINITION_ITEM,
        "option" => &OPTION,
        "optgroup" => &OPTION_GROUP,
        _ => return None,
    })
}
