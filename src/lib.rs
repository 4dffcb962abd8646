//! Repair tag-soup HTML and re-serialize it as well-formed XHTML.
//!
//! ```
//! assert_eq!(xhtmlfix::convert("<p>A<p>B"), "<p>A</p><p>B</p>");
//! assert_eq!(xhtmlfix::convert("<img src=x>"), "<img src=\"x\"/>");
//! assert_eq!(xhtmlfix::convert("caf&eacute; &amp; bar"), "caf&#233; &amp; bar");
//! ```
//!
//! One pass over the input: a cursor feeds a tag parser, an entity
//! converter and a stack of open elements. Closing policies decide when an
//! open element ends implicitly (`<p>`, `<li>`, table cells, ...), and every
//! element still open at the end is closed.

pub mod cursor;
pub mod elements;
pub mod entities;
mod entity_table;
pub mod policy;
pub mod stack;
pub mod tag;

mod convert;
mod error;

pub use convert::{convert, convert_bytes, convert_into};
pub use cursor::Cursor;
pub use error::Error;
