//! HTML in and out of documents, driven by the parse rules and markup
//! renderers declared on the schema.

mod dom;
mod parse;
mod serialize;

pub use dom::{DomElement, DomNode, parse_dom};
pub use parse::parse_html;
pub use serialize::{serialize_fragment, serialize_html};
