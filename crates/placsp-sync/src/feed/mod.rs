//! Atom feed pages: element tree, decoded model and the page decoder

pub mod decoder;
pub mod model;
pub mod xml;

pub use decoder::{AtomDecoder, PageDecoder};
pub use model::{FeedLink, FeedPage, Record, Tombstone};
pub use xml::{XmlError, XmlNode};
