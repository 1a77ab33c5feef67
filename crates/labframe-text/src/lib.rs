#![forbid(unsafe_code)]

//! Text transforms used when rendering laboratory records.
//!
//! Descriptions, publication notes and infrastructure blurbs are entered as
//! plain text by lab admins. [`linkify`] turns the URLs in them into anchors
//! while escaping everything else, so the result is safe to inject as HTML.

pub mod linkify;

pub use linkify::{LinkSpan, LinkifyOptions, escape_html, find_links, linked_html};
