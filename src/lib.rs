//! Terminal studio for AI-assisted game development.
//!
//! Three columns: an asset chat on the left, a viewport and tabbed
//! workbench in the center, and a code chat on the right. The code
//! panel streams its replies and interprets them incrementally,
//! promoting the first complete fenced code block into the workbench
//! editor. The asset panel answers in whole replies and files
//! generated images into the asset library.
//!
//! One quirk of the streamed interpreter is deliberate: a reply must
//! accumulate at least three fence markers before extraction fires, so
//! a reply whose only code block is still open (one marker) or has just
//! closed (two markers, nothing after) does not extract until more of
//! the reply arrives. Replies that end at exactly two markers keep the
//! editor untouched.

pub mod api;
pub mod app;
pub mod config;
pub mod state;
pub mod terminal;
pub mod types;
pub mod ui;
pub mod util;

#[cfg(test)]
mod test_support;
