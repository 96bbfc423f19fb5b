//! Terminal widgets: layout math, the prompt editor, and frame rendering.

pub mod editor;
pub mod layout;
pub mod render;
