//! Markdown Renderer
//!
//! Converts the constrained markdown subset the paper prompts ask for into a
//! structural block/inline tree. Two passes: lines are classified into block
//! tokens and grouped into blocks, then inline spans are parsed inside each
//! block. Anything outside the subset is kept as literal text.

pub mod html;
pub mod markdown;

pub use html::render_html;
pub use markdown::render;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Inline {
    Text(String),
    Bold(Vec<Inline>),
    Italic(Vec<Inline>),
    /// Bracketed span such as `[Smith et al., 2020]`, stored without brackets
    Citation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph { content: Vec<Inline> },
    BulletList { items: Vec<Vec<Inline>> },
    NumberedList { items: Vec<Vec<Inline>> },
}
