//! Page layout
//!
//! Rendered blocks are laid out as wrapped lines on a canvas of fixed width,
//! then the canvas is sliced into pages of fixed content height. Widths are
//! estimated from an average glyph width; no font metrics are loaded.

use crate::config::ExportConfig;
use crate::render::{Block, Inline};
use crate::types::{AppError, AppResult};

pub const A4_WIDTH_PT: f32 = 595.0;
pub const A4_HEIGHT_PT: f32 = 842.0;
pub const DEFAULT_MARGIN_PT: f32 = 48.0;

pub const BODY_FONT_SIZE: f32 = 11.0;
pub const LINE_HEIGHT_FACTOR: f32 = 1.4;
/// Average Helvetica glyph advance as a fraction of the font size
const AVG_GLYPH_WIDTH_EM: f32 = 0.5;
const LIST_INDENT_PT: f32 = 14.0;

fn heading_size(level: u8) -> f32 {
    match level {
        1 => 20.0,
        2 => 16.0,
        _ => 13.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSpec {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            width: A4_WIDTH_PT,
            height: A4_HEIGHT_PT,
            margin: DEFAULT_MARGIN_PT,
        }
    }
}

impl From<&ExportConfig> for PageSpec {
    fn from(config: &ExportConfig) -> Self {
        Self {
            width: config.page_width,
            height: config.page_height,
            margin: config.margin,
        }
    }
}

impl PageSpec {
    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn content_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }

    fn validate(&self) -> AppResult<()> {
        if self.content_width() <= 0.0 || self.content_height() <= 0.0 {
            return Err(AppError::Export(format!(
                "Page {}x{} leaves no room inside a {} pt margin",
                self.width, self.height, self.margin
            )));
        }
        Ok(())
    }
}

/// One of the four Helvetica faces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontFace {
    fn bold(self) -> Self {
        match self {
            FontFace::Regular | FontFace::Bold => FontFace::Bold,
            FontFace::Italic | FontFace::BoldItalic => FontFace::BoldItalic,
        }
    }

    fn italic(self) -> Self {
        match self {
            FontFace::Regular | FontFace::Italic => FontFace::Italic,
            FontFace::Bold | FontFace::BoldItalic => FontFace::BoldItalic,
        }
    }
}

/// A stretch of a line set in a single face
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub face: FontFace,
}

/// One laid-out line. A line without runs is vertical spacing.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualLine {
    pub runs: Vec<TextRun>,
    pub font_size: f32,
    pub indent: f32,
    pub height: f32,
}

impl VisualLine {
    fn spacer(height: f32) -> Self {
        Self {
            runs: Vec::new(),
            font_size: BODY_FONT_SIZE,
            indent: 0.0,
            height,
        }
    }

    pub fn is_spacer(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }
}

/// The document as one continuous column of lines
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedVisual {
    pub width: f32,
    pub lines: Vec<VisualLine>,
}

impl RenderedVisual {
    pub fn height(&self) -> f32 {
        self.lines.iter().map(|line| line.height).sum()
    }
}

/// A line placed on a page, `y` measured down from the content top
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub line: VisualLine,
    pub y: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub lines: Vec<PlacedLine>,
}

impl Page {
    /// Height of the content placed on this page
    pub fn used_height(&self) -> f32 {
        self.lines
            .last()
            .map(|placed| placed.y + placed.line.height)
            .unwrap_or(0.0)
    }
}

type StyledChar = (char, FontFace);

pub fn layout(blocks: &[Block], spec: &PageSpec) -> RenderedVisual {
    let width = spec.content_width();
    let mut lines = Vec::new();

    for block in blocks {
        match block {
            Block::Heading { level, content } => {
                let size = heading_size(*level);
                let text = styled(content, FontFace::Bold);
                push_wrapped(&mut lines, &text, size, 0.0, width);
                lines.push(VisualLine::spacer(size * 0.5));
            }
            Block::Paragraph { content } => {
                let text = styled(content, FontFace::Regular);
                push_wrapped(&mut lines, &text, BODY_FONT_SIZE, 0.0, width);
                lines.push(VisualLine::spacer(BODY_FONT_SIZE * 0.8));
            }
            Block::BulletList { items } => {
                push_list(&mut lines, items, width, |_| "\u{2022} ".to_string());
            }
            Block::NumberedList { items } => {
                push_list(&mut lines, items, width, |idx| format!("{}. ", idx + 1));
            }
        }
    }

    // trailing spacing carries no content
    while lines.last().is_some_and(VisualLine::is_spacer) {
        lines.pop();
    }

    RenderedVisual { width, lines }
}

/// Flatten inline spans to characters tagged with the face they are set in
fn styled(spans: &[Inline], face: FontFace) -> Vec<StyledChar> {
    let mut out = Vec::new();
    push_styled(spans, face, &mut out);
    out
}

fn push_styled(spans: &[Inline], face: FontFace, out: &mut Vec<StyledChar>) {
    for span in spans {
        match span {
            Inline::Text(text) => out.extend(text.chars().map(|c| (c, face))),
            Inline::Bold(children) => push_styled(children, face.bold(), out),
            Inline::Italic(children) => push_styled(children, face.italic(), out),
            Inline::Citation(text) => {
                out.push(('[', face));
                out.extend(text.chars().map(|c| (c, face)));
                out.push((']', face));
            }
        }
    }
}

fn push_list(
    lines: &mut Vec<VisualLine>,
    items: &[Vec<Inline>],
    width: f32,
    marker: impl Fn(usize) -> String,
) {
    for (idx, item) in items.iter().enumerate() {
        let mut text: Vec<StyledChar> = marker(idx).chars().map(|c| (c, FontFace::Regular)).collect();
        push_styled(item, FontFace::Regular, &mut text);
        push_wrapped(lines, &text, BODY_FONT_SIZE, LIST_INDENT_PT, width);
    }
    lines.push(VisualLine::spacer(BODY_FONT_SIZE * 0.8));
}

fn push_wrapped(lines: &mut Vec<VisualLine>, text: &[StyledChar], font_size: f32, indent: f32, width: f32) {
    let glyph = font_size * AVG_GLYPH_WIDTH_EM;
    let max_chars = (((width - indent) / glyph).floor() as usize).max(1);
    let height = font_size * LINE_HEIGHT_FACTOR;

    for line in wrap(text, max_chars) {
        lines.push(VisualLine {
            runs: runs(line),
            font_size,
            indent,
            height,
        });
    }
}

/// Split on whitespace; each word carries the face of the gap before it
fn words(text: &[StyledChar]) -> Vec<(FontFace, &[StyledChar])> {
    let mut out = Vec::new();
    let mut gap = FontFace::Regular;
    let mut start = None;

    for (idx, &(c, face)) in text.iter().enumerate() {
        if c.is_whitespace() {
            if let Some(begin) = start.take() {
                out.push((gap, &text[begin..idx]));
            }
            gap = face;
        } else if start.is_none() {
            start = Some(idx);
        }
    }
    if let Some(begin) = start {
        out.push((gap, &text[begin..]));
    }
    out
}

/// Greedy word wrap; words longer than a line are split
fn wrap(text: &[StyledChar], max_chars: usize) -> Vec<Vec<StyledChar>> {
    let mut out = Vec::new();
    let mut current: Vec<StyledChar> = Vec::new();

    for (gap, mut word) in words(text) {
        while word.len() > max_chars {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            let (head, rest) = word.split_at(max_chars);
            out.push(head.to_vec());
            word = rest;
        }

        if !current.is_empty() && current.len() + 1 + word.len() > max_chars {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push((' ', gap));
        }
        current.extend_from_slice(word);
    }

    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Merge neighbouring characters of the same face
fn runs(line: Vec<StyledChar>) -> Vec<TextRun> {
    let mut out: Vec<TextRun> = Vec::new();
    for (c, face) in line {
        match out.last_mut() {
            Some(run) if run.face == face => run.text.push(c),
            _ => out.push(TextRun {
                text: c.to_string(),
                face,
            }),
        }
    }
    out
}

/// Slice the canvas into pages whose content never exceeds the page's
/// content height. Always yields at least one page.
pub fn paginate(visual: &RenderedVisual, spec: &PageSpec) -> AppResult<Vec<Page>> {
    spec.validate()?;
    let limit = spec.content_height();
    let mut pages = Vec::new();
    let mut page = Page::default();
    let mut y = 0.0;

    for line in &visual.lines {
        if line.height > limit {
            return Err(AppError::Export(format!(
                "A {:.1} pt line does not fit a {:.1} pt page",
                line.height, limit
            )));
        }
        if y + line.height > limit {
            pages.push(std::mem::take(&mut page));
            y = 0.0;
        }
        if y == 0.0 && line.is_spacer() {
            continue;
        }
        page.lines.push(PlacedLine {
            line: line.clone(),
            y,
        });
        y += line.height;
    }

    if !page.lines.is_empty() || pages.is_empty() {
        pages.push(page);
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render;

    fn plain(text: &str) -> Vec<StyledChar> {
        text.chars().map(|c| (c, FontFace::Regular)).collect()
    }

    fn wrap_plain(text: &str, max_chars: usize) -> Vec<String> {
        wrap(&plain(text), max_chars)
            .into_iter()
            .map(|line| line.into_iter().map(|(c, _)| c).collect())
            .collect()
    }

    fn run(text: &str, face: FontFace) -> TextRun {
        TextRun {
            text: text.to_string(),
            face,
        }
    }

    #[test]
    fn test_wrap_respects_width() {
        let lines = wrap_plain("the quick brown fox jumps over the lazy dog", 10);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(lines.join(" "), "the quick brown fox jumps over the lazy dog");

        let split = wrap_plain("abcdefghijklmnop", 5);
        assert_eq!(split, vec!["abcde", "fghij", "klmno", "p"]);
    }

    #[test]
    fn test_inline_emphasis_becomes_runs() {
        let visual = layout(&render("Plain **strong** and *soft* [Lee, 2020] end"), &PageSpec::default());
        assert_eq!(visual.lines.len(), 1);
        assert_eq!(
            visual.lines[0].runs,
            vec![
                run("Plain ", FontFace::Regular),
                run("strong", FontFace::Bold),
                run(" and ", FontFace::Regular),
                run("soft", FontFace::Italic),
                run(" [Lee, 2020] end", FontFace::Regular),
            ]
        );
        assert_eq!(visual.lines[0].text(), "Plain strong and soft [Lee, 2020] end");
    }

    #[test]
    fn test_heading_and_list_faces() {
        let visual = layout(&render("# The *fast* path\n\n* item **one**"), &PageSpec::default());
        let content: Vec<&VisualLine> = visual.lines.iter().filter(|l| !l.is_spacer()).collect();
        assert_eq!(
            content[0].runs,
            vec![
                run("The ", FontFace::Bold),
                run("fast", FontFace::BoldItalic),
                run(" path", FontFace::Bold),
            ]
        );
        assert_eq!(
            content[1].runs,
            vec![run("\u{2022} item ", FontFace::Regular), run("one", FontFace::Bold)]
        );
        assert_eq!(content[1].indent, LIST_INDENT_PT);
    }

    #[test]
    fn test_wrapped_emphasis_keeps_face_across_lines() {
        let text = format!("**{}**", "bold ".repeat(40).trim_end());
        let visual = layout(&render(&text), &PageSpec::default());
        assert!(visual.lines.len() >= 2);
        for line in &visual.lines {
            assert!(line.runs.iter().all(|r| r.face == FontFace::Bold));
        }
    }

    #[test]
    fn test_layout_uses_heading_sizes() {
        let visual = layout(&render("# Big\n\n## Mid\n\n### Small\n\nbody"), &PageSpec::default());
        let sizes: Vec<f32> = visual
            .lines
            .iter()
            .filter(|l| !l.is_spacer())
            .map(|l| l.font_size)
            .collect();
        assert_eq!(sizes, vec![20.0, 16.0, 13.0, 11.0]);
        assert!(!visual.lines.last().unwrap().is_spacer());
    }

    #[test]
    fn test_long_document_spans_pages() {
        let paragraph = "Lorem ipsum dolor sit amet consectetur adipiscing elit. ".repeat(40);
        let text = (0..12)
            .map(|i| format!("## Section {}\n\n{}", i, paragraph))
            .collect::<Vec<_>>()
            .join("\n\n");
        let spec = PageSpec::default();
        let visual = layout(&render(&text), &spec);
        assert!(visual.height() > spec.content_height());

        let pages = paginate(&visual, &spec).unwrap();
        assert!(pages.len() >= 2);
        for page in &pages {
            assert!(page.used_height() <= spec.content_height());
        }
        let placed: usize = pages.iter().map(|p| p.lines.iter().filter(|l| !l.line.is_spacer()).count()).sum();
        let source = visual.lines.iter().filter(|l| !l.is_spacer()).count();
        assert_eq!(placed, source);
    }

    #[test]
    fn test_empty_document_has_one_page() {
        let spec = PageSpec::default();
        let pages = paginate(&layout(&[], &spec), &spec).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].lines.is_empty());
    }

    #[test]
    fn test_line_taller_than_page_fails() {
        let spec = PageSpec {
            width: 300.0,
            height: 60.0,
            margin: 20.0,
        };
        let visual = layout(&render("# Heading"), &spec);
        assert!(matches!(paginate(&visual, &spec), Err(AppError::Export(_))));
    }
}
