use super::{Block, Inline};

/// Block token of a single source line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineToken<'a> {
    Blank,
    Heading(u8, &'a str),
    Bullet(&'a str),
    Numbered(&'a str),
    Text(&'a str),
}

fn classify(line: &str) -> LineToken<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineToken::Blank;
    }

    let hashes = trimmed.bytes().take_while(|b| *b == b'#').count();
    if (1..=3).contains(&hashes) && trimmed[hashes..].starts_with(' ') {
        return LineToken::Heading(hashes as u8, trimmed[hashes..].trim());
    }

    if let Some(item) = trimmed.strip_prefix("* ") {
        return LineToken::Bullet(item.trim());
    }

    let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && trimmed[digits..].starts_with(". ") {
        return LineToken::Numbered(trimmed[digits + 2..].trim());
    }

    LineToken::Text(trimmed)
}

enum Pending<'a> {
    Paragraph(Vec<&'a str>),
    Bullets(Vec<&'a str>),
    Numbered(Vec<&'a str>),
}

#[derive(Default)]
struct BlockBuilder<'a> {
    blocks: Vec<Block>,
    pending: Option<Pending<'a>>,
}

impl<'a> BlockBuilder<'a> {
    fn push(&mut self, token: LineToken<'a>) {
        match token {
            LineToken::Blank => self.flush(),
            LineToken::Heading(level, text) => {
                self.flush();
                self.blocks.push(Block::Heading {
                    level,
                    content: parse_inline(text),
                });
            }
            LineToken::Bullet(item) => {
                if let Some(Pending::Bullets(items)) = &mut self.pending {
                    items.push(item);
                } else {
                    self.start(Pending::Bullets(vec![item]));
                }
            }
            LineToken::Numbered(item) => {
                if let Some(Pending::Numbered(items)) = &mut self.pending {
                    items.push(item);
                } else {
                    self.start(Pending::Numbered(vec![item]));
                }
            }
            LineToken::Text(line) => {
                if let Some(Pending::Paragraph(lines)) = &mut self.pending {
                    lines.push(line);
                } else {
                    self.start(Pending::Paragraph(vec![line]));
                }
            }
        }
    }

    fn start(&mut self, pending: Pending<'a>) {
        self.flush();
        self.pending = Some(pending);
    }

    fn flush(&mut self) {
        let block = match self.pending.take() {
            None => return,
            Some(Pending::Paragraph(lines)) => Block::Paragraph {
                content: parse_inline(&lines.join(" ")),
            },
            Some(Pending::Bullets(items)) => Block::BulletList {
                items: items.into_iter().map(parse_inline).collect(),
            },
            Some(Pending::Numbered(items)) => Block::NumberedList {
                items: items.into_iter().map(parse_inline).collect(),
            },
        };
        self.blocks.push(block);
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

/// Render document text into blocks. Pure: equal input gives equal output.
pub fn render(text: &str) -> Vec<Block> {
    let mut builder = BlockBuilder::default();
    for line in text.lines() {
        builder.push(classify(line));
    }
    builder.finish()
}

fn parse_inline(text: &str) -> Vec<Inline> {
    let mut spans = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];
        if let Some((span, consumed)) = match_span(rest) {
            if !literal.is_empty() {
                spans.push(Inline::Text(std::mem::take(&mut literal)));
            }
            spans.push(span);
            i += consumed;
            continue;
        }
        // an unmatched `**` stays literal as a pair so it cannot open italics
        let step = if rest.starts_with("**") {
            2
        } else {
            rest.chars().next().map_or(1, char::len_utf8)
        };
        literal.push_str(&rest[..step]);
        i += step;
    }

    if !literal.is_empty() {
        spans.push(Inline::Text(literal));
    }
    spans
}

/// Span opening at the start of `rest`, with the number of bytes it consumes
fn match_span(rest: &str) -> Option<(Inline, usize)> {
    if let Some(after) = rest.strip_prefix("**") {
        let end = after.find("**")?;
        let inner = &after[..end];
        return is_tight(inner).then(|| (Inline::Bold(parse_inline(inner)), end + 4));
    }
    if let Some(after) = rest.strip_prefix('*') {
        let end = find_single_star(after)?;
        let inner = &after[..end];
        return is_tight(inner).then(|| (Inline::Italic(parse_inline(inner)), end + 2));
    }
    if let Some(after) = rest.strip_prefix('[') {
        let end = after.find(']')?;
        let inner = &after[..end];
        if inner.trim().is_empty() || inner.contains('[') {
            return None;
        }
        return Some((Inline::Citation(inner.to_string()), end + 2));
    }
    None
}

/// Position of the first `*` that is not half of a `**` pair
fn find_single_star(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut j = 0;
    while j < bytes.len() {
        if bytes[j] == b'*' {
            if bytes.get(j + 1) == Some(&b'*') {
                j += 2;
                continue;
            }
            return Some(j);
        }
        j += 1;
    }
    None
}

fn is_tight(inner: &str) -> bool {
    !inner.is_empty()
        && !inner.starts_with(char::is_whitespace)
        && !inner.ends_with(char::is_whitespace)
}
