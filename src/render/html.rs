// HTML serialisation of rendered blocks for the preview surface

use super::{Block, Inline};

pub fn render_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            Block::Heading { level, content } => {
                out.push_str(&format!("<h{}>", level));
                push_inlines(&mut out, content);
                out.push_str(&format!("</h{}>\n", level));
            }
            Block::Paragraph { content } => {
                out.push_str("<p>");
                push_inlines(&mut out, content);
                out.push_str("</p>\n");
            }
            Block::BulletList { items } => push_list(&mut out, "ul", items),
            Block::NumberedList { items } => push_list(&mut out, "ol", items),
        }
    }
    out
}

fn push_list(out: &mut String, tag: &str, items: &[Vec<Inline>]) {
    out.push_str(&format!("<{}>\n", tag));
    for item in items {
        out.push_str("<li>");
        push_inlines(out, item);
        out.push_str("</li>\n");
    }
    out.push_str(&format!("</{}>\n", tag));
}

fn push_inlines(out: &mut String, spans: &[Inline]) {
    for span in spans {
        match span {
            Inline::Text(text) => push_escaped(out, text),
            Inline::Bold(children) => {
                out.push_str("<strong>");
                push_inlines(out, children);
                out.push_str("</strong>");
            }
            Inline::Italic(children) => {
                out.push_str("<em>");
                push_inlines(out, children);
                out.push_str("</em>");
            }
            Inline::Citation(text) => {
                out.push_str("<span class=\"citation\">[");
                push_escaped(out, text);
                out.push_str("]</span>");
            }
        }
    }
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
