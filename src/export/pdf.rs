// PDF encoding of paginated layout with the built-in Helvetica fonts.
// Text is WinAnsi encoded; a character outside that set fails the export.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use super::layout::{FontFace, Page, PageSpec};
use crate::types::{AppError, AppResult};

const REGULAR_FONT: &str = "F1";
const BOLD_FONT: &str = "F2";
const ITALIC_FONT: &str = "F3";
const BOLD_ITALIC_FONT: &str = "F4";

fn font_name(face: FontFace) -> &'static str {
    match face {
        FontFace::Regular => REGULAR_FONT,
        FontFace::Bold => BOLD_FONT,
        FontFace::Italic => ITALIC_FONT,
        FontFace::BoldItalic => BOLD_ITALIC_FONT,
    }
}

pub fn encode_pdf(pages: &[Page], spec: &PageSpec) -> AppResult<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let italic_id = doc.add_object(font("Helvetica-Oblique"));
    let bold_italic_id = doc.add_object(font("Helvetica-BoldOblique"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR_FONT => regular_id,
            BOLD_FONT => bold_id,
            ITALIC_FONT => italic_id,
            BOLD_ITALIC_FONT => bold_italic_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let page_id = add_page(&mut doc, page, spec, pages_id)?;
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                points(spec.width),
                points(spec.height),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| AppError::Export(format!("Failed to write PDF: {}", e)))?;
    Ok(bytes)
}

fn font(base: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn add_page(doc: &mut Document, page: &Page, spec: &PageSpec, parent: ObjectId) -> AppResult<ObjectId> {
    let top = spec.height - spec.margin;
    let mut operations = Vec::new();

    for placed in page.lines.iter().filter(|placed| !placed.line.is_spacer()) {
        let line = &placed.line;
        let baseline = top - placed.y - line.font_size;

        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Td",
            vec![points(spec.margin + line.indent), points(baseline)],
        ));
        // each Tj advances the pen, so runs sit side by side
        for run in &line.runs {
            operations.push(Operation::new(
                "Tf",
                vec![font_name(run.face).into(), points(line.font_size)],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(win_ansi(&run.text)?)],
            ));
        }
        operations.push(Operation::new("ET", vec![]));
    }

    let content = Content { operations }
        .encode()
        .map_err(|e| AppError::Export(format!("Failed to encode page content: {}", e)))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => parent,
        "Contents" => content_id,
    }))
}

fn points(value: f32) -> Object {
    Object::Integer(value.round() as i64)
}

/// Map text onto WinAnsiEncoding
fn win_ansi(text: &str) -> AppResult<Vec<u8>> {
    text.chars()
        .map(|c| {
            let byte = match c {
                '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u8,
                '\u{20ac}' => 0x80,
                '\u{201a}' => 0x82,
                '\u{0192}' => 0x83,
                '\u{201e}' => 0x84,
                '\u{2026}' => 0x85,
                '\u{2020}' => 0x86,
                '\u{2021}' => 0x87,
                '\u{02c6}' => 0x88,
                '\u{2030}' => 0x89,
                '\u{0160}' => 0x8a,
                '\u{2039}' => 0x8b,
                '\u{0152}' => 0x8c,
                '\u{017d}' => 0x8e,
                '\u{2018}' => 0x91,
                '\u{2019}' => 0x92,
                '\u{201c}' => 0x93,
                '\u{201d}' => 0x94,
                '\u{2022}' => 0x95,
                '\u{2013}' => 0x96,
                '\u{2014}' => 0x97,
                '\u{02dc}' => 0x98,
                '\u{2122}' => 0x99,
                '\u{0161}' => 0x9a,
                '\u{203a}' => 0x9b,
                '\u{0153}' => 0x9c,
                '\u{017e}' => 0x9e,
                '\u{0178}' => 0x9f,
                _ => {
                    return Err(AppError::Export(format!(
                        "Character U+{:04X} has no glyph in the PDF fonts",
                        c as u32
                    )))
                }
            };
            Ok(byte)
        })
        .collect()
}
