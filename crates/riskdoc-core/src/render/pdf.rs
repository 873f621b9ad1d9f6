//! Page drawing primitives and PDF assembly on top of `lopdf`. Output carries
//! no timestamps or random identifiers, so equal input gives equal bytes.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// A4 portrait in points.
pub(crate) const PAGE_WIDTH: f32 = 595.28;
pub(crate) const PAGE_HEIGHT: f32 = 841.89;
pub(crate) const POINTS_PER_MM: f32 = 72.0 / 25.4;

const PDF_VERSION: &str = "1.4";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub(crate) const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
    pub(crate) const WHITE: Rgb = Rgb(1.0, 1.0, 1.0);

    pub(crate) const fn hex(value: u32) -> Rgb {
        Rgb(
            ((value >> 16) & 0xFF) as f32 / 255.0,
            ((value >> 8) & 0xFF) as f32 / 255.0,
            (value & 0xFF) as f32 / 255.0,
        )
    }

    fn operands(self) -> Vec<Object> {
        vec![self.0.into(), self.1.into(), self.2.into()]
    }
}

/// Operations of one page, in PDF user space (origin bottom-left).
#[derive(Debug, Default, Clone)]
pub(crate) struct Canvas {
    ops: Vec<Operation>,
}

impl Canvas {
    fn push(&mut self, operator: &str, operands: Vec<Object>) {
        self.ops.push(Operation::new(operator, operands));
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.push("re", vec![x.into(), y.into(), w.into(), h.into()]);
    }

    pub(crate) fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        self.push("rg", color.operands());
        self.rect(x, y, w, h);
        self.push("f", vec![]);
    }

    pub(crate) fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb, width: f32) {
        self.push("w", vec![width.into()]);
        self.push("RG", color.operands());
        self.rect(x, y, w, h);
        self.push("S", vec![]);
    }

    pub(crate) fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb, width: f32) {
        self.push("w", vec![width.into()]);
        self.push("RG", color.operands());
        self.push("m", vec![from.0.into(), from.1.into()]);
        self.push("l", vec![to.0.into(), to.1.into()]);
        self.push("S", vec![]);
    }

    pub(crate) fn text(&mut self, at: (f32, f32), font: Font, size: f32, color: Rgb, text: &str) {
        self.push("BT", vec![]);
        self.push("Tf", vec![font.resource().into(), size.into()]);
        self.push("rg", color.operands());
        self.push("Td", vec![at.0.into(), at.1.into()]);
        self.push("Tj", vec![Object::string_literal(encode_text(text))]);
        self.push("ET", vec![]);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// WinAnsi bytes for `text`; characters outside the code page become `?`.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            ' '..='~' => ch as u8,
            _ => win_ansi(ch).unwrap_or(b'?'),
        })
        .collect()
}

fn win_ansi(ch: char) -> Option<u8> {
    let code = ch as u32;
    if (0xA0..=0xFF).contains(&code) {
        return Some(code as u8);
    }
    let byte = match ch {
        '€' => 0x80,
        '‚' => 0x82,
        '„' => 0x84,
        '…' => 0x85,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '›' => 0x9B,
        'œ' => 0x9C,
        'Ÿ' => 0x9F,
        '\t' => b' ',
        _ => return None,
    };
    Some(byte)
}

fn font_object(font: Font) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Serialize finished pages into a complete PDF file.
pub(crate) fn assemble(pages: &[Canvas], title: &str) -> lopdf::Result<Vec<u8>> {
    let mut doc = Document::with_version(PDF_VERSION);
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(font_object(Font::Regular));
    let bold_id = doc.add_object(font_object(Font::Bold));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            Font::Regular.resource() => regular_id,
            Font::Bold.resource() => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let content = Content {
            operations: page.ops.clone(),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let media_box: Vec<Object> = [0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT]
        .into_iter()
        .map(Object::from)
        .collect();
    let page_tree = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => media_box,
    };
    doc.objects.insert(pages_id, Object::Dictionary(page_tree));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(encode_text(title)),
        "Producer" => Object::string_literal("riskdoc"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
