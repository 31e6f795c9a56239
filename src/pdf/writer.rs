//! Serializes a [`DocumentLayout`] with `pdf-writer`. This is the only place
//! a render can fail; the layout itself is infallible.

use std::borrow::Cow;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use miniz_oxide::deflate::compress_to_vec_zlib;
use pdf_writer::types::{CidFontType, FontFlags, SystemInfo};
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str, TextStr};
use tracing::debug;
use ttf_parser::Face;

use crate::error::RenderError;
use crate::pdf::layout::{DocumentLayout, Instruction, PAGE_HEIGHT, PAGE_WIDTH};
use crate::pdf::resources::{EmbeddedFont, FontProgram, ImageAsset, ImageSet, ImageSlot, ResolvedFonts};
use crate::pdf::text::{to_winansi, FontFace};

const COMPRESSION_LEVEL: u8 = 6;
const PRODUCER: &str = concat!("invoice-render ", env!("CARGO_PKG_VERSION"));

const FACES: [(FontFace, &[u8]); 2] = [(FontFace::Regular, b"F1"), (FontFace::Bold, b"F2")];
const SLOTS: [(ImageSlot, &[u8]); 2] = [(ImageSlot::Logo, b"Im1"), (ImageSlot::Stamp, b"Im2")];

struct RefAlloc(i32);

impl RefAlloc {
    fn next(&mut self) -> Ref {
        let id = Ref::new(self.0);
        self.0 += 1;
        id
    }
}

/// How text for one font resource is turned into content-stream bytes
enum Encoder<'a> {
    WinAnsi,
    Identity(Face<'a>),
}

impl Encoder<'_> {
    fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Encoder::WinAnsi => to_winansi(text),
            Encoder::Identity(face) => text
                .chars()
                .flat_map(|ch| face.glyph_index(ch).map_or(0, |g| g.0).to_be_bytes())
                .collect(),
        }
    }
}

fn deflate(data: &[u8]) -> Vec<u8> {
    compress_to_vec_zlib(data, COMPRESSION_LEVEL)
}

/// Write the layout to a complete PDF document
pub fn write_pdf(
    layout: &DocumentLayout,
    fonts: &ResolvedFonts,
    images: &ImageSet,
) -> Result<Vec<u8>, RenderError> {
    for (slot, _) in SLOTS {
        if let Some(asset) = images.get(slot) {
            validate_image(asset)?;
        }
    }
    validate_geometry(layout)?;

    let mut refs = RefAlloc(1);
    let catalog_id = refs.next();
    let tree_id = refs.next();
    let mut pdf = Pdf::new();

    let mut font_ids = Vec::with_capacity(FACES.len());
    let mut encoders = Vec::with_capacity(FACES.len());
    for (face, _) in FACES {
        let font_id = refs.next();
        let encoder = match fonts.program(face) {
            FontProgram::Builtin => {
                let base = match face {
                    FontFace::Regular => Name(b"Helvetica"),
                    FontFace::Bold => Name(b"Helvetica-Bold"),
                };
                pdf.type1_font(font_id)
                    .base_font(base)
                    .encoding_predefined(Name(b"WinAnsiEncoding"));
                Encoder::WinAnsi
            }
            FontProgram::Embedded(font) => {
                let parsed = Face::parse(&font.data, 0).map_err(|e| RenderError::FontEmbedding {
                    name: font.postscript_name.clone(),
                    reason: e.to_string(),
                })?;
                let used = used_glyphs(layout, face, &parsed);
                write_embedded_font(&mut pdf, &mut refs, font_id, font, &parsed, &used);
                Encoder::Identity(parsed)
            }
        };
        font_ids.push(font_id);
        encoders.push(encoder);
    }

    let mut image_ids = Vec::new();
    for (slot, name) in SLOTS {
        if let Some(asset) = images.get(slot) {
            let id = write_image(&mut pdf, &mut refs, asset);
            image_ids.push((slot, name, id));
        }
    }

    let mut page_ids = Vec::with_capacity(layout.pages.len());
    for page in &layout.pages {
        let page_id = refs.next();
        let content_id = refs.next();

        let mut content = Content::new();
        for instruction in &page.instructions {
            draw(&mut content, instruction, &encoders, &image_ids);
        }
        let stream = deflate(&content.finish());
        pdf.stream(content_id, &stream).filter(Filter::FlateDecode);

        let mut page_writer = pdf.page(page_id);
        page_writer
            .media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT))
            .parent(tree_id)
            .contents(content_id);
        let mut resources = page_writer.resources();
        {
            let mut font_dict = resources.fonts();
            for ((_, name), id) in FACES.iter().zip(&font_ids) {
                font_dict.pair(Name(name), *id);
            }
        }
        if !image_ids.is_empty() {
            let mut objects = resources.x_objects();
            for (_, name, id) in &image_ids {
                objects.pair(Name(name), *id);
            }
        }
        resources.finish();
        page_writer.finish();

        page_ids.push(page_id);
    }

    pdf.catalog(catalog_id).pages(tree_id);
    pdf.pages(tree_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);

    let info_id = refs.next();
    pdf.document_info(info_id)
        .title(TextStr(&layout.title))
        .producer(TextStr(PRODUCER));

    Ok(pdf.finish())
}

fn validate_geometry(layout: &DocumentLayout) -> Result<(), RenderError> {
    for (index, page) in layout.pages.iter().enumerate() {
        for instruction in &page.instructions {
            let (what, values): (&str, Vec<f32>) = match instruction {
                Instruction::Text { x, y, size, .. } => ("text position", vec![*x, *y, *size]),
                Instruction::Rect {
                    x, y, width, height, ..
                } => ("rectangle", vec![*x, *y, *width, *height]),
                Instruction::Line {
                    x1, y1, x2, y2, width, ..
                } => ("line", vec![*x1, *y1, *x2, *y2, *width]),
                Instruction::Image {
                    x, y, width, height, ..
                } => ("image placement", vec![*x, *y, *width, *height]),
            };
            if values.iter().any(|v| !v.is_finite()) {
                return Err(RenderError::InvalidGeometry {
                    what: what.to_string(),
                    page: index + 1,
                });
            }
        }
    }
    Ok(())
}

fn validate_image(asset: &ImageAsset) -> Result<(), RenderError> {
    let pixels = asset.width as usize * asset.height as usize;
    let alpha_ok = asset.alpha.as_ref().map_or(true, |a| a.len() == pixels);
    if pixels == 0 || asset.rgb.len() != pixels * 3 || !alpha_ok {
        return Err(RenderError::InvalidImage {
            name: asset.source.clone(),
            width: asset.width,
            height: asset.height,
        });
    }
    Ok(())
}

/// Glyph ids drawn with `face`, each mapped back to the character it shows
fn used_glyphs(layout: &DocumentLayout, face: FontFace, parsed: &Face<'_>) -> BTreeMap<u16, char> {
    let mut used = BTreeMap::new();
    let texts = layout
        .pages
        .iter()
        .flat_map(|page| page.instructions.iter())
        .filter_map(|instruction| match instruction {
            Instruction::Text { face: f, text, .. } if *f == face => Some(text.as_str()),
            _ => None,
        });
    for ch in texts.flat_map(str::chars) {
        if let Some(glyph) = parsed.glyph_index(ch) {
            used.entry(glyph.0).or_insert(ch);
        }
    }
    used
}

fn write_embedded_font(
    pdf: &mut Pdf,
    refs: &mut RefAlloc,
    font_id: Ref,
    font: &EmbeddedFont,
    parsed: &Face<'_>,
    used: &BTreeMap<u16, char>,
) {
    let descriptor_id = refs.next();
    let cid_font_id = refs.next();
    let file_id = refs.next();
    let to_unicode_id = refs.next();

    let glyphs: Vec<u16> = std::iter::once(0).chain(used.keys().copied()).collect();
    let (program, base_name) = match subsetter::subset(&font.data, 0, subsetter::Profile::pdf(&glyphs)) {
        Ok(subset) => (
            Cow::Owned(subset),
            format!("{}+{}", subset_tag(&glyphs), font.postscript_name),
        ),
        Err(e) => {
            debug!(font = %font.postscript_name, error = ?e, "subsetting failed, embedding the whole font");
            (Cow::Borrowed(font.data.as_slice()), font.postscript_name.clone())
        }
    };

    let base_font = Name(base_name.as_bytes());
    let scale = 1000.0 / parsed.units_per_em() as f32;
    let bbox = parsed.global_bounding_box();
    let ascent = parsed.ascender() as f32 * scale;

    let compressed = deflate(&program);
    pdf.stream(file_id, &compressed)
        .filter(Filter::FlateDecode)
        .pair(Name(b"Length1"), program.len() as i32);

    pdf.font_descriptor(descriptor_id)
        .name(base_font)
        .flags(FontFlags::SYMBOLIC)
        .bbox(Rect::new(
            bbox.x_min as f32 * scale,
            bbox.y_min as f32 * scale,
            bbox.x_max as f32 * scale,
            bbox.y_max as f32 * scale,
        ))
        .italic_angle(0.0)
        .ascent(ascent)
        .descent(parsed.descender() as f32 * scale)
        .cap_height(parsed.capital_height().map_or(ascent, |h| h as f32 * scale))
        .stem_v(80.0)
        .font_file2(file_id);

    {
        let mut cid_font = pdf.cid_font(cid_font_id);
        cid_font
            .subtype(CidFontType::Type2)
            .base_font(base_font)
            .system_info(SystemInfo {
                registry: Str(b"Adobe"),
                ordering: Str(b"Identity"),
                supplement: 0,
            })
            .font_descriptor(descriptor_id)
            .default_width(500.0)
            .cid_to_gid_map_predefined(Name(b"Identity"));

        let mut widths = cid_font.widths();
        let mut glyphs = used.keys().copied().peekable();
        while let Some(start) = glyphs.next() {
            let mut run = vec![advance(parsed, start, scale)];
            let mut last = start;
            while let Some(&next) = glyphs.peek() {
                if next != last + 1 {
                    break;
                }
                run.push(advance(parsed, next, scale));
                last = next;
                glyphs.next();
            }
            widths.consecutive(start, run);
        }
    }

    pdf.stream(to_unicode_id, to_unicode_cmap(used).as_bytes());

    pdf.type0_font(font_id)
        .base_font(base_font)
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_font_id)
        .to_unicode(to_unicode_id);
}

/// Six capital letters naming a subset, stable for the same glyph set
fn subset_tag(glyphs: &[u16]) -> String {
    let mut hasher = DefaultHasher::new();
    glyphs.hash(&mut hasher);
    let mut value = Hasher::finish(&hasher);
    (0..6)
        .map(|_| {
            let letter = (b'A' + (value % 26) as u8) as char;
            value /= 26;
            letter
        })
        .collect()
}

fn advance(parsed: &Face<'_>, glyph: u16, scale: f32) -> f32 {
    parsed
        .glyph_hor_advance(ttf_parser::GlyphId(glyph))
        .map_or(500.0, |adv| (adv as f32 * scale).round())
}

fn to_unicode_cmap(used: &BTreeMap<u16, char>) -> String {
    let pairs: Vec<(u16, char)> = used.iter().map(|(g, c)| (*g, *c)).collect();

    let mut sections = String::new();
    for chunk in pairs.chunks(100) {
        sections.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (glyph, ch) in chunk {
            let mut units = [0u16; 2];
            let utf16: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{:04X}", u))
                .collect();
            sections.push_str(&format!("<{:04X}> <{}>\n", glyph, utf16));
        }
        sections.push_str("endbfchar\n");
    }

    format!(
        "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
{sections}endcmap
CMapName currentdict /CMap defineresource pop
end
end"
    )
}

fn write_image(pdf: &mut Pdf, refs: &mut RefAlloc, asset: &ImageAsset) -> Ref {
    let id = refs.next();
    let mask_id = asset.alpha.as_ref().map(|alpha| {
        let mask_id = refs.next();
        let samples = deflate(alpha);
        let mut mask = pdf.image_xobject(mask_id, &samples);
        mask.filter(Filter::FlateDecode);
        mask.width(asset.width as i32);
        mask.height(asset.height as i32);
        mask.color_space().device_gray();
        mask.bits_per_component(8);
        mask_id
    });

    let samples = deflate(&asset.rgb);
    let mut xobject = pdf.image_xobject(id, &samples);
    xobject.filter(Filter::FlateDecode);
    xobject.width(asset.width as i32);
    xobject.height(asset.height as i32);
    xobject.color_space().device_rgb();
    xobject.bits_per_component(8);
    if let Some(mask_id) = mask_id {
        xobject.s_mask(mask_id);
    }
    id
}

fn draw(
    content: &mut Content,
    instruction: &Instruction,
    encoders: &[Encoder<'_>],
    images: &[(ImageSlot, &[u8], Ref)],
) {
    match instruction {
        Instruction::Text {
            x,
            y,
            size,
            face,
            color,
            text,
        } => {
            let index = FACES.iter().position(|(f, _)| f == face).unwrap_or(0);
            let (r, g, b) = color.unit();
            content.set_fill_rgb(r, g, b);
            content
                .begin_text()
                .set_font(Name(FACES[index].1), *size)
                .next_line(*x, *y)
                .show(Str(&encoders[index].encode(text)))
                .end_text();
        }
        Instruction::Rect {
            x,
            y,
            width,
            height,
            fill,
            stroke,
        } => {
            if let Some(fill) = fill {
                let (r, g, b) = fill.unit();
                content.set_fill_rgb(r, g, b);
            }
            if let Some(stroke) = stroke {
                let (r, g, b) = stroke.unit();
                content.set_stroke_rgb(r, g, b).set_line_width(0.5);
            }
            content.rect(*x, *y, *width, *height);
            match (fill, stroke) {
                (Some(_), Some(_)) => content.fill_nonzero_and_stroke(),
                (Some(_), None) => content.fill_nonzero(),
                (None, Some(_)) => content.stroke(),
                (None, None) => content.end_path(),
            };
        }
        Instruction::Line {
            x1,
            y1,
            x2,
            y2,
            width,
            color,
        } => {
            let (r, g, b) = color.unit();
            content
                .set_stroke_rgb(r, g, b)
                .set_line_width(*width)
                .move_to(*x1, *y1)
                .line_to(*x2, *y2)
                .stroke();
        }
        Instruction::Image {
            slot,
            x,
            y,
            width,
            height,
        } => {
            let Some((_, name, _)) = images.iter().find(|(s, _, _)| s == slot) else {
                return;
            };
            content
                .save_state()
                .transform([*width, 0.0, 0.0, *height, *x, *y])
                .x_object(Name(name))
                .restore_state();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::layout::{LayoutPage, Rgb};
    use crate::pdf::test_font;

    fn layout(instructions: Vec<Instruction>) -> DocumentLayout {
        DocumentLayout {
            title: "Invoice T-1".to_string(),
            pages: vec![LayoutPage { instructions }],
        }
    }

    fn text(x: f32, text: &str) -> Instruction {
        Instruction::Text {
            x,
            y: 700.0,
            size: 10.0,
            face: FontFace::Regular,
            color: Rgb::BLACK,
            text: text.to_string(),
        }
    }

    #[test]
    fn writes_a_complete_document() {
        let doc = layout(vec![text(40.0, "Invoice #: T-1")]);
        let bytes = write_pdf(&doc, &ResolvedFonts::builtin(), &ImageSet::default()).unwrap();

        assert!(bytes.starts_with(b"%PDF-"));
        let tail = String::from_utf8_lossy(&bytes[bytes.len().saturating_sub(64)..]).into_owned();
        assert!(tail.contains("%%EOF"));
        let body = String::from_utf8_lossy(&bytes);
        assert!(body.contains("/Helvetica-Bold"));
        assert!(body.contains("/WinAnsiEncoding"));
    }

    #[test]
    fn non_finite_coordinates_fail() {
        let doc = layout(vec![text(f32::NAN, "x")]);
        let err = write_pdf(&doc, &ResolvedFonts::builtin(), &ImageSet::default()).unwrap_err();
        assert!(matches!(err, RenderError::InvalidGeometry { page: 1, .. }));
    }

    #[test]
    fn empty_images_fail() {
        let images = ImageSet {
            logo: Some(ImageAsset {
                source: "logo.png".to_string(),
                width: 0,
                height: 10,
                rgb: Vec::new(),
                alpha: None,
            }),
            stamp: None,
        };
        let err = write_pdf(&layout(Vec::new()), &ResolvedFonts::builtin(), &images).unwrap_err();
        assert!(matches!(err, RenderError::InvalidImage { width: 0, .. }));
    }

    #[test]
    fn images_with_alpha_get_a_soft_mask() {
        let images = ImageSet {
            logo: None,
            stamp: Some(ImageAsset {
                source: "stamp.png".to_string(),
                width: 2,
                height: 1,
                rgb: vec![255; 6],
                alpha: Some(vec![0, 255]),
            }),
        };
        let doc = layout(vec![Instruction::Image {
            slot: ImageSlot::Stamp,
            x: 10.0,
            y: 10.0,
            width: 20.0,
            height: 10.0,
        }]);
        let bytes = write_pdf(&doc, &ResolvedFonts::builtin(), &images).unwrap();
        let body = String::from_utf8_lossy(&bytes);
        assert!(body.contains("/SMask"));
        assert!(body.contains("/Im2"));
    }

    #[test]
    fn embedded_fonts_are_written_as_type0_with_to_unicode() {
        let font = EmbeddedFont::from_bytes(test_font::font("Invoice#:T-1"), 0, "IT").unwrap();
        let fonts = ResolvedFonts {
            regular: FontProgram::Embedded(font.clone()),
            bold: FontProgram::Embedded(font),
        };
        let doc = layout(vec![text(40.0, "Invoice #: T-1")]);
        let bytes = write_pdf(&doc, &fonts, &ImageSet::default()).unwrap();
        let body = String::from_utf8_lossy(&bytes);

        for needle in [
            "/Type0",
            "/Identity-H",
            "/CIDFontType2",
            "/FontFile2",
            "/Length1",
            "/ToUnicode",
            "/W [1 [600 600 600",
        ] {
            assert!(body.contains(needle), "missing {needle}");
        }
        // 'I' is the fifth glyph after '#', '-', '1' and ':'
        assert!(body.contains("<0005> <0049>"));
        assert!(!body.contains("/Helvetica"));
    }

    #[test]
    fn subset_tags_are_stable_capitals() {
        let tag = subset_tag(&[0, 3, 7]);
        assert_eq!(tag.len(), 6);
        assert!(tag.chars().all(|c| c.is_ascii_uppercase()));
        assert_eq!(tag, subset_tag(&[0, 3, 7]));
    }

    #[test]
    fn to_unicode_maps_glyphs_to_utf16() {
        let used = BTreeMap::from([(3u16, 'A'), (1234u16, '₹')]);
        let cmap = to_unicode_cmap(&used);
        assert!(cmap.contains("2 beginbfchar"));
        assert!(cmap.contains("<0003> <0041>"));
        assert!(cmap.contains("<04D2> <20B9>"));
    }
}
