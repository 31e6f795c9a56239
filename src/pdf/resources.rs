//! Fonts and images the renderer may draw with. Everything here degrades:
//! a missing font falls back to Helvetica and a missing image is omitted.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};
use ttf_parser::{Face, GlyphId};

use crate::config::{resolve_path, BrandIdentity, FontCandidate, RenderSettings};
use crate::pdf::text::{builtin_width, winansi_covers, FontFace, TextMeasure};

/// A single TrueType face read from disk. Faces taken from a collection are
/// rebuilt as standalone fonts, so `data` always parses at index 0.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedFont {
    pub postscript_name: String,
    pub data: Vec<u8>,
}

impl EmbeddedFont {
    /// Parse face `index` of `data` and accept it only if it has TrueType
    /// outlines and covers `coverage`
    pub fn from_bytes(data: Vec<u8>, index: u32, coverage: &str) -> Result<Self, ResourceError> {
        let data = if data.starts_with(b"ttcf") {
            extract_face(&data, index)?
        } else {
            data
        };

        let face = Face::parse(&data, 0).map_err(|e| ResourceError::Font(e.to_string()))?;
        if face.tables().glyf.is_none() {
            return Err(ResourceError::Unsupported("CFF outlines".to_string()));
        }
        if let Some(missing) = coverage.chars().find(|ch| face.glyph_index(*ch).is_none()) {
            return Err(ResourceError::MissingGlyph(missing));
        }

        let postscript_name = face
            .names()
            .into_iter()
            .find(|name| name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .and_then(|name| name.to_string())
            .map(|name| {
                name.chars()
                    .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
                    .collect::<String>()
            })
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "EmbeddedFont".to_string());

        Ok(Self {
            postscript_name,
            data,
        })
    }

    pub fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, 0).ok()
    }
}

/// Copy one face of a `ttcf` collection into a standalone sfnt
fn extract_face(data: &[u8], index: u32) -> Result<Vec<u8>, ResourceError> {
    let face = Face::parse(data, index).map_err(|e| ResourceError::Font(e.to_string()))?;
    if face.tables().glyf.is_none() {
        return Err(ResourceError::Unsupported("CFF outlines".to_string()));
    }

    let mut tables = Vec::new();
    for record in face.raw_face().table_records {
        let start = record.offset as usize;
        let bytes = start
            .checked_add(record.length as usize)
            .and_then(|end| data.get(start..end))
            .ok_or_else(|| ResourceError::Font("table outside the collection".to_string()))?;
        tables.push((record.tag.to_bytes(), record.check_sum, bytes));
    }

    let count = tables.len() as u16;
    let selector = 15u16.saturating_sub(count.leading_zeros() as u16);
    let search_range = (1u16 << selector) * 16;
    let range_shift = (count * 16).saturating_sub(search_range);

    let mut out = Vec::new();
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    for value in [count, search_range, selector, range_shift] {
        out.extend_from_slice(&value.to_be_bytes());
    }

    let mut offset = 12 + 16 * tables.len();
    for (tag, check_sum, bytes) in &tables {
        out.extend_from_slice(tag);
        out.extend_from_slice(&check_sum.to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        offset += bytes.len().next_multiple_of(4);
    }
    for (_, _, bytes) in &tables {
        out.extend_from_slice(bytes);
        out.resize(out.len().next_multiple_of(4), 0);
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
pub enum FontProgram {
    /// One of the PDF base-14 Helvetica faces
    Builtin,
    Embedded(EmbeddedFont),
}

/// The regular and bold fonts chosen for one document
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFonts {
    pub regular: FontProgram,
    pub bold: FontProgram,
}

impl ResolvedFonts {
    pub fn builtin() -> Self {
        Self {
            regular: FontProgram::Builtin,
            bold: FontProgram::Builtin,
        }
    }

    pub fn program(&self, face: FontFace) -> &FontProgram {
        match face {
            FontFace::Regular => &self.regular,
            FontFace::Bold => &self.bold,
        }
    }
}

impl TextMeasure for ResolvedFonts {
    fn text_width(&self, face: FontFace, text: &str, size: f32) -> f32 {
        let FontProgram::Embedded(font) = self.program(face) else {
            return builtin_width(face, text, size);
        };
        let Some(parsed) = font.face() else {
            return builtin_width(face, text, size);
        };

        let per_unit = size / parsed.units_per_em() as f32;
        text.chars()
            .map(|ch| {
                let glyph = parsed.glyph_index(ch).unwrap_or(GlyphId(0));
                parsed.glyph_hor_advance(glyph).unwrap_or(0) as f32 * per_unit
            })
            .sum()
    }

    fn covers(&self, face: FontFace, text: &str) -> bool {
        match self.program(face) {
            FontProgram::Builtin => winansi_covers(text),
            FontProgram::Embedded(font) => font
                .face()
                .is_some_and(|parsed| text.chars().all(|ch| parsed.glyph_index(ch).is_some())),
        }
    }
}

/// A decoded raster image ready to become an image XObject
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    pub source: String,
    pub width: u32,
    pub height: u32,
    /// 8-bit RGB samples
    pub rgb: Vec<u8>,
    /// 8-bit alpha samples, only when the image has transparency
    pub alpha: Option<Vec<u8>>,
}

impl ImageAsset {
    pub fn decode(source: impl Into<String>, bytes: &[u8]) -> Result<Self, ResourceError> {
        let decoded = image::load_from_memory(bytes)?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        let rgb = rgba.pixels().flat_map(|p| [p.0[0], p.0[1], p.0[2]]).collect();
        let alpha = rgba
            .pixels()
            .any(|p| p.0[3] < 255)
            .then(|| rgba.pixels().map(|p| p.0[3]).collect());

        Ok(Self {
            source: source.into(),
            width,
            height,
            rgb,
            alpha,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// The graphics a document may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSlot {
    Logo,
    Stamp,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageSet {
    pub logo: Option<ImageAsset>,
    pub stamp: Option<ImageAsset>,
}

impl ImageSet {
    pub fn get(&self, slot: ImageSlot) -> Option<&ImageAsset> {
        match slot {
            ImageSlot::Logo => self.logo.as_ref(),
            ImageSlot::Stamp => self.stamp.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRequest<'a> {
    Logo {
        reference: Option<&'a str>,
        company: Option<&'a str>,
    },
    Stamp {
        company: &'a str,
    },
}

/// Why a single resource could not be used. Never escapes a render.
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("fetch: {0}")]
    Fetch(#[from] ureq::Error),

    #[error("decode: {0}")]
    Decode(#[from] image::ImageError),

    #[error("font: {0}")]
    Font(String),

    #[error("unsupported {0}")]
    Unsupported(String),

    #[error("no glyph for {0:?}")]
    MissingGlyph(char),

    #[error("path escapes the uploads directory")]
    UnsafePath,
}

/// Capability the renderer reads fonts and images through
pub trait ResourceResolver {
    /// A font of the given weight that covers every character of `coverage`,
    /// or `None` to use the built-in font
    fn resolve_font(&self, face: FontFace, coverage: &str) -> Option<EmbeddedFont>;

    fn resolve_image(&self, request: &ImageRequest<'_>) -> Option<ImageAsset>;

    /// Whether the company gets a logo even without a logo reference
    fn has_default_logo(&self, _company: &str) -> bool {
        false
    }
}

/// Where a logo reference may point, in lookup order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoSource {
    Upload(PathBuf),
    Absolute(PathBuf),
    Remote(String),
}

/// File name of an upload reference: the part after `/uploads/`, otherwise
/// the part after the last `/`
pub fn upload_key(reference: &str) -> &str {
    if let Some(pos) = reference.find("/uploads/") {
        &reference[pos + "/uploads/".len()..]
    } else if let Some(pos) = reference.rfind('/') {
        &reference[pos + 1..]
    } else {
        reference
    }
}

pub fn logo_sources(reference: &str, uploads_dir: &Path) -> Vec<LogoSource> {
    let mut sources = Vec::new();

    let key = upload_key(reference.trim());
    let key_path = Path::new(key);
    if !key.is_empty() && key_path.components().all(|c| matches!(c, Component::Normal(_))) {
        sources.push(LogoSource::Upload(uploads_dir.join(key_path)));
    }

    let as_path = Path::new(reference.trim());
    if as_path.is_absolute() {
        sources.push(LogoSource::Absolute(as_path.to_path_buf()));
    }

    let lower = reference.trim().to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        sources.push(LogoSource::Remote(reference.trim().to_string()));
    }

    sources
}

/// Filesystem- and network-backed resolver built from `[render]` settings
pub struct FsResolver {
    uploads_dir: PathBuf,
    fonts: Vec<FontCandidate>,
    brands: Vec<BrandIdentity>,
    fetch_remote: bool,
    timeout: Duration,
}

impl FsResolver {
    pub fn from_settings(settings: &RenderSettings, config_dir: &Path) -> Self {
        let anchor = |p: &str| resolve_path(p, config_dir).to_string_lossy().into_owned();

        Self {
            uploads_dir: resolve_path(&settings.uploads_dir, config_dir),
            fonts: settings
                .fonts
                .iter()
                .map(|f| FontCandidate {
                    regular: anchor(&f.regular),
                    bold: f.bold.as_deref().map(anchor),
                    index: f.index,
                })
                .collect(),
            brands: settings
                .brands
                .iter()
                .map(|b| BrandIdentity {
                    company: b.company.clone(),
                    stamp: b.stamp.as_deref().map(anchor),
                    logo: b.logo.as_deref().map(anchor),
                })
                .collect(),
            fetch_remote: settings.fetch_remote_logos,
            timeout: Duration::from_secs(settings.remote_timeout_secs),
        }
    }

    fn brand(&self, company: &str) -> Option<&BrandIdentity> {
        self.brands.iter().find(|b| b.matches(company))
    }

    fn load_font(path: &str, index: u32, coverage: &str) -> Result<EmbeddedFont, ResourceError> {
        EmbeddedFont::from_bytes(fs::read(path)?, index, coverage)
    }

    fn load_file(path: &Path) -> Result<ImageAsset, ResourceError> {
        let bytes = fs::read(path)?;
        ImageAsset::decode(path.display().to_string(), &bytes)
    }

    fn fetch(&self, url: &str) -> Result<ImageAsset, ResourceError> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .build()
            .into();
        let mut response = agent.get(url).call()?;
        let bytes = response.body_mut().read_to_vec()?;
        ImageAsset::decode(url, &bytes)
    }

    fn load_source(&self, source: &LogoSource) -> Result<Option<ImageAsset>, ResourceError> {
        match source {
            LogoSource::Upload(path) | LogoSource::Absolute(path) => {
                if !path.is_file() {
                    return Ok(None);
                }
                Self::load_file(path).map(Some)
            }
            LogoSource::Remote(url) if self.fetch_remote => self.fetch(url).map(Some),
            LogoSource::Remote(_) => Ok(None),
        }
    }

    fn resolve_logo(&self, reference: Option<&str>, company: Option<&str>) -> Option<ImageAsset> {
        if let Some(reference) = reference {
            for source in logo_sources(reference, &self.uploads_dir) {
                match self.load_source(&source) {
                    Ok(Some(asset)) => {
                        debug!(?source, "logo resolved");
                        return Some(asset);
                    }
                    Ok(None) => {}
                    Err(e) => warn!(?source, error = %e, "could not load company logo"),
                }
            }
        }

        let default = company
            .and_then(|c| self.brand(c))
            .and_then(|b| b.logo.as_deref())?;
        match Self::load_file(Path::new(default)) {
            Ok(asset) => Some(asset),
            Err(e) => {
                warn!(path = default, error = %e, "could not load default logo");
                None
            }
        }
    }

    fn resolve_stamp(&self, company: &str) -> Option<ImageAsset> {
        let path = self.brand(company).and_then(|b| b.stamp.as_deref())?;
        match Self::load_file(Path::new(path)) {
            Ok(asset) => Some(asset),
            Err(e) => {
                warn!(path, error = %e, "could not load stamp for signature");
                None
            }
        }
    }
}

impl ResourceResolver for FsResolver {
    fn resolve_font(&self, face: FontFace, coverage: &str) -> Option<EmbeddedFont> {
        for candidate in &self.fonts {
            let path = match face {
                FontFace::Regular => candidate.regular.as_str(),
                FontFace::Bold => candidate.bold.as_deref().unwrap_or(&candidate.regular),
            };
            if !Path::new(path).is_file() {
                continue;
            }
            match Self::load_font(path, candidate.index, coverage) {
                Ok(font) => {
                    debug!(path, ?face, name = %font.postscript_name, "using font");
                    return Some(font);
                }
                Err(e) => debug!(path, ?face, error = %e, "skipping font candidate"),
            }
        }
        debug!(?face, "no font candidate covers the requested text");
        None
    }

    fn resolve_image(&self, request: &ImageRequest<'_>) -> Option<ImageAsset> {
        match *request {
            ImageRequest::Logo { reference, company } => self.resolve_logo(reference, company),
            ImageRequest::Stamp { company } => self.resolve_stamp(company),
        }
    }

    fn has_default_logo(&self, company: &str) -> bool {
        self.brand(company).is_some_and(|b| b.logo.is_some())
    }
}
