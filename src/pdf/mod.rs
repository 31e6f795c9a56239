pub mod layout;
pub mod resources;
#[cfg(test)]
mod test_font;
pub mod text;
mod writer;

pub use layout::{DocumentLayout, Instruction, LayoutPage, Rgb, PAGE_HEIGHT, PAGE_WIDTH};
pub use resources::{
    EmbeddedFont, FontProgram, FsResolver, ImageAsset, ImageRequest, ImageSet, ImageSlot,
    ResolvedFonts, ResourceResolver,
};
pub use text::{FontFace, TextMeasure};
pub use writer::write_pdf;

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::RenderError;
use crate::invoice::{InvoiceRecord, Jurisdiction, Totals};
use layout::LayoutInput;

/// Characters every candidate font must draw besides the currency symbol
const BASE_COVERAGE: &str = "Aa0,.:#%()";

/// Everything needed to serialize one invoice
#[derive(Debug, Clone)]
pub struct RenderPlan {
    pub layout: DocumentLayout,
    pub fonts: ResolvedFonts,
    pub images: ImageSet,
    pub totals: Totals,
}

/// Turns invoice records into PDF bytes. Stateless apart from its resolver,
/// so one renderer can serve many invoices.
pub struct Renderer<R> {
    resolver: R,
}

impl<R: ResourceResolver> Renderer<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Render a complete document or fail without output
    #[tracing::instrument(skip_all, fields(invoice = %invoice.display_number()))]
    pub fn render(&self, invoice: &InvoiceRecord) -> Result<Vec<u8>, RenderError> {
        let plan = self.layout(invoice)?;
        let bytes = write_pdf(&plan.layout, &plan.fonts, &plan.images)?;
        debug!(pages = plan.layout.pages.len(), bytes = bytes.len(), "rendered invoice");
        Ok(bytes)
    }

    /// Resolve resources and lay out every page without serializing
    pub fn layout(&self, invoice: &InvoiceRecord) -> Result<RenderPlan, RenderError> {
        check_amounts(invoice)?;

        let jurisdiction = Jurisdiction::lookup(invoice.country.as_deref());
        let totals = Totals::for_record(invoice);
        if !totals.grand_total.is_finite() {
            return Err(RenderError::InvalidAmount("tax rate".to_string()));
        }
        if let Some(stored) = invoice.totals.as_ref() {
            let stale = totals.stale_fields(stored);
            if !stale.is_empty() {
                warn!(
                    fields = ?stale,
                    "stored totals disagree with line items, using recomputed values"
                );
            }
        }

        let fonts = self.fonts(invoice, jurisdiction);
        let company = invoice.company_name();
        let logo_slot = invoice.logo_reference().is_some()
            || company.is_some_and(|c| self.resolver.has_default_logo(c));

        let images = ImageSet {
            logo: logo_slot
                .then(|| {
                    self.resolver.resolve_image(&ImageRequest::Logo {
                        reference: invoice.logo_reference(),
                        company,
                    })
                })
                .flatten(),
            stamp: company.and_then(|c| self.resolver.resolve_image(&ImageRequest::Stamp { company: c })),
        };

        let input = LayoutInput {
            invoice,
            jurisdiction,
            totals,
            images: &images,
            logo_slot,
        };
        let layout = layout::compose(&input, &fonts);

        Ok(RenderPlan {
            layout,
            fonts,
            images,
            totals,
        })
    }

    /// Prefer fonts that draw every character of the invoice, then fonts
    /// that at least draw the currency symbol, then Helvetica
    fn fonts(&self, invoice: &InvoiceRecord, jurisdiction: &Jurisdiction) -> ResolvedFonts {
        let base = format!("{}{}", BASE_COVERAGE, jurisdiction.currency_symbol);
        let document = document_chars(invoice);
        let full: String = base
            .chars()
            .chain(document.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let pick = |face| {
            self.resolver
                .resolve_font(face, &full)
                .or_else(|| self.resolver.resolve_font(face, &base))
                .map_or(FontProgram::Builtin, FontProgram::Embedded)
        };
        let fonts = ResolvedFonts {
            regular: pick(FontFace::Regular),
            bold: pick(FontFace::Bold),
        };

        for face in [FontFace::Regular, FontFace::Bold] {
            if *fonts.program(face) == FontProgram::Builtin {
                warn!(?face, "no Unicode font found, falling back to Helvetica");
            }
            let missing = missing_chars(&fonts, face, &document);
            if !missing.is_empty() {
                warn!(?face, %missing, "font has no glyphs for some invoice text");
            }
        }
        fonts
    }
}

/// Every visible character the invoice may print from its own data
fn document_chars(invoice: &InvoiceRecord) -> BTreeSet<char> {
    let company = invoice.company.as_ref();
    let client = &invoice.client;
    let mut fields: Vec<Option<&str>> = vec![
        Some(invoice.display_number()),
        invoice.po_number.as_deref(),
        invoice.from_email.as_deref(),
        invoice.due_date.as_deref(),
        invoice.date.as_deref(),
        company.and_then(|c| c.name.as_deref()),
        company.and_then(|c| c.address.as_deref()),
        Some(client.name.as_str()),
        client.email.as_deref(),
        client.phone.as_deref(),
        client.address.as_deref(),
    ];
    fields.extend(invoice.items.iter().map(|item| Some(item.description.as_str())));
    if let Some(bank) = invoice.bank() {
        fields.extend([
            bank.bank_name.as_deref(),
            bank.branch_name.as_deref(),
            bank.branch_code.as_deref(),
            bank.account_type.as_deref(),
            bank.account_number.as_deref(),
            bank.account_holder.as_deref(),
            bank.swift_code.as_deref(),
            bank.ifsc_code.as_deref(),
        ]);
    }

    fields
        .into_iter()
        .flatten()
        .flat_map(str::chars)
        .filter(|ch| !ch.is_whitespace() && !ch.is_control())
        .collect()
}

fn missing_chars(fonts: &ResolvedFonts, face: FontFace, chars: &BTreeSet<char>) -> String {
    let mut buf = [0u8; 4];
    chars
        .iter()
        .copied()
        .filter(|ch| !fonts.covers(face, ch.encode_utf8(&mut buf)))
        .collect()
}

fn check_amounts(invoice: &InvoiceRecord) -> Result<(), RenderError> {
    for item in &invoice.items {
        if !item.hours.is_finite() || !item.rate.is_finite() || !item.amount().is_finite() {
            return Err(RenderError::InvalidAmount(format!(
                "line item '{}'",
                item.description
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use crate::config::{FontCandidate, RenderSettings};
    use crate::invoice::{CompanyInfo, LineItem, Recipient};

    const LATIN: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789.,:;#%()-/@";
    const JAPANESE: &str = "株式会社さくら大阪商事翻訳作業";

    fn japanese_invoice() -> InvoiceRecord {
        InvoiceRecord {
            invoice_number: Some("JP-7".to_string()),
            country: Some("japan".to_string()),
            company: Some(CompanyInfo {
                name: Some("株式会社さくら".to_string()),
                ..Default::default()
            }),
            client: Recipient {
                name: "大阪商事".to_string(),
                ..Default::default()
            },
            items: vec![LineItem {
                description: "翻訳作業".to_string(),
                hours: 2.0,
                rate: 5000.0,
                total: None,
            }],
            ..Default::default()
        }
    }

    fn fs_renderer(dir: &Path, candidates: Vec<(&str, Vec<u8>, u32)>) -> Renderer<FsResolver> {
        let mut fonts = Vec::new();
        for (name, bytes, index) in candidates {
            fs::write(dir.join(name), bytes).unwrap();
            fonts.push(FontCandidate {
                regular: name.to_string(),
                bold: None,
                index,
            });
        }
        let settings = RenderSettings {
            fonts,
            fetch_remote_logos: false,
            ..RenderSettings::default()
        };
        Renderer::new(FsResolver::from_settings(&settings, dir))
    }

    #[test]
    fn document_text_drives_font_choice() {
        let dir = TempDir::new().unwrap();
        let cjk = format!("{LATIN}{JAPANESE}");
        let renderer = fs_renderer(
            dir.path(),
            vec![
                ("latin.ttf", test_font::font(LATIN), 0),
                ("gothic.ttc", test_font::collection(&[LATIN, cjk.as_str()]), 1),
            ],
        );
        let invoice = japanese_invoice();

        let plan = renderer.layout(&invoice).unwrap();
        for face in [FontFace::Regular, FontFace::Bold] {
            assert!(plan.fonts.covers(face, JAPANESE));
        }

        let bytes = renderer.render(&invoice).unwrap();
        let body = String::from_utf8_lossy(&bytes);
        assert!(body.contains("/FontFile2"));
        // U+682A is the first character of the company name
        assert!(body.contains("<682A>"));
    }

    #[test]
    fn latin_fonts_still_serve_when_nothing_covers_the_text() {
        let dir = TempDir::new().unwrap();
        let renderer = fs_renderer(dir.path(), vec![("latin.ttf", test_font::font(LATIN), 0)]);
        let invoice = japanese_invoice();

        let plan = renderer.layout(&invoice).unwrap();
        assert!(matches!(plan.fonts.regular, FontProgram::Embedded(_)));
        assert!(!plan.fonts.covers(FontFace::Regular, "大阪商事"));
        let missing = missing_chars(&plan.fonts, FontFace::Bold, &document_chars(&invoice));
        assert_eq!(
            missing.chars().collect::<BTreeSet<_>>(),
            JAPANESE.chars().collect::<BTreeSet<_>>()
        );
        assert!(renderer.render(&invoice).unwrap().starts_with(b"%PDF-"));
    }

    #[test]
    fn document_chars_skip_whitespace() {
        let mut invoice = japanese_invoice();
        invoice.client.address = Some("1 Main\tSt\n".to_string());
        let chars = document_chars(&invoice);
        assert!(chars.contains(&'M'));
        assert!(chars.contains(&'翻'));
        assert!(!chars.iter().any(|c| c.is_whitespace()));
    }
}
