//! Engine-independent page layout. Coordinates are PDF points with the
//! origin at the bottom-left corner of the page; text `y` is the baseline.

use crate::format::{format_amount, format_date, format_hours, format_percent, mm_to_pt};
use crate::invoice::{non_empty, BankDetails, InvoiceRecord, Jurisdiction, Totals};
use crate::pdf::resources::{ImageSet, ImageSlot};
use crate::pdf::text::{wrap_text, FontFace, TextMeasure};

/// A4 portrait
pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;
pub const MARGIN: f32 = 36.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const LEADING: f32 = 1.2;
/// Baseline offset below the top of a line box, as a fraction of the size
const ASCENT: f32 = 0.78;

const DEFAULT_COMPANY_NAME: &str = "Your Company";

const TABLE_FONT_SIZE: f32 = 10.0;
const CELL_PADDING: f32 = 6.0;
const COLUMN_SHARES: [f32; 4] = [0.40, 0.15, 0.20, 0.25];
const COLUMN_TITLES: [&str; 4] = ["Description", "Hours", "Rate", "Amount"];

const TOTALS_GAP: f32 = 20.0;
const TOTALS_PADDING: f32 = 8.0;
const TOTALS_LABEL_SHARE: f32 = 0.7;

const FOOTER_GAP: f32 = 50.0;
const FOOTER_LEFT_SHARE: f32 = 0.6;
const BANK_FONT_SIZE: f32 = 11.0;
const BANK_LEADING: f32 = 16.0;
const STAMP_GAP: f32 = 14.0;
/// Room left above the rule for a handwritten signature when there is no stamp
const SIGNING_SPACE: f32 = 30.0;
const RULE_WIDTH: f32 = 120.0;
const CAPTION_SIZE: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const HEADER_FILL: Rgb = Rgb(6, 81, 237);
    pub const TOTAL_FILL: Rgb = Rgb(245, 245, 245);
    pub const BORDER: Rgb = Rgb(191, 191, 191);

    /// Components scaled to 0..=1 for the content stream
    pub fn unit(self) -> (f32, f32, f32) {
        (
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Text {
        x: f32,
        y: f32,
        size: f32,
        face: FontFace,
        color: Rgb,
        text: String,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Option<Rgb>,
        stroke: Option<Rgb>,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
        color: Rgb,
    },
    Image {
        slot: ImageSlot,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutPage {
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLayout {
    pub title: String,
    pub pages: Vec<LayoutPage>,
}

impl DocumentLayout {
    /// Every text run in drawing order, across pages
    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.pages
            .iter()
            .flat_map(|page| page.instructions.iter())
            .filter_map(|instruction| match instruction {
                Instruction::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().any(|text| text.contains(needle))
    }

    pub fn image_slots(&self) -> Vec<ImageSlot> {
        self.pages
            .iter()
            .flat_map(|page| page.instructions.iter())
            .filter_map(|instruction| match instruction {
                Instruction::Image { slot, .. } => Some(*slot),
                _ => None,
            })
            .collect()
    }
}

/// Everything the layout reads besides font metrics
pub struct LayoutInput<'a> {
    pub invoice: &'a InvoiceRecord,
    pub jurisdiction: &'static Jurisdiction,
    pub totals: Totals,
    pub images: &'a ImageSet,
    /// The company has a logo reference or a default logo, resolved or not
    pub logo_slot: bool,
}

#[derive(Debug, Clone, Copy)]
enum Align {
    Left,
    Center,
    Right,
}

/// Accumulates instructions page by page. Vertical positions passed in are
/// distances from the top edge.
struct Composer<'a> {
    fonts: &'a dyn TextMeasure,
    pages: Vec<LayoutPage>,
    current: LayoutPage,
}

impl<'a> Composer<'a> {
    fn new(fonts: &'a dyn TextMeasure) -> Self {
        Self {
            fonts,
            pages: Vec::new(),
            current: LayoutPage::default(),
        }
    }

    fn new_page(&mut self) {
        let page = std::mem::take(&mut self.current);
        self.pages.push(page);
    }

    /// Start a new page if `height` does not fit below `top`
    fn reserve(&mut self, top: f32, height: f32) -> f32 {
        if top + height > PAGE_HEIGHT - MARGIN {
            self.new_page();
            MARGIN
        } else {
            top
        }
    }

    fn width(&self, face: FontFace, size: f32, text: &str) -> f32 {
        self.fonts.text_width(face, text, size)
    }

    fn wrap(&self, face: FontFace, size: f32, text: &str, max_width: f32) -> Vec<String> {
        wrap_text(text, max_width, |s| self.fonts.text_width(face, s, size))
    }

    fn text_on_baseline(
        &mut self,
        x: f32,
        baseline: f32,
        size: f32,
        face: FontFace,
        color: Rgb,
        text: &str,
    ) {
        if text.is_empty() {
            return;
        }
        self.current.instructions.push(Instruction::Text {
            x,
            y: PAGE_HEIGHT - baseline,
            size,
            face,
            color,
            text: text.to_string(),
        });
    }

    /// Single line whose box starts at `top`, aligned within `(left, width)`
    #[allow(clippy::too_many_arguments)]
    fn text_in(
        &mut self,
        span: (f32, f32),
        top: f32,
        size: f32,
        face: FontFace,
        color: Rgb,
        text: &str,
        align: Align,
    ) {
        let (left, width) = span;
        let x = match align {
            Align::Left => left,
            Align::Center => left + (width - self.width(face, size, text)) / 2.0,
            Align::Right => left + width - self.width(face, size, text),
        };
        self.text_on_baseline(x, top + size * ASCENT, size, face, color, text);
    }

    /// Wrapped left-aligned text; returns the top of the next line
    fn paragraph(
        &mut self,
        x: f32,
        top: f32,
        max_width: f32,
        size: f32,
        face: FontFace,
        text: &str,
    ) -> f32 {
        let mut top = top;
        for line in self.wrap(face, size, text, max_width) {
            self.text_in((x, max_width), top, size, face, Rgb::BLACK, &line, Align::Left);
            top += size * LEADING;
        }
        top
    }

    fn rect(
        &mut self,
        x: f32,
        top: f32,
        width: f32,
        height: f32,
        fill: Option<Rgb>,
        stroke: Option<Rgb>,
    ) {
        self.current.instructions.push(Instruction::Rect {
            x,
            y: PAGE_HEIGHT - top - height,
            width,
            height,
            fill,
            stroke,
        });
    }

    fn rule(&mut self, x1: f32, x2: f32, top: f32, width: f32) {
        let y = PAGE_HEIGHT - top;
        self.current.instructions.push(Instruction::Line {
            x1,
            y1: y,
            x2,
            y2: y,
            width,
            color: Rgb::BLACK,
        });
    }

    fn image(&mut self, slot: ImageSlot, x: f32, top: f32, width: f32, height: f32) {
        self.current.instructions.push(Instruction::Image {
            slot,
            x,
            y: PAGE_HEIGHT - top - height,
            width,
            height,
        });
    }

    fn finish(mut self, title: String) -> DocumentLayout {
        self.new_page();
        DocumentLayout {
            title,
            pages: self.pages,
        }
    }
}

/// Scale `(width, height)` to fit the box, keeping the aspect ratio
fn fit(width: u32, height: u32, max_width: f32, max_height: f32) -> (f32, f32) {
    let (width, height) = (width as f32, height as f32);
    let scale = (max_width / width).min(max_height / height);
    (width * scale, height * scale)
}

/// Currency symbol the bold font can actually draw
pub fn display_symbol(jurisdiction: &Jurisdiction, fonts: &dyn TextMeasure) -> &'static str {
    if fonts.covers(FontFace::Bold, jurisdiction.currency_symbol) {
        jurisdiction.currency_symbol
    } else {
        jurisdiction.fallback_symbol
    }
}

/// Lay out a whole invoice
pub fn compose(input: &LayoutInput<'_>, fonts: &dyn TextMeasure) -> DocumentLayout {
    let mut composer = Composer::new(fonts);
    let symbol = display_symbol(input.jurisdiction, fonts);

    logo(&mut composer, input.images);
    let header_bottom = header(&mut composer, input);
    metadata(&mut composer, input.invoice);
    let bill_bottom = bill_to(&mut composer, input.invoice, (header_bottom + 8.0).max(mm_to_pt(42.0)));

    let table_top = bill_bottom.max(mm_to_pt(77.0)) + mm_to_pt(10.0);
    let table_bottom = line_items(&mut composer, input, table_top);
    let totals_bottom = totals(&mut composer, input, symbol, table_bottom);
    footer(&mut composer, input, totals_bottom);

    composer.finish(format!("Invoice {}", input.invoice.display_number()))
}

fn logo(composer: &mut Composer<'_>, images: &ImageSet) {
    if let Some(asset) = images.logo.as_ref() {
        let (width, height) = fit(asset.width, asset.height, mm_to_pt(34.0), mm_to_pt(20.0));
        composer.image(ImageSlot::Logo, mm_to_pt(14.0), mm_to_pt(10.0), width, height);
    }
}

fn header(composer: &mut Composer<'_>, input: &LayoutInput<'_>) -> f32 {
    let x = if input.logo_slot {
        mm_to_pt(50.0)
    } else {
        mm_to_pt(14.0)
    };
    let max_width = mm_to_pt(90.0);
    let invoice = input.invoice;

    let name = invoice.company_name().unwrap_or(DEFAULT_COMPANY_NAME).trim();
    let mut top = composer.paragraph(x, mm_to_pt(14.0), max_width, 11.0, FontFace::Bold, name);

    let address = invoice
        .company
        .as_ref()
        .and_then(|c| non_empty(c.address.as_deref()));
    for line in address.into_iter().flat_map(str::lines) {
        let line = line.trim();
        if !line.is_empty() {
            top = composer.paragraph(x, top, max_width, 9.0, FontFace::Regular, line);
        }
    }

    if let Some(email) = non_empty(invoice.from_email.as_deref()) {
        let text = format!("Email: {}", email.trim());
        top = composer.paragraph(x, top, max_width, 9.0, FontFace::Regular, &text);
    }
    if let Some(po) = non_empty(invoice.po_number.as_deref()) {
        let text = format!("PO #: {}", po.trim());
        top = composer.paragraph(x, top, max_width, 11.0, FontFace::Bold, &text);
    }
    top
}

fn metadata(composer: &mut Composer<'_>, invoice: &InvoiceRecord) {
    let right = PAGE_WIDTH - mm_to_pt(14.0);
    let rows = [
        (18.0, Some(format!("Invoice #: {}", invoice.display_number()))),
        (
            25.0,
            non_empty(invoice.date.as_deref()).map(|d| format!("Date: {}", format_date(d))),
        ),
        (
            32.0,
            non_empty(invoice.due_date.as_deref()).map(|d| format!("Due Date: {}", format_date(d))),
        ),
    ];

    for (baseline_mm, text) in rows {
        if let Some(text) = text {
            let x = right - composer.width(FontFace::Bold, 11.0, &text);
            composer.text_on_baseline(x, mm_to_pt(baseline_mm), 11.0, FontFace::Bold, Rgb::BLACK, &text);
        }
    }
}

fn bill_to(composer: &mut Composer<'_>, invoice: &InvoiceRecord, start: f32) -> f32 {
    const SIZE: f32 = 10.0;
    let x = mm_to_pt(14.0);
    let max_width = mm_to_pt(80.0);
    let client = &invoice.client;

    let mut top = composer.paragraph(x, start, max_width, SIZE, FontFace::Bold, "Bill To:");
    if let Some(name) = non_empty(Some(client.name.as_str())) {
        top = composer.paragraph(x, top, max_width, SIZE, FontFace::Regular, name.trim());
    }

    let address = non_empty(client.address.as_deref()).map(|a| {
        a.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    });
    let rows = [
        ("Email:", non_empty(client.email.as_deref()).map(|v| v.trim().to_string())),
        ("Phone:", non_empty(client.phone.as_deref()).map(|v| v.trim().to_string())),
        ("Address:", address),
    ];

    let label_width = rows
        .iter()
        .map(|(label, _)| composer.width(FontFace::Regular, SIZE, label))
        .fold(0.0, f32::max)
        + 6.0;

    for (label, value) in rows {
        let Some(value) = value else { continue };
        composer.text_in((x, label_width), top, SIZE, FontFace::Regular, Rgb::BLACK, label, Align::Left);
        top = composer.paragraph(x + label_width, top, max_width, SIZE, FontFace::Regular, &value);
    }
    top
}

fn columns() -> [(f32, f32); 4] {
    let mut left = MARGIN;
    COLUMN_SHARES.map(|share| {
        let width = CONTENT_WIDTH * share;
        let span = (left, width);
        left += width;
        span
    })
}

fn table_header(composer: &mut Composer<'_>, top: f32) -> f32 {
    let height = TABLE_FONT_SIZE * LEADING + 2.0 * CELL_PADDING;
    for ((x, width), title) in columns().into_iter().zip(COLUMN_TITLES) {
        composer.rect(x, top, width, height, Some(Rgb::HEADER_FILL), Some(Rgb::BORDER));
        composer.text_in(
            (x + CELL_PADDING, width - 2.0 * CELL_PADDING),
            top + CELL_PADDING,
            TABLE_FONT_SIZE,
            FontFace::Bold,
            Rgb::WHITE,
            title,
            Align::Center,
        );
    }
    top + height
}

fn line_items(composer: &mut Composer<'_>, input: &LayoutInput<'_>, start: f32) -> f32 {
    let cols = columns();
    let line_height = TABLE_FONT_SIZE * LEADING;
    let mut top = table_header(composer, start);

    for item in &input.invoice.items {
        let description = composer.wrap(
            FontFace::Regular,
            TABLE_FONT_SIZE,
            &item.description,
            cols[0].1 - 2.0 * CELL_PADDING,
        );
        let height = description.len().max(1) as f32 * line_height + 2.0 * CELL_PADDING;
        if top + height > PAGE_HEIGHT - MARGIN {
            composer.new_page();
            top = table_header(composer, MARGIN);
        }

        let cells = [
            (description, Align::Left),
            (vec![format_hours(item.hours)], Align::Center),
            (vec![format_amount(item.rate, input.jurisdiction)], Align::Right),
            (vec![format_amount(item.amount(), input.jurisdiction)], Align::Right),
        ];
        for ((x, width), (lines, align)) in cols.into_iter().zip(cells) {
            composer.rect(x, top, width, height, None, Some(Rgb::BORDER));
            let mut line_top = top + CELL_PADDING;
            for line in lines {
                composer.text_in(
                    (x + CELL_PADDING, width - 2.0 * CELL_PADDING),
                    line_top,
                    TABLE_FONT_SIZE,
                    FontFace::Regular,
                    Rgb::BLACK,
                    &line,
                    align,
                );
                line_top += line_height;
            }
        }
        top += height;
    }
    top
}

struct TotalsRow {
    label: String,
    value: String,
    face: FontFace,
    size: f32,
    fill: Option<Rgb>,
}

fn totals(composer: &mut Composer<'_>, input: &LayoutInput<'_>, symbol: &str, start: f32) -> f32 {
    let jurisdiction = input.jurisdiction;
    let totals = &input.totals;
    let width = CONTENT_WIDTH / 2.0;
    let left = MARGIN + CONTENT_WIDTH - width;
    let label_width = width * TOTALS_LABEL_SHARE;
    let value_width = width - label_width;

    let mut rows = vec![TotalsRow {
        label: "SubTotal".to_string(),
        value: format_amount(totals.subtotal, jurisdiction),
        face: FontFace::Regular,
        size: 10.0,
        fill: None,
    }];
    if totals.show_tax {
        rows.push(TotalsRow {
            label: format!("{} ({}%)", jurisdiction.tax_label, format_percent(totals.tax_rate)),
            value: format_amount(totals.tax, jurisdiction),
            face: FontFace::Regular,
            size: 10.0,
            fill: None,
        });
    }
    rows.push(TotalsRow {
        label: "Grand Total".to_string(),
        value: format!("{} {}", symbol, format_amount(totals.grand_total, jurisdiction)),
        face: FontFace::Bold,
        size: 12.0,
        fill: Some(Rgb::TOTAL_FILL),
    });

    let row_height = |row: &TotalsRow| row.size * LEADING + 2.0 * TOTALS_PADDING;
    let block_height: f32 = rows.iter().map(row_height).sum();
    let mut top = composer.reserve(start + TOTALS_GAP, block_height);

    for row in &rows {
        let height = row_height(row);
        if let Some(fill) = row.fill {
            composer.rect(left, top, width, height, Some(fill), None);
        }
        composer.text_in(
            (left + TOTALS_PADDING, label_width - 2.0 * TOTALS_PADDING),
            top + TOTALS_PADDING,
            row.size,
            row.face,
            Rgb::BLACK,
            &row.label,
            Align::Right,
        );
        composer.text_in(
            (left + label_width + TOTALS_PADDING, value_width - 2.0 * TOTALS_PADDING),
            top + TOTALS_PADDING,
            row.size,
            row.face,
            Rgb::BLACK,
            &row.value,
            Align::Right,
        );
        top += height;
    }
    top
}

/// A bold label followed by a regular value; the heading has no value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankLine {
    pub label: String,
    pub value: Option<String>,
}

impl BankLine {
    fn field(label: &str, value: &str) -> Self {
        Self {
            label: format!("{label}:"),
            value: Some(value.trim().to_string()),
        }
    }
}

/// Bank block lines, empty when the company has no bank details
pub fn bank_lines(bank: Option<&BankDetails>, jurisdiction: &Jurisdiction) -> Vec<BankLine> {
    let Some(bank) = bank else {
        return Vec::new();
    };

    let fields = [
        ("Bank Name", &bank.bank_name),
        ("Branch", &bank.branch_name),
        ("Branch Code", &bank.branch_code),
        ("Account Type", &bank.account_type),
        ("Account No", &bank.account_number),
        ("Account Holder", &bank.account_holder),
    ];

    let mut lines = vec![BankLine {
        label: "Bank Details:".to_string(),
        value: None,
    }];
    lines.extend(
        fields
            .into_iter()
            .filter_map(|(label, value)| non_empty(value.as_deref()).map(|v| BankLine::field(label, v))),
    );

    let swift = non_empty(bank.swift_code.as_deref());
    let ifsc = non_empty(bank.ifsc_code.as_deref());
    let routing = if jurisdiction.prefers_wire_code(swift.is_some()) {
        swift.or(ifsc).map(|code| BankLine::field("Swift Code", code))
    } else {
        ifsc.map(|code| BankLine::field(jurisdiction.domestic_code_label, code))
    };
    lines.extend(routing);
    lines
}

/// A bank line broken to fit the footer column. Continuation lines of the
/// value start under its first line.
struct WrappedBankLine {
    label: String,
    label_width: f32,
    values: Vec<String>,
}

impl WrappedBankLine {
    fn height(&self) -> f32 {
        self.values.len().max(1) as f32 * BANK_LEADING
    }
}

fn wrap_bank_line(composer: &Composer<'_>, line: BankLine, max_width: f32) -> WrappedBankLine {
    let label_width = composer.width(FontFace::Bold, BANK_FONT_SIZE, &line.label)
        + composer.width(FontFace::Regular, BANK_FONT_SIZE, " ");
    let values = line
        .value
        .map(|v| composer.wrap(FontFace::Regular, BANK_FONT_SIZE, &v, (max_width - label_width).max(1.0)))
        .unwrap_or_default();
    WrappedBankLine {
        label: line.label,
        label_width,
        values,
    }
}

fn footer(composer: &mut Composer<'_>, input: &LayoutInput<'_>, start: f32) {
    let left_width = CONTENT_WIDTH * FOOTER_LEFT_SHARE;
    let right = (MARGIN + left_width, CONTENT_WIDTH - left_width);

    let mut lines = Vec::new();
    for line in bank_lines(input.invoice.bank(), input.jurisdiction) {
        lines.push(wrap_bank_line(composer, line, left_width));
    }

    let stamp = input
        .images
        .stamp
        .as_ref()
        .map(|s| fit(s.width, s.height, mm_to_pt(18.0), f32::INFINITY));
    let caption_height = CAPTION_SIZE * LEADING + 4.0;
    let signature_height = caption_height + stamp.map_or(SIGNING_SPACE, |(_, h)| h + STAMP_GAP);
    let bank_height: f32 = lines.iter().map(WrappedBankLine::height).sum();
    let block_height = bank_height.max(signature_height);

    let top = composer.reserve(start + FOOTER_GAP, block_height);

    let mut line_top = top;
    for line in &lines {
        composer.text_in(
            (MARGIN, left_width),
            line_top,
            BANK_FONT_SIZE,
            FontFace::Bold,
            Rgb::BLACK,
            &line.label,
            Align::Left,
        );
        let value_span = (MARGIN + line.label_width, left_width - line.label_width);
        let mut value_top = line_top;
        for value in &line.values {
            composer.text_in(
                value_span,
                value_top,
                BANK_FONT_SIZE,
                FontFace::Regular,
                Rgb::BLACK,
                value,
                Align::Left,
            );
            value_top += BANK_LEADING;
        }
        line_top += line.height();
    }

    let bottom = top + block_height;
    let caption_top = bottom - CAPTION_SIZE * LEADING;
    composer.text_in(
        right,
        caption_top,
        CAPTION_SIZE,
        FontFace::Bold,
        Rgb::BLACK,
        "Authorised Signature",
        Align::Center,
    );

    let center = right.0 + right.1 / 2.0;
    let rule_top = bottom - caption_height;
    composer.rule(center - RULE_WIDTH / 2.0, center + RULE_WIDTH / 2.0, rule_top, 0.75);

    if let Some((width, height)) = stamp {
        composer.image(ImageSlot::Stamp, center - width / 2.0, rule_top - STAMP_GAP - height, width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::{CompanyInfo, LineItem, Recipient, INDIA, JAPAN};
    use crate::pdf::resources::ImageAsset;

    /// Every glyph half an em wide; the rupee sign is not covered
    struct HalfEm {
        rupee: bool,
    }

    impl TextMeasure for HalfEm {
        fn text_width(&self, _face: FontFace, text: &str, size: f32) -> f32 {
            text.chars().count() as f32 * size * 0.5
        }

        fn covers(&self, _face: FontFace, text: &str) -> bool {
            self.rupee || !text.contains('₹')
        }
    }

    fn record(items: usize) -> InvoiceRecord {
        InvoiceRecord {
            invoice_number: Some("INV-7".to_string()),
            date: Some("2024-03-05".to_string()),
            country: Some("india".to_string()),
            tax_rate: Some(18.0),
            company: Some(CompanyInfo {
                name: Some("Acme Consulting".to_string()),
                ..Default::default()
            }),
            client: Recipient {
                name: "Globex".to_string(),
                address: Some("1 Main St\n\nSpringfield".to_string()),
                ..Default::default()
            },
            items: (0..items)
                .map(|i| LineItem {
                    description: format!("Task {i}"),
                    hours: 1.0,
                    rate: 1000.0,
                    total: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    fn layout(invoice: &InvoiceRecord, images: &ImageSet, rupee: bool) -> DocumentLayout {
        let input = LayoutInput {
            invoice,
            jurisdiction: Jurisdiction::lookup(invoice.country.as_deref()),
            totals: Totals::for_record(invoice),
            images,
            logo_slot: false,
        };
        compose(&input, &HalfEm { rupee })
    }

    fn image(width: u32, height: u32) -> ImageAsset {
        ImageAsset {
            source: "test".to_string(),
            width,
            height,
            rgb: vec![0; (width * height * 3) as usize],
            alpha: None,
        }
    }

    #[test]
    fn metadata_is_right_aligned_on_fixed_baselines() {
        let doc = layout(&record(1), &ImageSet::default(), true);
        let right = PAGE_WIDTH - mm_to_pt(14.0);

        let found = doc.pages[0].instructions.iter().find_map(|i| match i {
            Instruction::Text { x, y, size, text, .. } if text == "Date: March 05, 2024" => {
                Some((*x + text.chars().count() as f32 * size * 0.5, *y))
            }
            _ => None,
        });
        let (end, baseline) = found.unwrap();
        assert!((end - right).abs() < 1e-3);
        assert!((baseline - (PAGE_HEIGHT - mm_to_pt(25.0))).abs() < 1e-3);
    }

    #[test]
    fn address_newlines_are_joined() {
        let doc = layout(&record(1), &ImageSet::default(), true);
        assert!(doc.contains_text("1 Main St, Springfield"));
        assert!(!doc.contains_text("Your Company"));
    }

    #[test]
    fn missing_company_name_uses_placeholder() {
        let mut invoice = record(1);
        invoice.company = None;
        let doc = layout(&invoice, &ImageSet::default(), true);
        assert!(doc.contains_text("Your Company"));
    }

    #[test]
    fn grand_total_falls_back_to_ascii_symbol() {
        let invoice = record(1);
        let with_rupee = layout(&invoice, &ImageSet::default(), true);
        let without = layout(&invoice, &ImageSet::default(), false);

        assert!(with_rupee.contains_text("₹ 1,180.00"));
        assert!(without.contains_text("Rs. 1,180.00"));
        assert!(!without.contains_text("₹"));
    }

    #[test]
    fn long_tables_continue_with_a_repeated_header() {
        let invoice = record(60);
        let doc = layout(&invoice, &ImageSet::default(), true);

        assert!(doc.pages.len() > 1);
        for page in &doc.pages {
            let has_rows = page.instructions.iter().any(
                |i| matches!(i, Instruction::Text { text, .. } if text.starts_with("Task ")),
            );
            let has_header = page.instructions.iter().any(
                |i| matches!(i, Instruction::Text { text, .. } if text == "Description"),
            );
            assert_eq!(has_rows, has_header);
        }
        for i in 0..60 {
            assert!(doc.texts().any(|t| t == format!("Task {i}")));
        }
        for page in &doc.pages {
            for instruction in &page.instructions {
                if let Instruction::Text { y, .. } = instruction {
                    assert!(*y > 0.0 && *y < PAGE_HEIGHT);
                }
            }
        }
    }

    #[test]
    fn japan_hides_tax_row() {
        let mut invoice = record(1);
        invoice.country = Some("japan".to_string());
        invoice.tax_rate = Some(10.0);
        let doc = layout(&invoice, &ImageSet::default(), true);

        assert!(!doc.contains_text("Consumption Tax"));
        assert!(doc.contains_text("JPY 1,000"));
    }

    fn pairs(lines: Vec<BankLine>) -> Vec<(String, Option<String>)> {
        lines.into_iter().map(|l| (l.label, l.value)).collect()
    }

    fn field(label: &str, value: &str) -> (String, Option<String>) {
        (label.to_string(), Some(value.to_string()))
    }

    #[test]
    fn bank_lines_pick_routing_code_by_jurisdiction() {
        let bank = BankDetails {
            bank_name: Some("State Bank".to_string()),
            account_number: Some("0011".to_string()),
            ifsc_code: Some("SBIN0001".to_string()),
            ..Default::default()
        };

        assert_eq!(
            pairs(bank_lines(Some(&bank), &INDIA)),
            vec![
                ("Bank Details:".to_string(), None),
                field("Bank Name:", "State Bank"),
                field("Account No:", "0011"),
                field("IFSC Code:", "SBIN0001"),
            ]
        );

        let japan = pairs(bank_lines(Some(&bank), &JAPAN));
        assert_eq!(japan.last(), Some(&field("Swift Code:", "SBIN0001")));

        let with_swift = BankDetails {
            swift_code: Some("SBININBB".to_string()),
            ..bank
        };
        let india_swift = pairs(bank_lines(Some(&with_swift), &INDIA));
        assert_eq!(india_swift.last(), Some(&field("Swift Code:", "SBININBB")));

        assert!(bank_lines(None, &INDIA).is_empty());
    }

    fn text_face(doc: &DocumentLayout, needle: &str) -> Option<(f32, f32, FontFace)> {
        doc.pages
            .iter()
            .flat_map(|page| page.instructions.iter())
            .find_map(|i| match i {
                Instruction::Text { x, y, face, text, .. } if text == needle => Some((*x, *y, *face)),
                _ => None,
            })
    }

    #[test]
    fn bank_labels_are_bold_and_values_regular() {
        let mut invoice = record(1);
        if let Some(company) = invoice.company.as_mut() {
            company.bank = Some(BankDetails {
                bank_name: Some("State Bank".to_string()),
                ..Default::default()
            });
        }
        let doc = layout(&invoice, &ImageSet::default(), true);

        let (label_x, label_y, label_face) = text_face(&doc, "Bank Name:").unwrap();
        let (value_x, value_y, value_face) = text_face(&doc, "State Bank").unwrap();
        assert_eq!(label_face, FontFace::Bold);
        assert_eq!(value_face, FontFace::Regular);
        assert_eq!(label_y, value_y);
        // "Bank Name:" plus a space, half an em per character
        assert!((value_x - label_x - 11.0 * 0.5 * BANK_FONT_SIZE).abs() < 1e-3);
        assert_eq!(text_face(&doc, "Bank Details:").map(|t| t.2), Some(FontFace::Bold));
    }

    #[test]
    fn totals_block_has_no_cell_borders() {
        let doc = layout(&record(1), &ImageSet::default(), true);
        let (_, subtotal_y, _) = text_face(&doc, "SubTotal").unwrap();
        let (_, grand_y, _) = text_face(&doc, "Grand Total").unwrap();

        let mut filled = 0;
        for instruction in &doc.pages[0].instructions {
            if let Instruction::Rect {
                y, height, fill, stroke, ..
            } = instruction
            {
                let spans = |t: f32| t >= *y && t <= *y + *height;
                if spans(subtotal_y) || spans(grand_y) {
                    assert!(stroke.is_none());
                    assert_eq!(*fill, Some(Rgb::TOTAL_FILL));
                    filled += 1;
                }
            }
        }
        assert_eq!(filled, 1);

        let value = doc
            .texts()
            .find(|t| t.starts_with("₹ "))
            .map(str::to_string)
            .unwrap();
        let (value_x, _, _) = text_face(&doc, &value).unwrap();
        let width = CONTENT_WIDTH / 2.0;
        let value_left = MARGIN + CONTENT_WIDTH - width + width * TOTALS_LABEL_SHARE;
        assert!(value_x >= value_left);
    }

    #[test]
    fn logo_and_stamp_are_scaled_to_their_boxes() {
        let images = ImageSet {
            logo: Some(image(400, 100)),
            stamp: Some(image(100, 100)),
        };
        let doc = layout(&record(1), &images, true);

        let sizes: Vec<(ImageSlot, f32, f32)> = doc.pages[0]
            .instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Image { slot, width, height, .. } => Some((*slot, *width, *height)),
                _ => None,
            })
            .collect();

        assert_eq!(sizes.len(), 2);
        let (_, logo_w, logo_h) = sizes[0];
        assert!((logo_w - mm_to_pt(34.0)).abs() < 1e-3);
        assert!((logo_h - mm_to_pt(8.5)).abs() < 1e-3);
        let (slot, stamp_w, stamp_h) = sizes[1];
        assert_eq!(slot, ImageSlot::Stamp);
        assert!((stamp_w - mm_to_pt(18.0)).abs() < 1e-3);
        assert!((stamp_h - stamp_w).abs() < 1e-3);
    }
}
