//! Text measurement, wrapping and WinAnsi encoding for the built-in fonts.

/// The two weights every invoice is set in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFace {
    Regular,
    Bold,
}

/// Width and glyph-coverage queries the layout needs from a font set
pub trait TextMeasure {
    /// Advance width of `text` in points
    fn text_width(&self, face: FontFace, text: &str, size: f32) -> f32;

    /// Whether every character of `text` has a glyph
    fn covers(&self, face: FontFace, text: &str) -> bool;
}

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

/// Helvetica-Bold advance widths for ASCII 32..=126, in 1/1000 em
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // '0'..'?'
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 'P'..'_'
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // '`'..'o'
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 'p'..'~'
];

const DEFAULT_WIDTH: u16 = 556;

/// Width of `text` set in the built-in Helvetica family
pub fn builtin_width(face: FontFace, text: &str, size: f32) -> f32 {
    let table = match face {
        FontFace::Regular => &HELVETICA,
        FontFace::Bold => &HELVETICA_BOLD,
    };
    let units: u32 = text
        .chars()
        .map(|ch| match ch as u32 {
            code @ 32..=126 => table[(code - 32) as usize] as u32,
            _ => DEFAULT_WIDTH as u32,
        })
        .sum();
    units as f32 * size / 1000.0
}

fn winansi_byte(ch: char) -> Option<u8> {
    match ch as u32 {
        code @ (0x20..=0x7E | 0xA0..=0xFF) => Some(code as u8),
        _ => match ch {
            '€' => Some(0x80),
            '…' => Some(0x85),
            '‘' => Some(0x91),
            '’' => Some(0x92),
            '“' => Some(0x93),
            '”' => Some(0x94),
            '•' => Some(0x95),
            '–' => Some(0x96),
            '—' => Some(0x97),
            '™' => Some(0x99),
            _ => None,
        },
    }
}

/// Encode for a WinAnsi Type1 font; unmappable characters become `?`
pub fn to_winansi(text: &str) -> Vec<u8> {
    text.chars().map(|ch| winansi_byte(ch).unwrap_or(b'?')).collect()
}

pub fn winansi_covers(text: &str) -> bool {
    text.chars().all(|ch| winansi_byte(ch).is_some())
}

/// Greedy word wrap. Words wider than `max_width` are broken between
/// characters.
pub fn wrap_text(text: &str, max_width: f32, mut width_of: impl FnMut(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{line} {word}")
        };
        if width_of(&candidate) <= max_width {
            line = candidate;
            continue;
        }

        if !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        for ch in word.chars() {
            line.push(ch);
            if line.chars().count() > 1 && width_of(&line) > max_width {
                line.pop();
                lines.push(std::mem::take(&mut line));
                line.push(ch);
            }
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
