//! TrueType fonts assembled in memory. Every glyph has an empty outline and
//! is 600 units wide; `.notdef` is 500.

const TRUETYPE: u32 = 0x0001_0000;

/// A single-face font with one glyph per distinct character of `chars`
pub fn font(chars: &str) -> Vec<u8> {
    sfnt(chars, 0)
}

/// A `ttcf` collection holding one face per entry of `faces`
pub fn collection(faces: &[&str]) -> Vec<u8> {
    let mut offset = 12 + 4 * faces.len();
    let mut offsets = Vec::with_capacity(faces.len());
    let mut bodies = Vec::with_capacity(faces.len());
    for chars in faces {
        let body = sfnt(chars, offset as u32);
        offsets.push(offset as u32);
        offset += body.len();
        bodies.push(body);
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"ttcf");
    out.extend_from_slice(&TRUETYPE.to_be_bytes());
    out.extend_from_slice(&(faces.len() as u32).to_be_bytes());
    for offset in offsets {
        out.extend_from_slice(&offset.to_be_bytes());
    }
    for body in bodies {
        out.extend_from_slice(&body);
    }
    out
}

/// Table offsets are written relative to `base`, the face's position in
/// the enclosing file
fn sfnt(chars: &str, base: u32) -> Vec<u8> {
    let mut chars: Vec<char> = chars.chars().collect();
    chars.sort_unstable();
    chars.dedup();
    let glyphs = chars.len() as u16 + 1;

    let tables: [(&[u8; 4], Vec<u8>); 7] = [
        (b"cmap", cmap(&chars)),
        (b"glyf", Vec::new()),
        (b"head", head()),
        (b"hhea", hhea(glyphs)),
        (b"hmtx", hmtx(glyphs)),
        (b"loca", vec![0; 2 * (glyphs as usize + 1)]),
        (b"maxp", maxp(glyphs)),
    ];

    let mut directory = Vec::new();
    directory.extend_from_slice(&TRUETYPE.to_be_bytes());
    directory.extend_from_slice(&(tables.len() as u16).to_be_bytes());
    directory.extend_from_slice(&[0; 6]);

    let mut data = Vec::new();
    let start = 12 + 16 * tables.len();
    for (tag, table) in &tables {
        directory.extend_from_slice(*tag);
        directory.extend_from_slice(&0u32.to_be_bytes());
        directory.extend_from_slice(&(base + (start + data.len()) as u32).to_be_bytes());
        directory.extend_from_slice(&(table.len() as u32).to_be_bytes());
        data.extend_from_slice(table);
        data.resize(data.len().next_multiple_of(4), 0);
    }

    directory.extend_from_slice(&data);
    directory
}

fn cmap(chars: &[char]) -> Vec<u8> {
    let mut out = Vec::new();
    for value in [0u16, 1, 3, 10] {
        out.extend_from_slice(&value.to_be_bytes());
    }
    out.extend_from_slice(&12u32.to_be_bytes());

    out.extend_from_slice(&12u16.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&(16 + 12 * chars.len() as u32).to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(&(chars.len() as u32).to_be_bytes());
    for (glyph, ch) in chars.iter().enumerate() {
        let code = u32::from(*ch);
        out.extend_from_slice(&code.to_be_bytes());
        out.extend_from_slice(&code.to_be_bytes());
        out.extend_from_slice(&(glyph as u32 + 1).to_be_bytes());
    }
    out
}

fn head() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&TRUETYPE.to_be_bytes());
    out.extend_from_slice(&[0; 8]);
    out.extend_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&1000u16.to_be_bytes());
    out.extend_from_slice(&[0; 16]);
    for bound in [0i16, -200, 1000, 800] {
        out.extend_from_slice(&bound.to_be_bytes());
    }
    for value in [0u16, 8, 2, 0, 0] {
        out.extend_from_slice(&value.to_be_bytes());
    }
    out
}

fn hhea(glyphs: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&TRUETYPE.to_be_bytes());
    for metric in [800i16, -200, 0] {
        out.extend_from_slice(&metric.to_be_bytes());
    }
    out.extend_from_slice(&600u16.to_be_bytes());
    out.extend_from_slice(&[0; 22]);
    out.extend_from_slice(&glyphs.to_be_bytes());
    out
}

fn hmtx(glyphs: u16) -> Vec<u8> {
    (0..glyphs)
        .flat_map(|glyph| {
            let advance: u16 = if glyph == 0 { 500 } else { 600 };
            let [a, b] = advance.to_be_bytes();
            [a, b, 0, 0]
        })
        .collect()
}

fn maxp(glyphs: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0x0000_5000u32.to_be_bytes());
    out.extend_from_slice(&glyphs.to_be_bytes());
    out
}
