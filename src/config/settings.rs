use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub outbox: OutboxSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RenderSettings {
    /// Directory searched first for uploaded logos, keyed by file name
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_true")]
    pub fetch_remote_logos: bool,
    #[serde(default = "default_timeout")]
    pub remote_timeout_secs: u64,
    /// Unicode fonts tried in order before falling back to Helvetica
    #[serde(default = "default_fonts")]
    pub fonts: Vec<FontCandidate>,
    #[serde(default)]
    pub brands: Vec<BrandIdentity>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            uploads_dir: default_uploads_dir(),
            output_dir: default_output_dir(),
            fetch_remote_logos: true,
            remote_timeout_secs: default_timeout(),
            fonts: default_fonts(),
            brands: Vec::new(),
        }
    }
}

/// A regular font file plus its bold companion. Without a bold file the
/// regular face is used for both weights.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FontCandidate {
    pub regular: String,
    #[serde(default)]
    pub bold: Option<String>,
    /// Face to use when the files are font collections
    #[serde(default)]
    pub index: u32,
}

/// Company name that gets a signature stamp and a default logo
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BrandIdentity {
    pub company: String,
    #[serde(default)]
    pub stamp: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

impl BrandIdentity {
    pub fn matches(&self, company_name: &str) -> bool {
        self.company.trim().eq_ignore_ascii_case(company_name.trim())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutboxSettings {
    #[serde(default = "default_outbox_dir")]
    pub dir: String,
}

impl Default for OutboxSettings {
    fn default() -> Self {
        Self {
            dir: default_outbox_dir(),
        }
    }
}

fn default_uploads_dir() -> String {
    "uploads".to_string()
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_outbox_dir() -> String {
    "outbox".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    5
}

fn default_fonts() -> Vec<FontCandidate> {
    [
        (
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            Some("/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"),
        ),
        (
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            Some("/usr/share/fonts/TTF/DejaVuSans-Bold.ttf"),
        ),
        (
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            Some("/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf"),
        ),
        (
            "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
            Some("/usr/share/fonts/truetype/noto/NotoSans-Bold.ttf"),
        ),
        ("C:/Windows/Fonts/arial.ttf", Some("C:/Windows/Fonts/arialbd.ttf")),
        // CJK faces, picked when the invoice text needs them
        ("C:/Windows/Fonts/meiryo.ttc", Some("C:/Windows/Fonts/meiryob.ttc")),
        ("C:/Windows/Fonts/msgothic.ttc", None),
        ("/usr/share/fonts/opentype/ipaexfont-gothic/ipaexg.ttf", None),
        ("/usr/share/fonts/truetype/fonts-japanese-gothic.ttf", None),
        ("/usr/share/fonts/truetype/takao-gothic/TakaoPGothic.ttf", None),
        ("/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc", None),
        ("/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf", None),
        ("/Library/Fonts/Arial Unicode.ttf", None),
    ]
    .into_iter()
    .map(|(regular, bold)| FontCandidate {
        regular: regular.to_string(),
        bold: bold.map(str::to_string),
        index: 0,
    })
    .collect()
}
