mod settings;

pub use settings::{BrandIdentity, Config, FontCandidate, OutboxSettings, RenderSettings};

use crate::error::{InvoiceError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.invoice/)
pub fn config_dir() -> Result<PathBuf> {
    // First try XDG-style directories
    if let Some(proj_dirs) = ProjectDirs::from("", "", "invoice") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to ~/.invoice/
    let home = dirs_home().ok_or_else(|| {
        InvoiceError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".invoice"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Expand ~ and anchor relative paths at the config directory
pub fn resolve_path(path: &str, config_dir: &Path) -> PathBuf {
    let expanded = expand_path(path);
    if expanded.is_absolute() {
        expanded
    } else {
        config_dir.join(expanded)
    }
}

/// Directory holding one TOML file per invoice record
pub fn invoices_dir(config_dir: &Path) -> PathBuf {
    config_dir.join("invoices")
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(InvoiceError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| InvoiceError::ConfigParse { path, source: e })
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[render]
uploads_dir = "uploads"        # logos are looked up here by file name first
output_dir = "output"          # default destination of 'invoice render'
fetch_remote_logos = true      # allow http(s) logo references
remote_timeout_secs = 5

# Unicode fonts, tried in order. The first one that can draw every character
# of the invoice wins, otherwise the first one that can draw the currency
# symbol; without any, the built-in Helvetica is used. Font collections
# (.ttc) take the face to use as `index`.
[[render.fonts]]
regular = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"
bold = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"

[[render.fonts]]
regular = "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf"
bold = "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf"

[[render.fonts]]
regular = "C:/Windows/Fonts/arial.ttf"
bold = "C:/Windows/Fonts/arialbd.ttf"

[[render.fonts]]
regular = "/usr/share/fonts/opentype/ipaexfont-gothic/ipaexg.ttf"

[[render.fonts]]
regular = "C:/Windows/Fonts/meiryo.ttc"
bold = "C:/Windows/Fonts/meiryob.ttc"
index = 0

# Companies that sign with a stamp and have a default logo
# [[render.brands]]
# company = "Vision AI LLC"
# stamp = "assets/stamp.png"
# logo = "assets/logo.png"

[outbox]
dir = "outbox"                 # 'invoice send' spools messages here
"#;

/// Template content for invoices/example.toml
pub const EXAMPLE_INVOICE_TEMPLATE: &str = r#"# One invoice record per file. The file name (without .toml) is the id
# used by 'invoice show', 'invoice render' and 'invoice send'.

invoice_number = "INV-2026-0001"
date = "2026-02-11"
due_date = "2026-03-13"
# po_number = "PO-4411"         # optional
from_email = "billing@example.com"
user_id = "example-user"
country = "india"               # india | japan
tax_rate = 18.0
show_consumption_tax = false    # force the tax line where it is hidden by default

[company]
name = "Your Company"
address = "123 Business Street, Bengaluru"
# logo_url = "/uploads/logo.png"

[company.bank]
bank_name = "State Bank"
branch_name = "MG Road"
account_number = "0011223344"
account_holder = "Your Company"
ifsc_code = "SBIN0000001"

[client]
kind = "organization"           # organization | individual
name = "Example Client Pvt Ltd"
email = "accounts@client.example"
phone = "+91 98765 43210"
address = "456 Client Avenue\nMumbai"

[[items]]
description = "Technical Consulting"
hours = 8.0
rate = 1500.0

[[items]]
description = "Software Development"
hours = 40.0
rate = 1250.0
"#;
