use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing_subscriber::EnvFilter;

use invoice_render::config::{
    config_dir, invoices_dir, load_config, resolve_path, CONFIG_TEMPLATE,
    EXAMPLE_INVOICE_TEMPLATE,
};
use invoice_render::error::{InvoiceError, Result};
use invoice_render::format::{format_currency, format_date, format_hours, format_percent};
use invoice_render::invoice::{FileStore, InvoiceRecord, InvoiceStore, Jurisdiction, Totals};
use invoice_render::notify::{file_slug, Notifier, OutboxNotifier, Recipients};
use invoice_render::pdf::{FsResolver, Renderer};
use invoice_render::Config;

#[derive(Parser)]
#[command(name = "invoice")]
#[command(version, about = "Invoice records and printable PDF invoices", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.invoice or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Log resource resolution and rendering details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with template files
    Init,

    /// List stored invoices
    List {
        /// Only invoices owned by this user id
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Show line items and recomputed totals of an invoice
    Show {
        /// Invoice id (file name in invoices/ without .toml)
        invoice: String,
    },

    /// Render an invoice to PDF
    Render {
        /// Invoice id (file name in invoices/ without .toml)
        invoice: String,

        /// Custom output file path (default: output_dir/<number>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Open generated PDF with system default viewer
        #[arg(long)]
        open: bool,
    },

    /// Render an invoice and spool it to the outbox for its recipients
    Send {
        /// Invoice id (file name in invoices/ without .toml)
        invoice: String,

        /// Additional recipient, after the client (can be repeated)
        #[arg(long, value_name = "EMAIL")]
        to: Vec<String>,

        /// Send only to this address instead of the client
        #[arg(long, value_name = "EMAIL", conflicts_with = "to")]
        only: Option<String>,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Determine config directory
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::List { user } => cmd_list(&cfg_dir, user.as_deref()),
        Commands::Show { invoice } => cmd_show(&cfg_dir, &invoice),
        Commands::Render {
            invoice,
            output,
            open,
        } => cmd_render(&cfg_dir, &invoice, output, open),
        Commands::Send { invoice, to, only } => cmd_send(&cfg_dir, &invoice, &to, only.as_deref()),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "invoice_render=debug,invoice=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    if cfg_dir.exists() {
        return Err(InvoiceError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    // Create directories
    fs::create_dir_all(invoices_dir(cfg_dir))?;
    fs::create_dir_all(cfg_dir.join("uploads"))?;
    fs::create_dir_all(cfg_dir.join("outbox"))?;
    fs::create_dir_all(cfg_dir.join("output"))?;

    // Write template files
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;
    fs::write(invoices_dir(cfg_dir).join("example.toml"), EXAMPLE_INVOICE_TEMPLATE)?;

    println!("Initialized invoice config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Check font and logo settings:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!(
        "  2. Add invoice records:           {}/example.toml",
        invoices_dir(cfg_dir).display()
    );
    println!();
    println!("Then render your first invoice:");
    println!("  invoice render example");

    Ok(())
}

fn require_config(cfg_dir: &Path) -> Result<Config> {
    if !cfg_dir.exists() {
        return Err(InvoiceError::ConfigNotFound(cfg_dir.to_path_buf()));
    }
    load_config(cfg_dir)
}

fn load_invoice(cfg_dir: &Path, id: &str) -> Result<InvoiceRecord> {
    FileStore::new(invoices_dir(cfg_dir)).load(id)
}

fn renderer(cfg_dir: &Path, config: &Config) -> Renderer<FsResolver> {
    Renderer::new(FsResolver::from_settings(&config.render, cfg_dir))
}

// Table row structs for tabled
#[derive(Tabled)]
struct InvoiceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NUMBER")]
    number: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "CLIENT")]
    client: String,
    #[tabled(rename = "COUNTRY")]
    country: String,
    #[tabled(rename = "TOTAL")]
    total: String,
}

#[derive(Tabled)]
struct LineRow {
    #[tabled(rename = "DESCRIPTION")]
    description: String,
    #[tabled(rename = "HOURS")]
    hours: String,
    #[tabled(rename = "RATE")]
    rate: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
}

/// List stored invoices
fn cmd_list(cfg_dir: &Path, user: Option<&str>) -> Result<()> {
    require_config(cfg_dir)?;

    let store = FileStore::new(invoices_dir(cfg_dir));
    let records = match user {
        Some(user) => store.list_for_user(user)?,
        None => store.list()?,
    };

    if records.is_empty() {
        println!("No invoices found.");
        println!("Add invoice records to: {}", store.dir().display());
        return Ok(());
    }

    let rows: Vec<InvoiceRow> = records
        .iter()
        .map(|(id, record)| {
            let jurisdiction = Jurisdiction::lookup(record.country.as_deref());
            InvoiceRow {
                id: id.clone(),
                number: record.display_number().to_string(),
                date: record.date.as_deref().map(format_date).unwrap_or_default(),
                client: record.client.name.clone(),
                country: jurisdiction.code.to_string(),
                total: format_currency(Totals::for_record(record).grand_total, jurisdiction, true),
            }
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();
    println!("Total: {} invoices", records.len());

    Ok(())
}

/// Show an invoice with recomputed totals
fn cmd_show(cfg_dir: &Path, id: &str) -> Result<()> {
    require_config(cfg_dir)?;
    let record = load_invoice(cfg_dir, id)?;
    let jurisdiction = Jurisdiction::lookup(record.country.as_deref());
    let totals = Totals::for_record(&record);

    println!("Invoice: {}", record.display_number());
    if let Some(date) = record.date.as_deref() {
        println!("Date:    {}", format_date(date));
    }
    if let Some(due) = record.due_date.as_deref() {
        println!("Due:     {}", format_date(due));
    }
    println!("Client:  {}", record.client.name);
    println!();

    let rows: Vec<LineRow> = record
        .items
        .iter()
        .map(|item| LineRow {
            description: item.description.clone(),
            hours: format_hours(item.hours),
            rate: format_currency(item.rate, jurisdiction, false),
            amount: format_currency(item.amount(), jurisdiction, false),
        })
        .collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();

    println!("SubTotal:    {}", format_currency(totals.subtotal, jurisdiction, false));
    if totals.show_tax {
        println!(
            "{} ({}%): {}",
            jurisdiction.tax_label,
            format_percent(totals.tax_rate),
            format_currency(totals.tax, jurisdiction, false)
        );
    }
    println!("Grand Total: {}", format_currency(totals.grand_total, jurisdiction, true));

    if let Some(stored) = record.totals.as_ref() {
        let stale = totals.stale_fields(stored);
        if !stale.is_empty() {
            println!();
            println!(
                "Note: stored totals are stale ({}); the values above are recomputed from the line items",
                stale.join(", ")
            );
        }
    }

    Ok(())
}

/// Render an invoice PDF
fn cmd_render(cfg_dir: &Path, id: &str, output: Option<PathBuf>, open: bool) -> Result<()> {
    let config = require_config(cfg_dir)?;
    let record = load_invoice(cfg_dir, id)?;

    let bytes = renderer(cfg_dir, &config).render(&record)?;

    let pdf_path = match output {
        Some(path) => path,
        None => resolve_path(&config.render.output_dir, cfg_dir)
            .join(format!("{}.pdf", file_slug(record.display_number()))),
    };
    if let Some(parent) = pdf_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&pdf_path, &bytes)?;

    if open {
        open_path(&pdf_path)?;
    }

    println!("Rendered {}", record.display_number());
    println!("  Saved: {}", pdf_path.display());

    Ok(())
}

/// Render an invoice and spool it to the outbox
fn cmd_send(cfg_dir: &Path, id: &str, extra: &[String], only: Option<&str>) -> Result<()> {
    let config = require_config(cfg_dir)?;
    let record = load_invoice(cfg_dir, id)?;

    let recipients = match only {
        Some(email) => Recipients::single(&record, email)?,
        None => Recipients::for_invoice(&record, extra)?,
    };
    let bytes = renderer(cfg_dir, &config).render(&record)?;

    let outbox = OutboxNotifier::new(resolve_path(&config.outbox.dir, cfg_dir));
    deliver(&outbox, &record, &recipients, &bytes)?;
    println!("  Outbox: {}", outbox.dir().display());

    Ok(())
}

fn deliver(
    notifier: &dyn Notifier,
    record: &InvoiceRecord,
    recipients: &Recipients,
    pdf: &[u8],
) -> Result<()> {
    notifier.send(record, recipients, Some(pdf))?;
    println!(
        "Queued {} for {}",
        record.display_number(),
        recipients.as_slice().join(", ")
    );
    Ok(())
}

fn open_path(pdf_path: &Path) -> Result<()> {
    // Open with system default viewer
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(pdf_path).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(pdf_path).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", pdf_path.to_str().unwrap_or("")])
            .spawn()?;
    }
    Ok(())
}
