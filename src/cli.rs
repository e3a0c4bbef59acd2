//! Command-line interface for stockmail using clap.
//!
//! Transport settings always come from the environment; the CLI only says
//! what to send.

use clap::{Parser, Subcommand, ValueEnum};

use crate::alert::StockoutEvent;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format for log aggregation.
    Json,
}

/// Send transactional email and out-of-stock alerts.
#[derive(Parser, Debug)]
#[command(name = "stockmail")]
#[command(version)]
#[command(about = "Send transactional email and out-of-stock alerts")]
pub struct Cli {
    /// Log format: text or json.
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text, env = "LOG_FORMAT", global = true)]
    pub log_format: LogFormat,

    /// Print Prometheus metrics to stdout when done.
    #[arg(long = "print-metrics", global = true)]
    pub print_metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a single email.
    Send(SendArgs),
    /// Send one out-of-stock alert for the given items.
    Alert(AlertArgs),
}

#[derive(clap::Args, Debug)]
pub struct SendArgs {
    /// Recipient address.
    #[arg(long)]
    pub to: String,

    /// Sender address (defaults to the configured sender).
    #[arg(long)]
    pub from: Option<String>,

    #[arg(long)]
    pub subject: String,

    /// Plain-text body.
    #[arg(long)]
    pub text: Option<String>,

    /// HTML body; also used to derive the text body when --text is absent.
    #[arg(long)]
    pub html: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct AlertArgs {
    /// Item that ran out, as SKU=Product name. Repeatable.
    #[arg(long = "item", value_name = "SKU=NAME", value_parser = parse_item, required = true)]
    pub items: Vec<StockoutEvent>,

    /// Address of whoever changed the stock.
    #[arg(long = "updated-by")]
    pub updated_by: Option<String>,

    /// Recipient override (beats STOCK_ALERT_EMAIL).
    #[arg(long)]
    pub to: Option<String>,
}

fn parse_item(raw: &str) -> Result<StockoutEvent, String> {
    let (sku, name) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SKU=NAME, got '{}'", raw))?;
    let (sku, name) = (sku.trim(), name.trim());
    if sku.is_empty() || name.is_empty() {
        return Err(format!("SKU and name must both be non-empty in '{}'", raw));
    }
    Ok(StockoutEvent::new(sku, name))
}
