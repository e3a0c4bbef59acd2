// src/lib.rs
//! stockmail - transport-selecting email delivery with out-of-stock alerts.
//!
//! A send goes through three stages: the request is normalized into an
//! [`EmailMessage`], a transport is selected from [`MailSettings`]
//! (SendGrid, then an email function webhook, then the built-in SMTP
//! client), and the message is handed to it.

pub mod alert;
pub mod cli;
pub mod config;
pub mod error;
pub mod inventory;
pub mod mailer;
pub mod message;
pub mod metrics;
pub mod smtp;
pub mod transport;

// Re-export commonly used types
pub use alert::{AlertContent, StockoutAlert, StockoutEvent, build_alert_content};
pub use cli::LogFormat;
pub use config::{MailSettings, SecretString, SmtpSettings};
pub use crate::metrics::register_metric_descriptions;
pub use error::{ConfigError, ConnectionError, InventoryError, MailError};
pub use inventory::{
    MemoryStockStore, StockDecrement, StockLevel, StockStore, StockUpdateOutcome,
    apply_stock_decrements,
};
pub use mailer::Mailer;
pub use message::{EmailMessage, EmailRequest};
pub use smtp::SmtpTransport;
pub use transport::TransportConfig;
