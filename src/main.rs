//! stockmail - transactional email and out-of-stock alerts.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use stockmail::cli::{AlertArgs, Cli, Command, LogFormat, SendArgs};
use stockmail::{EmailRequest, MailSettings, Mailer, StockoutAlert, TransportConfig};

/// Initialize the tracing subscriber with the specified log format.
fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    match format {
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .flatten_event(true)
                .with_env_filter(filter)
                .init();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_format);

    let metrics = if cli.print_metrics {
        Some(stockmail::metrics::install_recorder().context("failed to install metrics recorder")?)
    } else {
        None
    };

    let settings = match MailSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid email configuration");
            std::process::exit(1);
        }
    };

    match TransportConfig::select(&settings) {
        Ok(transport) => info!(transport = transport.kind(), "stockmail starting"),
        Err(e) => {
            error!(error = %e, "No email transport available");
            std::process::exit(1);
        }
    }

    let mailer = Mailer::new(settings).context("failed to build HTTP client")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(mailer, cli.command));

    if let Some(handle) = metrics {
        print!("{}", handle.render());
    }
    result
}

async fn run(mailer: Mailer, command: Command) -> Result<()> {
    match command {
        Command::Send(args) => send(&mailer, args).await,
        Command::Alert(args) => alert(&mailer, args).await,
    }
}

async fn send(mailer: &Mailer, args: SendArgs) -> Result<()> {
    mailer
        .send_email(EmailRequest {
            to: Some(args.to),
            from: args.from,
            subject: Some(args.subject),
            text: args.text,
            html: args.html,
        })
        .await
        .context("email was not sent")?;
    info!("Email sent");
    Ok(())
}

async fn alert(mailer: &Mailer, args: AlertArgs) -> Result<()> {
    let sent = mailer
        .send_out_of_stock_alert(StockoutAlert {
            items: args.items,
            updated_by: args.updated_by,
            recipient_override: args.to,
        })
        .await
        .context("out-of-stock alert was not sent")?;

    if sent {
        info!("Out-of-stock alert sent");
    } else {
        info!("Nothing to alert about");
    }
    Ok(())
}
