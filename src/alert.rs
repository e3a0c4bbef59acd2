//! Out-of-stock alert content.
//!
//! Subject and plain-text body are plain string formatting; the HTML body is
//! rendered with minijinja under HTML auto-escaping so product names and
//! user identities can never inject markup.

use minijinja::{AutoEscape, Environment, context};
use serde::Serialize;

const ALERT_HTML: &str = "\
<p>{{ intro }}</p>
<ul>
{%- for item in items %}
<li><strong>{{ item.product_name }}</strong> (SKU: {{ item.sku }})</li>
{%- endfor %}
</ul>
{%- if updated_by %}
<p>Updated by: {{ updated_by }}</p>
{%- endif %}";

/// An item whose quantity just went from positive to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockoutEvent {
    pub sku: String,
    pub product_name: String,
}

impl StockoutEvent {
    pub fn new(sku: impl Into<String>, product_name: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            product_name: product_name.into(),
        }
    }
}

/// Ready-to-send alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertContent {
    pub subject: String,
    pub text: String,
    /// `None` only if the HTML template failed to render.
    pub html: Option<String>,
}

/// Request to alert about a batch of stockouts.
#[derive(Debug, Clone, Default)]
pub struct StockoutAlert {
    pub items: Vec<StockoutEvent>,
    /// Address of whoever triggered the stock change.
    pub updated_by: Option<String>,
    /// Recipient that beats every configured one.
    pub recipient_override: Option<String>,
}

/// Builds subject and bodies for `items`; `None` when there is nothing to
/// report.
pub fn build_alert_content(items: &[StockoutEvent], updated_by: Option<&str>) -> Option<AlertContent> {
    let first = items.first()?;
    let updated_by = updated_by.map(str::trim).filter(|u| !u.is_empty());

    let subject = if items.len() == 1 {
        format!("Out of stock: {} ({})", first.product_name, first.sku)
    } else {
        format!("Out of stock items ({})", items.len())
    };

    let intro = if items.len() == 1 {
        "The following item is now out of stock:"
    } else {
        "The following items are now out of stock:"
    };

    let mut lines = vec![intro.to_string(), String::new()];
    lines.extend(
        items
            .iter()
            .map(|item| format!("• {} (SKU: {})", item.product_name, item.sku)),
    );
    if let Some(user) = updated_by {
        lines.push(String::new());
        lines.push(format!("Updated by: {}", user));
    }

    let html = match render_html(intro, items, updated_by) {
        Ok(html) => Some(html),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to render alert HTML, sending text only");
            None
        }
    };

    Some(AlertContent {
        subject,
        text: lines.join("\n"),
        html,
    })
}

fn render_html(
    intro: &str,
    items: &[StockoutEvent],
    updated_by: Option<&str>,
) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::Html);
    env.render_str(
        ALERT_HTML,
        context! {
            intro => intro,
            items => items,
            updated_by => updated_by,
        },
    )
}
