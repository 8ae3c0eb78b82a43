//! SMTP notifier for order receipts, one-time codes and welcome mail.
//!
//! Each message is sent as multipart/alternative with an HTML and a plain
//! text body, using the SMTP settings from the `[email]` config section.

use anyhow::Result;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::Notifier;
use crate::config::EmailConfig;
use crate::db::{LineItem, OrderResponse};

pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Send an email with HTML and plain text versions
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<()> {
        let smtp_host = self
            .config
            .smtp_host
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("SMTP host not configured"))?;
        let from_address = self
            .config
            .from_address
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("From address not configured"))?;

        let from: Mailbox = format!("{} <{}>", self.config.from_name, from_address).parse()?;
        let to: Mailbox = to_email.parse()?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        let mailer = if self.config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer
        };

        mailer.build().send(email).await?;

        tracing::info!(
            to = %to_email,
            subject = %subject,
            "Email sent successfully"
        );

        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn order_confirmation(&self, order: &OrderResponse) -> Result<()> {
        let subject = format!("Order Confirmed! {} #{}", self.config.from_name, short_id(&order.id));
        let html = render_order_html(&self.config.from_name, order);
        let text = render_order_text(&self.config.from_name, order);
        self.send_email(&order.email, &subject, &html, &text).await
    }

    async fn one_time_code(&self, email: &str, name: &str, code: &str, ttl_minutes: i64) -> Result<()> {
        let subject = format!("Your {} verification code", self.config.from_name);
        let html = render_code_html(&self.config.from_name, name, code, ttl_minutes);
        let text = render_code_text(&self.config.from_name, name, code, ttl_minutes);
        self.send_email(email, &subject, &html, &text).await
    }

    async fn welcome(&self, email: &str, name: &str) -> Result<()> {
        let subject = format!("Welcome to {}", self.config.from_name);
        let html = render_welcome_html(&self.config.from_name, name);
        let text = render_welcome_text(&self.config.from_name, name);
        self.send_email(email, &subject, &html, &text).await
    }
}

const STYLE: &str = r#"
        body { margin: 0; padding: 0; background-color: #f4f4f7; font-family: Helvetica, Arial, sans-serif; }
        .card { max-width: 600px; margin: 40px auto; background-color: #ffffff; border-radius: 20px; overflow: hidden; }
        .header { background-color: #000000; padding: 40px; text-align: center; }
        .header h1 { color: #ffffff; margin: 0; font-size: 28px; letter-spacing: 4px; text-transform: uppercase; }
        .content { padding: 40px; color: #1a1a1a; line-height: 1.6; }
        .badge { display: inline-block; background-color: #e8f5e9; color: #2e7d32; padding: 8px 20px; border-radius: 50px; font-size: 12px; font-weight: 700; }
        table { width: 100%; border-collapse: collapse; }
        td { padding: 12px 0; border-bottom: 1px solid #f0f0f0; }
        .right { text-align: right; }
        .code { font-size: 32px; letter-spacing: 8px; font-weight: 700; text-align: center; padding: 24px; background: #f9f9f9; border-radius: 12px; }
        .muted { color: #888; font-size: 12px; }"#;

fn wrap_html(brand: &str, title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>{style}
    </style>
</head>
<body>
    <div class="card">
        <div class="header"><h1>{brand}</h1></div>
        <div class="content">
{body}
        </div>
    </div>
</body>
</html>"#,
        title = html_escape(title),
        style = STYLE,
        brand = html_escape(brand),
        body = body,
    )
}

fn render_order_html(brand: &str, order: &OrderResponse) -> String {
    let rows: String = order.items.iter().map(render_item_row).collect();
    let body = format!(
        r#"            <span class="badge">ORDER CONFIRMED</span>
            <h2>Thank you for your order.</h2>
            <p>Hi {customer}, we've received your order and our team is already working on getting it to your doorstep.</p>
            <table>
                {rows}
                <tr><td><strong>Total Paid</strong></td><td class="right"><strong>{total}</strong></td></tr>
            </table>
            <p class="muted">Payment ID: {payment_id}</p>"#,
        customer = html_escape(&order.address.full_name),
        rows = rows,
        total = format_rupees(order.amount),
        payment_id = html_escape(&order.provider_payment_id),
    );
    wrap_html(brand, "Order Confirmed", &body)
}

fn render_item_row(item: &LineItem) -> String {
    format!(
        r#"<tr><td>{name}<br><span class="muted">Qty: {qty}</span></td><td class="right">{price}</td></tr>"#,
        name = html_escape(&item.name),
        qty = item.qty,
        price = format_rupees(item.price),
    )
}

fn render_order_text(brand: &str, order: &OrderResponse) -> String {
    let lines: Vec<String> = order
        .items
        .iter()
        .map(|item| format!("  {} x{}  {}", item.name, item.qty, format_rupees(item.price)))
        .collect();

    format!(
        r#"Order Confirmed

Hi {customer},

Thank you for your order. We've received it and our team is already working on it.

{lines}

Total Paid: {total}
Payment ID: {payment_id}

---
{brand}"#,
        customer = order.address.full_name,
        lines = lines.join("\n"),
        total = format_rupees(order.amount),
        payment_id = order.provider_payment_id,
        brand = brand,
    )
}

fn render_code_html(brand: &str, name: &str, code: &str, ttl_minutes: i64) -> String {
    let body = format!(
        r#"            <p>Hi {name},</p>
            <p>Use this code to continue. It expires in {ttl} minutes.</p>
            <div class="code">{code}</div>
            <p class="muted">If you didn't request this code, you can safely ignore this email.</p>"#,
        name = html_escape(name),
        ttl = ttl_minutes,
        code = html_escape(code),
    );
    wrap_html(brand, "Verification code", &body)
}

fn render_code_text(brand: &str, name: &str, code: &str, ttl_minutes: i64) -> String {
    format!(
        r#"Hi {name},

Your verification code is: {code}

It expires in {ttl} minutes. If you didn't request this code, you can safely ignore this email.

---
{brand}"#,
        name = name,
        code = code,
        ttl = ttl_minutes,
        brand = brand,
    )
}

fn render_welcome_html(brand: &str, name: &str) -> String {
    let body = format!(
        r#"            <h2>Welcome, {name}!</h2>
            <p>Your {brand} account is ready. Start exploring the latest arrivals.</p>"#,
        name = html_escape(name),
        brand = html_escape(brand),
    );
    wrap_html(brand, "Welcome", &body)
}

fn render_welcome_text(brand: &str, name: &str) -> String {
    format!(
        "Welcome, {name}!\n\nYour {brand} account is ready. Start exploring the latest arrivals.\n\n---\n{brand}",
        name = name,
        brand = brand,
    )
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Rupee amount with Indian digit grouping, e.g. `₹1,23,456.50`
fn format_rupees(amount: f64) -> String {
    let paise = (amount * 100.0).round() as i64;
    let (rupees, fraction) = (paise.abs() / 100, paise.abs() % 100);
    let digits = rupees.to_string();

    let grouped = if digits.len() <= 3 {
        digits
    } else {
        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut rest = head;
        while rest.len() > 2 {
            let (h, t) = rest.split_at(rest.len() - 2);
            groups.push(t);
            rest = h;
        }
        groups.push(rest);
        groups.reverse();
        format!("{},{}", groups.join(","), tail)
    };

    let sign = if paise < 0 { "-" } else { "" };
    if fraction == 0 {
        format!("{}₹{}", sign, grouped)
    } else {
        format!("{}₹{}.{:02}", sign, grouped, fraction)
    }
}

fn short_id(id: &str) -> &str {
    id.get(id.len().saturating_sub(8)..).unwrap_or(id)
}
