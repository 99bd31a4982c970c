//! HTML e-mail alerts sent through Mailgun.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{info, instrument};
use url::Url;

use super::Notifier;
use crate::arbitrage::{Leg, Opportunity, OpportunityCollection};
use crate::config::Config;
use crate::error::NotifyError;

const STYLE: &str = r#"
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 800px; margin: 0 auto; padding: 20px; }
        .header { background-color: #2c3e50; color: white; padding: 15px; text-align: center; border-radius: 5px 5px 0 0; }
        .alert-count { font-size: 14px; color: #ecf0f1; }
        .opportunity { margin-bottom: 30px; border: 1px solid #ddd; border-radius: 5px; overflow: hidden; }
        .opportunity-header { background-color: #3498db; color: white; padding: 10px 15px; font-size: 18px; font-weight: bold; display: flex; justify-content: space-between; align-items: center; }
        .profit-badge { background-color: #27ae60; padding: 5px 10px; border-radius: 3px; font-size: 16px; }
        .matchup { padding: 15px; background-color: #f8f9fa; border-bottom: 1px solid #ddd; }
        .bet-details { display: flex; justify-content: space-between; margin-top: 20px; }
        .bet-card { width: 48%; border: 1px solid #ddd; border-radius: 4px; padding: 15px; background-color: white; }
        .sportsbook { font-weight: bold; color: #2c3e50; margin-bottom: 5px; }
        .team { font-size: 16px; margin-bottom: 10px; }
        .odds { font-size: 18px; font-weight: bold; color: #e74c3c; }
        .stake-info { margin-top: 10px; font-size: 14px; }
        .profit-details { padding: 15px; background-color: #e8f4fc; }
        .profit-row { display: flex; justify-content: space-between; margin-bottom: 10px; }
        .profit-label { font-weight: bold; }
        .footer { text-align: center; font-size: 12px; color: #7f8c8d; margin-top: 30px; }
        .visit-btn { display: inline-block; background-color: #3498db; color: white; padding: 5px 10px; text-decoration: none; border-radius: 3px; margin-top: 10px; font-size: 12px; }
        .visit-btn:hover { background-color: #2980b9; }
        @media (max-width: 600px) {
            .bet-details { flex-direction: column; }
            .bet-card { width: 100%; margin-bottom: 15px; }
        }
"#;

/// Two-decimal rendering; `{:.2}` alone truncates.
fn cents(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

/// Escape text for HTML element and attribute content.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn header_timestamp(at: OffsetDateTime) -> Result<String, NotifyError> {
    let format = format_description!(
        "[month repr:long] [day], [year] [hour repr:12]:[minute] [period] UTC"
    );
    Ok(at.to_offset(time::UtcOffset::UTC).format(&format)?)
}

/// Render the alert e-mail body, most profitable opportunity first.
pub fn render_html(
    opportunities: &OpportunityCollection,
    generated_at: OffsetDateTime,
) -> Result<String, NotifyError> {
    let mut html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Arbitrage Alerts</title>
    <style>{STYLE}    </style>
</head>
<body>
    <div class="header">
        <h1>Arbitrage Alerts</h1>
        <div class="alert-count">{count} opportunities found as of {at}</div>
    </div>
"#,
        count = opportunities.len(),
        at = header_timestamp(generated_at)?,
    );

    for opp in opportunities.sorted_by_profit() {
        html.push_str(&render_opportunity(opp));
    }

    html.push_str(
        r#"    <div class="footer">
        <p>This is an educational project and not financial advice. No actual betting is recommended.</p>
        <p>Generated by Arbitrage Alert System</p>
    </div>
</body>
</html>
"#,
    );

    Ok(html)
}

fn render_opportunity(opp: &Opportunity) -> String {
    let plan = opp.plan();
    let profit = format!("{}%", cents(plan.profit_pct));
    let profit_rounded = format!("{}%", cents(plan.profit_pct_rounded));

    format!(
        r#"    <div class="opportunity">
        <div class="opportunity-header">
            <span>{home} vs {away}</span>
            <span class="profit-badge">{profit} profit</span>
        </div>
        <div class="matchup">
            <h3>Matchup Information</h3>
            <div class="bet-details">
{home_card}{away_card}            </div>
        </div>
        <div class="profit-details">
            <h3>Profit Analysis</h3>
            <div class="profit-row">
                <span class="profit-label">Total Investment:</span>
                <span>${total} (exact) / ${rounded_total} (rounded)</span>
            </div>
            <div class="profit-row">
                <span class="profit-label">Expected Return:</span>
                <span>${expected_return}</span>
            </div>
            <div class="profit-row">
                <span class="profit-label">Expected Profit:</span>
                <span>${expected_profit} ({profit})</span>
            </div>
            <div class="profit-row">
                <span class="profit-label">Rounded Profit:</span>
                <span>${min_profit_rounded} ({profit_rounded})</span>
            </div>
        </div>
    </div>
"#,
        home = escape_html(&opp.home().team),
        away = escape_html(&opp.away().team),
        home_card = render_card(opp.home(), plan.home_stake, plan.home_stake_rounded),
        away_card = render_card(opp.away(), plan.away_stake, plan.away_stake_rounded),
        total = cents(plan.total_stake()),
        rounded_total = plan.rounded_total_stake,
        expected_return = cents(plan.expected_return),
        expected_profit = cents(plan.expected_profit),
        min_profit_rounded = cents(plan.min_profit_rounded),
    )
}

/// Only absolute http(s) links become buttons.
fn is_web_link(link: &str) -> bool {
    Url::parse(link).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

fn render_card(leg: &Leg, stake: Decimal, stake_rounded: Decimal) -> String {
    let visit = leg
        .link
        .as_deref()
        .filter(|link| is_web_link(link))
        .map(|link| {
            format!(
                r#"
                    <a href="{}" class="visit-btn" target="_blank">Visit Sportsbook</a>"#,
                escape_html(link)
            )
        })
        .unwrap_or_default();

    format!(
        r#"                <div class="bet-card">
                    <div class="sportsbook">{book}</div>
                    <div class="team">{team}</div>
                    <div class="odds">Odds: {price}</div>
                    <div class="stake-info">Recommended stake: ${stake} (${stake_rounded} rounded)</div>{visit}
                </div>
"#,
        book = escape_html(&leg.sportsbook),
        team = escape_html(&leg.team),
        price = leg.price,
        stake = cents(stake),
    )
}

/// Sends the HTML summary through the Mailgun messages API.
#[derive(Debug, Clone)]
pub struct MailgunNotifier {
    http: reqwest::Client,
    api_url: String,
    domain: String,
    api_key: String,
    from: String,
    to: String,
}

impl MailgunNotifier {
    /// Create a notifier.
    pub fn new(
        api_url: impl Into<String>,
        domain: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            domain: domain.into(),
            api_key: api_key.into(),
            from: from.into(),
            to: to.into(),
        })
    }

    /// Create from config, failing if key, domain or recipient is missing.
    pub fn from_config(config: &Config) -> Result<Self, NotifyError> {
        let api_key = config
            .mailgun_api_key
            .clone()
            .ok_or_else(|| NotifyError::NotConfigured("MAILGUN_API_KEY is not set".to_string()))?;
        let domain = config
            .mailgun_domain
            .clone()
            .ok_or_else(|| NotifyError::NotConfigured("MAILGUN_DOMAIN is not set".to_string()))?;
        let to = config
            .alert_email
            .clone()
            .ok_or_else(|| NotifyError::NotConfigured("ALERT_EMAIL is not set".to_string()))?;
        let from = config
            .alert_from
            .clone()
            .unwrap_or_else(|| format!("Arbitrage Alerts <postmaster@{domain}>"));

        Self::new(&config.mailgun_api_url, domain, api_key, from, to)
    }

    /// Messages endpoint for the configured domain.
    pub fn endpoint(&self) -> String {
        format!("{}/{}/messages", self.api_url, self.domain)
    }

    /// Post one message.
    #[instrument(skip(self, html), fields(to = %self.to))]
    pub async fn send(&self, subject: &str, html: &str) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(self.endpoint())
            .basic_auth("api", Some(&self.api_key))
            .form(&[
                ("from", self.from.as_str()),
                ("to", self.to.as_str()),
                ("subject", subject),
                ("html", html),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(subject, "Alert e-mail sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for MailgunNotifier {
    fn name(&self) -> &'static str {
        "mailgun"
    }

    async fn notify(
        &self,
        opportunities: &OpportunityCollection,
        generated_at: OffsetDateTime,
    ) -> Result<(), NotifyError> {
        if opportunities.is_empty() {
            return Ok(());
        }

        let html = render_html(opportunities, generated_at)?;
        let subject = format!(
            "Arbitrage Opportunities {}",
            header_timestamp(generated_at)?
        );
        self.send(&subject, &html).await
    }
}
