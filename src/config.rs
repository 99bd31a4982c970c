//! Application configuration loaded from environment variables.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// List-valued settings (`BOOKS`, `SPORTS`, ...) are comma separated.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Odds API ===
    /// the-odds-api key.
    pub api_key: String,

    /// Odds API base URL.
    #[serde(default = "default_odds_api_url")]
    pub odds_api_url: String,

    /// Allow-listed sportsbook keys.
    #[serde(default = "default_books")]
    pub books: Vec<String>,

    /// Bookmaker regions requested upstream.
    #[serde(default = "default_regions")]
    pub regions: Vec<String>,

    /// Sport keys to scan.
    #[serde(default = "default_sports")]
    pub sports: Vec<String>,

    /// Tracked market keys.
    #[serde(default = "default_markets")]
    pub markets: Vec<String>,

    /// Odds format requested upstream. Only `decimal` is supported.
    #[serde(default = "default_odds_format")]
    pub odds_format: String,

    /// Date format requested upstream.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Request bookmaker deep links.
    #[serde(default)]
    pub include_links: bool,

    // === HTTP ===
    /// Attempts per request before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial wait between attempts in seconds.
    #[serde(default = "default_retry_wait")]
    pub retry_wait_s: u64,

    /// Upper bound for the backoff wait in seconds.
    #[serde(default = "default_retry_max_wait")]
    pub retry_max_wait_s: u64,

    /// Request timeout in milliseconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_ms: u64,

    /// Sports fetched concurrently.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    // === Persistence ===
    /// Directory for opportunity batch files.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    // === Alerts ===
    /// Mailgun API key.
    #[serde(default)]
    pub mailgun_api_key: Option<String>,

    /// Mailgun sending domain.
    #[serde(default)]
    pub mailgun_domain: Option<String>,

    /// Mailgun API base URL.
    #[serde(default = "default_mailgun_api_url")]
    pub mailgun_api_url: String,

    /// Alert recipient.
    #[serde(default)]
    pub alert_email: Option<String>,

    /// Alert sender. Defaults to postmaster of the Mailgun domain.
    #[serde(default)]
    pub alert_from: Option<String>,

    // === Server Configuration ===
    /// Seconds between scans in watch mode.
    #[serde(default = "default_scan_interval")]
    pub scan_interval_s: u64,

    /// HTTP server port for health/metrics endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_odds_api_url() -> String {
    "https://api.the-odds-api.com/v4".to_string()
}

fn default_books() -> Vec<String> {
    ["draftkings", "betmgm", "fanduel", "betrivers", "pointsbetus"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_regions() -> Vec<String> {
    vec!["us".to_string()]
}

fn default_sports() -> Vec<String> {
    ["basketball_nba", "basketball_ncaab", "basketball_wncaab", "icehockey_nhl"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_markets() -> Vec<String> {
    vec!["h2h".to_string()]
}

fn default_odds_format() -> String {
    "decimal".to_string()
}

fn default_date_format() -> String {
    "iso".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_wait() -> u64 {
    5
}

fn default_retry_max_wait() -> u64 {
    60
}

fn default_http_timeout() -> u64 {
    10_000
}

fn default_fetch_concurrency() -> usize {
    4
}

fn default_output_dir() -> String {
    "data".to_string()
}

fn default_mailgun_api_url() -> String {
    "https://api.mailgun.net/v3".to_string()
}

fn default_scan_interval() -> u64 {
    300
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Configuration with defaults for everything but the API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            odds_api_url: default_odds_api_url(),
            books: default_books(),
            regions: default_regions(),
            sports: default_sports(),
            markets: default_markets(),
            odds_format: default_odds_format(),
            date_format: default_date_format(),
            include_links: false,
            max_retries: default_max_retries(),
            retry_wait_s: default_retry_wait(),
            retry_max_wait_s: default_retry_max_wait(),
            http_timeout_ms: default_http_timeout(),
            fetch_concurrency: default_fetch_concurrency(),
            output_dir: default_output_dir(),
            mailgun_api_key: None,
            mailgun_domain: None,
            mailgun_api_url: default_mailgun_api_url(),
            alert_email: None,
            alert_from: None,
            scan_interval_s: default_scan_interval(),
            port: default_port(),
            rust_log: default_log_level(),
            verbose: false,
        }
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("API_KEY is required".to_string());
        }

        if !self.odds_format.eq_ignore_ascii_case("decimal") {
            return Err(format!(
                "ODDS_FORMAT must be decimal, got {}",
                self.odds_format
            ));
        }

        if self.books.is_empty() {
            return Err("BOOKS must list at least one sportsbook".to_string());
        }

        if self.markets.is_empty() {
            return Err("MARKETS must list at least one market".to_string());
        }

        if self.sports.is_empty() {
            return Err("SPORTS must list at least one sport".to_string());
        }

        if self.max_retries == 0 {
            return Err("MAX_RETRIES must be at least 1".to_string());
        }

        if self.fetch_concurrency == 0 {
            return Err("FETCH_CONCURRENCY must be at least 1".to_string());
        }

        if self.scan_interval_s == 0 {
            return Err("SCAN_INTERVAL_S must be at least 1".to_string());
        }

        Ok(())
    }

    /// Whether e-mail alerts can be sent.
    pub fn email_enabled(&self) -> bool {
        self.mailgun_api_key.is_some() && self.mailgun_domain.is_some() && self.alert_email.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_sensible() {
        let config = Config::with_api_key("key");
        assert_eq!(config.markets, vec!["h2h"]);
        assert_eq!(config.books.len(), 5);
        assert_eq!(config.odds_format, "decimal");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_wait_s, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_api_key() {
        let config = Config::with_api_key("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_american_odds() {
        let config = Config {
            odds_format: "american".to_string(),
            ..Config::with_api_key("key")
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_lists() {
        let no_books = Config {
            books: vec![],
            ..Config::with_api_key("key")
        };
        let no_markets = Config {
            markets: vec![],
            ..Config::with_api_key("key")
        };
        assert!(no_books.validate().is_err());
        assert!(no_markets.validate().is_err());
    }

    #[test]
    fn email_requires_key_domain_and_recipient() {
        let mut config = Config::with_api_key("key");
        assert!(!config.email_enabled());

        config.mailgun_api_key = Some("mg-key".to_string());
        config.mailgun_domain = Some("mg.example.com".to_string());
        assert!(!config.email_enabled());

        config.alert_email = Some("me@example.com".to_string());
        assert!(config.email_enabled());
    }

    #[test]
    fn list_settings_parse_from_comma_separated_env() {
        let vars = vec![
            ("API_KEY".to_string(), "abc".to_string()),
            ("BOOKS".to_string(), "fanduel,draftkings".to_string()),
            ("INCLUDE_LINKS".to_string(), "true".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.books, vec!["fanduel", "draftkings"]);
        assert!(config.include_links);
        assert_eq!(config.markets, vec!["h2h"]);
    }
}
