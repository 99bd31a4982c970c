//! Odds API payload types and the per-event domain model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::OddsError;

/// Side of a two-way moneyline market.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    /// Home participant.
    Home,
    /// Away participant.
    Away,
}

impl Side {
    /// Get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

/// Event entry from `/sports/{sport}/odds`.
#[derive(Debug, Clone, Deserialize)]
pub struct EventOdds {
    /// Upstream event ID.
    #[serde(default)]
    pub id: Option<String>,
    /// Sport key (e.g. "basketball_nba").
    #[serde(default)]
    pub sport_key: Option<String>,
    /// Start time as sent upstream.
    #[serde(default)]
    pub commence_time: Option<String>,
    /// Home participant.
    #[serde(default)]
    pub home_team: Option<String>,
    /// Away participant.
    #[serde(default)]
    pub away_team: Option<String>,
    /// Per-sportsbook odds.
    #[serde(default)]
    pub bookmakers: Vec<BookmakerOdds>,
}

/// One sportsbook's markets for an event.
#[derive(Debug, Clone, Deserialize)]
pub struct BookmakerOdds {
    /// Sportsbook key (e.g. "fanduel").
    pub key: String,
    /// Display name.
    #[serde(default)]
    pub title: Option<String>,
    /// Event page on the sportsbook.
    #[serde(default)]
    pub link: Option<String>,
    /// Markets quoted by this sportsbook.
    #[serde(default)]
    pub markets: Vec<MarketOdds>,
}

/// One market quoted by a sportsbook.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketOdds {
    /// Market key (e.g. "h2h").
    pub key: String,
    /// Market page on the sportsbook.
    #[serde(default)]
    pub link: Option<String>,
    /// Outcome prices.
    #[serde(default)]
    pub outcomes: Vec<OutcomePrice>,
}

/// A single outcome price.
#[derive(Debug, Clone, Deserialize)]
pub struct OutcomePrice {
    /// Outcome name, the participant name for moneyline markets.
    pub name: String,
    /// Decimal odds.
    pub price: Decimal,
    /// Bet slip link.
    #[serde(default)]
    pub link: Option<String>,
}

/// Sport entry from `/sports`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SportInfo {
    /// Sport key used in odds requests.
    pub key: String,
    /// Sport group (e.g. "Basketball").
    #[serde(default)]
    pub group: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Whether the sport is in season.
    #[serde(default)]
    pub active: bool,
    /// Whether the sport only has outright markets.
    #[serde(default)]
    pub has_outrights: bool,
}

/// A single sportsbook price for one outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Sportsbook key.
    pub sportsbook: String,
    /// Market key.
    pub market: String,
    /// Outcome name.
    pub outcome: String,
    /// Decimal odds.
    pub price: Decimal,
    /// Most specific deep link available.
    pub link: Option<String>,
}

impl Quote {
    /// Create a quote without a link.
    pub fn new(
        sportsbook: impl Into<String>,
        market: impl Into<String>,
        outcome: impl Into<String>,
        price: Decimal,
    ) -> Self {
        Self {
            sportsbook: sportsbook.into(),
            market: market.into(),
            outcome: outcome.into(),
            price,
            link: None,
        }
    }
}

/// Validated sporting event with its quotes in payload order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Upstream event ID.
    pub id: Option<String>,
    /// Sport key, empty when unknown.
    pub sport_key: String,
    /// Start time as sent upstream.
    pub commence_time: Option<String>,
    /// Home participant.
    pub home: String,
    /// Away participant.
    pub away: String,
    /// Quotes ordered bookmaker, market, outcome.
    pub quotes: Vec<Quote>,
}

impl Event {
    /// Create an event with no quotes.
    pub fn new(home: impl Into<String>, away: impl Into<String>) -> Result<Self, OddsError> {
        let (home, away) = validate_participants(Some(home.into()), Some(away.into()), Vec::new)?;
        Ok(Self {
            id: None,
            sport_key: String::new(),
            commence_time: None,
            home,
            away,
            quotes: Vec::new(),
        })
    }

    /// Append a quote.
    pub fn with_quote(mut self, quote: Quote) -> Self {
        self.quotes.push(quote);
        self
    }

    /// Parse and validate one raw event payload.
    ///
    /// Errors carry the payload's keys so a rejected event can be identified in logs.
    pub fn from_payload(payload: Value) -> Result<Self, OddsError> {
        let keys = payload_keys(&payload);
        let odds: EventOdds =
            serde_json::from_value(payload).map_err(|e| OddsError::MalformedEvent {
                reason: e.to_string(),
                keys: keys.clone(),
            })?;
        Self::from_odds(odds, keys)
    }

    fn from_odds(odds: EventOdds, keys: Vec<String>) -> Result<Self, OddsError> {
        let (home, away) = validate_participants(odds.home_team, odds.away_team, || keys)?;

        let quotes = odds
            .bookmakers
            .into_iter()
            .flat_map(|book| {
                let book_key = book.key;
                let book_link = book.link;
                book.markets.into_iter().flat_map(move |market| {
                    let book_key = book_key.clone();
                    let book_link = book_link.clone();
                    let market_key = market.key;
                    let market_link = market.link;
                    market.outcomes.into_iter().map(move |outcome| Quote {
                        sportsbook: book_key.clone(),
                        market: market_key.clone(),
                        outcome: outcome.name,
                        price: outcome.price,
                        link: outcome
                            .link
                            .or_else(|| market_link.clone())
                            .or_else(|| book_link.clone()),
                    })
                })
            })
            .collect();

        Ok(Self {
            id: odds.id,
            sport_key: odds.sport_key.unwrap_or_default(),
            commence_time: odds.commence_time,
            home,
            away,
            quotes,
        })
    }

    /// Which side an outcome name refers to, if any.
    pub fn side_of(&self, outcome: &str) -> Option<Side> {
        if outcome == self.home {
            Some(Side::Home)
        } else if outcome == self.away {
            Some(Side::Away)
        } else {
            None
        }
    }

    /// Participant name for a side.
    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    /// "Home vs Away" label for logs.
    pub fn label(&self) -> String {
        format!("{} vs {}", self.home, self.away)
    }
}

fn payload_keys(payload: &Value) -> Vec<String> {
    payload
        .as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default()
}

fn validate_participants(
    home: Option<String>,
    away: Option<String>,
    keys: impl FnOnce() -> Vec<String>,
) -> Result<(String, String), OddsError> {
    let home = home.filter(|name| !name.trim().is_empty());
    let away = away.filter(|name| !name.trim().is_empty());

    match (home, away) {
        (Some(home), Some(away)) if home == away => {
            Err(OddsError::DuplicateParticipant { name: home })
        }
        (Some(home), Some(away)) => Ok((home, away)),
        _ => Err(OddsError::MissingParticipant { keys: keys() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "id": "evt-1",
            "sport_key": "basketball_nba",
            "commence_time": "2025-03-01T00:10:00Z",
            "home_team": "Boston Celtics",
            "away_team": "Denver Nuggets",
            "bookmakers": [
                {
                    "key": "fanduel",
                    "title": "FanDuel",
                    "link": "https://fanduel.example/event",
                    "markets": [
                        {
                            "key": "h2h",
                            "outcomes": [
                                { "name": "Boston Celtics", "price": 1.8, "link": "https://fanduel.example/slip/bos" },
                                { "name": "Denver Nuggets", "price": 2.05 }
                            ]
                        }
                    ]
                },
                {
                    "key": "betmgm",
                    "markets": [
                        { "key": "h2h", "outcomes": [{ "name": "Boston Celtics", "price": 1.83 }] }
                    ]
                }
            ]
        })
    }

    #[test]
    fn payload_flattens_into_ordered_quotes() {
        let event = Event::from_payload(payload()).unwrap();

        assert_eq!(event.home, "Boston Celtics");
        assert_eq!(event.away, "Denver Nuggets");
        assert_eq!(event.sport_key, "basketball_nba");
        assert_eq!(event.quotes.len(), 3);
        assert_eq!(event.quotes[0].sportsbook, "fanduel");
        assert_eq!(event.quotes[0].price, dec!(1.8));
        assert_eq!(event.quotes[1].price, dec!(2.05));
        assert_eq!(event.quotes[2].sportsbook, "betmgm");
    }

    #[test]
    fn quote_link_prefers_outcome_then_bookmaker() {
        let event = Event::from_payload(payload()).unwrap();

        assert_eq!(event.quotes[0].link.as_deref(), Some("https://fanduel.example/slip/bos"));
        assert_eq!(event.quotes[1].link.as_deref(), Some("https://fanduel.example/event"));
        assert_eq!(event.quotes[2].link, None);
    }

    #[test]
    fn missing_away_team_reports_payload_keys() {
        let err = Event::from_payload(json!({
            "id": "evt-2",
            "home_team": "Boston Celtics",
            "bookmakers": []
        }))
        .unwrap_err();

        match err {
            OddsError::MissingParticipant { keys } => {
                assert!(keys.contains(&"home_team".to_string()));
                assert!(keys.contains(&"bookmakers".to_string()));
                assert!(!keys.contains(&"away_team".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_team_name_counts_as_missing() {
        let err = Event::from_payload(json!({ "home_team": "", "away_team": "Denver Nuggets" }))
            .unwrap_err();
        assert!(matches!(err, OddsError::MissingParticipant { .. }));
    }

    #[test]
    fn identical_team_names_are_rejected() {
        let err = Event::new("Celtics", "Celtics").unwrap_err();
        assert_eq!(
            err,
            OddsError::DuplicateParticipant {
                name: "Celtics".to_string()
            }
        );
    }

    #[test]
    fn wrongly_typed_price_is_malformed() {
        let err = Event::from_payload(json!({
            "home_team": "A",
            "away_team": "B",
            "bookmakers": [{ "key": "fanduel", "markets": [{ "key": "h2h", "outcomes": [{ "name": "A", "price": true }] }] }]
        }))
        .unwrap_err();
        assert!(matches!(err, OddsError::MalformedEvent { .. }));
    }

    #[test]
    fn side_lookup_matches_exact_names() {
        let event = Event::new("A", "B").unwrap();
        assert_eq!(event.side_of("A"), Some(Side::Home));
        assert_eq!(event.side_of("B"), Some(Side::Away));
        assert_eq!(event.side_of("Draw"), None);
        assert_eq!(event.team(Side::Home.opposite()), "B");
        assert_eq!(Side::Away.to_string(), "away");
    }
}
