//! Mock odds feed for unit testing.
//!
//! This module provides a feed and payload builder that can be used in tests
//! without making real network requests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::FeedError;

use super::client::OddsFeed;

/// Builder for raw event payloads in the odds API shape.
#[derive(Debug, Clone, Default)]
pub struct EventPayloadBuilder {
    home: Option<String>,
    away: Option<String>,
    sport_key: Option<String>,
    /// (sportsbook, market, outcome, price, link) in insertion order.
    quotes: Vec<(String, String, String, f64, Option<String>)>,
}

impl EventPayloadBuilder {
    /// Start a payload for a matchup.
    pub fn new(home: &str, away: &str) -> Self {
        Self {
            home: Some(home.to_string()),
            away: Some(away.to_string()),
            ..Default::default()
        }
    }

    /// Start a payload with no participants.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Set the sport key.
    pub fn sport(mut self, sport_key: &str) -> Self {
        self.sport_key = Some(sport_key.to_string());
        self
    }

    /// Add an outcome price quoted by a sportsbook.
    pub fn quote(mut self, sportsbook: &str, market: &str, outcome: &str, price: f64) -> Self {
        self.quotes.push((
            sportsbook.to_string(),
            market.to_string(),
            outcome.to_string(),
            price,
            None,
        ));
        self
    }

    /// Add a moneyline price with a bet slip link.
    pub fn linked_quote(mut self, sportsbook: &str, outcome: &str, price: f64, link: &str) -> Self {
        self.quotes.push((
            sportsbook.to_string(),
            "h2h".to_string(),
            outcome.to_string(),
            price,
            Some(link.to_string()),
        ));
        self
    }

    /// Add a moneyline price for the home participant.
    pub fn home_price(self, sportsbook: &str, price: f64) -> Self {
        let home = self.home.clone().unwrap_or_default();
        self.quote(sportsbook, "h2h", &home, price)
    }

    /// Add a moneyline price for the away participant.
    pub fn away_price(self, sportsbook: &str, price: f64) -> Self {
        let away = self.away.clone().unwrap_or_default();
        self.quote(sportsbook, "h2h", &away, price)
    }

    /// Build the payload, grouping quotes by sportsbook then market.
    pub fn build(self) -> Value {
        let mut books: Vec<(String, Vec<(String, Vec<Value>)>)> = Vec::new();

        for (book, market, outcome, price, link) in self.quotes {
            let mut entry = json!({ "name": outcome, "price": price });
            if let Some(link) = link {
                entry["link"] = Value::String(link);
            }

            let book_idx = match books.iter().position(|(key, _)| *key == book) {
                Some(idx) => idx,
                None => {
                    books.push((book, Vec::new()));
                    books.len() - 1
                }
            };
            let markets = &mut books[book_idx].1;
            match markets.iter().position(|(key, _)| *key == market) {
                Some(idx) => markets[idx].1.push(entry),
                None => markets.push((market, vec![entry])),
            }
        }

        let bookmakers: Vec<Value> = books
            .into_iter()
            .map(|(key, markets)| {
                let markets: Vec<Value> = markets
                    .into_iter()
                    .map(|(key, outcomes)| json!({ "key": key, "outcomes": outcomes }))
                    .collect();
                json!({ "key": key, "title": key, "markets": markets })
            })
            .collect();

        let mut payload = json!({ "bookmakers": bookmakers });
        if let Some(home) = self.home {
            payload["home_team"] = Value::String(home);
        }
        if let Some(away) = self.away {
            payload["away_team"] = Value::String(away);
        }
        if let Some(sport_key) = self.sport_key {
            payload["sport_key"] = Value::String(sport_key);
        }
        payload
    }
}

/// Mock odds feed for testing.
#[derive(Debug, Clone, Default)]
pub struct MockOddsFeed {
    /// Event payloads by sport key.
    events: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    /// Sports whose fetch fails.
    failing: Arc<Mutex<Vec<String>>>,
    /// Sports requested so far, in order.
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockOddsFeed {
    /// Create an empty mock feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the payloads returned for a sport.
    pub fn set_events(&self, sport: &str, events: Vec<Value>) {
        let mut map = self.events.lock().unwrap();
        map.insert(sport.to_string(), events);
    }

    /// Make fetches for a sport fail with HTTP 500.
    pub fn fail_sport(&self, sport: &str) {
        self.failing.lock().unwrap().push(sport.to_string());
    }

    /// Sports requested so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl OddsFeed for MockOddsFeed {
    async fn fetch_odds(&self, sport: &str) -> Result<Vec<Value>, FeedError> {
        self.requests.lock().unwrap().push(sport.to_string());

        if self.failing.lock().unwrap().iter().any(|s| s == sport) {
            return Err(FeedError::Status {
                endpoint: format!("sports/{sport}/odds"),
                status: 500,
            });
        }

        let events = self.events.lock().unwrap();
        Ok(events.get(sport).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odds::Event;
    use rust_decimal_macros::dec;

    #[test]
    fn builder_groups_quotes_by_book_and_market() {
        let payload = EventPayloadBuilder::new("A", "B")
            .home_price("fanduel", 2.1)
            .away_price("draftkings", 2.05)
            .away_price("fanduel", 1.9)
            .build();

        assert_eq!(payload["bookmakers"].as_array().unwrap().len(), 2);
        let event = Event::from_payload(payload).unwrap();
        assert_eq!(event.quotes.len(), 3);
        assert_eq!(event.quotes[0].sportsbook, "fanduel");
        assert_eq!(event.quotes[1].price, dec!(1.9));
        assert_eq!(event.quotes[2].sportsbook, "draftkings");
    }

    #[tokio::test]
    async fn mock_feed_returns_configured_events_and_failures() {
        let feed = MockOddsFeed::new();
        feed.set_events("basketball_nba", vec![EventPayloadBuilder::new("A", "B").build()]);
        feed.fail_sport("icehockey_nhl");

        assert_eq!(feed.fetch_odds("basketball_nba").await.unwrap().len(), 1);
        assert!(feed.fetch_odds("soccer_epl").await.unwrap().is_empty());
        assert!(feed.fetch_odds("icehockey_nhl").await.is_err());
        assert_eq!(feed.requests().len(), 3);
    }
}
