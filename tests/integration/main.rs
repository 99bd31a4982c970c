//! Integration tests for the sportsbook arbitrage scanner.
//!
//! Offline tests drive the scanner through the mock feed or a local HTTP mock.
//! The live test needs a real API_KEY and is ignored by default.
//! Run with: cargo test --test integration -- --ignored

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use sportsbook_arb::arbitrage::{BestPriceSelector, Scanner};
use sportsbook_arb::config::Config;
use sportsbook_arb::odds::{
    EventPayloadBuilder, MockOddsFeed, OddsApiClient, OddsFeed, OddsQuery, RetryPolicy,
};
use sportsbook_arb::storage::BatchStore;
use tempfile::TempDir;
use time::macros::datetime;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn selector() -> BestPriceSelector {
    BestPriceSelector::new(["draftkings", "betmgm", "fanduel"], ["h2h"])
}

fn sports(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|s| s.to_string()).collect()
}

/// Lakers/Celtics priced so that fanduel home + draftkings away is an arbitrage.
fn profitable_event() -> Value {
    EventPayloadBuilder::new("Lakers", "Celtics")
        .sport("basketball_nba")
        .linked_quote("fanduel", "Lakers", 2.10, "https://fanduel.example/lakers")
        .home_price("draftkings", 1.75)
        .away_price("fanduel", 1.70)
        .away_price("draftkings", 2.05)
        .quote("bovada", "h2h", "Celtics", 9.0)
        .build()
}

fn overround_event() -> Value {
    EventPayloadBuilder::new("Heat", "Bulls")
        .sport("basketball_nba")
        .home_price("fanduel", 1.80)
        .away_price("betmgm", 2.00)
        .build()
}

#[tokio::test]
async fn scan_survives_failed_sport_and_malformed_event() {
    let feed = MockOddsFeed::new();
    feed.set_events(
        "basketball_nba",
        vec![
            profitable_event(),
            json!({ "id": "broken", "bookmakers": [] }),
            overround_event(),
        ],
    );
    feed.fail_sport("icehockey_nhl");
    feed.set_events("basketball_ncaab", vec![]);

    let scanner = Scanner::new(
        feed,
        selector(),
        sports(&["basketball_nba", "icehockey_nhl", "basketball_ncaab"]),
        3,
    );
    let report = scanner.scan().await;

    assert_eq!(report.stats.sports_scanned, 2);
    assert_eq!(report.stats.sports_failed, 1);
    assert_eq!(report.stats.events_scanned, 3);
    assert_eq!(report.stats.events_rejected, 1);
    assert_eq!(report.opportunities.len(), 1);

    let opp = report.opportunities.best().unwrap();
    assert_eq!(opp.sport_key(), "basketball_nba");
    assert_eq!(opp.home().sportsbook, "fanduel");
    assert_eq!(opp.home().link.as_deref(), Some("https://fanduel.example/lakers"));
    assert_eq!(opp.away().sportsbook, "draftkings");
    assert_eq!(opp.away().price, dec!(2.05));

    let plan = opp.plan();
    assert_eq!(plan.home_stake, dec!(49.40));
    assert_eq!(plan.away_stake, dec!(50.60));
    assert_eq!(plan.home_stake_rounded, dec!(49));
    assert_eq!(plan.away_stake_rounded, dec!(51));
    assert_eq!(plan.min_profit_rounded, dec!(2.90));
    assert_eq!(plan.profit_pct.round_dp(3), dec!(3.735));
}

#[tokio::test]
async fn every_opportunity_is_below_certainty() {
    let feed = MockOddsFeed::new();
    let events: Vec<Value> = [(2.5, 1.4), (2.10, 2.05), (1.9, 1.9), (3.2, 1.55), (2.0, 2.0)]
        .iter()
        .enumerate()
        .map(|(i, (home, away))| {
            EventPayloadBuilder::new(&format!("Home {i}"), &format!("Away {i}"))
                .home_price("fanduel", *home)
                .away_price("betmgm", *away)
                .build()
        })
        .collect();
    feed.set_events("basketball_nba", events);

    let scanner = Scanner::new(feed, selector(), sports(&["basketball_nba"]), 1);
    let report = scanner.scan().await;

    assert_eq!(report.opportunities.len(), 2);
    for opp in &report.opportunities {
        let total = opp.home().implied_probability + opp.away().implied_probability;
        assert!(total < Decimal::ONE);
        assert!(opp.profit_pct() > Decimal::ZERO);
    }
}

#[tokio::test]
async fn saved_batch_round_trips_scan_results() {
    let feed = MockOddsFeed::new();
    feed.set_events("basketball_nba", vec![profitable_event(), overround_event()]);
    let scanner = Scanner::new(feed, selector(), sports(&["basketball_nba"]), 1);
    let report = scanner.scan().await;

    let dir = TempDir::new().unwrap();
    let store = BatchStore::new(dir.path());
    let path = store
        .save_at(&report.opportunities, datetime!(2026-10-18 18:00:00 UTC))
        .unwrap();

    assert_eq!(store.latest().unwrap(), path);
    let loaded = BatchStore::load(&path).unwrap();
    assert_eq!(loaded.opportunities, report.opportunities);
    assert_eq!(loaded.opportunities.to_records(), report.opportunities.to_records());
}

#[tokio::test]
async fn odds_api_client_feeds_scanner() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/sports/basketball_nba/odds"))
        .and(query_param("includeLinks", "true"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-requests-remaining", "499")
                .insert_header("x-requests-used", "1")
                .set_body_json(json!([profitable_event(), overround_event()])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v4/sports/icehockey_nhl/odds"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = Config {
        include_links: true,
        ..Config::with_api_key("test-key")
    };
    let client = OddsApiClient::with_http(
        reqwest::Client::new(),
        &format!("{}/v4", server.uri()),
        config.api_key.clone(),
        OddsQuery::from_config(&config),
        RetryPolicy {
            max_attempts: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_multiplier: 2.0,
        },
    )
    .unwrap();

    let scanner = Scanner::new(
        client,
        selector(),
        sports(&["basketball_nba", "icehockey_nhl"]),
        2,
    );
    let report = scanner.scan().await;

    assert_eq!(report.stats.sports_scanned, 1);
    assert_eq!(report.stats.sports_failed, 1);
    assert_eq!(report.opportunities.len(), 1);
    assert_eq!(
        report.opportunities.best().unwrap().home().link.as_deref(),
        Some("https://fanduel.example/lakers")
    );
}

/// Fetch real odds for one sport.
#[tokio::test]
#[ignore = "requires API_KEY and network access"]
async fn live_fetch_parses_events() {
    dotenvy::dotenv().ok();
    let config = match Config::load() {
        Ok(c) if c.validate().is_ok() => c,
        _ => {
            println!("Skipping: API_KEY not set");
            return;
        }
    };

    let client = OddsApiClient::new(&config).unwrap();
    let sport = &config.sports[0];
    let payloads = client.fetch_odds(sport).await.unwrap();
    println!("Fetched {} events for {}", payloads.len(), sport);

    let scanner = Scanner::from_config(client, &config);
    let report = scanner.scan().await;
    println!(
        "Scanned {} events, {} opportunities",
        report.stats.events_scanned,
        report.opportunities.len()
    );
}
