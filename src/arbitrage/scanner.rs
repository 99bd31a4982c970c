//! Batch orchestration: fetch each sport, evaluate each event, collect.
//!
//! A failed sport or a malformed event is logged and counted, never fatal
//! for the rest of the batch.

use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::collection::OpportunityCollection;
use super::calculator::Opportunity;
use super::detector::evaluate;
use super::selector::BestPriceSelector;
use crate::config::Config;
use crate::metrics;
use crate::odds::{Event, OddsFeed};

/// Counters for one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Sports fetched successfully.
    pub sports_scanned: u64,
    /// Sports whose fetch failed.
    pub sports_failed: u64,
    /// Event payloads seen.
    pub events_scanned: u64,
    /// Event payloads rejected as malformed.
    pub events_rejected: u64,
    /// Tracked markets with an unpriced side.
    pub markets_missing_side: u64,
    /// Tracked markets priced at or above certainty.
    pub markets_without_edge: u64,
    /// Opportunities found.
    pub opportunities: u64,
}

impl ScanStats {
    /// Add another scan's counters.
    pub fn merge(&mut self, other: &ScanStats) {
        self.sports_scanned += other.sports_scanned;
        self.sports_failed += other.sports_failed;
        self.events_scanned += other.events_scanned;
        self.events_rejected += other.events_rejected;
        self.markets_missing_side += other.markets_missing_side;
        self.markets_without_edge += other.markets_without_edge;
        self.opportunities += other.opportunities;
    }
}

/// Output of evaluating one sport's payloads.
#[derive(Debug, Clone, Default)]
pub struct SportScan {
    /// Opportunities in payload order.
    pub opportunities: Vec<Opportunity>,
    /// Counters for this sport.
    pub stats: ScanStats,
}

/// Output of a full scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Opportunities in sport, then payload order.
    pub opportunities: OpportunityCollection,
    /// Counters across all sports.
    pub stats: ScanStats,
}

/// Evaluate one sport's raw event payloads.
///
/// Synchronous and free of I/O; events are independent of each other.
pub fn scan_events(sport: &str, payloads: Vec<Value>, selector: &BestPriceSelector) -> SportScan {
    let mut scan = SportScan::default();
    scan.stats.sports_scanned = 1;

    for payload in payloads {
        scan.stats.events_scanned += 1;
        metrics::inc_events_scanned();

        let mut event = match Event::from_payload(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(sport, error = %e, "Skipping malformed event");
                scan.stats.events_rejected += 1;
                metrics::inc_events_rejected();
                continue;
            }
        };
        if event.sport_key.is_empty() {
            event.sport_key = sport.to_string();
        }

        let table = selector.select(&event);
        let found = evaluate(&event, &table);

        let priced = table.iter().filter(|(_, best)| best.is_complete()).count() as u64;
        scan.stats.markets_missing_side += table.len() as u64 - priced;
        scan.stats.markets_without_edge += priced - found.len() as u64;
        scan.stats.opportunities += found.len() as u64;
        for _ in &found {
            metrics::inc_opportunities_detected();
        }
        scan.opportunities.extend(found);
    }

    scan
}

/// Scans every configured sport through an odds feed.
#[derive(Debug, Clone)]
pub struct Scanner<F> {
    feed: F,
    selector: BestPriceSelector,
    sports: Vec<String>,
    concurrency: usize,
}

impl<F: OddsFeed> Scanner<F> {
    /// Create a scanner.
    pub fn new(feed: F, selector: BestPriceSelector, sports: Vec<String>, concurrency: usize) -> Self {
        Self {
            feed,
            selector,
            sports,
            concurrency: concurrency.max(1),
        }
    }

    /// Create from config values.
    pub fn from_config(feed: F, config: &Config) -> Self {
        Self::new(
            feed,
            BestPriceSelector::from_config(config),
            config.sports.clone(),
            config.fetch_concurrency,
        )
    }

    /// The feed this scanner reads from.
    pub fn feed(&self) -> &F {
        &self.feed
    }

    /// Run one scan over all sports.
    #[instrument(skip(self), fields(sports = self.sports.len()))]
    pub async fn scan(&self) -> ScanReport {
        let start = Instant::now();
        let feed = &self.feed;

        let fetched: Vec<(&String, _)> = stream::iter(self.sports.iter())
            .map(|sport| async move { (sport, feed.fetch_odds(sport).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut report = ScanReport::default();
        for (sport, result) in fetched {
            match result {
                Ok(payloads) => {
                    metrics::inc_sports_fetched();
                    let scan = scan_events(sport, payloads, &self.selector);
                    report.stats.merge(&scan.stats);
                    report.opportunities.add(scan.opportunities);
                }
                Err(e) => {
                    warn!(sport = %sport, error = %e, "Failed to fetch odds, skipping sport");
                    metrics::inc_sports_failed();
                    report.stats.sports_failed += 1;
                }
            }
        }

        metrics::record_scan_duration(start);
        info!(
            sports_scanned = report.stats.sports_scanned,
            sports_failed = report.stats.sports_failed,
            events = report.stats.events_scanned,
            rejected = report.stats.events_rejected,
            opportunities = report.stats.opportunities,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Scan complete"
        );

        report
    }
}
