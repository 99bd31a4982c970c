//! Best cross-book price selection.

use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;

use crate::config::Config;
use crate::odds::{Event, Quote, Side};

/// Best price seen for one outcome and the sportsbook offering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestPrice {
    /// Decimal odds.
    pub price: Decimal,
    /// Sportsbook key.
    pub sportsbook: String,
    /// Deep link to the sportsbook, if the feed sent one.
    pub link: Option<String>,
}

impl BestPrice {
    fn from_quote(quote: &Quote) -> Self {
        Self {
            price: quote.price,
            sportsbook: quote.sportsbook.clone(),
            link: quote.link.clone(),
        }
    }
}

/// Best home and away prices within one market. `None` until a quote is seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketBest {
    /// Best home price.
    pub home: Option<BestPrice>,
    /// Best away price.
    pub away: Option<BestPrice>,
}

impl MarketBest {
    /// Best price for a side.
    pub fn side(&self, side: Side) -> Option<&BestPrice> {
        match side {
            Side::Home => self.home.as_ref(),
            Side::Away => self.away.as_ref(),
        }
    }

    /// Fold a quote into the side. Only a strictly higher price replaces the
    /// current entry, so the first sportsbook wins ties.
    pub fn offer(&mut self, side: Side, quote: &Quote) -> bool {
        let slot = match side {
            Side::Home => &mut self.home,
            Side::Away => &mut self.away,
        };

        let improves = slot
            .as_ref()
            .map_or(true, |current| quote.price > current.price);
        if improves {
            *slot = Some(BestPrice::from_quote(quote));
        }
        improves
    }

    /// Whether both sides have a price.
    pub fn is_complete(&self) -> bool {
        self.home.is_some() && self.away.is_some()
    }
}

/// Best prices per tracked market for one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BestPriceTable {
    markets: BTreeMap<String, MarketBest>,
}

impl BestPriceTable {
    /// Empty entries for every tracked market.
    pub fn new<'a>(markets: impl IntoIterator<Item = &'a String>) -> Self {
        Self {
            markets: markets
                .into_iter()
                .map(|m| (m.clone(), MarketBest::default()))
                .collect(),
        }
    }

    /// Best prices for a market.
    pub fn get(&self, market: &str) -> Option<&MarketBest> {
        self.markets.get(market)
    }

    /// Iterate markets in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MarketBest)> {
        self.markets.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of tracked markets.
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    /// Whether no market is tracked.
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    fn get_mut(&mut self, market: &str) -> Option<&mut MarketBest> {
        self.markets.get_mut(market)
    }
}

/// Reduces an event's quotes to the best allow-listed price per outcome.
#[derive(Debug, Clone)]
pub struct BestPriceSelector {
    books: HashSet<String>,
    markets: Vec<String>,
}

impl BestPriceSelector {
    /// Create a selector for the given sportsbooks and markets.
    pub fn new<B, M>(books: B, markets: M) -> Self
    where
        B: IntoIterator,
        B::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        let mut tracked: Vec<String> = Vec::new();
        for market in markets {
            let market = market.into();
            if !tracked.contains(&market) {
                tracked.push(market);
            }
        }

        Self {
            books: books.into_iter().map(Into::into).collect(),
            markets: tracked,
        }
    }

    /// Create from config values.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.books.iter().cloned(), config.markets.iter().cloned())
    }

    /// Tracked market keys.
    pub fn tracked_markets(&self) -> &[String] {
        &self.markets
    }

    /// Whether a sportsbook is allow-listed.
    pub fn is_allowed(&self, sportsbook: &str) -> bool {
        self.books.contains(sportsbook)
    }

    /// Build the best-price table for an event.
    ///
    /// Quotes from other sportsbooks, untracked markets, outcomes other than
    /// the two participants, and non-positive prices are ignored.
    pub fn select(&self, event: &Event) -> BestPriceTable {
        let mut table = BestPriceTable::new(&self.markets);

        for quote in &event.quotes {
            if !self.is_allowed(&quote.sportsbook) || quote.price <= Decimal::ZERO {
                continue;
            }
            let Some(side) = event.side_of(&quote.outcome) else {
                continue;
            };
            if let Some(best) = table.get_mut(&quote.market) {
                best.offer(side, quote);
            }
        }

        table
    }
}
