//! Arbitrage opportunity detection.

use rust_decimal::Decimal;
use tracing::{debug, info};

use super::calculator::{Leg, Opportunity};
use super::selector::{BestPriceTable, MarketBest};
use crate::odds::{Event, Side};

/// Result of checking one market of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assessment {
    /// No allow-listed sportsbook priced this side (or both).
    MissingSide(Side),
    /// Both sides priced, implied probabilities sum to at least 1.
    NoEdge {
        /// Sum of implied probabilities.
        total_probability: Decimal,
    },
    /// Implied probabilities sum below 1.
    Edge(Opportunity),
}

impl std::fmt::Display for Assessment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Assessment::MissingSide(side) => write!(f, "no {side} price"),
            Assessment::NoEdge { total_probability } => {
                write!(f, "no edge (total implied {})", total_probability.round_dp(4))
            }
            Assessment::Edge(opp) => write!(
                f,
                "edge {}% ({} @ {} / {} @ {})",
                opp.profit_pct().round_dp(2),
                opp.home().sportsbook,
                opp.home().price,
                opp.away().sportsbook,
                opp.away().price,
            ),
        }
    }
}

/// Check one market's best prices for a two-way arbitrage.
pub fn assess_market(event: &Event, market: &str, best: &MarketBest) -> Assessment {
    let home = match best.home.as_ref() {
        Some(home) if home.price > Decimal::ZERO => home,
        _ => return Assessment::MissingSide(Side::Home),
    };
    let away = match best.away.as_ref() {
        Some(away) if away.price > Decimal::ZERO => away,
        _ => return Assessment::MissingSide(Side::Away),
    };

    let home = Leg::from_best(&event.home, home);
    let away = Leg::from_best(&event.away, away);
    let total_probability = home.implied_probability + away.implied_probability;

    if total_probability >= Decimal::ONE {
        return Assessment::NoEdge { total_probability };
    }

    Assessment::Edge(Opportunity::new(event.sport_key.clone(), market, home, away))
}

/// Single-market evaluation: an opportunity iff both sides are priced and
/// `1/home + 1/away < 1`.
pub fn evaluate_market(event: &Event, market: &str, best: &MarketBest) -> Option<Opportunity> {
    match assess_market(event, market, best) {
        Assessment::Edge(opp) => {
            info!(
                sport = %event.sport_key,
                event = %event.label(),
                market,
                total_probability = %opp.plan().total_probability.round_dp(4),
                profit_pct = %opp.profit_pct().round_dp(2),
                min_profit_rounded = %opp.plan().min_profit_rounded,
                home_book = %opp.home().sportsbook,
                away_book = %opp.away().sportsbook,
                "Arbitrage opportunity detected"
            );
            Some(opp)
        }
        other => {
            debug!(event = %event.label(), market, outcome = %other, "No arbitrage");
            None
        }
    }
}

/// Evaluate every tracked market. At most one opportunity per market.
pub fn evaluate(event: &Event, table: &BestPriceTable) -> Vec<Opportunity> {
    table
        .iter()
        .filter_map(|(market, best)| evaluate_market(event, market, best))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::selector::{BestPrice, BestPriceSelector};
    use crate::odds::Quote;
    use rust_decimal_macros::dec;

    fn best(price: Decimal, book: &str) -> Option<BestPrice> {
        Some(BestPrice {
            price,
            sportsbook: book.to_string(),
            link: None,
        })
    }

    fn event() -> Event {
        Event::new("Lakers", "Celtics").unwrap()
    }

    #[test]
    fn profitable_prices_yield_opportunity() {
        let market = MarketBest {
            home: best(dec!(2.10), "fanduel"),
            away: best(dec!(2.05), "draftkings"),
        };

        let opp = evaluate_market(&event(), "h2h", &market).unwrap();

        assert_eq!(opp.home().team, "Lakers");
        assert_eq!(opp.away().team, "Celtics");
        assert_eq!(opp.home().sportsbook, "fanduel");
        assert_eq!(opp.away().sportsbook, "draftkings");
        assert_eq!(opp.market(), "h2h");
        assert!(opp.home().implied_probability + opp.away().implied_probability < Decimal::ONE);
    }

    #[test]
    fn overround_prices_yield_nothing() {
        let market = MarketBest {
            home: best(dec!(1.80), "fanduel"),
            away: best(dec!(2.00), "draftkings"),
        };

        let assessment = assess_market(&event(), "h2h", &market);
        match assessment {
            Assessment::NoEdge { total_probability } => {
                assert_eq!(total_probability.round_dp(4), dec!(1.0556));
            }
            other => panic!("unexpected assessment: {other:?}"),
        }
        assert!(evaluate_market(&event(), "h2h", &market).is_none());
    }

    #[test]
    fn break_even_is_not_an_opportunity() {
        let market = MarketBest {
            home: best(dec!(2.00), "fanduel"),
            away: best(dec!(2.00), "draftkings"),
        };

        assert_eq!(
            assess_market(&event(), "h2h", &market),
            Assessment::NoEdge {
                total_probability: Decimal::ONE
            }
        );
    }

    #[test]
    fn missing_side_is_skipped() {
        let market = MarketBest {
            home: None,
            away: best(dec!(5.00), "draftkings"),
        };

        assert_eq!(
            assess_market(&event(), "h2h", &market),
            Assessment::MissingSide(Side::Home)
        );
        assert!(evaluate_market(&event(), "h2h", &market).is_none());
    }

    #[test]
    fn zero_price_is_treated_as_missing() {
        let market = MarketBest {
            home: best(dec!(2.5), "fanduel"),
            away: best(Decimal::ZERO, "draftkings"),
        };

        assert_eq!(
            assess_market(&event(), "h2h", &market),
            Assessment::MissingSide(Side::Away)
        );
    }

    #[test]
    fn evaluate_runs_selector_output_end_to_end() {
        let selector = BestPriceSelector::new(["fanduel", "draftkings"], ["h2h"]);
        let event = event()
            .with_quote(Quote::new("fanduel", "h2h", "Lakers", dec!(2.10)))
            .with_quote(Quote::new("fanduel", "h2h", "Celtics", dec!(1.70)))
            .with_quote(Quote::new("draftkings", "h2h", "Lakers", dec!(1.75)))
            .with_quote(Quote::new("draftkings", "h2h", "Celtics", dec!(2.05)));

        let opportunities = evaluate(&event, &selector.select(&event));

        assert_eq!(opportunities.len(), 1);
        assert_eq!(opportunities[0].plan().home_stake, dec!(49.40));
        assert_eq!(opportunities[0].plan().away_stake, dec!(50.60));
    }

    #[test]
    fn evaluate_without_home_quotes_yields_nothing() {
        let selector = BestPriceSelector::new(["fanduel", "draftkings"], ["h2h"]);
        let event = event()
            .with_quote(Quote::new("draftkings", "h2h", "Celtics", dec!(9.0)))
            .with_quote(Quote::new("bovada", "h2h", "Lakers", dec!(9.0)));

        assert!(evaluate(&event, &selector.select(&event)).is_empty());
    }

    #[test]
    fn assessment_display_is_readable() {
        assert_eq!(Assessment::MissingSide(Side::Away).to_string(), "no away price");
    }
}
