//! Versioned flat records for persisted opportunities.
//!
//! Only raw inputs are stored. Stake plans are recomputed on load so a change
//! to the sizing formulas never disagrees with a stored value.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::arbitrage::{Leg, Opportunity};

/// Version of [`OpportunityRecord`] and [`OpportunityBatch`] written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// Flat, persisted form of one opportunity (schema v1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityRecord {
    /// Sport key, empty when unknown.
    #[serde(default)]
    pub sport_key: String,
    /// Market key.
    pub market: String,
    /// Home participant.
    pub home_team: String,
    /// Best home decimal odds.
    pub home_price: Decimal,
    /// Home implied probability.
    pub home_pct: Decimal,
    /// Sportsbook offering the home price.
    pub home_sportsbook: String,
    /// Home deep link, empty if unavailable.
    #[serde(default)]
    pub home_link: String,
    /// Away participant.
    pub away_team: String,
    /// Best away decimal odds.
    pub away_price: Decimal,
    /// Away implied probability.
    pub away_pct: Decimal,
    /// Sportsbook offering the away price.
    pub away_sportsbook: String,
    /// Away deep link, empty if unavailable.
    #[serde(default)]
    pub away_link: String,
}

impl OpportunityRecord {
    /// Flatten an opportunity.
    pub fn from_opportunity(opp: &Opportunity) -> Self {
        let home = opp.home();
        let away = opp.away();
        Self {
            sport_key: opp.sport_key().to_string(),
            market: opp.market().to_string(),
            home_team: home.team.clone(),
            home_price: home.price,
            home_pct: home.implied_probability,
            home_sportsbook: home.sportsbook.clone(),
            home_link: home.link.clone().unwrap_or_default(),
            away_team: away.team.clone(),
            away_price: away.price,
            away_pct: away.implied_probability,
            away_sportsbook: away.sportsbook.clone(),
            away_link: away.link.clone().unwrap_or_default(),
        }
    }

    /// Rebuild the opportunity, recomputing its stake plan.
    ///
    /// Implied probabilities are rederived from the prices. A stored value
    /// that disagrees with its price, or a pair that is not below certainty,
    /// is rejected.
    pub fn into_opportunity(self) -> Result<Opportunity, String> {
        let home_pct = implied_probability("home", self.home_price, self.home_pct)?;
        let away_pct = implied_probability("away", self.away_price, self.away_pct)?;

        let total = home_pct + away_pct;
        if total >= Decimal::ONE {
            return Err(format!(
                "implied probabilities sum to {}, not below 1",
                total.round_dp(6)
            ));
        }

        let home = Leg {
            team: self.home_team,
            price: self.home_price,
            implied_probability: home_pct,
            sportsbook: self.home_sportsbook,
            link: non_empty(self.home_link),
        };
        let away = Leg {
            team: self.away_team,
            price: self.away_price,
            implied_probability: away_pct,
            sportsbook: self.away_sportsbook,
            link: non_empty(self.away_link),
        };

        Ok(Opportunity::new(self.sport_key, self.market, home, away))
    }
}

/// Largest accepted gap between a stored implied probability and `1 / price`.
const PCT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

fn implied_probability(side: &str, price: Decimal, stored: Decimal) -> Result<Decimal, String> {
    if price <= Decimal::ZERO {
        return Err(format!("{side} price must be positive, got {price}"));
    }
    let derived = Decimal::ONE
        .checked_div(price)
        .ok_or_else(|| format!("{side} price {price} has no implied probability"))?;
    if (stored - derived).abs() > PCT_TOLERANCE {
        return Err(format!(
            "{side} implied probability {stored} does not match price {price}"
        ));
    }
    Ok(derived)
}

fn non_empty(link: String) -> Option<String> {
    if link.is_empty() {
        None
    } else {
        Some(link)
    }
}

/// Contents of one batch file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityBatch {
    /// Schema version of the records.
    pub schema_version: u32,
    /// When the batch was produced.
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    /// Records in collection order.
    pub opportunities: Vec<OpportunityRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::selector::BestPrice;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn opportunity(link: Option<&str>) -> Opportunity {
        let best = |price, book: &str, link: Option<&str>| BestPrice {
            price,
            sportsbook: book.to_string(),
            link: link.map(str::to_string),
        };
        Opportunity::new(
            "icehockey_nhl",
            "h2h",
            Leg::from_best("Bruins", &best(dec!(2.10), "fanduel", link)),
            Leg::from_best("Rangers", &best(dec!(2.05), "betmgm", None)),
        )
    }

    #[test]
    fn missing_link_flattens_to_empty_string() {
        let record = OpportunityRecord::from_opportunity(&opportunity(None));
        assert_eq!(record.home_link, "");
        assert_eq!(record.away_link, "");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["home_price"], "2.10");
        assert_eq!(json["home_sportsbook"], "fanduel");
    }

    #[test]
    fn record_rebuilds_an_equal_opportunity() {
        let original = opportunity(Some("https://fanduel.example/slip"));
        let rebuilt = OpportunityRecord::from_opportunity(&original)
            .into_opportunity()
            .unwrap();

        assert_eq!(rebuilt, original);
        assert_eq!(rebuilt.home().link.as_deref(), Some("https://fanduel.example/slip"));
        assert_eq!(rebuilt.away().link, None);
    }

    #[test]
    fn record_with_zero_price_is_rejected() {
        let mut record = OpportunityRecord::from_opportunity(&opportunity(None));
        record.away_price = Decimal::ZERO;
        assert!(record.into_opportunity().is_err());
    }

    #[test]
    fn stored_probability_must_match_price() {
        let mut record = OpportunityRecord::from_opportunity(&opportunity(None));
        record.home_pct = dec!(0.0000000000000000000000000001);
        record.away_pct = dec!(0.0000000000000000000000000001);

        let err = record.into_opportunity().unwrap_err();
        assert!(err.contains("does not match price"), "{err}");
    }

    #[test]
    fn record_at_or_above_certainty_is_rejected() {
        let mut record = OpportunityRecord::from_opportunity(&opportunity(None));
        record.home_pct = dec!(0.9);
        record.away_pct = dec!(0.9);
        assert!(record.into_opportunity().is_err());

        let mut record = OpportunityRecord::from_opportunity(&opportunity(None));
        record.home_price = dec!(2);
        record.home_pct = dec!(0.5);
        record.away_price = dec!(2);
        record.away_pct = dec!(0.5);
        let err = record.into_opportunity().unwrap_err();
        assert!(err.contains("not below 1"), "{err}");
    }

    #[test]
    fn extreme_consistent_prices_load_without_overflow() {
        let mut record = OpportunityRecord::from_opportunity(&opportunity(None));
        record.home_price = dec!(10000000000000000000000000000);
        record.home_pct = Decimal::ONE / record.home_price;
        record.away_price = dec!(10000000000000000000000000000);
        record.away_pct = Decimal::ONE / record.away_price;

        let opp = record.into_opportunity().unwrap();
        assert!(opp.plan().total_probability < Decimal::ONE);
        assert!(opp.profit_pct() > Decimal::ZERO);
    }

    #[test]
    fn record_without_optional_fields_parses() {
        let record: OpportunityRecord = serde_json::from_str(
            r#"{
                "market": "h2h",
                "home_team": "Bruins", "home_price": "2.1", "home_pct": "0.47619", "home_sportsbook": "fanduel",
                "away_team": "Rangers", "away_price": "2.05", "away_pct": "0.48780", "away_sportsbook": "betmgm"
            }"#,
        )
        .unwrap();

        assert_eq!(record.sport_key, "");
        assert_eq!(record.home_link, "");
        assert!(record.into_opportunity().is_ok());
    }
}
