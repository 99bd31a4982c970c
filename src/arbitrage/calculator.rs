//! Stake sizing and profit calculations for arbitrage opportunities.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::selector::BestPrice;
use crate::odds::Side;

/// Total stake every plan is sized against.
pub const TOTAL_STAKE: Decimal = Decimal::ONE_HUNDRED;

/// Stake split and profit metrics for a 100-unit total stake.
///
/// Both roundings use round-half-to-even.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StakePlan {
    /// Sum of both implied probabilities (< 1 for an arbitrage).
    pub total_probability: Decimal,
    /// Guaranteed return on total stake, in percent.
    pub profit_pct: Decimal,
    /// Exact home stake (2 dp).
    pub home_stake: Decimal,
    /// Exact away stake (2 dp).
    pub away_stake: Decimal,
    /// Payout of the exact split, whichever side wins.
    pub expected_return: Decimal,
    /// expected_return - TOTAL_STAKE.
    pub expected_profit: Decimal,
    /// Home stake in whole units.
    pub home_stake_rounded: Decimal,
    /// Away stake in whole units.
    pub away_stake_rounded: Decimal,
    /// Sum of whole-unit stakes, not necessarily 100.
    pub rounded_total_stake: Decimal,
    /// Payout if home wins with whole-unit stakes.
    pub home_outcome_rounded: Decimal,
    /// Payout if away wins with whole-unit stakes.
    pub away_outcome_rounded: Decimal,
    /// Worst-case profit with whole-unit stakes. May be negative.
    pub min_profit_rounded: Decimal,
    /// min_profit_rounded as a percentage of rounded_total_stake.
    pub profit_pct_rounded: Decimal,
}

impl StakePlan {
    /// Derive the plan from both implied probabilities and prices.
    ///
    /// Products that exceed the `Decimal` range saturate.
    ///
    /// # Panics
    ///
    /// If `home_pct + away_pct` is not positive. Callers only build plans for
    /// priced, sub-certain markets.
    pub fn compute(
        home_pct: Decimal,
        away_pct: Decimal,
        home_price: Decimal,
        away_price: Decimal,
    ) -> Self {
        let total_probability = home_pct + away_pct;
        assert!(
            total_probability > Decimal::ZERO,
            "stake plan needs a positive total implied probability, got {total_probability}"
        );

        let profit_pct = ((Decimal::ONE - total_probability) / total_probability)
            .saturating_mul(Decimal::ONE_HUNDRED);

        let home_stake = round_cents(home_pct * TOTAL_STAKE / total_probability);
        let away_stake = round_cents(away_pct * TOTAL_STAKE / total_probability);

        let expected_return =
            TOTAL_STAKE.saturating_mul(Decimal::ONE + profit_pct / Decimal::ONE_HUNDRED);
        let expected_profit = expected_return - TOTAL_STAKE;

        let home_stake_rounded = round_units(home_stake);
        let away_stake_rounded = round_units(away_stake);
        let rounded_total_stake = home_stake_rounded + away_stake_rounded;

        let home_outcome_rounded = home_stake_rounded.saturating_mul(home_price);
        let away_outcome_rounded = away_stake_rounded.saturating_mul(away_price);

        let min_profit_rounded =
            home_outcome_rounded.min(away_outcome_rounded) - rounded_total_stake;
        let profit_pct_rounded = if rounded_total_stake.is_zero() {
            Decimal::ZERO
        } else {
            (min_profit_rounded / rounded_total_stake).saturating_mul(Decimal::ONE_HUNDRED)
        };

        Self {
            total_probability,
            profit_pct,
            home_stake,
            away_stake,
            expected_return,
            expected_profit,
            home_stake_rounded,
            away_stake_rounded,
            rounded_total_stake,
            home_outcome_rounded,
            away_outcome_rounded,
            min_profit_rounded,
            profit_pct_rounded,
        }
    }

    /// Sum of the exact stakes.
    pub fn total_stake(&self) -> Decimal {
        self.home_stake + self.away_stake
    }

    /// Whether whole-unit stakes still lock in a profit.
    pub fn survives_rounding(&self) -> bool {
        self.min_profit_rounded > Decimal::ZERO
    }
}

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

fn round_units(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
}

/// One side of an opportunity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leg {
    /// Participant name.
    pub team: String,
    /// Best decimal odds.
    pub price: Decimal,
    /// 1 / price.
    pub implied_probability: Decimal,
    /// Sportsbook offering the price.
    pub sportsbook: String,
    /// Deep link to the sportsbook.
    pub link: Option<String>,
}

impl Leg {
    /// Leg for a positive best price.
    pub fn from_best(team: &str, best: &BestPrice) -> Self {
        Self {
            team: team.to_string(),
            price: best.price,
            implied_probability: Decimal::ONE / best.price,
            sportsbook: best.sportsbook.clone(),
            link: best.link.clone(),
        }
    }
}

/// Detected two-way arbitrage. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opportunity {
    sport_key: String,
    market: String,
    home: Leg,
    away: Leg,
    plan: StakePlan,
}

impl Opportunity {
    /// Build an opportunity, deriving its stake plan from the legs.
    pub fn new(sport_key: impl Into<String>, market: impl Into<String>, home: Leg, away: Leg) -> Self {
        let plan = StakePlan::compute(
            home.implied_probability,
            away.implied_probability,
            home.price,
            away.price,
        );
        Self {
            sport_key: sport_key.into(),
            market: market.into(),
            home,
            away,
            plan,
        }
    }

    /// Sport key, empty when unknown.
    pub fn sport_key(&self) -> &str {
        &self.sport_key
    }

    /// Market key.
    pub fn market(&self) -> &str {
        &self.market
    }

    /// Home leg.
    pub fn home(&self) -> &Leg {
        &self.home
    }

    /// Away leg.
    pub fn away(&self) -> &Leg {
        &self.away
    }

    /// Leg for a side.
    pub fn leg(&self, side: Side) -> &Leg {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    /// Derived stake plan.
    pub fn plan(&self) -> &StakePlan {
        &self.plan
    }

    /// Guaranteed profit percentage before rounding.
    pub fn profit_pct(&self) -> Decimal {
        self.plan.profit_pct
    }

    /// "Home vs Away" label.
    pub fn label(&self) -> String {
        format!("{} vs {}", self.home.team, self.away.team)
    }
}
