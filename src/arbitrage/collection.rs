//! Ordered accumulation of opportunities across events and sports.

use crate::error::StorageError;
use crate::storage::OpportunityRecord;

use super::calculator::Opportunity;

/// Append-only, ordered set of opportunities. No deduplication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpportunityCollection {
    opportunities: Vec<Opportunity>,
}

impl OpportunityCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append opportunities in order.
    pub fn add(&mut self, opportunities: impl IntoIterator<Item = Opportunity>) {
        self.opportunities.extend(opportunities);
    }

    /// Append one opportunity.
    pub fn push(&mut self, opportunity: Opportunity) {
        self.opportunities.push(opportunity);
    }

    /// Number of opportunities.
    pub fn len(&self) -> usize {
        self.opportunities.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.opportunities.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Opportunity> {
        self.opportunities.iter()
    }

    /// Opportunities by descending profit percentage; ties keep insertion order.
    pub fn sorted_by_profit(&self) -> Vec<&Opportunity> {
        let mut sorted: Vec<&Opportunity> = self.opportunities.iter().collect();
        sorted.sort_by(|a, b| b.profit_pct().cmp(&a.profit_pct()));
        sorted
    }

    /// Most profitable opportunity.
    pub fn best(&self) -> Option<&Opportunity> {
        self.sorted_by_profit().into_iter().next()
    }

    /// Flatten into persisted records, in order.
    pub fn to_records(&self) -> Vec<OpportunityRecord> {
        self.opportunities
            .iter()
            .map(OpportunityRecord::from_opportunity)
            .collect()
    }

    /// Rebuild from persisted records, recomputing every stake plan.
    pub fn from_records(records: Vec<OpportunityRecord>) -> Result<Self, StorageError> {
        let opportunities = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                record
                    .into_opportunity()
                    .map_err(|reason| StorageError::InvalidRecord { index, reason })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { opportunities })
    }
}

impl FromIterator<Opportunity> for OpportunityCollection {
    fn from_iter<I: IntoIterator<Item = Opportunity>>(iter: I) -> Self {
        Self {
            opportunities: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a OpportunityCollection {
    type Item = &'a Opportunity;
    type IntoIter = std::slice::Iter<'a, Opportunity>;

    fn into_iter(self) -> Self::IntoIter {
        self.opportunities.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::calculator::Leg;
    use crate::arbitrage::selector::BestPrice;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn opportunity(home: &str, home_price: Decimal, away_price: Decimal) -> Opportunity {
        let best = |price| BestPrice {
            price,
            sportsbook: "fanduel".to_string(),
            link: None,
        };
        Opportunity::new(
            "basketball_nba",
            "h2h",
            Leg::from_best(home, &best(home_price)),
            Leg::from_best("Away", &best(away_price)),
        )
    }

    #[test]
    fn add_preserves_order_and_duplicates() {
        let mut collection = OpportunityCollection::new();
        let opp = opportunity("A", dec!(2.10), dec!(2.05));
        collection.add(vec![opp.clone(), opportunity("B", dec!(2.2), dec!(2.0))]);
        collection.push(opp);

        let teams: Vec<&str> = collection.iter().map(|o| o.home().team.as_str()).collect();
        assert_eq!(teams, vec!["A", "B", "A"]);
    }

    #[test]
    fn sorted_by_profit_is_descending() {
        let collection: OpportunityCollection = vec![
            opportunity("thin", dec!(2.02), dec!(2.0)),
            opportunity("fat", dec!(2.5), dec!(2.1)),
            opportunity("mid", dec!(2.10), dec!(2.05)),
        ]
        .into_iter()
        .collect();

        let order: Vec<&str> = collection
            .sorted_by_profit()
            .iter()
            .map(|o| o.home().team.as_str())
            .collect();
        assert_eq!(order, vec!["fat", "mid", "thin"]);
        assert_eq!(collection.best().unwrap().home().team, "fat");
    }

    #[test]
    fn records_round_trip_field_for_field() {
        let collection: OpportunityCollection = vec![
            opportunity("A", dec!(2.10), dec!(2.05)),
            opportunity("B", dec!(1.50), dec!(3.01)),
        ]
        .into_iter()
        .collect();

        let records = collection.to_records();
        let restored = OpportunityCollection::from_records(records.clone()).unwrap();

        assert_eq!(restored.to_records(), records);
        assert_eq!(restored, collection);
    }

    #[test]
    fn invalid_record_reports_its_index() {
        let collection: OpportunityCollection =
            vec![opportunity("A", dec!(2.10), dec!(2.05)), opportunity("B", dec!(2.2), dec!(2.0))]
                .into_iter()
                .collect();
        let mut records = collection.to_records();
        records[1].home_pct = Decimal::ZERO;

        let err = OpportunityCollection::from_records(records).unwrap_err();
        assert!(matches!(err, StorageError::InvalidRecord { index: 1, .. }));
    }
}
