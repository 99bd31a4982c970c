//! Alert delivery for scan results.
//!
//! A [`Notifier`] receives the full collection of a scan. Notifiers are
//! dispatched independently: one failing does not stop the others.

pub mod email;

pub use email::{escape_html, render_html, MailgunNotifier};

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::arbitrage::OpportunityCollection;
use crate::error::NotifyError;
use crate::metrics;

/// Sends a scan's opportunities somewhere.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Deliver one batch. Callers skip empty collections.
    async fn notify(
        &self,
        opportunities: &OpportunityCollection,
        generated_at: OffsetDateTime,
    ) -> Result<(), NotifyError>;
}

/// Logs each opportunity via tracing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify(
        &self,
        opportunities: &OpportunityCollection,
        _generated_at: OffsetDateTime,
    ) -> Result<(), NotifyError> {
        for opp in opportunities.sorted_by_profit() {
            let plan = opp.plan();
            info!(
                sport = opp.sport_key(),
                event = %opp.label(),
                profit_pct = %plan.profit_pct.round_dp(2),
                home = %format!("{} @ {} ({})", opp.home().team, opp.home().price, opp.home().sportsbook),
                away = %format!("{} @ {} ({})", opp.away().team, opp.away().price, opp.away().sportsbook),
                home_stake = %plan.home_stake_rounded,
                away_stake = %plan.away_stake_rounded,
                min_profit_rounded = %plan.min_profit_rounded,
                "Arbitrage alert"
            );
        }
        Ok(())
    }
}

/// Send a batch to every notifier. Returns how many delivered it.
///
/// An empty collection is not sent anywhere.
pub async fn dispatch(
    notifiers: &[Box<dyn Notifier>],
    opportunities: &OpportunityCollection,
    generated_at: OffsetDateTime,
) -> usize {
    if opportunities.is_empty() {
        info!("No opportunities, skipping notifications");
        return 0;
    }

    let mut delivered = 0;
    for notifier in notifiers {
        match notifier.notify(opportunities, generated_at).await {
            Ok(()) => {
                metrics::inc_notifications_sent(notifier.name());
                delivered += 1;
            }
            Err(e) => {
                metrics::inc_notifications_failed(notifier.name());
                warn!(channel = notifier.name(), error = %e, "Notification failed");
            }
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::{BestPrice, Leg, Opportunity};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn notify(
            &self,
            _opportunities: &OpportunityCollection,
            _generated_at: OffsetDateTime,
        ) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotifyError::NotConfigured("test".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn one_opportunity() -> OpportunityCollection {
        let best = |price| BestPrice {
            price,
            sportsbook: "fanduel".to_string(),
            link: None,
        };
        std::iter::once(Opportunity::new(
            "basketball_nba",
            "h2h",
            Leg::from_best("Lakers", &best(dec!(2.10))),
            Leg::from_best("Celtics", &best(dec!(2.05))),
        ))
        .collect()
    }

    #[tokio::test]
    async fn empty_collection_is_not_dispatched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let notifiers: Vec<Box<dyn Notifier>> = vec![Box::new(Counting {
            calls: calls.clone(),
            fail: false,
        })];

        let delivered = dispatch(
            &notifiers,
            &OpportunityCollection::new(),
            OffsetDateTime::now_utc(),
        )
        .await;

        assert_eq!(delivered, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_notifier_does_not_block_others() {
        let calls = Arc::new(AtomicUsize::new(0));
        let notifiers: Vec<Box<dyn Notifier>> = vec![
            Box::new(Counting {
                calls: calls.clone(),
                fail: true,
            }),
            Box::new(LogNotifier),
            Box::new(Counting {
                calls: calls.clone(),
                fail: false,
            }),
        ];

        let delivered = dispatch(&notifiers, &one_opportunity(), OffsetDateTime::now_utc()).await;

        assert_eq!(delivered, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
