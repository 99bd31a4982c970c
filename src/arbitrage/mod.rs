//! Arbitrage module for finding two-way moneyline opportunities.
//!
//! This module handles:
//! - Best-price selection across allow-listed sportsbooks
//! - Opportunity detection and stake sizing
//! - Batch scanning over an odds feed

pub mod calculator;
pub mod collection;
pub mod detector;
pub mod scanner;
pub mod selector;

pub use calculator::{Leg, Opportunity, StakePlan, TOTAL_STAKE};
pub use collection::OpportunityCollection;
pub use detector::{assess_market, evaluate, evaluate_market, Assessment};
pub use scanner::{scan_events, ScanReport, ScanStats, Scanner, SportScan};
pub use selector::{BestPrice, BestPriceSelector, BestPriceTable, MarketBest};
