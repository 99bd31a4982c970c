//! Two-way sportsbook moneyline arbitrage scanner.
//!
//! This library pulls head-to-head odds from several sportsbooks, keeps the
//! best price for each side of every game, and flags games where backing both
//! sides at different books returns more than the total stake whichever side
//! wins.
//!
//! # Strategy
//!
//! Decimal odds `p` imply a probability of `1/p`. If the best home and away
//! prices imply less than 100% combined, stakes proportional to each side's
//! implied probability lock in a profit:
//!
//! ```text
//! Home @ 2.10 (fanduel):     1/2.10 = 0.4762
//! Away @ 2.05 (draftkings):  1/2.05 = 0.4878
//! ──────────────────────────────────────────
//! Total:                             0.9640 < 1 ✅
//! Stakes per $100:  $49.40 / $50.60
//! Return:           $103.73 either way (3.73%)
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`odds`]: Odds API client, event model, and test feed
//! - [`arbitrage`]: Best-price selection, detection, stake sizing, scanning
//! - [`storage`]: Versioned batch files of opportunities
//! - [`notify`]: Log and e-mail alerts
//! - [`api`]: HTTP API for health, status, and metrics
//! - [`metrics`]: Prometheus metric names and recorders
//! - [`utils`]: Utility functions

pub mod api;
pub mod arbitrage;
pub mod config;
pub mod error;
pub mod metrics;
pub mod notify;
pub mod odds;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use error::{Result, ScannerError};
