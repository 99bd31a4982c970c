//! Odds module for per-event sportsbook prices.
//!
//! This module handles:
//! - Odds API payload types and the validated event model
//! - the-odds-api client with retry
//! - Mock feed for testing

pub mod client;
pub mod mock;
pub mod types;

pub use client::{OddsApiClient, OddsFeed, OddsQuery, RetryPolicy};
pub use mock::{EventPayloadBuilder, MockOddsFeed};
pub use types::{Event, EventOdds, Quote, Side, SportInfo};
