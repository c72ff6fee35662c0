//! Rate-query collaborator boundary.
//!
//! Scraping, caching, and chart rendering live outside this crate; the
//! pipeline only consumes the latest snapshot plus a rendered chart.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::RatesError;

/// Latest reference-rate readings, in percent.
#[derive(Debug, Clone, Copy)]
pub struct RateSnapshot {
    pub date: NaiveDate,
    pub three_months: f64,
    pub six_months: f64,
    pub twelve_months: f64,
}

/// Provider of the latest rates and a rendered chart image.
#[async_trait]
pub trait RatesProvider: Send + Sync {
    /// Return the latest snapshot and the path of a chart image for it.
    async fn latest(&self) -> Result<(RateSnapshot, PathBuf), RatesError>;
}
