//! Stocktake support
//!
//! A stocktake is a physical verification pass over a set of assets:
//! - [`scan`] turns raw barcode/QR payloads into asset references
//! - [`Stocktake`] tracks which expected assets have been seen
//!
//! # Examples
//!
//! ```
//! use assetnet_core::AssetId;
//! use assetnet_stocktake::{Stocktake, VerifyOutcome};
//! use chrono::Utc;
//!
//! let mut batch = Stocktake::start("Level 2", None, [AssetId::from("a1"), AssetId::from("a2")]);
//! assert_eq!(batch.verify(&AssetId::from("a1"), Utc::now()).unwrap(), VerifyOutcome::Verified);
//! assert_eq!(batch.summary().missing, 1);
//! ```

use assetnet_core::{Asset, AssetId, Condition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub mod scan;

pub use scan::{parse_scan, resolve_scan, ScanCode};

/// Stocktake errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StocktakeError {
    /// Scanner produced nothing
    #[error("Empty scan")]
    EmptyScan,

    /// Payload did not match any known format
    #[error("Unrecognized scan: {0}")]
    UnrecognizedScan(String),

    /// Batch no longer accepts verifications
    #[error("Stocktake {0} is closed")]
    Closed(Uuid),
}

pub type Result<T> = std::result::Result<T, StocktakeError>;

/// Result of verifying one asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyOutcome {
    /// Expected and seen for the first time
    Verified,
    /// Seen before in this batch
    AlreadyVerified,
    /// Seen, but not part of the expected set
    Unexpected,
}

/// One sighting of an asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub asset_id: AssetId,
    pub verified_at: DateTime<Utc>,
    pub expected: bool,
}

/// Progress counters for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StocktakeSummary {
    pub expected: usize,
    pub verified: usize,
    pub unexpected: usize,
    pub missing: usize,
}

/// A stocktake batch with its verification records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stocktake {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub started_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    expected: BTreeSet<AssetId>,
    records: BTreeMap<AssetId, Verification>,
}

impl Stocktake {
    /// Start a batch over an explicit set of assets
    pub fn start(
        name: impl Into<String>,
        location: Option<String>,
        expected: impl IntoIterator<Item = AssetId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            location,
            started_at: Utc::now(),
            closed_at: None,
            expected: expected.into_iter().collect(),
            records: BTreeMap::new(),
        }
    }

    /// Start a batch over every in-service asset at `location`
    ///
    /// With no location, every in-service asset is expected. Retired assets
    /// are never expected.
    pub fn for_location(name: impl Into<String>, location: Option<String>, assets: &[Asset]) -> Self {
        let expected: Vec<AssetId> = assets
            .iter()
            .filter(|a| a.condition != Condition::Retired)
            .filter(|a| match &location {
                Some(loc) => a.location.as_deref() == Some(loc.as_str()),
                None => true,
            })
            .map(|a| a.id.clone())
            .collect();
        Self::start(name, location, expected)
    }

    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    /// Record a sighting of `asset_id`
    pub fn verify(&mut self, asset_id: &AssetId, at: DateTime<Utc>) -> Result<VerifyOutcome> {
        if self.is_closed() {
            return Err(StocktakeError::Closed(self.id));
        }
        if self.records.contains_key(asset_id) {
            return Ok(VerifyOutcome::AlreadyVerified);
        }

        let expected = self.expected.contains(asset_id);
        self.records.insert(
            asset_id.clone(),
            Verification {
                asset_id: asset_id.clone(),
                verified_at: at,
                expected,
            },
        );
        debug!(stocktake = %self.id, asset = %asset_id, expected, "asset verified");

        Ok(if expected {
            VerifyOutcome::Verified
        } else {
            VerifyOutcome::Unexpected
        })
    }

    /// Stop accepting verifications; closing twice keeps the first time
    pub fn close(&mut self, at: DateTime<Utc>) {
        if self.closed_at.is_none() {
            self.closed_at = Some(at);
        }
    }

    /// Expected assets not yet seen, in id order
    pub fn missing(&self) -> Vec<&AssetId> {
        self.expected
            .iter()
            .filter(|id| !self.records.contains_key(*id))
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &Verification> {
        self.records.values()
    }

    pub fn summary(&self) -> StocktakeSummary {
        let verified = self.records.values().filter(|r| r.expected).count();
        StocktakeSummary {
            expected: self.expected.len(),
            verified,
            unexpected: self.records.len() - verified,
            missing: self.expected.len() - verified,
        }
    }
}
