//! Core types and traits for assetnet
//!
//! This crate provides the inventory types shared by the assetnet workspace:
//! - [`Asset`] - A tracked hardware item
//! - [`Subnet`] - An administrator-managed IPv4 network
//! - [`AssetIp`] - A link from an IP address to an asset
//! - [`AssetnetError`] - Error types
//!
//! ```
//! use assetnet_core::{AssetId, AssetSummary};
//!
//! let summary = AssetSummary::new(AssetId::from("a1"), "Desk PC");
//! assert_eq!(summary.id.as_str(), "a1");
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub mod config;

/// Identifier of an inventory asset
///
/// Asset ids are chosen by the operator (usually the asset tag printed on
/// the label), so they are plain strings rather than generated UUIDs.
///
/// # Examples
///
/// ```
/// use assetnet_core::AssetId;
///
/// let id = AssetId::from("LAP-0042");
/// assert_eq!(id.to_string(), "LAP-0042");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        AssetId(value.to_string())
    }
}

impl From<String> for AssetId {
    fn from(value: String) -> Self {
        AssetId(value)
    }
}

/// Physical condition recorded for an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    #[default]
    Good,
    Fair,
    Poor,
    Broken,
    Retired,
}

impl Condition {
    /// Every condition, in report order
    pub const ALL: [Condition; 6] = [
        Condition::New,
        Condition::Good,
        Condition::Fair,
        Condition::Poor,
        Condition::Broken,
        Condition::Retired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::Good => "good",
            Condition::Fair => "fair",
            Condition::Poor => "poor",
            Condition::Broken => "broken",
            Condition::Retired => "retired",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = AssetnetError;

    fn from_str(s: &str) -> Result<Self> {
        Condition::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AssetnetError::Parse(format!("unknown condition: {}", s)))
    }
}

/// A tracked hardware item
///
/// Reference data (category, manufacturer, location, supplier) is stored as
/// free-form names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub name: String,
    #[serde(default)]
    pub asset_tag: Option<String>,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub purchase_date: Option<NaiveDate>,
    /// Purchase cost in minor currency units
    #[serde(default)]
    pub purchase_cost_cents: Option<i64>,
    #[serde(default)]
    pub warranty_expires: Option<NaiveDate>,
    /// Expected service life, used for replacement planning
    #[serde(default)]
    pub lifecycle_years: Option<u32>,
    #[serde(default)]
    pub last_reviewed: Option<NaiveDate>,
}

impl Asset {
    /// Create an asset with only the required fields set
    pub fn new(id: impl Into<AssetId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            asset_tag: None,
            serial: None,
            category: None,
            manufacturer: None,
            location: None,
            supplier: None,
            condition: Condition::default(),
            purchase_date: None,
            purchase_cost_cents: None,
            warranty_expires: None,
            lifecycle_years: None,
            last_reviewed: None,
        }
    }

    /// Check the invariants every stored asset must satisfy
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(AssetnetError::Invalid("asset id is empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(AssetnetError::Invalid(format!(
                "asset {} has an empty name",
                self.id
            )));
        }
        if let Some(cost) = self.purchase_cost_cents {
            if cost < 0 {
                return Err(AssetnetError::Invalid(format!(
                    "asset {} has a negative purchase cost",
                    self.id
                )));
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> AssetSummary {
        AssetSummary::from(self)
    }
}

/// The slice of an asset shown next to a linked IP address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub id: AssetId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_tag: Option<String>,
}

impl AssetSummary {
    pub fn new(id: AssetId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            asset_tag: None,
        }
    }
}

impl From<&Asset> for AssetSummary {
    fn from(asset: &Asset) -> Self {
        Self {
            id: asset.id.clone(),
            name: asset.name.clone(),
            asset_tag: asset.asset_tag.clone(),
        }
    }
}

/// Link from an IPv4 address to the asset that owns it
///
/// An asset may own several addresses; an address does not have to fall
/// inside any known subnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetIp {
    /// Dotted-quad address
    pub ip: String,
    #[serde(default)]
    pub label: Option<String>,
    pub asset_id: AssetId,
}

/// An administrator-managed IPv4 network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub id: Uuid,
    /// Unique display name
    pub name: String,
    /// Canonical CIDR string, e.g. "10.20.0.0/22"
    pub cidr: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubnet {
    pub name: String,
    pub cidr: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update of a subnet; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cidr: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Subnet {
    /// Build a fresh subnet record with a new id
    ///
    /// The cidr is stored as given; validating it is the caller's job.
    pub fn create(input: NewSubnet) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            cidr: input.cidr,
            description: input.description,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a patch, keeping the id and creation time
    pub fn apply(&mut self, patch: SubnetPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(cidr) = patch.cidr {
            self.cidr = cidr;
        }
        if patch.description.is_some() {
            self.description = patch.description;
        }
        self.updated_at = Utc::now();
    }
}

/// Error types for assetnet operations
#[derive(Error, Debug)]
pub enum AssetnetError {
    /// Invalid record contents
    #[error("Invalid: {0}")]
    Invalid(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type alias for assetnet operations
pub type Result<T> = std::result::Result<T, AssetnetError>;
