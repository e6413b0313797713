//! Inventory reports
//!
//! Tabular and aggregate views over a snapshot of assets:
//! - **warranty**: days until each warranty ends
//! - **condition**: asset count per condition
//! - **value**: purchase cost summed per category
//! - **lifecycle**: age against expected service life
//! - **review**: when each asset is next due for review
//!
//! Reports are recomputed from the asset list on every call.
//!
//! # Examples
//!
//! ```
//! use assetnet_core::Asset;
//! use assetnet_report::{build_report, ReportKind, ReportOptions};
//! use chrono::NaiveDate;
//!
//! let assets = vec![Asset::new("a1", "Laptop"), Asset::new("a2", "Printer")];
//! let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
//!
//! let report = build_report(ReportKind::Condition, &assets, today, &ReportOptions::default());
//! assert_eq!(report.headers(), vec!["condition", "count"]);
//! ```

use assetnet_core::config::Settings;
use assetnet_core::{Asset, AssetSummary, Condition};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod status;

pub use status::{
    age_years, days_until, lifecycle_status, review_status, warranty_status, LifecycleStatus,
    ReviewStatus, WarrantyStatus,
};

/// Category label used for assets without one
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Report errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("Unknown report: {0}")]
    UnknownKind(String),
}

/// The available reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Warranty,
    Condition,
    Value,
    Lifecycle,
    Review,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        ReportKind::Warranty,
        ReportKind::Condition,
        ReportKind::Value,
        ReportKind::Lifecycle,
        ReportKind::Review,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Warranty => "warranty",
            ReportKind::Condition => "condition",
            ReportKind::Value => "value",
            ReportKind::Lifecycle => "lifecycle",
            ReportKind::Review => "review",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ReportError::UnknownKind(s.to_string()))
    }
}

/// Thresholds used by the date-based reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub warranty_window_days: i64,
    pub review_interval_days: i64,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions::from(&Settings::default())
    }
}

impl From<&Settings> for ReportOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            warranty_window_days: settings.warranty_window_days,
            review_interval_days: settings.review_interval_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarrantyRow {
    pub asset: AssetSummary,
    pub warranty_expires: Option<NaiveDate>,
    pub warranty: WarrantyStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionRow {
    pub condition: Condition,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRow {
    pub category: String,
    pub assets: usize,
    /// Assets in the category without a recorded cost
    pub uncosted: usize,
    pub total_cost_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleRow {
    pub asset: AssetSummary,
    pub purchase_date: Option<NaiveDate>,
    pub age_years: Option<u32>,
    pub lifecycle: LifecycleStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRow {
    pub asset: AssetSummary,
    pub last_reviewed: Option<NaiveDate>,
    pub review: ReviewStatus,
}

/// A computed report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "report", content = "rows", rename_all = "snake_case")]
pub enum Report {
    Warranty(Vec<WarrantyRow>),
    Condition(Vec<ConditionRow>),
    Value(Vec<ValueRow>),
    Lifecycle(Vec<LifecycleRow>),
    Review(Vec<ReviewRow>),
}

/// Compute a report over `assets` as of `today`
pub fn build_report(
    kind: ReportKind,
    assets: &[Asset],
    today: NaiveDate,
    options: &ReportOptions,
) -> Report {
    match kind {
        ReportKind::Warranty => Report::Warranty(warranty_report(
            assets,
            today,
            options.warranty_window_days,
        )),
        ReportKind::Condition => Report::Condition(condition_report(assets)),
        ReportKind::Value => Report::Value(value_report(assets)),
        ReportKind::Lifecycle => Report::Lifecycle(lifecycle_report(assets, today)),
        ReportKind::Review => Report::Review(review_report(
            assets,
            today,
            options.review_interval_days,
        )),
    }
}

/// Warranty rows, soonest end date first; unknown dates last
pub fn warranty_report(assets: &[Asset], today: NaiveDate, window_days: i64) -> Vec<WarrantyRow> {
    let mut rows: Vec<WarrantyRow> = assets
        .iter()
        .map(|a| WarrantyRow {
            asset: a.summary(),
            warranty_expires: a.warranty_expires,
            warranty: warranty_status(a, today, window_days),
        })
        .collect();
    rows.sort_by(|a, b| {
        (a.warranty_expires.is_none(), a.warranty_expires, &a.asset.id).cmp(&(
            b.warranty_expires.is_none(),
            b.warranty_expires,
            &b.asset.id,
        ))
    });
    rows
}

/// One row per condition, zero counts included
pub fn condition_report(assets: &[Asset]) -> Vec<ConditionRow> {
    Condition::ALL
        .into_iter()
        .map(|condition| ConditionRow {
            condition,
            count: assets.iter().filter(|a| a.condition == condition).count(),
        })
        .collect()
}

/// Purchase cost per category, ordered by category name
///
/// Totals saturate at `i64::MAX` cents.
pub fn value_report(assets: &[Asset]) -> Vec<ValueRow> {
    let mut groups: BTreeMap<&str, ValueRow> = BTreeMap::new();
    for asset in assets {
        let category = asset.category.as_deref().unwrap_or(UNCATEGORIZED);
        let row = groups.entry(category).or_insert_with(|| ValueRow {
            category: category.to_string(),
            assets: 0,
            uncosted: 0,
            total_cost_cents: 0,
        });
        row.assets += 1;
        match asset.purchase_cost_cents {
            Some(cost) => row.total_cost_cents = row.total_cost_cents.saturating_add(cost),
            None => row.uncosted += 1,
        }
    }
    groups.into_values().collect()
}

/// Lifecycle rows, most overdue first
pub fn lifecycle_report(assets: &[Asset], today: NaiveDate) -> Vec<LifecycleRow> {
    let mut rows: Vec<LifecycleRow> = assets
        .iter()
        .map(|a| LifecycleRow {
            asset: a.summary(),
            purchase_date: a.purchase_date,
            age_years: a.purchase_date.map(|d| age_years(d, today)),
            lifecycle: lifecycle_status(a, today),
        })
        .collect();
    rows.sort_by_key(|row| {
        let rank = match row.lifecycle {
            LifecycleStatus::DueForReplacement { years_over } => -(years_over as i64) - 1,
            LifecycleStatus::InService { years_left } => years_left as i64,
            LifecycleStatus::Unknown => i64::MAX,
        };
        (rank, row.asset.id.clone())
    });
    rows
}

/// Review rows: never reviewed, then overdue (worst first), then current
pub fn review_report(assets: &[Asset], today: NaiveDate, interval_days: i64) -> Vec<ReviewRow> {
    let mut rows: Vec<ReviewRow> = assets
        .iter()
        .map(|a| ReviewRow {
            asset: a.summary(),
            last_reviewed: a.last_reviewed,
            review: review_status(a, today, interval_days),
        })
        .collect();
    rows.sort_by_key(|row| {
        let rank = match row.review {
            ReviewStatus::NeverReviewed => (0, 0),
            ReviewStatus::Overdue { days_overdue } => (1, -days_overdue),
            ReviewStatus::Current { next_due } => (2, days_until(next_due, today)),
        };
        (rank, row.asset.id.clone())
    });
    rows
}

impl Report {
    pub fn kind(&self) -> ReportKind {
        match self {
            Report::Warranty(_) => ReportKind::Warranty,
            Report::Condition(_) => ReportKind::Condition,
            Report::Value(_) => ReportKind::Value,
            Report::Lifecycle(_) => ReportKind::Lifecycle,
            Report::Review(_) => ReportKind::Review,
        }
    }

    /// Column names for tabular output
    pub fn headers(&self) -> Vec<&'static str> {
        match self {
            Report::Warranty(_) => vec!["asset", "name", "warranty_expires", "status", "days"],
            Report::Condition(_) => vec!["condition", "count"],
            Report::Value(_) => vec!["category", "assets", "uncosted", "total_cost"],
            Report::Lifecycle(_) => vec!["asset", "name", "purchased", "age_years", "status", "years"],
            Report::Review(_) => vec!["asset", "name", "last_reviewed", "status", "detail"],
        }
    }

    /// Rows rendered as strings, in `headers` order
    pub fn table(&self) -> Vec<Vec<String>> {
        match self {
            Report::Warranty(rows) => rows
                .iter()
                .map(|r| {
                    let (status, days) = match r.warranty {
                        WarrantyStatus::Unknown => ("unknown", String::new()),
                        WarrantyStatus::Expired { days_ago } => ("expired", (-days_ago).to_string()),
                        WarrantyStatus::ExpiringSoon { days_left } => {
                            ("expiring_soon", days_left.to_string())
                        }
                        WarrantyStatus::Active { days_left } => ("active", days_left.to_string()),
                    };
                    vec![
                        r.asset.id.to_string(),
                        r.asset.name.clone(),
                        fmt_date(r.warranty_expires),
                        status.to_string(),
                        days,
                    ]
                })
                .collect(),
            Report::Condition(rows) => rows
                .iter()
                .map(|r| vec![r.condition.to_string(), r.count.to_string()])
                .collect(),
            Report::Value(rows) => rows
                .iter()
                .map(|r| {
                    vec![
                        r.category.clone(),
                        r.assets.to_string(),
                        r.uncosted.to_string(),
                        format_cents(r.total_cost_cents),
                    ]
                })
                .collect(),
            Report::Lifecycle(rows) => rows
                .iter()
                .map(|r| {
                    let (status, years) = match r.lifecycle {
                        LifecycleStatus::Unknown => ("unknown", String::new()),
                        LifecycleStatus::InService { years_left } => {
                            ("in_service", years_left.to_string())
                        }
                        LifecycleStatus::DueForReplacement { years_over } => {
                            ("due_for_replacement", years_over.to_string())
                        }
                    };
                    vec![
                        r.asset.id.to_string(),
                        r.asset.name.clone(),
                        fmt_date(r.purchase_date),
                        r.age_years.map(|a| a.to_string()).unwrap_or_default(),
                        status.to_string(),
                        years,
                    ]
                })
                .collect(),
            Report::Review(rows) => rows
                .iter()
                .map(|r| {
                    let (status, detail) = match r.review {
                        ReviewStatus::NeverReviewed => ("never_reviewed", String::new()),
                        ReviewStatus::Current { next_due } => ("current", next_due.to_string()),
                        ReviewStatus::Overdue { days_overdue } => {
                            ("overdue", days_overdue.to_string())
                        }
                    };
                    vec![
                        r.asset.id.to_string(),
                        r.asset.name.clone(),
                        fmt_date(r.last_reviewed),
                        status.to_string(),
                        detail,
                    ]
                })
                .collect(),
        }
    }
}

/// Render minor units as a decimal amount, e.g. 123456 -> "1234.56"
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fleet() -> Vec<Asset> {
        let mut laptop = Asset::new("a1", "Laptop");
        laptop.category = Some("Computers".to_string());
        laptop.purchase_cost_cents = Some(150_000);
        laptop.purchase_date = Some(date(2020, 1, 1));
        laptop.lifecycle_years = Some(4);
        laptop.warranty_expires = Some(date(2026, 3, 10));
        laptop.last_reviewed = Some(date(2024, 1, 1));

        let mut desktop = Asset::new("a2", "Desktop");
        desktop.category = Some("Computers".to_string());
        desktop.purchase_cost_cents = Some(90_050);
        desktop.condition = Condition::Fair;
        desktop.purchase_date = Some(date(2024, 6, 1));
        desktop.lifecycle_years = Some(5);
        desktop.warranty_expires = Some(date(2025, 12, 1));
        desktop.last_reviewed = Some(date(2026, 1, 1));

        let mut printer = Asset::new("a3", "Printer");
        printer.condition = Condition::Broken;

        vec![laptop, desktop, printer]
    }

    #[test]
    fn test_report_kind_parse() {
        assert_eq!("warranty".parse::<ReportKind>().unwrap(), ReportKind::Warranty);
        assert_eq!("VALUE".parse::<ReportKind>().unwrap(), ReportKind::Value);
        assert_eq!(
            "depreciation".parse::<ReportKind>(),
            Err(ReportError::UnknownKind("depreciation".to_string()))
        );
    }

    #[test]
    fn test_warranty_report_order() {
        let rows = warranty_report(&fleet(), date(2026, 3, 1), 30);
        let ids: Vec<&str> = rows.iter().map(|r| r.asset.id.as_str()).collect();
        assert_eq!(ids, vec!["a2", "a1", "a3"]);
        assert_eq!(rows[0].warranty, WarrantyStatus::Expired { days_ago: 90 });
        assert_eq!(rows[1].warranty, WarrantyStatus::ExpiringSoon { days_left: 9 });
        assert_eq!(rows[2].warranty, WarrantyStatus::Unknown);
    }

    #[test]
    fn test_condition_report_counts() {
        let rows = condition_report(&fleet());
        assert_eq!(rows.len(), Condition::ALL.len());
        let count = |c: Condition| rows.iter().find(|r| r.condition == c).unwrap().count;
        assert_eq!(count(Condition::Good), 1);
        assert_eq!(count(Condition::Fair), 1);
        assert_eq!(count(Condition::Broken), 1);
        assert_eq!(count(Condition::Retired), 0);
    }

    #[test]
    fn test_value_report_groups() {
        let rows = value_report(&fleet());
        assert_eq!(
            rows,
            vec![
                ValueRow {
                    category: "Computers".to_string(),
                    assets: 2,
                    uncosted: 0,
                    total_cost_cents: 240_050,
                },
                ValueRow {
                    category: UNCATEGORIZED.to_string(),
                    assets: 1,
                    uncosted: 1,
                    total_cost_cents: 0,
                },
            ]
        );
    }

    #[test]
    fn test_value_report_saturates_totals() {
        let mut assets = Vec::new();
        for id in ["a1", "a2"] {
            let mut asset = Asset::new(id, "Rack");
            asset.purchase_cost_cents = Some(i64::MAX);
            asset.validate().unwrap();
            assets.push(asset);
        }

        let rows = value_report(&assets);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].assets, 2);
        assert_eq!(rows[0].total_cost_cents, i64::MAX);
    }

    #[test]
    fn test_lifecycle_report_order() {
        let rows = lifecycle_report(&fleet(), date(2026, 3, 1));
        let ids: Vec<&str> = rows.iter().map(|r| r.asset.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);
        assert_eq!(
            rows[0].lifecycle,
            LifecycleStatus::DueForReplacement { years_over: 2 }
        );
        assert_eq!(rows[0].age_years, Some(6));
        assert_eq!(rows[1].lifecycle, LifecycleStatus::InService { years_left: 4 });
    }

    #[test]
    fn test_review_report_order() {
        let rows = review_report(&fleet(), date(2026, 3, 1), 365);
        let ids: Vec<&str> = rows.iter().map(|r| r.asset.id.as_str()).collect();
        assert_eq!(ids, vec!["a3", "a1", "a2"]);
        assert!(matches!(rows[1].review, ReviewStatus::Overdue { .. }));
    }

    #[test]
    fn test_build_report_table_shape() {
        let options = ReportOptions::default();
        for kind in ReportKind::ALL {
            let report = build_report(kind, &fleet(), date(2026, 3, 1), &options);
            assert_eq!(report.kind(), kind);
            let width = report.headers().len();
            assert!(report.table().iter().all(|row| row.len() == width));
        }
    }

    #[test]
    fn test_report_serialization() {
        let report = build_report(
            ReportKind::Condition,
            &fleet(),
            date(2026, 3, 1),
            &ReportOptions::default(),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["report"], "condition");
        assert_eq!(json["rows"][0]["condition"], "new");
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(240_050), "2400.50");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(-150), "-1.50");
    }

    #[test]
    fn test_options_from_settings() {
        let settings = Settings {
            warranty_window_days: 90,
            ..Settings::default()
        };
        let options = ReportOptions::from(&settings);
        assert_eq!(options.warranty_window_days, 90);
        assert_eq!(options.review_interval_days, 365);
    }
}
