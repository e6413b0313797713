//! Derived per-asset statuses
//!
//! Everything here is date arithmetic against an explicit `today`, so the
//! results are reproducible in tests.

use assetnet_core::Asset;
use chrono::{Datelike, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

/// Warranty state of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WarrantyStatus {
    /// No warranty end date recorded
    Unknown,
    Expired { days_ago: i64 },
    /// Ends within the reporting window (including today)
    ExpiringSoon { days_left: i64 },
    Active { days_left: i64 },
}

/// Replacement planning state of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LifecycleStatus {
    /// Purchase date or service life missing
    Unknown,
    InService { years_left: u32 },
    DueForReplacement { years_over: u32 },
}

/// Periodic review state of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReviewStatus {
    NeverReviewed,
    Current { next_due: NaiveDate },
    Overdue { days_overdue: i64 },
}

/// Signed whole days from `today` to `date`
pub fn days_until(date: NaiveDate, today: NaiveDate) -> i64 {
    (date - today).num_days()
}

/// Whole years elapsed since `since`; zero for future dates
pub fn age_years(since: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - since.year();
    if (today.month(), today.day()) < (since.month(), since.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

pub fn warranty_status(asset: &Asset, today: NaiveDate, window_days: i64) -> WarrantyStatus {
    let Some(expires) = asset.warranty_expires else {
        return WarrantyStatus::Unknown;
    };

    let days_left = days_until(expires, today);
    if days_left < 0 {
        WarrantyStatus::Expired {
            days_ago: -days_left,
        }
    } else if days_left <= window_days {
        WarrantyStatus::ExpiringSoon { days_left }
    } else {
        WarrantyStatus::Active { days_left }
    }
}

pub fn lifecycle_status(asset: &Asset, today: NaiveDate) -> LifecycleStatus {
    let (Some(purchased), Some(life)) = (asset.purchase_date, asset.lifecycle_years) else {
        return LifecycleStatus::Unknown;
    };

    let age = age_years(purchased, today);
    if age >= life {
        LifecycleStatus::DueForReplacement {
            years_over: age - life,
        }
    } else {
        LifecycleStatus::InService {
            years_left: life - age,
        }
    }
}

/// Review state as of `today`
///
/// A due date past the end of the calendar saturates at `NaiveDate::MAX`,
/// so such an asset is never overdue.
pub fn review_status(asset: &Asset, today: NaiveDate, interval_days: i64) -> ReviewStatus {
    let Some(last) = asset.last_reviewed else {
        return ReviewStatus::NeverReviewed;
    };

    let next_due = TimeDelta::try_days(interval_days)
        .and_then(|interval| last.checked_add_signed(interval))
        .unwrap_or(NaiveDate::MAX);
    if today > next_due {
        ReviewStatus::Overdue {
            days_overdue: (today - next_due).num_days(),
        }
    } else {
        ReviewStatus::Current { next_due }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_until() {
        assert_eq!(days_until(date(2026, 1, 31), date(2026, 1, 1)), 30);
        assert_eq!(days_until(date(2025, 12, 31), date(2026, 1, 1)), -1);
    }

    #[test]
    fn test_age_years() {
        let today = date(2026, 6, 15);
        assert_eq!(age_years(date(2020, 6, 15), today), 6);
        assert_eq!(age_years(date(2020, 6, 16), today), 5);
        assert_eq!(age_years(date(2026, 1, 1), today), 0);
        assert_eq!(age_years(date(2027, 1, 1), today), 0);
    }

    #[test]
    fn test_warranty_status() {
        let today = date(2026, 3, 1);
        let mut asset = Asset::new("a1", "Laptop");
        assert_eq!(warranty_status(&asset, today, 30), WarrantyStatus::Unknown);

        asset.warranty_expires = Some(date(2026, 2, 20));
        assert_eq!(
            warranty_status(&asset, today, 30),
            WarrantyStatus::Expired { days_ago: 9 }
        );

        asset.warranty_expires = Some(today);
        assert_eq!(
            warranty_status(&asset, today, 30),
            WarrantyStatus::ExpiringSoon { days_left: 0 }
        );

        asset.warranty_expires = Some(date(2026, 3, 31));
        assert_eq!(
            warranty_status(&asset, today, 30),
            WarrantyStatus::ExpiringSoon { days_left: 30 }
        );

        asset.warranty_expires = Some(date(2026, 4, 1));
        assert_eq!(
            warranty_status(&asset, today, 30),
            WarrantyStatus::Active { days_left: 31 }
        );
    }

    #[test]
    fn test_lifecycle_status() {
        let today = date(2026, 3, 1);
        let mut asset = Asset::new("a1", "Laptop");
        assert_eq!(lifecycle_status(&asset, today), LifecycleStatus::Unknown);

        asset.purchase_date = Some(date(2022, 1, 10));
        asset.lifecycle_years = Some(5);
        assert_eq!(
            lifecycle_status(&asset, today),
            LifecycleStatus::InService { years_left: 1 }
        );

        asset.lifecycle_years = Some(3);
        assert_eq!(
            lifecycle_status(&asset, today),
            LifecycleStatus::DueForReplacement { years_over: 1 }
        );
    }

    #[test]
    fn test_review_status() {
        let today = date(2026, 3, 1);
        let mut asset = Asset::new("a1", "Laptop");
        assert_eq!(review_status(&asset, today, 365), ReviewStatus::NeverReviewed);

        asset.last_reviewed = Some(date(2025, 6, 1));
        assert_eq!(
            review_status(&asset, today, 365),
            ReviewStatus::Current {
                next_due: date(2026, 6, 1)
            }
        );

        asset.last_reviewed = Some(date(2025, 1, 1));
        assert_eq!(
            review_status(&asset, today, 365),
            ReviewStatus::Overdue { days_overdue: 59 }
        );
    }

    #[test]
    fn test_review_status_saturates_far_due_dates() {
        let today = date(2026, 1, 1);
        let mut asset = Asset::new("a1", "Laptop");

        asset.last_reviewed = Some(NaiveDate::MAX);
        assert_eq!(
            review_status(&asset, today, 365),
            ReviewStatus::Current {
                next_due: NaiveDate::MAX
            }
        );

        asset.last_reviewed = Some(date(2025, 1, 1));
        assert_eq!(
            review_status(&asset, today, 200_000_000_000_000),
            ReviewStatus::Current {
                next_due: NaiveDate::MAX
            }
        );
        assert_eq!(
            review_status(&asset, today, i64::MAX),
            ReviewStatus::Current {
                next_due: NaiveDate::MAX
            }
        );
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&WarrantyStatus::ExpiringSoon { days_left: 3 }).unwrap();
        assert_eq!(json, r#"{"status":"expiring_soon","days_left":3}"#);
    }
}
