//! Quick-verify scan parsing
//!
//! Label printers encode either a link to the asset page, a small JSON
//! object, a serial number, or just the asset tag. Formats are tried in
//! that order.

use crate::{Result, StocktakeError};
use assetnet_core::Asset;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static ASSET_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/assets/([A-Za-z0-9._-]+)").expect("valid regex"));

static TAG_QUERY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[?&]asset_?tag=([^&#\s]+)").expect("valid regex"));

static TAG_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)"asset_?tag"\s*:\s*"([^"]+)""#).expect("valid regex"));

static SERIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:sn|serial)\s*[:=]\s*(\S+)$").expect("valid regex"));

static BARE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{2,64}$").expect("valid regex"));

/// What a scanned code refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ScanCode {
    AssetId(String),
    AssetTag(String),
    Serial(String),
}

/// Extract an asset reference from a barcode or QR payload
///
/// # Examples
///
/// ```
/// use assetnet_stocktake::{parse_scan, ScanCode};
///
/// assert_eq!(
///     parse_scan("https://inventory.local/assets/a1").unwrap(),
///     ScanCode::AssetId("a1".to_string())
/// );
/// assert_eq!(
///     parse_scan("SN: 5CG1234XYZ").unwrap(),
///     ScanCode::Serial("5CG1234XYZ".to_string())
/// );
/// ```
pub fn parse_scan(raw: &str) -> Result<ScanCode> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(StocktakeError::EmptyScan);
    }

    if let Some(caps) = ASSET_URL.captures(text) {
        return Ok(ScanCode::AssetId(caps[1].to_string()));
    }
    if let Some(caps) = TAG_QUERY.captures(text).or_else(|| TAG_JSON.captures(text)) {
        return Ok(ScanCode::AssetTag(caps[1].trim().to_string()));
    }
    if let Some(caps) = SERIAL.captures(text) {
        return Ok(ScanCode::Serial(caps[1].to_string()));
    }
    if BARE_TAG.is_match(text) {
        return Ok(ScanCode::AssetTag(text.to_string()));
    }

    Err(StocktakeError::UnrecognizedScan(text.to_string()))
}

/// Find the asset a scanned code refers to
///
/// Tags match the asset tag or, failing that, the asset id. Tag and serial
/// comparisons ignore ASCII case.
pub fn resolve_scan<'a>(code: &ScanCode, assets: &'a [Asset]) -> Option<&'a Asset> {
    match code {
        ScanCode::AssetId(id) => assets.iter().find(|a| a.id.as_str() == id),
        ScanCode::AssetTag(tag) => assets
            .iter()
            .find(|a| {
                a.asset_tag
                    .as_deref()
                    .is_some_and(|t| t.eq_ignore_ascii_case(tag))
            })
            .or_else(|| assets.iter().find(|a| a.id.as_str() == tag)),
        ScanCode::Serial(serial) => assets.iter().find(|a| {
            a.serial
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(serial))
        }),
    }
}
