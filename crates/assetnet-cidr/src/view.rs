//! Subnet address views
//!
//! Joins the expanded host list of a subnet against the sparse set of
//! IP-to-asset links, producing one row per usable address. Views are
//! computed on every read and never stored.

use crate::{Cidr, Result};
use assetnet_core::{AssetSummary, Subnet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An IP link together with the asset it points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedIp {
    pub ip: String,
    pub label: Option<String>,
    pub asset: AssetSummary,
}

/// One usable address of a subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRow {
    pub ip: String,
    /// `None` when the address is free
    pub linked_asset: Option<AssetSummary>,
    pub label: Option<String>,
}

impl AddressRow {
    pub fn is_free(&self) -> bool {
        self.linked_asset.is_none()
    }
}

/// Annotate every host with its linked asset, in host order
///
/// Links whose address is not in `hosts` are ignored. If two links share an
/// address the later one wins.
///
/// # Examples
///
/// ```
/// use assetnet_cidr::{expand_cidr, join_addresses, LinkedIp};
/// use assetnet_core::{AssetId, AssetSummary};
///
/// let hosts = expand_cidr("10.0.0.0/30").unwrap();
/// let links = vec![LinkedIp {
///     ip: "10.0.0.1".to_string(),
///     label: Some("desk-3".to_string()),
///     asset: AssetSummary::new(AssetId::from("a1"), "Desk PC"),
/// }];
///
/// let rows = join_addresses(&hosts, &links);
/// assert_eq!(rows.len(), 2);
/// assert!(!rows[0].is_free());
/// assert!(rows[1].is_free());
/// ```
pub fn join_addresses(hosts: &[String], links: &[LinkedIp]) -> Vec<AddressRow> {
    let by_ip: HashMap<&str, &LinkedIp> = links.iter().map(|l| (l.ip.as_str(), l)).collect();

    hosts
        .iter()
        .map(|ip| match by_ip.get(ip.as_str()) {
            Some(link) => AddressRow {
                ip: ip.clone(),
                linked_asset: Some(link.asset.clone()),
                label: link.label.clone(),
            },
            None => AddressRow {
                ip: ip.clone(),
                linked_asset: None,
                label: None,
            },
        })
        .collect()
}

/// Address usage counters for a subnet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Utilization {
    pub total: u32,
    pub used: u32,
    pub free: u32,
    pub percent_used: f64,
}

impl Utilization {
    pub fn from_rows(rows: &[AddressRow]) -> Self {
        let total = rows.len() as u32;
        let used = rows.iter().filter(|r| !r.is_free()).count() as u32;
        let percent_used = if total == 0 {
            0.0
        } else {
            (used as f64 / total as f64) * 100.0
        };

        Self {
            total,
            used,
            free: total - used,
            percent_used,
        }
    }
}

/// Every usable address of a subnet with its link status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubnetView {
    pub subnet: Subnet,
    pub cidr: Cidr,
    pub utilization: Utilization,
    pub rows: Vec<AddressRow>,
}

impl SubnetView {
    /// Expand the subnet and join it against `links`
    ///
    /// Fails only if the stored cidr no longer parses.
    pub fn build(subnet: Subnet, links: &[LinkedIp]) -> Result<Self> {
        let cidr = Cidr::parse(&subnet.cidr)?;
        let rows = join_addresses(&cidr.expand(), links);
        let utilization = Utilization::from_rows(&rows);

        Ok(Self {
            subnet,
            cidr,
            utilization,
            rows,
        })
    }
}
