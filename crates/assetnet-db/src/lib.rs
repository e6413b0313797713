//! Inventory storage for assetnet
//!
//! Every operation goes through the [`InventoryStore`] trait, which callers
//! receive explicitly (usually as `Arc<dyn InventoryStore>`). Two backends
//! are provided:
//!
//! - [`MemoryStore`]: lock-guarded maps, for tests and throwaway sessions
//! - [`ColdStorage`]: RocksDB with one column family per record kind
//!
//! Both backends apply the same rules: subnet CIDRs must parse, subnet names
//! and CIDRs are unique, and an IP address belongs to at most one asset.
//!
//! # Examples
//!
//! ```
//! use assetnet_core::{Asset, AssetIp, NewSubnet};
//! use assetnet_db::{load_subnet_view, InventoryStore, MemoryStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let subnet = store.create_subnet(NewSubnet {
//!     name: "office".to_string(),
//!     cidr: "10.0.0.0/30".to_string(),
//!     description: None,
//! })?;
//!
//! store.put_asset(Asset::new("a1", "Desk PC"))?;
//! store.link_ip(AssetIp {
//!     ip: "10.0.0.1".to_string(),
//!     label: Some("desk-3".to_string()),
//!     asset_id: "a1".into(),
//! })?;
//!
//! let view = load_subnet_view(&store, subnet.id)?;
//! assert_eq!(view.utilization.used, 1);
//! assert_eq!(view.utilization.free, 1);
//! # Ok(())
//! # }
//! ```

use assetnet_cidr::{format_ipv4, parse_ipv4, Cidr, CidrError, LinkedIp, SubnetView};
use assetnet_core::{Asset, AssetId, AssetIp, AssetnetError, NewSubnet, Subnet, SubnetPatch};
use thiserror::Error;
use uuid::Uuid;

mod cold;
mod memory;

pub use cold::ColdStorage;
pub use memory::MemoryStore;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness or ownership rule violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Record failed validation
    #[error("Invalid: {0}")]
    Invalid(String),

    /// Subnet CIDR or IP address rejected
    #[error(transparent)]
    Cidr(#[from] CidrError),
}

impl From<rocksdb::Error> for StorageError {
    fn from(err: rocksdb::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<AssetnetError> for StorageError {
    fn from(err: AssetnetError) -> Self {
        StorageError::Invalid(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage interface for inventory records
pub trait InventoryStore: Send + Sync {
    /// Create a subnet after validating its CIDR and uniqueness
    fn create_subnet(&self, input: NewSubnet) -> Result<Subnet>;

    /// Rename, re-address or re-describe a subnet; the id never changes
    fn update_subnet(&self, id: Uuid, patch: SubnetPatch) -> Result<Subnet>;

    fn delete_subnet(&self, id: Uuid) -> Result<()>;

    fn get_subnet(&self, id: Uuid) -> Result<Option<Subnet>>;

    /// All subnets ordered by name
    fn list_subnets(&self) -> Result<Vec<Subnet>>;

    /// Insert or replace an asset
    fn put_asset(&self, asset: Asset) -> Result<()>;

    fn get_asset(&self, id: &AssetId) -> Result<Option<Asset>>;

    /// All assets ordered by id
    fn list_assets(&self) -> Result<Vec<Asset>>;

    /// Remove an asset together with its IP links
    fn delete_asset(&self, id: &AssetId) -> Result<()>;

    /// Link an address to an asset
    ///
    /// Relinking an address to the same asset replaces the label; linking it
    /// to a different asset is a conflict.
    fn link_ip(&self, link: AssetIp) -> Result<AssetIp>;

    fn unlink_ip(&self, ip: &str) -> Result<()>;

    /// Links owned by an asset, ordered by address
    fn ips_for_asset(&self, id: &AssetId) -> Result<Vec<AssetIp>>;

    /// Links whose address is in `ips`, each with its asset summary
    fn associations_for(&self, ips: &[String]) -> Result<Vec<LinkedIp>>;

    fn find_subnet_by_name(&self, name: &str) -> Result<Option<Subnet>> {
        Ok(self.list_subnets()?.into_iter().find(|s| s.name == name))
    }
}

/// Build the address view of a stored subnet
///
/// Only links inside the subnet's host list are fetched from the store.
pub fn load_subnet_view(store: &dyn InventoryStore, id: Uuid) -> Result<SubnetView> {
    let subnet = store
        .get_subnet(id)?
        .ok_or_else(|| StorageError::NotFound(format!("subnet {}", id)))?;

    let hosts = Cidr::parse(&subnet.cidr)?.expand();
    let links = store.associations_for(&hosts)?;

    tracing::debug!(subnet = %subnet.name, hosts = hosts.len(), links = links.len(), "building subnet view");

    Ok(SubnetView::build(subnet, &links)?)
}

/// Validate a subnet against its siblings and store its cidr in canonical form
pub(crate) fn check_subnet<'a>(
    candidate: &mut Subnet,
    others: impl IntoIterator<Item = &'a Subnet>,
) -> Result<()> {
    if candidate.name.trim().is_empty() {
        return Err(StorageError::Invalid("subnet name is empty".to_string()));
    }
    let cidr = Cidr::parse(&candidate.cidr)?;
    candidate.cidr = cidr.to_string();

    for other in others {
        if other.id == candidate.id {
            continue;
        }
        if other.name == candidate.name {
            return Err(StorageError::Conflict(format!(
                "subnet name {} is taken",
                candidate.name
            )));
        }
        if Cidr::parse(&other.cidr).is_ok_and(|c| c == cidr) {
            return Err(StorageError::Conflict(format!(
                "subnet {} already uses {}",
                other.name, cidr
            )));
        }
    }

    Ok(())
}

/// Dotted-quad form used as the link key, e.g. `010.0.0.01` -> `10.0.0.1`
pub(crate) fn canonical_ip(ip: &str) -> Result<String> {
    Ok(format_ipv4(parse_ipv4(ip)?))
}

/// Validate a link and normalize its address and label
pub(crate) fn check_link(mut link: AssetIp) -> Result<AssetIp> {
    link.ip = canonical_ip(&link.ip)?;
    link.label = link
        .label
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());
    Ok(link)
}
