//! In-memory inventory store

use crate::{canonical_ip, check_link, check_subnet, InventoryStore, Result, StorageError};
use assetnet_cidr::{parse_ipv4, LinkedIp};
use assetnet_core::{Asset, AssetId, AssetIp, NewSubnet, Subnet, SubnetPatch};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    subnets: HashMap<Uuid, Subnet>,
    assets: BTreeMap<AssetId, Asset>,
    links: HashMap<String, AssetIp>,
}

/// Inventory store kept entirely in memory
///
/// All tables sit behind one lock, so every check-then-write is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StorageError::Database("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StorageError::Database("store lock poisoned".to_string()))
    }
}

impl InventoryStore for MemoryStore {
    fn create_subnet(&self, input: NewSubnet) -> Result<Subnet> {
        let mut tables = self.write()?;
        let mut subnet = Subnet::create(input);
        check_subnet(&mut subnet, tables.subnets.values())?;

        info!(id = %subnet.id, name = %subnet.name, cidr = %subnet.cidr, "subnet created");
        tables.subnets.insert(subnet.id, subnet.clone());
        Ok(subnet)
    }

    fn update_subnet(&self, id: Uuid, patch: SubnetPatch) -> Result<Subnet> {
        let mut tables = self.write()?;
        let mut subnet = tables
            .subnets
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("subnet {}", id)))?;

        subnet.apply(patch);
        check_subnet(&mut subnet, tables.subnets.values())?;

        info!(id = %subnet.id, name = %subnet.name, cidr = %subnet.cidr, "subnet updated");
        tables.subnets.insert(id, subnet.clone());
        Ok(subnet)
    }

    fn delete_subnet(&self, id: Uuid) -> Result<()> {
        let mut tables = self.write()?;
        match tables.subnets.remove(&id) {
            Some(subnet) => {
                info!(id = %id, name = %subnet.name, "subnet deleted");
                Ok(())
            }
            None => Err(StorageError::NotFound(format!("subnet {}", id))),
        }
    }

    fn get_subnet(&self, id: Uuid) -> Result<Option<Subnet>> {
        Ok(self.read()?.subnets.get(&id).cloned())
    }

    fn list_subnets(&self) -> Result<Vec<Subnet>> {
        let mut subnets: Vec<Subnet> = self.read()?.subnets.values().cloned().collect();
        subnets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(subnets)
    }

    fn put_asset(&self, asset: Asset) -> Result<()> {
        asset.validate()?;
        let mut tables = self.write()?;
        info!(id = %asset.id, "asset stored");
        tables.assets.insert(asset.id.clone(), asset);
        Ok(())
    }

    fn get_asset(&self, id: &AssetId) -> Result<Option<Asset>> {
        Ok(self.read()?.assets.get(id).cloned())
    }

    fn list_assets(&self) -> Result<Vec<Asset>> {
        Ok(self.read()?.assets.values().cloned().collect())
    }

    fn delete_asset(&self, id: &AssetId) -> Result<()> {
        let mut tables = self.write()?;
        if tables.assets.remove(id).is_none() {
            return Err(StorageError::NotFound(format!("asset {}", id)));
        }
        tables.links.retain(|_, link| &link.asset_id != id);
        info!(id = %id, "asset deleted");
        Ok(())
    }

    fn link_ip(&self, link: AssetIp) -> Result<AssetIp> {
        let link = check_link(link)?;
        let mut tables = self.write()?;

        if !tables.assets.contains_key(&link.asset_id) {
            return Err(StorageError::NotFound(format!("asset {}", link.asset_id)));
        }
        if let Some(existing) = tables.links.get(&link.ip) {
            if existing.asset_id != link.asset_id {
                return Err(StorageError::Conflict(format!(
                    "{} is linked to asset {}",
                    link.ip, existing.asset_id
                )));
            }
        }

        info!(ip = %link.ip, asset = %link.asset_id, "ip linked");
        tables.links.insert(link.ip.clone(), link.clone());
        Ok(link)
    }

    fn unlink_ip(&self, ip: &str) -> Result<()> {
        let ip = canonical_ip(ip)?;
        let mut tables = self.write()?;
        match tables.links.remove(&ip) {
            Some(link) => {
                info!(ip = %ip, asset = %link.asset_id, "ip unlinked");
                Ok(())
            }
            None => Err(StorageError::NotFound(format!("ip link {}", ip))),
        }
    }

    fn ips_for_asset(&self, id: &AssetId) -> Result<Vec<AssetIp>> {
        let mut owned: Vec<AssetIp> = self
            .read()?
            .links
            .values()
            .filter(|link| &link.asset_id == id)
            .cloned()
            .collect();
        owned.sort_by_key(|link| parse_ipv4(&link.ip).unwrap_or_default());
        Ok(owned)
    }

    fn associations_for(&self, ips: &[String]) -> Result<Vec<LinkedIp>> {
        let tables = self.read()?;
        let found = ips
            .iter()
            .filter_map(|ip| tables.links.get(ip))
            .filter_map(|link| {
                tables.assets.get(&link.asset_id).map(|asset| LinkedIp {
                    ip: link.ip.clone(),
                    label: link.label.clone(),
                    asset: asset.summary(),
                })
            })
            .collect();
        Ok(found)
    }
}
