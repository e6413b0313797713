//! RocksDB inventory storage
//!
//! # Layout
//!
//! - **subnets**: subnet id (16 UUID bytes) → JSON `Subnet`
//! - **assets**: asset id (UTF-8) → JSON `Asset`
//! - **asset_ips**: dotted-quad address (UTF-8) → JSON `AssetIp`
//!
//! Values are LZ4-compressed. Writes that check before they write are
//! serialized through one mutex so uniqueness rules hold.

use crate::{canonical_ip, check_link, check_subnet, InventoryStore, Result, StorageError};
use assetnet_cidr::{parse_ipv4, LinkedIp};
use assetnet_core::{Asset, AssetId, AssetIp, NewSubnet, Subnet, SubnetPatch};
use rocksdb::{BlockBasedOptions, IteratorMode, Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;
use uuid::Uuid;

/// Column family names
const CF_SUBNETS: &str = "subnets";
const CF_ASSETS: &str = "assets";
const CF_ASSET_IPS: &str = "asset_ips";

/// Persistent inventory store backed by RocksDB
pub struct ColdStorage {
    db: Arc<DB>,
    write_lock: Mutex<()>,
}

impl ColdStorage {
    /// Open or create an inventory database
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use assetnet_db::ColdStorage;
    ///
    /// let storage = ColdStorage::open("./data/inventory")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        // Inventory tables are small; a modest block cache is plenty
        let mut block_opts = BlockBasedOptions::default();
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(32 * 1024 * 1024));
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open_cf(&opts, path.as_ref(), [CF_SUBNETS, CF_ASSETS, CF_ASSET_IPS])?;
        info!(path = %path.as_ref().display(), "inventory database opened");

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get column family handle
    fn get_cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::Database(format!("Column family {} not found", name)))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StorageError::Database("write lock poisoned".to_string()))
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.get_cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: serde::Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.get_cf(cf_name)?;
        self.db.put_cf(cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.get_cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }
}

impl InventoryStore for ColdStorage {
    fn create_subnet(&self, input: NewSubnet) -> Result<Subnet> {
        let _guard = self.lock()?;
        let mut subnet = Subnet::create(input);
        let existing: Vec<Subnet> = self.scan(CF_SUBNETS)?;
        check_subnet(&mut subnet, &existing)?;

        self.put_json(CF_SUBNETS, subnet.id.as_bytes(), &subnet)?;
        info!(id = %subnet.id, name = %subnet.name, cidr = %subnet.cidr, "subnet created");
        Ok(subnet)
    }

    fn update_subnet(&self, id: Uuid, patch: SubnetPatch) -> Result<Subnet> {
        let _guard = self.lock()?;
        let mut subnet: Subnet = self
            .get_json(CF_SUBNETS, id.as_bytes())?
            .ok_or_else(|| StorageError::NotFound(format!("subnet {}", id)))?;

        subnet.apply(patch);
        let existing: Vec<Subnet> = self.scan(CF_SUBNETS)?;
        check_subnet(&mut subnet, &existing)?;

        self.put_json(CF_SUBNETS, id.as_bytes(), &subnet)?;
        info!(id = %subnet.id, name = %subnet.name, cidr = %subnet.cidr, "subnet updated");
        Ok(subnet)
    }

    fn delete_subnet(&self, id: Uuid) -> Result<()> {
        let _guard = self.lock()?;
        let cf = self.get_cf(CF_SUBNETS)?;
        if self.db.get_cf(cf, id.as_bytes())?.is_none() {
            return Err(StorageError::NotFound(format!("subnet {}", id)));
        }
        self.db.delete_cf(cf, id.as_bytes())?;
        info!(id = %id, "subnet deleted");
        Ok(())
    }

    fn get_subnet(&self, id: Uuid) -> Result<Option<Subnet>> {
        self.get_json(CF_SUBNETS, id.as_bytes())
    }

    fn list_subnets(&self) -> Result<Vec<Subnet>> {
        let mut subnets: Vec<Subnet> = self.scan(CF_SUBNETS)?;
        subnets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(subnets)
    }

    fn put_asset(&self, asset: Asset) -> Result<()> {
        asset.validate()?;
        self.put_json(CF_ASSETS, asset.id.as_str().as_bytes(), &asset)?;
        info!(id = %asset.id, "asset stored");
        Ok(())
    }

    fn get_asset(&self, id: &AssetId) -> Result<Option<Asset>> {
        self.get_json(CF_ASSETS, id.as_str().as_bytes())
    }

    fn list_assets(&self) -> Result<Vec<Asset>> {
        // Keys are raw id bytes, so iteration order is id order
        self.scan(CF_ASSETS)
    }

    fn delete_asset(&self, id: &AssetId) -> Result<()> {
        let _guard = self.lock()?;
        let assets = self.get_cf(CF_ASSETS)?;
        if self.db.get_cf(assets, id.as_str().as_bytes())?.is_none() {
            return Err(StorageError::NotFound(format!("asset {}", id)));
        }

        let links = self.get_cf(CF_ASSET_IPS)?;
        let mut batch = WriteBatch::default();
        batch.delete_cf(assets, id.as_str().as_bytes());
        for link in self.scan::<AssetIp>(CF_ASSET_IPS)? {
            if &link.asset_id == id {
                batch.delete_cf(links, link.ip.as_bytes());
            }
        }
        self.db.write(batch)?;

        info!(id = %id, "asset deleted");
        Ok(())
    }

    fn link_ip(&self, link: AssetIp) -> Result<AssetIp> {
        let link = check_link(link)?;
        let _guard = self.lock()?;

        if self.get_asset(&link.asset_id)?.is_none() {
            return Err(StorageError::NotFound(format!("asset {}", link.asset_id)));
        }
        if let Some(existing) = self.get_json::<AssetIp>(CF_ASSET_IPS, link.ip.as_bytes())? {
            if existing.asset_id != link.asset_id {
                return Err(StorageError::Conflict(format!(
                    "{} is linked to asset {}",
                    link.ip, existing.asset_id
                )));
            }
        }

        self.put_json(CF_ASSET_IPS, link.ip.as_bytes(), &link)?;
        info!(ip = %link.ip, asset = %link.asset_id, "ip linked");
        Ok(link)
    }

    fn unlink_ip(&self, ip: &str) -> Result<()> {
        let ip = canonical_ip(ip)?;
        let _guard = self.lock()?;
        let cf = self.get_cf(CF_ASSET_IPS)?;
        if self.db.get_cf(cf, ip.as_bytes())?.is_none() {
            return Err(StorageError::NotFound(format!("ip link {}", ip)));
        }
        self.db.delete_cf(cf, ip.as_bytes())?;
        info!(ip = %ip, "ip unlinked");
        Ok(())
    }

    fn ips_for_asset(&self, id: &AssetId) -> Result<Vec<AssetIp>> {
        let mut owned: Vec<AssetIp> = self
            .scan::<AssetIp>(CF_ASSET_IPS)?
            .into_iter()
            .filter(|link| &link.asset_id == id)
            .collect();
        owned.sort_by_key(|link| parse_ipv4(&link.ip).unwrap_or_default());
        Ok(owned)
    }

    fn associations_for(&self, ips: &[String]) -> Result<Vec<LinkedIp>> {
        let mut found = Vec::new();
        for ip in ips {
            let Some(link) = self.get_json::<AssetIp>(CF_ASSET_IPS, ip.as_bytes())? else {
                continue;
            };
            if let Some(asset) = self.get_asset(&link.asset_id)? {
                found.push(LinkedIp {
                    ip: link.ip,
                    label: link.label,
                    asset: asset.summary(),
                });
            }
        }
        Ok(found)
    }
}
