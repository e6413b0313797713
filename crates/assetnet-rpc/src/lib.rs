//! JSON-RPC 2.0 service for assetnet
//!
//! Exposes subnet bookkeeping, asset IP links, stocktakes and reports as
//! JSON-RPC methods. Requests arrive one per line on the stdio transport.
//!
//! # Error mapping
//!
//! | failure                          | code     | `data.kind`  |
//! |----------------------------------|----------|--------------|
//! | malformed JSON                   | `-32700` | -            |
//! | not a JSON-RPC 2.0 request       | `-32600` | -            |
//! | unknown method                   | `-32601` | -            |
//! | bad params, invalid CIDR or scan | `-32602` | `validation` |
//! | record not found                 | `-32004` | `not_found`  |
//! | uniqueness/ownership conflict    | `-32009` | `conflict`   |
//! | storage failure                  | `-32603` | -            |
//!
//! A failed call never carries a partial result.
//!
//! # Examples
//!
//! ```
//! use assetnet_db::MemoryStore;
//! use assetnet_report::ReportOptions;
//! use assetnet_rpc::RpcServer;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = RpcServer::new(Arc::new(MemoryStore::new()), ReportOptions::default());
//!
//! let request = r#"{
//!     "jsonrpc": "2.0",
//!     "method": "cidr.expand",
//!     "params": {"cidr": "10.0.0.0/30"},
//!     "id": 1
//! }"#;
//!
//! let response = server.handle_request(request).await?;
//! assert!(response.contains("10.0.0.2"));
//! # Ok(())
//! # }
//! ```

use assetnet_cidr::{Cidr, CidrError};
use assetnet_core::{Asset, AssetId, AssetIp, NewSubnet, Subnet, SubnetPatch};
use assetnet_db::{load_subnet_view, InventoryStore, StorageError};
use assetnet_report::{build_report, ReportError, ReportKind, ReportOptions};
use assetnet_stocktake::{parse_scan, resolve_scan, Stocktake, StocktakeError};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

pub mod transport;

pub use transport::StdioTransport;

/// Service errors
#[derive(Error, Debug)]
pub enum RpcError {
    /// JSON-RPC parse error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Method not found
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Params or input data rejected
    #[error("{0}")]
    Validation(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness or ownership rule violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<StorageError> for RpcError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Cidr(e) => RpcError::Validation(e.to_string()),
            StorageError::Invalid(msg) => RpcError::Validation(msg),
            StorageError::NotFound(msg) => RpcError::NotFound(msg),
            StorageError::Conflict(msg) => RpcError::Conflict(msg),
            StorageError::Database(_) | StorageError::Serialization(_) => {
                RpcError::InternalError(err.to_string())
            }
        }
    }
}

impl From<CidrError> for RpcError {
    fn from(err: CidrError) -> Self {
        RpcError::Validation(err.to_string())
    }
}

impl From<StocktakeError> for RpcError {
    fn from(err: StocktakeError) -> Self {
        match err {
            StocktakeError::Closed(_) => RpcError::Conflict(err.to_string()),
            StocktakeError::EmptyScan | StocktakeError::UnrecognizedScan(_) => {
                RpcError::Validation(err.to_string())
            }
        }
    }
}

impl From<ReportError> for RpcError {
    fn from(err: ReportError) -> Self {
        RpcError::MethodNotFound(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

/// JSON-RPC 2.0 error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const NOT_FOUND: i32 = -32004;
    pub const CONFLICT: i32 = -32009;

    fn new(code: i32, message: String, kind: Option<&str>) -> Self {
        Self {
            code,
            message,
            data: kind.map(|k| serde_json::json!({ "kind": k })),
        }
    }
}

impl From<RpcError> for JsonRpcError {
    fn from(err: RpcError) -> Self {
        let message = err.to_string();
        match err {
            RpcError::ParseError(_) => JsonRpcError::new(Self::PARSE_ERROR, message, None),
            RpcError::InvalidRequest(_) => JsonRpcError::new(Self::INVALID_REQUEST, message, None),
            RpcError::MethodNotFound(_) => JsonRpcError::new(Self::METHOD_NOT_FOUND, message, None),
            RpcError::Validation(_) => {
                JsonRpcError::new(Self::INVALID_PARAMS, message, Some("validation"))
            }
            RpcError::NotFound(_) => JsonRpcError::new(Self::NOT_FOUND, message, Some("not_found")),
            RpcError::Conflict(_) => JsonRpcError::new(Self::CONFLICT, message, Some("conflict")),
            RpcError::InternalError(_) => JsonRpcError::new(Self::INTERNAL_ERROR, message, None),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CidrParams {
    cidr: String,
}

/// A subnet named either by id or by name
#[derive(Debug, Deserialize)]
struct SubnetRef {
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubnetUpdateParams {
    id: Uuid,
    #[serde(flatten)]
    patch: SubnetPatch,
}

#[derive(Debug, Deserialize)]
struct AssetRef {
    id: AssetId,
}

#[derive(Debug, Deserialize)]
struct AssetIpsParams {
    asset_id: AssetId,
}

#[derive(Debug, Deserialize)]
struct UnlinkParams {
    ip: String,
}

#[derive(Debug, Deserialize)]
struct StocktakeStartParams {
    name: String,
    #[serde(default)]
    location: Option<String>,
    /// Explicit expected set; defaults to every in-service asset at `location`
    #[serde(default)]
    asset_ids: Option<Vec<AssetId>>,
}

#[derive(Debug, Deserialize)]
struct StocktakeRef {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct StocktakeScanParams {
    id: Uuid,
    code: String,
}

#[derive(Debug, Default, Deserialize)]
struct ReportParams {
    #[serde(default)]
    today: Option<NaiveDate>,
}

/// Closed stocktakes kept for `stocktake.summary`; older ones are dropped
pub const MAX_CLOSED_STOCKTAKES: usize = 64;

/// JSON-RPC server over an inventory store
///
/// Open stocktakes live until closed. Closed ones stay readable until more
/// than [`MAX_CLOSED_STOCKTAKES`] have accumulated, oldest close first out.
pub struct RpcServer {
    store: Arc<dyn InventoryStore>,
    options: ReportOptions,
    stocktakes: RwLock<HashMap<Uuid, Stocktake>>,
}

impl RpcServer {
    /// Create a new server
    ///
    /// # Arguments
    ///
    /// * `store` - Inventory store every method reads and writes
    /// * `options` - Thresholds for the date-based reports
    pub fn new(store: Arc<dyn InventoryStore>, options: ReportOptions) -> Self {
        Self {
            store,
            options,
            stocktakes: RwLock::new(HashMap::new()),
        }
    }

    /// Handle a JSON-RPC 2.0 request
    ///
    /// Every failure is reported inside the returned response; `Err` only
    /// signals that the response itself could not be serialized.
    pub async fn handle_request(&self, request_str: &str) -> Result<String> {
        let response = match serde_json::from_str::<JsonRpcRequest>(request_str) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                let err = if serde_json::from_str::<Value>(request_str).is_ok() {
                    RpcError::InvalidRequest(e.to_string())
                } else {
                    RpcError::ParseError(e.to_string())
                };
                JsonRpcResponse::failure(Value::Null, err.into())
            }
        };

        serde_json::to_string(&response).map_err(|e| RpcError::InternalError(e.to_string()))
    }

    async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        if request.jsonrpc != "2.0" {
            return JsonRpcResponse::failure(
                request.id,
                RpcError::InvalidRequest("Invalid JSON-RPC version".to_string()).into(),
            );
        }

        debug!(method = %request.method, "dispatching request");
        let params = &request.params;

        let result = match request.method.as_str() {
            "ping" => Ok(serde_json::json!({"status": "ok"})),
            "cidr.analyze" => self.handle_cidr_analyze(params),
            "cidr.expand" => self.handle_cidr_expand(params),
            "subnet.create" => self.handle_subnet_create(params),
            "subnet.update" => self.handle_subnet_update(params),
            "subnet.delete" => self.handle_subnet_delete(params),
            "subnet.get" => self.handle_subnet_get(params),
            "subnet.list" => self.handle_subnet_list(),
            "subnet.addresses" => self.handle_subnet_addresses(params),
            "subnet.utilization" => self.handle_subnet_utilization(params),
            "asset.put" => self.handle_asset_put(params),
            "asset.get" => self.handle_asset_get(params),
            "asset.list" => self.handle_asset_list(),
            "asset.delete" => self.handle_asset_delete(params),
            "asset_ip.link" => self.handle_ip_link(params),
            "asset_ip.unlink" => self.handle_ip_unlink(params),
            "asset_ip.list" => self.handle_ip_list(params),
            "stocktake.start" => self.handle_stocktake_start(params).await,
            "stocktake.scan" => self.handle_stocktake_scan(params).await,
            "stocktake.summary" => self.handle_stocktake_summary(params).await,
            "stocktake.close" => self.handle_stocktake_close(params).await,
            method => match method.strip_prefix("report.") {
                Some(kind) => self.handle_report(kind, params),
                None => Err(RpcError::MethodNotFound(method.to_string())),
            },
        };

        match result {
            Ok(data) => JsonRpcResponse::success(request.id, data),
            Err(e) => {
                warn!(method = %request.method, error = %e, "request failed");
                JsonRpcResponse::failure(request.id, e.into())
            }
        }
    }

    fn handle_cidr_analyze(&self, params: &Value) -> Result<Value> {
        let params: CidrParams = parse_params(params)?;
        let cidr = Cidr::parse(&params.cidr)?;
        to_value(&cidr.analyze())
    }

    fn handle_cidr_expand(&self, params: &Value) -> Result<Value> {
        let params: CidrParams = parse_params(params)?;
        to_value(&Cidr::parse(&params.cidr)?.expand())
    }

    fn handle_subnet_create(&self, params: &Value) -> Result<Value> {
        let input: NewSubnet = parse_params(params)?;
        to_value(&self.store.create_subnet(input)?)
    }

    fn handle_subnet_update(&self, params: &Value) -> Result<Value> {
        let params: SubnetUpdateParams = parse_params(params)?;
        to_value(&self.store.update_subnet(params.id, params.patch)?)
    }

    fn handle_subnet_delete(&self, params: &Value) -> Result<Value> {
        let subnet = self.resolve_subnet(parse_params(params)?)?;
        self.store.delete_subnet(subnet.id)?;
        Ok(serde_json::json!({"deleted": subnet.id}))
    }

    fn handle_subnet_get(&self, params: &Value) -> Result<Value> {
        to_value(&self.resolve_subnet(parse_params(params)?)?)
    }

    fn handle_subnet_list(&self) -> Result<Value> {
        to_value(&self.store.list_subnets()?)
    }

    fn handle_subnet_addresses(&self, params: &Value) -> Result<Value> {
        let subnet = self.resolve_subnet(parse_params(params)?)?;
        to_value(&load_subnet_view(self.store.as_ref(), subnet.id)?)
    }

    fn handle_subnet_utilization(&self, params: &Value) -> Result<Value> {
        let subnet = self.resolve_subnet(parse_params(params)?)?;
        let view = load_subnet_view(self.store.as_ref(), subnet.id)?;
        Ok(serde_json::json!({
            "subnet": view.subnet.name,
            "cidr": view.cidr,
            "utilization": view.utilization,
        }))
    }

    fn handle_asset_put(&self, params: &Value) -> Result<Value> {
        let asset: Asset = parse_params(params)?;
        self.store.put_asset(asset.clone())?;
        to_value(&asset)
    }

    fn handle_asset_get(&self, params: &Value) -> Result<Value> {
        let params: AssetRef = parse_params(params)?;
        let asset = self
            .store
            .get_asset(&params.id)?
            .ok_or_else(|| RpcError::NotFound(format!("asset {}", params.id)))?;
        let ips = self.store.ips_for_asset(&asset.id)?;
        Ok(serde_json::json!({"asset": asset, "ips": ips}))
    }

    fn handle_asset_list(&self) -> Result<Value> {
        to_value(&self.store.list_assets()?)
    }

    fn handle_asset_delete(&self, params: &Value) -> Result<Value> {
        let params: AssetRef = parse_params(params)?;
        self.store.delete_asset(&params.id)?;
        Ok(serde_json::json!({"deleted": params.id}))
    }

    fn handle_ip_link(&self, params: &Value) -> Result<Value> {
        let link: AssetIp = parse_params(params)?;
        to_value(&self.store.link_ip(link)?)
    }

    fn handle_ip_unlink(&self, params: &Value) -> Result<Value> {
        let params: UnlinkParams = parse_params(params)?;
        self.store.unlink_ip(&params.ip)?;
        Ok(serde_json::json!({"unlinked": params.ip}))
    }

    fn handle_ip_list(&self, params: &Value) -> Result<Value> {
        let params: AssetIpsParams = parse_params(params)?;
        to_value(&self.store.ips_for_asset(&params.asset_id)?)
    }

    async fn handle_stocktake_start(&self, params: &Value) -> Result<Value> {
        let params: StocktakeStartParams = parse_params(params)?;
        let stocktake = match params.asset_ids {
            Some(ids) => Stocktake::start(params.name, params.location, ids),
            None => {
                let assets = self.store.list_assets()?;
                Stocktake::for_location(params.name, params.location, &assets)
            }
        };

        let response = serde_json::json!({
            "id": stocktake.id,
            "name": stocktake.name,
            "summary": stocktake.summary(),
        });
        self.stocktakes.write().await.insert(stocktake.id, stocktake);
        Ok(response)
    }

    async fn handle_stocktake_scan(&self, params: &Value) -> Result<Value> {
        let params: StocktakeScanParams = parse_params(params)?;
        let code = parse_scan(&params.code)?;

        let assets = self.store.list_assets()?;
        let asset = resolve_scan(&code, &assets)
            .ok_or_else(|| RpcError::NotFound(format!("no asset matches {:?}", params.code)))?;

        let mut stocktakes = self.stocktakes.write().await;
        let stocktake = stocktakes
            .get_mut(&params.id)
            .ok_or_else(|| RpcError::NotFound(format!("stocktake {}", params.id)))?;
        let outcome = stocktake.verify(&asset.id, Utc::now())?;

        Ok(serde_json::json!({
            "code": code,
            "asset": asset.summary(),
            "outcome": outcome,
            "summary": stocktake.summary(),
        }))
    }

    async fn handle_stocktake_summary(&self, params: &Value) -> Result<Value> {
        let params: StocktakeRef = parse_params(params)?;
        let stocktakes = self.stocktakes.read().await;
        let stocktake = stocktakes
            .get(&params.id)
            .ok_or_else(|| RpcError::NotFound(format!("stocktake {}", params.id)))?;

        Ok(serde_json::json!({
            "stocktake": stocktake,
            "summary": stocktake.summary(),
            "missing": stocktake.missing(),
        }))
    }

    async fn handle_stocktake_close(&self, params: &Value) -> Result<Value> {
        let params: StocktakeRef = parse_params(params)?;
        let mut stocktakes = self.stocktakes.write().await;
        let stocktake = stocktakes
            .get_mut(&params.id)
            .ok_or_else(|| RpcError::NotFound(format!("stocktake {}", params.id)))?;
        stocktake.close(Utc::now());

        let response = serde_json::json!({
            "id": stocktake.id,
            "closed_at": stocktake.closed_at,
            "summary": stocktake.summary(),
            "missing": stocktake.missing(),
        });
        prune_closed(&mut stocktakes);
        Ok(response)
    }

    fn handle_report(&self, kind: &str, params: &Value) -> Result<Value> {
        let kind: ReportKind = kind.parse()?;
        let params: ReportParams = if params.is_null() {
            ReportParams::default()
        } else {
            parse_params(params)?
        };
        let today = params.today.unwrap_or_else(|| Utc::now().date_naive());

        let assets = self.store.list_assets()?;
        to_value(&build_report(kind, &assets, today, &self.options))
    }

    fn resolve_subnet(&self, subnet: SubnetRef) -> Result<Subnet> {
        let found = match (subnet.id, subnet.name) {
            (Some(id), _) => self.store.get_subnet(id)?,
            (None, Some(name)) => self.store.find_subnet_by_name(&name)?,
            (None, None) => {
                return Err(RpcError::Validation(
                    "Invalid params: expected subnet id or name".to_string(),
                ))
            }
        };
        found.ok_or_else(|| RpcError::NotFound("subnet".to_string()))
    }
}

fn prune_closed(stocktakes: &mut HashMap<Uuid, Stocktake>) {
    let mut closed: Vec<_> = stocktakes
        .values()
        .filter_map(|s| s.closed_at.map(|at| (at, s.id)))
        .collect();
    if closed.len() <= MAX_CLOSED_STOCKTAKES {
        return;
    }

    closed.sort();
    let excess = closed.len() - MAX_CLOSED_STOCKTAKES;
    for (_, id) in closed.into_iter().take(excess) {
        stocktakes.remove(&id);
        debug!(stocktake = %id, "dropped closed stocktake");
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: &Value) -> Result<T> {
    serde_json::from_value(params.clone())
        .map_err(|e| RpcError::Validation(format!("Invalid params: {}", e)))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| RpcError::InternalError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetnet_db::MemoryStore;
    use serde_json::json;

    fn server() -> RpcServer {
        RpcServer::new(Arc::new(MemoryStore::new()), ReportOptions::default())
    }

    async fn call(server: &RpcServer, method: &str, params: Value) -> Value {
        let request = json!({"jsonrpc": "2.0", "method": method, "params": params, "id": 1});
        let response = server.handle_request(&request.to_string()).await.unwrap();
        serde_json::from_str(&response).unwrap()
    }

    #[tokio::test]
    async fn test_ping_method() {
        let response = call(&server(), "ping", json!({})).await;
        assert_eq!(response["result"]["status"], "ok");
        assert_eq!(response["id"], 1);
    }

    #[tokio::test]
    async fn test_method_not_found() {
        let response = call(&server(), "unknown_method", json!({})).await;
        assert_eq!(response["error"]["code"], -32601);

        let response = call(&server(), "report.depreciation", json!({})).await;
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_invalid_jsonrpc_version() {
        let server = server();
        let request = r#"{"jsonrpc": "1.0", "method": "ping", "params": {}, "id": 1}"#;
        let response = server.handle_request(request).await.unwrap();
        assert!(response.contains("-32600"));
    }

    #[tokio::test]
    async fn test_parse_error() {
        let server = server();
        let response = server.handle_request("{not json").await.unwrap();
        assert!(response.contains("-32700"));

        let response = server.handle_request(r#"{"id": 3}"#).await.unwrap();
        assert!(response.contains("-32600"));
    }

    #[tokio::test]
    async fn test_cidr_analyze() {
        let response = call(&server(), "cidr.analyze", json!({"cidr": "192.168.1.0/24"})).await;
        let result = &response["result"];
        assert_eq!(result["network"], "192.168.1.0");
        assert_eq!(result["broadcast"], "192.168.1.255");
        assert_eq!(result["mask"], "255.255.255.0");
        assert_eq!(result["usable_hosts"], 254);
        assert_eq!(result["first_usable"], "192.168.1.1");
        assert_eq!(result["last_usable"], "192.168.1.254");
    }

    #[tokio::test]
    async fn test_cidr_analyze_point_address() {
        let response = call(&server(), "cidr.analyze", json!({"cidr": "10.0.0.5/32"})).await;
        assert_eq!(response["result"]["usable_hosts"], 1);
        assert_eq!(response["result"]["first_usable"], "10.0.0.5");
        assert_eq!(response["result"]["last_usable"], "10.0.0.5");
    }

    #[tokio::test]
    async fn test_invalid_cidr_is_uniform_validation_error() {
        let server = server();
        for cidr in ["192.168.1.5/24", "10.0.0.0/8", "10.0.0.0/33", "999.1.1.0/24", "not-a-cidr"] {
            let response = call(&server, "cidr.expand", json!({ "cidr": cidr })).await;
            assert!(response.get("result").is_none());
            assert_eq!(response["error"]["code"], -32602);
            assert_eq!(response["error"]["data"]["kind"], "validation");
            let message = response["error"]["message"].as_str().unwrap();
            assert!(message.starts_with("invalid CIDR"), "{}", message);
        }
    }

    #[tokio::test]
    async fn test_subnet_addresses_flow() {
        let server = server();

        let created = call(
            &server,
            "subnet.create",
            json!({"name": "tiny", "cidr": "10.0.0.0/30"}),
        )
        .await;
        let id = created["result"]["id"].clone();

        call(&server, "asset.put", json!({"id": "a1", "name": "Desk PC"})).await;
        let linked = call(
            &server,
            "asset_ip.link",
            json!({"ip": "10.0.0.1", "label": "desk-3", "asset_id": "a1"}),
        )
        .await;
        assert!(linked.get("error").is_none());

        let view = call(&server, "subnet.addresses", json!({ "id": id })).await;
        assert_eq!(
            view["result"]["rows"],
            json!([
                {"ip": "10.0.0.1", "linked_asset": {"id": "a1", "name": "Desk PC"}, "label": "desk-3"},
                {"ip": "10.0.0.2", "linked_asset": null, "label": null}
            ])
        );

        let by_name = call(&server, "subnet.utilization", json!({"name": "tiny"})).await;
        assert_eq!(by_name["result"]["utilization"]["used"], 1);
        assert_eq!(by_name["result"]["utilization"]["free"], 1);
    }

    #[tokio::test]
    async fn test_subnet_create_rejections() {
        let server = server();
        call(&server, "subnet.create", json!({"name": "a", "cidr": "10.0.0.0/24"})).await;

        let dup = call(&server, "subnet.create", json!({"name": "a", "cidr": "10.0.1.0/24"})).await;
        assert_eq!(dup["error"]["code"], -32009);

        let bad = call(&server, "subnet.create", json!({"name": "b", "cidr": "10.0.1.7/24"})).await;
        assert_eq!(bad["error"]["code"], -32602);

        let missing = call(&server, "subnet.create", json!({"name": "c"})).await;
        assert_eq!(missing["error"]["code"], -32602);

        let list = call(&server, "subnet.list", Value::Null).await;
        assert_eq!(list["result"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subnet_update_and_delete() {
        let server = server();
        let created = call(&server, "subnet.create", json!({"name": "a", "cidr": "10.0.0.0/24"})).await;
        let id = created["result"]["id"].clone();

        let updated = call(
            &server,
            "subnet.update",
            json!({"id": id, "cidr": "10.0.4.0/22"}),
        )
        .await;
        assert_eq!(updated["result"]["cidr"], "10.0.4.0/22");
        assert_eq!(updated["result"]["id"], id);

        let deleted = call(&server, "subnet.delete", json!({ "id": id })).await;
        assert_eq!(deleted["result"]["deleted"], id);

        let gone = call(&server, "subnet.get", json!({ "id": id })).await;
        assert_eq!(gone["error"]["code"], -32004);
        assert_eq!(gone["error"]["data"]["kind"], "not_found");
    }

    #[tokio::test]
    async fn test_asset_ip_conflict() {
        let server = server();
        call(&server, "asset.put", json!({"id": "a1", "name": "Desk PC"})).await;
        call(&server, "asset.put", json!({"id": "a2", "name": "Printer"})).await;
        call(&server, "asset_ip.link", json!({"ip": "10.0.0.1", "asset_id": "a1"})).await;

        let conflict = call(&server, "asset_ip.link", json!({"ip": "10.0.0.1", "asset_id": "a2"})).await;
        assert_eq!(conflict["error"]["code"], -32009);

        let asset = call(&server, "asset.get", json!({"id": "a1"})).await;
        assert_eq!(asset["result"]["ips"][0]["ip"], "10.0.0.1");

        call(&server, "asset_ip.unlink", json!({"ip": "10.0.0.1"})).await;
        let ips = call(&server, "asset_ip.list", json!({"asset_id": "a1"})).await;
        assert_eq!(ips["result"], json!([]));
    }

    #[tokio::test]
    async fn test_stocktake_flow() {
        let server = server();
        call(
            &server,
            "asset.put",
            json!({"id": "a1", "name": "Laptop", "asset_tag": "TAG-1", "location": "L2"}),
        )
        .await;
        call(
            &server,
            "asset.put",
            json!({"id": "a2", "name": "Monitor", "serial": "SN-9", "location": "L2"}),
        )
        .await;
        call(&server, "asset.put", json!({"id": "a3", "name": "Phone", "location": "L3"})).await;

        let started = call(&server, "stocktake.start", json!({"name": "L2", "location": "L2"})).await;
        let id = started["result"]["id"].clone();
        assert_eq!(started["result"]["summary"]["expected"], 2);

        let scan = call(&server, "stocktake.scan", json!({"id": id, "code": "TAG-1"})).await;
        assert_eq!(scan["result"]["outcome"], "verified");
        assert_eq!(scan["result"]["asset"]["id"], "a1");

        let again = call(
            &server,
            "stocktake.scan",
            json!({"id": id, "code": "https://inv.local/assets/a1"}),
        )
        .await;
        assert_eq!(again["result"]["outcome"], "already_verified");

        let stray = call(&server, "stocktake.scan", json!({"id": id, "code": "a3"})).await;
        assert_eq!(stray["result"]["outcome"], "unexpected");

        let unknown = call(&server, "stocktake.scan", json!({"id": id, "code": "SN: nope"})).await;
        assert_eq!(unknown["error"]["code"], -32004);

        let garbage = call(&server, "stocktake.scan", json!({"id": id, "code": "   "})).await;
        assert_eq!(garbage["error"]["code"], -32602);

        let summary = call(&server, "stocktake.summary", json!({ "id": id })).await;
        assert_eq!(summary["result"]["missing"], json!(["a2"]));

        let closed = call(&server, "stocktake.close", json!({ "id": id })).await;
        assert_eq!(closed["result"]["summary"]["verified"], 1);

        let late = call(&server, "stocktake.scan", json!({"id": id, "code": "serial:SN-9"})).await;
        assert_eq!(late["error"]["code"], -32009);
    }

    #[tokio::test]
    async fn test_closed_stocktakes_are_bounded() {
        let server = server();
        let open = call(&server, "stocktake.start", json!({"name": "open", "asset_ids": []})).await;

        for i in 0..MAX_CLOSED_STOCKTAKES + 3 {
            let started = call(
                &server,
                "stocktake.start",
                json!({"name": format!("batch {}", i), "asset_ids": []}),
            )
            .await;
            let closed = call(
                &server,
                "stocktake.close",
                json!({"id": started["result"]["id"]}),
            )
            .await;
            assert!(closed.get("error").is_none());
        }

        let stocktakes = server.stocktakes.read().await;
        assert_eq!(stocktakes.len(), MAX_CLOSED_STOCKTAKES + 1);
        assert_eq!(
            stocktakes.values().filter(|s| !s.is_closed()).count(),
            1
        );
        drop(stocktakes);

        let summary = call(&server, "stocktake.summary", json!({"id": open["result"]["id"]})).await;
        assert_eq!(summary["result"]["summary"]["expected"], 0);
    }

    #[tokio::test]
    async fn test_reports() {
        let server = server();
        call(
            &server,
            "asset.put",
            json!({"id": "a1", "name": "Laptop", "warranty_expires": "2026-03-10"}),
        )
        .await;

        let report = call(&server, "report.warranty", json!({"today": "2026-03-01"})).await;
        assert_eq!(report["result"]["report"], "warranty");
        assert_eq!(report["result"]["rows"][0]["warranty"]["status"], "expiring_soon");
        assert_eq!(report["result"]["rows"][0]["warranty"]["days_left"], 9);

        let conditions = call(&server, "report.condition", Value::Null).await;
        assert_eq!(conditions["result"]["rows"][1]["count"], 1);
    }
}
