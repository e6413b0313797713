use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use assetnet_cidr::Cidr;
use assetnet_core::config::Settings;
use assetnet_core::{Asset, AssetId, AssetIp, Condition, NewSubnet, Subnet};
use assetnet_db::{load_subnet_view, ColdStorage, InventoryStore, MemoryStore};
use assetnet_report::{build_report, ReportKind, ReportOptions};
use assetnet_rpc::{RpcServer, StdioTransport};
use assetnet_stocktake::{parse_scan, resolve_scan};

mod batch;
mod output;

use batch::BatchProcessor;
use output::{print_result, OutputFormat, View};

/// IT asset inventory with CIDR subnet views
#[derive(Parser)]
#[command(name = "assetnet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "human", global = true)]
    output: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// RocksDB directory (overrides ASSETNET_DB_PATH; in-memory when unset)
    #[arg(long, value_name = "DIR", global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe a CIDR block
    Cidr(CidrArgs),
    /// List every usable host address of a CIDR block
    Expand(CidrArgs),
    /// Manage subnets
    #[command(subcommand)]
    Subnet(SubnetCommand),
    /// Manage assets and their IP addresses
    #[command(subcommand)]
    Asset(AssetCommand),
    /// Decode a barcode or QR payload and find the asset it refers to
    Scan(ScanArgs),
    /// Run an inventory report
    Report(ReportArgs),
    /// Utilization for many subnets or CIDR blocks in parallel
    Batch(BatchArgs),
    /// Serve JSON-RPC 2.0 over stdin/stdout
    Serve,
}

#[derive(Parser)]
struct CidrArgs {
    /// Block in a.b.c.d/p notation, p between 20 and 32
    #[arg(value_name = "CIDR")]
    cidr: String,
}

#[derive(Subcommand)]
enum SubnetCommand {
    /// Create a subnet
    Add {
        name: String,
        cidr: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List subnets by name
    List,
    /// Show every usable address of a subnet with its linked asset
    Show {
        name: String,
        /// Only list addresses without a linked asset
        #[arg(long)]
        free: bool,
    },
    /// Delete a subnet
    Rm { name: String },
}

#[derive(Subcommand)]
enum AssetCommand {
    /// Create or replace an asset
    Add(AssetArgs),
    /// Link an IP address to an asset
    Link {
        ip: String,
        asset_id: String,
        #[arg(short, long)]
        label: Option<String>,
    },
    /// Remove the link for an IP address
    Unlink { ip: String },
}

#[derive(Parser)]
struct AssetArgs {
    id: String,
    name: String,
    #[arg(long)]
    tag: Option<String>,
    #[arg(long)]
    serial: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    manufacturer: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    supplier: Option<String>,
    #[arg(long, default_value = "good")]
    condition: Condition,
    #[arg(long, value_name = "YYYY-MM-DD")]
    purchased: Option<NaiveDate>,
    /// Purchase cost in cents
    #[arg(long, value_name = "CENTS")]
    cost: Option<i64>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    warranty_expires: Option<NaiveDate>,
    #[arg(long, value_name = "YEARS")]
    lifecycle_years: Option<u32>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    reviewed: Option<NaiveDate>,
}

impl From<AssetArgs> for Asset {
    fn from(args: AssetArgs) -> Self {
        let mut asset = Asset::new(args.id, args.name);
        asset.asset_tag = args.tag;
        asset.serial = args.serial;
        asset.category = args.category;
        asset.manufacturer = args.manufacturer;
        asset.location = args.location;
        asset.supplier = args.supplier;
        asset.condition = args.condition;
        asset.purchase_date = args.purchased;
        asset.purchase_cost_cents = args.cost;
        asset.warranty_expires = args.warranty_expires;
        asset.lifecycle_years = args.lifecycle_years;
        asset.last_reviewed = args.reviewed;
        asset
    }
}

#[derive(Parser)]
struct ScanArgs {
    /// Raw scanner payload
    #[arg(value_name = "TEXT")]
    text: String,
}

#[derive(Parser)]
struct ReportArgs {
    /// warranty, condition, value, lifecycle or review
    kind: ReportKind,

    /// Evaluate dates as of this day instead of today
    #[arg(long, value_name = "YYYY-MM-DD")]
    today: Option<NaiveDate>,
}

#[derive(Parser)]
struct BatchArgs {
    /// Input file, one CIDR or subnet name per line (use '-' for stdin)
    #[arg(short, long, value_name = "FILE")]
    file: Option<String>,

    /// Number of worker threads (default: CPU cores)
    #[arg(short, long)]
    workers: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::from_env()?;
    if let Some(db) = cli.db.clone() {
        settings.db_path = Some(db);
    }
    init_tracing(&settings, cli.verbose);

    if let Some(message) = ephemeral_write_warning(&settings, &cli.command) {
        warn!("{}", message);
        eprintln!("{} {}", "!".yellow().bold(), message);
    }

    match cli.command {
        Commands::Cidr(args) => handle_cidr(args, cli.output)?,
        Commands::Expand(args) => handle_expand(args, cli.output)?,
        Commands::Subnet(cmd) => handle_subnet(cmd, &open_store(&settings)?, cli.output)?,
        Commands::Asset(cmd) => handle_asset(cmd, &open_store(&settings)?, cli.output)?,
        Commands::Scan(args) => handle_scan(args, &open_store(&settings)?, cli.output)?,
        Commands::Report(args) => handle_report(args, &open_store(&settings)?, &settings, cli.output)?,
        Commands::Batch(args) => handle_batch(args, open_store(&settings)?, cli.output)?,
        Commands::Serve => handle_serve(open_store(&settings)?, &settings)?,
    }

    Ok(())
}

/// Logs go to stderr so stdout stays clean for data and JSON-RPC
fn init_tracing(settings: &Settings, verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Commands that change the inventory
fn is_mutating(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Subnet(SubnetCommand::Add { .. } | SubnetCommand::Rm { .. })
            | Commands::Asset(_)
    )
}

/// Warning for a mutating command that would only touch a throwaway in-memory store
fn ephemeral_write_warning(settings: &Settings, command: &Commands) -> Option<String> {
    if settings.db_path.is_some() || !is_mutating(command) {
        return None;
    }
    Some(format!(
        "no database configured (use --db or ${}); this change will be discarded on exit",
        assetnet_core::config::ENV_DB_PATH
    ))
}

fn open_store(settings: &Settings) -> Result<Arc<dyn InventoryStore>> {
    match &settings.db_path {
        Some(path) => {
            debug!(path = %path.display(), "opening RocksDB store");
            let store = ColdStorage::open(path)
                .with_context(|| format!("failed to open store at {}", path.display()))?;
            Ok(Arc::new(store))
        }
        None => {
            debug!("no database configured, using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn handle_cidr(args: CidrArgs, format: OutputFormat) -> Result<()> {
    let analysis = Cidr::parse(&args.cidr)?.analyze();

    let view = View::Fields {
        title: "CIDR Block".to_string(),
        fields: vec![
            ("cidr", analysis.cidr.clone()),
            ("network", analysis.network.clone()),
            ("broadcast", analysis.broadcast.clone()),
            ("mask", analysis.mask.clone()),
            ("prefix_len", analysis.prefix_len.to_string()),
            ("total_addresses", analysis.total_addresses.to_string()),
            ("usable_hosts", analysis.usable_hosts.to_string()),
            ("first_usable", analysis.first_usable.clone().unwrap_or_default()),
            ("last_usable", analysis.last_usable.clone().unwrap_or_default()),
        ],
    };
    print_result(&analysis, view, format)
}

fn handle_expand(args: CidrArgs, format: OutputFormat) -> Result<()> {
    let hosts = Cidr::parse(&args.cidr)?.expand();

    if format == OutputFormat::Human {
        for host in &hosts {
            println!("{}", host);
        }
        return Ok(());
    }

    let view = View::Table {
        title: args.cidr,
        headers: vec!["ip"],
        rows: hosts.iter().map(|h| vec![h.clone()]).collect(),
    };
    print_result(&hosts, view, format)
}

fn handle_subnet(
    cmd: SubnetCommand,
    store: &Arc<dyn InventoryStore>,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        SubnetCommand::Add {
            name,
            cidr,
            description,
        } => {
            let subnet = store.create_subnet(NewSubnet {
                name,
                cidr,
                description,
            })?;
            print_result(&subnet, subnet_fields(&subnet), format)
        }
        SubnetCommand::List => {
            let subnets = store.list_subnets()?;
            let view = View::Table {
                title: "Subnets".to_string(),
                headers: vec!["name", "cidr", "description", "id"],
                rows: subnets
                    .iter()
                    .map(|s| {
                        vec![
                            s.name.clone(),
                            s.cidr.clone(),
                            s.description.clone().unwrap_or_default(),
                            s.id.to_string(),
                        ]
                    })
                    .collect(),
            };
            print_result(&subnets, view, format)
        }
        SubnetCommand::Show { name, free } => {
            let subnet = find_subnet(store, &name)?;
            let mut subnet_view = load_subnet_view(store.as_ref(), subnet.id)?;
            if free {
                subnet_view.rows.retain(|r| r.is_free());
            }

            let u = subnet_view.utilization;
            if format == OutputFormat::Human {
                eprintln!(
                    "{} {} used, {} free of {} ({:.1}%)",
                    "›".blue(),
                    u.used.to_string().yellow(),
                    u.free.to_string().green(),
                    u.total,
                    u.percent_used
                );
            }

            let view = View::Table {
                title: format!("{} ({})", subnet_view.subnet.name, subnet_view.cidr),
                headers: vec!["ip", "asset", "name", "label"],
                rows: subnet_view
                    .rows
                    .iter()
                    .map(|r| {
                        let (id, name) = r
                            .linked_asset
                            .as_ref()
                            .map(|a| (a.id.to_string(), a.name.clone()))
                            .unwrap_or_default();
                        vec![r.ip.clone(), id, name, r.label.clone().unwrap_or_default()]
                    })
                    .collect(),
            };
            print_result(&subnet_view, view, format)
        }
        SubnetCommand::Rm { name } => {
            let subnet = find_subnet(store, &name)?;
            store.delete_subnet(subnet.id)?;
            print_result(&subnet, subnet_fields(&subnet), format)
        }
    }
}

fn find_subnet(store: &Arc<dyn InventoryStore>, name: &str) -> Result<Subnet> {
    match store.find_subnet_by_name(name)? {
        Some(subnet) => Ok(subnet),
        None => bail!("no subnet named {:?}", name),
    }
}

fn subnet_fields(subnet: &Subnet) -> View {
    View::Fields {
        title: "Subnet".to_string(),
        fields: vec![
            ("id", subnet.id.to_string()),
            ("name", subnet.name.clone()),
            ("cidr", subnet.cidr.clone()),
            ("description", subnet.description.clone().unwrap_or_default()),
            ("created_at", subnet.created_at.to_rfc3339()),
            ("updated_at", subnet.updated_at.to_rfc3339()),
        ],
    }
}

fn handle_asset(
    cmd: AssetCommand,
    store: &Arc<dyn InventoryStore>,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        AssetCommand::Add(args) => {
            let asset = Asset::from(args);
            store.put_asset(asset.clone())?;
            let view = View::Fields {
                title: "Asset".to_string(),
                fields: vec![
                    ("id", asset.id.to_string()),
                    ("name", asset.name.clone()),
                    ("asset_tag", asset.asset_tag.clone().unwrap_or_default()),
                    ("condition", asset.condition.to_string()),
                    ("location", asset.location.clone().unwrap_or_default()),
                ],
            };
            print_result(&asset, view, format)
        }
        AssetCommand::Link {
            ip,
            asset_id,
            label,
        } => {
            let link = store.link_ip(AssetIp {
                ip,
                label,
                asset_id: AssetId::from(asset_id),
            })?;
            print_result(&link, link_fields(&link), format)
        }
        AssetCommand::Unlink { ip } => {
            store.unlink_ip(&ip)?;
            let view = View::Fields {
                title: "Unlinked".to_string(),
                fields: vec![("ip", ip.clone())],
            };
            print_result(&serde_json::json!({ "unlinked": ip }), view, format)
        }
    }
}

fn link_fields(link: &AssetIp) -> View {
    View::Fields {
        title: "IP Link".to_string(),
        fields: vec![
            ("ip", link.ip.clone()),
            ("asset_id", link.asset_id.to_string()),
            ("label", link.label.clone().unwrap_or_default()),
        ],
    }
}

fn handle_scan(args: ScanArgs, store: &Arc<dyn InventoryStore>, format: OutputFormat) -> Result<()> {
    let code = parse_scan(&args.text)?;
    let assets = store.list_assets()?;
    let asset = resolve_scan(&code, &assets).map(Asset::summary);

    let view = View::Fields {
        title: "Scan".to_string(),
        fields: vec![
            ("code", format!("{:?}", code)),
            (
                "asset",
                asset
                    .as_ref()
                    .map(|a| format!("{} ({})", a.id, a.name))
                    .unwrap_or_else(|| "no match".to_string()),
            ),
        ],
    };
    print_result(&serde_json::json!({ "code": code, "asset": asset }), view, format)
}

fn handle_report(
    args: ReportArgs,
    store: &Arc<dyn InventoryStore>,
    settings: &Settings,
    format: OutputFormat,
) -> Result<()> {
    let today = args.today.unwrap_or_else(|| Utc::now().date_naive());
    let assets = store.list_assets()?;
    let report = build_report(args.kind, &assets, today, &ReportOptions::from(settings));

    let view = View::Table {
        title: format!("{} report ({})", report.kind(), today),
        headers: report.headers(),
        rows: report.table(),
    };
    print_result(&report, view, format)
}

fn handle_batch(args: BatchArgs, store: Arc<dyn InventoryStore>, format: OutputFormat) -> Result<()> {
    let text = match args.file.as_deref() {
        None | Some("-") => std::io::read_to_string(std::io::stdin())?,
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path))?,
    };

    let processor = BatchProcessor::new(store, args.workers)?;
    debug!(threads = processor.thread_count(), "batch processing");
    let results = processor.process(batch::parse_inputs(&text));

    let rows: Vec<Vec<String>> = results
        .iter()
        .map(|r| match &r.result {
            Ok(u) => vec![
                r.input.clone(),
                u.cidr.clone(),
                u.utilization.total.to_string(),
                u.utilization.used.to_string(),
                u.utilization.free.to_string(),
                format!("{:.1}", u.utilization.percent_used),
                String::new(),
            ],
            Err(e) => vec![
                r.input.clone(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                e.clone(),
            ],
        })
        .collect();

    let json: Vec<serde_json::Value> = results
        .iter()
        .map(|r| match &r.result {
            Ok(u) => serde_json::json!({ "input": r.input, "result": u }),
            Err(e) => serde_json::json!({ "input": r.input, "error": e }),
        })
        .collect();

    let view = View::Table {
        title: "Subnet utilization".to_string(),
        headers: vec!["input", "cidr", "total", "used", "free", "percent_used", "error"],
        rows,
    };
    print_result(&json, view, format)
}

fn handle_serve(store: Arc<dyn InventoryStore>, settings: &Settings) -> Result<()> {
    let server = RpcServer::new(store, ReportOptions::from(settings));
    let transport = StdioTransport::new(Arc::new(server));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(transport.run_async())?;
    Ok(())
}
