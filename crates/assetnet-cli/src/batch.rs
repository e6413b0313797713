//! Parallel subnet utilization using Rayon
//!
//! Each input line is either a CIDR block or the name of a stored subnet.
//! Lines are processed independently on a dedicated thread pool; a bad line
//! yields an error row instead of aborting the batch.

use anyhow::Result;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use assetnet_cidr::{join_addresses, Cidr, Utilization};
use assetnet_db::{load_subnet_view, InventoryStore};

/// Utilization of one subnet or block
#[derive(Debug, Clone, Serialize)]
pub struct UtilizationRow {
    /// Stored subnet name, if the input named one
    pub subnet: Option<String>,
    pub cidr: String,
    #[serde(flatten)]
    pub utilization: Utilization,
}

/// Batch processing result
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub input: String,
    pub result: Result<UtilizationRow, String>,
}

/// Batch processor with parallel execution
pub struct BatchProcessor {
    store: Arc<dyn InventoryStore>,
    thread_pool: rayon::ThreadPool,
}

impl BatchProcessor {
    /// Create a new batch processor
    ///
    /// # Arguments
    ///
    /// * `store` - Store consulted for subnet names and IP links
    /// * `num_threads` - Number of threads (default: CPU cores)
    pub fn new(store: Arc<dyn InventoryStore>, num_threads: Option<usize>) -> Result<Self> {
        let num_threads = num_threads.unwrap_or_else(num_cpus::get).max(1);

        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?;

        Ok(Self { store, thread_pool })
    }

    /// Compute utilization for every input, preserving input order
    pub fn process(&self, inputs: Vec<String>) -> Vec<BatchResult> {
        let total = inputs.len();
        let processed = AtomicUsize::new(0);

        self.thread_pool.install(|| {
            inputs
                .into_par_iter()
                .map(|input| {
                    let result = self.utilization(&input);

                    let count = processed.fetch_add(1, Ordering::Relaxed) + 1;
                    if count % 100 == 0 || count == total {
                        tracing::info!("processed {}/{} subnets", count, total);
                    }

                    BatchResult { input, result }
                })
                .collect()
        })
    }

    fn utilization(&self, input: &str) -> Result<UtilizationRow, String> {
        if let Ok(cidr) = Cidr::parse(input) {
            let hosts = cidr.expand();
            let links = self
                .store
                .associations_for(&hosts)
                .map_err(|e| e.to_string())?;
            let rows = join_addresses(&hosts, &links);

            return Ok(UtilizationRow {
                subnet: None,
                cidr: cidr.to_string(),
                utilization: Utilization::from_rows(&rows),
            });
        }

        let subnet = self
            .store
            .find_subnet_by_name(input)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("not a CIDR block or known subnet: {}", input))?;
        let view = load_subnet_view(self.store.as_ref(), subnet.id).map_err(|e| e.to_string())?;

        Ok(UtilizationRow {
            subnet: Some(view.subnet.name),
            cidr: view.cidr.to_string(),
            utilization: view.utilization,
        })
    }

    /// Get thread pool info
    pub fn thread_count(&self) -> usize {
        self.thread_pool.current_num_threads()
    }
}

/// Split batch input into entries, skipping blanks and `#` comments
pub fn parse_inputs(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}
