//! `depprobe batch` command handler

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use depprobe_core::AggregatedResult;
use depprobe_core::config::DepprobeConfig;
use depprobe_resolver::{DependencyResolver, DockerChannelFactory, ResolveRequest, ResolveResult};

use crate::cli::BatchArgs;
use crate::commands::ResolverFlags;
use crate::commands::resolve::render_result;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `batch` command.
///
/// The report is rendered before the exit status is decided, so failed
/// requests are visible in the output as well as in the exit code.
pub async fn execute(
    args: BatchArgs,
    config: &DepprobeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut config = config.clone();
    if let Some(max_workers) = args.max_workers {
        config.resolver.max_workers = max_workers;
    }
    config.resolver.fail_fast |= args.fail_fast;
    config.validate()?;

    let requests = read_requests(&args.file).await?;
    let options = ResolverFlags {
        skip_system_scope: args.skip_system_scope,
        skip_hash_collection: args.skip_hash_collection,
        select_detectors: args.select_detectors.as_deref(),
    }
    .apply(&config);

    let factory = Arc::new(DockerChannelFactory::from_config(&config));
    let resolver = DependencyResolver::new(factory, options)?;

    info!(
        file = %args.file.display(),
        requests = requests.len(),
        "running batch"
    );
    let results = resolver.resolve_batch_as_map(requests).await;
    let report = BatchReport::from_results(results);
    writer.render(&report)?;

    let failed = report.failed();
    if failed > 0 {
        return Err(CliError::BatchFailed {
            failed,
            total: report.entries.len(),
        });
    }
    Ok(())
}

/// Read a JSON array of requests from `path`.
pub async fn read_requests(path: &Path) -> Result<Vec<ResolveRequest>, CliError> {
    let content = tokio::fs::read_to_string(path).await?;
    let requests: Vec<ResolveRequest> = serde_json::from_str(&content)?;
    Ok(requests)
}

/// Outcome of every request in a batch, keyed by label.
#[derive(Serialize)]
#[serde(transparent)]
pub struct BatchReport {
    pub entries: BTreeMap<String, BatchEntry>,
}

/// One request's outcome.
#[derive(Serialize)]
pub struct BatchEntry {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<AggregatedResult>,
    /// Target description, for text output only
    #[serde(skip)]
    pub target: String,
}

impl From<ResolveResult> for BatchEntry {
    fn from(result: ResolveResult) -> Self {
        Self {
            success: result.success(),
            elapsed_ms: result.elapsed.as_millis() as u64,
            target: result.request.target.to_string(),
            error: result.error,
            dependencies: result.result,
        }
    }
}

impl BatchReport {
    pub fn from_results(results: BTreeMap<String, ResolveResult>) -> Self {
        Self {
            entries: results
                .into_iter()
                .map(|(label, result)| (label, BatchEntry::from(result)))
                .collect(),
        }
    }

    /// Number of failed requests.
    pub fn failed(&self) -> usize {
        self.entries.values().filter(|e| !e.success).count()
    }
}

impl Render for BatchReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let total = self.entries.len();
        let failed = self.failed();
        writeln!(
            w,
            "Batch: {} requests, {} succeeded, {} failed",
            total,
            (total - failed).to_string().green(),
            failed.to_string().red()
        )?;

        for (label, entry) in &self.entries {
            writeln!(w)?;
            let status = if entry.success {
                "OK".green().bold()
            } else {
                "FAILED".red().bold()
            };
            writeln!(
                w,
                "[{}] {} {} ({} ms)",
                label.bold(),
                entry.target,
                status,
                entry.elapsed_ms
            )?;
            if let Some(ref error) = entry.error {
                writeln!(w, "  Error: {}", error.red())?;
            }
            if let Some(ref dependencies) = entry.dependencies {
                render_result(dependencies, "  ", w)?;
            }
        }
        Ok(())
    }
}
