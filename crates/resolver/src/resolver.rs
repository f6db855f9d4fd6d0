//! Dependency resolver: single requests and bounded batches.
//!
//! Every request gets its own channel and orchestrator. Batches fan out over
//! `tokio::spawn`, bounded by a semaphore of `max_workers` permits, and the
//! results are written back by submission index.
//!
//! With `fail_fast`, the first failed request cancels a shared
//! [`CancellationToken`]. Requests still waiting for a permit are answered
//! with [`CANCELLED_MESSAGE`]. Requests already running are left to finish.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use depprobe_core::config::ResolverConfig;
use depprobe_core::{AggregatedResult, DepprobeError};
use depprobe_detector::{Orchestrator, OrchestratorOptions};
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::factory::ChannelFactory;
use crate::request::{ResolveRequest, ResolveResult};

/// Error recorded for requests skipped after a fail-fast cancellation.
pub const CANCELLED_MESSAGE: &str = "Cancelled: an earlier request failed";

/// Options shared by every request the resolver runs.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub skip_system_scope: bool,
    pub skip_hash_collection: bool,
    /// Detector names to run. Empty means all.
    pub selected_detectors: Vec<String>,
    /// Upper bound on concurrently running requests.
    pub max_workers: usize,
    /// Cancel unstarted requests after the first failure.
    pub fail_fast: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self::from_config(&ResolverConfig::default())
    }
}

impl ResolverOptions {
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            skip_system_scope: config.skip_system_scope,
            skip_hash_collection: config.skip_hash_collection,
            selected_detectors: config.detectors.clone(),
            max_workers: config.max_workers,
            fail_fast: config.fail_fast,
        }
    }

    fn orchestrator_options(&self, request: &ResolveRequest) -> OrchestratorOptions {
        OrchestratorOptions {
            skip_system_scope: self.skip_system_scope,
            skip_hash_collection: self.skip_hash_collection,
            venv_path: request.venv_path.clone(),
            selected_detectors: self.selected_detectors.clone(),
            only_container_info: request.only_container_info,
        }
    }
}

/// Resolves requests through a [`ChannelFactory`].
///
/// Cheap to clone: batch workers each hold a clone.
#[derive(Clone)]
pub struct DependencyResolver {
    factory: Arc<dyn ChannelFactory>,
    options: ResolverOptions,
}

impl DependencyResolver {
    /// # Errors
    ///
    /// `ResolveError::InvalidDetectors` when a selected detector name is unknown.
    /// The check runs once here rather than failing every request later.
    pub fn new(
        factory: Arc<dyn ChannelFactory>,
        options: ResolverOptions,
    ) -> Result<Self, DepprobeError> {
        Orchestrator::new(options.orchestrator_options(&ResolveRequest::default()))?;
        Ok(Self { factory, options })
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolves one request. Failures are captured in the result, never returned.
    pub async fn resolve(&self, request: ResolveRequest) -> ResolveResult {
        let started = Instant::now();
        match self.try_resolve(&request).await {
            Ok(result) => ResolveResult::succeeded(request, result, started.elapsed()),
            Err(e) => {
                warn!(request = %request.target, error = %e, "resolution failed");
                ResolveResult::failed(request, e.to_string(), started.elapsed())
            }
        }
    }

    /// Resolves one request and returns the typed error instead of capturing it.
    ///
    /// # Errors
    ///
    /// Target construction failures, unknown detectors and a missing working
    /// directory. Detector failures are not errors.
    pub async fn try_resolve(
        &self,
        request: &ResolveRequest,
    ) -> Result<AggregatedResult, DepprobeError> {
        let orchestrator = Orchestrator::new(self.options.orchestrator_options(request))?;
        let channel = self.factory.open(&request.target).await?;
        orchestrator
            .resolve(channel.as_ref(), request.working_dir.as_deref())
            .await
    }

    /// Resolves every request and returns results in submission order.
    pub async fn resolve_batch(&self, requests: Vec<ResolveRequest>) -> Vec<ResolveResult> {
        self.resolve_batch_with_progress(requests, |_, _, _| {}).await
    }

    /// Like [`resolve_batch`](Self::resolve_batch), calling `on_progress` with
    /// `(completed, total, result)` as each request completes.
    pub async fn resolve_batch_with_progress<F>(
        &self,
        requests: Vec<ResolveRequest>,
        mut on_progress: F,
    ) -> Vec<ResolveResult>
    where
        F: FnMut(usize, usize, &ResolveResult),
    {
        let total = requests.len();
        if total == 0 {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.options.max_workers.max(1)));
        let cancel = CancellationToken::new();
        let fail_fast = self.options.fail_fast;
        info!(
            total,
            max_workers = self.options.max_workers,
            fail_fast,
            "batch resolution started"
        );

        let mut running = FuturesUnordered::new();
        for (index, request) in requests.iter().cloned().enumerate() {
            let resolver = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();

            let handle = tokio::spawn(async move {
                let permit = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                let _permit = match permit {
                    Some(permit) if !cancel.is_cancelled() => permit,
                    _ => {
                        debug!(index, "request cancelled before start");
                        return ResolveResult::failed(request, CANCELLED_MESSAGE, Duration::ZERO);
                    }
                };

                let result = resolver.resolve(request).await;
                if fail_fast && !result.success() {
                    cancel.cancel();
                }
                result
            });
            running.push(async move { (index, handle.await) });
        }

        let mut slots: Vec<Option<ResolveResult>> = (0..total).map(|_| None).collect();
        let mut completed = 0;
        while let Some((index, joined)) = running.next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(index, error = %e, "batch worker failed");
                    if fail_fast {
                        cancel.cancel();
                    }
                    ResolveResult::failed(
                        requests[index].clone(),
                        format!("Worker task failed: {e}"),
                        Duration::ZERO,
                    )
                }
            };

            completed += 1;
            info!(
                completed,
                total,
                request = %result.request.target,
                success = result.success(),
                elapsed_ms = result.elapsed.as_millis() as u64,
                "batch request finished"
            );
            on_progress(completed, total, &result);
            slots[index] = Some(result);
        }

        slots.into_iter().flatten().collect()
    }

    /// Runs a batch and keys the results by label, or `request_<index>` for
    /// unlabelled requests and repeated labels.
    pub async fn resolve_batch_as_map(
        &self,
        requests: Vec<ResolveRequest>,
    ) -> BTreeMap<String, ResolveResult> {
        let results = self.resolve_batch(requests).await;
        let labels: Vec<Option<&str>> = results
            .iter()
            .map(|r| r.request.label.as_deref())
            .collect();
        let keys = batch_keys(&labels);
        keys.into_iter().zip(results).collect()
    }
}

/// One unique key per request.
///
/// The first occurrence of a label keeps it. Every other request gets
/// `request_<index>`, suffixed with `_<n>` when that key is already taken or
/// is some request's explicit label.
fn batch_keys(labels: &[Option<&str>]) -> Vec<String> {
    let explicit: HashSet<&str> = labels.iter().flatten().copied().collect();
    let mut used: HashSet<String> = HashSet::with_capacity(labels.len());

    let mut keys: Vec<Option<String>> = labels
        .iter()
        .map(|label| {
            let label = (*label)?;
            used.insert(label.to_owned()).then(|| label.to_owned())
        })
        .collect();

    for (index, key) in keys.iter_mut().enumerate() {
        if key.is_some() {
            continue;
        }
        let base = format!("request_{index}");
        let mut candidate = base.clone();
        let mut suffix = 1;
        while explicit.contains(candidate.as_str()) || used.contains(&candidate) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        used.insert(candidate.clone());
        *key = Some(candidate);
    }

    keys.into_iter().flatten().collect()
}

impl std::fmt::Debug for DependencyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyResolver")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
