//! Cache-first holdings synchronization.
//!
//! A run always emits `Loading`, then (unless forced) the cached holdings when
//! there are any, then exactly one network outcome. Non-empty network results
//! are mirrored into the local cache before they are emitted; an empty list is
//! emitted without touching the cache.

use crate::db::LocalCache;
use crate::error::SyncError;
use crate::models::HoldingRecord;
use crate::remote::RemoteSource;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// One step of a sync run.
#[derive(Debug)]
pub enum SyncResult<T> {
    Loading,
    Success(T),
    Error(SyncError),
}

impl<T> SyncResult<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, SyncResult::Loading)
    }
}

pub type HoldingsResult = SyncResult<Vec<HoldingRecord>>;

// Loading, cached snapshot, network outcome.
const RUN_BUFFER: usize = 3;

/// Orchestrates the local cache and the remote source. Holds no state of its own.
#[derive(Clone)]
pub struct SyncEngine {
    cache: Arc<dyn LocalCache>,
    remote: Arc<dyn RemoteSource>,
}

impl SyncEngine {
    pub fn new(cache: Arc<dyn LocalCache>, remote: Arc<dyn RemoteSource>) -> Self {
        Self { cache, remote }
    }

    /// Start a run on the tokio runtime and hand back its emissions.
    pub fn fetch(&self, force_refresh: bool) -> SyncRun {
        let (tx, rx) = mpsc::channel(RUN_BUFFER);
        let engine = self.clone();
        let task = tokio::spawn(async move { engine.run(force_refresh, tx).await });
        SyncRun { rx, task }
    }

    /// Drive one run to completion, sending every emission to `tx` in order.
    /// Stops early if the receiving side goes away.
    pub async fn run(&self, force_refresh: bool, tx: mpsc::Sender<HoldingsResult>) {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("sync", %run_id, force_refresh);
        self.run_inner(force_refresh, tx).instrument(span).await
    }

    async fn run_inner(&self, force_refresh: bool, tx: mpsc::Sender<HoldingsResult>) {
        if tx.send(SyncResult::Loading).await.is_err() {
            return;
        }

        if !force_refresh {
            match self.cache.observe().await {
                Ok(cached) if !cached.is_empty() => {
                    tracing::debug!("Serving {} cached holdings", cached.len());
                    if tx.send(SyncResult::Success(cached)).await.is_err() {
                        return;
                    }
                }
                Ok(_) => tracing::debug!("Holdings cache is empty"),
                Err(e) => tracing::debug!("Ignoring cache read failure: {}", e),
            }
        }

        let outcome = self.refresh_from_remote().await;
        match &outcome {
            SyncResult::Success(holdings) => {
                tracing::info!("Synced {} holdings from remote", holdings.len())
            }
            SyncResult::Error(e) => tracing::warn!("Holdings sync failed: {}", e),
            SyncResult::Loading => {}
        }
        let _ = tx.send(outcome).await;
    }

    async fn refresh_from_remote(&self) -> HoldingsResult {
        let holdings = match self.remote.fetch_holdings().await {
            Ok(Some(holdings)) => holdings,
            Ok(None) => return SyncResult::Error(SyncError::EmptyPayload),
            Err(e) => return SyncResult::Error(e.into()),
        };

        if holdings.is_empty() {
            tracing::debug!("Remote returned no holdings, leaving cache as is");
        } else if let Err(e) = self.cache.put(&holdings).await {
            return SyncResult::Error(e.into());
        }

        SyncResult::Success(holdings)
    }
}

/// Emissions of one in-flight run. Dropping it cancels the run, including any
/// outstanding remote call.
pub struct SyncRun {
    rx: mpsc::Receiver<HoldingsResult>,
    task: JoinHandle<()>,
}

impl SyncRun {
    /// Next emission, or `None` once the run has finished.
    pub async fn next(&mut self) -> Option<HoldingsResult> {
        self.rx.recv().await
    }

    /// Collect all remaining emissions.
    pub async fn collect(mut self) -> Vec<HoldingsResult> {
        let mut results = Vec::new();
        while let Some(result) = self.next().await {
            results.push(result);
        }
        results
    }
}

impl Drop for SyncRun {
    fn drop(&mut self) {
        self.task.abort();
    }
}
