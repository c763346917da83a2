//! Portfolio view state and the reducer that owns it.

use crate::models::PortfolioSummary;
use crate::network::NetworkAvailability;
use crate::sync::{HoldingsResult, SyncEngine, SyncResult};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load data. Please try again.";
pub const OFFLINE_MESSAGE: &str = "No internet connection";

const TRANSITION_BUFFER: usize = 64;

/// What the presentation layer renders.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PortfolioUiState {
    Loading,
    #[serde(rename_all = "camelCase")]
    Success {
        #[serde(flatten)]
        summary: PortfolioSummary,
        is_offline: bool,
    },
    #[serde(rename_all = "camelCase")]
    Error { message: String, is_offline: bool },
}

impl PortfolioUiState {
    pub fn is_offline(&self) -> bool {
        match self {
            PortfolioUiState::Loading => false,
            PortfolioUiState::Success { is_offline, .. } => *is_offline,
            PortfolioUiState::Error { is_offline, .. } => *is_offline,
        }
    }
}

struct RunSlot {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Inner {
    engine: SyncEngine,
    network: Arc<dyn NetworkAvailability>,
    state: watch::Sender<PortfolioUiState>,
    transitions: broadcast::Sender<PortfolioUiState>,
    // Also serializes every write to `state`.
    run: Mutex<RunSlot>,
}

/// Owns the current [`PortfolioUiState`] for one portfolio view session.
///
/// Each `start`/`refresh` supersedes the previous run: the old run is aborted and
/// anything it still emits is discarded. Dropping the aggregator aborts the
/// in-flight run and unregisters the network signal.
pub struct PortfolioAggregator {
    inner: Arc<Inner>,
    started: AtomicBool,
}

impl PortfolioAggregator {
    pub fn new(engine: SyncEngine, network: Arc<dyn NetworkAvailability>) -> Self {
        let (state, _) = watch::channel(PortfolioUiState::Loading);
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);

        Self {
            inner: Arc::new(Inner {
                engine,
                network,
                state,
                transitions,
                run: Mutex::new(RunSlot {
                    generation: 0,
                    task: None,
                }),
            }),
            started: AtomicBool::new(false),
        }
    }

    /// Initial cache-first load. Only the first call has any effect.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Starting portfolio sync");
        self.launch(false);
    }

    /// Forced reload from the network. Fails fast when offline, replacing any
    /// run still in flight.
    ///
    /// A refresh starts by publishing `Loading`, so data already on screen does
    /// not survive a failed refresh. Data is only kept when a failure follows a
    /// success inside the same run, e.g. cached holdings then a network error.
    pub fn refresh(&self) {
        if !self.inner.network.is_available() {
            tracing::info!("Refresh requested while offline");
            let mut slot = self.inner.lock_run();
            supersede(&mut slot);
            self.inner.write(
                &slot,
                PortfolioUiState::Error {
                    message: OFFLINE_MESSAGE.to_string(),
                    is_offline: true,
                },
            );
            return;
        }
        self.launch(true);
    }

    /// Fold one sync emission into the current state.
    pub fn on_sync_result(&self, result: HoldingsResult) {
        self.inner.fold(None, result);
    }

    pub fn state(&self) -> PortfolioUiState {
        self.inner.state.borrow().clone()
    }

    /// Latest-value subscription.
    pub fn subscribe(&self) -> watch::Receiver<PortfolioUiState> {
        self.inner.state.subscribe()
    }

    /// Every transition, in order, from now on.
    pub fn transitions(&self) -> broadcast::Receiver<PortfolioUiState> {
        self.inner.transitions.subscribe()
    }

    fn launch(&self, force_refresh: bool) {
        let mut slot = self.inner.lock_run();
        supersede(&mut slot);
        let generation = slot.generation;

        let inner = Arc::clone(&self.inner);
        slot.task = Some(tokio::spawn(async move {
            let mut run = inner.engine.fetch(force_refresh);
            while let Some(result) = run.next().await {
                inner.fold(Some(generation), result);
            }
        }));
    }
}

fn supersede(slot: &mut RunSlot) {
    slot.generation += 1;
    if let Some(task) = slot.task.take() {
        task.abort();
    }
}

impl Inner {
    fn lock_run(&self) -> MutexGuard<'_, RunSlot> {
        match self.run.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn is_offline(&self) -> bool {
        !self.network.is_available()
    }

    fn fold(&self, generation: Option<u64>, result: HoldingsResult) {
        let slot = self.lock_run();
        if generation.is_some_and(|g| g != slot.generation) {
            tracing::debug!("Dropping emission from a superseded run");
            return;
        }

        match result {
            SyncResult::Loading => self.write(&slot, PortfolioUiState::Loading),
            SyncResult::Success(holdings) => match PortfolioSummary::from_records(&holdings) {
                Ok(summary) => {
                    let next = PortfolioUiState::Success {
                        summary,
                        is_offline: self.is_offline(),
                    };
                    self.write(&slot, next);
                }
                Err(e) => {
                    tracing::warn!("Could not aggregate holdings: {}", e);
                    self.fail(&slot);
                }
            },
            SyncResult::Error(e) => {
                tracing::warn!("Portfolio load failed: {}", e);
                self.fail(&slot);
            }
        }
    }

    /// Keep already-shown data on failure, only refreshing its offline flag.
    fn fail(&self, slot: &RunSlot) {
        let is_offline = self.is_offline();
        let next = match &*self.state.borrow() {
            PortfolioUiState::Success { summary, .. } => PortfolioUiState::Success {
                summary: summary.clone(),
                is_offline,
            },
            _ => PortfolioUiState::Error {
                message: LOAD_FAILED_MESSAGE.to_string(),
                is_offline,
            },
        };
        self.write(slot, next);
    }

    // Taking the slot proves the caller holds the write lock.
    fn write(&self, _slot: &RunSlot, next: PortfolioUiState) {
        tracing::debug!("Portfolio state -> {:?}", StateKind(&next));
        self.state.send_replace(next.clone());
        let _ = self.transitions.send(next);
    }
}

struct StateKind<'a>(&'a PortfolioUiState);

impl std::fmt::Debug for StateKind<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            PortfolioUiState::Loading => f.write_str("Loading"),
            PortfolioUiState::Success {
                summary,
                is_offline,
            } => write!(
                f,
                "Success(holdings={}, offline={})",
                summary.holdings.len(),
                is_offline
            ),
            PortfolioUiState::Error { message, is_offline } => {
                write!(f, "Error({:?}, offline={})", message, is_offline)
            }
        }
    }
}

impl Drop for PortfolioAggregator {
    fn drop(&mut self) {
        let mut slot = self.inner.lock_run();
        supersede(&mut slot);
        drop(slot);
        self.inner.network.unregister();
        tracing::debug!("Portfolio aggregator released");
    }
}
