// src/lib.rs
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod network;
pub mod portfolio;
pub mod remote;
pub mod sync;

// Re-export commonly used items
pub use db::{LocalCache, SqliteHoldingCache};
pub use models::*;
pub use network::{ConnectivityMonitor, NetworkAvailability};
pub use portfolio::{PortfolioAggregator, PortfolioUiState};
pub use remote::{HttpRemoteSource, RemoteSource};
pub use sync::{SyncEngine, SyncResult};
