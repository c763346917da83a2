use crate::error::PortfolioError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HoldingRecord is one position as stored in the cache and passed between layers.
/// Numeric fields are always concrete; absent wire values become zero on ingestion.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HoldingRecord {
    pub symbol: String,
    pub quantity: i64,
    pub avg_price: f64,
    pub ltp: f64,
    pub close: f64,
}

impl HoldingRecord {
    pub fn new(
        symbol: impl Into<String>,
        quantity: i64,
        avg_price: f64,
        ltp: f64,
        close: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            avg_price,
            ltp,
            close,
        }
    }

    /// Today's mark-to-market figure for this position.
    pub fn pnl(&self) -> f64 {
        (self.close - self.ltp) * self.quantity as f64
    }
}

/// Body returned by the holdings endpoint.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct PortfolioResponse {
    #[serde(default)]
    pub data: Option<HoldingsData>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct HoldingsData {
    #[serde(default)]
    pub user_holding: Option<Vec<UserHoldingItem>>,
}

/// A holding as it appears on the wire. Every field may be missing.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserHoldingItem {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub avg_price: Option<f64>,
    #[serde(default)]
    pub ltp: Option<f64>,
    #[serde(default)]
    pub close: Option<f64>,
}

impl UserHoldingItem {
    /// Returns `None` when the item has no usable symbol.
    pub fn into_record(self) -> Option<HoldingRecord> {
        let symbol = self.symbol.filter(|s| !s.trim().is_empty())?;
        Some(HoldingRecord {
            symbol,
            quantity: self.quantity.unwrap_or(0),
            avg_price: self.avg_price.unwrap_or(0.0),
            ltp: self.ltp.unwrap_or(0.0),
            close: self.close.unwrap_or(0.0),
        })
    }
}

impl PortfolioResponse {
    /// Extracts the holdings set, or `None` when the body carried no holdings list.
    pub fn into_holdings(self) -> Option<Vec<HoldingRecord>> {
        let items = self.data?.user_holding?;
        Some(normalize_holdings(items))
    }
}

/// Drops symbol-less items and collapses duplicate symbols. A later duplicate
/// overwrites the earlier entry in place.
pub fn normalize_holdings(items: Vec<UserHoldingItem>) -> Vec<HoldingRecord> {
    let mut records: Vec<HoldingRecord> = Vec::with_capacity(items.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for item in items {
        let Some(record) = item.into_record() else {
            tracing::debug!("Skipping holding without a symbol");
            continue;
        };
        match positions.get(&record.symbol) {
            Some(&idx) => records[idx] = record,
            None => {
                positions.insert(record.symbol.clone(), records.len());
                records.push(record);
            }
        }
    }

    records
}

/// Display projection of a HoldingRecord.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HoldingView {
    pub symbol: String,
    pub quantity: i64,
    pub avg_price: f64,
    pub ltp: f64,
    pub pnl: f64,
}

impl From<&HoldingRecord> for HoldingView {
    fn from(record: &HoldingRecord) -> Self {
        HoldingView {
            symbol: record.symbol.clone(),
            quantity: record.quantity,
            avg_price: record.avg_price,
            ltp: record.ltp,
            pnl: record.pnl(),
        }
    }
}

/// Aggregate figures for a holdings set, alongside the per-holding views.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub holdings: Vec<HoldingView>,
    pub current_val: f64,
    pub total_inv: f64,
    #[serde(rename = "todayPnL")]
    pub today_pnl: f64,
    pub profit_loss: f64,
    pub profit_loss_percent: f64,
}

impl PortfolioSummary {
    pub fn from_records(records: &[HoldingRecord]) -> Result<Self, PortfolioError> {
        let holdings: Vec<HoldingView> = records.iter().map(HoldingView::from).collect();

        let current_val: f64 = records.iter().map(|h| h.ltp * h.quantity as f64).sum();
        let total_inv: f64 = records.iter().map(|h| h.avg_price * h.quantity as f64).sum();
        let today_pnl: f64 = holdings.iter().map(|h| h.pnl).sum();
        let profit_loss = current_val - total_inv;
        let profit_loss_percent = if total_inv > 0.0 {
            (profit_loss / total_inv * 100.0).abs()
        } else {
            0.0
        };

        for (name, value) in [
            ("current value", current_val),
            ("total investment", total_inv),
            ("today's P&L", today_pnl),
            ("profit/loss", profit_loss),
            ("profit/loss percent", profit_loss_percent),
        ] {
            if !value.is_finite() {
                return Err(PortfolioError::Aggregation(name));
            }
        }

        Ok(PortfolioSummary {
            holdings,
            current_val,
            total_inv,
            today_pnl,
            profit_loss,
            profit_loss_percent,
        })
    }
}
