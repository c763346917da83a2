use crate::portfolio::{PortfolioAggregator, PortfolioUiState};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{extract::State, http::StatusCode, Json};
use futures_util::stream::{self, Stream, StreamExt};
use std::sync::Arc;

/// Current portfolio view state.
pub async fn get_portfolio(
    State(aggregator): State<Arc<PortfolioAggregator>>,
) -> (StatusCode, Json<PortfolioUiState>) {
    (StatusCode::OK, Json(aggregator.state()))
}

/// Force a reload from the server. Answers right away with the state after the
/// request was accepted; offline requests already carry the final error.
pub async fn refresh_portfolio(
    State(aggregator): State<Arc<PortfolioAggregator>>,
) -> (StatusCode, Json<PortfolioUiState>) {
    aggregator.refresh();
    (StatusCode::ACCEPTED, Json(aggregator.state()))
}

/// Server-sent events: the current state, then every new latest state.
pub async fn stream_portfolio(
    State(aggregator): State<Arc<PortfolioAggregator>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let mut rx = aggregator.subscribe();
    let current = rx.borrow_and_update().clone();

    let updates = stream::unfold(rx, |mut rx| async move {
        rx.changed().await.ok()?;
        let state = rx.borrow_and_update().clone();
        Some((state, rx))
    });

    let events = stream::once(async move { current })
        .chain(updates)
        .map(|state| Event::default().json_data(&state));

    Sse::new(events).keep_alive(KeepAlive::default())
}
