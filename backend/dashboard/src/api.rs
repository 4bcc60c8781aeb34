//! Axum handlers: the dashboard page, its form actions, and a JSON API.

use std::sync::Arc;

use axum::{
    extract::{Form, State},
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app::Dashboard;
use crate::events::{ContributionEvent, SettlementEvent};
use crate::render::render_page;

#[derive(Clone)]
pub struct ApiState {
    pub dashboard: Arc<Dashboard>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/campaign", get(campaign))
        .route("/api/history", get(history))
        .route("/api/notifications", get(notifications))
        .route("/connect", post(connect))
        .route("/donate", post(donate))
        .route("/withdraw", post(withdraw))
        .route("/refund", post(refund))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct DonateForm {
    #[serde(default)]
    pub amount: String,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub scanned_to: Option<u64>,
    pub contributions: Vec<ContributionEvent>,
    pub settlements: Vec<SettlementEvent>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /`
///
/// Renders the full page and shows pending notifications exactly once.
pub async fn index(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let notes = state.dashboard.drain_notifications().await;
    let view = state.dashboard.view().await;
    Html(render_page(&view, &notes))
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /api/campaign`
pub async fn campaign(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.dashboard.view().await)
}

/// `GET /api/history`
///
/// Raw decoded events: contributions oldest first, settlements newest first.
pub async fn history(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let (scanned_to, contributions, settlements) = state.dashboard.history().await;
    Json(HistoryResponse {
        scanned_to,
        contributions,
        settlements,
    })
}

/// `GET /api/notifications`
pub async fn notifications(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.dashboard.drain_notifications().await)
}

/// `POST /connect`
pub async fn connect(State(state): State<Arc<ApiState>>) -> Redirect {
    state.dashboard.connect().await;
    Redirect::to("/")
}

/// `POST /donate` with form field `amount` (ether).
pub async fn donate(
    State(state): State<Arc<ApiState>>,
    Form(form): Form<DonateForm>,
) -> Redirect {
    state.dashboard.donate(&form.amount).await;
    Redirect::to("/")
}

/// `POST /withdraw`
pub async fn withdraw(State(state): State<Arc<ApiState>>) -> Redirect {
    state.dashboard.withdraw().await;
    Redirect::to("/")
}

/// `POST /refund`
pub async fn refund(State(state): State<Arc<ApiState>>) -> Redirect {
    state.dashboard.refund().await;
    Redirect::to("/")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use alloy_primitives::Address;
    use axum::http::StatusCode;

    use super::*;
    use crate::app::Notification;
    use crate::loader::DataLoader;
    use crate::test_utils::MockWallet;
    use crate::tx::TxSubmitter;

    fn state() -> (Arc<MockWallet>, Arc<ApiState>) {
        let wallet = Arc::new(MockWallet::new());
        let dashboard = Dashboard::from_parts(
            wallet.clone(),
            DataLoader::with_range(wallet.clone(), Address::ZERO, 0, 100),
            TxSubmitter::with_timing(
                wallet.clone(),
                Address::ZERO,
                Duration::from_millis(1),
                Duration::from_millis(1),
            ),
            1337,
        );
        (
            wallet,
            Arc::new(ApiState {
                dashboard: Arc::new(dashboard),
            }),
        )
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_donation_redirects_with_notification() {
        let (wallet, state) = state();

        let response = donate(
            State(state.clone()),
            Form(DonateForm {
                amount: String::new(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(wallet.methods().is_empty());
        assert_eq!(
            state.dashboard.drain_notifications().await,
            vec![Notification::error("Enter a valid amount")]
        );
    }

    #[tokio::test]
    async fn index_renders_before_connecting() {
        let (_, state) = state();
        let response = index(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
