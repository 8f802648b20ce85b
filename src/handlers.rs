use crate::errors::AppError;
use crate::export;
use crate::models::*;
use crate::payments::{Entitlement, EntitlementGate, PaymentVerifier, SessionLedger};
use crate::search::{SearchOutcome, SearchService};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
pub struct AppState {
    /// The resolution orchestrator (registry + fuzzy + officer client).
    pub search: SearchService,
    /// Entitlement check: free when no payment provider is configured,
    /// payment-gated otherwise.
    pub gate: EntitlementGate,
    /// Public base URL used for checkout redirect targets.
    pub public_base_url: String,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "title-lookup-api",
            "version": "0.1.0"
        })),
    )
}

fn parse_request(search_type: &str, search_value: &str) -> Result<(SearchMode, String), AppError> {
    let value = search_value.trim().to_string();
    if value.is_empty() {
        return Err(AppError::BadRequest("Search value is required".to_string()));
    }
    let mode = SearchMode::parse(search_type)
        .ok_or_else(|| AppError::BadRequest("Invalid search type".to_string()))?;
    Ok((mode, value))
}

fn outcome_response(mode: SearchMode, outcome: SearchOutcome) -> SearchResponse {
    SearchResponse {
        success: true,
        count: outcome.results.len(),
        results: outcome.results,
        suggestions: outcome.suggestions,
        directors_found: outcome.directors_found,
        error: None,
        message: outcome.message,
        payment_required: None,
        price_pence: None,
        search_type: Some(mode.as_str().to_string()),
    }
}

/// Whether a search error should propagate to the boundary layer as a 5xx
/// instead of a structured `success: false` payload. Database failures have
/// no retry logic in the core; the boundary maps them.
fn is_boundary_error(err: &AppError) -> bool {
    matches!(
        err,
        AppError::DatabaseError(_) | AppError::InternalError(_) | AppError::WithContext { .. }
    )
}

/// POST /api/search
///
/// Runs one search after the entitlement gate grants (and consumes) one
/// search credit. Upstream officer-registry failures come back as a
/// structured `success: false` body; database failures propagate as 5xx.
pub async fn api_search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    tracing::info!(
        "POST /api/search - type: {}, value: {}",
        req.search_type,
        req.search_value
    );

    let (mode, value) = parse_request(&req.search_type, &req.search_value)?;

    match state
        .gate
        .authorize(mode, &value, req.session_id.as_deref())
        .await?
    {
        Entitlement::Granted => {}
        Entitlement::Refused(reason) => {
            return Ok(Json(SearchResponse {
                success: false,
                results: Vec::new(),
                count: 0,
                suggestions: Vec::new(),
                directors_found: None,
                error: Some(reason),
                message: None,
                payment_required: Some(true),
                price_pence: Some(mode.price_pence()),
                search_type: Some(mode.as_str().to_string()),
            }));
        }
    }

    match state.search.run(mode, &value).await {
        Ok(outcome) => Ok(Json(outcome_response(mode, outcome))),
        Err(e) if is_boundary_error(&e) => Err(e),
        Err(e) => {
            tracing::warn!("Search failed for '{}': {}", value, e);
            Ok(Json(SearchResponse {
                success: false,
                results: Vec::new(),
                count: 0,
                suggestions: Vec::new(),
                directors_found: (mode == SearchMode::Director).then(Vec::new),
                error: Some(e.user_message()),
                message: None,
                payment_required: None,
                price_pence: None,
                search_type: Some(mode.as_str().to_string()),
            }))
        }
    }
}

/// POST /api/export/csv
///
/// Re-runs the search and renders the result set as a CSV attachment with
/// the fixed column order. No new search logic.
pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Result<Response, AppError> {
    let (mode, value) = parse_request(&req.search_type, &req.search_value)?;

    let outcome = state.search.run(mode, &value).await?;
    if outcome.results.is_empty() {
        return Err(AppError::BadRequest("No results to export".to_string()));
    }

    let body = export::to_csv(&outcome.results)?;
    let filename = export::csv_filename(mode.as_str(), &value);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        body,
    )
        .into_response())
}

/// POST /api/export/json
///
/// Re-runs the search and renders the full record set (plus directors_found
/// for director mode) as JSON.
pub async fn export_json(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (mode, value) = parse_request(&req.search_type, &req.search_value)?;

    let outcome = state.search.run(mode, &value).await?;

    Ok(Json(export::to_json(
        mode.as_str(),
        &value,
        &outcome.results,
        outcome.directors_found.as_deref(),
    )))
}

/// POST /api/create-checkout
///
/// Creates a provider checkout session for one search and records it as
/// pending in the payment ledger. Rejected when no provider is configured.
pub async fn create_checkout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let (mode, value) = parse_request(&req.search_type, &req.search_value)?;

    let (ledger, verifier) = match &state.gate {
        EntitlementGate::Free => {
            return Err(AppError::Configuration(
                "Payment system not configured. Please contact support.".to_string(),
            ))
        }
        EntitlementGate::Gated { ledger, verifier } => (ledger, verifier),
    };

    let session = verifier
        .create_session(mode, &value, &state.public_base_url)
        .await?;

    ledger.record_pending(&session.id, mode, &value).await?;

    Ok(Json(CheckoutResponse {
        success: true,
        checkout_url: session.url,
        session_id: session.id,
    }))
}
