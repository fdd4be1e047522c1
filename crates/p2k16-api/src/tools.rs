//! Handlers for `/tools` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/tools` | Every tool with its current holder |
//! | `GET`  | `/tools/checkouts` | Open checkouts, newest first |
//! | `POST` | `/tools/checkout` | Body: `{"tool_id":3}`; 409 if already out |
//! | `POST` | `/tools/checkin` | Body: `{"checkout_id":11}` |
//! | `GET`  | `/tools/:id` | 404 if not found |
//! | `GET`  | `/tools/:id/history` | Optional `?limit=` (default 50) |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use p2k16_core::{
  Entity,
  store::Store,
  tool::{Checkout, OpenCheckout, ToolStatus},
};
use serde::Deserialize;

use crate::{AppState, auth::Authenticated, error::ApiError};

const DEFAULT_HISTORY: usize = 50;
const MAX_HISTORY: usize = 500;

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /tools`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _: Authenticated,
) -> Result<Json<Vec<ToolStatus>>, ApiError>
where
  S: Store + 'static,
{
  Ok(Json(state.lifecycle.list_tools_with_status().await?))
}

/// `GET /tools/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _: Authenticated,
  Path(id): Path<i64>,
) -> Result<Json<ToolStatus>, ApiError>
where
  S: Store + 'static,
{
  Ok(Json(state.lifecycle.tool_status(id).await?))
}

/// `GET /tools/checkouts`
pub async fn open_checkouts<S>(
  State(state): State<AppState<S>>,
  _: Authenticated,
) -> Result<Json<Vec<OpenCheckout>>, ApiError>
where
  S: Store + 'static,
{
  Ok(Json(state.lifecycle.list_open_checkouts().await?))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  pub limit: Option<usize>,
}

/// `GET /tools/:id/history[?limit=<n>]`
pub async fn history<S>(
  State(state): State<AppState<S>>,
  _: Authenticated,
  Path(id): Path<i64>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<Checkout>>, ApiError>
where
  S: Store + 'static,
{
  state
    .store
    .find_tool(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("{} {id} not found", Entity::Tool)))?;

  let limit = params.limit.unwrap_or(DEFAULT_HISTORY).clamp(1, MAX_HISTORY);
  let checkouts = state
    .store
    .checkout_history(id, limit)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(checkouts))
}

// ─── Transitions ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
  pub tool_id: i64,
}

/// `POST /tools/checkout`, body: `{"tool_id":3}`
pub async fn check_out<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  Json(body): Json<CheckoutBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let checkout = state.lifecycle.check_out(body.tool_id, &principal).await?;
  Ok((StatusCode::CREATED, Json(checkout)))
}

#[derive(Debug, Deserialize)]
pub struct CheckinBody {
  pub checkout_id: i64,
}

/// `POST /tools/checkin`, body: `{"checkout_id":11}`
pub async fn check_in<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  Json(body): Json<CheckinBody>,
) -> Result<Json<Checkout>, ApiError>
where
  S: Store + 'static,
{
  let checkout = state.lifecycle.check_in(body.checkout_id, &principal).await?;
  Ok(Json(checkout))
}
