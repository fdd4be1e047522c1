//! Handlers for `/admin` endpoints. Every route requires admin rights.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`/`POST` | `/admin/tools` | Body: `{"name":"…","description":null,"circle_id":null}` |
//! | `GET`/`POST` | `/admin/accounts` | Body adds a plaintext `password` |
//! | `GET`/`POST` | `/admin/circles` | Body: `{"name":"…","description":"…"}` |
//! | `POST` | `/admin/circles/:id/members` | Body: `{"account_id":7,"comment":null}` |
//! | `GET`  | `/admin/events` | Optional `?limit=` (default 50) |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use p2k16_core::{
  Entity,
  account::{Account, NewAccount},
  circle::{Circle, NewCircle},
  event::Event,
  store::Store,
  tool::{NewTool, Tool},
};
use serde::Deserialize;
use tracing::info;

use crate::{
  AppState,
  auth::{Admin, hash_password},
  error::ApiError,
};

const DEFAULT_EVENTS: usize = 50;
const MAX_EVENTS: usize = 500;

fn require(field: &str, value: &str) -> Result<(), ApiError> {
  if value.trim().is_empty() {
    return Err(ApiError::BadRequest(format!("{field} must not be empty")));
  }
  Ok(())
}

// ─── Tools ───────────────────────────────────────────────────────────────────

/// `GET /admin/tools`
pub async fn list_tools<S>(
  State(state): State<AppState<S>>,
  _: Admin,
) -> Result<Json<Vec<Tool>>, ApiError>
where
  S: Store + 'static,
{
  let tools = state.store.list_tools().await.map_err(ApiError::store)?;
  Ok(Json(tools))
}

/// `POST /admin/tools`
pub async fn create_tool<S>(
  State(state): State<AppState<S>>,
  Admin(admin): Admin,
  Json(body): Json<NewTool>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  require("name", &body.name)?;

  if let Some(circle_id) = body.circle_id {
    state
      .store
      .find_circle(circle_id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| {
        ApiError::BadRequest(format!("{} {circle_id} does not exist", Entity::Circle))
      })?;
  }

  let tool = state.store.add_tool(body).await.map_err(ApiError::store)?;
  info!(tool_id = tool.id, name = %tool.name, by = admin.account_id, "tool created");
  Ok((StatusCode::CREATED, Json(tool)))
}

// ─── Accounts ────────────────────────────────────────────────────────────────

/// `GET /admin/accounts`
pub async fn list_accounts<S>(
  State(state): State<AppState<S>>,
  _: Admin,
) -> Result<Json<Vec<Account>>, ApiError>
where
  S: Store + 'static,
{
  let accounts = state.store.list_accounts().await.map_err(ApiError::store)?;
  Ok(Json(accounts))
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountBody {
  pub username: String,
  pub email:    String,
  pub password: String,
  #[serde(default)]
  pub name:     Option<String>,
  #[serde(default)]
  pub phone:    Option<String>,
}

/// `POST /admin/accounts`
pub async fn create_account<S>(
  State(state): State<AppState<S>>,
  Admin(admin): Admin,
  Json(body): Json<CreateAccountBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  require("username", &body.username)?;
  require("email", &body.email)?;
  require("password", &body.password)?;

  let taken = state
    .store
    .find_account_by_username(&body.username)
    .await
    .map_err(ApiError::store)?;
  if taken.is_some() {
    return Err(ApiError::Conflict(format!(
      "username '{}' is already taken",
      body.username
    )));
  }

  let password_hash = hash_password(&body.password)
    .map_err(|e| ApiError::Store(format!("cannot hash password: {e}").into()))?;

  let account = state
    .store
    .add_account(
      NewAccount {
        username: body.username,
        email:    body.email,
        name:     body.name,
        phone:    body.phone,
      },
      password_hash,
    )
    .await
    .map_err(ApiError::store)?;

  info!(
    account_id = account.id,
    username = %account.username,
    by = admin.account_id,
    "account created"
  );
  Ok((StatusCode::CREATED, Json(account)))
}

// ─── Circles ─────────────────────────────────────────────────────────────────

/// `GET /admin/circles`
pub async fn list_circles<S>(
  State(state): State<AppState<S>>,
  _: Admin,
) -> Result<Json<Vec<Circle>>, ApiError>
where
  S: Store + 'static,
{
  let circles = state.store.list_circles().await.map_err(ApiError::store)?;
  Ok(Json(circles))
}

/// `POST /admin/circles`
pub async fn create_circle<S>(
  State(state): State<AppState<S>>,
  Admin(admin): Admin,
  Json(body): Json<NewCircle>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  require("name", &body.name)?;

  let existing = state.store.list_circles().await.map_err(ApiError::store)?;
  if existing.iter().any(|c| c.name == body.name) {
    return Err(ApiError::Conflict(format!(
      "circle '{}' already exists",
      body.name
    )));
  }

  let circle = state.store.add_circle(body).await.map_err(ApiError::store)?;
  info!(circle_id = circle.id, name = %circle.name, by = admin.account_id, "circle created");
  Ok((StatusCode::CREATED, Json(circle)))
}

#[derive(Debug, Deserialize)]
pub struct AddMemberBody {
  pub account_id: i64,
  #[serde(default)]
  pub comment:    Option<String>,
}

/// `POST /admin/circles/:id/members`
pub async fn add_member<S>(
  State(state): State<AppState<S>>,
  Admin(admin): Admin,
  Path(circle_id): Path<i64>,
  Json(body): Json<AddMemberBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  state
    .store
    .find_circle(circle_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("{} {circle_id} not found", Entity::Circle))
    })?;
  state
    .store
    .find_account(body.account_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("{} {} not found", Entity::Account, body.account_id))
    })?;

  let member = state
    .store
    .add_circle_member(circle_id, body.account_id, admin.account_id, body.comment)
    .await
    .map_err(ApiError::store)?;

  info!(
    circle_id,
    account_id = body.account_id,
    by = admin.account_id,
    "circle member added"
  );
  Ok((StatusCode::CREATED, Json(member)))
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EventParams {
  pub limit: Option<usize>,
}

/// `GET /admin/events[?limit=<n>]`
pub async fn list_events<S>(
  State(state): State<AppState<S>>,
  _: Admin,
  Query(params): Query<EventParams>,
) -> Result<Json<Vec<Event>>, ApiError>
where
  S: Store + 'static,
{
  let limit = params.limit.unwrap_or(DEFAULT_EVENTS).clamp(1, MAX_EVENTS);
  let events = state.store.list_events(limit).await.map_err(ApiError::store)?;
  Ok(Json(events))
}
