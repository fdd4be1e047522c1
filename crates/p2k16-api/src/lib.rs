//! JSON REST API for p2k16.
//!
//! Exposes an axum [`Router`] backed by any [`p2k16_core::store::Store`].
//! Tool checkout and checkin go through the [`ToolLifecycle`] manager; this
//! crate only authenticates the caller, decodes the request and renders the
//! result. TLS and request tracing are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", p2k16_api::api_router(state))
//! ```

pub mod admin;
pub mod auth;
pub mod badges;
pub mod error;
pub mod memberships;
pub mod tools;

use std::sync::Arc;

use axum::{
  Json, Router,
  routing::{delete, get, post, put},
};
use chrono::Duration;
use p2k16_core::{event::NewEvent, lifecycle::ToolLifecycle, store::Store};
use serde_json::{Value, json};
use tracing::warn;

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Settings the API needs at request time.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  /// Members of the circle with this name are administrators.
  pub admin_circle: String,
  /// How long a session lives after its last use.
  pub session_ttl:  Duration,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      admin_circle: "admin".to_owned(),
      session_ttl:  Duration::hours(24),
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:     Arc<S>,
  pub lifecycle: ToolLifecycle<S>,
  pub config:    Arc<ApiConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      lifecycle: self.lifecycle.clone(),
      config:    Arc::clone(&self.config),
    }
  }
}

impl<S: Store> AppState<S> {
  pub fn new(store: Arc<S>, config: ApiConfig) -> Self {
    Self {
      lifecycle: ToolLifecycle::new(Arc::clone(&store)),
      store,
      config: Arc::new(config),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: Store + 'static,
{
  Router::new()
    // Identity
    .route("/auth/login", post(auth::login::<S>))
    .route("/auth/logout", post(auth::logout::<S>))
    .route("/auth/whoami", get(auth::whoami))
    // Tools
    .route("/tools", get(tools::list::<S>))
    .route("/tools/checkouts", get(tools::open_checkouts::<S>))
    .route("/tools/checkout", post(tools::check_out::<S>))
    .route("/tools/checkin", post(tools::check_in::<S>))
    .route("/tools/{id}", get(tools::get_one::<S>))
    .route("/tools/{id}/history", get(tools::history::<S>))
    // Badges
    .route("/badges", get(badges::list::<S>).post(badges::create::<S>))
    .route("/badges/{id}/award", post(badges::award::<S>))
    .route("/account-badges", get(badges::mine::<S>))
    .route("/account-badges/{id}", delete(badges::remove::<S>))
    // Memberships
    .route("/memberships/me", get(memberships::mine::<S>))
    // Administration
    .route(
      "/admin/tools",
      get(admin::list_tools::<S>).post(admin::create_tool::<S>),
    )
    .route(
      "/admin/accounts",
      get(admin::list_accounts::<S>).post(admin::create_account::<S>),
    )
    .route(
      "/admin/circles",
      get(admin::list_circles::<S>).post(admin::create_circle::<S>),
    )
    .route("/admin/circles/{id}/members", post(admin::add_member::<S>))
    .route(
      "/admin/accounts/{id}/membership",
      put(memberships::set::<S>),
    )
    .route("/admin/members/active", get(memberships::active::<S>))
    .route("/admin/events", get(admin::list_events::<S>))
    // Liveness
    .route("/health", get(health))
    .with_state(state)
}

/// Record an audit event; a failure is logged and otherwise ignored.
pub(crate) async fn audit<S: Store>(store: &S, event: NewEvent) {
  let key = event.key.clone();
  if let Err(e) = store.record_event(event).await {
    warn!(error = %e, %key, "failed to record audit event");
  }
}

/// `GET /health`
async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

#[cfg(test)]
mod tests;
