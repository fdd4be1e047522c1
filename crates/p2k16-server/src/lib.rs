//! HTTP server assembly for p2k16.
//!
//! Wires the JSON API from `p2k16-api` under `/api`, adds request tracing, and
//! owns the startup and background chores: seeding the admin circle and
//! account, and purging expired sessions.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, ensure};
use axum::Router;
use chrono::{TimeDelta, Utc};
use p2k16_api::{ApiConfig, AppState, api_router};
use p2k16_core::{
  account::NewAccount,
  circle::{Circle, NewCircle},
  store::Store,
};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `P2K16_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  pub store_path:        PathBuf,
  /// Members of this circle are administrators.
  #[serde(default = "default_admin_circle")]
  pub admin_circle:      String,
  #[serde(default = "default_session_ttl_hours")]
  pub session_ttl_hours: i64,
  /// Account created and made admin at startup if it does not exist yet.
  #[serde(default)]
  pub bootstrap_admin:   Option<BootstrapAdmin>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapAdmin {
  pub username:      String,
  pub email:         String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 5000 }

fn default_admin_circle() -> String { "admin".to_owned() }

fn default_session_ttl_hours() -> i64 { 24 }

/// Longest accepted session lifetime: one year.
const MAX_SESSION_TTL_HOURS: i64 = 24 * 366;

impl ServerConfig {
  /// The request-time settings, after validating them.
  pub fn api_config(&self) -> anyhow::Result<ApiConfig> {
    let hours = self.session_ttl_hours;
    ensure!(
      (1..=MAX_SESSION_TTL_HOURS).contains(&hours),
      "session_ttl_hours must be between 1 and {MAX_SESSION_TTL_HOURS}, got {hours}"
    );
    let session_ttl = TimeDelta::try_hours(hours)
      .ok_or_else(|| anyhow!("session_ttl_hours {hours} is out of range"))?;

    Ok(ApiConfig {
      admin_circle: self.admin_circle.clone(),
      session_ttl,
    })
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router with the API nested under `/api`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: Store + 'static,
{
  Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}

// ─── Startup ──────────────────────────────────────────────────────────────────

/// Make sure the admin circle exists and, if configured, that the bootstrap
/// account exists and belongs to it. Safe to run on every start.
pub async fn bootstrap<S: Store>(
  store: &S,
  config: &ServerConfig,
) -> Result<Circle, S::Error> {
  let circle = match store
    .list_circles()
    .await?
    .into_iter()
    .find(|c| c.name == config.admin_circle)
  {
    Some(circle) => circle,
    None => {
      let circle = store
        .add_circle(NewCircle {
          name:        config.admin_circle.clone(),
          description: "Administrators".to_owned(),
        })
        .await?;
      info!(circle_id = circle.id, name = %circle.name, "created admin circle");
      circle
    }
  };

  let Some(admin) = &config.bootstrap_admin else {
    return Ok(circle);
  };

  let account = match store.find_account_by_username(&admin.username).await? {
    Some(account) => account,
    None => {
      let account = store
        .add_account(
          NewAccount {
            username: admin.username.clone(),
            email:    admin.email.clone(),
            name:     None,
            phone:    None,
          },
          admin.password_hash.clone(),
        )
        .await?;
      info!(account_id = account.id, username = %account.username, "created bootstrap admin");
      account
    }
  };

  store
    .add_circle_member(
      circle.id,
      account.id,
      account.id,
      Some("bootstrap".to_owned()),
    )
    .await?;

  Ok(circle)
}

// ─── Background chores ────────────────────────────────────────────────────────

/// Delete expired sessions every `every`, starting immediately.
pub fn spawn_session_purge<S>(store: Arc<S>, every: Duration) -> JoinHandle<()>
where
  S: Store + 'static,
{
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(every);
    loop {
      ticker.tick().await;
      match store.purge_expired_sessions(Utc::now()).await {
        Ok(0) => debug!("no expired sessions"),
        Ok(removed) => info!(removed, "purged expired sessions"),
        Err(e) => warn!(error = %e, "session purge failed"),
      }
    }
  })
}
