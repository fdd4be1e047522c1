//! Async HTTP client wrapping the p2k16 JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use p2k16_core::{
  account::Principal,
  badge::AccountBadge,
  membership::MembershipStatus,
  tool::{Checkout, OpenCheckout, ToolStatus},
};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use tracing::debug;

/// Connection settings for the p2k16 API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

/// Body of every non-2xx API response.
#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

/// Async HTTP client for the p2k16 JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  /// Send `req` and decode a JSON body, turning an API error body into the
  /// error message.
  async fn send<T: DeserializeOwned>(
    &self,
    req: RequestBuilder,
    what: &str,
  ) -> Result<T> {
    debug!(request = what, "sending");
    let resp = self
      .auth(req)
      .send()
      .await
      .with_context(|| format!("{what} failed"))?;

    let status = resp.status();
    if !status.is_success() {
      let message = match resp.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
      };
      return Err(anyhow!("{message} ({what} → {status})"));
    }
    resp
      .json()
      .await
      .with_context(|| format!("deserialising {what}"))
  }

  // ── Identity ──────────────────────────────────────────────────────────────

  /// `GET /api/auth/whoami`
  pub async fn whoami(&self) -> Result<Principal> {
    self
      .send(self.client.get(self.url("/auth/whoami")), "GET /auth/whoami")
      .await
  }

  // ── Tools ─────────────────────────────────────────────────────────────────

  /// `GET /api/tools`
  pub async fn list_tools(&self) -> Result<Vec<ToolStatus>> {
    self
      .send(self.client.get(self.url("/tools")), "GET /tools")
      .await
  }

  /// `GET /api/tools/<id>`
  pub async fn tool(&self, id: i64) -> Result<ToolStatus> {
    self
      .send(self.client.get(self.url(&format!("/tools/{id}"))), "GET /tools/:id")
      .await
  }

  /// `GET /api/tools/<id>/history?limit=<n>`
  pub async fn history(&self, id: i64, limit: usize) -> Result<Vec<Checkout>> {
    self
      .send(
        self
          .client
          .get(self.url(&format!("/tools/{id}/history")))
          .query(&[("limit", limit)]),
        "GET /tools/:id/history",
      )
      .await
  }

  /// `GET /api/tools/checkouts`
  pub async fn open_checkouts(&self) -> Result<Vec<OpenCheckout>> {
    self
      .send(
        self.client.get(self.url("/tools/checkouts")),
        "GET /tools/checkouts",
      )
      .await
  }

  // ── Transitions ───────────────────────────────────────────────────────────

  /// `POST /api/tools/checkout`
  pub async fn check_out(&self, tool_id: i64) -> Result<Checkout> {
    self
      .send(
        self
          .client
          .post(self.url("/tools/checkout"))
          .json(&json!({ "tool_id": tool_id })),
        "POST /tools/checkout",
      )
      .await
  }

  /// `POST /api/tools/checkin`
  pub async fn check_in(&self, checkout_id: i64) -> Result<Checkout> {
    self
      .send(
        self
          .client
          .post(self.url("/tools/checkin"))
          .json(&json!({ "checkout_id": checkout_id })),
        "POST /tools/checkin",
      )
      .await
  }

  // ── Badges and membership ─────────────────────────────────────────────────

  /// `GET /api/account-badges`
  pub async fn my_badges(&self) -> Result<Vec<AccountBadge>> {
    self
      .send(self.client.get(self.url("/account-badges")), "GET /account-badges")
      .await
  }

  /// `POST /api/badges/<id>/award`
  pub async fn award_badge(
    &self,
    badge_id: i64,
    account_id: Option<i64>,
  ) -> Result<AccountBadge> {
    self
      .send(
        self
          .client
          .post(self.url(&format!("/badges/{badge_id}/award")))
          .json(&json!({ "account_id": account_id })),
        "POST /badges/:id/award",
      )
      .await
  }

  /// `GET /api/memberships/me`
  pub async fn membership(&self) -> Result<MembershipStatus> {
    self
      .send(self.client.get(self.url("/memberships/me")), "GET /memberships/me")
      .await
  }
}
