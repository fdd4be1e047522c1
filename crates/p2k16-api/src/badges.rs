//! Handlers for badge endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/badges` | Every badge description, by title |
//! | `POST`   | `/badges` | Body: `{"title":"…","certification_circle_id":null,…}` |
//! | `POST`   | `/badges/:id/award` | Body: `{"account_id":7}`; `{}` for self |
//! | `GET`    | `/account-badges` | Badges held by the caller |
//! | `DELETE` | `/account-badges/:id` | Holder or admin only |
//!
//! Creating a badge without a certification circle also awards it to the
//! creator. Only administrators may create certified badges.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use p2k16_core::{
  Entity,
  badge::{AccountBadge, BadgeAward, BadgeDescription, NewBadge},
  event::{DOMAIN_BADGE, NewEvent},
  store::Store,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{AppState, audit, auth::Authenticated, error::ApiError};

/// `GET /badges`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _: Authenticated,
) -> Result<Json<Vec<BadgeDescription>>, ApiError>
where
  S: Store + 'static,
{
  let badges = state.store.list_badges().await.map_err(ApiError::store)?;
  Ok(Json(badges))
}

/// `POST /badges`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  Json(body): Json<NewBadge>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  if body.title.trim().is_empty() {
    return Err(ApiError::BadRequest("title must not be empty".to_owned()));
  }

  if let Some(circle_id) = body.certification_circle_id {
    if !principal.is_admin {
      return Err(ApiError::Forbidden(
        "only administrators may create certified badges".to_owned(),
      ));
    }
    state
      .store
      .find_circle(circle_id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| {
        ApiError::BadRequest(format!("{} {circle_id} does not exist", Entity::Circle))
      })?;
  }

  let taken = state
    .store
    .find_badge_by_title(&body.title)
    .await
    .map_err(ApiError::store)?;
  if taken.is_some() {
    return Err(ApiError::Conflict(format!(
      "badge '{}' already exists",
      body.title
    )));
  }

  let badge = state
    .store
    .add_badge(body, principal.account_id)
    .await
    .map_err(ApiError::store)?;
  info!(badge_id = badge.id, title = %badge.title, by = principal.account_id, "badge created");

  if badge.certification_circle_id.is_none() {
    state
      .store
      .award_badge(badge.id, principal.account_id, principal.account_id)
      .await
      .map_err(ApiError::store)?;
  }

  audit(
    state.store.as_ref(),
    NewEvent::new(DOMAIN_BADGE, "create")
      .by(principal.account_id)
      .about(badge.id)
      .text(badge.title.clone()),
  )
  .await;

  Ok((StatusCode::CREATED, Json(badge)))
}

#[derive(Debug, Deserialize)]
pub struct AwardBody {
  #[serde(default)]
  pub account_id: Option<i64>,
}

/// `POST /badges/:id/award`
///
/// 201 with the new award, or 200 with the existing one if the account
/// already holds the badge.
pub async fn award<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  Path(badge_id): Path<i64>,
  Json(body): Json<AwardBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let recipient = body.account_id.unwrap_or(principal.account_id);

  let badge = state
    .store
    .find_badge(badge_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("{} {badge_id} not found", Entity::Badge))
    })?;
  state
    .store
    .find_account(recipient)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("{} {recipient} not found", Entity::Account))
    })?;

  let certifier = match badge.certification_circle_id {
    Some(circle_id) => state
      .store
      .in_circle(principal.account_id, circle_id)
      .await
      .map_err(ApiError::store)?,
    None => false,
  };
  if !badge.may_award(&principal, recipient, certifier) {
    warn!(
      badge_id,
      recipient,
      by = principal.account_id,
      "badge award refused"
    );
    return Err(ApiError::Forbidden(format!(
      "account {} may not award '{}' to account {recipient}",
      principal.account_id, badge.title
    )));
  }

  let outcome = state
    .store
    .award_badge(badge_id, recipient, principal.account_id)
    .await
    .map_err(ApiError::store)?;

  let status = match &outcome {
    BadgeAward::Awarded(held) => {
      info!(badge_id, recipient, by = principal.account_id, "badge awarded");
      audit(
        state.store.as_ref(),
        NewEvent::new(DOMAIN_BADGE, "award")
          .by(principal.account_id)
          .about(held.id)
          .text(badge.title.clone()),
      )
      .await;
      StatusCode::CREATED
    }
    BadgeAward::AlreadyHeld(_) => StatusCode::OK,
  };

  Ok((status, Json(outcome.into_badge())))
}

/// `GET /account-badges`
pub async fn mine<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
) -> Result<Json<Vec<AccountBadge>>, ApiError>
where
  S: Store + 'static,
{
  let held = state
    .store
    .list_account_badges(principal.account_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(held))
}

/// `DELETE /account-badges/:id`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: Store + 'static,
{
  let held = state
    .store
    .find_account_badge(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("{} {id} not found", Entity::AccountBadge))
    })?;

  if held.account_id != principal.account_id && !principal.is_admin {
    return Err(ApiError::Forbidden(format!(
      "account {} may not remove {} {id}",
      principal.account_id,
      Entity::AccountBadge
    )));
  }

  state
    .store
    .remove_account_badge(id)
    .await
    .map_err(ApiError::store)?;
  info!(account_badge_id = id, by = principal.account_id, "badge removed");

  audit(
    state.store.as_ref(),
    NewEvent::new(DOMAIN_BADGE, "remove")
      .by(principal.account_id)
      .about(id)
      .text(held.title),
  )
  .await;

  Ok(StatusCode::NO_CONTENT)
}
