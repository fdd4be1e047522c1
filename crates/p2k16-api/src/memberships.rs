//! Handlers for membership endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/memberships/me` | The caller's membership status |
//! | `GET` | `/admin/members/active` | Paying members whose membership has started |
//! | `PUT` | `/admin/accounts/:id/membership` | Body: `{"start_membership":"2024-06-01","fee":50000}` |

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::Utc;
use p2k16_core::{
  Entity,
  account::Account,
  event::{DOMAIN_MEMBERSHIP, NewEvent},
  membership::{Membership, MembershipStatus, MembershipTerms},
  store::Store,
};
use tracing::info;

use crate::{
  AppState, audit,
  auth::{Admin, Authenticated},
  error::ApiError,
};

/// `GET /memberships/me`
pub async fn mine<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
) -> Result<Json<MembershipStatus>, ApiError>
where
  S: Store + 'static,
{
  let membership = state
    .store
    .find_membership(principal.account_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(MembershipStatus::of(
    principal.account_id,
    membership,
    Utc::now().date_naive(),
  )))
}

/// `GET /admin/members/active`
pub async fn active<S>(
  State(state): State<AppState<S>>,
  _: Admin,
) -> Result<Json<Vec<Account>>, ApiError>
where
  S: Store + 'static,
{
  let members = state
    .store
    .list_active_members(Utc::now().date_naive())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(members))
}

/// `PUT /admin/accounts/:id/membership`
pub async fn set<S>(
  State(state): State<AppState<S>>,
  Admin(admin): Admin,
  Path(account_id): Path<i64>,
  Json(terms): Json<MembershipTerms>,
) -> Result<Json<Membership>, ApiError>
where
  S: Store + 'static,
{
  if terms.fee < 0 {
    return Err(ApiError::BadRequest("fee must not be negative".to_owned()));
  }
  state
    .store
    .find_account(account_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("{} {account_id} not found", Entity::Account))
    })?;

  let membership = state
    .store
    .set_membership(account_id, terms)
    .await
    .map_err(ApiError::store)?;
  info!(
    account_id,
    fee = membership.fee,
    start = %membership.start_membership,
    by = admin.account_id,
    "membership set"
  );

  audit(
    state.store.as_ref(),
    NewEvent::new(DOMAIN_MEMBERSHIP, "set")
      .by(admin.account_id)
      .about(account_id),
  )
  .await;

  Ok(Json(membership))
}
