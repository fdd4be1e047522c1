//! Identity: sessions, credential checks and the principal extractors.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/login` | Body: `{"username":"…","password":"…"}` |
//! | `POST` | `/auth/logout` | Ends the presented session; always clears the cookie |
//! | `GET`  | `/auth/whoami` | The resolved principal |
//!
//! A request authenticates with a session token, sent either as
//! `Authorization: Bearer <token>` or in the `p2k16-session` cookie, or with
//! HTTP Basic credentials. A token that does not resolve falls through to
//! Basic credentials on the same request. Only the SHA-256 digest of a token
//! is stored.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  Json,
  extract::{FromRequestParts, State},
  http::{HeaderMap, StatusCode, header, request::Parts},
  response::IntoResponse,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{DateTime, Utc};
use p2k16_core::{
  account::{Account, Principal},
  event::{DOMAIN_AUTH, NewEvent},
  session::Session,
  store::Store,
};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::{AppState, audit, error::ApiError};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "p2k16-session";

// ─── Tokens and passwords ────────────────────────────────────────────────────

/// A fresh random session token: 32 bytes, hex encoded.
pub fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// The value stored in place of a token.
pub fn hash_token(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

/// Produce an argon2 PHC string for `password`.
pub fn hash_password(
  password: &str,
) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)?
      .to_string(),
  )
}

/// Check `password` against the stored hash for `username`.
async fn verify_credentials<S: Store>(
  store: &S,
  username: &str,
  password: &str,
) -> Result<Account, ApiError> {
  let (account, hash) = store
    .find_credentials(username)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized)?;

  let parsed_hash =
    PasswordHash::new(&hash).map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Ok(account)
}

/// Build the principal for `account`, resolving admin rights from the
/// configured admin circle.
async fn principal_for<S: Store>(
  state: &AppState<S>,
  account: &Account,
) -> Result<Principal, ApiError> {
  let is_admin = state
    .store
    .is_circle_member(account.id, &state.config.admin_circle)
    .await
    .map_err(ApiError::store)?;
  Ok(Principal {
    account_id: account.id,
    username: account.username.clone(),
    is_admin,
  })
}

/// When a session used at `now` expires.
fn expiry_from<S>(
  state: &AppState<S>,
  now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ApiError> {
  now
    .checked_add_signed(state.config.session_ttl)
    .ok_or_else(|| ApiError::Store("session lifetime out of range".into()))
}

// ─── Header parsing ──────────────────────────────────────────────────────────

/// The session token from a bearer header or the session cookie.
fn session_token(headers: &HeaderMap) -> Option<String> {
  let bearer = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "));
  if let Some(token) = bearer {
    return Some(token.trim().to_owned());
  }

  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, _)| *name == SESSION_COOKIE)
    .map(|(_, value)| value.to_owned())
}

/// HTTP Basic credentials, if the request carries any.
fn basic_credentials(
  headers: &HeaderMap,
) -> Result<Option<(String, String)>, ApiError> {
  let Some(encoded) = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Basic "))
  else {
    return Ok(None);
  };

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;
  let (username, password) =
    creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  Ok(Some((username.to_owned(), password.to_owned())))
}

/// Look up a session token. `None` if it is unknown or expired.
///
/// A valid session has its expiry moved forward by the session lifetime.
async fn resolve_session<S: Store>(
  token: &str,
  state: &AppState<S>,
) -> Result<Option<Principal>, ApiError> {
  let now = Utc::now();
  let hash = hash_token(token);
  let Some(session) = state
    .store
    .find_session(&hash, now)
    .await
    .map_err(ApiError::store)?
  else {
    return Ok(None);
  };

  state
    .store
    .extend_session(&hash, expiry_from(state, now)?)
    .await
    .map_err(ApiError::store)?;

  let Some(account) = state
    .store
    .find_account(session.account_id)
    .await
    .map_err(ApiError::store)?
  else {
    return Ok(None);
  };
  Ok(Some(principal_for(state, &account).await?))
}

/// Resolve the acting principal from a request's headers.
///
/// A session token is tried first. If it does not resolve, HTTP Basic
/// credentials on the same request are tried next.
async fn resolve<S: Store>(
  headers: &HeaderMap,
  state: &AppState<S>,
) -> Result<Principal, ApiError> {
  if let Some(token) = session_token(headers) {
    if let Some(principal) = resolve_session(&token, state).await? {
      return Ok(principal);
    }
    debug!("session token rejected");
  }

  let (username, password) =
    basic_credentials(headers)?.ok_or(ApiError::Unauthorized)?;
  let account = verify_credentials(state.store.as_ref(), &username, &password)
    .await
    .inspect_err(|_| warn!(%username, "basic auth rejected"))?;
  principal_for(state, &account).await
}

// ─── Extractors ──────────────────────────────────────────────────────────────

/// Present in a handler means the request carried valid credentials.
pub struct Authenticated(pub Principal);

/// Like [`Authenticated`], but additionally requires admin rights.
pub struct Admin(pub Principal);

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: Store + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(Authenticated(resolve(&parts.headers, state).await?))
  }
}

impl<S> FromRequestParts<AppState<S>> for Admin
where
  S: Store + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let principal = resolve(&parts.headers, state).await?;
    if !principal.is_admin {
      warn!(
        account_id = principal.account_id,
        path = %parts.uri.path(),
        "admin route refused"
      );
      return Err(ApiError::Forbidden(
        "administrator rights required".to_owned(),
      ));
    }
    Ok(Admin(principal))
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
  pub token:      String,
  pub expires_at: DateTime<Utc>,
  pub principal:  Principal,
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let account =
    match verify_credentials(state.store.as_ref(), &body.username, &body.password)
      .await
    {
      Ok(account) => account,
      Err(e) => {
        warn!(username = %body.username, "login failed");
        return Err(e);
      }
    };

  let token = new_token();
  let now = Utc::now();
  let session = Session {
    token_hash: hash_token(&token),
    account_id: account.id,
    created_at: now,
    expires_at: expiry_from(&state, now)?,
  };
  let expires_at = session.expires_at;
  state
    .store
    .create_session(session)
    .await
    .map_err(ApiError::store)?;

  let principal = principal_for(&state, &account).await?;
  info!(account_id = account.id, username = %account.username, "logged in");

  audit(
    state.store.as_ref(),
    NewEvent::new(DOMAIN_AUTH, "login").by(account.id),
  )
  .await;

  let cookie = format!(
    "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
    state.config.session_ttl.num_seconds()
  );

  Ok((
    [(header::SET_COOKIE, cookie)],
    Json(LoginResponse {
      token,
      expires_at,
      principal,
    }),
  ))
}

/// `POST /auth/logout`: ends the presented session, if any.
///
/// Needs no valid credentials, so a client holding an expired cookie still
/// gets it cleared.
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  if let Some(token) = session_token(&headers) {
    let ended = state
      .store
      .delete_session(&hash_token(&token))
      .await
      .map_err(ApiError::store)?;
    if ended {
      info!("logged out");
    }
  }

  let cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0");
  Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]))
}

/// `GET /auth/whoami`
pub async fn whoami(Authenticated(principal): Authenticated) -> Json<Principal> {
  Json(principal)
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn headers(name: header::HeaderName, value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(name, HeaderValue::from_str(value).unwrap());
    h
  }

  #[test]
  fn token_hash_is_stable_hex() {
    let token = new_token();
    assert_eq!(token.len(), 64);
    assert_eq!(hash_token(&token), hash_token(&token));
    assert_ne!(hash_token(&token), token);
    assert_ne!(new_token(), token);
  }

  #[test]
  fn bearer_token_is_read() {
    let h = headers(header::AUTHORIZATION, "Bearer abc123");
    assert_eq!(session_token(&h).as_deref(), Some("abc123"));
  }

  #[test]
  fn cookie_token_is_read() {
    let h = headers(header::COOKIE, "theme=dark; p2k16-session=feed; x=1");
    assert_eq!(session_token(&h).as_deref(), Some("feed"));
  }

  #[test]
  fn basic_credentials_decode() {
    let h = headers(
      header::AUTHORIZATION,
      &format!("Basic {}", B64.encode("alice:s3cret:x")),
    );
    assert_eq!(
      basic_credentials(&h).unwrap(),
      Some(("alice".to_owned(), "s3cret:x".to_owned()))
    );
    assert_eq!(session_token(&h), None);
  }

  #[test]
  fn malformed_basic_is_rejected() {
    let h = headers(header::AUTHORIZATION, "Basic !!!not-base64!!!");
    assert!(matches!(basic_credentials(&h), Err(ApiError::Unauthorized)));
    assert!(basic_credentials(&HeaderMap::new()).unwrap().is_none());
  }

  #[test]
  fn password_hash_verifies() {
    let hash = hash_password("hunter2").unwrap();
    let parsed = PasswordHash::new(&hash).unwrap();
    assert!(
      Argon2::default()
        .verify_password(b"hunter2", &parsed)
        .is_ok()
    );
    assert!(Argon2::default().verify_password(b"wrong", &parsed).is_err());
  }
}
