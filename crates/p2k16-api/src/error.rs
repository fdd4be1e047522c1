//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("unauthorized")]
  Unauthorized,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Wrap a store backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

impl From<p2k16_core::Error> for ApiError {
  fn from(e: p2k16_core::Error) -> Self {
    use p2k16_core::Error as E;
    match e {
      E::NotFound(..) => Self::NotFound(e.to_string()),
      E::Conflict {
        ref tool_name,
        ref held_by,
        ..
      } => Self::Conflict(format!(
        "Tool '{tool_name}' is already checked out to {}",
        held_by.display_name
      )),
      E::InvalidState(_) => Self::Conflict(e.to_string()),
      E::Forbidden { .. } => Self::Forbidden(e.to_string()),
      E::Persistence(inner) => Self::Store(inner),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Unauthorized => {
        (StatusCode::UNAUTHORIZED, "authentication required".to_owned())
      }
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::Store(e) => {
        error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"p2k16\""),
      );
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use p2k16_core::{Entity, Error, account::AccountRef};

  use super::*;

  #[test]
  fn conflict_names_tool_and_holder() {
    let err: ApiError = Error::Conflict {
      tool_id:     3,
      tool_name:   "3D Printer".into(),
      checkout_id: 11,
      held_by:     AccountRef {
        id:           7,
        display_name: "alice".into(),
      },
    }
    .into();
    assert!(matches!(
      err,
      ApiError::Conflict(ref m) if m == "Tool '3D Printer' is already checked out to alice"
    ));
    assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
  }

  #[test]
  fn lifecycle_errors_map_to_statuses() {
    let cases = [
      (Error::NotFound(Entity::Tool, 1), StatusCode::NOT_FOUND),
      (Error::InvalidState(2), StatusCode::CONFLICT),
      (
        Error::Forbidden {
          checkout_id: 2,
          account_id:  9,
        },
        StatusCode::FORBIDDEN,
      ),
      (
        Error::persistence(std::io::Error::other("disk gone")),
        StatusCode::INTERNAL_SERVER_ERROR,
      ),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).into_response().status(), status);
    }
  }

  #[test]
  fn unauthorized_asks_for_credentials() {
    let res = ApiError::Unauthorized.into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));
  }
}
