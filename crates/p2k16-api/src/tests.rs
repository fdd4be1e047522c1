//! Router tests driving the API end to end against an in-memory store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Method, Request, StatusCode, header},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{Duration, NaiveDate, Utc};
use p2k16_core::{
  account::{Account, NewAccount},
  badge::NewBadge,
  circle::NewCircle,
  membership::MembershipTerms,
  session::Session,
  store::Store,
  tool::{NewTool, Tool},
};
use p2k16_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{
  ApiConfig, AppState, api_router,
  auth::{hash_password, hash_token, new_token},
};

struct Fixture {
  app:     Router,
  store:   Arc<SqliteStore>,
  alice:   Account,
  bob:     Account,
  root:    Account,
  printer: Tool,
}

async fn account(store: &SqliteStore, username: &str, hash: &str) -> Account {
  store
    .add_account(
      NewAccount {
        username: username.into(),
        email:    format!("{username}@bitraf.no"),
        name:     None,
        phone:    None,
      },
      hash.to_owned(),
    )
    .await
    .unwrap()
}

async fn fixture() -> Fixture {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let hash = hash_password("hunter2").unwrap();

  let alice = account(&store, "alice", &hash).await;
  let bob = account(&store, "bob", &hash).await;
  let root = account(&store, "root", &hash).await;

  let admin = store
    .add_circle(NewCircle {
      name:        "admin".into(),
      description: String::new(),
    })
    .await
    .unwrap();
  store
    .add_circle_member(admin.id, root.id, root.id, None)
    .await
    .unwrap();

  let printer = store
    .add_tool(NewTool {
      name:        "3D Printer".into(),
      description: None,
      circle_id:   None,
    })
    .await
    .unwrap();

  let app = api_router(AppState::new(Arc::clone(&store), ApiConfig::default()));

  Fixture {
    app,
    store,
    alice,
    bob,
    root,
    printer,
  }
}

/// Open a session for `account` directly in the store, skipping the password
/// check.
async fn token_for(store: &SqliteStore, account: &Account) -> String {
  let token = new_token();
  let now = Utc::now();
  store
    .create_session(Session {
      token_hash: hash_token(&token),
      account_id: account.id,
      created_at: now,
      expires_at: now + Duration::hours(1),
    })
    .await
    .unwrap();
  token
}

async fn send_request(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
  let res = app.clone().oneshot(req).await.unwrap();
  let status = res.status();
  let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
    .await
    .unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, json)
}

async fn call(
  app: &Router,
  method: Method,
  uri: &str,
  token: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut req = Request::builder().method(method).uri(uri);
  if let Some(token) = token {
    req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  let req = match body {
    Some(body) => req
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string())),
    None => req.body(Body::empty()),
  }
  .unwrap();
  send_request(app, req).await
}

// ─── Public routes ───────────────────────────────────────────────────────────

#[tokio::test]
async fn health_needs_no_credentials() {
  let f = fixture().await;
  let (status, body) = call(&f.app, Method::GET, "/health", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn tools_require_credentials() {
  let f = fixture().await;
  let (status, body) = call(&f.app, Method::GET, "/tools", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(body["error"].is_string());

  let (status, _) =
    call(&f.app, Method::GET, "/tools", Some("not-a-token"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ─── Identity ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_then_whoami_then_logout() {
  let f = fixture().await;

  let (status, _) = call(
    &f.app,
    Method::POST,
    "/auth/login",
    None,
    Some(json!({ "username": "alice", "password": "wrong" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, body) = call(
    &f.app,
    Method::POST,
    "/auth/login",
    None,
    Some(json!({ "username": "alice", "password": "hunter2" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let token = body["token"].as_str().unwrap().to_owned();
  assert_eq!(body["principal"]["username"], "alice");
  assert_eq!(body["principal"]["is_admin"], false);

  let (status, me) =
    call(&f.app, Method::GET, "/auth/whoami", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["account_id"], f.alice.id);

  let (status, _) =
    call(&f.app, Method::POST, "/auth/logout", Some(&token), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, _) =
    call(&f.app, Method::GET, "/auth/whoami", Some(&token), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_cookie_authenticates() {
  let f = fixture().await;
  let token = token_for(&f.store, &f.bob).await;

  let req = Request::builder()
    .uri("/auth/whoami")
    .header(header::COOKIE, format!("p2k16-session={token}"))
    .body(Body::empty())
    .unwrap();
  let (status, me) = send_request(&f.app, req).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["username"], "bob");
}

#[tokio::test]
async fn basic_credentials_authenticate() {
  let f = fixture().await;

  let req = Request::builder()
    .uri("/auth/whoami")
    .header(
      header::AUTHORIZATION,
      format!("Basic {}", B64.encode("root:hunter2")),
    )
    .body(Body::empty())
    .unwrap();
  let (status, me) = send_request(&f.app, req).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["username"], "root");
  assert_eq!(me["is_admin"], true);
}

#[tokio::test]
async fn expired_session_is_rejected() {
  let f = fixture().await;
  let token = new_token();
  let then = Utc::now() - Duration::hours(2);
  f.store
    .create_session(Session {
      token_hash: hash_token(&token),
      account_id: f.alice.id,
      created_at: then,
      expires_at: then + Duration::hours(1),
    })
    .await
    .unwrap();

  let (status, _) =
    call(&f.app, Method::GET, "/auth/whoami", Some(&token), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn using_a_session_extends_it() {
  let f = fixture().await;
  let token = token_for(&f.store, &f.alice).await;
  let before = f
    .store
    .find_session(&hash_token(&token), Utc::now())
    .await
    .unwrap()
    .unwrap();

  let (status, _) =
    call(&f.app, Method::GET, "/tools", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);

  let after = f
    .store
    .find_session(&hash_token(&token), Utc::now())
    .await
    .unwrap()
    .unwrap();
  assert!(after.expires_at > before.expires_at);
}

// ─── Checkout and checkin ────────────────────────────────────────────────────

#[tokio::test]
async fn checkout_conflict_and_checkin() {
  let f = fixture().await;
  let alice = token_for(&f.store, &f.alice).await;
  let bob = token_for(&f.store, &f.bob).await;
  let tool_id = f.printer.id;

  let (status, checkout) = call(
    &f.app,
    Method::POST,
    "/tools/checkout",
    Some(&alice),
    Some(json!({ "tool_id": tool_id })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(checkout["tool_id"], tool_id);
  assert_eq!(checkout["account_id"], f.alice.id);
  assert!(checkout["checkin_at"].is_null());
  let checkout_id = checkout["id"].as_i64().unwrap();

  let (status, body) = call(
    &f.app,
    Method::POST,
    "/tools/checkout",
    Some(&bob),
    Some(json!({ "tool_id": tool_id })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["error"], "Tool '3D Printer' is already checked out to alice");

  let (status, open) =
    call(&f.app, Method::GET, "/tools/checkouts", Some(&bob), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(open.as_array().unwrap().len(), 1);
  assert_eq!(open[0]["holder"]["display_name"], "alice");

  let (status, _) = call(
    &f.app,
    Method::POST,
    "/tools/checkin",
    Some(&bob),
    Some(json!({ "checkout_id": checkout_id })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, closed) = call(
    &f.app,
    Method::POST,
    "/tools/checkin",
    Some(&alice),
    Some(json!({ "checkout_id": checkout_id })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert!(closed["checkin_at"].is_string());

  let (status, _) = call(
    &f.app,
    Method::POST,
    "/tools/checkin",
    Some(&alice),
    Some(json!({ "checkout_id": checkout_id })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (_, open) =
    call(&f.app, Method::GET, "/tools/checkouts", Some(&bob), None).await;
  assert!(open.as_array().unwrap().is_empty());

  let (status, history) = call(
    &f.app,
    Method::GET,
    &format!("/tools/{tool_id}/history"),
    Some(&bob),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn admin_may_check_in_for_a_member() {
  let f = fixture().await;
  let alice = token_for(&f.store, &f.alice).await;
  let root = token_for(&f.store, &f.root).await;

  let (_, checkout) = call(
    &f.app,
    Method::POST,
    "/tools/checkout",
    Some(&alice),
    Some(json!({ "tool_id": f.printer.id })),
  )
  .await;

  let (status, closed) = call(
    &f.app,
    Method::POST,
    "/tools/checkin",
    Some(&root),
    Some(json!({ "checkout_id": checkout["id"] })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(closed["account_id"], f.alice.id);
}

#[tokio::test]
async fn tool_status_shows_holder() {
  let f = fixture().await;
  let alice = token_for(&f.store, &f.alice).await;
  let path = format!("/tools/{}", f.printer.id);

  let (status, tool) = call(&f.app, Method::GET, &path, Some(&alice), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(tool["tool"]["name"], "3D Printer");
  assert!(tool["holder"].is_null());

  call(
    &f.app,
    Method::POST,
    "/tools/checkout",
    Some(&alice),
    Some(json!({ "tool_id": f.printer.id })),
  )
  .await;

  let (_, tools) = call(&f.app, Method::GET, "/tools", Some(&alice), None).await;
  assert_eq!(tools[0]["holder"]["holder"]["id"], f.alice.id);
}

#[tokio::test]
async fn unknown_tool_and_checkout_are_not_found() {
  let f = fixture().await;
  let alice = token_for(&f.store, &f.alice).await;

  let (status, _) =
    call(&f.app, Method::GET, "/tools/999", Some(&alice), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = call(
    &f.app,
    Method::POST,
    "/tools/checkout",
    Some(&alice),
    Some(json!({ "tool_id": 999 })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = call(
    &f.app,
    Method::POST,
    "/tools/checkin",
    Some(&alice),
    Some(json!({ "checkout_id": 999 })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) =
    call(&f.app, Method::GET, "/tools/999/history", Some(&alice), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Administration ──────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_routes_refuse_members() {
  let f = fixture().await;
  let alice = token_for(&f.store, &f.alice).await;

  let (status, _) =
    call(&f.app, Method::GET, "/admin/accounts", Some(&alice), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call(
    &f.app,
    Method::POST,
    "/admin/tools",
    Some(&alice),
    Some(json!({ "name": "Lathe" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_manages_tools_and_circles() {
  let f = fixture().await;
  let root = token_for(&f.store, &f.root).await;

  let (status, tool) = call(
    &f.app,
    Method::POST,
    "/admin/tools",
    Some(&root),
    Some(json!({ "name": "Lathe", "description": "Emco" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(tool["name"], "Lathe");

  let (status, _) = call(
    &f.app,
    Method::POST,
    "/admin/tools",
    Some(&root),
    Some(json!({ "name": "  " })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (_, tools) =
    call(&f.app, Method::GET, "/admin/tools", Some(&root), None).await;
  let names: Vec<_> = tools
    .as_array()
    .unwrap()
    .iter()
    .map(|t| t["name"].as_str().unwrap())
    .collect();
  assert_eq!(names, ["3D Printer", "Lathe"]);

  let (status, circle) = call(
    &f.app,
    Method::POST,
    "/admin/circles",
    Some(&root),
    Some(json!({ "name": "laser", "description": "Laser cutter users" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, _) = call(
    &f.app,
    Method::POST,
    "/admin/circles",
    Some(&root),
    Some(json!({ "name": "laser" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, member) = call(
    &f.app,
    Method::POST,
    &format!("/admin/circles/{}/members", circle["id"]),
    Some(&root),
    Some(json!({ "account_id": f.bob.id, "comment": "trained" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(member["issuer_id"], f.root.id);
  assert!(f.store.is_circle_member(f.bob.id, "laser").await.unwrap());

  let (status, _) = call(
    &f.app,
    Method::POST,
    "/admin/circles/999/members",
    Some(&root),
    Some(json!({ "account_id": f.bob.id })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_creates_accounts() {
  let f = fixture().await;
  let root = token_for(&f.store, &f.root).await;

  let (status, account) = call(
    &f.app,
    Method::POST,
    "/admin/accounts",
    Some(&root),
    Some(json!({
      "username": "carol",
      "email": "carol@bitraf.no",
      "password": "pa55",
      "name": "Carol"
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(account["username"], "carol");
  assert!(account.get("password_hash").is_none());

  let (status, _) = call(
    &f.app,
    Method::POST,
    "/admin/accounts",
    Some(&root),
    Some(json!({
      "username": "carol",
      "email": "other@bitraf.no",
      "password": "x"
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (_, accounts) =
    call(&f.app, Method::GET, "/admin/accounts", Some(&root), None).await;
  assert_eq!(accounts.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn admin_reads_audit_events() {
  let f = fixture().await;
  let alice = token_for(&f.store, &f.alice).await;
  let root = token_for(&f.store, &f.root).await;

  let (_, checkout) = call(
    &f.app,
    Method::POST,
    "/tools/checkout",
    Some(&alice),
    Some(json!({ "tool_id": f.printer.id })),
  )
  .await;
  call(
    &f.app,
    Method::POST,
    "/tools/checkin",
    Some(&alice),
    Some(json!({ "checkout_id": checkout["id"] })),
  )
  .await;

  let (status, events) =
    call(&f.app, Method::GET, "/admin/events?limit=1", Some(&root), None).await;
  assert_eq!(status, StatusCode::OK);
  let events = events.as_array().unwrap();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0]["key"], "checkin");
  assert_eq!(events[0]["account_id"], f.alice.id);
}

// ─── Credential fallbacks ────────────────────────────────────────────────────

#[tokio::test]
async fn stale_cookie_falls_back_to_basic_credentials() {
  let f = fixture().await;

  let req = Request::builder()
    .uri("/auth/whoami")
    .header(header::COOKIE, format!("p2k16-session={}", new_token()))
    .header(
      header::AUTHORIZATION,
      format!("Basic {}", B64.encode("bob:hunter2")),
    )
    .body(Body::empty())
    .unwrap();
  let (status, me) = send_request(&f.app, req).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["username"], "bob");

  let req = Request::builder()
    .uri("/auth/whoami")
    .header(header::COOKIE, format!("p2k16-session={}", new_token()))
    .body(Body::empty())
    .unwrap();
  let (status, _) = send_request(&f.app, req).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_cookie_without_a_live_session() {
  let f = fixture().await;

  for cookie in [None, Some(format!("p2k16-session={}", new_token()))] {
    let mut req = Request::builder().method(Method::POST).uri("/auth/logout");
    if let Some(cookie) = cookie {
      req = req.header(header::COOKIE, cookie);
    }
    let res = f
      .app
      .clone()
      .oneshot(req.body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("p2k16-session=;"));
    assert!(set_cookie.contains("Max-Age=0"));
  }
}

#[tokio::test]
async fn unrepresentable_session_lifetime_fails_cleanly() {
  let f = fixture().await;
  let app = api_router(AppState::new(
    Arc::clone(&f.store),
    ApiConfig {
      session_ttl: Duration::MAX,
      ..ApiConfig::default()
    },
  ));

  let (status, body) = call(
    &app,
    Method::POST,
    "/auth/login",
    None,
    Some(json!({ "username": "alice", "password": "hunter2" })),
  )
  .await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert!(body["error"].as_str().unwrap().contains("session lifetime"));
}

// ─── Badges ──────────────────────────────────────────────────────────────────

fn titles(v: &Value) -> Vec<&str> {
  v.as_array()
    .unwrap()
    .iter()
    .map(|b| b["title"].as_str().unwrap())
    .collect()
}

#[tokio::test]
async fn members_create_and_hold_badges() {
  let f = fixture().await;
  let alice = token_for(&f.store, &f.alice).await;
  let root = token_for(&f.store, &f.root).await;

  let (status, soldering) = call(
    &f.app,
    Method::POST,
    "/badges",
    Some(&alice),
    Some(json!({ "title": "Soldering", "color": "#ff8800" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(soldering["created_by"], f.alice.id);

  let (_, held) =
    call(&f.app, Method::GET, "/account-badges", Some(&alice), None).await;
  assert_eq!(titles(&held), ["Soldering"]);

  let (status, _) = call(
    &f.app,
    Method::POST,
    "/badges",
    Some(&alice),
    Some(json!({ "title": "Soldering" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, _) = call(
    &f.app,
    Method::POST,
    "/badges",
    Some(&alice),
    Some(json!({ "title": " " })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let laser = f
    .store
    .add_circle(NewCircle {
      name:        "laser".into(),
      description: String::new(),
    })
    .await
    .unwrap();
  let certified = json!({
    "title": "Laser Cutter Trained",
    "certification_circle_id": laser.id
  });

  let (status, _) = call(
    &f.app,
    Method::POST,
    "/badges",
    Some(&alice),
    Some(certified.clone()),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) =
    call(&f.app, Method::POST, "/badges", Some(&root), Some(certified)).await;
  assert_eq!(status, StatusCode::CREATED);

  let (_, root_held) =
    call(&f.app, Method::GET, "/account-badges", Some(&root), None).await;
  assert!(root_held.as_array().unwrap().is_empty());

  let (status, all) =
    call(&f.app, Method::GET, "/badges", Some(&alice), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(titles(&all), ["Laser Cutter Trained", "Soldering"]);
}

#[tokio::test]
async fn badge_awards_follow_certification_rules() {
  let f = fixture().await;
  let alice = token_for(&f.store, &f.alice).await;
  let bob = token_for(&f.store, &f.bob).await;

  let laser = f
    .store
    .add_circle(NewCircle {
      name:        "laser".into(),
      description: String::new(),
    })
    .await
    .unwrap();
  let soldering = f
    .store
    .add_badge(
      NewBadge {
        title:                   "Soldering".into(),
        description:             None,
        certification_circle_id: None,
        slug:                    None,
        icon:                    None,
        color:                   None,
      },
      f.root.id,
    )
    .await
    .unwrap();
  let cutter = f
    .store
    .add_badge(
      NewBadge {
        title:                   "Laser Cutter Trained".into(),
        description:             None,
        certification_circle_id: Some(laser.id),
        slug:                    None,
        icon:                    None,
        color:                   None,
      },
      f.root.id,
    )
    .await
    .unwrap();

  let award = |id: i64| format!("/badges/{id}/award");

  let (status, first) =
    call(&f.app, Method::POST, &award(soldering.id), Some(&bob), Some(json!({}))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(first["account_id"], f.bob.id);

  let (status, again) =
    call(&f.app, Method::POST, &award(soldering.id), Some(&bob), Some(json!({}))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(again["id"], first["id"]);

  let (status, _) = call(
    &f.app,
    Method::POST,
    &award(soldering.id),
    Some(&bob),
    Some(json!({ "account_id": f.alice.id })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) =
    call(&f.app, Method::POST, &award(cutter.id), Some(&bob), Some(json!({}))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  f.store
    .add_circle_member(laser.id, f.alice.id, f.root.id, None)
    .await
    .unwrap();
  let (status, certified) = call(
    &f.app,
    Method::POST,
    &award(cutter.id),
    Some(&alice),
    Some(json!({ "account_id": f.bob.id })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(certified["awarded_by_id"], f.alice.id);
  assert_eq!(certified["title"], "Laser Cutter Trained");

  let (status, _) =
    call(&f.app, Method::POST, &award(999), Some(&bob), Some(json!({}))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = call(
    &f.app,
    Method::POST,
    &award(soldering.id),
    Some(&alice),
    Some(json!({ "account_id": 999 })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (_, held) =
    call(&f.app, Method::GET, "/account-badges", Some(&bob), None).await;
  assert_eq!(titles(&held), ["Laser Cutter Trained", "Soldering"]);
}

#[tokio::test]
async fn badges_removed_by_holder_or_admin() {
  let f = fixture().await;
  let alice = token_for(&f.store, &f.alice).await;
  let bob = token_for(&f.store, &f.bob).await;
  let root = token_for(&f.store, &f.root).await;

  call(
    &f.app,
    Method::POST,
    "/badges",
    Some(&bob),
    Some(json!({ "title": "Welding" })),
  )
  .await;
  call(
    &f.app,
    Method::POST,
    "/badges",
    Some(&alice),
    Some(json!({ "title": "CNC" })),
  )
  .await;
  let bob_badge = f.store.list_account_badges(f.bob.id).await.unwrap()[0].id;
  let alice_badge = f.store.list_account_badges(f.alice.id).await.unwrap()[0].id;
  let path = |id: i64| format!("/account-badges/{id}");

  let (status, _) =
    call(&f.app, Method::DELETE, &path(bob_badge), Some(&alice), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) =
    call(&f.app, Method::DELETE, &path(bob_badge), Some(&bob), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, _) =
    call(&f.app, Method::DELETE, &path(bob_badge), Some(&bob), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) =
    call(&f.app, Method::DELETE, &path(alice_badge), Some(&root), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  assert!(f.store.list_account_badges(f.alice.id).await.unwrap().is_empty());
}

// ─── Memberships ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn membership_status_and_active_members() {
  let f = fixture().await;
  let alice = token_for(&f.store, &f.alice).await;
  let root = token_for(&f.store, &f.root).await;

  let (status, me) =
    call(&f.app, Method::GET, "/memberships/me", Some(&alice), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["is_active"], false);
  assert!(me["membership"].is_null());

  let (status, m) = call(
    &f.app,
    Method::PUT,
    &format!("/admin/accounts/{}/membership", f.alice.id),
    Some(&root),
    Some(json!({
      "start_membership": "2020-01-01",
      "fee": 50000,
      "membership_number": 7
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(m["fee"], 50000);

  let (_, me) =
    call(&f.app, Method::GET, "/memberships/me", Some(&alice), None).await;
  assert_eq!(me["is_active"], true);
  assert_eq!(me["is_paying"], true);
  assert_eq!(me["membership"]["first_membership"], "2020-01-01");
  assert_eq!(me["membership"]["membership_number"], 7);

  // Starts in the future.
  f.store
    .set_membership(
      f.bob.id,
      MembershipTerms {
        start_membership:  NaiveDate::from_ymd_opt(2999, 1, 1).unwrap(),
        fee:               30000,
        membership_number: None,
      },
    )
    .await
    .unwrap();

  let (status, active) =
    call(&f.app, Method::GET, "/admin/members/active", Some(&root), None).await;
  assert_eq!(status, StatusCode::OK);
  let names: Vec<_> = active
    .as_array()
    .unwrap()
    .iter()
    .map(|a| a["username"].as_str().unwrap())
    .collect();
  assert_eq!(names, ["alice"]);

  let (status, _) =
    call(&f.app, Method::GET, "/admin/members/active", Some(&alice), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn setting_membership_validates_input() {
  let f = fixture().await;
  let root = token_for(&f.store, &f.root).await;
  let terms = |fee: i64| json!({ "start_membership": "2024-06-01", "fee": fee });

  let (status, _) = call(
    &f.app,
    Method::PUT,
    &format!("/admin/accounts/{}/membership", f.bob.id),
    Some(&root),
    Some(terms(-1)),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(
    &f.app,
    Method::PUT,
    "/admin/accounts/999/membership",
    Some(&root),
    Some(terms(100)),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = call(
    &f.app,
    Method::PUT,
    &format!("/admin/accounts/{}/membership", f.bob.id),
    Some(&root),
    Some(terms(100)),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (_, events) =
    call(&f.app, Method::GET, "/admin/events?limit=1", Some(&root), None).await;
  assert_eq!(events[0]["domain"], "membership");
  assert_eq!(events[0]["subject_id"], f.bob.id);
}
