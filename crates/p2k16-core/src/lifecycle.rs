//! The tool lifecycle manager.
//!
//! Owns the two rules that govern tool state:
//!
//! - a tool has at most one open checkout at a time;
//! - only the account holding a checkout, or an administrator, may close it.
//!
//! A checkout moves through exactly two states: [`ToolLifecycle::check_out`]
//! creates it `Open`, and [`ToolLifecycle::check_in`] moves it to `Closed`,
//! which is terminal. Storage is delegated to a [`Store`]; the manager holds
//! no state of its own between calls.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::{
  Entity, Error, Result,
  account::Principal,
  event::{DOMAIN_TOOL, NewEvent},
  store::Store,
  tool::{CheckinOutcome, Checkout, CheckoutInsert, OpenCheckout, Tool, ToolStatus},
};

pub struct ToolLifecycle<S> {
  store: Arc<S>,
}

impl<S> Clone for ToolLifecycle<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
    }
  }
}

impl<S: Store> ToolLifecycle<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  // ── Transitions ───────────────────────────────────────────────────────

  /// Open a checkout of `tool_id` for the acting principal.
  ///
  /// Fails with [`Error::NotFound`] if the tool does not exist and with
  /// [`Error::Conflict`] if anyone, including the principal, already holds
  /// it. A conflict detected by the store during the insert (a concurrent
  /// checkout won) is reported the same way.
  pub async fn check_out(
    &self,
    tool_id: i64,
    principal: &Principal,
  ) -> Result<Checkout> {
    let tool = self
      .store
      .find_tool(tool_id)
      .await
      .map_err(Error::persistence)?
      .ok_or(Error::NotFound(Entity::Tool, tool_id))?;

    let open = self
      .store
      .list_open_checkouts()
      .await
      .map_err(Error::persistence)?;

    if let Some(held) = open.into_iter().find(|oc| oc.checkout.tool_id == tool_id)
    {
      warn!(
        tool_id,
        account_id = principal.account_id,
        held_by = held.holder.id,
        "checkout rejected: tool already checked out"
      );
      return Err(conflict(&tool, held));
    }

    let inserted = self
      .store
      .insert_checkout(tool_id, principal.account_id, Utc::now())
      .await
      .map_err(Error::persistence)?;

    let checkout = match inserted {
      CheckoutInsert::Inserted(checkout) => checkout,
      CheckoutInsert::Occupied(held) => {
        warn!(
          tool_id,
          account_id = principal.account_id,
          held_by = held.holder.id,
          "checkout rejected: lost race for tool"
        );
        return Err(conflict(&tool, held));
      }
    };

    info!(
      tool_id,
      checkout_id = checkout.id,
      account_id = principal.account_id,
      "tool checked out"
    );

    self
      .audit(
        NewEvent::new(DOMAIN_TOOL, "checkout")
          .by(principal.account_id)
          .about(checkout.id)
          .text(tool.name),
      )
      .await;

    Ok(checkout)
  }

  /// Close checkout `checkout_id` on behalf of the acting principal and
  /// return it with its checkin timestamp set.
  ///
  /// Closing an already-closed checkout is an [`Error::InvalidState`], never
  /// a silent success.
  pub async fn check_in(
    &self,
    checkout_id: i64,
    principal: &Principal,
  ) -> Result<Checkout> {
    let checkout = self
      .store
      .find_checkout(checkout_id)
      .await
      .map_err(Error::persistence)?
      .ok_or(Error::NotFound(Entity::Checkout, checkout_id))?;

    if !checkout.is_open() {
      return Err(Error::InvalidState(checkout_id));
    }

    if checkout.account_id != principal.account_id && !principal.is_admin {
      warn!(
        checkout_id,
        account_id = principal.account_id,
        holder_id = checkout.account_id,
        "checkin rejected: not the holder"
      );
      return Err(Error::Forbidden {
        checkout_id,
        account_id: principal.account_id,
      });
    }

    let outcome = self
      .store
      .mark_checked_in(checkout_id, Utc::now())
      .await
      .map_err(Error::persistence)?;

    // A concurrent checkin may have closed it between the read and the write.
    let closed = match outcome {
      CheckinOutcome::Done(closed) => closed,
      CheckinOutcome::NotFound => {
        return Err(Error::NotFound(Entity::Checkout, checkout_id));
      }
      CheckinOutcome::AlreadyClosed => {
        return Err(Error::InvalidState(checkout_id));
      }
    };

    info!(
      tool_id = closed.tool_id,
      checkout_id,
      account_id = principal.account_id,
      on_behalf_of = (closed.account_id != principal.account_id)
        .then_some(closed.account_id),
      "tool checked in"
    );

    self
      .audit(
        NewEvent::new(DOMAIN_TOOL, "checkin")
          .by(principal.account_id)
          .about(checkout_id),
      )
      .await;

    Ok(closed)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Every open checkout, most recent first.
  pub async fn list_open_checkouts(&self) -> Result<Vec<OpenCheckout>> {
    let mut open = self
      .store
      .list_open_checkouts()
      .await
      .map_err(Error::persistence)?;
    open.sort_by(|a, b| {
      b.checkout
        .checkout_at
        .cmp(&a.checkout.checkout_at)
        .then(b.checkout.id.cmp(&a.checkout.id))
    });
    Ok(open)
  }

  /// A single tool and its current holder.
  pub async fn tool_status(&self, tool_id: i64) -> Result<ToolStatus> {
    let tool = self
      .store
      .find_tool(tool_id)
      .await
      .map_err(Error::persistence)?
      .ok_or(Error::NotFound(Entity::Tool, tool_id))?;
    let holder = self
      .store
      .list_open_checkouts()
      .await
      .map_err(Error::persistence)?
      .into_iter()
      .find(|oc| oc.checkout.tool_id == tool_id);
    Ok(ToolStatus { tool, holder })
  }

  /// Every tool, ordered by name, with its current holder.
  pub async fn list_tools_with_status(&self) -> Result<Vec<ToolStatus>> {
    let tools = self.store.list_tools().await.map_err(Error::persistence)?;
    let mut open = self
      .store
      .list_open_checkouts()
      .await
      .map_err(Error::persistence)?;

    Ok(
      tools
        .into_iter()
        .map(|tool| {
          let holder = open
            .iter()
            .position(|oc| oc.checkout.tool_id == tool.id)
            .map(|i| open.swap_remove(i));
          ToolStatus { tool, holder }
        })
        .collect(),
    )
  }

  /// Record an audit event. Failures are logged and otherwise ignored.
  async fn audit(&self, event: NewEvent) {
    let key = event.key.clone();
    if let Err(e) = self.store.record_event(event).await {
      warn!(error = %e, key = %key, "failed to record audit event");
    }
  }
}

fn conflict(tool: &Tool, held: OpenCheckout) -> Error {
  Error::Conflict {
    tool_id:     tool.id,
    tool_name:   tool.name.clone(),
    checkout_id: held.checkout.id,
    held_by:     held.holder,
  }
}
