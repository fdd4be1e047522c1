//! Plain-text rendering of API responses.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use p2k16_core::{
  badge::AccountBadge,
  membership::MembershipStatus,
  tool::{Checkout, OpenCheckout, ToolStatus},
};

fn timestamp(dt: DateTime<Utc>) -> String {
  dt.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// `1d 3h`, `2h 05m`, `12m`.
pub fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let minutes = (now - since).num_minutes().max(0);
  let (days, hours, mins) = (minutes / 1440, minutes / 60 % 24, minutes % 60);
  match (days, hours) {
    (0, 0) => format!("{mins}m"),
    (0, _) => format!("{hours}h {mins:02}m"),
    _ => format!("{days}d {hours}h"),
  }
}

pub fn tools(list: &[ToolStatus]) -> String {
  if list.is_empty() {
    return "no tools\n".to_owned();
  }
  let width = list.iter().map(|s| s.tool.name.len()).max().unwrap_or(0);
  let mut out = String::new();
  for status in list {
    let state = match &status.holder {
      None => "available".to_owned(),
      Some(oc) => format!(
        "checked out to {} since {}",
        oc.holder.display_name,
        timestamp(oc.checkout.checkout_at)
      ),
    };
    let _ = writeln!(
      out,
      "{:>4}  {:<width$}  {state}",
      status.tool.id, status.tool.name
    );
  }
  out
}

pub fn tool(status: &ToolStatus, history: &[Checkout]) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "{} (#{})", status.tool.name, status.tool.id);
  if let Some(description) = &status.tool.description {
    let _ = writeln!(out, "  {description}");
  }
  match &status.holder {
    None => out.push_str("  available\n"),
    Some(oc) => {
      let _ = writeln!(
        out,
        "  checked out to {} since {} (checkout #{})",
        oc.holder.display_name,
        timestamp(oc.checkout.checkout_at),
        oc.checkout.id
      );
    }
  }
  if !history.is_empty() {
    out.push_str("history:\n");
    for c in history {
      let back = c
        .checkin_at
        .map(timestamp)
        .unwrap_or_else(|| "still out".to_owned());
      let _ = writeln!(
        out,
        "  #{:<5} account {:<5} {} → {back}",
        c.id,
        c.account_id,
        timestamp(c.checkout_at)
      );
    }
  }
  out
}

pub fn checkouts(list: &[OpenCheckout], now: DateTime<Utc>) -> String {
  if list.is_empty() {
    return "nothing is checked out\n".to_owned();
  }
  let width = list.iter().map(|oc| oc.tool_name.len()).max().unwrap_or(0);
  let mut out = String::new();
  for oc in list {
    let _ = writeln!(
      out,
      "#{:<5} {:<width$}  {}  ({})",
      oc.checkout.id,
      oc.tool_name,
      oc.holder.display_name,
      elapsed(oc.checkout.checkout_at, now)
    );
  }
  out
}

pub fn checkout(c: &Checkout) -> String {
  match c.checkin_at {
    None => format!(
      "checked out tool #{} at {} (checkout #{})\n",
      c.tool_id,
      timestamp(c.checkout_at),
      c.id
    ),
    Some(at) => format!(
      "checked in tool #{} at {} (checkout #{})\n",
      c.tool_id,
      timestamp(at),
      c.id
    ),
  }
}

pub fn badges(held: &[AccountBadge]) -> String {
  if held.is_empty() {
    return "no badges\n".to_owned();
  }
  let mut out = String::new();
  for b in held {
    let _ = writeln!(out, "#{:<5} {}", b.id, b.title);
  }
  out
}

/// Øre as kroner, e.g. `500.00 NOK`.
fn nok(ore: i64) -> String { format!("{}.{:02} NOK", ore / 100, ore % 100) }

pub fn membership(status: &MembershipStatus) -> String {
  let Some(m) = &status.membership else {
    return "not a member\n".to_owned();
  };
  let mut out = String::new();
  out.push_str(if status.is_active {
    "active member\n"
  } else {
    "inactive member\n"
  });
  let _ = writeln!(out, "  member since {}", m.first_membership);
  let _ = writeln!(out, "  current period from {}", m.start_membership);
  let _ = writeln!(out, "  monthly fee {}", nok(m.fee));
  if let Some(n) = m.membership_number {
    let _ = writeln!(out, "  membership number {n}");
  }
  out
}
