//! `p2k16`: command-line client for the p2k16 tool checkout service.
//!
//! # Usage
//!
//! ```
//! p2k16 --url http://localhost:5000 --user alice --password secret tools
//! p2k16 --config ~/.config/p2k16/config.toml checkout 3
//! ```

mod client;
mod render;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "p2k16", about = "Check tools in and out of the hackerspace")]
struct Args {
  /// Path to a TOML config file (url, username, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the p2k16 server (default: http://localhost:5000).
  #[arg(long, env = "P2K16_URL")]
  url: Option<String>,

  /// Account username.
  #[arg(long, env = "P2K16_USER")]
  user: Option<String>,

  /// Account password (plaintext).
  #[arg(long, env = "P2K16_PASSWORD")]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List every tool and who has it.
  Tools,
  /// Show one tool with its recent checkouts.
  Tool {
    id: i64,
    /// How many past checkouts to show.
    #[arg(long, default_value_t = 10)]
    limit: usize,
  },
  /// List open checkouts, newest first.
  Checkouts,
  /// Check a tool out.
  Checkout { tool_id: i64 },
  /// Check a checkout back in.
  Checkin { checkout_id: i64 },
  /// Check in whatever checkout currently holds a tool.
  Return { tool_id: i64 },
  /// List the badges you hold.
  Badges,
  /// Award a badge, to yourself unless an account is given.
  Award {
    badge_id:   i64,
    #[arg(long)]
    account_id: Option<i64>,
  },
  /// Show your membership status.
  Membership,
  /// Show the account the credentials resolve to.
  Whoami,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:5000".to_string()),
    username: args
      .user
      .or_else(|| (!file_cfg.username.is_empty()).then(|| file_cfg.username.clone()))
      .unwrap_or_default(),
    password: args
      .password
      .or_else(|| (!file_cfg.password.is_empty()).then(|| file_cfg.password.clone()))
      .unwrap_or_default(),
  };

  let client = ApiClient::new(api_config)?;
  let out = run(&client, args.command).await?;
  print!("{out}");
  Ok(())
}

async fn run(client: &ApiClient, command: Command) -> Result<String> {
  Ok(match command {
    Command::Tools => render::tools(&client.list_tools().await?),
    Command::Tool { id, limit } => {
      let status = client.tool(id).await?;
      let history = client.history(id, limit).await?;
      render::tool(&status, &history)
    }
    Command::Checkouts => {
      render::checkouts(&client.open_checkouts().await?, Utc::now())
    }
    Command::Checkout { tool_id } => {
      render::checkout(&client.check_out(tool_id).await?)
    }
    Command::Checkin { checkout_id } => {
      render::checkout(&client.check_in(checkout_id).await?)
    }
    Command::Return { tool_id } => {
      let status = client.tool(tool_id).await?;
      let held = status
        .holder
        .ok_or_else(|| anyhow!("{} is not checked out", status.tool.name))?;
      render::checkout(&client.check_in(held.checkout.id).await?)
    }
    Command::Badges => render::badges(&client.my_badges().await?),
    Command::Award {
      badge_id,
      account_id,
    } => {
      let held = client.award_badge(badge_id, account_id).await?;
      format!("account {} holds '{}'\n", held.account_id, held.title)
    }
    Command::Membership => render::membership(&client.membership().await?),
    Command::Whoami => {
      let me = client.whoami().await?;
      format!(
        "{} (account #{}){}\n",
        me.username,
        me.account_id,
        if me.is_admin { ", admin" } else { "" }
      )
    }
  })
}
