mod cache;
mod config;
mod github;
mod logging;
mod server;

use clap::Parser;
use color_eyre::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::cache::CacheLayer;
use crate::github::{CachedIssueClient, GitHubClient};

#[derive(Parser, Debug)]
#[command(name = "doc-academy")]
#[command(about = "Documentation Academy site backend with cached GitHub issues")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./doc-academy.yaml or $XDG_CONFIG_HOME/doc-academy/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Address to listen on, overriding the config file
  #[arg(short, long)]
  bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(bind) = args.bind {
    config.server.bind = bind;
  }

  let _log_guard = logging::init(&config.log)?;

  let token = config::Config::github_token();
  let client = GitHubClient::new(&config.github, token.as_deref())?;
  info!(
    url = %client.issues_url(),
    authenticated = token.is_some(),
    ttl_minutes = config.cache.ttl_minutes,
    "Serving latest issues"
  );

  let cache = CacheLayer::new(config.cache.ttl());
  let issues = Arc::new(CachedIssueClient::new(client, cache));

  server::serve(config.server.bind, server::router(issues)).await
}
