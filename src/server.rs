//! HTTP surface: the latest-issues JSON endpoint and a JSON 404 fallback.

use axum::{
  extract::State,
  http::{header::HeaderName, HeaderValue, StatusCode},
  response::{IntoResponse, Response},
  routing::get,
  Json, Router,
};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cache::CacheSource;
use crate::github::{CachedIssueClient, IssueSource};

/// Body returned when no issues have ever been fetched.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch issues from GitHub";

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

#[derive(Debug, Serialize)]
struct FetchError {
  error: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorPage {
  error_code: u16,
  error_message: &'static str,
}

pub fn router<S>(issues: Arc<CachedIssueClient<S>>) -> Router
where
  S: IssueSource + 'static,
{
  Router::new()
    .route("/api/latest-issues", get(latest_issues::<S>))
    .fallback(not_found)
    .with_state(issues)
}

/// GET /api/latest-issues - Latest open issues, possibly stale.
async fn latest_issues<S>(State(issues): State<Arc<CachedIssueClient<S>>>) -> Response
where
  S: IssueSource + 'static,
{
  match issues.latest_issues().await {
    Some(result) => {
      if result.source == CacheSource::Offline {
        warn!(cached_at = ?result.cached_at, "Serving stale issues");
      }
      let cache = HeaderValue::from_static(result.source.header_value());
      ([(X_CACHE, cache)], Json(result.data.as_slice())).into_response()
    }
    None => (
      StatusCode::SERVICE_UNAVAILABLE,
      Json(FetchError {
        error: FETCH_FAILED_MESSAGE,
      }),
    )
      .into_response(),
  }
}

async fn not_found() -> Response {
  (
    StatusCode::NOT_FOUND,
    Json(ErrorPage {
      error_code: StatusCode::NOT_FOUND.as_u16(),
      error_message: "Not Found",
    }),
  )
    .into_response()
}

/// Serve `app` on `bind` until Ctrl-C.
pub async fn serve(bind: SocketAddr, app: Router) -> Result<()> {
  let listener = tokio::net::TcpListener::bind(bind)
    .await
    .map_err(|e| eyre!("Failed to bind {}: {}", bind, e))?;
  info!(addr = %listener.local_addr()?, "Listening");

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| eyre!("Server error: {}", e))?;

  info!("Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  match tokio::signal::ctrl_c().await {
    Ok(()) => info!("Shutdown requested"),
    Err(e) => {
      // Without a signal handler, run until killed
      error!(error = %e, "Failed to listen for Ctrl-C");
      std::future::pending::<()>().await;
    }
  }
}
