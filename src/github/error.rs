// Error types for the GitHub issue listing.
// Every variant is recovered the same way by the cache: stale data or no data.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpstreamError {
  /// Connection failure or timeout reaching GitHub
  #[error("GitHub request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("GitHub responded with HTTP {status}: {body}")]
  Status { status: StatusCode, body: String },

  /// Response body was not a list of issues, or an issue lacked a required field
  #[error("Unexpected GitHub response: {0}")]
  Malformed(#[from] serde_json::Error),
}
