//! Reduce the raw issues listing to the records the site serves.

use serde_json::Value;

use super::api_types::{ApiIssue, RawIssue};
use super::error::UpstreamError;
use super::types::IssueRecord;

/// Number of issues served after filtering.
pub const MAX_ISSUES: usize = 5;

/// Drop pull requests, keep the first [`MAX_ISSUES`] entries in upstream
/// order and project each into an [`IssueRecord`].
///
/// GitHub's listing endpoint returns pull requests alongside issues and
/// ignores the `pulls=false` parameter, so any entry carrying a
/// `pull_request` key is discarded here. Only the surviving entries are
/// validated; a missing required field fails the whole batch.
pub fn normalize(raw: Vec<RawIssue>) -> Result<Vec<IssueRecord>, UpstreamError> {
  raw
    .into_iter()
    .filter(|issue| !issue.contains_key("pull_request"))
    .take(MAX_ISSUES)
    .map(|issue| {
      let issue: ApiIssue = serde_json::from_value(Value::Object(issue))?;
      Ok(issue.into_record())
    })
    .collect()
}
