use serde::{Deserialize, Serialize};

/// An open issue as served by `/api/latest-issues`.
///
/// Timestamps are passed through exactly as GitHub formats them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
  pub number: u64,
  pub title: String,
  pub url: String,
  pub state: String,
  pub created_at: String,
  pub updated_at: String,
  pub user: IssueAuthor,
  pub labels: Vec<String>, // label names in GitHub's order
  pub comments: u64,
}

/// Author of an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueAuthor {
  pub login: String,
  pub avatar_url: String,
  pub url: String,
}
