//! Serde-deserializable types matching GitHub REST API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on what the site serves.

use serde::Deserialize;

use super::types::{IssueAuthor, IssueRecord};

/// One element of the issues listing, before any filtering.
pub type RawIssue = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Deserialize)]
pub struct ApiUser {
  pub login: String,
  pub avatar_url: String,
  pub html_url: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiLabel {
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiIssue {
  pub number: u64,
  pub title: String,
  pub html_url: String,
  pub state: String,
  pub created_at: String,
  pub updated_at: String,
  pub user: ApiUser,
  #[serde(default)]
  pub labels: Vec<ApiLabel>,
  #[serde(default)]
  pub comments: u64,
}

impl ApiIssue {
  pub fn into_record(self) -> IssueRecord {
    IssueRecord {
      number: self.number,
      title: self.title,
      url: self.html_url,
      state: self.state,
      created_at: self.created_at,
      updated_at: self.updated_at,
      user: IssueAuthor {
        login: self.user.login,
        avatar_url: self.user.avatar_url,
        url: self.user.html_url,
      },
      labels: self.labels.into_iter().map(|l| l.name).collect(),
      comments: self.comments,
    }
  }
}
