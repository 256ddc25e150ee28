//! GitHub issues listing: upstream client, normalization and the cached front.

pub mod api_types;
pub mod cached_client;
pub mod client;
pub mod error;
pub mod normalize;
pub mod types;

pub use cached_client::CachedIssueClient;
pub use client::{GitHubClient, IssueSource};
