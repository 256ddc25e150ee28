//! Issue listing with transparent caching in front of GitHub.

use std::sync::Arc;

use crate::cache::{CacheLayer, CacheResult};

use super::client::IssueSource;
use super::normalize::normalize;
use super::types::IssueRecord;

/// Issue source wrapped in a single-slot cache.
///
/// A refresh is one upstream call followed by normalization; a failure in
/// either step counts as a failed refresh.
pub struct CachedIssueClient<S> {
  inner: Arc<S>,
  cache: CacheLayer<Vec<IssueRecord>>,
}

impl<S: IssueSource + 'static> CachedIssueClient<S> {
  pub fn new(inner: S, cache: CacheLayer<Vec<IssueRecord>>) -> Self {
    Self {
      inner: Arc::new(inner),
      cache,
    }
  }

  /// Latest open issues, or `None` if GitHub has never answered successfully.
  pub async fn latest_issues(&self) -> Option<CacheResult<Arc<Vec<IssueRecord>>>> {
    self
      .cache
      .fetch(|| {
        let inner = Arc::clone(&self.inner);
        async move {
          let raw = inner.fetch_raw_issues().await?;
          normalize(raw)
        }
      })
      .await
  }

  #[cfg(test)]
  pub fn inner(&self) -> &S {
    self.inner.as_ref()
  }
}
