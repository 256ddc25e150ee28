//! Single-slot, time-boxed cache with stale-on-error fallback.
//!
//! This module provides a source-agnostic caching mechanism that:
//! - Holds exactly one value and the time it was fetched
//! - Serves the value without refetching inside the freshness window
//! - Refreshes lazily on the first read after the window expires
//! - Keeps serving the last good value when a refresh fails
//! - Lets only one refresh run at a time

mod layer;
mod traits;

pub use layer::CacheLayer;
pub use traits::{CacheResult, CacheSource};

#[cfg(test)]
pub use traits::testing;
