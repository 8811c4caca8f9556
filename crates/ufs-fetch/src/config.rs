use serde::{Deserialize, Serialize};

/// Tuning for [`Driver`](crate::Driver) and the retrieval operations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Upper bound on speculative fetches outstanding alongside the
    /// mandatory one. Zero fetches strictly one block at a time.
    pub max_prefetch: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { max_prefetch: 16 }
    }
}

impl FetchConfig {
    /// Strictly sequential fetching.
    pub fn sequential() -> Self {
        Self { max_prefetch: 0 }
    }
}
