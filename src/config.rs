use crate::records::aggregator::RangePolicy;
use std::path::PathBuf;
use std::time::Duration;

pub use crate::records::record_loader::DEFAULT_RECORDS_BASE_URL;
pub use crate::stations::directory_store::DEFAULT_STATIONS_URL;

pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_MEMO_CAPACITY: usize = 64;

/// Settings for a [`crate::Ghcn`] client.
///
/// Every field has a default, so `GhcnConfig::builder().build()` is a working
/// configuration that caches under the user's cache directory and talks to NOAA.
///
/// ```
/// use ghcn_climate::{GhcnConfig, RangePolicy};
/// use std::time::Duration;
///
/// let config = GhcnConfig::builder()
///     .cache_dir("/tmp/ghcn")
///     .concurrency(8)
///     .request_timeout(Duration::from_secs(60))
///     .range_policy(RangePolicy::SeasonYear)
///     .build();
/// assert_eq!(config.concurrency, 8);
/// assert_eq!(config.stations_url, ghcn_climate::DEFAULT_STATIONS_URL);
/// ```
#[derive(Debug, Clone, bon::Builder)]
pub struct GhcnConfig {
    /// Cache folder. `None` resolves to `<user cache dir>/ghcn_climate_cache`.
    #[builder(into)]
    pub cache_dir: Option<PathBuf>,
    /// URL of `ghcnd-stations.txt`.
    #[builder(into, default = DEFAULT_STATIONS_URL.to_string())]
    pub stations_url: String,
    /// Base URL the `<id>.dly` files are fetched from.
    #[builder(into, default = DEFAULT_RECORDS_BASE_URL.to_string())]
    pub records_base_url: String,
    /// Upper bound on concurrent record downloads and coverage checks.
    #[builder(default = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    pub request_timeout: Duration,
    /// How many record texts are kept in memory between aggregate requests. `0`
    /// disables the memo; the disk cache is used either way.
    #[builder(default = DEFAULT_MEMO_CAPACITY)]
    pub memo_capacity: usize,
    #[builder(default)]
    pub range_policy: RangePolicy,
}

impl Default for GhcnConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
