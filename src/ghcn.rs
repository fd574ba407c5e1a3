//! The main entry point: a client that finds GHCN-Daily stations near a location and
//! computes seasonal temperature averages from their daily records.

use crate::config::GhcnConfig;
use crate::error::GhcnError;
use crate::records::aggregator::aggregate_station;
use crate::records::coverage::has_complete_coverage;
use crate::records::error::RecordError;
use crate::records::fetcher::RecordFetcher;
use crate::records::finalizer::finalize;
use crate::records::record_loader::RecordLoader;
use crate::stations::directory::StationDirectory;
use crate::stations::directory_store::DirectoryStore;
use crate::types::aggregate::AggregateResult;
use crate::types::query::{
    LatLon, SearchQuery, YearRange, DEFAULT_MAX_RESULTS, DEFAULT_RADIUS_KM,
};
use crate::types::station::SearchResult;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use bon::bon;
use futures_util::stream::{self, StreamExt};
use log::{info, warn};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The client for station search and seasonal aggregation.
///
/// It holds an immutable snapshot of the station directory, which
/// [`Ghcn::reload_directory`] replaces as a whole, and an in-memory memo of the
/// station records read so far. Both the station list and the per-station `.dly`
/// files are cached on disk.
///
/// # Examples
///
/// ```no_run
/// # use ghcn_climate::{Ghcn, GhcnError, LatLon, YearRange};
/// # #[tokio::main]
/// # async fn main() -> Result<(), GhcnError> {
/// let client = Ghcn::new().await?;
/// let stations = client
///     .find_stations()
///     .location(LatLon(48.78, 9.18))
///     .call()
///     .await?;
///
/// if let Some(nearest) = stations.first() {
///     let aggregate = client
///         .station_aggregate()
///         .station(&nearest.station.id)
///         .years(YearRange::new(2015, 2020)?)
///         .call()
///         .await?;
///     println!("{}", serde_json::to_string_pretty(&aggregate).unwrap());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Ghcn {
    config: GhcnConfig,
    cache_dir: PathBuf,
    directory_store: DirectoryStore,
    directory: RwLock<Arc<StationDirectory>>,
    records: RecordFetcher,
}

#[bon]
impl Ghcn {
    /// Creates a client with the default configuration, caching in the user's cache
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`GhcnError::CacheDirResolution`] if no cache directory can be determined,
    /// [`GhcnError::CacheDirCreation`] if it cannot be created and
    /// [`GhcnError::Directory`] if the station list cannot be loaded.
    pub async fn new() -> Result<Self, GhcnError> {
        Self::with_config(GhcnConfig::default()).await
    }

    /// Creates a client that caches in `cache_folder`. The folder is created if needed.
    pub async fn with_cache_folder(cache_folder: PathBuf) -> Result<Self, GhcnError> {
        Self::with_config(GhcnConfig::builder().cache_dir(cache_folder).build()).await
    }

    /// Creates a client from a full configuration and loads the station directory from
    /// the cache, downloading it if it is not cached yet.
    pub async fn with_config(config: GhcnConfig) -> Result<Self, GhcnError> {
        let cache_dir = resolve_cache_dir(&config)?;
        ensure_cache_dir_exists(&cache_dir)
            .await
            .map_err(|e| GhcnError::CacheDirCreation(cache_dir.clone(), e))?;
        let client = build_http_client(&config)?;
        let directory_store =
            DirectoryStore::new(&cache_dir, &config.stations_url, client.clone());
        let directory = directory_store.load().await?;
        info!("Loaded {} stations", directory.len());
        Ok(Self::assemble(config, cache_dir, client, directory_store, directory))
    }

    /// Creates a client around an already loaded directory. Nothing is read or
    /// downloaded until records are requested.
    pub fn with_directory(
        directory: StationDirectory,
        config: GhcnConfig,
    ) -> Result<Self, GhcnError> {
        let cache_dir = resolve_cache_dir(&config)?;
        let client = build_http_client(&config)?;
        let directory_store =
            DirectoryStore::new(&cache_dir, &config.stations_url, client.clone());
        Ok(Self::assemble(config, cache_dir, client, directory_store, directory))
    }

    fn assemble(
        config: GhcnConfig,
        cache_dir: PathBuf,
        client: Client,
        directory_store: DirectoryStore,
        directory: StationDirectory,
    ) -> Self {
        let loader = RecordLoader::new(&cache_dir, &config.records_base_url, client);
        let records = RecordFetcher::new(loader, config.concurrency, config.memo_capacity);
        Self {
            config,
            cache_dir,
            directory_store,
            directory: RwLock::new(Arc::new(directory)),
            records,
        }
    }

    pub fn config(&self) -> &GhcnConfig {
        &self.config
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// The current directory snapshot.
    pub async fn directory(&self) -> Arc<StationDirectory> {
        Arc::clone(&*self.directory.read().await)
    }

    /// Downloads a fresh station list and swaps it in. Requests already running keep
    /// the snapshot they started with.
    pub async fn reload_directory(&self) -> Result<Arc<StationDirectory>, GhcnError> {
        let fresh = Arc::new(self.directory_store.reload().await?);
        info!("Reloaded {} stations", fresh.len());
        *self.directory.write().await = Arc::clone(&fresh);
        Ok(fresh)
    }

    /// Forgets the record texts held in memory. The disk cache is kept.
    pub async fn clear_record_memo(&self) {
        self.records.clear().await;
    }

    /// Finds stations near `location`, nearest first.
    ///
    /// # Arguments
    ///
    /// * `.location(LatLon)`: **Required.** The point to search around.
    /// * `.max_distance_km(f64)`: Optional. Search radius, defaults to `50.0`.
    /// * `.station_limit(usize)`: Optional. Maximum number of results, defaults to `10`.
    /// * `.coverage(YearRange)`: Optional. Only return stations with TMAX and TMIN
    ///   observations in both the first and the last year of the range. Checking this
    ///   reads (and possibly downloads) the records of the candidate stations.
    ///
    /// # Errors
    ///
    /// Returns [`GhcnError::InvalidParameter`] for coordinates outside their range or a
    /// negative radius.
    #[builder]
    pub async fn find_stations(
        &self,
        location: LatLon,
        max_distance_km: Option<f64>,
        station_limit: Option<usize>,
        coverage: Option<YearRange>,
    ) -> Result<Vec<SearchResult>, GhcnError> {
        let query = SearchQuery::new(
            location,
            max_distance_km.unwrap_or(DEFAULT_RADIUS_KM),
            station_limit.unwrap_or(DEFAULT_MAX_RESULTS),
        )?;
        Ok(self.search(&query, coverage).await)
    }

    /// Runs a validated search, optionally restricted to stations with complete
    /// coverage of `coverage`.
    pub async fn search(
        &self,
        query: &SearchQuery,
        coverage: Option<YearRange>,
    ) -> Vec<SearchResult> {
        let directory = self.directory().await;
        match coverage {
            None => directory.search(query),
            Some(range) => self.search_with_coverage(&directory, query, range).await,
        }
    }

    async fn search_with_coverage(
        &self,
        directory: &StationDirectory,
        query: &SearchQuery,
        range: YearRange,
    ) -> Vec<SearchResult> {
        if query.max_results == 0 {
            return vec![];
        }
        let candidates = directory.within_radius(query.location, query.radius_km);
        let mut checks = pin!(stream::iter(candidates)
            .map(|candidate| async move {
                let covered = self.has_coverage(&candidate.station.id, range).await;
                (candidate, covered)
            })
            .buffered(self.records.concurrency()));

        let mut results = Vec::with_capacity(query.max_results);
        while let Some((candidate, covered)) = checks.next().await {
            if covered {
                results.push(candidate);
                if results.len() == query.max_results {
                    break;
                }
            }
        }
        results
    }

    async fn has_coverage(&self, station: &str, range: YearRange) -> bool {
        let text = match self.records.peek(station).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Treating station {} as uncovered: {}", station, e);
                return false;
            }
        };
        let id = station.to_string();
        tokio::task::spawn_blocking(move || has_complete_coverage(&text, &id, range))
            .await
            .unwrap_or_else(|e| {
                warn!("Coverage check for {} failed: {}", station, e);
                false
            })
    }

    /// Computes yearly and seasonal temperature averages for one station.
    ///
    /// # Arguments
    ///
    /// * `.station(&str)`: **Required.** The GHCN station id, e.g. `"GME00115771"`.
    /// * `.years(YearRange)`: Optional. Defaults to 2010 through 2020.
    ///
    /// # Errors
    ///
    /// * [`GhcnError::StationNotFound`] if the id is not in the directory.
    /// * [`GhcnError::Records`] if the station's records cannot be read or downloaded.
    /// * [`GhcnError::NoDataForRange`] if the window holds no valid TMAX or TMIN value.
    #[builder]
    pub async fn station_aggregate(
        &self,
        station: &str,
        years: Option<YearRange>,
    ) -> Result<AggregateResult, GhcnError> {
        let years = years.unwrap_or_default();
        let station = self
            .directory()
            .await
            .get(station)
            .cloned()
            .ok_or_else(|| GhcnError::StationNotFound(station.to_string()))?;

        let text = self.records.get(&station.id).await?;
        let policy = self.config.range_policy;
        let id = station.id.clone();
        let aggregator =
            tokio::task::spawn_blocking(move || aggregate_station(&text, &id, years, policy))
                .await
                .map_err(RecordError::from)?;

        if aggregator.observed_lines() == 0 {
            return Err(GhcnError::NoDataForRange {
                station: station.id,
                start_year: years.start(),
                end_year: years.end(),
            });
        }

        Ok(AggregateResult {
            station_id: station.id,
            station_name: station.name,
            years: finalize(aggregator.into_accumulators()),
        })
    }

    /// Aggregates several stations, reading up to `concurrency` record files at once.
    /// Every station gets its own result, in the order given.
    pub async fn station_aggregates(
        &self,
        stations: &[String],
        years: YearRange,
    ) -> Vec<(String, Result<AggregateResult, GhcnError>)> {
        stream::iter(stations)
            .map(|station| async move {
                let result = self
                    .station_aggregate()
                    .station(station)
                    .years(years)
                    .call()
                    .await;
                (station.clone(), result)
            })
            .buffered(self.records.concurrency())
            .collect()
            .await
    }

    /// Downloads the record files of `stations` into the disk cache, skipping the
    /// ones already cached.
    pub async fn prefetch(&self, stations: &[String]) -> Vec<(String, Result<(), GhcnError>)> {
        self.records
            .prefetch(stations)
            .await
            .into_iter()
            .map(|(station, result)| (station, result.map_err(GhcnError::from)))
            .collect()
    }
}

fn resolve_cache_dir(config: &GhcnConfig) -> Result<PathBuf, GhcnError> {
    match &config.cache_dir {
        Some(dir) => Ok(dir.clone()),
        None => get_cache_dir().ok_or(GhcnError::CacheDirResolution),
    }
}

fn build_http_client(config: &GhcnConfig) -> Result<Client, GhcnError> {
    Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(GhcnError::HttpClient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::record_loader::RECORDS_DIR_NAME;
    use crate::records::test_support::{dly_line, full_month};
    use crate::stations::directory::tests::station;
    use crate::types::season::Season;

    const STUTTGART: &str = "GME00115771";
    const WILLSBACH: &str = "GME00126922";
    const ECHTERDINGEN: &str = "GM000004199";

    fn directory() -> StationDirectory {
        StationDirectory::from_stations(vec![
            station(STUTTGART, 48.8281, 9.2, "STUTTGART-SCHNARRENBERG"),
            station(WILLSBACH, 49.1236, 9.3547, "OBERSULM-WILLSBACH"),
            station(ECHTERDINGEN, 48.6833, 9.2167, "STUTTGART-ECHTERDINGEN"),
        ])
    }

    fn offline_client(cache_dir: &Path) -> Ghcn {
        let config = GhcnConfig::builder()
            .cache_dir(cache_dir)
            .stations_url("http://127.0.0.1:9/ghcnd-stations.txt")
            .records_base_url("http://127.0.0.1:9/all")
            .concurrency(2)
            .build();
        Ghcn::with_directory(directory(), config).unwrap()
    }

    fn write_records(cache_dir: &Path, station: &str, lines: &[String]) {
        let records = cache_dir.join(RECORDS_DIR_NAME);
        std::fs::create_dir_all(&records).unwrap();
        std::fs::write(records.join(format!("{station}.dly")), lines.join("\n")).unwrap();
    }

    /// A full year of constant seasonal temperatures, in tenths of a degree.
    fn seasonal_year(station: &str, year: i32) -> Vec<String> {
        let (winter, spring, summer, autumn) = ((86, 28), (171, 67), (266, 140), (157, 77));
        (1..=12)
            .flat_map(|month| {
                let (tmax, tmin) = match month {
                    12 | 1 | 2 => winter,
                    3..=5 => spring,
                    6..=8 => summer,
                    _ => autumn,
                };
                [
                    full_month(station, year, month, "TMAX", tmax),
                    full_month(station, year, month, "TMIN", tmin),
                ]
            })
            .collect()
    }

    #[tokio::test]
    async fn test_station_aggregate() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        write_records(dir.path(), WILLSBACH, &seasonal_year(WILLSBACH, 2024));
        let client = offline_client(dir.path());

        let result = client
            .station_aggregate()
            .station(WILLSBACH)
            .years(YearRange::single(2024))
            .call()
            .await?;

        assert_eq!(result.station_id, WILLSBACH);
        assert_eq!(result.station_name, "OBERSULM-WILLSBACH");
        assert_eq!(result.years.len(), 1);
        let year = result.year(2024).unwrap();
        assert_eq!(year.avg_tmax, Some(17.0));
        assert_eq!(year.avg_tmin, Some(7.8));

        let winter = year.season(Season::Winter).unwrap();
        assert_eq!(winter.avg_tmax, Some(8.6));
        assert_eq!(winter.avg_tmin, Some(2.8));
        assert_eq!(year.season(Season::Summer).unwrap().avg_tmax, Some(26.6));
        assert_eq!(year.season(Season::Autumn).unwrap().avg_tmin, Some(7.7));

        let json = serde_json::to_value(&result)?;
        assert_eq!(json["station"], WILLSBACH);
        assert_eq!(json["years"]["2024"]["seasons"]["Spring"]["avg_TMAX"], 17.1);
        Ok(())
    }

    #[tokio::test]
    async fn test_aggregate_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let mut lines = seasonal_year(STUTTGART, 2019);
        lines.extend(seasonal_year(STUTTGART, 2020));
        write_records(dir.path(), STUTTGART, &lines);
        let client = offline_client(dir.path());
        let years = YearRange::new(2019, 2020)?;

        let first = client.station_aggregate().station(STUTTGART).years(years).call().await?;
        let second = client.station_aggregate().station(STUTTGART).years(years).call().await?;
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first)?,
            serde_json::to_string(&second)?
        );
        // December 2019 feeds the 2020 winter, December 2020 feeds no winter.
        assert_eq!(first.years.keys().copied().collect::<Vec<_>>(), [2019, 2020]);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_station() {
        let dir = tempfile::tempdir().unwrap();
        let client = offline_client(dir.path());
        let err = client
            .station_aggregate()
            .station("USW00094728")
            .call()
            .await
            .unwrap_err();
        assert!(matches!(err, GhcnError::StationNotFound(ref id) if id == "USW00094728"));
    }

    #[tokio::test]
    async fn test_no_data_for_range() {
        let dir = tempfile::tempdir().unwrap();
        write_records(dir.path(), STUTTGART, &seasonal_year(STUTTGART, 1995));
        let client = offline_client(dir.path());
        let err = client
            .station_aggregate()
            .station(STUTTGART)
            .call()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GhcnError::NoDataForRange {
                start_year: 2010,
                end_year: 2020,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_values_only_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let lines = [
            dly_line(STUTTGART, 2015, 1, "TMAX", &[]),
            dly_line(STUTTGART, 2015, 1, "TMIN", &[]),
        ];
        write_records(dir.path(), STUTTGART, &lines);
        let client = offline_client(dir.path());
        let err = client
            .station_aggregate()
            .station(STUTTGART)
            .years(YearRange::single(2015))
            .call()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GhcnError::NoDataForRange {
                start_year: 2015,
                end_year: 2015,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_records_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let client = offline_client(dir.path());
        let err = client
            .station_aggregate()
            .station(ECHTERDINGEN)
            .call()
            .await
            .unwrap_err();
        assert!(matches!(err, GhcnError::Records(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_find_stations() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let client = offline_client(dir.path());

        let results = client
            .find_stations()
            .location(LatLon(48.78, 9.18))
            .call()
            .await?;
        let ids: Vec<&str> = results.iter().map(|r| r.station.id.as_str()).collect();
        assert_eq!(ids, [STUTTGART, ECHTERDINGEN, WILLSBACH]);

        let results = client
            .find_stations()
            .location(LatLon(48.78, 9.18))
            .max_distance_km(20.0)
            .station_limit(1)
            .call()
            .await?;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].station.id, STUTTGART);

        let err = client
            .find_stations()
            .location(LatLon(95.0, 9.18))
            .call()
            .await
            .unwrap_err();
        assert!(matches!(err, GhcnError::InvalidParameter { parameter: "lat", .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_find_stations_with_coverage() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        // Stuttgart lacks TMIN in the last year, Willsbach covers both years and
        // Echterdingen has no records at all.
        write_records(
            dir.path(),
            STUTTGART,
            &[
                full_month(STUTTGART, 2010, 1, "TMAX", 10),
                full_month(STUTTGART, 2010, 1, "TMIN", -10),
                full_month(STUTTGART, 2020, 1, "TMAX", 10),
                dly_line(STUTTGART, 2020, 1, "TMIN", &[]),
            ],
        );
        write_records(
            dir.path(),
            WILLSBACH,
            &[
                full_month(WILLSBACH, 2010, 6, "TMAX", 250),
                full_month(WILLSBACH, 2010, 6, "TMIN", 120),
                full_month(WILLSBACH, 2020, 6, "TMAX", 260),
                full_month(WILLSBACH, 2020, 6, "TMIN", 130),
            ],
        );
        let client = offline_client(dir.path());

        let results = client
            .find_stations()
            .location(LatLon(48.78, 9.18))
            .coverage(YearRange::new(2010, 2020)?)
            .call()
            .await?;
        let ids: Vec<&str> = results.iter().map(|r| r.station.id.as_str()).collect();
        assert_eq!(ids, [WILLSBACH]);
        // Coverage checks read the records without keeping them in memory.
        assert_eq!(client.records.memoized_len().await, 0);

        let query = SearchQuery::new(LatLon(48.78, 9.18), 50.0, 0)?;
        assert!(client.search(&query, Some(YearRange::default())).await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_station_aggregates_keep_order() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        write_records(dir.path(), STUTTGART, &seasonal_year(STUTTGART, 2015));
        write_records(dir.path(), WILLSBACH, &seasonal_year(WILLSBACH, 2015));
        let client = offline_client(dir.path());

        let stations = vec![
            WILLSBACH.to_string(),
            "NOPE0000000".to_string(),
            STUTTGART.to_string(),
        ];
        let results = client
            .station_aggregates(&stations, YearRange::single(2015))
            .await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, WILLSBACH);
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(GhcnError::StationNotFound(_))));
        assert_eq!(results[2].1.as_ref().unwrap().station_id, STUTTGART);
        Ok(())
    }

    #[tokio::test]
    async fn test_prefetch_and_reload_failures() {
        let dir = tempfile::tempdir().unwrap();
        write_records(dir.path(), STUTTGART, &seasonal_year(STUTTGART, 2015));
        let client = offline_client(dir.path());

        let results = client
            .prefetch(&[STUTTGART.to_string(), WILLSBACH.to_string()])
            .await;
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(GhcnError::Records(_))));

        assert!(matches!(
            client.reload_directory().await,
            Err(GhcnError::Directory(_))
        ));
        // A failed reload keeps the previous snapshot.
        assert_eq!(client.directory().await.len(), 3);
    }

    #[tokio::test]
    #[ignore = "downloads the station list and a record file"]
    async fn test_end_to_end_download() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let client = Ghcn::with_cache_folder(dir.path().to_path_buf()).await?;
        let result = client
            .station_aggregate()
            .station(STUTTGART)
            .years(YearRange::new(2018, 2020)?)
            .call()
            .await?;
        assert!(result.year(2019).is_some());
        Ok(())
    }
}
