use crate::records::error::RecordError;
use crate::utils::write_atomic;
use async_compression::tokio::bufread::GzipDecoder;
use async_compression::tokio::write::GzipEncoder;
use futures_util::TryStreamExt;
use log::{info, warn};
use reqwest::Client;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio_util::io::StreamReader;

pub const DEFAULT_RECORDS_BASE_URL: &str = "https://www.ncei.noaa.gov/pub/data/ghcn/daily/all";

pub(crate) const RECORDS_DIR_NAME: &str = "records";

/// Where a station's record text was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordSource {
    Cache,
    Download,
}

/// Reads `.dly` files from the per-station cache, downloading missing ones.
///
/// Downloads are cached as `records/<id>.dly.gz`. A plain `records/<id>.dly` placed in
/// the cache folder is used as well.
#[derive(Debug, Clone)]
pub struct RecordLoader {
    records_dir: PathBuf,
    base_url: String,
    download_client: Client,
}

impl RecordLoader {
    pub fn new(cache_dir: &Path, base_url: &str, download_client: Client) -> Self {
        Self {
            records_dir: cache_dir.join(RECORDS_DIR_NAME),
            base_url: base_url.trim_end_matches('/').to_string(),
            download_client,
        }
    }

    fn compressed_path(&self, station: &str) -> PathBuf {
        self.records_dir.join(format!("{station}.dly.gz"))
    }

    fn plain_path(&self, station: &str) -> PathBuf {
        self.records_dir.join(format!("{station}.dly"))
    }

    /// Returns the station's record text, from cache when possible.
    pub async fn load(&self, station: &str) -> Result<String, RecordError> {
        let (bytes, _) = self.load_bytes(station).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Makes sure the station's records are in the on-disk cache.
    pub(crate) async fn ensure_cached(&self, station: &str) -> Result<RecordSource, RecordError> {
        validate_station_id(station)?;
        if self.cached_path(station).await.is_some() {
            return Ok(RecordSource::Cache);
        }
        self.download_and_cache(station).await?;
        Ok(RecordSource::Download)
    }

    pub(crate) async fn load_bytes(
        &self,
        station: &str,
    ) -> Result<(Vec<u8>, RecordSource), RecordError> {
        validate_station_id(station)?;
        match self.cached_path(station).await {
            Some(path) => {
                info!("Cache hit for records of station {} at {:?}", station, path);
                Ok((read_cached(&path).await?, RecordSource::Cache))
            }
            None => {
                warn!("Cache miss for records of station {}. Downloading.", station);
                Ok((self.download_and_cache(station).await?, RecordSource::Download))
            }
        }
    }

    async fn cached_path(&self, station: &str) -> Option<PathBuf> {
        for path in [self.compressed_path(station), self.plain_path(station)] {
            if fs::metadata(&path).await.is_ok() {
                return Some(path);
            }
        }
        None
    }

    async fn download_and_cache(&self, station: &str) -> Result<Vec<u8>, RecordError> {
        let bytes = self.download(station).await?;
        let path = self.compressed_path(station);
        let compressed = compress(&bytes).await?;
        write_atomic(&path, compressed)
            .await
            .map_err(|e| RecordError::CacheWrite(path.clone(), e))?;
        info!("Cached records for station {} to {:?}", station, path);
        Ok(bytes)
    }

    async fn download(&self, station: &str) -> Result<Vec<u8>, RecordError> {
        let url = format!("{}/{}.dly", self.base_url, station);
        info!("Downloading records from {}", url);

        let response = self
            .download_client
            .get(&url)
            .send()
            .await
            .map_err(|e| RecordError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    RecordError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    RecordError::NetworkRequest(url, e)
                });
            }
        };

        let stream = response.bytes_stream().map_err(io::Error::other);
        let mut reader = StreamReader::new(stream);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        info!("Downloaded {} bytes for station {}", bytes.len(), station);
        Ok(bytes)
    }
}

/// Station ids become file names, so only ASCII letters and digits are accepted.
fn validate_station_id(station: &str) -> Result<(), RecordError> {
    if station.is_empty() || !station.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(RecordError::InvalidStationId(station.to_string()));
    }
    Ok(())
}

async fn read_cached(path: &Path) -> Result<Vec<u8>, RecordError> {
    let file = fs::File::open(path)
        .await
        .map_err(|e| RecordError::CacheRead(path.to_path_buf(), e))?;
    let mut bytes = Vec::new();
    if path.extension().is_some_and(|ext| ext == "gz") {
        let mut decoder = GzipDecoder::new(BufReader::new(file));
        decoder
            .read_to_end(&mut bytes)
            .await
            .map_err(|e| RecordError::Decompress(path.to_path_buf(), e))?;
    } else {
        let mut file = file;
        file.read_to_end(&mut bytes)
            .await
            .map_err(|e| RecordError::CacheRead(path.to_path_buf(), e))?;
    }
    Ok(bytes)
}

async fn compress(bytes: &[u8]) -> Result<Vec<u8>, RecordError> {
    let mut encoder = GzipEncoder::new(Vec::with_capacity(bytes.len() / 4));
    encoder.write_all(bytes).await?;
    encoder.shutdown().await?;
    Ok(encoder.into_inner())
}
