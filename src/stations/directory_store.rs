use crate::stations::directory::StationDirectory;
use crate::stations::error::DirectoryError;
use crate::types::station::Station;
use crate::utils::write_atomic;
use bincode::config::{Configuration, Fixint, LittleEndian};
use futures_util::TryStreamExt;
use log::{info, warn};
use reqwest::Client;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tokio_util::io::StreamReader;

pub const DEFAULT_STATIONS_URL: &str =
    "https://www.ncei.noaa.gov/pub/data/ghcn/daily/ghcnd-stations.txt";

const BINCODE_CACHE_FILE_NAME: &str = "ghcnd-stations.bin";
const TEXT_CACHE_FILE_NAME: &str = "ghcnd-stations.txt";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// Loads the station directory from the cache folder, downloading it when needed.
#[derive(Debug, Clone)]
pub(crate) struct DirectoryStore {
    cache_dir: PathBuf,
    url: String,
    client: Client,
}

impl DirectoryStore {
    pub fn new(cache_dir: &Path, url: &str, client: Client) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
            url: url.to_string(),
            client,
        }
    }

    fn bincode_path(&self) -> PathBuf {
        self.cache_dir.join(BINCODE_CACHE_FILE_NAME)
    }

    fn text_path(&self) -> PathBuf {
        self.cache_dir.join(TEXT_CACHE_FILE_NAME)
    }

    /// Binary cache first, then a local `ghcnd-stations.txt`, then the network.
    pub async fn load(&self) -> Result<StationDirectory, DirectoryError> {
        let bincode_path = self.bincode_path();
        if tokio::fs::metadata(&bincode_path).await.is_ok() {
            info!("Reading station cache {}", bincode_path.display());
            let stations =
                tokio::task::spawn_blocking(move || read_cached_stations(&bincode_path)).await??;
            return Ok(StationDirectory::from_stations(stations));
        }

        let text_path = self.text_path();
        let directory = if tokio::fs::metadata(&text_path).await.is_ok() {
            info!("Parsing local station list {}", text_path.display());
            let text = tokio::fs::read(&text_path)
                .await
                .map_err(|e| DirectoryError::CacheRead(text_path.clone(), e))?;
            parse_in_background(text).await?
        } else {
            warn!("Station cache not found, downloading {}", self.url);
            parse_in_background(self.download().await?).await?
        };
        self.write_cache(&directory).await?;
        Ok(directory)
    }

    /// Downloads a fresh station list and overwrites the binary cache.
    pub async fn reload(&self) -> Result<StationDirectory, DirectoryError> {
        info!("Reloading station list from {}", self.url);
        let directory = parse_in_background(self.download().await?).await?;
        self.write_cache(&directory).await?;
        Ok(directory)
    }

    async fn download(&self) -> Result<Vec<u8>, DirectoryError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| DirectoryError::NetworkRequest(self.url.clone(), e))?;
        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(match e.status() {
                    Some(status) => DirectoryError::HttpStatus {
                        url: self.url.clone(),
                        status,
                        source: e,
                    },
                    None => DirectoryError::NetworkRequest(self.url.clone(), e),
                });
            }
        };
        let stream = response.bytes_stream().map_err(io::Error::other);
        let mut reader = StreamReader::new(stream);
        let mut bytes = Vec::with_capacity(12_000_000);
        reader.read_to_end(&mut bytes).await?;
        info!("Downloaded station list ({} bytes)", bytes.len());
        Ok(bytes)
    }

    async fn write_cache(&self, directory: &StationDirectory) -> Result<(), DirectoryError> {
        let path = self.bincode_path();
        let stations = directory.stations().to_vec();
        let encoded = tokio::task::spawn_blocking(move || {
            bincode::serde::encode_to_vec(stations, BINCODE_CONFIG)
                .map_err(|e| DirectoryError::CacheEncode(Box::new(e)))
        })
        .await??;
        write_atomic(&path, encoded)
            .await
            .map_err(|e| DirectoryError::CacheWrite(path.clone(), e))?;
        info!("Wrote station cache {}", path.display());
        Ok(())
    }
}

fn read_cached_stations(path: &Path) -> Result<Vec<Station>, DirectoryError> {
    let bytes =
        std::fs::read(path).map_err(|e| DirectoryError::CacheRead(path.to_path_buf(), e))?;
    let (stations, _) = bincode::serde::decode_from_slice::<Vec<Station>, _>(&bytes, BINCODE_CONFIG)
        .map_err(|e| DirectoryError::CacheDecode(path.to_path_buf(), Box::new(e)))?;
    Ok(stations)
}

async fn parse_in_background(bytes: Vec<u8>) -> Result<StationDirectory, DirectoryError> {
    let directory = tokio::task::spawn_blocking(move || {
        StationDirectory::parse(&String::from_utf8_lossy(&bytes))
    })
    .await?;
    Ok(directory)
}
