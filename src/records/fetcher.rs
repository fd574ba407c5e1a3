use crate::records::error::RecordError;
use crate::records::record_loader::RecordLoader;
use futures_util::stream::{self, StreamExt};
use std::collections::{hash_map::Entry, HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Memoizes loaded record texts on top of a [`RecordLoader`] and fetches several
/// stations concurrently.
///
/// The memo holds at most `memo_capacity` texts. The oldest entry is evicted first.
pub struct RecordFetcher {
    loader: RecordLoader,
    concurrency: usize,
    memo_capacity: usize,
    text_cache: Mutex<TextMemo>,
}

#[derive(Default)]
struct TextMemo {
    texts: HashMap<String, Arc<str>>,
    order: VecDeque<String>,
}

impl TextMemo {
    fn insert(&mut self, station: &str, text: Arc<str>, capacity: usize) -> Arc<str> {
        if capacity == 0 {
            return text;
        }
        match self.texts.entry(station.to_string()) {
            Entry::Occupied(entry) => return Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&text));
            }
        }
        self.order.push_back(station.to_string());
        while self.order.len() > capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.texts.remove(&oldest);
            }
        }
        text
    }
}

impl RecordFetcher {
    pub fn new(loader: RecordLoader, concurrency: usize, memo_capacity: usize) -> Self {
        Self {
            loader,
            concurrency: concurrency.max(1),
            memo_capacity,
            text_cache: Mutex::new(TextMemo::default()),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the record text for `station`, loading it at most once per fetcher
    /// unless two callers race on the first load.
    pub async fn get(&self, station: &str) -> Result<Arc<str>, RecordError> {
        if let Some(text) = self.memoized(station).await {
            return Ok(text);
        }

        // Loading happens outside the lock
        let loaded: Arc<str> = Arc::from(self.loader.load(station).await?);

        let mut cache = self.text_cache.lock().await;
        Ok(cache.insert(station, loaded, self.memo_capacity))
    }

    /// Like [`RecordFetcher::get`], but a text that is not memoized yet is loaded
    /// without being added to the memo.
    pub async fn peek(&self, station: &str) -> Result<Arc<str>, RecordError> {
        if let Some(text) = self.memoized(station).await {
            return Ok(text);
        }
        Ok(Arc::from(self.loader.load(station).await?))
    }

    async fn memoized(&self, station: &str) -> Option<Arc<str>> {
        self.text_cache.lock().await.texts.get(station).cloned()
    }

    /// Number of texts currently held in memory.
    pub async fn memoized_len(&self) -> usize {
        self.text_cache.lock().await.texts.len()
    }

    /// Downloads the records of every station that is not cached on disk yet.
    /// Results keep the order of `stations`.
    pub async fn prefetch(&self, stations: &[String]) -> Vec<(String, Result<(), RecordError>)> {
        stream::iter(stations)
            .map(|station| async move {
                let result = self.loader.ensure_cached(station).await.map(|_| ());
                (station.clone(), result)
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Drops the in-memory copies; the on-disk cache is untouched.
    pub async fn clear(&self) {
        let mut cache = self.text_cache.lock().await;
        cache.texts.clear();
        cache.order.clear();
    }
}
