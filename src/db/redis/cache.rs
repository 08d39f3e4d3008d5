use redis::AsyncCommands;
use redis::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::{AppError, AppResult};
use crate::models::MovieId;

/// Keys of cacheable TMDB responses. Account lists are never cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Movie(MovieId),
    Recommendations(MovieId),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Movie(id) => write!(f, "movie:{}", id),
            CacheKey::Recommendations(id) => write!(f, "recs:{}", id),
        }
    }
}

/// Opens a Redis client for `redis_url`
///
/// No connection is made until the first command. An unreachable server shows
/// up later as cache misses, not as a startup failure.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    Ok(Client::open(redis_url)?)
}

/// Serialized value waiting to be written
struct PendingWrite {
    key: String,
    json: String,
    ttl_secs: u64,
}

/// Read-through cache for movie metadata.
///
/// Reads go straight to Redis. Writes are queued to a background task so a
/// slow or absent Redis never delays a response.
///
/// Only data that is the same for every user is stored here (movie details
/// and recommendations). Account lists are always fetched fresh, otherwise a
/// stale list would hide a membership change made elsewhere.
///
/// Cloning is cheap: clones share the Redis client and the write queue.
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    writes: mpsc::UnboundedSender<PendingWrite>,
}

/// Stops the background writer once the server is done serving
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Asks the writer to flush what is queued and exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown requested");
    }
}

impl Cache {
    /// Creates the cache and spawns its background writer
    ///
    /// The returned [`CacheWriterHandle`] should be kept until shutdown so
    /// queued writes can be flushed before the process exits.
    pub async fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (writes, queue) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(run_writer(redis_client.clone(), queue, shutdown_rx));

        (
            Self {
                redis_client,
                writes,
            },
            CacheWriterHandle { shutdown_tx },
        )
    }

    /// Reads and decodes `key`
    ///
    /// Returns `Ok(None)` on a miss. A Redis failure or an entry that no longer
    /// decodes into `T` (for example after a model change) is an error; most
    /// callers want [`Cache::lookup`] instead.
    pub async fn get_from_cache<T: DeserializeOwned>(&self, key: &CacheKey) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(key.to_string()).await?;

        raw.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| AppError::Internal(format!("Cache entry {} is corrupt: {}", key, e)))
        })
        .transpose()
    }

    /// Like [`Cache::get_from_cache`], but a Redis or decoding failure is
    /// logged and treated as a miss so the caller falls through to the API
    pub async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.get_from_cache(key).await {
            Ok(hit) => {
                tracing::debug!(key = %key, hit = hit.is_some(), "Cache lookup");
                hit
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache lookup failed, treating as miss");
                None
            }
        }
    }

    /// Queues `value` for writing under `key` with a TTL of `ttl_secs`
    ///
    /// Serialization happens on the caller's task; the Redis round trip does
    /// not. Returns immediately, and a write that cannot be queued (writer
    /// already stopped) is logged and dropped, never surfaced to the caller.
    pub fn set_in_background<T: Serialize>(&self, key: &CacheKey, value: &T, ttl_secs: u64) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Cache serialization error");
                return;
            }
        };

        let write = PendingWrite {
            key: key.to_string(),
            json,
            ttl_secs,
        };
        if self.writes.send(write).is_err() {
            tracing::warn!(key = %key, "Cache writer has stopped, dropping write");
        }
    }
}

/// Drains queued writes into Redis until shutdown is requested or every
/// [`Cache`] clone is dropped. On shutdown the queue is flushed first.
async fn run_writer(
    client: Client,
    mut queue: mpsc::UnboundedReceiver<PendingWrite>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    tracing::info!("Cache writer started");
    let mut failed_writes: u64 = 0;

    loop {
        tokio::select! {
            write = queue.recv() => {
                let Some(write) = write else {
                    tracing::info!("All cache handles dropped, writer exiting");
                    break;
                };
                if let Err(e) = store(&client, write).await {
                    failed_writes += 1;
                    tracing::error!(error = %e, failed_writes, "Cache write failed");
                }
            }
            _ = shutdown_rx.recv() => {
                let mut flushed = 0;
                while let Ok(write) = queue.try_recv() {
                    match store(&client, write).await {
                        Ok(()) => flushed += 1,
                        Err(e) => {
                            failed_writes += 1;
                            tracing::error!(error = %e, "Cache write failed during shutdown");
                        }
                    }
                }
                tracing::info!(flushed, failed_writes, "Cache writer stopped");
                break;
            }
        }
    }
}

async fn store(client: &Client, write: PendingWrite) -> AppResult<()> {
    let mut conn = client.get_multiplexed_async_connection().await?;
    let _: () = conn.set_ex(write.key, write.json, write.ttl_secs).await?;
    Ok(())
}
