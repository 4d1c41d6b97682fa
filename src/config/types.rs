use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Connection settings for the remote media server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Access token sent with every request.
    #[serde(default)]
    pub token: String,
}

fn default_base_url() -> String {
    "http://127.0.0.1:32400".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
        }
    }
}

/// Settings for the metadata-fetch pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Maximum number of simple items per batch metadata request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of concurrent fetch workers draining the work queue.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    #[serde(default = "default_queue_capacity")]
    pub work_queue_capacity: usize,

    #[serde(default = "default_queue_capacity")]
    pub result_queue_capacity: usize,
}

fn default_batch_size() -> usize {
    100
}
fn default_worker_count() -> usize {
    3
}
fn default_queue_capacity() -> usize {
    256
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            worker_count: default_worker_count(),
            work_queue_capacity: default_queue_capacity(),
            result_queue_capacity: default_queue_capacity(),
        }
    }
}

/// Settings for the in-memory metadata cache.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Maximum number of cached entries.
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,

    /// TTL in seconds for widget data (dashboard/home items).
    #[serde(default = "default_ttl_widget")]
    pub ttl_widget_secs: u64,

    /// TTL in seconds for detail data (item detail views).
    #[serde(default = "default_ttl_detail")]
    pub ttl_detail_secs: u64,

    /// TTL in seconds for sync data (library sync operations).
    #[serde(default = "default_ttl_sync")]
    pub ttl_sync_secs: u64,
}

fn default_cache_max_size() -> usize {
    1000
}
fn default_ttl_widget() -> u64 {
    300
}
fn default_ttl_detail() -> u64 {
    900
}
fn default_ttl_sync() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_cache_max_size(),
            ttl_widget_secs: default_ttl_widget(),
            ttl_detail_secs: default_ttl_detail(),
            ttl_sync_secs: default_ttl_sync(),
        }
    }
}
