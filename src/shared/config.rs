//! Application configuration. Upstream API endpoint, storage paths, timing.

use serde::Deserialize;

/// Default capacity for the reminder event channel. Bounded so a stuck
/// presentation layer cannot grow memory without limit; the scheduler uses
/// try_send and retries on the next tick instead of blocking.
pub const DEFAULT_EVENT_QUEUE_SIZE: usize = 256;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Upstream schedule API base URL. Read from SCHEDBOT_API_URL.
    pub api_url: Option<String>,

    /// Per-request timeout in seconds (default 5). Read from SCHEDBOT_API_TIMEOUT_SECS.
    #[serde(default)]
    pub api_timeout_secs: Option<u64>,

    /// Total fetch attempts per request, including the first (default 3).
    /// Read from SCHEDBOT_FETCH_ATTEMPTS.
    #[serde(default)]
    pub fetch_attempts: Option<u32>,

    /// Base delay in ms between retry attempts, grows linearly (default 500).
    /// Read from SCHEDBOT_RETRY_DELAY_MS.
    #[serde(default)]
    pub retry_delay_ms: Option<u64>,

    /// Directory holding the SQLite databases (default ./data). Read from SCHEDBOT_DATA_DIR.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Reminder scheduler tick interval in seconds (default 45). Read from SCHEDBOT_TICK_SECS.
    #[serde(default)]
    pub tick_secs: Option<u64>,

    /// How far ahead a boundary arms before firing, in seconds (default 120).
    /// Read from SCHEDBOT_LOOKAHEAD_SECS.
    #[serde(default)]
    pub lookahead_secs: Option<u64>,

    /// Language for upstream requests and new chats (default "uk").
    /// Read from SCHEDBOT_DEFAULT_LANG.
    #[serde(default)]
    pub default_lang: Option<String>,

    /// Reminder event channel capacity. Read from SCHEDBOT_EVENT_QUEUE_SIZE.
    #[serde(default)]
    pub event_queue_size: Option<usize>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("SCHEDBOT"));
        if let Ok(path) = std::env::var("SCHEDBOT_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    /// Returns the upstream API base URL. Defaults to the public portal API.
    pub fn api_url_or_default(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| "https://mkr.org.ua/api/v2".to_string())
    }

    /// Returns the per-request timeout in seconds. Defaults to 5.
    pub fn api_timeout_secs_or_default(&self) -> u64 {
        self.api_timeout_secs.unwrap_or(5)
    }

    /// Returns the number of fetch attempts. Defaults to 3, minimum 1.
    pub fn fetch_attempts_or_default(&self) -> u32 {
        self.fetch_attempts.unwrap_or(3).max(1)
    }

    /// Returns the base retry delay in milliseconds. Defaults to 500.
    pub fn retry_delay_ms_or_default(&self) -> u64 {
        self.retry_delay_ms.unwrap_or(500)
    }

    /// Returns the data directory. Defaults to ./data.
    pub fn data_dir_or_default(&self) -> String {
        self.data_dir.clone().unwrap_or_else(|| "./data".to_string())
    }

    /// Returns the scheduler tick interval in seconds. Defaults to 45.
    pub fn tick_secs_or_default(&self) -> u64 {
        self.tick_secs.unwrap_or(45).max(1)
    }

    /// Returns the arming lookahead in seconds. Defaults to 120.
    pub fn lookahead_secs_or_default(&self) -> u64 {
        self.lookahead_secs.unwrap_or(120)
    }

    /// Returns the default language code. Defaults to "uk".
    pub fn default_lang_or_default(&self) -> String {
        self.default_lang.clone().unwrap_or_else(|| "uk".to_string())
    }

    /// Returns the reminder event channel capacity.
    pub fn event_queue_size_or_default(&self) -> usize {
        self.event_queue_size.unwrap_or(DEFAULT_EVENT_QUEUE_SIZE)
    }
}
