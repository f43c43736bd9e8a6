//! Runtime configuration and environment loading.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Settings shared by the service, the event bus and the hook dispatcher.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// SQLite file backing the store. `None` keeps everything in memory.
    pub database_path: Option<PathBuf>,
    /// Capacity of each event bus channel.
    pub event_buffer_size: usize,
    /// Upper bound for a single webhook request.
    pub hook_timeout: Duration,
    /// Directory for log files. Binaries pick a platform default when unset.
    pub log_dir: Option<PathBuf>,
    /// Start the background worker that posts webhooks.
    pub dispatch_hooks: bool,
    /// Body returned by a successful health check.
    pub healthcheck_text: String,
    /// Maximum number of clans returned by a search.
    pub search_limit: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            event_buffer_size: 100,
            hook_timeout: Duration::from_millis(500),
            log_dir: None,
            dispatch_hooks: true,
            healthcheck_text: "WORKING".to_string(),
            search_limit: 50,
        }
    }
}

impl RuntimeConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `CLAN_DATABASE_PATH` - SQLite file (default: in-memory store)
    /// - `CLAN_EVENT_BUFFER` - Event bus channel capacity (default: 100)
    /// - `CLAN_HOOK_TIMEOUT_MS` - Webhook request timeout (default: 500)
    /// - `CLAN_LOG_DIR` - Log directory (default: platform cache dir)
    /// - `CLAN_DISPATCH_HOOKS` - Post webhooks for committed changes (default: true)
    /// - `CLAN_HEALTHCHECK_TEXT` - Health check body (default: WORKING)
    /// - `CLAN_SEARCH_LIMIT` - Maximum clan search results (default: 50)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(path) = read_env::<PathBuf>("CLAN_DATABASE_PATH") {
            config.database_path = Some(path);
        }
        if let Some(capacity) = read_env::<usize>("CLAN_EVENT_BUFFER") {
            config.event_buffer_size = capacity.max(1);
        }
        if let Some(millis) = read_env::<u64>("CLAN_HOOK_TIMEOUT_MS") {
            config.hook_timeout = Duration::from_millis(millis.max(1));
        }
        if let Some(dir) = read_env::<PathBuf>("CLAN_LOG_DIR") {
            config.log_dir = Some(dir);
        }
        if let Some(enabled) = read_env_bool("CLAN_DISPATCH_HOOKS") {
            config.dispatch_hooks = enabled;
        }
        if let Some(text) = read_env::<String>("CLAN_HEALTHCHECK_TEXT") {
            config.healthcheck_text = text;
        }
        if let Some(limit) = read_env::<usize>("CLAN_SEARCH_LIMIT") {
            config.search_limit = limit.max(1);
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

fn read_env_bool(key: &str) -> Option<bool> {
    match env::var(key).ok()?.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_memory_store_and_dispatch_hooks() {
        let config = RuntimeConfig::default();
        assert!(config.database_path.is_none());
        assert!(config.dispatch_hooks);
        assert_eq!(config.event_buffer_size, 100);
        assert_eq!(config.healthcheck_text, "WORKING");
    }

    #[test]
    fn unknown_boolean_spellings_are_ignored() {
        // SAFETY: the variable is unique to this test.
        unsafe { env::set_var("CLAN_TEST_FLAG_SPELLING", "maybe") };
        assert_eq!(read_env_bool("CLAN_TEST_FLAG_SPELLING"), None);
        unsafe { env::set_var("CLAN_TEST_FLAG_SPELLING", "Off") };
        assert_eq!(read_env_bool("CLAN_TEST_FLAG_SPELLING"), Some(false));
    }
}
