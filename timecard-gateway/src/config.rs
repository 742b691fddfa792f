//! Gateway configuration

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the ERP backend. Must be HTTPS unless it targets a
    /// loopback address.
    pub base_url: String,

    /// Organizational email domain allowed to authenticate.
    pub allowed_domain: String,

    /// Label applied to a write when the caller specifies none.
    pub default_label_id: i64,

    /// Session-token cache bounds.
    pub token_cache_size: usize,
    pub token_cache_ttl_secs: u64,

    /// Day caps for bulk fills and range reads.
    pub max_fill_days: i64,
    pub max_query_days: i64,

    pub max_description_len: usize,

    /// Rolling write-rate window and per-domain ceilings.
    pub rate_window_secs: u64,
    pub rate_ceiling_timelogs: u32,
    pub rate_ceiling_leaves: u32,

    /// Wall-clock budget for a whole bulk fill.
    pub bulk_deadline_secs: u64,

    /// Per-request HTTP timeouts.
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://erp.example.com/api/v1".to_string(),
            allowed_domain: "example.com".to_string(),
            default_label_id: 66,
            token_cache_size: 500,
            token_cache_ttl_secs: 900,
            max_fill_days: 31,
            max_query_days: 366,
            max_description_len: 5000,
            rate_window_secs: 3600,
            rate_ceiling_timelogs: 60,
            rate_ceiling_leaves: 20,
            bulk_deadline_secs: 120,
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    /// field by field.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env_string("TIMECARD_BASE_URL", defaults.base_url),
            allowed_domain: env_string("TIMECARD_ALLOWED_DOMAIN", defaults.allowed_domain),
            default_label_id: env_parse("TIMECARD_DEFAULT_LABEL_ID", defaults.default_label_id),
            token_cache_size: env_parse("TIMECARD_TOKEN_CACHE_SIZE", defaults.token_cache_size),
            token_cache_ttl_secs: env_parse(
                "TIMECARD_TOKEN_CACHE_TTL_SECS",
                defaults.token_cache_ttl_secs,
            ),
            max_fill_days: env_parse("TIMECARD_MAX_FILL_DAYS", defaults.max_fill_days),
            max_query_days: env_parse("TIMECARD_MAX_QUERY_DAYS", defaults.max_query_days),
            max_description_len: env_parse(
                "TIMECARD_MAX_DESCRIPTION_LEN",
                defaults.max_description_len,
            ),
            rate_window_secs: env_parse("TIMECARD_RATE_WINDOW_SECS", defaults.rate_window_secs),
            rate_ceiling_timelogs: env_parse(
                "TIMECARD_RATE_CEILING_TIMELOGS",
                defaults.rate_ceiling_timelogs,
            ),
            rate_ceiling_leaves: env_parse(
                "TIMECARD_RATE_CEILING_LEAVES",
                defaults.rate_ceiling_leaves,
            ),
            bulk_deadline_secs: env_parse("TIMECARD_BULK_DEADLINE_SECS", defaults.bulk_deadline_secs),
            connect_timeout_secs: env_parse(
                "TIMECARD_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            ),
            request_timeout_secs: env_parse(
                "TIMECARD_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            ),
        }
    }
}

fn env_string(key: &str, default: String) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
