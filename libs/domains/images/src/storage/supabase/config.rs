use core_config::{ConfigError, FromEnv, env_or_default, env_parse, env_required};
use std::time::Duration;

pub const DEFAULT_LIST_PAGE_SIZE: usize = 1000;

/// Supabase project configuration
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Service key
    pub key: String,
    pub bucket: String,
    pub table: String,
    pub timeout: Duration,
    /// Entries requested per storage list or table select call
    pub list_page_size: usize,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            key: key.into(),
            bucket: "images".to_string(),
            table: "images".to_string(),
            timeout: Duration::from_secs(30),
            list_page_size: DEFAULT_LIST_PAGE_SIZE,
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_list_page_size(mut self, list_page_size: usize) -> Self {
        self.list_page_size = list_page_size.max(1);
        self
    }
}

impl FromEnv for SupabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let config = Self::new(env_required("SUPABASE_URL")?, env_required("SUPABASE_KEY")?)
            .with_bucket(env_or_default("SUPABASE_BUCKET", "images"))
            .with_table(env_or_default("SUPABASE_TABLE", "images"))
            .with_timeout(Duration::from_secs(env_parse("STORE_TIMEOUT_SECS", 30u64)?));

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_requires_url_and_key() {
        temp_env::with_vars(
            [("SUPABASE_URL", None::<&str>), ("SUPABASE_KEY", Some("k"))],
            || {
                let err = SupabaseConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("SUPABASE_URL"));
            },
        );
    }

    #[test]
    fn test_from_env_defaults() {
        temp_env::with_vars(
            [
                ("SUPABASE_URL", Some("https://demo.supabase.co/")),
                ("SUPABASE_KEY", Some("service-key")),
                ("SUPABASE_BUCKET", None),
                ("SUPABASE_TABLE", None),
                ("STORE_TIMEOUT_SECS", None),
            ],
            || {
                let config = SupabaseConfig::from_env().unwrap();
                assert_eq!(config.url, "https://demo.supabase.co");
                assert_eq!(config.bucket, "images");
                assert_eq!(config.table, "images");
                assert_eq!(config.timeout, Duration::from_secs(30));
                assert_eq!(config.list_page_size, DEFAULT_LIST_PAGE_SIZE);
            },
        );
    }

    #[test]
    fn test_from_env_overrides() {
        temp_env::with_vars(
            [
                ("SUPABASE_URL", Some("http://localhost:54321")),
                ("SUPABASE_KEY", Some("k")),
                ("SUPABASE_BUCKET", Some("photos")),
                ("SUPABASE_TABLE", Some("photo_rows")),
                ("STORE_TIMEOUT_SECS", Some("5")),
            ],
            || {
                let config = SupabaseConfig::from_env().unwrap();
                assert_eq!(config.bucket, "photos");
                assert_eq!(config.table, "photo_rows");
                assert_eq!(config.timeout, Duration::from_secs(5));
            },
        );
    }
}
