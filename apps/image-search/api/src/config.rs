use core_config::{AppInfo, FromEnv, app_info, env_parse, server::ServerConfig};
use domain_images::{ClipConfig, ImageServiceConfig, SupabaseConfig};

use crate::warmup::RetryConfig;

// Re-export Environment for use in other modules
pub use core_config::Environment;

/// Application-specific configuration
/// Composes shared config components from the `config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub server: ServerConfig,
    pub environment: Environment,
    pub supabase: SupabaseConfig,
    pub embedder: ClipConfig,
    pub warmup: RetryConfig,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?;
        let supabase = SupabaseConfig::from_env()?;
        let embedder = ClipConfig::from_env()?;

        let warmup = RetryConfig::new()
            .with_max_retries(env_parse("WARMUP_MAX_RETRIES", 3)?)
            .with_initial_delay(env_parse("WARMUP_INITIAL_DELAY_MS", 500)?)
            .with_max_delay(env_parse("WARMUP_MAX_DELAY_MS", 10_000)?);

        Ok(Self {
            app: app_info!(),
            server,
            environment,
            supabase,
            embedder,
            warmup,
        })
    }

    /// Service tunables derived from the store and embedder settings
    pub fn service_config(&self) -> ImageServiceConfig {
        ImageServiceConfig {
            dimension: self.embedder.dimension,
            store_timeout: self.supabase.timeout,
            embed_timeout: self.embedder.timeout,
        }
    }
}
