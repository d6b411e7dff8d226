use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageSettings,
    pub llm: LlmConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Which record store backs workflows and runs
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
    Postgrest,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub database_url: String,
    pub max_connections: u32,
    pub postgrest_url: String,
    pub postgrest_key: String,
    pub timeout_secs: u64,
}

/// Generation backend settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub judge_model: String,
    pub max_concurrent_runs: usize,
    pub backoff: BackoffSettings,
}

/// Delay between attempts after a transport failure
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackoffSettings {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_url: "postgres://localhost/agentic_workflows".to_string(),
            max_connections: 10,
            postgrest_url: String::new(),
            postgrest_key: String::new(),
            timeout_secs: 10,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.getunbound.ai".to_string(),
            api_key: String::new(),
            timeout_secs: 60,
            temperature: 0.7,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            judge_model: "kimi-k2p5".to_string(),
            max_concurrent_runs: 16,
            backoff: BackoffSettings::default(),
        }
    }
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 8_000,
            multiplier: 2.0,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut app_config: Self = config.try_deserialize()?;
        app_config.apply_legacy_env(|name| std::env::var(name).ok());
        Ok(app_config)
    }

    /// Fill empty secrets from the bare `UNBOUND_API_KEY` / `SUPABASE_*` variables
    pub fn apply_legacy_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fill_if_empty(&mut self.llm.api_key, lookup("UNBOUND_API_KEY"));
        fill_if_empty(&mut self.storage.postgrest_url, lookup("SUPABASE_URL"));
        fill_if_empty(&mut self.storage.postgrest_key, lookup("SUPABASE_KEY"));
    }
}

fn fill_if_empty(target: &mut String, value: Option<String>) {
    if target.is_empty() {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            *target = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.llm.base_url, "https://api.getunbound.ai");
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.engine.judge_model, "kimi-k2p5");
        assert_eq!(config.engine.backoff.multiplier, 2.0);
    }

    #[test]
    fn test_partial_sections_deserialize() {
        let config: AppConfig = config::Config::builder()
            .set_override("storage.backend", "postgrest")
            .unwrap()
            .set_override("engine.max_concurrent_runs", 2)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Postgrest);
        assert_eq!(config.storage.timeout_secs, 10);
        assert_eq!(config.engine.max_concurrent_runs, 2);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_legacy_env_fills_only_empty_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("UNBOUND_API_KEY", "from-env"),
            ("SUPABASE_URL", "https://db.example.com"),
            ("SUPABASE_KEY", "anon"),
        ]);
        let lookup = |name: &str| env.get(name).map(|v| v.to_string());

        let mut config = AppConfig::default();
        config.storage.postgrest_url = "https://configured.example.com".to_string();
        config.apply_legacy_env(lookup);

        assert_eq!(config.llm.api_key, "from-env");
        assert_eq!(config.storage.postgrest_url, "https://configured.example.com");
        assert_eq!(config.storage.postgrest_key, "anon");
    }
}
