//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, BackoffSettings, EngineConfig, LlmConfig, LogFormat, LoggingConfig, ServerConfig,
    StorageBackend, StorageSettings,
};
