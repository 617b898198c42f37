// Configuration management module
// TOML settings for the embedding provider, answer model, retrieval and logging

pub mod interactive;
pub mod settings;


pub use interactive::{init_config, run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, EmbeddingConfig, HOME_ENV, LlmConfig, LogFormat, LoggingConfig,
    RetrievalConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
