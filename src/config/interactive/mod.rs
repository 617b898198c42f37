
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::{Config, EmbeddingConfig, LlmConfig, RetrievalConfig};
use crate::retrieval::DistanceMetric;

/// Walk the user through the embedding, chat and retrieval settings and save them.
#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Metadata Assistant Configuration").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Embedding Provider").bold().yellow());
    eprintln!("Any OpenAI-compatible /embeddings endpoint works.");
    eprintln!();
    configure_embedding(&mut config.embedding)?;

    eprintln!();
    eprintln!("{}", style("Answer Model").bold().yellow());
    configure_llm(&mut config.llm)?;

    eprintln!();
    eprintln!("{}", style("Retrieval").bold().yellow());
    configure_retrieval(&mut config.retrieval)?;

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

/// Write the default configuration unless a config file already exists.
#[inline]
pub fn init_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    let path = config.config_file_path();
    if path.exists() {
        eprintln!(
            "{} {}",
            style("Configuration already exists:").yellow(),
            path.display()
        );
        return Ok(());
    }

    config.save().context("Failed to save configuration")?;
    eprintln!(
        "{} {}",
        style("✓ Wrote default configuration to").green(),
        style(path.display()).cyan()
    );
    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding:").bold().yellow());
    eprintln!("  Endpoint: {}", style(&config.embedding.base_url).cyan());
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!("  Dimension: {}", style(config.embedding.dimension).cyan());
    eprintln!("  Batch Size: {}", style(config.embedding.batch_size).cyan());
    eprintln!(
        "  API Key: {}",
        api_key_status(&config.embedding.api_key_env)
    );

    eprintln!();
    eprintln!("{}", style("Answer Model:").bold().yellow());
    eprintln!("  Endpoint: {}", style(&config.llm.base_url).cyan());
    eprintln!("  Model: {}", style(&config.llm.model).cyan());
    eprintln!("  Temperature: {}", style(config.llm.temperature).cyan());
    eprintln!("  API Key: {}", api_key_status(&config.llm.api_key_env));

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());
    eprintln!("  Metric: {}", style(config.retrieval.metric).cyan());
    eprintln!(
        "  Context Turns: {}",
        style(config.retrieval.context_turns).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
    eprintln!("Index bundle: {}", style(config.bundle_path().display()).dim());
    eprintln!(
        "Conversation log: {}",
        style(config.memory_path().display()).dim()
    );

    Ok(())
}

fn api_key_status(var: &str) -> String {
    if var.is_empty() {
        return style("not required").dim().to_string();
    }
    if std::env::var_os(var).is_some() {
        style(format!("set (${})", var)).green().to_string()
    } else {
        style(format!("missing (${})", var)).red().to_string()
    }
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No valid configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_embedding(embedding: &mut EmbeddingConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("Embedding endpoint base URL")
        .default(embedding.base_url.clone())
        .validate_with(|input: &String| {
            EmbeddingConfig {
                base_url: input.clone(),
                ..EmbeddingConfig::default()
            }
            .validate()
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(embedding.model.clone())
        .interact_text()?;

    let dimension: u32 = Input::new()
        .with_prompt("Embedding dimension")
        .default(embedding.dimension)
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(embedding.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 2048 {
                Err("Batch size must be 2048 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let api_key_env: String = Input::new()
        .with_prompt("Environment variable holding the API key (empty for none)")
        .default(embedding.api_key_env.clone())
        .allow_empty(true)
        .interact_text()?;

    embedding.base_url = base_url;
    embedding.set_model(model)?;
    embedding.set_dimension(dimension)?;
    embedding.set_batch_size(batch_size)?;
    embedding.api_key_env = api_key_env;

    Ok(())
}

fn configure_llm(llm: &mut LlmConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("Chat endpoint base URL")
        .default(llm.base_url.clone())
        .validate_with(|input: &String| {
            LlmConfig {
                base_url: input.clone(),
                ..LlmConfig::default()
            }
            .validate()
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Chat model")
        .default(llm.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let api_key_env: String = Input::new()
        .with_prompt("Environment variable holding the API key (empty for none)")
        .default(llm.api_key_env.clone())
        .allow_empty(true)
        .interact_text()?;

    llm.base_url = base_url;
    llm.model = model;
    llm.api_key_env = api_key_env;

    Ok(())
}

fn configure_retrieval(retrieval: &mut RetrievalConfig) -> Result<()> {
    retrieval.top_k = Input::new()
        .with_prompt("Matches retrieved per question")
        .default(retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=100).contains(input) {
                Ok(())
            } else {
                Err("Must be between 1 and 100")
            }
        })
        .interact_text()?;

    let metrics = [DistanceMetric::SquaredEuclidean, DistanceMetric::Cosine];
    let default_index = metrics
        .iter()
        .position(|m| *m == retrieval.metric)
        .unwrap_or(0);
    let metric_index = Select::new()
        .with_prompt("Distance metric (takes effect on the next build)")
        .default(default_index)
        .items(&metrics)
        .interact()?;
    retrieval.metric = metrics[metric_index];

    Ok(())
}
