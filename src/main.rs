use clap::{Parser, Subcommand};
use metadata_rag::Result;
use metadata_rag::commands::{
    ask_question, build_index, clear_history, record_feedback, search_metadata, show_history,
    show_status,
};
use metadata_rag::config::{
    Config, HOME_ENV, LogFormat, LoggingConfig, get_config_dir, init_config,
    run_interactive_config, show_config,
};
use metadata_rag::memory::Feedback;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "metadata-rag")]
#[command(about = "Ask questions about business metadata, answered from an exact vector index")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml, the index bundle and the conversation log
    #[arg(long, global = true, env = HOME_ENV)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding provider, answer model and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Write the default configuration without prompting
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },
    /// Embed a metadata file and build the index bundle
    Build {
        /// JSON array or JSON Lines file of {doc, table_name, column_name} records
        #[arg(long, short)]
        input: PathBuf,
        /// Where to write the bundle; defaults to the configured location
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Show the metadata entries closest to a query
    Search {
        query: String,
        /// Number of matches to return
        #[arg(short)]
        k: Option<usize>,
    },
    /// Ask a question and get an answer grounded in the indexed metadata
    Ask {
        question: String,
        /// Number of matches to retrieve as context
        #[arg(short)]
        k: Option<usize>,
    },
    /// Rate an earlier answer
    Feedback {
        /// Turn ID printed by `ask`
        id: String,
        /// like or dislike
        rating: Feedback,
        /// Optional comment, e.g. what could be better
        #[arg(long)]
        comment: Option<String>,
    },
    /// Show recent questions and answers
    History {
        /// Number of turns to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Delete all stored conversation turns
    ClearHistory,
    /// Show index and memory status
    Status,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };

    let config = Config::load(&config_dir);
    init_tracing(
        config
            .as_ref()
            .map_or(&LoggingConfig::default(), |config| &config.logging),
    );

    if let Commands::Config { show, init } = cli.command {
        if show {
            show_config(&config_dir)?;
        } else if init {
            init_config(&config_dir)?;
        } else {
            run_interactive_config(&config_dir)?;
        }
        return Ok(());
    }

    let config = config?;
    match cli.command {
        Commands::Build { input, output } => {
            build_index(&config, &input, output.as_deref())?;
        }
        Commands::Search { query, k } => {
            search_metadata(&config, &query, k)?;
        }
        Commands::Ask { question, k } => {
            ask_question(&config, &question, k)?;
        }
        Commands::Feedback {
            id,
            rating,
            comment,
        } => {
            record_feedback(&config, &id, rating, comment)?;
        }
        Commands::History { limit } => {
            show_history(&config, limit)?;
        }
        Commands::ClearHistory => {
            clear_history(&config)?;
        }
        Commands::Status => {
            show_status(&config)?;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}
